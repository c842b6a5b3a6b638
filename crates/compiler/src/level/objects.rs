// Object instances
// Everything placed in a room lives in one arena and is referenced by `ObjectId`.

use crate::level::math::Vec3;
use crate::level::portal::SectorArea;
use crate::level::texture::TextureArea;
use crate::level::RoomId;
use crate::version::GameVersion;
use serde::{Deserialize, Serialize};

/// Stable handle of an object in the level arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

fn white() -> Vec3 {
    Vec3::new(1.0, 1.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveableInstance {
    pub wad_object_id: u32,
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default)]
    pub ocb: i16,
    /// Five activation bits
    #[serde(default)]
    pub code_bits: u8,
    #[serde(default)]
    pub clear_body: bool,
    #[serde(default)]
    pub invisible: bool,
    #[serde(default = "white")]
    pub color: Vec3,
    #[serde(default)]
    pub lua_name: String,
}

impl MoveableInstance {
    pub fn new(wad_object_id: u32) -> Self {
        MoveableInstance {
            wad_object_id,
            rotation_y: 0.0,
            ocb: 0,
            code_bits: 0,
            clear_body: false,
            invisible: false,
            color: white(),
            lua_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticInstance {
    pub wad_object_id: u32,
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default = "white")]
    pub color: Vec3,
    #[serde(default)]
    pub ocb: i16,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraInstance {
    #[serde(default)]
    pub fixed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlybyCameraInstance {
    pub sequence: u8,
    pub number: u8,
    #[serde(default)]
    pub timer: u16,
    #[serde(default)]
    pub flags: u16,
    #[serde(default = "default_flyby_speed")]
    pub speed: f32,
    #[serde(default = "default_flyby_fov")]
    pub fov: f32,
    #[serde(default)]
    pub roll: f32,
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default)]
    pub rotation_x: f32,
}

fn default_flyby_speed() -> f32 {
    1.0
}

fn default_flyby_fov() -> f32 {
    80.0
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SinkInstance {
    #[serde(default)]
    pub strength: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoundSourcePlayMode {
    #[default]
    Automatic,
    Always,
    OnlyInBaseRoom,
    OnlyInAlternateRoom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSourceInstance {
    /// Negative when no sound is assigned
    pub sound_id: i32,
    #[serde(default)]
    pub play_mode: SoundSourcePlayMode,
}

impl SoundSourceInstance {
    pub fn is_empty(&self) -> bool {
        self.sound_id < 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightType {
    #[default]
    Point,
    Shadow,
    Spot,
    Sun,
    Effect,
    FogBulb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightInstance {
    #[serde(default)]
    pub light_type: LightType,
    #[serde(default = "white")]
    pub color: Vec3,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    /// Ranges in sectors
    #[serde(default = "default_inner_range")]
    pub inner_range: f32,
    #[serde(default = "default_outer_range")]
    pub outer_range: f32,
    /// Cone angles in degrees
    #[serde(default)]
    pub inner_angle: f32,
    #[serde(default)]
    pub outer_angle: f32,
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default)]
    pub rotation_x: f32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_intensity() -> f32 {
    0.5
}

fn default_inner_range() -> f32 {
    1.0
}

fn default_outer_range() -> f32 {
    5.0
}

fn default_enabled() -> bool {
    true
}

impl LightInstance {
    pub fn direction(&self) -> Vec3 {
        Vec3::from_yaw_pitch(self.rotation_y, self.rotation_x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerType {
    #[default]
    Trigger,
    Pad,
    Switch,
    Key,
    Pickup,
    Heavy,
    Antipad,
    Combat,
    Dummy,
    Antitrigger,
    HeavySwitch,
    HeavyAntitrigger,
    Monkey,
    Skeleton,
    Tightrope,
    Crawl,
    Climb,
}

impl TriggerType {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn min_version(self) -> GameVersion {
        match self {
            TriggerType::Antitrigger => GameVersion::Tr3,
            TriggerType::Trigger
            | TriggerType::Pad
            | TriggerType::Switch
            | TriggerType::Key
            | TriggerType::Pickup
            | TriggerType::Heavy
            | TriggerType::Antipad
            | TriggerType::Combat
            | TriggerType::Dummy => GameVersion::Tr1,
            _ => GameVersion::Tr4,
        }
    }

    /// Trigger types whose first action names the activating item
    pub fn has_key_item(self) -> bool {
        matches!(
            self,
            TriggerType::Switch | TriggerType::Key | TriggerType::Pickup | TriggerType::HeavySwitch
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerTargetType {
    #[default]
    Object,
    Camera,
    Sink,
    FlipMap,
    FlipOn,
    FlipOff,
    Target,
    FinishLevel,
    PlayAudio,
    FlipEffect,
    Secret,
    ClearBodies,
    FlyByCamera,
    Fmv,
}

impl TriggerTargetType {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn min_version(self) -> GameVersion {
        match self {
            TriggerTargetType::ClearBodies | TriggerTargetType::FlyByCamera | TriggerTargetType::Fmv => {
                GameVersion::Tr4
            }
            _ => GameVersion::Tr1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerTarget {
    #[default]
    None,
    Object(ObjectId),
    Number(i32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInstance {
    pub area: SectorArea,
    #[serde(default)]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub target_type: TriggerTargetType,
    #[serde(default)]
    pub target: TriggerTarget,
    #[serde(default)]
    pub timer: i16,
    /// Second parameter; camera actions use it as the move timer
    #[serde(default)]
    pub extra: i16,
    #[serde(default = "all_code_bits")]
    pub code_bits: u8,
    #[serde(default)]
    pub one_shot: bool,
}

fn all_code_bits() -> u8 {
    0x1F
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedTriangle {
    /// Positions relative to the object
    pub vertices: [Vec3; 3],
    pub texture: TextureArea,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportedGeometryInstance {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub triangles: Vec<ImportedTriangle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Moveable(MoveableInstance),
    Static(StaticInstance),
    Camera(CameraInstance),
    FlybyCamera(FlybyCameraInstance),
    Sink(SinkInstance),
    SoundSource(SoundSourceInstance),
    Light(LightInstance),
    Trigger(TriggerInstance),
    ImportedGeometry(ImportedGeometryInstance),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub room: RoomId,
    /// Room-relative position in world units (y up)
    #[serde(default)]
    pub position: Vec3,
    pub kind: ObjectKind,
}

/// Slot storage for object instances; removed objects leave a hole so ids stay stable
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectArena {
    slots: Vec<Option<ObjectInstance>>,
}

impl ObjectArena {
    pub fn new() -> Self {
        ObjectArena::default()
    }

    pub fn insert(&mut self, instance: ObjectInstance) -> ObjectId {
        let id = ObjectId(self.slots.len() as u32);
        self.slots.push(Some(instance));
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<ObjectInstance> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectInstance> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ObjectInstance> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectInstance)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|o| (ObjectId(i as u32), o)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
