// WAD object data
// Moveables, statics, sprites and sounds as loaded from object libraries.
// The compiler consumes this model; importing it from other formats happens elsewhere.

use crate::level::math::Vec3;
use crate::level::texture::TextureArea;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadPolygon {
    /// Vertex indices; the fourth is ignored for triangles
    pub indices: [u16; 4],
    #[serde(default)]
    pub triangle: bool,
    pub texture: TextureArea,
    #[serde(default)]
    pub shine: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WadMesh {
    #[serde(default)]
    pub name: String,
    pub positions: Vec<Vec3>,
    #[serde(default)]
    pub normals: Vec<Vec3>,
    /// Per-vertex shade (0 = bright); used when a mesh has no normals
    #[serde(default)]
    pub shades: Vec<i16>,
    pub polygons: Vec<WadPolygon>,
}

impl WadMesh {
    /// Bounding sphere (centre, radius) enclosing all vertices
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        if self.positions.is_empty() {
            return (Vec3::ZERO, 0.0);
        }
        let mut min = self.positions[0];
        let mut max = self.positions[0];
        for p in &self.positions {
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        let centre = (min + max) * 0.5;
        let radius = self
            .positions
            .iter()
            .map(|p| (*p - centre).length())
            .fold(0.0f32, f32::max);
        (centre, radius)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoneOp {
    #[default]
    None,
    Pop,
    Push,
    PopPush,
}

impl BoneOp {
    /// Mesh tree flag bits
    pub fn flags(self) -> i32 {
        match self {
            BoneOp::None => 0,
            BoneOp::Pop => 1,
            BoneOp::Push => 2,
            BoneOp::PopPush => 3,
        }
    }
}

/// Links mesh `n + 1` to the current parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadBone {
    #[serde(default)]
    pub op: BoneOp,
    pub offset: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadKeyFrame {
    /// min x, max x, min y, max y, min z, max z
    pub bounding_box: [i16; 6],
    pub offset: Vec3,
    /// Per-mesh rotation in degrees
    pub angles: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadAnimDispatch {
    pub in_frame: u16,
    pub out_frame: u16,
    pub next_animation: u16,
    pub next_frame: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadStateChange {
    pub state_id: u16,
    pub dispatches: Vec<WadAnimDispatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WadAnimCommand {
    PositionOffset { x: i16, y: i16, z: i16 },
    JumpVelocity { horizontal: i16, vertical: i16 },
    EmptyHands,
    KillEntity,
    PlaySound { frame: u16, sound: u16 },
    FlipEffect { frame: u16, effect: u16 },
}

impl WadAnimCommand {
    pub fn code(&self) -> i16 {
        match self {
            WadAnimCommand::PositionOffset { .. } => 1,
            WadAnimCommand::JumpVelocity { .. } => 2,
            WadAnimCommand::EmptyHands => 3,
            WadAnimCommand::KillEntity => 4,
            WadAnimCommand::PlaySound { .. } => 5,
            WadAnimCommand::FlipEffect { .. } => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadAnimation {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u8,
    pub state_id: u16,
    #[serde(default)]
    pub start_velocity: f32,
    #[serde(default)]
    pub end_velocity: f32,
    #[serde(default)]
    pub start_lateral_velocity: f32,
    #[serde(default)]
    pub end_lateral_velocity: f32,
    /// Index into the owning moveable's animation list
    pub next_animation: u16,
    #[serde(default)]
    pub next_frame: u16,
    /// Number of frames played; keyframes are sampled every `frame_rate` frames
    pub end_frame: u16,
    #[serde(default)]
    pub keyframes: Vec<WadKeyFrame>,
    #[serde(default)]
    pub state_changes: Vec<WadStateChange>,
    #[serde(default)]
    pub commands: Vec<WadAnimCommand>,
}

fn default_frame_rate() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WadMoveable {
    pub meshes: Vec<WadMesh>,
    #[serde(default)]
    pub bones: Vec<WadBone>,
    #[serde(default)]
    pub animations: Vec<WadAnimation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadStatic {
    pub mesh: WadMesh,
    #[serde(default)]
    pub visibility_box: [i16; 6],
    #[serde(default)]
    pub collision_box: [i16; 6],
    #[serde(default)]
    pub flags: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadSprite {
    pub page: u16,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// left, top, right, bottom in world units
    #[serde(default)]
    pub alignment: [i16; 4],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WadSpriteSequence {
    pub sprites: Vec<WadSprite>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WadSample {
    #[serde(default)]
    pub name: String,
    /// Encoded sample file (usually WAV)
    #[serde(default)]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WadSoundInfo {
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default = "default_range")]
    pub range: u8,
    #[serde(default = "default_chance")]
    pub chance: u8,
    #[serde(default)]
    pub pitch: u8,
    /// Loop mode and randomization bits
    #[serde(default)]
    pub flags: u16,
    #[serde(default)]
    pub samples: Vec<WadSample>,
}

fn default_volume() -> u8 {
    100
}

fn default_range() -> u8 {
    10
}

fn default_chance() -> u8 {
    100
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wad {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub moveables: BTreeMap<u32, WadMoveable>,
    #[serde(default)]
    pub statics: BTreeMap<u32, WadStatic>,
    #[serde(default)]
    pub sprite_sequences: BTreeMap<u32, WadSpriteSequence>,
    #[serde(default)]
    pub sounds: BTreeMap<u32, WadSoundInfo>,
}
