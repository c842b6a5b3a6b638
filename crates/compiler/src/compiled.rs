// Resolved level data
// Version-neutral records produced by the compile phases and consumed by the writer.
// Every index stored here is already remapped; the writer only narrows and lays out.

use crate::level::math::Vec3;
use crate::level::objects::LightType;
use crate::level::texture::{BlendMode, TexturePage};
use crate::textures::ObjectTexture;
use crate::version::GameVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct TrRoomVertex {
    /// Room-relative x/z, absolute y, file orientation (y down)
    pub position: [i32; 3],
    pub color: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrFace {
    pub indices: [u32; 4],
    pub triangle: bool,
    pub texture: u32,
    pub double_sided: bool,
    pub blend_mode: BlendMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrPortal {
    pub adjoining_room: u32,
    pub normal: [i16; 3],
    pub vertices: [[i32; 3]; 4],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrSector {
    pub floor_data_index: u32,
    pub box_index: Option<u32>,
    pub material: u8,
    pub room_below: Option<u32>,
    /// Height in clicks, file orientation
    pub floor: i8,
    pub room_above: Option<u32>,
    pub ceiling: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrLight {
    pub position: [i32; 3],
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    /// World units
    pub inner_range: f32,
    pub outer_range: f32,
    /// Degrees
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrRoomStatic {
    pub position: [i32; 3],
    pub rotation: u16,
    pub color: Vec3,
    pub object_id: u32,
    pub ocb: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrRoom {
    pub name: String,
    /// World x/z of the room origin
    pub x: i32,
    pub z: i32,
    /// File orientation: bottom is the larger value
    pub y_bottom: i32,
    pub y_top: i32,
    pub vertices: Vec<TrRoomVertex>,
    pub faces: Vec<TrFace>,
    pub portals: Vec<TrPortal>,
    pub num_x: u16,
    pub num_z: u16,
    /// Row-major, x outer and z inner
    pub sectors: Vec<TrSector>,
    pub ambient: Vec3,
    pub lights: Vec<TrLight>,
    pub statics: Vec<TrRoomStatic>,
    pub alternate_room: Option<u32>,
    pub alternate_group: i16,
    pub flags: u16,
    pub water_scheme: u8,
    pub reverb: u8,
}

impl TrRoom {
    pub fn quads(&self) -> impl Iterator<Item = &TrFace> {
        self.faces.iter().filter(|f| !f.triangle)
    }

    pub fn triangles(&self) -> impl Iterator<Item = &TrFace> {
        self.faces.iter().filter(|f| f.triangle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrItem {
    pub object_id: u16,
    pub room: i16,
    pub position: [i32; 3],
    pub angle: u16,
    /// Packed 15-bit colour, or 0xFFFF for untinted
    pub color: u16,
    pub ocb: i16,
    pub flags: u16,
    pub lua_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrAiItem {
    pub object_id: u16,
    pub room: u16,
    pub position: [i32; 3],
    pub ocb: i16,
    pub flags: u16,
    pub angle: i32,
}

/// Camera or sink entry; both share one table
#[derive(Debug, Clone, PartialEq)]
pub struct TrCamera {
    pub position: [i32; 3],
    /// Room index for cameras, strength for sinks
    pub room: i16,
    /// Fixed flag for cameras, box index for sinks
    pub flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrFlybyCamera {
    pub position: [i32; 3],
    pub direction: [i32; 3],
    pub sequence: u8,
    pub index: u8,
    pub fov: u16,
    pub roll: i16,
    pub timer: u16,
    pub speed: u16,
    pub flags: u16,
    pub room: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrSoundSource {
    pub position: [i32; 3],
    pub sound_id: u32,
    pub flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrBox {
    /// World sector bounds, inclusive min and exclusive max
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
    /// File orientation
    pub true_floor: i32,
    pub overlap_index: Option<u32>,
    pub blockable: bool,
    pub room: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrZones {
    /// Per box: ground zones for step sizes of 1, 2, 3 and 4 clicks, then fly
    pub normal: [Vec<u16>; 5],
    pub flipped: [Vec<u16>; 5],
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrMeshFace {
    pub indices: [u16; 4],
    pub texture: u32,
    pub double_sided: bool,
    pub shine: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrMesh {
    pub center: [i16; 3],
    pub radius: i32,
    pub vertices: Vec<[i16; 3]>,
    /// Either normals (one per vertex) or shades
    pub normals: Vec<[i16; 3]>,
    pub shades: Vec<i16>,
    pub quads: Vec<TrMeshFace>,
    pub triangles: Vec<TrMeshFace>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrAnimation {
    pub frame_offset: u32,
    pub frame_rate: u8,
    pub frame_size: u8,
    pub state_id: u16,
    /// 16.16 fixed point
    pub speed: i32,
    pub accel: i32,
    pub lateral_speed: i32,
    pub lateral_accel: i32,
    pub frame_start: u16,
    pub frame_end: u16,
    pub next_animation: u16,
    pub next_frame: u16,
    pub num_state_changes: u16,
    pub state_change_offset: u16,
    pub num_anim_commands: u16,
    pub anim_command: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrStateChange {
    pub state_id: u16,
    pub num_dispatches: u16,
    pub dispatch_offset: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrAnimDispatch {
    pub low: u16,
    pub high: u16,
    pub next_animation: u16,
    pub next_frame: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrMoveable {
    pub object_id: u32,
    pub num_meshes: u16,
    pub starting_mesh: u16,
    /// Index into the mesh tree array (in i32 units)
    pub mesh_tree: u32,
    /// Byte offset into frames
    pub frame_offset: u32,
    pub animation: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrStaticMesh {
    pub object_id: u32,
    pub mesh: u16,
    pub visibility_box: [i16; 6],
    pub collision_box: [i16; 6],
    pub flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrSpriteTexture {
    pub page: u16,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrSpriteSequence {
    pub object_id: i32,
    pub negative_length: i16,
    pub offset: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrSoundDetails {
    pub sample: u16,
    pub volume: u8,
    pub range: u8,
    pub chance: u8,
    pub pitch: u8,
    pub characteristics: u16,
}

/// Everything the writer needs, fully resolved
#[derive(Debug, Clone, Default)]
pub struct CompiledLevel {
    pub version: Option<GameVersion>,
    pub rooms: Vec<TrRoom>,
    pub floor_data: Vec<u16>,
    pub meshes: Vec<TrMesh>,
    pub animations: Vec<TrAnimation>,
    pub state_changes: Vec<TrStateChange>,
    pub anim_dispatches: Vec<TrAnimDispatch>,
    pub anim_commands: Vec<i16>,
    pub mesh_trees: Vec<i32>,
    pub frames: Vec<i16>,
    pub moveables: Vec<TrMoveable>,
    pub statics: Vec<TrStaticMesh>,
    pub object_textures: Vec<ObjectTexture>,
    pub sprite_textures: Vec<TrSpriteTexture>,
    pub sprite_sequences: Vec<TrSpriteSequence>,
    pub cameras: Vec<TrCamera>,
    pub flyby_cameras: Vec<TrFlybyCamera>,
    pub sound_sources: Vec<TrSoundSource>,
    pub boxes: Vec<TrBox>,
    pub overlaps: Vec<u16>,
    pub zones: TrZones,
    pub items: Vec<TrItem>,
    pub ai_items: Vec<TrAiItem>,
    pub sound_map: Vec<i16>,
    pub sound_details: Vec<TrSoundDetails>,
    pub samples: Vec<Vec<u8>>,
    pub sample_indices: Vec<u32>,
    pub texture_pages: Vec<TexturePage>,
    pub ng_demo_data: u16,
    pub trng_version: String,
    pub tr5_lara_type: u16,
    pub tr5_weather: u16,
}
