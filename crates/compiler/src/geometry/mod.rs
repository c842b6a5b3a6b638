// Geometry derivation
// Sector side faces, room meshes and portal reachability.

pub mod builder;
pub mod face;
pub mod legacy;
pub mod reachability;
pub mod wall;

pub use builder::{build_room, build_rooms, sector_faces, RoomFace, RoomGeometry};
pub use face::{FaceShape, SectorFace, SectorFaceIdentifier, WallPart, WallSplit};
pub use wall::{SectorWall, WallEnd};
