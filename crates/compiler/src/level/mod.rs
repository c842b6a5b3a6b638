// Editable level model
// Rooms, sectors, portals and placed objects as the editor stores them.
// The compiler only reads this model.

pub mod grid;
pub mod math;
pub mod objects;
pub mod portal;
pub mod texture;

use crate::version::GameVersion;
use crate::wad::{Wad, WadMoveable, WadSoundInfo, WadSpriteSequence, WadStatic};
use grid::{Direction, Sector, SectorGrid, SectorKind, SECTOR_SIZE};
use math::Vec3;
use objects::{ObjectArena, ObjectId, ObjectInstance, ObjectKind};
use portal::{Portal, PortalDirection};
use serde::{Deserialize, Serialize};
use texture::{TextureArea, TexturePage};

/// Slot index of a room in `Level::rooms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

/// Room flag bits as stored in the level file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomFlags(pub u16);

impl RoomFlags {
    pub const WATER: u16 = 0x0001;
    pub const SKYBOX: u16 = 0x0008;
    pub const WIND: u16 = 0x0020;
    pub const QUICKSAND: u16 = 0x0080;
    pub const NO_LENSFLARE: u16 = 0x0200;

    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }
}

fn default_ambient() -> Vec3 {
    Vec3::new(0.25, 0.25, 0.25)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub name: String,
    /// x and z in sectors, y in world units
    pub position: [i32; 3],
    pub sectors: SectorGrid,
    #[serde(default)]
    pub portals: Vec<Portal>,
    #[serde(default)]
    pub objects: Vec<ObjectId>,
    #[serde(default)]
    pub alternate_room: Option<RoomId>,
    #[serde(default)]
    pub alternate_base: Option<RoomId>,
    #[serde(default)]
    pub alternate_group: i16,
    #[serde(default)]
    pub flags: RoomFlags,
    #[serde(default = "default_ambient")]
    pub ambient: Vec3,
    #[serde(default)]
    pub reverb: u8,
    #[serde(default)]
    pub water_scheme: u8,
}

impl Room {
    /// Empty room with a flat floor at 0 and ceiling `height` above it, ringed by walls
    pub fn new(name: &str, num_x: usize, num_z: usize, position: [i32; 3], height: i32) -> Self {
        Room {
            name: name.to_string(),
            position,
            sectors: SectorGrid::new(num_x, num_z, Sector::new(SectorKind::Floor, 0, height)),
            portals: Vec::new(),
            objects: Vec::new(),
            alternate_room: None,
            alternate_base: None,
            alternate_group: 0,
            flags: RoomFlags::default(),
            ambient: default_ambient(),
            reverb: 0,
            water_scheme: 0,
        }
    }

    pub fn num_x(&self) -> usize {
        self.sectors.num_x()
    }

    pub fn num_z(&self) -> usize {
        self.sectors.num_z()
    }

    /// World position of the room origin
    pub fn world_position(&self) -> Vec3 {
        Vec3::new(
            (self.position[0] * SECTOR_SIZE) as f32,
            self.position[1] as f32,
            (self.position[2] * SECTOR_SIZE) as f32,
        )
    }

    pub fn is_alternate(&self) -> bool {
        self.alternate_base.is_some()
    }

    /// Has a flipped counterpart in either direction
    pub fn alternated(&self) -> bool {
        self.alternate_room.is_some() || self.alternate_base.is_some()
    }

    pub fn floor_portal_at(&self, x: i32, z: i32) -> Option<&Portal> {
        self.portals
            .iter()
            .find(|p| p.direction == PortalDirection::Floor && p.area.contains(x, z))
    }

    pub fn ceiling_portal_at(&self, x: i32, z: i32) -> Option<&Portal> {
        self.portals
            .iter()
            .find(|p| p.direction == PortalDirection::Ceiling && p.area.contains(x, z))
    }

    pub fn wall_portal_at(&self, x: i32, z: i32) -> Option<&Portal> {
        self.portals
            .iter()
            .find(|p| matches!(p.direction, PortalDirection::Wall(_)) && p.area.contains(x, z))
    }

    /// Lowest and highest height over every non-wall sector, for the room's vertical extent
    pub fn height_range(&self) -> (i32, i32) {
        let mut range: Option<(i32, i32)> = None;
        for (_, _, sector) in self.sectors.iter() {
            if sector.kind == SectorKind::BorderWall {
                continue;
            }
            let (lo, hi) = (sector.floor.min(), sector.ceiling.max());
            range = Some(match range {
                Some((a, b)) => (a.min(lo), b.max(hi)),
                None => (lo, hi),
            });
        }
        range.unwrap_or((0, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryMode {
    #[default]
    Modern,
    Legacy,
}

/// A WAD referenced by the level. `wad` is `None` when it could not be loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferencedWad {
    pub path: String,
    #[serde(default)]
    pub wad: Option<Wad>,
}

fn default_trng_version() -> String {
    "1.3.0.7".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSettings {
    pub game_version: GameVersion,
    #[serde(default)]
    pub geometry_mode: GeometryMode,
    #[serde(default)]
    pub wads: Vec<ReferencedWad>,
    #[serde(default)]
    pub textures: Vec<TexturePage>,
    /// Texture for faces without an override; untextured faces are skipped when unset
    #[serde(default)]
    pub default_texture: Option<TextureArea>,
    #[serde(default = "default_trng_version")]
    pub trng_version: String,
    /// Extended TRNG sound map size, stored in the demo data count
    #[serde(default)]
    pub ng_sound_map_size: u32,
    #[serde(default)]
    pub tr5_lara_type: u16,
    #[serde(default)]
    pub tr5_weather: u16,
}

impl LevelSettings {
    pub fn new(game_version: GameVersion) -> Self {
        LevelSettings {
            game_version,
            geometry_mode: GeometryMode::Modern,
            wads: Vec::new(),
            textures: Vec::new(),
            default_texture: None,
            trng_version: default_trng_version(),
            ng_sound_map_size: 0,
            tr5_lara_type: 0,
            tr5_weather: 0,
        }
    }

    pub fn loaded_wads(&self) -> impl Iterator<Item = &Wad> {
        self.wads.iter().filter_map(|w| w.wad.as_ref())
    }

    pub fn has_loaded_wad(&self) -> bool {
        self.loaded_wads().next().is_some()
    }

    /// First loaded WAD defining the moveable wins
    pub fn wad_moveable(&self, id: u32) -> Option<&WadMoveable> {
        self.loaded_wads().find_map(|w| w.moveables.get(&id))
    }

    pub fn wad_static(&self, id: u32) -> Option<&WadStatic> {
        self.loaded_wads().find_map(|w| w.statics.get(&id))
    }

    pub fn wad_sprite_sequence(&self, id: u32) -> Option<&WadSpriteSequence> {
        self.loaded_wads().find_map(|w| w.sprite_sequences.get(&id))
    }

    pub fn wad_sound(&self, id: u32) -> Option<&WadSoundInfo> {
        self.loaded_wads().find_map(|w| w.sounds.get(&id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub settings: LevelSettings,
    #[serde(default)]
    pub rooms: Vec<Option<Room>>,
    #[serde(default)]
    pub objects: ObjectArena,
}

impl Level {
    pub fn new(settings: LevelSettings) -> Self {
        Level {
            settings,
            rooms: Vec::new(),
            objects: ObjectArena::new(),
        }
    }

    pub fn add_room(&mut self, room: Room) -> RoomId {
        self.rooms.push(Some(room));
        RoomId((self.rooms.len() - 1) as u32)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Existing rooms in slot order
    pub fn existing_rooms(&self) -> impl Iterator<Item = (RoomId, &Room)> {
        self.rooms
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (RoomId(i as u32), r)))
    }

    /// Place an object in a room. Returns None when the room does not exist.
    pub fn add_object(&mut self, room: RoomId, position: Vec3, kind: ObjectKind) -> Option<ObjectId> {
        self.room(room)?;
        let id = self.objects.insert(ObjectInstance { room, position, kind });
        self.room_mut(room)?.objects.push(id);
        Some(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&ObjectInstance> {
        self.objects.get(id)
    }

    /// Objects of a room in placement order, skipping dangling handles
    pub fn room_objects<'a>(&'a self, room: &'a Room) -> impl Iterator<Item = (ObjectId, &'a ObjectInstance)> + 'a {
        room.objects
            .iter()
            .filter_map(move |&id| self.objects.get(id).map(|o| (id, o)))
    }

    /// Connect two rooms through a floor/ceiling portal pair over `area` (in `below`'s
    /// coordinates). The matching area in `above` is derived from the room positions.
    pub fn connect_vertically(&mut self, below: RoomId, above: RoomId, area: portal::SectorArea) -> Option<()> {
        let (dx, dz) = {
            let (b, a) = (self.room(below)?, self.room(above)?);
            (b.position[0] - a.position[0], b.position[2] - a.position[2])
        };
        let above_area = portal::SectorArea::new(area.x0 + dx, area.z0 + dz, area.x1 + dx, area.z1 + dz);

        self.room_mut(below)?.portals.push(Portal {
            adjoining_room: above,
            direction: PortalDirection::Ceiling,
            area,
            opacity: portal::PortalOpacity::None,
        });
        self.room_mut(above)?.portals.push(Portal {
            adjoining_room: below,
            direction: PortalDirection::Floor,
            area: above_area,
            opacity: portal::PortalOpacity::None,
        });
        Some(())
    }

    /// Connect two rooms through wall portals. `area` is the border column/row of `from`
    /// on side `direction`. Connected rooms overlap by two sectors: each room's portal
    /// border lies over the other room's first inner sectors.
    pub fn connect_horizontally(
        &mut self,
        from: RoomId,
        to: RoomId,
        direction: Direction,
        area: portal::SectorArea,
    ) -> Option<()> {
        let (dx, dz) = {
            let (f, t) = (self.room(from)?, self.room(to)?);
            (f.position[0] - t.position[0], f.position[2] - t.position[2])
        };
        let (ox, oz) = direction.offset();
        let to_area = portal::SectorArea::new(
            area.x0 + dx - ox,
            area.z0 + dz - oz,
            area.x1 + dx - ox,
            area.z1 + dz - oz,
        );

        self.room_mut(from)?.portals.push(Portal {
            adjoining_room: to,
            direction: PortalDirection::Wall(direction),
            area,
            opacity: portal::PortalOpacity::None,
        });
        self.room_mut(to)?.portals.push(Portal {
            adjoining_room: from,
            direction: PortalDirection::Wall(direction.opposite()),
            area: to_area,
            opacity: portal::PortalOpacity::None,
        });
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objects::MoveableInstance;

    #[test]
    fn test_add_object_links_room() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let room = level.add_room(Room::new("Room 0", 4, 4, [0, 0, 0], 1024));
        let id = level
            .add_object(room, Vec3::new(1536.0, 0.0, 1536.0), ObjectKind::Moveable(MoveableInstance::new(0)))
            .unwrap();
        assert_eq!(level.room(room).unwrap().objects, vec![id]);
        assert_eq!(level.object(id).unwrap().room, room);
        assert!(level.add_object(RoomId(9), Vec3::ZERO, ObjectKind::Sink(Default::default())).is_none());
    }

    #[test]
    fn test_vertical_connection_areas() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let below = level.add_room(Room::new("below", 5, 5, [0, 0, 0], 1024));
        let above = level.add_room(Room::new("above", 5, 5, [1, 1024, 1], 1024));
        level.connect_vertically(below, above, portal::SectorArea::new(2, 2, 3, 3)).unwrap();

        let b = level.room(below).unwrap();
        assert_eq!(b.ceiling_portal_at(2, 2).unwrap().adjoining_room, above);
        assert!(b.floor_portal_at(2, 2).is_none());
        let a = level.room(above).unwrap();
        assert_eq!(a.floor_portal_at(1, 1).unwrap().adjoining_room, below);
        assert!(a.floor_portal_at(3, 3).is_none());
    }

    #[test]
    fn test_horizontal_connection_areas() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let west = level.add_room(Room::new("west", 4, 4, [0, 0, 0], 1024));
        let east = level.add_room(Room::new("east", 4, 4, [2, 0, 0], 1024));
        // West border column x = 3 lies over east x = 1; east border x = 0 over west x = 2
        level
            .connect_horizontally(west, east, Direction::PositiveX, portal::SectorArea::new(3, 1, 3, 2))
            .unwrap();
        let e = level.room(east).unwrap();
        let portal = e.wall_portal_at(0, 1).unwrap();
        assert!(e.wall_portal_at(1, 1).is_none());
        assert_eq!(portal.adjoining_room, west);
        assert_eq!(portal.direction, PortalDirection::Wall(Direction::NegativeX));
    }

    #[test]
    fn test_height_range_ignores_border() {
        let mut room = Room::new("r", 3, 3, [0, 0, 0], 2048);
        room.sectors.get_mut(1, 1).unwrap().floor.corners = [-256, 0, 0, 0];
        assert_eq!(room.height_range(), (-256, 2048));
    }
}
