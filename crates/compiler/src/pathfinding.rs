// Pathfinding data
//
// Boxes are rectangles of walkable sectors with one floor height. Overlaps list, for
// each box, the boxes touching it in the same room or in a room reachable through
// portals. Zones group boxes that a creature with a given step height (or a flyer)
// can travel between.

use crate::compiled::{TrBox, TrZones};
use crate::error::Result;
use crate::geometry::reachability::find_bottom_floor;
use crate::level::grid::{SectorFlags, SectorKind};
use crate::level::{Level, Room, RoomId};
use crate::numeric::Checked;
use crate::progress::CancellationToken;
use crate::remap::IndexTable;
use std::collections::{BTreeMap, HashSet};

/// Ground zone step heights in world units: one to four clicks
pub const GROUND_STEPS: [i32; 4] = [256, 512, 768, 1024];

/// Last overlap entry of a box
pub const OVERLAP_END: u16 = 0x8000;

#[derive(Debug, Default)]
pub struct Pathfinding {
    pub boxes: Vec<TrBox>,
    pub overlaps: Vec<u16>,
    pub zones: TrZones,
    box_rooms: Vec<RoomId>,
    /// Box per sector, same layout as the room's sector grid
    sector_boxes: BTreeMap<RoomId, (usize, Vec<Option<u32>>)>,
}

impl Pathfinding {
    /// Box covering sector (x, z) of `room`
    pub fn box_at(&self, room: RoomId, x: i32, z: i32) -> Option<u32> {
        let (num_z, boxes) = self.sector_boxes.get(&room)?;
        if x < 0 || z < 0 || z as usize >= *num_z {
            return None;
        }
        boxes.get(x as usize * num_z + z as usize).copied().flatten()
    }

    /// Box under sector (x, z) after falling through floor portals
    pub fn box_under(&self, level: &Level, room: RoomId, x: i32, z: i32) -> Option<u32> {
        let (bottom, bx, bz) = find_bottom_floor(level, room, x, z)?;
        self.box_at(bottom, bx, bz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoxKey {
    height: i32,
    blockable: bool,
}

/// Sectors that can hold a box, with their merge key
fn box_key(room: &Room, x: i32, z: i32) -> Option<BoxKey> {
    let sector = room.sectors.get(x, z)?;
    if sector.kind != SectorKind::Floor
        || sector.flags.contains(SectorFlags::NOT_WALKABLE_FLOOR)
        || room.wall_portal_at(x, z).is_some()
        || room.floor_portal_at(x, z).is_some_and(|p| p.is_traversable())
    {
        return None;
    }
    Some(BoxKey {
        height: room.position[1] + sector.floor.max(),
        blockable: sector.flags.contains(SectorFlags::BOX),
    })
}

impl Pathfinding {
    fn add_room_boxes(&mut self, id: RoomId, room: &Room, room_index: u32) {
        let (num_x, num_z) = (room.num_x() as i32, room.num_z() as i32);
        let mut assigned: Vec<Option<u32>> = vec![None; room.num_x() * room.num_z()];
        let slot = |x: i32, z: i32| (x * num_z + z) as usize;

        for x in 0..num_x {
            for z in 0..num_z {
                if assigned[slot(x, z)].is_some() {
                    continue;
                }
                let Some(key) = box_key(room, x, z) else {
                    continue;
                };
                let joins = |assigned: &[Option<u32>], x: i32, z: i32| {
                    assigned[slot(x, z)].is_none() && box_key(room, x, z) == Some(key)
                };

                let mut z1 = z;
                while z1 + 1 < num_z && joins(&assigned, x, z1 + 1) {
                    z1 += 1;
                }
                let mut x1 = x;
                while x1 + 1 < num_x && (z..=z1).all(|zz| joins(&assigned, x1 + 1, zz)) {
                    x1 += 1;
                }

                let index = self.boxes.len() as u32;
                for bx in x..=x1 {
                    for bz in z..=z1 {
                        assigned[slot(bx, bz)] = Some(index);
                    }
                }
                self.boxes.push(TrBox {
                    x_min: room.position[0] + x,
                    x_max: room.position[0] + x1 + 1,
                    z_min: room.position[2] + z,
                    z_max: room.position[2] + z1 + 1,
                    true_floor: -key.height,
                    overlap_index: None,
                    blockable: key.blockable,
                    room: room_index,
                });
                self.box_rooms.push(id);
            }
        }

        self.sector_boxes.insert(id, (room.num_z(), assigned));
    }

    fn touching(a: &TrBox, b: &TrBox, same_room: bool) -> bool {
        let x_overlap = a.x_min < b.x_max && b.x_min < a.x_max;
        let z_overlap = a.z_min < b.z_max && b.z_min < a.z_max;
        let x_adjacent = a.x_max == b.x_min || b.x_max == a.x_min;
        let z_adjacent = a.z_max == b.z_min || b.z_max == a.z_min;
        (x_overlap && z_adjacent) || (z_overlap && x_adjacent) || (!same_room && x_overlap && z_overlap)
    }

    fn build_overlaps(&mut self, reachable: &BTreeMap<RoomId, Vec<RoomId>>) -> Result<Vec<Vec<usize>>> {
        let reachable: BTreeMap<RoomId, HashSet<RoomId>> = reachable
            .iter()
            .map(|(room, list)| (*room, list.iter().copied().collect()))
            .collect();
        let mut neighbours = vec![Vec::new(); self.boxes.len()];

        for a in 0..self.boxes.len() {
            let room_a = self.box_rooms[a];
            for b in 0..self.boxes.len() {
                if a == b {
                    continue;
                }
                let room_b = self.box_rooms[b];
                let same_room = room_a == room_b;
                let connected = same_room || reachable.get(&room_a).is_some_and(|r| r.contains(&room_b));
                if connected && Self::touching(&self.boxes[a], &self.boxes[b], same_room) {
                    neighbours[a].push(b);
                }
            }

            if neighbours[a].is_empty() {
                continue;
            }
            self.boxes[a].overlap_index = Some(self.overlaps.len() as u32);
            let last = neighbours[a].len() - 1;
            for (i, &b) in neighbours[a].iter().enumerate() {
                let entry = Checked::<i16>::new("overlap box index", b as i64)?.get() as u16;
                self.overlaps.push(if i == last { entry | OVERLAP_END } else { entry });
            }
        }

        Ok(neighbours)
    }

    /// Connected components over the overlap graph, numbered in box order.
    /// `passable` filters edges, `isolated` boxes get a zone of their own.
    fn zone_ids(
        &self,
        neighbours: &[Vec<usize>],
        passable: impl Fn(usize, usize) -> bool,
        isolated: impl Fn(usize) -> bool,
    ) -> Vec<u16> {
        let mut zones: Vec<Option<u16>> = vec![None; self.boxes.len()];
        let mut next: u16 = 0;

        for start in 0..self.boxes.len() {
            if zones[start].is_some() {
                continue;
            }
            zones[start] = Some(next);
            let mut pending = vec![start];
            while let Some(a) = pending.pop() {
                if isolated(a) {
                    continue;
                }
                for &b in &neighbours[a] {
                    if zones[b].is_none() && !isolated(b) && passable(a, b) {
                        zones[b] = Some(next);
                        pending.push(b);
                    }
                }
            }
            next = next.wrapping_add(1);
        }

        zones.into_iter().map(|z| z.unwrap_or(0)).collect()
    }

    fn build_zones(&mut self, level: &Level, neighbours: &[Vec<usize>]) {
        let this: &Self = &*self;
        let is_alternate = |i: usize| level.room(this.box_rooms[i]).is_some_and(|r| r.is_alternate());
        let has_alternate = |i: usize| level.room(this.box_rooms[i]).is_some_and(|r| r.alternate_room.is_some());
        let step = |limit: i32| move |a: usize, b: usize| (this.boxes[a].true_floor - this.boxes[b].true_floor).abs() <= limit;

        let mut zones = TrZones::default();
        for (slot, limit) in GROUND_STEPS.iter().enumerate() {
            zones.normal[slot] = this.zone_ids(neighbours, step(*limit), is_alternate);
            zones.flipped[slot] = this.zone_ids(neighbours, step(*limit), has_alternate);
        }
        zones.normal[4] = this.zone_ids(neighbours, |_, _| true, is_alternate);
        zones.flipped[4] = this.zone_ids(neighbours, |_, _| true, has_alternate);
        self.zones = zones;
    }
}

/// Boxes, overlaps and zones for the whole level
pub(crate) fn build(
    level: &Level,
    rooms: &IndexTable<RoomId>,
    reachable: &BTreeMap<RoomId, Vec<RoomId>>,
    cancel: &CancellationToken,
) -> Result<Pathfinding> {
    let mut result = Pathfinding::default();

    for (id, room) in level.existing_rooms() {
        cancel.check()?;
        let room_index = rooms.resolve("room", id)?;
        result.add_room_boxes(id, room, room_index);
    }

    cancel.check()?;
    let neighbours = result.build_overlaps(reachable)?;
    result.build_zones(level, &neighbours);

    tracing::debug!(
        "Pathfinding: {} boxes, {} overlaps",
        result.boxes.len(),
        result.overlaps.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::reachability::reachable_rooms;
    use crate::level::grid::{Direction, SectorSurface};
    use crate::level::portal::SectorArea;
    use crate::level::LevelSettings;
    use crate::remap::room_table;
    use crate::version::GameVersion;

    fn compute(level: &Level) -> Pathfinding {
        build(level, &room_table(level), &reachable_rooms(level), &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_flat_room_is_one_box() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let room = level.add_room(Room::new("r", 4, 4, [3, -512, 5], 1024));
        let result = compute(&level);

        assert_eq!(result.boxes.len(), 1);
        let b = &result.boxes[0];
        assert_eq!((b.x_min, b.x_max, b.z_min, b.z_max), (4, 6, 6, 8));
        assert_eq!(b.true_floor, 512);
        assert_eq!(b.overlap_index, None);
        assert_eq!(result.box_at(room, 2, 2), Some(0));
        assert_eq!(result.box_at(room, 0, 0), None);
    }

    #[test]
    fn test_steps_split_boxes_and_zones() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let mut room = Room::new("r", 5, 3, [0, 0, 0], 4096);
        room.sectors.get_mut(3, 1).unwrap().floor = SectorSurface::flat(768);
        let id = level.add_room(room);
        let result = compute(&level);

        assert_eq!(result.boxes.len(), 2);
        assert_eq!(result.box_at(id, 1, 1), result.box_at(id, 2, 1));
        assert_eq!(result.overlaps, vec![1 | OVERLAP_END, OVERLAP_END]);

        let zones = &result.zones.normal;
        assert_ne!(zones[0][0], zones[0][1]);
        assert_ne!(zones[1][0], zones[1][1]);
        assert_eq!(zones[2][0], zones[2][1]);
        assert_eq!(zones[4][0], zones[4][1]);
    }

    #[test]
    fn test_portal_connected_rooms_overlap() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let west = level.add_room(Room::new("west", 4, 4, [0, 0, 0], 1024));
        let east = level.add_room(Room::new("east", 4, 4, [2, 0, 0], 1024));
        level
            .connect_horizontally(west, east, Direction::PositiveX, SectorArea::new(3, 1, 3, 2))
            .unwrap();
        let unrelated = level.add_room(Room::new("far", 4, 4, [0, 0, 2], 1024));
        let result = compute(&level);

        assert_eq!(result.boxes.len(), 3);
        let west_box = result.box_at(west, 1, 1).unwrap() as usize;
        let east_box = result.box_at(east, 1, 1).unwrap();
        let start = result.boxes[west_box].overlap_index.unwrap() as usize;
        assert_eq!(result.overlaps[start], east_box as u16 | OVERLAP_END);
        // Touching but not reachable
        assert!(result.box_at(unrelated, 1, 1).is_some());
    }

    #[test]
    fn test_floor_portal_sectors_fall_through() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let below = level.add_room(Room::new("below", 3, 3, [0, 0, 0], 1024));
        let above = level.add_room(Room::new("above", 3, 3, [0, 1024, 0], 1024));
        level.connect_vertically(below, above, SectorArea::single(1, 1)).unwrap();
        let result = compute(&level);

        assert_eq!(result.box_at(above, 1, 1), None);
        assert_eq!(result.box_under(&level, above, 1, 1), result.box_at(below, 1, 1));
    }
}
