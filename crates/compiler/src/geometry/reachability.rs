// Portal reachability
// Which rooms can be reached from a room through its portals, and where a sector
// ends up when falling through floor portals.

use crate::level::portal::PortalDirection;
use crate::level::{Level, RoomId};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
struct Visited {
    order: Vec<RoomId>,
    seen: HashSet<RoomId>,
}

impl Visited {
    /// False when the room was already present
    fn add(&mut self, room: RoomId) -> bool {
        if self.seen.insert(room) {
            self.order.push(room);
            true
        } else {
            false
        }
    }
}

/// Walk vertically from `start`: side portals of every visited room are added without
/// descending into them, vertical portals are followed.
fn walk(level: &Level, start: RoomId, vertical: PortalDirection, visited: &mut Visited) {
    let mut pending = vec![start];

    while let Some(current) = pending.pop() {
        let Some(room) = level.room(current) else {
            continue;
        };

        for portal in &room.portals {
            if matches!(portal.direction, PortalDirection::Wall(_)) {
                visited.add(portal.adjoining_room);
            }
        }

        // Reverse so rooms are visited in portal order
        for portal in room.portals.iter().rev() {
            if portal.direction == vertical && visited.add(portal.adjoining_room) {
                pending.push(portal.adjoining_room);
            }
        }
    }
}

/// Rooms reachable from `room` by going up and down its portal stack
pub fn reachable_from(level: &Level, room: RoomId) -> Vec<RoomId> {
    let mut visited = Visited::default();
    walk(level, room, PortalDirection::Ceiling, &mut visited);
    walk(level, room, PortalDirection::Floor, &mut visited);
    visited.order
}

/// Reachable rooms for every existing room
pub fn reachable_rooms(level: &Level) -> BTreeMap<RoomId, Vec<RoomId>> {
    level
        .existing_rooms()
        .map(|(id, _)| (id, reachable_from(level, id)))
        .collect()
}

/// Follow traversable floor portals down from sector (x, z) of `room`. Returns the
/// room and sector where the descent stops. The walk is bounded by the room count.
pub fn find_bottom_floor(level: &Level, room: RoomId, x: i32, z: i32) -> Option<(RoomId, i32, i32)> {
    let (mut current, mut x, mut z) = (room, x, z);
    level.room(current)?.sectors.get(x, z)?;

    for _ in 0..=level.rooms.len() {
        let Some(owner) = level.room(current) else {
            break;
        };
        let Some(portal) = owner.floor_portal_at(x, z).filter(|p| p.is_traversable()) else {
            break;
        };
        let Some(below) = level.room(portal.adjoining_room) else {
            break;
        };

        let nx = x + owner.position[0] - below.position[0];
        let nz = z + owner.position[2] - below.position[2];
        match below.sectors.get(nx, nz) {
            Some(sector) if !sector.is_any_wall() => {
                current = portal.adjoining_room;
                x = nx;
                z = nz;
            }
            _ => break,
        }
    }

    Some((current, x, z))
}

/// Absolute height of the lowest floor corner under sector (x, z), after descending
pub fn lowest_floor(level: &Level, room: RoomId, x: i32, z: i32) -> Option<i32> {
    let (bottom, bx, bz) = find_bottom_floor(level, room, x, z)?;
    let owner = level.room(bottom)?;
    owner.sectors.get(bx, bz).map(|s| owner.position[1] + s.floor.min())
}
