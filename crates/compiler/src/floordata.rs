// Floor data
//
// Each sector may own a run of 16-bit floor data words. A run is a list of entries;
// every entry starts with a header word (function in bits 0-4, subfunction in bits
// 8-12) and the header of the last entry carries the end bit. Word 0 of the array is
// a dummy so that index 0 means "no floor data".

use crate::error::Result;
use crate::level::grid::{Corner, DiagonalSplit, Sector, SectorFlags, SectorSurface, CLICK};
use crate::level::objects::{ObjectKind, TriggerInstance, TriggerTargetType};
use crate::level::{Level, Room, RoomId};
use crate::numeric::{checked_u16, Clamped};
use crate::progress::{CancellationToken, Diagnostics};
use crate::remap::{IndexTable, ObjectRemap};
use crate::version::GameVersion;
use std::collections::BTreeMap;

pub const END_BIT: u16 = 0x8000;

/// Floor data function codes
pub mod function {
    pub const PORTAL: u16 = 1;
    pub const FLOOR_SLANT: u16 = 2;
    pub const CEILING_SLANT: u16 = 3;
    pub const TRIGGER: u16 = 4;
    pub const DEATH: u16 = 5;
    pub const CLIMB: u16 = 6;
    pub const FLOOR_TRIANGLE_NWSE: u16 = 7;
    pub const FLOOR_TRIANGLE_NESW: u16 = 8;
    pub const CEILING_TRIANGLE_NWSE: u16 = 9;
    pub const CEILING_TRIANGLE_NESW: u16 = 10;
    pub const MONKEY: u16 = 19;
}

fn header(function: u16, subfunction: u16) -> u16 {
    (function & 0x1F) | ((subfunction & 0x1F) << 8)
}

/// Floor data of the whole level plus the run index of every sector
#[derive(Debug, Default)]
pub struct FloorData {
    pub words: Vec<u16>,
    sector_indices: BTreeMap<RoomId, Vec<u32>>,
}

impl FloorData {
    /// Index of the first word of the sector's run, 0 when it has none
    pub fn index_at(&self, room: RoomId, level: &Level, x: i32, z: i32) -> u32 {
        let Some(slot) = level.room(room).and_then(|r| r.sectors.index(x, z)) else {
            return 0;
        };
        self.sector_indices
            .get(&room)
            .and_then(|indices| indices.get(slot))
            .copied()
            .unwrap_or(0)
    }
}

pub(crate) struct FloorDataContext<'a> {
    pub level: &'a Level,
    pub rooms: &'a IndexTable<RoomId>,
    pub remap: &'a ObjectRemap,
    pub diagnostics: &'a Diagnostics<'a>,
    pub cancel: &'a CancellationToken,
}

/// One function entry: header word followed by its data words
type Entry = Vec<u16>;

impl FloorDataContext<'_> {
    fn version(&self) -> GameVersion {
        self.level.settings.game_version
    }

    fn sector_entries(&self, room: &Room, triggers: &[&TriggerInstance], x: i32, z: i32, sector: &Sector) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();

        if let Some(portal) = room.wall_portal_at(x, z) {
            let target = self.rooms.resolve("portal room", portal.adjoining_room)?;
            entries.push(vec![header(function::PORTAL, 0), checked_u16("portal room", target)?]);
        }

        if !sector.is_any_wall() || sector.is_diagonal_wall() {
            entries.extend(self.surface_entry(&sector.floor, false));
            entries.extend(self.surface_entry(&sector.ceiling, true));
        }

        if sector.flags.contains(SectorFlags::DEATH_FIRE) {
            entries.push(vec![header(function::DEATH, 0)]);
        }
        let climb = sector.flags.0 & SectorFlags::CLIMB_ANY;
        if climb != 0 && self.version() >= GameVersion::Tr2 {
            entries.push(vec![header(function::CLIMB, climb)]);
        }
        if sector.flags.contains(SectorFlags::MONKEY) && self.version() >= GameVersion::Tr3 {
            entries.push(vec![header(function::MONKEY, 0)]);
        }

        if let Some(entry) = self.trigger_entry(room, triggers)? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Slant for planar surfaces, triangulation for split ones (TR3 and later)
    fn surface_entry(&self, surface: &SectorSurface, ceiling: bool) -> Option<Entry> {
        if surface.is_flat() && !surface.diagonal_split.is_some() {
            return None;
        }

        if surface.is_planar() && !surface.diagonal_split.is_some() {
            let clicks = |from: Corner, to: Corner| {
                Clamped::<i8>::from_f64((surface.corner(from) - surface.corner(to)) as f64 / CLICK as f64).get()
            };
            let x_slope = clicks(Corner::XnZp, Corner::XpZp);
            let z_slope = clicks(Corner::XnZn, Corner::XnZp);
            let function = if ceiling { function::CEILING_SLANT } else { function::FLOOR_SLANT };
            return Some(vec![header(function, 0), ((z_slope as u8 as u16) << 8) | x_slope as u8 as u16]);
        }

        if self.version() < GameVersion::Tr3 {
            return None;
        }

        let north_east = matches!(
            surface.diagonal_split,
            DiagonalSplit::None | DiagonalSplit::XnZp | DiagonalSplit::XpZn
        );
        let function = match (ceiling, north_east) {
            (false, true) => function::FLOOR_TRIANGLE_NESW,
            (false, false) => function::FLOOR_TRIANGLE_NWSE,
            (true, true) => function::CEILING_TRIANGLE_NESW,
            (true, false) => function::CEILING_TRIANGLE_NWSE,
        };

        // Corner depth below the highest corner, one nibble each
        let top = surface.max();
        let mut data = 0u16;
        for (shift, corner) in [Corner::XnZn, Corner::XpZn, Corner::XpZp, Corner::XnZp].into_iter().enumerate() {
            let depth = Clamped::<u8>::from_i64(((top - surface.corner(corner)) / CLICK) as i64).get().min(15);
            data |= (depth as u16) << (shift * 4);
        }
        Some(vec![header(function, 0), data])
    }

    /// All triggers on one sector merge into a single entry; key-style triggers lead
    /// so their activating item is the first action
    fn trigger_entry(&self, room: &Room, triggers: &[&TriggerInstance]) -> Result<Option<Entry>> {
        let version = self.version();
        let mut supported: Vec<&TriggerInstance> = Vec::new();
        for trigger in triggers {
            if trigger.trigger_type.min_version() > version {
                self.diagnostics.warn(&format!(
                    "Trigger type {:?} in room '{}' is not supported by {} and was skipped.",
                    trigger.trigger_type, room.name, version
                ));
                continue;
            }
            supported.push(trigger);
        }
        supported.sort_by_key(|t| !t.trigger_type.has_key_item());

        let Some(first) = supported.first() else {
            return Ok(None);
        };

        let mut actions: Vec<u16> = Vec::new();
        for trigger in &supported {
            if trigger.target_type.min_version() > version {
                self.diagnostics.warn(&format!(
                    "Trigger action {:?} in room '{}' is not supported by {} and was skipped.",
                    trigger.target_type, room.name, version
                ));
                continue;
            }
            let Some(parameter) = self.remap.resolve_trigger_target(trigger) else {
                self.diagnostics.warn(&format!(
                    "Trigger target {:?} of a {:?} action in room '{}' could not be resolved; the action was skipped.",
                    trigger.target, trigger.target_type, room.name
                ));
                continue;
            };

            actions.push((trigger.target_type.code() << 10) | parameter);
            if trigger.target_type == TriggerTargetType::Camera {
                let timer = Clamped::<u8>::from_i64(trigger.extra.into()).get() as u16;
                actions.push(timer | if trigger.one_shot { 0x100 } else { 0 });
            }
        }

        let Some(last) = actions.last_mut() else {
            return Ok(None);
        };
        *last |= END_BIT;

        let setup = (first.timer as u8 as u16)
            | if first.one_shot { 0x100 } else { 0 }
            | ((first.code_bits as u16 & 0x1F) << 9);
        let mut entry = vec![header(function::TRIGGER, first.trigger_type.code()), setup];
        entry.extend(actions);
        Ok(Some(entry))
    }

    fn add_room(&self, data: &mut FloorData, id: RoomId, room: &Room) -> Result<()> {
        let triggers: Vec<&TriggerInstance> = self
            .level
            .room_objects(room)
            .filter_map(|(_, object)| match &object.kind {
                ObjectKind::Trigger(trigger) => Some(trigger),
                _ => None,
            })
            .collect();

        let mut indices = vec![0u32; room.num_x() * room.num_z()];
        for (x, z, sector) in room.sectors.iter() {
            let here: Vec<&TriggerInstance> = triggers.iter().copied().filter(|t| t.area.contains(x, z)).collect();
            let mut entries = self.sector_entries(room, &here, x, z, sector)?;
            let Some(last) = entries.last_mut() else {
                continue;
            };
            last[0] |= END_BIT;

            if let Some(slot) = room.sectors.index(x, z) {
                indices[slot] = data.words.len() as u32;
            }
            data.words.extend(entries.into_iter().flatten());
        }

        data.sector_indices.insert(id, indices);
        Ok(())
    }
}

pub(crate) fn build(ctx: &FloorDataContext) -> Result<FloorData> {
    let mut data = FloorData {
        words: vec![0],
        sector_indices: BTreeMap::new(),
    };

    for (id, room) in ctx.level.existing_rooms() {
        ctx.cancel.check()?;
        ctx.add_room(&mut data, id, room)?;
    }

    tracing::debug!("Floor data: {} words", data.words.len());
    Ok(data)
}
