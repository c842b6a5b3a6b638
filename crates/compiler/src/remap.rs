// Index remapping
//
// Every object category that the file references by number gets a dense table built
// once per compile. Tables are filled in a single pass over rooms in slot order and
// objects in placement order; nothing is renumbered afterwards.

use crate::catalog::Catalog;
use crate::compiled::{TrAiItem, TrCamera, TrFlybyCamera, TrItem, TrRoomStatic, TrSoundSource};
use crate::error::{unresolved, Result};
use crate::level::grid::SECTOR_SIZE;
use crate::level::math::Vec3;
use crate::level::objects::{
    ObjectId, ObjectInstance, ObjectKind, SoundSourcePlayMode, TriggerInstance, TriggerTarget, TriggerTargetType,
};
use crate::level::{Level, Room, RoomId};
use crate::limits::Limits;
use crate::numeric::{angle_to_u16, checked_i16, checked_u16, fov_to_u16, roll_to_i16, round_coord, speed_to_u16, Clamped};
use crate::progress::{CancellationToken, Diagnostics};
use std::collections::{BTreeMap, BTreeSet};

/// Dense key to index mapping; indices follow insertion order
#[derive(Debug, Clone)]
pub struct IndexTable<K: Ord + Copy> {
    map: BTreeMap<K, u32>,
    order: Vec<K>,
}

impl<K: Ord + Copy> Default for IndexTable<K> {
    fn default() -> Self {
        IndexTable {
            map: BTreeMap::new(),
            order: Vec::new(),
        }
    }
}

impl<K: Ord + Copy + std::fmt::Debug> IndexTable<K> {
    pub fn get(&self, key: K) -> Option<u32> {
        self.map.get(&key).copied()
    }

    /// Index of a key that must have been mapped; a miss is an internal error
    pub fn resolve(&self, what: &str, key: K) -> Result<u32> {
        self.get(key).ok_or_else(|| unresolved(what, format!("{key:?}")))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in index order
    pub fn keys(&self) -> &[K] {
        &self.order
    }
}

impl<K: Ord + Copy> FromIterator<K> for IndexTable<K> {
    /// Duplicate keys keep their first index
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut table = IndexTable::default();
        for key in iter {
            if !table.map.contains_key(&key) {
                table.map.insert(key, table.order.len() as u32);
                table.order.push(key);
            }
        }
        table
    }
}

/// Dense room numbering over the existing room slots
pub fn room_table(level: &Level) -> IndexTable<RoomId> {
    level.existing_rooms().map(|(id, _)| id).collect()
}

/// Absolute file position of an object: world units, y down
pub fn file_position(room: &Room, position: Vec3) -> [i32; 3] {
    let world = room.world_position() + position;
    [round_coord(world.x), -round_coord(world.y), round_coord(world.z)]
}

fn pack_color(color: Vec3) -> u16 {
    if color == Vec3::new(1.0, 1.0, 1.0) {
        return 0xFFFF;
    }
    let channel = |c: f32| Clamped::<u8>::from_f64(c as f64 * 16.0).get().min(31) as u16;
    (channel(color.x) << 10) | (channel(color.y) << 5) | channel(color.z)
}

/// The object tables and their compiled records
#[derive(Debug, Default)]
pub struct ObjectRemap {
    pub items: IndexTable<ObjectId>,
    pub ai_items: IndexTable<ObjectId>,
    pub cameras: IndexTable<ObjectId>,
    pub flyby_cameras: IndexTable<ObjectId>,
    pub sound_sources: IndexTable<ObjectId>,
    pub statics: IndexTable<ObjectId>,
    /// Flyby sequence number per flyby object
    flyby_sequences: BTreeMap<ObjectId, u8>,

    pub compiled_items: Vec<TrItem>,
    pub compiled_ai_items: Vec<TrAiItem>,
    pub compiled_cameras: Vec<TrCamera>,
    pub compiled_flyby_cameras: Vec<TrFlybyCamera>,
    pub compiled_sound_sources: Vec<TrSoundSource>,
    pub room_statics: BTreeMap<RoomId, Vec<TrRoomStatic>>,
}

pub(crate) struct RemapContext<'a> {
    pub level: &'a Level,
    pub catalog: &'a Catalog,
    pub rooms: &'a IndexTable<RoomId>,
    pub limits: &'a Limits,
    pub diagnostics: &'a Diagnostics<'a>,
    pub cancel: &'a CancellationToken,
}

impl RemapContext<'_> {
    fn objects(&self) -> impl Iterator<Item = (&Room, ObjectId, &ObjectInstance)> {
        self.level
            .existing_rooms()
            .flat_map(move |(_, room)| self.level.room_objects(room).map(move |(id, o)| (room, id, o)))
    }
}

impl ObjectRemap {
    /// Build every table. `box_at` finds the pathfinding box under a sector.
    pub(crate) fn build(ctx: &RemapContext, box_at: &dyn Fn(RoomId, i32, i32) -> Option<u32>) -> Result<Self> {
        let mut remap = ObjectRemap::default();
        remap.build_items(ctx)?;
        ctx.cancel.check()?;
        remap.build_cameras(ctx, box_at)?;
        remap.build_flyby_cameras(ctx)?;
        remap.build_sound_sources(ctx)?;
        remap.build_statics(ctx)?;
        ctx.cancel.check()?;
        Ok(remap)
    }

    fn build_items(&mut self, ctx: &RemapContext) -> Result<()> {
        let settings = &ctx.level.settings;
        let version = settings.game_version;
        let mut items = Vec::new();
        let mut ai = Vec::new();

        for (room, id, object) in ctx.objects() {
            let ObjectKind::Moveable(moveable) = &object.kind else {
                continue;
            };
            if settings.wad_moveable(moveable.wad_object_id).is_none() {
                ctx.diagnostics.warn(&format!(
                    "Moveable '{}' in room '{}' was not found in any loaded WAD and was skipped.",
                    ctx.catalog.moveable_name(version, moveable.wad_object_id),
                    room.name
                ));
                continue;
            }

            let room_index = ctx.rooms.resolve("room", object.room)?;
            let position = file_position(room, object.position);
            let angle = angle_to_u16(moveable.rotation_y.rem_euclid(360.0));

            // AI objects keep their WAD slot and a compact code bit field
            if version.is_new_tr() && ctx.catalog.is_moveable_ai(version, moveable.wad_object_id) {
                ai.push((
                    id,
                    TrAiItem {
                        object_id: checked_u16("AI item object id", moveable.wad_object_id)?,
                        room: checked_u16("AI item room", room_index)?,
                        position,
                        ocb: moveable.ocb,
                        flags: (moveable.code_bits as u16 & 0x1F) << 1,
                        angle: angle as i32,
                    },
                ));
                continue;
            }

            let object_id = checked_u16(
                "item object id",
                ctx.catalog.moveable_skin(version, moveable.wad_object_id),
            )?;
            let flags = ((moveable.code_bits as u16 & 0x1F) << 9)
                | if moveable.clear_body { 0x80 } else { 0 }
                | if moveable.invisible { 0x100 } else { 0 };

            let color = pack_color(moveable.color);
            items.push((
                id,
                TrItem {
                    object_id,
                    room: checked_i16("item room", room_index)?,
                    position,
                    angle,
                    color,
                    ocb: if version.is_new_tr() { moveable.ocb } else { color as i16 },
                    flags,
                    lua_name: moveable.lua_name.clone(),
                },
            ));
        }

        // Descending object id, then ascending OCB
        ai.sort_by(|a, b| b.1.object_id.cmp(&a.1.object_id).then(a.1.ocb.cmp(&b.1.ocb)));

        self.items = items.iter().map(|(id, _)| *id).collect();
        self.compiled_items = items.into_iter().map(|(_, item)| item).collect();
        self.ai_items = ai.iter().map(|(id, _)| *id).collect();
        self.compiled_ai_items = ai.into_iter().map(|(_, item)| item).collect();

        for warning in ctx.limits.item_count_warnings(self.items.len()) {
            ctx.diagnostics.warn(&warning);
        }
        Ok(())
    }

    /// Cameras of all rooms first, then sinks; both share one numbering
    fn build_cameras(&mut self, ctx: &RemapContext, box_at: &dyn Fn(RoomId, i32, i32) -> Option<u32>) -> Result<()> {
        let mut ids = Vec::new();

        for (room, id, object) in ctx.objects() {
            let ObjectKind::Camera(camera) = &object.kind else {
                continue;
            };
            let room_index = ctx.rooms.resolve("room", object.room)?;
            ids.push(id);
            self.compiled_cameras.push(TrCamera {
                position: file_position(room, object.position),
                room: checked_i16("camera room", room_index)?,
                flags: u16::from(camera.fixed),
            });
        }

        for (room, id, object) in ctx.objects() {
            let ObjectKind::Sink(sink) = &object.kind else {
                continue;
            };
            let x = (object.position.x / SECTOR_SIZE as f32).floor() as i32;
            let z = (object.position.z / SECTOR_SIZE as f32).floor() as i32;
            if !room.sectors.contains(x, z) {
                ctx.diagnostics.warn(&format!(
                    "Sink in room '{}' lies outside the room grid and was skipped.",
                    room.name
                ));
                continue;
            }
            ids.push(id);
            let box_index = box_at(object.room, x, z).unwrap_or(0);
            self.compiled_cameras.push(TrCamera {
                position: file_position(room, object.position),
                room: sink.strength,
                flags: checked_u16("sink box index", box_index)?,
            });
        }

        self.cameras = ids.into_iter().collect();
        Ok(())
    }

    fn build_flyby_cameras(&mut self, ctx: &RemapContext) -> Result<()> {
        let mut flybys = Vec::new();
        for (room, id, object) in ctx.objects() {
            if let ObjectKind::FlybyCamera(flyby) = &object.kind {
                flybys.push((room, id, object, flyby));
            }
        }
        flybys.sort_by_key(|(_, _, _, f)| (f.sequence, f.number));

        let mut ids = Vec::new();
        let mut seen = BTreeSet::new();
        for (room, id, object, flyby) in flybys {
            if !seen.insert((flyby.sequence, flyby.number)) {
                ctx.diagnostics.warn(&format!(
                    "Flyby sequence {} has more than one camera numbered {}.",
                    flyby.sequence, flyby.number
                ));
            }
            let position = file_position(room, object.position);
            let look = Vec3::from_yaw_pitch(flyby.rotation_y, flyby.rotation_x) * SECTOR_SIZE as f32;
            let direction = [
                position[0] + round_coord(look.x),
                position[1] - round_coord(look.y),
                position[2] + round_coord(look.z),
            ];
            self.compiled_flyby_cameras.push(TrFlybyCamera {
                position,
                direction,
                sequence: flyby.sequence,
                index: flyby.number,
                fov: fov_to_u16(flyby.fov),
                roll: roll_to_i16(flyby.roll),
                timer: flyby.timer,
                speed: speed_to_u16(flyby.speed),
                flags: flyby.flags,
                room: ctx.rooms.resolve("room", object.room)?,
            });
            self.flyby_sequences.insert(id, flyby.sequence);
            ids.push(id);
        }

        self.flyby_cameras = ids.into_iter().collect();
        Ok(())
    }

    fn build_sound_sources(&mut self, ctx: &RemapContext) -> Result<()> {
        let settings = &ctx.level.settings;
        let version = settings.game_version;
        let mut ids = Vec::new();

        for (room, id, object) in ctx.objects() {
            let ObjectKind::SoundSource(source) = &object.kind else {
                continue;
            };
            let sound = u32::try_from(source.sound_id).ok().filter(|&s| settings.wad_sound(s).is_some());
            let Some(sound) = sound else {
                let name = if source.is_empty() {
                    "no sound".to_string()
                } else {
                    ctx.catalog.sound_name(version, source.sound_id as u32)
                };
                ctx.diagnostics.warn(&format!(
                    "Sound source in room '{}' plays '{}', which is missing from the loaded WADs. It was skipped.",
                    room.name, name
                ));
                continue;
            };

            let flags = match source.play_mode {
                SoundSourcePlayMode::Automatic if room.alternated() => {
                    if room.is_alternate() { 0x40 } else { 0x80 }
                }
                SoundSourcePlayMode::Automatic | SoundSourcePlayMode::Always => 0xC0,
                SoundSourcePlayMode::OnlyInBaseRoom => 0x80,
                SoundSourcePlayMode::OnlyInAlternateRoom => 0x40,
            };
            ids.push(id);
            self.compiled_sound_sources.push(TrSoundSource {
                position: file_position(room, object.position),
                sound_id: sound,
                flags,
            });
        }

        self.sound_sources = ids.into_iter().collect();
        Ok(())
    }

    fn build_statics(&mut self, ctx: &RemapContext) -> Result<()> {
        let settings = &ctx.level.settings;
        let mut ids = Vec::new();

        for (room, id, object) in ctx.objects() {
            let ObjectKind::Static(instance) = &object.kind else {
                continue;
            };
            if settings.wad_static(instance.wad_object_id).is_none() {
                ctx.diagnostics.warn(&format!(
                    "Static '{}' in room '{}' was not found in any loaded WAD and was skipped.",
                    ctx.catalog.static_name(settings.game_version, instance.wad_object_id),
                    room.name
                ));
                continue;
            }
            ids.push(id);
            self.room_statics.entry(object.room).or_default().push(TrRoomStatic {
                position: file_position(room, object.position),
                rotation: angle_to_u16(instance.rotation_y.rem_euclid(360.0)),
                color: instance.color,
                object_id: instance.wad_object_id,
                ocb: instance.ocb,
            });
        }

        self.statics = ids.into_iter().collect();
        Ok(())
    }

    /// Parameter of a trigger action, or None when the target cannot be resolved
    pub fn resolve_trigger_target(&self, trigger: &TriggerInstance) -> Option<u16> {
        let index = match (trigger.target_type, trigger.target) {
            (TriggerTargetType::Object | TriggerTargetType::Target, TriggerTarget::Object(id)) => {
                self.items.get(id)?
            }
            (TriggerTargetType::Camera | TriggerTargetType::Sink, TriggerTarget::Object(id)) => self.cameras.get(id)?,
            (TriggerTargetType::FlyByCamera, TriggerTarget::Object(id)) => *self.flyby_sequences.get(&id)? as u32,
            (_, TriggerTarget::Number(n)) => u32::try_from(n).ok()?,
            (_, TriggerTarget::Object(_)) => return None,
            (_, TriggerTarget::None) => 0,
        };
        // Action parameters are ten bits wide
        (index <= 0x3FF).then_some(index as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogItem, GameCatalog};
    use crate::level::objects::{CameraInstance, FlybyCameraInstance, MoveableInstance, SinkInstance, SoundSourceInstance};
    use crate::level::{LevelSettings, ReferencedWad};
    use crate::progress::CollectingReporter;
    use crate::version::GameVersion;
    use crate::wad::{Wad, WadMoveable, WadSoundInfo};

    fn level_with_wad(version: GameVersion, moveables: &[u32]) -> Level {
        let mut wad = Wad::default();
        for &id in moveables {
            wad.moveables.insert(id, WadMoveable::default());
        }
        wad.sounds.insert(
            4,
            WadSoundInfo {
                volume: 100,
                range: 10,
                chance: 100,
                pitch: 0,
                flags: 0,
                samples: vec![],
            },
        );
        let mut settings = LevelSettings::new(version);
        settings.wads.push(ReferencedWad {
            path: "objects.wad".into(),
            wad: Some(wad),
        });
        Level::new(settings)
    }

    fn remap(level: &Level, catalog: &Catalog, reporter: &CollectingReporter) -> ObjectRemap {
        let rooms = room_table(level);
        let limits = Limits::defaults(level.settings.game_version);
        let diagnostics = Diagnostics::new(reporter);
        let cancel = CancellationToken::new();
        let ctx = RemapContext {
            level,
            catalog,
            rooms: &rooms,
            limits: &limits,
            diagnostics: &diagnostics,
            cancel: &cancel,
        };
        ObjectRemap::build(&ctx, &|_, _, _| Some(7)).unwrap()
    }

    fn ai_catalog(ids: &[u32]) -> Catalog {
        let moveables = ids
            .iter()
            .map(|&id| CatalogItem {
                id,
                name: format!("AI_{id}"),
                description: String::new(),
                skin: None,
                ai: true,
            })
            .collect();
        Catalog::from_games([(
            GameVersion::Tr4,
            GameCatalog {
                moveables,
                ..Default::default()
            },
        )])
        .unwrap()
    }

    #[test]
    fn test_index_table_is_dense() {
        let table: IndexTable<u32> = [5, 3, 5, 9].into_iter().collect();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(3), Some(1));
        assert_eq!(table.get(9), Some(2));
        assert!(table.resolve("thing", 4).is_err());
    }

    #[test]
    fn test_missing_moveables_warn_and_stay_dense() {
        let mut level = level_with_wad(GameVersion::Tr4, &[1]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        for id in [1, 99, 1, 98, 1] {
            level
                .add_object(room, Vec3::ZERO, ObjectKind::Moveable(MoveableInstance::new(id)))
                .unwrap();
        }
        let reporter = CollectingReporter::new();
        let remap = remap(&level, &Catalog::empty(), &reporter);

        assert_eq!(remap.compiled_items.len(), 3);
        let indices: Vec<u32> = remap.items.keys().iter().map(|&id| remap.items.get(id).unwrap()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(reporter.warnings().len(), 2);
    }

    #[test]
    fn test_ai_items_sorted_before_indexing() {
        let mut level = level_with_wad(GameVersion::Tr4, &[2, 5, 9]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        let mut ids = Vec::new();
        for (object, ocb) in [(5, 0), (9, 3), (9, 1), (2, 0)] {
            let mut moveable = MoveableInstance::new(object);
            moveable.ocb = ocb;
            ids.push(level.add_object(room, Vec3::ZERO, ObjectKind::Moveable(moveable)).unwrap());
        }
        let reporter = CollectingReporter::new();
        let remap = remap(&level, &ai_catalog(&[2, 5, 9]), &reporter);

        let order: Vec<(u16, i16)> = remap.compiled_ai_items.iter().map(|a| (a.object_id, a.ocb)).collect();
        assert_eq!(order, vec![(9, 1), (9, 3), (5, 0), (2, 0)]);
        assert_eq!(remap.ai_items.get(ids[2]), Some(0));
        assert_eq!(remap.ai_items.get(ids[0]), Some(2));
        assert!(remap.compiled_items.is_empty());
    }

    #[test]
    fn test_ai_objects_are_plain_items_in_old_versions() {
        let mut level = level_with_wad(GameVersion::Tr3, &[9]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        level
            .add_object(room, Vec3::ZERO, ObjectKind::Moveable(MoveableInstance::new(9)))
            .unwrap();
        let reporter = CollectingReporter::new();
        let remap = remap(&level, &ai_catalog(&[9]), &reporter);
        assert_eq!(remap.compiled_items.len(), 1);
        assert_eq!(remap.compiled_items[0].color, 0xFFFF);
    }

    #[test]
    fn test_ai_item_keeps_wad_slot_and_compact_flags() {
        let mut level = level_with_wad(GameVersion::Tr4, &[9]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        let mut moveable = MoveableInstance::new(9);
        moveable.code_bits = 0x1F;
        moveable.clear_body = true;
        moveable.invisible = true;
        level.add_object(room, Vec3::ZERO, ObjectKind::Moveable(moveable)).unwrap();

        let catalog = Catalog::from_games([(
            GameVersion::Tr4,
            GameCatalog {
                moveables: vec![CatalogItem {
                    id: 9,
                    name: "AI_FOLLOW".into(),
                    description: String::new(),
                    skin: Some(4),
                    ai: true,
                }],
                ..Default::default()
            },
        )])
        .unwrap();
        let reporter = CollectingReporter::new();
        let remap = remap(&level, &catalog, &reporter);

        assert_eq!(remap.compiled_ai_items.len(), 1);
        assert_eq!(remap.compiled_ai_items[0].object_id, 9);
        assert_eq!(remap.compiled_ai_items[0].flags, 0x3E);
    }

    #[test]
    fn test_ai_items_do_not_count_towards_item_limit() {
        let mut level = level_with_wad(GameVersion::Tr4, &[1, 9]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        for (id, count) in [(1, 200), (9, 100)] {
            for _ in 0..count {
                level
                    .add_object(room, Vec3::ZERO, ObjectKind::Moveable(MoveableInstance::new(id)))
                    .unwrap();
            }
        }
        let reporter = CollectingReporter::new();
        let remap = remap(&level, &ai_catalog(&[9]), &reporter);

        assert_eq!(remap.compiled_items.len(), 200);
        assert_eq!(remap.compiled_ai_items.len(), 100);
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn test_trigger_on_ai_object_is_unresolved() {
        let mut level = level_with_wad(GameVersion::Tr4, &[1, 9]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        let item = level
            .add_object(room, Vec3::ZERO, ObjectKind::Moveable(MoveableInstance::new(1)))
            .unwrap();
        let ai = level
            .add_object(room, Vec3::ZERO, ObjectKind::Moveable(MoveableInstance::new(9)))
            .unwrap();
        let reporter = CollectingReporter::new();
        let remap = remap(&level, &ai_catalog(&[9]), &reporter);
        assert_eq!(remap.ai_items.get(ai), Some(0));

        let mut trigger = TriggerInstance {
            area: crate::level::portal::SectorArea::single(1, 1),
            trigger_type: Default::default(),
            target_type: TriggerTargetType::Object,
            target: TriggerTarget::Object(ai),
            timer: 0,
            extra: 0,
            code_bits: 0x1F,
            one_shot: false,
        };
        assert_eq!(remap.resolve_trigger_target(&trigger), None);
        trigger.target = TriggerTarget::Object(item);
        assert_eq!(remap.resolve_trigger_target(&trigger), Some(0));
    }

    #[test]
    fn test_object_id_overflow_is_fatal() {
        let mut level = level_with_wad(GameVersion::Tr4, &[70000]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        level
            .add_object(room, Vec3::ZERO, ObjectKind::Moveable(MoveableInstance::new(70000)))
            .unwrap();
        let rooms = room_table(&level);
        let limits = Limits::defaults(GameVersion::Tr4);
        let reporter = CollectingReporter::new();
        let diagnostics = Diagnostics::new(&reporter);
        let cancel = CancellationToken::new();
        let catalog = Catalog::empty();
        let ctx = RemapContext {
            level: &level,
            catalog: &catalog,
            rooms: &rooms,
            limits: &limits,
            diagnostics: &diagnostics,
            cancel: &cancel,
        };
        assert!(ObjectRemap::build(&ctx, &|_, _, _| None).is_err());
    }

    #[test]
    fn test_cameras_precede_sinks() {
        let mut level = level_with_wad(GameVersion::Tr4, &[]);
        let a = level.add_room(Room::new("a", 4, 4, [0, 0, 0], 1024));
        let b = level.add_room(Room::new("b", 4, 4, [4, 0, 0], 1024));
        let sink = level
            .add_object(a, Vec3::new(1536.0, 0.0, 1536.0), ObjectKind::Sink(SinkInstance { strength: 3 }))
            .unwrap();
        let outside = level
            .add_object(a, Vec3::new(-10.0, 0.0, 0.0), ObjectKind::Sink(SinkInstance::default()))
            .unwrap();
        let camera = level
            .add_object(b, Vec3::ZERO, ObjectKind::Camera(CameraInstance { fixed: true }))
            .unwrap();

        let reporter = CollectingReporter::new();
        let remap = remap(&level, &Catalog::empty(), &reporter);
        assert_eq!(remap.cameras.get(camera), Some(0));
        assert_eq!(remap.cameras.get(sink), Some(1));
        assert_eq!(remap.cameras.get(outside), None);
        assert_eq!(remap.compiled_cameras[1].room, 3);
        assert_eq!(remap.compiled_cameras[1].flags, 7);
        assert_eq!(remap.compiled_cameras[0].position, [4096, 0, 0]);
        assert_eq!(reporter.warnings().len(), 1);
    }

    #[test]
    fn test_flyby_sorting_and_trigger_targets() {
        let mut level = level_with_wad(GameVersion::Tr4, &[1]);
        let room = level.add_room(Room::new("r", 4, 4, [0, 0, 0], 1024));
        let flyby = |sequence, number| {
            ObjectKind::FlybyCamera(FlybyCameraInstance {
                sequence,
                number,
                timer: 0,
                flags: 0,
                speed: 1.0,
                fov: 1e9,
                roll: 0.0,
                rotation_y: 0.0,
                rotation_x: 0.0,
            })
        };
        let late = level.add_object(room, Vec3::ZERO, flyby(2, 0)).unwrap();
        let early = level.add_object(room, Vec3::ZERO, flyby(1, 5)).unwrap();
        level.add_object(room, Vec3::ZERO, flyby(1, 5)).unwrap();
        let item = level
            .add_object(room, Vec3::ZERO, ObjectKind::Moveable(MoveableInstance::new(1)))
            .unwrap();

        let reporter = CollectingReporter::new();
        let remap = remap(&level, &Catalog::empty(), &reporter);
        assert_eq!(remap.flyby_cameras.get(early), Some(0));
        assert_eq!(remap.flyby_cameras.get(late), Some(2));
        assert_eq!(remap.compiled_flyby_cameras[0].fov, 65535);
        assert_eq!(reporter.warnings().len(), 1);

        let mut trigger = TriggerInstance {
            area: crate::level::portal::SectorArea::single(1, 1),
            trigger_type: Default::default(),
            target_type: TriggerTargetType::Object,
            target: TriggerTarget::Object(item),
            timer: 0,
            extra: 0,
            code_bits: 0x1F,
            one_shot: false,
        };
        assert_eq!(remap.resolve_trigger_target(&trigger), Some(0));
        trigger.target_type = TriggerTargetType::FlyByCamera;
        trigger.target = TriggerTarget::Object(late);
        assert_eq!(remap.resolve_trigger_target(&trigger), Some(2));
        trigger.target = TriggerTarget::Object(ObjectId(999));
        assert_eq!(remap.resolve_trigger_target(&trigger), None);
        trigger.target_type = TriggerTargetType::FlipMap;
        trigger.target = TriggerTarget::Number(3);
        assert_eq!(remap.resolve_trigger_target(&trigger), Some(3));
    }

    #[test]
    fn test_sound_source_flags() {
        let mut level = level_with_wad(GameVersion::Tr4, &[]);
        let base = level.add_room(Room::new("base", 4, 4, [0, 0, 0], 1024));
        let flipped = level.add_room(Room::new("flipped", 4, 4, [0, 0, 0], 1024));
        level.room_mut(base).unwrap().alternate_room = Some(flipped);
        level.room_mut(flipped).unwrap().alternate_base = Some(base);
        let source = |sound_id| {
            ObjectKind::SoundSource(SoundSourceInstance {
                sound_id,
                play_mode: SoundSourcePlayMode::Automatic,
            })
        };
        level.add_object(base, Vec3::new(0.0, 256.0, 0.0), source(4)).unwrap();
        level.add_object(flipped, Vec3::ZERO, source(4)).unwrap();
        level.add_object(flipped, Vec3::ZERO, source(-1)).unwrap();
        level.add_object(flipped, Vec3::ZERO, source(12)).unwrap();

        let reporter = CollectingReporter::new();
        let remap = remap(&level, &Catalog::empty(), &reporter);
        let flags: Vec<u16> = remap.compiled_sound_sources.iter().map(|s| s.flags).collect();
        assert_eq!(flags, vec![0x80, 0x40]);
        assert_eq!(remap.compiled_sound_sources[0].position[1], -256);
        assert_eq!(remap.sound_sources.len(), 2);
        assert_eq!(reporter.warnings().len(), 2);
    }
}
