// Level compiler
//
// Drives one compile from the editable level to the file bytes. Phases run strictly in
// order; each phase consumes the finished output of the previous ones and the
// cancellation token is polled between them.

use crate::catalog::Catalog;
use crate::compiled::{CompiledLevel, TrFace, TrLight, TrPortal, TrRoom, TrRoomVertex, TrSector};
use crate::error::{CompileError, Result};
use crate::floordata::{self, FloorData, FloorDataContext};
use crate::geometry::builder::{build_rooms, RoomGeometry};
use crate::geometry::face::FaceShape;
use crate::geometry::reachability::reachable_rooms;
use crate::level::grid::{Direction, SectorKind, CLICK, SECTOR_SIZE};
use crate::level::objects::ObjectKind;
use crate::level::portal::{Portal, PortalDirection, SectorArea};
use crate::level::{Level, Room, RoomId};
use crate::limits::Limits;
use crate::numeric::{Checked, Clamped};
use crate::pathfinding::{self, Pathfinding};
use crate::progress::{CancellationToken, Diagnostics, ProgressReporter};
use crate::remap::{file_position, room_table, IndexTable, ObjectRemap, RemapContext};
use crate::textures::TexInfoManager;
use crate::wad_convert::convert_wads;
use crate::writer;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Floor and ceiling of a wall sector, in clicks
const WALL_CLICKS: i8 = -127;

/// Summary of a finished compile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompilerStatistics {
    pub box_count: usize,
    pub overlap_count: usize,
    pub object_texture_count: usize,
    pub warning_count: usize,
}

pub struct LevelCompiler<'a> {
    level: &'a Level,
    catalog: &'a Catalog,
    diagnostics: Diagnostics<'a>,
    cancel: CancellationToken,
}

impl<'a> LevelCompiler<'a> {
    pub fn new(
        level: &'a Level,
        catalog: &'a Catalog,
        reporter: &'a dyn ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        LevelCompiler {
            level,
            catalog,
            diagnostics: Diagnostics::new(reporter),
            cancel,
        }
    }

    /// Compile the level and lay it out in its version's file format
    pub fn compile(&self) -> Result<(Vec<u8>, CompilerStatistics)> {
        let (compiled, statistics) = self.compile_level()?;

        self.diagnostics.progress(90, "Writing level file");
        self.cancel.check()?;
        let bytes = writer::write_level(&compiled)?;

        self.diagnostics.progress(100, "Done");
        tracing::info!(
            "Compiled {} rooms into {} bytes ({} warnings)",
            compiled.rooms.len(),
            bytes.len(),
            self.diagnostics.warning_count()
        );
        Ok((bytes, CompilerStatistics {
            warning_count: self.diagnostics.warning_count(),
            ..statistics
        }))
    }

    /// Every phase up to, but not including, the writer
    pub(crate) fn compile_level(&self) -> Result<(CompiledLevel, CompilerStatistics)> {
        let level = self.level;
        let settings = &level.settings;
        let version = settings.game_version;
        self.diagnostics.progress(0, &format!("Compiling level for {version}"));
        self.cancel.check()?;

        if !settings.has_loaded_wad() {
            return Err(CompileError::NoWadLoaded);
        }
        for wad in settings.wads.iter().filter(|w| w.wad.is_none()) {
            self.diagnostics.warn(&format!("WAD '{}' could not be loaded and is ignored.", wad.path));
        }

        let rooms = room_table(level);
        let limits = Limits::resolve(version, &self.catalog.limit_overrides(version));
        if let Some(warning) = limits.room_count_warning(rooms.len()) {
            self.diagnostics.warn(&warning);
        }

        self.diagnostics.progress(5, "Converting WAD data");
        let mut textures = TexInfoManager::new();
        let converted = convert_wads(settings, self.catalog, &mut textures, &self.diagnostics)?;
        self.cancel.check()?;

        self.diagnostics.progress(20, "Building room geometry");
        let geometry = build_rooms(level, &self.cancel)?;

        self.diagnostics.progress(40, "Preparing textures");
        let buckets = self.texture_buckets(&geometry, &mut textures)?;
        if let Some(warning) = limits.texinfo_warning(textures.len()) {
            self.diagnostics.warn(&warning);
        }

        self.diagnostics.progress(50, "Building pathfinding data");
        let reachable = reachable_rooms(level);
        let pathfinding = pathfinding::build(level, &rooms, &reachable, &self.cancel)?;
        for warning in limits.box_count_warnings(pathfinding.boxes.len(), pathfinding.overlaps.len()) {
            self.diagnostics.warn(&warning);
        }

        self.diagnostics.progress(60, "Remapping objects");
        let remap_ctx = RemapContext {
            level,
            catalog: self.catalog,
            rooms: &rooms,
            limits: &limits,
            diagnostics: &self.diagnostics,
            cancel: &self.cancel,
        };
        let remap = ObjectRemap::build(&remap_ctx, &|room, x, z| pathfinding.box_under(level, room, x, z))?;

        self.diagnostics.progress(70, "Building floor data");
        let floor_data = floordata::build(&FloorDataContext {
            level,
            rooms: &rooms,
            remap: &remap,
            diagnostics: &self.diagnostics,
            cancel: &self.cancel,
        })?;

        self.diagnostics.progress(80, "Preparing rooms");
        let rooms_ctx = RoomContext {
            level,
            rooms: &rooms,
            pathfinding: &pathfinding,
            floor_data: &floor_data,
            remap: &remap,
        };
        let mut compiled_rooms = Vec::with_capacity(rooms.len());
        for (&id, faces) in rooms.keys().iter().zip(buckets) {
            self.cancel.check()?;
            let room = level
                .room(id)
                .ok_or_else(|| CompileError::Invariant(format!("room {} vanished during compile", id.0)))?;
            compiled_rooms.push(rooms_ctx.compile_room(id, room, faces)?);
        }

        let statistics = CompilerStatistics {
            box_count: pathfinding.boxes.len(),
            overlap_count: pathfinding.overlaps.len(),
            object_texture_count: textures.len(),
            warning_count: self.diagnostics.warning_count(),
        };
        self.diagnostics.info(&format!(
            "Rooms: {}, boxes: {}, overlaps: {}, texture infos: {}",
            compiled_rooms.len(),
            statistics.box_count,
            statistics.overlap_count,
            statistics.object_texture_count
        ));

        let Pathfinding {
            boxes, overlaps, zones, ..
        } = pathfinding;
        let compiled = CompiledLevel {
            version: Some(version),
            rooms: compiled_rooms,
            floor_data: floor_data.words,
            meshes: converted.meshes,
            animations: converted.animations,
            state_changes: converted.state_changes,
            anim_dispatches: converted.anim_dispatches,
            anim_commands: converted.anim_commands,
            mesh_trees: converted.mesh_trees,
            frames: converted.frames,
            moveables: converted.moveables,
            statics: converted.statics,
            object_textures: textures.into_textures(),
            sprite_textures: converted.sprite_textures,
            sprite_sequences: converted.sprite_sequences,
            cameras: remap.compiled_cameras,
            flyby_cameras: remap.compiled_flyby_cameras,
            sound_sources: remap.compiled_sound_sources,
            boxes,
            overlaps,
            zones,
            items: remap.compiled_items,
            ai_items: remap.compiled_ai_items,
            sound_map: converted.sound_map,
            sound_details: converted.sound_details,
            samples: converted.samples,
            sample_indices: converted.sample_indices,
            texture_pages: settings.textures.clone(),
            ng_demo_data: Checked::<u16>::new("NG sound map size", settings.ng_sound_map_size as i64)?.get(),
            trng_version: settings.trng_version.clone(),
            tr5_lara_type: settings.tr5_lara_type,
            tr5_weather: settings.tr5_weather,
        };
        Ok((compiled, statistics))
    }

    /// Texture index per face, grouped into buckets of (texture, blend, double sided)
    fn texture_buckets(
        &self,
        geometry: &[(RoomId, RoomGeometry)],
        textures: &mut TexInfoManager,
    ) -> Result<Vec<Vec<BucketFace>>> {
        let mut rooms = Vec::with_capacity(geometry.len());
        for (_, room) in geometry {
            self.cancel.check()?;
            let mut buckets: BTreeMap<(u32, u16, bool), Vec<BucketFace>> = BTreeMap::new();
            for face in &room.faces {
                let texture = textures.add(&face.texture, face.shape.is_triangle());
                buckets
                    .entry((texture, face.texture.blend_mode.attribute(), face.texture.double_sided))
                    .or_default()
                    .push(BucketFace {
                        shape: face.shape,
                        texture,
                        double_sided: face.texture.double_sided,
                        blend_mode: face.texture.blend_mode,
                    });
            }
            rooms.push(buckets.into_values().flatten().collect());
        }
        Ok(rooms)
    }
}

struct BucketFace {
    shape: FaceShape,
    texture: u32,
    double_sided: bool,
    blend_mode: crate::level::texture::BlendMode,
}

struct RoomContext<'a> {
    level: &'a Level,
    rooms: &'a IndexTable<RoomId>,
    pathfinding: &'a Pathfinding,
    floor_data: &'a FloorData,
    remap: &'a ObjectRemap,
}

/// Room-relative x/z, absolute y flipped to point down
fn file_vertex(room: &Room, vertex: [i32; 3]) -> [i32; 3] {
    [vertex[0], -(room.position[1] + vertex[1]), vertex[2]]
}

fn height_clicks(room: &Room, height: i32) -> i8 {
    Clamped::<i8>::from_i64((-(room.position[1] + height) / CLICK) as i64).get()
}

impl RoomContext<'_> {
    fn compile_room(&self, id: RoomId, room: &Room, faces: Vec<BucketFace>) -> Result<TrRoom> {
        let (lowest, highest) = room.height_range();
        let y_bottom = -(room.position[1] + lowest);
        let y_top = -(room.position[1] + highest);

        let mut vertices = Vec::new();
        let mut lookup: HashMap<[i32; 3], u32> = HashMap::new();
        let mut compiled_faces = Vec::with_capacity(faces.len());
        for face in faces {
            let mut indices = [0u32; 4];
            for (slot, vertex) in indices.iter_mut().zip(face.shape.vertices()) {
                let position = file_vertex(room, *vertex);
                *slot = *lookup.entry(position).or_insert_with(|| {
                    vertices.push(TrRoomVertex {
                        position,
                        color: room.ambient,
                    });
                    (vertices.len() - 1) as u32
                });
            }
            compiled_faces.push(TrFace {
                indices,
                triangle: face.shape.is_triangle(),
                texture: face.texture,
                double_sided: face.double_sided,
                blend_mode: face.blend_mode,
            });
        }

        let mut portals = Vec::with_capacity(room.portals.len());
        for portal in &room.portals {
            portals.push(self.compile_portal(room, portal, y_bottom, y_top)?);
        }

        Ok(TrRoom {
            name: room.name.clone(),
            x: room.position[0] * SECTOR_SIZE,
            z: room.position[2] * SECTOR_SIZE,
            y_bottom,
            y_top,
            vertices,
            faces: compiled_faces,
            portals,
            num_x: Checked::<u16>::new("room x size", room.num_x() as i64)?.get(),
            num_z: Checked::<u16>::new("room z size", room.num_z() as i64)?.get(),
            sectors: self.compile_sectors(id, room)?,
            ambient: room.ambient,
            lights: self.compile_lights(room),
            statics: self.remap.room_statics.get(&id).cloned().unwrap_or_default(),
            alternate_room: room.alternate_room.and_then(|alt| self.rooms.get(alt)),
            alternate_group: room.alternate_group,
            flags: room.flags.0,
            water_scheme: room.water_scheme,
            reverb: room.reverb,
        })
    }

    fn compile_sectors(&self, id: RoomId, room: &Room) -> Result<Vec<TrSector>> {
        let traversable = |portal: Option<&Portal>| -> Result<Option<u32>> {
            match portal.filter(|p| p.is_traversable()) {
                Some(p) => self.rooms.resolve("portal room", p.adjoining_room).map(Some),
                None => Ok(None),
            }
        };

        let mut sectors = Vec::with_capacity(room.num_x() * room.num_z());
        for (x, z, sector) in room.sectors.iter() {
            let (floor, ceiling) = if sector.kind == SectorKind::Floor {
                (height_clicks(room, sector.floor.max()), height_clicks(room, sector.ceiling.min()))
            } else {
                (WALL_CLICKS, WALL_CLICKS)
            };
            sectors.push(TrSector {
                floor_data_index: self.floor_data.index_at(id, self.level, x, z),
                box_index: if sector.kind == SectorKind::Floor {
                    self.pathfinding.box_under(self.level, id, x, z)
                } else {
                    None
                },
                material: 0,
                room_below: traversable(room.floor_portal_at(x, z))?,
                floor,
                room_above: traversable(room.ceiling_portal_at(x, z))?,
                ceiling,
            });
        }
        Ok(sectors)
    }

    fn compile_portal(&self, room: &Room, portal: &Portal, y_bottom: i32, y_top: i32) -> Result<TrPortal> {
        let adjoining_room = self.rooms.resolve("portal room", portal.adjoining_room)?;
        let SectorArea { x0, z0, x1, z1 } = portal.area;
        let (xa, xb) = (x0 * SECTOR_SIZE, (x1 + 1) * SECTOR_SIZE);
        let (za, zb) = (z0 * SECTOR_SIZE, (z1 + 1) * SECTOR_SIZE);

        let (normal, vertices) = match portal.direction {
            PortalDirection::Wall(Direction::PositiveX) => {
                let x = xa;
                ([-1, 0, 0], [[x, y_top, za], [x, y_top, zb], [x, y_bottom, zb], [x, y_bottom, za]])
            }
            PortalDirection::Wall(Direction::NegativeX) => {
                let x = xb;
                ([1, 0, 0], [[x, y_top, zb], [x, y_top, za], [x, y_bottom, za], [x, y_bottom, zb]])
            }
            PortalDirection::Wall(Direction::PositiveZ) => {
                let z = za;
                ([0, 0, -1], [[xb, y_top, z], [xa, y_top, z], [xa, y_bottom, z], [xb, y_bottom, z]])
            }
            PortalDirection::Wall(Direction::NegativeZ) => {
                let z = zb;
                ([0, 0, 1], [[xa, y_top, z], [xb, y_top, z], [xb, y_bottom, z], [xa, y_bottom, z]])
            }
            PortalDirection::Floor => {
                let height = portal
                    .area
                    .iter()
                    .filter_map(|(x, z)| room.sectors.get(x, z))
                    .map(|s| s.floor.min())
                    .min()
                    .unwrap_or(0);
                let y = -(room.position[1] + height);
                ([0, -1, 0], [[xa, y, za], [xb, y, za], [xb, y, zb], [xa, y, zb]])
            }
            PortalDirection::Ceiling => {
                let height = portal
                    .area
                    .iter()
                    .filter_map(|(x, z)| room.sectors.get(x, z))
                    .map(|s| s.ceiling.max())
                    .max()
                    .unwrap_or(0);
                let y = -(room.position[1] + height);
                ([0, 1, 0], [[xa, y, zb], [xb, y, zb], [xb, y, za], [xa, y, za]])
            }
        };

        Ok(TrPortal {
            adjoining_room,
            normal,
            vertices,
        })
    }

    fn compile_lights(&self, room: &Room) -> Vec<TrLight> {
        self.level
            .room_objects(room)
            .filter_map(|(_, object)| match &object.kind {
                ObjectKind::Light(light) if light.enabled => Some((object, light)),
                _ => None,
            })
            .map(|(object, light)| {
                let direction = light.direction();
                TrLight {
                    position: file_position(room, object.position),
                    light_type: light.light_type,
                    color: light.color,
                    intensity: light.intensity,
                    inner_range: light.inner_range * SECTOR_SIZE as f32,
                    outer_range: light.outer_range * SECTOR_SIZE as f32,
                    inner_angle: light.inner_angle,
                    outer_angle: light.outer_angle,
                    direction: crate::level::math::Vec3::new(direction.x, -direction.y, direction.z),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::math::Vec3;
    use crate::level::objects::{LightInstance, LightType};
    use crate::level::texture::{TextureArea, TexturePage};
    use crate::level::{LevelSettings, ReferencedWad};
    use crate::progress::CollectingReporter;
    use crate::version::GameVersion;
    use crate::wad::Wad;

    fn level(version: GameVersion) -> Level {
        let mut settings = LevelSettings::new(version);
        settings.wads.push(ReferencedWad {
            path: "objects.wad".into(),
            wad: Some(Wad::default()),
        });
        settings.textures.push(TexturePage::default());
        settings.default_texture = Some(TextureArea::full_page(0));
        let mut level = Level::new(settings);
        level.add_room(Room::new("Room 0", 4, 4, [0, -512, 0], 1024));
        level
    }

    struct PanickingReporter;

    impl ProgressReporter for PanickingReporter {
        fn report_progress(&self, _percent: u8, _message: &str) {
            panic!("progress observer failure");
        }

        fn report_warn(&self, _message: &str) {}

        fn report_info(&self, _message: &str) {}
    }

    #[test]
    fn test_cancelled_before_compile() {
        let level = level(GameVersion::Tr4);
        let catalog = Catalog::empty();
        let reporter = CollectingReporter::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let compiler = LevelCompiler::new(&level, &catalog, &reporter, cancel);
        assert!(matches!(compiler.compile(), Err(CompileError::Cancelled)));
    }

    #[test]
    fn test_no_wad_loaded() {
        let mut level = level(GameVersion::Tr4);
        level.settings.wads[0].wad = None;
        let catalog = Catalog::empty();
        let reporter = CollectingReporter::new();
        let compiler = LevelCompiler::new(&level, &catalog, &reporter, CancellationToken::new());
        assert!(matches!(compiler.compile(), Err(CompileError::NoWadLoaded)));
    }

    #[test]
    fn test_every_version_compiles() {
        let catalog = Catalog::empty();
        for version in GameVersion::ALL {
            let level = level(version);
            let reporter = CollectingReporter::new();
            let compiler = LevelCompiler::new(&level, &catalog, &reporter, CancellationToken::new());
            let (bytes, statistics) = compiler.compile().unwrap();

            assert_eq!(&bytes[..4], &version.magic(), "{version}");
            assert_eq!(statistics.box_count, 1, "{version}");
            assert!(statistics.object_texture_count > 0, "{version}");
            assert_eq!(statistics.warning_count, 0, "{version}: {:?}", reporter.warnings());

            let progress = reporter.snapshot().progress;
            assert_eq!(progress.first().map(|p| p.0), Some(0));
            assert_eq!(progress.last().map(|p| p.0), Some(100));
        }
    }

    #[test]
    fn test_trng_file_ends_with_footer() {
        let level = level(GameVersion::Trng);
        let catalog = Catalog::empty();
        let reporter = CollectingReporter::new();
        let compiler = LevelCompiler::new(&level, &catalog, &reporter, CancellationToken::new());
        let (bytes, _) = compiler.compile().unwrap();
        let n = bytes.len();
        assert_eq!(&bytes[n - 8..n - 4], b"NGLE");
    }

    #[test]
    fn test_panicking_observer_is_ignored() {
        let level = level(GameVersion::Tr3);
        let catalog = Catalog::empty();
        let compiler = LevelCompiler::new(&level, &catalog, &PanickingReporter, CancellationToken::new());
        assert!(compiler.compile().is_ok());
    }

    #[test]
    fn test_room_records() {
        let mut level = level(GameVersion::Tr4);
        let id = RoomId(0);
        level.add_object(
            id,
            Vec3::new(2048.0, 512.0, 2048.0),
            ObjectKind::Light(LightInstance {
                light_type: LightType::Point,
                color: Vec3::new(1.0, 1.0, 1.0),
                intensity: 1.0,
                inner_range: 1.0,
                outer_range: 2.0,
                inner_angle: 0.0,
                outer_angle: 0.0,
                rotation_y: 0.0,
                rotation_x: 0.0,
                enabled: true,
            }),
        );
        let catalog = Catalog::empty();
        let reporter = CollectingReporter::new();
        let compiler = LevelCompiler::new(&level, &catalog, &reporter, CancellationToken::new());
        let (compiled, _) = compiler.compile_level().unwrap();
        let room = &compiled.rooms[0];

        assert_eq!((room.y_bottom, room.y_top), (512, -512));
        assert_eq!((room.num_x, room.num_z), (4, 4));

        // x outer, z inner: slot 5 is sector (1, 1)
        let inner = &room.sectors[5];
        assert_eq!((inner.floor, inner.ceiling), (2, -2));
        assert_eq!(inner.box_index, Some(0));
        let border = &room.sectors[0];
        assert_eq!((border.floor, border.ceiling), (WALL_CLICKS, WALL_CLICKS));
        assert_eq!(border.box_index, None);

        let mut positions: Vec<_> = room.vertices.iter().map(|v| v.position).collect();
        let count = positions.len();
        positions.sort();
        positions.dedup();
        assert_eq!(positions.len(), count);
        assert!(room.vertices.iter().all(|v| v.color == room.ambient));

        assert_eq!(room.lights.len(), 1);
        assert_eq!(room.lights[0].position, [2048, 0, 2048]);
        assert_eq!(room.lights[0].outer_range, 2048.0);
    }

    #[test]
    fn test_vertical_portal_links() {
        let mut level = level(GameVersion::Tr4);
        level.rooms[0] = Some(Room::new("below", 4, 4, [0, 0, 0], 1024));
        let above = level.add_room(Room::new("above", 4, 4, [0, 1024, 0], 1024));
        level.connect_vertically(RoomId(0), above, SectorArea::new(1, 1, 2, 2)).unwrap();

        let catalog = Catalog::empty();
        let reporter = CollectingReporter::new();
        let compiler = LevelCompiler::new(&level, &catalog, &reporter, CancellationToken::new());
        let (compiled, _) = compiler.compile_level().unwrap();

        let below = &compiled.rooms[0];
        assert_eq!(below.sectors[5].room_above, Some(1));
        assert_eq!(below.portals[0].normal, [0, 1, 0]);
        assert_eq!(below.portals[0].vertices[0], [1024, -1024, 3072]);

        let top = &compiled.rooms[1];
        assert_eq!(top.sectors[5].room_below, Some(0));
        assert_eq!(top.portals[0].normal, [0, -1, 0]);
        // The open floor has no box of its own; sectors over it use the box below
        assert_eq!(top.sectors[5].box_index, below.sectors[5].box_index);
        assert!(top.sectors[5].box_index.is_some());
    }
}
