// WAD conversion
//
// Flattens the loaded WADs into the file's object tables: meshes, mesh trees,
// animations with their state changes/dispatches/commands, keyframes, statics,
// sprites and the sound map. When several WADs define the same id the first one wins.

use crate::catalog::Catalog;
use crate::compiled::{
    TrAnimDispatch, TrAnimation, TrMesh, TrMeshFace, TrMoveable, TrSoundDetails, TrSpriteSequence,
    TrSpriteTexture, TrStateChange, TrStaticMesh,
};
use crate::error::{CompileError, Result};
use crate::level::math::Vec3;
use crate::level::LevelSettings;
use crate::numeric::{checked_i16, checked_u16, checked_u8, Clamped};
use crate::progress::Diagnostics;
use crate::textures::TexInfoManager;
use crate::version::GameVersion;
use crate::wad::{WadAnimCommand, WadAnimation, WadKeyFrame, WadMesh, WadMoveable};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct ConvertedWad {
    pub meshes: Vec<TrMesh>,
    pub animations: Vec<TrAnimation>,
    pub state_changes: Vec<TrStateChange>,
    pub anim_dispatches: Vec<TrAnimDispatch>,
    pub anim_commands: Vec<i16>,
    pub mesh_trees: Vec<i32>,
    pub frames: Vec<i16>,
    pub moveables: Vec<TrMoveable>,
    pub statics: Vec<TrStaticMesh>,
    pub sprite_textures: Vec<TrSpriteTexture>,
    pub sprite_sequences: Vec<TrSpriteSequence>,
    pub sound_map: Vec<i16>,
    pub sound_details: Vec<TrSoundDetails>,
    pub samples: Vec<Vec<u8>>,
    pub sample_indices: Vec<u32>,
}

fn clamp16(value: f32) -> i16 {
    Clamped::<i16>::from_f64(value as f64).get()
}

/// Level/WAD space (y up) to file space (y down)
fn file_vector(v: Vec3) -> [i16; 3] {
    [clamp16(v.x), clamp16(-v.y), clamp16(v.z)]
}

pub(crate) fn convert_mesh(mesh: &WadMesh, textures: &mut TexInfoManager) -> Result<TrMesh> {
    let (centre, radius) = mesh.bounding_sphere();
    let vertex_count = mesh.positions.len();

    let mut out = TrMesh {
        center: file_vector(centre),
        radius: radius.round() as i32,
        vertices: mesh.positions.iter().map(|&p| file_vector(p)).collect(),
        ..Default::default()
    };

    if mesh.normals.len() == vertex_count && vertex_count > 0 {
        out.normals = mesh
            .normals
            .iter()
            .map(|&n| file_vector(n.normalized() * 16300.0))
            .collect();
    } else {
        out.shades = (0..vertex_count)
            .map(|i| mesh.shades.get(i).copied().unwrap_or(0))
            .collect();
    }

    for polygon in &mesh.polygons {
        let corners = if polygon.triangle { 3 } else { 4 };
        if let Some(bad) = polygon.indices[..corners].iter().find(|&&i| i as usize >= vertex_count) {
            return Err(CompileError::InvalidLevel(format!(
                "mesh '{}' references vertex {} of {}",
                mesh.name, bad, vertex_count
            )));
        }
        let face = TrMeshFace {
            indices: polygon.indices,
            texture: textures.add(&polygon.texture, polygon.triangle),
            double_sided: polygon.texture.double_sided,
            shine: polygon.shine,
        };
        if polygon.triangle {
            out.triangles.push(face);
        } else {
            out.quads.push(face);
        }
    }

    Ok(out)
}

/// Three 10-bit angles packed into two words, high word first
fn pack_rotation(angles: Vec3) -> (u16, u16) {
    let ten_bits = |degrees: f32| ((degrees.rem_euclid(360.0) * 1024.0 / 360.0).round() as u32) & 0x3FF;
    let packed = (ten_bits(angles.x) << 20) | (ten_bits(angles.y) << 10) | ten_bits(angles.z);
    ((packed >> 16) as u16, (packed & 0xFFFF) as u16)
}

/// Append one keyframe; returns its size in words
fn write_keyframe(frames: &mut Vec<i16>, frame: &WadKeyFrame, mesh_count: usize, version: GameVersion) -> usize {
    let start = frames.len();
    frames.extend_from_slice(&frame.bounding_box);
    frames.extend_from_slice(&file_vector(frame.offset));

    if version == GameVersion::Tr1 {
        frames.push(mesh_count as i16);
    }
    for mesh in 0..mesh_count {
        let angles = frame.angles.get(mesh).copied().unwrap_or(Vec3::ZERO);
        let (high, low) = pack_rotation(angles);
        if version == GameVersion::Tr1 {
            frames.push(low as i16);
            frames.push(high as i16);
        } else {
            frames.push(high as i16);
            frames.push(low as i16);
        }
    }
    frames.len() - start
}

fn fixed(value: f32) -> i32 {
    Clamped::<i32>::from_f64(value as f64 * 65536.0).get()
}

fn anim_command_words(command: &WadAnimCommand, frame_start: u16) -> Vec<i16> {
    let mut words = vec![command.code()];
    match *command {
        WadAnimCommand::PositionOffset { x, y, z } => words.extend([x, y, z]),
        WadAnimCommand::JumpVelocity { horizontal, vertical } => words.extend([horizontal, vertical]),
        WadAnimCommand::EmptyHands | WadAnimCommand::KillEntity => {}
        WadAnimCommand::PlaySound { frame, sound } => {
            words.extend([frame.wrapping_add(frame_start) as i16, sound as i16])
        }
        WadAnimCommand::FlipEffect { frame, effect } => {
            words.extend([frame.wrapping_add(frame_start) as i16, effect as i16])
        }
    }
    words
}

impl ConvertedWad {
    fn add_animation(
        &mut self,
        animation: &WadAnimation,
        base: usize,
        frame_starts: &[u16],
        mesh_count: usize,
        version: GameVersion,
        index: usize,
    ) -> Result<()> {
        let frame_start = frame_starts[index];
        let frame_offset = self.frames.len() as u32 * 2;
        let mut frame_size = 0;
        for keyframe in &animation.keyframes {
            frame_size = write_keyframe(&mut self.frames, keyframe, mesh_count, version);
        }

        let resolve_next = |next: u16, frame: u16| -> Result<(u16, u16)> {
            let start = frame_starts.get(next as usize).copied().ok_or_else(|| {
                CompileError::InvalidLevel(format!(
                    "animation '{}' continues into missing animation {}",
                    animation.name, next
                ))
            })?;
            Ok((
                checked_u16("animation index", (base + next as usize) as i64)?,
                start.wrapping_add(frame),
            ))
        };

        let state_change_offset = checked_u16("state change index", self.state_changes.len() as i64)?;
        for change in &animation.state_changes {
            let dispatch_offset = checked_u16("dispatch index", self.anim_dispatches.len() as i64)?;
            for dispatch in &change.dispatches {
                let (next_animation, next_frame) = resolve_next(dispatch.next_animation, dispatch.next_frame)?;
                self.anim_dispatches.push(TrAnimDispatch {
                    low: dispatch.in_frame.wrapping_add(frame_start),
                    high: dispatch.out_frame.wrapping_add(frame_start),
                    next_animation,
                    next_frame,
                });
            }
            self.state_changes.push(TrStateChange {
                state_id: change.state_id,
                num_dispatches: checked_u16("dispatch count", change.dispatches.len() as i64)?,
                dispatch_offset,
            });
        }

        let anim_command = checked_u16("animation command index", self.anim_commands.len() as i64)?;
        for command in &animation.commands {
            self.anim_commands.extend(anim_command_words(command, frame_start));
        }

        let (next_animation, next_frame) = resolve_next(animation.next_animation, animation.next_frame)?;
        let frames = animation.end_frame.max(1) as f32;
        self.animations.push(TrAnimation {
            frame_offset,
            frame_rate: animation.frame_rate.max(1),
            frame_size: if version == GameVersion::Tr1 { 0 } else { checked_u8("frame size", frame_size as i64)? },
            state_id: animation.state_id,
            speed: fixed(animation.start_velocity),
            accel: fixed((animation.end_velocity - animation.start_velocity) / frames),
            lateral_speed: fixed(animation.start_lateral_velocity),
            lateral_accel: fixed((animation.end_lateral_velocity - animation.start_lateral_velocity) / frames),
            frame_start,
            frame_end: frame_start.wrapping_add(animation.end_frame.saturating_sub(1)),
            next_animation,
            next_frame,
            num_state_changes: checked_u16("state change count", animation.state_changes.len() as i64)?,
            state_change_offset,
            num_anim_commands: checked_u16("animation command count", animation.commands.len() as i64)?,
            anim_command,
        });
        Ok(())
    }

    fn add_moveable(
        &mut self,
        id: u32,
        moveable: &WadMoveable,
        version: GameVersion,
        textures: &mut TexInfoManager,
    ) -> Result<()> {
        let starting_mesh = checked_u16("starting mesh", self.meshes.len() as i64)?;
        for mesh in &moveable.meshes {
            let mesh = convert_mesh(mesh, textures)?;
            self.meshes.push(mesh);
        }

        let mesh_tree = self.mesh_trees.len() as u32;
        for bone in moveable.bones.iter().take(moveable.meshes.len().saturating_sub(1)) {
            let [x, y, z] = file_vector(bone.offset);
            self.mesh_trees.extend([bone.op.flags(), x as i32, y as i32, z as i32]);
        }

        let base = self.animations.len();
        let frame_offset = self.frames.len() as u32 * 2;
        let mut frame_starts = Vec::with_capacity(moveable.animations.len());
        let mut next_start: u32 = 0;
        for animation in &moveable.animations {
            frame_starts.push(checked_u16("animation frame", next_start as i64)?);
            next_start += animation.end_frame.max(1) as u32;
        }
        for (index, animation) in moveable.animations.iter().enumerate() {
            self.add_animation(animation, base, &frame_starts, moveable.meshes.len(), version, index)?;
        }

        self.moveables.push(TrMoveable {
            object_id: id,
            num_meshes: checked_u16("mesh count", moveable.meshes.len() as i64)?,
            starting_mesh,
            mesh_tree,
            frame_offset,
            animation: if moveable.animations.is_empty() {
                None
            } else {
                Some(checked_u16("animation index", base as i64)?)
            },
        });
        Ok(())
    }
}

/// Convert every object of the loaded WADs
pub(crate) fn convert_wads(
    settings: &LevelSettings,
    catalog: &Catalog,
    textures: &mut TexInfoManager,
    diagnostics: &Diagnostics,
) -> Result<ConvertedWad> {
    let version = settings.game_version;
    let mut out = ConvertedWad::default();

    let moveable_ids: BTreeSet<u32> = settings.loaded_wads().flat_map(|w| w.moveables.keys().copied()).collect();
    for id in moveable_ids {
        if let Some(moveable) = settings.wad_moveable(id) {
            out.add_moveable(id, moveable, version, textures)?;
        }
    }

    let static_ids: BTreeSet<u32> = settings.loaded_wads().flat_map(|w| w.statics.keys().copied()).collect();
    for id in static_ids {
        let Some(wad_static) = settings.wad_static(id) else {
            continue;
        };
        let mesh = checked_u16("static mesh", out.meshes.len() as i64)?;
        out.meshes.push(convert_mesh(&wad_static.mesh, textures)?);
        out.statics.push(TrStaticMesh {
            object_id: id,
            mesh,
            visibility_box: wad_static.visibility_box,
            collision_box: wad_static.collision_box,
            flags: wad_static.flags,
        });
    }

    let sprite_ids: BTreeSet<u32> = settings
        .loaded_wads()
        .flat_map(|w| w.sprite_sequences.keys().copied())
        .collect();
    for id in sprite_ids {
        let Some(sequence) = settings.wad_sprite_sequence(id) else {
            continue;
        };
        let offset = checked_i16("sprite texture index", out.sprite_textures.len() as i64)?;
        for sprite in &sequence.sprites {
            out.sprite_textures.push(TrSpriteTexture {
                page: sprite.page,
                x: sprite.x,
                y: sprite.y,
                width: sprite.width,
                height: sprite.height,
                left: sprite.alignment[0],
                top: sprite.alignment[1],
                right: sprite.alignment[2],
                bottom: sprite.alignment[3],
            });
        }
        out.sprite_sequences.push(TrSpriteSequence {
            object_id: id as i32,
            negative_length: -checked_i16("sprite count", sequence.sprites.len() as i64)?,
            offset,
        });
    }

    let map_size = Catalog::sound_map_size(version, settings.ng_sound_map_size);
    out.sound_map = vec![-1; map_size];
    let sound_ids: BTreeSet<u32> = settings.loaded_wads().flat_map(|w| w.sounds.keys().copied()).collect();
    for id in sound_ids {
        let Some(info) = settings.wad_sound(id) else {
            continue;
        };
        if id as usize >= map_size {
            diagnostics.warn(&format!(
                "Sound {} ({}) is outside the sound map of {} entries and was dropped.",
                id,
                catalog.sound_name(version, id),
                map_size
            ));
            continue;
        }
        out.sound_map[id as usize] = checked_i16("sound details index", out.sound_details.len() as i64)?;
        let sample = checked_u16("sample index", out.sample_indices.len() as i64)?;
        for data in &info.samples {
            out.sample_indices.push(out.samples.len() as u32);
            out.samples.push(data.data.clone());
        }
        let count = info.samples.len().min(0x3F) as u16;
        out.sound_details.push(TrSoundDetails {
            sample,
            volume: info.volume,
            range: info.range,
            chance: info.chance,
            pitch: info.pitch,
            characteristics: (info.flags & !0x00FC) | (count << 2),
        });
    }

    tracing::debug!(
        "Converted {} moveables, {} statics, {} meshes, {} sounds",
        out.moveables.len(),
        out.statics.len(),
        out.meshes.len(),
        out.sound_details.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::texture::TextureArea;
    use crate::level::ReferencedWad;
    use crate::progress::CollectingReporter;
    use crate::wad::{
        BoneOp, Wad, WadAnimDispatch, WadBone, WadPolygon, WadSample, WadSoundInfo, WadStateChange,
    };

    fn quad_mesh() -> WadMesh {
        WadMesh {
            name: "box".into(),
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(100.0, 0.0, 0.0),
                Vec3::new(100.0, 100.0, 0.0),
                Vec3::new(0.0, 100.0, 0.0),
            ],
            polygons: vec![WadPolygon {
                indices: [0, 1, 2, 3],
                triangle: false,
                texture: TextureArea::full_page(0),
                shine: 0,
            }],
            ..Default::default()
        }
    }

    fn animation(next: u16, frames: u16) -> WadAnimation {
        WadAnimation {
            name: String::new(),
            frame_rate: 1,
            state_id: 2,
            start_velocity: 1.0,
            end_velocity: 1.0,
            start_lateral_velocity: 0.0,
            end_lateral_velocity: 0.0,
            next_animation: next,
            next_frame: 0,
            end_frame: frames,
            keyframes: vec![WadKeyFrame {
                bounding_box: [0; 6],
                offset: Vec3::ZERO,
                angles: vec![Vec3::new(0.0, 90.0, 0.0); 2],
            }],
            state_changes: vec![],
            commands: vec![WadAnimCommand::PlaySound { frame: 1, sound: 7 }],
        }
    }

    #[test]
    fn test_mesh_conversion_flips_y_and_checks_indices() {
        let mut textures = TexInfoManager::new();
        let mesh = convert_mesh(&quad_mesh(), &mut textures).unwrap();
        assert_eq!(mesh.vertices[2], [100, -100, 0]);
        assert_eq!(mesh.quads.len(), 1);
        assert_eq!(mesh.shades.len(), 4);

        let mut broken = quad_mesh();
        broken.polygons[0].indices[3] = 9;
        assert!(matches!(
            convert_mesh(&broken, &mut textures),
            Err(CompileError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_rotation_packing() {
        assert_eq!(pack_rotation(Vec3::new(0.0, 90.0, 0.0)), (0x0004, 0x0000));
        assert_eq!(pack_rotation(Vec3::new(0.0, 0.0, 360.0)), (0, 0));
    }

    #[test]
    fn test_moveable_animations_link_absolutely() {
        let mut first = animation(1, 10);
        first.state_changes = vec![WadStateChange {
            state_id: 3,
            dispatches: vec![WadAnimDispatch {
                in_frame: 0,
                out_frame: 5,
                next_animation: 1,
                next_frame: 2,
            }],
        }];
        let moveable = WadMoveable {
            meshes: vec![quad_mesh(), quad_mesh()],
            bones: vec![WadBone {
                op: BoneOp::Push,
                offset: Vec3::new(0.0, 50.0, 0.0),
            }],
            animations: vec![first, animation(0, 4)],
        };

        let mut out = ConvertedWad::default();
        let mut textures = TexInfoManager::new();
        out.add_moveable(0, &moveable, GameVersion::Tr4, &mut textures).unwrap();
        out.add_moveable(1, &moveable, GameVersion::Tr4, &mut textures).unwrap();

        assert_eq!(out.mesh_trees[..4], [2, 0, -50, 0]);
        assert_eq!(out.animations.len(), 4);
        let second_moveable_first = &out.animations[2];
        assert_eq!(second_moveable_first.next_animation, 3);
        assert_eq!(second_moveable_first.next_frame, 10);
        assert_eq!(out.anim_dispatches[1].next_animation, 3);
        assert_eq!(out.anim_dispatches[1].next_frame, 12);
        assert_eq!(out.moveables[1].starting_mesh, 2);
        assert_eq!(out.moveables[1].animation, Some(2));
        // Nine header words plus two per mesh
        assert_eq!(out.animations[0].frame_size, 13);
        // Frame numbers in commands are absolute
        assert_eq!(out.anim_commands[..3], [5, 1, 7]);
        assert_eq!(textures.len(), 1);
    }

    #[test]
    fn test_sound_map_drops_out_of_range_sounds() {
        let mut wad = Wad::default();
        let info = WadSoundInfo {
            volume: 100,
            range: 10,
            chance: 100,
            pitch: 0,
            flags: 1,
            samples: vec![WadSample::default(), WadSample::default()],
        };
        wad.sounds.insert(3, info.clone());
        wad.sounds.insert(400, info);
        let mut settings = LevelSettings::new(GameVersion::Tr4);
        settings.wads.push(ReferencedWad {
            path: "test.wad".into(),
            wad: Some(wad),
        });

        let reporter = CollectingReporter::new();
        let diagnostics = Diagnostics::new(&reporter);
        let mut textures = TexInfoManager::new();
        let out = convert_wads(&settings, &Catalog::empty(), &mut textures, &diagnostics).unwrap();

        assert_eq!(out.sound_map.len(), 370);
        assert_eq!(out.sound_map[3], 0);
        assert_eq!(out.sound_details[0].characteristics, 1 | (2 << 2));
        assert_eq!(out.samples.len(), 2);
        assert_eq!(reporter.warnings().len(), 1);
    }

    #[test]
    fn test_sample_count_saturates() {
        let mut wad = Wad::default();
        wad.sounds.insert(
            0,
            WadSoundInfo {
                volume: 100,
                range: 10,
                chance: 100,
                pitch: 0,
                flags: 0,
                samples: vec![WadSample::default(); 0x1_0001],
            },
        );
        let mut settings = LevelSettings::new(GameVersion::Tr4);
        settings.wads.push(ReferencedWad {
            path: "test.wad".into(),
            wad: Some(wad),
        });

        let reporter = CollectingReporter::new();
        let diagnostics = Diagnostics::new(&reporter);
        let mut textures = TexInfoManager::new();
        let out = convert_wads(&settings, &Catalog::empty(), &mut textures, &diagnostics).unwrap();

        assert_eq!(out.sound_details[0].characteristics, 0x3F << 2);
    }
}
