// Level writer
//
// A `LevelLayout` is picked once per compile from the target version. The shared
// sequencing of the level data block lives in `write_level_body`; layouts override
// the record formats and the sections whose position or shape differs per engine.

pub mod legacy;
pub mod ten;
pub mod tr4;

use crate::compiled::{
    CompiledLevel, TrAnimation, TrBox, TrCamera, TrItem, TrMesh, TrMeshFace, TrMoveable, TrPortal, TrRoom,
    TrRoomStatic, TrSector, TrSoundDetails, TrSoundSource, TrSpriteTexture, TrStaticMesh,
};
use crate::error::{CompileError, Result};
use crate::level::math::Vec3;
use crate::numeric::{Checked, Clamped};
use crate::textures::ObjectTexture;
use crate::version::GameVersion;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use levelc_shared::util::byte_buffer::ByteBuffer;
use std::io::Write;

pub use legacy::{Tr1Layout, Tr2Layout, Tr3Layout};
pub use ten::TenLayout;
pub use tr4::{Tr4Layout, Tr5Layout};

/// Record formats and section order of one engine's level file
pub trait LevelLayout: Send + Sync {
    fn version(&self) -> GameVersion;

    /// Complete file: header, texture pages, level data and trailing blocks
    fn write_file(&self, level: &CompiledLevel) -> Result<Vec<u8>>;

    fn write_room(&self, out: &mut ByteBuffer, room: &TrRoom) -> Result<()>;

    fn write_object_texture(&self, out: &mut ByteBuffer, texture: &ObjectTexture) -> Result<()>;

    fn write_item(&self, out: &mut ByteBuffer, item: &TrItem) -> Result<()>;

    /// Everything after the items: light map, palette, sound map, sound details, samples
    fn write_trailer(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()>;

    fn write_mesh(&self, out: &mut ByteBuffer, mesh: &TrMesh) -> Result<()> {
        let version = self.version();
        write_vertex_i16(out, mesh.center);
        out.write_i32(mesh.radius);

        out.write_i16(count_i16("mesh vertex count", mesh.vertices.len())?);
        for vertex in &mesh.vertices {
            write_vertex_i16(out, *vertex);
        }

        if mesh.normals.is_empty() {
            out.write_i16(-count_i16("mesh shade count", mesh.shades.len())?);
            for shade in &mesh.shades {
                out.write_i16(*shade);
            }
        } else {
            out.write_i16(count_i16("mesh normal count", mesh.normals.len())?);
            for normal in &mesh.normals {
                write_vertex_i16(out, *normal);
            }
        }

        for (faces, corners) in [(&mesh.quads, 4), (&mesh.triangles, 3)] {
            out.write_i16(count_i16("mesh face count", faces.len())?);
            for face in faces.iter() {
                write_mesh_face(out, face, corners, version)?;
            }
        }

        if !version.is_new_tr() {
            // Coloured rectangles and triangles
            out.write_i16(0);
            out.write_i16(0);
        }
        Ok(())
    }

    fn write_animation(&self, out: &mut ByteBuffer, animation: &TrAnimation) {
        out.write_u32(animation.frame_offset);
        out.write_u8(animation.frame_rate);
        out.write_u8(animation.frame_size);
        out.write_u16(animation.state_id);
        out.write_i32(animation.speed);
        out.write_i32(animation.accel);
        if self.version() >= GameVersion::Tr4 {
            out.write_i32(animation.lateral_speed);
            out.write_i32(animation.lateral_accel);
        }
        out.write_u16(animation.frame_start);
        out.write_u16(animation.frame_end);
        out.write_u16(animation.next_animation);
        out.write_u16(animation.next_frame);
        out.write_u16(animation.num_state_changes);
        out.write_u16(animation.state_change_offset);
        out.write_u16(animation.num_anim_commands);
        out.write_u16(animation.anim_command);
    }

    fn write_moveable(&self, out: &mut ByteBuffer, moveable: &TrMoveable) {
        out.write_u32(moveable.object_id);
        out.write_u16(moveable.num_meshes);
        out.write_u16(moveable.starting_mesh);
        out.write_u32(moveable.mesh_tree);
        out.write_u32(moveable.frame_offset);
        out.write_u16(moveable.animation.unwrap_or(0xFFFF));
    }

    fn write_static(&self, out: &mut ByteBuffer, mesh: &TrStaticMesh) {
        out.write_u32(mesh.object_id);
        out.write_u16(mesh.mesh);
        for value in mesh.visibility_box.iter().chain(mesh.collision_box.iter()) {
            out.write_i16(*value);
        }
        out.write_u16(mesh.flags);
    }

    fn write_sprite_texture(&self, out: &mut ByteBuffer, sprite: &TrSpriteTexture) {
        out.write_u16(sprite.page);
        out.write_u8(Clamped::<u8>::from_i64(sprite.x as i64).get());
        out.write_u8(Clamped::<u8>::from_i64(sprite.y as i64).get());
        out.write_u16(edge_extent(sprite.width));
        out.write_u16(edge_extent(sprite.height));
        out.write_i16(sprite.left);
        out.write_i16(sprite.top);
        out.write_i16(sprite.right);
        out.write_i16(sprite.bottom);
    }

    fn write_sprites(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_sprite_records(self, out, level)
    }

    fn write_cameras(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.write_u32(count_u32("camera count", level.cameras.len())?);
        for camera in &level.cameras {
            write_camera(out, camera);
        }
        Ok(())
    }

    fn write_sound_source(&self, out: &mut ByteBuffer, source: &TrSoundSource) -> Result<()> {
        write_position_i32(out, source.position);
        out.write_u16(Checked::<u16>::new("sound source id", source.sound_id as i64)?.get());
        out.write_u16(source.flags);
        Ok(())
    }

    /// Sector-unit box with the blockable bit on the overlap index
    fn write_box(&self, out: &mut ByteBuffer, b: &TrBox) -> Result<()> {
        for (field, value) in [
            ("box z min", b.z_min),
            ("box z max", b.z_max),
            ("box x min", b.x_min),
            ("box x max", b.x_max),
        ] {
            out.write_u8(Checked::<u8>::new(field, value as i64)?.get());
        }
        out.write_i16(Checked::<i16>::new("box floor", b.true_floor as i64)?.get());
        out.write_u16(overlap_field(b)?);
        Ok(())
    }

    /// Step 1-4 ground zones and fly zone, normal set then flipped set
    fn write_zones(&self, out: &mut ByteBuffer, level: &CompiledLevel) {
        for set in [&level.zones.normal, &level.zones.flipped] {
            for zone in set.iter() {
                for value in zone {
                    out.write_u16(*value);
                }
            }
        }
    }

    fn write_animated_textures(&self, out: &mut ByteBuffer) {
        // One word: zero ranges
        out.write_u32(1);
        out.write_u16(0);
    }

    fn write_object_textures(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_object_texture_records(self, out, level)
    }

    /// Whether object textures follow the static meshes (older engines) or the
    /// animated textures
    fn object_textures_after_statics(&self) -> bool {
        false
    }

    fn write_items(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.write_u32(count_u32("item count", level.items.len())?);
        for item in &level.items {
            self.write_item(out, item)?;
        }
        Ok(())
    }

    fn write_sound_details(&self, out: &mut ByteBuffer, details: &TrSoundDetails) {
        out.write_u16(details.sample);
        out.write_u8(details.volume);
        out.write_u8(details.range);
        out.write_u8(details.chance);
        out.write_u8(details.pitch);
        out.write_u16(details.characteristics);
    }

    /// The level data block shared by every classic engine
    fn write_level_body(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.write_u32(0);

        out.write_u16(count_u16("room count", level.rooms.len())?);
        for room in &level.rooms {
            self.write_room(out, room)?;
        }

        out.write_u32(count_u32("floor data size", level.floor_data.len())?);
        for word in &level.floor_data {
            out.write_u16(*word);
        }

        write_meshes(self, out, &level.meshes)?;

        out.write_u32(count_u32("animation count", level.animations.len())?);
        for animation in &level.animations {
            self.write_animation(out, animation);
        }
        out.write_u32(count_u32("state change count", level.state_changes.len())?);
        for change in &level.state_changes {
            out.write_u16(change.state_id);
            out.write_u16(change.num_dispatches);
            out.write_u16(change.dispatch_offset);
        }
        out.write_u32(count_u32("dispatch count", level.anim_dispatches.len())?);
        for dispatch in &level.anim_dispatches {
            out.write_u16(dispatch.low);
            out.write_u16(dispatch.high);
            out.write_u16(dispatch.next_animation);
            out.write_u16(dispatch.next_frame);
        }
        out.write_u32(count_u32("anim command count", level.anim_commands.len())?);
        for word in &level.anim_commands {
            out.write_i16(*word);
        }
        out.write_u32(count_u32("mesh tree size", level.mesh_trees.len())?);
        for word in &level.mesh_trees {
            out.write_i32(*word);
        }
        out.write_u32(count_u32("frame size", level.frames.len())?);
        for word in &level.frames {
            out.write_i16(*word);
        }

        out.write_u32(count_u32("moveable count", level.moveables.len())?);
        for moveable in &level.moveables {
            self.write_moveable(out, moveable);
        }
        out.write_u32(count_u32("static mesh count", level.statics.len())?);
        for mesh in &level.statics {
            self.write_static(out, mesh);
        }

        if self.object_textures_after_statics() {
            self.write_object_textures(out, level)?;
        }

        self.write_sprites(out, level)?;
        self.write_cameras(out, level)?;

        out.write_u32(count_u32("sound source count", level.sound_sources.len())?);
        for source in &level.sound_sources {
            self.write_sound_source(out, source)?;
        }

        out.write_u32(count_u32("box count", level.boxes.len())?);
        for b in &level.boxes {
            self.write_box(out, b)?;
        }
        out.write_u32(count_u32("overlap count", level.overlaps.len())?);
        for overlap in &level.overlaps {
            out.write_u16(*overlap);
        }
        self.write_zones(out, level);

        self.write_animated_textures(out);
        if !self.object_textures_after_statics() {
            self.write_object_textures(out, level)?;
        }

        self.write_items(out, level)?;
        self.write_trailer(out, level)
    }
}

/// Layout for a target version
pub fn layout_for(version: GameVersion) -> Box<dyn LevelLayout> {
    match version {
        GameVersion::Tr1 => Box::new(Tr1Layout),
        GameVersion::Tr2 => Box::new(Tr2Layout),
        GameVersion::Tr3 => Box::new(Tr3Layout),
        GameVersion::Tr4 => Box::new(Tr4Layout { ng: false }),
        GameVersion::Trng => Box::new(Tr4Layout { ng: true }),
        GameVersion::Tr5 => Box::new(Tr5Layout),
        GameVersion::TombEngine => Box::new(TenLayout),
    }
}

/// Serialize a compiled level in the format of its version
pub fn write_level(level: &CompiledLevel) -> Result<Vec<u8>> {
    let version = level
        .version
        .ok_or_else(|| CompileError::Invariant("compiled level has no target version".into()))?;
    let layout = layout_for(version);
    tracing::debug!("Writing {} level", layout.version());
    layout.write_file(level)
}

// ---- Field helpers shared by the layouts ----

pub(crate) fn count_u16(field: &'static str, count: usize) -> Result<u16> {
    Ok(Checked::<u16>::new(field, count as i64)?.get())
}

pub(crate) fn count_i16(field: &'static str, count: usize) -> Result<i16> {
    Ok(Checked::<i16>::new(field, count as i64)?.get())
}

pub(crate) fn count_u32(field: &'static str, count: usize) -> Result<u32> {
    Ok(Checked::<u32>::new(field, count as i64)?.get())
}

/// Value that must fit in the low `bits` bits of a packed field
pub(crate) fn checked_bits(field: &'static str, value: u32, bits: u32) -> Result<u16> {
    let limit = (1u32 << bits) - 1;
    if value > limit {
        return Err(CompileError::NumericOverflow {
            field,
            ty: "packed field",
            value: value as i64,
        });
    }
    Ok(value as u16)
}

/// Optional room reference in a byte field; 255 means none
pub(crate) fn room_byte(field: &'static str, room: Option<u32>) -> Result<u8> {
    match room {
        Some(index) => Ok(Checked::<u8>::new(field, index as i64)?.get()),
        None => Ok(0xFF),
    }
}

pub(crate) fn write_position_i32(out: &mut ByteBuffer, position: [i32; 3]) {
    for value in position {
        out.write_i32(value);
    }
}

pub(crate) fn write_vertex_i16(out: &mut ByteBuffer, vertex: [i16; 3]) {
    for value in vertex {
        out.write_i16(value);
    }
}

pub(crate) fn write_position_i16(out: &mut ByteBuffer, field: &'static str, position: [i32; 3]) -> Result<()> {
    for value in position {
        out.write_i16(Checked::<i16>::new(field, value as i64)?.get());
    }
    Ok(())
}

/// Pixel extent in the classic 8.8 layout
fn edge_extent(pixels: u16) -> u16 {
    (pixels.saturating_sub(1).min(255) << 8) | 0xFF
}

/// Overlap index field of a box; 0x3FFF stands for "no overlaps"
pub(crate) fn overlap_field(b: &TrBox) -> Result<u16> {
    let index = match b.overlap_index {
        Some(index) => checked_bits("box overlap index", index, 14)?,
        None => 0x3FFF,
    };
    Ok(index | if b.blockable { 0x4000 } else { 0 })
}

/// Texture word of a face: the index plus the double-sided bit from TR3 on
pub(crate) fn face_texture(texture: u32, double_sided: bool, version: GameVersion) -> Result<u16> {
    let index = checked_bits("face texture", texture, 15)?;
    let double_sided = double_sided && version >= GameVersion::Tr3;
    Ok(index | if double_sided { 0x8000 } else { 0 })
}

fn write_mesh_face(out: &mut ByteBuffer, face: &TrMeshFace, corners: usize, version: GameVersion) -> Result<()> {
    for index in &face.indices[..corners] {
        out.write_u16(*index);
    }
    out.write_u16(face_texture(face.texture, face.double_sided && !version.is_new_tr(), version)?);
    if version.is_new_tr() {
        out.write_u16((face.double_sided as u16) | ((face.shine as u16 & 0x3F) << 1));
    }
    Ok(())
}

pub(crate) fn write_sprite_records<L: LevelLayout + ?Sized>(
    layout: &L,
    out: &mut ByteBuffer,
    level: &CompiledLevel,
) -> Result<()> {
    out.write_u32(count_u32("sprite texture count", level.sprite_textures.len())?);
    for sprite in &level.sprite_textures {
        layout.write_sprite_texture(out, sprite);
    }
    out.write_u32(count_u32("sprite sequence count", level.sprite_sequences.len())?);
    for sequence in &level.sprite_sequences {
        out.write_i32(sequence.object_id);
        out.write_i16(sequence.negative_length);
        out.write_i16(sequence.offset);
    }
    Ok(())
}

pub(crate) fn write_object_texture_records<L: LevelLayout + ?Sized>(
    layout: &L,
    out: &mut ByteBuffer,
    level: &CompiledLevel,
) -> Result<()> {
    out.write_u32(count_u32("object texture count", level.object_textures.len())?);
    for texture in &level.object_textures {
        layout.write_object_texture(out, texture)?;
    }
    Ok(())
}

/// Mesh data followed by one byte-offset pointer per mesh
pub(crate) fn write_meshes<L: LevelLayout + ?Sized>(layout: &L, out: &mut ByteBuffer, meshes: &[TrMesh]) -> Result<()> {
    let mut data = ByteBuffer::new();
    let mut pointers = Vec::with_capacity(meshes.len());
    for mesh in meshes {
        pointers.push(count_u32("mesh pointer", data.size())?);
        layout.write_mesh(&mut data, mesh)?;
        // Meshes start on four byte boundaries
        let padding = (4 - data.size() % 4) % 4;
        data.append_zeros(padding);
    }

    out.write_u32(count_u32("mesh data size", data.size() / 2)?);
    out.append(data.contents());
    out.write_u32(count_u32("mesh pointer count", pointers.len())?);
    for pointer in pointers {
        out.write_u32(pointer);
    }
    Ok(())
}

pub(crate) fn write_camera(out: &mut ByteBuffer, camera: &TrCamera) {
    write_position_i32(out, camera.position);
    out.write_i16(camera.room);
    out.write_u16(camera.flags);
}

pub(crate) fn write_portals(out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
    out.write_u16(count_u16("portal count", room.portals.len())?);
    for portal in &room.portals {
        write_portal(out, portal)?;
    }
    Ok(())
}

fn write_portal(out: &mut ByteBuffer, portal: &TrPortal) -> Result<()> {
    out.write_u16(Checked::<u16>::new("portal room", portal.adjoining_room as i64)?.get());
    write_vertex_i16(out, portal.normal);
    for vertex in &portal.vertices {
        write_position_i16(out, "portal vertex", *vertex)?;
    }
    Ok(())
}

/// Sector grid: dimensions, then x outer and z inner. `box_word` packs the box field.
pub(crate) fn write_sectors(
    out: &mut ByteBuffer,
    room: &TrRoom,
    box_word: impl Fn(&TrSector) -> Result<u16>,
) -> Result<()> {
    out.write_u16(room.num_z);
    out.write_u16(room.num_x);
    for sector in &room.sectors {
        out.write_u16(Checked::<u16>::new("floor data index", sector.floor_data_index as i64)?.get());
        out.write_u16(box_word(sector)?);
        out.write_u8(room_byte("room below", sector.room_below)?);
        out.write_i8(sector.floor);
        out.write_u8(room_byte("room above", sector.room_above)?);
        out.write_i8(sector.ceiling);
    }
    Ok(())
}

/// Box field with the material in the low nibble (TR3 and later)
pub(crate) fn box_with_material(sector: &TrSector) -> Result<u16> {
    let index = match sector.box_index {
        Some(index) => checked_bits("sector box index", index, 11)?,
        None => 0x7FF,
    };
    Ok((index << 4) | (sector.material as u16 & 0x0F))
}

/// Plain box field (TR1 and TR2)
pub(crate) fn box_plain(sector: &TrSector) -> Result<u16> {
    match sector.box_index {
        Some(index) => Ok(Checked::<u16>::new("sector box index", index as i64)?.get()),
        None => Ok(0xFFFF),
    }
}

/// Room geometry as a size-prefixed block of 16-bit words
pub(crate) fn write_room_geometry(
    out: &mut ByteBuffer,
    room: &TrRoom,
    version: GameVersion,
    write_vertex: impl Fn(&mut ByteBuffer, &crate::compiled::TrRoomVertex) -> Result<()>,
) -> Result<()> {
    let mut data = ByteBuffer::new();
    data.write_u16(count_u16("room vertex count", room.vertices.len())?);
    for vertex in &room.vertices {
        write_vertex(&mut data, vertex)?;
    }

    for (faces, corners) in [(room.quads().collect::<Vec<_>>(), 4), (room.triangles().collect::<Vec<_>>(), 3)] {
        data.write_u16(count_u16("room face count", faces.len())?);
        for face in faces {
            for index in &face.indices[..corners] {
                data.write_u16(Checked::<u16>::new("room vertex index", *index as i64)?.get());
            }
            data.write_u16(face_texture(face.texture, face.double_sided, version)?);
        }
    }
    // Room sprites
    data.write_u16(0);

    out.write_u32(count_u32("room data size", data.size() / 2)?);
    out.append(data.contents());
    Ok(())
}

pub(crate) fn write_room_info(out: &mut ByteBuffer, room: &TrRoom) {
    out.write_i32(room.x);
    out.write_i32(room.z);
    out.write_i32(room.y_bottom);
    out.write_i32(room.y_top);
}

/// 15-bit colour with 1.0 mapped to half intensity
pub(crate) fn rgb555(color: Vec3) -> u16 {
    let channel = |c: f32| Clamped::<u16>::from_f64((c * 16.0) as f64).get().min(31);
    (channel(color.x) << 10) | (channel(color.y) << 5) | channel(color.z)
}

/// 8-bit channels with 1.0 mapped to 128
pub(crate) fn rgb888(color: Vec3) -> [u8; 3] {
    let channel = |c: f32| Clamped::<u8>::from_f64((c * 128.0) as f64).get();
    [channel(color.x), channel(color.y), channel(color.z)]
}

/// Classic light intensity: 0 is brightest, 8191 is dark
pub(crate) fn classic_intensity(color: Vec3) -> i16 {
    let luminance = (color.x + color.y + color.z) / 3.0;
    Clamped::<i16>::from_f64(8191.0 - (luminance * 4096.0) as f64).get().clamp(0, 8191)
}

pub(crate) fn write_room_static_classic(out: &mut ByteBuffer, item: &TrRoomStatic, second_intensity: bool) -> Result<()> {
    write_position_i32(out, item.position);
    out.write_u16(item.rotation);
    let intensity = classic_intensity(item.color) as u16;
    out.write_u16(intensity);
    if second_intensity {
        out.write_u16(intensity);
    }
    out.write_u16(Checked::<u16>::new("static object id", item.object_id as i64)?.get());
    Ok(())
}

/// `u32` uncompressed size, `u32` compressed size, zlib stream
pub(crate) fn write_zlib_chunk(out: &mut ByteBuffer, data: &[u8]) -> Result<()> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;
    out.write_u32(count_u32("uncompressed chunk size", data.len())?);
    out.write_u32(count_u32("compressed chunk size", compressed.len())?);
    out.append(&compressed);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compiled::{TrFace, TrRoomVertex, TrZones};
    use crate::level::texture::{BlendMode, TexturePage};

    pub(crate) fn sample_level(version: GameVersion) -> CompiledLevel {
        let room = TrRoom {
            name: "Room 0".into(),
            x: 0,
            z: 0,
            y_bottom: 0,
            y_top: -1024,
            vertices: vec![
                TrRoomVertex { position: [1024, 0, 1024], color: Vec3::new(0.5, 0.5, 0.5) },
                TrRoomVertex { position: [2048, 0, 1024], color: Vec3::new(0.5, 0.5, 0.5) },
                TrRoomVertex { position: [2048, 0, 2048], color: Vec3::new(0.5, 0.5, 0.5) },
                TrRoomVertex { position: [1024, 0, 2048], color: Vec3::new(0.5, 0.5, 0.5) },
            ],
            faces: vec![TrFace {
                indices: [0, 1, 2, 3],
                triangle: false,
                texture: 0,
                double_sided: false,
                blend_mode: BlendMode::Normal,
            }],
            portals: Vec::new(),
            num_x: 3,
            num_z: 3,
            sectors: vec![TrSector::default(); 9],
            ambient: Vec3::new(0.25, 0.25, 0.25),
            lights: Vec::new(),
            statics: Vec::new(),
            alternate_room: None,
            alternate_group: 0,
            flags: 0,
            water_scheme: 0,
            reverb: 0,
        };
        CompiledLevel {
            version: Some(version),
            rooms: vec![room],
            floor_data: vec![0],
            object_textures: vec![ObjectTexture {
                page: 0,
                blend_mode: BlendMode::Normal,
                triangle: false,
                double_sided: false,
                uv: [[0.0, 0.0], [64.0, 0.0], [64.0, 64.0], [0.0, 64.0]],
            }],
            boxes: vec![TrBox {
                x_min: 1,
                x_max: 2,
                z_min: 1,
                z_max: 2,
                true_floor: 0,
                overlap_index: None,
                blockable: false,
                room: 0,
            }],
            zones: TrZones {
                normal: std::array::from_fn(|_| vec![0]),
                flipped: std::array::from_fn(|_| vec![0]),
            },
            sound_map: vec![-1; crate::catalog::Catalog::sound_map_size(version, 0)],
            texture_pages: vec![TexturePage::default()],
            trng_version: "1.3.0.7".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_every_version_starts_with_its_magic() {
        for version in GameVersion::ALL {
            let bytes = write_level(&sample_level(version)).unwrap();
            assert_eq!(&bytes[..4], &version.magic(), "{version}");
        }
    }

    #[test]
    fn test_missing_version_is_an_invariant_error() {
        let level = CompiledLevel::default();
        assert!(matches!(write_level(&level), Err(CompileError::Invariant(_))));
    }

    #[test]
    fn test_packed_field_helpers() {
        assert_eq!(checked_bits("x", 0x3FFF, 14).unwrap(), 0x3FFF);
        assert!(checked_bits("x", 0x4000, 14).is_err());
        assert_eq!(face_texture(5, true, GameVersion::Tr2).unwrap(), 5);
        assert_eq!(face_texture(5, true, GameVersion::Tr3).unwrap(), 0x8005);
        assert_eq!(room_byte("room below", None).unwrap(), 0xFF);
        assert!(room_byte("room below", Some(300)).is_err());

        let mut sector = TrSector { box_index: Some(3), material: 2, ..Default::default() };
        assert_eq!(box_with_material(&sector).unwrap(), 0x0032);
        sector.box_index = None;
        assert_eq!(box_with_material(&sector).unwrap(), 0x7FF2);
        assert_eq!(box_plain(&sector).unwrap(), 0xFFFF);
    }

    #[test]
    fn test_mesh_pointers_are_aligned() {
        let layout = Tr4Layout { ng: false };
        let mesh = TrMesh {
            vertices: vec![[0, 0, 0]],
            shades: vec![0],
            ..Default::default()
        };
        let mut out = ByteBuffer::new();
        write_meshes(&layout, &mut out, &[mesh.clone(), mesh]).unwrap();

        let mut read = ByteBuffer::from_bytes(out.into_inner());
        let words = read.read_u32().unwrap() as usize;
        read.read_skip(words * 2);
        assert_eq!(read.read_u32().unwrap(), 2);
        assert_eq!(read.read_u32().unwrap(), 0);
        let second = read.read_u32().unwrap();
        // 26 bytes of mesh padded to 28
        assert_eq!(second, 28);
        assert_eq!(words, 28);
    }

    #[test]
    fn test_overflowing_vertex_index_is_fatal() {
        let mut level = sample_level(GameVersion::Tr3);
        level.rooms[0].faces[0].indices = [0, 1, 2, 70_000];
        assert!(matches!(
            write_level(&level),
            Err(CompileError::NumericOverflow { field: "room vertex index", .. })
        ));
    }
}
