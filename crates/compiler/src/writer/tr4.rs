// Compressed layouts: TR4, TRNG and TR5
//
// Texture pages and (for TR4) the level data are stored as zlib chunks. Samples follow
// the level data as embedded WAV files. TRNG levels end with an NGLE footer; TR5 wraps
// each room in an XELA block.

use super::{
    box_with_material, checked_bits, count_u16, count_u32, rgb555, rgb888, write_camera, write_portals,
    write_object_texture_records, write_position_i32, write_room_geometry, write_room_info, write_sectors,
    write_sprite_records, write_zlib_chunk, LevelLayout,
};
use crate::compiled::{CompiledLevel, TrAiItem, TrFlybyCamera, TrItem, TrLight, TrMoveable, TrRoom, TrRoomVertex};
use crate::error::Result;
use crate::level::math::Vec3;
use crate::level::objects::LightType;
use crate::level::texture::TEXTURE_PAGE_SIZE;
use crate::numeric::{Checked, Clamped};
use crate::textures::{page_argb1555, page_bgra32, ObjectTexture};
use crate::version::GameVersion;
use levelc_shared::util::byte_buffer::ByteBuffer;

/// Chunk id of the TRNG version record in the NGLE footer
const NG_CHUNK_VERSION: u16 = 0x8047;

/// Font and sky pages appended after the room pages
const MISC_PAGE_COUNT: usize = 2;

const XELA_SEPARATOR: u32 = 0xCDCD_CDCD;

pub struct Tr4Layout {
    pub ng: bool,
}

pub struct Tr5Layout;

fn light_type_code(light_type: LightType) -> u8 {
    match light_type {
        LightType::Sun => 0,
        LightType::Point | LightType::Effect => 1,
        LightType::Spot => 2,
        LightType::Shadow => 3,
        LightType::FogBulb => 4,
    }
}

/// Cone cosines for spots, ranges for everything else
fn light_falloff(light: &TrLight) -> (f32, f32, f32, f32) {
    if light.light_type == LightType::Spot {
        (
            light.inner_angle.to_radians().cos(),
            light.outer_angle.to_radians().cos(),
            light.inner_range,
            light.outer_range,
        )
    } else {
        (light.inner_range, light.outer_range, 0.0, 0.0)
    }
}

fn write_pages(out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
    out.write_u16(count_u16("room texture page count", level.texture_pages.len())?);
    // Object and bump pages are folded into the room pages
    out.write_u16(0);
    out.write_u16(0);

    let mut pages32 = Vec::new();
    let mut pages16 = ByteBuffer::new();
    for page in &level.texture_pages {
        pages32.extend(page_bgra32(page));
        for pixel in page_argb1555(page) {
            pages16.write_u16(pixel);
        }
    }
    write_zlib_chunk(out, &pages32)?;
    write_zlib_chunk(out, pages16.contents())?;

    let misc = vec![0u8; MISC_PAGE_COUNT * (TEXTURE_PAGE_SIZE * TEXTURE_PAGE_SIZE * 4) as usize];
    write_zlib_chunk(out, &misc)
}

fn write_samples(out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
    out.write_u32(count_u32("sample count", level.samples.len())?);
    for sample in &level.samples {
        let size = count_u32("sample size", sample.len())?;
        out.write_u32(size);
        out.write_u32(size);
        out.append(sample);
    }
    Ok(())
}

/// TR4-style object texture; TR5 appends a filler word
fn write_new_object_texture(out: &mut ByteBuffer, texture: &ObjectTexture, filler: bool) {
    out.write_u16(texture.blend_mode.attribute());
    let triangle = if texture.triangle { 0x8000 } else { 0 };
    out.write_u16((texture.page & 0x7FFF) | triangle);
    out.write_u16(if texture.double_sided { 0x0001 } else { 0 });
    for [u, v] in texture.legacy_uv() {
        out.write_u16(u);
        out.write_u16(v);
    }
    let (x, y, width, height) = texture.bounds();
    out.write_u32(x);
    out.write_u32(y);
    out.write_u32(width);
    out.write_u32(height);
    if filler {
        out.write_u16(0);
    }
}

fn write_new_item(out: &mut ByteBuffer, item: &TrItem) {
    out.write_u16(item.object_id);
    out.write_i16(item.room);
    write_position_i32(out, item.position);
    out.write_u16(item.angle);
    out.write_u16(item.color);
    out.write_i16(item.ocb);
    out.write_u16(item.flags);
}

fn write_ai_item(out: &mut ByteBuffer, item: &TrAiItem) {
    out.write_u16(item.object_id);
    out.write_u16(item.room);
    write_position_i32(out, item.position);
    out.write_i16(item.ocb);
    out.write_u16(item.flags);
    out.write_i32(item.angle);
}

fn write_flyby(out: &mut ByteBuffer, camera: &TrFlybyCamera) {
    write_position_i32(out, camera.position);
    write_position_i32(out, camera.direction);
    out.write_u8(camera.sequence);
    out.write_u8(camera.index);
    out.write_u16(camera.fov);
    out.write_i16(camera.roll);
    out.write_u16(camera.timer);
    out.write_u16(camera.speed);
    out.write_u16(camera.flags);
    out.write_u32(camera.room);
}

/// Items, then AI objects
fn write_items_and_ai(layout: &dyn LevelLayout, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
    out.write_u32(count_u32("item count", level.items.len())?);
    for item in &level.items {
        layout.write_item(out, item)?;
    }
    out.write_u32(count_u32("AI object count", level.ai_items.len())?);
    for item in &level.ai_items {
        write_ai_item(out, item);
    }
    Ok(())
}

fn write_cameras_and_flybys(out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
    out.write_u32(count_u32("camera count", level.cameras.len())?);
    for camera in &level.cameras {
        write_camera(out, camera);
    }
    out.write_u32(count_u32("flyby camera count", level.flyby_cameras.len())?);
    for camera in &level.flyby_cameras {
        write_flyby(out, camera);
    }
    Ok(())
}

fn write_new_trailer(layout: &dyn LevelLayout, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
    out.write_u16(level.ng_demo_data);
    for entry in &level.sound_map {
        out.write_i16(*entry);
    }
    out.write_u32(count_u32("sound details count", level.sound_details.len())?);
    for details in &level.sound_details {
        layout.write_sound_details(out, details);
    }
    out.write_u32(count_u32("sample index count", level.sample_indices.len())?);
    for index in &level.sample_indices {
        out.write_u32(*index);
    }
    Ok(())
}

fn argb(color: Vec3) -> u32 {
    let [r, g, b] = rgb888(color);
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// `NG` marker, version chunk, then `NGLE` and the footer size
fn write_ngle_footer(out: &mut ByteBuffer, version: &str) {
    let start = out.size();
    out.append(b"NG");

    let parts: Vec<u16> = version
        .split('.')
        .map(|part| part.trim().parse::<u16>().unwrap_or(0))
        .chain(std::iter::repeat(0))
        .take(4)
        .collect();
    // Chunk size in words includes the size and id words
    out.write_u16(2 + parts.len() as u16);
    out.write_u16(NG_CHUNK_VERSION);
    for part in parts {
        out.write_u16(part);
    }

    out.write_tag(b"NGLE");
    let size = (out.size() + 4 - start) as u32;
    out.write_u32(size);
}

impl LevelLayout for Tr4Layout {
    fn version(&self) -> GameVersion {
        if self.ng { GameVersion::Trng } else { GameVersion::Tr4 }
    }

    fn write_file(&self, level: &CompiledLevel) -> Result<Vec<u8>> {
        let mut out = ByteBuffer::new();
        out.append(&self.version().magic());
        write_pages(&mut out, level)?;

        let mut body = ByteBuffer::new();
        self.write_level_body(&mut body, level)?;
        write_zlib_chunk(&mut out, body.contents())?;
        write_samples(&mut out, level)?;

        if self.ng {
            write_ngle_footer(&mut out, &level.trng_version);
        }
        Ok(out.into_inner())
    }

    fn write_room(&self, out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
        write_room_info(out, room);
        write_room_geometry(out, room, self.version(), write_new_vertex)?;
        write_portals(out, room)?;
        write_sectors(out, room, box_with_material)?;
        out.write_u32(argb(room.ambient));

        out.write_u16(count_u16("room light count", room.lights.len())?);
        for light in &room.lights {
            write_position_i32(out, light.position);
            out.append(&rgb888(light.color));
            out.write_u8(light_type_code(light.light_type));
            out.write_u8(0xFF);
            out.write_u8(Clamped::<u8>::from_f64((light.intensity * 31.0) as f64).get());
            let (inner, outer, length, cutoff) = light_falloff(light);
            out.write_f32(inner);
            out.write_f32(outer);
            out.write_f32(length);
            out.write_f32(cutoff);
            out.write_f32(light.direction.x);
            out.write_f32(-light.direction.y);
            out.write_f32(light.direction.z);
        }

        out.write_u16(count_u16("room static count", room.statics.len())?);
        for item in &room.statics {
            write_position_i32(out, item.position);
            out.write_u16(item.rotation);
            out.write_u16(rgb555(item.color));
            out.write_i16(item.ocb);
            out.write_u16(Checked::<u16>::new("static object id", item.object_id as i64)?.get());
        }

        let alternate = match room.alternate_room {
            Some(index) => Checked::<i16>::new("alternate room", index as i64)?.get(),
            None => -1,
        };
        out.write_i16(alternate);
        out.write_u16(room.flags);
        out.write_u8(room.water_scheme);
        out.write_u8(room.reverb);
        out.write_u8(Clamped::<u8>::from_i64(room.alternate_group as i64).get());
        Ok(())
    }

    fn write_object_texture(&self, out: &mut ByteBuffer, texture: &ObjectTexture) -> Result<()> {
        write_new_object_texture(out, texture, false);
        Ok(())
    }

    fn write_item(&self, out: &mut ByteBuffer, item: &TrItem) -> Result<()> {
        write_new_item(out, item);
        Ok(())
    }

    fn write_sprites(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.append(b"SPR");
        write_sprite_records(self, out, level)
    }

    fn write_cameras(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_cameras_and_flybys(out, level)
    }

    fn write_animated_textures(&self, out: &mut ByteBuffer) {
        out.write_u32(1);
        out.write_u16(0);
        // UV ranges
        out.write_u8(0);
    }

    fn write_object_textures(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.write_tag(b"TEX\0");
        write_object_texture_records(self, out, level)
    }

    fn write_items(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_items_and_ai(self, out, level)
    }

    fn write_trailer(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_new_trailer(self, out, level)
    }
}

fn write_new_vertex(out: &mut ByteBuffer, vertex: &TrRoomVertex) -> Result<()> {
    for value in vertex.position {
        out.write_i16(Checked::<i16>::new("room vertex", value as i64)?.get());
    }
    // Lighting, attributes
    out.write_i16(0);
    out.write_u16(0);
    out.write_u16(rgb555(vertex.color));
    Ok(())
}

impl Tr5Layout {
    fn write_xela_light(out: &mut ByteBuffer, light: &TrLight) {
        let [x, y, z] = light.position;
        out.write_f32(x as f32);
        out.write_f32(y as f32);
        out.write_f32(z as f32);
        out.write_f32(light.color.x);
        out.write_f32(light.color.y);
        out.write_f32(light.color.z);
        out.write_u32(XELA_SEPARATOR);
        let (inner, outer, length, cutoff) = light_falloff(light);
        out.write_f32(inner);
        out.write_f32(outer);
        out.write_f32(length);
        out.write_f32(cutoff);
        out.write_f32(light.intensity);
        out.write_f32(light.direction.x);
        out.write_f32(-light.direction.y);
        out.write_f32(light.direction.z);
        write_position_i32(out, light.position);
        for component in [light.direction.x, -light.direction.y, light.direction.z] {
            out.write_i32(Clamped::<i32>::from_f64((component * 16384.0) as f64).get());
        }
        out.write_u8(light_type_code(light.light_type));
        out.append_zeros(3);
    }

    /// Vertices as floats with a packed colour, faces as index lists
    fn write_xela_geometry(out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
        out.write_u32(count_u32("room vertex count", room.vertices.len())?);
        for vertex in &room.vertices {
            let [x, y, z] = vertex.position;
            out.write_f32(x as f32);
            out.write_f32(y as f32);
            out.write_f32(z as f32);
            out.write_u32(argb(vertex.color));
        }

        let quads: Vec<_> = room.quads().collect();
        let triangles: Vec<_> = room.triangles().collect();
        out.write_u32(count_u32("room quad count", quads.len())?);
        out.write_u32(count_u32("room triangle count", triangles.len())?);
        for (faces, corners) in [(quads, 4), (triangles, 3)] {
            for face in faces {
                for index in &face.indices[..corners] {
                    out.write_u16(Checked::<u16>::new("room vertex index", *index as i64)?.get());
                }
                out.write_u16(checked_bits("face texture", face.texture, 15)?);
                out.write_u16(face.double_sided as u16);
            }
        }
        Ok(())
    }
}

impl LevelLayout for Tr5Layout {
    fn version(&self) -> GameVersion {
        GameVersion::Tr5
    }

    fn write_file(&self, level: &CompiledLevel) -> Result<Vec<u8>> {
        let mut out = ByteBuffer::new();
        out.append(&self.version().magic());
        write_pages(&mut out, level)?;
        out.write_u16(level.tr5_lara_type);
        out.write_u16(level.tr5_weather);
        out.append_zeros(28);

        let mut body = ByteBuffer::new();
        self.write_level_body(&mut body, level)?;
        let size = count_u32("level data size", body.size())?;
        out.write_u32(size);
        out.write_u32(size);
        out.append(body.contents());

        write_samples(&mut out, level)?;
        Ok(out.into_inner())
    }

    fn write_room(&self, out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
        out.write_tag(b"XELA");
        let size_at = out.size();
        out.write_u32(0);

        write_room_info(out, room);
        write_sectors(out, room, box_with_material)?;
        write_portals(out, room)?;
        out.write_u32(XELA_SEPARATOR);
        out.write_u32(argb(room.ambient));

        out.write_u16(count_u16("room light count", room.lights.len())?);
        for light in &room.lights {
            Self::write_xela_light(out, light);
        }

        out.write_u16(count_u16("room static count", room.statics.len())?);
        for item in &room.statics {
            write_position_i32(out, item.position);
            out.write_u16(item.rotation);
            out.write_u16(rgb555(item.color));
            out.write_i16(item.ocb);
            out.write_u16(Checked::<u16>::new("static object id", item.object_id as i64)?.get());
        }

        let alternate = match room.alternate_room {
            Some(index) => Checked::<i16>::new("alternate room", index as i64)?.get(),
            None => -1,
        };
        out.write_i16(alternate);
        out.write_u16(room.flags);
        out.write_u8(room.water_scheme);
        out.write_u8(room.reverb);
        out.write_u8(Clamped::<u8>::from_i64(room.alternate_group as i64).get());
        out.write_u8(0);

        Self::write_xela_geometry(out, room)?;

        let size = count_u32("room block size", out.size() - size_at - 4)?;
        out.patch_u32(size_at, size)?;
        Ok(())
    }

    fn write_object_texture(&self, out: &mut ByteBuffer, texture: &ObjectTexture) -> Result<()> {
        write_new_object_texture(out, texture, true);
        Ok(())
    }

    fn write_item(&self, out: &mut ByteBuffer, item: &TrItem) -> Result<()> {
        write_new_item(out, item);
        Ok(())
    }

    fn write_moveable(&self, out: &mut ByteBuffer, moveable: &TrMoveable) {
        out.write_u32(moveable.object_id);
        out.write_u16(moveable.num_meshes);
        out.write_u16(moveable.starting_mesh);
        out.write_u32(moveable.mesh_tree);
        out.write_u32(moveable.frame_offset);
        out.write_u16(moveable.animation.unwrap_or(0xFFFF));
        out.write_u16(0xFFEF);
    }

    fn write_sprites(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.write_tag(b"SPR\0");
        write_sprite_records(self, out, level)
    }

    fn write_cameras(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_cameras_and_flybys(out, level)
    }

    fn write_animated_textures(&self, out: &mut ByteBuffer) {
        out.write_u32(1);
        out.write_u16(0);
        out.write_u8(0);
    }

    fn write_object_textures(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.write_tag(b"TEX\0");
        write_object_texture_records(self, out, level)
    }

    fn write_items(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_items_and_ai(self, out, level)
    }

    fn write_trailer(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_new_trailer(self, out, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::tests::sample_level;
    use crate::writer::write_level;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    #[test]
    fn test_trng_ends_with_ngle_footer() {
        let level = sample_level(GameVersion::Trng);
        let bytes = write_level(&level).unwrap();
        let tail = &bytes[bytes.len() - 8..];
        assert_eq!(&tail[..4], b"NGLE");

        let size = u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]) as usize;
        let start = bytes.len() - size;
        assert_eq!(&bytes[start..start + 2], b"NG");
        // Version words 1.3.0.7 after size and id
        assert_eq!(&bytes[start + 6..start + 8], &1u16.to_le_bytes());
        assert_eq!(&bytes[start + 12..start + 14], &7u16.to_le_bytes());

        let plain = write_level(&sample_level(GameVersion::Tr4)).unwrap();
        assert_ne!(&plain[plain.len() - 8..plain.len() - 4], b"NGLE");
    }

    #[test]
    fn test_tr4_chunks_decompress() {
        let level = sample_level(GameVersion::Tr4);
        let mut read = ByteBuffer::from_bytes(write_level(&level).unwrap());
        read.read_skip(4);
        assert_eq!(read.read_u16().unwrap(), 1);
        read.read_skip(4);

        let uncompressed = read.read_u32().unwrap() as usize;
        let compressed = read.read_u32().unwrap() as usize;
        let data = read.read_bytes(compressed).unwrap();
        let mut pages = Vec::new();
        ZlibDecoder::new(&data[..]).read_to_end(&mut pages).unwrap();
        assert_eq!(pages.len(), uncompressed);
        // Blank pages: opaque black in B, G, R, A order
        assert_eq!(&pages[..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_xela_block_size_is_patched() {
        let level = sample_level(GameVersion::Tr5);
        let mut out = ByteBuffer::new();
        Tr5Layout.write_room(&mut out, &level.rooms[0]).unwrap();
        let bytes = out.into_inner();
        assert_eq!(&bytes[..4], b"XELA");
        let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        assert_eq!(size, bytes.len() - 8);
    }
}
