// Uncompressed layouts: TR1, TR2 and TR3
//
// These engines store 8-bit palettized pages (plus 16-bit pages from TR2 on) in front
// of the level data and keep the whole file uncompressed.

use super::{
    box_plain, box_with_material, classic_intensity, count_u16, count_u32, rgb555, write_portals, write_position_i32,
    write_room_geometry, write_room_info, write_room_static_classic, write_sectors, LevelLayout,
};
use crate::compiled::{CompiledLevel, TrBox, TrItem, TrLight, TrRoom, TrRoomVertex, TrSoundDetails};
use crate::error::Result;
use crate::numeric::{Checked, Clamped};
use crate::textures::{cube_palette, page_argb1555, page_palette8, ObjectTexture};
use crate::version::GameVersion;
use levelc_shared::util::byte_buffer::ByteBuffer;

/// 32 shade levels for each palette entry
const LIGHT_MAP_SIZE: usize = 32 * 256;

pub struct Tr1Layout;
pub struct Tr2Layout;
pub struct Tr3Layout;

fn write_palette(out: &mut ByteBuffer) {
    for [r, g, b] in cube_palette() {
        out.write_u8(r);
        out.write_u8(g);
        out.write_u8(b);
    }
}

fn write_palette16(out: &mut ByteBuffer) {
    for [r, g, b] in cube_palette() {
        // 8-bit components from 6-bit ones
        out.write_u8(r << 2);
        out.write_u8(g << 2);
        out.write_u8(b << 2);
        out.write_u8(0);
    }
}

fn write_pages8(out: &mut ByteBuffer, level: &CompiledLevel) {
    for page in &level.texture_pages {
        out.append(&page_palette8(page));
    }
}

fn write_pages16(out: &mut ByteBuffer, level: &CompiledLevel) {
    for page in &level.texture_pages {
        for pixel in page_argb1555(page) {
            out.write_u16(pixel);
        }
    }
}

/// TR2 and TR3 file front: palettes, then 8-bit and 16-bit pages
fn write_tr2_front(out: &mut ByteBuffer, level: &CompiledLevel, version: GameVersion) -> Result<()> {
    out.append(&version.magic());
    write_palette(out);
    write_palette16(out);
    out.write_u32(count_u32("texture page count", level.texture_pages.len())?);
    write_pages8(out, level);
    write_pages16(out, level);
    Ok(())
}

fn write_classic_object_texture(out: &mut ByteBuffer, texture: &ObjectTexture, triangle_flag: bool) {
    out.write_u16(texture.blend_mode.attribute());
    let triangle = if triangle_flag && texture.triangle { 0x8000 } else { 0 };
    out.write_u16((texture.page & 0x7FFF) | triangle);
    for [u, v] in texture.legacy_uv() {
        out.write_u16(u);
        out.write_u16(v);
    }
}

/// TR1 and TR2 sound details: volume and chance in 16-bit fields
fn write_old_sound_details(out: &mut ByteBuffer, details: &TrSoundDetails) {
    out.write_u16(details.sample);
    out.write_u16((details.volume as u16) << 7);
    out.write_u16((details.chance as u16) << 7);
    out.write_u16(details.characteristics);
}

fn write_sound_map(out: &mut ByteBuffer, level: &CompiledLevel) {
    for entry in &level.sound_map {
        out.write_i16(*entry);
    }
}

fn write_sample_indices(out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
    out.write_u32(count_u32("sample index count", level.sample_indices.len())?);
    for index in &level.sample_indices {
        out.write_u32(*index);
    }
    Ok(())
}

/// Classic item record. Untinted items carry -1 as their intensity.
fn write_classic_item(out: &mut ByteBuffer, item: &TrItem, second_intensity: bool) {
    out.write_u16(item.object_id);
    out.write_i16(item.room);
    write_position_i32(out, item.position);
    out.write_u16(item.angle);
    out.write_i16(item.color as i16);
    if second_intensity {
        out.write_i16(item.color as i16);
    }
    out.write_u16(item.flags);
}

fn write_classic_vertex(out: &mut ByteBuffer, vertex: &TrRoomVertex) -> Result<()> {
    for value in vertex.position {
        out.write_i16(Checked::<i16>::new("room vertex", value as i64)?.get());
    }
    out.write_i16(classic_intensity(vertex.color));
    Ok(())
}

fn light_fade(light: &TrLight) -> u32 {
    Clamped::<u32>::from_f64(light.outer_range as f64).get()
}

fn light_intensity(light: &TrLight) -> u16 {
    Clamped::<u16>::from_f64((light.intensity * 8191.0) as f64).get().min(8191)
}

fn write_trailing_room_fields(out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
    let alternate = match room.alternate_room {
        Some(index) => Checked::<i16>::new("alternate room", index as i64)?.get(),
        None => -1,
    };
    out.write_i16(alternate);
    out.write_u16(room.flags);
    Ok(())
}

impl LevelLayout for Tr1Layout {
    fn version(&self) -> GameVersion {
        GameVersion::Tr1
    }

    fn write_file(&self, level: &CompiledLevel) -> Result<Vec<u8>> {
        let mut out = ByteBuffer::new();
        out.append(&self.version().magic());
        out.write_u32(count_u32("texture page count", level.texture_pages.len())?);
        write_pages8(&mut out, level);
        self.write_level_body(&mut out, level)?;
        Ok(out.into_inner())
    }

    fn write_room(&self, out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
        write_room_info(out, room);
        write_room_geometry(out, room, self.version(), write_classic_vertex)?;
        write_portals(out, room)?;
        write_sectors(out, room, box_plain)?;
        out.write_i16(classic_intensity(room.ambient));

        out.write_u16(count_u16("room light count", room.lights.len())?);
        for light in &room.lights {
            write_position_i32(out, light.position);
            out.write_u16(light_intensity(light));
            out.write_u32(light_fade(light));
        }

        out.write_u16(count_u16("room static count", room.statics.len())?);
        for item in &room.statics {
            write_room_static_classic(out, item, false)?;
        }
        write_trailing_room_fields(out, room)
    }

    fn write_object_texture(&self, out: &mut ByteBuffer, texture: &ObjectTexture) -> Result<()> {
        write_classic_object_texture(out, texture, false);
        Ok(())
    }

    fn write_item(&self, out: &mut ByteBuffer, item: &TrItem) -> Result<()> {
        write_classic_item(out, item, false);
        Ok(())
    }

    fn object_textures_after_statics(&self) -> bool {
        true
    }

    /// World-unit bounds with an inclusive maximum
    fn write_box(&self, out: &mut ByteBuffer, b: &TrBox) -> Result<()> {
        const SECTOR: i32 = crate::level::grid::SECTOR_SIZE;
        out.write_i32(b.z_min * SECTOR);
        out.write_i32(b.z_max * SECTOR - 1);
        out.write_i32(b.x_min * SECTOR);
        out.write_i32(b.x_max * SECTOR - 1);
        out.write_i16(Checked::<i16>::new("box floor", b.true_floor as i64)?.get());
        out.write_u16(super::overlap_field(b)?);
        Ok(())
    }

    /// Two ground zones and the fly zone per set
    fn write_zones(&self, out: &mut ByteBuffer, level: &CompiledLevel) {
        for set in [&level.zones.normal, &level.zones.flipped] {
            for zone in [&set[0], &set[1], &set[4]] {
                for value in zone {
                    out.write_u16(*value);
                }
            }
        }
    }

    fn write_sound_details(&self, out: &mut ByteBuffer, details: &TrSoundDetails) {
        write_old_sound_details(out, details);
    }

    fn write_trailer(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.append_zeros(LIGHT_MAP_SIZE);
        write_palette(out);
        // Cinematic frames, demo data
        out.write_u16(0);
        out.write_u16(0);
        write_sound_map(out, level);

        out.write_u32(count_u32("sound details count", level.sound_details.len())?);
        for details in &level.sound_details {
            self.write_sound_details(out, details);
        }

        // Samples live inside the level; indices are byte offsets
        let mut offsets = Vec::with_capacity(level.samples.len());
        let mut total = 0usize;
        for sample in &level.samples {
            offsets.push(count_u32("sample offset", total)?);
            total += sample.len();
        }
        out.write_u32(count_u32("sample data size", total)?);
        for sample in &level.samples {
            out.append(sample);
        }

        out.write_u32(count_u32("sample index count", level.sample_indices.len())?);
        for index in &level.sample_indices {
            let offset = offsets
                .get(*index as usize)
                .copied()
                .ok_or_else(|| crate::error::unresolved("sample", index))?;
            out.write_u32(offset);
        }
        Ok(())
    }
}

impl LevelLayout for Tr2Layout {
    fn version(&self) -> GameVersion {
        GameVersion::Tr2
    }

    fn write_file(&self, level: &CompiledLevel) -> Result<Vec<u8>> {
        let mut out = ByteBuffer::new();
        write_tr2_front(&mut out, level, self.version())?;
        self.write_level_body(&mut out, level)?;
        Ok(out.into_inner())
    }

    fn write_room(&self, out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
        write_room_info(out, room);
        write_room_geometry(out, room, self.version(), |out, vertex| {
            write_classic_vertex(out, vertex)?;
            // Attributes, second lighting value
            out.write_u16(0);
            out.write_i16(classic_intensity(vertex.color));
            Ok(())
        })?;
        write_portals(out, room)?;
        write_sectors(out, room, box_plain)?;

        let ambient = classic_intensity(room.ambient);
        out.write_i16(ambient);
        out.write_i16(ambient);
        // Light mode
        out.write_i16(0);

        out.write_u16(count_u16("room light count", room.lights.len())?);
        for light in &room.lights {
            write_position_i32(out, light.position);
            out.write_u16(light_intensity(light));
            out.write_u16(light_intensity(light));
            out.write_u32(light_fade(light));
            out.write_u32(light_fade(light));
        }

        out.write_u16(count_u16("room static count", room.statics.len())?);
        for item in &room.statics {
            write_room_static_classic(out, item, true)?;
        }
        write_trailing_room_fields(out, room)
    }

    fn write_object_texture(&self, out: &mut ByteBuffer, texture: &ObjectTexture) -> Result<()> {
        write_classic_object_texture(out, texture, false);
        Ok(())
    }

    fn write_item(&self, out: &mut ByteBuffer, item: &TrItem) -> Result<()> {
        write_classic_item(out, item, true);
        Ok(())
    }

    fn object_textures_after_statics(&self) -> bool {
        true
    }

    fn write_sound_details(&self, out: &mut ByteBuffer, details: &TrSoundDetails) {
        write_old_sound_details(out, details);
    }

    fn write_trailer(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.append_zeros(LIGHT_MAP_SIZE);
        out.write_u16(0);
        out.write_u16(0);
        write_sound_map(out, level);
        out.write_u32(count_u32("sound details count", level.sound_details.len())?);
        for details in &level.sound_details {
            self.write_sound_details(out, details);
        }
        write_sample_indices(out, level)
    }
}

impl LevelLayout for Tr3Layout {
    fn version(&self) -> GameVersion {
        GameVersion::Tr3
    }

    fn write_file(&self, level: &CompiledLevel) -> Result<Vec<u8>> {
        let mut out = ByteBuffer::new();
        write_tr2_front(&mut out, level, self.version())?;
        self.write_level_body(&mut out, level)?;
        Ok(out.into_inner())
    }

    fn write_room(&self, out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
        write_room_info(out, room);
        write_room_geometry(out, room, self.version(), |out, vertex| {
            write_classic_vertex(out, vertex)?;
            out.write_u16(0);
            out.write_u16(rgb555(vertex.color));
            Ok(())
        })?;
        write_portals(out, room)?;
        write_sectors(out, room, box_with_material)?;

        out.write_i16(classic_intensity(room.ambient));
        out.write_i16(0);

        out.write_u16(count_u16("room light count", room.lights.len())?);
        for light in &room.lights {
            write_position_i32(out, light.position);
            let [r, g, b] = super::rgb888(light.color);
            out.append(&[r, g, b, 0]);
            out.write_i32(light_intensity(light) as i32);
            out.write_i32(light_fade(light) as i32);
        }

        out.write_u16(count_u16("room static count", room.statics.len())?);
        for item in &room.statics {
            write_position_i32(out, item.position);
            out.write_u16(item.rotation);
            out.write_u16(rgb555(item.color));
            out.write_u16(0);
            out.write_u16(Checked::<u16>::new("static object id", item.object_id as i64)?.get());
        }

        write_trailing_room_fields(out, room)?;
        out.write_u8(room.water_scheme);
        out.write_u8(room.reverb);
        out.write_u8(0);
        Ok(())
    }

    fn write_object_texture(&self, out: &mut ByteBuffer, texture: &ObjectTexture) -> Result<()> {
        write_classic_object_texture(out, texture, true);
        Ok(())
    }

    fn write_item(&self, out: &mut ByteBuffer, item: &TrItem) -> Result<()> {
        write_classic_item(out, item, true);
        Ok(())
    }

    fn write_trailer(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        out.append_zeros(LIGHT_MAP_SIZE);
        out.write_u16(0);
        out.write_u16(0);
        write_sound_map(out, level);
        out.write_u32(count_u32("sound details count", level.sound_details.len())?);
        for details in &level.sound_details {
            self.write_sound_details(out, details);
        }
        write_sample_indices(out, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::tests::sample_level;
    use crate::writer::write_level;

    #[test]
    fn test_tr1_embeds_samples_with_offsets() {
        let mut level = sample_level(GameVersion::Tr1);
        level.samples = vec![vec![1, 2, 3], vec![4, 5]];
        level.sample_indices = vec![0, 1];
        let bytes = write_level(&level).unwrap();

        let tail = &bytes[bytes.len() - 12..];
        assert_eq!(tail, &[2, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0]);
        let data = &bytes[bytes.len() - 12 - 5..bytes.len() - 12];
        assert_eq!(data, &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_tr2_front_holds_both_page_formats() {
        let level = sample_level(GameVersion::Tr2);
        let bytes = write_level(&level).unwrap();
        let pages_at = 4 + 768 + 1024;
        assert_eq!(&bytes[pages_at..pages_at + 4], &1u32.to_le_bytes());
        // Blank pages are opaque black
        assert_eq!(bytes[pages_at + 4], 1);
        let page16 = pages_at + 4 + 65536;
        assert_eq!(&bytes[page16..page16 + 2], &0x8000u16.to_le_bytes());
    }

    #[test]
    fn test_tr3_triangle_textures_are_flagged() {
        let texture = ObjectTexture {
            page: 2,
            blend_mode: crate::level::texture::BlendMode::Additive,
            triangle: true,
            double_sided: false,
            uv: [[0.0, 0.0], [32.0, 0.0], [0.0, 32.0], [0.0, 0.0]],
        };
        let mut out = ByteBuffer::new();
        Tr3Layout.write_object_texture(&mut out, &texture).unwrap();
        let bytes = out.into_inner();
        assert_eq!(&bytes[..4], &[2, 0, 0x02, 0x80]);

        let mut out = ByteBuffer::new();
        Tr2Layout.write_object_texture(&mut out, &texture).unwrap();
        assert_eq!(&out.contents()[2..4], &[0x02, 0x00]);
    }
}
