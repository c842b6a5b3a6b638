// TombEngine layout
//
// `TEN\0` container: 32-bit counts and indices, float colours and texture coordinates,
// Lua names on items. Textures and level data are separate zlib chunks.

use super::{write_position_i32, write_zlib_chunk, LevelLayout};
use crate::compiled::{CompiledLevel, TrItem, TrMesh, TrMeshFace, TrRoom, TrSector, TrSoundDetails};
use crate::error::Result;
use crate::level::math::Vec3;
use crate::level::texture::TEXTURE_PAGE_SIZE;
use crate::numeric::Checked;
use crate::textures::{page_bgra32, ObjectTexture};
use crate::version::GameVersion;
use levelc_shared::util::byte_buffer::ByteBuffer;

/// Container revision written after the magic
const TEN_FORMAT_VERSION: [i32; 4] = [1, 0, 0, 0];

pub struct TenLayout;

fn write_color(out: &mut ByteBuffer, color: Vec3) {
    out.write_f32(color.x);
    out.write_f32(color.y);
    out.write_f32(color.z);
}

fn optional(index: Option<u32>) -> i32 {
    index.map(|i| i as i32).unwrap_or(-1)
}

fn write_count(out: &mut ByteBuffer, field: &'static str, count: usize) -> Result<()> {
    out.write_i32(Checked::<i32>::new(field, count as i64)?.get());
    Ok(())
}

fn write_sector(out: &mut ByteBuffer, sector: &TrSector) {
    out.write_i32(sector.floor_data_index as i32);
    out.write_i32(optional(sector.box_index));
    out.write_i32(sector.material as i32);
    out.write_i32(optional(sector.room_below));
    out.write_i32(sector.floor as i32);
    out.write_i32(optional(sector.room_above));
    out.write_i32(sector.ceiling as i32);
}

fn write_ten_face(out: &mut ByteBuffer, face: &TrMeshFace, corners: usize) {
    out.write_i32(corners as i32);
    for index in &face.indices[..corners] {
        out.write_i32(*index as i32);
    }
    out.write_i32(face.texture as i32);
    out.write_bool(face.double_sided);
    out.write_u8(face.shine);
}

fn write_ten_mesh(out: &mut ByteBuffer, mesh: &TrMesh) -> Result<()> {
    for value in mesh.center {
        out.write_f32(value as f32);
    }
    out.write_i32(mesh.radius);

    write_count(out, "mesh vertex count", mesh.vertices.len())?;
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        for value in vertex {
            out.write_f32(*value as f32);
        }
        let normal = mesh.normals.get(i).copied().unwrap_or([0, 0, 0]);
        for value in normal {
            out.write_f32(value as f32 / 16300.0);
        }
        out.write_i32(mesh.shades.get(i).copied().unwrap_or(0) as i32);
    }

    write_count(out, "mesh face count", mesh.quads.len() + mesh.triangles.len())?;
    for face in &mesh.quads {
        write_ten_face(out, face, 4);
    }
    for face in &mesh.triangles {
        write_ten_face(out, face, 3);
    }
    Ok(())
}

impl TenLayout {
    fn write_textures(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        let mut pages = ByteBuffer::new();
        write_count(&mut pages, "texture page count", level.texture_pages.len())?;
        for page in &level.texture_pages {
            pages.write_i32(TEXTURE_PAGE_SIZE as i32);
            pages.write_i32(TEXTURE_PAGE_SIZE as i32);
            pages.append(&page_bgra32(page));
        }
        write_zlib_chunk(out, pages.contents())
    }

    fn write_animation_data(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_count(out, "animation count", level.animations.len())?;
        for animation in &level.animations {
            out.write_i32(animation.frame_offset as i32);
            out.write_i32(animation.frame_rate as i32);
            out.write_i32(animation.frame_size as i32);
            out.write_i32(animation.state_id as i32);
            out.write_i32(animation.speed);
            out.write_i32(animation.accel);
            out.write_i32(animation.lateral_speed);
            out.write_i32(animation.lateral_accel);
            for value in [
                animation.frame_start,
                animation.frame_end,
                animation.next_animation,
                animation.next_frame,
                animation.num_state_changes,
                animation.state_change_offset,
                animation.num_anim_commands,
                animation.anim_command,
            ] {
                out.write_i32(value as i32);
            }
        }

        write_count(out, "state change count", level.state_changes.len())?;
        for change in &level.state_changes {
            out.write_i32(change.state_id as i32);
            out.write_i32(change.num_dispatches as i32);
            out.write_i32(change.dispatch_offset as i32);
        }
        write_count(out, "dispatch count", level.anim_dispatches.len())?;
        for dispatch in &level.anim_dispatches {
            out.write_i32(dispatch.low as i32);
            out.write_i32(dispatch.high as i32);
            out.write_i32(dispatch.next_animation as i32);
            out.write_i32(dispatch.next_frame as i32);
        }
        write_count(out, "anim command count", level.anim_commands.len())?;
        for word in &level.anim_commands {
            out.write_i16(*word);
        }
        write_count(out, "mesh tree size", level.mesh_trees.len())?;
        for word in &level.mesh_trees {
            out.write_i32(*word);
        }
        write_count(out, "frame size", level.frames.len())?;
        for word in &level.frames {
            out.write_i16(*word);
        }
        Ok(())
    }

    fn write_objects(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_count(out, "moveable count", level.moveables.len())?;
        for moveable in &level.moveables {
            out.write_i32(moveable.object_id as i32);
            out.write_i32(moveable.num_meshes as i32);
            out.write_i32(moveable.starting_mesh as i32);
            out.write_i32(moveable.mesh_tree as i32);
            out.write_i32(moveable.frame_offset as i32);
            out.write_i32(moveable.animation.map(|a| a as i32).unwrap_or(-1));
        }

        write_count(out, "static mesh count", level.statics.len())?;
        for mesh in &level.statics {
            out.write_i32(mesh.object_id as i32);
            out.write_i32(mesh.mesh as i32);
            for value in mesh.visibility_box.iter().chain(mesh.collision_box.iter()) {
                out.write_i16(*value);
            }
            out.write_i32(mesh.flags as i32);
        }

        write_count(out, "sprite texture count", level.sprite_textures.len())?;
        for sprite in &level.sprite_textures {
            for value in [sprite.page, sprite.x, sprite.y, sprite.width, sprite.height] {
                out.write_i32(value as i32);
            }
            for value in [sprite.left, sprite.top, sprite.right, sprite.bottom] {
                out.write_i32(value as i32);
            }
        }
        write_count(out, "sprite sequence count", level.sprite_sequences.len())?;
        for sequence in &level.sprite_sequences {
            out.write_i32(sequence.object_id);
            out.write_i32(-(sequence.negative_length as i32));
            out.write_i32(sequence.offset as i32);
        }
        Ok(())
    }

    fn write_cameras_and_sources(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_count(out, "camera count", level.cameras.len())?;
        for camera in &level.cameras {
            write_position_i32(out, camera.position);
            out.write_i32(camera.room as i32);
            out.write_i32(camera.flags as i32);
        }

        write_count(out, "flyby camera count", level.flyby_cameras.len())?;
        for camera in &level.flyby_cameras {
            write_position_i32(out, camera.position);
            write_position_i32(out, camera.direction);
            out.write_i32(camera.sequence as i32);
            out.write_i32(camera.index as i32);
            out.write_i32(camera.fov as i32);
            out.write_i32(camera.roll as i32);
            out.write_i32(camera.timer as i32);
            out.write_i32(camera.speed as i32);
            out.write_i32(camera.flags as i32);
            out.write_i32(camera.room as i32);
        }

        write_count(out, "sound source count", level.sound_sources.len())?;
        for source in &level.sound_sources {
            write_position_i32(out, source.position);
            out.write_i32(source.sound_id as i32);
            out.write_i32(source.flags as i32);
        }
        Ok(())
    }

    fn write_pathfinding(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_count(out, "box count", level.boxes.len())?;
        for b in &level.boxes {
            for value in [b.x_min, b.x_max, b.z_min, b.z_max, b.true_floor] {
                out.write_i32(value);
            }
            out.write_i32(optional(b.overlap_index));
            out.write_bool(b.blockable);
        }

        write_count(out, "overlap count", level.overlaps.len())?;
        for overlap in &level.overlaps {
            out.write_i32(*overlap as i32);
        }

        for set in [&level.zones.normal, &level.zones.flipped] {
            for zone in set.iter() {
                for value in zone {
                    out.write_i32(*value as i32);
                }
            }
        }
        Ok(())
    }
}

impl LevelLayout for TenLayout {
    fn version(&self) -> GameVersion {
        GameVersion::TombEngine
    }

    fn write_file(&self, level: &CompiledLevel) -> Result<Vec<u8>> {
        let mut out = ByteBuffer::new();
        out.append(&self.version().magic());
        for part in TEN_FORMAT_VERSION {
            out.write_i32(part);
        }
        self.write_textures(&mut out, level)?;

        let mut body = ByteBuffer::new();
        self.write_level_body(&mut body, level)?;
        write_zlib_chunk(&mut out, body.contents())?;
        Ok(out.into_inner())
    }

    fn write_room(&self, out: &mut ByteBuffer, room: &TrRoom) -> Result<()> {
        out.write_sized_string(&room.name);
        for value in [room.x, room.z, room.y_bottom, room.y_top] {
            out.write_i32(value);
        }

        write_count(out, "room vertex count", room.vertices.len())?;
        for vertex in &room.vertices {
            for value in vertex.position {
                out.write_f32(value as f32);
            }
            write_color(out, vertex.color);
        }

        write_count(out, "room face count", room.faces.len())?;
        for face in &room.faces {
            let corners = if face.triangle { 3 } else { 4 };
            out.write_i32(corners);
            for index in &face.indices[..corners as usize] {
                out.write_i32(*index as i32);
            }
            out.write_i32(face.texture as i32);
            out.write_bool(face.double_sided);
            out.write_i32(face.blend_mode.attribute() as i32);
        }

        write_count(out, "portal count", room.portals.len())?;
        for portal in &room.portals {
            out.write_i32(portal.adjoining_room as i32);
            for value in portal.normal {
                out.write_f32(value as f32);
            }
            for vertex in &portal.vertices {
                write_position_i32(out, *vertex);
            }
        }

        out.write_i32(room.num_x as i32);
        out.write_i32(room.num_z as i32);
        for sector in &room.sectors {
            write_sector(out, sector);
        }

        write_color(out, room.ambient);
        write_count(out, "room light count", room.lights.len())?;
        for light in &room.lights {
            write_position_i32(out, light.position);
            write_color(out, light.color);
            out.write_f32(light.intensity);
            out.write_f32(light.inner_range);
            out.write_f32(light.outer_range);
            out.write_f32(light.inner_angle);
            out.write_f32(light.outer_angle);
            write_color(out, Vec3::new(light.direction.x, -light.direction.y, light.direction.z));
            out.write_u8(light.light_type as u8);
        }

        write_count(out, "room static count", room.statics.len())?;
        for item in &room.statics {
            write_position_i32(out, item.position);
            out.write_i32(item.rotation as i32);
            write_color(out, item.color);
            out.write_i32(item.object_id as i32);
            out.write_i32(item.ocb as i32);
        }

        out.write_i32(optional(room.alternate_room));
        out.write_i32(room.alternate_group as i32);
        out.write_i32(room.flags as i32);
        out.write_u8(room.water_scheme);
        out.write_u8(room.reverb);
        Ok(())
    }

    fn write_mesh(&self, out: &mut ByteBuffer, mesh: &TrMesh) -> Result<()> {
        write_ten_mesh(out, mesh)
    }

    fn write_object_texture(&self, out: &mut ByteBuffer, texture: &ObjectTexture) -> Result<()> {
        out.write_i32(texture.blend_mode.attribute() as i32);
        out.write_i32(texture.page as i32);
        out.write_bool(texture.triangle);
        out.write_bool(texture.double_sided);
        for [u, v] in texture.normalized_uv() {
            out.write_f32(u);
            out.write_f32(v);
        }
        Ok(())
    }

    fn write_item(&self, out: &mut ByteBuffer, item: &TrItem) -> Result<()> {
        out.write_i32(item.object_id as i32);
        out.write_i32(item.room as i32);
        write_position_i32(out, item.position);
        out.write_i32(item.angle as i32);
        out.write_i32(item.ocb as i32);
        out.write_i32(item.flags as i32);
        out.write_i32(item.color as i32);
        out.write_sized_string(&item.lua_name);
        Ok(())
    }

    fn write_sound_details(&self, out: &mut ByteBuffer, details: &TrSoundDetails) {
        out.write_i32(details.sample as i32);
        out.write_u8(details.volume);
        out.write_u8(details.range);
        out.write_u8(details.chance);
        out.write_u8(details.pitch);
        out.write_i32(details.characteristics as i32);
    }

    fn write_trailer(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_count(out, "sound map size", level.sound_map.len())?;
        for entry in &level.sound_map {
            out.write_i16(*entry);
        }
        write_count(out, "sound details count", level.sound_details.len())?;
        for details in &level.sound_details {
            self.write_sound_details(out, details);
        }
        write_count(out, "sample index count", level.sample_indices.len())?;
        for index in &level.sample_indices {
            out.write_i32(*index as i32);
        }
        write_count(out, "sample count", level.samples.len())?;
        for sample in &level.samples {
            write_count(out, "sample size", sample.len())?;
            out.append(sample);
        }
        Ok(())
    }

    fn write_level_body(&self, out: &mut ByteBuffer, level: &CompiledLevel) -> Result<()> {
        write_count(out, "room count", level.rooms.len())?;
        for room in &level.rooms {
            self.write_room(out, room)?;
        }

        write_count(out, "floor data size", level.floor_data.len())?;
        for word in &level.floor_data {
            out.write_u16(*word);
        }

        write_count(out, "mesh count", level.meshes.len())?;
        for mesh in &level.meshes {
            self.write_mesh(out, mesh)?;
        }

        self.write_animation_data(out, level)?;
        self.write_objects(out, level)?;

        write_count(out, "object texture count", level.object_textures.len())?;
        for texture in &level.object_textures {
            self.write_object_texture(out, texture)?;
        }

        self.write_cameras_and_sources(out, level)?;
        self.write_pathfinding(out, level)?;

        write_count(out, "item count", level.items.len())?;
        for item in &level.items {
            self.write_item(out, item)?;
        }
        write_count(out, "AI object count", level.ai_items.len())?;
        for item in &level.ai_items {
            out.write_i32(item.object_id as i32);
            out.write_i32(item.room as i32);
            write_position_i32(out, item.position);
            out.write_i32(item.ocb as i32);
            out.write_i32(item.flags as i32);
            out.write_i32(item.angle);
        }

        self.write_trailer(out, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::tests::sample_level;
    use crate::writer::write_level;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn level_body(bytes: Vec<u8>) -> Vec<u8> {
        let mut read = ByteBuffer::from_bytes(bytes);
        read.read_skip(4 + 16);
        // Texture chunk
        read.read_skip(4);
        let compressed = read.read_u32().unwrap() as usize;
        read.read_skip(compressed);

        let uncompressed = read.read_u32().unwrap() as usize;
        let compressed = read.read_u32().unwrap() as usize;
        let data = read.read_bytes(compressed).unwrap();
        let mut body = Vec::with_capacity(uncompressed);
        ZlibDecoder::new(&data[..]).read_to_end(&mut body).unwrap();
        body
    }

    #[test]
    fn test_room_names_and_lua_names_are_stored() {
        let mut level = sample_level(GameVersion::TombEngine);
        level.items.push(TrItem {
            object_id: 0,
            room: 0,
            position: [1536, 0, 1536],
            angle: 0,
            color: 0xFFFF,
            ocb: 0,
            flags: 0x3E00,
            lua_name: "lara_start".into(),
        });
        let body = level_body(write_level(&level).unwrap());

        // Room count, then the sized room name
        assert_eq!(&body[..4], &1i32.to_le_bytes());
        assert_eq!(&body[4..8], &6u32.to_le_bytes());
        assert_eq!(&body[8..14], b"Room 0");
        assert!(body.windows(10).any(|w| w == b"lara_start"));
    }

    #[test]
    fn test_sound_map_keeps_engine_size() {
        let level = sample_level(GameVersion::TombEngine);
        let mut out = ByteBuffer::new();
        TenLayout.write_trailer(&mut out, &level).unwrap();
        assert_eq!(&out.contents()[..4], &450i32.to_le_bytes());
    }
}
