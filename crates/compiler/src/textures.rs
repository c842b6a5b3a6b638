// Texture infos
//
// Faces reference object texture entries ("TexInfos"). Identical texture areas share
// one entry; indices are handed out in first-use order. Page pixel conversion for the
// various file formats lives here as well.

use crate::level::texture::{BlendMode, TextureArea, TexturePage, TEXTURE_PAGE_SIZE};
use std::collections::HashMap;

/// One object texture entry
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTexture {
    pub page: u16,
    pub blend_mode: BlendMode,
    pub triangle: bool,
    pub double_sided: bool,
    /// Pixel coordinates per corner; triangles leave the fourth at zero
    pub uv: [[f32; 2]; 4],
}

impl ObjectTexture {
    fn corners(&self) -> &[[f32; 2]] {
        if self.triangle { &self.uv[..3] } else { &self.uv[..] }
    }

    /// Pixel bounding rectangle (x, y, width, height) on the page
    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        let page = TEXTURE_PAGE_SIZE as f32;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (page, page, 0.0f32, 0.0f32);
        for [u, v] in self.corners() {
            min_x = min_x.min(*u);
            min_y = min_y.min(*v);
            max_x = max_x.max(*u);
            max_y = max_y.max(*v);
        }
        let clamp = |f: f32| f.round().clamp(0.0, page) as u32;
        let (x, y) = (clamp(min_x), clamp(min_y));
        (x, y, clamp(max_x).saturating_sub(x), clamp(max_y).saturating_sub(y))
    }

    /// Corner coordinates in the classic 8.8 layout: pixel in the high byte, and a low
    /// byte of 0x01 for the near edge or 0xFF for the far edge
    pub fn legacy_uv(&self) -> [[u16; 2]; 4] {
        let (x, y, width, height) = self.bounds();
        let axis = |value: f32, near: u32, extent: u32| -> u16 {
            let pixel = value.round().clamp(0.0, TEXTURE_PAGE_SIZE as f32) as u32;
            if extent > 0 && pixel >= near + extent {
                (((pixel.saturating_sub(1)).min(255) << 8) | 0xFF) as u16
            } else {
                ((pixel.min(255) << 8) | 0x01) as u16
            }
        };

        let mut out = [[0u16; 2]; 4];
        for (slot, [u, v]) in out.iter_mut().zip(self.corners()) {
            *slot = [axis(*u, x, width), axis(*v, y, height)];
        }
        out
    }

    /// Corner coordinates normalized to the page, for formats storing floats
    pub fn normalized_uv(&self) -> [[f32; 2]; 4] {
        let page = TEXTURE_PAGE_SIZE as f32;
        self.uv.map(|[u, v]| [u / page, v / page])
    }
}

/// Lookup key: UVs quantized to 1/16 pixel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TextureKey {
    page: u16,
    blend_mode: BlendMode,
    triangle: bool,
    double_sided: bool,
    uv: [[i32; 2]; 4],
}

#[derive(Debug, Default)]
pub struct TexInfoManager {
    textures: Vec<ObjectTexture>,
    lookup: HashMap<TextureKey, u32>,
}

impl TexInfoManager {
    pub fn new() -> Self {
        TexInfoManager::default()
    }

    /// Index of the entry for `area`, creating it on first use
    pub fn add(&mut self, area: &TextureArea, triangle: bool) -> u32 {
        let mut uv = area.uv;
        if triangle {
            uv[3] = [0.0, 0.0];
        }
        let key = TextureKey {
            page: area.page,
            blend_mode: area.blend_mode,
            triangle,
            double_sided: area.double_sided,
            uv: uv.map(|[u, v]| [(u * 16.0).round() as i32, (v * 16.0).round() as i32]),
        };

        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }

        let index = self.textures.len() as u32;
        self.textures.push(ObjectTexture {
            page: area.page,
            blend_mode: area.blend_mode,
            triangle,
            double_sided: area.double_sided,
            uv,
        });
        self.lookup.insert(key, index);
        index
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn textures(&self) -> &[ObjectTexture] {
        &self.textures
    }

    pub fn into_textures(self) -> Vec<ObjectTexture> {
        self.textures
    }
}

const PAGE_PIXELS: u32 = TEXTURE_PAGE_SIZE * TEXTURE_PAGE_SIZE;

/// 16-bit ARGB1555 pixels
pub fn page_argb1555(page: &TexturePage) -> Vec<u16> {
    (0..PAGE_PIXELS)
        .map(|i| {
            let [r, g, b, a] = page.pixel(i % TEXTURE_PAGE_SIZE, i / TEXTURE_PAGE_SIZE);
            let alpha = if a >= 128 { 0x8000 } else { 0 };
            alpha | ((r as u16 >> 3) << 10) | ((g as u16 >> 3) << 5) | (b as u16 >> 3)
        })
        .collect()
}

/// 32-bit pixels in file byte order (B, G, R, A)
pub fn page_bgra32(page: &TexturePage) -> Vec<u8> {
    let mut out = Vec::with_capacity(PAGE_PIXELS as usize * 4);
    for i in 0..PAGE_PIXELS {
        let [r, g, b, a] = page.pixel(i % TEXTURE_PAGE_SIZE, i / TEXTURE_PAGE_SIZE);
        out.extend_from_slice(&[b, g, r, a]);
    }
    out
}

/// 6x6x6 colour cube in 6-bit VGA components; index 0 is transparent
pub fn cube_palette() -> Vec<[u8; 3]> {
    let mut palette = vec![[0u8; 3]; 256];
    for r in 0..6u8 {
        for g in 0..6u8 {
            for b in 0..6u8 {
                let index = 1 + (r as usize * 36 + g as usize * 6 + b as usize);
                let scale = |c: u8| (c as u16 * 63 / 5) as u8;
                palette[index] = [scale(r), scale(g), scale(b)];
            }
        }
    }
    palette
}

/// 8-bit pixels indexing `cube_palette`
pub fn page_palette8(page: &TexturePage) -> Vec<u8> {
    let level = |c: u8| (c as u32 * 5 + 127) / 255;
    (0..PAGE_PIXELS)
        .map(|i| {
            let [r, g, b, a] = page.pixel(i % TEXTURE_PAGE_SIZE, i / TEXTURE_PAGE_SIZE);
            if a < 128 {
                0
            } else {
                (1 + level(r) * 36 + level(g) * 6 + level(b)) as u8
            }
        })
        .collect()
}
