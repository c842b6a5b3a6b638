// Texture references used by room faces and imported geometry

use serde::{Deserialize, Serialize};

pub const TEXTURE_PAGE_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    AlphaTest,
    Additive,
    Subtract,
    Exclude,
    Screen,
    Lighten,
}

impl BlendMode {
    /// Attribute value stored in object texture entries
    pub fn attribute(self) -> u16 {
        match self {
            BlendMode::Normal => 0,
            BlendMode::AlphaTest => 1,
            BlendMode::Additive => 2,
            BlendMode::Subtract => 5,
            BlendMode::Exclude => 8,
            BlendMode::Screen => 9,
            BlendMode::Lighten => 10,
        }
    }
}

/// A region of a texture page mapped onto a face.
/// UVs are in pixels, one per face corner; triangles ignore the fourth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureArea {
    pub page: u16,
    pub uv: [[f32; 2]; 4],
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub double_sided: bool,
}

impl TextureArea {
    /// Whole-page mapping on a page
    pub fn full_page(page: u16) -> Self {
        let size = TEXTURE_PAGE_SIZE as f32;
        TextureArea {
            page,
            uv: [[0.0, 0.0], [size, 0.0], [size, size], [0.0, size]],
            blend_mode: BlendMode::Normal,
            double_sided: false,
        }
    }
}

/// A 256x256 RGBA texture page. Empty pixel data means a blank page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TexturePage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rgba: Vec<u8>,
}

impl TexturePage {
    /// Pixel (r, g, b, a) at (x, y); blank pages read as opaque black
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * TEXTURE_PAGE_SIZE + x) * 4) as usize;
        match self.rgba.get(offset..offset + 4) {
            Some(p) => [p[0], p[1], p[2], p[3]],
            None => [0, 0, 0, 255],
        }
    }
}
