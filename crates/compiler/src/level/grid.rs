// Sector grid
//
// A room is a 2-D grid of sectors. Storage is row-major with x outer and z inner:
// the sector at (x, z) lives at index `x * num_z + z`. Every access is bounds-checked.

use crate::geometry::face::SectorFaceIdentifier;
use crate::level::texture::TextureArea;
use serde::{Deserialize, Serialize};

/// Horizontal size of a sector in world units
pub const SECTOR_SIZE: i32 = 1024;

/// Height step ("click") in world units
pub const CLICK: i32 = 256;

/// Horizontal direction of a sector side
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    PositiveZ,
    PositiveX,
    NegativeZ,
    NegativeX,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::PositiveZ,
        Direction::PositiveX,
        Direction::NegativeZ,
        Direction::NegativeX,
    ];

    /// Grid offset of the neighbouring sector on this side
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::PositiveZ => (0, 1),
            Direction::PositiveX => (1, 0),
            Direction::NegativeZ => (0, -1),
            Direction::NegativeX => (-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::PositiveZ => Direction::NegativeZ,
            Direction::PositiveX => Direction::NegativeX,
            Direction::NegativeZ => Direction::PositiveZ,
            Direction::NegativeX => Direction::PositiveX,
        }
    }
}

/// Corner of a sector. Discriminants index `SectorSurface::corners`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    XnZp = 0,
    XpZp = 1,
    XpZn = 2,
    XnZn = 3,
}

/// Which corner a diagonal step (or diagonal wall) is anchored at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum DiagonalSplit {
    #[default]
    None,
    XnZp,
    XpZp,
    XpZn,
    XnZn,
}

impl DiagonalSplit {
    pub fn is_some(self) -> bool {
        self != DiagonalSplit::None
    }
}

/// Floor or ceiling of a sector
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectorSurface {
    /// Heights in world units, ordered XnZp, XpZp, XpZn, XnZn
    pub corners: [i32; 4],
    #[serde(default)]
    pub diagonal_split: DiagonalSplit,
    /// Additional subdivisions (ED/RF and beyond), same corner order
    #[serde(default)]
    pub extra_splits: Vec<[i32; 4]>,
}

impl SectorSurface {
    pub fn flat(height: i32) -> Self {
        SectorSurface {
            corners: [height; 4],
            diagonal_split: DiagonalSplit::None,
            extra_splits: Vec::new(),
        }
    }

    pub fn corner(&self, corner: Corner) -> i32 {
        self.corners[corner as usize]
    }

    pub fn min(&self) -> i32 {
        self.corners.iter().copied().min().unwrap_or(0)
    }

    pub fn max(&self) -> i32 {
        self.corners.iter().copied().max().unwrap_or(0)
    }

    pub fn is_flat(&self) -> bool {
        self.corners.iter().all(|&h| h == self.corners[0])
    }

    /// The four corners lie on one plane, so the surface can be a single quad
    pub fn is_planar(&self) -> bool {
        self.corner(Corner::XnZp) + self.corner(Corner::XpZn)
            == self.corner(Corner::XpZp) + self.corner(Corner::XnZn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SectorKind {
    #[default]
    Floor,
    Wall,
    BorderWall,
}

/// Gameplay flags of a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorFlags(pub u16);

impl SectorFlags {
    pub const NONE: u16 = 0x0000;
    pub const CLIMB_POSITIVE_Z: u16 = 0x0001;
    pub const CLIMB_POSITIVE_X: u16 = 0x0002;
    pub const CLIMB_NEGATIVE_Z: u16 = 0x0004;
    pub const CLIMB_NEGATIVE_X: u16 = 0x0008;
    pub const MONKEY: u16 = 0x0010;
    pub const BOX: u16 = 0x0020;
    pub const DEATH_FIRE: u16 = 0x0040;
    pub const NOT_WALKABLE_FLOOR: u16 = 0x0080;
    pub const BEETLE: u16 = 0x0100;
    pub const TRIGGER_TRIGGERER: u16 = 0x0200;

    pub const CLIMB_ANY: u16 = Self::CLIMB_POSITIVE_Z
        | Self::CLIMB_POSITIVE_X
        | Self::CLIMB_NEGATIVE_Z
        | Self::CLIMB_NEGATIVE_X;

    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }
}

/// Texture override of one sector face. `None` hides the face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceTexture {
    pub face: SectorFaceIdentifier,
    pub texture: Option<TextureArea>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sector {
    #[serde(default)]
    pub kind: SectorKind,
    pub floor: SectorSurface,
    pub ceiling: SectorSurface,
    #[serde(default)]
    pub flags: SectorFlags,
    #[serde(default)]
    pub textures: Vec<FaceTexture>,
}

impl Sector {
    pub fn new(kind: SectorKind, floor: i32, ceiling: i32) -> Self {
        Sector {
            kind,
            floor: SectorSurface::flat(floor),
            ceiling: SectorSurface::flat(ceiling),
            flags: SectorFlags::default(),
            textures: Vec::new(),
        }
    }

    pub fn is_any_wall(&self) -> bool {
        self.kind != SectorKind::Floor
    }

    /// A wall that only fills the half of the sector at its diagonal corner
    pub fn is_diagonal_wall(&self) -> bool {
        self.kind == SectorKind::Wall && self.floor.diagonal_split.is_some()
    }

    /// The texture for a face: the override when present, else the default
    pub fn texture_for(
        &self,
        face: SectorFaceIdentifier,
        default: Option<&TextureArea>,
    ) -> Option<TextureArea> {
        match self.textures.iter().find(|t| t.face == face) {
            Some(entry) => entry.texture.clone(),
            None => default.cloned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SectorGridData {
    num_x: usize,
    num_z: usize,
    sectors: Vec<Sector>,
}

/// Bounds-checked 2-D sector storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SectorGridData")]
pub struct SectorGrid {
    num_x: usize,
    num_z: usize,
    sectors: Vec<Sector>,
}

impl TryFrom<SectorGridData> for SectorGrid {
    type Error = String;

    fn try_from(data: SectorGridData) -> Result<Self, Self::Error> {
        if data.num_x * data.num_z != data.sectors.len() {
            return Err(format!(
                "sector grid is {}x{} but holds {} sectors",
                data.num_x,
                data.num_z,
                data.sectors.len()
            ));
        }
        Ok(SectorGrid {
            num_x: data.num_x,
            num_z: data.num_z,
            sectors: data.sectors,
        })
    }
}

impl SectorGrid {
    /// Grid filled with `template`, ringed by border walls
    pub fn new(num_x: usize, num_z: usize, template: Sector) -> Self {
        let mut sectors = Vec::with_capacity(num_x * num_z);
        for x in 0..num_x {
            for z in 0..num_z {
                let mut sector = template.clone();
                if x == 0 || z == 0 || x + 1 == num_x || z + 1 == num_z {
                    sector.kind = SectorKind::BorderWall;
                }
                sectors.push(sector);
            }
        }
        SectorGrid { num_x, num_z, sectors }
    }

    pub fn num_x(&self) -> usize {
        self.num_x
    }

    pub fn num_z(&self) -> usize {
        self.num_z
    }

    /// Storage index of (x, z), or None when outside the grid
    pub fn index(&self, x: i32, z: i32) -> Option<usize> {
        if x < 0 || z < 0 {
            return None;
        }
        let (x, z) = (x as usize, z as usize);
        (x < self.num_x && z < self.num_z).then_some(x * self.num_z + z)
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.index(x, z).is_some()
    }

    pub fn get(&self, x: i32, z: i32) -> Option<&Sector> {
        self.index(x, z).map(|i| &self.sectors[i])
    }

    pub fn get_mut(&mut self, x: i32, z: i32) -> Option<&mut Sector> {
        self.index(x, z).map(move |i| &mut self.sectors[i])
    }

    /// All sectors in storage order with their coordinates
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &Sector)> {
        let num_z = self.num_z;
        self.sectors
            .iter()
            .enumerate()
            .map(move |(i, s)| ((i / num_z) as i32, (i % num_z) as i32, s))
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }
}
