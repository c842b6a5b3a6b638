// Sector faces
// Identifiers and vertex data for the faces a sector contributes to its room mesh

use crate::level::grid::{Direction, SECTOR_SIZE};
use serde::{Deserialize, Serialize};

/// Part of a sector side
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WallPart {
    /// Step between this sector's floor and the facing floor
    Qa,
    /// Step between this sector's ceiling and the facing ceiling
    Ws,
    /// Solid wall between floor and ceiling
    Middle,
    /// Extra floor subdivision; index 0 is the classic ED split
    ExtraFloor(u8),
    /// Extra ceiling subdivision; index 0 is the classic RF split
    ExtraCeiling(u8),
}

/// Identifies one face of a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectorFaceIdentifier {
    Floor,
    FloorTriangle2,
    Ceiling,
    CeilingTriangle2,
    DiagonalMiddle,
    Wall { direction: Direction, part: WallPart },
}

impl SectorFaceIdentifier {
    pub fn wall(direction: Direction, part: WallPart) -> Self {
        SectorFaceIdentifier::Wall { direction, part }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(
            self,
            SectorFaceIdentifier::Floor
                | SectorFaceIdentifier::FloorTriangle2
                | SectorFaceIdentifier::Ceiling
                | SectorFaceIdentifier::CeilingTriangle2
        )
    }
}

/// Two heights along a sector side, at its start and end corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WallSplit {
    pub start_y: i32,
    pub end_y: i32,
}

impl WallSplit {
    pub const fn new(start_y: i32, end_y: i32) -> Self {
        WallSplit { start_y, end_y }
    }
}

/// Room-local vertex position in world units (y up)
pub type FaceVertex = [i32; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceShape {
    Quad([FaceVertex; 4]),
    Triangle([FaceVertex; 3]),
}

impl FaceShape {
    pub fn vertices(&self) -> &[FaceVertex] {
        match self {
            FaceShape::Quad(v) => v,
            FaceShape::Triangle(v) => v,
        }
    }

    pub fn is_triangle(&self) -> bool {
        matches!(self, FaceShape::Triangle(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorFace {
    pub identifier: SectorFaceIdentifier,
    pub shape: FaceShape,
}

impl SectorFace {
    /// Vertical face between `top` and `bottom` along the side from `start` to `end`
    /// (grid corner coordinates). A quad when `top` is above `bottom` at both corners,
    /// a triangle when they meet at exactly one corner, otherwise nothing.
    fn vertical(
        identifier: SectorFaceIdentifier,
        start: (i32, i32),
        end: (i32, i32),
        top: WallSplit,
        bottom: WallSplit,
    ) -> Option<SectorFace> {
        let (sx, sz) = (start.0 * SECTOR_SIZE, start.1 * SECTOR_SIZE);
        let (ex, ez) = (end.0 * SECTOR_SIZE, end.1 * SECTOR_SIZE);
        let start_extent = top.start_y - bottom.start_y;
        let end_extent = top.end_y - bottom.end_y;

        let shape = if start_extent > 0 && end_extent > 0 {
            FaceShape::Quad([
                [sx, top.start_y, sz],
                [ex, top.end_y, ez],
                [ex, bottom.end_y, ez],
                [sx, bottom.start_y, sz],
            ])
        } else if start_extent == 0 && end_extent > 0 {
            FaceShape::Triangle([
                [sx, top.start_y, sz],
                [ex, top.end_y, ez],
                [ex, bottom.end_y, ez],
            ])
        } else if start_extent > 0 && end_extent == 0 {
            FaceShape::Triangle([
                [sx, top.start_y, sz],
                [ex, top.end_y, ez],
                [sx, bottom.start_y, sz],
            ])
        } else {
            return None;
        };

        Some(SectorFace { identifier, shape })
    }

    /// Floor step: `split` is the upper edge, `bottom` the lower one
    pub fn vertical_floor(
        identifier: SectorFaceIdentifier,
        start: (i32, i32),
        end: (i32, i32),
        split: WallSplit,
        bottom: WallSplit,
    ) -> Option<SectorFace> {
        Self::vertical(identifier, start, end, split, bottom)
    }

    /// Ceiling step: `split` is the lower edge, `top` the upper one
    pub fn vertical_ceiling(
        identifier: SectorFaceIdentifier,
        start: (i32, i32),
        end: (i32, i32),
        split: WallSplit,
        top: WallSplit,
    ) -> Option<SectorFace> {
        Self::vertical(identifier, start, end, top, split)
    }

    /// Wall body between `bottom` and `top`
    pub fn vertical_middle(
        identifier: SectorFaceIdentifier,
        start: (i32, i32),
        end: (i32, i32),
        bottom: WallSplit,
        top: WallSplit,
    ) -> Option<SectorFace> {
        Self::vertical(identifier, start, end, top, bottom)
    }

    /// Horizontal face through room-local vertices. Three or four vertices only.
    pub fn horizontal(identifier: SectorFaceIdentifier, vertices: &[FaceVertex]) -> Option<SectorFace> {
        let shape = match *vertices {
            [a, b, c] => FaceShape::Triangle([a, b, c]),
            [a, b, c, d] => FaceShape::Quad([a, b, c, d]),
            _ => return None,
        };
        Some(SectorFace { identifier, shape })
    }

    /// Height extent of a vertical face at each of its two edge positions,
    /// in the order the positions first appear
    pub fn vertical_extents(&self) -> Vec<i32> {
        let mut columns: Vec<((i32, i32), i32, i32)> = Vec::new();
        for v in self.shape.vertices() {
            match columns.iter_mut().find(|c| c.0 == (v[0], v[2])) {
                Some(column) => {
                    column.1 = column.1.min(v[1]);
                    column.2 = column.2.max(v[1]);
                }
                None => columns.push(((v[0], v[2]), v[1], v[1])),
            }
        }
        columns.into_iter().map(|(_, lo, hi)| hi - lo).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: SectorFaceIdentifier = SectorFaceIdentifier::Wall {
        direction: Direction::PositiveZ,
        part: WallPart::Qa,
    };

    #[test]
    fn test_quad_when_both_corners_have_height() {
        let face = SectorFace::vertical_floor(ID, (0, 1), (1, 1), WallSplit::new(512, 256), WallSplit::new(0, 0))
            .unwrap();
        assert!(!face.shape.is_triangle());
        assert_eq!(face.vertical_extents(), vec![512, 256]);
        assert_eq!(face.shape.vertices()[1], [1024, 256, 1024]);
    }

    #[test]
    fn test_triangle_when_one_corner_meets() {
        let face = SectorFace::vertical_floor(ID, (0, 1), (1, 1), WallSplit::new(0, 256), WallSplit::new(0, 0))
            .unwrap();
        assert!(face.shape.is_triangle());
        assert_eq!(face.vertical_extents(), vec![0, 256]);
    }

    #[test]
    fn test_no_face_when_crossing_or_flat() {
        assert!(SectorFace::vertical_floor(ID, (0, 1), (1, 1), WallSplit::new(256, -256), WallSplit::new(0, 0)).is_none());
        assert!(SectorFace::vertical_floor(ID, (0, 1), (1, 1), WallSplit::new(0, 0), WallSplit::new(0, 0)).is_none());
    }

    #[test]
    fn test_ceiling_and_middle_argument_order() {
        // Ceiling: split below, top above
        assert!(SectorFace::vertical_ceiling(ID, (0, 0), (1, 0), WallSplit::new(768, 768), WallSplit::new(1024, 1024)).is_some());
        assert!(SectorFace::vertical_ceiling(ID, (0, 0), (1, 0), WallSplit::new(1024, 1024), WallSplit::new(768, 768)).is_none());
        // Middle: bottom first
        assert!(SectorFace::vertical_middle(ID, (0, 0), (1, 0), WallSplit::new(0, 0), WallSplit::new(1024, 1024)).is_some());
    }

    #[test]
    fn test_horizontal_vertex_count() {
        let v = [[0, 0, 0], [1024, 0, 0], [1024, 0, 1024]];
        assert!(SectorFace::horizontal(SectorFaceIdentifier::Floor, &v).unwrap().shape.is_triangle());
        assert!(SectorFace::horizontal(SectorFaceIdentifier::Floor, &v[..2]).is_none());
    }
}
