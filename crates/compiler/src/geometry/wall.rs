// Sector wall geometry
//
// A `SectorWall` describes one side of a sector: the floor and ceiling of the sector it
// faces (`start`/`end` min/max), and this sector's own floor (QA) and ceiling (WS)
// heights plus any extra splits along that side. From it we derive the visible
// vertical faces: floor steps, ceiling steps and the solid middle part.

use crate::geometry::face::{SectorFace, SectorFaceIdentifier, WallPart, WallSplit};
use crate::level::grid::{DiagonalSplit, Direction};

/// One end of a sector side: grid corner plus the facing floor (min) and ceiling (max)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallEnd {
    pub x: i32,
    pub z: i32,
    pub min_y: i32,
    pub max_y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorWall {
    pub direction: Direction,
    pub start: WallEnd,
    pub end: WallEnd,
    pub qa: WallSplit,
    pub ws: WallSplit,
    pub extra_floor_splits: Vec<WallSplit>,
    pub extra_ceiling_splits: Vec<WallSplit>,
}

fn extra_index(index: usize) -> u8 {
    u8::try_from(index).unwrap_or(u8::MAX)
}

impl SectorWall {
    fn start_pos(&self) -> (i32, i32) {
        (self.start.x, self.start.z)
    }

    fn end_pos(&self) -> (i32, i32) {
        (self.end.x, self.end.z)
    }

    fn floor_baseline(&self) -> WallSplit {
        WallSplit::new(self.start.min_y, self.end.min_y)
    }

    fn ceiling_baseline(&self) -> WallSplit {
        WallSplit::new(self.start.max_y, self.end.max_y)
    }

    pub fn is_qa_fully_above_max_y(&self) -> bool {
        self.qa.start_y >= self.start.max_y && self.qa.end_y >= self.end.max_y
    }

    pub fn is_ws_fully_below_min_y(&self) -> bool {
        self.ws.start_y <= self.start.min_y && self.ws.end_y <= self.end.min_y
    }

    /// Whether this side borders the walkable triangle of a diagonal floor split
    pub fn can_have_non_diagonal_floor_part(&self, diagonal_floor_split: DiagonalSplit) -> bool {
        matches!(
            (diagonal_floor_split, self.direction),
            (DiagonalSplit::XnZp, Direction::NegativeZ | Direction::PositiveX)
                | (DiagonalSplit::XpZn, Direction::NegativeX | Direction::PositiveZ)
                | (DiagonalSplit::XpZp, Direction::NegativeZ | Direction::NegativeX)
                | (DiagonalSplit::XnZn, Direction::PositiveZ | Direction::PositiveX)
        )
    }

    /// Whether this side borders the open triangle of a diagonal ceiling split
    pub fn can_have_non_diagonal_ceiling_part(&self, diagonal_ceiling_split: DiagonalSplit) -> bool {
        matches!(
            (diagonal_ceiling_split, self.direction),
            (DiagonalSplit::XnZp, Direction::NegativeZ | Direction::PositiveX)
                | (DiagonalSplit::XpZn, Direction::NegativeX | Direction::PositiveZ)
                | (DiagonalSplit::XpZp, Direction::NegativeZ | Direction::NegativeX)
                | (DiagonalSplit::XnZn, Direction::PositiveZ | Direction::PositiveX)
        )
    }

    /// Floor step faces: QA first, then every extra floor split below it
    pub fn floor_part_faces(
        &self,
        diagonal_floor_split: DiagonalSplit,
        is_any_wall: bool,
    ) -> Vec<SectorFace> {
        let can_have_non_diagonal = self.can_have_non_diagonal_floor_part(diagonal_floor_split);
        let qa_fully_above = self.is_qa_fully_above_max_y();
        let mut faces = Vec::new();

        for index in 0..=self.extra_floor_splits.len() {
            // Slot 0 is QA, slot n is extra split n - 1
            let (identifier, split) = match index.checked_sub(1) {
                None => (SectorFaceIdentifier::wall(self.direction, WallPart::Qa), self.qa),
                Some(extra) => (
                    SectorFaceIdentifier::wall(self.direction, WallPart::ExtraFloor(extra_index(extra))),
                    self.extra_floor_splits[extra],
                ),
            };

            let mut bottom = self.floor_baseline();

            if let Some(next) = self.extra_floor_splits.get(index) {
                if (can_have_non_diagonal || qa_fully_above)
                    && (next.start_y > self.qa.start_y || next.end_y > self.qa.end_y)
                {
                    continue;
                }

                // Next split is not in the floor void
                if next.start_y >= self.start.min_y && next.end_y >= self.end.min_y {
                    bottom = *next;
                }
            }

            if split.start_y <= bottom.start_y && split.end_y <= bottom.end_y {
                continue;
            }

            let mut face =
                SectorFace::vertical_floor(identifier, self.start_pos(), self.end_pos(), split, bottom);

            if face.is_none() {
                let is_even_with_qa = split == self.qa;
                if is_even_with_qa && (!is_any_wall || can_have_non_diagonal) {
                    let lowest = split
                        .start_y
                        .min(split.end_y)
                        .min(bottom.start_y)
                        .min(bottom.end_y);
                    face = SectorFace::vertical_floor(
                        identifier,
                        self.start_pos(),
                        self.end_pos(),
                        split,
                        WallSplit::new(lowest, lowest),
                    );
                }
            }

            faces.extend(face);
        }

        faces
    }

    /// Ceiling step faces: WS first, then every extra ceiling split above it
    pub fn ceiling_part_faces(
        &self,
        diagonal_ceiling_split: DiagonalSplit,
        is_any_wall: bool,
    ) -> Vec<SectorFace> {
        let can_have_non_diagonal = self.can_have_non_diagonal_ceiling_part(diagonal_ceiling_split);
        let ws_fully_below = self.is_ws_fully_below_min_y();
        let mut faces = Vec::new();

        for index in 0..=self.extra_ceiling_splits.len() {
            let (identifier, split) = match index.checked_sub(1) {
                None => (SectorFaceIdentifier::wall(self.direction, WallPart::Ws), self.ws),
                Some(extra) => (
                    SectorFaceIdentifier::wall(self.direction, WallPart::ExtraCeiling(extra_index(extra))),
                    self.extra_ceiling_splits[extra],
                ),
            };

            let mut top = self.ceiling_baseline();

            if let Some(next) = self.extra_ceiling_splits.get(index) {
                if (can_have_non_diagonal || ws_fully_below)
                    && (next.start_y < self.ws.start_y || next.end_y < self.ws.end_y)
                {
                    continue;
                }

                // Next split is not in the ceiling void
                if next.start_y <= self.start.max_y && next.end_y <= self.end.max_y {
                    top = *next;
                }
            }

            if split.start_y >= top.start_y && split.end_y >= top.end_y {
                continue;
            }

            let mut face =
                SectorFace::vertical_ceiling(identifier, self.start_pos(), self.end_pos(), split, top);

            if face.is_none() {
                let is_even_with_ws = split == self.ws;
                if is_even_with_ws && (!is_any_wall || can_have_non_diagonal) {
                    let highest = split
                        .start_y
                        .max(split.end_y)
                        .max(top.start_y)
                        .max(top.end_y);
                    face = SectorFace::vertical_ceiling(
                        identifier,
                        self.start_pos(),
                        self.end_pos(),
                        split,
                        WallSplit::new(highest, highest),
                    );
                }
            }

            faces.extend(face);
        }

        faces
    }

    /// Solid part between QA and WS, clamped to the facing floor and ceiling
    pub fn middle_face(&self) -> Option<SectorFace> {
        let mut qa = self.qa;
        let mut ws = self.ws;

        if qa.start_y < self.start.min_y || qa.end_y < self.end.min_y {
            qa = self.floor_baseline();
        }

        if ws.start_y > self.start.max_y || ws.end_y > self.end.max_y {
            ws = self.ceiling_baseline();
        }

        let bottom = WallSplit::new(
            if qa.start_y <= self.start.min_y { self.start.min_y } else { qa.start_y },
            if qa.end_y <= self.end.min_y { self.end.min_y } else { qa.end_y },
        );
        let top = WallSplit::new(
            if ws.start_y >= self.start.max_y { self.start.max_y } else { ws.start_y },
            if ws.end_y >= self.end.max_y { self.end.max_y } else { ws.end_y },
        );

        SectorFace::vertical_middle(
            SectorFaceIdentifier::wall(self.direction, WallPart::Middle),
            self.start_pos(),
            self.end_pos(),
            bottom,
            top,
        )
    }

    /// Snap QA, WS and the extra splits into the facing opening. Once an extra split
    /// lies in the void, it and every split after it are dropped.
    pub fn normalize(
        &mut self,
        diagonal_floor_split: DiagonalSplit,
        diagonal_ceiling_split: DiagonalSplit,
        is_any_wall: bool,
    ) {
        let (qa, qa_in_void) = self.normalize_floor_split(self.qa, diagonal_floor_split, is_any_wall);
        let mut extra_floor_splits = Vec::with_capacity(self.extra_floor_splits.len());
        if !qa_in_void {
            for &extra in &self.extra_floor_splits {
                let (split, in_void) = self.normalize_floor_split(extra, diagonal_floor_split, is_any_wall);
                if in_void {
                    break;
                }
                extra_floor_splits.push(split);
            }
        }

        let (ws, ws_in_void) =
            self.normalize_ceiling_split(self.ws, diagonal_ceiling_split, is_any_wall);
        let mut extra_ceiling_splits = Vec::with_capacity(self.extra_ceiling_splits.len());
        if !ws_in_void {
            for &extra in &self.extra_ceiling_splits {
                let (split, in_void) =
                    self.normalize_ceiling_split(extra, diagonal_ceiling_split, is_any_wall);
                if in_void {
                    break;
                }
                extra_ceiling_splits.push(split);
            }
        }

        // Every split above snaps against the unnormalized QA and WS
        self.qa = qa;
        self.ws = ws;
        self.extra_floor_splits = extra_floor_splits;
        self.extra_ceiling_splits = extra_ceiling_splits;
    }

    /// Returns the snapped split and whether it lies in the floor void
    fn normalize_floor_split(
        &self,
        split: WallSplit,
        diagonal_floor_split: DiagonalSplit,
        is_any_wall: bool,
    ) -> (WallSplit, bool) {
        let can_have_non_diagonal = self.can_have_non_diagonal_floor_part(diagonal_floor_split);

        let face_in_void = split.start_y < self.start.min_y
            || split.end_y < self.end.min_y
            || (split.start_y == self.start.min_y && split.end_y == self.end.min_y);

        if face_in_void && is_any_wall && !can_have_non_diagonal {
            return (split, true);
        }

        let either_above = split.start_y > self.start.max_y || split.end_y > self.end.max_y;
        let both_above = split.start_y >= self.start.max_y && split.end_y >= self.end.max_y;

        let snapped = if (either_above
            && (is_any_wall || self.is_qa_fully_above_max_y())
            && !can_have_non_diagonal)
            || both_above
        {
            self.ceiling_baseline()
        } else if split.start_y > self.qa.start_y || split.end_y > self.qa.end_y {
            self.qa
        } else {
            split
        };

        (snapped, false)
    }

    /// Returns the snapped split and whether it lies in the ceiling void
    fn normalize_ceiling_split(
        &self,
        split: WallSplit,
        diagonal_ceiling_split: DiagonalSplit,
        is_any_wall: bool,
    ) -> (WallSplit, bool) {
        let can_have_non_diagonal = self.can_have_non_diagonal_ceiling_part(diagonal_ceiling_split);

        let face_in_void = split.start_y > self.start.max_y
            || split.end_y > self.end.max_y
            || (split.start_y == self.start.max_y && split.end_y == self.end.max_y);

        if face_in_void && is_any_wall && !can_have_non_diagonal {
            return (split, true);
        }

        let either_below = split.start_y < self.start.min_y || split.end_y < self.end.min_y;
        let both_below = split.start_y <= self.start.min_y && split.end_y <= self.end.min_y;

        let snapped = if (either_below
            && (is_any_wall || self.is_ws_fully_below_min_y())
            && !can_have_non_diagonal)
            || both_below
        {
            self.floor_baseline()
        } else if split.start_y < self.ws.start_y || split.end_y < self.ws.end_y {
            self.ws
        } else {
            split
        };

        (snapped, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(floor: (i32, i32), ceiling: (i32, i32), qa: (i32, i32), ws: (i32, i32)) -> SectorWall {
        SectorWall {
            direction: Direction::PositiveZ,
            start: WallEnd { x: 0, z: 1, min_y: floor.0, max_y: ceiling.0 },
            end: WallEnd { x: 1, z: 1, min_y: floor.1, max_y: ceiling.1 },
            qa: WallSplit::new(qa.0, qa.1),
            ws: WallSplit::new(ws.0, ws.1),
            extra_floor_splits: Vec::new(),
            extra_ceiling_splits: Vec::new(),
        }
    }

    fn assert_positive_extent(faces: &[SectorFace]) {
        for face in faces {
            let extents = face.vertical_extents();
            assert!(extents.iter().all(|&e| e >= 0), "negative extent in {face:?}");
            assert!(extents.iter().any(|&e| e > 0), "zero-height face {face:?}");
            if !face.shape.is_triangle() {
                assert!(extents.iter().all(|&e| e > 0), "flat quad corner in {face:?}");
            }
        }
    }

    #[test]
    fn test_diagonal_lookup_table() {
        let mut w = wall((0, 0), (1024, 1024), (0, 0), (1024, 1024));
        let expected = [
            (DiagonalSplit::XnZp, [Direction::NegativeZ, Direction::PositiveX]),
            (DiagonalSplit::XpZn, [Direction::NegativeX, Direction::PositiveZ]),
            (DiagonalSplit::XpZp, [Direction::NegativeZ, Direction::NegativeX]),
            (DiagonalSplit::XnZn, [Direction::PositiveZ, Direction::PositiveX]),
        ];
        for (split, allowed) in expected {
            for direction in Direction::ALL {
                w.direction = direction;
                let result = w.can_have_non_diagonal_floor_part(split);
                assert_eq!(result, allowed.contains(&direction), "{split:?} {direction:?}");
                assert_eq!(result, w.can_have_non_diagonal_ceiling_part(split));
            }
        }
        w.direction = Direction::PositiveZ;
        assert!(!w.can_have_non_diagonal_floor_part(DiagonalSplit::None));
    }

    #[test]
    fn test_simple_floor_step() {
        // This sector's floor is 512 above the facing floor
        let w = wall((0, 0), (2048, 2048), (512, 512), (2048, 2048));
        let faces = w.floor_part_faces(DiagonalSplit::None, false);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].identifier, SectorFaceIdentifier::wall(Direction::PositiveZ, WallPart::Qa));
        assert_eq!(faces[0].vertical_extents(), vec![512, 512]);
        assert!(w.ceiling_part_faces(DiagonalSplit::None, false).is_empty());
    }

    #[test]
    fn test_ceiling_step() {
        let w = wall((0, 0), (2048, 2048), (0, 0), (1536, 1024));
        let faces = w.ceiling_part_faces(DiagonalSplit::None, false);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].vertical_extents(), vec![512, 1024]);
    }

    #[test]
    fn test_extra_floor_split_divides_step() {
        let mut w = wall((0, 0), (2048, 2048), (1024, 1024), (2048, 2048));
        w.extra_floor_splits.push(WallSplit::new(512, 512));
        let faces = w.floor_part_faces(DiagonalSplit::None, false);
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].vertical_extents(), vec![512, 512]);
        assert_eq!(faces[1].identifier, SectorFaceIdentifier::wall(Direction::PositiveZ, WallPart::ExtraFloor(0)));
        assert_positive_extent(&faces);
    }

    #[test]
    fn test_overdraw_requires_exact_match() {
        // Crossing configuration: QA is above the facing floor at one corner only
        let mut w = wall((256, 256), (2048, 2048), (512, 0), (2048, 2048));
        w.normalize(DiagonalSplit::None, DiagonalSplit::None, false);
        let faces = w.floor_part_faces(DiagonalSplit::None, false);
        assert_eq!(faces.len(), 1, "QA overdraws down to the lowest point");
        assert_positive_extent(&faces);

        let mut exact = w.clone();
        exact.extra_floor_splits.push(WallSplit::new(512, 0));
        assert_eq!(exact.floor_part_faces(DiagonalSplit::None, false).len(), 2);

        let mut perturbed = w.clone();
        perturbed.extra_floor_splits.push(WallSplit::new(511, 0));
        assert_eq!(perturbed.floor_part_faces(DiagonalSplit::None, false).len(), 1);
    }

    #[test]
    fn test_no_overdraw_on_plain_walls() {
        let w = wall((256, 256), (2048, 2048), (512, 0), (2048, 2048));
        assert!(w.floor_part_faces(DiagonalSplit::None, true).is_empty());
    }

    #[test]
    fn test_normalize_first_void_wins() {
        let mut w = wall((0, 0), (2048, 2048), (1024, 1024), (2048, 2048));
        w.extra_floor_splits = vec![
            WallSplit::new(512, 512),
            WallSplit::new(-256, -256),
            WallSplit::new(256, 256),
        ];
        w.normalize(DiagonalSplit::None, DiagonalSplit::None, true);
        assert_eq!(w.extra_floor_splits, vec![WallSplit::new(512, 512)]);
    }

    #[test]
    fn test_normalize_snaps_to_qa_and_ceiling() {
        let mut w = wall((0, 0), (1024, 1024), (512, 512), (1024, 1024));
        w.extra_floor_splits = vec![WallSplit::new(768, 256)];
        w.normalize(DiagonalSplit::None, DiagonalSplit::None, false);
        assert_eq!(w.extra_floor_splits[0], WallSplit::new(512, 512));

        let mut high = wall((0, 0), (1024, 1024), (2048, 2048), (1024, 1024));
        high.normalize(DiagonalSplit::None, DiagonalSplit::None, false);
        assert_eq!(high.qa, WallSplit::new(1024, 1024));
    }

    #[test]
    fn test_extra_splits_snap_to_unnormalized_qa_and_ws() {
        let mut w = wall((0, 0), (2048, 2048), (3000, 1000), (2048, 2048));
        w.extra_floor_splits = vec![WallSplit::new(1500, 1500)];
        w.normalize(DiagonalSplit::None, DiagonalSplit::None, true);
        assert_eq!(w.qa, WallSplit::new(2048, 2048));
        assert_eq!(w.extra_floor_splits, vec![WallSplit::new(3000, 1000)]);

        let mut w = wall((0, 0), (2048, 2048), (0, 0), (-1000, 1000));
        w.extra_ceiling_splits = vec![WallSplit::new(500, 500)];
        w.normalize(DiagonalSplit::None, DiagonalSplit::None, true);
        assert_eq!(w.ws, WallSplit::new(0, 0));
        assert_eq!(w.extra_ceiling_splits, vec![WallSplit::new(-1000, 1000)]);
    }

    #[test]
    fn test_normalize_ceiling_mirror() {
        let mut w = wall((0, 0), (2048, 2048), (0, 0), (1024, 1024));
        w.extra_ceiling_splits = vec![
            WallSplit::new(1536, 1536),
            WallSplit::new(4096, 4096),
            WallSplit::new(1792, 1792),
        ];
        w.normalize(DiagonalSplit::None, DiagonalSplit::None, true);
        assert_eq!(w.extra_ceiling_splits, vec![WallSplit::new(1536, 1536)]);

        let mut low = wall((0, 0), (2048, 2048), (0, 0), (-512, -512));
        low.normalize(DiagonalSplit::None, DiagonalSplit::None, false);
        assert_eq!(low.ws, WallSplit::new(0, 0));
    }

    #[test]
    fn test_middle_face_clamps_to_opening() {
        let w = wall((0, 0), (1024, 1024), (-512, -512), (4096, 4096));
        let face = w.middle_face().unwrap();
        assert_eq!(face.vertical_extents(), vec![1024, 1024]);

        let w = wall((0, 0), (1024, 1024), (256, 0), (768, 1024));
        assert_eq!(w.middle_face().unwrap().vertical_extents(), vec![512, 1024]);

        let closed = wall((0, 0), (1024, 1024), (1024, 1024), (1024, 1024));
        assert!(closed.middle_face().is_none());
    }

    #[test]
    fn test_faces_never_have_negative_extent() {
        let heights = [-512, -256, 0, 256, 512, 768, 1024, 1536];
        for &qa_a in &heights {
            for &qa_b in &heights {
                for &ed in &heights {
                    for is_any_wall in [false, true] {
                        let mut w = wall((0, 256), (1024, 768), (qa_a, qa_b), (1024 - qa_b, 1024 - qa_a));
                        w.extra_floor_splits = vec![WallSplit::new(ed, ed / 2)];
                        w.extra_ceiling_splits = vec![WallSplit::new(1024 - ed / 2, 1024 - ed)];
                        w.normalize(DiagonalSplit::None, DiagonalSplit::None, is_any_wall);
                        assert_positive_extent(&w.floor_part_faces(DiagonalSplit::None, is_any_wall));
                        assert_positive_extent(&w.ceiling_part_faces(DiagonalSplit::None, is_any_wall));
                        assert_positive_extent(&w.middle_face().into_iter().collect::<Vec<_>>());
                    }
                }
            }
        }
    }
}
