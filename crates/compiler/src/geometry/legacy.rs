// Legacy wall geometry
// Two-split side geometry (QA + ED, WS + RF) for levels built in legacy geometry mode.
// Only the first extra split on each side is considered; a missing split is treated
// as lying on the facing floor (ED) or ceiling (RF), which makes it invisible.

use crate::geometry::face::{SectorFace, SectorFaceIdentifier, WallPart, WallSplit};
use crate::geometry::wall::SectorWall;

fn crosses(split: WallSplit, reference: WallSplit) -> bool {
    (split.start_y > reference.start_y && split.end_y < reference.end_y)
        || (split.start_y < reference.start_y && split.end_y > reference.end_y)
}

pub fn floor_part_faces(wall: &SectorWall, is_any_wall: bool) -> Vec<SectorFace> {
    let mut faces = Vec::new();
    let floor = WallSplit::new(wall.start.min_y, wall.end.min_y);
    let ceiling = WallSplit::new(wall.start.max_y, wall.end.max_y);
    let ed = wall.extra_floor_splits.first().copied().unwrap_or(floor);
    let start = (wall.start.x, wall.start.z);
    let end = (wall.end.x, wall.end.z);

    let mut qa = wall.qa;
    if qa.start_y >= ceiling.start_y && qa.end_y >= ceiling.end_y {
        qa = ceiling;
    }

    if is_any_wall {
        if crosses(qa, floor) {
            qa = floor;
        }
        if crosses(qa, ceiling) {
            qa = ceiling;
        }
    }

    if qa == floor {
        return faces;
    }

    let ed_visible = ed.start_y >= floor.start_y
        && ed.end_y >= floor.end_y
        && qa.start_y >= ed.start_y
        && qa.end_y >= ed.end_y
        && ed != floor;
    let qa_bottom = if ed_visible { ed } else { floor };

    faces.extend(SectorFace::vertical_floor(
        SectorFaceIdentifier::wall(wall.direction, WallPart::Qa),
        start,
        end,
        qa,
        qa_bottom,
    ));

    if ed_visible {
        faces.extend(SectorFace::vertical_floor(
            SectorFaceIdentifier::wall(wall.direction, WallPart::ExtraFloor(0)),
            start,
            end,
            ed,
            floor,
        ));
    }

    faces
}

pub fn ceiling_part_faces(wall: &SectorWall, is_any_wall: bool) -> Vec<SectorFace> {
    let mut faces = Vec::new();
    let floor = WallSplit::new(wall.start.min_y, wall.end.min_y);
    let ceiling = WallSplit::new(wall.start.max_y, wall.end.max_y);
    let rf = wall.extra_ceiling_splits.first().copied().unwrap_or(ceiling);
    let start = (wall.start.x, wall.start.z);
    let end = (wall.end.x, wall.end.z);

    let mut ws = wall.ws;
    if ws.start_y <= floor.start_y && ws.end_y <= floor.end_y {
        ws = floor;
    }

    if is_any_wall {
        if crosses(ws, ceiling) {
            ws = ceiling;
        }
        if crosses(ws, floor) {
            ws = floor;
        }
    }

    if ws == ceiling {
        return faces;
    }

    let rf_visible = rf.start_y <= ceiling.start_y
        && rf.end_y <= ceiling.end_y
        && ws.start_y <= rf.start_y
        && ws.end_y <= rf.end_y
        && rf != ceiling;
    let ws_top = if rf_visible { rf } else { ceiling };

    faces.extend(SectorFace::vertical_ceiling(
        SectorFaceIdentifier::wall(wall.direction, WallPart::Ws),
        start,
        end,
        ws,
        ws_top,
    ));

    if rf_visible {
        faces.extend(SectorFace::vertical_ceiling(
            SectorFaceIdentifier::wall(wall.direction, WallPart::ExtraCeiling(0)),
            start,
            end,
            rf,
            ceiling,
        ));
    }

    faces
}

pub fn middle_face(wall: &SectorWall) -> Option<SectorFace> {
    let top = WallSplit::new(
        wall.ws.start_y.min(wall.start.max_y),
        wall.ws.end_y.min(wall.end.max_y),
    );
    let bottom = WallSplit::new(
        wall.qa.start_y.max(wall.start.min_y),
        wall.qa.end_y.max(wall.end.min_y),
    );

    SectorFace::vertical_middle(
        SectorFaceIdentifier::wall(wall.direction, WallPart::Middle),
        (wall.start.x, wall.start.z),
        (wall.end.x, wall.end.z),
        bottom,
        top,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::wall::WallEnd;
    use crate::level::grid::Direction;

    fn wall(qa: (i32, i32), ed: Option<(i32, i32)>) -> SectorWall {
        SectorWall {
            direction: Direction::NegativeX,
            start: WallEnd { x: 0, z: 0, min_y: 0, max_y: 2048 },
            end: WallEnd { x: 0, z: 1, min_y: 0, max_y: 2048 },
            qa: WallSplit::new(qa.0, qa.1),
            ws: WallSplit::new(2048, 2048),
            extra_floor_splits: ed.map(|(a, b)| WallSplit::new(a, b)).into_iter().collect(),
            extra_ceiling_splits: Vec::new(),
        }
    }

    #[test]
    fn test_qa_on_floor_has_no_faces() {
        assert!(floor_part_faces(&wall((0, 0), None), false).is_empty());
    }

    #[test]
    fn test_missing_ed_means_single_face() {
        let faces = floor_part_faces(&wall((512, 512), None), false);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].vertical_extents(), vec![512, 512]);
    }

    #[test]
    fn test_visible_ed_splits_the_step() {
        let faces = floor_part_faces(&wall((1024, 1024), Some((256, 256))), false);
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].vertical_extents(), vec![768, 768]);
        assert_eq!(faces[1].identifier, SectorFaceIdentifier::wall(Direction::NegativeX, WallPart::ExtraFloor(0)));
        assert_eq!(faces[1].vertical_extents(), vec![256, 256]);
    }

    #[test]
    fn test_crossing_qa_on_wall_collapses() {
        assert!(floor_part_faces(&wall((256, -256), None), true).is_empty());
    }

    #[test]
    fn test_qa_above_ceiling_is_clamped() {
        let faces = floor_part_faces(&wall((4096, 4096), None), false);
        assert_eq!(faces[0].vertical_extents(), vec![2048, 2048]);
    }

    #[test]
    fn test_ceiling_and_middle() {
        let mut w = wall((0, 0), None);
        w.ws = WallSplit::new(1536, 1536);
        w.extra_ceiling_splits = vec![WallSplit::new(1792, 1792)];
        let faces = ceiling_part_faces(&w, false);
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].vertical_extents(), vec![256, 256]);
        assert_eq!(middle_face(&w).unwrap().vertical_extents(), vec![1536, 1536]);
    }
}
