// Room geometry
//
// Turns a room's sector grid into faces. Every sector side that looks at an open sector
// (in this room, or across a wall portal in the adjoining room) becomes a `SectorWall`,
// and the wall deriver decides which vertical faces are visible. Floors, ceilings,
// diagonal walls and imported geometry are added on top.

use crate::error::Result;
use crate::geometry::face::{FaceShape, FaceVertex, SectorFace, SectorFaceIdentifier, WallSplit};
use crate::geometry::legacy;
use crate::geometry::wall::{SectorWall, WallEnd};
use crate::level::grid::{Corner, DiagonalSplit, Direction, Sector, SectorKind, SectorSurface, SECTOR_SIZE};
use crate::level::objects::ObjectKind;
use crate::level::portal::PortalOpacity;
use crate::level::texture::TextureArea;
use crate::level::{GeometryMode, Level, Room, RoomId};
use crate::numeric::round_coord;
use crate::progress::CancellationToken;
use rayon::prelude::*;

/// A textured face of a room mesh. Positions are room-local, y up.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomFace {
    pub shape: FaceShape,
    pub texture: TextureArea,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomGeometry {
    pub faces: Vec<RoomFace>,
}

/// The sector a side looks at, with the height offset into this room's frame
struct Facing<'a> {
    sector: &'a Sector,
    y_offset: i32,
}

/// Grid corners of a side and the corners of both sectors lying on them
struct Edge {
    start: (i32, i32),
    end: (i32, i32),
    own: (Corner, Corner),
    facing: (Corner, Corner),
}

fn edge(direction: Direction, x: i32, z: i32) -> Edge {
    match direction {
        Direction::PositiveZ => Edge {
            start: (x, z + 1),
            end: (x + 1, z + 1),
            own: (Corner::XnZp, Corner::XpZp),
            facing: (Corner::XnZn, Corner::XpZn),
        },
        Direction::NegativeZ => Edge {
            start: (x + 1, z),
            end: (x, z),
            own: (Corner::XpZn, Corner::XnZn),
            facing: (Corner::XpZp, Corner::XnZp),
        },
        Direction::PositiveX => Edge {
            start: (x + 1, z + 1),
            end: (x + 1, z),
            own: (Corner::XpZp, Corner::XpZn),
            facing: (Corner::XnZp, Corner::XnZn),
        },
        Direction::NegativeX => Edge {
            start: (x, z),
            end: (x, z + 1),
            own: (Corner::XnZn, Corner::XnZp),
            facing: (Corner::XpZn, Corner::XpZp),
        },
    }
}

fn corner_position(x: i32, z: i32, corner: Corner) -> (i32, i32) {
    match corner {
        Corner::XnZp => (x, z + 1),
        Corner::XpZp => (x + 1, z + 1),
        Corner::XpZn => (x + 1, z),
        Corner::XnZn => (x, z),
    }
}

/// The neighbour on `direction`, resolved through a wall portal when the neighbour is
/// a portal border. None when the neighbour is outside the grid or the portal is dangling.
fn facing_sector<'a>(level: &'a Level, room: &'a Room, x: i32, z: i32, direction: Direction) -> Option<Facing<'a>> {
    let (dx, dz) = direction.offset();
    let (nx, nz) = (x + dx, z + dz);
    let neighbour = room.sectors.get(nx, nz)?;

    if neighbour.kind == SectorKind::BorderWall {
        if let Some(portal) = room.wall_portal_at(nx, nz) {
            let adjoining = level.room(portal.adjoining_room)?;
            let ax = nx + room.position[0] - adjoining.position[0];
            let az = nz + room.position[2] - adjoining.position[2];
            return adjoining.sectors.get(ax, az).map(|sector| Facing {
                sector,
                y_offset: adjoining.position[1] - room.position[1],
            });
        }
    }

    Some(Facing {
        sector: neighbour,
        y_offset: 0,
    })
}

fn side_splits(splits: &[[i32; 4]], own: (Corner, Corner)) -> Vec<WallSplit> {
    splits
        .iter()
        .map(|s| WallSplit::new(s[own.0 as usize], s[own.1 as usize]))
        .collect()
}

fn build_wall(sector: &Sector, facing: &Facing, x: i32, z: i32, direction: Direction) -> SectorWall {
    let e = edge(direction, x, z);
    let f = facing.sector;
    let end = |pos: (i32, i32), corner: Corner| WallEnd {
        x: pos.0,
        z: pos.1,
        min_y: f.floor.corner(corner) + facing.y_offset,
        max_y: f.ceiling.corner(corner) + facing.y_offset,
    };

    SectorWall {
        direction,
        start: end(e.start, e.facing.0),
        end: end(e.end, e.facing.1),
        qa: WallSplit::new(sector.floor.corner(e.own.0), sector.floor.corner(e.own.1)),
        ws: WallSplit::new(sector.ceiling.corner(e.own.0), sector.ceiling.corner(e.own.1)),
        extra_floor_splits: side_splits(&sector.floor.extra_splits, e.own),
        extra_ceiling_splits: side_splits(&sector.ceiling.extra_splits, e.own),
    }
}

/// Triangles of a split surface: the one holding the named corner first.
/// An unsplit surface uses the XnZn-XpZp diagonal.
fn split_triangles(split: DiagonalSplit) -> ([Corner; 3], [Corner; 3]) {
    use Corner::*;
    match split {
        DiagonalSplit::None | DiagonalSplit::XnZp => ([XnZp, XpZp, XnZn], [XpZp, XpZn, XnZn]),
        DiagonalSplit::XpZn => ([XpZp, XpZn, XnZn], [XnZp, XpZp, XnZn]),
        DiagonalSplit::XpZp => ([XnZp, XpZp, XpZn], [XnZp, XpZn, XnZn]),
        DiagonalSplit::XnZn => ([XnZp, XpZn, XnZn], [XnZp, XpZp, XpZn]),
    }
}

/// Corners of the hypotenuse of a diagonal split
fn hypotenuse(split: DiagonalSplit) -> Option<(Corner, Corner)> {
    match split {
        DiagonalSplit::None => None,
        DiagonalSplit::XnZp | DiagonalSplit::XpZn => Some((Corner::XnZn, Corner::XpZp)),
        DiagonalSplit::XpZp | DiagonalSplit::XnZn => Some((Corner::XnZp, Corner::XpZn)),
    }
}

fn surface_face(
    identifier: SectorFaceIdentifier,
    x: i32,
    z: i32,
    surface: &SectorSurface,
    corners: &[Corner],
    ceiling: bool,
) -> Option<SectorFace> {
    let mut vertices: Vec<FaceVertex> = corners
        .iter()
        .map(|&c| {
            let (gx, gz) = corner_position(x, z, c);
            [gx * SECTOR_SIZE, surface.corner(c), gz * SECTOR_SIZE]
        })
        .collect();
    // Ceilings face down
    if ceiling {
        vertices.reverse();
    }
    SectorFace::horizontal(identifier, &vertices)
}

fn horizontal_faces(x: i32, z: i32, sector: &Sector, ceiling: bool) -> Vec<SectorFace> {
    let (first, second, surface) = if ceiling {
        (SectorFaceIdentifier::Ceiling, SectorFaceIdentifier::CeilingTriangle2, &sector.ceiling)
    } else {
        (SectorFaceIdentifier::Floor, SectorFaceIdentifier::FloorTriangle2, &sector.floor)
    };

    if sector.is_diagonal_wall() {
        let (_, open) = split_triangles(sector.floor.diagonal_split);
        return surface_face(first, x, z, surface, &open, ceiling).into_iter().collect();
    }

    if !surface.diagonal_split.is_some() && surface.is_planar() {
        use Corner::*;
        return surface_face(first, x, z, surface, &[XnZp, XpZp, XpZn, XnZn], ceiling)
            .into_iter()
            .collect();
    }

    let (a, b) = split_triangles(surface.diagonal_split);
    [
        surface_face(first, x, z, surface, &a, ceiling),
        surface_face(second, x, z, surface, &b, ceiling),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn diagonal_middle_face(x: i32, z: i32, sector: &Sector) -> Option<SectorFace> {
    let (p, q) = hypotenuse(sector.floor.diagonal_split)?;
    SectorFace::vertical_middle(
        SectorFaceIdentifier::DiagonalMiddle,
        corner_position(x, z, p),
        corner_position(x, z, q),
        WallSplit::new(sector.floor.corner(p), sector.floor.corner(q)),
        WallSplit::new(sector.ceiling.corner(p), sector.ceiling.corner(q)),
    )
}

fn wall_faces(level: &Level, room: &Room, x: i32, z: i32, sector: &Sector) -> Vec<SectorFace> {
    let mode = level.settings.geometry_mode;
    let is_any_wall = sector.is_any_wall();
    let diagonal_floor = sector.floor.diagonal_split;
    let diagonal_ceiling = sector.ceiling.diagonal_split;
    let mut faces = Vec::new();

    for direction in Direction::ALL {
        let Some(facing) = facing_sector(level, room, x, z, direction) else {
            continue;
        };
        if facing.sector.is_any_wall() {
            continue;
        }

        let mut wall = build_wall(sector, &facing, x, z, direction);
        match mode {
            GeometryMode::Modern => {
                wall.normalize(diagonal_floor, diagonal_ceiling, is_any_wall);
                faces.extend(wall.floor_part_faces(diagonal_floor, is_any_wall));
                faces.extend(wall.ceiling_part_faces(diagonal_ceiling, is_any_wall));
            }
            GeometryMode::Legacy => {
                faces.extend(legacy::floor_part_faces(&wall, is_any_wall));
                faces.extend(legacy::ceiling_part_faces(&wall, is_any_wall));
            }
        }

        // Sides along the open triangle of a diagonal wall have no solid body
        let open_side = sector.is_diagonal_wall() && wall.can_have_non_diagonal_floor_part(diagonal_floor);
        if is_any_wall && !open_side {
            let middle = match mode {
                GeometryMode::Modern => wall.middle_face(),
                GeometryMode::Legacy => legacy::middle_face(&wall),
            };
            faces.extend(middle);
        }
    }

    faces
}

/// Every untextured face a sector contributes to its room
pub fn sector_faces(level: &Level, room: &Room, x: i32, z: i32) -> Vec<SectorFace> {
    let Some(sector) = room.sectors.get(x, z) else {
        return Vec::new();
    };
    if room.wall_portal_at(x, z).is_some() {
        return Vec::new();
    }

    let mut faces = wall_faces(level, room, x, z, sector);

    if sector.kind == SectorKind::Floor || sector.is_diagonal_wall() {
        let floor_open = room.floor_portal_at(x, z).is_some_and(|p| p.opacity == PortalOpacity::None);
        if !floor_open {
            faces.extend(horizontal_faces(x, z, sector, false));
        }
        let ceiling_open = room.ceiling_portal_at(x, z).is_some_and(|p| p.opacity == PortalOpacity::None);
        if !ceiling_open {
            faces.extend(horizontal_faces(x, z, sector, true));
        }
    }

    if sector.is_diagonal_wall() {
        faces.extend(diagonal_middle_face(x, z, sector));
    }

    faces
}

/// Textured geometry of one room. Faces without a texture are hidden.
pub fn build_room(level: &Level, room: &Room) -> RoomGeometry {
    let default_texture = level.settings.default_texture.as_ref();
    let mut geometry = RoomGeometry::default();

    for (x, z, sector) in room.sectors.iter() {
        for face in sector_faces(level, room, x, z) {
            if let Some(texture) = sector.texture_for(face.identifier, default_texture) {
                geometry.faces.push(RoomFace {
                    shape: face.shape,
                    texture,
                });
            }
        }
    }

    for (_, object) in level.room_objects(room) {
        let ObjectKind::ImportedGeometry(imported) = &object.kind else {
            continue;
        };
        for triangle in &imported.triangles {
            let vertices = triangle.vertices.map(|v| {
                let p = object.position + v;
                [round_coord(p.x), round_coord(p.y), round_coord(p.z)]
            });
            geometry.faces.push(RoomFace {
                shape: FaceShape::Triangle(vertices),
                texture: triangle.texture.clone(),
            });
        }
    }

    geometry
}

/// Geometry of every existing room, in slot order. Rooms are built in parallel.
pub fn build_rooms(level: &Level, cancel: &CancellationToken) -> Result<Vec<(RoomId, RoomGeometry)>> {
    let rooms: Vec<(RoomId, &Room)> = level.existing_rooms().collect();
    rooms
        .into_par_iter()
        .map(|(id, room)| {
            cancel.check()?;
            Ok((id, build_room(level, room)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::geometry::face::WallPart;
    use crate::level::math::Vec3;
    use crate::level::objects::{ImportedGeometryInstance, ImportedTriangle};
    use crate::level::portal::SectorArea;
    use crate::level::LevelSettings;
    use crate::version::GameVersion;

    fn level() -> Level {
        let mut settings = LevelSettings::new(GameVersion::Tr4);
        settings.default_texture = Some(TextureArea::full_page(0));
        Level::new(settings)
    }

    fn ids(faces: &[SectorFace]) -> Vec<SectorFaceIdentifier> {
        faces.iter().map(|f| f.identifier).collect()
    }

    #[test]
    fn test_single_sector_room() {
        let mut level = level();
        let id = level.add_room(Room::new("r", 3, 3, [0, 0, 0], 1024));
        let room = level.room(id).unwrap();

        let floor = sector_faces(&level, room, 1, 1);
        assert_eq!(ids(&floor), vec![SectorFaceIdentifier::Floor, SectorFaceIdentifier::Ceiling]);

        let border = sector_faces(&level, room, 0, 1);
        assert_eq!(
            ids(&border),
            vec![SectorFaceIdentifier::wall(Direction::PositiveX, WallPart::Middle)]
        );
        assert!(sector_faces(&level, room, 0, 0).is_empty());

        // Floor, ceiling and one wall per side
        assert_eq!(build_room(&level, room).faces.len(), 6);
    }

    #[test]
    fn test_floor_step_faces_lower_neighbour() {
        let mut level = level();
        let mut room = Room::new("r", 4, 3, [0, 0, 0], 1024);
        room.sectors.get_mut(2, 1).unwrap().floor = SectorSurface::flat(256);
        let id = level.add_room(room);
        let room = level.room(id).unwrap();

        let raised = sector_faces(&level, room, 2, 1);
        let step = raised
            .iter()
            .find(|f| f.identifier == SectorFaceIdentifier::wall(Direction::NegativeX, WallPart::Qa))
            .unwrap();
        assert_eq!(step.vertical_extents(), vec![256, 256]);

        let low = sector_faces(&level, room, 1, 1);
        assert!(!low
            .iter()
            .any(|f| f.identifier == SectorFaceIdentifier::wall(Direction::PositiveX, WallPart::Qa)));
    }

    #[test]
    fn test_non_planar_floor_splits_in_two() {
        let mut level = level();
        let mut room = Room::new("r", 3, 3, [0, 0, 0], 2048);
        room.sectors.get_mut(1, 1).unwrap().floor.corners = [256, 0, 0, 0];
        let id = level.add_room(room);
        let faces = sector_faces(&level, level.room(id).unwrap(), 1, 1);
        let floors: Vec<_> = faces.iter().filter(|f| f.identifier.is_horizontal()).collect();
        assert_eq!(floors.len(), 3);
        assert!(floors.iter().all(|f| f.identifier != SectorFaceIdentifier::Floor || f.shape.is_triangle()));
        assert!(floors.iter().any(|f| f.identifier == SectorFaceIdentifier::FloorTriangle2));
    }

    #[test]
    fn test_diagonal_wall_keeps_open_triangle() {
        let mut level = level();
        let mut room = Room::new("r", 3, 3, [0, 0, 0], 1024);
        {
            let sector = room.sectors.get_mut(1, 1).unwrap();
            sector.kind = SectorKind::Wall;
            sector.floor.diagonal_split = DiagonalSplit::XnZp;
        }
        let id = level.add_room(room);
        let faces = sector_faces(&level, level.room(id).unwrap(), 1, 1);
        let identifiers = ids(&faces);

        assert!(identifiers.contains(&SectorFaceIdentifier::Floor));
        assert!(identifiers.contains(&SectorFaceIdentifier::DiagonalMiddle));
        assert!(!identifiers.contains(&SectorFaceIdentifier::FloorTriangle2));
        // The open triangle is opposite the named corner
        let floor = faces.iter().find(|f| f.identifier == SectorFaceIdentifier::Floor).unwrap();
        assert!(!floor.shape.vertices().contains(&[1024, 0, 2048]));
        assert!(floor.shape.vertices().contains(&[2048, 0, 1024]));
    }

    #[test]
    fn test_wall_portal_resolves_adjoining_sector() {
        let mut level = level();
        let west = level.add_room(Room::new("west", 4, 4, [0, 0, 0], 1024));
        let mut east_room = Room::new("east", 4, 4, [2, 0, 0], 1024);
        east_room.sectors.get_mut(1, 1).unwrap().floor = SectorSurface::flat(512);
        let east = level.add_room(east_room);
        level
            .connect_horizontally(west, east, Direction::PositiveX, SectorArea::new(3, 1, 3, 2))
            .unwrap();

        let east_room = level.room(east).unwrap();
        let faces = sector_faces(&level, east_room, 1, 1);
        assert!(faces
            .iter()
            .any(|f| f.identifier == SectorFaceIdentifier::wall(Direction::NegativeX, WallPart::Qa)));
        // Portal borders produce nothing
        assert!(sector_faces(&level, level.room(west).unwrap(), 3, 1).is_empty());
        assert!(sector_faces(&level, east_room, 0, 1).is_empty());
    }

    #[test]
    fn test_open_floor_portal_hides_floor() {
        let mut level = level();
        let below = level.add_room(Room::new("below", 3, 3, [0, 0, 0], 1024));
        let above = level.add_room(Room::new("above", 3, 3, [0, 1024, 0], 1024));
        level.connect_vertically(below, above, SectorArea::single(1, 1)).unwrap();
        let faces = sector_faces(&level, level.room(above).unwrap(), 1, 1);
        assert_eq!(ids(&faces), vec![SectorFaceIdentifier::Ceiling]);
    }

    #[test]
    fn test_untextured_faces_hidden_and_imported_geometry_kept() {
        let mut level = Level::new(LevelSettings::new(GameVersion::Tr4));
        let id = level.add_room(Room::new("r", 3, 3, [0, 0, 0], 1024));
        let triangle = ImportedTriangle {
            vertices: [Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 100.0)],
            texture: TextureArea::full_page(1),
        };
        level
            .add_object(
                id,
                Vec3::new(1024.0, 0.0, 1024.0),
                ObjectKind::ImportedGeometry(ImportedGeometryInstance {
                    name: "rock".into(),
                    triangles: vec![triangle],
                }),
            )
            .unwrap();

        let geometry = build_room(&level, level.room(id).unwrap());
        assert_eq!(geometry.faces.len(), 1);
        assert_eq!(
            geometry.faces[0].shape,
            FaceShape::Triangle([[1024, 0, 1024], [1124, 0, 1024], [1024, 0, 1124]])
        );
    }

    #[test]
    fn test_build_rooms_in_slot_order_and_cancellable() {
        let mut level = level();
        for i in 0..4 {
            level.add_room(Room::new(&format!("r{i}"), 3, 3, [i * 4, 0, 0], 1024));
        }
        level.rooms[1] = None;
        let token = CancellationToken::new();
        let rooms = build_rooms(&level, &token).unwrap();
        assert_eq!(rooms.iter().map(|r| r.0).collect::<Vec<_>>(), vec![RoomId(0), RoomId(2), RoomId(3)]);

        token.cancel();
        assert!(matches!(build_rooms(&level, &token), Err(CompileError::Cancelled)));
    }
}
