// Room portals

use crate::level::grid::Direction;
use crate::level::RoomId;
use serde::{Deserialize, Serialize};

/// Inclusive rectangle of sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorArea {
    pub x0: i32,
    pub z0: i32,
    pub x1: i32,
    pub z1: i32,
}

impl SectorArea {
    pub fn new(x0: i32, z0: i32, x1: i32, z1: i32) -> Self {
        SectorArea {
            x0: x0.min(x1),
            z0: z0.min(z1),
            x1: x0.max(x1),
            z1: z0.max(z1),
        }
    }

    pub fn single(x: i32, z: i32) -> Self {
        SectorArea { x0: x, z0: z, x1: x, z1: z }
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.x0 && x <= self.x1 && z >= self.z0 && z <= self.z1
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> {
        let (z0, z1) = (self.z0, self.z1);
        (self.x0..=self.x1).flat_map(move |x| (z0..=z1).map(move |z| (x, z)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortalDirection {
    Wall(Direction),
    Floor,
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PortalOpacity {
    #[default]
    None,
    TraversableFaces,
    SolidFaces,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub adjoining_room: RoomId,
    pub direction: PortalDirection,
    pub area: SectorArea,
    #[serde(default)]
    pub opacity: PortalOpacity,
}

impl Portal {
    /// Lara and AI can pass through; solid portals only connect visibility
    pub fn is_traversable(&self) -> bool {
        self.opacity != PortalOpacity::SolidFaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_normalizes_and_iterates() {
        let area = SectorArea::new(3, 2, 1, 2);
        assert_eq!((area.x0, area.x1), (1, 3));
        assert!(area.contains(2, 2));
        assert!(!area.contains(2, 3));
        assert_eq!(area.iter().collect::<Vec<_>>(), vec![(1, 2), (2, 2), (3, 2)]);
    }
}
