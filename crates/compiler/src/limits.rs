// Engine limits
// Per-version ceilings. Exceeding one only produces a warning; the level still compiles.

use crate::version::GameVersion;
use serde::{Deserialize, Serialize};

/// Catalog-provided overrides for the built-in limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOverrides {
    #[serde(default)]
    pub max_safe_item_count: Option<usize>,
    #[serde(default)]
    pub max_item_count: Option<usize>,
    #[serde(default)]
    pub max_box_count: Option<usize>,
    #[serde(default)]
    pub max_overlap_count: Option<usize>,
    #[serde(default)]
    pub max_texinfo_count: Option<usize>,
    #[serde(default)]
    pub max_room_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub version: GameVersion,
    pub max_safe_item_count: usize,
    pub max_item_count: usize,
    pub max_box_count: usize,
    pub max_overlap_count: usize,
    pub max_texinfo_count: usize,
    pub max_room_count: usize,
}

impl Limits {
    /// Built-in limits for a version
    pub fn defaults(version: GameVersion) -> Self {
        let (max_safe_item_count, max_item_count) = match version {
            GameVersion::Trng => (255, 1023),
            GameVersion::TombEngine => (1023, 32767),
            _ => (255, 255),
        };

        let max_texinfo_count = match version {
            GameVersion::Tr1 | GameVersion::Tr2 => 2048,
            GameVersion::Tr3 | GameVersion::Tr4 | GameVersion::Trng | GameVersion::Tr5 => 4000,
            GameVersion::TombEngine => 32767,
        };

        let (max_box_count, max_overlap_count, max_room_count) = match version {
            GameVersion::TombEngine => (32767, 1 << 20, 32767),
            _ => (2040, 0x3FFF, 255),
        };

        Limits {
            version,
            max_safe_item_count,
            max_item_count,
            max_box_count,
            max_overlap_count,
            max_texinfo_count,
            max_room_count,
        }
    }

    /// Built-in limits with catalog overrides applied
    pub fn resolve(version: GameVersion, overrides: &LimitOverrides) -> Self {
        let base = Self::defaults(version);
        Limits {
            version,
            max_safe_item_count: overrides.max_safe_item_count.unwrap_or(base.max_safe_item_count),
            max_item_count: overrides.max_item_count.unwrap_or(base.max_item_count),
            max_box_count: overrides.max_box_count.unwrap_or(base.max_box_count),
            max_overlap_count: overrides.max_overlap_count.unwrap_or(base.max_overlap_count),
            max_texinfo_count: overrides.max_texinfo_count.unwrap_or(base.max_texinfo_count),
            max_room_count: overrides.max_room_count.unwrap_or(base.max_room_count),
        }
    }

    /// Warnings for the final moveable count; AI objects live in their own table
    pub fn item_count_warnings(&self, count: usize) -> Vec<String> {
        let mut warnings = Vec::new();

        if count > self.max_item_count {
            let mut message = format!(
                "Level has more than {} moveables. This will lead to crash",
                self.max_item_count
            );
            if self.version == GameVersion::Tr4 {
                message.push_str(", unless you're using TREP.");
            } else {
                message.push('.');
            }
            warnings.push(message);
        }

        if count > self.max_safe_item_count {
            warnings.push(format!(
                "Moveable count is beyond {}, which may lead to savegame handling issues.",
                self.max_safe_item_count
            ));
        }

        warnings
    }

    pub fn box_count_warnings(&self, boxes: usize, overlaps: usize) -> Vec<String> {
        let mut warnings = Vec::new();
        if boxes > self.max_box_count {
            warnings.push(format!(
                "Level has {} boxes; the limit is {}. Enemies may behave erratically.",
                boxes, self.max_box_count
            ));
        }
        if overlaps > self.max_overlap_count {
            warnings.push(format!(
                "Level has {} overlaps; the limit is {}. Enemies may behave erratically.",
                overlaps, self.max_overlap_count
            ));
        }
        warnings
    }

    pub fn texinfo_warning(&self, count: usize) -> Option<String> {
        (count > self.max_texinfo_count).then(|| {
            format!(
                "TexInfo number overflow, maximum is {}. Please reduce level complexity.",
                self.max_texinfo_count
            )
        })
    }

    pub fn room_count_warning(&self, count: usize) -> Option<String> {
        (count > self.max_room_count).then(|| {
            format!(
                "Level has {} rooms; {} supports at most {}.",
                count, self.version, self.max_room_count
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_limits_per_version() {
        let ng = Limits::defaults(GameVersion::Trng);
        assert_eq!((ng.max_safe_item_count, ng.max_item_count), (255, 1023));
        let ten = Limits::defaults(GameVersion::TombEngine);
        assert_eq!((ten.max_safe_item_count, ten.max_item_count), (1023, 32767));
        let tr2 = Limits::defaults(GameVersion::Tr2);
        assert_eq!((tr2.max_safe_item_count, tr2.max_item_count), (255, 255));
    }

    #[test]
    fn test_item_warnings_never_abort() {
        let tr4 = Limits::defaults(GameVersion::Tr4);
        assert!(tr4.item_count_warnings(255).is_empty());

        let warnings = tr4.item_count_warnings(256);
        assert_eq!(warnings.len(), 2);
        assert_eq!(
            warnings[0],
            "Level has more than 255 moveables. This will lead to crash, unless you're using TREP."
        );
        assert!(warnings[1].contains("savegame handling issues"));

        let ng = Limits::defaults(GameVersion::Trng);
        let warnings = ng.item_count_warnings(300);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Moveable count is beyond 255"));
    }

    #[test]
    fn test_overrides() {
        let overrides = LimitOverrides {
            max_item_count: Some(10),
            ..Default::default()
        };
        let limits = Limits::resolve(GameVersion::Tr1, &overrides);
        assert_eq!(limits.max_item_count, 10);
        assert_eq!(limits.max_safe_item_count, 255);
        assert!(limits.texinfo_warning(2049).is_some());
        assert!(limits.texinfo_warning(2048).is_none());
        assert_eq!(limits.box_count_warnings(2041, 10).len(), 1);
    }
}
