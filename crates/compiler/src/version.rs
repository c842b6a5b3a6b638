// Target game versions
// Every output format variant the compiler can produce

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target engine of a compiled level. Ordering follows engine lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameVersion {
    #[serde(rename = "TR1")]
    Tr1,
    #[serde(rename = "TR2")]
    Tr2,
    #[serde(rename = "TR3")]
    Tr3,
    #[serde(rename = "TR4")]
    Tr4,
    #[serde(rename = "TRNG")]
    Trng,
    #[serde(rename = "TR5")]
    Tr5,
    #[serde(rename = "TombEngine", alias = "TEN")]
    TombEngine,
}

impl GameVersion {
    pub const ALL: [GameVersion; 7] = [
        GameVersion::Tr1,
        GameVersion::Tr2,
        GameVersion::Tr3,
        GameVersion::Tr4,
        GameVersion::Trng,
        GameVersion::Tr5,
        GameVersion::TombEngine,
    ];

    /// Engines from TR4 on: OCB, AI objects, flyby cameras
    pub fn is_new_tr(self) -> bool {
        self > GameVersion::Tr3
    }

    /// The engine whose data definitions this version inherits (TRNG is TR4 with patches)
    pub fn native(self) -> GameVersion {
        match self {
            GameVersion::Trng => GameVersion::Tr4,
            other => other,
        }
    }

    /// First four bytes of a level file
    pub fn magic(self) -> [u8; 4] {
        match self {
            GameVersion::Tr1 => 0x0000_0020u32.to_le_bytes(),
            GameVersion::Tr2 => 0x0000_002Du32.to_le_bytes(),
            GameVersion::Tr3 => 0xFF18_0038u32.to_le_bytes(),
            GameVersion::Tr4 | GameVersion::Trng | GameVersion::Tr5 => *b"TR4\0",
            GameVersion::TombEngine => *b"TEN\0",
        }
    }

    /// Conventional file extension of the compiled level
    pub fn file_extension(self) -> &'static str {
        match self {
            GameVersion::Tr1 => "phd",
            GameVersion::Tr2 | GameVersion::Tr3 => "tr2",
            GameVersion::Tr4 | GameVersion::Trng => "tr4",
            GameVersion::Tr5 => "trc",
            GameVersion::TombEngine => "ten",
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameVersion::Tr1 => "TR1",
            GameVersion::Tr2 => "TR2",
            GameVersion::Tr3 => "TR3",
            GameVersion::Tr4 => "TR4",
            GameVersion::Trng => "TRNG",
            GameVersion::Tr5 => "TR5",
            GameVersion::TombEngine => "TombEngine",
        };
        f.write_str(name)
    }
}

impl FromStr for GameVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tr1" => Ok(GameVersion::Tr1),
            "tr2" => Ok(GameVersion::Tr2),
            "tr3" => Ok(GameVersion::Tr3),
            "tr4" => Ok(GameVersion::Tr4),
            "trng" => Ok(GameVersion::Trng),
            "tr5" => Ok(GameVersion::Tr5),
            "ten" | "tombengine" => Ok(GameVersion::TombEngine),
            other => Err(format!("unknown game version '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tr_boundary() {
        assert!(!GameVersion::Tr3.is_new_tr());
        assert!(GameVersion::Tr4.is_new_tr());
        assert!(GameVersion::Trng.is_new_tr());
        assert!(GameVersion::TombEngine.is_new_tr());
    }

    #[test]
    fn test_parse_and_display() {
        for version in GameVersion::ALL {
            assert_eq!(version.to_string().parse::<GameVersion>().unwrap(), version);
        }
        assert_eq!("TEN".parse::<GameVersion>().unwrap(), GameVersion::TombEngine);
        assert!("tr6".parse::<GameVersion>().is_err());
    }

    #[test]
    fn test_magic() {
        assert_eq!(GameVersion::Tr1.magic(), [0x20, 0, 0, 0]);
        assert_eq!(GameVersion::Tr3.magic(), [0x38, 0x00, 0x18, 0xFF]);
        assert_eq!(&GameVersion::Tr5.magic(), b"TR4\0");
        assert_eq!(&GameVersion::TombEngine.magic(), b"TEN\0");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&GameVersion::Trng).unwrap();
        assert_eq!(json, "\"TRNG\"");
        let parsed: GameVersion = serde_json::from_str("\"TEN\"").unwrap();
        assert_eq!(parsed, GameVersion::TombEngine);
    }
}
