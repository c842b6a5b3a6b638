// Object catalog
// Per-game names, skins, AI flags, sounds and limits for WAD object ids.
//
// The catalog is built once (usually from a JSON document) and never changes afterwards.
// It is passed to the compiler by reference, so two compiles may use different catalogs.

use crate::limits::LimitOverrides;
use crate::version::GameVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate {kind} id {id} for {version}")]
    Duplicate {
        kind: &'static str,
        version: GameVersion,
        id: u32,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Object whose meshes this object borrows; its id is what ends up in the level file
    #[serde(default)]
    pub skin: Option<u32>,
    #[serde(default)]
    pub ai: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSound {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fixed_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAnimation {
    pub item: u32,
    pub animation: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogState {
    pub item: u32,
    pub state: u32,
    pub name: String,
}

/// Catalog document for one game, as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameCatalog {
    #[serde(default)]
    pub moveables: Vec<CatalogItem>,
    #[serde(default)]
    pub statics: Vec<CatalogItem>,
    #[serde(default)]
    pub sprite_sequences: Vec<CatalogItem>,
    #[serde(default)]
    pub sounds: Vec<CatalogSound>,
    #[serde(default)]
    pub animations: Vec<CatalogAnimation>,
    #[serde(default)]
    pub states: Vec<CatalogState>,
    #[serde(default)]
    pub limits: LimitOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    games: BTreeMap<GameVersion, GameCatalog>,
}

#[derive(Debug, Default)]
struct Game {
    moveables: BTreeMap<u32, CatalogItem>,
    statics: BTreeMap<u32, CatalogItem>,
    sprite_sequences: BTreeMap<u32, CatalogItem>,
    sounds: BTreeMap<u32, CatalogSound>,
    animations: BTreeMap<(u32, u32), String>,
    states: BTreeMap<(u32, u32), String>,
    limits: LimitOverrides,
}

/// Immutable, explicitly passed object catalog
#[derive(Debug, Default)]
pub struct Catalog {
    games: BTreeMap<GameVersion, Game>,
}

fn index_items(
    kind: &'static str,
    version: GameVersion,
    items: Vec<CatalogItem>,
) -> Result<BTreeMap<u32, CatalogItem>, CatalogError> {
    let mut map = BTreeMap::new();
    for item in items {
        let id = item.id;
        if map.insert(id, item).is_some() {
            return Err(CatalogError::Duplicate { kind, version, id });
        }
    }
    Ok(map)
}

impl Catalog {
    /// Catalog with no entries; every lookup falls back to its default
    pub fn empty() -> Self {
        Catalog::default()
    }

    pub fn from_games(
        games: impl IntoIterator<Item = (GameVersion, GameCatalog)>,
    ) -> Result<Self, CatalogError> {
        let mut result = BTreeMap::new();
        for (version, doc) in games {
            let mut sounds = BTreeMap::new();
            for sound in doc.sounds {
                let id = sound.id;
                if sounds.insert(id, sound).is_some() {
                    return Err(CatalogError::Duplicate { kind: "sound", version, id });
                }
            }

            let game = Game {
                moveables: index_items("moveable", version, doc.moveables)?,
                statics: index_items("static", version, doc.statics)?,
                sprite_sequences: index_items("sprite sequence", version, doc.sprite_sequences)?,
                sounds,
                animations: doc
                    .animations
                    .into_iter()
                    .map(|a| ((a.item, a.animation), a.name))
                    .collect(),
                states: doc
                    .states
                    .into_iter()
                    .map(|s| ((s.item, s.state), s.name))
                    .collect(),
                limits: doc.limits,
            };
            result.insert(version.native(), game);
        }
        Ok(Catalog { games: result })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Self::from_games(doc.games)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(
            "Loaded catalog {} ({} games)",
            path.display(),
            catalog.games.len()
        );
        Ok(catalog)
    }

    fn game(&self, version: GameVersion) -> Option<&Game> {
        self.games.get(&version.native())
    }

    pub fn has_game(&self, version: GameVersion) -> bool {
        self.game(version).is_some()
    }

    pub fn moveable_name(&self, version: GameVersion, id: u32) -> String {
        self.game(version)
            .and_then(|g| g.moveables.get(&id))
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("Unknown #{id}"))
    }

    pub fn static_name(&self, version: GameVersion, id: u32) -> String {
        self.game(version)
            .and_then(|g| g.statics.get(&id))
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("Unknown #{id}"))
    }

    pub fn sound_name(&self, version: GameVersion, id: u32) -> String {
        self.game(version)
            .and_then(|g| g.sounds.get(&id))
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("Unknown sound #{id}"))
    }

    pub fn is_sound_fixed_by_default(&self, version: GameVersion, id: u32) -> bool {
        self.game(version)
            .and_then(|g| g.sounds.get(&id))
            .is_some_and(|s| s.fixed_by_default)
    }

    /// Id written to the level for a moveable: its skin when it has one, else itself
    pub fn moveable_skin(&self, version: GameVersion, id: u32) -> u32 {
        self.game(version)
            .and_then(|g| g.moveables.get(&id))
            .and_then(|m| m.skin)
            .unwrap_or(id)
    }

    pub fn is_moveable_ai(&self, version: GameVersion, id: u32) -> bool {
        self.game(version)
            .and_then(|g| g.moveables.get(&id))
            .is_some_and(|m| m.ai)
    }

    /// Named animations of an object, by animation index
    pub fn animations(&self, version: GameVersion, object: u32) -> impl Iterator<Item = (u32, &str)> {
        self.game(version)
            .into_iter()
            .flat_map(move |g| g.animations.range((object, 0)..=(object, u32::MAX)))
            .map(|(&(_, animation), name)| (animation, name.as_str()))
    }

    /// Named states of an object, by state id
    pub fn states(&self, version: GameVersion, object: u32) -> impl Iterator<Item = (u32, &str)> {
        self.game(version)
            .into_iter()
            .flat_map(move |g| g.states.range((object, 0)..=(object, u32::MAX)))
            .map(|(&(_, state), name)| (state, name.as_str()))
    }

    /// Find a moveable or static by name. Returns the id and whether it is a moveable.
    pub fn item_index(&self, version: GameVersion, name: &str) -> Option<(u32, bool)> {
        let game = self.game(version)?;
        let matches = |item: &CatalogItem| item.name.eq_ignore_ascii_case(name);
        if let Some(m) = game.moveables.values().find(|m| matches(m)) {
            return Some((m.id, true));
        }
        game.statics.values().find(|s| matches(s)).map(|s| (s.id, false))
    }

    pub fn moveables(&self, version: GameVersion) -> impl Iterator<Item = &CatalogItem> {
        self.game(version).into_iter().flat_map(|g| g.moveables.values())
    }

    pub fn statics(&self, version: GameVersion) -> impl Iterator<Item = &CatalogItem> {
        self.game(version).into_iter().flat_map(|g| g.statics.values())
    }

    pub fn sprite_sequences(&self, version: GameVersion) -> impl Iterator<Item = &CatalogItem> {
        self.game(version).into_iter().flat_map(|g| g.sprite_sequences.values())
    }

    pub fn sounds(&self, version: GameVersion) -> impl Iterator<Item = &CatalogSound> {
        self.game(version).into_iter().flat_map(|g| g.sounds.values())
    }

    pub fn limit_overrides(&self, version: GameVersion) -> LimitOverrides {
        self.game(version).map(|g| g.limits.clone()).unwrap_or_default()
    }

    /// Number of entries in the sound map. TRNG levels may carry an extended map whose
    /// size is stored in the demo data count.
    pub fn sound_map_size(version: GameVersion, ng_demo_data: u32) -> usize {
        match version {
            GameVersion::Tr1 => 256,
            GameVersion::Tr2 | GameVersion::Tr3 => 370,
            GameVersion::Tr4 => 370,
            GameVersion::Trng if ng_demo_data != 0 => ng_demo_data as usize,
            GameVersion::Trng => 370,
            GameVersion::Tr5 | GameVersion::TombEngine => 450,
        }
    }

    pub fn version_string(version: GameVersion) -> &'static str {
        match version {
            GameVersion::Tr1 => "Tomb Raider",
            GameVersion::Tr2 => "Tomb Raider II",
            GameVersion::Tr3 => "Tomb Raider III",
            GameVersion::Tr4 => "Tomb Raider: The Last Revelation",
            GameVersion::Trng => "TRNG",
            GameVersion::Tr5 => "Tomb Raider Chronicles",
            GameVersion::TombEngine => "TombEngine",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "games": {
            "TR4": {
                "moveables": [
                    { "id": 0, "name": "LARA" },
                    { "id": 5, "name": "AI_GUARD", "ai": true },
                    { "id": 12, "name": "YOUNG_LARA", "skin": 0 }
                ],
                "statics": [ { "id": 1, "name": "PLANT1" } ],
                "sounds": [ { "id": 3, "name": "LARA_FEET", "fixed_by_default": true } ],
                "states": [ { "item": 0, "state": 2, "name": "STOP" }, { "item": 2, "state": 0, "name": "IDLE" } ],
                "limits": { "max_item_count": 300 }
            }
        }
    }"#;

    #[test]
    fn test_lookups() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.moveable_name(GameVersion::Tr4, 0), "LARA");
        assert_eq!(catalog.moveable_name(GameVersion::Tr4, 99), "Unknown #99");
        // TRNG shares the TR4 definitions
        assert!(catalog.is_moveable_ai(GameVersion::Trng, 5));
        assert!(!catalog.is_moveable_ai(GameVersion::Tr4, 0));
        assert_eq!(catalog.moveable_skin(GameVersion::Tr4, 12), 0);
        assert_eq!(catalog.moveable_skin(GameVersion::Tr4, 5), 5);
        assert!(catalog.is_sound_fixed_by_default(GameVersion::Tr4, 3));
        assert_eq!(catalog.states(GameVersion::Tr4, 0).collect::<Vec<_>>(), vec![(2, "STOP")]);
        assert_eq!(catalog.states(GameVersion::Tr4, 1).count(), 0);
        assert_eq!(catalog.item_index(GameVersion::Tr4, "plant1"), Some((1, false)));
        assert_eq!(catalog.limit_overrides(GameVersion::Tr4).max_item_count, Some(300));
        assert!(!catalog.has_game(GameVersion::Tr1));
        assert_eq!(catalog.static_name(GameVersion::Tr1, 1), "Unknown #1");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{ "games": { "TR1": { "moveables": [
            { "id": 1, "name": "A" }, { "id": 1, "name": "B" } ] } } }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::Duplicate { id: 1, .. })
        ));
    }

    #[test]
    fn test_sound_map_size() {
        assert_eq!(Catalog::sound_map_size(GameVersion::Tr1, 0), 256);
        assert_eq!(Catalog::sound_map_size(GameVersion::Tr3, 0), 370);
        assert_eq!(Catalog::sound_map_size(GameVersion::Tr4, 1024), 370);
        assert_eq!(Catalog::sound_map_size(GameVersion::Trng, 1024), 1024);
        assert_eq!(Catalog::sound_map_size(GameVersion::Tr5, 0), 450);
    }
}
