// Level loading
// Reads a level document and the WAD documents it references

use anyhow::Context;
use level_compiler::wad::Wad;
use level_compiler::Level;
use std::path::{Path, PathBuf};

/// WAD paths are relative to the level file unless absolute
fn wad_path(level_path: &Path, wad: &str) -> PathBuf {
    let path = Path::new(wad);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        level_path.parent().unwrap_or_else(|| Path::new(".")).join(path)
    }
}

pub fn load_wad(path: &Path) -> anyhow::Result<Wad> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading WAD {}", path.display()))?;
    let wad = serde_json::from_str(&json).with_context(|| format!("parsing WAD {}", path.display()))?;
    Ok(wad)
}

/// Load a level and every WAD it references. A WAD that fails to load is logged and
/// left empty; the compiler decides whether the remaining WADs are enough.
pub fn load_level(path: &Path) -> anyhow::Result<Level> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading level {}", path.display()))?;
    let mut level: Level =
        serde_json::from_str(&json).with_context(|| format!("parsing level {}", path.display()))?;

    for reference in &mut level.settings.wads {
        if reference.wad.is_some() {
            continue;
        }
        let resolved = wad_path(path, &reference.path);
        match load_wad(&resolved) {
            Ok(wad) => {
                tracing::info!(
                    "Loaded WAD {} ({} moveables, {} statics)",
                    resolved.display(),
                    wad.moveables.len(),
                    wad.statics.len()
                );
                reference.wad = Some(wad);
            }
            Err(e) => tracing::error!("{:#}", e),
        }
    }

    Ok(level)
}
