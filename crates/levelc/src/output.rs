// Output file handling
//
// An existing level file is moved aside before compiling. It is put back when the
// compile fails and removed once the new file has been written.

use anyhow::Context;
use std::path::{Path, PathBuf};

fn backup_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Run `produce` and write its bytes to `output`, keeping the previous file on failure
pub fn write_with_backup<T>(
    output: &Path,
    produce: impl FnOnce() -> anyhow::Result<(Vec<u8>, T)>,
) -> anyhow::Result<T> {
    let backup = backup_path(output);
    let has_backup = output.exists();
    if has_backup {
        std::fs::rename(output, &backup)
            .with_context(|| format!("backing up {} to {}", output.display(), backup.display()))?;
    }

    let result = produce().and_then(|(bytes, value)| {
        std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
        Ok(value)
    });

    match result {
        Ok(value) => {
            if has_backup {
                if let Err(e) = std::fs::remove_file(&backup) {
                    tracing::warn!("Could not remove backup {}: {}", backup.display(), e);
                }
            }
            Ok(value)
        }
        Err(e) => {
            if has_backup {
                let _ = std::fs::remove_file(output);
                std::fs::rename(&backup, output)
                    .with_context(|| format!("restoring {} after a failed compile", output.display()))?;
                tracing::info!("Restored previous {}", output.display());
            }
            Err(e)
        }
    }
}
