// Level compiler - Core Library
// Compiles an editable room/sector level into a versioned Tomb Raider level file

pub mod catalog;
pub mod compiled;
pub mod compiler;
pub mod error;
pub mod floordata;
pub mod geometry;
pub mod level;
pub mod limits;
pub mod numeric;
pub mod pathfinding;
pub mod progress;
pub mod remap;
pub mod textures;
pub mod version;
pub mod wad;
pub mod wad_convert;
pub mod writer;

pub use catalog::{Catalog, CatalogError};
pub use compiler::{CompilerStatistics, LevelCompiler};
pub use error::{CompileError, Result};
pub use level::{Level, LevelSettings};
pub use progress::{CancellationToken, CollectingReporter, ProgressReporter, TracingReporter};
pub use version::GameVersion;
