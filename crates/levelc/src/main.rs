// levelc - Tomb Raider level compiler
// Command line front end:
// - compile: level document (+ referenced WADs) to a game level file
// - catalog: list the catalog entries known for a game version

mod loader;
mod output;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use level_compiler::{CancellationToken, Catalog, GameVersion, LevelCompiler, TracingReporter};
use levelc_shared::config::Config;
use levelc_shared::log::{initialize_logging, map_log_level};
use levelc_shared::{APP_NAME, CONFIG_ENV_PREFIX, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "levelc")]
#[command(about = "Tomb Raider level compiler")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Console log level override (0=Error, 1=Warn, 2=Info, 3=Debug, 4=Trace)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a level document into a game level file
    Compile(CompileArgs),
    /// List catalog entries for a game version
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Level document (JSON)
    level: PathBuf,

    /// Output file; defaults to the level path with the version's extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Catalog document; overrides Compiler.Catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Target version; overrides the level setting and Compiler.GameVersion
    #[arg(short = 'g', long = "game-version")]
    game_version: Option<GameVersion>,

    /// Print the compile statistics as JSON on stdout
    #[arg(long, default_value_t = false)]
    stats_json: bool,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Game version to list
    #[arg(short = 'g', long = "game-version", default_value = "TR4")]
    game_version: GameVersion,

    /// Catalog document; overrides Compiler.Catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Show the named animations and states of one moveable instead of the full list
    #[arg(long, value_name = "ID")]
    object: Option<u32>,

    /// Look up a moveable or static by name
    #[arg(long, value_name = "NAME")]
    find: Option<String>,
}

fn load_catalog(config: &Config, path: Option<&Path>) -> anyhow::Result<Catalog> {
    let configured = config.get_string_default("Compiler.Catalog", "");
    let path = match path {
        Some(path) => path.to_path_buf(),
        None if !configured.is_empty() => PathBuf::from(configured),
        None => {
            tracing::warn!("No catalog configured; object names and AI flags use defaults");
            return Ok(Catalog::empty());
        }
    };
    Ok(Catalog::load(&path)?)
}

fn compile(config: &Config, args: CompileArgs) -> anyhow::Result<()> {
    let mut level = loader::load_level(&args.level)?;

    let configured = config.get_string_default("Compiler.GameVersion", "");
    if let Some(version) = args.game_version {
        level.settings.game_version = version;
    } else if !configured.is_empty() {
        level.settings.game_version = configured
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Compiler.GameVersion")?;
    }
    let version = level.settings.game_version;

    let catalog = load_catalog(config, args.catalog.as_deref())?;
    let output = args
        .output
        .unwrap_or_else(|| args.level.with_extension(version.file_extension()));

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Received interrupt, cancelling compile");
        handler_token.cancel();
    })?;

    tracing::info!("Compiling {} for {} into {}", args.level.display(), version, output.display());
    let reporter = TracingReporter;
    let compiler = LevelCompiler::new(&level, &catalog, &reporter, cancel);
    let statistics = output::write_with_backup(&output, || Ok(compiler.compile()?))
        .with_context(|| format!("compiling {}", args.level.display()))?;

    tracing::info!(
        "Wrote {}: {} boxes, {} overlaps, {} texture infos, {} warnings",
        output.display(),
        statistics.box_count,
        statistics.overlap_count,
        statistics.object_texture_count,
        statistics.warning_count
    );
    if args.stats_json {
        println!("{}", serde_json::to_string_pretty(&statistics)?);
    }
    Ok(())
}

fn list_catalog(config: &Config, args: CatalogArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(config, args.catalog.as_deref())?;
    let version = args.game_version;
    if !catalog.has_game(version) {
        anyhow::bail!("catalog has no entries for {}", version);
    }

    if let Some(name) = &args.find {
        match catalog.item_index(version, name) {
            Some((id, true)) => println!("{name}: moveable {id}"),
            Some((id, false)) => println!("{name}: static {id}"),
            None => anyhow::bail!("no moveable or static named '{}' in {}", name, version),
        }
        return Ok(());
    }

    if let Some(object) = args.object {
        println!("{} ({})", catalog.moveable_name(version, object), object);
        println!("Animations:");
        for (index, name) in catalog.animations(version, object) {
            println!("  {index:4}  {name}");
        }
        println!("States:");
        for (id, name) in catalog.states(version, object) {
            println!("  {id:4}  {name}");
        }
        return Ok(());
    }

    println!("{}", Catalog::version_string(version));
    println!("Moveables:");
    for item in catalog.moveables(version) {
        let ai = if item.ai { " [AI]" } else { "" };
        println!("  {:4}  {}{}", item.id, item.name, ai);
    }
    println!("Statics:");
    for item in catalog.statics(version) {
        println!("  {:4}  {}", item.id, item.name);
    }
    println!("Sprite sequences:");
    for item in catalog.sprite_sequences(version) {
        println!("  {:4}  {}", item.id, item.name);
    }
    println!("Sounds:");
    for sound in catalog.sounds(version) {
        println!("  {:4}  {}", sound.id, sound.name);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::new();
    let loaded = config
        .set_source(&cli.config, CONFIG_ENV_PREFIX)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("reading configuration {}", cli.config))?;

    let level = cli
        .log_level
        .unwrap_or_else(|| config.get_int_default("Log.Level", 2));
    let log_dir = config.get_string_default("Log.Dir", "");
    let _guard = initialize_logging(
        (!log_dir.is_empty()).then_some(log_dir.as_str()),
        map_log_level(level),
        &format!("{APP_NAME}.log"),
    );

    tracing::info!("levelc v{}", env!("CARGO_PKG_VERSION"));
    if loaded {
        tracing::info!("Using configuration file: {}", cli.config);
    } else {
        tracing::debug!("Configuration file {} not found, using defaults", cli.config);
    }

    match cli.command {
        Command::Compile(args) => compile(&config, args),
        Command::Catalog(args) => list_catalog(&config, args),
    }
}
