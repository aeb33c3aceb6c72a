//! Main application entry point (native).
//!
//! Replays a scripted session against the chart's saved drawings and
//! writes the result back.

#[cfg(feature = "native")]
mod native {
    use chartmark_app::{describe, AppConfig, AppError, Session, ShortcutRegistry};
    use chartmark_core::storage::{create_default_storage, AutoSaveManager, FileStorage};
    use clap::Parser;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Replay pointer and keyboard sessions against saved chart drawings.
    #[derive(Debug, Parser)]
    #[command(name = "chartmark", version, about)]
    pub struct Cli {
        /// Session JSON (symbol, timeframe, bars, events).
        pub session: PathBuf,

        /// Shell config JSON (engine tunables, storage dir).
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Directory for saved drawings.
        #[arg(long)]
        pub storage_dir: Option<PathBuf>,

        /// Start from an empty chart instead of the saved drawings.
        #[arg(long)]
        pub fresh: bool,

        /// Do not write the result back.
        #[arg(long)]
        pub dry_run: bool,

        /// Print shapes as JSON.
        #[arg(long)]
        pub json: bool,

        /// List keyboard shortcuts and exit.
        #[arg(long)]
        pub shortcuts: bool,
    }

    pub fn run(cli: Cli) -> Result<(), AppError> {
        if cli.shortcuts {
            ShortcutRegistry::print_all();
            return Ok(());
        }

        let app_config = match &cli.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        let session = Session::from_file(&cli.session)?;

        let storage = match cli.storage_dir.or(app_config.storage_dir.clone()) {
            Some(dir) => Arc::new(FileStorage::new(dir)?),
            None => create_default_storage()?,
        };
        log::info!("Drawings stored in {}", storage.base_path().display());
        let mut autosave = AutoSaveManager::new(storage);

        let key = session.key();
        let stored = if cli.fresh {
            autosave.set_chart(Some(key.clone()));
            Vec::new()
        } else {
            pollster::block_on(autosave.load(&key))?
        };

        let replay = session.replay(app_config.engine.clone(), stored)?;
        let shapes = replay.engine.snapshot();

        if replay.changed || cli.fresh {
            autosave.mark_dirty();
        }
        if cli.dry_run {
            log::info!("Dry run; {} left unsaved", key);
        } else if autosave.is_dirty() {
            pollster::block_on(autosave.save(&shapes))?;
        }

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&shapes)?);
        } else {
            println!("{}: {} shape(s)", key, shapes.len());
            for shape in replay.engine.shapes() {
                println!("  {}", describe(shape));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "native")]
fn main() -> std::process::ExitCode {
    use clap::Parser;

    env_logger::init();
    log::info!("Starting ChartMark");

    match native::run(native::Cli::parse()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    eprintln!("Native feature not enabled. Use `cargo run --features native`");
}
