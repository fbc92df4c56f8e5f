//! Retroshelf launcher
//!
//! Headless front-end over the launcher core. It drives the same calls the
//! poster-grid UI makes: request covers, poll events, launch and wait.
//!
//! # Commands
//!
//! - `retroshelf list` - Print the game catalog
//! - `retroshelf covers` - Fetch (or reuse cached) covers for every game
//! - `retroshelf emulator <console>` - Show which emulator a console resolves to
//! - `retroshelf play <query>` - Launch a game and wait for the emulator to exit
//! - `retroshelf config` - Print the effective configuration

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retroshelf::GameLauncher;
use retroshelf_core::library::{load_catalog, resolve_game};
use retroshelf_core::{Config, CoverFetcher, EmulatorSource, LauncherEvent, channel, config};

/// Retro game launcher
#[derive(Parser, Debug)]
#[command(name = "retroshelf")]
#[command(about = "Retro game launcher")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the game catalog
    List,

    /// Fetch covers for every game in the catalog
    Covers {
        /// Give up waiting for outstanding downloads after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },

    /// Show which emulator a console resolves to
    Emulator {
        /// Console name (e.g. NES)
        console: String,
    },

    /// Launch a game and wait for it to exit
    Play {
        /// Game key, name or unique name prefix
        query: String,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::List => list(&config),
        Commands::Covers { timeout } => covers(&config, Duration::from_secs(timeout)),
        Commands::Emulator { console } => show_emulator(&config, &console),
        Commands::Play { query } => play(config, &query),
        Commands::Config => show_config(&config, cli.config.as_ref()),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(config::load()),
    }
}

fn list(config: &Config) -> Result<()> {
    let games = load_catalog(config);
    if games.is_empty() {
        eprintln!("No games found.");
        eprintln!(
            "Add entries to {} or ROMs under {}/<console>/",
            config.games_file.display(),
            config.roms_dir.display()
        );
        return Ok(());
    }
    for game in &games {
        println!("{} [{}] {}", game.key, game.console, game.rom_path.display());
    }
    Ok(())
}

fn covers(config: &Config, timeout: Duration) -> Result<()> {
    let games = load_catalog(config);
    let (tx, rx) = channel();
    let fetcher = CoverFetcher::new(config, tx).context("Failed to open cover cache")?;

    fetcher.request_all(&games);

    let deadline = Instant::now() + timeout;
    let mut remaining = games.len();
    let mut found = 0;
    while remaining > 0 {
        let left = deadline.saturating_duration_since(Instant::now());
        let Some(event) = rx.recv_timeout(left) else {
            eprintln!("Timed out with {} covers still downloading", remaining);
            break;
        };
        if let LauncherEvent::ImageReady(result) = event {
            remaining -= 1;
            match result.path() {
                Some(path) => {
                    found += 1;
                    println!("{} -> {}", result.key, path.display());
                }
                None => println!("{} -> (no cover)", result.key),
            }
        }
    }

    tracing::info!("{} of {} covers available", found, games.len());
    Ok(())
}

fn show_emulator(config: &Config, console: &str) -> Result<()> {
    let (tx, _rx) = channel();
    let launcher = GameLauncher::new(config.clone(), tx);
    match launcher.emulator_for(console) {
        Some(resolved) => {
            let source = match resolved.source {
                EmulatorSource::Configured => "configured",
                EmulatorSource::DirectoryMatch => "name match",
                EmulatorSource::SoleExecutable => "only executable, may be wrong console",
            };
            println!("{} ({})", resolved.path.display(), source);
        }
        None => println!("No emulator configured for {}", console),
    }
    Ok(())
}

fn play(config: Config, query: &str) -> Result<()> {
    let games = load_catalog(&config);
    if games.is_empty() {
        anyhow::bail!("No games found. Check games_file and roms_dir in the config.");
    }

    let game = match resolve_game(query, &games) {
        Ok(game) => game,
        Err(e) => {
            eprintln!("{}", e.message);
            if let Some(suggestions) = &e.suggestion {
                eprintln!("\nDid you mean:");
                for suggestion in suggestions {
                    eprintln!("  - {}", suggestion);
                }
            }
            std::process::exit(1);
        }
    };

    let (tx, rx) = channel();
    let launcher = GameLauncher::new(config, tx);
    let handle = launcher
        .play(game)
        .with_context(|| format!("Failed to launch '{}'", game.name))?;
    println!("Launched {} (pid {})", game.name, handle.pid());

    // The launcher holds a sender, so recv() only ends with our exit event
    while let Some(event) = rx.recv() {
        if let LauncherEvent::ProcessExited(exit) = event
            && exit.pid == handle.pid()
        {
            match exit.code() {
                Some(code) => println!("{} exited with code {}", game.name, code),
                None => println!("{} exited: {:?}", game.name, exit.outcome),
            }
            break;
        }
    }
    Ok(())
}

fn show_config(config: &Config, path: Option<&PathBuf>) -> Result<()> {
    let source = path.cloned().or_else(config::config_path);
    match source {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (defaults, no config directory)"),
    }
    print!("{}", config.to_toml().context("Failed to render config")?);
    Ok(())
}
