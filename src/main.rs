// SPDX-License-Identifier: MIT
//
// chatline — a terminal chat front-end.
//
// This is the binary that wires the crates together:
//
//   cl-term  → raw mode, key decoding, the line editor and its reader thread
//   cl-style → pattern registry and the incremental styling engine
//   cl-anim  → loading dots, reverse streaming, pacing, the coordinator
//
// A turn flows through:
//
//   LineReader (own thread) → chat loop → producer stream
//     → Coordinator: DotLoader ∥ chunk queue → StyleEngine → Display
//
// Logging goes to a file, never to the terminal the chat is drawing on.

mod chat;
mod config;
mod producer;

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use cl_anim::{Coordinator, Display};
use cl_style::{PatternRegistry, StyleEngine, WrapWidth};
use cl_term::terminal;

use crate::chat::Chat;
use crate::config::{FileConfig, Overrides};

#[derive(Parser)]
#[command(name = "chatline", version, about = "Terminal chat front-end")]
struct Args {
    /// Skip the loading animation
    #[arg(long)]
    no_animation: bool,

    /// Release chunks at an adaptive pace instead of immediately
    #[arg(long)]
    adaptive: bool,

    /// Config file (default: <config dir>/chatline/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Where to write the log
    #[arg(long, value_name = "PATH", default_value = "chatline.log")]
    log_file: PathBuf,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

fn init_logging(args: &Args) {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    match File::create(&args.log_file) {
        Ok(file) => {
            let _ = WriteLogger::init(args.log_level, log_config, file);
        }
        Err(e) => eprintln!(
            "chatline: cannot open log file {}: {e}",
            args.log_file.display()
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args);
    log::info!("chatline {} starting", env!("CARGO_PKG_VERSION"));

    let file = match args.config.clone().or_else(config::default_path) {
        Some(path) => config::load(&path)?,
        None => {
            log::warn!("no config directory on this platform, using defaults");
            FileConfig::default()
        }
    };
    let settings = config::resolve(
        &file,
        Overrides {
            no_animation: args.no_animation,
            adaptive: args.adaptive,
        },
    )?;
    log::debug!("settings: {settings:?}");

    // Rebuilt through the checked constructor so a bad table stops startup.
    let registry = PatternRegistry::new(PatternRegistry::default_table().iter().cloned().collect())?;
    let mut engine = StyleEngine::new(registry, WrapWidth::Terminal);
    engine.set_base_color(settings.base_color);

    terminal::install_panic_hook();

    let coordinator = Coordinator::new(Display::stdout(), engine, settings.animation);
    let mut chat = Chat::new(coordinator, &settings);
    chat.run().await?;
    Ok(())
}
