// SPDX-License-Identifier: MIT
//
// Configuration.
//
// Layering: built-in defaults, then the TOML file, then CLI flags. The file
// is parsed into sparse structs where every field is optional, so a config
// only needs the keys it changes; `resolve` collapses the layers into
// concrete values. A missing file is not an error.
//
// Default location: `<config dir>/chatline/config.toml`
// (`~/.config/chatline/config.toml` on Linux).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cl_anim::reverse::ReverseStreamer;
use cl_anim::{AnimationConfig, PacingMode, Scroller};
use cl_style::palette;
use cl_style::panel::{Panel, Preface, PrefaceItem};
use cl_term::color::{Color, ParseColorError};
use cl_term::line::EditorConfig;
use serde::Deserialize;
use thiserror::Error;

// ─── File format ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub animation: AnimationSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub editor: EditorSection,
    #[serde(default)]
    pub style: StyleSection,
    #[serde(default)]
    pub session: SessionSection,
    /// `None` shows the built-in welcome panel; an empty list shows nothing.
    #[serde(default)]
    pub preface: Option<Vec<PrefaceEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationSection {
    pub enabled: Option<bool>,
    pub dot_interval_ms: Option<u64>,
    pub reverse_delay_ms: Option<u64>,
    pub scroll_delay_ms: Option<u64>,
    pub acceleration: Option<f64>,
    pub accelerate_after_words: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingSetting {
    Immediate,
    Adaptive,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingSection {
    pub mode: Option<PacingSetting>,
    pub window: Option<usize>,
    pub default_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditorSection {
    pub prompt: Option<String>,
    pub selection_start: Option<String>,
    pub selection_end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleSection {
    pub base_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    /// Sent unseen when the session opens. Empty disables it.
    pub intro: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefaceDisplay {
    #[default]
    Panel,
    Text,
}

/// One `[[preface]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefaceEntry {
    pub text: String,
    pub title: Option<String>,
    pub border_color: Option<String>,
    #[serde(default)]
    pub display: PrefaceDisplay,
}

// ─── Defaults ───────────────────────────────────────────────────────────────

pub const DEFAULT_PROMPT: &str = "> ";
const DEFAULT_REVERSE_DELAY_MS: u64 = 80;
const DEFAULT_INTRO: &str = "Introduce yourself.";
const WELCOME_TITLE: &str = "chatline";
const WELCOME_TEXT: &str = "Type a message and press Enter.\n\n\
    Ctrl-R retries the last reply, Ctrl-E edits your last message, \
    Ctrl-P asks for more, Ctrl-D leaves.";
const DEFAULT_ACCELERATION: f64 = 1.0;
const DEFAULT_ACCELERATE_AFTER: usize = 40;

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid color: {0}")]
    Color(#[from] ParseColorError),
}

// ─── Loading ────────────────────────────────────────────────────────────────

/// `<config dir>/chatline/config.toml`, if the platform has a config dir.
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatline").join("config.toml"))
}

/// Parse a config file. A missing file yields the defaults.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file exists but cannot be read,
/// [`ConfigError::Parse`] if it is not valid config TOML.
pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let config = parse(&text)?;
            log::info!("loaded config from {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("no config at {}, using defaults", path.display());
            Ok(FileConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Parse config TOML.
///
/// # Errors
///
/// [`ConfigError::Parse`] on malformed TOML or unknown keys.
pub fn parse(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

// ─── Resolution ─────────────────────────────────────────────────────────────

/// Flags that override the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub no_animation: bool,
    pub adaptive: bool,
}

/// Concrete settings for a session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub animation: AnimationConfig,
    pub reverse: ReverseStreamer,
    pub editor: EditorConfig,
    pub prompt: String,
    pub base_color: Color,
    pub scroller: Scroller,
    pub preface: Preface,
    pub intro: Option<String>,
}

/// Collapse defaults, `file` and `overrides` into [`Settings`].
///
/// # Errors
///
/// [`ConfigError::Color`] if `style.base_color` or a preface border color
/// is not a color.
pub fn resolve(file: &FileConfig, overrides: Overrides) -> Result<Settings, ConfigError> {
    let defaults = AnimationConfig::default();
    let a = &file.animation;
    let p = &file.pacing;

    let pacing = if overrides.adaptive {
        PacingMode::Adaptive
    } else {
        match p.mode {
            Some(PacingSetting::Adaptive) => PacingMode::Adaptive,
            Some(PacingSetting::Immediate) | None => PacingMode::Immediate,
        }
    };

    let animation = AnimationConfig {
        enabled: !overrides.no_animation && a.enabled.unwrap_or(defaults.enabled),
        dot_interval: a
            .dot_interval_ms
            .map_or(defaults.dot_interval, Duration::from_millis),
        pacing,
        window: p.window.unwrap_or(defaults.window),
        default_interval: p
            .default_interval_ms
            .map_or(defaults.default_interval, Duration::from_millis),
    };

    let reverse = ReverseStreamer::new(Duration::from_millis(
        a.reverse_delay_ms.unwrap_or(DEFAULT_REVERSE_DELAY_MS),
    ))
    .with_acceleration(
        a.acceleration.unwrap_or(DEFAULT_ACCELERATION),
        a.accelerate_after_words.unwrap_or(DEFAULT_ACCELERATE_AFTER),
    );

    let editor_defaults = EditorConfig::default();
    let e = &file.editor;
    let editor = EditorConfig {
        selection_start: e
            .selection_start
            .clone()
            .unwrap_or(editor_defaults.selection_start),
        selection_end: e
            .selection_end
            .clone()
            .unwrap_or(editor_defaults.selection_end),
    };

    let base_color = match &file.style.base_color {
        Some(name) => palette::parse(name)?,
        None => Color::Default,
    };

    let scroller = a
        .scroll_delay_ms
        .map_or_else(Scroller::default, |ms| Scroller::new(Duration::from_millis(ms)));

    let intro = match &file.session.intro {
        Some(text) if text.trim().is_empty() => None,
        Some(text) => Some(text.clone()),
        None => Some(DEFAULT_INTRO.to_owned()),
    };

    Ok(Settings {
        animation,
        reverse,
        editor,
        prompt: e.prompt.clone().unwrap_or_else(|| DEFAULT_PROMPT.to_owned()),
        base_color,
        scroller,
        preface: preface(file.preface.as_deref())?,
        intro,
    })
}

fn preface(entries: Option<&[PrefaceEntry]>) -> Result<Preface, ConfigError> {
    let mut preface = Preface::new();
    let Some(entries) = entries else {
        preface.push(PrefaceItem::Panel(Panel::new(WELCOME_TEXT).title(WELCOME_TITLE)));
        return Ok(preface);
    };
    for entry in entries {
        let item = match entry.display {
            PrefaceDisplay::Text => PrefaceItem::Text(entry.text.clone()),
            PrefaceDisplay::Panel => {
                let mut panel = Panel::new(entry.text.clone());
                if let Some(title) = &entry.title {
                    panel = panel.title(title.clone());
                }
                if let Some(color) = &entry.border_color {
                    panel = panel.border(palette::parse(color)?);
                }
                PrefaceItem::Panel(panel)
            }
        };
        preface.push(item);
    }
    Ok(preface)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
