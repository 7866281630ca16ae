//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. the `--config` command-line flag
//! 2. `$MAIL2MATRIX_CONFIG` (environment variable)
//! 3. `~/.config/mail2matrix/config.toml` (Linux)
//!    `~/Library/Application Support/mail2matrix/config.toml` (macOS)
//!    `%APPDATA%\mail2matrix\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! An explicitly named file (1 or 2) must exist. Command-line flags are
//! applied on top through [`Overrides`]. `mail2matrix setup` writes the file
//! with [`save_config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Mail2MatrixError, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "MAIL2MATRIX_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Homeserver and room.
    pub matrix: MatrixConfig,
    /// Rendering and filtering of forwarded mail.
    pub message: MessageConfig,
    /// General behavior settings.
    pub general: GeneralConfig,
    /// File this configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Homeserver connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Homeserver base URL.
    pub server: String,
    /// Access token, as printed by `mail2matrix login`.
    pub token: String,
    /// Room ID to post into (e.g. `!abcdef:matrix.org`).
    pub room: String,
}

/// Message rendering and skip filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Custom template; the built-in one is used when absent or blank.
    pub template: Option<String>,
    /// Text available to the template as `Preface`.
    pub preface: String,
    /// Text available to the template as `Epilogue`.
    pub epilogue: String,
    /// Regular expressions; a rendered message matching any of them is not sent.
    pub skip: Vec<String>,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Directory for a log file; file logging is off when unset.
    pub log_dir: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            server: "https://matrix.org".to_string(),
            token: String::new(),
            room: String::new(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

// ── Command-line overrides ──────────────────────────────────────

/// Values given on the command line. `None` (or an empty `skip`) keeps the
/// value from the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub token: Option<String>,
    pub room: Option<String>,
    pub template: Option<String>,
    pub preface: Option<String>,
    pub epilogue: Option<String>,
    /// Replaces the configured skip patterns when non-empty.
    pub skip: Vec<String>,
}

impl Config {
    /// Apply command-line overrides on top of file values.
    pub fn apply(&mut self, overrides: Overrides) {
        let Overrides {
            server,
            token,
            room,
            template,
            preface,
            epilogue,
            skip,
        } = overrides;

        if let Some(server) = server {
            self.matrix.server = server;
        }
        if let Some(token) = token {
            self.matrix.token = token;
        }
        if let Some(room) = room {
            self.matrix.room = room;
        }
        if template.is_some() {
            self.message.template = template;
        }
        if let Some(preface) = preface {
            self.message.preface = preface;
        }
        if let Some(epilogue) = epilogue {
            self.message.epilogue = epilogue;
        }
        if !skip.is_empty() {
            self.message.skip = skip;
        }
    }

    /// Check that everything needed to post a message is set.
    ///
    /// All missing settings are reported in one error.
    pub fn validate_for_delivery(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("server", &self.matrix.server),
            ("token", &self.matrix.token),
            ("room", &self.matrix.room),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            return Ok(());
        }
        Err(Mail2MatrixError::Config {
            path: self
                .source
                .clone()
                .unwrap_or_else(|| PathBuf::from("<defaults>")),
            reason: format!("missing [matrix] settings: {}", missing.join(", ")),
        })
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// `explicit` (the `--config` flag) wins over `$MAIL2MATRIX_CONFIG`; either
/// must name an existing, valid file. Without both, the default location is
/// tried and a missing file there means built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = named_config_path(explicit) {
        return read_config(&path);
    }

    match default_config_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => {
            tracing::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Read and parse one config file.
pub fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| Mail2MatrixError::Config {
        path: path.to_path_buf(),
        reason: format!("cannot read file: {e}"),
    })?;

    let mut config: Config = toml::from_str(&contents).map_err(|e| Mail2MatrixError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    config.source = Some(path.to_path_buf());

    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load the file at `path` if it exists, or start from defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        read_config(path)
    } else {
        Ok(Config::default())
    }
}

/// Write configuration to `path`, creating parent directories.
///
/// The file holds the access token, so a newly created file is readable by
/// its owner only (on Unix).
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    use std::io::Write;

    let config_error = |reason: String| Mail2MatrixError::Config {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| config_error(format!("cannot create directory: {e}")))?;
    }

    let contents = toml::to_string_pretty(config).map_err(|e| config_error(e.to_string()))?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|e| config_error(format!("cannot write file: {e}")))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| config_error(format!("cannot write file: {e}")))?;

    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Where the config file lives: `--config`, then `$MAIL2MATRIX_CONFIG`,
/// then the platform default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    named_config_path(explicit)
        .or_else(default_config_path)
        .ok_or_else(|| Mail2MatrixError::Config {
            path: PathBuf::from("<none>"),
            reason: "cannot determine the platform config directory".to_string(),
        })
}

fn named_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

/// Standard config file location for this platform.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mail2matrix").join("config.toml"))
}

/// Return the log file path, if file logging is enabled.
pub fn log_file_path(config: &Config) -> Option<PathBuf> {
    config
        .general
        .log_dir
        .as_ref()
        .map(|dir| dir.join("mail2matrix.log"))
}
