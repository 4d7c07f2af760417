//! Resolved conversion settings and the config files that feed them.
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `/etc/fitcsv.conf`
//! 3. `$HOME/.fitcsvrc` (or the file named by `--config`)
//! 4. the command line
//!
//! A config file holds one option per line, `name [value]`, with an optional
//! leading `--`. Blank lines and lines starting with `#` are ignored.

use std::path::{Path, PathBuf};

pub const SYSTEM_CONFIG: &str = "/etc/fitcsv.conf";
pub const USER_CONFIG: &str = ".fitcsvrc";
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// One output column, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Time,
    HeartRate,
    Cadence,
    Speed,
    Distance,
    Temperature,
    Altitude,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Time,
        Column::HeartRate,
        Column::Cadence,
        Column::Speed,
        Column::Distance,
        Column::Temperature,
        Column::Altitude,
    ];

    /// Option name used on the command line and in config files.
    pub fn option_name(self) -> &'static str {
        match self {
            Column::Time => "time",
            Column::HeartRate => "heart-rate",
            Column::Cadence => "cadence",
            Column::Speed => "speed",
            Column::Distance => "distance",
            Column::Temperature => "temperature",
            Column::Altitude => "altitude",
        }
    }

    /// Header cell text.
    pub fn title(self) -> &'static str {
        match self {
            Column::Time => "Time",
            Column::HeartRate => "Heart-Rate",
            Column::Cadence => "Cadence",
            Column::Speed => "Speed",
            Column::Distance => "Distance",
            Column::Temperature => "Temperature",
            Column::Altitude => "Altitude",
        }
    }

    pub fn from_option_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.option_name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Fully resolved settings for one `convert` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    columns: [bool; 7],
    pub time_format: String,
    /// `None` writes to standard output.
    pub output: Option<PathBuf>,
    pub force: bool,
    pub fill_missing: bool,
    pub verbose: bool,
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            columns: [true; 7],
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            output: None,
            force: false,
            fill_missing: false,
            verbose: false,
            strict: false,
        }
    }
}

impl Settings {
    pub fn is_enabled(&self, column: Column) -> bool {
        self.columns[column.index()]
    }

    pub fn set_column(&mut self, column: Column, enabled: bool) {
        self.columns[column.index()] = enabled;
    }

    /// Enabled columns in emission order.
    pub fn columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    /// Apply every value `overlay` sets, leaving the rest alone.
    pub fn apply(&mut self, overlay: &Overlay) {
        for column in Column::ALL {
            if let Some(enabled) = overlay.columns[column.index()] {
                self.set_column(column, enabled);
            }
        }
        if let Some(fmt) = &overlay.time_format {
            self.time_format = fmt.clone();
        }
        if let Some(path) = &overlay.output {
            self.output = Some(path.clone());
        }
        if let Some(force) = overlay.force {
            self.force = force;
        }
        if let Some(fill) = overlay.fill_missing {
            self.fill_missing = fill;
        }
        if let Some(verbose) = overlay.verbose {
            self.verbose = verbose;
        }
        if let Some(strict) = overlay.strict {
            self.strict = strict;
        }
    }
}

/// A partial set of settings from one layer. `None` means "not mentioned".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub columns: [Option<bool>; 7],
    pub time_format: Option<String>,
    pub output: Option<PathBuf>,
    pub force: Option<bool>,
    pub fill_missing: Option<bool>,
    pub verbose: Option<bool>,
    pub strict: Option<bool>,
}

impl Overlay {
    pub fn set_column(&mut self, column: Column, enabled: bool) {
        self.columns[column.index()] = Some(enabled);
    }

    /// Apply one `name [value]` option. Returns `false` for an unrecognised
    /// name or a missing required value.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> bool {
        if let Some(column) = Column::from_option_name(name) {
            self.set_column(column, true);
            return true;
        }
        if let Some(column) = name.strip_prefix("no-").and_then(Column::from_option_name) {
            self.set_column(column, false);
            return true;
        }

        match (name, value) {
            ("time-format", Some(v)) => self.time_format = Some(v.to_string()),
            ("output", Some(v)) => self.output = Some(PathBuf::from(v)),
            ("force", _) => self.force = Some(true),
            ("no-force", _) => self.force = Some(false),
            ("fill-missing", _) => self.fill_missing = Some(true),
            ("no-fill-missing", _) => self.fill_missing = Some(false),
            ("verbose", _) => self.verbose = Some(true),
            ("strict", _) => self.strict = Some(true),
            _ => return false,
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Config files
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse config file text into an overlay. `origin` names the file in
/// warnings about lines that are not understood.
pub fn parse_config(text: &str, origin: &str) -> Overlay {
    let mut overlay = Overlay::default();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, value) = match line.split_once(char::is_whitespace) {
            Some((name, value)) => (name, Some(value.trim())),
            None => (line, None),
        };
        let name = name.strip_prefix("--").unwrap_or(name);
        let value = value.filter(|v| !v.is_empty());

        if !overlay.set_option(name, value) {
            log::warn!("{origin}:{}: ignoring unknown option '{line}'", lineno + 1);
        }
    }

    overlay
}

/// Read and parse one config file. A missing file is not an error.
pub fn load_config_file(path: &Path) -> Result<Option<Overlay>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            log::debug!("loaded config {}", path.display());
            Ok(Some(parse_config(&text, &path.display().to_string())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Which config files to consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// System file, then the user's file in `$HOME`.
    Standard,
    /// System file, then this file instead of the user's.
    Explicit(PathBuf),
    /// No files at all.
    Disabled,
}

impl ConfigSource {
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            ConfigSource::Standard => {
                let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
                if let Some(home) = std::env::var_os("HOME") {
                    paths.push(PathBuf::from(home).join(USER_CONFIG));
                }
                paths
            }
            ConfigSource::Explicit(path) => vec![PathBuf::from(SYSTEM_CONFIG), path.clone()],
            ConfigSource::Disabled => Vec::new(),
        }
    }
}

/// Defaults, then each config file in order, then `cli`.
pub fn resolve(source: &ConfigSource, cli: &Overlay) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    for path in source.paths() {
        if let Some(overlay) = load_config_file(&path)? {
            settings.apply(&overlay);
        }
    }
    settings.apply(cli);

    Ok(settings)
}
