//! Preference types and persistence for squish.
//!
//! Two settings live here: the Closure Compiler optimization level and the
//! minify-on-save toggle. Preferences are stored as JSON under
//! `<root>/.config/squish.json`; every write persists immediately and every
//! read goes back through the backing store, so a toggle from another
//! process is picked up by a long-running watch loop.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Errors from loading or saving preferences.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("failed to read preferences: {0}")]
    Io(#[from] std::io::Error),
    #[error("preference file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown preference key: {0}")]
    UnknownKey(String),
}

/// How aggressively the Closure Compiler rewrites code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    Whitespace,
    #[default]
    Simple,
    Advanced,
}

impl OptimizationLevel {
    /// Lenient, total parse: the dispatch vocabulary (`adv`, `white`) and
    /// the preference vocabulary (`advanced`, `white`) are both accepted;
    /// anything unrecognized collapses to `Simple`.
    pub fn parse(value: &str) -> Self {
        match value {
            "adv" | "advanced" => Self::Advanced,
            "white" | "whitespace" => Self::Whitespace,
            _ => Self::Simple,
        }
    }

    /// The canonical name stored in the preference file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whitespace => "white",
            Self::Simple => "simple",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted preference set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Preferences {
    pub optimization_level: OptimizationLevel,
    pub minify_on_save: bool,
}

/// String keys for the CLI-facing get/set surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefKey {
    OptimizationLevel,
    MinifyOnSave,
}

impl PrefKey {
    pub const ALL: [PrefKey; 2] = [PrefKey::OptimizationLevel, PrefKey::MinifyOnSave];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OptimizationLevel => "optimization-level",
            Self::MinifyOnSave => "minify-on-save",
        }
    }
}

impl std::str::FromStr for PrefKey {
    type Err = PrefsError;

    fn from_str(key: &str) -> Result<Self, PrefsError> {
        match key {
            "optimization-level" => Ok(Self::OptimizationLevel),
            "minify-on-save" => Ok(Self::MinifyOnSave),
            other => Err(PrefsError::UnknownKey(other.to_string())),
        }
    }
}

/// Where preference bytes live. Filesystem in production, memory in tests.
pub trait PrefsBackend: Send + Sync {
    /// Returns `None` when no preferences have been saved yet.
    fn load_raw(&self) -> Result<Option<Vec<u8>>, PrefsError>;
    fn save_raw(&self, data: &[u8]) -> Result<(), PrefsError>;
}

/// JSON file under `<root>/.config/squish.json`.
pub struct FsBackend {
    path: Utf8PathBuf,
}

impl FsBackend {
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            path: root.join(".config").join("squish.json"),
        }
    }

    /// The file this backend reads and writes.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl PrefsBackend for FsBackend {
    fn load_raw(&self) -> Result<Option<Vec<u8>>, PrefsError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PrefsError::Io(err)),
        }
    }

    fn save_raw(&self, data: &[u8]) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

/// In-memory backend for tests.
#[derive(Default)]
pub struct MemoryBackend {
    data: std::sync::Mutex<Option<Vec<u8>>>,
}

impl PrefsBackend for MemoryBackend {
    fn load_raw(&self) -> Result<Option<Vec<u8>>, PrefsError> {
        Ok(self.data.lock().unwrap().clone())
    }

    fn save_raw(&self, data: &[u8]) -> Result<(), PrefsError> {
        *self.data.lock().unwrap() = Some(data.to_vec());
        Ok(())
    }
}

/// Preference accessors with write-through persistence.
///
/// Setters normalize before persisting: unknown optimization levels collapse
/// to `simple`, and minify-on-save coerces truthy strings to a boolean.
pub struct PrefStore {
    backend: Box<dyn PrefsBackend>,
}

impl PrefStore {
    pub fn new(backend: impl PrefsBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Filesystem-backed store rooted at a project directory.
    pub fn open(root: &Utf8Path) -> Self {
        Self::new(FsBackend::new(root))
    }

    /// Current preferences, falling back to defaults when nothing has been
    /// saved yet. A corrupt file is an error rather than a silent reset.
    pub fn load(&self) -> Result<Preferences, PrefsError> {
        match self.backend.load_raw()? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Preferences::default()),
        }
    }

    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        let mut bytes = serde_json::to_vec_pretty(prefs)?;
        bytes.push(b'\n');
        self.backend.save_raw(&bytes)
    }

    pub fn optimization_level(&self) -> Result<OptimizationLevel, PrefsError> {
        Ok(self.load()?.optimization_level)
    }

    pub fn set_optimization_level(&self, value: &str) -> Result<OptimizationLevel, PrefsError> {
        let level = OptimizationLevel::parse(value);
        let mut prefs = self.load()?;
        prefs.optimization_level = level;
        self.save(&prefs)?;
        Ok(level)
    }

    pub fn minify_on_save(&self) -> Result<bool, PrefsError> {
        Ok(self.load()?.minify_on_save)
    }

    pub fn set_minify_on_save(&self, value: bool) -> Result<(), PrefsError> {
        let mut prefs = self.load()?;
        prefs.minify_on_save = value;
        self.save(&prefs)
    }

    /// String-keyed read for the CLI.
    pub fn get(&self, key: PrefKey) -> Result<String, PrefsError> {
        let prefs = self.load()?;
        Ok(match key {
            PrefKey::OptimizationLevel => prefs.optimization_level.as_str().to_string(),
            PrefKey::MinifyOnSave => prefs.minify_on_save.to_string(),
        })
    }

    /// String-keyed write for the CLI, with normalization.
    pub fn set(&self, key: PrefKey, value: &str) -> Result<String, PrefsError> {
        match key {
            PrefKey::OptimizationLevel => {
                let level = self.set_optimization_level(value)?;
                Ok(level.as_str().to_string())
            }
            PrefKey::MinifyOnSave => {
                let coerced = coerce_truthy(value);
                self.set_minify_on_save(coerced)?;
                Ok(coerced.to_string())
            }
        }
    }
}

/// Truthy coercion for the minify-on-save setter. Empty and the usual
/// falsey spellings are false; any other value is true.
pub fn coerce_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "0" | "off" | "no"
    )
}
