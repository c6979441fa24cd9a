//! Typed key-value preferences persisted as TOML.
//!
//! [`Preferences`] is the plain store: load, get, set, save.  The running
//! host wraps it in [`SharedPreferences`], which saves automatically a short
//! while after the first unsaved change.  The save is a timer on the frame
//! loop's [`TimerEngine`], scheduled with `schedule_once`, so a burst of
//! changes in one frame produces a single write.
//!
//! On disk every value records its type, so a `float` read back is still a
//! `float` and not a `double`:
//!
//! ```toml
//! [values.volume]
//! type = "float"
//! value = 0.5
//!
//! [values.last_map]
//! type = "string"
//! value = "arena_02"
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use console_core::command::{ArgKind, ArgSpec, ArgValue, CommandDescriptor, CommandError};
use console_core::timer::{CallbackError, TimerCallback, TimerEngine, TimerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("I/O error accessing preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse preferences TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unsupported preferences format version {0}")]
    UnsupportedVersion(u32),
}

/// One stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<PreferenceValue>),
    Dictionary(BTreeMap<String, PreferenceValue>),
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceValue::Bool(v) => write!(f, "{v}"),
            PreferenceValue::Int(v) => write!(f, "{v}"),
            PreferenceValue::Float(v) => write!(f, "{v}"),
            PreferenceValue::Double(v) => write!(f, "{v}"),
            PreferenceValue::Timestamp(ms) => write!(f, "@{ms}"),
            PreferenceValue::String(s) => write!(f, "{s:?}"),
            PreferenceValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            PreferenceValue::List(items) => write!(f, "[{} items]", items.len()),
            PreferenceValue::Dictionary(map) => write!(f, "{{{} keys}}", map.len()),
        }
    }
}

impl PreferenceValue {
    /// Parses console input: `true`/`false`, an integer, a decimal number
    /// (stored as a double) or, failing all of those, a string.
    pub fn parse_loose(text: &str) -> Self {
        if let Ok(b) = text.parse::<bool>() {
            PreferenceValue::Bool(b)
        } else if let Ok(i) = text.parse::<i64>() {
            PreferenceValue::Int(i)
        } else if let Ok(d) = text.parse::<f64>() {
            PreferenceValue::Double(d)
        } else {
            PreferenceValue::String(text.to_string())
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    version: u32,
    #[serde(default)]
    values: BTreeMap<String, PreferenceValue>,
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// In-memory preferences bound to a backing file.
#[derive(Debug)]
pub struct Preferences {
    path: PathBuf,
    values: BTreeMap<String, PreferenceValue>,
    dirty: bool,
}

impl Preferences {
    /// An empty store that will save to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Loads the store from `path`; a missing file gives an empty store.
    ///
    /// # Errors
    ///
    /// [`PreferencesError`] when the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let mut prefs = Self::new(path);
        prefs.reload()?;
        Ok(prefs)
    }

    /// Replaces the in-memory values with the file's contents.
    ///
    /// # Errors
    ///
    /// See [`Preferences::load`].
    pub fn reload(&mut self) -> Result<(), PreferencesError> {
        let file: PreferencesFile = match std::fs::read_to_string(&self.path) {
            Ok(text) => toml::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PreferencesFile::default(),
            Err(source) => {
                return Err(PreferencesError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if file.version > FORMAT_VERSION {
            return Err(PreferencesError::UnsupportedVersion(file.version));
        }
        self.values = file.values;
        self.dirty = false;
        Ok(())
    }

    /// Writes the store to its file if anything changed since the last save.
    ///
    /// # Errors
    ///
    /// [`PreferencesError::Io`] or [`PreferencesError::Serialize`].
    pub fn save(&mut self) -> Result<(), PreferencesError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| PreferencesError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let file = PreferencesFile {
            version: FORMAT_VERSION,
            values: self.values.clone(),
        };
        let text = toml::to_string_pretty(&file)?;
        std::fs::write(&self.path, text).map_err(|source| PreferencesError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        debug!("saved {} preference(s) to {}", self.values.len(), self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&PreferenceValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            PreferenceValue::Bool(b) => Some(*b),
            PreferenceValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            PreferenceValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            PreferenceValue::Float(v) => Some(f64::from(*v)),
            PreferenceValue::Double(v) => Some(*v),
            PreferenceValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            PreferenceValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Stores `value` under `key`.  Returns `true` if the store changed.
    pub fn set(&mut self, key: impl Into<String>, value: PreferenceValue) -> bool {
        let key = key.into();
        if self.values.get(&key) == Some(&value) {
            return false;
        }
        self.values.insert(key, value);
        self.dirty = true;
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<PreferenceValue> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys starting with `prefix`, sorted.
    pub fn keys(&self, prefix: &str) -> Vec<&str> {
        self.values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

// ── Debounced autosave ────────────────────────────────────────────────────────

/// Shared handle to a [`Preferences`] store with debounced autosave.
///
/// Cloning shares the store.  Every clone schedules the same save callback,
/// so at most one save is pending at a time however many changes are made.
#[derive(Clone)]
pub struct SharedPreferences {
    store: Rc<RefCell<Preferences>>,
    save_callback: TimerCallback,
    autosave_delay: f64,
}

impl SharedPreferences {
    pub fn new(prefs: Preferences, autosave_delay: f64) -> Self {
        let store = Rc::new(RefCell::new(prefs));
        let weak: Weak<RefCell<Preferences>> = Rc::downgrade(&store);
        let save_callback = TimerCallback::new(move |_| {
            let Some(store) = weak.upgrade() else {
                return Ok(());
            };
            let result = store.borrow_mut().save();
            result.map_err(|e| CallbackError(format!("autosave failed: {e}")))
        });
        Self {
            store,
            save_callback,
            autosave_delay,
        }
    }

    pub fn get(&self, key: &str) -> Option<PreferenceValue> {
        self.store.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.borrow().contains(key)
    }

    /// Borrows the underlying store for reading.
    pub fn with<R>(&self, f: impl FnOnce(&Preferences) -> R) -> R {
        f(&self.store.borrow())
    }

    /// Stores `value` and schedules the debounced save.
    ///
    /// # Errors
    ///
    /// [`TimerError`] if the configured autosave delay is invalid.
    pub fn set(
        &self,
        timers: &mut TimerEngine,
        key: impl Into<String>,
        value: PreferenceValue,
    ) -> Result<(), TimerError> {
        if self.store.borrow_mut().set(key, value) {
            timers.schedule_once(self.save_callback.clone(), self.autosave_delay)?;
        }
        Ok(())
    }

    /// Removes `key` and schedules the debounced save.
    ///
    /// # Errors
    ///
    /// [`TimerError`] if the configured autosave delay is invalid.
    pub fn remove(&self, timers: &mut TimerEngine, key: &str) -> Result<Option<PreferenceValue>, TimerError> {
        let removed = self.store.borrow_mut().remove(key);
        if removed.is_some() {
            timers.schedule_once(self.save_callback.clone(), self.autosave_delay)?;
        }
        Ok(removed)
    }

    /// Cancels any pending autosave and writes now.
    ///
    /// # Errors
    ///
    /// See [`Preferences::save`].
    pub fn save_now(&self, timers: &mut TimerEngine) -> Result<(), PreferencesError> {
        timers.cancel_callback(&self.save_callback);
        self.store.borrow_mut().save()
    }

    /// Whether an autosave is currently scheduled.
    pub fn save_pending(&self, timers: &TimerEngine) -> bool {
        timers.is_pending(&self.save_callback)
    }

    /// Writes any unsaved changes; used at shutdown.
    pub fn flush(&self) {
        if let Err(e) = self.store.borrow_mut().save() {
            warn!("failed to save preferences: {e}");
        }
    }
}

/// Console commands for inspecting and editing preferences:
/// `prefget <key>`, `prefset <key> <value>`, `prefdel <key>`, `preflist [prefix]`.
pub fn preference_commands(prefs: &SharedPreferences) -> Vec<CommandDescriptor> {
    let get = prefs.clone();
    let set = prefs.clone();
    let del = prefs.clone();
    let list = prefs.clone();
    vec![
        CommandDescriptor::new("prefget", move |ctx, args| {
            let key = args.str("key").unwrap_or("");
            match get.get(key) {
                Some(value) => ctx.print(format!("{key} = {value}")),
                None => ctx.print(format!("{key} is not set")),
            }
            Ok(())
        })
        .help("Prints a preference value.")
        .arg(ArgSpec::required("key", ArgKind::Str)),
        CommandDescriptor::new("prefset", move |ctx, args| {
            let key = args.str("key").unwrap_or("");
            let value = PreferenceValue::parse_loose(args.str("value").unwrap_or(""));
            set.set(ctx.timers, key, value)?;
            Ok(())
        })
        .help("Sets a preference; saved automatically.")
        .arg(ArgSpec::required("key", ArgKind::Str))
        .arg(ArgSpec::required("value", ArgKind::Str)),
        CommandDescriptor::new("prefdel", move |ctx, args| {
            let key = args.str("key").unwrap_or("");
            if del.remove(ctx.timers, key)?.is_none() {
                return Err(CommandError::Failed(format!("{key} is not set")));
            }
            Ok(())
        })
        .help("Removes a preference.")
        .arg(ArgSpec::required("key", ArgKind::Str)),
        CommandDescriptor::new("preflist", move |ctx, args| {
            let prefix = args.str("prefix").unwrap_or("");
            let lines: Vec<String> = list.with(|p| {
                p.keys(prefix)
                    .into_iter()
                    .filter_map(|k| p.get(k).map(|v| format!("  {k} = {v}")))
                    .collect()
            });
            for line in lines {
                ctx.print(line);
            }
            Ok(())
        })
        .help("Lists preferences.")
        .arg(ArgSpec::optional("prefix", ArgKind::Str, ArgValue::Str(String::new()))),
    ]
}

/// Opens the store at `path`, logging and starting empty if it is unreadable.
pub fn open_or_default(path: &Path) -> Preferences {
    match Preferences::load(path) {
        Ok(prefs) => {
            info!("loaded {} preference(s) from {}", prefs.len(), path.display());
            prefs
        }
        Err(e) => {
            warn!("{e}; starting with empty preferences");
            Preferences::new(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("devconsole-prefs-{}", uuid::Uuid::new_v4()))
            .join("preferences.toml")
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_set_get_remove_contains() {
        // Arrange
        let mut prefs = Preferences::new(temp_path());

        // Act
        prefs.set("volume", PreferenceValue::Float(0.5));
        prefs.set("name", PreferenceValue::String("arena".into()));
        let removed = prefs.remove("name");

        // Assert
        assert_eq!(prefs.get("volume"), Some(&PreferenceValue::Float(0.5)));
        assert_eq!(prefs.get_double("volume"), Some(0.5));
        assert_eq!(removed, Some(PreferenceValue::String("arena".into())));
        assert!(!prefs.contains("name"));
        assert!(prefs.is_dirty());
    }

    #[test]
    fn test_setting_identical_value_is_not_a_change() {
        let mut prefs = Preferences::new(temp_path());
        assert!(prefs.set("a", PreferenceValue::Int(1)));
        assert!(!prefs.set("a", PreferenceValue::Int(1)));
    }

    #[test]
    fn test_every_value_type_survives_save_and_load() {
        // Arrange
        let path = temp_path();
        let mut prefs = Preferences::new(&path);
        let mut dict = BTreeMap::new();
        dict.insert("x".to_string(), PreferenceValue::Int(3));
        dict.insert("tags".to_string(), PreferenceValue::List(vec![
            PreferenceValue::String("a".into()),
            PreferenceValue::Bool(false),
        ]));
        prefs.set("flag", PreferenceValue::Bool(true));
        prefs.set("count", PreferenceValue::Int(-7));
        prefs.set("ratio", PreferenceValue::Float(0.25));
        prefs.set("precise", PreferenceValue::Double(1.0 / 3.0));
        prefs.set("seen", PreferenceValue::Timestamp(1_700_000_000_000));
        prefs.set("blob", PreferenceValue::Bytes(vec![0, 1, 255]));
        prefs.set("nested", PreferenceValue::Dictionary(dict));

        // Act
        prefs.save().expect("save");
        let loaded = Preferences::load(&path).expect("load");

        // Assert
        assert_eq!(loaded.len(), 7);
        for key in prefs.keys("") {
            assert_eq!(loaded.get(key), prefs.get(key), "{key}");
        }
        assert!(!loaded.is_dirty());
        cleanup(&path);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let prefs = Preferences::load(temp_path()).expect("load");
        assert!(prefs.is_empty());
    }

    #[test]
    fn test_newer_format_version_is_rejected() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "version = 99\n").unwrap();

        let result = Preferences::load(&path);

        assert!(matches!(result, Err(PreferencesError::UnsupportedVersion(99))));
        cleanup(&path);
    }

    #[test]
    fn test_burst_of_changes_schedules_single_save() {
        // Arrange
        let path = temp_path();
        let shared = SharedPreferences::new(Preferences::new(&path), 1.0);
        let mut timers = TimerEngine::new();

        // Act
        shared.set(&mut timers, "a", PreferenceValue::Int(1)).unwrap();
        shared.set(&mut timers, "b", PreferenceValue::Int(2)).unwrap();
        shared.set(&mut timers, "c", PreferenceValue::Int(3)).unwrap();

        // Assert
        assert_eq!(timers.count(), 1);
        assert!(shared.save_pending(&timers));
        assert!(!path.exists());

        timers.update(1.0);
        assert!(path.exists());
        assert!(!shared.save_pending(&timers));
        assert_eq!(Preferences::load(&path).unwrap().get_int("b"), Some(2));
        cleanup(&path);
    }

    #[test]
    fn test_save_now_cancels_pending_save() {
        let path = temp_path();
        let shared = SharedPreferences::new(Preferences::new(&path), 5.0);
        let mut timers = TimerEngine::new();
        shared.set(&mut timers, "k", PreferenceValue::Bool(true)).unwrap();

        shared.save_now(&mut timers).expect("save");

        assert_eq!(timers.count(), 0);
        assert!(path.exists());
        cleanup(&path);
    }

    #[test]
    fn test_parse_loose() {
        assert_eq!(PreferenceValue::parse_loose("true"), PreferenceValue::Bool(true));
        assert_eq!(PreferenceValue::parse_loose("-4"), PreferenceValue::Int(-4));
        assert_eq!(PreferenceValue::parse_loose("2.5"), PreferenceValue::Double(2.5));
        assert_eq!(
            PreferenceValue::parse_loose("arena"),
            PreferenceValue::String("arena".into())
        );
    }
}
