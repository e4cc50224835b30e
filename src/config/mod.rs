//! Configuration management for `bugmail`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`BUGMAIL_*`)
//! 3. Explicit `--config` file
//! 4. Project config (.bugmail/config.yaml)
//! 5. User config (~/.config/bugmail/config.yaml)
//! 6. DB config table (runtime keys only)
//! 7. Defaults

use crate::classify::{ClassifierPolicy, parse_keyword_list};
use crate::error::{BugmailError, Result};
use crate::ingest::DEFAULT_ACTOR;
use crate::mail::ImapConfig;
use crate::storage::SqliteStorage;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Workspace directory name, looked up from the current directory upward.
pub const WORKSPACE_DIR_NAME: &str = ".bugmail";
/// Database filename inside the workspace directory.
pub const DEFAULT_DB_FILENAME: &str = "bugmail.db";
/// Project config filename inside the workspace directory.
pub const CONFIG_FILENAME: &str = "config.yaml";
/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

const ENV_PREFIX: &str = "BUGMAIL_";
const ENV_DIR: &str = "BUGMAIL_DIR";

/// Every key `bugmail` reads, in canonical form.
pub const KNOWN_KEYS: &[&str] = &[
    "db",
    "lock-timeout",
    "imap.host",
    "imap.port",
    "imap.user",
    "imap.password",
    "imap.mailbox",
    "imap.timeout-secs",
    "poll.interval-secs",
    "poll.actor",
    "classify.priority.high",
    "classify.priority.medium",
    "classify.priority.low",
];

/// Resolved paths for this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub workspace_dir: PathBuf,
    pub db_path: PathBuf,
}

impl ConfigPaths {
    #[must_use]
    pub fn resolve(workspace_dir: &Path, db_override: Option<&PathBuf>) -> Self {
        let db_path = db_override.map_or_else(
            || workspace_dir.join(DEFAULT_DB_FILENAME),
            |path| {
                if path.is_absolute() {
                    path.clone()
                } else {
                    workspace_dir.join(path)
                }
            },
        );
        Self {
            workspace_dir: workspace_dir.to_path_buf(),
            db_path,
        }
    }
}

/// Discover the active `.bugmail` directory.
///
/// Honors `BUGMAIL_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `NotInitialized` if no workspace is found, or an I/O error if the
/// CWD cannot be read.
pub fn discover_workspace_dir(start: Option<&Path>) -> Result<PathBuf> {
    let env_dir = env::var(ENV_DIR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    discover_workspace_dir_with_env(start, env_dir.as_deref())
}

fn discover_workspace_dir_with_env(
    start: Option<&Path>,
    env_override: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(WORKSPACE_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(BugmailError::NotInitialized)
}

/// Open storage using resolved config paths, returning the storage and paths used.
///
/// # Errors
///
/// Returns an error if startup config cannot be read or the database cannot be opened.
pub fn open_storage(
    workspace_dir: &Path,
    cli: &CliOverrides,
) -> Result<(SqliteStorage, ConfigPaths)> {
    let startup_layer = load_startup_config(workspace_dir, cli)?;
    let db_override = cli.db.clone().or_else(|| db_override_from_layer(&startup_layer));
    let lock_timeout = cli
        .lock_timeout
        .or_else(|| lock_timeout_from_layer(&startup_layer))
        .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS);
    let paths = ConfigPaths::resolve(workspace_dir, db_override.as_ref());
    let storage = SqliteStorage::open_with_timeout(&paths.db_path, Some(lock_timeout))?;
    tracing::debug!(db = %paths.db_path.display(), lock_timeout, "Opened storage");
    Ok((storage, paths))
}

/// A configuration layer split into startup-only and runtime (DB) keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub startup: HashMap<String, String>,
    pub runtime: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.startup {
            self.startup.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.runtime {
            self.runtime.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `BUGMAIL_*` variables.
    ///
    /// `BUGMAIL_IMAP_TIMEOUT_SECS` maps to `imap.timeout-secs` by matching
    /// known keys with separators ignored. Unknown names map `_` to `.`.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();

        for (key, value) in vars {
            if key == ENV_DIR {
                continue;
            }
            let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let lowered = stripped.to_lowercase();
            let target = KNOWN_KEYS
                .iter()
                .find(|known| known.replace(['.', '-'], "_") == lowered)
                .map_or_else(|| lowered.replace('_', "."), |known| (*known).to_string());
            insert_key_value(&mut layer, &target, value);
        }

        layer
    }

    /// Build a layer from DB config table values.
    ///
    /// # Errors
    ///
    /// Returns an error if config table lookup fails.
    pub fn from_db(storage: &SqliteStorage) -> Result<Self> {
        let mut layer = Self::default();
        let map = storage.get_all_config()?;
        for (key, value) in map {
            if is_startup_key(&key) {
                continue;
            }
            layer.runtime.insert(normalize_key(&key), value);
        }
        Ok(layer)
    }

    /// Look up a key in either half of the layer.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&String> {
        let key = normalize_key(key);
        self.startup.get(&key).or_else(|| self.runtime.get(&key))
    }

    /// All keys and values, sorted by key.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.startup
            .iter()
            .chain(self.runtime.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub lock_timeout: Option<u64>,
    /// Extra YAML file layered above the project config.
    pub config_file: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
    pub actor: Option<String>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            insert_key_value(&mut layer, "db", path.to_string_lossy().to_string());
        }
        if let Some(lock_timeout) = self.lock_timeout {
            insert_key_value(&mut layer, "lock-timeout", lock_timeout.to_string());
        }
        if let Some(interval) = self.poll_interval_secs {
            insert_key_value(&mut layer, "poll.interval-secs", interval.to_string());
        }
        if let Some(actor) = &self.actor {
            insert_key_value(&mut layer, "poll.actor", actor.clone());
        }

        layer
    }
}

/// Load project config (.bugmail/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(workspace_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&workspace_dir.join(CONFIG_FILENAME))
}

/// Path of the per-user config file, when `HOME` is set.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    let home = env::var("HOME").ok()?;
    Some(
        Path::new(&home)
            .join(".config")
            .join("bugmail")
            .join(CONFIG_FILENAME),
    )
}

/// Load user config (~/.config/bugmail/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    user_config_path().map_or_else(|| Ok(ConfigLayer::default()), |path| ConfigLayer::from_yaml(&path))
}

fn load_explicit_config(cli: &CliOverrides) -> Result<ConfigLayer> {
    let Some(path) = &cli.config_file else {
        return Ok(ConfigLayer::default());
    };
    if !path.exists() {
        return Err(BugmailError::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    ConfigLayer::from_yaml(path)
}

/// Load startup-only configuration layers (YAML + env + CLI, no DB).
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_startup_config(workspace_dir: &Path, cli: &CliOverrides) -> Result<ConfigLayer> {
    let user = load_user_config()?;
    let project = load_project_config(workspace_dir)?;
    let explicit = load_explicit_config(cli)?;
    let env_layer = ConfigLayer::from_env();

    Ok(ConfigLayer::merge_layers(&[
        user,
        project,
        explicit,
        env_layer,
        cli.as_layer(),
    ]))
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    for (key, value) in [
        ("lock-timeout", DEFAULT_LOCK_TIMEOUT_MS.to_string()),
        ("imap.port", "993".to_string()),
        ("imap.mailbox", "INBOX".to_string()),
        ("imap.timeout-secs", "30".to_string()),
        ("poll.interval-secs", "10".to_string()),
        ("poll.actor", DEFAULT_ACTOR.to_string()),
    ] {
        insert_key_value(&mut layer, key, value);
    }
    layer
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed, or DB access fails.
pub fn load_config(
    workspace_dir: &Path,
    storage: Option<&SqliteStorage>,
    cli: &CliOverrides,
) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let db_layer = match storage {
        Some(storage) => ConfigLayer::from_db(storage)?,
        None => ConfigLayer::default(),
    };
    let startup = load_startup_config(workspace_dir, cli)?;

    Ok(ConfigLayer::merge_layers(&[defaults, db_layer, startup]))
}

/// Build IMAP connection settings from a merged layer.
///
/// # Errors
///
/// Returns a `Config` error naming the first missing or malformed key.
pub fn imap_config_from_layer(layer: &ConfigLayer) -> Result<ImapConfig> {
    let required = |key: &str| -> Result<String> {
        layer
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                BugmailError::Config(format!(
                    "missing {key} (set it in .bugmail/config.yaml or {})",
                    env_var_for_key(key)
                ))
            })
    };

    let host = required("imap.host")?;
    let user = required("imap.user")?;
    // Passwords are used verbatim; only an entirely missing one is an error.
    let password = layer.get("imap.password").cloned().ok_or_else(|| {
        BugmailError::Config(format!(
            "missing imap.password (set it in .bugmail/config.yaml or {})",
            env_var_for_key("imap.password")
        ))
    })?;
    let port = parse_number::<u16>(layer, "imap.port")?.unwrap_or(993);
    let mailbox = layer
        .get("imap.mailbox")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "INBOX".to_string());
    let timeout_secs = parse_number::<u64>(layer, "imap.timeout-secs")?.unwrap_or(30);

    Ok(ImapConfig {
        host,
        port,
        user,
        password,
        mailbox,
        timeout: Duration::from_secs(timeout_secs.max(1)),
    })
}

/// Scheduling and attribution for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub actor: String,
}

/// Build poll settings from a merged layer.
///
/// # Errors
///
/// Returns a `Config` error if `poll.interval-secs` is not a number.
pub fn poll_settings_from_layer(layer: &ConfigLayer) -> Result<PollSettings> {
    let interval = parse_number::<u64>(layer, "poll.interval-secs")?.unwrap_or(10);
    if interval == 0 {
        return Err(BugmailError::Config(
            "poll.interval-secs must be at least 1".to_string(),
        ));
    }
    let actor = layer
        .get("poll.actor")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
    Ok(PollSettings {
        interval: Duration::from_secs(interval),
        actor,
    })
}

/// Actor for administrative commands (`mark`, `delete`, `config set`).
///
/// `--actor`, then `$USER`, then `admin`.
#[must_use]
pub fn resolve_admin_actor(cli: &CliOverrides) -> String {
    cli.actor
        .clone()
        .or_else(|| env::var("USER").ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "admin".to_string())
}

/// Build the classifier keyword policy. Configured lists replace defaults.
#[must_use]
pub fn classifier_policy_from_layer(layer: &ConfigLayer) -> ClassifierPolicy {
    let list = |level: &str| {
        layer
            .get(&format!("classify.priority.{level}"))
            .map(|v| parse_keyword_list(v))
            .filter(|words| !words.is_empty())
    };
    ClassifierPolicy::default().with_overrides(list("high"), list("medium"), list("low"))
}

/// Determine if a key is startup-only.
///
/// Startup-only keys can only be set in YAML config files, the environment
/// or on the command line, never in the database.
#[must_use]
pub fn is_startup_key(key: &str) -> bool {
    let normalized = normalize_key(key);
    normalized.starts_with("imap.") || matches!(normalized.as_str(), "db" | "lock-timeout")
}

/// Whether a key should be masked when displayed.
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    normalize_key(key).contains("password")
}

/// The environment variable that sets `key`.
#[must_use]
pub fn env_var_for_key(key: &str) -> String {
    format!(
        "{ENV_PREFIX}{}",
        normalize_key(key).replace(['.', '-'], "_").to_uppercase()
    )
}

/// Commented template written by `bugmail init`.
#[must_use]
pub fn config_template() -> &'static str {
    r"# bugmail configuration
#
# Values here are overridden by BUGMAIL_* environment variables
# (e.g. BUGMAIL_IMAP_PASSWORD) and command-line flags.

imap:
  host: imap.example.com
  port: 993
  user: bugs@example.com
  # password: prefer BUGMAIL_IMAP_PASSWORD
  mailbox: INBOX
  timeout-secs: 30

# Runtime keys below can also be stored with `bugmail config set`;
# values in this file take precedence over the stored ones.
# poll:
#   interval-secs: 10
#   actor: mail-ingest

# classify:
#   priority:
#     high: [urgent, high, critical, blocker, emergency, p1, priority 1]
#     medium: [medium, normal, moderate, p2, priority 2]
#     low: [low, minor, trivial, p3, priority 3]
"
}

fn insert_key_value(layer: &mut ConfigLayer, key: &str, value: String) {
    let key = normalize_key(key);
    if is_startup_key(&key) {
        layer.startup.insert(key, value);
    } else {
        layer.runtime.insert(key, value);
    }
}

/// Canonical key form: trimmed, lower-case, `_` → `-`.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_number<T: std::str::FromStr>(layer: &ConfigLayer, key: &str) -> Result<Option<T>> {
    layer.get(key).map_or(Ok(None), |value| {
        value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| BugmailError::Config(format!("{key} must be a number, got '{value}'")))
    })
}

fn db_override_from_layer(layer: &ConfigLayer) -> Option<PathBuf> {
    layer.startup.get("db").and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    })
}

fn lock_timeout_from_layer(layer: &ConfigLayer) -> Option<u64> {
    layer
        .startup
        .get("lock-timeout")
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        insert_key_value(&mut layer, &key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
