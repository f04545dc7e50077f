//! Configuration for the DLNA bridge.
//!
//! Configuration is YAML, merged from an embedded default, an optional
//! `config.yaml` in the configuration directory, and environment variable
//! overrides (`DLNA_CONFIG__SECTION__KEY`), in that order. Values are
//! addressed by a lowercase path, e.g. `&["catalog", "server_url"]`.
//!
//! ```no_run
//! use dlnaconfig::get_config;
//!
//! let config = get_config();
//! config.validate().expect("invalid configuration");
//! let port = config.get_dlna_port().expect("Dlna.Port");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::info;
use uuid::Uuid;

mod descriptor;
mod error;

pub use descriptor::DeviceDescriptor;
pub use error::ConfigurationError;

const DEFAULT_CONFIG: &str = include_str!("dlnaconfig.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("failed to load DLNA configuration"));
}

const ENV_CONFIG_DIR: &str = "DLNA_CONFIG";
const ENV_PREFIX: &str = "DLNA_CONFIG__";

const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

macro_rules! impl_usize_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> usize {
            match self.get_value($path) {
                Ok(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap() as usize,
                Ok(Value::Number(n)) if n.is_u64() => n.as_u64().unwrap() as usize,
                _ => $default,
            }
        }
    };
}

macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            }
        }
    };
}

/// Configuration manager. Cheaply clonable; the global singleton is reached
/// through [`get_config`].
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data.lock().unwrap().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "using config dir from env");
            return env_path;
        }
        if Path::new(".dlna").exists() {
            return ".dlna".to_string();
        }
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".dlna");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }
        ".dlna".to_string()
    }

    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(anyhow!("config path is not a directory"));
        }
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;
        fs::read_dir(path)?;
        Ok(())
    }

    /// Resolves the configuration directory, trying in order: the `directory`
    /// argument, the `DLNA_CONFIG` env var, `./.dlna`, `~/.dlna`. Creates it
    /// if missing and checks it is read/write accessible.
    pub fn config_dir(directory: &str) -> String {
        let dir_path = Self::find_config_dir(directory);
        let path = Path::new(&dir_path);
        Self::validate_config_dir(path).expect("cannot prepare configuration directory");
        dir_path
    }

    /// Loads the embedded default, merges in `config.yaml` from the
    /// configuration directory if present, applies environment overrides,
    /// and persists the merged result back to `config.yaml`.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory);
        info!(config_dir = %config_dir, "using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file = %path, "loaded config file");
            data
        } else {
            info!(config_file = %path, "config file not found, using embedded default");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        Self::set_value_internal(&mut data, path, value.clone())?;
        drop(data);
        self.save()?;
        Ok(())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key.clone());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("current node is not a map"))
        }
    }

    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();
                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                let key_path = key
                    .trim_start_matches(ENV_PREFIX)
                    .split("__")
                    .collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        new_map.insert(Value::String(s.to_lowercase()), Self::lower_keys_value(v));
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    fn get_port(&self, path: &[&str]) -> Option<Result<u16, String>> {
        match self.get_value(path) {
            Ok(Value::Number(n)) if n.is_i64() => {
                let raw = n.as_i64().unwrap();
                Some(
                    u16::try_from(raw)
                        .map_err(|_| raw.to_string())
                        .and_then(|p| if p == 0 { Err(raw.to_string()) } else { Ok(p) }),
                )
            }
            Ok(Value::String(s)) => Some(s.parse::<u16>().map_err(|_| s.clone()).and_then(|p| {
                if p == 0 { Err(s.clone()) } else { Ok(p) }
            })),
            Ok(Value::Null) | Err(_) => None,
            Ok(other) => Some(Err(format!("{other:?}"))),
        }
    }

    /// The TCP port DLNA HTTP control listens on. Required: `Dlna.Port`.
    pub fn get_dlna_port(&self) -> Result<u16, ConfigurationError> {
        match self.get_port(&["dlna", "port"]) {
            Some(Ok(p)) => Ok(p),
            Some(Err(value)) => Err(ConfigurationError::InvalidPort {
                key: "Dlna.Port",
                value,
            }),
            None => Err(ConfigurationError::MissingKey("Dlna.Port")),
        }
    }

    /// The friendly name advertised in `device.xml`. Required: `Dlna.ServerName`.
    pub fn get_dlna_server_name(&self) -> Result<String, ConfigurationError> {
        self.get_string(&["dlna", "server_name"])
            .ok_or(ConfigurationError::MissingKey("Dlna.ServerName"))
    }

    pub fn get_dlna_manufacturer(&self) -> String {
        self.get_string(&["dlna", "manufacturer"])
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn get_dlna_model_name(&self) -> String {
        self.get_string(&["dlna", "model_name"])
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn get_dlna_model_number(&self) -> String {
        self.get_string(&["dlna", "model_number"])
            .unwrap_or_else(|| "1.0".to_string())
    }

    /// Base URL of the upstream catalog server. Required: `Catalog.ServerUrl`.
    pub fn get_catalog_server_url(&self) -> Result<url::Url, ConfigurationError> {
        let raw = self
            .get_string(&["catalog", "server_url"])
            .ok_or(ConfigurationError::MissingKey("Catalog.ServerUrl"))?;
        url::Url::parse(&raw).map_err(|source| ConfigurationError::InvalidUrl {
            key: "Catalog.ServerUrl",
            source,
        })
    }

    /// Bearer token sent as `X-Emby-Token`. Required: `Catalog.AccessToken`.
    pub fn get_catalog_access_token(&self) -> Result<String, ConfigurationError> {
        self.get_string(&["catalog", "access_token"])
            .ok_or(ConfigurationError::MissingKey("Catalog.AccessToken"))
    }

    /// Catalog user to browse and stream as. Required: `Catalog.UserId`.
    pub fn get_catalog_user_id(&self) -> Result<Uuid, ConfigurationError> {
        let raw = self
            .get_string(&["catalog", "user_id"])
            .ok_or(ConfigurationError::MissingKey("Catalog.UserId"))?;
        Uuid::parse_str(&raw).map_err(|source| ConfigurationError::InvalidUuid {
            key: "Catalog.UserId",
            source,
        })
    }

    /// Optional separate port for a presentation/admin web UI.
    pub fn get_web_port(&self) -> Result<Option<u16>, ConfigurationError> {
        match self.get_port(&["web", "port"]) {
            Some(Ok(p)) => Ok(Some(p)),
            Some(Err(value)) => Err(ConfigurationError::InvalidPort {
                key: "Web.Port",
                value,
            }),
            None => Ok(None),
        }
    }

    pub fn get_app_name(&self) -> String {
        self.get_string(&["app", "name"])
            .unwrap_or_else(|| "dlnaserver".to_string())
    }

    pub fn get_app_version(&self) -> String {
        self.get_string(&["app", "version"])
            .unwrap_or_else(|| "0.1.0".to_string())
    }

    pub fn get_device_name(&self) -> Option<String> {
        self.get_string(&["device", "name"])
    }

    pub fn get_device_id(&self) -> Option<String> {
        self.get_string(&["device", "id"])
    }

    impl_usize_config!(
        get_log_cache_size,
        &["logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        &["logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["logger", "min_level"]) {
            Ok(Value::String(s)) => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }

    /// Validates every required key up front, so configuration errors are
    /// caught once at startup instead of scattered across request handlers.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.get_dlna_port()?;
        self.get_dlna_server_name()?;
        self.get_catalog_server_url()?;
        self.get_catalog_access_token()?;
        self.get_catalog_user_id()?;
        self.get_web_port()?;
        Ok(())
    }

    /// Builds the process-wide [`DeviceDescriptor`], deriving a UUID from
    /// `host_identity` + the configured server name so it is stable across
    /// restarts without being persisted.
    pub fn build_device_descriptor(
        &self,
        host_identity: &str,
    ) -> Result<DeviceDescriptor, ConfigurationError> {
        let friendly_name = self.get_dlna_server_name()?;
        let http_port = self.get_dlna_port()?;
        let uuid = DeviceDescriptor::derive_uuid(host_identity, &friendly_name);
        Ok(DeviceDescriptor {
            friendly_name,
            manufacturer: self.get_dlna_manufacturer(),
            model_name: self.get_dlna_model_name(),
            model_number: self.get_dlna_model_number(),
            uuid,
            http_port,
        })
    }
}

/// Returns the global configuration instance, lazily loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
