use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use sqlx::mysql::MySqlConnectOptions;
use thiserror::Error;

use crate::SchemaName;

pub const DEFAULT_PATH: &str = "config/database.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unable to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Validation(ValidationErrors),
}

/// field -> reason, for every field that failed validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.0.insert(field.to_owned(), reason.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, reason)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {reason}")?;
        }
        Ok(())
    }
}

/// Connection settings for the MySQL server holding the shop database.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub schema: String,
}

impl DatabaseConfig {
    /// Reads and validates a JSON config file. Nothing is cached; callers
    /// load once and pass the value along.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_owned()),
            _ => ConfigError::Io {
                path: path.to_owned(),
                source,
            },
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value = serde_json::from_str::<Value>(text)?;
        Self::from_value(&value)
    }

    /// Validates every field, reporting all failures at once.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let mut errors = ValidationErrors::default();

        let Some(object) = value.as_object() else {
            errors.add("root", "must be a JSON object");
            return Err(ConfigError::Validation(errors));
        };

        let host = required_string(object, "host", &mut errors);
        let port = port(object, &mut errors);
        let username = required_string(object, "username", &mut errors);
        let password = required_string(object, "password", &mut errors);
        let schema = required_string(object, "schema", &mut errors);

        match (host, port, username, password, schema) {
            (Some(host), Some(port), Some(username), Some(password), Some(schema)) => Ok(Self {
                host: host.trim().to_owned(),
                port,
                username: username.trim().to_owned(),
                password: password.to_owned(),
                schema: schema.trim().to_owned(),
            }),
            _ => Err(ConfigError::Validation(errors)),
        }
    }

    pub fn schema_name(&self) -> crate::Result<SchemaName> {
        SchemaName::new(&self.schema)
    }

    /// Server connection options. No database is selected since it may not
    /// exist yet.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .finish()
    }
}

fn required_string<'a>(
    object: &'a Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    match object.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => {
            errors.add(field, "must be a non-empty string");
            None
        }
    }
}

fn port(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<u16> {
    let raw = match object.get("port") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match raw {
        Some(port @ 1..=65535) => u16::try_from(port).ok(),
        Some(_) => {
            errors.add("port", "must be between 1 and 65535");
            None
        }
        None => {
            errors.add("port", "must be an integer");
            None
        }
    }
}
