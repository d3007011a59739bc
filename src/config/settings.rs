//! Runtime settings read from the process environment (and `.env` when present).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SCHEMA: &str = "public";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Deployment environment. Only `Development` exposes error stacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            _ => Environment::Production,
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Postgres schema holding every application table. Must be a plain identifier.
    pub database_schema: String,
    pub max_connections: u32,
    pub max_request_body_bytes: usize,
}

impl Settings {
    /// Load `.env` (if any) and build settings from the environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. `APP_ENV` wins over `NODE_ENV`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("APP_ENV")
            .or_else(|| lookup("NODE_ENV"))
            .map(|v| v.parse().unwrap_or_default())
            .unwrap_or_default();
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(SettingsError::Missing("DATABASE_URL"))?;
        let database_schema = lookup("DATABASE_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into());
        if !is_identifier(&database_schema) {
            return Err(SettingsError::Invalid {
                key: "DATABASE_SCHEMA",
                value: database_schema,
            });
        }

        Ok(Settings {
            environment,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port: parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?,
            database_url,
            database_schema,
            max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            max_request_body_bytes: parse_or(
                "MAX_REQUEST_BODY_BYTES",
                lookup("MAX_REQUEST_BODY_BYTES"),
                DEFAULT_MAX_BODY_BYTES,
            )?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, SettingsError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| SettingsError::Invalid { key, value }),
    }
}

/// Lowercase letters, digits and underscores, not starting with a digit.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let settings = Settings::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/clinic")])).unwrap();
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.port, 5000);
        assert_eq!(settings.database_schema, "public");
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.address(), "0.0.0.0:5000");
    }

    #[test]
    fn database_url_is_required() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, SettingsError::Missing("DATABASE_URL")));
    }

    #[test]
    fn app_env_takes_precedence_over_node_env() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("APP_ENV", "production"),
            ("NODE_ENV", "development"),
        ]))
        .unwrap();
        assert_eq!(settings.environment, Environment::Production);

        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("NODE_ENV", "development"),
        ]))
        .unwrap();
        assert!(settings.environment.is_development());
    }

    #[test]
    fn bad_port_is_reported() {
        let err = Settings::from_lookup(lookup(&[("DATABASE_URL", "postgres://x/y"), ("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "PORT", .. }));
    }

    #[rstest]
    #[case("public", true)]
    #[case("test_1a2b", true)]
    #[case("_private", true)]
    #[case("1abc", false)]
    #[case("Public", false)]
    #[case("drop table", false)]
    #[case("", false)]
    fn schema_names_must_be_identifiers(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(is_identifier(input), ok);
    }

    #[rstest]
    #[case("development", Environment::Development)]
    #[case("DEV", Environment::Development)]
    #[case("local", Environment::Development)]
    #[case("production", Environment::Production)]
    #[case("staging", Environment::Production)]
    fn environment_parsing(#[case] raw: &str, #[case] expected: Environment) {
        assert_eq!(raw.parse::<Environment>().unwrap(), expected);
    }
}
