use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use log::info;
use thiserror::Error;

use crate::coordinator::GameSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: IpAddr,
    pub port: u16,
    pub static_dir: PathBuf,
    pub deck_path: Option<PathBuf>,
    pub tls_cert_path: PathBuf,
    pub tls_key_path: PathBuf,
    pub game: GameSettings,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let min_timer_seconds: u32 = try_load(&lookup, "TRIVIA_MIN_TIMER", "10")?;
        let default_timer_seconds: u32 = try_load(&lookup, "TRIVIA_DEFAULT_TIMER", "30")?;

        if min_timer_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "TRIVIA_MIN_TIMER",
                value: min_timer_seconds.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if default_timer_seconds < min_timer_seconds {
            return Err(ConfigError::Invalid {
                key: "TRIVIA_DEFAULT_TIMER",
                value: default_timer_seconds.to_string(),
                reason: format!("must not be below TRIVIA_MIN_TIMER ({min_timer_seconds})"),
            });
        }

        Ok(Config {
            bind_address: try_load(&lookup, "TRIVIA_BIND", "0.0.0.0")?,
            port: try_load(&lookup, "TRIVIA_PORT", "3001")?,
            static_dir: try_load(&lookup, "TRIVIA_STATIC_DIR", "public")?,
            deck_path: lookup("TRIVIA_DECK_PATH").map(PathBuf::from),
            tls_cert_path: try_load(&lookup, "TRIVIA_TLS_CERT", "ssl/certificate.pem")?,
            tls_key_path: try_load(&lookup, "TRIVIA_TLS_KEY", "ssl/private.key")?,
            game: GameSettings {
                default_timer_seconds,
                min_timer_seconds,
            },
        })
    }

    pub fn tls_available(&self) -> bool {
        self.tls_cert_path.is_file() && self.tls_key_path.is_file()
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.bind_address.to_string(), "0.0.0.0");
        assert_eq!(config.game.default_timer_seconds, 30);
        assert_eq!(config.game.min_timer_seconds, 10);
        assert!(config.deck_path.is_none());
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("TRIVIA_PORT", "8080"),
            ("TRIVIA_DEFAULT_TIMER", "60"),
            ("TRIVIA_DECK_PATH", "/srv/deck.json"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.game.default_timer_seconds, 60);
        assert_eq!(config.deck_path, Some(PathBuf::from("/srv/deck.json")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("TRIVIA_PORT", "not-a-port")]),
            Err(ConfigError::Invalid { key: "TRIVIA_PORT", .. })
        ));
        assert!(matches!(
            load(&[("TRIVIA_MIN_TIMER", "0")]),
            Err(ConfigError::Invalid { key: "TRIVIA_MIN_TIMER", .. })
        ));
        assert!(matches!(
            load(&[("TRIVIA_DEFAULT_TIMER", "5")]),
            Err(ConfigError::Invalid { key: "TRIVIA_DEFAULT_TIMER", .. })
        ));
    }
}
