//! `jfuzz.toml` config loading.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::{BehaviorConfig, DEFAULT_ORACLE_PROGRAM};

/// Which byte mutator backs text attacks and strong mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OracleBackend {
    /// External program (radamsa by default).
    Command,
    /// In-process byte mutator.
    Builtin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default = "default_oracle")]
    pub oracle: OracleBackend,

    /// Program spawned by the command oracle.
    #[serde(default = "default_oracle_command")]
    pub oracle_command: String,

    /// Extra arguments passed to the command oracle on every call.
    #[serde(default)]
    pub oracle_args: Vec<String>,

    /// Substitute a placeholder document for malformed input.
    #[serde(default)]
    pub lenient: bool,

    /// Fixed seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Initial behavior weights.
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

fn default_oracle() -> OracleBackend {
    OracleBackend::Command
}

fn default_oracle_command() -> String {
    DEFAULT_ORACLE_PROGRAM.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oracle: default_oracle(),
            oracle_command: default_oracle_command(),
            oracle_args: Vec::new(),
            lenient: false,
            seed: None,
            behavior: BehaviorConfig::default(),
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValueKind;

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("jfuzz-missing-{}.toml", uuid::Uuid::new_v4()));
        let cfg = Config::load_optional(&path);
        assert_eq!(cfg.oracle, OracleBackend::Command);
        assert_eq!(cfg.oracle_command, "radamsa");
        assert!(!cfg.lenient);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
oracle = "builtin"
seed = 42

[behavior]
text = 2.5
"#,
        )
        .expect("parse");
        assert_eq!(cfg.oracle, OracleBackend::Builtin);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.oracle_command, "radamsa");
        let weights = cfg.behavior.to_weights().expect("weights");
        assert_eq!(weights.weight(ValueKind::Text), 2.5);
        assert_eq!(weights.weight(ValueKind::Int), 10.0);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("jfuzz-bad-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "oracle = [").expect("write");
        let cfg = Config::load_optional(&path);
        assert_eq!(cfg.oracle, OracleBackend::Command);
        let _ = std::fs::remove_file(&path);
    }
}
