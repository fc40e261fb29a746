//! Version metadata for the banner and `jfuzz --version`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: option_env!("JFUZZ_COMMIT").map(|s| s.to_string()),
    }
}

/// One-line banner written to stderr before every run.
pub fn banner() -> String {
    let info = version_info();
    match info.commit {
        Some(commit) => format!("jfuzz v{} ({commit})", info.version),
        None => format!("jfuzz v{}", info.version),
    }
}
