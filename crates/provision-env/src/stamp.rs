//! Provision stamp: records which requirement set an environment was built for.

use std::path::Path;

use chrono::Utc;
use provision_core::requirement::Requirement;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stamp file name inside the environment directory.
pub const STAMP_FILE: &str = ".provision-stamp.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// SHA-256 over the normalized, sorted requirement set.
    pub digest: String,
    pub requirements: Vec<Requirement>,
    /// RFC 3339 UTC timestamp of the successful install.
    pub installed_at: String,
}

impl Stamp {
    pub fn new(requirements: &[Requirement]) -> Self {
        Self {
            digest: requirements_digest(requirements),
            requirements: requirements.to_vec(),
            installed_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }

    pub fn write(&self, env_dir: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(env_dir.join(STAMP_FILE), json)
    }

    /// Read the stamp; `None` when absent or unreadable.
    pub fn read(env_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(env_dir.join(STAMP_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn matches(&self, requirements: &[Requirement]) -> bool {
        self.digest == requirements_digest(requirements)
    }
}

/// Order-insensitive digest of a requirement set.
pub fn requirements_digest(requirements: &[Requirement]) -> String {
    let mut lines: Vec<String> = requirements
        .iter()
        .map(|r| match r.version {
            Some(ref v) => format!("{}=={}", r.normalized_name(), v),
            None => r.normalized_name(),
        })
        .collect();
    lines.sort();
    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
