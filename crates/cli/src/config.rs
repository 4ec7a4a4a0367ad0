//! Configuration management for the CLI

use advisor_lib::CloudProfile;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Advisor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Cloud profiles available to `--profile`
    #[serde(default)]
    pub profiles: Vec<CloudProfile>,

    /// Ercole inventory exports
    #[serde(default)]
    pub ercole: ErcoleConfig,

    /// Timeout for each provider HTTP call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Offline inventory snapshot used instead of the OCI APIs
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErcoleConfig {
    pub databases_path: Option<PathBuf>,
    pub active_databases_path: Option<PathBuf>,
}

fn default_request_timeout() -> u64 {
    30
}

impl AdvisorConfig {
    /// Load configuration from a file and `ADVISOR_*` environment variables.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(config::File::from(default).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("ADVISOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// `~/.config/oci-advisor/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("oci-advisor").join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
request_timeout_secs = 10
snapshot_path = "/var/lib/advisor/snapshot.json"

[ercole]
databases_path = "/var/lib/ercole/databases.json"

[[profiles]]
id = "prod"
tenancy_id = "ocid1.tenancy.oc1..aaa"
user_id = "ocid1.user.oc1..bbb"
key_fingerprint = "aa:bb:cc"
region = "eu-frankfurt-1"
private_key_path = "/etc/advisor/prod.pem"
"#
        )
        .unwrap();

        let config = AdvisorConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.profiles[0].id, "prod");
        assert_eq!(config.profiles[0].region, "eu-frankfurt-1");
        assert_eq!(
            config.ercole.databases_path,
            Some(PathBuf::from("/var/lib/ercole/databases.json"))
        );
        assert!(config.ercole.active_databases_path.is_none());
        assert!(config.snapshot_path.is_some());
    }

    #[test]
    fn test_defaults_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{}}").unwrap();

        let config = AdvisorConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.profiles.is_empty());
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AdvisorConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
