//! UDM Configuration
//!
//! YAML configuration of the UDM daemon, rooted at a `udm:` section:
//!
//! ```yaml
//! udm:
//!   sbi:
//!     address: 127.0.0.12
//!     port: 7777
//!   max_ue: 1024
//!   ee_subscription_id:
//!     min: 1
//!     max: 2147483647
//!   nrf: http://127.0.0.10:7777
//!   subscribers:
//!     - supi: imsi-001010000000001
//!       gpsis: [msisdn-0900000001]
//!       external_group_id: extgroupid-fleet
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{ContextError, UdmContext, UdmUe};
use crate::id_generator::{IdGenerator, DEFAULT_MAX_ID, DEFAULT_MIN_ID};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Context(#[from] ContextError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SbiConf {
    pub address: String,
    pub port: u16,
}

impl Default for SbiConf {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 7777,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdRangeConf {
    pub min: i64,
    pub max: i64,
}

impl Default for IdRangeConf {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ID,
            max: DEFAULT_MAX_ID,
        }
    }
}

/// Statically provisioned subscriber
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberConf {
    pub supi: String,
    #[serde(default)]
    pub gpsis: Vec<String>,
    #[serde(default)]
    pub external_group_id: Option<String>,
}

/// `udm:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdmConfig {
    pub sbi: SbiConf,
    pub max_ue: usize,
    pub ee_subscription_id: IdRangeConf,
    pub nf_instance_id: String,
    /// NRF URI; enables OAuth2 tokens on outbound notifications
    pub nrf: Option<String>,
    pub subscribers: Vec<SubscriberConf>,
}

impl Default for UdmConfig {
    fn default() -> Self {
        Self {
            sbi: SbiConf::default(),
            max_ue: 1024,
            ee_subscription_id: IdRangeConf::default(),
            nf_instance_id: uuid::Uuid::new_v4().to_string(),
            nrf: None,
            subscribers: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    udm: UdmConfig,
}

impl UdmConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(yaml)?;
        file.udm.validate()?;
        Ok(file.udm)
    }

    /// Load a configuration file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("Configuration file not found: {}", path.display());
            return Ok(Self::default());
        }

        log::info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ue == 0 {
            return Err(ConfigError::Validation("max_ue must be positive".into()));
        }
        if self.nf_instance_id.is_empty() {
            return Err(ConfigError::Validation("nf_instance_id is empty".into()));
        }
        let IdRangeConf { min, max } = self.ee_subscription_id;
        if min < 0 || min > max {
            return Err(ContextError::InvalidIdRange { min, max }.into());
        }
        if let Some(s) = self.subscribers.iter().find(|s| s.supi.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "subscriber without supi (gpsis={:?})",
                s.gpsis
            )));
        }
        let mut seen = HashSet::new();
        for subscriber in &self.subscribers {
            if let Some(gpsi) = subscriber.gpsis.iter().find(|g| !seen.insert(g.as_str())) {
                return Err(ConfigError::Validation(format!(
                    "gpsi {} provisioned more than once ({})",
                    gpsi, subscriber.supi
                )));
            }
        }
        Ok(())
    }

    /// Build the UE context registry and provision the configured subscribers
    pub fn build_context(&self) -> Result<UdmContext, ConfigError> {
        let IdRangeConf { min, max } = self.ee_subscription_id;
        let context = UdmContext::with_id_generator(self.max_ue, IdGenerator::new(min, max)?);

        for subscriber in &self.subscribers {
            let mut ue = UdmUe::new(&subscriber.supi);
            ue.gpsis = subscriber.gpsis.clone();
            ue.external_group_id = subscriber.external_group_id.clone();
            context.put(&subscriber.supi, ue)?;
        }
        if !self.subscribers.is_empty() {
            log::info!("{} subscribers provisioned", self.subscribers.len());
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
udm:
  sbi:
    address: 127.0.0.12
    port: 7778
  max_ue: 16
  ee_subscription_id:
    min: 100
    max: 101
  nf_instance_id: 7f8c6b0e-1111-4a4a-9b9b-000000000001
  nrf: http://127.0.0.10:7777
  subscribers:
    - supi: imsi-001010000000001
      gpsis: [msisdn-0900000001]
      external_group_id: extgroupid-fleet
    - supi: imsi-001010000000002
"#;

    #[test]
    fn test_from_yaml() {
        let config = UdmConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.sbi.address, "127.0.0.12");
        assert_eq!(config.sbi.port, 7778);
        assert_eq!(config.max_ue, 16);
        assert_eq!(config.ee_subscription_id, IdRangeConf { min: 100, max: 101 });
        assert_eq!(config.nrf.as_deref(), Some("http://127.0.0.10:7777"));
        assert_eq!(config.subscribers.len(), 2);
        assert!(config.subscribers[1].gpsis.is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = UdmConfig::from_yaml("udm: {}").unwrap();
        assert_eq!(config.sbi, SbiConf::default());
        assert_eq!(config.max_ue, 1024);
        assert_eq!(config.ee_subscription_id, IdRangeConf::default());
        assert!(uuid::Uuid::parse_str(&config.nf_instance_id).is_ok());

        let config = UdmConfig::from_yaml("logger: {level: info}").unwrap();
        assert_eq!(config.max_ue, 1024);
    }

    #[test]
    fn test_validation() {
        let err = UdmConfig::from_yaml("udm: {ee_subscription_id: {min: 5, max: 4}}").unwrap_err();
        assert!(matches!(err, ConfigError::Context(ContextError::InvalidIdRange { .. })));

        let err = UdmConfig::from_yaml("udm: {max_ue: 0}").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = UdmConfig::from_yaml("udm: {subscribers: [{gpsis: [msisdn-1]}]}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_) | ConfigError::Validation(_)));

        let err = UdmConfig::from_yaml(
            "udm: {subscribers: [{supi: imsi-1, gpsis: [msisdn-1]}, {supi: imsi-2, gpsis: [msisdn-1]}]}",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("msisdn-1")));

        assert!(matches!(
            UdmConfig::from_yaml("udm: [").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let config = UdmConfig::load("/nonexistent/nextgcore/udm.yaml").unwrap();
        assert_eq!(config.sbi.port, 7777);
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("udm-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, YAML).unwrap();
        let config = UdmConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.max_ue, 16);
    }

    #[test]
    fn test_build_context() {
        let config = UdmConfig::from_yaml(YAML).unwrap();
        let context = config.build_context().unwrap();

        assert_eq!(context.ue_count(), 2);
        assert_eq!(context.max_num_of_ue(), 16);
        assert_eq!(context.ee_subscription_ids().range(), (100, 101));

        let ue = context.find_by_gpsi("msisdn-0900000001").unwrap();
        let ue = crate::context::ue_read(&ue);
        assert_eq!(ue.supi, "imsi-001010000000001");
        assert!(ue.in_group("extgroupid-fleet"));
    }

    #[test]
    fn test_build_context_over_capacity() {
        let mut config = UdmConfig::from_yaml(YAML).unwrap();
        config.max_ue = 1;
        assert!(matches!(
            config.build_context(),
            Err(ConfigError::Context(ContextError::UeCapacity(1)))
        ));
    }
}
