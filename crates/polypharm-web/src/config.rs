//! Configuration loading for the interaction server.
//! Reads polypharm.toml from the current directory or the path in the
//! POLYPHARM_CONFIG env var; every field has a default so the server can
//! start with no file at all.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use polypharm_embed::EncoderConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub encoder: EncoderSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Paths of the three reference CSVs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_drug_info")]
    pub drug_info: String,
    #[serde(default = "default_structures")]
    pub structures: String,
    #[serde(default = "default_reports")]
    pub reports: String,
}

fn default_drug_info()  -> String { "data/drug_info.csv".to_string() }
fn default_structures() -> String { "data/DrugBankID2SMILES.csv".to_string() }
fn default_reports()    -> String { "data/combined.csv".to_string() }

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            drug_info: default_drug_info(),
            structures: default_structures(),
            reports: default_reports(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_radius")]
    pub fingerprint_radius: usize,
    #[serde(default = "default_bits")]
    pub fingerprint_bits: usize,
}

fn default_model_path() -> String { "data/interaction_model.txt".to_string() }
fn default_threshold()  -> f64    { 0.5 }
fn default_radius()     -> usize  { 2 }
fn default_bits()       -> usize  { 2048 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            threshold: default_threshold(),
            fingerprint_radius: default_radius(),
            fingerprint_bits: default_bits(),
        }
    }
}

/// Settings forwarded to the embedding backend. Pooling and
/// normalization are not configurable; the classifier was trained on raw
/// mean-pooled states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    #[serde(default = "default_encoder_model")]
    pub model_id: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "bool_true")]
    pub use_gpu: bool,
}

fn default_encoder_model() -> String { "seyonec/ChemBERTa-zinc-base-v1".to_string() }
fn default_max_length()    -> usize  { 512 }
fn default_batch_size()    -> usize  { 32 }
fn default_cache_size()    -> usize  { 10_000 }
fn bool_true()             -> bool   { true }

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            model_id: default_encoder_model(),
            max_length: default_max_length(),
            batch_size: default_batch_size(),
            cache_size: default_cache_size(),
            use_gpu: bool_true(),
        }
    }
}

impl EncoderSettings {
    pub fn to_encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            model_id: self.model_id.clone(),
            max_length: self.max_length,
            batch_size: self.batch_size,
            cache_size: self.cache_size,
            use_gpu: self.use_gpu,
            ..EncoderConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_group")]
    pub max_group_size: usize,
}

fn default_host()      -> String { "127.0.0.1".to_string() }
fn default_port()      -> u16    { 8080 }
fn default_max_group() -> usize  { 20 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_group_size: default_max_group(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {}:{}: {}", self.host, self.port, e))
    }
}

impl AppConfig {
    /// Load configuration from polypharm.toml.
    /// Checks POLYPHARM_CONFIG env var first, then the current directory;
    /// a missing default file means built-in defaults, a missing explicit
    /// path is an error.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("POLYPHARM_CONFIG") {
            Ok(path) => {
                if !Path::new(&path).exists() {
                    anyhow::bail!("Config file not found: {}", path);
                }
                Self::from_file(&path)
            }
            Err(_) => {
                let path = "polypharm.toml";
                if Path::new(path).exists() {
                    Self::from_file(path)
                } else {
                    info!("polypharm.toml not found, using built-in defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let config = AppConfig::default();
        assert_eq!(config.tables.drug_info, "data/drug_info.csv");
        assert_eq!(config.model.threshold, 0.5);
        assert_eq!(config.model.fingerprint_bits, 2048);
        assert_eq!(config.model.fingerprint_radius, 2);
        assert_eq!(config.encoder.model_id, "seyonec/ChemBERTa-zinc-base-v1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_group_size, 20);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: AppConfig = toml::from_str(
            "[server]\nport = 9000\n\n[model]\nthreshold = 0.7\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.model.threshold, 0.7);
        assert_eq!(config.model.fingerprint_bits, 2048);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let serialized = toml::to_string(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.tables.reports, "data/combined.csv");
        assert_eq!(parsed.encoder.max_length, 512);
        assert_eq!(parsed.model.threshold, 0.5);
    }

    #[test]
    fn bind_addr_parses_host_and_port() {
        let addr = ServerConfig::default().bind_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");

        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(bad.bind_addr().is_err());
    }

    #[test]
    fn encoder_settings_keep_the_trained_recipe() {
        let encoder = EncoderSettings::default().to_encoder_config();
        assert!(!encoder.normalize);
        assert!(matches!(
            encoder.pooling,
            polypharm_embed::PoolingStrategy::Mean
        ));
    }
}
