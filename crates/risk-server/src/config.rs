//! Server configuration

use anyhow::{Context, Result};
use risk_lib::{schema::validate_families, ArtifactFormat, FeatureSchema, ModelFamily, TargetSpec};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP port for the form, API, health and metrics
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `<target>_<Family>.<suffix>` artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Artifact encoding, `onnx` or `json`
    #[serde(default)]
    pub artifact_format: ArtifactFormat,

    /// Invalidate cached models when their files change
    #[serde(default = "default_watch_models")]
    pub watch_models: bool,

    /// Model families to evaluate, in reporting order
    #[serde(default = "default_families")]
    pub families: Vec<ModelFamily>,

    /// Override of the built-in target schema
    #[serde(default)]
    pub targets: Option<Vec<TargetSpec>>,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_port() -> u16 {
    8080
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_watch_models() -> bool {
    true
}

fn default_families() -> Vec<ModelFamily> {
    ModelFamily::ALL.to_vec()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            port: default_port(),
            model_dir: default_model_dir(),
            artifact_format: ArtifactFormat::default(),
            watch_models: default_watch_models(),
            families: default_families(),
            targets: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional file (`RISK_CONFIG`) and `RISK_*` environment variables
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var("RISK_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("RISK"))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// The configured schema, validated
    pub fn schema(&self) -> Result<FeatureSchema> {
        match &self.targets {
            Some(targets) => FeatureSchema::new(targets.clone()).context("Invalid target schema"),
            None => Ok(FeatureSchema::builtin()),
        }
    }

    /// The configured model families, validated
    pub fn families(&self) -> Result<Vec<ModelFamily>> {
        validate_families(&self.families).context("Invalid model family list")?;
        Ok(self.families.clone())
    }
}
