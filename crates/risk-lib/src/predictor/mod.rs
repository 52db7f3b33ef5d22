//! Classifier families and the artifacts they are loaded from

mod inference;
mod native;
mod output;

pub use inference::OnnxClassifier;
pub use native::{ForestModel, LinearSvmModel, LogisticModel, TreeNode, TreeModel};
pub use output::coerce_label;

use crate::error::PredictionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Trait for loaded binary classifiers
///
/// Implementations are immutable after construction and may be shared
/// across any number of concurrent requests.
pub trait Classifier: Send + Sync {
    /// Raw predicted label for one sample, features in the target's declared order
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError>;

    /// Short description of the runtime backing this classifier
    fn backend(&self) -> &'static str;
}

/// Classifier algorithm families trained for every target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelFamily {
    LogisticRegression,
    RandomForest,
    #[serde(rename = "SVM")]
    Svm,
}

impl ModelFamily {
    /// Every family, in reporting order
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::LogisticRegression,
        ModelFamily::RandomForest,
        ModelFamily::Svm,
    ];

    /// Name used in artifact keys and reports
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::LogisticRegression => "LogisticRegression",
            ModelFamily::RandomForest => "RandomForest",
            ModelFamily::Svm => "SVM",
        }
    }

    /// Decode a native JSON parameter file for this family
    fn decode_native(&self, bytes: &[u8]) -> Result<Arc<dyn Classifier>, String> {
        let handle: Arc<dyn Classifier> = match self {
            ModelFamily::LogisticRegression => Arc::new(LogisticModel::from_json(bytes)?),
            ModelFamily::RandomForest => Arc::new(ForestModel::from_json(bytes)?),
            ModelFamily::Svm => Arc::new(LinearSvmModel::from_json(bytes)?),
        };
        Ok(handle)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelFamily::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown model family: {s}"))
    }
}

/// On-disk artifact encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Classifier exported to ONNX, evaluated with tract
    #[default]
    Onnx,
    /// Family-specific JSON parameter file
    Json,
}

impl ArtifactFormat {
    /// File suffix appended to every artifact key
    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactFormat::Onnx => ".onnx",
            ArtifactFormat::Json => ".json",
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onnx" => Ok(ArtifactFormat::Onnx),
            "json" => Ok(ArtifactFormat::Json),
            other => Err(format!("unknown artifact format: {other}")),
        }
    }
}

/// Turn artifact bytes into a classifier handle
pub fn decode(
    family: ModelFamily,
    format: ArtifactFormat,
    bytes: &[u8],
) -> Result<Arc<dyn Classifier>, String> {
    match format {
        ArtifactFormat::Onnx => OnnxClassifier::new(bytes)
            .map(|c| Arc::new(c) as Arc<dyn Classifier>)
            .map_err(|e| format!("{e:#}")),
        ArtifactFormat::Json => family.decode_native(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names_round_trip_through_from_str() {
        for family in ModelFamily::ALL {
            assert_eq!(family.name().parse::<ModelFamily>().unwrap(), family);
        }
        assert_eq!("svm".parse::<ModelFamily>().unwrap(), ModelFamily::Svm);
        assert!("KNN".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn test_family_serializes_with_key_name() {
        let json = serde_json::to_string(&ModelFamily::Svm).unwrap();
        assert_eq!(json, "\"SVM\"");
    }

    #[test]
    fn test_decode_native_dispatches_on_family() {
        let bytes = br#"{"coefficients": [1.0], "intercept": -5.0}"#;
        let logistic = decode(ModelFamily::LogisticRegression, ArtifactFormat::Json, bytes).unwrap();
        assert_eq!(logistic.backend(), "logistic");
        let svm = decode(ModelFamily::Svm, ArtifactFormat::Json, bytes).unwrap();
        assert_eq!(svm.backend(), "linear-svm");
        assert!(decode(ModelFamily::RandomForest, ArtifactFormat::Json, bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage_onnx() {
        let err = decode(ModelFamily::RandomForest, ArtifactFormat::Onnx, b"not a model");
        assert!(err.is_err());
    }
}
