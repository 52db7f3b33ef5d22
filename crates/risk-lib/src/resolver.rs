//! Artifact naming for (target, model family) pairs
//!
//! Keys follow `<target>_<Family><suffix>`, e.g. `diabetes_RandomForest.onnx`,
//! so artifacts written by an independent training job are found without
//! any coordination beyond the name.

use crate::predictor::{ArtifactFormat, ModelFamily};
use crate::store::ArtifactBackend;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Storage key for one (target, family) artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModelKey {
    name: String,
    #[serde(skip)]
    family: ModelFamily,
    #[serde(skip)]
    format: ArtifactFormat,
}

impl ModelKey {
    pub fn new(target: &str, family: ModelFamily, format: ArtifactFormat) -> Self {
        Self {
            name: format!("{}_{}{}", target, family.name(), format.suffix()),
            family,
            format,
        }
    }

    /// Artifact name within the backend
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Resolves artifact keys and checks them against a backend
#[derive(Clone)]
pub struct ModelResolver {
    backend: Arc<dyn ArtifactBackend>,
    format: ArtifactFormat,
}

impl ModelResolver {
    pub fn new(backend: Arc<dyn ArtifactBackend>, format: ArtifactFormat) -> Self {
        Self { backend, format }
    }

    pub fn key(&self, target: &str, family: ModelFamily) -> ModelKey {
        ModelKey::new(target, family, self.format)
    }

    pub fn exists(&self, key: &ModelKey) -> bool {
        self.backend.exists(key.name())
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }
}

impl fmt::Debug for ModelResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelResolver")
            .field("backend", &self.backend.describe())
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    #[test]
    fn test_key_format() {
        let key = ModelKey::new("diabetes", ModelFamily::RandomForest, ArtifactFormat::Onnx);
        assert_eq!(key.name(), "diabetes_RandomForest.onnx");
        let key = ModelKey::new("hypertension", ModelFamily::Svm, ArtifactFormat::Json);
        assert_eq!(key.to_string(), "hypertension_SVM.json");
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = ModelKey::new("prediabetic", ModelFamily::LogisticRegression, ArtifactFormat::Onnx);
        let b = ModelKey::new("prediabetic", ModelFamily::LogisticRegression, ArtifactFormat::Onnx);
        assert_eq!(a, b);
    }

    #[test]
    fn test_exists_consults_backend() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("A_SVM.json", b"{}".to_vec());
        let resolver = ModelResolver::new(backend, ArtifactFormat::Json);

        assert!(resolver.exists(&resolver.key("A", ModelFamily::Svm)));
        assert!(!resolver.exists(&resolver.key("A", ModelFamily::RandomForest)));
        assert!(!resolver.exists(&resolver.key("B", ModelFamily::Svm)));
    }
}
