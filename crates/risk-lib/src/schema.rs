//! Feature schema: which measurements each target condition needs
//!
//! The schema is fixed once built. The derived feature union is sorted and
//! deduplicated and is what the input form is generated from.

use crate::error::SchemaError;
use crate::predictor::ModelFamily;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Feature names used by the built-in schema
pub mod feature {
    pub const GLUCOSE: &str = "Glucose";
    pub const BLOOD_PRESSURE: &str = "BloodPressure";
    pub const INSULIN: &str = "Insulin";
}

/// Target condition names used by the built-in schema
pub mod target {
    pub const PREDIABETIC: &str = "prediabetic";
    pub const DIABETES: &str = "diabetes";
    pub const PREHYPERTENSION: &str = "prehypertension";
    pub const HYPERTENSION: &str = "hypertension";
}

/// A condition and the ordered features its classifiers were trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub features: Vec<String>,
}

impl TargetSpec {
    pub fn new<I, S>(name: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            features: features.into_iter().map(Into::into).collect(),
        }
    }
}

/// Static target-to-feature registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    targets: Vec<TargetSpec>,
    features: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or ambiguous target definitions
    pub fn new(targets: Vec<TargetSpec>) -> Result<Self, SchemaError> {
        if targets.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen_targets = HashSet::new();
        for spec in &targets {
            if !seen_targets.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateTarget(spec.name.clone()));
            }
            if spec.features.is_empty() {
                return Err(SchemaError::NoFeatures(spec.name.clone()));
            }
            let mut seen_features = HashSet::new();
            for feature in &spec.features {
                if !seen_features.insert(feature.as_str()) {
                    return Err(SchemaError::DuplicateFeature {
                        target: spec.name.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }

        let features = targets
            .iter()
            .flat_map(|t| t.features.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self { targets, features })
    }

    /// The four conditions served by default
    pub fn builtin() -> Self {
        use feature::*;

        let targets = vec![
            TargetSpec::new(target::PREDIABETIC, [GLUCOSE, BLOOD_PRESSURE, INSULIN]),
            TargetSpec::new(target::DIABETES, [GLUCOSE, INSULIN]),
            TargetSpec::new(target::PREHYPERTENSION, [BLOOD_PRESSURE, INSULIN]),
            TargetSpec::new(target::HYPERTENSION, [BLOOD_PRESSURE, GLUCOSE]),
        ];

        Self::new(targets).unwrap_or_else(|e| unreachable!("built-in schema is valid: {e}"))
    }

    /// Targets in declaration order
    pub fn targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    pub fn target(&self, name: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Sorted union of every target's features
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Union features for which `has` returns false, in sorted order
    pub fn missing_features(&self, has: impl Fn(&str) -> bool) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| !has(f.as_str()))
            .cloned()
            .collect()
    }
}

/// Reject an empty family list or a family listed twice
///
/// Each family becomes one cell per target, so duplicates would produce
/// two cells under the same key.
pub fn validate_families(families: &[ModelFamily]) -> Result<(), SchemaError> {
    if families.is_empty() {
        return Err(SchemaError::NoFamilies);
    }

    let mut seen = HashSet::new();
    for family in families {
        if !seen.insert(*family) {
            return Err(SchemaError::DuplicateFamily(family.name().to_string()));
        }
    }
    Ok(())
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_families() {
        assert_eq!(validate_families(&ModelFamily::ALL), Ok(()));
        assert_eq!(validate_families(&[]), Err(SchemaError::NoFamilies));
        assert_eq!(
            validate_families(&[ModelFamily::Svm, ModelFamily::RandomForest, ModelFamily::Svm]),
            Err(SchemaError::DuplicateFamily("SVM".to_string()))
        );
    }

    #[test]
    fn test_builtin_feature_union_sorted() {
        let schema = FeatureSchema::builtin();
        assert_eq!(schema.features(), ["BloodPressure", "Glucose", "Insulin"]);
    }

    #[test]
    fn test_builtin_declaration_order() {
        let schema = FeatureSchema::builtin();
        let names: Vec<_> = schema.targets().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            ["prediabetic", "diabetes", "prehypertension", "hypertension"]
        );
        assert_eq!(
            schema.target("hypertension").unwrap().features,
            ["BloodPressure", "Glucose"]
        );
    }

    #[test]
    fn test_union_deduplicates() {
        let schema = FeatureSchema::new(vec![
            TargetSpec::new("A", ["g", "b"]),
            TargetSpec::new("B", ["g"]),
        ])
        .unwrap();
        assert_eq!(schema.features(), ["b", "g"]);
    }

    #[test]
    fn test_rejects_invalid_schemas() {
        assert_eq!(FeatureSchema::new(vec![]), Err(SchemaError::Empty));
        assert_eq!(
            FeatureSchema::new(vec![TargetSpec::new("A", Vec::<String>::new())]),
            Err(SchemaError::NoFeatures("A".into()))
        );
        assert_eq!(
            FeatureSchema::new(vec![TargetSpec::new("A", ["x"]), TargetSpec::new("A", ["y"])]),
            Err(SchemaError::DuplicateTarget("A".into()))
        );
        assert!(matches!(
            FeatureSchema::new(vec![TargetSpec::new("A", ["x", "x"])]),
            Err(SchemaError::DuplicateFeature { .. })
        ));
    }

    #[test]
    fn test_missing_features() {
        let schema = FeatureSchema::builtin();
        let missing = schema.missing_features(|f| f == "Glucose");
        assert_eq!(missing, ["BloodPressure", "Insulin"]);
    }
}
