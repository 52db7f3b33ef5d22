//! Core data models for risk prediction results
//!
//! On the wire a cell is `0`, `1`, `"not_available"` or
//! `{"error": "..."}`, and a record's models are a JSON object keyed by
//! family name in family declaration order. The request/response bodies of
//! the HTTP API live here too so the server and CLI share them.

use crate::predictor::ModelFamily;
use crate::schema::TargetSpec;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

const NOT_AVAILABLE: &str = "not_available";

/// Outcome of one (target, family) cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Binary prediction, 0 or 1
    Label(u8),
    /// No artifact exists for this pair
    NotAvailable,
    /// The artifact exists but loading or inference failed
    Error(String),
}

impl Outcome {
    pub fn label(&self) -> Option<u8> {
        match self {
            Outcome::Label(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    /// Metric/log label for this kind of outcome
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Label(_) => "predicted",
            Outcome::NotAvailable => NOT_AVAILABLE,
            Outcome::Error(_) => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Label(1) => f.write_str("Yes (1)"),
            Outcome::Label(_) => f.write_str("No (0)"),
            Outcome::NotAvailable => f.write_str("Model not found"),
            Outcome::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Label(v) => serializer.serialize_u8(*v),
            Outcome::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
            Outcome::Error(msg) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", msg)?;
                map.end()
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OutcomeWire {
    Label(u8),
    Marker(String),
    Error { error: String },
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match OutcomeWire::deserialize(deserializer)? {
            OutcomeWire::Label(v @ (0 | 1)) => Ok(Outcome::Label(v)),
            OutcomeWire::Label(v) => Err(de::Error::custom(format!("non-binary label {v}"))),
            OutcomeWire::Marker(m) if m == NOT_AVAILABLE => Ok(Outcome::NotAvailable),
            OutcomeWire::Marker(m) => Err(de::Error::custom(format!("unknown outcome {m:?}"))),
            OutcomeWire::Error { error } => Ok(Outcome::Error(error)),
        }
    }
}

/// Per-family outcomes of one target, in family declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelOutcomes(Vec<(ModelFamily, Outcome)>);

impl ModelOutcomes {
    pub fn new(cells: Vec<(ModelFamily, Outcome)>) -> Self {
        Self(cells)
    }

    pub fn get(&self, family: ModelFamily) -> Option<&Outcome> {
        self.0.iter().find(|(f, _)| *f == family).map(|(_, o)| o)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelFamily, &Outcome)> {
        self.0.iter().map(|(f, o)| (*f, o))
    }

    pub fn families(&self) -> impl Iterator<Item = ModelFamily> + '_ {
        self.0.iter().map(|(f, _)| *f)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ModelOutcomes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (family, outcome) in &self.0 {
            map.serialize_entry(family, outcome)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ModelOutcomes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OutcomesVisitor;

        impl<'de> Visitor<'de> for OutcomesVisitor {
            type Value = ModelOutcomes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of model family to outcome")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut cells = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((family, outcome)) = access.next_entry::<ModelFamily, Outcome>()? {
                    cells.push((family, outcome));
                }
                Ok(ModelOutcomes(cells))
            }
        }

        deserializer.deserialize_map(OutcomesVisitor)
    }
}

/// One target's row of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub target: String,
    pub models: ModelOutcomes,
}

impl PredictionRecord {
    pub fn outcome(&self, family: ModelFamily) -> Option<&Outcome> {
        self.models.get(family)
    }
}

/// Every target's record, in target declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: Vec<PredictionRecord>,
}

impl ResultSet {
    pub fn new(records: Vec<PredictionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn record(&self, target: &str) -> Option<&PredictionRecord> {
        self.records.iter().find(|r| r.target == target)
    }

    /// Outcome of a single cell
    pub fn cell(&self, target: &str, family: ModelFamily) -> Option<&Outcome> {
        self.record(target).and_then(|r| r.outcome(family))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PredictionRecord> {
        self.records.iter()
    }

    /// All cell outcomes across every record
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.records.iter().flat_map(|r| r.models.iter().map(|(_, o)| o))
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a PredictionRecord;
    type IntoIter = std::slice::Iter<'a, PredictionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Who the prediction is for; display only, never passed to a classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// Body of `POST /api/v1/predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: HashMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
}

/// Response of `POST /api/v1/predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    pub results: ResultSet,
}

/// Response of `GET /api/v1/schema`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub targets: Vec<TargetSpec>,
    pub features: Vec<String>,
    pub families: Vec<ModelFamily>,
}

/// Error body for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultSet {
        ResultSet::new(vec![PredictionRecord {
            target: "diabetes".to_string(),
            models: ModelOutcomes::new(vec![
                (ModelFamily::LogisticRegression, Outcome::Label(1)),
                (ModelFamily::RandomForest, Outcome::NotAvailable),
                (ModelFamily::Svm, Outcome::Error("shape".to_string())),
            ]),
        }])
    }

    #[test]
    fn test_result_set_wire_format() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!([{
                "target": "diabetes",
                "models": {
                    "LogisticRegression": 1,
                    "RandomForest": "not_available",
                    "SVM": {"error": "shape"}
                }
            }])
        );
    }

    #[test]
    fn test_models_keep_family_order() {
        let text = serde_json::to_string(&sample()).unwrap();
        let lr = text.find("LogisticRegression").unwrap();
        let rf = text.find("RandomForest").unwrap();
        let svm = text.find("SVM").unwrap();
        assert!(lr < rf && rf < svm);
    }

    #[test]
    fn test_result_set_parses_back() {
        let text = serde_json::to_string(&sample()).unwrap();
        let parsed: ResultSet = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_outcome_rejects_unknown_values() {
        assert!(serde_json::from_value::<Outcome>(json!(2)).is_err());
        assert!(serde_json::from_value::<Outcome>(json!("maybe")).is_err());
    }

    #[test]
    fn test_outcome_display_matches_result_page() {
        assert_eq!(Outcome::Label(1).to_string(), "Yes (1)");
        assert_eq!(Outcome::Label(0).to_string(), "No (0)");
        assert_eq!(Outcome::NotAvailable.to_string(), "Model not found");
    }

    #[test]
    fn test_cell_lookup() {
        let results = sample();
        assert_eq!(
            results.cell("diabetes", ModelFamily::LogisticRegression),
            Some(&Outcome::Label(1))
        );
        assert_eq!(results.cell("hypertension", ModelFamily::Svm), None);
        assert_eq!(results.outcomes().filter(|o| o.is_error()).count(), 1);
    }
}
