//! Prediction dispatcher
//!
//! Runs every configured model family against every target and assembles
//! a complete result table. Only missing input features fail a request;
//! an absent artifact or a failing classifier affects just its own cell.

use crate::error::{DispatchError, PredictionError};
use crate::models::{ModelOutcomes, Outcome, PredictionRecord, ResultSet};
use crate::observability::{CellTally, RiskMetrics, StructuredLogger};
use crate::predictor::{coerce_label, ModelFamily};
use crate::resolver::{ModelKey, ModelResolver};
use crate::schema::{FeatureSchema, TargetSpec};
use crate::store::ModelStore;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Availability of one (target, family) artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageEntry {
    pub target: String,
    pub family: ModelFamily,
    pub artifact: String,
    pub available: bool,
}

/// Artifact availability across every configured pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactCoverage {
    pub entries: Vec<CoverageEntry>,
}

impl ArtifactCoverage {
    pub fn available(&self) -> usize {
        self.entries.iter().filter(|e| e.available).count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Pairs without an artifact
    pub fn missing(&self) -> impl Iterator<Item = &CoverageEntry> {
        self.entries.iter().filter(|e| !e.available)
    }
}

/// Dispatches feature records to every (target, family) classifier
#[derive(Clone)]
pub struct Dispatcher {
    schema: Arc<FeatureSchema>,
    families: Vec<ModelFamily>,
    resolver: ModelResolver,
    store: Arc<dyn ModelStore>,
    metrics: RiskMetrics,
    logger: StructuredLogger,
}

impl Dispatcher {
    pub fn new(
        schema: Arc<FeatureSchema>,
        families: Vec<ModelFamily>,
        resolver: ModelResolver,
        store: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            schema,
            families,
            resolver,
            store,
            metrics: RiskMetrics::new(),
            logger: StructuredLogger::new("local"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn families(&self) -> &[ModelFamily] {
        &self.families
    }

    pub fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// Predict every target with every family
    ///
    /// Fails only when `values` lacks a schema feature; extra keys are ignored.
    pub fn predict(&self, values: &HashMap<String, f64>) -> Result<ResultSet, DispatchError> {
        let missing = self.schema.missing_features(|f| values.contains_key(f));
        if !missing.is_empty() {
            self.metrics.inc_rejected_requests();
            return Err(DispatchError::MissingFeatures(missing));
        }

        let start = Instant::now();
        let mut tally = CellTally::default();

        let records = self
            .schema
            .targets()
            .iter()
            .map(|target| self.predict_target(target, values, &mut tally))
            .collect();

        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        self.logger
            .log_prediction(self.schema.targets().len(), tally, elapsed.as_millis());

        Ok(ResultSet::new(records))
    }

    fn predict_target(
        &self,
        target: &TargetSpec,
        values: &HashMap<String, f64>,
        tally: &mut CellTally,
    ) -> PredictionRecord {
        // Feature order is the order the classifiers were trained on.
        let vector: Vec<f64> = target.features.iter().map(|f| values[f]).collect();

        let cells = self
            .families
            .iter()
            .map(|&family| {
                let key = self.resolver.key(&target.name, family);
                let outcome = self.evaluate_cell(&key, &vector);

                match &outcome {
                    Outcome::Label(_) => tally.predicted += 1,
                    Outcome::NotAvailable => tally.not_available += 1,
                    Outcome::Error(msg) => {
                        tally.errors += 1;
                        self.logger
                            .log_cell_failure(&target.name, family.name(), key.name(), msg);
                    }
                }
                self.metrics.inc_cell_outcome(family.name(), outcome.kind());

                (family, outcome)
            })
            .collect();

        PredictionRecord {
            target: target.name.clone(),
            models: ModelOutcomes::new(cells),
        }
    }

    fn evaluate_cell(&self, key: &ModelKey, vector: &[f64]) -> Outcome {
        let handle = match self.store.try_load(key) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                debug!(artifact = %key, "No artifact for cell");
                return Outcome::NotAvailable;
            }
            Err(e) => return Outcome::Error(e.to_string()),
        };

        let raw = panic::catch_unwind(AssertUnwindSafe(|| handle.predict(vector)))
            .unwrap_or_else(|_| Err(PredictionError::Inference("classifier panicked".to_string())));

        match raw.and_then(coerce_label) {
            Ok(label) => Outcome::Label(label),
            Err(e) => Outcome::Error(e.to_string()),
        }
    }

    /// Which (target, family) artifacts currently exist
    pub fn coverage(&self) -> ArtifactCoverage {
        let entries = self
            .schema
            .targets()
            .iter()
            .flat_map(|target| {
                self.families.iter().map(move |&family| {
                    let key = self.resolver.key(&target.name, family);
                    CoverageEntry {
                        target: target.name.clone(),
                        family,
                        available: self.resolver.exists(&key),
                        artifact: key.name().to_string(),
                    }
                })
            })
            .collect::<Vec<_>>();

        let coverage = ArtifactCoverage { entries };
        self.metrics
            .set_artifact_coverage(coverage.available() as i64, coverage.total() as i64);
        coverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::predictor::{ArtifactFormat, Classifier};
    use crate::store::{ArtifactStore, MemoryBackend, PredictorHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(f64);

    impl Classifier for Fixed {
        fn predict(&self, _features: &[f64]) -> Result<f64, PredictionError> {
            Ok(self.0)
        }

        fn backend(&self) -> &'static str {
            "fixed"
        }
    }

    struct Panics;

    impl Classifier for Panics {
        fn predict(&self, _features: &[f64]) -> Result<f64, PredictionError> {
            panic!("boom")
        }

        fn backend(&self) -> &'static str {
            "panics"
        }
    }

    /// Store that serves fixed handles and counts lookups
    #[derive(Default)]
    struct FakeStore {
        handles: HashMap<String, PredictorHandle>,
        broken: Vec<String>,
        lookups: AtomicUsize,
    }

    impl ModelStore for FakeStore {
        fn try_load(&self, key: &ModelKey) -> Result<Option<PredictorHandle>, LoadError> {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            if self.broken.iter().any(|b| b == key.name()) {
                return Err(LoadError::Decode {
                    key: key.name().to_string(),
                    reason: "truncated".to_string(),
                });
            }
            Ok(self.handles.get(key.name()).cloned())
        }
    }

    fn small_schema() -> Arc<FeatureSchema> {
        Arc::new(
            FeatureSchema::new(vec![
                TargetSpec::new("A", ["g", "b"]),
                TargetSpec::new("B", ["g"]),
            ])
            .unwrap(),
        )
    }

    const M1: ModelFamily = ModelFamily::LogisticRegression;
    const M2: ModelFamily = ModelFamily::RandomForest;

    fn dispatcher(store: Arc<dyn ModelStore>) -> Dispatcher {
        let resolver = ModelResolver::new(Arc::new(MemoryBackend::new()), ArtifactFormat::Json);
        Dispatcher::new(small_schema(), vec![M1, M2], resolver, store)
    }

    fn input(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_only_one_artifact_present() {
        let mut store = FakeStore::default();
        store
            .handles
            .insert("A_LogisticRegression.json".into(), Arc::new(Fixed(1.0)));
        let dispatcher = dispatcher(Arc::new(store));

        let results = dispatcher.predict(&input(&[("g", 120.0), ("b", 80.0)])).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results.records()[0].target, "A");
        assert_eq!(results.cell("A", M1), Some(&Outcome::Label(1)));
        assert_eq!(results.cell("A", M2), Some(&Outcome::NotAvailable));
        assert_eq!(results.cell("B", M1), Some(&Outcome::NotAvailable));
        assert_eq!(results.cell("B", M2), Some(&Outcome::NotAvailable));
    }

    #[test]
    fn test_missing_feature_fails_before_dispatch() {
        let store = Arc::new(FakeStore::default());
        let dispatcher = dispatcher(store.clone());

        let err = dispatcher.predict(&input(&[("g", 120.0)])).unwrap_err();

        assert_eq!(err, DispatchError::MissingFeatures(vec!["b".to_string()]));
        assert_eq!(store.lookups.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_extra_features_ignored() {
        let dispatcher = dispatcher(Arc::new(FakeStore::default()));
        let results = dispatcher
            .predict(&input(&[("g", 1.0), ("b", 2.0), ("unused", 3.0)]))
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_load_error_isolated_to_cell() {
        let mut store = FakeStore::default();
        store.broken.push("A_RandomForest.json".into());
        store
            .handles
            .insert("A_LogisticRegression.json".into(), Arc::new(Fixed(0.0)));
        store
            .handles
            .insert("B_RandomForest.json".into(), Arc::new(Fixed(1.0)));
        let dispatcher = dispatcher(Arc::new(store));

        let results = dispatcher.predict(&input(&[("g", 1.0), ("b", 2.0)])).unwrap();

        assert!(results.cell("A", M2).unwrap().is_error());
        assert_eq!(results.cell("A", M1), Some(&Outcome::Label(0)));
        assert_eq!(results.cell("B", M2), Some(&Outcome::Label(1)));
    }

    #[test]
    fn test_invocation_failures_isolated_to_cell() {
        let mut store = FakeStore::default();
        store
            .handles
            .insert("A_LogisticRegression.json".into(), Arc::new(Panics));
        store
            .handles
            .insert("A_RandomForest.json".into(), Arc::new(Fixed(3.0)));
        store
            .handles
            .insert("B_LogisticRegression.json".into(), Arc::new(Fixed(1.0)));
        let dispatcher = dispatcher(Arc::new(store));

        let results = dispatcher.predict(&input(&[("g", 1.0), ("b", 2.0)])).unwrap();

        assert_eq!(
            results.cell("A", M1),
            Some(&Outcome::Error("inference failed: classifier panicked".to_string()))
        );
        assert_eq!(
            results.cell("A", M2),
            Some(&Outcome::Error("model produced non-binary label 3".to_string()))
        );
        assert_eq!(results.cell("B", M1), Some(&Outcome::Label(1)));
    }

    #[test]
    fn test_projection_preserves_declared_order() {
        let backend = Arc::new(MemoryBackend::new());
        // positive only when g > b: weights (1, -1) applied to (g, b)
        backend.insert(
            "A_LogisticRegression.json",
            br#"{"coefficients": [1.0, -1.0], "intercept": 0.0}"#.to_vec(),
        );
        let resolver = ModelResolver::new(backend.clone(), ArtifactFormat::Json);
        let store = Arc::new(ArtifactStore::new(backend));
        let dispatcher = Dispatcher::new(small_schema(), vec![M1], resolver, store);

        let results = dispatcher.predict(&input(&[("g", 120.0), ("b", 80.0)])).unwrap();
        assert_eq!(results.cell("A", M1), Some(&Outcome::Label(1)));

        let results = dispatcher.predict(&input(&[("g", 80.0), ("b", 120.0)])).unwrap();
        assert_eq!(results.cell("A", M1), Some(&Outcome::Label(0)));
    }

    #[test]
    fn test_every_record_has_every_family() {
        let dispatcher = Dispatcher::new(
            Arc::new(FeatureSchema::builtin()),
            ModelFamily::ALL.to_vec(),
            ModelResolver::new(Arc::new(MemoryBackend::new()), ArtifactFormat::Onnx),
            Arc::new(FakeStore::default()),
        );
        let results = dispatcher
            .predict(&input(&[("Glucose", 120.0), ("BloodPressure", 80.0), ("Insulin", 15.0)]))
            .unwrap();

        assert_eq!(results.len(), 4);
        for record in &results {
            let families: Vec<_> = record.models.families().collect();
            assert_eq!(families, ModelFamily::ALL);
        }
    }

    #[test]
    fn test_coverage_reports_existing_artifacts() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("B_RandomForest.json", b"{}".to_vec());
        let resolver = ModelResolver::new(backend.clone(), ArtifactFormat::Json);
        let dispatcher = Dispatcher::new(
            small_schema(),
            vec![M1, M2],
            resolver,
            Arc::new(ArtifactStore::new(backend)),
        );

        let coverage = dispatcher.coverage();
        assert_eq!(coverage.total(), 4);
        assert_eq!(coverage.available(), 1);
        assert_eq!(coverage.missing().count(), 3);
        assert!(coverage
            .entries
            .iter()
            .any(|e| e.artifact == "B_RandomForest.json" && e.available));
    }
}
