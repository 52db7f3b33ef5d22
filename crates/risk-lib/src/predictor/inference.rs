//! ONNX classifier inference using tract
//!
//! Artifacts are classifiers exported to ONNX (for scikit-learn models,
//! `skl2onnx` with `zipmap=False`). The first model output is read as the
//! predicted label. Input width is only known once a target's feature
//! vector arrives, so a runnable plan is built per width on first use and
//! cached.

use super::Classifier;
use crate::error::PredictionError;
use anyhow::{Context, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: InferenceModel,
    plans: DashMap<usize, Arc<TractModel>>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl OnnxClassifier {
    /// Parse an ONNX model from bytes
    pub fn new(model_bytes: &[u8]) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;

        Ok(Self {
            model,
            plans: DashMap::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    /// Fix the input shape to `[1, width]` and optimize
    fn build_plan(&self, width: usize) -> Result<TractModel> {
        let plan = self
            .model
            .clone()
            .with_input_fact(0, f32::fact([1, width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(plan)
    }

    fn plan_for(&self, width: usize) -> Result<Arc<TractModel>> {
        if let Some(plan) = self.plans.get(&width) {
            return Ok(plan.clone());
        }
        let plan = Arc::new(self.build_plan(width)?);
        debug!(width, "Built inference plan");
        Ok(self.plans.entry(width).or_insert(plan).clone())
    }

    fn features_to_tensor(features: &[f64]) -> Result<Tensor> {
        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, features.len()), data)
            .context("Failed to shape feature vector")?;
        Ok(array.into())
    }

    fn run(&self, features: &[f64]) -> Result<f64> {
        let plan = self.plan_for(features.len())?;
        let input = Self::features_to_tensor(features)?;

        let result = plan.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;

        let labels = output
            .cast_to::<f64>()
            .context("Model label output is not numeric")?;
        let label = labels
            .as_slice::<f64>()?
            .first()
            .copied()
            .context("Model produced an empty label tensor")?;
        Ok(label)
    }

    /// Number of completed inferences
    pub fn inference_count(&self) -> u64 {
        self.inference_count.load(Ordering::Relaxed)
    }

    /// Number of inferences slower than the latency target
    pub fn slow_inference_count(&self) -> u64 {
        self.slow_inference_count.load(Ordering::Relaxed)
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let start = Instant::now();

        let label = self
            .run(features)
            .map_err(|e| PredictionError::Inference(format!("{e:#}")))?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(label)
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }
}
