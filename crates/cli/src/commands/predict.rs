//! Prediction command, remote or against a local model directory

use anyhow::{Context, Result};
use risk_lib::{
    ArtifactFormat, ArtifactStore, Dispatcher, FeatureSchema, FeatureValues, FsBackend,
    ModelFamily, ModelResolver, PredictRequest, PredictResponse, Subject,
};
use std::path::Path;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::output::{print_info, print_json, print_warning, results_table, OutputFormat};

/// Parse a `Name=value` feature argument
pub fn parse_feature(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {arg:?}"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing feature name in {arg:?}"));
    }

    let value = value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid input for {name}. Please enter a number."))?;

    Ok((name.to_string(), value))
}

/// Where a prediction is computed
pub enum Target<'a> {
    Remote(&'a ApiClient),
    Local {
        model_dir: &'a Path,
        artifact_format: ArtifactFormat,
    },
}

pub async fn predict(
    target: Target<'_>,
    features: Vec<(String, f64)>,
    subject: Option<Subject>,
    format: OutputFormat,
) -> Result<()> {
    let features: FeatureValues = features.into_iter().collect();

    let (response, families) = match target {
        Target::Remote(client) => {
            let request = PredictRequest { features, subject };
            let response: PredictResponse = client.post("api/v1/predict", &request).await?;
            let families: Vec<ModelFamily> = response
                .results
                .records()
                .first()
                .map(|r| r.models.families().collect())
                .unwrap_or_default();
            (response, families)
        }
        Target::Local {
            model_dir,
            artifact_format,
        } => {
            let results = predict_local(model_dir, artifact_format, features)?;
            (PredictResponse { subject, results }, ModelFamily::ALL.to_vec())
        }
    };

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => {
            match &response.subject {
                Some(Subject { name, age: Some(age) }) => {
                    print_info(&format!("Prediction Results for {}, Age {}", name, age))
                }
                Some(Subject { name, age: None }) => {
                    print_info(&format!("Prediction Results for {}", name))
                }
                None => {}
            }
            println!("{}", results_table(&response.results, &families));

            let errors = response.results.outcomes().filter(|o| o.is_error()).count();
            if errors > 0 {
                print_warning(&format!("{} model(s) failed, see the Error cells", errors));
            }
        }
    }

    Ok(())
}

fn predict_local(
    model_dir: &Path,
    artifact_format: ArtifactFormat,
    features: FeatureValues,
) -> Result<risk_lib::ResultSet> {
    if !model_dir.is_dir() {
        print_warning(&format!(
            "Model directory {} does not exist, every model will be unavailable",
            model_dir.display()
        ));
    }

    let backend = Arc::new(FsBackend::new(model_dir));
    let store = Arc::new(ArtifactStore::new(backend.clone()));
    let dispatcher = Dispatcher::new(
        Arc::new(FeatureSchema::builtin()),
        ModelFamily::ALL.to_vec(),
        ModelResolver::new(backend, artifact_format),
        store,
    );

    dispatcher
        .predict(&features)
        .context("Cannot run prediction")
}
