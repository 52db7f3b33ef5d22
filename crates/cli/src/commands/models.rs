//! Model artifact coverage and cache refresh

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, ModelsResponse, RefreshResponse};
use crate::output::{color_status, print_info, print_json, print_success, print_table, print_warning, OutputFormat};

/// Row for the coverage table
#[derive(Tabled, Serialize)]
struct CoverageRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Artifact")]
    artifact: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Loaded")]
    loaded: String,
}

/// Show which artifacts exist and which are cached
pub async fn show_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let models: ModelsResponse = client.get("api/v1/models").await?;

    if let OutputFormat::Json = format {
        print_json(&models);
        return Ok(());
    }

    let rows: Vec<CoverageRow> = models
        .coverage
        .entries
        .iter()
        .map(|e| {
            let cached = models.cached.iter().find(|c| c.name == e.artifact);
            CoverageRow {
                target: e.target.clone(),
                family: e.family.clone(),
                artifact: e.artifact.clone(),
                available: color_status(if e.available { "yes" } else { "no" }),
                loaded: cached.map(|c| c.backend.clone()).unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();
    print_table(&rows, format);

    let summary = format!(
        "{}/{} {} artifacts available, {} loaded",
        models.available,
        models.total,
        models.artifact_format,
        models.cached.len()
    );
    if models.available < models.total {
        print_warning(&summary);
    } else {
        print_info(&summary);
    }

    Ok(())
}

/// Ask the server to drop cached models whose artifacts changed
pub async fn refresh_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: RefreshResponse = client
        .post("api/v1/models/refresh", &serde_json::json!({}))
        .await?;

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => print_success(&format!(
            "Invalidated {} cached model(s), {} still cached",
            response.invalidated, response.cached
        )),
    }

    Ok(())
}
