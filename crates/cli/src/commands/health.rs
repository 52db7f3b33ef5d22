//! Server health and readiness

use anyhow::Result;
use risk_lib::{HealthResponse, ReadinessResponse};
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

/// Row for the component table
#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Serialize)]
struct HealthReport {
    health: HealthResponse,
    readiness: ReadinessResponse,
}

fn status_name<T: Serialize>(status: &T) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResponse = client.get_any_status("healthz").await?;
    let readiness: ReadinessResponse = client.get_any_status("readyz").await?;

    if let OutputFormat::Json = format {
        print_json(&HealthReport { health, readiness });
        return Ok(());
    }

    let mut rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: color_status(&status_name(&component.status)),
            message: component.message.clone().unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    println!(
        "Server {}: {}",
        client.base_url(),
        color_status(&status_name(&health.status))
    );
    print_table(&rows, format);

    if readiness.ready {
        println!("Readiness: {}", color_status("ready"));
    } else {
        print_warning(&format!(
            "Not ready: {}",
            readiness.reason.unwrap_or_else(|| "unknown".to_string())
        ));
    }

    Ok(())
}
