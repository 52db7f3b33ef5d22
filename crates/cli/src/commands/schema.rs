//! Schema listing

use anyhow::Result;
use risk_lib::{FeatureSchema, ModelFamily, SchemaResponse};
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_info, print_json, print_table, OutputFormat};

/// Row for the schema table
#[derive(Tabled, Serialize)]
struct TargetRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Features")]
    features: String,
}

/// Schema from the server, or the built-in one without a client
pub async fn show_schema(client: Option<&ApiClient>, format: OutputFormat) -> Result<()> {
    let schema: SchemaResponse = match client {
        Some(client) => client.get("api/v1/schema").await?,
        None => {
            let builtin = FeatureSchema::builtin();
            SchemaResponse {
                targets: builtin.targets().to_vec(),
                features: builtin.features().to_vec(),
                families: ModelFamily::ALL.to_vec(),
            }
        }
    };

    match format {
        OutputFormat::Json => print_json(&schema),
        OutputFormat::Table => {
            let rows: Vec<TargetRow> = schema
                .targets
                .iter()
                .map(|t| TargetRow {
                    target: t.name.clone(),
                    features: t.features.join(", "),
                })
                .collect();
            print_table(&rows, format);

            let families: Vec<String> = schema.families.iter().map(|f| f.to_string()).collect();
            print_info(&format!("Features: {}", schema.features.join(", ")));
            print_info(&format!("Model families: {}", families.join(", ")));
        }
    }

    Ok(())
}
