//! Validation of raw form input into feature records

use crate::error::InputError;
use crate::models::Subject;
use crate::schema::FeatureSchema;
use std::collections::HashMap;

/// Form field carrying the subject's name
pub const NAME_FIELD: &str = "name";
/// Form field carrying the subject's age
pub const AGE_FIELD: &str = "age";

/// Numeric feature values keyed by feature name
pub type FeatureValues = HashMap<String, f64>;

/// A feature record that covers every feature of the schema it was built for
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    values: FeatureValues,
}

impl FeatureRecord {
    /// Parse every schema feature from raw string fields, in schema order
    ///
    /// Fields that are not schema features are ignored.
    pub fn from_form(schema: &FeatureSchema, fields: &HashMap<String, String>) -> Result<Self, InputError> {
        let mut values = FeatureValues::with_capacity(schema.features().len());

        for feature in schema.features() {
            let raw = fields
                .get(feature)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| InputError::Missing(feature.clone()))?;

            let value = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| InputError::InvalidNumber {
                    feature: feature.clone(),
                    value: raw.to_string(),
                })?;

            values.insert(feature.clone(), value);
        }

        Ok(Self { values })
    }

    pub fn values(&self) -> &FeatureValues {
        &self.values
    }

    pub fn into_values(self) -> FeatureValues {
        self.values
    }
}

/// Optional name/age fields from the form
pub fn subject_from_form(fields: &HashMap<String, String>) -> Result<Option<Subject>, InputError> {
    let name = match fields.get(NAME_FIELD).map(|s| s.trim()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Ok(None),
    };

    let age = match fields.get(AGE_FIELD).map(|s| s.trim()) {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<u32>().map_err(|_| InputError::InvalidNumber {
            feature: AGE_FIELD.to_string(),
            value: raw.to_string(),
        })?),
        _ => None,
    };

    Ok(Some(Subject { name, age }))
}
