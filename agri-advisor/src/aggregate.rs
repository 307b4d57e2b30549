//! Multi-model result aggregation
//!
//! Backends differ in which per-model fields they return. Anything missing
//! renders as [`NOT_AVAILABLE`]; this is the expected shape of a partial
//! response, not an error.

use crate::catalog::{Catalog, CatalogEntry};
use crate::transport::TransportError;
use serde_json::Value;
use std::collections::HashMap;

/// Placeholder shown for an absent per-model field
pub const NOT_AVAILABLE: &str = "N/A";

/// One model column of a view's breakdown table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSlot {
    /// Response key (`xgb`, `rf`, ...)
    pub key: &'static str,
    pub display_name: &'static str,
}

pub const CROP_MODELS: &[ModelSlot] = &[
    ModelSlot { key: "xgb", display_name: "XGBoost" },
    ModelSlot { key: "rf", display_name: "Random Forest" },
    ModelSlot { key: "knn", display_name: "KNN" },
];

pub const FERTILIZER_MODELS: &[ModelSlot] = &[
    ModelSlot { key: "xgb", display_name: "XGBoost" },
    ModelSlot { key: "rf", display_name: "Random Forest" },
    ModelSlot { key: "svm", display_name: "SVM" },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
    pub label: Option<String>,
    /// Percentage, 0–100
    pub confidence: Option<f64>,
}

/// Decoded multi-model prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    pub final_label: String,
    pub per_model: HashMap<String, ModelOutput>,
}

const RESERVED_KEYS: &[&str] = &["final_prediction", "probabilities", "error"];

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl PredictionResponse {
    /// Decode a `{final_prediction, <model>: label, probabilities: {<model>: pct}}` body
    ///
    /// `final_prediction` is the only required field.
    pub fn from_body(body: Value) -> Result<Self, TransportError> {
        let Value::Object(map) = body else {
            return Err(TransportError::Parse("prediction body is not an object".to_string()));
        };

        let final_label = match map.get("final_prediction").and_then(label_text) {
            Some(label) if !label.is_empty() => label,
            _ => {
                return Err(match map.get("error").and_then(Value::as_str) {
                    Some(message) => TransportError::Service(message.to_string()),
                    None => TransportError::Parse("response has no final_prediction".to_string()),
                });
            }
        };

        let mut per_model: HashMap<String, ModelOutput> = HashMap::new();

        for (key, value) in &map {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(label) = label_text(value) {
                per_model.entry(key.clone()).or_default().label = Some(label);
            }
        }

        if let Some(Value::Object(probabilities)) = map.get("probabilities") {
            for (key, value) in probabilities {
                if let Some(pct) = value.as_f64() {
                    per_model.entry(key.clone()).or_default().confidence = Some(pct);
                }
            }
        }

        Ok(Self {
            final_label,
            per_model,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRow {
    pub display_name: &'static str,
    pub label: String,
    pub confidence: String,
}

/// Everything a result view renders
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModel {
    pub final_label: String,
    pub entry: CatalogEntry,
    pub rows: Vec<ModelRow>,
}

/// Percentage to two decimals; zero counts as absent
pub fn format_confidence(confidence: Option<f64>) -> String {
    match confidence {
        Some(pct) if pct.is_finite() && pct != 0.0 => format!("{:.2}%", pct),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Normalize `response` for display against `models` and `catalog`
///
/// Never fails: absent models degrade to `N/A`, unknown labels to the
/// catalog's unknown entry.
pub fn aggregate(response: &PredictionResponse, models: &[ModelSlot], catalog: &Catalog) -> DisplayModel {
    let rows = models
        .iter()
        .map(|slot| {
            let output = response.per_model.get(slot.key);
            let label = output
                .and_then(|o| o.label.as_deref())
                .filter(|l| !l.is_empty())
                .unwrap_or(NOT_AVAILABLE)
                .to_string();
            ModelRow {
                display_name: slot.display_name,
                label,
                confidence: format_confidence(output.and_then(|o| o.confidence)),
            }
        })
        .collect();

    if !catalog.contains(&response.final_label) {
        tracing::debug!(
            catalog = catalog.name(),
            label = %response.final_label,
            "Label not in catalog, using fallback entry"
        );
    }

    DisplayModel {
        final_label: response.final_label.clone(),
        entry: catalog.lookup(&response.final_label).clone(),
        rows,
    }
}
