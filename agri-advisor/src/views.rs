//! Recommender views
//!
//! Every recommender is the same machine: a field table, an endpoint, a
//! response decoder, and a pair of user-facing messages. [`FormState`] runs
//! that machine for one view instance.

use crate::aggregate::{aggregate, DisplayModel, PredictionResponse, CROP_MODELS, FERTILIZER_MODELS};
use crate::catalog::{CROP_CATALOG, FERTILIZER_CATALOG};
use crate::dispatcher::{decode_json, Decoder, DispatchState, RequestDispatcher, Resolution};
use crate::error::AdvisorResult;
use crate::fields::{validate, FieldSpec, FieldValue, FileInput, FormValues, ValidationError};
use crate::request::{build, Endpoint, HttpMethod, PayloadShape};
use crate::transport::Transport;
use agri_common::events::EventBus;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Static description of one recommender view
#[derive(Debug, Clone)]
pub struct ViewSpec<R> {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub endpoint: Endpoint,
    pub decode: Decoder<R>,
    /// Shown when required input is missing
    pub missing_message: &'static str,
    /// Shown for any transport failure
    pub failure_message: &'static str,
}

pub const SOIL_TYPES: &[&str] = &["Sandy", "Loamy", "Black", "Red", "Clayey"];

pub const CROP_TYPES: &[&str] = &[
    "Maize",
    "Sugarcane",
    "Cotton",
    "Tobacco",
    "Paddy",
    "Barley",
    "Wheat",
    "Millets",
    "Oil seeds",
    "Pulses",
    "Ground Nuts",
];

pub const CROP_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("Nitrogen", "Nitrogen in Soil (kg/ha)", 0.0, 200.0),
    FieldSpec::numeric("Phosphorus", "Phosphorus in Soil (kg/ha)", 0.0, 200.0),
    FieldSpec::numeric("Potassium", "Potassium in Soil (kg/ha)", 0.0, 200.0),
    FieldSpec::numeric("Temperature", "Temperature (°C)", -10.0, 50.0),
    FieldSpec::numeric("Humidity", "Humidity (%)", 0.0, 100.0),
    FieldSpec::numeric("pH_Value", "Soil pH Value", 0.0, 14.0),
    FieldSpec::numeric("Rainfall", "Rainfall (mm)", 0.0, 3000.0),
];

pub const FERTILIZER_FIELDS: &[FieldSpec] = &[
    FieldSpec::numeric("Temperature", "Temperature (°C)", -10.0, 50.0),
    FieldSpec::numeric("Humidity", "Humidity (%)", 0.0, 100.0),
    FieldSpec::numeric("Moisture", "Soil Moisture (%)", 0.0, 100.0),
    FieldSpec::categorical("Soil_Type", "Soil Type", SOIL_TYPES),
    FieldSpec::categorical("Crop_Type", "Crop Type", CROP_TYPES),
    FieldSpec::numeric("Nitrogen", "Nitrogen in Soil (kg/ha)", 0.0, 200.0),
    FieldSpec::numeric("Potassium", "Potassium in Soil (kg/ha)", 0.0, 200.0),
    FieldSpec::numeric("Phosphorus", "Phosphorus in Soil (kg/ha)", 0.0, 200.0),
];

pub const DISEASE_FIELDS: &[FieldSpec] = &[FieldSpec::file("image", "Plant leaf image")];

pub const SEED_FIELDS: &[FieldSpec] = &[
    FieldSpec::unbounded("nitrogen", "Nitrogen"),
    FieldSpec::unbounded("phosphorus", "Phosphorus"),
    FieldSpec::unbounded("potassium", "Potassium"),
    FieldSpec::unbounded("pH", "pH"),
    FieldSpec::unbounded("temperature", "Temperature"),
    FieldSpec::unbounded("humidity", "Humidity"),
    FieldSpec::unbounded("rainfall", "Rainfall"),
    FieldSpec::unbounded("pest", "Pest"),
];

const PREDICTION_FAILED: &str = "Failed to fetch prediction. Please try again.";

pub const CROP_VIEW: ViewSpec<PredictionResponse> = ViewSpec {
    name: "crop",
    fields: CROP_FIELDS,
    endpoint: Endpoint {
        name: "predict_crop",
        method: HttpMethod::Post,
        path: "/predict_crop",
        shape: PayloadShape::Multipart,
        renames: &[],
        status_in_body: false,
    },
    decode: PredictionResponse::from_body,
    missing_message: "Please fill all the fields before predicting.",
    failure_message: PREDICTION_FAILED,
};

pub const FERTILIZER_VIEW: ViewSpec<PredictionResponse> = ViewSpec {
    name: "fertilizer",
    fields: FERTILIZER_FIELDS,
    endpoint: Endpoint {
        name: "predict_fertilizer",
        method: HttpMethod::Post,
        path: "/predict_fertilizer",
        shape: PayloadShape::Multipart,
        renames: &[],
        status_in_body: false,
    },
    decode: PredictionResponse::from_body,
    missing_message: "Please fill all fields before predicting.",
    failure_message: PREDICTION_FAILED,
};

/// Disease detection result
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DiseaseDetection {
    pub disease: String,
    /// Ratio, 0–1
    pub confidence: f64,
}

impl DiseaseDetection {
    /// Confidence as a percentage with two decimals, no `%` sign
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}", self.confidence * 100.0)
    }
}

pub const DISEASE_VIEW: ViewSpec<DiseaseDetection> = ViewSpec {
    name: "disease",
    fields: DISEASE_FIELDS,
    endpoint: Endpoint {
        name: "detect_disease",
        method: HttpMethod::Post,
        path: "/detect_disease",
        shape: PayloadShape::Multipart,
        renames: &[],
        status_in_body: false,
    },
    decode: decode_json::<DiseaseDetection>,
    missing_message: "Please select an image first",
    failure_message: "Failed to detect disease. Please try again.",
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeedRecommendation {
    pub seed: String,
    pub pesticide: String,
}

pub const SEED_VIEW: ViewSpec<SeedRecommendation> = ViewSpec {
    name: "seed_pesticide",
    fields: SEED_FIELDS,
    endpoint: Endpoint {
        name: "recommend_seed_pesticide",
        method: HttpMethod::Post,
        path: "/recommend-seed-pesticide",
        shape: PayloadShape::Json,
        renames: &[],
        status_in_body: false,
    },
    decode: decode_json::<SeedRecommendation>,
    missing_message: "Please fill all the fields before requesting recommendations.",
    failure_message: "Failed to get recommendations. Please try again.",
};

pub fn crop_display(response: &PredictionResponse) -> DisplayModel {
    aggregate(response, CROP_MODELS, &CROP_CATALOG)
}

pub fn fertilizer_display(response: &PredictionResponse) -> DisplayModel {
    aggregate(response, FERTILIZER_MODELS, &FERTILIZER_CATALOG)
}

/// Read an image from disk for the disease view
pub fn load_image(path: &Path) -> agri_common::Result<FileInput> {
    let bytes = std::fs::read(path)?;
    let content_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    if !content_type.starts_with("image/") {
        return Err(agri_common::Error::InvalidInput(format!(
            "{} is not an image ({})",
            path.display(),
            content_type
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(FileInput {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

/// What a view shows right now
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome<R> {
    /// Input form, possibly with an inline validation message
    Editing { message: Option<String> },
    Loading,
    Ready(R),
    /// Input form with the view's generic failure message
    Failed(String),
}

/// Form values, validation state and dispatcher of one view instance
pub struct FormState<R> {
    spec: ViewSpec<R>,
    values: FormValues,
    dispatcher: RequestDispatcher<R>,
    validation_error: Option<ValidationError>,
}

impl<R> FormState<R>
where
    R: Clone + Send,
{
    pub fn new(spec: ViewSpec<R>, transport: Arc<dyn Transport>) -> Self {
        let dispatcher = RequestDispatcher::new(spec.name, spec.endpoint.clone(), transport, spec.decode);
        Self {
            spec,
            values: FormValues::new(),
            dispatcher,
            validation_error: None,
        }
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.dispatcher = self.dispatcher.with_events(bus);
        self
    }

    pub fn spec(&self) -> &ViewSpec<R> {
        &self.spec
    }

    pub fn dispatcher(&self) -> &RequestDispatcher<R> {
        &self.dispatcher
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        self.values.set_text(name, value);
    }

    pub fn set_value(&mut self, name: &str, value: FieldValue) {
        self.values.set(name, value);
    }

    /// Validate, shape and send the current values
    ///
    /// A validation failure is kept for display and returned; nothing is sent.
    pub async fn submit(&mut self) -> AdvisorResult<Resolution<R>> {
        self.validation_error = None;

        let request = match validate(self.spec.fields, &self.values) {
            Ok(request) => request,
            Err(e) => {
                debug!(view = self.spec.name, error = %e, "Validation failed");
                self.validation_error = Some(e.clone());
                return Err(e.into());
            }
        };

        let payload = build(&self.spec.endpoint, &request)?;
        Ok(self.dispatcher.submit(payload).await?)
    }

    /// Inline message for the last validation failure
    pub fn validation_message(&self) -> Option<String> {
        self.validation_error.as_ref().map(|e| match e {
            ValidationError::MissingFields(_) => self.spec.missing_message.to_string(),
            other => other.to_string(),
        })
    }

    /// A validation failure from the latest submit replaces any earlier
    /// result or failure on screen
    pub async fn outcome(&self) -> FormOutcome<R> {
        if let Some(message) = self.validation_message() {
            return FormOutcome::Editing { message: Some(message) };
        }
        match self.dispatcher.state().await {
            DispatchState::Idle => FormOutcome::Editing { message: None },
            DispatchState::Submitting { .. } => FormOutcome::Loading,
            DispatchState::Success(response) => FormOutcome::Ready(response),
            DispatchState::Failure(_) => FormOutcome::Failed(self.spec.failure_message.to_string()),
        }
    }

    /// Back to the input form; entered values are kept
    pub async fn new_prediction(&mut self) -> AdvisorResult<()> {
        self.validation_error = None;
        self.dispatcher.reset().await?;
        Ok(())
    }
}
