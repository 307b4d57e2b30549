//! Form field tables and client-side validation
//!
//! Each view declares a static [`FieldSpec`] table. [`validate`] checks the
//! user's [`FormValues`] against it before anything touches the network and,
//! on success, freezes them into a [`PredictionRequest`].

use std::collections::HashMap;
use thiserror::Error;

/// Placeholder value of an untouched categorical selector
pub const UNSELECTED: &str = "select";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical,
    File,
}

/// One input of a view's form
///
/// `min`/`max` describe the input affordance only; they are not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed_values: &'static [&'static str],
}

impl FieldSpec {
    pub const fn numeric(name: &'static str, description: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Numeric,
            min: Some(min),
            max: Some(max),
            allowed_values: &[],
        }
    }

    /// Numeric input without a declared range
    pub const fn unbounded(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Numeric,
            min: None,
            max: None,
            allowed_values: &[],
        }
    }

    pub const fn categorical(
        name: &'static str,
        description: &'static str,
        allowed_values: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Categorical,
            min: None,
            max: None,
            allowed_values,
        }
    }

    pub const fn file(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::File,
            min: None,
            max: None,
            allowed_values: &[],
        }
    }
}

/// An uploaded file held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct FileInput {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw user input for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    File(FileInput),
}

impl FieldValue {
    fn is_filled(&self, kind: FieldKind) -> bool {
        match (kind, self) {
            (FieldKind::File, FieldValue::File(_)) => true,
            (FieldKind::File, _) => false,
            (FieldKind::Categorical, FieldValue::Text(s)) => {
                let s = s.trim();
                !s.is_empty() && s != UNSELECTED
            }
            (_, FieldValue::Text(s)) => !s.trim().is_empty(),
            (_, FieldValue::Number(_)) | (_, FieldValue::File(_)) => true,
        }
    }

    fn as_finite_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
            FieldValue::Number(n) => *n,
            FieldValue::File(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Snapshot form stored in a request: text is trimmed
    fn snapshot(&self) -> FieldValue {
        match self {
            FieldValue::Text(s) => FieldValue::Text(s.trim().to_string()),
            other => other.clone(),
        }
    }
}

/// Mutable input state owned by one view instance
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    values: HashMap<String, FieldValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    pub fn set_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, FieldValue::Text(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validated, immutable snapshot of a form at submit time
///
/// Entries follow the order of the view's field table.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    entries: Vec<(&'static str, FieldValue)>,
}

impl PredictionRequest {
    pub fn entries(&self) -> &[(&'static str, FieldValue)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// One or more fields empty, unselected, or absent
    #[error("Please fill all the fields before predicting.")]
    MissingFields(Vec<String>),

    #[error("Invalid value for {0}. Please enter a number.")]
    NotANumber(String),
}

/// Check `values` against `specs`; first failing rule wins
///
/// 1. every field present and filled, else [`ValidationError::MissingFields`]
/// 2. every numeric field a finite number, else [`ValidationError::NotANumber`]
pub fn validate(specs: &[FieldSpec], values: &FormValues) -> Result<PredictionRequest, ValidationError> {
    let missing: Vec<String> = specs
        .iter()
        .filter(|spec| {
            !values
                .get(spec.name)
                .is_some_and(|v| v.is_filled(spec.kind))
        })
        .map(|spec| spec.name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let mut entries = Vec::with_capacity(specs.len());
    for spec in specs {
        // Presence checked above
        let Some(value) = values.get(spec.name) else {
            return Err(ValidationError::MissingFields(vec![spec.name.to_string()]));
        };
        if spec.kind == FieldKind::Numeric && value.as_finite_number().is_none() {
            return Err(ValidationError::NotANumber(spec.name.to_string()));
        }
        entries.push((spec.name, value.snapshot()));
    }

    Ok(PredictionRequest { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[FieldSpec] = &[
        FieldSpec::numeric("Nitrogen", "Nitrogen in Soil (kg/ha)", 0.0, 200.0),
        FieldSpec::categorical("Soil_Type", "Soil Type", &["Sandy", "Loamy"]),
        FieldSpec::numeric("Humidity", "Humidity (%)", 0.0, 100.0),
    ];

    fn filled() -> FormValues {
        let mut values = FormValues::new();
        values.set_text("Nitrogen", "90");
        values.set_text("Soil_Type", "Sandy");
        values.set_text("Humidity", " 82.5 ");
        values
    }

    #[test]
    fn test_accepts_complete_form() {
        let request = validate(SPECS, &filled()).unwrap();
        let names: Vec<_> = request.entries().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["Nitrogen", "Soil_Type", "Humidity"]);
        assert_eq!(request.get("Humidity"), Some(&FieldValue::Text("82.5".to_string())));
    }

    #[test]
    fn test_whitespace_only_is_missing() {
        let mut values = filled();
        values.set_text("Nitrogen", "   ");
        assert_eq!(
            validate(SPECS, &values),
            Err(ValidationError::MissingFields(vec!["Nitrogen".to_string()]))
        );
    }

    #[test]
    fn test_unselected_category_is_missing() {
        let mut values = filled();
        values.set_text("Soil_Type", UNSELECTED);
        assert!(matches!(
            validate(SPECS, &values),
            Err(ValidationError::MissingFields(fields)) if fields == vec!["Soil_Type".to_string()]
        ));
    }

    #[test]
    fn test_missing_wins_over_not_a_number() {
        let mut values = filled();
        values.set_text("Nitrogen", "abc");
        values.remove("Humidity");
        assert!(matches!(validate(SPECS, &values), Err(ValidationError::MissingFields(_))));
    }

    #[test]
    fn test_not_a_number_names_field() {
        let mut values = filled();
        values.set_text("Humidity", "humid");
        let err = validate(SPECS, &values).unwrap_err();
        assert_eq!(err, ValidationError::NotANumber("Humidity".to_string()));
        assert_eq!(err.to_string(), "Invalid value for Humidity. Please enter a number.");
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut values = filled();
        values.set_text("Nitrogen", "inf");
        assert_eq!(
            validate(SPECS, &values),
            Err(ValidationError::NotANumber("Nitrogen".to_string()))
        );

        values.set("Nitrogen", FieldValue::Number(f64::NAN));
        assert_eq!(
            validate(SPECS, &values),
            Err(ValidationError::NotANumber("Nitrogen".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_forwarded() {
        let mut values = filled();
        values.set_text("Nitrogen", "5000");
        values.set_text("Humidity", "-3");
        assert!(validate(SPECS, &values).is_ok());
    }

    #[test]
    fn test_file_field_requires_file() {
        let specs = [FieldSpec::file("image", "Plant leaf image")];
        let mut values = FormValues::new();
        values.set_text("image", "leaf.jpg");
        assert!(matches!(validate(&specs, &values), Err(ValidationError::MissingFields(_))));

        values.set(
            "image",
            FieldValue::File(FileInput {
                file_name: "leaf.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: vec![0xff, 0xd8],
            }),
        );
        assert!(validate(&specs, &values).is_ok());
    }

    #[test]
    fn test_extra_values_ignored() {
        let mut values = filled();
        values.set_text("Unrelated", "x");
        let request = validate(SPECS, &values).unwrap();
        assert_eq!(request.entries().len(), 3);
        assert!(request.get("Unrelated").is_none());
    }
}
