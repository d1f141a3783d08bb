use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::{ColorScheme, SetTheme, COLOR_SCHEME_KEY};

/// Field-level validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    /// Failures that are not tied to a single field.
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }
}

impl SetTheme {
    /// Validate an untrusted value against the `{ colorScheme: dark | light }`
    /// schema.
    pub fn validate(value: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let Some(object) = value.as_object() else {
            errors.add_form(format!("Expected object, received {}", type_name(value)));
            return Err(errors);
        };

        match object.get(COLOR_SCHEME_KEY) {
            None | Some(Value::Null) => errors.add_field(COLOR_SCHEME_KEY, "Required"),
            Some(Value::String(raw)) => match raw.parse::<ColorScheme>() {
                Ok(color_scheme) => return Ok(Self { color_scheme }),
                Err(message) => errors.add_field(COLOR_SCHEME_KEY, message),
            },
            Some(other) => errors.add_field(
                COLOR_SCHEME_KEY,
                format!("Expected 'dark' | 'light', received {}", type_name(other)),
            ),
        }

        Err(errors)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode submitted form fields into a value to validate.
///
/// Clients may post a single `data` field holding a JSON document; when that
/// field is not valid JSON its raw string is used. Forms without a `data`
/// field are read as a flat object of their fields.
pub fn decode_form_data(fields: &[(String, String)]) -> Value {
    if let Some((_, data)) = fields.iter().find(|(key, _)| key == "data") {
        return serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.clone()));
    }

    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect(),
    )
}
