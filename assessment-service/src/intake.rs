//! Request body normalization.
//!
//! The intake form is loosely typed JSON from a browser. Nothing here fails on
//! a missing field; only answers mode insists on its one required key.

use crate::config::InputMode;
use crate::error::ReportError;
use serde_json::Value;

/// Flat intake form with every field trimmed; absent or non-string values are
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub business_activity: String,
    pub employees: String,
    pub facility: String,
    pub current_security: String,
    pub past_incidents: String,
    pub threat_concerns: String,
    pub critical_assets: String,
    pub emergency_preparedness: String,
    pub desired_outcomes: String,
}

impl IntakeForm {
    pub fn from_json(payload: &Value) -> Self {
        let field = |key: &str| text_field(payload, key);

        Self {
            business_name: field("businessName"),
            contact_name: field("contactName"),
            phone: field("phone"),
            email: field("email"),
            address: field("address"),
            business_activity: field("businessActivity"),
            employees: field("employees"),
            facility: field("facility"),
            current_security: field("currentSecurity"),
            past_incidents: field("pastIncidents"),
            threat_concerns: field("threatConcerns"),
            critical_assets: field("criticalAssets"),
            emergency_preparedness: field("emergencyPreparedness"),
            desired_outcomes: field("desiredOutcomes"),
        }
    }

    /// Labelled values in the order they appear in the prompt.
    pub fn labelled(&self) -> [(&'static str, &str); 14] {
        [
            ("Business Name", self.business_name.as_str()),
            ("Primary Contact", self.contact_name.as_str()),
            ("Phone", self.phone.as_str()),
            ("Email", self.email.as_str()),
            ("Address", self.address.as_str()),
            ("Business Activity", self.business_activity.as_str()),
            ("# Employees", self.employees.as_str()),
            ("Facility Characteristics", self.facility.as_str()),
            ("Current Security Measures", self.current_security.as_str()),
            ("Past Incidents", self.past_incidents.as_str()),
            ("Threat Concerns", self.threat_concerns.as_str()),
            ("Critical Assets", self.critical_assets.as_str()),
            ("Emergency Preparedness", self.emergency_preparedness.as_str()),
            ("Desired Outcomes", self.desired_outcomes.as_str()),
        ]
    }
}

/// A normalized request, shaped by the configured input mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Intake {
    Fields(IntakeForm),
    /// The caller's `answers` value, untouched.
    Answers(Value),
}

impl Intake {
    pub fn parse(mode: InputMode, payload: &Value) -> Result<Self, ReportError> {
        match mode {
            InputMode::Fields => Ok(Intake::Fields(IntakeForm::from_json(payload))),
            InputMode::Answers => match payload.get("answers") {
                Some(answers) if !answers.is_null() => Ok(Intake::Answers(answers.clone())),
                _ => Err(ReportError::Validation("Missing 'answers' field".to_string())),
            },
        }
    }

    /// Business name, if the caller gave one.
    pub fn business_name(&self) -> Option<String> {
        match self {
            Intake::Fields(form) => non_empty(form.business_name.clone()),
            Intake::Answers(answers) => non_empty(text_field(answers, "businessName")),
        }
    }

    /// Contact name, if the caller gave one.
    pub fn contact_name(&self) -> Option<String> {
        match self {
            Intake::Fields(form) => non_empty(form.contact_name.clone()),
            Intake::Answers(answers) => non_empty(text_field(answers, "contactName")),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Trimmed string at `key`, or `""` when the key is missing, null, or not a
/// string. Non-objects have no keys.
fn text_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
