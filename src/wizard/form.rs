//! Form state: entered values, current step, and the validation message.

use crate::error::UnknownField;
use serde::Serialize;
use std::str::FromStr;

/// Jurisdiction codes offered to the user. The first entry is the default.
pub const JURISDICTIONS: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

/// Current step in the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardStep {
    #[default]
    Vehicle,
    Contact,
}

impl WizardStep {
    /// Step number (1-based)
    pub fn number(&self) -> usize {
        match self {
            Self::Vehicle => 1,
            Self::Contact => 2,
        }
    }

    /// Fields that must be non-empty before leaving this step
    pub fn required_fields(&self) -> &'static [Field] {
        match self {
            Self::Vehicle => &[
                Field::Year,
                Field::Make,
                Field::Model,
                Field::Jurisdiction,
                Field::Mileage,
            ],
            Self::Contact => &[Field::Name, Field::Email, Field::Phone],
        }
    }
}

/// A form field. Declaration order is the order used in validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Year,
    Make,
    Model,
    Jurisdiction,
    Mileage,
    Name,
    Email,
    Phone,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Year,
        Field::Make,
        Field::Model,
        Field::Jurisdiction,
        Field::Mileage,
        Field::Name,
        Field::Email,
        Field::Phone,
    ];

    /// Name used on the wire and in user-facing messages
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Make => "make",
            Self::Model => "model",
            Self::Jurisdiction => "state",
            Self::Mileage => "miles",
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.wire_name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Entered values. Serializes as the `form_data` object sent to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFields {
    pub year: String,
    pub make: String,
    pub model: String,
    #[serde(rename = "state")]
    pub jurisdiction: String,
    #[serde(rename = "miles")]
    pub mileage: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            year: String::new(),
            make: String::new(),
            model: String::new(),
            jurisdiction: JURISDICTIONS[0].to_string(),
            mileage: String::new(),
            name: String::new(),
            email: String::new(),
            phone: String::new(),
        }
    }
}

impl FormFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Year => &self.year,
            Field::Make => &self.make,
            Field::Model => &self.model,
            Field::Jurisdiction => &self.jurisdiction,
            Field::Mileage => &self.mileage,
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Year => &mut self.year,
            Field::Make => &mut self.make,
            Field::Model => &mut self.model,
            Field::Jurisdiction => &mut self.jurisdiction,
            Field::Mileage => &mut self.mileage,
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
        }
    }
}

/// Keep only ASCII digits
pub fn sanitize_mileage(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Single source of truth for what the user has entered
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormState {
    fields: FormFields,
    step: WizardStep,
    error: Option<String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn field(&self, field: Field) -> &str {
        self.fields.get(field)
    }

    /// Store a value. Mileage is reduced to its digits; everything else is
    /// stored verbatim. Returns whether the stored value changed.
    pub fn set_field(&mut self, field: Field, value: &str) -> bool {
        let value = match field {
            Field::Mileage => sanitize_mileage(value),
            _ => value.to_string(),
        };

        let slot = self.fields.slot_mut(field);
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn set_step(&mut self, step: WizardStep) {
        self.step = step;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Required fields that are still empty, in declaration order
    pub fn missing(&self, required: &[Field]) -> Vec<Field> {
        required
            .iter()
            .copied()
            .filter(|f| self.field(*f).is_empty())
            .collect()
    }

    /// Back to initial defaults: empty fields, first jurisdiction, `Vehicle` step
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
