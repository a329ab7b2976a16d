use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::national_id;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^5[0-9]{9}$").expect("phone pattern compiles"));

/// Store-assigned identifier for a persisted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inputs rendered on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    FullName,
    Phone,
    BirthDate,
    IsExistingCustomer,
    NationalId,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::FullName,
        FormField::Phone,
        FormField::BirthDate,
        FormField::IsExistingCustomer,
        FormField::NationalId,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            FormField::FullName => "full_name",
            FormField::Phone => "phone",
            FormField::BirthDate => "birth_date",
            FormField::IsExistingCustomer => "is_existing_customer",
            FormField::NationalId => "national_id",
        }
    }

    /// Label shown next to the input on the page.
    pub const fn label(self) -> &'static str {
        match self {
            FormField::FullName => "Ad Soyad",
            FormField::Phone => "Telefon Numarası",
            FormField::BirthDate => "Doğum Tarihi",
            FormField::IsExistingCustomer => "Akbank Müşterisi",
            FormField::NationalId => "TC Kimlik Numarası",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown form field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for FormField {
    type Err = UnknownField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|field| field.as_str() == value.trim())
            .ok_or_else(|| UnknownField(value.to_string()))
    }
}

/// Yes/no answer as it arrives from the form widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomerFlag {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl CustomerFlag {
    /// Accepts `true`, `false`, `1`, `0` and their string forms.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CustomerFlag::Bool(value) => Some(*value),
            CustomerFlag::Number(1) => Some(true),
            CustomerFlag::Number(0) => Some(false),
            CustomerFlag::Number(_) => None,
            CustomerFlag::Text(raw) => match raw.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
        }
    }
}

impl From<bool> for CustomerFlag {
    fn from(value: bool) -> Self {
        CustomerFlag::Bool(value)
    }
}

/// Current state of the form inputs. Every field is optional so partially filled forms can be
/// re-validated field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormValues {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub is_existing_customer: Option<CustomerFlag>,
    pub national_id: Option<String>,
}

impl FormValues {
    /// Trimmed text value of a field, `None` when missing or blank.
    pub fn text(&self, field: FormField) -> Option<&str> {
        let raw = match field {
            FormField::FullName => self.full_name.as_deref(),
            FormField::Phone => self.phone.as_deref(),
            FormField::BirthDate => self.birth_date.as_deref(),
            FormField::NationalId => self.national_id.as_deref(),
            FormField::IsExistingCustomer => None,
        };
        raw.map(str::trim).filter(|value| !value.is_empty())
    }
}

/// Drops every character that is not an ASCII digit.
pub fn normalize_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Mobile number reduced to its ten national digits (`5XXXXXXXXX`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = normalize_digits(raw);
        PHONE_PATTERN.is_match(&digits).then_some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// National identity number that passed the checksum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = normalize_digits(raw);
        national_id::is_valid(&digits).then_some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully validated application waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub full_name: String,
    pub phone: PhoneNumber,
    pub birth_date: NaiveDate,
    pub is_existing_customer: bool,
    pub national_id: NationalId,
}

/// Persisted loan application. Never updated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub full_name: String,
    pub phone: PhoneNumber,
    pub birth_date: NaiveDate,
    pub is_existing_customer: bool,
    pub national_id: NationalId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub(crate) fn from_new(id: ApplicationId, new: NewApplication, now: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name: new.full_name,
            phone: new.phone,
            birth_date: new.birth_date,
            is_existing_customer: new.is_existing_customer,
            national_id: new.national_id,
            created_at: now,
            updated_at: now,
        }
    }
}
