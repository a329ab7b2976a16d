mod config;
pub mod messages;
mod rules;

pub use config::ValidationConfig;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{FormField, FormValues, PhoneNumber};
use super::national_id;

/// Error messages keyed by the field they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FormField, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: FormField, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: FormField, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn messages(&self, field: FormField) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.0.keys().copied()
    }
}

/// Form that passed every field rule. The national identity number has the right shape but its
/// checksum has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    pub full_name: String,
    pub phone: PhoneNumber,
    pub birth_date: NaiveDate,
    pub is_existing_customer: bool,
    pub national_id_digits: String,
}

/// Applies the field rules to submitted form values.
#[derive(Debug, Clone, Default)]
pub struct FormValidator {
    config: ValidationConfig,
}

impl FormValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Re-validates a single field as the visitor edits it. The national identity number also gets
    /// its checksum verified once its format is correct.
    pub fn validate_field(&self, field: FormField, values: &FormValues) -> Vec<String> {
        let outcome = match field {
            FormField::FullName => rules::full_name(values, &self.config).map(drop),
            FormField::Phone => rules::phone(values).map(drop),
            FormField::BirthDate => rules::birth_date(values, &self.config).map(drop),
            FormField::IsExistingCustomer => rules::existing_customer(values).map(drop),
            FormField::NationalId => rules::national_id_format(values).and_then(|digits| {
                if national_id::is_valid(&digits) {
                    Ok(())
                } else {
                    Err(messages::NATIONAL_ID_INVALID.to_string())
                }
            }),
        };

        outcome.err().into_iter().collect()
    }

    /// Runs every field rule, collecting all failures in one pass.
    pub fn validate(&self, values: &FormValues) -> Result<ValidatedForm, FieldErrors> {
        let mut errors = FieldErrors::new();

        let full_name = capture(&mut errors, FormField::FullName, || {
            rules::full_name(values, &self.config)
        });
        let phone = capture(&mut errors, FormField::Phone, || rules::phone(values));
        let birth_date = capture(&mut errors, FormField::BirthDate, || {
            rules::birth_date(values, &self.config)
        });
        let is_existing_customer = capture(&mut errors, FormField::IsExistingCustomer, || {
            rules::existing_customer(values)
        });
        let national_id_digits = capture(&mut errors, FormField::NationalId, || {
            rules::national_id_format(values)
        });

        match (
            full_name,
            phone,
            birth_date,
            is_existing_customer,
            national_id_digits,
        ) {
            (
                Some(full_name),
                Some(phone),
                Some(birth_date),
                Some(is_existing_customer),
                Some(national_id_digits),
            ) => Ok(ValidatedForm {
                full_name,
                phone,
                birth_date,
                is_existing_customer,
                national_id_digits,
            }),
            _ => Err(errors),
        }
    }
}

fn capture<T>(
    errors: &mut FieldErrors,
    field: FormField,
    rule: impl FnOnce() -> Result<T, String>,
) -> Option<T> {
    match rule() {
        Ok(value) => Some(value),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}
