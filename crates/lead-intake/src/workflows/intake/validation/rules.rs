use chrono::NaiveDate;

use super::super::domain::{normalize_digits, CustomerFlag, FormField, FormValues, PhoneNumber};
use super::super::national_id;
use super::config::ValidationConfig;
use super::messages;

pub(crate) type RuleResult<T> = Result<T, String>;

pub(crate) fn full_name(values: &FormValues, config: &ValidationConfig) -> RuleResult<String> {
    let name = values
        .text(FormField::FullName)
        .ok_or_else(|| messages::FULL_NAME_REQUIRED.to_string())?;

    let length = name.chars().count();
    if length < config.full_name_min {
        return Err(messages::full_name_too_short(config.full_name_min));
    }
    if length > config.full_name_max {
        return Err(messages::full_name_too_long(config.full_name_max));
    }

    Ok(name.to_string())
}

pub(crate) fn phone(values: &FormValues) -> RuleResult<PhoneNumber> {
    let raw = values
        .text(FormField::Phone)
        .ok_or_else(|| messages::PHONE_REQUIRED.to_string())?;

    PhoneNumber::parse(raw).ok_or_else(|| messages::PHONE_INVALID.to_string())
}

pub(crate) fn birth_date(values: &FormValues, config: &ValidationConfig) -> RuleResult<NaiveDate> {
    let raw = values
        .text(FormField::BirthDate)
        .ok_or_else(|| messages::BIRTH_DATE_REQUIRED.to_string())?;

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| messages::BIRTH_DATE_INVALID.to_string())?;

    if date >= config.birth_date_cutoff {
        return Err(messages::birth_date_not_before(config.birth_date_cutoff));
    }

    Ok(date)
}

pub(crate) fn existing_customer(values: &FormValues) -> RuleResult<bool> {
    let flag = values
        .is_existing_customer
        .as_ref()
        .filter(|flag| !matches!(flag, CustomerFlag::Text(raw) if raw.trim().is_empty()))
        .ok_or_else(|| messages::CUSTOMER_FLAG_REQUIRED.to_string())?;

    flag.as_bool()
        .ok_or_else(|| messages::CUSTOMER_FLAG_INVALID.to_string())
}

/// Format rule only; the checksum is reported separately.
pub(crate) fn national_id_format(values: &FormValues) -> RuleResult<String> {
    let raw = values
        .text(FormField::NationalId)
        .ok_or_else(|| messages::NATIONAL_ID_REQUIRED.to_string())?;

    let digits = normalize_digits(raw);
    if digits.len() != national_id::LENGTH {
        return Err(messages::NATIONAL_ID_DIGITS.to_string());
    }

    Ok(digits)
}
