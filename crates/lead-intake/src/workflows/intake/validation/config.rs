use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Limits applied by the form rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Birth dates must fall strictly before this day.
    pub birth_date_cutoff: NaiveDate,
    pub full_name_min: usize,
    pub full_name_max: usize,
}

impl ValidationConfig {
    pub fn with_cutoff(birth_date_cutoff: NaiveDate) -> Self {
        Self {
            birth_date_cutoff,
            ..Self::default()
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            birth_date_cutoff: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            full_name_min: 3,
            full_name_max: 40,
        }
    }
}
