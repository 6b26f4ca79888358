//! Shop model and its reporting cadence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

const MONTHLY_MONTHS: [i32; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
const QUARTERLY_MONTHS: [i32; 4] = [3, 6, 9, 12];
const SEMI_ANNUAL_MONTHS: [i32; 2] = [6, 12];
const YEARLY_MONTHS: [i32; 1] = [3];

/// How often a shop reports figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    Monthly,
    Quarterly,
    SemiAnnual,
    Yearly,
}

impl PeriodType {
    pub const ALL: [PeriodType; 4] = [
        PeriodType::Monthly,
        PeriodType::Quarterly,
        PeriodType::SemiAnnual,
        PeriodType::Yearly,
    ];

    /// Reporting months for this cadence, ascending.
    pub fn months(self) -> &'static [i32] {
        match self {
            Self::Monthly => &MONTHLY_MONTHS,
            Self::Quarterly => &QUARTERLY_MONTHS,
            Self::SemiAnnual => &SEMI_ANNUAL_MONTHS,
            Self::Yearly => &YEARLY_MONTHS,
        }
    }

    pub fn contains_month(self, month: i32) -> bool {
        self.months().contains(&month)
    }

    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi_annual",
            Self::Yearly => "yearly",
        }
    }

    /// Parse the database representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "semi_annual" => Some(Self::SemiAnnual),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub period_type: PeriodType,
    pub is_cumulative: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    /// Apply the fields present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: UpdateShop) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(period_type) = patch.period_type {
            self.period_type = period_type;
        }
        if let Some(is_cumulative) = patch.is_cumulative {
            self.is_cumulative = is_cumulative;
        }
    }
}

/// Input for creating a new shop.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShop {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub period_type: PeriodType,
    #[serde(default)]
    pub is_cumulative: bool,
}

/// Partial update for a shop.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateShop {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    /// `null` clears the description.
    #[validate(length(max = 1000))]
    #[serde(
        default,
        deserialize_with = "super::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub period_type: Option<PeriodType>,
    pub is_cumulative: Option<bool>,
}
