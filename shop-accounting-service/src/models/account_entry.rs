//! Account entries and the title-by-month matrix built from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted amount for a (title, year, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AccountEntry {
    pub id: i64,
    pub shop_id: i64,
    pub shop_account_title_id: i64,
    pub year: i32,
    pub month: i32,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccountEntry {
    pub shop_id: i64,
    pub shop_account_title_id: i64,
    pub year: i32,
    pub month: i32,
    pub amount: Decimal,
}

/// A matrix cell. `id` and `amount` are `None` for months without data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryCell {
    pub id: Option<i64>,
    #[serde(default)]
    pub shop_id: i64,
    pub shop_account_title_id: i64,
    pub year: i32,
    pub month: i32,
    pub amount: Option<Decimal>,
}

impl EntryCell {
    pub fn placeholder(shop_id: i64, shop_account_title_id: i64, year: i32, month: i32) -> Self {
        Self {
            id: None,
            shop_id,
            shop_account_title_id,
            year,
            month,
            amount: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    /// The entry's month is not a reporting month of the shop's cadence.
    MonthOutsideCadence,
    /// The entry references a title that is not configured for the shop.
    UnknownTitle,
}

impl AnomalyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthOutsideCadence => "month_outside_cadence",
            Self::UnknownTitle => "unknown_title",
        }
    }
}

/// A persisted entry that could not be placed in the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryAnomaly {
    pub entry_id: i64,
    pub shop_account_title_id: i64,
    pub month: i32,
    pub reason: AnomalyReason,
}

/// Display-ready grid for one shop and year.
///
/// `revenues` and `expenses` hold one row per title in title order, each row
/// holding one cell per reporting month in cadence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMatrix {
    pub headers: Vec<String>,
    pub revenues: Vec<Vec<EntryCell>>,
    pub expenses: Vec<Vec<EntryCell>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<EntryAnomaly>,
}

/// Body of a whole-period replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacePeriodRequest {
    pub year: i32,
    #[serde(default)]
    pub revenues: Vec<Vec<EntryCell>>,
    #[serde(default)]
    pub expenses: Vec<Vec<EntryCell>>,
}
