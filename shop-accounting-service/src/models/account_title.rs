//! Account titles: the per-shop revenue and expense categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountTitleType {
    Revenue,
    Expense,
}

impl AccountTitleType {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "revenue" => Some(Self::Revenue),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountTitleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Finer classification of a title, as laid out on an income statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountTitleSubType {
    Sales,
    NonOperatingRevenue,
    ExtraordinaryIncome,
    CostOfGoodsSold,
    SellingGeneralAdministrativeExpense,
    NonOperatingExpense,
    ExtraordinaryLoss,
}

impl AccountTitleSubType {
    /// The title type this sub type is classified under.
    pub fn title_type(self) -> AccountTitleType {
        match self {
            Self::Sales | Self::NonOperatingRevenue | Self::ExtraordinaryIncome => {
                AccountTitleType::Revenue
            }
            Self::CostOfGoodsSold
            | Self::SellingGeneralAdministrativeExpense
            | Self::NonOperatingExpense
            | Self::ExtraordinaryLoss => AccountTitleType::Expense,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::NonOperatingRevenue => "non_operating_revenue",
            Self::ExtraordinaryIncome => "extraordinary_income",
            Self::CostOfGoodsSold => "cost_of_goods_sold",
            Self::SellingGeneralAdministrativeExpense => "selling_general_administrative_expense",
            Self::NonOperatingExpense => "non_operating_expense",
            Self::ExtraordinaryLoss => "extraordinary_loss",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sales" => Some(Self::Sales),
            "non_operating_revenue" => Some(Self::NonOperatingRevenue),
            "extraordinary_income" => Some(Self::ExtraordinaryIncome),
            "cost_of_goods_sold" => Some(Self::CostOfGoodsSold),
            "selling_general_administrative_expense" => {
                Some(Self::SellingGeneralAdministrativeExpense)
            }
            "non_operating_expense" => Some(Self::NonOperatingExpense),
            "extraordinary_loss" => Some(Self::ExtraordinaryLoss),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTitle {
    pub id: i64,
    pub shop_id: i64,
    #[serde(rename = "type")]
    pub title_type: AccountTitleType,
    pub sub_type: AccountTitleSubType,
    pub code: Option<String>,
    pub name: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountTitle {
    /// Apply the fields present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: UpdateAccountTitle) {
        if let Some(title_type) = patch.title_type {
            self.title_type = title_type;
        }
        if let Some(sub_type) = patch.sub_type {
            self.sub_type = sub_type;
        }
        if let Some(code) = patch.code {
            self.code = code;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }

    pub fn is_classified_consistently(&self) -> bool {
        self.sub_type.title_type() == self.title_type
    }
}

/// Input for creating a title under a shop.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccountTitle {
    #[serde(rename = "type")]
    pub title_type: AccountTitleType,
    pub sub_type: AccountTitleSubType,
    #[validate(length(max = 50, message = "Code must be at most 50 characters"))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[serde(default)]
    pub order: i32,
}

impl CreateAccountTitle {
    pub fn is_classified_consistently(&self) -> bool {
        self.sub_type.title_type() == self.title_type
    }
}

/// Partial update for a title.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAccountTitle {
    #[serde(rename = "type")]
    pub title_type: Option<AccountTitleType>,
    pub sub_type: Option<AccountTitleSubType>,
    /// `null` clears the code.
    #[validate(length(max = 50, message = "Code must be at most 50 characters"))]
    #[serde(
        default,
        deserialize_with = "super::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<Option<String>>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub order: Option<i32>,
}

/// Titles of one shop split by type, each sorted by `order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountTitleList {
    pub revenues: Vec<AccountTitle>,
    pub expenses: Vec<AccountTitle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_types_classify_under_their_type() {
        assert_eq!(AccountTitleSubType::Sales.title_type(), AccountTitleType::Revenue);
        assert_eq!(
            AccountTitleSubType::ExtraordinaryIncome.title_type(),
            AccountTitleType::Revenue
        );
        assert_eq!(
            AccountTitleSubType::SellingGeneralAdministrativeExpense.title_type(),
            AccountTitleType::Expense
        );
        assert_eq!(
            AccountTitleSubType::ExtraordinaryLoss.title_type(),
            AccountTitleType::Expense
        );
    }

    #[test]
    fn sub_type_storage_names_round_trip() {
        let all = [
            AccountTitleSubType::Sales,
            AccountTitleSubType::NonOperatingRevenue,
            AccountTitleSubType::ExtraordinaryIncome,
            AccountTitleSubType::CostOfGoodsSold,
            AccountTitleSubType::SellingGeneralAdministrativeExpense,
            AccountTitleSubType::NonOperatingExpense,
            AccountTitleSubType::ExtraordinaryLoss,
        ];
        for sub_type in all {
            assert_eq!(AccountTitleSubType::parse(sub_type.as_str()), Some(sub_type));
        }
    }

    #[test]
    fn create_payload_uses_type_and_order_keys() {
        let payload: CreateAccountTitle = serde_json::from_value(serde_json::json!({
            "type": "EXPENSE",
            "sub_type": "COST_OF_GOODS_SOLD",
            "name": "Purchases",
        }))
        .unwrap();

        assert_eq!(payload.title_type, AccountTitleType::Expense);
        assert_eq!(payload.order, 0);
        assert!(payload.code.is_none());
        assert!(payload.is_classified_consistently());
    }

    #[test]
    fn mismatched_sub_type_is_inconsistent() {
        let payload = CreateAccountTitle {
            title_type: AccountTitleType::Revenue,
            sub_type: AccountTitleSubType::NonOperatingExpense,
            code: None,
            name: "Odd".to_string(),
            order: 0,
        };
        assert!(!payload.is_classified_consistently());
    }

    #[test]
    fn patch_distinguishes_null_code_from_missing() {
        let missing: UpdateAccountTitle = serde_json::from_str(r#"{"order": 3}"#).unwrap();
        let null: UpdateAccountTitle = serde_json::from_str(r#"{"code": null}"#).unwrap();
        let set: UpdateAccountTitle = serde_json::from_str(r#"{"code": "4100"}"#).unwrap();

        assert_eq!(missing.code, None);
        assert_eq!(null.code, Some(None));
        assert_eq!(set.code, Some(Some("4100".to_string())));
    }
}
