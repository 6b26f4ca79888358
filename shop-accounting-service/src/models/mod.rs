//! Domain models for shop-accounting-service.

mod account_entry;
mod account_title;
mod shop;
mod user;

pub use account_entry::{
    AccountEntry, AnomalyReason, EntryAnomaly, EntryCell, NewAccountEntry, PeriodMatrix,
    ReplacePeriodRequest,
};
pub use account_title::{
    AccountTitle, AccountTitleList, AccountTitleSubType, AccountTitleType, CreateAccountTitle,
    UpdateAccountTitle,
};
pub use shop::{CreateShop, PeriodType, Shop, UpdateShop};
pub use user::{NewUser, User};

use serde::{Deserialize, Deserializer};

/// Deserialize a patch field so an explicit `null` becomes `Some(None)`.
///
/// Pair with `#[serde(default)]` so an absent field stays `None`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
