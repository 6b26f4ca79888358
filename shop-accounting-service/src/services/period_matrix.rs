//! Title-by-month entry matrix: building it from storage and replacing a
//! whole (shop, year) period from a submitted matrix.

use crate::models::{
    AccountEntry, AccountTitle, AccountTitleList, AccountTitleType, AnomalyReason, EntryAnomaly,
    EntryCell, NewAccountEntry, PeriodMatrix, Shop,
};
use crate::services::error::ServiceError;
use crate::services::metrics::{record_entry_anomaly, record_matrix_operation};
use crate::services::store::AccountingStore;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

pub const MIN_YEAR: i32 = 1000;
pub const MAX_YEAR: i32 = 9999;

/// NUMERIC(12, 2) upper bound, exclusive.
const AMOUNT_LIMIT: i64 = 10_000_000_000;

/// One display label per reporting month, in cadence order.
pub fn headers_for(year: i32, months: &[i32]) -> Vec<String> {
    months
        .iter()
        .map(|month| format!("{}年{}月", year, month))
        .collect()
}

/// Split titles by type, each half sorted by `order`.
///
/// The sort is stable, so equal `order` values keep retrieval order.
pub fn partition_titles(titles: Vec<AccountTitle>) -> AccountTitleList {
    let (mut revenues, mut expenses): (Vec<_>, Vec<_>) = titles
        .into_iter()
        .partition(|t| t.title_type == AccountTitleType::Revenue);

    revenues.sort_by_key(|t| t.order);
    expenses.sort_by_key(|t| t.order);

    AccountTitleList { revenues, expenses }
}

fn check_year(year: i32) -> Result<(), ServiceError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(ServiceError::InvalidSubmission(format!(
            "year must be between {} and {}, got {}",
            MIN_YEAR, MAX_YEAR, year
        )))
    }
}

fn placeholder_rows(
    titles: &[AccountTitle],
    shop_id: i64,
    year: i32,
    months: &[i32],
) -> Vec<Vec<EntryCell>> {
    titles
        .iter()
        .map(|title| {
            months
                .iter()
                .map(|&month| EntryCell::placeholder(shop_id, title.id, year, month))
                .collect()
        })
        .collect()
}

/// Merge persisted entries into a placeholder grid.
///
/// Entries that match no (title, month) cell are returned as anomalies and
/// leave the grid untouched.
pub fn assemble(
    shop: &Shop,
    year: i32,
    titles: &AccountTitleList,
    entries: &[AccountEntry],
) -> PeriodMatrix {
    let months = shop.period_type.months();
    let mut revenues = placeholder_rows(&titles.revenues, shop.id, year, months);
    let mut expenses = placeholder_rows(&titles.expenses, shop.id, year, months);

    let rows_by_title: HashMap<i64, (AccountTitleType, usize)> = titles
        .revenues
        .iter()
        .enumerate()
        .map(|(row, t)| (t.id, (AccountTitleType::Revenue, row)))
        .chain(
            titles
                .expenses
                .iter()
                .enumerate()
                .map(|(row, t)| (t.id, (AccountTitleType::Expense, row))),
        )
        .collect();

    let mut anomalies = Vec::new();
    for entry in entries {
        let anomaly = |reason| EntryAnomaly {
            entry_id: entry.id,
            shop_account_title_id: entry.shop_account_title_id,
            month: entry.month,
            reason,
        };

        let Some(&(title_type, row)) = rows_by_title.get(&entry.shop_account_title_id) else {
            anomalies.push(anomaly(AnomalyReason::UnknownTitle));
            continue;
        };
        let Some(column) = months.iter().position(|&m| m == entry.month) else {
            anomalies.push(anomaly(AnomalyReason::MonthOutsideCadence));
            continue;
        };

        let rows = match title_type {
            AccountTitleType::Revenue => &mut revenues,
            AccountTitleType::Expense => &mut expenses,
        };
        let cell = &mut rows[row][column];
        cell.id = Some(entry.id);
        cell.amount = Some(entry.amount);
        cell.shop_account_title_id = entry.shop_account_title_id;
    }

    PeriodMatrix {
        headers: headers_for(year, months),
        revenues,
        expenses,
        anomalies,
    }
}

/// Turn a submitted matrix into rows to insert, rejecting it whole on the
/// first invalid non-empty cell.
pub fn collect_submission(
    shop: &Shop,
    titles: &[AccountTitle],
    year: i32,
    revenues: &[Vec<EntryCell>],
    expenses: &[Vec<EntryCell>],
) -> Result<Vec<NewAccountEntry>, ServiceError> {
    let title_types: HashMap<i64, AccountTitleType> =
        titles.iter().map(|t| (t.id, t.title_type)).collect();
    let limit = Decimal::from(AMOUNT_LIMIT);

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for (expected, rows) in [
        (AccountTitleType::Revenue, revenues),
        (AccountTitleType::Expense, expenses),
    ] {
        for cell in rows.iter().flatten() {
            let Some(amount) = cell.amount else {
                continue;
            };
            let title_id = cell.shop_account_title_id;

            match title_types.get(&title_id) {
                None => {
                    return Err(ServiceError::InvalidSubmission(format!(
                        "account title {} does not belong to shop {}",
                        title_id, shop.id
                    )));
                }
                Some(actual) if *actual != expected => {
                    return Err(ServiceError::InvalidSubmission(format!(
                        "account title {} is a {} title but was submitted as {}",
                        title_id, actual, expected
                    )));
                }
                Some(_) => {}
            }

            if !shop.period_type.contains_month(cell.month) {
                return Err(ServiceError::InvalidSubmission(format!(
                    "month {} is not a reporting month for {} shops",
                    cell.month, shop.period_type
                )));
            }
            if cell.year != year {
                return Err(ServiceError::InvalidSubmission(format!(
                    "cell year {} does not match period year {}",
                    cell.year, year
                )));
            }
            if !seen.insert((title_id, cell.month)) {
                return Err(ServiceError::InvalidSubmission(format!(
                    "duplicate cell for account title {} month {}",
                    title_id, cell.month
                )));
            }

            let mut amount =
                amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            amount.rescale(2);
            if amount.abs() >= limit {
                return Err(ServiceError::InvalidSubmission(format!(
                    "amount {} is out of range",
                    amount
                )));
            }

            entries.push(NewAccountEntry {
                shop_id: shop.id,
                shop_account_title_id: title_id,
                year,
                month: cell.month,
                amount,
            });
        }
    }

    Ok(entries)
}

async fn load_shop_and_titles(
    store: &dyn AccountingStore,
    shop_id: i64,
) -> Result<(Shop, Vec<AccountTitle>), ServiceError> {
    let shop = store
        .find_shop(shop_id)
        .await?
        .ok_or(ServiceError::ShopNotFound)?;

    let titles = store.find_titles_by_shop(shop_id).await?;
    if titles.is_empty() {
        return Err(ServiceError::TitlesNotConfigured);
    }

    Ok((shop, titles))
}

fn outcome<T>(result: &Result<T, ServiceError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    }
}

/// Build the display matrix for one shop and year.
#[instrument(skip(store))]
pub async fn build_matrix(
    store: &dyn AccountingStore,
    shop_id: i64,
    year: i32,
) -> Result<PeriodMatrix, ServiceError> {
    let result = build(store, shop_id, year).await;
    record_matrix_operation("build", outcome(&result));
    result
}

async fn build(
    store: &dyn AccountingStore,
    shop_id: i64,
    year: i32,
) -> Result<PeriodMatrix, ServiceError> {
    check_year(year)?;
    let (shop, titles) = load_shop_and_titles(store, shop_id).await?;
    let entries = store.find_entries_by_shop_and_year(shop_id, year).await?;

    let matrix = assemble(&shop, year, &partition_titles(titles), &entries);

    for anomaly in &matrix.anomalies {
        warn!(
            shop_id,
            year,
            entry_id = anomaly.entry_id,
            shop_account_title_id = anomaly.shop_account_title_id,
            month = anomaly.month,
            reason = anomaly.reason.as_str(),
            "Persisted entry left out of matrix"
        );
        record_entry_anomaly(anomaly.reason.as_str());
    }

    Ok(matrix)
}

/// Replace every entry of (shop, year) with the non-empty submitted cells,
/// then return the rebuilt matrix.
///
/// Delete and insert commit together; any failure leaves prior data intact.
#[instrument(skip(store, revenues, expenses))]
pub async fn replace_period(
    store: &dyn AccountingStore,
    shop_id: i64,
    year: i32,
    revenues: &[Vec<EntryCell>],
    expenses: &[Vec<EntryCell>],
) -> Result<PeriodMatrix, ServiceError> {
    let result = replace(store, shop_id, year, revenues, expenses).await;
    record_matrix_operation("replace", outcome(&result));
    result?;

    build_matrix(store, shop_id, year).await
}

async fn replace(
    store: &dyn AccountingStore,
    shop_id: i64,
    year: i32,
    revenues: &[Vec<EntryCell>],
    expenses: &[Vec<EntryCell>],
) -> Result<(), ServiceError> {
    check_year(year)?;

    // Validate against the shop and titles as locked by this transaction, so
    // a concurrent cadence or title change cannot slip in before commit.
    let mut tx = store.begin().await?;
    tx.lock_period(shop_id, year).await?;
    let shop = tx
        .find_shop(shop_id)
        .await?
        .ok_or(ServiceError::ShopNotFound)?;
    let titles = tx.find_titles_by_shop(shop_id).await?;
    if titles.is_empty() {
        return Err(ServiceError::TitlesNotConfigured);
    }
    let entries = collect_submission(&shop, &titles, year, revenues, expenses)?;

    let deleted = tx.delete_entries_by_shop_and_year(shop_id, year).await?;
    let inserted = tx.insert_entries(&entries).await?;
    tx.commit().await?;

    info!(shop_id, year, deleted, inserted, "Period entries replaced");
    Ok(())
}
