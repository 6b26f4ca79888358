//! Process-local store used by tests and database-less local runs.

use crate::models::{
    AccountEntry, AccountTitle, CreateAccountTitle, CreateShop, NewAccountEntry, NewUser, Shop,
    User,
};
use crate::services::store::{AccountingStore, EntryTransaction};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    shops: BTreeMap<i64, Shop>,
    titles: BTreeMap<i64, AccountTitle>,
    entries: BTreeMap<i64, AccountEntry>,
    last_user_id: i64,
    last_shop_id: i64,
    last_title_id: i64,
    last_entry_id: i64,
}

impl MemoryState {
    fn push_entry(&mut self, input: &NewAccountEntry) -> AccountEntry {
        self.last_entry_id += 1;
        let now = Utc::now();
        let entry = AccountEntry {
            id: self.last_entry_id,
            shop_id: input.shop_id,
            shop_account_title_id: input.shop_account_title_id,
            year: input.year,
            month: input.month,
            amount: input.amount,
            created_at: now,
            updated_at: now,
        };
        self.entries.insert(entry.id, entry.clone());
        entry
    }
}

/// In-memory `AccountingStore`.
///
/// Clones share state. An open entry transaction holds the store lock until
/// it commits or drops, so only one runs at a time.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_insert: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_entries` call fail.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Store an entry as-is, bypassing submission checks.
    pub async fn seed_entry(&self, input: NewAccountEntry) -> AccountEntry {
        self.state.lock().await.push_entry(&input)
    }
}

#[async_trait]
impl AccountingStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_user(&self, input: &NewUser) -> Result<User, AppError> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.username == input.username || u.email == input.email)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Username or email already registered"
            )));
        }

        state.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: state.last_user_id,
            username: input.username.clone(),
            email: input.email.clone(),
            hashed_password: input.hashed_password.clone(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_shops(&self, offset: i64, limit: i64) -> Result<Vec<Shop>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .shops
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find_shop(&self, shop_id: i64) -> Result<Option<Shop>, AppError> {
        Ok(self.state.lock().await.shops.get(&shop_id).cloned())
    }

    async fn create_shop(&self, input: &CreateShop) -> Result<Shop, AppError> {
        let mut state = self.state.lock().await;
        state.last_shop_id += 1;
        let now = Utc::now();
        let shop = Shop {
            id: state.last_shop_id,
            name: input.name.clone(),
            description: input.description.clone(),
            period_type: input.period_type,
            is_cumulative: input.is_cumulative,
            created_at: now,
            updated_at: now,
        };
        state.shops.insert(shop.id, shop.clone());
        Ok(shop)
    }

    async fn update_shop(&self, shop: &Shop) -> Result<Shop, AppError> {
        let mut state = self.state.lock().await;
        let stored = state
            .shops
            .get_mut(&shop.id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Shop not found")))?;

        stored.name = shop.name.clone();
        stored.description = shop.description.clone();
        stored.period_type = shop.period_type;
        stored.is_cumulative = shop.is_cumulative;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_shop(&self, shop_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        if state.shops.remove(&shop_id).is_none() {
            return Ok(false);
        }
        state.titles.retain(|_, t| t.shop_id != shop_id);
        state.entries.retain(|_, e| e.shop_id != shop_id);
        Ok(true)
    }

    async fn find_titles_by_shop(&self, shop_id: i64) -> Result<Vec<AccountTitle>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .titles
            .values()
            .filter(|t| t.shop_id == shop_id)
            .cloned()
            .collect())
    }

    async fn find_title(
        &self,
        shop_id: i64,
        title_id: i64,
    ) -> Result<Option<AccountTitle>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .titles
            .get(&title_id)
            .filter(|t| t.shop_id == shop_id)
            .cloned())
    }

    async fn create_title(
        &self,
        shop_id: i64,
        input: &CreateAccountTitle,
    ) -> Result<AccountTitle, AppError> {
        let mut state = self.state.lock().await;
        if !state.shops.contains_key(&shop_id) {
            return Err(AppError::NotFound(anyhow::anyhow!("Shop not found")));
        }

        state.last_title_id += 1;
        let now = Utc::now();
        let title = AccountTitle {
            id: state.last_title_id,
            shop_id,
            title_type: input.title_type,
            sub_type: input.sub_type,
            code: input.code.clone(),
            name: input.name.clone(),
            order: input.order,
            created_at: now,
            updated_at: now,
        };
        state.titles.insert(title.id, title.clone());
        Ok(title)
    }

    async fn update_title(&self, title: &AccountTitle) -> Result<AccountTitle, AppError> {
        let mut state = self.state.lock().await;
        let stored = state
            .titles
            .get_mut(&title.id)
            .filter(|t| t.shop_id == title.shop_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account title not found")))?;

        stored.title_type = title.title_type;
        stored.sub_type = title.sub_type;
        stored.code = title.code.clone();
        stored.name = title.name.clone();
        stored.order = title.order;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_title(&self, shop_id: i64, title_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let owned = state
            .titles
            .get(&title_id)
            .is_some_and(|t| t.shop_id == shop_id);
        if !owned {
            return Ok(false);
        }
        state.titles.remove(&title_id);
        state
            .entries
            .retain(|_, e| e.shop_account_title_id != title_id);
        Ok(true)
    }

    async fn find_entries_by_shop_and_year(
        &self,
        shop_id: i64,
        year: i32,
    ) -> Result<Vec<AccountEntry>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .values()
            .filter(|e| e.shop_id == shop_id && e.year == year)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn EntryTransaction>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let entries = guard.entries.clone();
        let last_entry_id = guard.last_entry_id;
        Ok(Box::new(MemoryEntryTransaction {
            guard,
            entries,
            last_entry_id,
            fail_next_insert: self.fail_next_insert.clone(),
        }))
    }
}

/// Works on a copy of the entry table; `commit` swaps it in.
pub struct MemoryEntryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    entries: BTreeMap<i64, AccountEntry>,
    last_entry_id: i64,
    fail_next_insert: Arc<AtomicBool>,
}

#[async_trait]
impl EntryTransaction for MemoryEntryTransaction {
    async fn lock_period(&mut self, _shop_id: i64, _year: i32) -> Result<(), AppError> {
        // The store guard already excludes every other transaction.
        Ok(())
    }

    async fn find_shop(&mut self, shop_id: i64) -> Result<Option<Shop>, AppError> {
        Ok(self.guard.shops.get(&shop_id).cloned())
    }

    async fn find_titles_by_shop(&mut self, shop_id: i64) -> Result<Vec<AccountTitle>, AppError> {
        Ok(self
            .guard
            .titles
            .values()
            .filter(|t| t.shop_id == shop_id)
            .cloned()
            .collect())
    }

    async fn delete_entries_by_shop_and_year(
        &mut self,
        shop_id: i64,
        year: i32,
    ) -> Result<u64, AppError> {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| !(e.shop_id == shop_id && e.year == year));
        Ok((before - self.entries.len()) as u64)
    }

    async fn insert_entries(&mut self, entries: &[NewAccountEntry]) -> Result<u64, AppError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Failed to insert entries: injected failure"
            )));
        }

        let now = Utc::now();
        for input in entries {
            self.last_entry_id += 1;
            self.entries.insert(
                self.last_entry_id,
                AccountEntry {
                    id: self.last_entry_id,
                    shop_id: input.shop_id,
                    shop_account_title_id: input.shop_account_title_id,
                    year: input.year,
                    month: input.month,
                    amount: input.amount,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Ok(entries.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryEntryTransaction {
            mut guard,
            entries,
            last_entry_id,
            ..
        } = *self;
        guard.entries = entries;
        guard.last_entry_id = last_entry_id;
        Ok(())
    }
}
