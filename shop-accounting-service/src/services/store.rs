//! Storage seam shared by the PostgreSQL and in-memory backends.

use crate::models::{
    AccountEntry, AccountTitle, CreateAccountTitle, CreateShop, NewAccountEntry, NewUser, Shop,
    User,
};
use async_trait::async_trait;
use service_core::error::AppError;

/// Persistence operations the service layer depends on.
///
/// `update_*` persist every mutable field of the passed model and return the
/// stored row with a fresh `updated_at`.
#[async_trait]
pub trait AccountingStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Users
    async fn create_user(&self, input: &NewUser) -> Result<User, AppError>;
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    // Shops
    async fn list_shops(&self, offset: i64, limit: i64) -> Result<Vec<Shop>, AppError>;
    async fn find_shop(&self, shop_id: i64) -> Result<Option<Shop>, AppError>;
    async fn create_shop(&self, input: &CreateShop) -> Result<Shop, AppError>;
    async fn update_shop(&self, shop: &Shop) -> Result<Shop, AppError>;
    /// Deletes the shop with its titles and entries. Returns false if absent.
    async fn delete_shop(&self, shop_id: i64) -> Result<bool, AppError>;

    // Account titles
    /// Titles of a shop in retrieval order (id ascending).
    async fn find_titles_by_shop(&self, shop_id: i64) -> Result<Vec<AccountTitle>, AppError>;
    async fn find_title(
        &self,
        shop_id: i64,
        title_id: i64,
    ) -> Result<Option<AccountTitle>, AppError>;
    async fn create_title(
        &self,
        shop_id: i64,
        input: &CreateAccountTitle,
    ) -> Result<AccountTitle, AppError>;
    async fn update_title(&self, title: &AccountTitle) -> Result<AccountTitle, AppError>;
    /// Deletes the title with its entries. Returns false if absent.
    async fn delete_title(&self, shop_id: i64, title_id: i64) -> Result<bool, AppError>;

    // Account entries
    async fn find_entries_by_shop_and_year(
        &self,
        shop_id: i64,
        year: i32,
    ) -> Result<Vec<AccountEntry>, AppError>;

    /// Start a unit of work for replacing a period's entries.
    async fn begin(&self) -> Result<Box<dyn EntryTransaction>, AppError>;
}

/// Entry writes that commit or roll back together.
///
/// Dropping the transaction without calling `commit` discards every write.
#[async_trait]
pub trait EntryTransaction: Send {
    /// Serialize with other replacements of the same (shop, year).
    async fn lock_period(&mut self, shop_id: i64, year: i32) -> Result<(), AppError>;

    /// Read the shop inside the transaction, blocking concurrent updates to
    /// it until commit.
    async fn find_shop(&mut self, shop_id: i64) -> Result<Option<Shop>, AppError>;

    /// Titles of a shop in id order, read and held like `find_shop`.
    async fn find_titles_by_shop(&mut self, shop_id: i64) -> Result<Vec<AccountTitle>, AppError>;

    async fn delete_entries_by_shop_and_year(
        &mut self,
        shop_id: i64,
        year: i32,
    ) -> Result<u64, AppError>;

    async fn insert_entries(&mut self, entries: &[NewAccountEntry]) -> Result<u64, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
