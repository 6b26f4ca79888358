//! PostgreSQL store for shop-accounting-service.

use crate::models::{
    AccountEntry, AccountTitle, AccountTitleSubType, AccountTitleType, CreateAccountTitle,
    CreateShop, NewAccountEntry, NewUser, PeriodType, Shop, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{AccountingStore, EntryTransaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(FromRow)]
struct ShopRow {
    id: i64,
    name: String,
    description: Option<String>,
    period_type: String,
    is_cumulative: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShopRow> for Shop {
    type Error = AppError;

    fn try_from(row: ShopRow) -> Result<Self, Self::Error> {
        let period_type = PeriodType::parse(&row.period_type).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Unknown period_type '{}' on shop {}",
                row.period_type,
                row.id
            ))
        })?;

        Ok(Shop {
            id: row.id,
            name: row.name,
            description: row.description,
            period_type,
            is_cumulative: row.is_cumulative,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TitleRow {
    id: i64,
    shop_id: i64,
    title_type: String,
    sub_type: String,
    code: Option<String>,
    name: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TitleRow> for AccountTitle {
    type Error = AppError;

    fn try_from(row: TitleRow) -> Result<Self, Self::Error> {
        let title_type = AccountTitleType::parse(&row.title_type).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Unknown title_type '{}' on title {}",
                row.title_type,
                row.id
            ))
        })?;
        let sub_type = AccountTitleSubType::parse(&row.sub_type).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Unknown sub_type '{}' on title {}",
                row.sub_type,
                row.id
            ))
        })?;

        Ok(AccountTitle {
            id: row.id,
            shop_id: row.shop_id,
            title_type,
            sub_type,
            code: row.code,
            name: row.name,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Single advisory lock key per (shop, year). Years are four digits.
fn period_lock_key(shop_id: i64, year: i32) -> i64 {
    shop_id.wrapping_mul(10_000).wrapping_add(i64::from(year))
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "shop-accounting-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl AccountingStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_user(&self, input: &NewUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Username or email already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();
        info!(user_id = user.id, "User created");

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_id"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch user: {}", e)))?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_username"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch user: {}", e)))?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_email"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch user: {}", e)))?;

        timer.observe_duration();
        Ok(user)
    }

    // =========================================================================
    // Shop Operations
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_shops(&self, offset: i64, limit: i64) -> Result<Vec<Shop>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_shops"])
            .start_timer();

        let rows = sqlx::query_as::<_, ShopRow>(
            r#"
            SELECT id, name, description, period_type, is_cumulative, created_at, updated_at
            FROM shops
            ORDER BY id
            OFFSET $1
            LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list shops: {}", e)))?;

        timer.observe_duration();
        rows.into_iter().map(Shop::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn find_shop(&self, shop_id: i64) -> Result<Option<Shop>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_shop"])
            .start_timer();

        let row = sqlx::query_as::<_, ShopRow>(
            r#"
            SELECT id, name, description, period_type, is_cumulative, created_at, updated_at
            FROM shops
            WHERE id = $1
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch shop: {}", e)))?;

        timer.observe_duration();
        row.map(Shop::try_from).transpose()
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_shop(&self, input: &CreateShop) -> Result<Shop, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_shop"])
            .start_timer();

        let row = sqlx::query_as::<_, ShopRow>(
            r#"
            INSERT INTO shops (name, description, period_type, is_cumulative)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, period_type, is_cumulative, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.period_type.as_str())
        .bind(input.is_cumulative)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create shop: {}", e)))?;

        timer.observe_duration();

        let shop = Shop::try_from(row)?;
        info!(shop_id = shop.id, period_type = %shop.period_type, "Shop created");
        Ok(shop)
    }

    #[instrument(skip(self, shop), fields(shop_id = shop.id))]
    async fn update_shop(&self, shop: &Shop) -> Result<Shop, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_shop"])
            .start_timer();

        let row = sqlx::query_as::<_, ShopRow>(
            r#"
            UPDATE shops
            SET name = $2, description = $3, period_type = $4, is_cumulative = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, period_type, is_cumulative, created_at, updated_at
            "#,
        )
        .bind(shop.id)
        .bind(&shop.name)
        .bind(&shop.description)
        .bind(shop.period_type.as_str())
        .bind(shop.is_cumulative)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update shop: {}", e)))?;

        timer.observe_duration();

        let row = row.ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Shop not found")))?;
        Shop::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete_shop(&self, shop_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_shop"])
            .start_timer();

        let result = sqlx::query("DELETE FROM shops WHERE id = $1")
            .bind(shop_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete shop: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(shop_id, "Shop deleted");
        }
        Ok(deleted)
    }

    // =========================================================================
    // Account Title Operations
    // =========================================================================

    #[instrument(skip(self))]
    async fn find_titles_by_shop(&self, shop_id: i64) -> Result<Vec<AccountTitle>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_titles_by_shop"])
            .start_timer();

        let rows = sqlx::query_as::<_, TitleRow>(
            r#"
            SELECT id, shop_id, title_type, sub_type, code, name, sort_order, created_at, updated_at
            FROM shop_account_titles
            WHERE shop_id = $1
            ORDER BY id
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch account titles: {}", e))
        })?;

        timer.observe_duration();
        rows.into_iter().map(AccountTitle::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn find_title(
        &self,
        shop_id: i64,
        title_id: i64,
    ) -> Result<Option<AccountTitle>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_title"])
            .start_timer();

        let row = sqlx::query_as::<_, TitleRow>(
            r#"
            SELECT id, shop_id, title_type, sub_type, code, name, sort_order, created_at, updated_at
            FROM shop_account_titles
            WHERE shop_id = $1 AND id = $2
            "#,
        )
        .bind(shop_id)
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch account title: {}", e))
        })?;

        timer.observe_duration();
        row.map(AccountTitle::try_from).transpose()
    }

    #[instrument(skip(self, input), fields(title_type = %input.title_type))]
    async fn create_title(
        &self,
        shop_id: i64,
        input: &CreateAccountTitle,
    ) -> Result<AccountTitle, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_title"])
            .start_timer();

        let row = sqlx::query_as::<_, TitleRow>(
            r#"
            INSERT INTO shop_account_titles (shop_id, title_type, sub_type, code, name, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, shop_id, title_type, sub_type, code, name, sort_order, created_at, updated_at
            "#,
        )
        .bind(shop_id)
        .bind(input.title_type.as_str())
        .bind(input.sub_type.as_str())
        .bind(&input.code)
        .bind(&input.name)
        .bind(input.order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Shop not found"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create account title: {}", e)),
        })?;

        timer.observe_duration();

        let title = AccountTitle::try_from(row)?;
        info!(title_id = title.id, "Account title created");
        Ok(title)
    }

    #[instrument(skip(self, title), fields(shop_id = title.shop_id, title_id = title.id))]
    async fn update_title(&self, title: &AccountTitle) -> Result<AccountTitle, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_title"])
            .start_timer();

        let row = sqlx::query_as::<_, TitleRow>(
            r#"
            UPDATE shop_account_titles
            SET title_type = $3, sub_type = $4, code = $5, name = $6, sort_order = $7, updated_at = NOW()
            WHERE shop_id = $1 AND id = $2
            RETURNING id, shop_id, title_type, sub_type, code, name, sort_order, created_at, updated_at
            "#,
        )
        .bind(title.shop_id)
        .bind(title.id)
        .bind(title.title_type.as_str())
        .bind(title.sub_type.as_str())
        .bind(&title.code)
        .bind(&title.name)
        .bind(title.order)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update account title: {}", e))
        })?;

        timer.observe_duration();

        let row =
            row.ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account title not found")))?;
        AccountTitle::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete_title(&self, shop_id: i64, title_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_title"])
            .start_timer();

        let result = sqlx::query("DELETE FROM shop_account_titles WHERE shop_id = $1 AND id = $2")
            .bind(shop_id)
            .bind(title_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete account title: {}", e))
            })?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Account Entry Operations
    // =========================================================================

    #[instrument(skip(self))]
    async fn find_entries_by_shop_and_year(
        &self,
        shop_id: i64,
        year: i32,
    ) -> Result<Vec<AccountEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_entries_by_shop_and_year"])
            .start_timer();

        let entries = sqlx::query_as::<_, AccountEntry>(
            r#"
            SELECT id, shop_id, shop_account_title_id, year, month, amount, created_at, updated_at
            FROM shop_account_entries
            WHERE shop_id = $1 AND year = $2
            ORDER BY id
            "#,
        )
        .bind(shop_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch account entries: {}", e))
        })?;

        timer.observe_duration();
        Ok(entries)
    }

    async fn begin(&self) -> Result<Box<dyn EntryTransaction>, AppError> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;
        Ok(Box::new(PgEntryTransaction { tx }))
    }
}

/// Entry writes inside one PostgreSQL transaction. Rolls back on drop.
pub struct PgEntryTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EntryTransaction for PgEntryTransaction {
    #[instrument(skip(self))]
    async fn lock_period(&mut self, shop_id: i64, year: i32) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_period"])
            .start_timer();

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(period_lock_key(shop_id, year))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to lock period: {}", e))
            })?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_shop(&mut self, shop_id: i64) -> Result<Option<Shop>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_shop_for_share"])
            .start_timer();

        let row = sqlx::query_as::<_, ShopRow>(
            r#"
            SELECT id, name, description, period_type, is_cumulative, created_at, updated_at
            FROM shops
            WHERE id = $1
            FOR SHARE
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch shop: {}", e)))?;

        timer.observe_duration();
        row.map(Shop::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_titles_by_shop(&mut self, shop_id: i64) -> Result<Vec<AccountTitle>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_titles_by_shop_for_share"])
            .start_timer();

        let rows = sqlx::query_as::<_, TitleRow>(
            r#"
            SELECT id, shop_id, title_type, sub_type, code, name, sort_order, created_at, updated_at
            FROM shop_account_titles
            WHERE shop_id = $1
            ORDER BY id
            FOR SHARE
            "#,
        )
        .bind(shop_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch account titles: {}", e))
        })?;

        timer.observe_duration();
        rows.into_iter().map(AccountTitle::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn delete_entries_by_shop_and_year(
        &mut self,
        shop_id: i64,
        year: i32,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_entries_by_shop_and_year"])
            .start_timer();

        let result =
            sqlx::query("DELETE FROM shop_account_entries WHERE shop_id = $1 AND year = $2")
                .bind(shop_id)
                .bind(year)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete entries: {}", e))
                })?;

        timer.observe_duration();
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn insert_entries(&mut self, entries: &[NewAccountEntry]) -> Result<u64, AppError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_entries"])
            .start_timer();

        let shop_ids: Vec<i64> = entries.iter().map(|e| e.shop_id).collect();
        let title_ids: Vec<i64> = entries.iter().map(|e| e.shop_account_title_id).collect();
        let years: Vec<i32> = entries.iter().map(|e| e.year).collect();
        let months: Vec<i32> = entries.iter().map(|e| e.month).collect();
        let amounts: Vec<Decimal> = entries.iter().map(|e| e.amount).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO shop_account_entries (shop_id, shop_account_title_id, year, month, amount)
            SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::INT[], $4::INT[], $5::NUMERIC[])
            "#,
        )
        .bind(shop_ids)
        .bind(title_ids)
        .bind(years)
        .bind(months)
        .bind(amounts)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert entries: {}", e)))?;

        timer.observe_duration();
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })
    }
}
