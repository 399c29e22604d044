//! SQLite storage backend for mirror-store.

use crate::error::StoreError;
use crate::feed::{FeedRegistry, UserFeed};
use crate::UserStore;
use async_trait::async_trait;
use mirror_types::{Address, Company, Geo, SearchQuery, UserId, UserRecord};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const SELECT_FILTERED: &str = r#"
    SELECT id, name, username, email, street, suite, city, zipcode, lat, lng,
           phone, website, company_name, company_catch_phrase, company_bs, synced_at
    FROM users
    WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR email LIKE ?1 ESCAPE '\')
    ORDER BY name ASC, id ASC
"#;

const SELECT_PAGE: &str = r#"
    SELECT id, name, username, email, street, suite, city, zipcode, lat, lng,
           phone, website, company_name, company_catch_phrase, company_bs, synced_at
    FROM users
    WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR email LIKE ?1 ESCAPE '\')
    ORDER BY name ASC, id ASC
    LIMIT ?2 OFFSET ?3
"#;

/// SQLite-based user storage.
///
/// Uses WAL mode so readers keep seeing the previous set until a replace
/// commits.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
    feeds: Arc<FeedRegistry>,
    /// Serializes replace + publish so feeds never go backwards.
    writer: Arc<Mutex<()>>,
}

impl SqliteUserStore {
    /// Open (or create) a store at the given database path.
    ///
    /// Missing parent directories are created.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::InvalidPath {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!("Opened user store at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Create an in-memory store (for testing).
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(":memory:")?;

        // Every connection to :memory: is a separate database, so the pool
        // holds exactly one connection and never recycles it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self {
            pool,
            feeds: Arc::new(FeedRegistry::default()),
            writer: Arc::new(Mutex::new(())),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                street TEXT NOT NULL,
                suite TEXT NOT NULL,
                city TEXT NOT NULL,
                zipcode TEXT NOT NULL,
                lat TEXT NOT NULL,
                lng TEXT NOT NULL,
                phone TEXT NOT NULL,
                website TEXT NOT NULL,
                company_name TEXT NOT NULL,
                company_catch_phrase TEXT NOT NULL,
                company_bs TEXT NOT NULL,
                synced_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_name ON users(name, id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

impl std::fmt::Debug for SqliteUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteUserStore")
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

async fn fetch_filtered(
    pool: &SqlitePool,
    query: Option<&SearchQuery>,
) -> Result<Vec<UserRecord>, StoreError> {
    let rows = sqlx::query_as::<_, UserRow>(SELECT_FILTERED)
        .bind(query.map(SearchQuery::like_pattern))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(UserRecord::from).collect())
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn replace_all(&self, records: &[UserRecord]) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM users").execute(&mut *tx).await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO users (
                    id, name, username, email, street, suite, city, zipcode, lat, lng,
                    phone, website, company_name, company_catch_phrase, company_bs, synced_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
            )
            .bind(record.id.value())
            .bind(&record.name)
            .bind(&record.username)
            .bind(&record.email)
            .bind(&record.address.street)
            .bind(&record.address.suite)
            .bind(&record.address.city)
            .bind(&record.address.zipcode)
            .bind(&record.address.geo.lat)
            .bind(&record.address.geo.lng)
            .bind(&record.phone)
            .bind(&record.website)
            .bind(&record.company.name)
            .bind(&record.company.catch_phrase)
            .bind(&record.company.bs)
            .bind(record.synced_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Replaced user store contents ({} records)", records.len());

        let pool = &self.pool;
        self.feeds
            .publish(move |query| async move { fetch_filtered(pool, query.as_ref()).await })
            .await;

        Ok(())
    }

    async fn observe_filtered(
        &self,
        query: Option<&SearchQuery>,
    ) -> Result<UserFeed, StoreError> {
        self.feeds
            .subscribe(query, || fetch_filtered(&self.pool, query))
            .await
    }

    async fn page(
        &self,
        query: Option<&SearchQuery>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(SELECT_PAGE)
            .bind(query.map(SearchQuery::like_pattern))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, username, email, street, suite, city, zipcode, lat, lng,
                   phone, website, company_name, company_catch_phrase, company_bs, synced_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRecord::from))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn last_synced_at(&self) -> Result<Option<i64>, StoreError> {
        let synced_at: Option<i64> = sqlx::query_scalar("SELECT MAX(synced_at) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(synced_at)
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    username: String,
    email: String,
    street: String,
    suite: String,
    city: String,
    zipcode: String,
    lat: String,
    lng: String,
    phone: String,
    website: String,
    company_name: String,
    company_catch_phrase: String,
    company_bs: String,
    synced_at: Option<i64>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: UserId::new(row.id),
            name: row.name,
            username: row.username,
            email: row.email,
            address: Address {
                street: row.street,
                suite: row.suite,
                city: row.city,
                zipcode: row.zipcode,
                geo: Geo {
                    lat: row.lat,
                    lng: row.lng,
                },
            },
            phone: row.phone,
            website: row.website,
            company: Company {
                name: row.company_name,
                catch_phrase: row.company_catch_phrase,
                bs: row.company_bs,
            },
            synced_at: row.synced_at,
        }
    }
}
