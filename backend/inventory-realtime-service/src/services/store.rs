/// Inventory store access for the expiry scanner
///
/// The scanner reads the store through [`InventoryStore`] only. The
/// PostgreSQL implementation joins inventory with products and owners; the
/// in-memory implementation applies the same filter for tests and local runs.
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::{ExpiringItem, ScanWindow};

pub const ACTIVE_STATUS: &str = "active";

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Active records whose expiry date falls inside `window`, joined with
    /// product name and owning user.
    async fn find_expiring(&self, window: &ScanWindow) -> Result<Vec<ExpiringItem>>;

    /// Cheap liveness check
    async fn ping(&self) -> Result<()>;
}

const FIND_EXPIRING_SQL: &str = r#"
    SELECT i.user_id::text    AS user_id,
           i.product_id::text AS product_id,
           p.name             AS product_name,
           i.expiry_date      AS expiry_date,
           i.status           AS status,
           i.quantity         AS quantity
    FROM inventory i
    JOIN products p ON p.id = i.product_id
    JOIN users u ON u.id = i.user_id
    WHERE i.expiry_date >= $1
      AND i.expiry_date <= $2
      AND i.status = $3
    ORDER BY i.expiry_date ASC
"#;

#[derive(Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the pool and verify it with `SELECT 1` under the connect timeout.
    ///
    /// Failure here is fatal to the process.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        debug!(
            max_connections = config.max_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            "Creating inventory store pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .test_before_acquire(true)
            .connect(&config.url)
            .await?;

        let store = Self::new(pool);
        match tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            store.ping(),
        )
        .await
        {
            Ok(Ok(())) => {
                info!("Inventory store connected and verified");
                Ok(store)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Inventory store verification failed");
                Err(e)
            }
            Err(_) => {
                error!(
                    timeout_secs = config.connect_timeout_secs,
                    "Inventory store verification timeout"
                );
                Err(AppError::StoreTimeout(config.connect_timeout_secs))
            }
        }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn find_expiring(&self, window: &ScanWindow) -> Result<Vec<ExpiringItem>> {
        let items = sqlx::query_as::<_, ExpiringItem>(FIND_EXPIRING_SQL)
            .bind(window.start)
            .bind(window.end)
            .bind(ACTIVE_STATUS)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// In-process store with the same filter semantics as the SQL query
#[derive(Default)]
pub struct MemoryInventoryStore {
    items: RwLock<Vec<ExpiringItem>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<ExpiringItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub async fn insert(&self, item: ExpiringItem) {
        self.items.write().await.push(item);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn find_expiring(&self, window: &ScanWindow) -> Result<Vec<ExpiringItem>> {
        let items = self.items.read().await;
        let mut matched: Vec<ExpiringItem> = items
            .iter()
            .filter(|item| item.status == ACTIVE_STATUS && window.contains(item.expiry_date))
            .cloned()
            .collect();
        matched.sort_by_key(|item| item.expiry_date);
        Ok(matched)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn item(name: &str, status: &str, expires_in: ChronoDuration) -> ExpiringItem {
        ExpiringItem {
            user_id: "u1".to_string(),
            product_id: format!("p-{}", name),
            product_name: name.to_string(),
            expiry_date: Utc::now() + expires_in,
            status: status.to_string(),
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn test_memory_store_filters_status_and_window() {
        let store = MemoryInventoryStore::with_items(vec![
            item("Milk", ACTIVE_STATUS, ChronoDuration::days(2)),
            item("Bread", ACTIVE_STATUS, ChronoDuration::hours(6)),
            item("Cheese", "consumed", ChronoDuration::days(1)),
            item("Rice", ACTIVE_STATUS, ChronoDuration::days(10)),
            item("Eggs", ACTIVE_STATUS, ChronoDuration::days(-1)),
        ]);

        let window = ScanWindow::starting_at(Utc::now(), 7);
        let found = store.find_expiring(&window).await.unwrap();
        let names: Vec<&str> = found.iter().map(|i| i.product_name.as_str()).collect();

        // ordered by expiry date
        assert_eq!(names, vec!["Bread", "Milk"]);
    }

    #[tokio::test]
    async fn test_memory_store_insert() {
        let store = MemoryInventoryStore::new();
        assert!(store.is_empty().await);
        store
            .insert(item("Milk", ACTIVE_STATUS, ChronoDuration::days(1)))
            .await;
        assert_eq!(store.len().await, 1);
        assert!(store.ping().await.is_ok());
    }

    #[test]
    fn test_query_filters_on_window_and_status() {
        assert!(FIND_EXPIRING_SQL.contains("i.expiry_date >= $1"));
        assert!(FIND_EXPIRING_SQL.contains("i.expiry_date <= $2"));
        assert!(FIND_EXPIRING_SQL.contains("i.status = $3"));
        assert!(FIND_EXPIRING_SQL.contains("JOIN products"));
    }
}
