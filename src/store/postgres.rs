// src/store/postgres.rs - PostgreSQL-backed catalog (one JSONB table per collection)
use anyhow::{Context, Result};
use async_trait::async_trait;
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::{debug, info};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

use super::{conflict, CatalogStore, Collection, Filter, StoreResult, WriteOp};
use crate::errors::StoreError;
use crate::utils::config::PostgresSettings;

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

const SCHEMA: &str = "reconcile";

fn table(collection: Collection) -> String {
    format!("{}.{}", SCHEMA, collection.as_str())
}

fn build_pg_config(settings: &PostgresSettings) -> Config {
    let mut config = Config::new();
    info!(
        "DB Config: Host={}, Port={}, DB={}, User={}",
        settings.host, settings.port, settings.dbname, settings.user
    );
    config
        .host(&settings.host)
        .port(settings.port)
        .dbname(&settings.dbname)
        .user(&settings.user)
        .password(&settings.password);
    config.application_name("venue_reconcile");
    config.connect_timeout(Duration::from_secs(10));
    config
}

/// Initializes the database connection pool.
pub async fn connect(settings: &PostgresSettings) -> Result<PgPool> {
    let config = build_pg_config(settings);
    info!("Connecting to PostgreSQL database...");
    let manager = PostgresConnectionManager::new(config, NoTls);

    let pool = Pool::builder()
        .max_size(settings.max_connections)
        .min_idle(Some(1))
        .idle_timeout(Some(Duration::from_secs(180)))
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .context("Failed to build database connection pool")?;

    let conn = pool
        .get()
        .await
        .context("Failed to get test connection from pool")?;
    conn.query_one("SELECT 1", &[])
        .await
        .context("Test query 'SELECT 1' failed")?;
    drop(conn);
    info!("Database connection pool initialized successfully.");
    Ok(pool)
}

fn pool_error(e: bb8::RunError<tokio_postgres::Error>) -> StoreError {
    match e {
        bb8::RunError::User(err) => StoreError::Postgres(err),
        bb8::RunError::TimedOut => StoreError::Pool("timed out waiting for a connection".into()),
    }
}

/// JSONB containment document for a conjunction of equality filters.
fn containment(filters: &[Filter]) -> Value {
    let mut object = Map::new();
    for f in filters {
        object.insert(f.field.to_string(), f.value.clone());
    }
    Value::Object(object)
}

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &PostgresSettings) -> Result<Self> {
        let pool = connect(settings).await?;
        let catalog = Self::new(pool);
        catalog
            .ensure_schema()
            .await
            .context("Failed to create catalog schema")?;
        Ok(catalog)
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.pool.get().await.map_err(pool_error)?;
        let mut ddl = format!("CREATE SCHEMA IF NOT EXISTS {};", SCHEMA);
        for collection in Collection::ALL {
            let name = table(collection);
            ddl.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {name} (
                    id TEXT PRIMARY KEY,
                    data JSONB NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                CREATE INDEX IF NOT EXISTS {coll}_data_gin ON {name} USING GIN (data jsonb_path_ops);",
                name = name,
                coll = collection.as_str(),
            ));
        }
        conn.batch_execute(&ddl).await?;
        debug!("Catalog schema '{}' ready", SCHEMA);
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        let conn = self.pool.get().await.map_err(pool_error)?;
        let sql = format!("SELECT data FROM {} WHERE id = $1", table(collection));
        let row = conn.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.map(|r| r.get::<_, Value>("data")))
    }

    async fn query(&self, collection: Collection, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        let conn = self.pool.get().await.map_err(pool_error)?;
        let rows = if filters.is_empty() {
            let sql = format!("SELECT data FROM {} ORDER BY id", table(collection));
            conn.query(sql.as_str(), &[]).await?
        } else {
            let sql = format!(
                "SELECT data FROM {} WHERE data @> $1 ORDER BY id",
                table(collection)
            );
            let predicate = containment(filters);
            conn.query(sql.as_str(), &[&predicate]).await?
        };
        Ok(rows.iter().map(|r| r.get::<_, Value>("data")).collect())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> StoreResult<()> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let tx = conn.transaction().await?;
        // Preconditions first, with the rows locked until commit.
        for op in &writes {
            if let WriteOp::Expect { collection, id, doc } = op {
                let sql = format!(
                    "SELECT data FROM {} WHERE id = $1 FOR UPDATE",
                    table(*collection)
                );
                let current = tx
                    .query_opt(sql.as_str(), &[id])
                    .await?
                    .map(|r| r.get::<_, Value>("data"));
                if current.as_ref() != doc.as_ref() {
                    return Err(conflict(*collection, id));
                }
            }
        }
        for op in &writes {
            match op {
                WriteOp::Put { collection, id, doc } => {
                    let sql = format!(
                        "INSERT INTO {} (id, data, updated_at) VALUES ($1, $2, NOW())
                         ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()",
                        table(*collection)
                    );
                    tx.execute(sql.as_str(), &[id, doc]).await?;
                }
                WriteOp::Delete { collection, id } => {
                    let sql = format!("DELETE FROM {} WHERE id = $1", table(*collection));
                    tx.execute(sql.as_str(), &[id]).await?;
                }
                WriteOp::Expect { .. } => {}
            }
        }
        tx.commit().await?;
        debug!("Committed {} catalog writes", writes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_containment_merges_filters() {
        let predicate = containment(&[
            Filter::eq("status", "verified"),
            Filter::eq("venueId", "dv-1"),
        ]);
        assert_eq!(predicate, json!({"status": "verified", "venueId": "dv-1"}));
    }

    #[test]
    fn test_table_names_are_schema_qualified() {
        assert_eq!(table(Collection::DiscoveredDishes), "reconcile.discovered_dishes");
    }
}
