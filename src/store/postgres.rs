//! PostgreSQL store: generic queries over every entity kind.
//!
//! Rows travel as JSON: reads use `to_jsonb(t)` and writes feed the row's JSON
//! through `jsonb_populate_record(NULL::<table>, $1)`, letting Postgres coerce
//! each value to its column type. Only identifiers from the static
//! [`EntityConfig`] tables are interpolated into SQL; values are always bound.

use super::EntityStore;
use crate::entity::{EntityRow, HistoryRecord, HistoryRow};
use crate::error::{StoreError, StoreResult};
use crate::kinds::EntityConfig;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use uuid::Uuid;

/// Schema for the four entity tables and their history tables.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/001_fleet_tables.sql");

/// Column changes for databases created before the numeric year columns.
pub const UPGRADE_SQL: &str = include_str!("../../migrations/002_numeric_years.sql");

/// Bookkeeping columns written on every insert.
const INSERT_META: [&str; 5] = ["id", "created_at", "updated_at", "updated_by", "updated_last"];

/// Bookkeeping columns written on every update. `created_at` is immutable.
const UPDATE_META: [&str; 3] = ["updated_at", "updated_by", "updated_last"];

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Parses the URL by hand to keep the full username; sqlx's parser drops
    /// the `.project-ref` suffix the Supabase pooler requires.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username)
            .statement_cache_capacity(0);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Ok(PgStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the fleet tables if they do not exist.
    pub async fn apply_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        sqlx::raw_sql(UPGRADE_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Declared columns present on `row`, bookkeeping columns first.
    fn columns_for(cfg: &EntityConfig, row: &EntityRow, meta: &[&'static str]) -> Vec<&'static str> {
        meta.iter()
            .copied()
            .chain(cfg.writable_columns().filter(|c| row.fields.contains_key(*c)))
            .collect()
    }

    fn parse_row(value: Value) -> StoreResult<EntityRow> {
        EntityRow::from_json(value).map_err(StoreError::from)
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn fetch(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<Option<EntityRow>> {
        let sql = format!("SELECT to_jsonb(t) FROM {} t WHERE t.id = $1", cfg.table);
        let row: Option<Value> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::parse_row).transpose()
    }

    async fn list(&self, cfg: &EntityConfig) -> StoreResult<Vec<EntityRow>> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t ORDER BY t.created_at, t.id",
            cfg.table
        );
        let rows: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::parse_row).collect()
    }

    async fn insert(&self, cfg: &EntityConfig, row: &EntityRow) -> StoreResult<EntityRow> {
        let cols = Self::columns_for(cfg, row, &INSERT_META).join(", ");
        let sql = format!(
            "INSERT INTO {table} AS t ({cols})
             SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1)
             RETURNING to_jsonb(t)",
            table = cfg.table,
            cols = cols,
        );
        let stored: Value = sqlx::query_scalar(&sql)
            .bind(row.to_json())
            .fetch_one(&self.pool)
            .await?;
        Self::parse_row(stored)
    }

    async fn update(&self, cfg: &EntityConfig, row: &EntityRow) -> StoreResult<Option<EntityRow>> {
        let cols = Self::columns_for(cfg, row, &UPDATE_META).join(", ");
        let sql = format!(
            "UPDATE {table} AS t SET ({cols}) =
               (SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1))
             WHERE t.id = $2
             RETURNING to_jsonb(t)",
            table = cfg.table,
            cols = cols,
        );
        let stored: Option<Value> = sqlx::query_scalar(&sql)
            .bind(row.to_json())
            .bind(row.id)
            .fetch_optional(&self.pool)
            .await?;
        stored.map(Self::parse_row).transpose()
    }

    async fn delete(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", cfg.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_history(
        &self,
        cfg: &EntityConfig,
        records: &[HistoryRecord],
    ) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "INSERT INTO {} ({}, field_name, old_value, new_value, changed_at, changed_by)
             SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::text[],
                                  $5::timestamptz[], $6::text[])",
            cfg.history_table, cfg.history_fk,
        );
        let entity_ids: Vec<Uuid> = records.iter().map(|r| r.entity_id).collect();
        let fields: Vec<String> = records.iter().map(|r| r.field_name.clone()).collect();
        let olds: Vec<Option<String>> = records.iter().map(|r| r.old_value.clone()).collect();
        let news: Vec<Option<String>> = records.iter().map(|r| r.new_value.clone()).collect();
        let changed_at: Vec<DateTime<Utc>> = records.iter().map(|r| r.changed_at).collect();
        let changed_by: Vec<String> = records.iter().map(|r| r.changed_by.clone()).collect();
        sqlx::query(&sql)
            .bind(entity_ids)
            .bind(fields)
            .bind(olds)
            .bind(news)
            .bind(changed_at)
            .bind(changed_by)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_history(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<Vec<HistoryRow>> {
        let sql = format!(
            "SELECT id, {fk} AS entity_id, field_name, old_value, new_value, changed_at, changed_by
             FROM {table}
             WHERE {fk} = $1
             ORDER BY changed_at DESC, field_name",
            fk = cfg.history_fk,
            table = cfg.history_table,
        );
        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete_history(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            cfg.history_table, cfg.history_fk
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn latest_history_at(
        &self,
        cfg: &EntityConfig,
        id: Uuid,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let sql = format!(
            "SELECT MAX(changed_at) FROM {} WHERE {} = $1",
            cfg.history_table, cfg.history_fk
        );
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(latest)
    }

    /// Execute `SELECT 1` to verify connectivity.
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
