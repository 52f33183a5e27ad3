// SQLite snapshot store. Append-only: rows are inserted, never updated; every read goes to the DB.

mod raw;

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::instrument;

use crate::error::PersistenceError;
use crate::models::{EntityKey, MemoryReading, Snapshot};

/// `list` page size when the caller gives none.
pub const DEFAULT_LIST_LIMIT: u32 = 50;
/// Hard ceiling for `list`, whatever the caller asks for.
pub const MAX_LIST_LIMIT: u32 = 500;

const SNAPSHOT_COLUMNS: &str = "node, guest_id, collected_at, status, cpu_percent, \
     memory_used, memory_free, memory_max, uptime_seconds, raw_counters";

type Result<T> = std::result::Result<T, PersistenceError>;

/// Effective `list` limit: default when absent or zero, never above the ceiling.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_LIST_LIMIT,
        Some(n) => n.min(MAX_LIST_LIMIT),
    }
}

pub struct HistoryRepo {
    pool: SqlitePool,
}

impl HistoryRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guest_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                node TEXT NOT NULL,
                guest_id TEXT NOT NULL,
                collected_at INTEGER NOT NULL,
                status TEXT,
                cpu_percent REAL,
                memory_used REAL,
                memory_free REAL,
                memory_max REAL,
                uptime_seconds INTEGER,
                raw_counters TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_entity_collected_at ON guest_snapshots(node, guest_id, collected_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_guest_collected_at ON guest_snapshots(guest_id, collected_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_collected_at ON guest_snapshots(collected_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert one new row. No read-modify-write, so concurrent appends need no coordination.
    #[instrument(skip(self, snapshot), fields(repo = "history", operation = "append", entity = %snapshot.entity))]
    pub async fn append(&self, snapshot: &Snapshot) -> Result<()> {
        let raw_counters = raw::encode(&snapshot.raw)?;
        sqlx::query(
            "INSERT INTO guest_snapshots (node, guest_id, collected_at, status, cpu_percent, memory_used, memory_free, memory_max, uptime_seconds, raw_counters) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&snapshot.entity.node)
        .bind(&snapshot.entity.guest_id)
        .bind(snapshot.collected_at)
        .bind(snapshot.status.as_deref())
        .bind(snapshot.cpu_percent)
        .bind(snapshot.memory.used)
        .bind(snapshot.memory.free)
        .bind(snapshot.memory.max)
        .bind(snapshot.uptime_seconds.map(to_i64))
        .bind(&raw_counters)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent snapshot of one guest.
    #[instrument(skip(self), fields(repo = "history", operation = "latest"))]
    pub async fn latest(&self, entity: &EntityKey) -> Result<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM guest_snapshots
             WHERE node = $1 AND guest_id = $2
             ORDER BY collected_at DESC, id DESC LIMIT 1"
        ))
        .bind(&entity.node)
        .bind(&entity.guest_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_snapshot_row).transpose()
    }

    /// Up to `limit` snapshots of one guest, newest first. See `clamp_limit`.
    #[instrument(skip(self), fields(repo = "history", operation = "list"))]
    pub async fn list(&self, entity: &EntityKey, limit: Option<u32>) -> Result<Vec<Snapshot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM guest_snapshots
             WHERE node = $1 AND guest_id = $2
             ORDER BY collected_at DESC, id DESC LIMIT $3"
        ))
        .bind(&entity.node)
        .bind(&entity.guest_id)
        .bind(clamp_limit(limit) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_snapshot_row).collect()
    }

    /// Latest snapshot per guest id for a whole live list, in one query.
    ///
    /// Fetches every matching row newest first and keeps the first row seen per guest id.
    /// With `node` set, only that node's rows are considered. Ids with no rows are absent.
    #[instrument(skip(self, guest_ids), fields(repo = "history", operation = "latest_for_many", ids = guest_ids.len()))]
    pub async fn latest_for_many(
        &self,
        guest_ids: &[String],
        node: Option<&str>,
    ) -> Result<HashMap<String, Snapshot>> {
        if guest_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM guest_snapshots WHERE guest_id IN ("
        ));
        let mut ids = qb.separated(", ");
        for id in guest_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(")");
        if let Some(node) = node {
            qb.push(" AND node = ").push_bind(node.to_string());
        }
        qb.push(" ORDER BY collected_at DESC, id DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut latest: HashMap<String, Snapshot> = HashMap::with_capacity(guest_ids.len());
        for row in &rows {
            let guest_id: String = row.try_get("guest_id")?;
            if latest.contains_key(&guest_id) {
                continue;
            }
            latest.insert(guest_id, parse_snapshot_row(row)?);
        }
        Ok(latest)
    }
}

fn parse_snapshot_row(row: &SqliteRow) -> Result<Snapshot> {
    let node: String = row.try_get("node")?;
    let guest_id: String = row.try_get("guest_id")?;
    let collected_at: i64 = row.try_get("collected_at")?;
    let status: Option<String> = row.try_get("status")?;
    let cpu_percent: Option<f64> = row.try_get("cpu_percent")?;
    let memory_used: Option<f64> = row.try_get("memory_used")?;
    let memory_free: Option<f64> = row.try_get("memory_free")?;
    let memory_max: Option<f64> = row.try_get("memory_max")?;
    let uptime_seconds: Option<i64> = row.try_get("uptime_seconds")?;
    let raw_counters: Option<String> = row.try_get("raw_counters")?;

    Ok(Snapshot {
        entity: EntityKey { node, guest_id },
        collected_at,
        status,
        cpu_percent,
        memory: MemoryReading {
            used: memory_used,
            free: memory_free,
            max: memory_max,
        },
        uptime_seconds: uptime_seconds.map(to_u64),
        raw: raw::decode(raw_counters.as_deref()),
    })
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn to_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}
