//! CRUD operations for the `jobs` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database. `units` holds the JSON-encoded unit list.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub key: String,
    pub name: String,
    pub source_culture: String,
    pub target_culture: String,
    pub status: String,
    pub provider_key: String,
    pub provider_properties: String,
    pub set_id: Option<i64>,
    pub auto_approve: bool,
    pub fingerprint: String,
    pub units: String,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            key: row.get("key")?,
            name: row.get("name")?,
            source_culture: row.get("source_culture")?,
            target_culture: row.get("target_culture")?,
            status: row.get("status")?,
            provider_key: row.get("provider_key")?,
            provider_properties: row.get("provider_properties")?,
            set_id: row.get("set_id")?,
            auto_approve: row.get("auto_approve")?,
            fingerprint: row.get("fingerprint")?,
            units: row.get("units")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<String>,
    pub provider_key: Option<String>,
    pub set_id: Option<i64>,
    pub exclude_status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn insert_row(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (key, name, source_culture, target_culture, status, provider_key,
         provider_properties, set_id, auto_approve, fingerprint, units, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            job.key,
            job.name,
            job.source_culture,
            job.target_culture,
            job.status,
            job.provider_key,
            job.provider_properties,
            job.set_id,
            job.auto_approve,
            job.fingerprint,
            job.units,
            job.created_at,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Overwrites every column except `key`, `fingerprint` and `created_at`.
fn update_row(conn: &Connection, job: &JobRow) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET name=?2, source_culture=?3, target_culture=?4, status=?5,
         provider_key=?6, provider_properties=?7, set_id=?8, auto_approve=?9, units=?10,
         updated_at=?11
         WHERE key=?1",
        params![
            job.key,
            job.name,
            job.source_culture,
            job.target_culture,
            job.status,
            job.provider_key,
            job.provider_properties,
            job.set_id,
            job.auto_approve,
            job.units,
            job.updated_at,
        ],
    )?;
    Ok(changed > 0)
}

fn live_by_fingerprint(conn: &Connection, fingerprint: &str) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM jobs WHERE fingerprint = ?1 AND status != 'removed'
             ORDER BY created_at DESC LIMIT 1",
            params![fingerprint],
            JobRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_row(conn, job))
}

/// Updates an existing job row. Returns whether a row matched.
pub fn update(db: &Database, job: &JobRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| update_row(conn, job))
}

/// Updates the row for `job.key`, inserting it when absent.
pub fn upsert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_tx(|tx| {
        if !update_row(tx, job)? {
            insert_row(tx, job)?;
        }
        Ok(())
    })
}

/// Inserts `job` unless a non-removed row shares its fingerprint, in which
/// case that row is returned instead.
pub fn insert_unless_live(db: &Database, job: &JobRow) -> Result<Option<JobRow>, DatabaseError> {
    db.with_tx(|tx| {
        if let Some(existing) = live_by_fingerprint(tx, &job.fingerprint)? {
            return Ok(Some(existing));
        }
        insert_row(tx, job)?;
        Ok(None)
    })
}

/// Finds a job by its key.
pub fn find_by_key(db: &Database, key: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs WHERE key = ?1",
                params![key],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Finds the newest live (not removed) job with the given fingerprint.
pub fn find_by_fingerprint(
    db: &Database,
    fingerprint: &str,
) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| live_by_fingerprint(conn, fingerprint))
}

/// Queries jobs with filters, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<JobRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }
        if let Some(ref provider_key) = filter.provider_key {
            conditions.push(format!("provider_key = ?{}", param_values.len() + 1));
            param_values.push(Box::new(provider_key.clone()));
        }
        if let Some(set_id) = filter.set_id {
            conditions.push(format!("set_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(set_id));
        }
        if let Some(ref exclude_status) = filter.exclude_status {
            conditions.push(format!("status != ?{}", param_values.len() + 1));
            param_values.push(Box::new(exclude_status.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM jobs {} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Returns every row, oldest first. Used to warm the in-memory cache.
pub fn all(db: &Database) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY created_at ASC")?;
        let rows = stmt
            .query_map([], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
