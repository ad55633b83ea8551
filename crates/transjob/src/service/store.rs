//! Job store with optional persistent database storage.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::job_repo::{self, JobFilter, JobRow};
use crate::db::{Database, DatabaseError};
use crate::job::{JobStatus, TranslationJob};

fn parse_status(s: &str, key: &str) -> JobStatus {
    s.parse().unwrap_or_else(|e| {
        log::warn!("{} for job {}, defaulting to pending", e, key);
        JobStatus::Pending
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn parse_uuid(column: &'static str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|_| DatabaseError::InvalidKey {
        column,
        value: value.to_string(),
    })
}

fn to_row(job: &TranslationJob) -> Result<JobRow, DatabaseError> {
    let units = serde_json::to_string(&job.units).map_err(|e| DatabaseError::Units {
        key: job.key.to_string(),
        source: e,
    })?;

    Ok(JobRow {
        key: job.key.to_string(),
        name: job.name.clone(),
        source_culture: job.source_culture.clone(),
        target_culture: job.target_culture.clone(),
        status: job.status.as_str().to_string(),
        provider_key: job.provider_key.to_string(),
        provider_properties: job.provider_properties.clone(),
        set_id: job.set_id,
        auto_approve: job.auto_approve,
        fingerprint: job.fingerprint.clone(),
        units,
        created_at: job.created_at.to_rfc3339(),
        updated_at: job.updated_at.to_rfc3339(),
    })
}

fn from_row(row: JobRow) -> Result<TranslationJob, DatabaseError> {
    let key = parse_uuid("key", &row.key)?;
    let provider_key = parse_uuid("provider_key", &row.provider_key)?;
    let units = serde_json::from_str(&row.units).map_err(|e| DatabaseError::Units {
        key: row.key.clone(),
        source: e,
    })?;

    Ok(TranslationJob {
        key,
        status: parse_status(&row.status, &row.key),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        name: row.name,
        source_culture: row.source_culture,
        target_culture: row.target_culture,
        provider_key,
        provider_properties: row.provider_properties,
        set_id: row.set_id,
        auto_approve: row.auto_approve,
        fingerprint: row.fingerprint,
        units,
    })
}

/// Listing filter. Unset fields match everything.
#[derive(Debug, Default, Clone)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    pub provider_key: Option<Uuid>,
    pub set_id: Option<i64>,
    pub include_removed: bool,
    pub limit: Option<u64>,
}

impl JobQuery {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    fn matches(&self, job: &TranslationJob) -> bool {
        self.status.map_or(true, |s| s == job.status)
            && self.provider_key.map_or(true, |k| k == job.provider_key)
            && self.set_id.map_or(true, |id| job.set_id == Some(id))
            && (self.include_removed
                || self.status == Some(JobStatus::Removed)
                || job.status != JobStatus::Removed)
    }

    fn to_filter(&self) -> JobFilter {
        let exclude_removed = !self.include_removed && self.status != Some(JobStatus::Removed);
        JobFilter {
            status: self.status.map(|s| s.as_str().to_string()),
            provider_key: self.provider_key.map(|k| k.to_string()),
            set_id: self.set_id,
            exclude_status: exclude_removed.then(|| JobStatus::Removed.as_str().to_string()),
            limit: self.limit,
            offset: None,
        }
    }
}

/// Job store: an in-memory cache in front of an optional sqlite database.
///
/// The database is written before the cache, so a failed write leaves the
/// cached job as it was.
pub struct JobStore {
    db: Option<Database>,
    cache: RwLock<HashMap<Uuid, TranslationJob>>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    /// Creates a store that keeps jobs in memory only.
    pub fn new() -> Self {
        Self {
            db: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_database(db: Database) -> Self {
        Self {
            db: Some(db),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<Uuid, TranslationJob>> {
        match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, TranslationJob>> {
        match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Warms the cache from the database. Rows that cannot be decoded are
    /// skipped. Returns the number of jobs loaded.
    pub fn load_from_database(&self) -> Result<usize, DatabaseError> {
        let Some(db) = &self.db else {
            return Ok(0);
        };

        let rows = job_repo::all(db)?;
        let mut cache = self.write_cache();
        let mut loaded = 0;
        for row in rows {
            let key = row.key.clone();
            match from_row(row) {
                Ok(job) => {
                    cache.insert(job.key, job);
                    loaded += 1;
                }
                Err(e) => log::error!("Skipping unreadable job {}: {}", key, e),
            }
        }

        log::info!("Loaded {} jobs from database", loaded);
        Ok(loaded)
    }

    pub fn get(&self, key: Uuid) -> Option<TranslationJob> {
        if let Some(job) = self.read_cache().get(&key) {
            return Some(job.clone());
        }

        let db = self.db.as_ref()?;
        let found = job_repo::find_by_key(db, &key.to_string())
            .and_then(|row| row.map(from_row).transpose());
        match found {
            Ok(Some(job)) => {
                self.write_cache().insert(key, job.clone());
                Some(job)
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to load job {} from database: {}", key, e);
                None
            }
        }
    }

    /// Inserts `job` unless a live job with the same fingerprint exists.
    ///
    /// Returns the stored job and whether it was newly inserted. The lookup
    /// and the insert happen under one cache write lock.
    pub fn insert_unique(
        &self,
        job: TranslationJob,
    ) -> Result<(TranslationJob, bool), DatabaseError> {
        let mut cache = self.write_cache();

        if let Some(existing) = cache
            .values()
            .find(|j| j.fingerprint == job.fingerprint && j.status != JobStatus::Removed)
        {
            return Ok((existing.clone(), false));
        }

        if let Some(db) = &self.db {
            if let Some(row) = job_repo::insert_unless_live(db, &to_row(&job)?)? {
                let existing = from_row(row)?;
                cache.insert(existing.key, existing.clone());
                return Ok((existing, false));
            }
        }

        cache.insert(job.key, job.clone());
        Ok((job, true))
    }

    /// Persists the job, then updates the cache.
    pub fn save(&self, job: &TranslationJob) -> Result<(), DatabaseError> {
        if let Some(db) = &self.db {
            job_repo::upsert(db, &to_row(job)?)?;
        }

        self.write_cache().insert(job.key, job.clone());
        Ok(())
    }

    /// Jobs matching `query`, newest first.
    pub fn list(&self, query: &JobQuery) -> Result<Vec<TranslationJob>, DatabaseError> {
        if let Some(db) = &self.db {
            let (rows, _total) = job_repo::query(db, &query.to_filter())?;
            return rows.into_iter().map(from_row).collect();
        }

        let mut jobs: Vec<TranslationJob> = self
            .read_cache()
            .values()
            .filter(|job| query.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            jobs.truncate(limit as usize);
        }
        Ok(jobs)
    }

    pub fn count(&self, status: JobStatus) -> Result<u64, DatabaseError> {
        if let Some(db) = &self.db {
            return job_repo::count_by_status(db, status.as_str());
        }
        Ok(self
            .read_cache()
            .values()
            .filter(|job| job.status == status)
            .count() as u64)
    }
}
