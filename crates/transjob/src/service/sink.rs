use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::JobError;
use crate::job::TranslationJob;

/// Receives the translated values of an approved job and writes them into
/// the host content model.
#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn apply(&self, job: &TranslationJob) -> Result<(), JobError>;
}

/// Sink that accepts every job and writes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl ContentSink for NoopSink {
    async fn apply(&self, _job: &TranslationJob) -> Result<(), JobError> {
        Ok(())
    }
}

type ValueKey = (i64, String, String);

/// Records applied values keyed by item, field and target culture.
#[derive(Debug, Default)]
pub struct MemorySink {
    values: RwLock<HashMap<ValueKey, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, item_id: i64, field: &str, culture: &str) -> Option<String> {
        let values = match self.values.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        values
            .get(&(item_id, field.to_string(), culture.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        match self.values.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentSink for MemorySink {
    async fn apply(&self, job: &TranslationJob) -> Result<(), JobError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| JobError::Provider("content sink lock poisoned".to_string()))?;

        for unit in job.units.iter().filter(|u| u.is_translated()) {
            if let Some(target) = &unit.target {
                values.insert(
                    (unit.item_id, unit.field.clone(), job.target_culture.clone()),
                    target.clone(),
                );
            }
        }
        Ok(())
    }
}
