//! History of past signal outcomes.

use crate::types::{OutcomeRecord, SignalResult};
use dashmap::DashMap;
use uuid::Uuid;

/// Read-only view of past outcomes, keyed by symbol.
pub trait OutcomeHistory: Send + Sync {
    /// Every record for `symbol` (case-insensitive), oldest first.
    fn outcomes(&self, symbol: &str) -> Vec<OutcomeRecord>;
}

/// Process-local outcome history.
#[derive(Debug, Default)]
pub struct InMemoryOutcomeHistory {
    /// Keyed by uppercase symbol.
    records: DashMap<String, Vec<OutcomeRecord>>,
}

impl InMemoryOutcomeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: OutcomeRecord) {
        self.records
            .entry(record.symbol.to_uppercase())
            .or_default()
            .push(record);
    }

    /// Set the result of a pending record. Returns `false` if the id is unknown.
    pub fn resolve(&self, symbol: &str, id: Uuid, result: SignalResult) -> bool {
        let Some(mut records) = self.records.get_mut(&symbol.to_uppercase()) else {
            return false;
        };
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.result = Some(result);
                true
            }
            None => false,
        }
    }

    /// Total records across all symbols.
    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutcomeHistory for InMemoryOutcomeHistory {
    fn outcomes(&self, symbol: &str) -> Vec<OutcomeRecord> {
        self.records
            .get(&symbol.to_uppercase())
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}
