use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use log::{debug, trace};

use crate::{
    corrections::{CorrectionKey, CorrectionRecord, CorrectionSnapshot},
    prelude::Epoch,
};

type Records = BTreeMap<CorrectionKey, CorrectionRecord>;

/// [CorrectionStore] holds the latest [CorrectionRecord] per [CorrectionKey].
/// It is shared between the decoding side (writer) and the
/// positioning side (reader) through an [Arc]. Writers never modify
/// a published map in place: readers holding a previous map keep
/// a consistent view.
#[derive(Debug, Default)]
pub struct CorrectionStore {
    records: RwLock<Arc<Records>>,
}

impl CorrectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, valid or not
    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    fn current(&self) -> Arc<Records> {
        let guard = self.records.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    fn apply(records: &mut Records, record: CorrectionRecord) -> bool {
        match records.get(&record.key) {
            Some(stored) if !record.supersedes(stored) => {
                trace!(
                    "{}({}) - iod {} older than stored {}",
                    record.epoch,
                    record.key,
                    record.iod_ssr,
                    stored.iod_ssr
                );
                false
            },
            Some(stored) if stored == &record => false,
            _ => {
                records.insert(record.key, record);
                true
            },
        }
    }

    /// Inserts or replaces a single [CorrectionRecord].
    /// Returns true if the store was modified.
    pub fn upsert(&self, record: CorrectionRecord) -> bool {
        self.upsert_batch(std::iter::once(record)) > 0
    }

    /// Applies a complete sequence of [CorrectionRecord]s at once.
    /// No [CorrectionSnapshot] may observe part of the batch.
    /// Returns the number of records that modified the store.
    pub fn upsert_batch<I: IntoIterator<Item = CorrectionRecord>>(&self, records: I) -> usize {
        let mut guard = self.records.write().unwrap_or_else(|e| e.into_inner());

        // work on a private copy, when a snapshot still holds the published map
        let mut pending = Arc::clone(&guard);
        let map = Arc::make_mut(&mut pending);

        let mut modified = 0;
        for record in records {
            if Self::apply(map, record) {
                modified += 1;
            }
        }

        if modified > 0 {
            *guard = pending;
            debug!("correction store: {} record(s) updated", modified);
        }

        modified
    }

    /// Returns the [CorrectionSnapshot] of records valid at `as_of`.
    pub fn snapshot(&self, as_of: Epoch) -> CorrectionSnapshot {
        let current = self.current();

        let records = current
            .iter()
            .filter_map(|(key, record)| {
                if record.is_valid_at(as_of) {
                    Some((*key, *record))
                } else {
                    trace!("{}({}) - correction expired", as_of, key);
                    None
                }
            })
            .collect();

        CorrectionSnapshot::new(as_of, records)
    }

    /// Drops records that expired before `t`
    pub fn purge(&self, t: Epoch) -> usize {
        let mut guard = self.records.write().unwrap_or_else(|e| e.into_inner());

        let expired = guard
            .values()
            .filter(|record| record.epoch + record.validity < t)
            .count();

        if expired > 0 {
            let map = Arc::make_mut(&mut guard);
            map.retain(|_, record| record.epoch + record.validity >= t);
            debug!("{} - purged {} expired correction(s)", t, expired);
        }

        expired
    }
}
