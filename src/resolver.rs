//! Per epoch driver
use std::sync::Arc;

use log::warn;

use crate::{
    adapter::ObservationAdapter,
    cfg::Config,
    corrections::CorrectionStore,
    error::Error,
    navigation::Estimator,
    solutions::EpochResult,
};

/// [PositionResolver] pulls observations from an [ObservationAdapter],
/// takes the [CorrectionStore] snapshot at that epoch and runs the [Estimator].
/// The store is shared: corrections may be decoded on another thread.
pub struct PositionResolver<A: ObservationAdapter> {
    adapter: A,
    store: Arc<CorrectionStore>,
    estimator: Estimator,
}

impl<A: ObservationAdapter> PositionResolver<A> {
    /// Builds a new [PositionResolver]
    pub fn new(cfg: Config, adapter: A, store: Arc<CorrectionStore>) -> Self {
        Self {
            adapter,
            store,
            estimator: Estimator::new(cfg),
        }
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn store(&self) -> &Arc<CorrectionStore> {
        &self.store
    }

    /// Resolves the next epoch. Returns None once the adapter is exhausted.
    pub fn resolve_epoch(&mut self) -> Option<Result<EpochResult, Error>> {
        let observations = self.adapter.next_epoch()?;
        let snapshot = self.store.snapshot(observations.epoch);
        let result = self.estimator.process(&observations, &snapshot);

        if let Err(e) = &result {
            warn!("{} - epoch skipped: {}", observations.epoch, e);
        }

        Some(result)
    }
}

impl<A: ObservationAdapter> Iterator for PositionResolver<A> {
    type Item = EpochResult;

    /// Next [EpochResult], failed epochs are skipped.
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Ok(result) = self.resolve_epoch()? {
                return Some(result);
            }
        }
    }
}
