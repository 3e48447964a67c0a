//! Time indexed correction cache
mod record;
mod snapshot;
mod store;

pub use record::{Correction, CorrectionKey, CorrectionKind, CorrectionRecord};
pub use snapshot::{ClockState, CorrectionSnapshot, OrbitState};
pub use store::CorrectionStore;
