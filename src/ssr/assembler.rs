//! Multi-message sequence reassembly.
use std::collections::HashMap;

use log::warn;

use crate::{corrections::CorrectionRecord, prelude::Epoch};

/// Identifies a multi-message sequence: one per message type (and subtype)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceKey {
    pub message: u16,
    pub subtype: u8,
}

impl std::fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.subtype > 0 {
            write!(f, "{}/{}", self.message, self.subtype)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

#[derive(Debug, Clone)]
struct Sequence {
    epoch: Epoch,
    messages: usize,
    records: Vec<CorrectionRecord>,
    /// Remaining messages of this epoch are dropped
    discarded: bool,
}

impl Sequence {
    fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            messages: 0,
            records: Vec::new(),
            discarded: false,
        }
    }
}

/// [SequenceAssembler] buffers [CorrectionRecord]s while the
/// multiple message indicator is set, and releases the complete
/// sequence with its last message.
#[derive(Debug, Clone)]
pub struct SequenceAssembler {
    max_len: usize,
    pending: HashMap<SequenceKey, Sequence>,
}

impl SequenceAssembler {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
            pending: HashMap::new(),
        }
    }

    /// Number of sequences awaiting completion
    pub fn pending(&self) -> usize {
        self.pending.values().filter(|seq| !seq.discarded).count()
    }

    /// Drops all incomplete sequences
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Pushes the records of one message.
    /// Returns the complete sequence, when `multiple_message` is cleared.
    pub fn push(
        &mut self,
        key: SequenceKey,
        epoch: Epoch,
        multiple_message: bool,
        records: Vec<CorrectionRecord>,
    ) -> Option<Vec<CorrectionRecord>> {
        let mut sequence = match self.pending.remove(&key) {
            Some(sequence) if sequence.epoch == epoch => sequence,
            Some(sequence) => {
                if !sequence.discarded {
                    warn!(
                        "{}({}) - incomplete sequence of {} message(s) discarded",
                        sequence.epoch, key, sequence.messages
                    );
                }
                Sequence::new(epoch)
            },
            None => Sequence::new(epoch),
        };

        if sequence.discarded {
            if multiple_message {
                self.pending.insert(key, sequence);
            }
            return None;
        }

        sequence.messages += 1;
        sequence.records.extend(records);

        if sequence.messages > self.max_len {
            warn!(
                "{}({}) - sequence exceeds {} messages: discarded",
                epoch, key, self.max_len
            );
            if multiple_message {
                // drop the tail of this epoch as well
                sequence.records.clear();
                sequence.discarded = true;
                self.pending.insert(key, sequence);
            }
            return None;
        }

        if multiple_message {
            self.pending.insert(key, sequence);
            None
        } else {
            Some(sequence.records)
        }
    }
}
