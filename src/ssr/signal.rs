//! SSR signal identifiers to [Signal] tables.
use crate::{carrier::Signal, prelude::Constellation};

/// Signal numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTable {
    /// RTCM-SSR and IGS-SSR signal and tracking mode identifiers
    Rtcm,
    /// Compact SSR signal mask bit positions
    Compact,
}

const RTCM_GPS: &[(u8, &str)] = &[
    (0, "1C"),
    (1, "1P"),
    (2, "1W"),
    (5, "2C"),
    (6, "2D"),
    (7, "2S"),
    (8, "2L"),
    (9, "2X"),
    (10, "2P"),
    (11, "2W"),
    (14, "5I"),
    (15, "5Q"),
    (16, "5X"),
    (17, "1S"),
    (18, "1L"),
    (19, "1X"),
];

const RTCM_GLO: &[(u8, &str)] = &[
    (0, "1C"),
    (1, "1P"),
    (2, "2C"),
    (3, "2P"),
    (4, "4A"),
    (5, "4B"),
    (6, "6A"),
    (7, "6B"),
    (10, "3I"),
    (11, "3Q"),
];

const RTCM_GAL: &[(u8, &str)] = &[
    (0, "1A"),
    (1, "1B"),
    (2, "1C"),
    (3, "1X"),
    (4, "1Z"),
    (5, "5I"),
    (6, "5Q"),
    (7, "5X"),
    (8, "7I"),
    (9, "7Q"),
    (10, "7X"),
    (11, "8I"),
    (12, "8Q"),
    (13, "8X"),
    (14, "6A"),
    (15, "6B"),
    (16, "6C"),
    (17, "6X"),
    (18, "6Z"),
];

const RTCM_BDS: &[(u8, &str)] = &[
    (0, "2I"),
    (1, "2Q"),
    (2, "2X"),
    (3, "6I"),
    (4, "6Q"),
    (5, "6X"),
    (6, "7I"),
    (7, "7Q"),
    (8, "7X"),
    (9, "1D"),
    (10, "1P"),
    (11, "1X"),
    (12, "5D"),
    (13, "5P"),
    (14, "5X"),
    (15, "1A"),
];

const RTCM_QZS: &[(u8, &str)] = &[
    (0, "1C"),
    (1, "1S"),
    (3, "2S"),
    (4, "2L"),
    (5, "2X"),
    (6, "5I"),
    (7, "5Q"),
    (8, "5X"),
    (9, "6S"),
    (10, "6L"),
    (11, "6X"),
    (12, "1X"),
    (17, "6E"),
    (19, "1E"),
];

const RTCM_SBS: &[(u8, &str)] = &[(0, "1C"), (1, "5I"), (2, "5Q"), (3, "5X")];

const COMPACT_GPS: &[(u8, &str)] = &[
    (0, "1C"),
    (1, "1P"),
    (2, "1W"),
    (3, "1S"),
    (4, "1L"),
    (5, "1X"),
    (6, "2S"),
    (7, "2L"),
    (8, "2X"),
    (9, "2P"),
    (10, "2W"),
    (11, "5I"),
    (12, "5Q"),
    (13, "5X"),
];

const COMPACT_GLO: &[(u8, &str)] = &[
    (0, "1C"),
    (1, "1P"),
    (2, "2C"),
    (3, "2P"),
    (4, "4A"),
    (5, "4B"),
    (6, "4X"),
    (7, "6A"),
    (8, "6B"),
    (9, "6X"),
    (10, "3I"),
    (11, "3Q"),
    (12, "3X"),
];

const COMPACT_GAL: &[(u8, &str)] = &[
    (0, "1B"),
    (1, "1C"),
    (2, "1X"),
    (3, "5I"),
    (4, "5Q"),
    (5, "5X"),
    (6, "7I"),
    (7, "7Q"),
    (8, "7X"),
    (9, "8I"),
    (10, "8Q"),
    (11, "8X"),
    (12, "6B"),
    (13, "6C"),
    (14, "6X"),
];

const COMPACT_BDS: &[(u8, &str)] = &[
    (0, "2I"),
    (1, "2Q"),
    (2, "2X"),
    (3, "6I"),
    (4, "6Q"),
    (5, "6X"),
    (6, "7I"),
    (7, "7Q"),
    (8, "7X"),
    (9, "5D"),
    (10, "5P"),
    (11, "5X"),
    (12, "1D"),
    (13, "1P"),
    (14, "1X"),
];

const COMPACT_QZS: &[(u8, &str)] = &[
    (0, "1C"),
    (1, "1S"),
    (2, "1L"),
    (3, "1X"),
    (4, "2S"),
    (5, "2L"),
    (6, "2X"),
    (7, "5I"),
    (8, "5Q"),
    (9, "5X"),
];

const COMPACT_SBS: &[(u8, &str)] = &[(0, "1C"), (1, "5I"), (2, "5Q"), (3, "5X")];

impl SignalTable {
    fn entries(&self, constellation: Constellation) -> &'static [(u8, &'static str)] {
        match (self, constellation) {
            (Self::Rtcm, Constellation::GPS) => RTCM_GPS,
            (Self::Rtcm, Constellation::Glonass) => RTCM_GLO,
            (Self::Rtcm, Constellation::Galileo) => RTCM_GAL,
            (Self::Rtcm, Constellation::BeiDou) => RTCM_BDS,
            (Self::Rtcm, Constellation::QZSS) => RTCM_QZS,
            (Self::Rtcm, Constellation::SBAS) => RTCM_SBS,
            (Self::Compact, Constellation::GPS) => COMPACT_GPS,
            (Self::Compact, Constellation::Glonass) => COMPACT_GLO,
            (Self::Compact, Constellation::Galileo) => COMPACT_GAL,
            (Self::Compact, Constellation::BeiDou) => COMPACT_BDS,
            (Self::Compact, Constellation::QZSS) => COMPACT_QZS,
            (Self::Compact, Constellation::SBAS) => COMPACT_SBS,
            _ => &[],
        }
    }

    /// Identifies the [Signal] described by this SSR identifier.
    pub fn signal(&self, constellation: Constellation, id: u8) -> Option<Signal> {
        let (_, code) = self
            .entries(constellation)
            .iter()
            .find(|(key, _)| *key == id)?;

        Signal::from_rinex(constellation, code)
    }

    /// Returns the SSR identifier of this [Signal].
    pub fn identifier(&self, constellation: Constellation, signal: &Signal) -> Option<u8> {
        self.entries(constellation)
            .iter()
            .find(|(_, code)| Signal::from_rinex(constellation, code).as_ref() == Some(signal))
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod test {
    use super::SignalTable;
    use crate::{
        carrier::{Carrier, Signal},
        prelude::Constellation,
    };

    #[test]
    fn rtcm_identifiers() {
        let table = SignalTable::Rtcm;

        let l2w = table.signal(Constellation::GPS, 11).unwrap();
        assert_eq!(l2w, Signal::new(Carrier::L2, 'W'));
        assert_eq!(table.identifier(Constellation::GPS, &l2w), Some(11));

        let e5aq = table.signal(Constellation::Galileo, 6).unwrap();
        assert_eq!(e5aq, Signal::new(Carrier::E5A, 'Q'));

        let b3i = table.signal(Constellation::BeiDou, 3).unwrap();
        assert_eq!(b3i, Signal::new(Carrier::B3, 'I'));

        assert!(table.signal(Constellation::GPS, 3).is_none());
        assert!(table.signal(Constellation::IRNSS, 0).is_none());
    }

    #[test]
    fn compact_identifiers() {
        let table = SignalTable::Compact;

        let l5q = table.signal(Constellation::GPS, 12).unwrap();
        assert_eq!(l5q, Signal::new(Carrier::L5, 'Q'));

        let e1c = table.signal(Constellation::Galileo, 1).unwrap();
        assert_eq!(table.identifier(Constellation::Galileo, &e1c), Some(1));

        assert!(table.signal(Constellation::GPS, 15).is_none());
    }
}
