//! Correction stream decoder: payload dispatch, time tag resolution,
//! and conversion into [CorrectionRecord]s.
use log::{debug, error, trace, warn};

use hifitime::{Duration, Epoch, TimeScale};
use nalgebra::Vector3;

use crate::{
    carrier::Signal,
    cfg::CorrectionOpts,
    corrections::{Correction, CorrectionRecord, CorrectionStore},
    prelude::{Constellation, SV},
    ssr::{
        assembler::{SequenceAssembler, SequenceKey},
        bits::BitReader,
        compact::{CompactMask, CompactMessage},
        frame::{Frame, PREAMBLE},
        message::{
            ClockCorrection, HighRateClock, Message, OrbitCorrection, SatelliteCodeBias,
            SatellitePhaseBias, SsrBody, SsrFamily, SsrMessage, UraCorrection,
        },
        rtcm::{igs_subtype, rtcm_message},
        DecodingError, COMPACT_SSR_MESSAGE, IGS_SSR_MESSAGE,
    },
};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Wraps `dt` (ns) into ]-period/2; period/2]
fn wrap_nanos(dt: i128, period_s: i128) -> i128 {
    let period = period_s * NANOS_PER_SECOND;
    let mut dt = dt.rem_euclid(period);
    if dt > period / 2 {
        dt -= period;
    }
    dt
}

/// GPST time of week (s) to the closest [Epoch] to `reference`
pub(crate) fn resolve_time_of_week(reference: Epoch, tow_s: u32) -> Epoch {
    let reference = reference.to_time_scale(TimeScale::GPST);
    let (_, nanos) = reference.to_time_of_week();
    let dt = wrap_nanos(
        tow_s as i128 * NANOS_PER_SECOND - nanos as i128,
        7 * 86400,
    );
    reference + Duration::from_total_nanoseconds(dt)
}

/// GLONASS time of day (UTC + 3h) to the closest [Epoch] to `reference`
pub(crate) fn resolve_glonass_time_of_day(reference: Epoch, tod_s: u32) -> Epoch {
    let (_, _, _, hh, mm, ss, ns) = reference.to_gregorian_utc();
    let ref_tod = ((hh as i128 + 3) % 24) * 3600 + mm as i128 * 60 + ss as i128;
    let ref_tod = ref_tod * NANOS_PER_SECOND + ns as i128;
    let dt = wrap_nanos(tod_s as i128 * NANOS_PER_SECOND - ref_tod, 86400);
    reference + Duration::from_total_nanoseconds(dt)
}

/// GPST seconds within the current hour to the closest [Epoch] to `reference`
pub(crate) fn resolve_hour_seconds(reference: Epoch, seconds: u32) -> Epoch {
    let reference = reference.to_time_scale(TimeScale::GPST);
    let (_, nanos) = reference.to_time_of_week();
    let ref_seconds = nanos as i128 % (3600 * NANOS_PER_SECOND);
    let dt = wrap_nanos(seconds as i128 * NANOS_PER_SECOND - ref_seconds, 3600);
    reference + Duration::from_total_nanoseconds(dt)
}

/// One decoded message
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub message: Message,
    /// Resolved reference [Epoch] of the message
    pub epoch: Epoch,
    /// Identifies the multi-message sequence this message belongs to
    pub key: SequenceKey,
    pub multiple_message: bool,
    /// [CorrectionRecord]s described by this message
    pub records: Vec<CorrectionRecord>,
}

/// [Decoder] turns a correction stream into [CorrectionRecord]s.
/// It holds the active Compact SSR mask and the incomplete
/// multi-message sequences.
#[derive(Debug, Clone)]
pub struct Decoder {
    opts: CorrectionOpts,
    reference: Epoch,
    mask: Option<CompactMask>,
    assembler: SequenceAssembler,
    buffer: Vec<u8>,
}

impl Decoder {
    /// Creates a new [Decoder]. `reference` is any [Epoch] close
    /// (within a few minutes) to the stream content: time tags
    /// are resolved with respect to it.
    pub fn new(reference: Epoch, opts: &CorrectionOpts) -> Self {
        Self {
            opts: *opts,
            reference,
            mask: None,
            assembler: SequenceAssembler::new(opts.max_sequence_len),
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Updates the reference [Epoch]
    pub fn set_reference(&mut self, reference: Epoch) {
        self.reference = reference;
    }

    pub fn reference(&self) -> Epoch {
        self.reference
    }

    /// Active Compact SSR mask
    pub fn mask(&self) -> Option<&CompactMask> {
        self.mask.as_ref()
    }

    /// Decodes a single message payload (frame content).
    /// A Compact SSR mask becomes the active mask.
    pub fn decode_payload(&mut self, payload: &[u8]) -> Result<Decoded, DecodingError> {
        let mut reader = BitReader::new(payload);
        let number = reader.read_as::<u16>(12)?;

        let message = match number {
            COMPACT_SSR_MESSAGE => {
                Message::Compact(CompactMessage::decode(&mut reader, self.mask.as_ref())?)
            },
            IGS_SSR_MESSAGE => Message::Ssr(SsrMessage::decode_igs(&mut reader)?),
            number => {
                if rtcm_message(number).is_none() {
                    return Err(DecodingError::UnknownMessage(number));
                }
                Message::Ssr(SsrMessage::decode_rtcm(number, &mut reader)?)
            },
        };

        let decoded = self.convert(number, message);

        if let Message::Compact(CompactMessage::Mask(mask)) = &decoded.message {
            debug!(
                "{} - new compact ssr mask: iod={} {} satellites",
                decoded.epoch,
                mask.header.iod_ssr,
                mask.satellites().len()
            );
            self.mask = Some(mask.clone());
        }

        Ok(decoded)
    }

    /// Decodes the RTCM3 [Frame] at the start of `buf`, returns
    /// the [Decoded] message and the number of bytes consumed.
    pub fn decode_frame(&mut self, buf: &[u8]) -> Result<(Decoded, usize), DecodingError> {
        let (frame, size) = Frame::decode(buf)?;
        let decoded = self.decode_payload(frame.payload)?;
        Ok((decoded, size))
    }

    /// Feeds stream bytes. Complete sequences are applied to the
    /// [CorrectionStore]. Malformed messages are dropped and logged.
    /// Returns the number of records that modified the store.
    pub fn feed(&mut self, bytes: &[u8], store: &CorrectionStore) -> usize {
        self.buffer.extend_from_slice(bytes);

        let mut updated = 0;
        let mut offset = 0;

        while offset < self.buffer.len() {
            if self.buffer[offset] != PREAMBLE {
                offset += 1;
                continue;
            }

            let (frame, size) = match Frame::decode(&self.buffer[offset..]) {
                Ok((frame, size)) => (frame.payload.to_vec(), size),
                Err(DecodingError::Truncated) => break,
                Err(e) => {
                    debug!("frame sync: {}", e);
                    offset += 1;
                    continue;
                },
            };

            offset += size;

            match self.decode_payload(&frame) {
                Ok(decoded) => {
                    self.reference = decoded.epoch;
                    if let Some(batch) = self.assembler.push(
                        decoded.key,
                        decoded.epoch,
                        decoded.multiple_message,
                        decoded.records,
                    ) {
                        updated += store.upsert_batch(batch);
                    }
                },
                Err(DecodingError::UnknownMessage(number)) => {
                    warn!("unknown message type {}: skipped", number);
                },
                Err(e @ DecodingError::UnknownSubtype { .. }) => {
                    warn!("{}: skipped", e);
                },
                Err(e) => {
                    error!("message dropped: {}", e);
                },
            }
        }

        self.buffer.drain(..offset);
        updated
    }

    fn convert(&self, number: u16, message: Message) -> Decoded {
        match message {
            Message::Ssr(ssr) => {
                let epoch = match (ssr.family, ssr.constellation) {
                    (SsrFamily::Rtcm, Constellation::Glonass) => {
                        resolve_glonass_time_of_day(self.reference, ssr.header.epoch_s)
                    },
                    _ => resolve_time_of_week(self.reference, ssr.header.epoch_s),
                };

                let subtype = match ssr.family {
                    SsrFamily::Rtcm => 0,
                    SsrFamily::Igs { .. } => igs_subtype(ssr.constellation, ssr.kind()).unwrap_or(0),
                };

                let builder = RecordBuilder {
                    epoch,
                    iod_ssr: ssr.header.iod_ssr,
                    validity: self.opts.validity(ssr.header.update_interval),
                    provider_id: Some(ssr.header.provider_id),
                    solution_id: Some(ssr.header.solution_id),
                };

                let records = builder.body(&ssr.body);

                Decoded {
                    key: SequenceKey {
                        message: number,
                        subtype,
                    },
                    epoch,
                    multiple_message: ssr.header.multiple_message,
                    records,
                    message: Message::Ssr(ssr),
                }
            },
            Message::Compact(compact) => {
                let header = *compact.header();
                let epoch = match &compact {
                    CompactMessage::Mask(_) => {
                        resolve_time_of_week(self.reference, header.epoch_s)
                    },
                    _ => resolve_hour_seconds(self.reference, header.epoch_s),
                };

                let builder = RecordBuilder {
                    epoch,
                    iod_ssr: header.iod_ssr,
                    validity: self.opts.validity(header.update_interval),
                    provider_id: None,
                    solution_id: None,
                };

                let records = match &compact {
                    CompactMessage::Mask(_) => Vec::new(),
                    CompactMessage::Orbit { corrections, .. } => builder.orbits(corrections),
                    CompactMessage::Clock { corrections, .. } => builder.clocks(corrections),
                    CompactMessage::CodeBias { corrections, .. } => {
                        builder.code_biases(corrections)
                    },
                    CompactMessage::PhaseBias { corrections, .. } => {
                        builder.phase_biases(corrections)
                    },
                    CompactMessage::Ura { corrections, .. } => builder.ura(corrections),
                    CompactMessage::Combined { orbits, clocks, .. } => {
                        let mut records = Vec::new();
                        if let Some(orbits) = orbits {
                            records.extend(builder.orbits(orbits));
                        }
                        if let Some(clocks) = clocks {
                            records.extend(builder.clocks(clocks));
                        }
                        records
                    },
                };

                Decoded {
                    key: SequenceKey {
                        message: number,
                        subtype: compact.subtype(),
                    },
                    epoch,
                    multiple_message: header.multiple_message,
                    records,
                    message: Message::Compact(compact),
                }
            },
        }
    }
}

/// Common attributes of the [CorrectionRecord]s of one message
struct RecordBuilder {
    epoch: Epoch,
    iod_ssr: u8,
    validity: Duration,
    provider_id: Option<u16>,
    solution_id: Option<u8>,
}

impl RecordBuilder {
    fn record(&self, sv: SV, signal: Option<Signal>, correction: Correction) -> CorrectionRecord {
        let mut record = CorrectionRecord::new(sv, signal, correction, self.epoch)
            .with_iod_ssr(self.iod_ssr)
            .with_validity(self.validity);
        record.provider_id = self.provider_id;
        record.solution_id = self.solution_id;
        record
    }

    fn body(&self, body: &SsrBody) -> Vec<CorrectionRecord> {
        match body {
            SsrBody::Orbit(orbits) => self.orbits(orbits),
            SsrBody::Clock(clocks) => self.clocks(clocks),
            SsrBody::Combined(pairs) => pairs
                .iter()
                .flat_map(|(orbit, clock)| {
                    self.orbit(orbit).into_iter().chain(self.clock(clock))
                })
                .collect(),
            SsrBody::HighRateClock(clocks) => self.high_rate_clocks(clocks),
            SsrBody::CodeBias(biases) => self.code_biases(biases),
            SsrBody::PhaseBias { satellites, .. } => self.phase_biases(satellites),
            SsrBody::Ura(ura) => self.ura(ura),
        }
    }

    fn orbit(&self, orbit: &OrbitCorrection) -> Option<CorrectionRecord> {
        let delta_m = match (orbit.radial_m, orbit.along_m, orbit.cross_m) {
            (Some(r), Some(a), Some(c)) => Vector3::new(r, a, c),
            _ => {
                trace!("{}({}) - orbit correction not provided", self.epoch, orbit.sv);
                return None;
            },
        };

        let rate_m_s = match (
            orbit.radial_rate_m_s,
            orbit.along_rate_m_s,
            orbit.cross_rate_m_s,
        ) {
            (Some(r), Some(a), Some(c)) => Some(Vector3::new(r, a, c)),
            _ => None,
        };

        Some(self.record(
            orbit.sv,
            None,
            Correction::Orbit {
                iode: orbit.iode,
                delta_m,
                rate_m_s,
            },
        ))
    }

    fn orbits(&self, orbits: &[OrbitCorrection]) -> Vec<CorrectionRecord> {
        orbits.iter().filter_map(|orbit| self.orbit(orbit)).collect()
    }

    fn clock(&self, clock: &ClockCorrection) -> Option<CorrectionRecord> {
        let c0_m = match clock.c0_m {
            Some(c0_m) => c0_m,
            None => {
                trace!("{}({}) - clock correction not provided", self.epoch, clock.sv);
                return None;
            },
        };

        Some(self.record(
            clock.sv,
            None,
            Correction::Clock {
                c0_m,
                c1_m_s: clock.c1_m_s,
                c2_m_s2: clock.c2_m_s2,
            },
        ))
    }

    fn clocks(&self, clocks: &[ClockCorrection]) -> Vec<CorrectionRecord> {
        clocks.iter().filter_map(|clock| self.clock(clock)).collect()
    }

    fn high_rate_clocks(&self, clocks: &[HighRateClock]) -> Vec<CorrectionRecord> {
        clocks
            .iter()
            .filter_map(|clock| {
                let c0_m = clock.c0_m?;
                Some(self.record(clock.sv, None, Correction::HighRateClock { c0_m }))
            })
            .collect()
    }

    fn code_biases(&self, satellites: &[SatelliteCodeBias]) -> Vec<CorrectionRecord> {
        satellites
            .iter()
            .flat_map(|sat| {
                sat.biases.iter().filter_map(move |bias| {
                    let bias_m = bias.bias_m?;
                    Some(self.record(
                        sat.sv,
                        Some(bias.signal),
                        Correction::CodeBias { bias_m },
                    ))
                })
            })
            .collect()
    }

    fn phase_biases(&self, satellites: &[SatellitePhaseBias]) -> Vec<CorrectionRecord> {
        satellites
            .iter()
            .flat_map(|sat| {
                sat.biases.iter().filter_map(move |bias| {
                    let bias_m = bias.bias_m?;
                    Some(self.record(
                        sat.sv,
                        Some(bias.signal),
                        Correction::PhaseBias {
                            bias_m,
                            integer: bias.integer,
                            discontinuity: bias.discontinuity,
                        },
                    ))
                })
            })
            .collect()
    }

    fn ura(&self, ura: &[UraCorrection]) -> Vec<CorrectionRecord> {
        ura.iter()
            .filter_map(|ura| {
                let ura_m = ura.ura.meters()?;
                Some(self.record(ura.sv, None, Correction::Ura { ura_m }))
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::{
        resolve_glonass_time_of_day, resolve_hour_seconds, resolve_time_of_week, Decoder,
    };
    use crate::cfg::CorrectionOpts;
    use crate::corrections::{CorrectionKind, CorrectionStore};
    use crate::prelude::{Constellation, Duration, Epoch, TimeScale, SV};
    use crate::ssr::{
        encode_frame, ClockCorrection, CompactHeader, CompactMask, CompactMessage,
        DecodingError, GnssMask, Message, OrbitCorrection, SsrBody, SsrFamily, SsrHeader,
        SsrMessage, UpdateInterval,
    };

    fn reference() -> Epoch {
        // 2024-01-03 12:00:00 GPST: wednesday
        Epoch::from_gregorian(2024, 1, 3, 12, 0, 0, 0, TimeScale::GPST)
    }

    #[test]
    fn time_of_week() {
        let t = reference();
        let (_, nanos) = t.to_time_of_week();
        let tow = (nanos / 1_000_000_000) as u32;
        assert_eq!(tow, 3 * 86400 + 12 * 3600);

        assert_eq!(resolve_time_of_week(t, tow), t);
        assert_eq!(
            resolve_time_of_week(t, tow + 10),
            t + Duration::from_seconds(10.0)
        );
        assert_eq!(
            resolve_time_of_week(t, tow - 10),
            t - Duration::from_seconds(10.0)
        );

        // end of previous week
        let sunday = Epoch::from_gregorian(2024, 1, 7, 0, 0, 5, 0, TimeScale::GPST);
        assert_eq!(
            resolve_time_of_week(sunday, 604_795),
            sunday - Duration::from_seconds(10.0)
        );
    }

    #[test]
    fn hour_seconds() {
        let t = reference() + Duration::from_seconds(3590.0);
        assert_eq!(resolve_hour_seconds(t, 3590), t);
        assert_eq!(resolve_hour_seconds(t, 5), t + Duration::from_seconds(15.0));
    }

    #[test]
    fn glonass_time_of_day() {
        let t = Epoch::from_gregorian_utc(2024, 1, 3, 22, 0, 0, 0);
        // 01:00:00 Moscow time
        assert_eq!(resolve_glonass_time_of_day(t, 3600), t);
        assert_eq!(
            resolve_glonass_time_of_day(t, 3590),
            t - Duration::from_seconds(10.0)
        );
    }

    fn gps_combined(reference: Epoch, iod_ssr: u8, multiple_message: bool) -> SsrMessage {
        let (_, nanos) = reference.to_time_of_week();
        SsrMessage {
            family: SsrFamily::Rtcm,
            constellation: Constellation::GPS,
            header: SsrHeader {
                epoch_s: (nanos / 1_000_000_000) as u32,
                update_interval: UpdateInterval(2),
                multiple_message,
                reference_datum: false,
                iod_ssr,
                provider_id: 12,
                solution_id: 1,
            },
            body: SsrBody::Combined(vec![(
                OrbitCorrection {
                    sv: SV::new(Constellation::GPS, 3),
                    iode: 45,
                    radial_m: Some(5000.0 * 1.0E-4),
                    along_m: Some(-2500.0 * 4.0E-4),
                    cross_m: Some(625.0 * 4.0E-4),
                    radial_rate_m_s: Some(1000.0 * 1.0E-6),
                    along_rate_m_s: None,
                    cross_rate_m_s: Some(0.0),
                },
                ClockCorrection {
                    sv: SV::new(Constellation::GPS, 3),
                    c0_m: Some(15000.0 * 1.0E-4),
                    c1_m_s: None,
                    c2_m_s2: None,
                },
            )]),
        }
    }

    #[test]
    fn decode_rtcm_payload() {
        let t = reference();
        let message = gps_combined(t, 3, false);
        let payload = message.encode().unwrap();

        let mut decoder = Decoder::new(t, &CorrectionOpts::default());
        let decoded = decoder.decode_payload(&payload).unwrap();

        assert_eq!(decoded.message, Message::Ssr(message));
        assert_eq!(decoded.epoch, t);
        assert_eq!(decoded.key.message, 1060);
        assert_eq!(decoded.records.len(), 2);

        let orbit = &decoded.records[0];
        assert_eq!(orbit.key.kind, CorrectionKind::Orbit);
        assert_eq!(orbit.iod_ssr, 3);
        assert_eq!(orbit.provider_id, Some(12));
        // 5s update interval
        assert_eq!(orbit.validity, Duration::from_seconds(10.0));
    }

    #[test]
    fn feed_stream() {
        let t = reference();
        let store = CorrectionStore::new();
        let mut decoder = Decoder::new(t, &CorrectionOpts::default());

        let first = encode_frame(&gps_combined(t, 3, true).encode().unwrap()).unwrap();
        let last = encode_frame(&gps_combined(t, 3, false).encode().unwrap()).unwrap();

        // garbage and a false preamble
        let mut stream = vec![0x00, 0xd3, 0x00, 0x01, 0xff, 0x00, 0x00, 0x00];
        stream.extend_from_slice(&first);
        stream.extend_from_slice(&last[..4]);

        // sequence is incomplete
        assert_eq!(decoder.feed(&stream, &store), 0);
        assert!(store.is_empty());

        assert_eq!(decoder.feed(&last[4..], &store), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unknown_message() {
        let mut decoder = Decoder::new(reference(), &CorrectionOpts::default());
        assert_eq!(
            decoder.decode_payload(&[0x3e, 0xd0, 0x00]),
            Err(DecodingError::UnknownMessage(1005))
        );
    }

    #[test]
    fn compact_mask_then_orbits() {
        let t = reference();
        let mut decoder = Decoder::new(t, &CorrectionOpts::default());

        let header = CompactHeader {
            epoch_s: 3 * 86400 + 12 * 3600,
            update_interval: UpdateInterval(1),
            multiple_message: false,
            iod_ssr: 2,
        };

        let mask = CompactMask {
            header,
            gnss: vec![GnssMask {
                constellation: Constellation::GPS,
                satellite_mask: (1 << 39) | (1 << 38),
                signal_mask: 1 << 15,
                cell_mask: None,
            }],
        };

        let payload = CompactMessage::Mask(mask.clone()).encode(None).unwrap();

        let orbits = CompactMessage::Orbit {
            header: CompactHeader {
                epoch_s: 0,
                ..header
            },
            corrections: (1..3)
                .map(|prn| OrbitCorrection {
                    sv: SV::new(Constellation::GPS, prn),
                    iode: 10,
                    radial_m: Some(0.0016 * prn as f64),
                    along_m: Some(0.0),
                    cross_m: None,
                    radial_rate_m_s: None,
                    along_rate_m_s: None,
                    cross_rate_m_s: None,
                })
                .collect(),
        };

        let orbit_payload = orbits.encode(Some(&mask)).unwrap();

        assert_eq!(
            decoder.decode_payload(&orbit_payload),
            Err(DecodingError::MissingMask)
        );

        let decoded = decoder.decode_payload(&payload).unwrap();
        assert_eq!(decoded.epoch, t);
        assert!(decoded.records.is_empty());
        assert!(decoder.mask().is_some());

        let decoded = decoder.decode_payload(&orbit_payload).unwrap();
        assert_eq!(decoded.message, Message::Compact(orbits));
        assert_eq!(decoded.key.subtype, 2);
        // seconds within the hour
        assert_eq!(decoded.epoch, t);
        // cross track not provided
        assert!(decoded.records.is_empty());
    }
}
