//! RTCM-SSR (10403.x) and IGS-SSR (4076) messages.
use log::warn;

use crate::{
    prelude::{Constellation, SV},
    ssr::{
        bits::{BitReader, BitWriter, Field},
        message::{
            ClockCorrection, CodeBias, HighRateClock, MessageKind, OrbitCorrection, PhaseBias,
            SatelliteCodeBias, SatellitePhaseBias, SsrBody, SsrFamily, SsrHeader, SsrMessage,
            UpdateInterval, UraCorrection, UraIndex,
        },
        signal::SignalTable,
        DecodingError, IGS_SSR_MESSAGE,
    },
};

const ORBIT_RADIAL: Field = Field::signed(22, 1.0E-4);
const ORBIT_ALONG: Field = Field::signed(20, 4.0E-4);
const ORBIT_CROSS: Field = Field::signed(20, 4.0E-4);
const ORBIT_RADIAL_RATE: Field = Field::signed(21, 1.0E-6);
const ORBIT_ALONG_RATE: Field = Field::signed(19, 4.0E-6);
const ORBIT_CROSS_RATE: Field = Field::signed(19, 4.0E-6);

const CLOCK_C0: Field = Field::signed(22, 1.0E-4);
const CLOCK_C1: Field = Field::signed(21, 1.0E-6);
const CLOCK_C2: Field = Field::signed(27, 2.0E-8);

const HIGH_RATE_CLOCK: Field = Field::signed(22, 1.0E-4);

const CODE_BIAS: Field = Field::signed(14, 0.01);
const PHASE_BIAS: Field = Field::signed(20, 1.0E-4);

const YAW: Field = Field::unsigned(9, 1.0 / 256.0);
const YAW_RATE: Field = Field::signed(8, 1.0 / 8192.0);

/// RTCM-SSR message number ranges, per constellation:
/// orbit, clock, code bias, combined, ura, high-rate clock.
const RTCM_BLOCKS: [(Constellation, u16, u16); 6] = [
    (Constellation::GPS, 1057, 1265),
    (Constellation::Glonass, 1063, 1266),
    (Constellation::Galileo, 1240, 1267),
    (Constellation::QZSS, 1246, 1268),
    (Constellation::SBAS, 1252, 1269),
    (Constellation::BeiDou, 1258, 1270),
];

const RTCM_KINDS: [MessageKind; 6] = [
    MessageKind::Orbit,
    MessageKind::Clock,
    MessageKind::CodeBias,
    MessageKind::Combined,
    MessageKind::Ura,
    MessageKind::HighRateClock,
];

/// IGS-SSR constellation codes (tens of the subtype)
const IGS_CONSTELLATIONS: [(Constellation, u8); 6] = [
    (Constellation::GPS, 2),
    (Constellation::Glonass, 4),
    (Constellation::Galileo, 6),
    (Constellation::QZSS, 8),
    (Constellation::BeiDou, 10),
    (Constellation::SBAS, 12),
];

/// IGS-SSR content codes (units of the subtype)
const IGS_KINDS: [(MessageKind, u8); 7] = [
    (MessageKind::Orbit, 1),
    (MessageKind::Clock, 2),
    (MessageKind::Combined, 3),
    (MessageKind::HighRateClock, 4),
    (MessageKind::CodeBias, 5),
    (MessageKind::PhaseBias, 6),
    (MessageKind::Ura, 7),
];

/// Identifies an RTCM-SSR message number.
pub(crate) fn rtcm_message(number: u16) -> Option<(Constellation, MessageKind)> {
    RTCM_BLOCKS.iter().find_map(|(constellation, base, pbias)| {
        if number == *pbias {
            Some((*constellation, MessageKind::PhaseBias))
        } else if number >= *base && number < base + 6 {
            Some((*constellation, RTCM_KINDS[(number - base) as usize]))
        } else {
            None
        }
    })
}

pub(crate) fn rtcm_number(constellation: Constellation, kind: MessageKind) -> Option<u16> {
    let (_, base, pbias) = RTCM_BLOCKS.iter().find(|(c, _, _)| *c == constellation)?;
    if kind == MessageKind::PhaseBias {
        return Some(*pbias);
    }
    let offset = RTCM_KINDS.iter().position(|k| *k == kind)?;
    Some(base + offset as u16)
}

fn igs_message(subtype: u8) -> Option<(Constellation, MessageKind)> {
    let (constellation, _) = IGS_CONSTELLATIONS
        .iter()
        .find(|(_, code)| *code == subtype / 10)?;
    let (kind, _) = IGS_KINDS.iter().find(|(_, code)| *code == subtype % 10)?;
    Some((*constellation, *kind))
}

pub(crate) fn igs_subtype(constellation: Constellation, kind: MessageKind) -> Option<u8> {
    let (_, c) = IGS_CONSTELLATIONS
        .iter()
        .find(|(k, _)| *k == constellation)?;
    let (_, k) = IGS_KINDS.iter().find(|(x, _)| *x == kind)?;
    Some(c * 10 + k)
}

/// Satellite identifier to [SV]
pub(crate) fn sv_from_id(constellation: Constellation, id: u8) -> SV {
    match constellation {
        Constellation::SBAS => SV::new(constellation, id + 19),
        _ => SV::new(constellation, id),
    }
}

/// [SV] to satellite identifier
pub(crate) fn sv_to_id(sv: &SV) -> Result<u8, DecodingError> {
    match sv.constellation {
        Constellation::SBAS => sv
            .prn
            .checked_sub(19)
            .ok_or(DecodingError::InvalidSatellite(*sv)),
        _ => Ok(sv.prn),
    }
}

/// Describes field widths that depend on the family and constellation
struct Layout {
    family: SsrFamily,
    constellation: Constellation,
}

impl Layout {
    fn is_igs(&self) -> bool {
        matches!(self.family, SsrFamily::Igs { .. })
    }

    fn epoch_bits(&self) -> usize {
        if !self.is_igs() && self.constellation == Constellation::Glonass {
            17
        } else {
            20
        }
    }

    fn satellite_bits(&self) -> usize {
        if self.is_igs() {
            return 6;
        }
        match self.constellation {
            Constellation::Glonass => 5,
            Constellation::QZSS => 4,
            _ => 6,
        }
    }

    fn iode_bits(&self) -> usize {
        if self.is_igs() {
            return 8;
        }
        match self.constellation {
            Constellation::Galileo => 10,
            Constellation::SBAS => 24,
            _ => 8,
        }
    }

    fn read_sv(&self, reader: &mut BitReader) -> Result<SV, DecodingError> {
        let id = reader.read_as::<u8>(self.satellite_bits())?;
        Ok(sv_from_id(self.constellation, id))
    }

    fn write_sv(&self, writer: &mut BitWriter, sv: &SV) -> Result<(), DecodingError> {
        if sv.constellation != self.constellation {
            return Err(DecodingError::InvalidSatellite(*sv));
        }
        let id = sv_to_id(sv)?;
        writer
            .write_u64(id as u64, self.satellite_bits())
            .map_err(|_| DecodingError::InvalidSatellite(*sv))
    }

    fn read_header(
        &self,
        reader: &mut BitReader,
        kind: MessageKind,
    ) -> Result<SsrHeader, DecodingError> {
        let epoch_s = reader.read_as::<u32>(self.epoch_bits())?;
        let update_interval = UpdateInterval(reader.read_as::<u8>(4)?);
        let multiple_message = reader.read_bool()?;

        let reference_datum = if matches!(kind, MessageKind::Orbit | MessageKind::Combined) {
            reader.read_bool()?
        } else {
            false
        };

        let iod_ssr = reader.read_as::<u8>(4)?;
        let provider_id = reader.read_as::<u16>(16)?;
        let solution_id = reader.read_as::<u8>(4)?;

        Ok(SsrHeader {
            epoch_s,
            update_interval,
            multiple_message,
            reference_datum,
            iod_ssr,
            provider_id,
            solution_id,
        })
    }

    fn write_header(
        &self,
        writer: &mut BitWriter,
        kind: MessageKind,
        header: &SsrHeader,
    ) -> Result<(), DecodingError> {
        writer.write_u64(header.epoch_s as u64, self.epoch_bits())?;
        writer.write_u64(header.update_interval.0 as u64, 4)?;
        writer.write_bool(header.multiple_message)?;
        if matches!(kind, MessageKind::Orbit | MessageKind::Combined) {
            writer.write_bool(header.reference_datum)?;
        }
        writer.write_u64(header.iod_ssr as u64, 4)?;
        writer.write_u64(header.provider_id as u64, 16)?;
        writer.write_u64(header.solution_id as u64, 4)?;
        Ok(())
    }

    fn read_orbit(&self, reader: &mut BitReader, sv: SV) -> Result<OrbitCorrection, DecodingError> {
        let iode = reader.read_as::<u32>(self.iode_bits())?;
        Ok(OrbitCorrection {
            sv,
            iode,
            radial_m: reader.read_field(&ORBIT_RADIAL)?,
            along_m: reader.read_field(&ORBIT_ALONG)?,
            cross_m: reader.read_field(&ORBIT_CROSS)?,
            radial_rate_m_s: reader.read_field(&ORBIT_RADIAL_RATE)?,
            along_rate_m_s: reader.read_field(&ORBIT_ALONG_RATE)?,
            cross_rate_m_s: reader.read_field(&ORBIT_CROSS_RATE)?,
        })
    }

    fn write_orbit(&self, writer: &mut BitWriter, orbit: &OrbitCorrection) -> Result<(), DecodingError> {
        writer.write_u64(orbit.iode as u64, self.iode_bits())?;
        writer.write_field(&ORBIT_RADIAL, orbit.radial_m)?;
        writer.write_field(&ORBIT_ALONG, orbit.along_m)?;
        writer.write_field(&ORBIT_CROSS, orbit.cross_m)?;
        writer.write_field(&ORBIT_RADIAL_RATE, orbit.radial_rate_m_s)?;
        writer.write_field(&ORBIT_ALONG_RATE, orbit.along_rate_m_s)?;
        writer.write_field(&ORBIT_CROSS_RATE, orbit.cross_rate_m_s)?;
        Ok(())
    }

    fn read_clock(&self, reader: &mut BitReader, sv: SV) -> Result<ClockCorrection, DecodingError> {
        Ok(ClockCorrection {
            sv,
            c0_m: reader.read_field(&CLOCK_C0)?,
            c1_m_s: reader.read_field(&CLOCK_C1)?,
            c2_m_s2: reader.read_field(&CLOCK_C2)?,
        })
    }

    fn write_clock(&self, writer: &mut BitWriter, clock: &ClockCorrection) -> Result<(), DecodingError> {
        writer.write_field(&CLOCK_C0, clock.c0_m)?;
        writer.write_field(&CLOCK_C1, clock.c1_m_s)?;
        writer.write_field(&CLOCK_C2, clock.c2_m_s2)?;
        Ok(())
    }

    fn read_code_biases(
        &self,
        reader: &mut BitReader,
        sv: SV,
    ) -> Result<SatelliteCodeBias, DecodingError> {
        let nsig = reader.read_as::<usize>(5)?;
        let mut biases = Vec::with_capacity(nsig);

        for _ in 0..nsig {
            let id = reader.read_as::<u8>(5)?;
            let bias_m = reader.read_field(&CODE_BIAS)?;
            match SignalTable::Rtcm.signal(self.constellation, id) {
                Some(signal) => biases.push(CodeBias { signal, bias_m }),
                None => {
                    warn!("{}: unknown code bias signal id {}", sv, id);
                },
            }
        }

        Ok(SatelliteCodeBias { sv, biases })
    }

    fn write_code_biases(
        &self,
        writer: &mut BitWriter,
        sat: &SatelliteCodeBias,
    ) -> Result<(), DecodingError> {
        if sat.biases.len() > 31 {
            return Err(DecodingError::TooManyEntries(sat.biases.len()));
        }
        writer.write_u64(sat.biases.len() as u64, 5)?;
        for bias in sat.biases.iter() {
            let id = SignalTable::Rtcm
                .identifier(self.constellation, &bias.signal)
                .ok_or(DecodingError::UnmappedSignal(bias.signal))?;
            writer.write_u64(id as u64, 5)?;
            writer.write_field(&CODE_BIAS, bias.bias_m)?;
        }
        Ok(())
    }

    fn read_phase_biases(
        &self,
        reader: &mut BitReader,
        sv: SV,
    ) -> Result<SatellitePhaseBias, DecodingError> {
        let nsig = reader.read_as::<usize>(5)?;
        let yaw_semicircles = reader.read_field(&YAW)?;
        let yaw_rate_semicircles_s = reader.read_field(&YAW_RATE)?;

        let mut biases = Vec::with_capacity(nsig);

        for _ in 0..nsig {
            let id = reader.read_as::<u8>(5)?;
            let integer = reader.read_bool()?;
            let wide_lane = reader.read_as::<u8>(2)?;
            let discontinuity = reader.read_as::<u8>(4)?;
            let bias_m = reader.read_field(&PHASE_BIAS)?;

            match SignalTable::Rtcm.signal(self.constellation, id) {
                Some(signal) => biases.push(PhaseBias {
                    signal,
                    integer,
                    wide_lane,
                    discontinuity,
                    bias_m,
                }),
                None => {
                    warn!("{}: unknown phase bias signal id {}", sv, id);
                },
            }
        }

        Ok(SatellitePhaseBias {
            sv,
            yaw_semicircles,
            yaw_rate_semicircles_s,
            biases,
        })
    }

    fn write_phase_biases(
        &self,
        writer: &mut BitWriter,
        sat: &SatellitePhaseBias,
    ) -> Result<(), DecodingError> {
        if sat.biases.len() > 31 {
            return Err(DecodingError::TooManyEntries(sat.biases.len()));
        }
        writer.write_u64(sat.biases.len() as u64, 5)?;
        // yaw has no reserved pattern: it must be provided
        writer.write_field(&YAW, sat.yaw_semicircles)?;
        writer.write_field(&YAW_RATE, sat.yaw_rate_semicircles_s)?;

        for bias in sat.biases.iter() {
            let id = SignalTable::Rtcm
                .identifier(self.constellation, &bias.signal)
                .ok_or(DecodingError::UnmappedSignal(bias.signal))?;
            writer.write_u64(id as u64, 5)?;
            writer.write_bool(bias.integer)?;
            writer.write_u64(bias.wide_lane as u64, 2)?;
            writer.write_u64(bias.discontinuity as u64, 4)?;
            writer.write_field(&PHASE_BIAS, bias.bias_m)?;
        }
        Ok(())
    }
}

/// Runs `decode` `nsat` times, converting a premature end of message
/// into a [DecodingError::LengthMismatch].
pub(crate) fn read_satellites<T, F>(nsat: usize, mut decode: F) -> Result<Vec<T>, DecodingError>
where
    F: FnMut() -> Result<T, DecodingError>,
{
    let mut items = Vec::with_capacity(nsat);
    for _ in 0..nsat {
        match decode() {
            Ok(item) => items.push(item),
            Err(DecodingError::Truncated) => {
                return Err(DecodingError::LengthMismatch {
                    expected: nsat,
                    found: items.len(),
                });
            },
            Err(e) => return Err(e),
        }
    }
    Ok(items)
}

impl SsrMessage {
    /// Message number of this [SsrMessage]
    pub fn message_number(&self) -> Option<u16> {
        match self.family {
            SsrFamily::Rtcm => rtcm_number(self.constellation, self.kind()),
            SsrFamily::Igs { .. } => Some(IGS_SSR_MESSAGE),
        }
    }

    /// Decodes an RTCM-SSR message body. The reader is positioned right
    /// after the 12-bit message number.
    pub(crate) fn decode_rtcm(number: u16, reader: &mut BitReader) -> Result<Self, DecodingError> {
        let (constellation, kind) =
            rtcm_message(number).ok_or(DecodingError::UnknownMessage(number))?;

        Self::decode_body(SsrFamily::Rtcm, constellation, kind, reader)
    }

    /// Decodes an IGS-SSR message. The reader is positioned right
    /// after the 12-bit message number.
    pub(crate) fn decode_igs(reader: &mut BitReader) -> Result<Self, DecodingError> {
        let version = reader.read_as::<u8>(3)?;
        let subtype = reader.read_as::<u8>(8)?;

        let (constellation, kind) =
            igs_message(subtype).ok_or(DecodingError::UnknownMessage(IGS_SSR_MESSAGE))?;

        Self::decode_body(SsrFamily::Igs { version }, constellation, kind, reader)
    }

    fn decode_body(
        family: SsrFamily,
        constellation: Constellation,
        kind: MessageKind,
        reader: &mut BitReader,
    ) -> Result<Self, DecodingError> {
        let layout = Layout {
            family,
            constellation,
        };

        let header = layout.read_header(reader, kind)?;

        let (dispersive, mw_consistency) = if kind == MessageKind::PhaseBias {
            (reader.read_bool()?, reader.read_bool()?)
        } else {
            (false, false)
        };

        let nsat = reader.read_as::<usize>(6)?;

        let body = match kind {
            MessageKind::Orbit => SsrBody::Orbit(read_satellites(nsat, || {
                let sv = layout.read_sv(reader)?;
                layout.read_orbit(reader, sv)
            })?),
            MessageKind::Clock => SsrBody::Clock(read_satellites(nsat, || {
                let sv = layout.read_sv(reader)?;
                layout.read_clock(reader, sv)
            })?),
            MessageKind::Combined => SsrBody::Combined(read_satellites(nsat, || {
                let sv = layout.read_sv(reader)?;
                let orbit = layout.read_orbit(reader, sv)?;
                let clock = layout.read_clock(reader, sv)?;
                Ok((orbit, clock))
            })?),
            MessageKind::HighRateClock => SsrBody::HighRateClock(read_satellites(nsat, || {
                let sv = layout.read_sv(reader)?;
                let c0_m = reader.read_field(&HIGH_RATE_CLOCK)?;
                Ok(HighRateClock { sv, c0_m })
            })?),
            MessageKind::CodeBias => SsrBody::CodeBias(read_satellites(nsat, || {
                let sv = layout.read_sv(reader)?;
                layout.read_code_biases(reader, sv)
            })?),
            MessageKind::PhaseBias => SsrBody::PhaseBias {
                dispersive,
                mw_consistency,
                satellites: read_satellites(nsat, || {
                    let sv = layout.read_sv(reader)?;
                    layout.read_phase_biases(reader, sv)
                })?,
            },
            MessageKind::Ura => SsrBody::Ura(read_satellites(nsat, || {
                let sv = layout.read_sv(reader)?;
                let ura = UraIndex(reader.read_as::<u8>(6)?);
                Ok(UraCorrection { sv, ura })
            })?),
        };

        Ok(Self {
            family,
            constellation,
            header,
            body,
        })
    }

    /// Encodes this [SsrMessage] as a message payload, starting with the message number.
    pub fn encode(&self) -> Result<Vec<u8>, DecodingError> {
        let kind = self.kind();

        let layout = Layout {
            family: self.family,
            constellation: self.constellation,
        };

        let mut writer = BitWriter::new();

        match self.family {
            SsrFamily::Rtcm => {
                let number = rtcm_number(self.constellation, kind)
                    .ok_or(DecodingError::UnsupportedConstellation(self.constellation))?;
                writer.write_u64(number as u64, 12)?;
            },
            SsrFamily::Igs { version } => {
                let subtype = igs_subtype(self.constellation, kind)
                    .ok_or(DecodingError::UnsupportedConstellation(self.constellation))?;
                writer.write_u64(IGS_SSR_MESSAGE as u64, 12)?;
                writer.write_u64(version as u64, 3)?;
                writer.write_u64(subtype as u64, 8)?;
            },
        }

        layout.write_header(&mut writer, kind, &self.header)?;

        if let SsrBody::PhaseBias {
            dispersive,
            mw_consistency,
            ..
        } = &self.body
        {
            writer.write_bool(*dispersive)?;
            writer.write_bool(*mw_consistency)?;
        }

        let nsat = self.body.len();
        if nsat > 63 {
            return Err(DecodingError::TooManyEntries(nsat));
        }
        writer.write_u64(nsat as u64, 6)?;

        match &self.body {
            SsrBody::Orbit(orbits) => {
                for orbit in orbits.iter() {
                    layout.write_sv(&mut writer, &orbit.sv)?;
                    layout.write_orbit(&mut writer, orbit)?;
                }
            },
            SsrBody::Clock(clocks) => {
                for clock in clocks.iter() {
                    layout.write_sv(&mut writer, &clock.sv)?;
                    layout.write_clock(&mut writer, clock)?;
                }
            },
            SsrBody::Combined(items) => {
                for (orbit, clock) in items.iter() {
                    layout.write_sv(&mut writer, &orbit.sv)?;
                    layout.write_orbit(&mut writer, orbit)?;
                    layout.write_clock(&mut writer, clock)?;
                }
            },
            SsrBody::HighRateClock(clocks) => {
                for clock in clocks.iter() {
                    layout.write_sv(&mut writer, &clock.sv)?;
                    writer.write_field(&HIGH_RATE_CLOCK, clock.c0_m)?;
                }
            },
            SsrBody::CodeBias(sats) => {
                for sat in sats.iter() {
                    layout.write_sv(&mut writer, &sat.sv)?;
                    layout.write_code_biases(&mut writer, sat)?;
                }
            },
            SsrBody::PhaseBias { satellites, .. } => {
                for sat in satellites.iter() {
                    layout.write_sv(&mut writer, &sat.sv)?;
                    layout.write_phase_biases(&mut writer, sat)?;
                }
            },
            SsrBody::Ura(items) => {
                for item in items.iter() {
                    layout.write_sv(&mut writer, &item.sv)?;
                    writer.write_u64((item.ura.0 & 0x3f) as u64, 6)?;
                }
            },
        }

        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::{igs_message, igs_subtype, rtcm_message, rtcm_number};
    use crate::{
        carrier::{Carrier, Signal},
        prelude::{Constellation, SV},
        ssr::{
            bits::BitReader,
            message::{
                ClockCorrection, CodeBias, HighRateClock, MessageKind, OrbitCorrection, PhaseBias,
                SatelliteCodeBias, SatellitePhaseBias, SsrBody, SsrFamily, SsrHeader, SsrMessage,
                UpdateInterval, UraCorrection, UraIndex,
            },
            DecodingError, IGS_SSR_MESSAGE,
        },
    };

    fn decode(bytes: &[u8]) -> Result<SsrMessage, DecodingError> {
        let mut reader = BitReader::new(bytes);
        let number = reader.read_as::<u16>(12)?;
        if number == IGS_SSR_MESSAGE {
            SsrMessage::decode_igs(&mut reader)
        } else {
            SsrMessage::decode_rtcm(number, &mut reader)
        }
    }

    fn header(datum: bool) -> SsrHeader {
        SsrHeader {
            epoch_s: 345_600,
            update_interval: UpdateInterval(2),
            multiple_message: false,
            reference_datum: datum,
            iod_ssr: 7,
            provider_id: 0xabcd,
            solution_id: 3,
        }
    }

    #[test]
    fn message_numbers() {
        assert_eq!(
            rtcm_message(1057),
            Some((Constellation::GPS, MessageKind::Orbit))
        );
        assert_eq!(
            rtcm_message(1060),
            Some((Constellation::GPS, MessageKind::Combined))
        );
        assert_eq!(
            rtcm_message(1068),
            Some((Constellation::Glonass, MessageKind::HighRateClock))
        );
        assert_eq!(
            rtcm_message(1242),
            Some((Constellation::Galileo, MessageKind::CodeBias))
        );
        assert_eq!(
            rtcm_message(1270),
            Some((Constellation::BeiDou, MessageKind::PhaseBias))
        );
        assert_eq!(rtcm_message(1264), None);
        assert_eq!(rtcm_message(1005), None);

        for number in (1057..1069).chain(1240..1264).chain(1265..1271) {
            let (constellation, kind) = rtcm_message(number).unwrap();
            assert_eq!(rtcm_number(constellation, kind), Some(number));
        }

        assert_eq!(
            igs_message(21),
            Some((Constellation::GPS, MessageKind::Orbit))
        );
        assert_eq!(
            igs_message(66),
            Some((Constellation::Galileo, MessageKind::PhaseBias))
        );
        assert_eq!(
            igs_message(107),
            Some((Constellation::BeiDou, MessageKind::Ura))
        );
        assert_eq!(igs_subtype(Constellation::SBAS, MessageKind::Clock), Some(122));
        assert_eq!(igs_message(201), None);
    }

    #[test]
    fn gps_orbit_round_trip() {
        let g05 = SV::new(Constellation::GPS, 5);
        let g12 = SV::new(Constellation::GPS, 12);

        let message = SsrMessage {
            family: SsrFamily::Rtcm,
            constellation: Constellation::GPS,
            header: header(true),
            body: SsrBody::Orbit(vec![
                OrbitCorrection {
                    sv: g05,
                    iode: 255,
                    radial_m: Some(-2097151.0 * 1.0E-4),
                    along_m: Some(524287.0 * 4.0E-4),
                    cross_m: Some(0.0),
                    radial_rate_m_s: Some(1.0E-6),
                    along_rate_m_s: Some(-4.0E-6),
                    cross_rate_m_s: None,
                },
                OrbitCorrection {
                    sv: g12,
                    iode: 0,
                    radial_m: None,
                    along_m: None,
                    cross_m: None,
                    radial_rate_m_s: None,
                    along_rate_m_s: None,
                    cross_rate_m_s: None,
                },
            ]),
        };

        let bytes = message.encode().unwrap();
        // 12 + 50 header + 6 + 2 * (6 + 8 + 121) bits
        assert_eq!(bytes.len(), (12 + 50 + 6 + 2 * 135 + 7) / 8);

        assert_eq!(decode(&bytes).unwrap(), message);
    }

    #[test]
    fn glonass_combined_round_trip() {
        let r24 = SV::new(Constellation::Glonass, 24);

        let mut hdr = header(false);
        hdr.epoch_s = 86_399;

        let message = SsrMessage {
            family: SsrFamily::Rtcm,
            constellation: Constellation::Glonass,
            header: hdr,
            body: SsrBody::Combined(vec![(
                OrbitCorrection {
                    sv: r24,
                    iode: 42,
                    radial_m: Some(0.1234),
                    along_m: Some(-0.4),
                    cross_m: Some(0.0004),
                    radial_rate_m_s: Some(0.0),
                    along_rate_m_s: Some(0.0),
                    cross_rate_m_s: Some(0.0),
                },
                ClockCorrection {
                    sv: r24,
                    c0_m: Some(-0.5),
                    c1_m_s: Some(1.0E-3),
                    c2_m_s2: Some(2.0E-8),
                },
            )]),
        };

        let bytes = message.encode().unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.header, message.header);

        match decoded.body {
            SsrBody::Combined(items) => {
                let (orbit, clock) = items[0];
                assert_eq!(orbit.sv, r24);
                assert_eq!(orbit.iode, 42);
                assert!((orbit.radial_m.unwrap() - 0.1234).abs() < 1.0E-9);
                assert!((orbit.along_m.unwrap() + 0.4).abs() < 1.0E-9);
                assert!((clock.c0_m.unwrap() + 0.5).abs() < 1.0E-9);
                assert!((clock.c1_m_s.unwrap() - 1.0E-3).abs() < 1.0E-12);
                assert!((clock.c2_m_s2.unwrap() - 2.0E-8).abs() < 1.0E-15);
            },
            _ => panic!("invalid message kind"),
        }
    }

    #[test]
    fn galileo_biases_round_trip() {
        let e11 = SV::new(Constellation::Galileo, 11);

        let code = SsrMessage {
            family: SsrFamily::Rtcm,
            constellation: Constellation::Galileo,
            header: header(false),
            body: SsrBody::CodeBias(vec![SatelliteCodeBias {
                sv: e11,
                biases: vec![
                    CodeBias {
                        signal: Signal::new(Carrier::E1, 'C'),
                        bias_m: Some(-8191.0 * 0.01),
                    },
                    CodeBias {
                        signal: Signal::new(Carrier::E5A, 'Q'),
                        bias_m: None,
                    },
                ],
            }]),
        };

        let bytes = code.encode().unwrap();
        assert_eq!(decode(&bytes).unwrap(), code);

        let phase = SsrMessage {
            family: SsrFamily::Rtcm,
            constellation: Constellation::Galileo,
            header: header(false),
            body: SsrBody::PhaseBias {
                dispersive: true,
                mw_consistency: false,
                satellites: vec![SatellitePhaseBias {
                    sv: e11,
                    yaw_semicircles: Some(511.0 / 256.0),
                    yaw_rate_semicircles_s: Some(-127.0 / 8192.0),
                    biases: vec![PhaseBias {
                        signal: Signal::new(Carrier::E5B, 'Q'),
                        integer: true,
                        wide_lane: 2,
                        discontinuity: 15,
                        bias_m: Some(52.4287),
                    }],
                }],
            },
        };

        let bytes = phase.encode().unwrap();
        let decoded = decode(&bytes).unwrap();
        match decoded.body {
            SsrBody::PhaseBias {
                dispersive,
                mw_consistency,
                satellites,
            } => {
                assert!(dispersive);
                assert!(!mw_consistency);
                let bias = satellites[0].biases[0];
                assert_eq!(bias.signal, Signal::new(Carrier::E5B, 'Q'));
                assert!(bias.integer);
                assert_eq!(bias.wide_lane, 2);
                assert_eq!(bias.discontinuity, 15);
                assert!((bias.bias_m.unwrap() - 52.4287).abs() < 1.0E-9);
            },
            _ => panic!("invalid message kind"),
        }
    }

    #[test]
    fn phase_bias_yaw_is_mandatory() {
        let g05 = SV::new(Constellation::GPS, 5);

        let satellite = SatellitePhaseBias {
            sv: g05,
            yaw_semicircles: Some(0.5),
            yaw_rate_semicircles_s: None,
            biases: vec![PhaseBias {
                signal: Signal::new(Carrier::L1, 'C'),
                integer: true,
                wide_lane: 0,
                discontinuity: 3,
                bias_m: Some(0.0125),
            }],
        };

        let message = |satellite: SatellitePhaseBias| SsrMessage {
            family: SsrFamily::Rtcm,
            constellation: Constellation::GPS,
            header: header(false),
            body: SsrBody::PhaseBias {
                dispersive: false,
                mw_consistency: true,
                satellites: vec![satellite],
            },
        };

        // missing yaw rate uses the reserved pattern
        let with_yaw = message(satellite.clone());
        let bytes = with_yaw.encode().unwrap();
        match decode(&bytes).unwrap().body {
            SsrBody::PhaseBias { satellites, .. } => {
                assert_eq!(satellites[0].yaw_semicircles, Some(0.5));
                assert_eq!(satellites[0].yaw_rate_semicircles_s, None);
                assert!((satellites[0].biases[0].bias_m.unwrap() - 0.0125).abs() < 1.0E-9);
            },
            _ => panic!("invalid message kind"),
        }

        let mut without_yaw = satellite;
        without_yaw.yaw_semicircles = None;
        assert!(message(without_yaw).encode().is_err());
    }

    #[test]
    fn igs_round_trip() {
        let c30 = SV::new(Constellation::BeiDou, 30);

        for body in [
            SsrBody::HighRateClock(vec![HighRateClock {
                sv: c30,
                c0_m: Some(0.0125),
            }]),
            SsrBody::Ura(vec![UraCorrection {
                sv: c30,
                ura: UraIndex(63),
            }]),
        ] {
            let message = SsrMessage {
                family: SsrFamily::Igs { version: 1 },
                constellation: Constellation::BeiDou,
                header: header(false),
                body,
            };

            assert_eq!(message.message_number(), Some(IGS_SSR_MESSAGE));
            let bytes = message.encode().unwrap();
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.family, SsrFamily::Igs { version: 1 });
            assert_eq!(decoded.constellation, Constellation::BeiDou);
            assert_eq!(decoded.kind(), message.kind());
        }
    }

    #[test]
    fn missing_satellite_entries() {
        let clocks = (1..=5)
            .map(|prn| ClockCorrection {
                sv: SV::new(Constellation::GPS, prn),
                c0_m: Some(0.1),
                c1_m_s: None,
                c2_m_s2: None,
            })
            .collect::<Vec<_>>();

        let message = SsrMessage {
            family: SsrFamily::Rtcm,
            constellation: Constellation::GPS,
            header: header(false),
            body: SsrBody::Clock(clocks),
        };

        let bytes = message.encode().unwrap();

        // 447 bits: truncating 9 bytes leaves 4 complete satellites
        let truncated = &bytes[..bytes.len() - 9];

        assert_eq!(
            decode(truncated),
            Err(DecodingError::LengthMismatch {
                expected: 5,
                found: 4
            })
        );
    }
}
