//! Compact SSR (message 4073) mask based messages.
use crate::{
    carrier::Signal,
    prelude::{Constellation, SV},
    ssr::{
        bits::{BitReader, BitWriter, Field},
        message::{
            ClockCorrection, CodeBias, OrbitCorrection, PhaseBias, SatelliteCodeBias,
            SatellitePhaseBias, UpdateInterval, UraCorrection, UraIndex,
        },
        rtcm::read_satellites,
        signal::SignalTable,
        DecodingError, COMPACT_SSR_MESSAGE,
    },
};

const ORBIT_RADIAL: Field = Field::signed(15, 0.0016);
const ORBIT_ALONG: Field = Field::signed(13, 0.0064);
const ORBIT_CROSS: Field = Field::signed(13, 0.0064);
const CLOCK_C0: Field = Field::signed(15, 0.0016);
const CODE_BIAS: Field = Field::signed(11, 0.02);
const PHASE_BIAS: Field = Field::signed(15, 0.001);

const SATELLITE_MASK_BITS: usize = 40;
const SIGNAL_MASK_BITS: usize = 16;

const SUBTYPE_MASK: u8 = 1;
const SUBTYPE_ORBIT: u8 = 2;
const SUBTYPE_CLOCK: u8 = 3;
const SUBTYPE_CODE_BIAS: u8 = 4;
const SUBTYPE_PHASE_BIAS: u8 = 5;
const SUBTYPE_URA: u8 = 7;
const SUBTYPE_COMBINED: u8 = 11;

const GNSS_IDS: [(u8, Constellation); 6] = [
    (0, Constellation::GPS),
    (1, Constellation::Glonass),
    (2, Constellation::Galileo),
    (3, Constellation::BeiDou),
    (4, Constellation::QZSS),
    (5, Constellation::SBAS),
];

fn constellation_from_id(id: u8) -> Result<Constellation, DecodingError> {
    GNSS_IDS
        .iter()
        .find(|(key, _)| *key == id)
        .map(|(_, c)| *c)
        .ok_or(DecodingError::UnknownGnssId(id))
}

fn constellation_id(constellation: Constellation) -> Result<u8, DecodingError> {
    GNSS_IDS
        .iter()
        .find(|(_, c)| *c == constellation)
        .map(|(id, _)| *id)
        .ok_or(DecodingError::UnsupportedConstellation(constellation))
}

fn iode_bits(constellation: Constellation) -> usize {
    if constellation == Constellation::Galileo {
        10
    } else {
        8
    }
}

/// Compact SSR message header.
/// `epoch_s` is the GPS time of week for the mask message, and the
/// second within the current hour for every other subtype.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompactHeader {
    pub epoch_s: u32,
    pub update_interval: UpdateInterval,
    pub multiple_message: bool,
    pub iod_ssr: u8,
}

impl CompactHeader {
    fn decode(reader: &mut BitReader, epoch_bits: usize) -> Result<Self, DecodingError> {
        Ok(Self {
            epoch_s: reader.read_as::<u32>(epoch_bits)?,
            update_interval: UpdateInterval(reader.read_as::<u8>(4)?),
            multiple_message: reader.read_bool()?,
            iod_ssr: reader.read_as::<u8>(4)?,
        })
    }

    fn encode(&self, writer: &mut BitWriter, epoch_bits: usize) -> Result<(), DecodingError> {
        writer.write_u64(self.epoch_s as u64, epoch_bits)?;
        writer.write_u64(self.update_interval.0 as u64, 4)?;
        writer.write_bool(self.multiple_message)?;
        writer.write_u64(self.iod_ssr as u64, 4)?;
        Ok(())
    }
}

/// Satellite and signal mask of one constellation
#[derive(Debug, Clone, PartialEq)]
pub struct GnssMask {
    pub constellation: Constellation,
    /// 40 bit satellite mask, MSB first: first bit is the first satellite.
    pub satellite_mask: u64,
    /// 16 bit signal mask, MSB first.
    pub signal_mask: u16,
    /// Optional cell mask, row major (satellites x signals).
    pub cell_mask: Option<Vec<bool>>,
}

impl GnssMask {
    /// Satellites described by the mask, ascending.
    pub fn satellites(&self) -> Vec<SV> {
        (0..SATELLITE_MASK_BITS)
            .filter(|bit| (self.satellite_mask >> (SATELLITE_MASK_BITS - 1 - bit)) & 1 == 1)
            .map(|bit| {
                let bit = bit as u8;
                match self.constellation {
                    Constellation::SBAS => SV::new(self.constellation, 20 + bit),
                    _ => SV::new(self.constellation, bit + 1),
                }
            })
            .collect()
    }

    fn signal_ids(&self) -> Vec<u8> {
        (0..SIGNAL_MASK_BITS)
            .filter(|bit| (self.signal_mask >> (SIGNAL_MASK_BITS - 1 - bit)) & 1 == 1)
            .map(|bit| bit as u8)
            .collect()
    }

    /// Signals described by the mask, in mask order.
    pub fn signals(&self) -> Result<Vec<Signal>, DecodingError> {
        self.signal_ids()
            .into_iter()
            .map(|id| {
                SignalTable::Compact
                    .signal(self.constellation, id)
                    .ok_or(DecodingError::UnknownSignal {
                        constellation: self.constellation,
                        id,
                    })
            })
            .collect()
    }

    /// Active signals, per satellite in mask order.
    pub fn cells(&self) -> Result<Vec<(SV, Vec<Signal>)>, DecodingError> {
        let signals = self.signals()?;
        let nsig = signals.len();

        Ok(self
            .satellites()
            .into_iter()
            .enumerate()
            .map(|(i, sv)| {
                let active = signals
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| match &self.cell_mask {
                        Some(cells) => cells.get(i * nsig + j).copied().unwrap_or(false),
                        None => true,
                    })
                    .map(|(_, signal)| *signal)
                    .collect();
                (sv, active)
            })
            .collect())
    }

    fn decode(reader: &mut BitReader) -> Result<Self, DecodingError> {
        let constellation = constellation_from_id(reader.read_as::<u8>(4)?)?;
        let satellite_mask = reader.read_u64(SATELLITE_MASK_BITS)?;
        let signal_mask = reader.read_as::<u16>(SIGNAL_MASK_BITS)?;

        let mut mask = Self {
            constellation,
            satellite_mask,
            signal_mask,
            cell_mask: None,
        };

        if reader.read_bool()? {
            let ncell = mask.satellites().len() * mask.signal_ids().len();
            let mut cells = Vec::with_capacity(ncell);
            for _ in 0..ncell {
                cells.push(reader.read_bool()?);
            }
            mask.cell_mask = Some(cells);
        }

        // unknown signals would break the cell layout
        mask.signals()?;

        Ok(mask)
    }

    fn encode(&self, writer: &mut BitWriter) -> Result<(), DecodingError> {
        writer.write_u64(constellation_id(self.constellation)? as u64, 4)?;
        writer.write_u64(self.satellite_mask, SATELLITE_MASK_BITS)?;
        writer.write_u64(self.signal_mask as u64, SIGNAL_MASK_BITS)?;
        match &self.cell_mask {
            Some(cells) => {
                let ncell = self.satellites().len() * self.signal_ids().len();
                if cells.len() != ncell {
                    return Err(DecodingError::LengthMismatch {
                        expected: ncell,
                        found: cells.len(),
                    });
                }
                writer.write_bool(true)?;
                for cell in cells.iter() {
                    writer.write_bool(*cell)?;
                }
            },
            None => writer.write_bool(false)?,
        }
        Ok(())
    }
}

/// Compact SSR mask message (subtype 1). Defines the satellites and signals
/// described by following messages sharing the same issue of data.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactMask {
    pub header: CompactHeader,
    pub gnss: Vec<GnssMask>,
}

impl CompactMask {
    /// All satellites in mask order
    pub fn satellites(&self) -> Vec<SV> {
        self.gnss.iter().flat_map(|gnss| gnss.satellites()).collect()
    }

    fn cells(&self) -> Result<Vec<(SV, Vec<Signal>)>, DecodingError> {
        let mut cells = Vec::new();
        for gnss in self.gnss.iter() {
            cells.extend(gnss.cells()?);
        }
        Ok(cells)
    }
}

/// Network satellite subset of the combined message
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMask {
    pub network_id: u8,
    /// One flag per mask satellite, in mask order
    pub satellites: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompactMessage {
    Mask(CompactMask),
    Orbit {
        header: CompactHeader,
        corrections: Vec<OrbitCorrection>,
    },
    Clock {
        header: CompactHeader,
        corrections: Vec<ClockCorrection>,
    },
    CodeBias {
        header: CompactHeader,
        corrections: Vec<SatelliteCodeBias>,
    },
    PhaseBias {
        header: CompactHeader,
        corrections: Vec<SatellitePhaseBias>,
    },
    Ura {
        header: CompactHeader,
        corrections: Vec<UraCorrection>,
    },
    Combined {
        header: CompactHeader,
        network: Option<NetworkMask>,
        orbits: Option<Vec<OrbitCorrection>>,
        clocks: Option<Vec<ClockCorrection>>,
    },
}

fn read_orbit(reader: &mut BitReader, sv: SV) -> Result<OrbitCorrection, DecodingError> {
    let iode = reader.read_as::<u32>(iode_bits(sv.constellation))?;
    Ok(OrbitCorrection {
        sv,
        iode,
        radial_m: reader.read_field(&ORBIT_RADIAL)?,
        along_m: reader.read_field(&ORBIT_ALONG)?,
        cross_m: reader.read_field(&ORBIT_CROSS)?,
        radial_rate_m_s: None,
        along_rate_m_s: None,
        cross_rate_m_s: None,
    })
}

fn write_orbit(writer: &mut BitWriter, orbit: &OrbitCorrection) -> Result<(), DecodingError> {
    writer.write_u64(orbit.iode as u64, iode_bits(orbit.sv.constellation))?;
    writer.write_field(&ORBIT_RADIAL, orbit.radial_m)?;
    writer.write_field(&ORBIT_ALONG, orbit.along_m)?;
    writer.write_field(&ORBIT_CROSS, orbit.cross_m)?;
    Ok(())
}

fn read_clock(reader: &mut BitReader, sv: SV) -> Result<ClockCorrection, DecodingError> {
    Ok(ClockCorrection {
        sv,
        c0_m: reader.read_field(&CLOCK_C0)?,
        c1_m_s: None,
        c2_m_s2: None,
    })
}

/// Verifies that encoded items follow the mask order.
fn check_order(expected: &[SV], found: &[SV]) -> Result<(), DecodingError> {
    if expected.len() != found.len() {
        return Err(DecodingError::LengthMismatch {
            expected: expected.len(),
            found: found.len(),
        });
    }
    for (expected, found) in expected.iter().zip(found.iter()) {
        if expected != found {
            return Err(DecodingError::InvalidSatellite(*found));
        }
    }
    Ok(())
}

impl CompactMessage {
    pub fn header(&self) -> &CompactHeader {
        match self {
            Self::Mask(mask) => &mask.header,
            Self::Orbit { header, .. }
            | Self::Clock { header, .. }
            | Self::CodeBias { header, .. }
            | Self::PhaseBias { header, .. }
            | Self::Ura { header, .. }
            | Self::Combined { header, .. } => header,
        }
    }

    pub fn subtype(&self) -> u8 {
        match self {
            Self::Mask(_) => SUBTYPE_MASK,
            Self::Orbit { .. } => SUBTYPE_ORBIT,
            Self::Clock { .. } => SUBTYPE_CLOCK,
            Self::CodeBias { .. } => SUBTYPE_CODE_BIAS,
            Self::PhaseBias { .. } => SUBTYPE_PHASE_BIAS,
            Self::Ura { .. } => SUBTYPE_URA,
            Self::Combined { .. } => SUBTYPE_COMBINED,
        }
    }

    /// Decodes a Compact SSR message. The reader is positioned right after
    /// the 12-bit message number. Every subtype but the mask requires the
    /// active [CompactMask].
    pub(crate) fn decode(
        reader: &mut BitReader,
        mask: Option<&CompactMask>,
    ) -> Result<Self, DecodingError> {
        let subtype = reader.read_as::<u8>(4)?;

        if subtype == SUBTYPE_MASK {
            let header = CompactHeader::decode(reader, 20)?;
            let ngnss = reader.read_as::<usize>(4)?;
            let mut gnss = Vec::with_capacity(ngnss);
            for _ in 0..ngnss {
                gnss.push(GnssMask::decode(reader)?);
            }
            return Ok(Self::Mask(CompactMask { header, gnss }));
        }

        if !matches!(
            subtype,
            SUBTYPE_ORBIT
                | SUBTYPE_CLOCK
                | SUBTYPE_CODE_BIAS
                | SUBTYPE_PHASE_BIAS
                | SUBTYPE_URA
                | SUBTYPE_COMBINED
        ) {
            return Err(DecodingError::UnknownSubtype {
                message: COMPACT_SSR_MESSAGE,
                subtype,
            });
        }

        let mask = mask.ok_or(DecodingError::MissingMask)?;
        let header = CompactHeader::decode(reader, 12)?;

        if header.iod_ssr != mask.header.iod_ssr {
            return Err(DecodingError::IodMismatch {
                expected: mask.header.iod_ssr,
                found: header.iod_ssr,
            });
        }

        let satellites = mask.satellites();
        let nsat = satellites.len();
        let mut svs = satellites.iter();

        match subtype {
            SUBTYPE_ORBIT => {
                let corrections = read_satellites(nsat, || match svs.next() {
                    Some(sv) => read_orbit(reader, *sv),
                    None => Err(DecodingError::Truncated),
                })?;
                Ok(Self::Orbit {
                    header,
                    corrections,
                })
            },
            SUBTYPE_CLOCK => {
                let corrections = read_satellites(nsat, || match svs.next() {
                    Some(sv) => read_clock(reader, *sv),
                    None => Err(DecodingError::Truncated),
                })?;
                Ok(Self::Clock {
                    header,
                    corrections,
                })
            },
            SUBTYPE_CODE_BIAS => {
                let cells = mask.cells()?;
                let mut cells = cells.into_iter();
                let corrections = read_satellites(nsat, || {
                    let (sv, signals) = cells.next().ok_or(DecodingError::Truncated)?;
                    let mut biases = Vec::with_capacity(signals.len());
                    for signal in signals {
                        biases.push(CodeBias {
                            signal,
                            bias_m: reader.read_field(&CODE_BIAS)?,
                        });
                    }
                    Ok(SatelliteCodeBias { sv, biases })
                })?;
                Ok(Self::CodeBias {
                    header,
                    corrections,
                })
            },
            SUBTYPE_PHASE_BIAS => {
                let cells = mask.cells()?;
                let mut cells = cells.into_iter();
                let corrections = read_satellites(nsat, || {
                    let (sv, signals) = cells.next().ok_or(DecodingError::Truncated)?;
                    let mut biases = Vec::with_capacity(signals.len());
                    for signal in signals {
                        let bias_m = reader.read_field(&PHASE_BIAS)?;
                        let discontinuity = reader.read_as::<u8>(2)?;
                        biases.push(PhaseBias {
                            signal,
                            integer: true,
                            wide_lane: 0,
                            discontinuity,
                            bias_m,
                        });
                    }
                    Ok(SatellitePhaseBias {
                        sv,
                        yaw_semicircles: None,
                        yaw_rate_semicircles_s: None,
                        biases,
                    })
                })?;
                Ok(Self::PhaseBias {
                    header,
                    corrections,
                })
            },
            SUBTYPE_URA => {
                let corrections = read_satellites(nsat, || match svs.next() {
                    Some(sv) => Ok(UraCorrection {
                        sv: *sv,
                        ura: UraIndex(reader.read_as::<u8>(6)?),
                    }),
                    None => Err(DecodingError::Truncated),
                })?;
                Ok(Self::Ura {
                    header,
                    corrections,
                })
            },
            _ => {
                let has_orbit = reader.read_bool()?;
                let has_clock = reader.read_bool()?;

                let network = if reader.read_bool()? {
                    let network_id = reader.read_as::<u8>(5)?;
                    let mut flags = Vec::with_capacity(nsat);
                    for _ in 0..nsat {
                        flags.push(reader.read_bool()?);
                    }
                    Some(NetworkMask {
                        network_id,
                        satellites: flags,
                    })
                } else {
                    None
                };

                let selected = satellites
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| match &network {
                        Some(network) => network.satellites[*i],
                        None => true,
                    })
                    .map(|(_, sv)| *sv)
                    .collect::<Vec<_>>();

                let mut orbits = Vec::new();
                let mut clocks = Vec::new();
                let mut svs = selected.iter();

                read_satellites(selected.len(), || {
                    let sv = *svs.next().ok_or(DecodingError::Truncated)?;
                    if has_orbit {
                        orbits.push(read_orbit(reader, sv)?);
                    }
                    if has_clock {
                        clocks.push(read_clock(reader, sv)?);
                    }
                    Ok(())
                })?;

                Ok(Self::Combined {
                    header,
                    network,
                    orbits: if has_orbit { Some(orbits) } else { None },
                    clocks: if has_clock { Some(clocks) } else { None },
                })
            },
        }
    }

    /// Encodes this [CompactMessage] as a 4073 payload. Corrections must
    /// follow the order of the active [CompactMask].
    pub fn encode(&self, mask: Option<&CompactMask>) -> Result<Vec<u8>, DecodingError> {
        let mut writer = BitWriter::new();
        writer.write_u64(COMPACT_SSR_MESSAGE as u64, 12)?;
        writer.write_u64(self.subtype() as u64, 4)?;

        if let Self::Mask(mask) = self {
            mask.header.encode(&mut writer, 20)?;
            if mask.gnss.len() > 15 {
                return Err(DecodingError::TooManyEntries(mask.gnss.len()));
            }
            writer.write_u64(mask.gnss.len() as u64, 4)?;
            for gnss in mask.gnss.iter() {
                gnss.encode(&mut writer)?;
            }
            return Ok(writer.into_bytes());
        }

        let mask = mask.ok_or(DecodingError::MissingMask)?;
        let satellites = mask.satellites();

        self.header().encode(&mut writer, 12)?;

        match self {
            Self::Orbit { corrections, .. } => {
                let svs = corrections.iter().map(|c| c.sv).collect::<Vec<_>>();
                check_order(&satellites, &svs)?;
                for orbit in corrections.iter() {
                    write_orbit(&mut writer, orbit)?;
                }
            },
            Self::Clock { corrections, .. } => {
                let svs = corrections.iter().map(|c| c.sv).collect::<Vec<_>>();
                check_order(&satellites, &svs)?;
                for clock in corrections.iter() {
                    writer.write_field(&CLOCK_C0, clock.c0_m)?;
                }
            },
            Self::CodeBias { corrections, .. } => {
                let cells = mask.cells()?;
                let svs = corrections.iter().map(|c| c.sv).collect::<Vec<_>>();
                check_order(&satellites, &svs)?;
                for ((_, signals), sat) in cells.iter().zip(corrections.iter()) {
                    for signal in signals.iter() {
                        let bias = sat.biases.iter().find(|b| b.signal == *signal);
                        writer.write_field(&CODE_BIAS, bias.and_then(|b| b.bias_m))?;
                    }
                }
            },
            Self::PhaseBias { corrections, .. } => {
                let cells = mask.cells()?;
                let svs = corrections.iter().map(|c| c.sv).collect::<Vec<_>>();
                check_order(&satellites, &svs)?;
                for ((_, signals), sat) in cells.iter().zip(corrections.iter()) {
                    for signal in signals.iter() {
                        let bias = sat.biases.iter().find(|b| b.signal == *signal);
                        writer.write_field(&PHASE_BIAS, bias.and_then(|b| b.bias_m))?;
                        writer.write_u64(
                            bias.map(|b| b.discontinuity & 0x03).unwrap_or(0) as u64,
                            2,
                        )?;
                    }
                }
            },
            Self::Ura { corrections, .. } => {
                let svs = corrections.iter().map(|c| c.sv).collect::<Vec<_>>();
                check_order(&satellites, &svs)?;
                for ura in corrections.iter() {
                    writer.write_u64((ura.ura.0 & 0x3f) as u64, 6)?;
                }
            },
            Self::Combined {
                network,
                orbits,
                clocks,
                ..
            } => {
                writer.write_bool(orbits.is_some())?;
                writer.write_bool(clocks.is_some())?;

                let selected = match network {
                    Some(network) => {
                        if network.satellites.len() != satellites.len() {
                            return Err(DecodingError::LengthMismatch {
                                expected: satellites.len(),
                                found: network.satellites.len(),
                            });
                        }
                        writer.write_bool(true)?;
                        writer.write_u64(network.network_id as u64, 5)?;
                        for flag in network.satellites.iter() {
                            writer.write_bool(*flag)?;
                        }
                        satellites
                            .iter()
                            .zip(network.satellites.iter())
                            .filter(|(_, flag)| **flag)
                            .map(|(sv, _)| *sv)
                            .collect::<Vec<_>>()
                    },
                    None => {
                        writer.write_bool(false)?;
                        satellites.clone()
                    },
                };

                if let Some(orbits) = orbits {
                    let svs = orbits.iter().map(|c| c.sv).collect::<Vec<_>>();
                    check_order(&selected, &svs)?;
                }
                if let Some(clocks) = clocks {
                    let svs = clocks.iter().map(|c| c.sv).collect::<Vec<_>>();
                    check_order(&selected, &svs)?;
                }

                for i in 0..selected.len() {
                    if let Some(orbits) = orbits {
                        write_orbit(&mut writer, &orbits[i])?;
                    }
                    if let Some(clocks) = clocks {
                        writer.write_field(&CLOCK_C0, clocks[i].c0_m)?;
                    }
                }
            },
            Self::Mask(_) => {},
        }

        Ok(writer.into_bytes())
    }
}
