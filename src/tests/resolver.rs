use std::{sync::Arc, thread};

use crate::{
    cfg::CorrectionOpts,
    prelude::{
        BufferedAdapter, Config, Constellation, CorrectionStore, Decoder, Epoch, Method,
        PositionResolver, SolutionQuality,
    },
    ssr::{
        encode_frame, ClockCorrection, CodeBias, OrbitCorrection, PhaseBias, SatelliteCodeBias,
        SatellitePhaseBias, SsrBody, SsrFamily, SsrHeader, SsrMessage, UpdateInterval,
    },
    tests::{init_logger, Scenario},
};

fn header(t: Epoch) -> SsrHeader {
    let (_, nanos) = t.to_time_of_week();
    SsrHeader {
        epoch_s: (nanos / 1_000_000_000) as u32,
        // 10'
        update_interval: UpdateInterval(10),
        multiple_message: false,
        reference_datum: false,
        iod_ssr: 1,
        provider_id: 256,
        solution_id: 0,
    }
}

fn message(t: Epoch, body: SsrBody) -> SsrMessage {
    SsrMessage {
        family: SsrFamily::Rtcm,
        constellation: Constellation::GPS,
        header: header(t),
        body,
    }
}

/// RTCM-SSR stream describing the scenario corrections
fn stream(scenario: &Scenario) -> Vec<u8> {
    let t = scenario.t0;

    let combined = SsrBody::Combined(
        scenario
            .satellites
            .iter()
            .map(|sat| {
                (
                    OrbitCorrection {
                        sv: sat.sv,
                        iode: sat.iode,
                        radial_m: Some(sat.rac_m[0]),
                        along_m: Some(sat.rac_m[1]),
                        cross_m: Some(sat.rac_m[2]),
                        radial_rate_m_s: Some(0.0),
                        along_rate_m_s: Some(0.0),
                        cross_rate_m_s: Some(0.0),
                    },
                    ClockCorrection {
                        sv: sat.sv,
                        c0_m: Some(sat.clock_error_m),
                        c1_m_s: Some(0.0),
                        c2_m_s2: Some(0.0),
                    },
                )
            })
            .collect(),
    );

    let code_biases = SsrBody::CodeBias(
        scenario
            .satellites
            .iter()
            .map(|sat| SatelliteCodeBias {
                sv: sat.sv,
                biases: scenario
                    .signals
                    .iter()
                    .zip(sat.code_biases_m.iter())
                    .map(|(signal, bias)| CodeBias {
                        signal: *signal,
                        bias_m: Some(*bias),
                    })
                    .collect(),
            })
            .collect(),
    );

    let phase_biases = SsrBody::PhaseBias {
        dispersive: true,
        mw_consistency: true,
        satellites: scenario
            .satellites
            .iter()
            .map(|sat| SatellitePhaseBias {
                sv: sat.sv,
                yaw_semicircles: Some(0.0),
                yaw_rate_semicircles_s: Some(0.0),
                biases: scenario
                    .signals
                    .iter()
                    .zip(sat.phase_biases_m.iter())
                    .map(|(signal, bias)| PhaseBias {
                        signal: *signal,
                        integer: true,
                        wide_lane: 2,
                        discontinuity: 0,
                        bias_m: Some(*bias),
                    })
                    .collect(),
            })
            .collect(),
    };

    let mut bytes = Vec::new();

    for body in [combined, code_biases, phase_biases] {
        let payload = message(t, body).encode().unwrap();
        bytes.extend_from_slice(&encode_frame(&payload).unwrap());
    }

    bytes
}

#[test]
fn corrections_stream_to_position() {
    init_logger();

    let scenario = Scenario::new(8);
    let store = Arc::new(CorrectionStore::new());

    let bytes = stream(&scenario);

    // decoding side
    let feeder = {
        let store = Arc::clone(&store);
        let t0 = scenario.t0;
        thread::spawn(move || {
            let mut decoder = Decoder::new(t0, &CorrectionOpts::default());
            // split in odd chunks, like a network stream
            bytes
                .chunks(37)
                .map(|chunk| decoder.feed(chunk, &store))
                .sum::<usize>()
        })
    };

    let updated = feeder.join().unwrap();

    // orbit, clock, two code biases and two phase biases per satellite
    assert_eq!(updated, 6 * 8);
    assert_eq!(store.len(), 6 * 8);

    let adapter = (0..20)
        .map(|k| scenario.observe(k))
        .collect::<BufferedAdapter>();

    let cfg = Config::static_preset(Method::PPP);
    let resolver = PositionResolver::new(cfg, adapter, Arc::clone(&store));

    let results = resolver.collect::<Vec<_>>();
    assert_eq!(results.len(), 20);

    for (k, result) in results.iter().enumerate() {
        assert_eq!(result.epoch, scenario.epoch(k));
        assert_eq!(result.satellites, 8);
        assert_eq!(result.quality, SolutionQuality::Float);
        assert!(scenario.error_m(result) < 1.0E-2, "epoch #{}", k);
    }
}

#[test]
fn failed_epochs_are_skipped() {
    init_logger();

    let scenario = Scenario::new(8);
    let store = Arc::new(CorrectionStore::new());

    for k in 0..6 {
        store.upsert_batch(scenario.corrections(k));
    }

    let mut adapter = BufferedAdapter::new();
    for k in 0..6 {
        let mut observations = scenario.observe(k);
        if k == 4 {
            observations.satellites.truncate(2);
        }
        adapter.push(observations);
    }

    let mut resolver = PositionResolver::new(
        Config::static_preset(Method::PPP),
        adapter,
        Arc::clone(&store),
    );

    let mut resolved = Vec::new();

    while let Some(result) = resolver.resolve_epoch() {
        resolved.push(result.is_ok());
    }

    // latest corrections (epoch #5) are valid one minute either side
    assert_eq!(resolved, vec![false, false, false, true, false, true]);
    assert_eq!(resolver.estimator().epoch(), Some(scenario.epoch(5)));
}
