use approx::assert_relative_eq;
use windrose::{
    compute_sectors, wrap360, DisplayConfig, HistoricWind, Point, RotationChannel,
    RotationController, TelemetryCommand, TelemetrySample, WindInstrument,
};

/// Concatenated `to` values of every emitted command, with seam jumps removed.
fn unwrapped_path(legs: &[(f64, f64)]) -> Vec<f64> {
    let mut path = Vec::new();
    let mut offset = 0.0;
    let mut last: Option<f64> = None;
    for &(from, to) in legs {
        if let Some(prev) = last {
            // a leg starting on the other side of the seam continues the turn
            let jump = from - prev;
            if jump > 180.0 {
                offset -= 360.0;
            } else if jump < -180.0 {
                offset += 360.0;
            }
        }
        path.push(to + offset);
        last = Some(to);
    }
    path
}

#[test]
fn heading_sequence_never_takes_the_long_way() {
    let mut controller = RotationController::new(500);
    let mut legs = Vec::new();
    let mut emitted_per_sample = Vec::new();

    for heading in [0.0, 170.0, 190.0, 359.0, 1.0] {
        let steps = controller
            .request_transition(RotationChannel::Heading, heading)
            .unwrap();
        emitted_per_sample.push(steps.len());
        for step in steps {
            assert!(step.primary.sweep().abs() <= 180.0, "{:?}", step);
            legs.push((step.primary.from, step.primary.to));
        }
    }

    // 0 is the resting bearing, so the first sample emits nothing
    assert_eq!(emitted_per_sample, vec![0, 1, 1, 1, 1]);
    assert_eq!(
        legs,
        vec![(0.0, 170.0), (170.0, 190.0), (190.0, 359.0), (0.0, 1.0)]
    );

    let path = unwrapped_path(&legs);
    assert_eq!(path, vec![170.0, 190.0, 359.0, 361.0]);
    for pair in path.windows(2) {
        let delta = pair[1] - pair[0];
        let shortest = wrap360(pair[1] - pair[0] + 180.0) - 180.0;
        assert_relative_eq!(delta, shortest, epsilon = 1e-9);
    }
}

#[test]
fn ten_to_three_fifty_sweeps_counter_clockwise_through_north() {
    let mut controller = RotationController::new(500);
    controller
        .request_transition(RotationChannel::Heading, 10.0)
        .unwrap();
    let steps = controller
        .request_transition(RotationChannel::Heading, 350.0)
        .unwrap();

    assert_eq!(steps.len(), 2);
    let (first, second) = (steps[0].primary, steps[1].primary);
    assert_eq!((first.from, first.to), (10.0, 0.0));
    assert_eq!((second.from, second.to), (359.0, 350.0));
    assert!(first.sweep() < 0.0 && second.sweep() < 0.0);

    let legs: Vec<_> = steps.iter().map(|s| (s.primary.from, s.primary.to)).collect();
    let path = unwrapped_path(&legs);
    assert_eq!(path, vec![0.0, -10.0]);
}

#[test]
fn apparent_wind_label_stays_upright_through_the_seam() {
    let mut controller = RotationController::new(500);
    let mut steps = controller
        .request_transition(RotationChannel::AppWindAngle, 200.0)
        .unwrap();
    steps.extend(
        controller
            .request_transition(RotationChannel::AppWindAngle, 5.0)
            .unwrap(),
    );

    for step in &steps {
        let counter = step.counter.expect("paired channel");
        assert_eq!(counter.channel, RotationChannel::AppWindValue);
        for t in [0.0, 0.25, 0.5, 1.0] {
            assert_relative_eq!(
                step.primary.value_at(t) + counter.value_at(t),
                0.0,
                epsilon = 1e-9
            );
        }
    }
}

#[test]
fn sector_flags_are_reproducible() {
    let wind = HistoricWind::new(300.0, 340.0, 20.0);
    let center = Point::new(250.0, 250.0);
    let first = compute_sectors(wind, 0.0, 40.0, center, 200.0).unwrap();

    for _ in 0..100 {
        let again = compute_sectors(wind, 0.0, 40.0, center, 200.0).unwrap();
        assert_eq!(again, first);
    }
    assert_eq!(
        (first.port.large_arc, first.port.sweep),
        (false, true)
    );
    assert_eq!(
        (first.starboard.large_arc, first.starboard.sweep),
        (false, true)
    );
}

#[test]
fn missing_historic_min_keeps_previous_sector() {
    let mut instrument = WindInstrument::new(DisplayConfig::default()).unwrap();
    let sample = TelemetrySample {
        heading: Some(15.0),
        historic_wind_min: Some(300.0),
        historic_wind_mid: Some(340.0),
        historic_wind_max: Some(20.0),
        ..Default::default()
    };
    let before = instrument.update(sample.clone()).unwrap().sector.unwrap();

    let without_min = TelemetrySample {
        historic_wind_min: Some(f64::NAN),
        ..sample.clone()
    };
    let after = instrument.update(without_min).unwrap().sector.unwrap();
    assert_eq!(after, before);

    let absent_min = TelemetrySample {
        historic_wind_min: None,
        heading: Some(90.0),
        ..sample
    };
    let after = instrument.update(absent_min).unwrap().sector.unwrap();
    assert_eq!(after, before);
}

#[test]
fn invalid_heading_surfaces_as_typed_error() {
    let mut instrument = WindInstrument::new(DisplayConfig::default()).unwrap();
    instrument.apply(TelemetryCommand::SetHeading(45.0)).unwrap();

    let err = instrument
        .apply(TelemetryCommand::SetHeading(f64::INFINITY))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid bearing for heading: inf"
    );
    let state = instrument
        .controller()
        .state(RotationChannel::Heading)
        .unwrap();
    assert_eq!(state.target, 315.0);
}
