//! Estimator lifecycle tests: readiness, locking discipline, listener
//! notifications, and cross-validation of RSSI-derived against direct
//! ranging.

use multilat_core::synthetic::{
    exact_ranging_fingerprint, exact_rssi_fingerprint, located_sources,
    noisy_ranging_fingerprint, octahedron_positions, ring_positions, rssi_sources,
};
use multilat_core::{Fingerprint, Pt2, Pt3, Reading};
use multilat_pipeline::{
    EstimationListener, EstimatorError, EstimatorState, PositionEstimator, PositionEstimator2d,
    PositionEstimator3d,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const FREQ: f64 = 2.4e9;
const TX_POWER: f64 = -30.0;

fn ranging_estimator_2d(truth: Pt2, n: usize) -> PositionEstimator2d {
    let sources = located_sources(&ring_positions(n, Pt2::origin(), 25.0), FREQ).unwrap();
    let fingerprint = exact_ranging_fingerprint(&sources, &truth).unwrap();
    PositionEstimator::with_config(sources, fingerprint).unwrap()
}

#[test]
fn noiseless_rows_converge_to_truth_with_covariance() {
    let truth = Pt2::new(4.0, -7.5);
    let estimator = ranging_estimator_2d(truth, 5);

    let result = estimator.estimate().unwrap();
    assert!((result.position - truth).norm() < 1e-6);
    assert!(result.covariance.is_some());
    assert!(result.report.converged);
}

#[test]
fn too_few_usable_rows_is_not_ready_before_any_solve() {
    // Three sources pass the eager shape check, but only two readings match,
    // so the deriver leaves fewer than D + 1 usable rows.
    let sources = located_sources(&ring_positions(3, Pt2::origin(), 10.0), FREQ).unwrap();
    let fingerprint = Fingerprint::from_readings(vec![
        Reading::ranging("src-0", 5.0, None).unwrap(),
        Reading::ranging("src-1", 5.0, None).unwrap(),
    ]);
    let estimator = PositionEstimator::with_config(sources, fingerprint).unwrap();

    assert_eq!(estimator.state(), EstimatorState::Unconfigured);
    assert!(matches!(
        estimator.estimate(),
        Err(EstimatorError::NotReady(_))
    ));
    assert!(estimator.result().is_none());
}

#[test]
fn noisy_readings_land_within_a_few_sigma_of_truth() {
    // Eight sources on a ring, ranging noise sigma = 0.05 tagged on every
    // reading. With N rows the position error scales like sigma / sqrt(N),
    // so a few-sigma bound leaves ample margin for any seed.
    let truth = Pt2::new(3.0, -2.0);
    let sigma = 0.05;
    let sources = located_sources(&ring_positions(8, Pt2::origin(), 25.0), FREQ).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let fingerprint = noisy_ranging_fingerprint(&sources, &truth, sigma, &mut rng).unwrap();
    let estimator = PositionEstimator::with_config(sources, fingerprint).unwrap();

    let result = estimator.estimate().unwrap();
    assert!(
        (result.position - truth).norm() < 4.0 * sigma,
        "estimate {:?} too far from {truth:?}",
        result.position
    );

    let cov = result.covariance.expect("well-conditioned ring geometry");
    assert!(cov[(0, 0)] > 0.0 && cov[(1, 1)] > 0.0);

    // The tagged sigma flows through derivation into the row weights.
    let rows = estimator.last_rows();
    assert_eq!(rows.len(), 8);
    for row in &rows {
        assert!((row.distance_std_dev - sigma).abs() < 1e-12);
    }
}

#[test]
fn rssi_only_and_ranging_only_agree() {
    let truth = Pt3::new(1.0, -2.0, 0.5);
    let positions = octahedron_positions(Pt3::origin(), 20.0);

    let rssi_srcs = rssi_sources(&positions, FREQ, TX_POWER, 2.0).unwrap();
    let rssi_fp = exact_rssi_fingerprint(&rssi_srcs, &truth).unwrap();
    let rssi_est: PositionEstimator3d =
        PositionEstimator::with_config(rssi_srcs.clone(), rssi_fp).unwrap();

    let ranging_fp = exact_ranging_fingerprint(&rssi_srcs, &truth).unwrap();
    let ranging_est: PositionEstimator3d =
        PositionEstimator::with_config(rssi_srcs, ranging_fp).unwrap();

    let from_rssi = rssi_est.estimate().unwrap();
    let from_ranging = ranging_est.estimate().unwrap();

    assert!((from_rssi.position - truth).norm() < 1e-6);
    assert!((from_ranging.position - truth).norm() < 1e-6);
    assert!((from_rssi.position - from_ranging.position).norm() < 1e-6);
}

#[test]
fn six_source_3d_rssi_scenario() {
    // 3D, six sources around the true point, exponent 2.0, noiseless RSSI
    // from a fixed transmit power.
    let truth = Pt3::new(2.5, -1.0, 3.0);
    let sources = rssi_sources(&octahedron_positions(Pt3::origin(), 30.0), FREQ, TX_POWER, 2.0)
        .unwrap();
    let fingerprint = exact_rssi_fingerprint(&sources, &truth).unwrap();
    let estimator = PositionEstimator::with_config(sources, fingerprint).unwrap();

    let result = estimator.estimate().unwrap();
    assert!(
        (result.position - truth).norm() < 1e-6,
        "got {:?}",
        result.position
    );
    let cov = result.covariance.expect("3x3 covariance expected");
    assert_eq!(cov.nrows(), 3);
    assert_eq!(cov.ncols(), 3);
}

#[test]
fn collinear_sources_never_produce_finite_garbage_covariance() {
    let truth = Pt2::new(1.5, 0.0);
    let positions: Vec<Pt2> = (0..4).map(|i| Pt2::new(3.0 * i as f64, 0.0)).collect();
    let sources = located_sources(&positions, FREQ).unwrap();
    let fingerprint = exact_ranging_fingerprint(&sources, &truth).unwrap();
    let estimator = PositionEstimator::with_config(sources, fingerprint).unwrap();
    // No explicit seed: the linear solve is rank-deficient, so seeding falls
    // back to the centroid, which lies on the source line. The iteration then
    // stays on the line and the normal equations are exactly singular.

    match estimator.estimate() {
        Ok(result) => assert!(result.covariance.is_none()),
        Err(EstimatorError::Estimation(_)) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
}

/// Listener that only counts how often each notification fires.
#[derive(Default)]
struct CountingListener {
    starts: Cell<usize>,
    ends: Cell<usize>,
}

impl EstimationListener<2> for CountingListener {
    fn on_estimate_start(&self, _estimator: &PositionEstimator<2>) {
        self.starts.set(self.starts.get() + 1);
    }

    fn on_estimate_end(&self, _estimator: &PositionEstimator<2>) {
        self.ends.set(self.ends.get() + 1);
    }
}

#[test]
fn not_ready_estimate_emits_no_notifications() {
    // Three sources pass the eager shape check, but the readings reference
    // unknown ids, so zero usable rows survive derivation.
    let sources = located_sources(&ring_positions(3, Pt2::origin(), 10.0), FREQ).unwrap();
    let fingerprint = Fingerprint::from_readings(vec![
        Reading::ranging("ghost-0", 5.0, None).unwrap(),
        Reading::ranging("ghost-1", 5.0, None).unwrap(),
        Reading::ranging("ghost-2", 5.0, None).unwrap(),
    ]);
    let estimator = PositionEstimator::with_config(sources, fingerprint).unwrap();
    let listener = Rc::new(CountingListener::default());
    estimator.set_listener(Some(listener.clone())).unwrap();

    assert!(matches!(
        estimator.estimate(),
        Err(EstimatorError::NotReady(_))
    ));
    assert_eq!(listener.starts.get(), 0, "start fired on a not-ready call");
    assert_eq!(listener.ends.get(), 0);

    // Once the fingerprint matches, both notifications fire exactly once.
    let truth = Pt2::new(1.0, 2.0);
    let fingerprint = exact_ranging_fingerprint(&estimator.sources(), &truth).unwrap();
    estimator.set_fingerprint(fingerprint).unwrap();
    estimator.estimate().unwrap();
    assert_eq!(listener.starts.get(), 1);
    assert_eq!(listener.ends.get(), 1);
}

/// Listener that exercises every mutator from inside `on_estimate_start` and
/// records what happened.
struct MutatingListener {
    outcomes: RefCell<Vec<(&'static str, bool)>>,
    end_calls: RefCell<usize>,
}

impl MutatingListener {
    fn new() -> Self {
        Self {
            outcomes: RefCell::new(Vec::new()),
            end_calls: RefCell::new(0),
        }
    }
}

impl EstimationListener<2> for MutatingListener {
    fn on_estimate_start(&self, estimator: &PositionEstimator<2>) {
        assert_eq!(estimator.state(), EstimatorState::Estimating);

        let mut outcomes = self.outcomes.borrow_mut();
        outcomes.push((
            "set_sources",
            matches!(
                estimator.set_sources(estimator.sources()),
                Err(EstimatorError::Locked)
            ),
        ));
        outcomes.push((
            "set_fingerprint",
            matches!(
                estimator.set_fingerprint(estimator.fingerprint()),
                Err(EstimatorError::Locked)
            ),
        ));
        outcomes.push((
            "set_initial_position",
            matches!(
                estimator.set_initial_position(None),
                Err(EstimatorError::Locked)
            ),
        ));
        outcomes.push((
            "set_options",
            matches!(
                estimator.set_options(estimator.options()),
                Err(EstimatorError::Locked)
            ),
        ));
        outcomes.push((
            "set_listener",
            matches!(estimator.set_listener(None), Err(EstimatorError::Locked)),
        ));
        outcomes.push((
            "reentrant_estimate",
            matches!(estimator.estimate(), Err(EstimatorError::Locked)),
        ));

        // Getters stay readable while locked.
        assert_eq!(estimator.sources().len(), 4);
        assert!(!estimator.fingerprint().is_empty());
    }

    fn on_estimate_end(&self, estimator: &PositionEstimator<2>) {
        assert_eq!(estimator.state(), EstimatorState::Ready);
        *self.end_calls.borrow_mut() += 1;
    }
}

#[test]
fn every_mutator_is_locked_during_estimate() {
    let truth = Pt2::new(3.0, 2.0);
    let estimator = ranging_estimator_2d(truth, 4);
    let listener = Rc::new(MutatingListener::new());
    estimator.set_listener(Some(listener.clone())).unwrap();

    let result = estimator.estimate().unwrap();
    assert!((result.position - truth).norm() < 1e-6);

    let outcomes = listener.outcomes.borrow();
    assert_eq!(outcomes.len(), 6);
    for (name, rejected) in outcomes.iter() {
        assert!(rejected, "{name} was not rejected while locked");
    }
    assert_eq!(*listener.end_calls.borrow(), 1);

    // After estimate() returns, the same calls succeed.
    assert!(estimator.set_initial_position(Some(truth)).is_ok());
    assert!(estimator.set_fingerprint(estimator.fingerprint()).is_ok());
    assert!(estimator.set_sources(estimator.sources()).is_ok());
    assert!(estimator.set_listener(None).is_ok());
    assert!(estimator.estimate().is_ok());
}

#[test]
fn seeding_with_truth_never_takes_more_iterations() {
    let truth = Pt2::new(-6.0, 9.0);
    let estimator = ranging_estimator_2d(truth, 6);

    estimator
        .set_initial_position(Some(Pt2::new(40.0, -35.0)))
        .unwrap();
    let arbitrary = estimator.estimate().unwrap();

    estimator.set_initial_position(Some(truth)).unwrap();
    let seeded = estimator.estimate().unwrap();

    assert!(seeded.report.iterations <= arbitrary.report.iterations);
    assert!((seeded.position - arbitrary.position).norm() < 1e-6);
    assert!((seeded.position - truth).norm() < 1e-6);
}

#[test]
fn mixed_fingerprint_uses_all_usable_rows() {
    let truth = Pt2::new(0.5, 1.5);
    let positions = ring_positions(4, Pt2::origin(), 15.0);
    let sources = rssi_sources(&positions, FREQ, TX_POWER, 2.0).unwrap();

    // Two direct ranges, two RSSI readings, one ghost reading.
    let mut fingerprint = Fingerprint::new();
    for (i, s) in sources.iter().enumerate() {
        let d = (truth - s.position()).norm();
        let reading = if i % 2 == 0 {
            Reading::ranging(s.id(), d, Some(0.1)).unwrap()
        } else {
            let rssi =
                multilat_core::propagation::rssi_from_distance(d, TX_POWER, FREQ, 2.0);
            Reading::rssi(s.id(), rssi, Some(1.0)).unwrap()
        };
        fingerprint.push(reading);
    }
    fingerprint.push(Reading::ranging("nonexistent", 1.0, None).unwrap());

    let estimator = PositionEstimator::with_config(sources, fingerprint).unwrap();
    let result = estimator.estimate().unwrap();

    assert_eq!(estimator.last_rows().len(), 4);
    assert!((result.position - truth).norm() < 1e-6);
}
