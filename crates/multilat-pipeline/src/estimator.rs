//! Position estimator façade.
//!
//! [`PositionEstimator`] owns the configuration (sources, fingerprint,
//! initial position, options, listener), derives solver rows, seeds and runs
//! the nonlinear solve, and exposes the result. A single lock flag guards
//! against reentrant mutation from listener callbacks invoked synchronously
//! inside [`PositionEstimator::estimate`]; it is a reentrancy guard for a
//! single logical owner, not a thread-safety mechanism.

use crate::deriver::{derive_rows, DerivedRow};
use crate::error::EstimatorError;
use multilat_core::{Fingerprint, LocatedRadioSource, Real};
use multilat_linear::{centroid, linear_multilateration};
use multilat_optim::{RangeObservation, RangeProblem, SolveOptions, SolveReport};
use nalgebra::{Point, SMatrix};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default fallback distance standard deviation: 1.0 in the caller's linear
/// unit. A unit of last resort — tune it to the ranging hardware; it only
/// applies to readings that carry no quality metric of their own.
pub const DEFAULT_FALLBACK_DISTANCE_STD_DEV: Real = 1.0;

/// Estimator configuration knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorOptions {
    /// Distance standard deviation assumed for readings without one
    /// ([`DEFAULT_FALLBACK_DISTANCE_STD_DEV`] by default).
    pub fallback_distance_std_dev: Real,
    /// Fold source position covariance into row weights (off by default).
    pub use_source_position_covariance: bool,
    /// Nonlinear solver settings.
    pub solve: SolveOptions,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            fallback_distance_std_dev: DEFAULT_FALLBACK_DISTANCE_STD_DEV,
            use_source_position_covariance: false,
            solve: SolveOptions::default(),
        }
    }
}

/// Lifecycle notifications, invoked synchronously inside
/// [`PositionEstimator::estimate`].
///
/// The estimator is locked while `on_estimate_start` runs: mutating calls
/// made from the callback fail with [`EstimatorError::Locked`]. Keep
/// callbacks side-effect-free with respect to the estimator itself.
pub trait EstimationListener<const D: usize> {
    /// Fired after the readiness check passes, before any solver work.
    fn on_estimate_start(&self, _estimator: &PositionEstimator<D>) {}
    /// Fired after a successful estimate, once the estimator is unlocked.
    fn on_estimate_end(&self, _estimator: &PositionEstimator<D>) {}
}

/// Outcome of one successful `estimate()` call.
#[derive(Debug, Clone)]
pub struct EstimationResult<const D: usize> {
    /// Estimated position.
    pub position: Point<Real, D>,
    /// Estimated position covariance; absent when the normal equations are
    /// singular at the solution (degenerate source geometry).
    pub covariance: Option<SMatrix<Real, D, D>>,
    /// Solver report for diagnostics.
    pub report: SolveReport,
}

/// Coarse estimator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorState {
    /// Not enough usable configuration to estimate.
    Unconfigured,
    /// `estimate()` may be called.
    Ready,
    /// An `estimate()` call is in progress.
    Estimating,
}

/// Nonlinear position estimator over `D` spatial dimensions.
///
/// Single logical owner per instance: `estimate()` runs to completion
/// synchronously and the lock flag only rejects the overlapping calls it
/// observes (reentrancy from listener callbacks). The type is deliberately
/// `!Sync`; it performs no I/O and holds no threads.
pub struct PositionEstimator<const D: usize> {
    sources: RefCell<Vec<LocatedRadioSource<D>>>,
    fingerprint: RefCell<Fingerprint>,
    initial_position: Cell<Option<Point<Real, D>>>,
    options: RefCell<EstimatorOptions>,
    listener: RefCell<Option<Rc<dyn EstimationListener<D>>>>,
    locked: AtomicBool,
    last_rows: RefCell<Vec<DerivedRow<D>>>,
    result: RefCell<Option<EstimationResult<D>>>,
}

/// 2D estimator.
pub type PositionEstimator2d = PositionEstimator<2>;
/// 3D estimator.
pub type PositionEstimator3d = PositionEstimator<3>;

struct LockGuard<'a>(&'a AtomicBool);

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<const D: usize> Default for PositionEstimator<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> PositionEstimator<D> {
    /// Minimum number of matched rows for a solvable configuration.
    pub const fn min_required_sources() -> usize {
        D + 1
    }

    /// Empty (unconfigured) estimator with default options.
    pub fn new() -> Self {
        Self {
            sources: RefCell::new(Vec::new()),
            fingerprint: RefCell::new(Fingerprint::new()),
            initial_position: Cell::new(None),
            options: RefCell::new(EstimatorOptions::default()),
            listener: RefCell::new(None),
            locked: AtomicBool::new(false),
            last_rows: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    /// Estimator configured with sources and a fingerprint in one call.
    ///
    /// # Errors
    ///
    /// [`EstimatorError::Configuration`] under the same eager shape checks as
    /// the individual setters.
    pub fn with_config(
        sources: Vec<LocatedRadioSource<D>>,
        fingerprint: Fingerprint,
    ) -> Result<Self, EstimatorError> {
        let estimator = Self::new();
        estimator.set_sources(sources)?;
        estimator.set_fingerprint(fingerprint)?;
        Ok(estimator)
    }

    fn ensure_unlocked(&self) -> Result<(), EstimatorError> {
        if self.locked.load(Ordering::SeqCst) {
            Err(EstimatorError::Locked)
        } else {
            Ok(())
        }
    }

    /// Replace the source catalog.
    ///
    /// # Errors
    ///
    /// [`EstimatorError::Locked`] during an in-progress estimate;
    /// [`EstimatorError::Configuration`] when fewer than
    /// [`Self::min_required_sources`] sources are supplied.
    pub fn set_sources(&self, sources: Vec<LocatedRadioSource<D>>) -> Result<(), EstimatorError> {
        self.ensure_unlocked()?;
        if sources.len() < Self::min_required_sources() {
            return Err(EstimatorError::Configuration(format!(
                "need at least {} sources, got {}",
                Self::min_required_sources(),
                sources.len()
            )));
        }
        *self.sources.borrow_mut() = sources;
        Ok(())
    }

    /// Replace the fingerprint.
    pub fn set_fingerprint(&self, fingerprint: Fingerprint) -> Result<(), EstimatorError> {
        self.ensure_unlocked()?;
        if fingerprint.is_empty() {
            return Err(EstimatorError::Configuration(
                "fingerprint must contain at least one reading".into(),
            ));
        }
        *self.fingerprint.borrow_mut() = fingerprint;
        Ok(())
    }

    /// Set or clear the initial position seed.
    pub fn set_initial_position(
        &self,
        position: Option<Point<Real, D>>,
    ) -> Result<(), EstimatorError> {
        self.ensure_unlocked()?;
        self.initial_position.set(position);
        Ok(())
    }

    /// Replace the estimator options.
    ///
    /// # Errors
    ///
    /// [`EstimatorError::Configuration`] for a non-positive fallback standard
    /// deviation.
    pub fn set_options(&self, options: EstimatorOptions) -> Result<(), EstimatorError> {
        self.ensure_unlocked()?;
        if !(options.fallback_distance_std_dev.is_finite()
            && options.fallback_distance_std_dev > 0.0)
        {
            return Err(EstimatorError::Configuration(format!(
                "fallback distance standard deviation must be finite and positive, got {}",
                options.fallback_distance_std_dev
            )));
        }
        *self.options.borrow_mut() = options;
        Ok(())
    }

    /// Set or clear the lifecycle listener.
    pub fn set_listener(
        &self,
        listener: Option<Rc<dyn EstimationListener<D>>>,
    ) -> Result<(), EstimatorError> {
        self.ensure_unlocked()?;
        *self.listener.borrow_mut() = listener;
        Ok(())
    }

    /// Current source catalog.
    pub fn sources(&self) -> Vec<LocatedRadioSource<D>> {
        self.sources.borrow().clone()
    }

    /// Current fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint.borrow().clone()
    }

    /// Current initial position seed, if any.
    pub fn initial_position(&self) -> Option<Point<Real, D>> {
        self.initial_position.get()
    }

    /// Current options.
    pub fn options(&self) -> EstimatorOptions {
        self.options.borrow().clone()
    }

    /// Rows derived by the most recent `estimate()` call, for diagnostics.
    pub fn last_rows(&self) -> Vec<DerivedRow<D>> {
        self.last_rows.borrow().clone()
    }

    /// Result of the most recent successful `estimate()` call.
    pub fn result(&self) -> Option<EstimationResult<D>> {
        self.result.borrow().clone()
    }

    /// Last estimated position.
    pub fn position(&self) -> Option<Point<Real, D>> {
        self.result.borrow().as_ref().map(|r| r.position)
    }

    /// Last estimated position as a flat coordinate array.
    pub fn position_coordinates(&self) -> Option<[Real; D]> {
        self.position().map(|p| p.coords.into())
    }

    /// Last estimated covariance, when one was produced.
    pub fn covariance(&self) -> Option<SMatrix<Real, D, D>> {
        self.result.borrow().as_ref().and_then(|r| r.covariance)
    }

    /// Whether an `estimate()` call is in progress.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Whether `estimate()` would pass its readiness checks right now.
    ///
    /// Runs the distance deriver to count usable rows, so the answer reflects
    /// infeasible readings being dropped.
    pub fn is_ready(&self) -> bool {
        self.usable_rows().len() >= Self::min_required_sources()
    }

    /// Coarse state, mirroring the estimate lifecycle.
    pub fn state(&self) -> EstimatorState {
        if self.is_locked() {
            EstimatorState::Estimating
        } else if self.is_ready() {
            EstimatorState::Ready
        } else {
            EstimatorState::Unconfigured
        }
    }

    fn usable_rows(&self) -> Vec<DerivedRow<D>> {
        let options = self.options.borrow();
        derive_rows(
            &self.sources.borrow(),
            &self.fingerprint.borrow(),
            options.fallback_distance_std_dev,
            options.use_source_position_covariance,
        )
    }

    fn current_listener(&self) -> Option<Rc<dyn EstimationListener<D>>> {
        self.listener.borrow().clone()
    }

    /// Run one estimate.
    ///
    /// Locks the estimator, derives rows and checks readiness, fires
    /// `on_estimate_start`, seeds (caller-supplied position, else linear
    /// multilateration, else source centroid), solves, stores the result,
    /// unlocks, fires `on_estimate_end`, and returns the result.
    ///
    /// # Errors
    ///
    /// - [`EstimatorError::Locked`] on a reentrant call;
    /// - [`EstimatorError::NotReady`] when fewer than `D + 1` usable rows are
    ///   available (checked before any notification or solver work, so a
    ///   not-ready call emits no `on_estimate_start`);
    /// - [`EstimatorError::Estimation`] when the solver does not converge.
    ///   The estimator is unlocked and keeps its previous result; no end
    ///   notification fires.
    pub fn estimate(&self) -> Result<EstimationResult<D>, EstimatorError> {
        if self.locked.swap(true, Ordering::SeqCst) {
            return Err(EstimatorError::Locked);
        }

        let outcome = {
            let _guard = LockGuard(&self.locked);
            self.estimate_locked()
        };
        let result = outcome?;

        if let Some(listener) = self.current_listener() {
            listener.on_estimate_end(self);
        }
        Ok(result)
    }

    fn estimate_locked(&self) -> Result<EstimationResult<D>, EstimatorError> {
        if self.sources.borrow().len() < Self::min_required_sources() {
            return Err(EstimatorError::NotReady("not enough sources configured"));
        }
        if self.fingerprint.borrow().is_empty() {
            return Err(EstimatorError::NotReady("fingerprint is empty"));
        }

        let rows = self.usable_rows();
        *self.last_rows.borrow_mut() = rows.clone();
        if rows.len() < Self::min_required_sources() {
            return Err(EstimatorError::NotReady(
                "not enough usable rows after distance derivation",
            ));
        }

        if let Some(listener) = self.current_listener() {
            listener.on_estimate_start(self);
        }

        let positions: Vec<Point<Real, D>> = rows.iter().map(|r| r.source_position).collect();
        let distances: Vec<Real> = rows.iter().map(|r| r.distance).collect();

        let seed = match self.initial_position.get() {
            Some(p) => p,
            None => linear_multilateration(&positions, &distances)
                .or_else(|_| centroid(&positions))
                .map_err(|_| EstimatorError::NotReady("no rows available for seeding"))?,
        };

        let observations = rows
            .into_iter()
            .map(|r| RangeObservation {
                position: r.source_position,
                distance: r.distance,
                std_dev: r.distance_std_dev,
            })
            .collect();
        let problem = RangeProblem::new(observations)?;

        let solve_opts = self.options.borrow().solve;
        let estimate = problem.solve(&seed, &solve_opts)?;

        log::debug!(
            "estimate converged in {} iterations, final cost {:.3e}",
            estimate.report.iterations,
            estimate.report.final_cost
        );

        let result = EstimationResult {
            position: estimate.position,
            covariance: estimate.covariance,
            report: estimate.report,
        };
        *self.result.borrow_mut() = Some(result.clone());
        Ok(result)
    }
}
