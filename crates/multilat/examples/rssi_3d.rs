//! 3D positioning from noiseless RSSI readings.
//!
//! Six sources sit around a true receiver position; their RSSI at the true
//! distances is computed from a fixed transmit power with path-loss exponent
//! 2.0, then the estimator recovers the position and its covariance.

use anyhow::Result;
use multilat::core::synthetic::{exact_rssi_fingerprint, octahedron_positions, rssi_sources};
use multilat::prelude::*;

fn main() -> Result<()> {
    let truth = Pt3::new(2.5, -1.0, 3.0);

    let sources = rssi_sources(
        &octahedron_positions(Pt3::origin(), 30.0),
        2.4e9, // 2.4 GHz carrier
        -30.0, // dBm equivalent transmitted power
        2.0,   // free-space path-loss exponent
    )?;
    let fingerprint = exact_rssi_fingerprint(&sources, &truth)?;

    let estimator = PositionEstimator3d::with_config(sources, fingerprint)?;
    let result = estimator.estimate()?;

    println!("true position:      {truth}");
    println!("estimated position: {}", result.position);
    println!(
        "error:              {:.3e}",
        (result.position - truth).norm()
    );
    println!(
        "solver:             {} iterations, final cost {:.3e}",
        result.report.iterations, result.report.final_cost
    );
    match result.covariance {
        Some(cov) => println!("covariance:\n{cov:.3e}"),
        None => println!("covariance: unavailable (degenerate geometry)"),
    }

    for row in estimator.last_rows() {
        println!(
            "  {}: d = {:.3} m (sigma = {:.3})",
            row.source_id, row.distance, row.distance_std_dev
        );
    }

    Ok(())
}
