//! Concrete NLLS problems.

pub mod range;
