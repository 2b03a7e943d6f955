pub mod brute_force;
pub mod features;
pub mod isolation_forest;
pub mod outlier;

pub use brute_force::{BruteForceDetector, BRUTE_FORCE};
pub use isolation_forest::{IsolationForest, OutlierModel, OutlierScore};
pub use outlier::{OutlierDetector, UNUSUAL_TIMING};
