// Principal component analysis (PCA)

#![doc = include_str!("../README.md")]

use ndarray::ArrayView2;
use rayon::prelude::*;

pub mod config;
pub mod diagnostics;
pub mod eigen;
pub mod error;
pub mod insights;
pub mod pca;
pub mod report;
pub mod standardize;
pub mod statistics;


pub use config::{
    ComponentPolicy, Initialization, PcaConfig, ZeroVariancePolicy, DEFAULT_VARIANCE_THRESHOLD,
};
pub use diagnostics::EigenDiagnostics;
pub use error::{PcaError, Result};
pub use insights::{CorrelationExtremes, CorrelationPair, FeatureImportance};
pub use pca::{max_components, PcaEngine, PcaResult};
pub use report::optimal_components;
pub use statistics::{ClassCount, FeatureSummary};

/// Runs PCA on sample-major rows with the default configuration.
///
/// * `data` - Rows of equal length; at least 2 rows and 1 column.
/// * `n_components` - Number of components to extract. Values above the
///   feature count are clamped with a warning.
/// * `normalize` - Scale every feature to unit variance after centering.
///
/// The solver starts from a random vector, so component signs may differ
/// between calls. Use [`PcaEngine`] with [`PcaConfig::with_seed`] or
/// [`Initialization::OrthogonalizedOnes`] for reproducible output.
///
/// # Examples
///
/// ```
/// use pca_lens::perform_pca;
///
/// let data = vec![
///     vec![2.0, 0.0],
///     vec![0.0, 2.0],
///     vec![2.0, 2.0],
///     vec![0.0, 0.0],
/// ];
/// let result = perform_pca(&data, 2, false).unwrap();
/// assert_eq!(result.transformed_data.dim(), (4, 2));
/// assert!((result.cumulative_variance[1] - 1.0).abs() < 1e-9);
/// ```
pub fn perform_pca<R: AsRef<[f64]>>(
    data: &[R],
    n_components: usize,
    normalize: bool,
) -> Result<PcaResult> {
    PcaEngine::new(PcaConfig::new(n_components, normalize)).fit_rows(data)
}

/// Runs one independent PCA per configuration, in parallel.
///
/// Results come back in the order of `configs`; a failing configuration does
/// not affect the others.
pub fn perform_pca_sweep(data: &ArrayView2<f64>, configs: &[PcaConfig]) -> Vec<Result<PcaResult>> {
    configs
        .par_iter()
        .map(|config| PcaEngine::new(config.clone()).fit(data))
        .collect()
}
