// Principal component analysis (PCA)

use log::{debug, info, log_enabled, warn, Level};
use ndarray::{s, Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::config::{ComponentPolicy, PcaConfig, DEFAULT_VARIANCE_THRESHOLD};
use crate::diagnostics::{diagnose_eigenpairs, EigenDiagnostics};
use crate::eigen::{extract_top_eigenpairs, SolverSettings};
use crate::error::{PcaError, Result};
use crate::report;
use crate::standardize::{matrix_from_rows, standardize, validate_data};
use crate::statistics::{correlation_matrix, covariance_matrix};

/// Largest component count worth offering for a dataset: `min(n_samples, n_features)`.
pub fn max_components(n_samples: usize, n_features: usize) -> usize {
    n_samples.min(n_features)
}

/// Everything derived from one PCA run.
///
/// The result is an owned snapshot: it copies the input data and shares no
/// storage with the caller. Component `c` is column `c` of `components`,
/// `loadings` and `transformed_data`, and entry `c` of every per-component
/// vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaResult {
    /// Sample scores, shape (n_samples, k).
    pub transformed_data: Array2<f64>,
    /// Eigenvalues of the covariance matrix, non-increasing, shape (k).
    pub eigenvalues: Array1<f64>,
    /// Variance along each component; the same values as `eigenvalues`.
    pub explained_variance: Array1<f64>,
    /// `eigenvalues / sum(eigenvalues)`, sums to 1 over the k components.
    pub explained_variance_ratio: Array1<f64>,
    /// Running sum of `explained_variance_ratio`; the last entry is 1.
    pub cumulative_variance: Array1<f64>,
    /// Unit eigenvectors as columns, shape (n_features, k).
    pub components: Array2<f64>,
    /// Per-feature mean of the input, shape (n_features).
    pub mean: Array1<f64>,
    /// Per-feature scale applied during standardization, shape (n_features).
    /// All ones when the run did not normalize.
    pub std: Array1<f64>,
    /// Fraction of extracted variance lost when keeping the first `m`
    /// components, at index `m - 1`.
    pub reconstruction_error: Array1<f64>,
    /// `components[f][c] * sqrt(eigenvalues[c])`, shape (n_features, k).
    pub loadings: Array2<f64>,
    /// Pearson correlation of the raw features, shape (n_features, n_features).
    pub correlation_matrix: Array2<f64>,
    /// Covariance of the standardized data, shape (n_features, n_features).
    pub covariance_matrix: Array2<f64>,
    /// Copy of the input, shape (n_samples, n_features).
    pub original_data: Array2<f64>,
    /// Input after centering and scaling, shape (n_samples, n_features).
    pub standardized_data: Array2<f64>,
    /// Whether features were scaled to unit variance.
    pub normalized: bool,
    /// Component count the caller asked for, before any clamping.
    pub requested_components: usize,
    /// Power-iteration steps run for each component, shape (k).
    pub iterations: Vec<usize>,
}

impl PcaResult {
    pub fn n_samples(&self) -> usize {
        self.original_data.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.original_data.ncols()
    }

    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Smallest number of components whose cumulative variance reaches
    /// `threshold`, or 0 if it is never reached.
    pub fn optimal_components(&self, threshold: f64) -> usize {
        report::optimal_components(self.cumulative_variance.as_slice().unwrap_or(&[]), threshold)
    }

    /// [`Self::optimal_components`] at the 95% threshold.
    pub fn suggested_components(&self) -> usize {
        self.optimal_components(DEFAULT_VARIANCE_THRESHOLD)
    }

    /// Standardizes new samples with this run's mean and scale and projects
    /// them onto the components.
    ///
    /// # Errors
    /// Returns an error if `data` has a different number of features.
    pub fn project(&self, data: &ArrayView2<f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.n_features() {
            return Err(PcaError::DimensionMismatch {
                expected: self.n_features(),
                found: data.ncols(),
                context: "features of the data to project".to_string(),
            });
        }
        let mut standardized = data.to_owned();
        standardized -= &self.mean;
        standardized /= &self.std;
        report::project(&standardized.view(), &self.components.view())
    }

    /// Back-projects the scores of the first `m` components into the
    /// standardized feature space.
    ///
    /// # Errors
    /// Returns an error if `m` is 0 or exceeds the number of components.
    pub fn reconstruct_standardized(&self, m: usize) -> Result<Array2<f64>> {
        if m == 0 || m > self.n_components() {
            return Err(PcaError::InvalidComponents {
                requested: m,
                available: self.n_components(),
            });
        }
        let scores = self.transformed_data.slice(s![.., ..m]);
        let basis = self.components.slice(s![.., ..m]);
        Ok(scores.dot(&basis.t()))
    }

    /// Like [`Self::reconstruct_standardized`], in the original units.
    pub fn reconstruct(&self, m: usize) -> Result<Array2<f64>> {
        let mut reconstructed = self.reconstruct_standardized(m)?;
        reconstructed *= &self.std;
        reconstructed += &self.mean;
        Ok(reconstructed)
    }

    /// Checks the eigenpairs against the covariance matrix they came from.
    pub fn diagnostics(&self) -> EigenDiagnostics {
        diagnose_eigenpairs(
            &self.covariance_matrix.view(),
            &self.eigenvalues.view(),
            &self.components.view(),
        )
    }

    /// Writes the result to `path` in bincode format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(|e| PcaError::Persistence {
            message: format!("Failed to create file at {:?}: {}", path.as_ref(), e),
        })?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| PcaError::Persistence {
                message: format!("Failed to serialize PCA result: {}", e),
            })?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a result written by [`Self::save`] and checks that its arrays
    /// are mutually consistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| PcaError::Persistence {
            message: format!("Failed to open file at {:?}: {}", path.as_ref(), e),
        })?;
        let mut reader = BufReader::new(file);
        let result: PcaResult =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
                .map_err(|e| PcaError::Persistence {
                    message: format!("Failed to deserialize PCA result: {}", e),
                })?;
        result.check_consistency()?;
        Ok(result)
    }

    fn check_consistency(&self) -> Result<()> {
        let (n, p) = self.original_data.dim();
        let k = self.eigenvalues.len();
        let checks = [
            ("standardized_data rows", n, self.standardized_data.nrows()),
            ("standardized_data columns", p, self.standardized_data.ncols()),
            ("transformed_data rows", n, self.transformed_data.nrows()),
            ("transformed_data columns", k, self.transformed_data.ncols()),
            ("components rows", p, self.components.nrows()),
            ("components columns", k, self.components.ncols()),
            ("loadings rows", p, self.loadings.nrows()),
            ("loadings columns", k, self.loadings.ncols()),
            ("explained_variance length", k, self.explained_variance.len()),
            ("explained_variance_ratio length", k, self.explained_variance_ratio.len()),
            ("cumulative_variance length", k, self.cumulative_variance.len()),
            ("reconstruction_error length", k, self.reconstruction_error.len()),
            ("iterations length", k, self.iterations.len()),
            ("mean length", p, self.mean.len()),
            ("std length", p, self.std.len()),
            ("correlation_matrix rows", p, self.correlation_matrix.nrows()),
            ("correlation_matrix columns", p, self.correlation_matrix.ncols()),
            ("covariance_matrix rows", p, self.covariance_matrix.nrows()),
            ("covariance_matrix columns", p, self.covariance_matrix.ncols()),
        ];
        if let Some((context, expected, found)) = checks.iter().find(|(_, e, f)| e != f) {
            return Err(PcaError::Persistence {
                message: format!(
                    "Loaded PCA result has inconsistent dimensions: {} is {}, expected {}",
                    context, found, expected
                ),
            });
        }
        if self.std.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(PcaError::Persistence {
                message: "Loaded PCA result's std vector contains non-finite or non-positive values."
                    .to_string(),
            });
        }
        if self.eigenvalues.iter().any(|&v| !v.is_finite() || v < 0.0) {
            return Err(PcaError::Persistence {
                message: "Loaded PCA result's eigenvalues contain non-finite or negative values."
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Runs the PCA pipeline with a fixed configuration.
///
/// The engine holds no state besides its configuration; each call recomputes
/// everything from the data it is given, so one engine can be shared across
/// threads.
#[derive(Clone, Debug, Default)]
pub struct PcaEngine {
    config: PcaConfig,
}

impl PcaEngine {
    pub fn new(config: PcaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Number of components that will actually be extracted from data with
    /// `n_features` features.
    ///
    /// # Errors
    /// Returns [`PcaError::InvalidComponents`] for a zero request, or for an
    /// over-request under [`ComponentPolicy::Reject`].
    pub fn resolve_components(&self, n_features: usize) -> Result<usize> {
        let requested = self.config.n_components;
        if requested == 0 {
            return Err(PcaError::InvalidComponents {
                requested,
                available: n_features,
            });
        }
        if requested <= n_features {
            return Ok(requested);
        }
        match self.config.component_policy {
            ComponentPolicy::Clamp => {
                warn!(
                    "Requested {} components but the data has only {} features; extracting {}.",
                    requested, n_features, n_features
                );
                Ok(n_features)
            }
            ComponentPolicy::Reject => Err(PcaError::InvalidComponents {
                requested,
                available: n_features,
            }),
        }
    }

    /// Fits PCA to sample-major rows, rejecting ragged input.
    pub fn fit_rows<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<PcaResult> {
        let data = matrix_from_rows(rows)?;
        self.fit(&data.view())
    }

    /// Standardizes `data`, extracts the top components of its covariance
    /// matrix and derives every reported statistic.
    ///
    /// * `data` - Input data, shape (n_samples, n_features). Needs at least 2
    ///   samples, 1 feature and only finite values.
    ///
    /// # Errors
    /// Any validation failure or numerical degeneracy aborts the whole run;
    /// no partial result is returned.
    pub fn fit(&self, data: &ArrayView2<f64>) -> Result<PcaResult> {
        let start = Instant::now();
        self.config.validate()?;
        validate_data(data)?;
        let (n_samples, n_features) = data.dim();
        let k = self.resolve_components(n_features)?;

        info!(
            "Running PCA on {} samples x {} features: {} components, normalize = {}.",
            n_samples, n_features, k, self.config.normalize
        );

        let standardization =
            standardize(data, self.config.normalize, self.config.zero_variance_policy)?;
        let correlation = correlation_matrix(data);
        let covariance = covariance_matrix(&standardization.standardized.view());

        let settings = SolverSettings::from(&self.config);
        let pairs = extract_top_eigenpairs(&covariance.view(), k, &settings)?;
        let degenerate_count = pairs.degenerate.iter().filter(|&&d| d).count();
        if degenerate_count > 0 {
            warn!(
                "{} of {} components are degenerate; their eigenvalues are 0 and their directions arbitrary.",
                degenerate_count, k
            );
        }

        let transformed =
            report::project(&standardization.standardized.view(), &pairs.eigenvectors.view())?;
        let ratios = report::explained_variance_ratio(&pairs.eigenvalues.view())?;
        let cumulative = report::cumulative_variance(&ratios.view());
        let reconstruction_error = report::reconstruction_error(&pairs.eigenvalues.view());
        let loadings = report::loadings(&pairs.eigenvectors.view(), &pairs.eigenvalues.view());

        let result = PcaResult {
            transformed_data: transformed,
            explained_variance: pairs.eigenvalues.clone(),
            eigenvalues: pairs.eigenvalues,
            explained_variance_ratio: ratios,
            cumulative_variance: cumulative,
            components: pairs.eigenvectors,
            mean: standardization.means,
            std: standardization.stds,
            reconstruction_error,
            loadings,
            correlation_matrix: correlation,
            covariance_matrix: covariance,
            original_data: data.to_owned(),
            standardized_data: standardization.standardized,
            normalized: self.config.normalize,
            requested_components: self.config.n_components,
            iterations: pairs.iterations,
        };

        if log_enabled!(Level::Debug) {
            debug!("Eigen-basis diagnostics: {:?}", result.diagnostics());
        }
        info!(
            "PCA finished in {:?}; eigenvalues {:?}.",
            start.elapsed(),
            result.eigenvalues.as_slice().unwrap_or(&[])
        );

        Ok(result)
    }
}
