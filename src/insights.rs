// src/insights.rs

//! Rankings derived from a finished run, for guided explanations of what the
//! components mean.

use float_cmp::approx_eq;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::pca::PcaResult;

/// One off-diagonal entry of a correlation matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub feature_a: usize,
    pub feature_b: usize,
    pub correlation: f64,
}

/// The most and least correlated feature pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationExtremes {
    /// Largest |r| among pairs that are not perfectly correlated. `None` when
    /// every pair is (e.g. duplicated features).
    pub strongest: Option<CorrelationPair>,
    /// Smallest |r| over all pairs.
    pub weakest: CorrelationPair,
}

/// Strongest and weakest pairs of the upper triangle of `corr`. Returns `None`
/// for fewer than two features. Ties keep the first pair in row-major order.
pub fn correlation_extremes(corr: &ArrayView2<f64>) -> Option<CorrelationExtremes> {
    let n = corr.nrows().min(corr.ncols());
    let mut strongest: Option<CorrelationPair> = None;
    let mut weakest: Option<CorrelationPair> = None;

    for i in 0..n {
        for j in (i + 1)..n {
            let r = corr[[i, j]];
            let pair = CorrelationPair {
                feature_a: i,
                feature_b: j,
                correlation: r,
            };
            let perfect = approx_eq!(f64, r.abs(), 1.0, ulps = 4);
            if !perfect && strongest.as_ref().map_or(true, |s| r.abs() > s.correlation.abs()) {
                strongest = Some(pair.clone());
            }
            if weakest.as_ref().map_or(true, |w| r.abs() < w.correlation.abs()) {
                weakest = Some(pair);
            }
        }
    }

    weakest.map(|weakest| CorrelationExtremes { strongest, weakest })
}

/// A feature's total contribution to the leading components.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: usize,
    /// Sum of |loading| over the considered components.
    pub importance: f64,
}

/// Features ranked by the sum of their absolute loadings on the first `m`
/// components (all components if `m` exceeds their number). Highest first;
/// equal scores keep feature order.
pub fn feature_importance(loadings: &ArrayView2<f64>, m: usize) -> Vec<FeatureImportance> {
    let m = m.min(loadings.ncols());
    let mut ranked: Vec<FeatureImportance> = loadings
        .rows()
        .into_iter()
        .enumerate()
        .map(|(feature, row)| FeatureImportance {
            feature,
            importance: row.iter().take(m).map(|l| l.abs()).sum(),
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Indices of the `count` most important features.
pub fn top_features(loadings: &ArrayView2<f64>, m: usize, count: usize) -> Vec<usize> {
    feature_importance(loadings, m)
        .into_iter()
        .take(count)
        .map(|f| f.feature)
        .collect()
}

impl PcaResult {
    /// [`correlation_extremes`] of this run's raw-feature correlations.
    pub fn correlation_extremes(&self) -> Option<CorrelationExtremes> {
        correlation_extremes(&self.correlation_matrix.view())
    }

    /// [`feature_importance`] over this run's first `m` components.
    pub fn feature_importance(&self, m: usize) -> Vec<FeatureImportance> {
        feature_importance(&self.loadings.view(), m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn extremes_skip_perfect_correlation() {
        let corr = array![
            [1.0, 1.0, 0.8, 0.1],
            [1.0, 1.0, 0.7, -0.05],
            [0.8, 0.7, 1.0, -0.9],
            [0.1, -0.05, -0.9, 1.0]
        ];
        let extremes = correlation_extremes(&corr.view()).unwrap();
        let strongest = extremes.strongest.unwrap();
        assert_eq!((strongest.feature_a, strongest.feature_b), (2, 3));
        assert_eq!(strongest.correlation, -0.9);
        assert_eq!((extremes.weakest.feature_a, extremes.weakest.feature_b), (1, 3));
    }

    #[test]
    fn extremes_need_two_features() {
        assert_eq!(correlation_extremes(&array![[1.0]].view()), None);
        let duplicated = array![[1.0, 1.0], [1.0, 1.0]];
        let extremes = correlation_extremes(&duplicated.view()).unwrap();
        assert_eq!(extremes.strongest, None);
        assert_eq!(extremes.weakest.correlation, 1.0);
    }

    #[test]
    fn importance_sums_absolute_loadings() {
        let loadings = array![[0.1, 0.9], [-0.8, 0.1], [0.5, -0.5]];
        let ranked = feature_importance(&loadings.view(), 1);
        assert_eq!(ranked.iter().map(|f| f.feature).collect::<Vec<_>>(), vec![1, 2, 0]);
        assert_abs_diff_eq!(ranked[0].importance, 0.8);

        let ranked = feature_importance(&loadings.view(), 10);
        assert_eq!(ranked[0].feature, 0);
        assert_abs_diff_eq!(ranked[0].importance, 1.0, epsilon = 1e-12);

        assert_eq!(top_features(&loadings.view(), 2, 2), vec![0, 2]);
    }
}
