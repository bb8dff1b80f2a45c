//! K-fold cross-validation with a per-fold capacity sweep.
//!
//! Folds are contiguous blocks of the hourly series. Fold `f` (1-based) holds
//! out `[floor(L*(f-1)), floor(L*(f-1) + L) + 1)` with `L = N / k` as a real,
//! clamped to `N`. The `+ 1` widens every test block by one hour, so adjacent
//! folds share their boundary index.

use ndarray::{Array1, Axis};
use rayon::prelude::*;

use crate::error;
use crate::model;
use crate::records;

/// Sweep parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub folds: usize,
    /// Capacities tried in every fold, end-exclusive.
    pub capacities: std::ops::Range<usize>,
    pub show_progress: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            folds: 4,
            capacities: 1..10,
            show_progress: false,
        }
    }
}

impl SweepConfig {
    fn validate(&self, n_samples: usize) -> error::Result<()> {
        if self.folds < 2 {
            return Err(error::PipelineError::invalid_parameter("folds", "need at least 2 folds"));
        }
        if self.capacities.is_empty() || self.capacities.start == 0 {
            return Err(error::PipelineError::invalid_parameter(
                "capacities",
                format!("{:?} must be a non-empty range starting at 1 or more", self.capacities),
            ));
        }
        if n_samples < self.folds {
            return Err(error::PipelineError::invalid_parameter(
                "folds",
                format!("{} folds over only {} samples", self.folds, n_samples),
            ));
        }
        Ok(())
    }
}

/// Held-out index range of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldBounds {
    /// 1-based fold number.
    pub fold: usize,
    pub test: std::ops::Range<usize>,
}

/// Test ranges for `k` contiguous folds over `n` samples.
pub fn fold_bounds(n: usize, k: usize) -> Vec<FoldBounds> {
    let fold_length = n as f64 / k as f64;
    (1..=k)
        .map(|fold| {
            let start = fold_length * (fold - 1) as f64;
            let end = ((start + fold_length).floor() as usize + 1).min(n);
            FoldBounds {
                fold,
                test: (start.floor() as usize)..end,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityScore {
    pub capacity: usize,
    pub train_score: f64,
    pub test_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestCapacity {
    pub capacity: usize,
    pub score: f64,
}

/// Every score of one fold plus the two independently tracked winners.
#[derive(Debug, Clone)]
pub struct FoldResult {
    pub fold: usize,
    pub test_range: std::ops::Range<usize>,
    pub scores: Vec<CapacityScore>,
    pub best_train: BestCapacity,
    pub best_test: BestCapacity,
}

/// Model output over one partition, predictions rounded like the DST index.
#[derive(Debug, Clone)]
pub struct PartitionPrediction {
    pub times: Vec<records::TimePoint>,
    pub actual: Vec<f64>,
    pub predicted: Vec<i64>,
    pub score: f64,
}

/// The last fold refit at its best-by-train capacity.
#[derive(Debug, Clone)]
pub struct FinalFoldResult {
    pub fold: usize,
    pub capacity: usize,
    pub train: PartitionPrediction,
    pub test: PartitionPrediction,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub folds: Vec<FoldResult>,
    pub final_fold: FinalFoldResult,
}

/// Single train/test split at `N / 2`, kept as a sanity baseline.
#[derive(Debug, Clone)]
pub struct HoldoutResult {
    pub split: usize,
    pub capacity: usize,
    pub train: PartitionPrediction,
    pub test: PartitionPrediction,
}

/// Time axis, feature and labels of the aligned series, as the sweep sees them.
pub struct Dataset<'a> {
    times: &'a [records::TimePoint],
    features: Array1<f64>,
    labels: Array1<f64>,
}

impl<'a> Dataset<'a> {
    pub fn new(times: &'a [records::TimePoint], features: Vec<f64>, labels: Vec<f64>) -> error::Result<Self> {
        if features.len() != times.len() || labels.len() != times.len() {
            return Err(error::PipelineError::invalid_parameter(
                "dataset",
                format!(
                    "{} timestamps, {} features, {} labels",
                    times.len(),
                    features.len(),
                    labels.len()
                ),
            ));
        }
        Ok(Dataset {
            times,
            features: Array1::from(features),
            labels: Array1::from(labels),
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    fn partition(&self, indices: &[usize]) -> Partition {
        Partition {
            times: indices.iter().map(|&i| self.times[i]).collect(),
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// (train, test) for a held-out range; train is everything outside it.
    fn split(&self, test: &std::ops::Range<usize>) -> (Partition, Partition) {
        let train_idx: Vec<usize> = (0..self.len()).filter(|i| !test.contains(i)).collect();
        let test_idx: Vec<usize> = test.clone().collect();
        (self.partition(&train_idx), self.partition(&test_idx))
    }
}

struct Partition {
    times: Vec<records::TimePoint>,
    features: Array1<f64>,
    labels: Array1<f64>,
}

pub struct CrossValidationSweeper<'r, R: model::Regressor> {
    regressor: &'r R,
    config: SweepConfig,
}

impl<'r, R: model::Regressor> CrossValidationSweeper<'r, R> {
    pub fn new(regressor: &'r R, config: SweepConfig) -> Self {
        CrossValidationSweeper { regressor, config }
    }

    /// Runs every fold, then refits the last fold at its best-by-train capacity.
    ///
    /// The first fit failure aborts the whole sweep.
    ///
    /// # Arguments
    /// * `data` - Aligned, preprocessed series.
    ///
    /// # Returns
    /// * `error::Result<SweepReport>` - Per-fold scores and the final fold's predictions.
    pub fn run(&self, data: &Dataset) -> error::Result<SweepReport> {
        self.config.validate(data.len())?;
        let bounds = fold_bounds(data.len(), self.config.folds);

        let progress = if self.config.show_progress {
            let bar = indicatif::ProgressBar::new((bounds.len() * self.config.capacities.len()) as u64);
            bar.set_style(
                indicatif::ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} fits")
                    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
            );
            bar
        } else {
            indicatif::ProgressBar::hidden()
        };

        let mut folds = Vec::with_capacity(bounds.len());
        for fold in &bounds {
            folds.push(self.sweep_fold(data, fold, &progress)?);
        }
        progress.finish_and_clear();

        let final_fold = self.final_fold_result(data, &bounds, &folds)?;
        Ok(SweepReport { folds, final_fold })
    }

    fn sweep_fold(&self, data: &Dataset, bounds: &FoldBounds, progress: &indicatif::ProgressBar) -> error::Result<FoldResult> {
        let (train, test) = data.split(&bounds.test);
        let fold = bounds.fold;

        // results stay in capacity order, so the lowest failing capacity is the one reported
        let results: Vec<error::Result<CapacityScore>> = self
            .config
            .capacities
            .clone()
            .into_par_iter()
            .map(|capacity| -> error::Result<CapacityScore> {
                let model = self
                    .regressor
                    .fit(&train.features, &train.labels, capacity)
                    .map_err(|source| error::PipelineError::ModelFit { fold, capacity, source })?;
                let score = CapacityScore {
                    capacity,
                    train_score: self.regressor.score(&model, &train.features, &train.labels),
                    test_score: self.regressor.score(&model, &test.features, &test.labels),
                };
                progress.inc(1);
                if !(score.train_score.is_finite() && score.test_score.is_finite()) {
                    return Err(error::PipelineError::ModelFit {
                        fold,
                        capacity,
                        source: model::FitError::NonFinite,
                    });
                }
                Ok(score)
            })
            .collect();
        let scores = results.into_iter().collect::<error::Result<Vec<_>>>()?;

        for s in &scores {
            tracing::debug!(fold, capacity = s.capacity, train_r2 = s.train_score, test_r2 = s.test_score, "capacity scored");
        }

        let best_train = best_by(&scores, |s| s.train_score)?;
        let best_test = best_by(&scores, |s| s.test_score)?;
        tracing::info!(
            fold,
            best_train_capacity = best_train.capacity,
            best_train_r2 = best_train.score,
            best_test_capacity = best_test.capacity,
            best_test_r2 = best_test.score,
            "fold done"
        );

        Ok(FoldResult {
            fold,
            test_range: bounds.test.clone(),
            scores,
            best_train,
            best_test,
        })
    }

    fn final_fold_result(
        &self,
        data: &Dataset,
        bounds: &[FoldBounds],
        folds: &[FoldResult],
    ) -> error::Result<FinalFoldResult> {
        let (Some(last_bounds), Some(last)) = (bounds.last(), folds.last()) else {
            return Err(error::PipelineError::invalid_parameter("folds", "no folds were evaluated"));
        };
        let capacity = last.best_train.capacity;
        let (train, test) = data.split(&last_bounds.test);
        let (train, test) = fit_and_predict(self.regressor, &train, &test, capacity, last_bounds.fold)?;
        Ok(FinalFoldResult {
            fold: last_bounds.fold,
            capacity,
            train,
            test,
        })
    }
}

/// Fits on the first `N / 2` samples and predicts the rest.
///
/// A fit failure is reported as fold 0.
pub fn holdout_baseline<R: model::Regressor>(
    regressor: &R,
    data: &Dataset,
    capacity: usize,
) -> error::Result<HoldoutResult> {
    let split = data.len() / 2;
    let (train, test) = data.split(&(split..data.len()));
    let (train, test) = fit_and_predict(regressor, &train, &test, capacity, 0)?;
    tracing::info!(split, capacity, test_r2 = test.score, "hold-out baseline done");
    Ok(HoldoutResult {
        split,
        capacity,
        train,
        test,
    })
}

fn fit_and_predict<R: model::Regressor>(
    regressor: &R,
    train: &Partition,
    test: &Partition,
    capacity: usize,
    fold: usize,
) -> error::Result<(PartitionPrediction, PartitionPrediction)> {
    let model = regressor
        .fit(&train.features, &train.labels, capacity)
        .map_err(|source| error::PipelineError::ModelFit { fold, capacity, source })?;
    let predict = |part: &Partition| PartitionPrediction {
        times: part.times.clone(),
        actual: part.labels.to_vec(),
        predicted: regressor
            .predict(&model, &part.features)
            .iter()
            .map(|p| p.round() as i64)
            .collect(),
        score: regressor.score(&model, &part.features, &part.labels),
    };
    let (train, test) = (predict(train), predict(test));
    if !(train.score.is_finite() && test.score.is_finite()) {
        return Err(error::PipelineError::ModelFit {
            fold,
            capacity,
            source: model::FitError::NonFinite,
        });
    }
    Ok((train, test))
}

/// First capacity reaching the maximum of `key`; later ties do not replace it.
/// Non-finite scores never win.
fn best_by(scores: &[CapacityScore], key: impl Fn(&CapacityScore) -> f64) -> error::Result<BestCapacity> {
    let mut best: Option<BestCapacity> = None;
    for s in scores {
        let score = key(s);
        if !score.is_finite() {
            continue;
        }
        if best.map_or(true, |b| score > b.score) {
            best = Some(BestCapacity {
                capacity: s.capacity,
                score,
            });
        }
    }
    best.ok_or_else(|| error::PipelineError::invalid_parameter("capacities", "no capacity was evaluated"))
}
