use crate::error;
use crate::records;
use crate::sweep;
use crate::utils;

/// Consumer of `(time axis, series, label)` triples, e.g. a plotter.
pub trait ReportSink {
    fn render(&mut self, time_axis: &[records::TimePoint], series: &[f64], label: &str) -> error::Result<()>;
}

/// One CSV row of a rendered series.
#[derive(Debug, serde::Serialize)]
struct SeriesRow {
    time: String,
    value: f64,
}

/// Writes every rendered series to `<dir>/<label>.csv` with `time,value` columns.
pub struct CsvSeriesSink {
    dir: std::path::PathBuf,
}

impl CsvSeriesSink {
    /// Creates the sink, making `dir` if it does not exist yet.
    pub fn new<P: AsRef<std::path::Path>>(dir: P) -> error::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| error::PipelineError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(CsvSeriesSink { dir })
    }
}

impl ReportSink for CsvSeriesSink {
    fn render(&mut self, time_axis: &[records::TimePoint], series: &[f64], label: &str) -> error::Result<()> {
        let path = self.dir.join(format!("{}.csv", label));
        let mut writer = csv::Writer::from_path(&path)?;
        for (time, value) in time_axis.iter().zip(series) {
            writer.serialize(SeriesRow {
                time: time.format("%Y-%m-%dT%H:%M:%S").to_string(),
                value: *value,
            })?;
        }
        writer
            .flush()
            .map_err(|source| error::PipelineError::Io { path, source })
    }
}

/// Prints the first `rows` points of every series to stdout.
pub struct ConsolePreviewSink {
    pub rows: usize,
}

impl ReportSink for ConsolePreviewSink {
    fn render(&mut self, time_axis: &[records::TimePoint], series: &[f64], label: &str) -> error::Result<()> {
        println!("📄 {} ({} points)", label, series.len());
        for (time, value) in time_axis.iter().zip(series).take(self.rows) {
            println!(" - ts: {}, {}: {:.2}", utils::format_timestamp(time), label, value);
        }
        Ok(())
    }
}

/// Renders the raw DST index (with its base value and daily mean) next to the main solar-wind drivers on the shared time axis.
pub fn render_overview(sink: &mut dyn ReportSink, aligned: &records::AlignedSeries) -> error::Result<()> {
    let times = aligned.times();
    sink.render(&times, &aligned.labels(), "dst")?;
    sink.render(&times, &aligned.base_values(), "dst_base_value")?;
    sink.render(&times, &aligned.daily_means(), "dst_daily_mean")?;
    for feature in [
        records::Feature::Bz,
        records::Feature::ProtonDensity,
        records::Feature::PlasmaFlowSpeed,
        records::Feature::ProtonTemperature,
    ] {
        sink.render(&times, &aligned.feature(feature), feature.label())?;
    }
    Ok(())
}

/// Renders actual and predicted DST for one partition under `<prefix>_actual` / `<prefix>_predicted`.
pub fn render_prediction(
    sink: &mut dyn ReportSink,
    prediction: &sweep::PartitionPrediction,
    prefix: &str,
) -> error::Result<()> {
    let predicted: Vec<f64> = prediction.predicted.iter().map(|&p| p as f64).collect();
    sink.render(&prediction.times, &prediction.actual, &format!("{}_actual", prefix))?;
    sink.render(&prediction.times, &predicted, &format!("{}_predicted", prefix))?;
    Ok(())
}

/// Best-train / best-test capacity and R² per fold, one line each.
pub fn fold_summary(report: &sweep::SweepReport) -> String {
    let mut out = String::from("fold | test range | best train (cap, R²) | best test (cap, R²)\n");
    for fold in &report.folds {
        out.push_str(&format!(
            "{:>4} | {:>5}..{:<5} | {:>3}, {:>8.4} | {:>3}, {:>8.4}\n",
            fold.fold,
            fold.test_range.start,
            fold.test_range.end,
            fold.best_train.capacity,
            fold.best_train.score,
            fold.best_test.capacity,
            fold.best_test.score,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<(String, usize)>);

    impl ReportSink for Recorder {
        fn render(&mut self, time_axis: &[records::TimePoint], series: &[f64], label: &str) -> error::Result<()> {
            assert_eq!(time_axis.len(), series.len());
            self.0.push((label.to_string(), series.len()));
            Ok(())
        }
    }

    fn hours(n: usize) -> Vec<records::TimePoint> {
        let start = chrono::NaiveDate::from_ymd_opt(2015, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        (0..n).map(|h| start + chrono::Duration::hours(h as i64)).collect()
    }

    fn prediction() -> sweep::PartitionPrediction {
        sweep::PartitionPrediction {
            times: hours(3),
            actual: vec![-10.0, -12.0, -8.0],
            predicted: vec![-9, -11, -8],
            score: 0.75,
        }
    }

    #[test]
    fn prediction_renders_actual_then_predicted() {
        let mut sink = Recorder(Vec::new());
        render_prediction(&mut sink, &prediction(), "test").unwrap();
        assert_eq!(
            sink.0,
            vec![("test_actual".to_string(), 3), ("test_predicted".to_string(), 3)]
        );
    }

    #[test]
    fn csv_sink_writes_one_file_per_label() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSeriesSink::new(dir.path().join("out")).unwrap();
        render_prediction(&mut sink, &prediction(), "final_test").unwrap();

        assert!(dir.path().join("out").join("final_test_actual.csv").exists());
        let text = std::fs::read_to_string(dir.path().join("out").join("final_test_predicted.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time,value");
        assert_eq!(lines[1], "2015-01-01T00:00:00,-9.0");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn summary_has_a_line_per_fold() {
        let fold = |f: usize| sweep::FoldResult {
            fold: f,
            test_range: 0..10,
            scores: Vec::new(),
            best_train: sweep::BestCapacity { capacity: 9, score: 0.9 },
            best_test: sweep::BestCapacity { capacity: 1, score: 0.4 },
        };
        let report = sweep::SweepReport {
            folds: vec![fold(1), fold(2)],
            final_fold: sweep::FinalFoldResult {
                fold: 2,
                capacity: 9,
                train: prediction(),
                test: prediction(),
            },
        };
        let summary = fold_summary(&report);
        assert_eq!(summary.lines().count(), 3);
        assert!(summary.contains("0.9000"));
    }
}
