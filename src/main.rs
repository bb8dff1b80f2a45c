mod alignment;
mod cli;
mod dst;
mod error;
mod model;
mod omni;
mod preprocess;
mod records;
mod report;
mod sweep;
mod utils;

/// Main entry point of the application.
///
/// This function orchestrates the entire workflow:
/// 1. Parses command-line arguments and sets up logging.
/// 2. Decodes the DST and OMNI files.
/// 3. Checks that both series share one hourly timeline.
/// 4. Rescales the chosen feature.
/// 5. Runs the k-fold capacity sweep (and optionally the hold-out baseline).
/// 6. Prints the fold summary and renders the final fold's predictions.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let effective_threads = match args.threads {
        Some(n) => {
            let max_threads = num_cpus::get();
            if n > max_threads {
                println!("⚠️ Warning: Limiting thread count to {} (max available)", max_threads);
                max_threads
            } else {
                n
            }
        }
        None => rayon::current_num_threads(),
    };
    println!("🚀 Using {} thread(s)", effective_threads);

    if args.threads.is_some() {
        let local_pool = utils::configure_thread_pool(effective_threads)?;
        local_pool.install(|| run(&args))?;
    } else {
        run(&args)?;
    }

    println!(
        "✅ Completed in {:?} seconds",
        total_start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(args: &cli::Args) -> anyhow::Result<()> {
    println!("Start decoding...");
    let start = std::time::Instant::now();
    let dst_records = dst::decode_file(&args.dst)?;
    let imf_records = omni::decode_file(&args.omni)?;
    let aligned = alignment::align(dst_records, imf_records)?;
    println!(
        "✅ Decoded and aligned {} hours in {:?} seconds",
        aligned.len(),
        start.elapsed().as_secs_f64()
    );

    let mut sinks: Vec<Box<dyn report::ReportSink>> = vec![Box::new(report::ConsolePreviewSink { rows: args.preview })];
    if let Some(dir) = &args.report {
        sinks.push(Box::new(report::CsvSeriesSink::new(dir)?));
    }

    if args.overview {
        for sink in sinks.iter_mut() {
            report::render_overview(sink.as_mut(), &aligned)?;
        }
    }

    let transform = preprocess::FeatureTransform {
        scale: args.scale,
        shift_to_min: args.shift,
    };
    let times = aligned.times();
    let data = sweep::Dataset::new(
        &times,
        transform.apply(&aligned.feature(args.feature)),
        aligned.labels(),
    )?;
    let regressor = model::PolynomialRegressor::new();

    if args.holdout {
        let baseline = sweep::holdout_baseline(&regressor, &data, 1)?;
        println!(
            "📈 Hold-out baseline: split at {}, capacity {}, train R² = {:.4}, test R² = {:.4}",
            baseline.split, baseline.capacity, baseline.train.score, baseline.test.score
        );
        for sink in sinks.iter_mut() {
            report::render_prediction(sink.as_mut(), &baseline.train, "holdout_train")?;
            report::render_prediction(sink.as_mut(), &baseline.test, "holdout_test")?;
        }
    }

    println!("Start sweep on feature {}...", args.feature.label());
    let start = std::time::Instant::now();
    let config = sweep::SweepConfig {
        folds: args.folds,
        capacities: args.min_capacity..args.max_capacity,
        show_progress: true,
    };
    let sweep_report = sweep::CrossValidationSweeper::new(&regressor, config).run(&data)?;
    println!(
        "✅ Sweep completed in {:?} seconds",
        start.elapsed().as_secs_f64()
    );

    print!("{}", report::fold_summary(&sweep_report));
    let final_fold = &sweep_report.final_fold;
    println!(
        "📈 Final model: fold {}, capacity {}, train R² = {:.4}, test R² = {:.4}",
        final_fold.fold, final_fold.capacity, final_fold.train.score, final_fold.test.score
    );
    for sink in sinks.iter_mut() {
        report::render_prediction(sink.as_mut(), &final_fold.train, "final_train")?;
        report::render_prediction(sink.as_mut(), &final_fold.test, "final_test")?;
    }

    Ok(())
}
