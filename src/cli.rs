use crate::records;

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub dst: std::path::PathBuf,
    pub omni: std::path::PathBuf,
    pub folds: usize,
    pub min_capacity: usize,
    pub max_capacity: usize,
    pub feature: records::Feature,
    pub scale: f64,
    pub shift: bool,
    pub threads: Option<usize>,
    pub report: Option<std::path::PathBuf>,
    pub overview: bool,
    pub holdout: bool,
    pub preview: usize,
    pub verbose: bool,
}

impl Args {
    /// Parses command-line arguments using `clap`.
    ///
    /// # Returns
    /// * `Args` - Struct containing parsed arguments.
    ///
    /// # Errors
    /// * Exits through clap if required arguments are missing or invalid.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Args {
            dst: matches.get_one::<std::path::PathBuf>("dst").cloned().unwrap_or_default(),
            omni: matches.get_one::<std::path::PathBuf>("omni").cloned().unwrap_or_default(),
            folds: matches.get_one::<usize>("folds").copied().unwrap_or(4),
            min_capacity: matches.get_one::<usize>("min-capacity").copied().unwrap_or(1),
            max_capacity: matches.get_one::<usize>("max-capacity").copied().unwrap_or(10),
            feature: matches.get_one::<records::Feature>("feature").copied().unwrap_or(records::Feature::Bz),
            scale: matches.get_one::<f64>("scale").copied().unwrap_or(1.0),
            shift: matches.get_flag("shift"),
            threads: matches.get_one::<usize>("threads").copied(),
            report: matches.get_one::<std::path::PathBuf>("report").cloned(),
            overview: matches.get_flag("overview"),
            holdout: matches.get_flag("holdout"),
            preview: matches.get_one::<usize>("preview").copied().unwrap_or(5),
            verbose: matches.get_flag("verbose"),
        }
    }
}

fn command() -> clap::Command {
    clap::Command::new("dst_imf_cv")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Align DST and OMNI hourly data and cross-validate a DST regression")
        .arg(
            clap::Arg::new("dst")
                .short('d')
                .long("dst")
                .help("Path to the WDC-format hourly DST file")
                .required(true)
                .num_args(1)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("omni")
                .short('o')
                .long("omni")
                .help("Path to the OMNI2 hourly-average data file")
                .required(true)
                .num_args(1)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("folds")
                .short('k')
                .long("folds")
                .help("Number of contiguous cross-validation folds")
                .default_value("4")
                .value_parser(clap::builder::ValueParser::new(parse_folds)),
        )
        .arg(
            clap::Arg::new("min-capacity")
                .long("min-capacity")
                .help("Smallest model capacity (polynomial degree) to try")
                .default_value("1")
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("max-capacity")
                .long("max-capacity")
                .help("Capacity upper bound, exclusive")
                .default_value("10")
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("feature")
                .short('f')
                .long("feature")
                .help("Solar-wind feature to regress on. Available: bz, bx, by, speed, density, temperature")
                .default_value("bz")
                .value_parser(clap::builder::ValueParser::new(|s: &str| s.parse::<records::Feature>())),
        )
        .arg(
            clap::Arg::new("scale")
                .long("scale")
                .help("Factor applied to the feature before fitting")
                .default_value("1.0")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            clap::Arg::new("shift")
                .long("shift")
                .help("Shift the scaled feature by its own minimum so it starts at zero")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of threads to use (default: all available)")
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("report")
                .short('r')
                .long("report")
                .help("Directory to write every rendered series as CSV")
                .num_args(1)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("overview")
                .long("overview")
                .help("Render DST, Bz, density, speed and temperature before fitting")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("holdout")
                .long("holdout")
                .help("Also fit a linear model on the first half and predict the second")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("preview")
                .short('p')
                .long("preview")
                .help("Rows printed per rendered series")
                .default_value("5")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every (fold, capacity) score")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Validates that a count is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the count.
///
/// # Returns
/// * `Result<usize>` - Validated count.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

fn parse_folds(s: &str) -> Result<usize, String> {
    match parse_usize_positive(s)? {
        1 => Err("Need at least 2 folds".to_string()),
        n => Ok(n),
    }
}
