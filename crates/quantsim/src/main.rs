use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use quantsim::{RunOptions, init_logging, run};
use quantsim_core::config::{DEFAULT_FIT_SIZES, DEFAULT_TWO_SAMPLE_SIZES};
use quantsim_core::{AnalysisConfig, DegeneratePolicy, Execution, MeanStage};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    Discard,
    Propagate,
}

impl From<Policy> for DegeneratePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Discard => DegeneratePolicy::Discard,
            Policy::Propagate => DegeneratePolicy::Propagate,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "quantsim")]
#[command(about = "Monte Carlo study of the 1% quantile of 10-day stable returns")]
struct Args {
    /// Seed for the random stream (the two-sample stage restarts from it)
    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// Trials per mean-stage sample
    #[arg(long, default_value_t = 1_000)]
    mean_size: usize,

    /// Number of mean-stage samples
    #[arg(long, default_value_t = 10)]
    mean_repeats: usize,

    /// Sample sizes for the fit ladder
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_FIT_SIZES)]
    fit_sizes: Vec<usize>,

    /// Sample sizes for the two-sample ladder
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_TWO_SAMPLE_SIZES)]
    two_sample_sizes: Vec<usize>,

    #[arg(long)]
    skip_fit: bool,

    #[arg(long)]
    skip_two_sample: bool,

    /// Where to write the histogram figure
    #[arg(long, default_value = "hist_fit.svg")]
    plot: PathBuf,

    /// Do not write the figure
    #[arg(long)]
    no_plot: bool,

    /// Run trials in this many independently seeded batches
    #[arg(long)]
    parallel: Option<usize>,

    /// What to do with non-finite or absurdly large estimates
    #[arg(long, value_enum, default_value_t = Policy::Discard)]
    policy: Policy,

    /// Print the full report as JSON after the console output
    #[arg(long)]
    json: bool,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn into_options(self) -> RunOptions {
        let config = AnalysisConfig {
            seed: self.seed,
            mean_stage: MeanStage {
                sample_size: self.mean_size,
                repeats: self.mean_repeats,
            },
            fit_sizes: self.fit_sizes,
            two_sample_sizes: self.two_sample_sizes,
            degenerate_policy: self.policy.into(),
            execution: match self.parallel {
                Some(batches) => Execution::Parallel { batches },
                None => Execution::Sequential,
            },
            ..Default::default()
        };

        RunOptions {
            config,
            skip_fit: self.skip_fit,
            skip_two_sample: self.skip_two_sample,
            plot: (!self.no_plot).then_some(self.plot),
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let json = args.json;
    let options = args.into_options();
    options.config.validate()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = run(&options, &mut out)?;

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    }

    tracing::info!("Run complete");
    Ok(())
}
