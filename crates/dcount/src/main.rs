use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::Parser;
use dcount::{apply_setting, count_buckets, read_bucketed_column, write_counts, write_settings};
use dcount_core::config::AggregationConfig;
use dcount_core::membership::MembershipSetKind;
use dcount_core::null_handling::NullHandling;
use dcount_error::{Result, ResultExt};
use logutil::LogFormat;
use tracing::info;

#[derive(Parser)]
#[clap(name = "dcount")]
struct Arguments {
    /// Input file with `bucket<TAB>values` lines.
    ///
    /// Reads from stdin if omitted.
    path: Option<PathBuf>,
    /// How null dictionary entries are counted (default_value or
    /// explicit_null).
    #[clap(long, env = "DCOUNT_NULL_HANDLING")]
    null_handling: Option<NullHandling>,
    /// Set implementation used for tracking seen values (bitmap or roaring).
    #[clap(long)]
    membership_set: Option<MembershipSetKind>,
    /// Count buckets in parallel.
    #[clap(long)]
    parallel: bool,
    /// Additional settings as NAME=VALUE.
    #[clap(long = "set", value_name = "NAME=VALUE")]
    settings: Vec<String>,
    /// Print all settings with their current values and exit.
    #[clap(long)]
    list_settings: bool,
    /// Log level for messages written to stderr.
    #[clap(long, default_value = "warn")]
    log_level: tracing::Level,
    /// Log output format (human or json).
    #[clap(long, default_value = "human")]
    log_format: LogFormat,
}

fn main() {
    let args = Arguments::parse();
    logutil::configure_global_logger(args.log_level, args.log_format, io::stderr);

    if let Err(err) = inner(args) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn inner(args: Arguments) -> Result<()> {
    let mut conf = AggregationConfig::new();
    for setting in &args.settings {
        apply_setting(&mut conf, setting)?;
    }
    // Explicit flags take precedence over `--set`.
    if let Some(null_handling) = args.null_handling {
        conf.null_handling = null_handling;
    }
    if let Some(membership_set) = args.membership_set {
        conf.membership_set = membership_set;
    }
    if args.parallel {
        conf.parallel_buckets = true;
    }

    if args.list_settings {
        return write_settings(io::stdout().lock(), &conf);
    }

    let input = match &args.path {
        Some(path) => {
            let file = File::open(path)
                .context_fn(|| format!("Failed to open '{}'", path.display()))?;
            read_bucketed_column(BufReader::new(file))?
        }
        None => read_bucketed_column(io::stdin().lock())?,
    };

    let counts = count_buckets(&input, &conf)?;
    info!(buckets = counts.len(), "counted buckets");

    write_counts(io::stdout().lock(), &input, &counts)
}
