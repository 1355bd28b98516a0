use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fixlab",
    version,
    about = "I2MC fixation detection for Tobii eye-tracking exports",
    long_about = "Clean Tobii TSV gaze exports, split them into sessions and run I2MC \
                  fixation detection on each one.\n\
                  Requires Python with the I2MC package. Set $FIXLAB_PYTHON or use --python."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect fixations in every session of the input files
    Run(RunArgs),
    /// Check input files and list the sessions they contain
    Validate(ValidateArgs),
    /// Print the effective detector options as JSON
    Options(OptionsArgs),
    /// Show Python, bridge script and I2MC availability
    Info(InfoArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Input TSV files or glob patterns, concatenated in order
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Result file, rewritten at every checkpoint
    #[arg(short, long, default_value = "fixations.csv")]
    pub output: String,

    /// Result format (csv, json); taken from the output extension if omitted
    #[arg(long)]
    pub format: Option<String>,

    /// Sessions between checkpoints (0 writes only at the end)
    #[arg(long, default_value_t = 20)]
    pub checkpoint_every: usize,

    /// JSON file with detector options; omitted keys keep their defaults
    #[arg(long)]
    pub options: Option<String>,

    /// Python interpreter with I2MC installed
    #[arg(long, env = "FIXLAB_PYTHON")]
    pub python: Option<String>,

    /// Path to i2mc_bridge.py
    #[arg(long, env = "FIXLAB_BRIDGE_SCRIPT")]
    pub bridge: Option<String>,

    /// Per-session detector timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip sessions the detector fails on instead of stopping
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Process sessions sorted by participant and recording
    #[arg(long, default_value_t = false)]
    pub sort_sessions: bool,

    /// Print the run report as JSON on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input TSV files or glob patterns
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// JSON file with detector options (screen resolution for the bounds check)
    #[arg(long)]
    pub options: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct OptionsArgs {
    /// JSON file with detector options to merge over the defaults
    #[arg(long)]
    pub options: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Python interpreter with I2MC installed
    #[arg(long, env = "FIXLAB_PYTHON")]
    pub python: Option<String>,

    /// Path to i2mc_bridge.py
    #[arg(long, env = "FIXLAB_BRIDGE_SCRIPT")]
    pub bridge: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
