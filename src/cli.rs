use crate::engine::{AlignParams, AlignType, Normalization, SimParams, SimType};
use crate::utils::Result;
use chrono::Datelike;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="chromalign",
          version=&**FULL_VERSION,
          about="Retention-time alignment of extracted-ion chromatograms",
          long_about = None,
          disable_help_subcommand = true,
          after_help = format!("Copyright (C) 2019-{}     chromalign contributors
This program comes with ABSOLUTELY NO WARRANTY.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Align two chromatogram groups")]
    Align(AlignArgs),
    #[clap(about = "Align many chromatogram pairs listed in a manifest")]
    Batch(BatchArgs),
    #[clap(about = "Write the similarity matrix of two chromatogram groups")]
    Simmat(SimmatArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("align")))]
#[command(arg_required_else_help(true))]
pub struct AlignArgs {
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "chrom-a")]
    #[clap(help = "Chromatogram TSV of the reference run")]
    #[clap(value_name = "CHROM_A")]
    #[arg(value_parser = check_file_exists)]
    pub chrom_a: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "chrom-b")]
    #[clap(help = "Chromatogram TSV of the experiment run")]
    #[clap(value_name = "CHROM_B")]
    #[arg(value_parser = check_file_exists)]
    pub chrom_b: PathBuf,

    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output TSV path [default: stdout]")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: Option<String>,

    #[clap(long = "b1p")]
    #[clap(value_name = "TIME")]
    #[clap(help = "Predicted run-B time of the first run-A time point")]
    #[clap(requires = "b2p")]
    pub b1p: Option<f64>,

    #[clap(long = "b2p")]
    #[clap(value_name = "TIME")]
    #[clap(help = "Predicted run-B time of the last run-A time point")]
    #[clap(requires = "b1p")]
    pub b2p: Option<f64>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("batch")))]
#[command(arg_required_else_help(true))]
pub struct BatchArgs {
    #[clap(required = true)]
    #[clap(short = 'm')]
    #[clap(long = "manifest")]
    #[clap(help = "Whitespace-separated manifest: id path_a path_b [b1p b2p]")]
    #[clap(value_name = "MANIFEST")]
    #[arg(value_parser = check_file_exists)]
    pub manifest: PathBuf,

    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output TSV path [default: stdout]")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: Option<String>,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("simmat")))]
#[command(arg_required_else_help(true))]
pub struct SimmatArgs {
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "chrom-a")]
    #[clap(help = "Chromatogram TSV of the reference run")]
    #[clap(value_name = "CHROM_A")]
    #[arg(value_parser = check_file_exists)]
    pub chrom_a: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "chrom-b")]
    #[clap(help = "Chromatogram TSV of the experiment run")]
    #[clap(value_name = "CHROM_B")]
    #[arg(value_parser = check_file_exists)]
    pub chrom_b: PathBuf,

    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output TSV path [default: stdout]")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: Option<String>,

    #[clap(long = "b1p")]
    #[clap(value_name = "TIME")]
    #[clap(help = "Predicted run-B time of the first run-A time point")]
    #[clap(requires = "b2p")]
    pub b1p: Option<f64>,

    #[clap(long = "b2p")]
    #[clap(value_name = "TIME")]
    #[clap(help = "Predicted run-B time of the last run-A time point")]
    #[clap(requires = "b1p")]
    pub b2p: Option<f64>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Alignment options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    #[clap(long = "align-type")]
    #[clap(value_name = "ALIGN_TYPE")]
    #[clap(help = "Alignment type (global or hybrid)")]
    #[clap(default_value = "hybrid")]
    pub align_type: AlignType,

    #[clap(long = "normalization")]
    #[clap(value_name = "NORMALIZATION")]
    #[clap(help = "Intensity normalization (none, mean or L2)")]
    #[clap(default_value = "mean")]
    pub normalization: Normalization,

    #[clap(long = "sim-type")]
    #[clap(value_name = "SIM_TYPE")]
    #[clap(
        help = "Similarity measure: dotProductMasked, dotProduct, cosineAngle, cosine2Angle, euclideanDist, covariance, correlation or crossCorrelation"
    )]
    #[clap(default_value = "dotProductMasked")]
    pub sim_type: SimType,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "cos-angle-thresh")]
    #[clap(value_name = "THRESH")]
    #[clap(help = "Angular similarity a high dot product must exceed (dotProductMasked)")]
    #[clap(default_value = "0.3")]
    pub cos_angle_thresh: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "dot-prod-thresh")]
    #[clap(value_name = "QUANTILE")]
    #[clap(help = "Dot-product quantile above which the angle is checked (dotProductMasked)")]
    #[clap(default_value = "0.96")]
    #[arg(value_parser = ensure_unit_float)]
    pub dot_prod_thresh: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "ker-len")]
    #[clap(value_name = "LEN")]
    #[clap(help = "Odd diagonal window length (crossCorrelation)")]
    #[clap(default_value = "9")]
    #[arg(value_parser = odd_kernel_length)]
    pub ker_len: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "gap-quantile")]
    #[clap(value_name = "QUANTILE")]
    #[clap(help = "Similarity quantile used as the base gap penalty")]
    #[clap(default_value = "0.5")]
    #[arg(value_parser = ensure_unit_float)]
    pub gap_quantile: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "go-factor")]
    #[clap(value_name = "FACTOR")]
    #[clap(help = "Gap-open penalty as a multiple of the base gap penalty")]
    #[clap(default_value = "0.125")]
    pub go_factor: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "ge-factor")]
    #[clap(value_name = "FACTOR")]
    #[clap(help = "Gap-extend penalty as a multiple of the base gap penalty")]
    #[clap(default_value = "40")]
    pub ge_factor: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "gap")]
    #[clap(value_name = "PENALTY")]
    #[clap(help = "Fixed linear gap penalty; replaces the affine model")]
    pub gap: Option<f64>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "no-overlap")]
    #[clap(help = "Penalize terminal gaps")]
    #[clap(action = ArgAction::SetTrue)]
    pub no_overlap: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "no-beef")]
    #[clap(value_name = "SAMPLES")]
    #[clap(help = "Half width in samples of the unpenalized band around the predicted path")]
    #[clap(conflicts_with = "adaptive_rt")]
    pub no_beef: Option<usize>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "adaptive-rt")]
    #[clap(value_name = "SECONDS")]
    #[clap(help = "Half width in seconds of the unpenalized band around the predicted path")]
    pub adaptive_rt: Option<f64>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "hard-constrain")]
    #[clap(help = "Penalize every cell outside the band by the same maximal amount")]
    #[clap(action = ArgAction::SetTrue)]
    pub hard_constrain: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "samples4gradient")]
    #[clap(value_name = "SAMPLES")]
    #[clap(help = "Distance over which the band penalty reaches twice the largest similarity")]
    #[clap(default_value = "100")]
    #[arg(value_parser = positive_float)]
    pub samples4gradient: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-cells")]
    #[clap(value_name = "CELLS")]
    #[clap(help = "Largest similarity matrix to align")]
    #[clap(default_value = "25000000")]
    pub max_cells: usize,
}

impl EngineArgs {
    pub fn align_params(&self) -> AlignParams {
        AlignParams {
            align_type: self.align_type,
            sim: SimParams {
                normalization: self.normalization,
                sim_type: self.sim_type,
                cos_angle_thresh: self.cos_angle_thresh,
                dot_prod_thresh: self.dot_prod_thresh,
                ker_len: self.ker_len,
            },
            gap_quantile: self.gap_quantile,
            go_factor: self.go_factor,
            ge_factor: self.ge_factor,
            linear_gap: self.gap,
            overlap: !self.no_overlap,
            samples4gradient: self.samples4gradient,
            max_cells: self.max_cells,
        }
    }
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}

fn positive_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("The value must be positive, got: {}", value))
    }
}

fn odd_kernel_length(s: &str) -> Result<usize> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid kernel length", s))?;
    if value % 2 == 1 {
        Ok(value)
    } else {
        Err(format!("Kernel length must be odd, got: {}", value))
    }
}
