//! strata CLI: run the adaptive enhancement pipeline on image files.

mod image_io;
mod manifest;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use strata_core::{
    DiscriminantPolicy, EnhanceParams, KernelFalloff, RescalePolicy, StepId, pipeline,
};

use crate::image_io::{ImageIoError, load_luma, save_luma};
use crate::manifest::{RunManifest, manifest_file_name, step_file_name};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Adaptive edge-preserving enhancement of grayscale images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enhance an image and write every pipeline step to disk.
    Enhance(EnhanceArgs),

    /// Print the default parameters as JSON.
    Params,
}

#[derive(Debug, Clone, Args)]
struct EnhanceArgs {
    /// Path to the input image.
    #[arg(long)]
    input: PathBuf,

    /// Directory that receives the step images and the manifest.
    #[arg(long)]
    out_dir: PathBuf,

    /// Prefix for output files (default: input file stem).
    #[arg(long)]
    id: Option<String>,

    /// JSON parameter file; flags given on the command line take precedence.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Spatial smoothing strength.
    #[arg(long)]
    alpha: Option<f32>,

    /// Filter footprint in pixels.
    #[arg(long)]
    kernel_size: Option<usize>,

    /// Number of structure passes.
    #[arg(long, visible_alias = "k")]
    iterations: Option<usize>,

    /// Box window for the local detail statistics.
    #[arg(long)]
    local_var_size: Option<usize>,

    /// Discriminant width in local standard deviations.
    #[arg(long)]
    threshold: Option<f32>,

    /// Recombination strength.
    #[arg(long)]
    final_weight: Option<f32>,

    /// Spatial kernel shape.
    #[arg(long, value_enum)]
    falloff: Option<FalloffArg>,

    /// Which side of the bound keeps the original pixel.
    #[arg(long, value_enum)]
    discriminant: Option<DiscriminantArg>,

    /// Clip policy for the final rescale.
    #[arg(long, value_enum)]
    rescale: Option<RescaleArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FalloffArg {
    Gaussian,
    ExponentialDecay,
}

impl From<FalloffArg> for KernelFalloff {
    fn from(value: FalloffArg) -> Self {
        match value {
            FalloffArg::Gaussian => Self::Gaussian,
            FalloffArg::ExponentialDecay => Self::ExponentialDecay,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DiscriminantArg {
    AboveBound,
    WithinBound,
}

impl From<DiscriminantArg> for DiscriminantPolicy {
    fn from(value: DiscriminantArg) -> Self {
        match value {
            DiscriminantArg::AboveBound => Self::KeepOriginalAboveBound,
            DiscriminantArg::WithinBound => Self::KeepOriginalWithinBound,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RescaleArg {
    Percentile,
    MeanStd,
}

impl From<RescaleArg> for RescalePolicy {
    fn from(value: RescaleArg) -> Self {
        match value {
            RescaleArg::Percentile => RescalePolicy::default(),
            RescaleArg::MeanStd => RescalePolicy::MeanStdDev { sigmas: None },
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Image(#[from] ImageIoError),
    #[error(transparent)]
    Core(#[from] strata_core::StrataError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot derive an output id from {0}; pass --id")]
    NoId(PathBuf),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Enhance(args) => run_enhance(&args),
        Commands::Params => {
            println!("{}", serde_json::to_string_pretty(&EnhanceParams::default())?);
            Ok(())
        }
    }
}

fn run_enhance(args: &EnhanceArgs) -> CliResult<()> {
    let id = match &args.id {
        Some(id) => id.clone(),
        None => args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| CliError::NoId(args.input.clone()))?,
    };

    let base = match &args.params {
        Some(path) => load_params(path)?,
        None => EnhanceParams::default(),
    };
    let params = apply_overrides(base, args).clamped();

    tracing::info!("Loading image: {}", args.input.display());
    let image = load_luma(&args.input)?;
    tracing::info!("Image size: {}x{}", image.width, image.height);

    let started = Instant::now();
    let steps = pipeline(&image, &params)?;
    tracing::info!(
        "Pipeline finished in {:.1} ms ({} of {} pixels kept original)",
        started.elapsed().as_secs_f64() * 1e3,
        steps.keep_original.iter().filter(|&&k| k).count(),
        steps.keep_original.len()
    );

    fs::create_dir_all(&args.out_dir)?;
    for (step, layer) in steps.iter() {
        let path = args.out_dir.join(step_file_name(&id, step));
        save_luma(layer, &path)?;
        tracing::debug!("{} written to {}", step.label(), path.display());
    }

    let manifest = RunManifest::new(&args.input, &id, params);
    let manifest_path = args.out_dir.join(manifest_file_name(&id));
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    tracing::info!(
        "Result written to {}",
        args.out_dir.join(manifest.steps.get(StepId::Result)).display()
    );
    tracing::info!("Manifest written to {}", manifest_path.display());
    Ok(())
}

fn load_params(path: &Path) -> CliResult<EnhanceParams> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn apply_overrides(mut params: EnhanceParams, args: &EnhanceArgs) -> EnhanceParams {
    if let Some(v) = args.alpha {
        params.alpha = v;
    }
    if let Some(v) = args.kernel_size {
        params.kernel_size = v;
    }
    if let Some(v) = args.iterations {
        params.k = v;
    }
    if let Some(v) = args.local_var_size {
        params.local_var_size = v;
    }
    if let Some(v) = args.threshold {
        params.threshold = v;
    }
    if let Some(v) = args.final_weight {
        params.final_weight = v;
    }
    if let Some(v) = args.falloff {
        params.falloff = v.into();
    }
    if let Some(v) = args.discriminant {
        params.discriminant = v.into();
    }
    if let Some(v) = args.rescale {
        params.rescale = v.into();
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> EnhanceArgs {
        let mut argv = vec!["strata", "enhance", "--input", "in.png", "--out-dir", "out"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Enhance(args) => args,
            Commands::Params => panic!("expected enhance"),
        }
    }

    #[test]
    fn test_flags_override_params() {
        let args = parse(&["--alpha", "2.0", "--k", "3", "--rescale", "mean-std"]);
        let params = apply_overrides(EnhanceParams::default(), &args);
        assert_eq!(params.alpha, 2.0);
        assert_eq!(params.k, 3);
        assert_eq!(params.kernel_size, 15);
        assert_eq!(params.rescale, RescalePolicy::MeanStdDev { sigmas: None });
    }

    #[test]
    fn test_out_of_range_flags_are_clamped() {
        let args = parse(&["--kernel-size", "99", "--iterations", "0", "--final-weight", "7"]);
        let params = apply_overrides(EnhanceParams::default(), &args).clamped();
        assert_eq!(params.kernel_size, 50);
        assert_eq!(params.k, 1);
        assert_eq!(params.final_weight, 2.0);
        params.validate().unwrap();
    }

    #[test]
    fn test_policy_flags() {
        let args = parse(&["--discriminant", "within-bound", "--falloff", "exponential-decay"]);
        let params = apply_overrides(EnhanceParams::default(), &args);
        assert_eq!(params.discriminant, DiscriminantPolicy::KeepOriginalWithinBound);
        assert_eq!(params.falloff, KernelFalloff::ExponentialDecay);
    }
}
