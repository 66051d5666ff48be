//! flowfield CLI — evaluate flow/disparity/scene-flow estimates against
//! ground truth, inspect and convert field files.

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};

use flowfield::batch::{evaluate_pairs, FilePair};
use flowfield::io::{self, png16};
use flowfield::metrics::sceneflow::{scene_flow_full, SceneFlowFields};
use flowfield::metrics::{all_measures, all_measures_in_area, disparity_error};
use flowfield::Field;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "flowfield")]
#[command(about = "Evaluate dense flow, disparity and scene-flow estimates against ground truth")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a flow estimate: AAE, AEE, BP and Fl.
    Eval(CliEvalArgs),

    /// Evaluate a disparity estimate: D bad-pixel percentage.
    EvalDisp(CliEvalDispArgs),

    /// Evaluate a scene-flow estimate over the full region/occlusion table.
    Sceneflow(CliSceneflowArgs),

    /// Evaluate a list of estimate/ground-truth pairs in parallel.
    Batch(CliBatchArgs),

    /// Print shape and value statistics of a field file.
    Info(CliInfoArgs),

    /// Decode a field file and re-encode it in the format of the output path.
    Convert(CliConvertArgs),
}

#[derive(Debug, Clone, Args)]
struct CliEvalArgs {
    /// Path to the estimated flow (.flo, .png or .mat).
    #[arg(long)]
    estimate: PathBuf,

    /// Path to the ground-truth flow.
    #[arg(long)]
    ground_truth: PathBuf,

    /// Optional evaluation-area mask (grayscale PNG, nonzero = evaluate).
    #[arg(long)]
    area: Option<PathBuf>,

    /// Path to write the measures as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliEvalDispArgs {
    /// Path to the estimated disparity (.png).
    #[arg(long)]
    estimate: PathBuf,

    /// Path to the ground-truth disparity.
    #[arg(long)]
    ground_truth: PathBuf,

    /// Path to write the result as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliSceneflowArgs {
    /// Estimated disparity at the first frame.
    #[arg(long)]
    disp0: PathBuf,

    /// Estimated disparity at the second frame.
    #[arg(long)]
    disp1: PathBuf,

    /// Estimated flow.
    #[arg(long)]
    flow: PathBuf,

    /// Non-occluded ground-truth disparity at the first frame.
    #[arg(long)]
    gt_noc_disp0: PathBuf,

    /// Non-occluded ground-truth disparity at the second frame.
    #[arg(long)]
    gt_noc_disp1: PathBuf,

    /// Non-occluded ground-truth flow.
    #[arg(long)]
    gt_noc_flow: PathBuf,

    /// Occluded ground-truth disparity at the first frame.
    #[arg(long)]
    gt_occ_disp0: PathBuf,

    /// Occluded ground-truth disparity at the second frame.
    #[arg(long)]
    gt_occ_disp1: PathBuf,

    /// Occluded ground-truth flow.
    #[arg(long)]
    gt_occ_flow: PathBuf,

    /// Foreground/background object map (grayscale PNG, nonzero = foreground).
    #[arg(long)]
    object_map: PathBuf,

    /// Path to write the full table as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliBatchArgs {
    /// Pairs file: one `estimate ground-truth` pair of paths per line.
    #[arg(long)]
    pairs: PathBuf,

    /// Path to write the batch report as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliInfoArgs {
    /// Path to the field file.
    #[arg(long)]
    file: PathBuf,

    /// Decode as disparity instead of flow.
    #[arg(long)]
    disparity: bool,
}

#[derive(Debug, Clone, Args)]
struct CliConvertArgs {
    /// Input field file.
    #[arg(long)]
    input: PathBuf,

    /// Output field file; the suffix selects the output format.
    #[arg(long)]
    output: PathBuf,

    /// Treat both files as disparity instead of flow.
    #[arg(long)]
    disparity: bool,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval(args) => run_eval(&args),
        Commands::EvalDisp(args) => run_eval_disp(&args),
        Commands::Sceneflow(args) => run_sceneflow(&args),
        Commands::Batch(args) => run_batch(&args),
        Commands::Info(args) => run_info(&args),
        Commands::Convert(args) => run_convert(&args),
    }
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> CliResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

// ── eval ───────────────────────────────────────────────────────────────────

fn run_eval(args: &CliEvalArgs) -> CliResult<()> {
    let estimate = io::read_flow(&args.estimate)?;
    let ground_truth = io::read_flow(&args.ground_truth)?;

    let measures = match &args.area {
        Some(area_path) => {
            let area = png16::read_mask_png(area_path)?;
            all_measures_in_area(&estimate, &ground_truth, &area)?
        }
        None => all_measures(&estimate, &ground_truth)?,
    };

    println!("{}", measures);
    println!("valid pixels: {}", measures.aee.valid_count);

    if let Some(out) = &args.out {
        write_json(&measures, out)?;
    }
    Ok(())
}

// ── eval-disp ──────────────────────────────────────────────────────────────

fn run_eval_disp(args: &CliEvalDispArgs) -> CliResult<()> {
    let estimate = io::read_disparity(&args.estimate)?;
    let ground_truth = io::read_disparity(&args.ground_truth)?;

    let result = disparity_error(&estimate, &ground_truth)?;
    println!("D:   {:.2}", result.value);
    println!("valid pixels: {}", result.valid_count);

    if let Some(out) = &args.out {
        write_json(&result, out)?;
    }
    Ok(())
}

// ── sceneflow ──────────────────────────────────────────────────────────────

fn run_sceneflow(args: &CliSceneflowArgs) -> CliResult<()> {
    let est_disp0 = io::read_disparity(&args.disp0)?;
    let est_disp1 = io::read_disparity(&args.disp1)?;
    let est_flow = io::read_flow(&args.flow)?;

    let noc_disp0 = io::read_disparity(&args.gt_noc_disp0)?;
    let noc_disp1 = io::read_disparity(&args.gt_noc_disp1)?;
    let noc_flow = io::read_flow(&args.gt_noc_flow)?;

    let occ_disp0 = io::read_disparity(&args.gt_occ_disp0)?;
    let occ_disp1 = io::read_disparity(&args.gt_occ_disp1)?;
    let occ_flow = io::read_flow(&args.gt_occ_flow)?;

    let object_map = png16::read_mask_png(&args.object_map)?;

    let table = scene_flow_full(
        &SceneFlowFields {
            disp0: &est_disp0,
            disp1: &est_disp1,
            flow: &est_flow,
        },
        &SceneFlowFields {
            disp0: &noc_disp0,
            disp1: &noc_disp1,
            flow: &noc_flow,
        },
        &SceneFlowFields {
            disp0: &occ_disp0,
            disp1: &occ_disp1,
            flow: &occ_flow,
        },
        &object_map,
    )?;

    println!("region      regime    D1      D2      Fl      SF");
    for (region, pair) in [
        ("foreground", &table.foreground),
        ("background", &table.background),
        ("all", &table.all),
    ] {
        for (regime, errors) in [("noc", &pair.noc), ("occ", &pair.occ)] {
            println!(
                "{:<11} {:<6} {:>7.2} {:>7.2} {:>7.2} {:>7.2}",
                region, regime, errors.d1.value, errors.d2.value, errors.fl.value, errors.sf.value
            );
        }
    }

    if let Some(out) = &args.out {
        write_json(&table, out)?;
    }
    Ok(())
}

// ── batch ──────────────────────────────────────────────────────────────────

fn parse_pairs_file(path: &Path) -> CliResult<Vec<FilePair>> {
    let text = std::fs::read_to_string(path)?;
    let mut pairs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(estimate), Some(ground_truth), None) => pairs.push(FilePair {
                estimate: PathBuf::from(estimate),
                ground_truth: PathBuf::from(ground_truth),
            }),
            _ => {
                return Err(format!(
                    "{}:{}: expected `estimate ground-truth`, got {:?}",
                    path.display(),
                    lineno + 1,
                    line
                )
                .into())
            }
        }
    }
    Ok(pairs)
}

fn run_batch(args: &CliBatchArgs) -> CliResult<()> {
    let pairs = parse_pairs_file(&args.pairs)?;
    let report = evaluate_pairs(&pairs);

    println!("evaluated: {}", report.evaluated);
    println!("failed:    {}", report.failed);
    if let Some(mean) = &report.mean {
        println!("mean AAE: {:.2}", mean.aae);
        println!("mean AEE: {:.2}", mean.aee);
        println!("mean BP:  {:.2}", mean.bad_pixel);
        println!("mean Fl:  {:.2}", mean.fl);
    }

    if let Some(out) = &args.out {
        write_json(&report, out)?;
    }
    Ok(())
}

// ── info ───────────────────────────────────────────────────────────────────

fn channel_range(field: &Field, channel: usize) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for y in 0..field.height() {
        for x in 0..field.width() {
            let v = field.get(y, x, channel);
            if !v.is_nan() {
                min = min.min(v);
                max = max.max(v);
            }
        }
    }
    (min, max)
}

fn run_info(args: &CliInfoArgs) -> CliResult<()> {
    let field = if args.disparity {
        io::read_disparity(&args.file)?
    } else {
        io::read_flow(&args.file)?
    };

    let (h, w, c) = field.shape();
    println!("{}", args.file.display());
    println!("  size:         {}x{}", w, h);
    println!("  channels:     {}", c);
    println!(
        "  valid pixels: {} / {}",
        field.valid_count(),
        h * w
    );
    for channel in 0..c {
        let (min, max) = channel_range(&field, channel);
        println!("  channel {}:    [{:.3}, {:.3}]", channel, min, max);
    }
    Ok(())
}

// ── convert ────────────────────────────────────────────────────────────────

fn run_convert(args: &CliConvertArgs) -> CliResult<()> {
    if args.disparity {
        let field = io::read_disparity(&args.input)?;
        io::write_disparity(&field, &args.output)?;
    } else {
        let field = io::read_flow(&args.input)?;
        io::write_flow(&field, &args.output)?;
    }
    println!(
        "{} -> {}",
        args.input.display(),
        args.output.display()
    );
    Ok(())
}
