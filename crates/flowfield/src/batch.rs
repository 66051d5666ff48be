//! Parallel evaluation of estimate/ground-truth file pairs.
//!
//! Each pair's decode-then-measure pipeline is independent, so the batch is
//! distributed with rayon. A failing item (corrupt file, shape mismatch) is
//! captured in the report and excluded from the aggregate; it never aborts
//! the rest of the batch.

use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::io;
use crate::metrics::{all_measures, FlowMeasures};

/// One estimate/ground-truth file pair to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePair {
    pub estimate: PathBuf,
    pub ground_truth: PathBuf,
}

/// Per-pair result: the measures, or the error that prevented them.
#[derive(Debug, Clone, Serialize)]
pub struct PairOutcome {
    pub pair: FilePair,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measures: Option<FlowMeasures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mean of each measure over items that produced a finite value.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MeanMeasures {
    pub aae: f64,
    pub aee: f64,
    pub bad_pixel: f64,
    pub fl: f64,
}

/// Outcome of a whole batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub items: Vec<PairOutcome>,
    pub evaluated: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<MeanMeasures>,
}

fn evaluate_pair(pair: &FilePair) -> Result<FlowMeasures, String> {
    let estimate = io::read_flow(&pair.estimate).map_err(|e| e.to_string())?;
    let ground_truth = io::read_flow(&pair.ground_truth).map_err(|e| e.to_string())?;
    all_measures(&estimate, &ground_truth).map_err(|e| e.to_string())
}

fn finite_mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        if v.is_finite() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Evaluate every pair, in parallel, and aggregate the per-item measures.
pub fn evaluate_pairs(pairs: &[FilePair]) -> BatchReport {
    let items: Vec<PairOutcome> = pairs
        .par_iter()
        .map(|pair| match evaluate_pair(pair) {
            Ok(measures) => PairOutcome {
                pair: pair.clone(),
                measures: Some(measures),
                error: None,
            },
            Err(error) => {
                tracing::warn!(
                    estimate = %pair.estimate.display(),
                    ground_truth = %pair.ground_truth.display(),
                    %error,
                    "pair evaluation failed"
                );
                PairOutcome {
                    pair: pair.clone(),
                    measures: None,
                    error: Some(error),
                }
            }
        })
        .collect();

    let ok: Vec<&FlowMeasures> = items.iter().filter_map(|i| i.measures.as_ref()).collect();
    let failed = items.len() - ok.len();
    let mean = if ok.is_empty() {
        None
    } else {
        Some(MeanMeasures {
            aae: finite_mean(ok.iter().map(|m| m.aae.value)),
            aee: finite_mean(ok.iter().map(|m| m.aee.value)),
            bad_pixel: finite_mean(ok.iter().map(|m| m.bad_pixel.value)),
            fl: finite_mean(ok.iter().map(|m| m.fl.value)),
        })
    };

    tracing::info!(
        evaluated = ok.len(),
        failed,
        "batch evaluation finished"
    );

    BatchReport {
        evaluated: ok.len(),
        failed,
        items,
        mean,
    }
}
