//! Error measures between an estimated field and a ground-truth field.
//!
//! All measures:
//! - **EE** — per-pixel endpoint error (Euclidean distance over channels).
//! - **AEE** — average endpoint error over valid pixels.
//! - **AAE** — average angular error in degrees, from the 3D angle between
//!   `(u, v, 1)` vectors.
//! - **BP / Fl** — percentage of valid pixels whose endpoint error exceeds
//!   an absolute threshold (BP), optionally AND a relative one (Fl).
//! - **Disparity error** — single-channel analogue of Fl.
//! - [`sceneflow`] — composite scene-flow metric over disparity/flow triples.
//!
//! A pixel with invalid (NaN) ground truth is excluded from every aggregate;
//! invalid estimates are excluded through NaN propagation into the per-pixel
//! quantity. Every aggregate carries the valid-pixel count it was normalized
//! by; a zero count yields a NaN value rather than an error so that batch
//! runs tolerate degenerate inputs.

pub mod sceneflow;

use serde::{Deserialize, Serialize};

use crate::field::{Field, Mask};

/// Absolute endpoint-error threshold of the bad-pixel measures.
pub const BAD_PIXEL_ABS_THRESH: f64 = 3.0;

/// Relative threshold of the KITTI-style bad-pixel measure: 5% of the
/// ground-truth magnitude.
pub const BAD_PIXEL_REL_THRESH: f64 = 0.05;

// ── Error type ─────────────────────────────────────────────────────────────

/// Validation failures between estimate, ground truth and masks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    /// Estimate and ground truth disagree in shape.
    ShapeMismatch {
        estimate: (usize, usize, usize),
        ground_truth: (usize, usize, usize),
    },
    /// A field has the wrong channel count for the requested measure.
    ChannelCount { expected: usize, got: usize },
    /// A caller-supplied mask does not match the field grid.
    MaskShape {
        expected: (usize, usize),
        got: (usize, usize),
    },
}

impl std::fmt::Display for MetricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeMismatch {
                estimate,
                ground_truth,
            } => write!(
                f,
                "shape mismatch: estimate {}x{}x{}, ground truth {}x{}x{}",
                estimate.0, estimate.1, estimate.2, ground_truth.0, ground_truth.1, ground_truth.2
            ),
            Self::ChannelCount { expected, got } => {
                write!(f, "need {} channels, got {}", expected, got)
            }
            Self::MaskShape { expected, got } => write!(
                f,
                "mask shape mismatch: need {}x{}, got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
        }
    }
}

impl std::error::Error for MetricError {}

// ── Result types ───────────────────────────────────────────────────────────

/// A scalar measure paired with the valid-pixel count it was normalized by.
///
/// `value` is NaN when `valid_count` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub value: f64,
    pub valid_count: usize,
}

impl Aggregate {
    fn ratio(sum: f64, count: usize) -> Self {
        let value = if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        };
        Self {
            value,
            valid_count: count,
        }
    }

    fn percentage(hits: usize, count: usize) -> Self {
        let value = if count == 0 {
            f64::NAN
        } else {
            100.0 * hits as f64 / count as f64
        };
        Self {
            value,
            valid_count: count,
        }
    }
}

/// AAE, AEE, BP and Fl of one estimate/ground-truth pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowMeasures {
    pub aae: Aggregate,
    pub aee: Aggregate,
    pub bad_pixel: Aggregate,
    pub fl: Aggregate,
}

impl std::fmt::Display for FlowMeasures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "AAE: {:.2}", self.aae.value)?;
        writeln!(f, "AEE: {:.2}", self.aee.value)?;
        writeln!(f, "BP:  {:.2}", self.bad_pixel.value)?;
        write!(f, "Fl:  {:.2}", self.fl.value)
    }
}

// ── Shape checks ───────────────────────────────────────────────────────────

fn check_same_shape(estimate: &Field, ground_truth: &Field) -> Result<(), MetricError> {
    if estimate.shape() != ground_truth.shape() {
        return Err(MetricError::ShapeMismatch {
            estimate: estimate.shape(),
            ground_truth: ground_truth.shape(),
        });
    }
    Ok(())
}

fn check_channels(field: &Field, expected: usize) -> Result<(), MetricError> {
    if field.channels() != expected {
        return Err(MetricError::ChannelCount {
            expected,
            got: field.channels(),
        });
    }
    Ok(())
}

fn check_mask_shape(field: &Field, mask: &Mask) -> Result<(), MetricError> {
    if (mask.height(), mask.width()) != (field.height(), field.width()) {
        return Err(MetricError::MaskShape {
            expected: (field.height(), field.width()),
            got: (mask.height(), mask.width()),
        });
    }
    Ok(())
}

// ── Endpoint error ─────────────────────────────────────────────────────────

/// Per-pixel endpoint error: Euclidean distance over channels.
///
/// NaN wherever either operand pixel is invalid; returned as a 1-channel
/// field for reuse as a precomputed input to the aggregates below.
pub fn endpoint_error(estimate: &Field, ground_truth: &Field) -> Result<Field, MetricError> {
    check_same_shape(estimate, ground_truth)?;
    let (h, w, c) = estimate.shape();
    let mut ee = Field::filled(h, w, 1, f64::NAN);
    for y in 0..h {
        for x in 0..w {
            let mut sq = 0.0;
            for ch in 0..c {
                let d = estimate.get(y, x, ch) - ground_truth.get(y, x, ch);
                sq += d * d;
            }
            ee.set(y, x, 0, sq.sqrt());
        }
    }
    Ok(ee)
}

fn resolve_ee<'a>(
    estimate: &Field,
    ground_truth: &Field,
    precomputed: Option<&'a Field>,
    storage: &'a mut Option<Field>,
) -> Result<&'a Field, MetricError> {
    match precomputed {
        Some(ee) => {
            check_channels(ee, 1)?;
            if (ee.height(), ee.width()) != (ground_truth.height(), ground_truth.width()) {
                return Err(MetricError::ShapeMismatch {
                    estimate: ee.shape(),
                    ground_truth: ground_truth.shape(),
                });
            }
            Ok(ee)
        }
        None => Ok(&*storage.insert(endpoint_error(estimate, ground_truth)?)),
    }
}

/// Average endpoint error (AEE, sometimes EPE) over valid pixels.
pub fn average_endpoint_error(
    estimate: &Field,
    ground_truth: &Field,
    precomputed_ee: Option<&Field>,
) -> Result<Aggregate, MetricError> {
    check_same_shape(estimate, ground_truth)?;
    let mut storage = None;
    let ee = resolve_ee(estimate, ground_truth, precomputed_ee, &mut storage)?;

    let mut sum = 0.0;
    let mut count = 0usize;
    for &e in ee.samples() {
        if !e.is_nan() {
            sum += e;
            count += 1;
        }
    }
    Ok(Aggregate::ratio(sum, count))
}

// ── Angular error ──────────────────────────────────────────────────────────

/// Average angular error in degrees between 2-channel flow fields.
///
/// The angle is measured between the 3D vectors `(u, v, 1)`, so zero-length
/// flow is well defined. The arccos argument is clamped to `[-1, 1]`; NaN
/// arguments count as angle 0 and are excluded from the valid count.
pub fn average_angular_error(
    estimate: &Field,
    ground_truth: &Field,
) -> Result<Aggregate, MetricError> {
    check_same_shape(estimate, ground_truth)?;
    check_channels(estimate, 2)?;

    let (h, w, _) = estimate.shape();
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in 0..h {
        for x in 0..w {
            let (fu, fv) = (estimate.get(y, x, 0), estimate.get(y, x, 1));
            let (gu, gv) = (ground_truth.get(y, x, 0), ground_truth.get(y, x, 1));

            let dot = fu * gu + fv * gv + 1.0;
            if !dot.is_nan() {
                count += 1;
            }

            let denom = (fu * fu + fv * fv + 1.0).sqrt() * (gu * gu + gv * gv + 1.0).sqrt();
            let mut arg = dot / denom;
            if arg.is_nan() {
                arg = 1.0; // arccos(1) = 0
            }
            sum += arg.clamp(-1.0, 1.0).acos();
        }
    }
    Ok(Aggregate::ratio(sum.to_degrees(), count))
}

// ── Bad pixel / Fl ─────────────────────────────────────────────────────────

/// Options of the bad-pixel measures.
#[derive(Debug, Clone, Copy, Default)]
pub struct BadPixelOptions<'a> {
    /// Additionally require the endpoint error to exceed 5% of the
    /// ground-truth magnitude (KITTI-style Fl).
    ///
    /// The combination with the absolute threshold is a logical AND; this
    /// only makes a difference where the ground-truth magnitude exceeds
    /// 60 px. The AND-vs-OR choice is contested in the benchmark
    /// literature; this matches the established evaluation tooling.
    pub relative_threshold: bool,
    /// Reuse a previously computed endpoint-error field.
    pub precomputed_ee: Option<&'a Field>,
}

fn ground_truth_magnitude(ground_truth: &Field, y: usize, x: usize) -> f64 {
    let mut sq = 0.0;
    for c in 0..ground_truth.channels() {
        let v = ground_truth.get(y, x, c);
        sq += v * v;
    }
    let mag = sq.sqrt();
    if mag.is_nan() {
        0.0
    } else {
        mag
    }
}

fn bad_pixel_parts(
    estimate: &Field,
    ground_truth: &Field,
    options: BadPixelOptions<'_>,
) -> Result<(Mask, usize), MetricError> {
    check_same_shape(estimate, ground_truth)?;
    let mut storage = None;
    let ee = resolve_ee(estimate, ground_truth, options.precomputed_ee, &mut storage)?;

    let (h, w) = (ground_truth.height(), ground_truth.width());
    let mut mask = Mask::filled(h, w, false);
    let mut count = 0usize;
    for y in 0..h {
        for x in 0..w {
            let raw = ee.get(y, x, 0);
            if !raw.is_nan() {
                count += 1;
            }
            let e = if raw.is_nan() { 0.0 } else { raw };

            let mut bad = e > BAD_PIXEL_ABS_THRESH;
            if bad && options.relative_threshold {
                bad = e > BAD_PIXEL_REL_THRESH * ground_truth_magnitude(ground_truth, y, x);
            }
            mask.set(y, x, bad);
        }
    }
    Ok((mask, count))
}

/// Bad-pixel percentage over valid pixels.
pub fn bad_pixel(
    estimate: &Field,
    ground_truth: &Field,
    options: BadPixelOptions<'_>,
) -> Result<Aggregate, MetricError> {
    let (mask, count) = bad_pixel_parts(estimate, ground_truth, options)?;
    Ok(Aggregate::percentage(mask.count_true(), count))
}

/// Per-pixel bad-pixel mask plus the valid-pixel count.
///
/// The mask is false at invalid ground-truth pixels; the scene-flow
/// composite reuses it directly.
pub fn bad_pixel_mask(
    estimate: &Field,
    ground_truth: &Field,
    options: BadPixelOptions<'_>,
) -> Result<(Mask, usize), MetricError> {
    bad_pixel_parts(estimate, ground_truth, options)
}

/// Fl: bad-pixel percentage with the relative threshold enabled.
pub fn fl_error(
    estimate: &Field,
    ground_truth: &Field,
    precomputed_ee: Option<&Field>,
) -> Result<Aggregate, MetricError> {
    bad_pixel(
        estimate,
        ground_truth,
        BadPixelOptions {
            relative_threshold: true,
            precomputed_ee,
        },
    )
}

// ── Disparity error ────────────────────────────────────────────────────────

fn disparity_parts(
    estimate: &Field,
    ground_truth: &Field,
) -> Result<(Mask, usize), MetricError> {
    check_same_shape(estimate, ground_truth)?;
    check_channels(estimate, 1)?;

    let (h, w) = (ground_truth.height(), ground_truth.width());
    let mut mask = Mask::filled(h, w, false);
    let mut count = 0usize;
    for y in 0..h {
        for x in 0..w {
            let raw = (estimate.get(y, x, 0) - ground_truth.get(y, x, 0)).abs();
            if !raw.is_nan() {
                count += 1;
            }
            let e = if raw.is_nan() { 0.0 } else { raw };

            let gt = ground_truth.get(y, x, 0);
            let mag = if gt.is_nan() { 0.0 } else { gt.abs() };
            mask.set(
                y,
                x,
                e > BAD_PIXEL_ABS_THRESH && e > BAD_PIXEL_REL_THRESH * mag,
            );
        }
    }
    Ok((mask, count))
}

/// Disparity bad-pixel percentage: absolute error above 3.0 AND above 5% of
/// the ground-truth disparity magnitude.
pub fn disparity_error(estimate: &Field, ground_truth: &Field) -> Result<Aggregate, MetricError> {
    let (mask, count) = disparity_parts(estimate, ground_truth)?;
    Ok(Aggregate::percentage(mask.count_true(), count))
}

/// Per-pixel disparity bad-pixel mask plus the valid-pixel count.
pub fn disparity_error_mask(
    estimate: &Field,
    ground_truth: &Field,
) -> Result<(Mask, usize), MetricError> {
    disparity_parts(estimate, ground_truth)
}

// ── Measure bundles ────────────────────────────────────────────────────────

/// AAE, AEE, BP and Fl with a single shared endpoint-error pass.
pub fn all_measures(
    estimate: &Field,
    ground_truth: &Field,
) -> Result<FlowMeasures, MetricError> {
    let ee = endpoint_error(estimate, ground_truth)?;
    Ok(FlowMeasures {
        aae: average_angular_error(estimate, ground_truth)?,
        aee: average_endpoint_error(estimate, ground_truth, Some(&ee))?,
        bad_pixel: bad_pixel(
            estimate,
            ground_truth,
            BadPixelOptions {
                relative_threshold: false,
                precomputed_ee: Some(&ee),
            },
        )?,
        fl: fl_error(estimate, ground_truth, Some(&ee))?,
    })
}

/// The measure bundle restricted to `area`.
///
/// Ground truth outside the area is NaN-masked on a private copy — the
/// caller's field is never mutated. This is the uniform mechanism behind
/// every "evaluate only here" use, including the scene-flow partitions.
pub fn all_measures_in_area(
    estimate: &Field,
    ground_truth: &Field,
    area: &Mask,
) -> Result<FlowMeasures, MetricError> {
    check_mask_shape(ground_truth, area)?;
    let masked = ground_truth
        .masked_outside(area)
        .map_err(|_| MetricError::MaskShape {
            expected: (ground_truth.height(), ground_truth.width()),
            got: (area.height(), area.width()),
        })?;
    all_measures(estimate, &masked)
}

// ── Named-metric dispatch ──────────────────────────────────────────────────

/// Metric selector for the generic [`compute`] entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    AverageAngularError,
    AverageEndpointError,
    BadPixel,
    Fl,
    DisparityError,
}

/// Options of the generic [`compute`] entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricOptions<'a> {
    /// Return the per-pixel mask instead of the aggregate where the metric
    /// has one (BP, Fl, disparity). Ignored for AAE/AEE.
    pub return_mask: bool,
    /// Reuse a previously computed endpoint-error field (BP, Fl, AEE).
    pub precomputed_ee: Option<&'a Field>,
}

/// Scalar-or-mask result of [`compute`]; both carry the valid-pixel count.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutput {
    Scalar(Aggregate),
    Mask { mask: Mask, valid_count: usize },
}

/// Single entry point used by batch drivers and viewers.
pub fn compute(
    metric: Metric,
    estimate: &Field,
    ground_truth: &Field,
    options: MetricOptions<'_>,
) -> Result<MetricOutput, MetricError> {
    let bp_options = |relative| BadPixelOptions {
        relative_threshold: relative,
        precomputed_ee: options.precomputed_ee,
    };
    match metric {
        Metric::AverageAngularError => Ok(MetricOutput::Scalar(average_angular_error(
            estimate,
            ground_truth,
        )?)),
        Metric::AverageEndpointError => Ok(MetricOutput::Scalar(average_endpoint_error(
            estimate,
            ground_truth,
            options.precomputed_ee,
        )?)),
        Metric::BadPixel | Metric::Fl => {
            let relative = metric == Metric::Fl;
            if options.return_mask {
                let (mask, valid_count) =
                    bad_pixel_mask(estimate, ground_truth, bp_options(relative))?;
                Ok(MetricOutput::Mask { mask, valid_count })
            } else {
                Ok(MetricOutput::Scalar(bad_pixel(
                    estimate,
                    ground_truth,
                    bp_options(relative),
                )?))
            }
        }
        Metric::DisparityError => {
            if options.return_mask {
                let (mask, valid_count) = disparity_error_mask(estimate, ground_truth)?;
                Ok(MetricOutput::Mask { mask, valid_count })
            } else {
                Ok(MetricOutput::Scalar(disparity_error(estimate, ground_truth)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::uniform_flow;
    use approx::assert_abs_diff_eq;

    #[test]
    fn known_vector_scenario() {
        // estimate (3,4) vs ground truth (0,0) at a single valid pixel
        let est = uniform_flow(1, 1, 3.0, 4.0);
        let gt = uniform_flow(1, 1, 0.0, 0.0);

        let ee = endpoint_error(&est, &gt).unwrap();
        assert_abs_diff_eq!(ee.get(0, 0, 0), 5.0);

        let aee = average_endpoint_error(&est, &gt, None).unwrap();
        assert_abs_diff_eq!(aee.value, 5.0);
        assert_eq!(aee.valid_count, 1);

        let bp = bad_pixel(&est, &gt, BadPixelOptions::default()).unwrap();
        assert_abs_diff_eq!(bp.value, 100.0);
    }

    #[test]
    fn invalid_ground_truth_is_excluded_from_counts() {
        let est = uniform_flow(1, 3, 1.0, 0.0);
        let mut gt = uniform_flow(1, 3, 1.0, 0.0);
        gt.invalidate_pixel(0, 2);

        let aee = average_endpoint_error(&est, &gt, None).unwrap();
        assert_eq!(aee.valid_count, 2);
        assert_abs_diff_eq!(aee.value, 0.0);

        let aae = average_angular_error(&est, &gt).unwrap();
        assert_eq!(aae.valid_count, 2);

        let (mask, count) = bad_pixel_mask(&est, &gt, BadPixelOptions::default()).unwrap();
        assert_eq!(count, 2);
        assert!(!mask.get(0, 2));
    }

    #[test]
    fn all_nan_ground_truth_yields_nan_not_a_crash() {
        let est = uniform_flow(2, 2, 1.0, 1.0);
        let gt = Field::filled(2, 2, 2, f64::NAN);

        let aee = average_endpoint_error(&est, &gt, None).unwrap();
        assert!(aee.value.is_nan());
        assert_eq!(aee.valid_count, 0);

        let bp = bad_pixel(&est, &gt, BadPixelOptions::default()).unwrap();
        assert!(bp.value.is_nan());
        assert_eq!(bp.valid_count, 0);

        let aae = average_angular_error(&est, &gt).unwrap();
        assert!(aae.value.is_nan());
    }

    #[test]
    fn invalid_estimate_propagates_out_of_the_count() {
        let mut est = uniform_flow(1, 2, 1.0, 0.0);
        est.invalidate_pixel(0, 0);
        let gt = uniform_flow(1, 2, 1.0, 0.0);

        let aee = average_endpoint_error(&est, &gt, None).unwrap();
        assert_eq!(aee.valid_count, 1);
        assert_abs_diff_eq!(aee.value, 0.0);
    }

    #[test]
    fn aae_is_zero_for_identical_fields() {
        let est = uniform_flow(3, 3, 2.0, -1.0);
        let aae = average_angular_error(&est, &est).unwrap();
        assert_abs_diff_eq!(aae.value, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn aae_of_known_angle() {
        // (1,0,1) against (0,0,1): cos = 1/sqrt(2), i.e. 45 degrees
        let est = uniform_flow(1, 1, 1.0, 0.0);
        let gt = uniform_flow(1, 1, 0.0, 0.0);
        let aae = average_angular_error(&est, &gt).unwrap();
        assert_abs_diff_eq!(aae.value, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn aae_stays_within_bounds() {
        let est = uniform_flow(1, 1, 1000.0, 0.0);
        let gt = uniform_flow(1, 1, -1000.0, 0.0);
        let aae = average_angular_error(&est, &gt).unwrap();
        assert!(aae.value >= 0.0 && aae.value <= 180.0);
        assert!(aae.value > 90.0);
    }

    #[test]
    fn bad_pixel_is_monotone_under_error_inflation() {
        let gt = uniform_flow(2, 2, 0.0, 0.0);
        let small = uniform_flow(2, 2, 2.5, 0.0);
        let large = uniform_flow(2, 2, 3.5, 0.0);
        let bp_small = bad_pixel(&small, &gt, BadPixelOptions::default()).unwrap();
        let bp_large = bad_pixel(&large, &gt, BadPixelOptions::default()).unwrap();
        assert!(bp_large.value >= bp_small.value);
        assert_abs_diff_eq!(bp_small.value, 0.0);
        assert_abs_diff_eq!(bp_large.value, 100.0);
    }

    #[test]
    fn relative_threshold_is_an_and_not_an_or() {
        // ee = 4 exceeds the absolute threshold but not 5% of |gt| = 100
        let gt = uniform_flow(1, 1, 100.0, 0.0);
        let est = uniform_flow(1, 1, 104.0, 0.0);

        let plain = bad_pixel(&est, &gt, BadPixelOptions::default()).unwrap();
        assert_abs_diff_eq!(plain.value, 100.0);

        let fl = fl_error(&est, &gt, None).unwrap();
        assert_abs_diff_eq!(fl.value, 0.0);
    }

    #[test]
    fn precomputed_ee_matches_the_direct_path() {
        let est = uniform_flow(2, 3, 4.0, 1.0);
        let gt = uniform_flow(2, 3, 0.5, 0.5);
        let ee = endpoint_error(&est, &gt).unwrap();

        let direct = bad_pixel(&est, &gt, BadPixelOptions::default()).unwrap();
        let reused = bad_pixel(
            &est,
            &gt,
            BadPixelOptions {
                relative_threshold: false,
                precomputed_ee: Some(&ee),
            },
        )
        .unwrap();
        assert_eq!(direct, reused);
    }

    #[test]
    fn disparity_error_known_case() {
        let est = Field::filled(1, 2, 1, 10.0);
        let mut gt = Field::filled(1, 2, 1, 5.0);
        gt.set(0, 1, 0, 9.0);

        // pixel 0: error 5 > 3 and 5 > 0.25  → bad
        // pixel 1: error 1 fails the absolute threshold
        let err = disparity_error(&est, &gt).unwrap();
        assert_abs_diff_eq!(err.value, 50.0);
        assert_eq!(err.valid_count, 2);
    }

    #[test]
    fn shape_and_channel_mismatches_are_validation_errors() {
        let est = uniform_flow(2, 2, 0.0, 0.0);
        let gt = uniform_flow(2, 3, 0.0, 0.0);
        assert!(matches!(
            average_endpoint_error(&est, &gt, None).unwrap_err(),
            MetricError::ShapeMismatch { .. }
        ));

        let disp = Field::filled(2, 2, 1, 0.0);
        assert!(matches!(
            average_angular_error(&disp, &disp).unwrap_err(),
            MetricError::ChannelCount { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn area_restriction_masks_a_private_copy() {
        let est = uniform_flow(1, 2, 5.0, 0.0);
        let mut gt = uniform_flow(1, 2, 0.0, 0.0);
        gt.set(0, 1, 0, 5.0);
        let mut area = Mask::filled(1, 2, false);
        area.set(0, 0, true);

        let m = all_measures_in_area(&est, &gt, &area).unwrap();
        assert_eq!(m.aee.valid_count, 1);
        assert_abs_diff_eq!(m.aee.value, 5.0);
        // the caller's ground truth is untouched
        assert_eq!(gt.valid_count(), 2);
    }

    #[test]
    fn compute_dispatch_agrees_with_typed_calls() {
        let est = uniform_flow(2, 2, 4.0, 0.0);
        let gt = uniform_flow(2, 2, 0.0, 0.0);

        match compute(Metric::BadPixel, &est, &gt, MetricOptions::default()).unwrap() {
            MetricOutput::Scalar(agg) => assert_abs_diff_eq!(agg.value, 100.0),
            other => panic!("unexpected output: {other:?}"),
        }

        let opts = MetricOptions {
            return_mask: true,
            ..Default::default()
        };
        match compute(Metric::Fl, &est, &gt, opts).unwrap() {
            MetricOutput::Mask { mask, valid_count } => {
                assert_eq!(valid_count, 4);
                assert_eq!(mask.count_true(), 4);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
