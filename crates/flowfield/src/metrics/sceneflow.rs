//! Composite scene-flow metric over disparity/flow triples.
//!
//! A scene-flow estimate is two disparity fields (frames t0 and t1) plus one
//! 2D flow field. Per evaluated region the metric reports:
//!
//! - **D1 / D2** — disparity bad-pixel percentage at t0 / t1,
//! - **Fl** — flow bad-pixel percentage (relative threshold enabled),
//! - **SF** — percentage of pixels valid in all three ground-truth channels
//!   where *any* of the three per-channel masks is bad (logical OR across
//!   channels — unlike the AND of the absolute/relative criteria inside one
//!   channel).
//!
//! Region restriction (object map, caller-supplied evaluation mask) removes
//! a pixel from both numerator and denominator of every figure.

use serde::{Deserialize, Serialize};

use crate::field::{Field, Mask};
use crate::metrics::{
    bad_pixel_mask, disparity_error_mask, Aggregate, BadPixelOptions, MetricError,
};

/// Borrowed disparity/disparity/flow triple, estimate or ground truth.
#[derive(Debug, Clone, Copy)]
pub struct SceneFlowFields<'a> {
    /// Disparity at the first frame, 1 channel.
    pub disp0: &'a Field,
    /// Disparity at the second frame, 1 channel.
    pub disp1: &'a Field,
    /// Optical flow between the frames, 2 channels.
    pub flow: &'a Field,
}

/// D1/D2/Fl/SF percentages of one evaluated region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionErrors {
    pub d1: Aggregate,
    pub d2: Aggregate,
    pub fl: Aggregate,
    pub sf: Aggregate,
}

/// Region results under both occlusion regimes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OcclusionPair {
    /// Against the non-occluded ground truth.
    pub noc: RegionErrors,
    /// Against the all-pixels (occluded) ground truth.
    pub occ: RegionErrors,
}

/// The full {foreground, background, all} × {noc, occ} result table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneFlowTable {
    pub foreground: OcclusionPair,
    pub background: OcclusionPair,
    pub all: OcclusionPair,
}

fn check_triple(fields: &SceneFlowFields<'_>) -> Result<(), MetricError> {
    let (h, w, _) = fields.disp0.shape();
    for (field, channels) in [
        (fields.disp0, 1usize),
        (fields.disp1, 1),
        (fields.flow, 2),
    ] {
        if field.channels() != channels {
            return Err(MetricError::ChannelCount {
                expected: channels,
                got: field.channels(),
            });
        }
        if (field.height(), field.width()) != (h, w) {
            return Err(MetricError::ShapeMismatch {
                estimate: field.shape(),
                ground_truth: (h, w, channels),
            });
        }
    }
    Ok(())
}

/// Scene-flow errors of one estimate against one ground-truth triple,
/// optionally restricted to `eval_mask`.
pub fn scene_flow_error(
    estimate: &SceneFlowFields<'_>,
    ground_truth: &SceneFlowFields<'_>,
    eval_mask: Option<&Mask>,
) -> Result<RegionErrors, MetricError> {
    check_triple(estimate)?;
    check_triple(ground_truth)?;

    let (h, w) = (ground_truth.disp0.height(), ground_truth.disp0.width());
    if (estimate.disp0.height(), estimate.disp0.width()) != (h, w) {
        return Err(MetricError::ShapeMismatch {
            estimate: estimate.disp0.shape(),
            ground_truth: ground_truth.disp0.shape(),
        });
    }
    if let Some(mask) = eval_mask {
        if (mask.height(), mask.width()) != (h, w) {
            return Err(MetricError::MaskShape {
                expected: (h, w),
                got: (mask.height(), mask.width()),
            });
        }
    }

    let (mut d0_mask, _) = disparity_error_mask(estimate.disp0, ground_truth.disp0)?;
    let (mut d1_mask, _) = disparity_error_mask(estimate.disp1, ground_truth.disp1)?;
    let (mut fl_mask, _) = bad_pixel_mask(
        estimate.flow,
        ground_truth.flow,
        BadPixelOptions {
            relative_threshold: true,
            precomputed_ee: None,
        },
    )?;

    let mut d0_valid = ground_truth.disp0.validity();
    let mut d1_valid = ground_truth.disp1.validity();
    let mut fl_valid = ground_truth.flow.validity();
    let mut valid = d0_valid.and(&d1_valid).and(&fl_valid);

    if let Some(mask) = eval_mask {
        valid = valid.and(mask);
        d0_valid = d0_valid.and(mask);
        d1_valid = d1_valid.and(mask);
        fl_valid = fl_valid.and(mask);
        d0_mask = d0_mask.and(mask);
        d1_mask = d1_mask.and(mask);
        fl_mask = fl_mask.and(mask);
    }

    let sf_mask = d0_mask.or(&d1_mask).or(&fl_mask).and(&valid);

    Ok(RegionErrors {
        d1: Aggregate::percentage(d0_mask.count_true(), d0_valid.count_true()),
        d2: Aggregate::percentage(d1_mask.count_true(), d1_valid.count_true()),
        fl: Aggregate::percentage(fl_mask.count_true(), fl_valid.count_true()),
        sf: Aggregate::percentage(sf_mask.count_true(), valid.count_true()),
    })
}

/// Full scene-flow evaluation: both occlusion regimes over the foreground,
/// background and whole-image regions of `object_mask`.
pub fn scene_flow_full(
    estimate: &SceneFlowFields<'_>,
    gt_noc: &SceneFlowFields<'_>,
    gt_occ: &SceneFlowFields<'_>,
    object_mask: &Mask,
) -> Result<SceneFlowTable, MetricError> {
    let background = object_mask.negate();
    let pair = |region: Option<&Mask>| -> Result<OcclusionPair, MetricError> {
        Ok(OcclusionPair {
            noc: scene_flow_error(estimate, gt_noc, region)?,
            occ: scene_flow_error(estimate, gt_occ, region)?,
        })
    };
    Ok(SceneFlowTable {
        foreground: pair(Some(object_mask))?,
        background: pair(Some(&background))?,
        all: pair(None)?,
    })
}
