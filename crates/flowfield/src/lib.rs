//! flowfield — codec and error-metric engine for dense optical-flow,
//! disparity and scene-flow fields.
//!
//! The crate has two halves, leaf first:
//!
//! 1. **Codec** – decode/encode dense 2D vector fields (flow: 2 channels,
//!    disparity: 1 channel) from three interchange formats: the tagged
//!    little-endian `.flo` binary, the 16-bit fixed-point PNG with an
//!    explicit validity channel, and matrix files with named `u`/`v`
//!    arrays. Missing ground truth decodes to NaN, uniformly per pixel.
//! 2. **Metrics** – NaN-aware error measures between same-shape fields:
//!    endpoint error, average endpoint/angular error, bad-pixel and
//!    KITTI-style Fl percentages, disparity error, and the composite
//!    scene-flow metric partitioned by occlusion regime and
//!    foreground/background.
//!
//! [`batch`] adds an embarrassingly parallel driver over many file pairs.
//!
//! # Public API
//! - [`Field`] and [`Mask`] as the in-memory representation
//! - [`io::read_flow`] / [`io::write_flow`] / [`io::read_disparity`] /
//!   [`io::write_disparity`] suffix-dispatched codecs
//! - the [`metrics`] functions and the [`metrics::compute`] dispatch
//! - [`metrics::sceneflow::scene_flow_full`] for the full region table
//! - [`batch::evaluate_pairs`] for parallel benchmark runs

mod field;

pub mod batch;
pub mod io;
pub mod metrics;

#[cfg(test)]
mod test_utils;

pub use field::{Field, FieldError, Mask};
pub use io::{CodecError, CodecResult, FormatReason};
pub use metrics::sceneflow::{
    OcclusionPair, RegionErrors, SceneFlowFields, SceneFlowTable,
};
pub use metrics::{
    Aggregate, BadPixelOptions, FlowMeasures, Metric, MetricError, MetricOptions, MetricOutput,
};
