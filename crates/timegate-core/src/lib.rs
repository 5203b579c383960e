//! Temporal gating and resource-lifecycle scheduler (engine-agnostic).
//!
//! This crate decides, for every animated node of a scene graph, *when* it
//! is logically active, and drives allocation (prefetch) and teardown
//! (release) of its GPU-backed resources accordingly. It combines an
//! interval-algebra engine merging cascading time-range declarations into
//! per-node timelines with a sparse gate tree walked once per frame.
//!
//! Build once per scene load ([`GateTree::build`], [`build_timeline`]),
//! then call [`Evaluator::evaluate`] once per frame before draw. Rebuilds
//! require a [`release_all`] pass first so no GPU-resident resource leaks
//! across a scene replacement. What to render and how resources are
//! represented stay with the host engine behind [`ResourceHooks`].

pub mod config;
pub mod error;
pub mod evaluate;
pub mod gate;
pub mod report;
pub mod scene;
pub mod segment;
pub mod timeline;

// Re-exports for consumers (host engines and tools)
pub use config::Config;
pub use error::{BuildError, EvalError, ResourceError};
pub use evaluate::{release_all, Evaluator};
pub use gate::{Gate, GateId, GateState, GateTree};
pub use report::{render_html, scene_rows, timeline_spans, ReportRow, Span};
pub use scene::{ActivitySlot, Control, NodeId, ResourceHooks, ResourceState, Scene, SceneNode};
pub use segment::{Segment, SegmentKind};
pub use timeline::{build_timeline, merge, Timeline};
