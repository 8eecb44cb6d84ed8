//! Diagnostic events of the detector and the path search.
//!
//! Nothing in the library logs on its own. Callers that want to see the intermediate ratios
//! and decisions pass a [`TraceSink`], e.g. [`LogTrace`] to forward events to the `log`
//! facade or a `Vec<TraceEvent>` to inspect them.

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    detect::{BucketRatios, CellClass, Rule},
    grid::Coordinate,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    GridEstimated {
        rows: usize,
        cols: usize,
        cell_width: usize,
        cell_height: usize,
        /// No candidate size fit and the fallback size was used
        fallback: bool,
    },
    CellClassified {
        x: usize,
        y: usize,
        /// Number of opaque pixels sampled
        sampled: usize,
        ratios: Option<BucketRatios>,
        class: CellClass,
        rule: Rule,
    },
    NumberAssigned {
        x: usize,
        y: usize,
        order: u32,
    },
    NoNumberedCells {
        cols: usize,
        rows: usize,
    },
    SegmentFound {
        from: Coordinate,
        to: Coordinate,
        hops: usize,
    },
    /// The straight fallback segment was used
    SegmentUnreachable {
        from: Coordinate,
        to: Coordinate,
    },
    PathAssembled {
        points: usize,
    },
}

pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);
}

/// Discards every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn record(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn record(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn record(&mut self, event: TraceEvent) {
        (**self).record(event);
    }
}

/// Forwards events to the `log` facade
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::GridEstimated {
                rows,
                cols,
                cell_width,
                cell_height,
                fallback,
            } => {
                if fallback {
                    warn!("no candidate board size fits, falling back to {rows}x{cols}");
                }
                info!("grid estimated: {rows}x{cols}, cell size: {cell_width}x{cell_height}");
            }
            TraceEvent::CellClassified {
                x,
                y,
                sampled,
                ratios: Some(r),
                class,
                rule,
            } => debug!(
                "cell ({x}, {y}): {sampled} samples, blue={:.2}, yellow={:.2}, dark={:.2}, very_dark={:.2}, white={:.2}, green={:.2}, gray={:.2} -> {class:?} ({rule:?})",
                r.blue, r.yellow, r.dark, r.very_dark, r.white, r.green, r.gray
            ),
            TraceEvent::CellClassified {
                x, y, class, rule, ..
            } => debug!("cell ({x}, {y}): no opaque samples -> {class:?} ({rule:?})"),
            TraceEvent::NumberAssigned { x, y, order } => {
                debug!("assigned number {order} to cell ({x}, {y})")
            }
            TraceEvent::NoNumberedCells { cols, rows } => {
                warn!("no numbered cells found on the {rows}x{cols} grid, using corner to corner path")
            }
            TraceEvent::SegmentFound { from, to, hops } => {
                debug!("segment {from} -> {to}: {hops} hops")
            }
            TraceEvent::SegmentUnreachable { from, to } => {
                warn!("no route from {from} to {to}, connecting them directly")
            }
            TraceEvent::PathAssembled { points } => info!("full path has {points} points"),
        }
    }
}
