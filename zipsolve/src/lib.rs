//! Solve "zip" style grid puzzles from screenshots.
//!
//! [`reconstruct`] turns RGBA pixels into a [`Grid`] of empty, blocked and numbered cells, and
//! [`synthesize`] computes a path that visits the numbered cells in order.

pub mod config;
pub mod detect;
pub mod find;
pub mod grid;
pub mod path;
pub mod pixels;
pub mod trace;

pub use config::DetectConfig;
pub use detect::{reconstruct, GridReconstructor};
pub use find::{MapStorage, MapTrait, NodeReference, PathFinder, PathFinderState, PathResult};
pub use grid::{BlockedRegion, CellKind, Coordinate, Grid, GridCell};
pub use path::{find_segment, synthesize, synthesize_traced, Segment};
pub use pixels::PixelBuffer;
pub use trace::{LogTrace, NoTrace, TraceEvent, TraceSink};
