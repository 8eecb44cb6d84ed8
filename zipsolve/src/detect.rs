//! Board reconstruction from a screenshot.
//!
//! The board is assumed to be square and to fill the image. Its size is guessed from the image
//! dimensions alone, then every cell is sampled on a sparse lattice and classified by the share
//! of pixels that fall into each color bucket. Printed digits are never read: numbered cells
//! are ordered by position, top-to-bottom then left-to-right.

use anyhow::bail;
use serde::Serialize;

use crate::{
    config::{ColorBucket, DetectConfig, RatioThresholds, SamplingConfig, SizeConfig},
    grid::{BlockedRegion, CellKind, Coordinate, Grid},
    pixels::PixelBuffer,
    trace::{NoTrace, TraceEvent, TraceSink},
};

/// Board size guessed from the image dimensions
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GridEstimate {
    pub rows: usize,
    pub cols: usize,
    pub cell_width: usize,
    pub cell_height: usize,
    /// No candidate was accepted
    pub fallback: bool,
}

/// Take the first candidate size whose cells are larger than `min_cell_pixels` in both
/// directions, otherwise the fallback size.
pub fn estimate_dimensions(width: usize, height: usize, sizes: &SizeConfig) -> GridEstimate {
    let estimate = |n: usize, fallback| GridEstimate {
        rows: n,
        cols: n,
        cell_width: width / n,
        cell_height: height / n,
        fallback,
    };

    sizes
        .candidates
        .iter()
        .filter(|&&n| n > 0)
        .map(|&n| estimate(n, false))
        .find(|e| e.cell_width > sizes.min_cell_pixels && e.cell_height > sizes.min_cell_pixels)
        .unwrap_or_else(|| estimate(sizes.fallback.max(1), true))
}

/// Pixel counts per color bucket of one cell. `total` counts every opaque sample, including
/// the ones that fit no bucket.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BucketCounts {
    pub white: usize,
    pub very_dark: usize,
    pub dark: usize,
    pub blue: usize,
    pub green: usize,
    pub yellow: usize,
    pub gray: usize,
    pub total: usize,
}

impl BucketCounts {
    pub fn add(&mut self, bucket: Option<ColorBucket>) {
        self.total += 1;
        match bucket {
            Some(ColorBucket::White) => self.white += 1,
            Some(ColorBucket::VeryDark) => self.very_dark += 1,
            Some(ColorBucket::Dark) => self.dark += 1,
            Some(ColorBucket::Blue) => self.blue += 1,
            Some(ColorBucket::Green) => self.green += 1,
            Some(ColorBucket::Yellow) => self.yellow += 1,
            Some(ColorBucket::Gray) => self.gray += 1,
            None => {}
        }
    }

    /// Share of each bucket among the opaque samples, None if nothing was sampled
    pub fn ratios(&self) -> Option<BucketRatios> {
        if self.total == 0 {
            return None;
        }

        let total = self.total as f64;
        let ratio = |n: usize| n as f64 / total;

        Some(BucketRatios {
            white: ratio(self.white),
            very_dark: ratio(self.very_dark),
            dark: ratio(self.dark),
            blue: ratio(self.blue),
            green: ratio(self.green),
            yellow: ratio(self.yellow),
            gray: ratio(self.gray),
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct BucketRatios {
    pub white: f64,
    pub very_dark: f64,
    pub dark: f64,
    pub blue: f64,
    pub green: f64,
    pub yellow: f64,
    pub gray: f64,
}

/// Classification of a single cell before numbering
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellClass {
    Empty,
    Blocked,
    Numbered,
}

/// The classifier rule that decided a cell
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Every sample was transparent
    NoSamples,
    BlueFill,
    /// Dark badge on a light cell, or a solid dark badge
    DarkBadge,
    /// Dark digits, or near-black digits on gray
    DarkText,
    YellowFill,
    NoMatch,
}

/// Decide a cell from its bucket ratios. Rules are tried in a fixed order and the first match
/// wins, a cell without samples is empty.
pub fn classify(ratios: Option<&BucketRatios>, t: &RatioThresholds) -> (CellClass, Rule) {
    let Some(r) = ratios else {
        return (CellClass::Empty, Rule::NoSamples);
    };

    if r.blue > t.blocked_blue {
        (CellClass::Blocked, Rule::BlueFill)
    } else if (r.very_dark > t.badge_very_dark && r.white > t.badge_white)
        || r.very_dark > t.solid_very_dark
    {
        (CellClass::Numbered, Rule::DarkBadge)
    } else if r.dark > t.text_dark || (r.very_dark > t.speckle_very_dark && r.gray > t.speckle_gray)
    {
        (CellClass::Numbered, Rule::DarkText)
    } else if r.yellow > t.yellow_fill {
        (CellClass::Numbered, Rule::YellowFill)
    } else {
        (CellClass::Empty, Rule::NoMatch)
    }
}

/// Count the bucket of every `stride`-th pixel of a cell box, in both directions. The stride
/// grows with the cell width so large screenshots cost the same as small ones.
pub fn sample_cell(
    pixels: &PixelBuffer,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
    config: &DetectConfig,
) -> BucketCounts {
    let SamplingConfig {
        stride_divisor,
        alpha_cutoff,
    } = config.sampling;
    let stride = (width / stride_divisor).max(1);
    let mut counts = BucketCounts::default();

    for y in (top..top + height).step_by(stride) {
        for x in (left..left + width).step_by(stride) {
            let Some(pixel) = pixels.pixel(x, y) else {
                continue;
            };
            if pixel.0[3] < alpha_cutoff {
                continue;
            }
            counts.add(config.palette.bucket_of(pixel));
        }
    }

    counts
}

/// Turns a screenshot into a [`Grid`]
#[derive(Clone, Debug, Default)]
pub struct GridReconstructor {
    config: DetectConfig,
}

impl GridReconstructor {
    pub fn new(config: DetectConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    pub fn reconstruct(&self, pixels: &PixelBuffer) -> Result<Grid, anyhow::Error> {
        self.reconstruct_traced(pixels, NoTrace)
    }

    /// Same as [`GridReconstructor::reconstruct`] but reports every decision to `trace`
    pub fn reconstruct_traced(
        &self,
        pixels: &PixelBuffer,
        mut trace: impl TraceSink,
    ) -> Result<Grid, anyhow::Error> {
        if pixels.is_empty() {
            bail!(
                "empty pixel buffer ({}x{})",
                pixels.width(),
                pixels.height()
            );
        }

        let estimate = estimate_dimensions(pixels.width(), pixels.height(), &self.config.sizes);
        trace.record(TraceEvent::GridEstimated {
            rows: estimate.rows,
            cols: estimate.cols,
            cell_width: estimate.cell_width,
            cell_height: estimate.cell_height,
            fallback: estimate.fallback,
        });

        let GridEstimate {
            rows,
            cols,
            cell_width,
            cell_height,
            ..
        } = estimate;

        let mut kinds = Vec::with_capacity(rows * cols);
        let mut numbered = Vec::new();
        let mut blocked_regions = Vec::new();

        for row in 0..rows {
            for col in 0..cols {
                let left = col * cell_width;
                let top = row * cell_height;
                let counts = sample_cell(pixels, left, top, cell_width, cell_height, &self.config);
                let ratios = counts.ratios();
                let (class, rule) = classify(ratios.as_ref(), &self.config.ratios);

                trace.record(TraceEvent::CellClassified {
                    x: col,
                    y: row,
                    sampled: counts.total,
                    ratios,
                    class,
                    rule,
                });

                kinds.push(match class {
                    CellClass::Empty => CellKind::Empty,
                    CellClass::Blocked => {
                        blocked_regions.push(BlockedRegion {
                            x: left,
                            y: top,
                            width: cell_width,
                            height: cell_height,
                        });
                        CellKind::Blocked
                    }
                    CellClass::Numbered => {
                        numbered.push(Coordinate::new(col, row));
                        // the real order is assigned below
                        CellKind::Numbered { order: 0 }
                    }
                });
            }
        }

        numbered.sort_by_key(|c| (c.y, c.x));
        for (i, c) in numbered.into_iter().enumerate() {
            let order = i as u32 + 1;
            kinds[c.y * cols + c.x] = CellKind::Numbered { order };
            trace.record(TraceEvent::NumberAssigned {
                x: c.x,
                y: c.y,
                order,
            });
        }

        Ok(Grid::new(rows, cols, kinds)?.with_blocked_regions(blocked_regions))
    }
}

/// Reconstruct a grid with the default thresholds
pub fn reconstruct(pixels: &PixelBuffer) -> Result<Grid, anyhow::Error> {
    GridReconstructor::default().reconstruct(pixels)
}
