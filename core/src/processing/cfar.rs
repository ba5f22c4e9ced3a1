use crate::prelude::{invalid, mismatch, RadarError, RadarResult};
use log::{debug, warn};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// How the confidence margin is compared against the adaptive threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginScale {
    /// `value - threshold > margin`, in map units.
    Linear,
    /// `20 * log10(value / threshold) > margin`, in dB.
    Decibel,
}

/// Cell-averaging CFAR parameters.
///
/// `guard` and `training` are half-widths measured from the cell under test:
/// training cells form the square annulus between the two boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CfarConfig {
    pub guard: usize,
    pub training: usize,
    pub pfa: f64,
    pub margin: f32,
    pub margin_scale: MarginScale,
}

impl Default for CfarConfig {
    fn default() -> Self {
        Self {
            guard: 4,
            training: 12,
            pfa: 0.8e-6,
            margin: 8.0,
            margin_scale: MarginScale::Decibel,
        }
    }
}

impl CfarConfig {
    pub fn validate(&self) -> RadarResult<()> {
        if self.guard >= self.training {
            return invalid(format!(
                "guard half-width {} must be smaller than training half-width {}",
                self.guard, self.training
            ));
        }
        if !(self.pfa > 0.0 && self.pfa < 1.0) {
            return invalid(format!("pfa must lie in (0, 1), got {}", self.pfa));
        }
        if !(self.margin >= 0.0) || !self.margin.is_finite() {
            return invalid(format!("margin must be non-negative, got {}", self.margin));
        }
        Ok(())
    }

    /// Training cells of an unclipped window.
    pub fn full_training_cells(&self) -> usize {
        let outer = 2 * self.training + 1;
        let inner = 2 * self.guard + 1;
        outer * outer - inner * inner
    }
}

/// Threshold multiplier for `training_cells` averaged cells at false-alarm
/// probability `pfa`: `N * (pfa^(-1/N) - 1)`.
pub fn ca_alpha(training_cells: usize, pfa: f64) -> f64 {
    let n = training_cells as f64;
    n * (pfa.powf(-1.0 / n) - 1.0)
}

/// Per-cell thresholds and detection mask, shaped like the input map.
#[derive(Debug, Clone, PartialEq)]
pub struct CfarOutput {
    /// `None` where the clipped training region held no cells.
    pub thresholds: Array2<Option<f32>>,
    pub mask: Array2<bool>,
    pub degenerate_cells: usize,
}

impl CfarOutput {
    pub fn detection_count(&self) -> usize {
        self.mask.iter().filter(|&&hit| hit).count()
    }

    /// Flagged `(row, column)` cells in row-major order.
    pub fn flagged_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.mask
            .indexed_iter()
            .filter(|(_, &hit)| hit)
            .map(|(index, _)| index)
    }
}

/// Inclusive-exclusive prefix sums for O(1) rectangle sums.
struct SummedArea {
    sums: Array2<f64>,
}

impl SummedArea {
    fn new(map: ArrayView2<f32>) -> Self {
        let (rows, cols) = map.dim();
        let mut sums = Array2::zeros((rows + 1, cols + 1));
        for r in 0..rows {
            let mut row_sum = 0.0;
            for c in 0..cols {
                row_sum += map[[r, c]] as f64;
                sums[[r + 1, c + 1]] = sums[[r, c + 1]] + row_sum;
            }
        }
        Self { sums }
    }

    fn rect(&self, rows: (usize, usize), cols: (usize, usize)) -> f64 {
        let (r0, r1) = rows;
        let (c0, c1) = cols;
        self.sums[[r1, c1]] - self.sums[[r0, c1]] - self.sums[[r1, c0]] + self.sums[[r0, c0]]
    }
}

/// Half-open span `[center - half, center + half]` clipped to `[0, len)`.
fn clipped(center: usize, half: usize, len: usize) -> (usize, usize) {
    (center.saturating_sub(half), (center + half + 1).min(len))
}

/// Stateless 2D cell-averaging CFAR detector.
#[derive(Debug, Clone)]
pub struct CfarDetector {
    config: CfarConfig,
}

impl CfarDetector {
    pub fn new(config: CfarConfig) -> RadarResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CfarConfig {
        &self.config
    }

    /// Thresholds every cell of `map` and flags those clearing the margin.
    ///
    /// Windows crossing the map edge are clipped to the cells that exist;
    /// a cell whose clipped training region is empty gets no threshold and
    /// is never flagged.
    pub fn run(&self, map: ArrayView2<f32>) -> CfarOutput {
        let (rows, cols) = map.dim();
        let table = SummedArea::new(map);
        let mut thresholds = Array2::from_elem((rows, cols), None);
        let mut mask = Array2::from_elem((rows, cols), false);
        let mut degenerate_cells = 0;

        for r in 0..rows {
            for c in 0..cols {
                match self.threshold_from(&table, (rows, cols), r, c) {
                    Some(threshold) => {
                        thresholds[[r, c]] = Some(threshold);
                        mask[[r, c]] = self.exceeds(map[[r, c]], threshold);
                    }
                    None => degenerate_cells += 1,
                }
            }
        }

        if degenerate_cells > 0 {
            warn!(
                "CFAR skipped {} of {} cells with empty training regions",
                degenerate_cells,
                rows * cols
            );
        }
        let output = CfarOutput {
            thresholds,
            mask,
            degenerate_cells,
        };
        debug!(
            "CFAR on {}x{} map flagged {} cells",
            rows,
            cols,
            output.detection_count()
        );
        output
    }

    /// Threshold of a single cell, reporting an empty training region as an
    /// error instead of skipping the cell.
    ///
    /// Builds a summed-area table over the whole map on every call; use
    /// [`run`](Self::run) when more than a handful of cells are needed.
    pub fn cell_threshold(&self, map: ArrayView2<f32>, row: usize, col: usize) -> RadarResult<f32> {
        let (rows, cols) = map.dim();
        if row >= rows || col >= cols {
            return mismatch(format!(
                "cell ({row}, {col}) lies outside the {rows}x{cols} map"
            ));
        }
        let table = SummedArea::new(map);
        self.threshold_from(&table, (rows, cols), row, col)
            .ok_or_else(|| {
                RadarError::DegenerateRegion(format!(
                    "no training cells around ({row}, {col}) in a {rows}x{cols} map"
                ))
            })
    }

    fn threshold_from(
        &self,
        table: &SummedArea,
        (rows, cols): (usize, usize),
        r: usize,
        c: usize,
    ) -> Option<f32> {
        let outer_rows = clipped(r, self.config.training, rows);
        let outer_cols = clipped(c, self.config.training, cols);
        let inner_rows = clipped(r, self.config.guard, rows);
        let inner_cols = clipped(c, self.config.guard, cols);

        let area = |(r0, r1): (usize, usize), (c0, c1): (usize, usize)| (r1 - r0) * (c1 - c0);
        let count = area(outer_rows, outer_cols) - area(inner_rows, inner_cols);
        if count == 0 {
            return None;
        }

        let sum = table.rect(outer_rows, outer_cols) - table.rect(inner_rows, inner_cols);
        let noise = sum / count as f64;
        Some((ca_alpha(count, self.config.pfa) * noise) as f32)
    }

    fn exceeds(&self, value: f32, threshold: f32) -> bool {
        match self.config.margin_scale {
            MarginScale::Linear => value - threshold > self.config.margin,
            MarginScale::Decibel => {
                value > 0.0
                    && (threshold <= 0.0 || 20.0 * (value / threshold).log10() > self.config.margin)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(guard: usize, training: usize, pfa: f64, margin: f32) -> CfarConfig {
        CfarConfig {
            guard,
            training,
            pfa,
            margin,
            margin_scale: MarginScale::Linear,
        }
    }

    #[test]
    fn alpha_matches_closed_form() {
        let n = 24;
        let expected = 24.0 * (1e-3f64.powf(-1.0 / 24.0) - 1.0);
        assert_relative_eq!(ca_alpha(n, 1e-3), expected, max_relative = 1e-12);
        assert!(ca_alpha(n, 1e-3) > ca_alpha(n, 1e-1));
    }

    #[test]
    fn uniform_noise_threshold_is_alpha_times_level() {
        let cfg = config(1, 3, 1e-3, 2.0);
        let detector = CfarDetector::new(cfg.clone()).unwrap();
        let map = Array2::from_elem((15, 15), 4.0f32);
        let threshold = detector.cell_threshold(map.view(), 7, 7).unwrap();
        let alpha = ca_alpha(cfg.full_training_cells(), 1e-3);
        assert_eq!(cfg.full_training_cells(), 40);
        assert_relative_eq!(threshold as f64, alpha * 4.0, max_relative = 1e-5);
    }

    #[test]
    fn margin_separates_flagged_and_quiet_cells() {
        let cfg = config(1, 3, 1e-3, 2.0);
        let detector = CfarDetector::new(cfg.clone()).unwrap();
        let level = 4.0f32;
        let threshold = (ca_alpha(cfg.full_training_cells(), 1e-3) * level as f64) as f32;

        let mut map = Array2::from_elem((15, 15), level);
        map[[7, 7]] = threshold;
        let output = detector.run(map.view());
        assert!(!output.mask[[7, 7]]);

        map[[7, 7]] = threshold + 2.0 + 0.01;
        let output = detector.run(map.view());
        assert!(output.mask[[7, 7]]);
        assert_eq!(output.detection_count(), 1);
        assert_eq!(output.flagged_cells().collect::<Vec<_>>(), vec![(7, 7)]);
    }

    #[test]
    fn edge_cells_use_clipped_training_region() {
        let cfg = config(1, 3, 1e-3, 2.0);
        let detector = CfarDetector::new(cfg).unwrap();
        let map = Array2::from_elem((10, 10), 1.0f32);
        let corner = detector.cell_threshold(map.view(), 0, 0).unwrap();
        // 4x4 clipped outer window minus 2x2 clipped guard.
        assert_relative_eq!(corner as f64, ca_alpha(12, 1e-3), max_relative = 1e-5);
    }

    #[test]
    fn target_in_last_range_bin_is_detected() {
        let detector = CfarDetector::new(config(2, 6, 1e-3, 2.0)).unwrap();
        let mut map = Array2::from_elem((16, 32), 0.5f32);
        map[[8, 31]] = 200.0;
        let output = detector.run(map.view());
        assert!(output.mask[[8, 31]]);
        assert_eq!(output.degenerate_cells, 0);
    }

    #[test]
    fn map_inside_guard_region_is_degenerate_not_fatal() {
        let detector = CfarDetector::new(config(2, 4, 1e-3, 0.0)).unwrap();
        let map = Array2::from_elem((3, 3), 10.0f32);
        let output = detector.run(map.view());
        assert_eq!(output.degenerate_cells, 9);
        assert_eq!(output.detection_count(), 0);
        assert!(output.thresholds.iter().all(Option::is_none));
        assert!(matches!(
            detector.cell_threshold(map.view(), 1, 1),
            Err(RadarError::DegenerateRegion(_))
        ));
    }

    #[test]
    fn all_zero_map_produces_no_detections() {
        let detector = CfarDetector::new(CfarConfig::default()).unwrap();
        let map = Array2::zeros((64, 64));
        assert_eq!(detector.run(map.view()).detection_count(), 0);
    }

    #[test]
    fn default_margin_is_a_ratio_over_threshold() {
        let cfg = CfarConfig::default();
        let detector = CfarDetector::new(cfg.clone()).unwrap();
        let threshold = ca_alpha(cfg.full_training_cells(), cfg.pfa) as f32;

        let mut map = Array2::from_elem((41, 41), 1.0f32);
        map[[20, 20]] = threshold * 10f32.powf(6.0 / 20.0);
        assert!(!detector.run(map.view()).mask[[20, 20]]);

        map[[20, 20]] = threshold * 10f32.powf(10.0 / 20.0);
        let output = detector.run(map.view());
        assert!(output.mask[[20, 20]]);
        assert_eq!(output.detection_count(), 1);
    }

    #[test]
    fn decibel_margin_compares_ratio() {
        let mut cfg = config(1, 2, 0.5, 6.0);
        cfg.margin_scale = MarginScale::Decibel;
        let detector = CfarDetector::new(cfg).unwrap();
        assert!(detector.exceeds(2.1, 1.0));
        assert!(!detector.exceeds(1.9, 1.0));
        assert!(detector.exceeds(1.0, 0.0));
        assert!(!detector.exceeds(0.0, 0.0));
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(CfarDetector::new(config(3, 3, 1e-3, 2.0)).is_err());
        assert!(CfarDetector::new(config(1, 3, 0.0, 2.0)).is_err());
        assert!(CfarDetector::new(config(1, 3, 1.0, 2.0)).is_err());
        assert!(CfarDetector::new(config(1, 3, 1e-3, -1.0)).is_err());
    }

    #[test]
    fn input_map_is_left_untouched() {
        let detector = CfarDetector::new(config(1, 2, 1e-2, 0.0)).unwrap();
        let mut map = Array2::from_elem((8, 8), 1.0f32);
        map[[4, 4]] = 50.0;
        let copy = map.clone();
        let output = detector.run(map.view());
        assert_eq!(map, copy);
        assert_eq!(output.thresholds.dim(), map.dim());
    }
}
