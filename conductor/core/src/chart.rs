//! Chart Adapter
//!
//! Projects a price series into a surface-agnostic chart description:
//! categorical x-axis of date labels in the order received, one filled area
//! series keyed by close, and an auto-scaled y-axis. Points are never
//! interpolated, sorted, or gap-filled.

use crate::messages::PricePoint;

/// Chart title shown above the price series
pub const CHART_TITLE: &str = "Price Trend (Last 30 Days)";

/// Fraction of the value range added above and below the series
const Y_PADDING_RATIO: f64 = 0.05;

/// How the series should be drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesKind {
    /// Line with the area below it filled
    Area,
}

/// One data series
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSeries {
    /// Field the series is keyed by
    pub key: &'static str,
    /// Drawing style
    pub kind: SeriesKind,
    /// `(x, y)` pairs where `x` is the category index
    pub points: Vec<(f64, f64)>,
}

/// Renderable chart description
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSpec {
    /// Chart title
    pub title: String,
    /// Categorical x-axis labels (the `date` field), insertion order
    pub x_labels: Vec<String>,
    /// The close-price series
    pub series: ChartSeries,
    /// X-axis bounds in category-index space
    pub x_bounds: [f64; 2],
    /// Auto-scaled y-axis bounds
    pub y_bounds: [f64; 2],
}

impl ChartSpec {
    /// Build a chart from price points; `None` when there are no points
    #[must_use]
    pub fn from_points(points: &[PricePoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let x_labels = points.iter().map(|p| p.date.clone()).collect();
        let series_points: Vec<(f64, f64)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.close))
            .collect();

        let last_index = (points.len() - 1) as f64;
        let x_bounds = if points.len() == 1 {
            [-1.0, 1.0]
        } else {
            [0.0, last_index]
        };

        Some(Self {
            title: CHART_TITLE.to_string(),
            x_labels,
            series: ChartSeries {
                key: "close",
                kind: SeriesKind::Area,
                points: series_points,
            },
            x_bounds,
            y_bounds: auto_bounds(points.iter().map(|p| p.close)),
        })
    }

    /// Number of plotted points
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.points.len()
    }

    /// Whether the series is empty (never true for a built chart)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.points.is_empty()
    }

    /// Last close in the series
    #[must_use]
    pub fn latest(&self) -> Option<f64> {
        self.series.points.last().map(|(_, y)| *y)
    }

    /// Difference between the last and first close
    #[must_use]
    pub fn change(&self) -> Option<f64> {
        let first = self.series.points.first()?.1;
        let last = self.series.points.last()?.1;
        Some(last - first)
    }

    /// Labels for the first, middle, and last category
    #[must_use]
    pub fn edge_labels(&self) -> Vec<&str> {
        let n = self.x_labels.len();
        match n {
            0 => Vec::new(),
            1 | 2 => self.x_labels.iter().map(String::as_str).collect(),
            _ => vec![
                self.x_labels[0].as_str(),
                self.x_labels[n / 2].as_str(),
                self.x_labels[n - 1].as_str(),
            ],
        }
    }
}

/// Min/max of the finite values with padding; `[0, 1]` when none are finite
fn auto_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let range = values.filter(|v| v.is_finite()).fold(None, |acc, v| {
        Some(match acc {
            Some((min, max)) => (f64::min(min, v), f64::max(max, v)),
            None => (v, v),
        })
    });

    match range {
        None => [0.0, 1.0],
        Some((min, max)) if (max - min).abs() < f64::EPSILON => {
            let padding = (max.abs() * Y_PADDING_RATIO).max(1.0);
            [min - padding, max + padding]
        }
        Some((min, max)) => {
            let padding = (max - min) * Y_PADDING_RATIO;
            [min - padding, max + padding]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input_has_no_chart() {
        assert!(ChartSpec::from_points(&[]).is_none());
    }

    #[test]
    fn test_two_points_in_order() {
        let chart = ChartSpec::from_points(&[
            PricePoint::new("D1", 10.0),
            PricePoint::new("D2", 12.0),
        ])
        .unwrap();

        assert_eq!(chart.x_labels, vec!["D1".to_string(), "D2".to_string()]);
        assert_eq!(chart.series.points, vec![(0.0, 10.0), (1.0, 12.0)]);
        assert_eq!(chart.series.kind, SeriesKind::Area);
        assert_eq!(chart.series.key, "close");
        assert_eq!(chart.x_bounds, [0.0, 1.0]);
        assert_eq!(chart.len(), 2);
        assert_eq!(chart.change(), Some(2.0));
        assert_eq!(chart.latest(), Some(12.0));
    }

    #[test]
    fn test_y_bounds_are_padded() {
        let chart = ChartSpec::from_points(&[
            PricePoint::new("a", 100.0),
            PricePoint::new("b", 120.0),
            PricePoint::new("c", 110.0),
        ])
        .unwrap();
        assert!((chart.y_bounds[0] - 99.0).abs() < 1e-9);
        assert!((chart.y_bounds[1] - 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_series_gets_minimum_padding() {
        let chart = ChartSpec::from_points(&[PricePoint::new("a", 5.0)]).unwrap();
        assert_eq!(chart.y_bounds, [4.0, 6.0]);
        assert_eq!(chart.x_bounds, [-1.0, 1.0]);
    }

    #[test]
    fn test_points_kept_as_received() {
        // Out-of-order dates and a non-finite close are plotted untouched
        let chart = ChartSpec::from_points(&[
            PricePoint::new("03/02", 3.0),
            PricePoint::new("03/01", f64::NAN),
            PricePoint::new("03/05", 1.0),
        ])
        .unwrap();
        assert_eq!(chart.x_labels, vec!["03/02", "03/01", "03/05"]);
        assert_eq!(chart.len(), 3);
        assert!(chart.series.points[1].1.is_nan());
        assert!(chart.y_bounds[0] < 1.0 && chart.y_bounds[1] > 3.0);
    }

    #[test]
    fn test_edge_labels() {
        let points: Vec<_> = (1..=5)
            .map(|d| PricePoint::new(format!("D{d}"), f64::from(d)))
            .collect();
        let chart = ChartSpec::from_points(&points).unwrap();
        assert_eq!(chart.edge_labels(), vec!["D1", "D3", "D5"]);
    }
}
