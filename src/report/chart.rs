// Line charts of portfolio value over time.
//
// The SVG renderer draws every portfolio on one set of axes. The geometry
// helpers are shared with the PDF renderer, which draws one chart per
// portfolio.

use chrono::NaiveDate;
use std::fmt::Write as _;

use crate::types::PortfolioValueSeries;

pub const CHART_TITLE: &str = "Portfolio Value Over Time";

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 60.0;
const GRID_LINES: usize = 5;

const BACKGROUND: &str = "#111111";
const PLOT_BACKGROUND: &str = "#1b1b1b";
const GRID: &str = "#2f2f2f";
const TEXT: &str = "#e5e5e5";
const PALETTE: [&str; 6] = ["#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3"];

/// Date and value extent shared by every series on one chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bounds {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub(crate) fn of<'a>(series: impl IntoIterator<Item = &'a PortfolioValueSeries>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for s in series {
            for (date, value) in s.iter() {
                bounds = Some(match bounds {
                    None => Bounds {
                        first: date,
                        last: date,
                        min: value,
                        max: value,
                    },
                    Some(b) => Bounds {
                        first: b.first.min(date),
                        last: b.last.max(date),
                        min: b.min.min(value),
                        max: b.max.max(value),
                    },
                });
            }
        }
        bounds
    }

    /// Position of a point as fractions of the plot area, `(0, 0)` being the
    /// first date at the lowest value.
    pub(crate) fn fraction(&self, date: NaiveDate, value: f64) -> (f64, f64) {
        let span_days = (self.last - self.first).num_days();
        let x = if span_days == 0 {
            0.5
        } else {
            (date - self.first).num_days() as f64 / span_days as f64
        };
        let y = if self.max == self.min {
            0.5
        } else {
            (value - self.min) / (self.max - self.min)
        };
        (x, y)
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render all named series as one SVG document.
pub fn render_value_chart(series: &[(&str, PortfolioValueSeries)]) -> String {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="{}"/>"#, BACKGROUND);
    let _ = writeln!(
        svg,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
        MARGIN_LEFT, MARGIN_TOP, plot_w, plot_h, PLOT_BACKGROUND
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="32" fill="{}" font-size="18">{}</text>"#,
        MARGIN_LEFT, TEXT, CHART_TITLE
    );

    let Some(bounds) = Bounds::of(series.iter().map(|(_, s)| s)) else {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" fill="{}" font-size="14" text-anchor="middle">No data</text>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0,
            TEXT
        );
        svg.push_str("</svg>\n");
        return svg;
    };

    for i in 0..=GRID_LINES {
        let frac = i as f64 / GRID_LINES as f64;
        let y = MARGIN_TOP + plot_h * (1.0 - frac);
        let value = bounds.min + (bounds.max - bounds.min) * frac;
        let _ = writeln!(
            svg,
            r#"<line x1="{x1}" y1="{y:.1}" x2="{x2}" y2="{y:.1}" stroke="{c}" stroke-width="1"/>"#,
            x1 = MARGIN_LEFT,
            x2 = MARGIN_LEFT + plot_w,
            y = y,
            c = GRID
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" fill="{}" font-size="11" text-anchor="end">{:.2}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            TEXT,
            value
        );
    }

    let axis_y = MARGIN_TOP + plot_h + 20.0;
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" fill="{}" font-size="11">{}</text>"#,
        MARGIN_LEFT, axis_y, TEXT, bounds.first
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" fill="{}" font-size="11" text-anchor="end">{}</text>"#,
        MARGIN_LEFT + plot_w,
        axis_y,
        TEXT,
        bounds.last
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" fill="{}" font-size="12" text-anchor="middle">Date</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 15.0,
        TEXT
    );
    let _ = writeln!(
        svg,
        r#"<text transform="translate(18 {}) rotate(-90)" fill="{}" font-size="12" text-anchor="middle">Portfolio Value</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        TEXT
    );

    for (idx, (name, values)) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let points: Vec<String> = values
            .iter()
            .map(|(date, value)| {
                let (fx, fy) = bounds.fraction(date, value);
                format!(
                    "{:.1},{:.1}",
                    MARGIN_LEFT + plot_w * fx,
                    MARGIN_TOP + plot_h * (1.0 - fy)
                )
            })
            .collect();
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
            color,
            points.join(" ")
        );

        let legend_y = MARGIN_TOP + 18.0 + idx as f64 * 18.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{}" y="{}" width="12" height="3" fill="{}"/>"#,
            MARGIN_LEFT + 12.0,
            legend_y - 4.0,
            color
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" fill="{}" font-size="12">{}</text>"#,
            MARGIN_LEFT + 30.0,
            legend_y,
            TEXT,
            escape_xml(name)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(values: &[f64]) -> PortfolioValueSeries {
        let dates = (1..=values.len() as u32).map(d).collect();
        PortfolioValueSeries::new(dates, values.to_vec())
    }

    #[test]
    fn test_bounds_span_all_series() {
        let a = series(&[100.0, 110.0]);
        let b = series(&[90.0, 95.0, 99.0]);
        let bounds = Bounds::of([&a, &b]).unwrap();
        assert_eq!(bounds.first, d(1));
        assert_eq!(bounds.last, d(3));
        assert_eq!(bounds.min, 90.0);
        assert_eq!(bounds.max, 110.0);
        assert_eq!(bounds.fraction(d(3), 110.0), (1.0, 1.0));
        assert_eq!(bounds.fraction(d(1), 90.0), (0.0, 0.0));
    }

    #[test]
    fn test_flat_single_point_is_centered() {
        let bounds = Bounds::of([&series(&[5.0])]).unwrap();
        assert_eq!(bounds.fraction(d(1), 5.0), (0.5, 0.5));
    }

    #[test]
    fn test_svg_has_one_line_per_series_and_legend() {
        let svg = render_value_chart(&[
            ("Initial Portfolio", series(&[100.0, 101.0])),
            ("Stressed <&> Portfolio", series(&[90.0, 91.0])),
        ]);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("Initial Portfolio"));
        assert!(svg.contains("Stressed &lt;&amp;&gt; Portfolio"));
    }

    #[test]
    fn test_svg_without_data() {
        let svg = render_value_chart(&[]);
        assert!(svg.contains("No data"));
        assert!(!svg.contains("<polyline"));
    }
}
