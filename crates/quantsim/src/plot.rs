//! SVG figure: density histogram of the quantile estimates overlaid with
//! the fitted stable densities.

use std::fmt::Write as _;
use std::path::Path;

use quantsim_core::analysis::{DensityCurve, Histogram};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const PADDING: f64 = 50.0;
const TICKS: usize = 6;

const BAR_COLOR: &str = "#5f8fbf";
const CURVE_COLORS: [&str; 8] = [
    "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f", "#17becf",
];

#[derive(Debug, Clone)]
pub struct Figure {
    pub histogram: Histogram,
    pub curves: Vec<DensityCurve>,
    /// Visible x range
    pub xlim: (f64, f64),
}

impl Figure {
    /// Tallest bar or curve point inside the visible range
    fn y_max(&self) -> f64 {
        let (lo, hi) = self.xlim;
        let bars = self
            .histogram
            .edges
            .windows(2)
            .zip(&self.histogram.density)
            .filter(|(e, _)| e[1] >= lo && e[0] <= hi)
            .map(|(_, &d)| d);
        let curves = self.curves.iter().flat_map(|c| {
            c.x.iter()
                .zip(&c.density)
                .filter(|(x, _)| (lo..=hi).contains(*x))
                .map(|(_, &d)| d)
        });

        let max = bars.chain(curves).filter(|d| d.is_finite()).fold(0.0, f64::max);
        if max > 0.0 { max * 1.05 } else { 1.0 }
    }

    fn to_px(&self, x: f64, y: f64, y_max: f64) -> (f64, f64) {
        let (lo, hi) = self.xlim;
        let px = PADDING + (x - lo) / (hi - lo) * (WIDTH - 2.0 * PADDING);
        let py = HEIGHT - PADDING - y / y_max * (HEIGHT - 2.0 * PADDING);
        (px, py)
    }

    pub fn render(&self) -> String {
        let (lo, hi) = self.xlim;
        let y_max = self.y_max();

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}</style>"#
        );
        let _ = write!(
            svg,
            r#"<clipPath id="plot-area"><rect x="{PADDING}" y="{PADDING}" width="{w}" height="{h}" /></clipPath>"#,
            w = WIDTH - 2.0 * PADDING,
            h = HEIGHT - 2.0 * PADDING,
        );

        svg.push_str(r#"<g clip-path="url(#plot-area)">"#);
        for (edge, &density) in self.histogram.edges.windows(2).zip(&self.histogram.density) {
            if edge[1] < lo || edge[0] > hi || density <= 0.0 {
                continue;
            }
            let (x0, top) = self.to_px(edge[0], density, y_max);
            let (x1, bottom) = self.to_px(edge[1], 0.0, y_max);
            let _ = write!(
                svg,
                r#"<rect x="{x0:.2}" y="{top:.2}" width="{w:.2}" height="{h:.2}" fill="{BAR_COLOR}" fill-opacity="0.6" stroke="white" stroke-width="0.3" />"#,
                w = (x1 - x0).max(0.0),
                h = (bottom - top).max(0.0),
            );
        }

        for (curve, color) in self.curves.iter().zip(CURVE_COLORS.iter().cycle()) {
            let points: Vec<String> = curve
                .x
                .iter()
                .zip(&curve.density)
                .filter(|(_, d)| d.is_finite())
                .map(|(&x, &d)| {
                    let (px, py) = self.to_px(x, d, y_max);
                    format!("{px:.2},{py:.2}")
                })
                .collect();
            if points.is_empty() {
                continue;
            }
            let _ = write!(
                svg,
                r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{}" />"#,
                points.join(" ")
            );
        }
        svg.push_str("</g>");

        self.draw_axes(&mut svg, y_max);
        self.draw_legend(&mut svg);

        svg.push_str("</svg>");
        svg
    }

    fn draw_axes(&self, svg: &mut String, y_max: f64) {
        let (lo, hi) = self.xlim;
        let (left, bottom) = self.to_px(lo, 0.0, y_max);
        let (right, top) = self.to_px(hi, y_max, y_max);

        let _ = write!(
            svg,
            r##"<line x1="{left:.2}" y1="{bottom:.2}" x2="{right:.2}" y2="{bottom:.2}" stroke="#333" /><line x1="{left:.2}" y1="{bottom:.2}" x2="{left:.2}" y2="{top:.2}" stroke="#333" />"##
        );

        for i in 0..TICKS {
            let t = i as f64 / (TICKS - 1) as f64;

            let x = lo + t * (hi - lo);
            let (px, _) = self.to_px(x, 0.0, y_max);
            let _ = write!(
                svg,
                r#"<text x="{px:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
                y = bottom + 14.0,
                label = tick_label(x),
            );

            let y = t * y_max;
            let (_, py) = self.to_px(lo, y, y_max);
            let _ = write!(
                svg,
                r#"<text x="{x:.2}" y="{py:.2}" text-anchor="end">{label}</text>"#,
                x = left - 4.0,
                label = tick_label(y),
            );
        }

        let _ = write!(
            svg,
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end" transform="rotate(-90 {x:.2} {y:.2})">Density</text>"#,
            x = 14.0,
            y = PADDING,
        );
    }

    fn draw_legend(&self, svg: &mut String) {
        let x = PADDING + 10.0;
        let mut y = PADDING + 14.0;
        for (curve, color) in self.curves.iter().zip(CURVE_COLORS.iter().cycle()) {
            let _ = write!(
                svg,
                r##"<line x1="{x:.2}" y1="{ly:.2}" x2="{x2:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="1.5" /><text x="{tx:.2}" y="{y:.2}" text-anchor="start" fill="#333">{label}</text>"##,
                ly = y - 4.0,
                x2 = x + 20.0,
                tx = x + 26.0,
                label = escape(&curve.label),
            );
            y += 16.0;
        }
    }

    pub fn write_svg(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}

fn tick_label(value: f64) -> String {
    if value.abs() >= 100.0 {
        format!("{value:.0}")
    } else if value.abs() >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.3}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
