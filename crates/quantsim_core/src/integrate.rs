//! Adaptive Simpson quadrature
//!
//! Used for the integral representations of the stable density and
//! distribution function. The interval is cut into panels, and the panel
//! with the largest error estimate is bisected until the summed error meets
//! the relative tolerance of the running total. Refinement therefore follows
//! the mass of the integrand even when the first coarse sum misses it, and
//! the split budget caps the cost of each call.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Upper bound on bisections per call
const MAX_SPLITS: usize = 2000;

/// Integrate `f` over `[a, b]` to a relative tolerance.
///
/// Non-finite integrand values are treated as zero.
pub fn adaptive_simpson<F>(f: F, a: f64, b: f64, rel_tol: f64, panels: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    if !(b > a) {
        return 0.0;
    }

    let f = |x: f64| {
        let y = f(x);
        if y.is_finite() { y } else { 0.0 }
    };

    let panels = panels.max(1);
    let width = (b - a) / panels as f64;
    let edges: Vec<f64> = (0..=panels)
        .map(|i| if i == panels { b } else { a + i as f64 * width })
        .collect();
    let values: Vec<f64> = edges.iter().map(|&x| f(x)).collect();

    let mut queue: BinaryHeap<Panel> = (0..panels)
        .map(|i| {
            let mid = 0.5 * (edges[i] + edges[i + 1]);
            Panel::new(&f, edges[i], edges[i + 1], values[i], f(mid), values[i + 1])
        })
        .collect();

    let mut total: f64 = queue.iter().map(|p| p.estimate).sum();
    let mut error: f64 = queue.iter().map(|p| p.error).sum();

    for _ in 0..MAX_SPLITS {
        if error <= rel_tol * total.abs() {
            break;
        }
        let Some(worst) = queue.pop() else { break };
        if worst.error == 0.0 {
            queue.push(worst);
            break;
        }
        let (left, right) = worst.split(&f);
        total += left.estimate + right.estimate - worst.estimate;
        error += left.error + right.error - worst.error;
        queue.push(left);
        queue.push(right);
    }

    queue.iter().map(|p| p.estimate).sum()
}

/// A panel with its two Simpson halves already evaluated
#[derive(Debug, Clone, Copy)]
struct Panel {
    a: f64,
    b: f64,
    /// f at a, a + h/4, a + h/2, a + 3h/4, b
    values: [f64; 5],
    estimate: f64,
    error: f64,
}

impl Panel {
    fn new<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> Self {
        let m = 0.5 * (a + b);
        let flm = f(0.5 * (a + m));
        let frm = f(0.5 * (m + b));
        let values = [fa, flm, fm, frm, fb];

        let whole = simpson(a, b, fa, fm, fb);
        let halves = simpson(a, m, fa, flm, fm) + simpson(m, b, fm, frm, fb);
        let delta = halves - whole;

        // Differences below rounding of the samples are not refinable
        let noise = 64.0 * f64::EPSILON * (b - a) * (fa.abs() + fm.abs() + fb.abs());
        let error = if delta.abs() <= noise { 0.0 } else { delta.abs() / 15.0 };

        Self { a, b, values, estimate: halves + delta / 15.0, error }
    }

    fn split<F: Fn(f64) -> f64>(&self, f: &F) -> (Panel, Panel) {
        let m = 0.5 * (self.a + self.b);
        let [fa, flm, fm, frm, fb] = self.values;
        (Panel::new(f, self.a, m, fa, flm, fm), Panel::new(f, m, self.b, fm, frm, fb))
    }
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

impl PartialEq for Panel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Panel {}

impl PartialOrd for Panel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Panel {
    /// Largest error first out of the max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        self.error.total_cmp(&other.error)
    }
}
