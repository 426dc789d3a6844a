//! Nelder-Mead simplex optimization
//!
//! Derivative-free search that keeps a simplex of N+1 points and reflects,
//! expands, contracts or shrinks it toward the optimum. Trial points are
//! clamped to box bounds, and a non-finite objective counts as negative
//! infinity so the simplex walks away from it.

use crate::config::FitOptions;

use super::result::{ConvergenceHistory, OptimizationResult, TerminationReason};

/// Standard Nelder-Mead coefficients
const REFLECTION_COEF: f64 = 1.0;
const EXPANSION_COEF: f64 = 2.0;
const CONTRACTION_COEF: f64 = 0.5;
const SHRINK_COEF: f64 = 0.5;

/// A point in parameter space with its evaluation
#[derive(Debug, Clone)]
struct SimplexVertex {
    values: Vec<f64>,
    objective: f64,
}

/// Evaluates points and keeps the running history
struct Evaluator<'a, F> {
    objective: F,
    bounds: &'a [(f64, f64)],
    history: ConvergenceHistory,
}

impl<F: Fn(&[f64]) -> f64> Evaluator<'_, F> {
    fn vertex(&mut self, mut values: Vec<f64>) -> SimplexVertex {
        clamp_to_bounds(&mut values, self.bounds);
        let raw = (self.objective)(values.as_slice());
        let objective = if raw.is_nan() { f64::NEG_INFINITY } else { raw };
        self.history.record(objective);
        SimplexVertex { values, objective }
    }
}

/// Initialize the simplex: the start point plus one step along each axis
fn initialize_simplex<F: Fn(&[f64]) -> f64>(
    evaluator: &mut Evaluator<'_, F>,
    start: &[f64],
    step: &[f64],
) -> Vec<SimplexVertex> {
    let mut simplex = Vec::with_capacity(start.len() + 1);
    simplex.push(evaluator.vertex(start.to_vec()));

    for (i, &delta) in step.iter().enumerate() {
        let mut point = start.to_vec();
        let (min, max) = evaluator.bounds[i];

        // Step away from whichever bound leaves room
        if point[i] + delta <= max {
            point[i] += delta;
        } else if point[i] - delta >= min {
            point[i] -= delta;
        } else {
            point[i] = 0.5 * (min + max);
        }

        simplex.push(evaluator.vertex(point));
    }

    simplex
}

/// Calculate the centroid of all points except the worst
fn centroid(simplex: &[SimplexVertex]) -> Vec<f64> {
    let n = simplex[0].values.len();
    let mut center = vec![0.0; n];

    for vertex in simplex.iter().take(simplex.len() - 1) {
        for (i, val) in vertex.values.iter().enumerate() {
            center[i] += val;
        }
    }

    let count = (simplex.len() - 1) as f64;
    for val in &mut center {
        *val /= count;
    }

    center
}

/// Reflect a point through the centroid
fn reflect(point: &[f64], centroid: &[f64], coef: f64) -> Vec<f64> {
    point
        .iter()
        .zip(centroid.iter())
        .map(|(p, c)| c + coef * (c - p))
        .collect()
}

/// Move a point toward `anchor` by `coef`
fn toward(anchor: &[f64], point: &[f64], coef: f64) -> Vec<f64> {
    anchor
        .iter()
        .zip(point.iter())
        .map(|(a, p)| a + coef * (p - a))
        .collect()
}

fn clamp_to_bounds(values: &mut [f64], bounds: &[(f64, f64)]) {
    for (val, (min, max)) in values.iter_mut().zip(bounds.iter()) {
        *val = val.clamp(*min, *max);
    }
}

/// Largest coordinate distance from the best vertex
fn simplex_size(simplex: &[SimplexVertex]) -> f64 {
    let best = &simplex[0].values;
    simplex
        .iter()
        .skip(1)
        .flat_map(|v| v.values.iter().zip(best.iter()).map(|(a, b)| (a - b).abs()))
        .fold(0.0_f64, f64::max)
}

/// Spread of objective values across the simplex
fn objective_spread(simplex: &[SimplexVertex]) -> f64 {
    let best = simplex[0].objective;
    simplex
        .iter()
        .skip(1)
        .map(|v| (best - v.objective).abs())
        .fold(0.0_f64, f64::max)
}

fn sort_best_first(simplex: &mut [SimplexVertex]) {
    simplex.sort_by(|a, b| b.objective.total_cmp(&a.objective));
}

/// Both the points and the objective values have to agree
fn is_converged(simplex: &[SimplexVertex], options: &FitOptions) -> bool {
    let scale = simplex[0].objective.abs().max(1.0);
    simplex_size(simplex) <= options.x_tolerance
        && objective_spread(simplex) <= options.f_tolerance * scale
}

/// Maximize `objective` inside box `bounds`, starting from `start`.
///
/// `step` sets the initial simplex edge along each coordinate. All three
/// slices must have the same length.
pub fn maximize<F>(
    objective: F,
    start: &[f64],
    step: &[f64],
    bounds: &[(f64, f64)],
    options: &FitOptions,
) -> OptimizationResult
where
    F: Fn(&[f64]) -> f64,
{
    let mut evaluator = Evaluator {
        objective,
        bounds,
        history: ConvergenceHistory::new(),
    };

    let mut simplex = initialize_simplex(&mut evaluator, start, step);
    let mut iteration = 0;
    let mut converged = false;

    while iteration < options.max_iterations {
        sort_best_first(&mut simplex);

        if simplex[0].objective.is_finite() && is_converged(&simplex, options) {
            converged = true;
            break;
        }

        iteration += 1;

        let worst_idx = simplex.len() - 1;
        let best_objective = simplex[0].objective;
        let second_worst_objective = simplex[worst_idx - 1].objective;
        let worst_objective = simplex[worst_idx].objective;
        let worst_values = simplex[worst_idx].values.clone();
        let cent = centroid(&simplex);

        let reflected = evaluator.vertex(reflect(&worst_values, &cent, REFLECTION_COEF));

        if reflected.objective > best_objective {
            let expanded = evaluator.vertex(reflect(&worst_values, &cent, EXPANSION_COEF));
            simplex[worst_idx] = if expanded.objective > reflected.objective {
                expanded
            } else {
                reflected
            };
        } else if reflected.objective > second_worst_objective {
            simplex[worst_idx] = reflected;
        } else {
            // Outside contraction if the reflection helped at all, inside otherwise
            let (contract_from, reference) = if reflected.objective > worst_objective {
                (&reflected.values, reflected.objective)
            } else {
                (&worst_values, worst_objective)
            };

            let contracted = evaluator.vertex(toward(&cent, contract_from, CONTRACTION_COEF));

            if contracted.objective > reference {
                simplex[worst_idx] = contracted;
            } else {
                // Shrink the simplex toward the best point
                let best_values = simplex[0].values.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    *vertex = evaluator.vertex(toward(&best_values, &vertex.values, SHRINK_COEF));
                }
            }
        }
    }

    sort_best_first(&mut simplex);
    let best = simplex.swap_remove(0);

    let termination_reason = if !best.objective.is_finite() {
        TerminationReason::NoFiniteObjective
    } else if converged {
        TerminationReason::Converged
    } else {
        TerminationReason::MaxIterationsReached
    };

    OptimizationResult {
        optimal_parameters: best.values,
        objective_value: best.objective,
        converged: termination_reason == TerminationReason::Converged,
        termination_reason,
        iterations: iteration,
        history: evaluator.history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> FitOptions {
        FitOptions {
            max_iterations: 5_000,
            x_tolerance: 1e-8,
            f_tolerance: 1e-12,
        }
    }

    #[test]
    fn test_reflect() {
        let reflected = reflect(&[0.0, 0.0], &[1.0, 1.0], 1.0);
        assert!((reflected[0] - 2.0).abs() < 0.001);
        assert!((reflected[1] - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_clamp_to_bounds() {
        let mut values = vec![-5.0, 15.0, 5.0];
        let bounds = vec![(0.0, 10.0), (0.0, 10.0), (0.0, 10.0)];

        clamp_to_bounds(&mut values, &bounds);

        assert_eq!(values, vec![0.0, 10.0, 5.0]);
    }

    #[test]
    fn test_centroid() {
        let simplex = vec![
            SimplexVertex {
                values: vec![0.0, 0.0],
                objective: 0.0,
            },
            SimplexVertex {
                values: vec![2.0, 0.0],
                objective: 0.0,
            },
            SimplexVertex {
                values: vec![1.0, 2.0], // worst, excluded
                objective: -1.0,
            },
        ];

        let cent = centroid(&simplex);
        assert!((cent[0] - 1.0).abs() < 0.001);
        assert!(cent[1].abs() < 0.001);
    }

    #[test]
    fn test_maximizes_concave_quadratic() {
        let f = |x: &[f64]| -(x[0] - 1.5).powi(2) - 2.0 * (x[1] + 0.5).powi(2);
        let bounds = [(-10.0, 10.0), (-10.0, 10.0)];
        let result = maximize(f, &[0.0, 0.0], &[0.5, 0.5], &bounds, &options());

        assert!(result.converged);
        assert_eq!(result.termination_reason, TerminationReason::Converged);
        assert!((result.optimal_parameters[0] - 1.5).abs() < 1e-5);
        assert!((result.optimal_parameters[1] + 0.5).abs() < 1e-5);
        assert!(result.evaluations() > result.iterations);
    }

    #[test]
    fn test_rosenbrock() {
        let f = |x: &[f64]| -(100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2));
        let bounds = [(-5.0, 5.0), (-5.0, 5.0)];
        let result = maximize(f, &[-1.2, 1.0], &[0.1, 0.1], &bounds, &options());

        assert!(result.converged);
        assert!((result.optimal_parameters[0] - 1.0).abs() < 1e-3);
        assert!((result.optimal_parameters[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_optimum_on_bound() {
        let f = |x: &[f64]| x[0];
        let result = maximize(f, &[0.0], &[0.3], &[(-1.0, 1.0)], &options());
        assert!((result.optimal_parameters[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nan_objective_is_avoided() {
        let f = |x: &[f64]| if x[0] < 0.0 { f64::NAN } else { -(x[0] - 0.25).powi(2) };
        let result = maximize(f, &[0.5], &[0.2], &[(-1.0, 1.0)], &options());
        assert!((result.optimal_parameters[0] - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_iteration_limit() {
        let f = |x: &[f64]| -(x[0] * x[0] + x[1] * x[1]);
        let limited = FitOptions {
            max_iterations: 3,
            ..options()
        };
        let result = maximize(f, &[3.0, 3.0], &[0.1, 0.1], &[(-5.0, 5.0), (-5.0, 5.0)], &limited);
        assert!(!result.converged);
        assert_eq!(result.termination_reason, TerminationReason::MaxIterationsReached);
        assert_eq!(result.iterations, 3);
    }
}
