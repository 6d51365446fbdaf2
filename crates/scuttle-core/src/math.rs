//! Curve and root-finding helpers shared by the trajectory and workspace
//! code.

use nalgebra::Vector3;

/// Binomial weights of the quartic Bernstein basis.
const QUARTIC_WEIGHTS: [f64; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];

/// Evaluate a quartic Bézier curve at `t ∈ [0, 1]`.
#[must_use]
pub fn quartic_bezier(nodes: &[Vector3<f64>; 5], t: f64) -> Vector3<f64> {
    let s = 1.0 - t;
    let mut sum = Vector3::zeros();
    for (i, node) in nodes.iter().enumerate() {
        let basis = QUARTIC_WEIGHTS[i] * s.powi(4 - i as i32) * t.powi(i as i32);
        sum += node * basis;
    }
    sum
}

/// First derivative of a quartic Bézier curve with respect to `t`.
///
/// The derivative is the degree-3 curve over the forward differences of the
/// control polygon, scaled by the degree.
#[must_use]
pub fn quartic_bezier_derivative(nodes: &[Vector3<f64>; 5], t: f64) -> Vector3<f64> {
    let s = 1.0 - t;
    let cubic_weights = [1.0, 3.0, 3.0, 1.0];
    let mut sum = Vector3::zeros();
    for i in 0..4 {
        let basis = cubic_weights[i] * s.powi(3 - i as i32) * t.powi(i as i32);
        sum += (nodes[i + 1] - nodes[i]) * basis;
    }
    sum * 4.0
}

/// Largest real root of `a·x² + b·x + c = 0`.
///
/// Degenerates to the linear solution when `a` vanishes. Returns `None`
/// when no real root exists.
#[must_use]
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<f64> {
    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return None;
        }
        return Some(-c / b);
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    Some(((-b + sqrt_d) / (2.0 * a)).max((-b - sqrt_d) / (2.0 * a)))
}

/// Round to the nearest even integer. Keeps iteration counts splittable
/// into two equal halves.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_to_even(x: f64) -> i32 {
    ((x / 2.0).round() as i32) * 2
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_nodes() -> [Vector3<f64>; 5] {
        // Equally spaced nodes along x trace a straight line at unit speed
        // in curve parameter.
        [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.25, 0.0, 0.0),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(0.75, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        ]
    }

    // ---- quartic_bezier ----

    #[test]
    fn bezier_endpoints_interpolate() {
        let nodes = [
            Vector3::new(0.1, 0.2, 0.3),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(-0.4, 0.5, 0.6),
        ];
        assert_relative_eq!(quartic_bezier(&nodes, 0.0), nodes[0], epsilon = 1e-12);
        assert_relative_eq!(quartic_bezier(&nodes, 1.0), nodes[4], epsilon = 1e-12);
    }

    #[test]
    fn bezier_linear_case() {
        let nodes = line_nodes();
        for t in [0.1, 0.37, 0.5, 0.9] {
            assert_relative_eq!(quartic_bezier(&nodes, t).x, t, epsilon = 1e-12);
        }
    }

    // ---- quartic_bezier_derivative ----

    #[test]
    fn derivative_of_linear_case_is_constant() {
        let nodes = line_nodes();
        for t in [0.0, 0.25, 0.8, 1.0] {
            assert_relative_eq!(
                quartic_bezier_derivative(&nodes, t).x,
                1.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let nodes = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.3, 0.1, 0.0),
            Vector3::new(0.3, 0.1, 0.2),
            Vector3::new(0.6, -0.1, 0.2),
            Vector3::new(0.9, 0.0, 0.0),
        ];
        let t = 0.4;
        let h = 1e-7;
        let numeric = (quartic_bezier(&nodes, t + h) - quartic_bezier(&nodes, t - h)) / (2.0 * h);
        let analytic = quartic_bezier_derivative(&nodes, t);
        assert_relative_eq!(numeric, analytic, epsilon = 1e-5);
    }

    #[test]
    fn derivative_endpoint_velocity() {
        let nodes = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.1, 0.0, 0.0),
            Vector3::new(0.5, 0.5, 0.0),
            Vector3::new(0.9, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        ];
        // At the endpoints the derivative depends only on the first/last edge.
        assert_relative_eq!(
            quartic_bezier_derivative(&nodes, 0.0),
            (nodes[1] - nodes[0]) * 4.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            quartic_bezier_derivative(&nodes, 1.0),
            (nodes[4] - nodes[3]) * 4.0,
            epsilon = 1e-12
        );
    }

    // ---- solve_quadratic ----

    #[test]
    fn quadratic_positive_root() {
        // x² - x - 6 = 0 → roots 3 and -2.
        let root = solve_quadratic(1.0, -1.0, -6.0).unwrap();
        assert_relative_eq!(root, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn quadratic_linear_degenerate() {
        let root = solve_quadratic(0.0, 2.0, -1.0).unwrap();
        assert_relative_eq!(root, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn quadratic_no_real_root() {
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_none());
    }

    // ---- round_to_even ----

    #[test]
    fn rounds_to_nearest_even() {
        assert_eq!(round_to_even(15.9), 16);
        assert_eq!(round_to_even(16.9), 16);
        assert_eq!(round_to_even(17.1), 18);
        assert_eq!(round_to_even(0.4), 0);
    }
}
