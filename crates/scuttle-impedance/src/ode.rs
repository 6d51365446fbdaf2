//! Fixed-step Runge–Kutta 4 integration for the two-state admittance model.

/// One RK4 step of a two-state ODE `ẋ = f(x)`.
#[must_use]
pub fn rk4_step<F>(f: &F, x: [f64; 2], dt: f64) -> [f64; 2]
where
    F: Fn([f64; 2]) -> [f64; 2],
{
    let add = |a: [f64; 2], b: [f64; 2], scale: f64| [a[0] + b[0] * scale, a[1] + b[1] * scale];

    let k1 = f(x);
    let k2 = f(add(x, k1, dt / 2.0));
    let k3 = f(add(x, k2, dt / 2.0));
    let k4 = f(add(x, k3, dt));

    [
        x[0] + dt / 6.0 * (k1[0] + 2.0 * k2[0] + 2.0 * k3[0] + k4[0]),
        x[1] + dt / 6.0 * (k1[1] + 2.0 * k2[1] + 2.0 * k3[1] + k4[1]),
    ]
}

/// Integrate `ẋ = f(x)` over `duration` in `steps` equal RK4 steps.
#[must_use]
pub fn integrate_fixed<F>(f: &F, mut x: [f64; 2], duration: f64, steps: u32) -> [f64; 2]
where
    F: Fn([f64; 2]) -> [f64; 2],
{
    let dt = duration / f64::from(steps);
    for _ in 0..steps {
        x = rk4_step(f, x, dt);
    }
    x
}
