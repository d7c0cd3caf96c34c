use nalgebra as na;

/// Advances `x' = f(x)` by one fixed step of the classic fourth-order Runge-Kutta method.
pub fn rk4_step<F, const N: usize>(f: F, x: na::SVector<f64, N>, dt: f64) -> na::SVector<f64, N>
where
    F: Fn(na::SVector<f64, N>) -> na::SVector<f64, N>,
{
    let k1 = f(x);
    let k2 = f(x + k1 * (0.5 * dt));
    let k3 = f(x + k2 * (0.5 * dt));
    let k4 = f(x + k3 * dt);
    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// Lumped two-node thermal model of an oven: a heating element coupled to a chamber, which in
/// turn leaks heat to the ambient.
#[derive(Debug, Clone, Copy)]
pub struct ThermalPlant {
    /// Heater power at 100% duty, in W.
    pub heater_power: f64,
    /// Heat capacity of the element, in J/K.
    pub element_capacity: f64,
    /// Heat capacity of the chamber, in J/K.
    pub chamber_capacity: f64,
    /// Thermal conductance from element to chamber, in W/K.
    pub element_to_chamber: f64,
    /// Thermal conductance from chamber to ambient, in W/K.
    pub chamber_to_ambient: f64,
    /// Ambient temperature, in degrees Celsius.
    pub ambient: f64,
}

impl Default for ThermalPlant {
    fn default() -> Self {
        Self {
            heater_power: 1000.0,
            element_capacity: 200.0,
            chamber_capacity: 2000.0,
            element_to_chamber: 20.0,
            chamber_to_ambient: 5.0,
            ambient: 25.0,
        }
    }
}

impl ThermalPlant {
    /// State with both nodes at ambient temperature.
    pub fn ambient_state(&self) -> na::Vector2<f64> {
        na::Vector2::repeat(self.ambient)
    }

    /// Implements the state-space realization of the oven, with state `[element, chamber]` and
    /// the heater duty `u` in `[0, 1]`:
    /// ┌     ┐   ┌                          ┐┌    ┐   ┌      ┐     ┌         ┐
    /// │ Tₑ' │ = │ -Gₑ/Cₑ     Gₑ/Cₑ         ││ Tₑ │ + │ P/Cₑ │ u + │ 0       │
    /// │ T꜀' │   │  Gₑ/C꜀  -(Gₑ + Gₐ)/C꜀    ││ T꜀ │   │ 0    │     │ GₐTₐ/C꜀ │
    /// └     ┘   └                          ┘└    ┘   └      ┘     └         ┘
    pub fn f(&self, x: na::Vector2<f64>, u: f64) -> na::Vector2<f64> {
        let ge = self.element_to_chamber;
        let ga = self.chamber_to_ambient;
        let ce = self.element_capacity;
        let cc = self.chamber_capacity;

        let mat_a = na::Matrix2::new(-ge / ce, ge / ce, ge / cc, -(ge + ga) / cc);
        let mat_b = na::Vector2::new(self.heater_power / ce, 0.0);
        let leak = na::Vector2::new(0.0, ga * self.ambient / cc);

        mat_a * x + mat_b * u.clamp(0.0, 1.0) + leak
    }

    /// The measured quantity: chamber temperature.
    pub fn h(&self, x: na::Vector2<f64>) -> f64 {
        x[1]
    }

    /// Steady-state chamber temperature reached at a constant duty `u`.
    pub fn steady_state(&self, u: f64) -> f64 {
        self.ambient + self.heater_power * u.clamp(0.0, 1.0) / self.chamber_to_ambient
    }

    /// Advances the plant by `dt` seconds with the duty held at `u`.
    pub fn step(&self, x: na::Vector2<f64>, u: f64, dt: f64) -> na::Vector2<f64> {
        rk4_step(|x| self.f(x, u), x, dt)
    }
}
