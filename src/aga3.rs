use std::f64::consts::FRAC_PI_4;

use log::debug;

use crate::discharge::{self, DischargeConstants, DischargeSolution, N4};
use crate::geometry::MeterGeometry;
use crate::units::m3h_to_mmscfd;

/// Universal gas constant in bar·m³/(kmol·K).
pub const R_: f64 = 0.0831451;
/// Folds mm², mbar and hours into the mass-flow factor.
pub const NC: f64 = 0.036;
/// Ceiling for the flow-parameter ratio F_le / F_lp.
pub const F_L_CAP: f64 = 1000.0;

/// Density in kg/m³ from the real-gas law `p·M / (Z·R·T)`.
pub fn density(pressure_bar: f64, molar_mass: f64, z: f64, temperature_k: f64) -> f64 {
    (pressure_bar * molar_mass) / (z * R_ * temperature_k)
}

/// Flowing state seen by the meter, in internal units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowingParams {
    /// Upstream absolute pressure, bar.
    pub pressure_u: f64,
    /// Differential pressure, mbar.
    pub differential: f64,
    /// Dynamic viscosity, cP.
    pub viscosity: f64,
    /// Isentropic exponent. Zero or below disables the expansion correction.
    pub k: f64,
    /// Density at flowing conditions, kg/m³.
    pub sigma_f: f64,
    /// Density at base conditions, kg/m³.
    pub sigma_b: f64,
}

pub struct Aga3 {
    pub flowing_params: FlowingParams,
    pub geometry: MeterGeometry,
}

/// Everything the flow equation produced, including intermediates for audit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSolution {
    pub e_v: f64,
    pub y: f64,
    pub f_l: f64,
    pub f_l_capped: bool,
    pub constants: DischargeConstants,
    pub discharge: DischargeSolution,
    /// kg/h
    pub q_m: f64,
    /// Standard m³/h
    pub q_v_b: f64,
    pub mmscfd: f64,
}

impl Aga3 {
    pub fn x_factor(&self) -> f64 {
        self.flowing_params.differential / (self.flowing_params.pressure_u * 1000.0)
    }

    pub fn y_factor(&self) -> f64 {
        if self.flowing_params.k <= 0.0 {
            return 1.0;
        }
        let y_p = (0.41 + 0.35 * self.geometry.beta().powi(4)) / self.flowing_params.k;

        1.0 - y_p * self.x_factor()
    }

    /// Viscous component of the flow parameter.
    pub fn f_le(&self) -> f64 {
        let d = self.geometry.orifice_d;
        (4000.0 * 0.1 * self.geometry.meter_d * self.flowing_params.viscosity)
            / (self.geometry.e_v() * self.y_factor() * d * d)
    }

    /// Inertial component of the flow parameter, `sqrt(2·rho_f·dP)`.
    pub fn f_lp(&self) -> f64 {
        (2.0 * self.flowing_params.sigma_f * self.flowing_params.differential).sqrt()
    }

    /// Flow parameter passed to the discharge-coefficient solve and whether it was capped.
    pub fn f_l(&self) -> (f64, bool) {
        let f_le = self.f_le();
        let f_lp = self.f_lp();
        if f_le < F_L_CAP * f_lp {
            (f_le / f_lp, false)
        } else {
            (F_L_CAP, true)
        }
    }

    pub fn mass_flow_factor(&self) -> f64 {
        FRAC_PI_4 * NC * self.geometry.e_v() * self.geometry.orifice_d.powi(2)
    }

    /// Mass flow in kg/h for a given discharge coefficient.
    pub fn q_m(&self, cd: f64) -> f64 {
        self.mass_flow_factor() * cd * self.y_factor() * self.f_lp()
    }

    /// Volume flow at base conditions in m³/h.
    pub fn q_v_b(&self, cd: f64) -> f64 {
        self.q_m(cd) / self.flowing_params.sigma_b
    }

    /// Solves for the discharge coefficient and evaluates the flow.
    pub fn solve(&self) -> FlowSolution {
        let e_v = self.geometry.e_v();
        let y = self.y_factor();
        let (f_l, f_l_capped) = self.f_l();
        debug!("E_v = {e_v:.6}, Y = {y:.6}, F_l = {f_l:.6e} (capped: {f_l_capped})");

        let constants =
            DischargeConstants::flange_tap(self.geometry.meter_d, N4, self.geometry.beta());
        let discharge = discharge::solve(&constants, f_l);

        let q_m = self.q_m(discharge.cd);
        let q_v_b = q_m / self.flowing_params.sigma_b;

        FlowSolution {
            e_v,
            y,
            f_l,
            f_l_capped,
            constants,
            discharge,
            q_m,
            q_v_b,
            mmscfd: m3h_to_mmscfd(q_v_b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn meter(differential: f64, k: f64) -> Aga3 {
        let pressure_u = 7.910355;
        Aga3 {
            flowing_params: FlowingParams {
                pressure_u,
                differential,
                viscosity: 0.01,
                k,
                sigma_f: density(pressure_u, 16.83, 0.985, 294.261),
                sigma_b: density(1.015598, 16.83, 0.998, 288.706),
            },
            geometry: MeterGeometry {
                orifice_d: 100.0,
                meter_d: 200.0,
            },
        }
    }

    #[test]
    fn density_follows_real_gas_law() {
        let rho = density(10.0, 16.043, 1.0, 300.0);
        assert_relative_eq!(rho, 6.431728, epsilon = 1e-6);
        assert_relative_eq!(density(10.0, 16.043, 0.9, 300.0), rho / 0.9, max_relative = 1e-12);
    }

    #[test]
    fn expansion_factor() {
        let aga3 = meter(100.0, 1.3);
        let expected = 1.0 - (0.41 + 0.35 * 0.0625) / 1.3 * (100.0 / 7910.355);
        assert_relative_eq!(aga3.y_factor(), expected, epsilon = 1e-12);
        assert!(aga3.y_factor() < 1.0);
    }

    #[test]
    fn zero_k_disables_expansion() {
        for differential in [1.0, 100.0, 5000.0] {
            assert_eq!(meter(differential, 0.0).y_factor(), 1.0);
            assert_eq!(meter(differential, -1.0).y_factor(), 1.0);
        }
    }

    #[test]
    fn flow_parameter_is_capped() {
        let mut aga3 = meter(100.0, 1.3);
        let (f_l, capped) = aga3.f_l();
        assert!(!capped);
        assert_relative_eq!(f_l, aga3.f_le() / aga3.f_lp());

        aga3.flowing_params.viscosity = 1e9;
        assert_eq!(aga3.f_l(), (F_L_CAP, true));
    }

    #[test]
    fn flow_matches_hand_evaluation() {
        let aga3 = meter(100.0, 1.3);
        let solution = aga3.solve();

        assert!(solution.discharge.converged);
        assert!((0.59..=0.62).contains(&solution.discharge.cd));

        let cd = solution.discharge.cd;
        let e_v = 1.0 / (1.0f64 - 0.0625).sqrt();
        let q_m = FRAC_PI_4 * NC * e_v * 100.0 * 100.0 * cd * solution.y * aga3.f_lp();
        assert_relative_eq!(solution.q_m, q_m, max_relative = 1e-12);
        assert_relative_eq!(solution.q_v_b, aga3.q_v_b(cd), max_relative = 1e-12);
        assert_relative_eq!(solution.mmscfd, 6.929, epsilon = 5e-3);
    }

    #[test]
    fn negative_expansion_keeps_cd0_and_finite_flow() {
        let aga3 = meter(30_000.0, 1.3);
        let solution = aga3.solve();

        assert!(solution.y < 0.0);
        assert!(solution.f_l < 0.0);
        assert!(!solution.f_l_capped);
        assert_eq!(solution.discharge.cd, solution.constants.cd0);
        assert_eq!(solution.discharge.iterations, 0);
        assert!(solution.q_m.is_finite());
        assert!(solution.mmscfd.is_finite());
    }

    #[test]
    fn flow_rises_with_differential() {
        let mut previous = 0.0;
        for differential in [10.0, 50.0, 100.0, 250.0, 500.0, 1000.0] {
            let flow = meter(differential, 1.3).solve().mmscfd;
            assert!(flow > previous, "{flow} <= {previous} at {differential} mbar");
            previous = flow;
        }
    }
}
