//! One orifice-meter flow computation, from declared inputs to reported flow.

use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};

use crate::advisory::Advisory;
use crate::aga3::{density, Aga3, FlowingParams, F_L_CAP};
use crate::error::{ConfigurationError, DomainError, Error, PropertyEvaluationError};
use crate::gas::{self, Aga8Detail, Composition, GasProperties, GasPropertiesProvider};
use crate::geometry::{typical_expansion, ReferenceGeometry};
use crate::units::{mmscfd_to_m3h, UnitSet};

/// Isentropic exponent used when neither the user nor the equation of state gives one.
pub const DEFAULT_K: f64 = 1.3;
/// Dynamic viscosity of natural gas, cP.
pub const DEFAULT_VISCOSITY: f64 = 0.010268;

/// Where the static pressure is measured relative to the plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressureTap {
    #[default]
    Upstream,
    Downstream,
}

impl FromStr for PressureTap {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upstream" | "up" => Ok(PressureTap::Upstream),
            "downstream" | "down" => Ok(PressureTap::Downstream),
            _ => Err(ConfigurationError::UnknownTap(s.to_string())),
        }
    }
}

impl fmt::Display for PressureTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PressureTap::Upstream => "upstream",
            PressureTap::Downstream => "downstream",
        })
    }
}

/// Flowing conditions in the declared units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConditions {
    pub gauge_pressure: f64,
    pub atmospheric_pressure: f64,
    pub temperature: f64,
    pub differential: f64,
    pub tap: PressureTap,
}

/// Base (standard) conditions in the declared units. Pressure is absolute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseConditions {
    pub pressure: f64,
    pub temperature: f64,
}

/// Plate and tube dimensions in the declared units. Expansion coefficients are
/// per degree of the declared temperature unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrificeGeometry {
    pub orifice_diameter: f64,
    pub pipe_diameter: f64,
    pub orifice_reference_temperature: f64,
    pub pipe_reference_temperature: f64,
    pub orifice_expansion: f64,
    pub pipe_expansion: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GasSource {
    /// Used as given; the equation of state is never consulted.
    Manual(GasProperties),
    Composition(Composition),
}

/// Everything one computation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterRequest {
    pub units: UnitSet,
    pub flow: FlowConditions,
    pub base: BaseConditions,
    pub geometry: OrificeGeometry,
    /// cP
    pub viscosity: f64,
    pub gas: GasSource,
    /// Fallback exponent for a composition whose evaluation reports none.
    pub default_k: f64,
}

/// Outcome of one computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowResult {
    /// Million standard cubic feet per day.
    pub mmscfd: f64,
    /// Standard m³/h.
    pub m3_per_hour: f64,
    /// kg/h
    pub mass_flow: f64,
    /// Absolute pressure the densities and gas properties were evaluated at, bar.
    pub upstream_pressure: f64,
    pub gas: GasProperties,
    pub beta: f64,
    pub e_v: f64,
    pub y: f64,
    pub f_l: f64,
    pub cd: f64,
    pub low_reynolds: bool,
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
    pub advisories: Vec<Advisory>,
}

/// Inputs after unit normalisation: bar(a), mbar, K, mm, per K.
struct Normalized {
    pressure: f64,
    differential: f64,
    temperature: f64,
    base_pressure: f64,
    base_temperature: f64,
    geometry: ReferenceGeometry,
}

fn normalize(request: &MeterRequest) -> Result<Normalized, DomainError> {
    let units = &request.units;
    let flow = &request.flow;
    let geometry = &request.geometry;

    let atmospheric = DomainError::require_positive(
        "atmospheric pressure",
        units.pressure.to_bar(flow.atmospheric_pressure),
    )?;
    let gauge = DomainError::require_finite(
        "flowing gauge pressure",
        units.pressure.to_bar(flow.gauge_pressure),
    )?;
    let pressure = DomainError::require_positive("flowing absolute pressure", gauge + atmospheric)?;
    let base_pressure =
        DomainError::require_positive("base pressure", units.pressure.to_bar(request.base.pressure))?;
    let differential = DomainError::require_positive(
        "differential pressure",
        units.differential.to_mbar(flow.differential),
    )?;

    let kelvin = |quantity: &'static str, value: f64| {
        DomainError::require_above_absolute_zero(quantity, units.temperature.to_kelvin(value))
    };
    let temperature = kelvin("flowing temperature", flow.temperature)?;
    let base_temperature = kelvin("base temperature", request.base.temperature)?;
    let orifice_t_ref = kelvin(
        "orifice reference temperature",
        geometry.orifice_reference_temperature,
    )?;
    let meter_t_ref = kelvin(
        "pipe reference temperature",
        geometry.pipe_reference_temperature,
    )?;

    Ok(Normalized {
        pressure,
        differential,
        temperature,
        base_pressure,
        base_temperature,
        geometry: ReferenceGeometry {
            orifice_d: units.length.to_mm(geometry.orifice_diameter),
            meter_d: units.length.to_mm(geometry.pipe_diameter),
            orifice_t_ref,
            meter_t_ref,
            orifice_alpha: units.temperature.expansion_per_kelvin(geometry.orifice_expansion),
            meter_alpha: units.temperature.expansion_per_kelvin(geometry.pipe_expansion),
        },
    })
}

/// Pressure at the upstream tap. A downstream tap reads lower by the differential.
pub fn upstream_pressure(tap: PressureTap, pressure_bar: f64, differential_mbar: f64) -> f64 {
    match tap {
        PressureTap::Upstream => pressure_bar,
        PressureTap::Downstream => pressure_bar + differential_mbar / 1000.0,
    }
}

/// Equation of state a request will consult. Manual properties never reach one,
/// so `method` is only resolved for a composition.
pub fn provider_for(
    request: &MeterRequest,
    method: &str,
) -> Result<Box<dyn GasPropertiesProvider>, PropertyEvaluationError> {
    match request.gas {
        GasSource::Composition(_) => gas::provider(method),
        GasSource::Manual(_) => Ok(Box::new(Aga8Detail)),
    }
}

fn gas_properties(
    request: &MeterRequest,
    provider: &dyn GasPropertiesProvider,
    upstream: f64,
    temperature: f64,
    base_pressure: f64,
    base_temperature: f64,
) -> Result<GasProperties, Error> {
    let properties = match &request.gas {
        GasSource::Manual(properties) => {
            debug!("using manual gas properties {properties:?}");
            *properties
        }
        GasSource::Composition(composition) => {
            let flowing = provider.evaluate(upstream, temperature, composition)?;
            let base = provider.evaluate(base_pressure, base_temperature, composition)?;
            GasProperties {
                z_f: flowing.z,
                z_b: base.z,
                molar_mass: base.molar_mass,
                k: flowing.k.unwrap_or(request.default_k),
            }
        }
    };

    DomainError::require_compressibility("Z_f", properties.z_f)?;
    DomainError::require_compressibility("Z_b", properties.z_b)?;
    DomainError::require_positive("molar mass", properties.molar_mass)?;
    DomainError::require_finite("isentropic exponent", properties.k)?;
    Ok(properties)
}

fn advise(advisories: &mut Vec<Advisory>, advisory: Advisory) {
    warn!("{advisory}");
    advisories.push(advisory);
}

/// Runs the full AGA-3 computation.
///
/// Unit normalisation, upstream pressure resolution, gas properties, geometry at
/// flowing temperature, discharge coefficient and flow, in that order. Domain and
/// property failures abort with no result; advisories ride along on success.
pub fn compute(
    request: &MeterRequest,
    provider: &dyn GasPropertiesProvider,
) -> Result<FlowResult, Error> {
    let inputs = normalize(request)?;
    DomainError::require_positive("viscosity", request.viscosity)?;
    info!(
        "normalised inputs: p = {:.5} bar(a), dP = {:.3} mbar, T = {:.2} K",
        inputs.pressure, inputs.differential, inputs.temperature
    );

    let mut advisories = Vec::new();
    for (element, per_kelvin) in [
        ("orifice", inputs.geometry.orifice_alpha),
        ("pipe", inputs.geometry.meter_alpha),
    ] {
        if per_kelvin >= 0.0 && !typical_expansion(per_kelvin) {
            advise(
                &mut advisories,
                Advisory::UnusualExpansionCoefficient {
                    element,
                    per_kelvin,
                },
            );
        }
    }

    let upstream = upstream_pressure(request.flow.tap, inputs.pressure, inputs.differential);
    debug!("{} tap, upstream pressure {upstream:.5} bar(a)", request.flow.tap);

    let gas = gas_properties(
        request,
        provider,
        upstream,
        inputs.temperature,
        inputs.base_pressure,
        inputs.base_temperature,
    )?;
    info!(
        "gas properties: Z_f = {:.6}, Z_b = {:.6}, M = {:.4}, k = {:.4}",
        gas.z_f, gas.z_b, gas.molar_mass, gas.k
    );
    if gas.k > 0.0 && !(gas.k > 1.0 && gas.k <= 2.0) {
        advise(&mut advisories, Advisory::UnusualIsentropicExponent { k: gas.k });
    }

    let sigma_f = DomainError::require_positive(
        "flowing density",
        density(upstream, gas.molar_mass, gas.z_f, inputs.temperature),
    )?;
    let sigma_b = DomainError::require_positive(
        "base density",
        density(
            inputs.base_pressure,
            gas.molar_mass,
            gas.z_b,
            inputs.base_temperature,
        ),
    )?;

    let geometry = inputs.geometry.at_temperature(inputs.temperature)?;
    debug!(
        "d = {:.4} mm, D = {:.4} mm, beta = {:.6}",
        geometry.orifice_d,
        geometry.meter_d,
        geometry.beta()
    );
    if !geometry.within_recommended_range() {
        advise(
            &mut advisories,
            Advisory::BetaOutsideRecommended {
                beta: geometry.beta(),
            },
        );
    }

    let aga3 = Aga3 {
        flowing_params: FlowingParams {
            pressure_u: upstream,
            differential: inputs.differential,
            viscosity: request.viscosity,
            k: gas.k,
            sigma_f,
            sigma_b,
        },
        geometry,
    };
    let solution = aga3.solve();

    if solution.y < 0.0 {
        advise(
            &mut advisories,
            Advisory::NegativeExpansionFactor { y: solution.y },
        );
    }
    if solution.f_l_capped {
        advise(&mut advisories, Advisory::FlowParameterCapped { cap: F_L_CAP });
    }
    let discharge = solution.discharge;
    // Zero iterations means F_l was not positive, which only a negative Y produces.
    if !discharge.converged && discharge.iterations > 0 {
        advise(
            &mut advisories,
            Advisory::SolverNotConverged {
                iterations: discharge.iterations,
                residual: discharge.residual,
            },
        );
    }

    info!(
        "Cd = {:.6} after {} iterations, Qv = {:.6} MMSCF/D",
        discharge.cd, discharge.iterations, solution.mmscfd
    );

    Ok(FlowResult {
        mmscfd: solution.mmscfd,
        m3_per_hour: mmscfd_to_m3h(solution.mmscfd),
        mass_flow: solution.q_m,
        upstream_pressure: upstream,
        gas,
        beta: geometry.beta(),
        e_v: solution.e_v,
        y: solution.y,
        f_l: solution.f_l,
        cd: discharge.cd,
        low_reynolds: discharge.low_reynolds,
        iterations: discharge.iterations,
        residual: discharge.residual,
        converged: discharge.converged,
        advisories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::gas::StateProperties;

    struct Unreachable;

    impl GasPropertiesProvider for Unreachable {
        fn evaluate(
            &self,
            _: f64,
            _: f64,
            _: &Composition,
        ) -> Result<StateProperties, PropertyEvaluationError> {
            panic!("manual properties must not reach the equation of state");
        }
    }

    fn request() -> MeterRequest {
        MeterRequest {
            units: UnitSet::default(),
            flow: FlowConditions {
                gauge_pressure: 100.0,
                atmospheric_pressure: 14.73,
                temperature: 70.0,
                differential: 100.0,
                tap: PressureTap::Upstream,
            },
            base: BaseConditions {
                pressure: 14.73,
                temperature: 60.0,
            },
            geometry: OrificeGeometry {
                orifice_diameter: 100.0,
                pipe_diameter: 200.0,
                orifice_reference_temperature: 68.0,
                pipe_reference_temperature: 68.0,
                orifice_expansion: 9.25e-6,
                pipe_expansion: 6.2e-6,
            },
            viscosity: 0.01,
            gas: GasSource::Manual(GasProperties {
                z_f: 0.985,
                z_b: 0.998,
                molar_mass: 16.83,
                k: 1.3,
            }),
            default_k: DEFAULT_K,
        }
    }

    #[test]
    fn tap_tokens() {
        assert_eq!("Upstream".parse::<PressureTap>().unwrap(), PressureTap::Upstream);
        assert_eq!("DOWNSTREAM".parse::<PressureTap>().unwrap(), PressureTap::Downstream);
        assert!(matches!(
            "sideways".parse::<PressureTap>(),
            Err(ConfigurationError::UnknownTap(_))
        ));
    }

    #[test]
    fn method_is_only_resolved_for_a_composition() {
        assert!(provider_for(&request(), "gerg").is_ok());

        let mut request = request();
        let methane = Composition::new().with(gas::Component::Methane, 100.0);
        request.gas = GasSource::Composition(methane);
        assert!(provider_for(&request, "detail").is_ok());
        assert!(matches!(
            provider_for(&request, "gerg"),
            Err(PropertyEvaluationError::UnsupportedMethod(method)) if method == "gerg"
        ));
    }

    #[test]
    fn downstream_tap_adds_differential() {
        assert_eq!(upstream_pressure(PressureTap::Upstream, 7.0, 250.0), 7.0);
        assert_relative_eq!(upstream_pressure(PressureTap::Downstream, 7.0, 250.0), 7.25);
    }

    #[test]
    fn manual_properties_flow() {
        let result = compute(&request(), &Unreachable).unwrap();

        assert_relative_eq!(result.mmscfd, 6.929, epsilon = 5e-3);
        assert_relative_eq!(result.m3_per_hour, mmscfd_to_m3h(result.mmscfd));
        assert!((0.59..=0.62).contains(&result.cd));
        assert!(result.converged);
        assert!(!result.low_reynolds);
        assert!(result.advisories.is_empty(), "{:?}", result.advisories);
        assert_eq!(result.gas.k, 1.3);
    }

    #[test]
    fn fahrenheit_expansion_is_applied_per_kelvin() {
        let result = compute(&request(), &Unreachable).unwrap();
        // 2 °F above the 68 °F reference.
        let d = 100.0 * (1.0 + 9.25e-6 * 9.0 / 5.0 * (2.0 * 5.0 / 9.0));
        let big_d = 200.0 * (1.0 + 6.2e-6 * 9.0 / 5.0 * (2.0 * 5.0 / 9.0));
        assert_relative_eq!(result.beta, d / big_d, epsilon = 1e-12);
    }

    #[test]
    fn wide_beta_is_advisory_only() {
        let mut request = request();
        request.geometry.orifice_diameter = 160.0;
        let result = compute(&request, &Unreachable).unwrap();
        assert!(result
            .advisories
            .iter()
            .any(|a| matches!(a, Advisory::BetaOutsideRecommended { .. })));
        assert!(result.mmscfd > 0.0);
    }

    #[test]
    fn domain_errors_abort() {
        let mut bad_beta = request();
        bad_beta.geometry.orifice_diameter = 200.0;
        assert!(matches!(
            compute(&bad_beta, &Unreachable),
            Err(Error::Domain(DomainError::BetaOutOfRange(_)))
        ));

        let mut vacuum = request();
        vacuum.flow.gauge_pressure = -14.73;
        assert!(matches!(
            compute(&vacuum, &Unreachable),
            Err(Error::Domain(DomainError::NotPositive {
                quantity: "flowing absolute pressure",
                ..
            }))
        ));

        let mut frozen = request();
        frozen.base.temperature = -500.0;
        assert!(matches!(
            compute(&frozen, &Unreachable),
            Err(Error::Domain(DomainError::BelowAbsoluteZero { .. }))
        ));

        let mut no_dp = request();
        no_dp.flow.differential = 0.0;
        assert!(compute(&no_dp, &Unreachable).is_err());

        let mut bad_z = request();
        bad_z.gas = GasSource::Manual(GasProperties {
            z_f: 0.0,
            z_b: 0.998,
            molar_mass: 16.83,
            k: 1.3,
        });
        assert!(matches!(
            compute(&bad_z, &Unreachable),
            Err(Error::Domain(DomainError::Compressibility { quantity: "Z_f", .. }))
        ));
    }

    fn has(result: &FlowResult, wanted: fn(&Advisory) -> bool) -> bool {
        result.advisories.iter().any(wanted)
    }

    #[test]
    fn huge_differential_flags_negative_expansion() {
        let mut request = request();
        request.flow.differential = 30_000.0;
        let result = compute(&request, &Unreachable).unwrap();
        assert!(result.y < 0.0);
        assert!(has(&result, |a| matches!(
            a,
            Advisory::NegativeExpansionFactor { .. }
        )));
        assert!(!has(&result, |a| matches!(
            a,
            Advisory::SolverNotConverged { .. }
        )));
        assert!(result.cd.is_finite() && result.cd > 0.0);
        assert!(result.mmscfd.is_finite());
        assert!(result.m3_per_hour.is_finite());
        assert!(result.mass_flow.is_finite());
        assert!(!result.converged);
    }

    #[test]
    fn zero_expansion_coefficient_is_advisory_only() {
        let mut request = request();
        request.geometry.orifice_expansion = 0.0;
        let result = compute(&request, &Unreachable).unwrap();
        assert!(has(&result, |a| matches!(
            a,
            Advisory::UnusualExpansionCoefficient {
                element: "orifice",
                ..
            }
        )));
        assert_eq!(result.advisories.len(), 1);
        assert_relative_eq!(result.mmscfd, 6.929, epsilon = 5e-3);
    }

    #[test]
    fn out_of_range_isentropic_exponent_is_advisory_only() {
        let mut request = request();
        request.gas = GasSource::Manual(GasProperties {
            z_f: 0.985,
            z_b: 0.998,
            molar_mass: 16.83,
            k: 2.5,
        });
        let result = compute(&request, &Unreachable).unwrap();
        assert!(has(&result, |a| matches!(
            a,
            Advisory::UnusualIsentropicExponent { k } if *k == 2.5
        )));
        assert!(result.mmscfd > 0.0);
    }

    #[test]
    fn zero_isentropic_exponent_raises_no_advisory() {
        let mut request = request();
        request.gas = GasSource::Manual(GasProperties {
            z_f: 0.985,
            z_b: 0.998,
            molar_mass: 16.83,
            k: 0.0,
        });
        let result = compute(&request, &Unreachable).unwrap();
        assert_eq!(result.y, 1.0);
        assert!(result.advisories.is_empty(), "{:?}", result.advisories);
    }

    #[test]
    fn capped_flow_parameter_is_advisory_only() {
        let mut request = request();
        request.viscosity = 1e5;
        let result = compute(&request, &Unreachable).unwrap();
        assert_eq!(result.f_l, F_L_CAP);
        assert!(has(&result, |a| matches!(
            a,
            Advisory::FlowParameterCapped { .. }
        )));
        assert!(result.converged);
        assert!(result.low_reynolds);
        assert!(result.mmscfd.is_finite() && result.mmscfd > 0.0);
    }

    #[test]
    fn unconverged_discharge_coefficient_is_advisory_only() {
        let mut request = request();
        request.geometry.orifice_diameter = 24.75;
        request.geometry.pipe_diameter = 25.0;
        request.viscosity = 1e7;
        let result = compute(&request, &Unreachable).unwrap();
        assert!(!result.converged);
        assert!(has(&result, |a| matches!(
            a,
            Advisory::SolverNotConverged { iterations, residual }
                if *iterations > 0 && residual.is_finite()
        )));
        assert!(result.cd.is_finite() && result.cd > 0.0);
        assert!(result.mmscfd.is_finite() && result.mmscfd > 0.0);
    }
}
