use std::fmt;

/// A non-fatal observation attached to a successful flow result.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Bore ratio outside the span where the correlation has its stated accuracy.
    BetaOutsideRecommended { beta: f64 },
    /// The expansion factor went negative, the differential pressure is out of range.
    NegativeExpansionFactor { y: f64 },
    /// The discharge coefficient is the last estimate, not a converged one.
    SolverNotConverged { iterations: usize, residual: f64 },
    /// Expansion coefficient (per kelvin) outside what metals usually show.
    UnusualExpansionCoefficient { element: &'static str, per_kelvin: f64 },
    UnusualIsentropicExponent { k: f64 },
    /// F_le / F_lp exceeded the cap and was clamped.
    FlowParameterCapped { cap: f64 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::BetaOutsideRecommended { beta } => write!(
                f,
                "tap-performance range exceeded: beta = {beta:.4}, recommended 0.10 to 0.75"
            ),
            Advisory::NegativeExpansionFactor { y } => write!(
                f,
                "expansion factor Y = {y:.6} is negative, check the differential pressure"
            ),
            Advisory::SolverNotConverged {
                iterations,
                residual,
            } => write!(
                f,
                "discharge coefficient not converged after {iterations} iterations (|delta| = {residual:e})"
            ),
            Advisory::UnusualExpansionCoefficient {
                element,
                per_kelvin,
            } => write!(
                f,
                "{element} expansion coefficient {per_kelvin:e} per K is outside 1e-7 to 1e-4"
            ),
            Advisory::UnusualIsentropicExponent { k } => write!(
                f,
                "isentropic exponent k = {k} is unusual for natural gas (typically 1.20 to 1.35)"
            ),
            Advisory::FlowParameterCapped { cap } => {
                write!(f, "flow parameter capped at {cap}")
            }
        }
    }
}
