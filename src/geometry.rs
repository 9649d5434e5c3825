use crate::error::DomainError;

/// Bore ratios inside this open span are within the published tap-performance range.
pub const RECOMMENDED_BETA: (f64, f64) = (0.10, 0.75);

/// Typical linear expansion coefficients of meter-run metals, per kelvin.
pub const TYPICAL_EXPANSION: (f64, f64) = (1e-7, 1e-4);

/// Orifice plate and meter tube as measured, in internal units
/// (mm, K, per K).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceGeometry {
    pub orifice_d: f64,
    pub meter_d: f64,
    pub orifice_t_ref: f64,
    pub meter_t_ref: f64,
    pub orifice_alpha: f64,
    pub meter_alpha: f64,
}

/// Diameters at flowing temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterGeometry {
    pub orifice_d: f64,
    pub meter_d: f64,
}

impl ReferenceGeometry {
    /// Applies linear thermal expansion to both diameters at `temperature_k`.
    ///
    /// Fails when either diameter is non-positive or the resulting bore ratio
    /// falls outside (0, 1).
    pub fn at_temperature(&self, temperature_k: f64) -> Result<MeterGeometry, DomainError> {
        DomainError::require_positive("orifice diameter", self.orifice_d)?;
        DomainError::require_positive("pipe diameter", self.meter_d)?;
        DomainError::require_non_negative("orifice expansion coefficient", self.orifice_alpha)?;
        DomainError::require_non_negative("pipe expansion coefficient", self.meter_alpha)?;

        let orifice_d =
            self.orifice_d * (1.0 + self.orifice_alpha * (temperature_k - self.orifice_t_ref));
        let meter_d = self.meter_d * (1.0 + self.meter_alpha * (temperature_k - self.meter_t_ref));

        let geometry = MeterGeometry { orifice_d, meter_d };
        let beta = geometry.beta();
        if !(beta > 0.0 && beta < 1.0) {
            return Err(DomainError::BetaOutOfRange(beta));
        }
        Ok(geometry)
    }
}

impl MeterGeometry {
    pub fn beta(&self) -> f64 {
        self.orifice_d / self.meter_d
    }

    /// Velocity of approach factor, `1 / sqrt(1 - beta^4)`.
    pub fn e_v(&self) -> f64 {
        1.0 / (1.0 - self.beta().powi(4)).sqrt()
    }

    pub fn within_recommended_range(&self) -> bool {
        let beta = self.beta();
        beta > RECOMMENDED_BETA.0 && beta < RECOMMENDED_BETA.1
    }
}

pub fn typical_expansion(per_kelvin: f64) -> bool {
    (TYPICAL_EXPANSION.0..=TYPICAL_EXPANSION.1).contains(&per_kelvin)
}
