//! Run description as read from a TOML file or assembled from CLI flags.
//!
//! Unit and tap tokens stay as strings here and are parsed when the run is
//! turned into a [`MeterRequest`], so an unknown token is reported as a
//! configuration error naming the token.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigurationError, Error};
use crate::gas::{Composition, GasProperties};
use crate::meter::{
    BaseConditions, FlowConditions, GasSource, MeterRequest, OrificeGeometry, DEFAULT_K,
    DEFAULT_VISCOSITY,
};
use crate::units::UnitSet;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnitsSection {
    pub pressure: String,
    pub temperature: String,
    pub differential: String,
    pub length: String,
}

impl Default for UnitsSection {
    fn default() -> Self {
        Self {
            pressure: "psi".into(),
            temperature: "F".into(),
            differential: "mbar".into(),
            length: "mm".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowSection {
    pub gauge_pressure: f64,
    pub atmospheric_pressure: f64,
    pub temperature: f64,
    pub differential: f64,
    #[serde(default = "default_tap")]
    pub tap: String,
    #[serde(default = "default_viscosity")]
    pub viscosity: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BaseSection {
    pub pressure: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeometrySection {
    pub orifice_diameter: f64,
    pub pipe_diameter: f64,
    pub orifice_reference_temperature: f64,
    pub pipe_reference_temperature: f64,
    pub orifice_expansion: f64,
    pub pipe_expansion: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GasSection {
    pub method: String,
    pub z_flowing: Option<f64>,
    pub z_base: Option<f64>,
    pub molar_mass: Option<f64>,
    pub isentropic_exponent: f64,
}

impl Default for GasSection {
    fn default() -> Self {
        Self {
            method: "detail".into(),
            z_flowing: None,
            z_base: None,
            molar_mass: None,
            isentropic_exponent: DEFAULT_K,
        }
    }
}

/// A complete run file.
///
/// ```toml
/// [units]
/// pressure = "psi"
/// temperature = "F"
///
/// [flow]
/// gauge_pressure = 100.0
/// atmospheric_pressure = 14.73
/// temperature = 70.0
/// differential = 100.0
///
/// [base]
/// pressure = 14.73
/// temperature = 60.0
///
/// [geometry]
/// orifice_diameter = 100.0
/// pipe_diameter = 200.0
/// orifice_reference_temperature = 68.0
/// pipe_reference_temperature = 68.0
/// orifice_expansion = 9.25e-6
/// pipe_expansion = 6.2e-6
///
/// [composition]
/// C1 = 96.284
/// # ...
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub units: UnitsSection,
    pub flow: FlowSection,
    pub base: BaseSection,
    pub geometry: GeometrySection,
    #[serde(default)]
    pub gas: GasSection,
    #[serde(default)]
    pub composition: BTreeMap<String, f64>,
}

fn default_tap() -> String {
    "upstream".into()
}

fn default_viscosity() -> f64 {
    DEFAULT_VISCOSITY
}

pub fn load(path: &Path) -> Result<RunFile, ConfigurationError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<RunFile, ConfigurationError> {
    Ok(toml::from_str(content)?)
}

impl RunFile {
    /// Validates the tokens and gas-property selection and builds the request.
    pub fn into_request(self) -> Result<MeterRequest, Error> {
        let units = UnitSet::parse(
            &self.units.pressure,
            &self.units.temperature,
            &self.units.differential,
            &self.units.length,
        )?;

        let gas = match (self.gas.z_flowing, self.gas.z_base, self.gas.molar_mass) {
            (Some(z_f), Some(z_b), Some(molar_mass)) => GasSource::Manual(GasProperties {
                z_f,
                z_b,
                molar_mass,
                k: self.gas.isentropic_exponent,
            }),
            (None, None, None) => {
                let mut composition = Composition::new();
                for (name, percent) in &self.composition {
                    composition.set(name.parse()?, *percent);
                }
                if composition.is_empty() {
                    return Err(ConfigurationError::MissingGasProperties.into());
                }
                GasSource::Composition(composition)
            }
            _ => return Err(ConfigurationError::IncompleteManualProperties.into()),
        };

        Ok(MeterRequest {
            units,
            flow: FlowConditions {
                gauge_pressure: self.flow.gauge_pressure,
                atmospheric_pressure: self.flow.atmospheric_pressure,
                temperature: self.flow.temperature,
                differential: self.flow.differential,
                tap: self.flow.tap.parse()?,
            },
            base: BaseConditions {
                pressure: self.base.pressure,
                temperature: self.base.temperature,
            },
            geometry: OrificeGeometry {
                orifice_diameter: self.geometry.orifice_diameter,
                pipe_diameter: self.geometry.pipe_diameter,
                orifice_reference_temperature: self.geometry.orifice_reference_temperature,
                pipe_reference_temperature: self.geometry.pipe_reference_temperature,
                orifice_expansion: self.geometry.orifice_expansion,
                pipe_expansion: self.geometry.pipe_expansion,
            },
            viscosity: self.flow.viscosity,
            gas,
            default_k: self.gas.isentropic_exponent,
        })
    }
}
