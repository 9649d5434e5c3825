//! Conversion of declared input units into the fixed internal system.
//!
//! Internally pressures are bar, differential pressure is millibar, lengths are
//! millimetres and temperatures are kelvin (Celsius + 273.15). Thermal-expansion
//! coefficients are per kelvin.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

pub const PSI_TO_BAR: f64 = 0.06894757293178308;
pub const INWC_TO_MBAR: f64 = 2.490889;
pub const MM_PER_INCH: f64 = 25.4;
pub const ZERO_CELSIUS: f64 = 273.15;

/// Cubic feet per cubic metre, used for the MMSCF/D reporting unit.
pub const FT3_PER_M3: f64 = 35.3147;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnit {
    Psi,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
    Kelvin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferentialUnit {
    Millibar,
    InchesOfWater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Millimeter,
    Inch,
}

impl PressureUnit {
    pub fn to_bar(self, value: f64) -> f64 {
        match self {
            PressureUnit::Psi => value * PSI_TO_BAR,
            PressureUnit::Bar => value,
        }
    }

    pub fn from_bar(self, bar: f64) -> f64 {
        match self {
            PressureUnit::Psi => bar / PSI_TO_BAR,
            PressureUnit::Bar => bar,
        }
    }
}

impl TemperatureUnit {
    pub fn to_kelvin(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0 + ZERO_CELSIUS,
            TemperatureUnit::Celsius => value + ZERO_CELSIUS,
            TemperatureUnit::Kelvin => value,
        }
    }

    pub fn from_kelvin(self, kelvin: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => (kelvin - ZERO_CELSIUS) * 9.0 / 5.0 + 32.0,
            TemperatureUnit::Celsius => kelvin - ZERO_CELSIUS,
            TemperatureUnit::Kelvin => kelvin,
        }
    }

    /// Rescales a linear expansion coefficient given per degree of this unit to
    /// per kelvin. A Fahrenheit degree is 5/9 of a kelvin, so the coefficient
    /// grows by 9/5.
    pub fn expansion_per_kelvin(self, alpha: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => alpha * 9.0 / 5.0,
            TemperatureUnit::Celsius | TemperatureUnit::Kelvin => alpha,
        }
    }
}

impl DifferentialUnit {
    pub fn to_mbar(self, value: f64) -> f64 {
        match self {
            DifferentialUnit::Millibar => value,
            DifferentialUnit::InchesOfWater => value * INWC_TO_MBAR,
        }
    }

    pub fn from_mbar(self, mbar: f64) -> f64 {
        match self {
            DifferentialUnit::Millibar => mbar,
            DifferentialUnit::InchesOfWater => mbar / INWC_TO_MBAR,
        }
    }
}

impl LengthUnit {
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            LengthUnit::Millimeter => value,
            LengthUnit::Inch => value * MM_PER_INCH,
        }
    }

    pub fn from_mm(self, mm: f64) -> f64 {
        match self {
            LengthUnit::Millimeter => mm,
            LengthUnit::Inch => mm / MM_PER_INCH,
        }
    }
}

fn unknown(kind: &'static str, token: &str) -> ConfigurationError {
    ConfigurationError::UnknownUnit {
        kind,
        token: token.to_string(),
    }
}

impl FromStr for PressureUnit {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "psi" => Ok(PressureUnit::Psi),
            "bar" => Ok(PressureUnit::Bar),
            _ => Err(unknown("pressure", s)),
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f" | "degf" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            "c" | "degc" | "celsius" => Ok(TemperatureUnit::Celsius),
            "k" | "kelvin" => Ok(TemperatureUnit::Kelvin),
            _ => Err(unknown("temperature", s)),
        }
    }
}

impl FromStr for DifferentialUnit {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mbar" => Ok(DifferentialUnit::Millibar),
            "inwc" | "inh2o" => Ok(DifferentialUnit::InchesOfWater),
            _ => Err(unknown("differential pressure", s)),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" => Ok(LengthUnit::Millimeter),
            "in" | "inch" => Ok(LengthUnit::Inch),
            _ => Err(unknown("length", s)),
        }
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PressureUnit::Psi => "psi",
            PressureUnit::Bar => "bar",
        })
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TemperatureUnit::Fahrenheit => "F",
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Kelvin => "K",
        })
    }
}

impl fmt::Display for DifferentialUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DifferentialUnit::Millibar => "mbar",
            DifferentialUnit::InchesOfWater => "inwc",
        })
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Inch => "in",
        })
    }
}

/// The units every input of one computation is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSet {
    pub pressure: PressureUnit,
    pub temperature: TemperatureUnit,
    pub differential: DifferentialUnit,
    pub length: LengthUnit,
}

impl Default for UnitSet {
    fn default() -> Self {
        Self {
            pressure: PressureUnit::Psi,
            temperature: TemperatureUnit::Fahrenheit,
            differential: DifferentialUnit::Millibar,
            length: LengthUnit::Millimeter,
        }
    }
}

impl UnitSet {
    /// Builds a unit set from textual tokens such as `"psi"`, `"F"`, `"inwc"`, `"in"`.
    pub fn parse(
        pressure: &str,
        temperature: &str,
        differential: &str,
        length: &str,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            pressure: pressure.parse()?,
            temperature: temperature.parse()?,
            differential: differential.parse()?,
            length: length.parse()?,
        })
    }
}

/// Converts a flow in standard m³/h to million standard cubic feet per day.
pub fn m3h_to_mmscfd(m3_per_hour: f64) -> f64 {
    m3_per_hour * FT3_PER_M3 * 24.0 / 1e6
}

pub fn mmscfd_to_m3h(mmscfd: f64) -> f64 {
    mmscfd * 1e6 / (FT3_PER_M3 * 24.0)
}
