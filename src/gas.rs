//! Gas properties: manual values or an equation of state over a composition.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use aga8::detail::Detail;

use crate::error::{ConfigurationError, PropertyEvaluationError};

/// Tolerance on the composition total, in percentage points.
pub const COMPOSITION_TOLERANCE: f64 = 1e-3;

/// Bar to kilopascal, the pressure unit of the AGA-8 routines.
const BAR_TO_KPA: f64 = 100.0;

/// Properties the flow equation consumes. Fixed for one computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasProperties {
    pub z_f: f64,
    pub z_b: f64,
    /// g/mol
    pub molar_mass: f64,
    pub k: f64,
}

/// The AGA-8 component set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Nitrogen,
    CarbonDioxide,
    Methane,
    Ethane,
    Propane,
    Isobutane,
    NButane,
    Isopentane,
    NPentane,
    Hexane,
    Heptane,
    Octane,
    Nonane,
    Decane,
    Hydrogen,
    Oxygen,
    CarbonMonoxide,
    Water,
    HydrogenSulfide,
    Helium,
    Argon,
}

impl Component {
    pub const ALL: [Component; 21] = [
        Component::Nitrogen,
        Component::CarbonDioxide,
        Component::Methane,
        Component::Ethane,
        Component::Propane,
        Component::Isobutane,
        Component::NButane,
        Component::Isopentane,
        Component::NPentane,
        Component::Hexane,
        Component::Heptane,
        Component::Octane,
        Component::Nonane,
        Component::Decane,
        Component::Hydrogen,
        Component::Oxygen,
        Component::CarbonMonoxide,
        Component::Water,
        Component::HydrogenSulfide,
        Component::Helium,
        Component::Argon,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Component::Nitrogen => "N2",
            Component::CarbonDioxide => "CO2",
            Component::Methane => "C1",
            Component::Ethane => "C2",
            Component::Propane => "C3",
            Component::Isobutane => "iC4",
            Component::NButane => "nC4",
            Component::Isopentane => "iC5",
            Component::NPentane => "nC5",
            Component::Hexane => "nC6",
            Component::Heptane => "nC7",
            Component::Octane => "nC8",
            Component::Nonane => "nC9",
            Component::Decane => "nC10",
            Component::Hydrogen => "H2",
            Component::Oxygen => "O2",
            Component::CarbonMonoxide => "CO",
            Component::Water => "H2O",
            Component::HydrogenSulfide => "H2S",
            Component::Helium => "He",
            Component::Argon => "Ar",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Component::Nitrogen => "nitrogen",
            Component::CarbonDioxide => "carbon_dioxide",
            Component::Methane => "methane",
            Component::Ethane => "ethane",
            Component::Propane => "propane",
            Component::Isobutane => "isobutane",
            Component::NButane => "n_butane",
            Component::Isopentane => "isopentane",
            Component::NPentane => "n_pentane",
            Component::Hexane => "hexane",
            Component::Heptane => "heptane",
            Component::Octane => "octane",
            Component::Nonane => "nonane",
            Component::Decane => "decane",
            Component::Hydrogen => "hydrogen",
            Component::Oxygen => "oxygen",
            Component::CarbonMonoxide => "carbon_monoxide",
            Component::Water => "water",
            Component::HydrogenSulfide => "hydrogen_sulfide",
            Component::Helium => "helium",
            Component::Argon => "argon",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Component {
    type Err = ConfigurationError;

    /// Accepts the chemical symbol (`"iC4"`) or the long name (`"isobutane"`),
    /// ignoring case, dashes and underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Component::ALL
            .into_iter()
            .find(|component| {
                component.symbol().to_ascii_lowercase() == wanted
                    || component.name().replace('_', "") == wanted
            })
            .ok_or_else(|| ConfigurationError::UnknownComponent(s.to_string()))
    }
}

/// Mole percentages by component. Components not listed are zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    percent: BTreeMap<Component, f64>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, component: Component, percent: f64) -> Self {
        self.set(component, percent);
        self
    }

    pub fn set(&mut self, component: Component, percent: f64) {
        self.percent.insert(component, percent);
    }

    pub fn percent(&self, component: Component) -> f64 {
        self.percent.get(&component).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.percent.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.percent.values().all(|p| *p == 0.0)
    }

    /// Parses a `NAME=PERCENT` entry such as `C1=96.284`.
    pub fn parse_entry(entry: &str) -> Result<(Component, f64), ConfigurationError> {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| ConfigurationError::MalformedComponent(entry.to_string()))?;
        let component = name.parse()?;
        let percent = value
            .trim()
            .parse()
            .map_err(|_| ConfigurationError::MalformedComponent(entry.to_string()))?;
        Ok((component, percent))
    }

    /// Mole fractions normalised to sum to one, after checking the percentages.
    pub fn fractions(&self) -> Result<[f64; 21], PropertyEvaluationError> {
        for (component, percent) in &self.percent {
            if !percent.is_finite() || *percent < 0.0 {
                return Err(PropertyEvaluationError::NegativeComponent {
                    component: component.symbol(),
                    percent: *percent,
                });
            }
        }
        let total = self.total();
        if (total - 100.0).abs() > COMPOSITION_TOLERANCE {
            return Err(PropertyEvaluationError::CompositionTotal(total));
        }
        Ok(Component::ALL.map(|component| self.percent(component) / total))
    }

    fn to_aga8(&self) -> Result<aga8::composition::Composition, PropertyEvaluationError> {
        let x = self.fractions()?;
        Ok(aga8::composition::Composition {
            nitrogen: x[0],
            carbon_dioxide: x[1],
            methane: x[2],
            ethane: x[3],
            propane: x[4],
            isobutane: x[5],
            n_butane: x[6],
            isopentane: x[7],
            n_pentane: x[8],
            hexane: x[9],
            heptane: x[10],
            octane: x[11],
            nonane: x[12],
            decane: x[13],
            hydrogen: x[14],
            oxygen: x[15],
            carbon_monoxide: x[16],
            water: x[17],
            hydrogen_sulfide: x[18],
            helium: x[19],
            argon: x[20],
        })
    }
}

impl FromIterator<(Component, f64)> for Composition {
    fn from_iter<I: IntoIterator<Item = (Component, f64)>>(iter: I) -> Self {
        Self {
            percent: iter.into_iter().collect(),
        }
    }
}

/// Equation-of-state output at one pressure/temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateProperties {
    pub z: f64,
    /// g/mol
    pub molar_mass: f64,
    pub k: Option<f64>,
}

/// Supplies compressibility and molar mass for a composition at a state point.
///
/// Implementations must be deterministic for fixed inputs.
pub trait GasPropertiesProvider {
    fn evaluate(
        &self,
        pressure_bar: f64,
        temperature_k: f64,
        composition: &Composition,
    ) -> Result<StateProperties, PropertyEvaluationError>;
}

/// AGA-8 Part 1 DETAIL characterization.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aga8Detail;

impl GasPropertiesProvider for Aga8Detail {
    fn evaluate(
        &self,
        pressure_bar: f64,
        temperature_k: f64,
        composition: &Composition,
    ) -> Result<StateProperties, PropertyEvaluationError> {
        let comp = composition.to_aga8()?;

        let mut detail: Detail = Detail::new();
        detail
            .set_composition(&comp)
            .map_err(|err| PropertyEvaluationError::Rejected(format!("{err:?}")))?;
        detail.p = pressure_bar * BAR_TO_KPA;
        detail.t = temperature_k;

        detail.density();
        detail.properties();

        let converged = detail.z.is_finite()
            && detail.z > 0.0
            && detail.mm.is_finite()
            && detail.mm > 0.0;
        if !converged {
            return Err(PropertyEvaluationError::NotConverged {
                pressure_bar,
                temperature_k,
            });
        }

        Ok(StateProperties {
            z: detail.z,
            molar_mass: detail.mm,
            k: Some(detail.kappa).filter(|k| k.is_finite() && *k > 0.0),
        })
    }
}

/// Selects an equation of state by name.
pub fn provider(method: &str) -> Result<Box<dyn GasPropertiesProvider>, PropertyEvaluationError> {
    match method.trim().to_ascii_lowercase().as_str() {
        "detail" | "aga8" => Ok(Box::new(Aga8Detail)),
        _ => Err(PropertyEvaluationError::UnsupportedMethod(method.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn pipeline_gas() -> Composition {
        [
            (Component::Nitrogen, 0.223),
            (Component::CarbonDioxide, 0.198),
            (Component::Methane, 96.284),
            (Component::Ethane, 2.210),
            (Component::Propane, 0.624),
            (Component::Isobutane, 0.175),
            (Component::NButane, 0.139),
            (Component::Isopentane, 0.064),
            (Component::NPentane, 0.031),
            (Component::Hexane, 0.025),
            (Component::Heptane, 0.022),
            (Component::Octane, 0.005),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn component_tokens() {
        assert_eq!("C1".parse::<Component>().unwrap(), Component::Methane);
        assert_eq!("ic4".parse::<Component>().unwrap(), Component::Isobutane);
        assert_eq!("n-butane".parse::<Component>().unwrap(), Component::NButane);
        assert_eq!(
            "Hydrogen_Sulfide".parse::<Component>().unwrap(),
            Component::HydrogenSulfide
        );
        assert!(matches!(
            "unobtanium".parse::<Component>(),
            Err(ConfigurationError::UnknownComponent(_))
        ));
        for component in Component::ALL {
            assert_eq!(component.symbol().parse::<Component>().unwrap(), component);
        }
    }

    #[test]
    fn entries_parse() {
        let (component, percent) = Composition::parse_entry("CO2 = 0.198").unwrap();
        assert_eq!(component, Component::CarbonDioxide);
        assert_relative_eq!(percent, 0.198);

        assert!(matches!(
            Composition::parse_entry("CO2"),
            Err(ConfigurationError::MalformedComponent(_))
        ));
        assert!(matches!(
            Composition::parse_entry("CO2=lots"),
            Err(ConfigurationError::MalformedComponent(_))
        ));
    }

    #[test]
    fn fractions_are_normalised() {
        let x = pipeline_gas().fractions().unwrap();
        assert_relative_eq!(x.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 0.96284, epsilon = 1e-6);
        assert_eq!(x[20], 0.0);
    }

    #[test]
    fn composition_must_total_one_hundred() {
        let short = Composition::new().with(Component::Methane, 90.0);
        assert_eq!(
            short.fractions(),
            Err(PropertyEvaluationError::CompositionTotal(90.0))
        );

        let negative = Composition::new()
            .with(Component::Methane, 101.0)
            .with(Component::Ethane, -1.0);
        assert!(matches!(
            negative.fractions(),
            Err(PropertyEvaluationError::NegativeComponent { component: "C2", .. })
        ));
    }

    #[test]
    fn detail_pure_methane_near_ideal_at_low_pressure() {
        let methane = Composition::new().with(Component::Methane, 100.0);
        let props = Aga8Detail.evaluate(1.01325, 288.15, &methane).unwrap();
        assert_relative_eq!(props.z, 0.998, epsilon = 2e-3);
        assert_relative_eq!(props.molar_mass, 16.043, epsilon = 1e-2);
    }

    #[test]
    fn detail_pipeline_gas_at_line_pressure() {
        let gas = pipeline_gas();
        let flowing = Aga8Detail.evaluate(7.91, 294.26, &gas).unwrap();
        let base = Aga8Detail.evaluate(1.0156, 288.71, &gas).unwrap();

        assert!(flowing.z < base.z);
        assert!((0.95..1.0).contains(&flowing.z));
        assert!((0.99..1.0).contains(&base.z));
        assert_relative_eq!(flowing.molar_mass, base.molar_mass, epsilon = 1e-9);
        assert!((16.5..17.0).contains(&base.molar_mass));
        assert!(flowing.k.is_some());
    }

    #[test]
    fn bad_composition_is_not_evaluated() {
        let err = Aga8Detail
            .evaluate(7.91, 294.26, &Composition::new())
            .unwrap_err();
        assert_eq!(err, PropertyEvaluationError::CompositionTotal(0.0));
    }

    #[test]
    fn provider_selection() {
        assert!(provider("DETAIL").is_ok());
        assert!(matches!(
            provider("GERG"),
            Err(PropertyEvaluationError::UnsupportedMethod(_))
        ));
    }
}
