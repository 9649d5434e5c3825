use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use aga3_flow::config::{
    self, BaseSection, FlowSection, GasSection, GeometrySection, RunFile, UnitsSection,
};
use aga3_flow::error::{ConfigurationError, Error};
use aga3_flow::gas::Composition;
use aga3_flow::meter::{compute, provider_for, DEFAULT_K, DEFAULT_VISCOSITY};
use aga3_flow::report;
use clap::Parser;
use log::info;

/// Gas flow rate through a flange-tapped orifice meter according to AGA-3.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose. Logs intermediate values of the calculation.
    #[arg(short, long)]
    verbose: bool,

    /// Print a single summary line instead of the full table.
    #[arg(long)]
    brief: bool,

    /// Read the whole run from a TOML file. Other input flags are ignored.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pressure unit for gauge, atmospheric and base pressures: psi or bar.
    #[arg(long, default_value = "psi")]
    pressure_unit: String,

    /// Temperature unit for every temperature and expansion coefficient: F, C or K.
    #[arg(long, default_value = "F")]
    temperature_unit: String,

    /// Differential pressure unit: mbar or inwc.
    #[arg(long, default_value = "mbar")]
    dp_unit: String,

    /// Length unit for both diameters: mm or in.
    #[arg(long, default_value = "mm")]
    length_unit: String,

    /// Flowing gauge pressure
    #[arg(long)]
    pressure: Option<f64>,

    /// Atmospheric pressure
    #[arg(long)]
    atmospheric: Option<f64>,

    /// Flowing temperature
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Flowing differential pressure
    #[arg(short, long)]
    differential: Option<f64>,

    /// Static pressure tap location: upstream or downstream.
    #[arg(long, default_value = "upstream")]
    tap: String,

    /// Absolute base pressure
    #[arg(long)]
    base_pressure: Option<f64>,

    /// Base temperature
    #[arg(long)]
    base_temperature: Option<f64>,

    /// Orifice plate diameter at its reference temperature
    #[arg(short, long)]
    orifice: Option<f64>,

    /// Meter internal diameter at its reference temperature
    #[arg(short, long)]
    bore: Option<f64>,

    /// Reference temperature of the orifice diameter
    #[arg(long)]
    orifice_ref_temp: Option<f64>,

    /// Reference temperature of the meter diameter
    #[arg(long)]
    bore_ref_temp: Option<f64>,

    /// Linear expansion coefficient of the orifice plate, per degree
    #[arg(long)]
    orifice_alpha: Option<f64>,

    /// Linear expansion coefficient of the meter tube, per degree
    #[arg(long)]
    bore_alpha: Option<f64>,

    /// Dynamic viscosity in cP
    #[arg(long, default_value_t = DEFAULT_VISCOSITY)]
    viscosity: f64,

    /// Isentropic coefficient
    #[arg(long, default_value_t = DEFAULT_K)]
    k: f64,

    /// Compressibility factor at flowing conditions (manual mode)
    #[arg(long)]
    zf: Option<f64>,

    /// Compressibility factor at base conditions (manual mode)
    #[arg(long)]
    zb: Option<f64>,

    /// Molar mass in g/mol (manual mode)
    #[arg(long)]
    mm: Option<f64>,

    /// Gas component in mole percent, e.g. C1=96.284. Repeat for each component.
    #[arg(long = "component", value_name = "NAME=PERCENT")]
    components: Vec<String>,

    /// Equation of state used with a composition.
    #[arg(long, default_value = "detail")]
    method: String,
}

fn required(value: Option<f64>, name: &'static str) -> Result<f64, ConfigurationError> {
    value.ok_or(ConfigurationError::MissingField(name))
}

impl Args {
    fn into_run(self) -> Result<RunFile, ConfigurationError> {
        let mut composition = BTreeMap::new();
        for entry in &self.components {
            let (component, percent) = Composition::parse_entry(entry)?;
            composition.insert(component.symbol().to_string(), percent);
        }

        Ok(RunFile {
            units: UnitsSection {
                pressure: self.pressure_unit,
                temperature: self.temperature_unit,
                differential: self.dp_unit,
                length: self.length_unit,
            },
            flow: FlowSection {
                gauge_pressure: required(self.pressure, "pressure")?,
                atmospheric_pressure: required(self.atmospheric, "atmospheric")?,
                temperature: required(self.temperature, "temperature")?,
                differential: required(self.differential, "differential")?,
                tap: self.tap,
                viscosity: self.viscosity,
            },
            base: BaseSection {
                pressure: required(self.base_pressure, "base-pressure")?,
                temperature: required(self.base_temperature, "base-temperature")?,
            },
            geometry: GeometrySection {
                orifice_diameter: required(self.orifice, "orifice")?,
                pipe_diameter: required(self.bore, "bore")?,
                orifice_reference_temperature: required(self.orifice_ref_temp, "orifice-ref-temp")?,
                pipe_reference_temperature: required(self.bore_ref_temp, "bore-ref-temp")?,
                orifice_expansion: required(self.orifice_alpha, "orifice-alpha")?,
                pipe_expansion: required(self.bore_alpha, "bore-alpha")?,
            },
            gas: GasSection {
                method: self.method,
                z_flowing: self.zf,
                z_base: self.zb,
                molar_mass: self.mm,
                isentropic_exponent: self.k,
            },
            composition,
        })
    }
}

fn run(args: Args) -> Result<(), Error> {
    let brief = args.brief;
    let run = match args.config.clone() {
        Some(path) => config::load(&path)?,
        None => args.into_run()?,
    };
    info!(" [!] Parsed arguments.");

    let method = run.gas.method.clone();
    let request = run.into_request()?;
    let eos = provider_for(&request, &method)?;
    let result = compute(&request, eos.as_ref())?;

    let now = chrono::Local::now();
    if brief {
        println!("{}", report::brief(&result, now));
    } else {
        print!("{}", report::render(&result, now));
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
