//! AGA-3 orifice meter flow calculation for natural gas.
//!
//! [`meter::compute`] is the entry point: it normalises declared units, resolves
//! the upstream pressure, obtains gas properties (manual or AGA-8 DETAIL),
//! corrects the meter geometry for temperature, solves the flange-tap discharge
//! coefficient and evaluates the flow equation.

pub mod advisory;
pub mod aga3;
pub mod config;
pub mod discharge;
pub mod error;
pub mod gas;
pub mod geometry;
pub mod meter;
pub mod report;
pub mod units;
