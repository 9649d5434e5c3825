use chrono::{DateTime, Local};
use tabled::{Table, Tabled};

use crate::meter::FlowResult;

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Quantity")]
    quantity: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: &'static str,
}

fn row(quantity: &'static str, value: String, unit: &'static str) -> Row {
    Row {
        quantity,
        value,
        unit,
    }
}

/// Renders a result as a table, followed by any advisories.
pub fn render(result: &FlowResult, at: DateTime<Local>) -> String {
    let rows = vec![
        row("Qv (base)", format!("{:.4}", result.mmscfd), "MMSCF/D"),
        row("Qv (base)", format!("{:.2}", result.m3_per_hour), "Sm3/h"),
        row("Qm", format!("{:.2}", result.mass_flow), "kg/h"),
        row("Upstream pressure", format!("{:.5}", result.upstream_pressure), "bar(a)"),
        row("Z (flow)", format!("{:.6}", result.gas.z_f), ""),
        row("Z (base)", format!("{:.6}", result.gas.z_b), ""),
        row("Molar mass", format!("{:.5}", result.gas.molar_mass), "g/mol"),
        row("k", format!("{:.6}", result.gas.k), ""),
        row("Beta", format!("{:.6}", result.beta), ""),
        row("Ev", format!("{:.6}", result.e_v), ""),
        row("Y", format!("{:.6}", result.y), ""),
        row("Cd", format!("{:.6}", result.cd), ""),
        row(
            "Cd iterations",
            format!(
                "{} ({})",
                result.iterations,
                if result.converged { "converged" } else { "not converged" }
            ),
            "",
        ),
        row(
            "Re < 4000",
            if result.low_reynolds { "yes" } else { "no" }.to_string(),
            "",
        ),
    ];

    let mut out = format!("[{}]\n{}\n", at.format("%Y-%m-%d %H:%M:%S"), Table::new(rows));
    for advisory in &result.advisories {
        out.push_str(&format!("warning: {advisory}\n"));
    }
    out
}

/// Single-line summary.
pub fn brief(result: &FlowResult, at: DateTime<Local>) -> String {
    format!(
        "[{}]    Qv = {:.4} MMSCF/D,    Qv = {:.2} Sm3/h",
        at, result.mmscfd, result.m3_per_hour
    )
}
