//! Command execution and result formatting.

use crate::Commands;
use colored::Colorize;
use pdaval_core::{DistrictTable, NicValidation, Outcome, PostalValidation, Trace, Validator};
use serde::Serialize;

/// Output of one command.
pub struct Output {
    pub text: String,
    /// False when a validation rejected its input.
    pub success: bool,
}

/// Executes a command and returns the formatted output.
pub fn execute(
    validator: &Validator,
    cmd: Commands,
    json: bool,
) -> Result<Output, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl => Err("the REPL is not a one-shot command".into()),

        Commands::Nic { input } => {
            let result = validator.validate_nic(&input);
            tracing::debug!(accepted = result.accepted, "validated NIC {:?}", input);
            let text = if json {
                to_json(&result)?
            } else {
                format_nic(&result)
            };
            Ok(Output {
                success: result.accepted,
                text,
            })
        }

        Commands::Postal { code } => {
            let result = validator.validate_postal_code(&code);
            tracing::debug!(accepted = result.accepted, "validated postal code {:?}", code);
            let text = if json {
                to_json(&result)?
            } else {
                format_postal(&result)
            };
            Ok(Output {
                success: result.accepted,
                text,
            })
        }

        Commands::Districts => {
            let table = validator.list_districts();
            let text = if json {
                to_json(table.as_ref())?
            } else {
                format_districts(table)
            };
            Ok(Output {
                text,
                success: true,
            })
        }
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Verdict line, then the message.
fn verdict(outcome: &impl Outcome) -> String {
    let mut out = if outcome.accepted() {
        "ACCEPTED".green().bold().to_string()
    } else {
        "REJECTED".red().bold().to_string()
    };
    out.push('\n');
    out.push_str(&format!("  Message: {}\n", outcome.message()));
    if let Some(reason) = outcome.reason() {
        out.push_str(&format!("  Reason: {}\n", reason.as_str().yellow()));
    }
    out
}

pub fn format_nic(result: &NicValidation) -> String {
    let mut out = verdict(result);
    if let Some(format) = result.format {
        out.push_str(&format!("  Type: {}\n", format.to_string().cyan()));
    }
    if let Some(details) = result.details {
        out.push_str(&format!(
            "  Born: {} (day {}), {:?}\n",
            details.birth_year, details.day_of_year, details.gender
        ));
    }
    out.push('\n');
    out.push_str(&format_trace(&result.execution_log));
    out
}

pub fn format_postal(result: &PostalValidation) -> String {
    let mut out = verdict(result);
    if let Some(district) = &result.district {
        out.push_str(&format!("  District: {}\n", district.cyan()));
    }
    if let Some(province) = &result.province {
        out.push_str(&format!("  Province: {}\n", province));
    }
    if let Some(range) = &result.range {
        out.push_str(&format!("  Range: {}\n", range));
    }
    out.push('\n');
    out.push_str(&format_trace(&result.execution_log));
    out
}

/// Renders the execution log as a `State | Stack | Action` table.
pub fn format_trace(trace: &Trace) -> String {
    let rows: Vec<(String, String, &str)> = trace
        .iter()
        .map(|step| {
            (
                step.state.clone(),
                step.stack.join(" "),
                step.action.as_str(),
            )
        })
        .collect();

    let state_width = rows
        .iter()
        .map(|r| r.0.len())
        .chain(std::iter::once("State".len()))
        .max()
        .unwrap_or(0);
    let stack_width = rows
        .iter()
        .map(|r| r.1.len())
        .chain(std::iter::once("Stack".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{:<sw$} | {:<kw$} | {}\n",
        "State",
        "Stack",
        "Action",
        sw = state_width,
        kw = stack_width
    )
    .bold()
    .to_string();
    for (state, stack, action) in rows {
        out.push_str(&format!(
            "{:<sw$} | {:<kw$} | {}\n",
            state,
            stack,
            action,
            sw = state_width,
            kw = stack_width
        ));
    }
    out
}

pub fn format_districts(table: &DistrictTable) -> String {
    let mut out = String::new();
    for entry in table.entries() {
        let ranges = entry
            .ranges
            .iter()
            .map(|(min, max)| format!("{:05}-{:05}", min, max))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "  {:<14} {}  {:<26} {}\n",
            entry.name.cyan(),
            entry.prefix,
            entry.description(),
            ranges
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_nic_accepted() {
        plain();
        let text = format_nic(&pdaval_core::validate_nic("951234567V"));
        assert!(text.starts_with("ACCEPTED\n"));
        assert!(text.contains("Message: Valid Old Format NIC"));
        assert!(text.contains("Type: Old Format"));
        assert!(text.contains("Born: 1995"));
        assert!(text.contains("q0"));
        assert!(text.contains("q_accept"));
    }

    #[test]
    fn test_format_postal_rejected() {
        plain();
        let text = format_postal(&pdaval_core::validate_postal_code("99999"));
        assert!(text.starts_with("REJECTED\n"));
        assert!(text.contains("Reason: RANGE_MISS"));
        assert!(!text.contains("District:"));
    }

    #[test]
    fn test_format_trace_columns() {
        plain();
        let result = pdaval_core::validate_postal_code("10100");
        let text = format_trace(&result.execution_log);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("State"));
        assert_eq!(lines.len(), result.execution_log.len() + 1);
        // Columns line up
        let bar = lines[0].find('|').unwrap();
        assert!(lines.iter().all(|l| l.find('|') == Some(bar)));
        assert!(lines[6].contains("Z0 1 0 1 0"));
    }

    #[test]
    fn test_execute_json() {
        let validator = Validator::default();
        let output = execute(
            &validator,
            Commands::Postal {
                code: "10100".to_string(),
            },
            true,
        )
        .unwrap();
        assert!(output.success);
        let value: serde_json::Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(value["district"], "Colombo 10");

        let output = execute(
            &validator,
            Commands::Nic {
                input: "123456789".to_string(),
            },
            false,
        )
        .unwrap();
        assert!(!output.success);
    }

    #[test]
    fn test_format_districts() {
        plain();
        let text = format_districts(&DistrictTable::builtin());
        assert_eq!(text.lines().count(), 26);
        assert!(text.contains("00050-01599"));
        assert!(text.contains("Western Province"));
    }
}
