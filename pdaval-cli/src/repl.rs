//! Interactive REPL.

use crate::commands::{self, Output};
use crate::Commands;
use colored::Colorize;
use pdaval_core::Validator;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

const HELP_TEXT: &str = r#"
Available commands:
  help                          Show this help

  nic <number>                  Validate a NIC number
  postal <code>                 Validate a postal code
  districts                     List the district range table

  json                          Toggle raw JSON output

  quit, exit                    Exit the REPL

A bare argument is validated as a postal code if it is five characters or
shorter, otherwise as a NIC number.
"#;

/// What the REPL should do after a line.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Print(String),
    ToggleJson,
    Exit,
}

pub fn run(validator: &Validator, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "pdaval CLI".bold().cyan());
    println!(
        "{} districts loaded. Type 'help' for available commands.\n",
        validator.list_districts().len()
    );

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".pdaval_history"))
        .unwrap_or_else(|_| ".pdaval_history".into());
    let _ = rl.load_history(&history_path);

    let mut json = json;
    loop {
        let prompt = format!("{} ", "pdaval>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(validator, line, json) {
                    Ok(Step::Print(output)) => println!("{}\n", output),
                    Ok(Step::ToggleJson) => {
                        json = !json;
                        println!("JSON output {}\n", if json { "on" } else { "off" });
                    }
                    Ok(Step::Exit) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);
    println!("{}", "Bye.".dimmed());

    Ok(())
}

fn execute_repl_command(
    validator: &Validator,
    line: &str,
    json: bool,
) -> Result<Step, Box<dyn std::error::Error>> {
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };
    let cmd = cmd.to_lowercase();

    let command = match cmd.as_str() {
        "help" | "?" => return Ok(Step::Print(HELP_TEXT.to_string())),
        "quit" | "exit" | "q" => return Ok(Step::Exit),
        "json" => return Ok(Step::ToggleJson),

        "nic" | "n" => {
            if rest.is_empty() {
                return Ok(Step::Print("Usage: nic <number>".to_string()));
            }
            Commands::Nic {
                input: rest.to_string(),
            }
        }

        "postal" | "p" => {
            if rest.is_empty() {
                return Ok(Step::Print("Usage: postal <code>".to_string()));
            }
            Commands::Postal {
                code: rest.to_string(),
            }
        }

        "districts" | "d" => Commands::Districts,

        _ if rest.is_empty() => {
            // Bare input: guess the automaton from the length.
            if line.chars().count() <= 5 {
                Commands::Postal {
                    code: line.to_string(),
                }
            } else {
                Commands::Nic {
                    input: line.to_string(),
                }
            }
        }

        _ => {
            return Ok(Step::Print(format!(
                "Unknown command: {}. Type 'help' for help.",
                cmd
            )))
        }
    };

    let Output { text, .. } = commands::execute(validator, command, json)?;
    Ok(Step::Print(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_line(line: &str) -> Step {
        colored::control::set_override(false);
        execute_repl_command(&Validator::default(), line, false).unwrap()
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(run_line("exit"), Step::Exit);
        assert_eq!(run_line("QUIT"), Step::Exit);
        assert_eq!(run_line("json"), Step::ToggleJson);
        assert!(matches!(run_line("help"), Step::Print(s) if s.contains("postal <code>")));
    }

    #[test]
    fn test_validate_commands() {
        let Step::Print(text) = run_line("nic 199512345678") else {
            panic!("expected output");
        };
        assert!(text.contains("New Format"));

        let Step::Print(text) = run_line("postal 10100") else {
            panic!("expected output");
        };
        assert!(text.contains("Colombo 10"));
    }

    #[test]
    fn test_bare_input() {
        let Step::Print(text) = run_line("20000") else {
            panic!("expected output");
        };
        assert!(text.contains("Kandy"));

        let Step::Print(text) = run_line("951234567v") else {
            panic!("expected output");
        };
        assert!(text.starts_with("ACCEPTED"));
    }

    #[test]
    fn test_usage_and_unknown() {
        assert_eq!(
            run_line("nic"),
            Step::Print("Usage: nic <number>".to_string())
        );
        assert!(matches!(run_line("frob a b"), Step::Print(s) if s.starts_with("Unknown command")));
    }
}
