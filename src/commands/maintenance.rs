//! Destructive maintenance commands: clear and destroy.

use std::process::ExitCode;

use silent_witness::config::WitnessConfig;
use silent_witness::{Confirmation, Error, Result, WitnessService};

/// Clear command.
pub fn cmd_clear(config: &WitnessConfig, yes: bool) -> Result<ExitCode> {
    let service = WitnessService::from_config(config)?;
    match service.clear(Confirmation::from_flag(yes)) {
        Ok(removed) => {
            println!("Cleared {removed} aggregates; the next ingest re-reads the whole log.");
            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfirmationRequired { .. }) => Ok(refuse(
            "This deletes every aggregate and resets the log cursor.",
        )),
        Err(e) => Err(e),
    }
}

/// Destroy command.
pub fn cmd_destroy(config: &WitnessConfig, yes: bool) -> Result<ExitCode> {
    let service = WitnessService::from_config(config)?;
    match service.destroy(Confirmation::from_flag(yes)) {
        Ok(()) => {
            println!("Aggregate table dropped and cursor deleted.");
            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfirmationRequired { .. }) => Ok(refuse(
            "This drops the aggregate table and deletes the log cursor.",
        )),
        Err(e) => Err(e),
    }
}

fn refuse(warning: &str) -> ExitCode {
    eprintln!("{warning} Use: {}", rerun_command(std::env::args()));
    ExitCode::FAILURE
}

/// Rebuilds the invoking command line with `--yes` appended.
fn rerun_command(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    // argv[0] may be a full path; show the command name
    let program = args
        .next()
        .map(|arg| {
            std::path::Path::new(&arg)
                .file_name()
                .and_then(|n| n.to_str())
                .map_or_else(|| arg.clone(), ToString::to_string)
        })
        .unwrap_or_else(|| "silent-witness".to_string());

    std::iter::once(program)
        .chain(args)
        .map(|arg| shell_quote(&arg))
        .chain(std::iter::once("--yes".to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c)) {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_rerun_command_appends_yes() {
        assert_eq!(
            rerun_command(args(&["/usr/local/bin/silent-witness", "--db", "/tmp/w.db", "clear"])),
            "silent-witness --db /tmp/w.db clear --yes"
        );
    }

    #[test]
    fn test_rerun_command_quotes_spaces() {
        assert_eq!(
            rerun_command(args(&["silent-witness", "--log", "/var/log/my site.log", "destroy"])),
            "silent-witness --log '/var/log/my site.log' destroy --yes"
        );
    }
}
