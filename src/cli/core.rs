//! Dispatch, error reporting and argument parsing shared by every command.

use std::io;

use chrono::NaiveDate;
use strsim::levenshtein;

use crate::config::ConfigError;
use crate::core::services::ServiceError;
use crate::domain::Amount;
use crate::errors::StoreError;

use super::output;
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Failures a single command can report without ending the shell.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

/// Failures that stop the shell.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("{0}")]
    Command(String),
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl ShellContext {
    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.get(command).map(|entry| entry.handler) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &input.to_lowercase()), name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{}`?", name));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::Service(ServiceError::HasExpenses { count }) => {
                output::error(format!("Category still has {count} expense(s)."));
                output::hint("Move them with `reassign <id> <target-id>` first.");
                Ok(())
            }
            other => {
                output::error(other);
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        crate::cli::shell::handle_line(self, line)
    }
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

pub(crate) fn parse_delta(input: Option<&&str>) -> Result<i32, CommandError> {
    match input {
        None => Ok(1),
        Some(raw) => raw
            .trim_start_matches('+')
            .parse::<i32>()
            .map_err(|_| CommandError::InvalidArguments(format!("invalid offset `{}`", raw))),
    }
}

/// Parses a decimal string such as `12.5` into minor units.
pub(crate) fn parse_amount(input: &str, minor_digits: u32) -> Result<Amount, CommandError> {
    let invalid = || CommandError::InvalidArguments(format!("invalid amount `{}`", input));
    let (negative, unsigned) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > minor_digits as usize
        || !whole.chars().chain(fraction.chars()).all(|ch| ch.is_ascii_digit())
    {
        return Err(invalid());
    }
    let scale = 10i64.checked_pow(minor_digits).ok_or_else(invalid)?;
    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction: i64 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = minor_digits as usize);
        padded.parse().map_err(|_| invalid())?
    };
    let magnitude = whole
        .checked_mul(scale)
        .and_then(|value| value.checked_add(fraction))
        .ok_or_else(invalid)?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Splits `--flag value` pairs out of `args`, returning the positional rest.
pub(crate) fn split_flags<'a>(
    args: &[&'a str],
    flags: &[&str],
) -> Result<(Vec<&'a str>, Vec<(String, &'a str)>), CommandError> {
    let mut positional = Vec::new();
    let mut values = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("--") {
            Some(flag) if flags.contains(&flag) => {
                let value = iter.next().ok_or_else(|| {
                    CommandError::InvalidArguments(format!("`--{}` expects a value", flag))
                })?;
                values.push((flag.to_string(), *value));
            }
            Some(flag) => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown option `--{}`",
                    flag
                )))
            }
            None => positional.push(*arg),
        }
    }
    Ok((positional, values))
}

#[cfg(test)]
pub(crate) fn process_script(
    base: &std::path::Path,
    lines: &[&str],
) -> Result<ShellContext, CliError> {
    let mut app = ShellContext::with_base_dir(CliMode::Script, base.to_path_buf())?;
    for line in lines {
        match app.process_line(line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => app.report_error(err)?,
        }
    }
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CategoryReader, ExpenseStore};
    use tempfile::TempDir;

    #[test]
    fn amounts_parse_into_minor_units() {
        assert_eq!(parse_amount("12.05", 2).unwrap(), 1205);
        assert_eq!(parse_amount("12.5", 2).unwrap(), 1250);
        assert_eq!(parse_amount("-0.07", 2).unwrap(), -7);
        assert_eq!(parse_amount("500", 0).unwrap(), 500);
        assert!(parse_amount("1.234", 2).is_err());
        assert!(parse_amount("abc", 2).is_err());
        assert!(parse_amount(".", 2).is_err());
    }

    #[test]
    fn amounts_reject_unrepresentable_scales() {
        assert!(parse_amount("1", 19).is_err());
        assert!(parse_amount("1", 40).is_err());
        assert_eq!(parse_amount("1", 18).unwrap(), 1_000_000_000_000_000_000);
        assert!(parse_amount("10", 18).is_err());
    }

    #[test]
    fn flags_are_split_from_positionals() {
        let (positional, flags) =
            split_flags(&["Pizza", "--parent", "1", "--icon", "local_pizza"], &["parent", "icon"])
                .unwrap();
        assert_eq!(positional, ["Pizza"]);
        assert_eq!(flags[0], ("parent".to_string(), "1"));
        assert!(split_flags(&["--parent"], &["parent"]).is_err());
        assert!(split_flags(&["--bogus", "1"], &["parent"]).is_err());
    }

    #[test]
    fn script_builds_tree_and_records_spend() {
        let dir = TempDir::new().unwrap();
        let app = process_script(
            dir.path(),
            &[
                "resolve \"Hobbies > Music > Vinyl\"",
                "spend \"Hobbies > Music > Vinyl\" 24.99 2024-06-02 record",
                "rename 31 Pastimes",
            ],
        )
        .unwrap();

        let store = app.store();
        let vinyl = store
            .get_by_full_path("Pastimes > Music > Vinyl")
            .unwrap()
            .expect("descendant path rewritten");
        assert_eq!(vinyl.depth(), 3);
        assert_eq!(store.count_by_category_or_descendants("Pastimes").unwrap(), 1);
    }

    #[test]
    fn refused_delete_keeps_category() {
        let dir = TempDir::new().unwrap();
        let app = process_script(
            dir.path(),
            &["spend 2 4.50 2024-06-03", "rm 2 --yes", "rm 4 --yes"],
        )
        .unwrap();

        let store = app.store();
        assert!(store.get_by_id(2).unwrap().is_some());
        assert!(store.get_by_id(4).unwrap().is_none());
    }

    #[test]
    fn unknown_command_does_not_stop_script() {
        let dir = TempDir::new().unwrap();
        let app = process_script(dir.path(), &["tre", "add Pets"]).unwrap();
        assert!(app.store().get_root_by_name("Pets").unwrap().is_some());
    }
}
