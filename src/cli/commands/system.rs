use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::help;
use crate::cli::output::{self, line as output_line, section as output_section};
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::config::Config;
use crate::domain::StatsPeriod;
use crate::storage::{CategoryReader, STORE_SCHEMA_VERSION};
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "version",
            "Show build metadata and store location",
            "version",
            cmd_version,
        ),
        CommandEntry::new(
            "config",
            "Show settings, or change one and save it",
            "config [set <currency|digits|period|seed> <value>]",
            cmd_config,
        ),
        CommandEntry::new("help", "Show available commands", "help [command]", cmd_help)
            .completing(ArgKind::CommandName),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_version(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    let categories = context.store().all()?.len();
    let expenses = context.store().expenses()?.len();
    let store_path = context.config_manager.store_path(&context.config);

    output_section(format!("Expense Core {}", meta.version));
    output_line(format!(
        "  Build       : {} ({}, {})",
        meta.git_hash, meta.git_status, meta.profile
    ));
    output_line(format!("  Built with  : {} at {}", meta.rustc, meta.timestamp));
    output_line(format!(
        "  Store       : {} (schema v{STORE_SCHEMA_VERSION})",
        store_path.display()
    ));
    output_line(format!("  Contents    : {categories} categories, {expenses} expenses"));
    output_line(format!("  Config file : {}", context.config_manager.path().display()));
    Ok(())
}

/// Applies `value` to the setting named `key`, leaving `config` untouched on error.
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<(), CommandError> {
    let invalid = |what: &str| CommandError::InvalidArguments(format!("invalid {what} `{value}`"));
    let mut updated = config.clone();
    match key {
        "currency" => updated.currency_symbol = value.to_string(),
        "digits" => updated.minor_unit_digits = value.parse().map_err(|_| invalid("digit count"))?,
        "period" => {
            updated.default_period = value.parse::<StatsPeriod>().map_err(|_| invalid("period"))?
        }
        "seed" => updated.seed_defaults = value.parse().map_err(|_| invalid("flag"))?,
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown setting `{other}` (currency, digits, period, seed)"
            )))
        }
    }
    updated.validate()?;
    *config = updated;
    Ok(())
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let config = &context.config;
            output_section("Settings");
            output_line(format!("  currency : {}", config.currency_symbol));
            output_line(format!("  digits   : {}", config.minor_unit_digits));
            output_line(format!("  period   : {}", config.default_period));
            output_line(format!("  seed     : {}", config.seed_defaults));
            Ok(())
        }
        ["set", key, value] => {
            apply_setting(&mut context.config, key, value)?;
            context.config_manager.save(&context.config)?;
            output::success(format!("`{key}` set to `{value}`."));
            Ok(())
        }
        _ => Err(CommandError::InvalidArguments(
            "usage: config [set <currency|digits|period|seed> <value>]".into(),
        )),
    }
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first() {
        None => help::print_overview(&context.registry),
        Some(name) => match context.command(name) {
            Some(entry) => help::print_command(entry),
            None => context.suggest_command(name),
        },
    }
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::core::process_script;
    use crate::config::MAX_MINOR_UNIT_DIGITS;
    use tempfile::TempDir;

    #[test]
    fn rejected_setting_leaves_config_unchanged() {
        let mut config = Config::default();
        let too_many = (MAX_MINOR_UNIT_DIGITS + 1).to_string();
        assert!(apply_setting(&mut config, "digits", &too_many).is_err());
        assert!(apply_setting(&mut config, "period", "weekly").is_err());
        assert!(apply_setting(&mut config, "colour", "red").is_err());
        assert_eq!(config, Config::default());

        apply_setting(&mut config, "period", "yearly").unwrap();
        assert_eq!(config.default_period, StatsPeriod::Yearly);
    }

    #[test]
    fn config_set_is_saved_for_the_next_session() {
        let dir = TempDir::new().unwrap();
        process_script(dir.path(), &["config set currency €", "config set digits 0"]).unwrap();

        let reopened = process_script(dir.path(), &[]).unwrap();
        assert_eq!(reopened.config.currency_symbol, "€");
        assert_eq!(reopened.config.format_amount(500), "€500");
    }
}
