//! Interactive prompts. Plain messages go through [`crate::cli::output`].

use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::cli::core::{CliMode, CommandError};
use crate::cli::output;

/// Asks a yes/no question. Script mode never blocks on stdin: it only proceeds
/// when the caller already holds an explicit `--yes`.
pub fn confirm_action(
    theme: &ColorfulTheme,
    mode: CliMode,
    prompt: &str,
    assume_yes: bool,
) -> Result<bool, CommandError> {
    if assume_yes {
        return Ok(true);
    }
    match mode {
        CliMode::Interactive => Confirm::with_theme(theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(CommandError::from),
        CliMode::Script => {
            output::warning(format!("{prompt} Pass --yes to confirm in script mode."));
            Ok(false)
        }
    }
}
