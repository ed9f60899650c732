use crate::cli::core::{parse_amount, parse_date, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::domain::Category;

use super::category::find_category;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "spend",
        "Record an expense; unknown paths are created",
        "spend <id|path> <amount> <YYYY-MM-DD> [note]",
        cmd_spend,
    )
    .completing(ArgKind::CategoryPaths(1))]
}

fn category_for(context: &ShellContext, key: &str) -> Result<Category, CommandError> {
    if key.parse::<i64>().is_ok() {
        return find_category(context, key);
    }
    Ok(context.resolver().resolve_or_create_path(key)?)
}

fn cmd_spend(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [key, amount, date, note @ ..] = args else {
        return Err(CommandError::InvalidArguments(
            "usage: spend <id|path> <amount> <YYYY-MM-DD> [note]".into(),
        ));
    };
    let amount = parse_amount(amount, context.config.minor_unit_digits)?;
    let date = parse_date(date)?;
    let category = category_for(context, key)?;

    let id = context
        .store()
        .add_expense(category.id, amount, date, &note.join(" "))?;
    output::success(format!(
        "Expense {} of {} on {} recorded under `{}`.",
        id,
        context.config.format_amount(amount),
        date,
        category.full_path
    ));
    Ok(())
}
