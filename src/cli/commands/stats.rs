use crate::cli::core::{parse_date, parse_delta, CommandError, CommandResult, ShellContext};
use crate::cli::output::{self, line as output_line, section as output_section};
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::domain::{Amount, StatsPeriod};

const BAR_WIDTH: usize = 24;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "stats",
            "Show the spending breakdown and histogram",
            "stats",
            cmd_stats,
        ),
        CommandEntry::new(
            "drill",
            "Break a row of the current breakdown down by its children",
            "drill <row number|path>",
            cmd_drill,
        )
        .completing(ArgKind::CategoryPaths(1)),
        CommandEntry::new("up", "Return to the previous breakdown level", "up", cmd_up),
        CommandEntry::new(
            "period",
            "Switch between monthly, yearly and custom views",
            "period <monthly|yearly|custom>",
            cmd_period,
        )
        .completing(ArgKind::Period),
        CommandEntry::new(
            "month",
            "Move the monthly view by N months",
            "month [+N|-N]",
            cmd_month,
        ),
        CommandEntry::new(
            "year",
            "Move the view by N years",
            "year [+N|-N]",
            cmd_year,
        ),
        CommandEntry::new(
            "range",
            "Show a custom date range",
            "range <YYYY-MM-DD> <YYYY-MM-DD>",
            cmd_range,
        ),
    ]
}

fn bar(amount: Amount, max: Amount) -> String {
    if amount <= 0 || max <= 0 {
        return String::new();
    }
    let filled = ((amount as i128 * BAR_WIDTH as i128) / max as i128).max(1) as usize;
    "█".repeat(filled)
}

fn render(context: &ShellContext) {
    let Some(snapshot) = context.navigator.snapshot() else {
        output::info("No stats computed yet.");
        return;
    };
    let config = &context.config;

    let mut title = format!("{} {}", snapshot.period, snapshot.range);
    for level in &snapshot.levels {
        title.push_str(" / ");
        title.push_str(&level.title);
    }
    output_section(title);

    if snapshot.breakdown.is_empty() {
        output::info("No expenses in this range.");
    }
    for (index, row) in snapshot.breakdown.iter().enumerate() {
        let marker = if row.is_drillable() { " ›" } else { "" };
        output_line(format!(
            "{:>3}. {:<18} {:<24} {:>12} {:>5}{}",
            index + 1,
            row.icon,
            row.category_name,
            config.format_amount(row.total_amount),
            row.expense_count,
            marker
        ));
    }
    output_line(format!(
        "     Total: {}",
        config.format_amount(snapshot.grand_total)
    ));

    let max = snapshot.bins.iter().map(|bin| bin.amount).max().unwrap_or(0);
    output_line("");
    for bin in &snapshot.bins {
        output_line(format!(
            "  {:>4} {:<width$} {}",
            bin.label,
            bar(bin.amount, max),
            config.format_amount(bin.amount),
            width = BAR_WIDTH
        ));
    }
}

fn show(context: &ShellContext, applied: bool) -> CommandResult {
    if !applied {
        output::warning("A newer stats request replaced this one.");
    }
    render(context);
    Ok(())
}

fn cmd_stats(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let applied = context.navigator.refresh()?;
    show(context, applied)
}

fn cmd_drill(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::InvalidArguments(
            "usage: drill <row number|path>".into(),
        ));
    }
    let key = args.join(" ");
    let applied = match key.parse::<usize>() {
        Ok(row_number) => {
            let row = context
                .navigator
                .snapshot()
                .and_then(|snapshot| snapshot.breakdown.get(row_number.wrapping_sub(1)))
                .cloned()
                .ok_or_else(|| {
                    CommandError::InvalidArguments(format!(
                        "no row {} in the current breakdown; run `stats` first",
                        row_number
                    ))
                })?;
            context.navigator.drill_into(&row)?
        }
        Err(_) => {
            let title = key.rsplit(" > ").next().unwrap_or(&key).trim().to_string();
            context.navigator.drill_down(key.trim(), &title)?
        }
    };
    show(context, applied)
}

fn cmd_up(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if !context.navigator.navigate_up()? {
        output::info("Already at the top level.");
        return Ok(());
    }
    render(context);
    Ok(())
}

fn cmd_period(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let period: StatsPeriod = args
        .first()
        .ok_or_else(|| {
            CommandError::InvalidArguments("usage: period <monthly|yearly|custom>".into())
        })?
        .parse()
        .map_err(CommandError::InvalidArguments)?;
    let applied = context.navigator.set_period(period)?;
    show(context, applied)
}

fn cmd_month(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let delta = parse_delta(args.first())?;
    let applied = context.navigator.navigate_month(delta)?;
    show(context, applied)
}

fn cmd_year(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let delta = parse_delta(args.first())?;
    let applied = context.navigator.navigate_year(delta)?;
    show(context, applied)
}

fn cmd_range(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [start, end] = args else {
        return Err(CommandError::InvalidArguments(
            "usage: range <YYYY-MM-DD> <YYYY-MM-DD>".into(),
        ));
    };
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    let applied = context.navigator.set_custom_range(start, end)?;
    show(context, applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_to_the_largest_bin() {
        assert_eq!(bar(0, 100), "");
        assert_eq!(bar(100, 100).chars().count(), BAR_WIDTH);
        assert_eq!(bar(1, 1_000_000).chars().count(), 1);
    }
}
