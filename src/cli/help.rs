use crate::cli::output::{self, line as output_line, section as output_section};
use crate::cli::registry::{CommandEntry, CommandRegistry};

fn overview_lines(registry: &CommandRegistry) -> Vec<String> {
    let width = registry.names().map(str::len).max().unwrap_or(0);
    let mut lines = Vec::new();
    for (group, entries) in registry.grouped() {
        lines.push(format!("{}:", group.title()));
        lines.extend(
            entries
                .iter()
                .map(|entry| format!("  {:<width$}  {}", entry.name, entry.description)),
        );
    }
    lines
}

fn detail_lines(entry: &CommandEntry) -> Vec<String> {
    let mut lines = vec![
        entry.description.to_string(),
        format!("Usage: {}", entry.usage),
    ];
    if let Some(completes) = entry.args.describe() {
        lines.push(format!("Tab completes {completes}."));
    }
    lines
}

pub fn print_overview(registry: &CommandRegistry) {
    output_section("Commands");
    overview_lines(registry).into_iter().for_each(output_line);
    output::hint("`help <command>` shows usage. Quote paths that contain spaces.");
}

pub fn print_command(entry: &CommandEntry) {
    output_section(entry.name);
    detail_lines(entry).into_iter().for_each(output_line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::register_all;

    #[test]
    fn overview_lists_commands_under_their_group() {
        let mut registry = CommandRegistry::new();
        register_all(&mut registry);
        let lines = overview_lines(&registry);

        let categories = lines.iter().position(|line| line == "Categories:").unwrap();
        let stats = lines.iter().position(|line| line == "Stats:").unwrap();
        let drill = lines.iter().position(|line| line.trim_start().starts_with("drill")).unwrap();
        let tree = lines.iter().position(|line| line.trim_start().starts_with("tree")).unwrap();
        assert!(categories < tree && tree < stats && stats < drill);
    }

    #[test]
    fn details_mention_completion() {
        let mut registry = CommandRegistry::new();
        register_all(&mut registry);
        let rm = detail_lines(registry.get("rm").unwrap());
        assert_eq!(rm[1], "Usage: rm <id|path> [--yes]");
        assert_eq!(rm[2], "Tab completes category paths.");
        assert_eq!(detail_lines(registry.get("tree").unwrap()).len(), 2);
    }
}
