use crate::cli::core::CommandResult;
use crate::cli::shell_context::ShellContext;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// Section a command is listed under in `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommandGroup {
    Categories,
    Expenses,
    Stats,
    Shell,
}

impl CommandGroup {
    pub fn title(self) -> &'static str {
        match self {
            CommandGroup::Categories => "Categories",
            CommandGroup::Expenses => "Expenses",
            CommandGroup::Stats => "Stats",
            CommandGroup::Shell => "Shell",
        }
    }
}

/// What the positional arguments of a command complete to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Free,
    /// The first `n` positional arguments are category ids or full paths.
    CategoryPaths(usize),
    Period,
    CommandName,
}

impl ArgKind {
    /// Human description used by `help <command>`.
    pub fn describe(self) -> Option<&'static str> {
        match self {
            ArgKind::Free => None,
            ArgKind::CategoryPaths(_) => Some("category paths"),
            ArgKind::Period => Some("monthly, yearly, custom"),
            ArgKind::CommandName => Some("command names"),
        }
    }
}

pub struct CommandEntry {
    pub name: &'static str,
    pub group: CommandGroup,
    pub description: &'static str,
    pub usage: &'static str,
    pub args: ArgKind,
    pub handler: CommandHandler,
}

impl CommandEntry {
    /// Entry with free-form arguments, filed under `Shell` until registered
    /// into a group.
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            group: CommandGroup::Shell,
            description,
            usage,
            args: ArgKind::Free,
            handler,
        }
    }

    pub const fn completing(mut self, args: ArgKind) -> Self {
        self.args = args;
        self
    }
}

/// Commands in registration order. Names are matched case-insensitively and a
/// later registration replaces an earlier one of the same name in place.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_group(
        &mut self,
        group: CommandGroup,
        entries: impl IntoIterator<Item = CommandEntry>,
    ) {
        for mut entry in entries {
            entry.group = group;
            match self.position(entry.name) {
                Some(index) => self.entries[index] = entry,
                None => self.entries.push(entry),
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.position(name).map(|index| &self.entries[index])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    /// Entries bucketed by group, groups in declaration order.
    pub fn grouped(&self) -> Vec<(CommandGroup, Vec<&CommandEntry>)> {
        let mut groups: Vec<(CommandGroup, Vec<&CommandEntry>)> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|(group, _)| *group == entry.group) {
                Some((_, members)) => members.push(entry),
                None => groups.push((entry.group, vec![entry])),
            }
        }
        groups.sort_by_key(|(group, _)| *group);
        groups
    }

    /// Name and argument kind of every command, for the line completer.
    pub fn completion_table(&self) -> Vec<(String, ArgKind)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.to_ascii_lowercase(), entry.args))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ShellContext, _: &[&str]) -> CommandResult {
        Ok(())
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = CommandRegistry::new();
        registry.register_group(
            CommandGroup::Stats,
            [
                CommandEntry::new("stats", "old", "stats", noop),
                CommandEntry::new("up", "Go up", "up", noop),
            ],
        );
        registry.register_group(
            CommandGroup::Categories,
            [CommandEntry::new("tree", "Tree", "tree", noop)],
        );
        registry.register_group(
            CommandGroup::Stats,
            [CommandEntry::new("Stats", "new", "stats", noop).completing(ArgKind::Period)],
        );

        assert_eq!(registry.names().collect::<Vec<_>>(), ["Stats", "up", "tree"]);
        let stats = registry.get("STATS").unwrap();
        assert_eq!(stats.description, "new");
        assert_eq!(stats.args, ArgKind::Period);

        let groups: Vec<CommandGroup> =
            registry.grouped().into_iter().map(|(group, _)| group).collect();
        assert_eq!(groups, [CommandGroup::Categories, CommandGroup::Stats]);
    }
}
