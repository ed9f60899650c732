use crate::cli::core::{split_flags, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{self, line as output_line, section as output_section};
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::core::services::ServiceError;
use crate::domain::{Category, CategoryId, DeleteCheck};
use crate::storage::CategoryReader;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("tree", "Show the category hierarchy", "tree", cmd_tree),
        CommandEntry::new(
            "add",
            "Create a category",
            "add <name> [--parent <id|path>] [--icon <icon>]",
            cmd_add,
        ),
        CommandEntry::new(
            "rename",
            "Rename a category, rewriting descendant paths",
            "rename <id|path> <new name>",
            cmd_rename,
        )
        .completing(ArgKind::CategoryPaths(1)),
        CommandEntry::new(
            "move",
            "Move a category under a new parent, or list valid parents",
            "move <id|path> [<parent id|path>|root]",
            cmd_move,
        )
        .completing(ArgKind::CategoryPaths(2)),
        CommandEntry::new(
            "icon",
            "Change a category icon",
            "icon <id|path> <icon>",
            cmd_icon,
        )
        .completing(ArgKind::CategoryPaths(1)),
        CommandEntry::new(
            "resolve",
            "Find or create every category along a path",
            "resolve \"<A > B > C>\"",
            cmd_resolve,
        )
        .completing(ArgKind::CategoryPaths(1)),
        CommandEntry::new(
            "rm",
            "Delete a category and its subcategories",
            "rm <id|path> [--yes]",
            cmd_rm,
        )
        .completing(ArgKind::CategoryPaths(1)),
        CommandEntry::new(
            "reassign",
            "Move every expense of a subtree to another category",
            "reassign <from id|path> <to id|path>",
            cmd_reassign,
        )
        .completing(ArgKind::CategoryPaths(2)),
    ]
}

/// Looks a category up by numeric id or by exact full path.
pub(crate) fn find_category(context: &ShellContext, key: &str) -> Result<Category, CommandError> {
    let found = match key.parse::<CategoryId>() {
        Ok(id) => context.store().get_by_id(id)?,
        Err(_) => context.store().get_by_full_path(key.trim())?,
    };
    found.ok_or_else(|| CommandError::Message(format!("no category matches `{}`", key)))
}

fn required<'a>(args: &[&'a str], index: usize, usage: &str) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {}", usage)))
}

fn print_category_line(category: &Category) {
    let indent = "  ".repeat(category.depth() - 1);
    output_line(format!(
        "{:>5}  {}{}  [{}]",
        category.id, indent, category.name, category.icon
    ));
}

fn cmd_tree(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let tree = context.categories().tree()?;
    output_section("Categories");
    if tree.is_empty() {
        output::info("No categories yet. Use `add <name>` to create one.");
    }
    for category in &tree {
        print_category_line(category);
    }
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "add <name> [--parent <id|path>] [--icon <icon>]";
    let (positional, flags) = split_flags(args, &["parent", "icon"])?;
    let name = positional.join(" ");
    if name.trim().is_empty() {
        return Err(CommandError::InvalidArguments(format!("usage: {}", usage)));
    }

    let mut parent: Option<Category> = None;
    let mut icon: Option<String> = None;
    for (flag, value) in flags {
        match flag.as_str() {
            "parent" => parent = Some(find_category(context, value)?),
            _ => icon = Some(value.to_string()),
        }
    }
    let icon = icon
        .or_else(|| parent.as_ref().map(|p| p.icon.clone()))
        .unwrap_or_else(|| context.icons().default_icon().to_string());

    let id = context
        .categories()
        .insert(&name, &icon, parent.as_ref().map(|p| p.id))?;
    output::success(format!("Category `{}` created with id {}.", name.trim(), id));
    Ok(())
}

fn cmd_rename(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "rename <id|path> <new name>";
    let category = find_category(context, required(args, 0, usage)?)?;
    let name = args[1..].join(" ");
    if name.trim().is_empty() {
        return Err(CommandError::InvalidArguments(format!("usage: {}", usage)));
    }
    context
        .categories()
        .update(category.id, &name, &category.icon, category.parent_id)?;
    output::success(format!("Renamed `{}` to `{}`.", category.full_path, name.trim()));
    Ok(())
}

fn cmd_move(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "move <id|path> [<parent id|path>|root]";
    let category = find_category(context, required(args, 0, usage)?)?;

    let Some(target) = args.get(1) else {
        let candidates = context.categories().parent_candidates(category.id)?;
        output_section(format!("Valid parents for `{}`", category.full_path));
        if category.parent_id.is_some() {
            output_line("   root");
        }
        for candidate in candidates
            .iter()
            .filter(|candidate| Some(candidate.id) != category.parent_id)
        {
            print_category_line(candidate);
        }
        return Ok(());
    };

    let parent_id = if target.eq_ignore_ascii_case("root") {
        None
    } else {
        Some(find_category(context, target)?.id)
    };
    context
        .categories()
        .update(category.id, &category.name, &category.icon, parent_id)?;
    let moved = find_category(context, &category.id.to_string())?;
    output::success(format!(
        "Moved `{}` to `{}`.",
        category.full_path, moved.full_path
    ));
    Ok(())
}

fn cmd_icon(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "icon <id|path> <icon>";
    let category = find_category(context, required(args, 0, usage)?)?;
    let icon = required(args, 1, usage)?;
    context
        .categories()
        .update(category.id, &category.name, icon, category.parent_id)?;
    output::success(format!("Icon of `{}` set to `{}`.", category.full_path, icon));
    Ok(())
}

fn cmd_resolve(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::InvalidArguments(
            "usage: resolve \"<A > B > C>\"".into(),
        ));
    }
    let path = args.join(" ");
    let category = context.resolver().resolve_or_create_path(&path)?;
    output::success(format!(
        "`{}` is category {} [{}].",
        category.full_path, category.id, category.icon
    ));
    Ok(())
}

fn cmd_rm(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let assume_yes = args.iter().any(|arg| matches!(*arg, "--yes" | "-y"));
    let positional: Vec<&str> = args
        .iter()
        .copied()
        .filter(|arg| !matches!(*arg, "--yes" | "-y"))
        .collect();
    let category = find_category(context, required(&positional, 0, "rm <id|path> [--yes]")?)?;

    let plan = context.categories().request_delete(category.id)?;
    let prompt = match plan.check {
        DeleteCheck::NotFound => return Err(ServiceError::CategoryNotFound(category.id).into()),
        DeleteCheck::HasExpenses { expense_count, .. } => {
            output::warning(format!("`{}` {}.", category.full_path, plan.check));
            if let Some(target) = plan.reassignment_targets.first() {
                output::hint(format!(
                    "{} categories can receive them, e.g. `reassign {} {}` ({}).",
                    plan.reassignment_targets.len(),
                    category.id,
                    target.id,
                    target.full_path
                ));
            }
            return Err(ServiceError::HasExpenses {
                count: expense_count,
            }
            .into());
        }
        DeleteCheck::HasChildren { child_count } => format!(
            "Delete `{}` and its {} direct subcategories?",
            category.full_path, child_count
        ),
        DeleteCheck::CanDelete => format!("Delete `{}`?", category.full_path),
    };

    if !io::confirm_action(&context.theme, context.mode(), &prompt, assume_yes)? {
        output::info("Delete cancelled.");
        return Ok(());
    }
    context.categories().confirm_delete(category.id)?;
    output::success(format!("Deleted `{}`.", category.full_path));
    Ok(())
}

fn cmd_reassign(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "reassign <from id|path> <to id|path>";
    let from = find_category(context, required(args, 0, usage)?)?;
    let to = find_category(context, required(args, 1, usage)?)?;

    let plan = context.categories().request_delete(from.id)?;
    if !plan
        .reassignment_targets
        .iter()
        .any(|candidate| candidate.id == to.id)
    {
        return Err(CommandError::InvalidArguments(format!(
            "`{}` lies inside `{}`; pick a category outside it",
            to.full_path, from.full_path
        )));
    }
    let moved = context.store().reassign_expenses(&from.full_path, to.id)?;
    output::success(format!(
        "Moved {} expense(s) from `{}` to `{}`.",
        moved, from.full_path, to.full_path
    ));
    Ok(())
}
