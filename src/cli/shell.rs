use std::{
    io::{self, BufRead, Lines, StdinLock},
    path::PathBuf,
    sync::Arc,
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    history::DefaultHistory,
    Cmd, Context as ReadlineContext, Editor, Helper, Highlighter, Hinter, KeyEvent, Validator,
};
use tracing::{debug, warn};

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;
use crate::cli::registry::ArgKind;
use crate::storage::{CategoryReader, MemoryStore};

/// Environment variable that switches the shell to reading commands from stdin.
pub const SCRIPT_ENV: &str = "EXPENSE_CORE_CLI_SCRIPT";

const PERIODS: [&str; 3] = ["monthly", "yearly", "custom"];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    let mut input = LineSource::open(&context)?;
    if mode == CliMode::Interactive {
        output::info("Type `help` to list commands, `stats` to see this month's spending.");
    }
    let outcome = run_loop(&mut context, &mut input);
    input.close();
    outcome
}

enum InputEvent {
    Line(String),
    Interrupted,
    Closed,
}

/// Where command lines come from: the line editor, or stdin in script mode.
enum LineSource {
    Editor {
        editor: Box<Editor<CommandHelper, DefaultHistory>>,
        history: PathBuf,
    },
    Stdin(Lines<StdinLock<'static>>),
}

impl LineSource {
    fn open(context: &ShellContext) -> Result<Self, CliError> {
        if context.mode() == CliMode::Script {
            return Ok(Self::Stdin(io::stdin().lock().lines()));
        }
        let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(CommandHelper::new(
            context.registry.completion_table(),
            context.shared_store(),
        )));
        editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
        let history = context.config_manager.history_path();
        if let Err(err) = editor.load_history(&history) {
            debug!(path = %history.display(), %err, "starting without shell history");
        }
        Ok(Self::Editor {
            editor: Box::new(editor),
            history,
        })
    }

    fn next(&mut self, prompt: &str) -> Result<InputEvent, CliError> {
        match self {
            Self::Stdin(lines) => match lines.next() {
                Some(line) => Ok(InputEvent::Line(line?)),
                None => Ok(InputEvent::Closed),
            },
            Self::Editor { editor, .. } => match editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        editor.add_history_entry(trimmed).ok();
                    }
                    Ok(InputEvent::Line(line))
                }
                Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted),
                Err(ReadlineError::Eof) => Ok(InputEvent::Closed),
                Err(err) => Err(err.into()),
            },
        }
    }

    fn close(self) {
        if let Self::Editor {
            mut editor,
            history,
        } = self
        {
            if let Err(err) = editor.save_history(&history) {
                warn!(path = %history.display(), %err, "shell history not saved");
            }
        }
    }
}

fn run_loop(context: &mut ShellContext, input: &mut LineSource) -> Result<(), CliError> {
    while context.running {
        match input.next(&context.prompt())? {
            InputEvent::Line(line) => match handle_line(context, &line) {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Exit) => break,
                Err(err) => context.report_error(err)?,
            },
            InputEvent::Interrupted => {
                if context.confirm_exit()? {
                    break;
                }
            }
            InputEvent::Closed => {
                if context.mode() == CliMode::Interactive {
                    output::info("Exiting shell.");
                }
                break;
            }
        }
    }
    Ok(())
}

/// Runs one command line. Blank lines and `#` comments are skipped and a
/// line that does not tokenize is reported without ending the session.
pub(crate) fn handle_line(
    context: &mut ShellContext,
    line: &str,
) -> Result<LoopControl, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(LoopControl::Continue);
    }
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not read `{line}`: {err}"));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    let control = context.dispatch(&raw.to_lowercase(), raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

/// Words before the cursor, plus the word being typed with its quotes removed.
#[derive(Debug, PartialEq, Eq)]
struct CursorWords {
    done: Vec<String>,
    current: String,
    /// Byte offset where the word being typed starts, opening quote included.
    start: usize,
}

fn cursor_words(prefix: &str) -> CursorWords {
    let mut done = Vec::new();
    let mut current = String::new();
    let mut start = prefix.len();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for (index, ch) in prefix.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch.is_whitespace() => {
                if in_word {
                    done.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                if !in_word {
                    in_word = true;
                    start = index;
                }
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                } else {
                    current.push(ch);
                }
            }
        }
    }
    if !in_word {
        start = prefix.len();
    }
    CursorWords {
        done,
        current,
        start,
    }
}

fn quoted(candidate: &str) -> String {
    if candidate.contains(char::is_whitespace) {
        format!("\"{candidate}\"")
    } else {
        candidate.to_string()
    }
}

/// Completes command names, then each command's arguments: category paths,
/// period names, or command names for `help`.
#[derive(Helper, Hinter, Highlighter, Validator)]
struct CommandHelper {
    commands: Vec<(String, ArgKind)>,
    store: Arc<MemoryStore>,
}

impl CommandHelper {
    fn new(commands: Vec<(String, ArgKind)>, store: Arc<MemoryStore>) -> Self {
        Self { commands, store }
    }

    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let words = cursor_words(&line[..pos]);
        let needle = words.current.to_lowercase();
        let pool = match words.done.split_first() {
            None => self.command_names(),
            Some((command, args)) => self.argument_pool(command, args),
        };

        let mut pairs: Vec<Pair> = pool
            .into_iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&needle))
            .map(|candidate| Pair {
                replacement: quoted(&candidate),
                display: candidate,
            })
            .collect();
        pairs.sort_by(|left, right| left.display.cmp(&right.display));
        pairs.dedup_by(|left, right| left.display == right.display);
        (words.start, pairs)
    }

    fn argument_pool(&self, command: &str, args: &[String]) -> Vec<String> {
        if args.last().map(String::as_str) == Some("--parent") {
            return self.category_paths();
        }
        let position = args.iter().filter(|arg| !arg.starts_with("--")).count();
        let kind = self
            .commands
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(command))
            .map_or(ArgKind::Free, |(_, kind)| *kind);

        match kind {
            ArgKind::CategoryPaths(count) if position < count => self.category_paths(),
            ArgKind::Period if position == 0 => {
                PERIODS.iter().map(|period| period.to_string()).collect()
            }
            ArgKind::CommandName if position == 0 => self.command_names(),
            _ => Vec::new(),
        }
    }

    fn command_names(&self) -> Vec<String> {
        self.commands.iter().map(|(name, _)| name.clone()).collect()
    }

    fn category_paths(&self) -> Vec<String> {
        match self.store.all() {
            Ok(rows) => rows.into_iter().map(|category| category.full_path).collect(),
            Err(err) => {
                debug!(%err, "category completion unavailable");
                Vec::new()
            }
        }
    }
}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::register_all;
    use crate::cli::registry::CommandRegistry;
    use crate::core::services::CategoryService;

    fn helper() -> CommandHelper {
        let store = Arc::new(MemoryStore::new());
        let service = CategoryService::new(store.as_ref(), store.as_ref());
        let food = service.insert("Food", "restaurant", None).unwrap();
        service.insert("Street Food", "restaurant", Some(food)).unwrap();
        service.insert("Fuel", "local_gas_station", None).unwrap();

        let mut registry = CommandRegistry::new();
        register_all(&mut registry);
        CommandHelper::new(registry.completion_table(), store)
    }

    fn replacements(helper: &CommandHelper, line: &str) -> (usize, Vec<String>) {
        let (start, pairs) = helper.candidates(line, line.len());
        (start, pairs.into_iter().map(|pair| pair.replacement).collect())
    }

    #[test]
    fn open_quote_stays_part_of_the_current_word() {
        let words = cursor_words(r#"spend "Food > Str"#);
        assert_eq!(words.done, ["spend"]);
        assert_eq!(words.current, "Food > Str");
        assert_eq!(words.start, 6);

        let after_space = cursor_words("rm Food ");
        assert_eq!(after_space.done, ["rm", "Food"]);
        assert_eq!(after_space.start, 8);
    }

    #[test]
    fn first_word_completes_command_names() {
        let helper = helper();
        assert_eq!(
            replacements(&helper, "re"),
            (0, vec!["reassign".into(), "rename".into(), "resolve".into()])
        );
    }

    #[test]
    fn category_arguments_complete_to_quoted_paths() {
        let helper = helper();
        assert_eq!(
            replacements(&helper, r#"rm "Food > S"#),
            (3, vec![r#""Food > Street Food""#.to_string()])
        );
        assert_eq!(
            replacements(&helper, "spend F").1,
            ["Food", r#""Food > Street Food""#, "Fuel"]
        );
        assert_eq!(
            replacements(&helper, "add Pizza --parent fo").1,
            ["Food", r#""Food > Street Food""#]
        );
        assert!(replacements(&helper, "rename Food F").1.is_empty());
        assert_eq!(replacements(&helper, "move Fuel Fo").1.len(), 2);
    }

    #[test]
    fn period_and_help_complete_their_first_argument() {
        let helper = helper();
        assert_eq!(replacements(&helper, "period y"), (7, vec!["yearly".into()]));
        assert_eq!(replacements(&helper, "help dr").1, ["drill"]);
        assert!(replacements(&helper, "period yearly ").1.is_empty());
    }
}
