use std::io::{self, BufRead, Write};

use anyhow::anyhow;
use tracing::{debug, info, instrument};
use tracker_core::TaskStore;
use tracker_core::datastore::TaskRepository;
use tracker_core::datetime::{Clock, format_date, parse_date_expr};
use tracker_core::forms::{EditorForm, NoteForm, Submitted};
use tracker_core::render::NotesPanel;
use tracker_core::task::{Status, TaskId};

use crate::cli::{
    AddArgs, Command, DeleteArgs, EditArgs, ListArgs, NoteAddArgs, NoteCommand, NoteDeleteArgs,
    ShowArgs,
};
use crate::config::Config;
use crate::terminal::{Painter, TerminalView, ask_confirmation};

/// Where a command reads confirmations from and writes its report to.
pub struct Io<'a> {
    pub input: &'a mut dyn BufRead,
    pub output: &'a mut dyn Write,
}

impl Io<'_> {
    fn confirm(&mut self, message: &str) -> anyhow::Result<bool> {
        Ok(ask_confirmation(message, &mut *self.input, &mut *self.output)?)
    }
}

#[instrument(skip(store, cfg, painter, io, command))]
pub fn dispatch<R, C>(
    store: &mut TaskStore<R, TerminalView, C>,
    cfg: &Config,
    painter: &Painter,
    io: &mut Io<'_>,
    command: Command,
) -> anyhow::Result<()>
where
    R: TaskRepository,
    C: Clock,
{
    debug!(?command, "dispatching command");

    match command {
        Command::Add(args) => cmd_add(store, io, args),
        Command::Edit(args) => cmd_edit(store, io, args),
        Command::Delete(args) => cmd_delete(store, io, args),
        Command::List(args) => cmd_list(store, painter, io, args),
        Command::Stats => painter.write_stats(&mut *io.output, &store.stats()),
        Command::Show(args) => cmd_show(store, painter, io, args),
        Command::Note(NoteCommand::Add(args)) => cmd_note_add(store, io, args),
        Command::Note(NoteCommand::Delete(args)) => cmd_note_delete(store, io, args),
        Command::Config => cmd_config(cfg, io),
    }
}

/// Exact id, or a prefix that matches exactly one task.
pub fn resolve_task_id<R, C>(store: &TaskStore<R, TerminalView, C>, token: &str) -> Option<TaskId>
where
    R: TaskRepository,
    C: Clock,
{
    if let Some(task) = store.get_task(token) {
        return Some(task.id.clone());
    }
    if token.is_empty() {
        return None;
    }

    let mut matches = store.tasks().iter().filter(|t| t.id.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        debug!(token, "ambiguous id prefix");
        None
    } else {
        Some(first.id.clone())
    }
}

fn parse_status(raw: Option<&str>) -> anyhow::Result<Option<Status>> {
    raw.map(str::parse::<Status>).transpose()
}

fn cmd_add<R: TaskRepository, C: Clock>(
    store: &mut TaskStore<R, TerminalView, C>,
    io: &mut Io<'_>,
    args: AddArgs,
) -> anyhow::Result<()> {
    info!("command add");

    let mut form = EditorForm::for_new(store.today());
    form.title = args.title.join(" ");
    if let Some(raw) = args.deadline.as_deref() {
        form.deadline = parse_date_expr(raw, store.today())?;
    }
    if let Some(status) = parse_status(args.status.as_deref())? {
        form.status = status;
    }

    match form.submit(store)? {
        Submitted::Created(id) => writeln!(io.output, "Created task {id}.")?,
        other => return Err(anyhow!("unexpected editor outcome: {other:?}")),
    }
    Ok(())
}

fn cmd_edit<R: TaskRepository, C: Clock>(
    store: &mut TaskStore<R, TerminalView, C>,
    io: &mut Io<'_>,
    args: EditArgs,
) -> anyhow::Result<()> {
    info!("command edit");

    let Some(id) = resolve_task_id(store, &args.id) else {
        writeln!(io.output, "No task matches {}.", args.id)?;
        return Ok(());
    };
    let Some(task) = store.get_task(&id) else {
        return Ok(());
    };

    let mut form = EditorForm::for_task(task);
    if let Some(title) = args.title {
        form.title = title;
    }
    if let Some(raw) = args.deadline.as_deref() {
        form.deadline = parse_date_expr(raw, store.today())?;
    }
    if let Some(status) = parse_status(args.status.as_deref())? {
        form.status = status;
    }

    match form.submit(store)? {
        Submitted::Updated(id) => writeln!(io.output, "Modified task {id}.")?,
        Submitted::Missing(id) => writeln!(io.output, "No task matches {id}.")?,
        Submitted::Created(id) => writeln!(io.output, "Created task {id}.")?,
    }
    Ok(())
}

fn cmd_delete<R: TaskRepository, C: Clock>(
    store: &mut TaskStore<R, TerminalView, C>,
    io: &mut Io<'_>,
    args: DeleteArgs,
) -> anyhow::Result<()> {
    info!("command delete");

    let Some(id) = resolve_task_id(store, &args.id) else {
        writeln!(io.output, "No task matches {}.", args.id)?;
        return Ok(());
    };

    store.delete_task(&id);
    if resolve_pending(store, io, args.yes)? {
        writeln!(io.output, "Deleted task {id}.")?;
    } else {
        writeln!(io.output, "Kept task {id}.")?;
    }
    Ok(())
}

fn cmd_list<R: TaskRepository, C: Clock>(
    store: &TaskStore<R, TerminalView, C>,
    painter: &Painter,
    io: &mut Io<'_>,
    args: ListArgs,
) -> anyhow::Result<()> {
    info!("command list");
    let search = args.search.unwrap_or_default();
    let columns = store.rendered_board(&search);
    painter.write_board(&mut *io.output, &columns)
}

fn cmd_show<R: TaskRepository, C: Clock>(
    store: &TaskStore<R, TerminalView, C>,
    painter: &Painter,
    io: &mut Io<'_>,
    args: ShowArgs,
) -> anyhow::Result<()> {
    info!("command show");

    let Some(task) = resolve_task_id(store, &args.id).and_then(|id| store.get_task(&id)) else {
        writeln!(io.output, "No task matches {}.", args.id)?;
        return Ok(());
    };
    let panel = store.notes_panel(&task.id).unwrap_or(NotesPanel::Empty);
    let deadline = format_date(task.deadline, &store.render_options().date_format);
    painter.write_task(&mut *io.output, task, &deadline, &panel)
}

fn cmd_note_add<R: TaskRepository, C: Clock>(
    store: &mut TaskStore<R, TerminalView, C>,
    io: &mut Io<'_>,
    args: NoteAddArgs,
) -> anyhow::Result<()> {
    info!("command note add");

    let Some(task_id) = resolve_task_id(store, &args.task_id) else {
        writeln!(io.output, "No task matches {}.", args.task_id)?;
        return Ok(());
    };

    let mut form = NoteForm::for_task(task_id.clone(), store.today());
    if let Some(raw) = args.date.as_deref() {
        form.date = parse_date_expr(raw, store.today())?;
    }
    form.content = args.content.join(" ");

    match form.submit(store)? {
        Some(note_id) => writeln!(io.output, "Added note {note_id} to task {task_id}.")?,
        None => writeln!(io.output, "No task matches {task_id}.")?,
    }
    Ok(())
}

fn cmd_note_delete<R: TaskRepository, C: Clock>(
    store: &mut TaskStore<R, TerminalView, C>,
    io: &mut Io<'_>,
    args: NoteDeleteArgs,
) -> anyhow::Result<()> {
    info!("command note delete");

    let Some(task_id) = resolve_task_id(store, &args.task_id) else {
        writeln!(io.output, "No task matches {}.", args.task_id)?;
        return Ok(());
    };
    let note_id = store
        .get_task(&task_id)
        .and_then(|task| {
            let mut matches = task.notes.iter().filter(|n| n.id.starts_with(&args.note_id));
            match (matches.next(), matches.next()) {
                (Some(note), None) => Some(note.id.clone()),
                _ => task.note(&args.note_id).map(|n| n.id.clone()),
            }
        })
        .unwrap_or(args.note_id);

    store.delete_note(&task_id, &note_id);
    if resolve_pending(store, io, args.yes)? {
        writeln!(io.output, "Deleted note {note_id}.")?;
    } else {
        writeln!(io.output, "Kept note {note_id}.")?;
    }
    Ok(())
}

fn cmd_config(cfg: &Config, io: &mut Io<'_>) -> anyhow::Result<()> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        writeln!(io.output, "{key}={value}")?;
    }
    for file in &cfg.loaded_files {
        writeln!(io.output, "# loaded {}", file.display())?;
    }
    Ok(())
}

/// Settles whatever the store put in front of the confirmation gate.
fn resolve_pending<R: TaskRepository, C: Clock>(
    store: &mut TaskStore<R, TerminalView, C>,
    io: &mut Io<'_>,
    assume_yes: bool,
) -> anyhow::Result<bool> {
    let Some(message) = store.view().confirmation.clone() else {
        return Ok(false);
    };

    let accepted = assume_yes || io.confirm(&message)?;
    if accepted {
        store.confirm()?;
    } else {
        store.cancel();
    }
    Ok(accepted)
}

/// Stdin/stdout pair for the real binary.
pub fn with_stdio<T>(f: impl FnOnce(&mut Io<'_>) -> T) -> T {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    let mut streams = Io {
        input: &mut input,
        output: &mut output,
    };
    f(&mut streams)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::{NaiveDate, TimeZone, Utc};
    use tracker_core::datastore::{JsonRepository, MemorySlot};
    use tracker_core::datetime::FixedClock;
    use tracker_core::task::NewTask;

    use super::*;
    use crate::cli::GlobalCli;
    use clap::Parser;

    type Store = TaskStore<JsonRepository<MemorySlot>, TerminalView, FixedClock>;

    fn store() -> Store {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap());
        let repo = JsonRepository::new(MemorySlot::new());
        TaskStore::open_with_clock(repo, TerminalView::default(), clock).unwrap()
    }

    fn run(store: &mut Store, answer: &str, argv: &[&str]) -> String {
        let argv = std::iter::once("tracker").chain(argv.iter().copied());
        let cli = GlobalCli::try_parse_from(argv).unwrap();
        let mut input = Cursor::new(answer.to_string());
        let mut output = Vec::new();
        let mut io = Io {
            input: &mut input,
            output: &mut output,
        };
        let cfg = crate::config::Config::load(Some(std::path::Path::new("/dev/null"))).unwrap();
        dispatch(store, &cfg, &Painter::plain(), &mut io, cli.command.unwrap()).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn add_parses_deadline_and_status() {
        let mut store = store();
        let out = run(
            &mut store,
            "",
            &["add", "Write", "report", "-d", "2024-05-01", "-s", "in-progress"],
        );
        assert!(out.starts_with("Created task "));

        let task = &store.tasks()[0];
        assert_eq!(task.title, "Write report");
        assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(task.status, Status::InProgress);
    }

    #[test]
    fn add_defaults_deadline_to_today() {
        let mut store = store();
        run(&mut store, "", &["add", "Plan"]);
        assert_eq!(store.tasks()[0].deadline, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
    }

    #[test]
    fn delete_prompts_and_respects_no() {
        let mut store = store();
        let id = store
            .add_task(NewTask::new("Keep me", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
            .unwrap();

        let out = run(&mut store, "n\n", &["delete", &id]);
        assert!(out.contains("Are you sure you want to delete this task?"));
        assert!(out.contains("Kept task"));
        assert_eq!(store.len(), 1);
        assert!(store.pending_confirmation().is_none());

        let out = run(&mut store, "y\n", &["delete", &id[..8]]);
        assert!(out.contains("Deleted task"));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_with_yes_skips_prompt() {
        let mut store = store();
        let id = store
            .add_task(NewTask::new("Gone", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
            .unwrap();
        let out = run(&mut store, "", &["delete", "--yes", &id]);
        assert!(!out.contains("[y/N]"));
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_ids_are_reported_not_failed() {
        let mut store = store();
        assert_eq!(run(&mut store, "", &["edit", "zzz", "-t", "x"]), "No task matches zzz.\n");
        assert_eq!(run(&mut store, "", &["show", "zzz"]), "No task matches zzz.\n");
    }

    #[test]
    fn notes_round_trip_through_commands() {
        let mut store = store();
        let id = store
            .add_task(NewTask::new("Vendor", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
            .unwrap();

        run(&mut store, "", &["note", "add", &id, "called", "them", "-d", "2024-03-01"]);
        run(&mut store, "", &["note", "add", &id, "emailed", "-d", "2024-01-05"]);
        let shown = run(&mut store, "", &["show", &id]);
        let march = shown.find("called them").unwrap();
        let january = shown.find("emailed").unwrap();
        assert!(march < january);

        let note_id = store.get_task(&id).unwrap().notes[0].id.clone();
        run(&mut store, "", &["note", "delete", &id, &note_id, "-y"]);
        let notes = &store.get_task(&id).unwrap().notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "called them");
    }

    #[test]
    fn list_filters_by_search() {
        let mut store = store();
        for title in ["Alpha", "beta", "ALPHA2"] {
            store
                .add_task(NewTask::new(title, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
                .unwrap();
        }
        let out = run(&mut store, "", &["list", "--search", "alpha"]);
        assert!(out.contains("Alpha"));
        assert!(out.contains("ALPHA2"));
        assert!(!out.contains("beta"));
        assert!(out.contains("Not Started (2)"));
    }

    #[test]
    fn ambiguous_prefix_resolves_to_nothing() {
        let mut store = store();
        for _ in 0..2 {
            store
                .add_task(NewTask::new("x", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
                .unwrap();
        }
        assert_eq!(resolve_task_id(&store, ""), None);
        let id = store.tasks()[0].id.clone();
        assert_eq!(resolve_task_id(&store, &id), Some(id));
    }

    #[test]
    fn stats_prints_counts() {
        let mut store = store();
        let deadline = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        store
            .add_task(NewTask::new("a", deadline).with_status(Status::Completed))
            .unwrap();
        let out = run(&mut store, "", &["stats"]);
        assert!(out.contains("Total        1"));
        assert!(out.contains("Completed    1"));
    }
}
