//! trellis - プロジェクトダッシュボードの CLI
//!
//! 1 回の起動で `Dashboard::start()` → コマンド 1 つ → `shutdown()`。
//! `watch` だけは Ctrl-C まで push 通知を表示し続けます。

use std::error::Error;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use trellis_core::app::{AddOptions, Dashboard, DashboardBuilder};
use trellis_core::config::AppConfig;
use trellis_core::domain::{
    DelayCategory, DelayDraft, DueDate, NoteDraft, NoteId, NotePatch, Row, Section, TaskDraft,
    TaskId, TaskPatch, TaskStatus,
};
use trellis_core::impls::InMemoryGateway;
use trellis_core::ports::{Clock, SystemClock, UlidGenerator};

mod consent;
mod telemetry;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// trellis - tasks, notes and delays synced to a backend, a tracker, a calendar and chat
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Use a throwaway in-process backend instead of the configured one
    #[arg(long, global = true)]
    memory: bool,

    /// Emit logs as JSON (overrides TRELLIS_LOG_JSON)
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which collaborators are connected
    Status,

    /// Inspect or change stored credentials
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Test credentials and store them when accepted
    #[command(subcommand)]
    Connect(ConnectCommand),

    #[command(subcommand)]
    Tasks(TaskCommand),

    #[command(subcommand)]
    Notes(NoteCommand),

    #[command(subcommand)]
    Delays(DelayCommand),

    /// Most recent activity entries
    Activity,

    /// Tasks in the configured tracker folder
    TrackerTasks,

    /// Upcoming calendar events (next 30 days)
    Events,

    /// Print pushed changes until Ctrl-C
    Watch,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    /// Merge key=value pairs into one section
    Set {
        section: SectionArg,
        #[arg(value_parser = parse_pair, required = true)]
        pairs: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SectionArg {
    Backend,
    Tracker,
    Calendar,
    Chat,
    User,
}

impl From<SectionArg> for Section {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Backend => Section::Backend,
            SectionArg::Tracker => Section::Tracker,
            SectionArg::Calendar => Section::Calendar,
            SectionArg::Chat => Section::Chat,
            SectionArg::User => Section::User,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConnectCommand {
    Backend { url: String, key: String },
    Tracker {
        token: String,
        #[arg(long, default_value = "")]
        folder: String,
    },
    /// Runs the consent flow (TRELLIS_CALENDAR_TOKEN skips the prompt)
    Calendar { client_id: String },
    Chat { webhook_url: String },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    #[command(alias = "ls")]
    List,
    Add(TaskAddArgs),
    Edit(TaskEditArgs),
    #[command(alias = "rm")]
    Remove { id: String },
    /// Flip between completed and active
    Toggle { id: String },
}

#[derive(Args, Debug)]
struct TaskAddArgs {
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    assignee: Option<String>,
    /// YYYY-MM-DD or RFC 3339
    #[arg(long)]
    due: Option<DueDate>,
    /// Do not create a tracker task
    #[arg(long)]
    no_tracker: bool,
    /// Do not create a calendar event
    #[arg(long)]
    no_calendar: bool,
}

#[derive(Args, Debug)]
struct TaskEditArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    assignee: Option<String>,
    #[arg(long)]
    due: Option<DueDate>,
    /// active | in_progress | completed
    #[arg(long)]
    status: Option<TaskStatus>,
    /// Keep this change out of the tracker
    #[arg(long)]
    no_tracker_sync: bool,
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    #[command(alias = "ls")]
    List,
    Add {
        title: String,
        content: String,
        /// Also post the content as a comment on this tracker task
        #[arg(long)]
        tracker_task: Option<String>,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    #[command(alias = "rm")]
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum DelayCommand {
    #[command(alias = "ls")]
    List,
    Add {
        task_title: String,
        reason: String,
        /// e.g. "Scope Change"
        #[arg(long)]
        category: Option<DelayCategory>,
        #[arg(long)]
        duration: Option<String>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build(config: &AppConfig, memory: bool) -> CliResult<Dashboard> {
    let mut builder = DashboardBuilder::from_config(config, Arc::new(consent::TerminalConsent));
    if memory {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let gateway = InMemoryGateway::new(Arc::clone(&clock), Arc::new(UlidGenerator::new(clock)))
            .with_host_suffix(&config.backend_host_suffix);
        tracing::info!("using the in-process backend; nothing is persisted");
        builder = builder.gateway(Arc::new(gateway));
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    telemetry::init_tracing(cli.json_logs || config.log_json);

    let dashboard = build(&config, cli.memory)?;
    dashboard.start().await;

    let result = run(&dashboard, cli.command).await;
    dashboard.shutdown();
    result
}

async fn run(dashboard: &Dashboard, command: Command) -> CliResult {
    match command {
        Command::Status => print_json(&dashboard.connectivity()),
        Command::Settings(cmd) => settings(dashboard, cmd),
        Command::Connect(cmd) => connect(dashboard, cmd).await,
        Command::Tasks(cmd) => tasks(dashboard, cmd).await,
        Command::Notes(cmd) => notes(dashboard, cmd).await,
        Command::Delays(cmd) => delays(dashboard, cmd).await,
        Command::Activity => print_json(&dashboard.activity.list().snapshot()),
        Command::TrackerTasks => print_json(&dashboard.mirrors.tracker_tasks()),
        Command::Events => print_json(&dashboard.mirrors.events()),
        Command::Watch => watch(dashboard).await,
    }
}

fn settings(dashboard: &Dashboard, cmd: SettingsCommand) -> CliResult {
    let credentials = &dashboard.context().credentials;
    match cmd {
        SettingsCommand::Show => print_json(&credentials.get()),
        SettingsCommand::Set { section, pairs } => {
            let partial: Row = pairs
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            let merged = credentials.set(section.into(), partial)?;
            print_json(&merged)
        }
    }
}

async fn connect(dashboard: &Dashboard, cmd: ConnectCommand) -> CliResult {
    let (who, connected) = match cmd {
        ConnectCommand::Backend { url, key } => ("backend", dashboard.connect_backend(&url, &key).await),
        ConnectCommand::Tracker { token, folder } => {
            ("tracker", dashboard.connect_tracker(&token, &folder).await)
        }
        ConnectCommand::Calendar { client_id } => ("calendar", dashboard.connect_calendar(&client_id).await),
        ConnectCommand::Chat { webhook_url } => ("chat", dashboard.connect_chat(&webhook_url).await),
    };
    if !connected {
        return Err(format!("{who} rejected the credentials").into());
    }
    println!("{who} connected");
    Ok(())
}

async fn tasks(dashboard: &Dashboard, cmd: TaskCommand) -> CliResult {
    let sync = &dashboard.tasks;
    match cmd {
        TaskCommand::List => print_json(&sync.list().snapshot()),
        TaskCommand::Add(args) => {
            let draft = TaskDraft {
                description: args.description,
                assignee: args.assignee,
                due_date: args.due,
                ..TaskDraft::new(args.title)
            };
            let options = AddOptions {
                tracker: !args.no_tracker,
                calendar: !args.no_calendar,
            };
            let task = sync.add(draft, options).await.ok_or("task was not created")?;
            print_json(&task)
        }
        TaskCommand::Edit(args) => {
            let patch = TaskPatch {
                title: args.title,
                description: args.description,
                assignee: args.assignee,
                due_date: args.due,
                status: args.status,
                ..TaskPatch::default()
            };
            if patch.is_empty() {
                return Err("nothing to change".into());
            }
            let id = TaskId::new(args.id);
            let task = sync
                .edit(&id, patch, !args.no_tracker_sync)
                .await
                .ok_or_else(|| format!("task {id} was not updated"))?;
            print_json(&task)
        }
        TaskCommand::Remove { id } => {
            let id = TaskId::new(id);
            if !sync.remove(&id).await {
                return Err(format!("task {id} was not deleted").into());
            }
            println!("deleted {id}");
            Ok(())
        }
        TaskCommand::Toggle { id } => {
            let id = TaskId::new(id);
            let task = sync
                .toggle(&id)
                .await
                .ok_or_else(|| format!("task {id} was not toggled"))?;
            print_json(&task)
        }
    }
}

async fn notes(dashboard: &Dashboard, cmd: NoteCommand) -> CliResult {
    let sync = &dashboard.notes;
    match cmd {
        NoteCommand::List => print_json(&sync.list().snapshot()),
        NoteCommand::Add {
            title,
            content,
            tracker_task,
        } => {
            let mut draft = NoteDraft::new(title, content);
            if let Some(tracker_task) = tracker_task {
                draft = draft.with_tracker_task(tracker_task);
            }
            let note = sync.add(draft).await.ok_or("note was not created")?;
            print_json(&note)
        }
        NoteCommand::Edit { id, title, content } => {
            let id = NoteId::new(id);
            let note = sync
                .edit(&id, NotePatch { title, content })
                .await
                .ok_or_else(|| format!("note {id} was not updated"))?;
            print_json(&note)
        }
        NoteCommand::Remove { id } => {
            let id = NoteId::new(id);
            if !sync.remove(&id).await {
                return Err(format!("note {id} was not deleted").into());
            }
            println!("deleted {id}");
            Ok(())
        }
    }
}

async fn delays(dashboard: &Dashboard, cmd: DelayCommand) -> CliResult {
    match cmd {
        DelayCommand::List => print_json(&dashboard.delays.list().snapshot()),
        DelayCommand::Add {
            task_title,
            reason,
            category,
            duration,
        } => {
            let mut draft = DelayDraft::new(task_title, reason);
            if let Some(category) = category {
                draft.category = category;
            }
            if let Some(duration) = duration {
                draft.duration = duration;
            }
            let delay = dashboard
                .delays
                .add(draft)
                .await
                .ok_or("delay was not logged")?;
            print_json(&delay)
        }
    }
}

async fn watch(dashboard: &Dashboard) -> CliResult {
    if !dashboard.is_subscribed() {
        return Err("backend is not connected; nothing to watch".into());
    }
    let mut tasks = dashboard.tasks.list().watch();
    let mut notes = dashboard.notes.list().watch();
    let mut activity = dashboard.activity.list().watch();
    eprintln!("watching for changes; Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = tasks.changed() => {
                if changed.is_err() { break; }
                println!("tasks: {}", tasks.borrow_and_update().len());
            }
            changed = notes.changed() => {
                if changed.is_err() { break; }
                println!("notes: {}", notes.borrow_and_update().len());
            }
            changed = activity.changed() => {
                if changed.is_err() { break; }
                if let Some(latest) = activity.borrow_and_update().first() {
                    println!("activity: {}", latest.action);
                }
            }
        }
    }
    Ok(())
}
