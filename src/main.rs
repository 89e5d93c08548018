mod api_client;
mod api_types;
mod config;
mod controller;
mod email_panel;
mod interaction;
mod notifications;
mod tui;
mod view;

#[cfg(test)]
mod test_utils;

use crate::api_client::HttpTaskApi;
use crate::config::{CONFIG_FILE_NAME, ClientConfig, EmailApi};
use crate::controller::{SharedDashboard, TaskListController, lock_dashboard};
use crate::email_panel::EmailStatusPanel;
use crate::interaction::TerminalInteraction;
use crate::notifications::{NotificationCenter, Severity};
use crate::view::{Badge, Dashboard, EmailPanelView, HistoryView, TaskListBody, TaskListView};
use chrono::Local;
use clap::Parser;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "duetask.log";

#[derive(Parser)]
#[command(name = "duetask")]
#[command(author, version, about = "task list client for a remote task and email reminder service", long_about = None)]
struct Cli {
    /// title of a task to add (if empty, launch tui)
    title: Option<String>,

    /// due date for the new task, e.g. "2026-10-20 09:00" or "tomorrow"
    #[arg(long, value_name = "WHEN")]
    due: Option<String>,

    /// description for the new task
    #[arg(long, value_name = "TEXT")]
    description: Option<String>,

    /// enable email reminders for the new task
    #[arg(long)]
    reminder: bool,

    /// list all tasks
    #[arg(short, long)]
    list: bool,

    /// toggle completion of a task
    #[arg(long, value_name = "ID")]
    complete: Option<i64>,

    /// delete a task (asks first)
    #[arg(long, value_name = "ID")]
    delete: Option<i64>,

    /// send a reminder email for a task
    #[arg(long, value_name = "ID")]
    remind: Option<i64>,

    /// show email delivery status
    #[arg(long)]
    status: bool,

    /// show whether the server has email configured
    #[arg(long)]
    config_status: bool,

    /// test the email connection
    #[arg(long)]
    test_email: bool,

    /// send reminders for every task with reminders enabled
    #[arg(long)]
    bulk: bool,

    /// show email history
    #[arg(long)]
    history: bool,

    /// write a default duetask.toml
    #[arg(long)]
    setup: bool,

    /// directory holding duetask.toml (creates if doesn't exist)
    #[arg(short, long, value_name = "DIR")]
    path: Option<String>,

    /// server url, overrides base_url from duetask.toml
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,
}

impl Cli {
    fn launches_tui(&self) -> bool {
        self.title.is_none()
            && !self.list
            && self.complete.is_none()
            && self.delete.is_none()
            && self.remind.is_none()
            && !self.status
            && !self.config_status
            && !self.test_email
            && !self.bulk
            && !self.history
            && !self.setup
    }
}

fn resolve_working_dir(path: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let Some(p) = path else {
        return Ok(env::current_dir()?);
    };
    let pb = PathBuf::from(p);
    if !pb.exists() {
        fs::create_dir_all(&pb)?;
        println!("📁 Created directory: {}", pb.display());
    }
    if !pb.is_dir() {
        return Err(format!("Path {} is not a directory", pb.display()).into());
    }
    Ok(pb.canonicalize()?)
}

fn init_logging(work_dir: &Path, to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("duetask=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // The TUI owns the terminal, so its logs go to a file.
    if to_file {
        let file = fs::File::create(work_dir.join(LOG_FILE_NAME))?;
        builder
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .try_init()
            .map_err(|e| e.to_string())?;
    } else {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = resolve_working_dir(cli.path.as_deref())?;
    let tui = cli.launches_tui();
    init_logging(&work_dir, tui)?;

    if cli.path.is_some() {
        println!("📂 Working directory: {}", work_dir.display());
    }

    if cli.setup {
        setup_config(&work_dir)?;
        return Ok(());
    }

    let mut config = ClientConfig::load(&work_dir)?;
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    let api = Arc::new(HttpTaskApi::new(&config.base_url, config.request_timeout())?);
    let dashboard: SharedDashboard = Arc::new(Mutex::new(Dashboard::new(NotificationCenter::new(
        config.notification_ttl(),
    ))));
    let controller = TaskListController::new(api, Arc::clone(&dashboard), &config);
    let panel = EmailStatusPanel::new(controller.clone());

    if tui {
        println!("🚀 Launching duetask TUI against {}...", config.base_url);
        return tui::run_tui(controller, panel);
    }

    let mut ui = TerminalInteraction::stdio();

    if let Some(title) = &cli.title {
        {
            let mut d = lock_dashboard(&dashboard);
            let now = Local::now();
            d.form.set_min_due(now);
            d.form.title = title.clone();
            d.form.description = cli.description.clone().unwrap_or_default();
            let due = cli.due.clone().unwrap_or_else(|| d.form.min_due.clone());
            d.form.due_date = due;
            d.form.email_reminder = cli.reminder;
        }
        println!("adding task: {}", title);
        wait(controller.add_task()).await;
    }

    if let Some(id) = cli.complete {
        wait(Some(controller.toggle_complete(id))).await;
    }

    if let Some(id) = cli.delete {
        wait(controller.delete_task(id, &mut ui)).await;
    }

    if let Some(id) = cli.remind {
        // Reminders are only offered for tasks the server knows about.
        wait(Some(controller.load_tasks())).await;
        let refusal = reminder_refusal(lock_dashboard(&dashboard).tasks.as_ref(), id);
        match refusal {
            None => wait(controller.send_test_reminder(id, &mut ui)).await,
            Some(reason) => eprintln!("{}", reason),
        }
    }

    if cli.config_status {
        // The configuration check only exists on the first email API family.
        let v1_panel = EmailStatusPanel::new(controller.with_email_api(EmailApi::V1));
        wait(Some(v1_panel.check_status())).await;
        print_email_panel(&lock_dashboard(&dashboard).email_panel);
    }

    if cli.status {
        wait(Some(panel.check_status())).await;
        print_email_panel(&lock_dashboard(&dashboard).email_panel);
    }

    if cli.test_email {
        wait(Some(panel.test_connection())).await;
    }

    if cli.bulk {
        wait(panel.send_bulk_reminders(&mut ui)).await;
    }

    if cli.history {
        wait(Some(panel.show_history())).await;
        if let Some(history) = &lock_dashboard(&dashboard).history {
            print_history(history);
        }
    }

    if cli.list {
        wait(Some(controller.load_tasks())).await;
    }

    let d = lock_dashboard(&dashboard);
    print_notifications(&d.notifications);
    if cli.list || cli.bulk {
        print_tasks(&d);
    }
    Ok(())
}

/// Why `--remind ID` cannot go ahead, if it cannot.
fn reminder_refusal(tasks: Option<&TaskListView>, id: i64) -> Option<String> {
    match tasks.and_then(|t| t.card(id)) {
        None => Some(format!("No task with id {}", id)),
        Some(card) if !card.can_send_reminder => {
            Some(format!("Email reminders are not enabled for task {}", id))
        }
        Some(_) => None,
    }
}

async fn wait(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        if let Err(e) = handle.await {
            tracing::error!("background request panicked: {}", e);
        }
    }
}

fn print_notifications(notifications: &NotificationCenter) {
    // Oldest first reads naturally on a terminal.
    for n in notifications.visible().iter().rev() {
        let icon = match n.severity {
            Severity::Success => "✓",
            Severity::Warning => "⚠️",
            Severity::Danger => "✗",
            Severity::Info => "ℹ️",
        };
        println!("{} {}", icon, n.message);
    }
}

fn print_tasks(d: &Dashboard) {
    let Some(view) = &d.tasks else {
        return;
    };
    println!("tasks ({}):", view.count_label);
    match &view.body {
        TaskListBody::Empty(message) => println!("  {}", message),
        TaskListBody::Cards(cards) => {
            for card in cards {
                let checkbox = if card.completed_style { "[x]" } else { "[ ]" };
                let bell = if card.bell { " 🔔" } else { "" };
                println!("  {} #{} {}{}", checkbox, card.id, card.title, bell);
                if let Some(description) = &card.description {
                    println!("      {}", description);
                }
                print!("      📅 {}", card.due_label);
                if card.has_badge(&Badge::Overdue) {
                    print!("  ⚠️ Overdue");
                }
                if card.has_badge(&Badge::Completed) {
                    print!("  ✓ Completed");
                }
                println!();
            }
        }
    }
}

fn print_email_panel(panel: &EmailPanelView) {
    match panel {
        EmailPanelView::Unchecked => {}
        EmailPanelView::Configuration { mode, .. } => {
            println!("📧 Mode: {}", mode);
            println!("   Email Configured: {}", panel.configured_badge().unwrap_or("No"));
        }
        EmailPanelView::Summary { total, successful, failed, last_activity } => {
            println!("📧 Total Emails: {}", total);
            println!("   Successful: {}", successful);
            println!("   Failed: {}", failed);
            println!("   Last activity: {}", last_activity);
        }
        EmailPanelView::Error(message) => println!("⚠️ {}", message),
    }
}

fn print_history(history: &HistoryView) {
    match history {
        HistoryView::Empty(message) => println!("{}", message),
        HistoryView::Entries(entries) => {
            println!("email history:");
            for entry in entries {
                println!("  {} [{}]", entry.title, entry.status.as_str());
                println!("      {}", entry.meta);
                if let Some(message) = &entry.message {
                    println!("      {}", message);
                }
            }
        }
    }
}

fn setup_config(work_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Setting up duetask configuration...");
    let path = ClientConfig::path_in(work_dir);
    if path.exists() {
        println!("{} already exists in {}, leaving it alone", CONFIG_FILE_NAME, work_dir.display());
        return Ok(());
    }
    ClientConfig::default().save(work_dir)?;
    println!("✓ Created {} in {}", CONFIG_FILE_NAME, work_dir.display());
    println!("Please edit {} with your server settings:", CONFIG_FILE_NAME);
    println!("  - base_url: where the task server listens");
    println!("  - email_api: \"v1\" for demo endpoints, \"v2\" for detailed reminders");
    println!("  - default_recipient/default_message: prefilled reminder prompts");
    println!("  - request_timeout_secs: optional, no timeout when unset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::Task;

    fn task(id: i64, email_reminder: bool) -> Task {
        Task {
            id,
            title: "Water plants".to_string(),
            description: None,
            due_date: "2026-10-20 09:00".to_string(),
            completed: false,
            email_reminder,
            is_overdue: false,
        }
    }

    #[test]
    fn test_reminder_refusal() {
        let view = TaskListView::render(&[task(1, true), task(2, false)]);

        assert_eq!(reminder_refusal(Some(&view), 1), None);
        assert_eq!(
            reminder_refusal(Some(&view), 2),
            Some("Email reminders are not enabled for task 2".to_string())
        );
        assert_eq!(reminder_refusal(Some(&view), 9), Some("No task with id 9".to_string()));
        assert_eq!(reminder_refusal(None, 1), Some("No task with id 1".to_string()));
    }
}
