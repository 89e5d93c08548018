//! View model for the dashboard.
//!
//! Everything here is a pure function of fetched data, so the same state can
//! be drawn by the TUI, printed by the CLI, or asserted on in tests.

use crate::api_types::{
    DeliveryStatus, EmailConfigStatus, EmailHistoryEntry, EmailStatusReport, Task,
};
use crate::notifications::NotificationCenter;
use chrono::{DateTime, Duration, Local, NaiveDateTime};
use chrono_english::{Dialect, parse_date_string};

pub const FORM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const EMPTY_TASKS_MESSAGE: &str = "No tasks yet. Add your first task above!";
pub const NO_HISTORY_MESSAGE: &str = "No email history found.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub email_reminder: bool,
    /// Earliest selectable due date, `YYYY-MM-DDTHH:MM` local time.
    pub min_due: String,
}

impl TaskForm {
    /// Clears the user's input; the due-date floor survives.
    pub fn reset(&mut self) {
        *self = TaskForm {
            min_due: std::mem::take(&mut self.min_due),
            ..TaskForm::default()
        };
    }

    pub fn set_min_due(&mut self, now: DateTime<Local>) {
        self.min_due = now.format(FORM_DATETIME_FORMAT).to_string();
    }

    /// Resolves the typed due date into the wire format, refusing dates
    /// before `min_due`.
    pub fn resolve_due_date(&self, now: DateTime<Local>) -> Result<String, String> {
        let due = parse_due_date(&self.due_date, now)
            .ok_or_else(|| format!("Could not understand due date \"{}\"", self.due_date))?;

        if let Ok(min) = NaiveDateTime::parse_from_str(&self.min_due, FORM_DATETIME_FORMAT) {
            if due < min {
                return Err("Due date cannot be in the past".to_string());
            }
        }
        Ok(due.format(FORM_DATETIME_FORMAT).to_string())
    }
}

pub fn parse_due_date(input: &str, now: DateTime<Local>) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    for format in [FORM_DATETIME_FORMAT, "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Some(parsed);
        }
    }

    match input.to_lowercase().as_str() {
        "today" | "now" => return Some(now.naive_local()),
        "tomorrow" => return Some((now + Duration::days(1)).naive_local()),
        _ => {}
    }

    parse_date_string(input, now, Dialect::Us)
        .ok()
        .map(|parsed| parsed.naive_local())
}

pub fn count_label(count: usize) -> String {
    format!("{} task{}", count, if count == 1 { "" } else { "s" })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Badge {
    Completed,
    Overdue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed_style: bool,
    pub overdue_style: bool,
    pub bell: bool,
    pub due_label: String,
    pub badges: Vec<Badge>,
    pub toggle_label: &'static str,
    pub can_send_reminder: bool,
}

impl TaskCard {
    pub fn from_task(task: &Task) -> Self {
        // A completed task is never shown as overdue.
        let overdue = task.is_overdue && !task.completed;

        let mut badges = Vec::new();
        if task.completed {
            badges.push(Badge::Completed);
        }
        if overdue {
            badges.push(Badge::Overdue);
        }

        TaskCard {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone().filter(|d| !d.is_empty()),
            completed_style: task.completed,
            overdue_style: overdue,
            bell: task.email_reminder,
            due_label: format!("Due: {}", task.due_date),
            badges,
            toggle_label: if task.completed {
                "Mark as incomplete"
            } else {
                "Mark as complete"
            },
            can_send_reminder: task.email_reminder,
        }
    }

    pub fn has_badge(&self, badge: &Badge) -> bool {
        self.badges.contains(badge)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskListBody {
    Empty(&'static str),
    Cards(Vec<TaskCard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskListView {
    pub count_label: String,
    pub body: TaskListBody,
}

impl TaskListView {
    pub fn render(tasks: &[Task]) -> Self {
        let body = if tasks.is_empty() {
            TaskListBody::Empty(EMPTY_TASKS_MESSAGE)
        } else {
            TaskListBody::Cards(tasks.iter().map(TaskCard::from_task).collect())
        };

        TaskListView {
            count_label: count_label(tasks.len()),
            body,
        }
    }

    pub fn cards(&self) -> &[TaskCard] {
        match &self.body {
            TaskListBody::Cards(cards) => cards,
            TaskListBody::Empty(_) => &[],
        }
    }

    pub fn card(&self, task_id: i64) -> Option<&TaskCard> {
        self.cards().iter().find(|c| c.id == task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EmailPanelView {
    #[default]
    Unchecked,
    Configuration {
        mode: String,
        configured: bool,
    },
    Summary {
        total: u64,
        successful: u64,
        failed: u64,
        last_activity: String,
    },
    Error(String),
}

impl EmailPanelView {
    pub fn from_configuration(status: &EmailConfigStatus) -> Self {
        EmailPanelView::Configuration {
            mode: status
                .mode
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Demo Mode".to_string()),
            configured: status.email_configured,
        }
    }

    pub fn from_report(report: &EmailStatusReport) -> Self {
        match &report.status_details {
            Some(details) => EmailPanelView::Summary {
                total: details.total_emails,
                successful: details.successful_emails,
                failed: details.failed_emails,
                last_activity: details.last_activity.clone(),
            },
            None => EmailPanelView::failed(
                report
                    .error
                    .as_deref()
                    .unwrap_or("status details missing from response"),
            ),
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        EmailPanelView::Error(format!("Unable to check email status: {}", reason))
    }

    pub fn configured_badge(&self) -> Option<&'static str> {
        match self {
            EmailPanelView::Configuration { configured, .. } => {
                Some(if *configured { "Yes" } else { "No" })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLine {
    pub title: String,
    pub status: DeliveryStatus,
    pub delivered: bool,
    pub meta: String,
    pub message: Option<String>,
}

impl HistoryLine {
    fn from_entry(entry: &EmailHistoryEntry) -> Self {
        HistoryLine {
            title: entry
                .task_title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Test Email".to_string()),
            delivered: entry.status == DeliveryStatus::Sent,
            status: entry.status.clone(),
            meta: format!("To: {} | {}", entry.recipient_email, entry.timestamp),
            message: entry
                .user_message
                .clone()
                .filter(|m| !m.is_empty())
                .map(|m| format!("Message: {}", m)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryView {
    Empty(&'static str),
    Entries(Vec<HistoryLine>),
}

impl HistoryView {
    pub fn render(entries: &[EmailHistoryEntry]) -> Self {
        if entries.is_empty() {
            HistoryView::Empty(NO_HISTORY_MESSAGE)
        } else {
            HistoryView::Entries(entries.iter().map(HistoryLine::from_entry).collect())
        }
    }
}

/// Everything on screen. Replaced piecewise by the controller and panel.
#[derive(Debug, Default)]
pub struct Dashboard {
    pub form: TaskForm,
    pub tasks: Option<TaskListView>,
    pub email_panel: EmailPanelView,
    pub history: Option<HistoryView>,
    pub notifications: NotificationCenter,
}

impl Dashboard {
    pub fn new(notifications: NotificationCenter) -> Self {
        Dashboard {
            notifications,
            ..Dashboard::default()
        }
    }
}
