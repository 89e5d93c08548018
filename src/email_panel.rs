use crate::config::EmailApi;
use crate::controller::{SharedDashboard, TaskListController, lock_dashboard};
use crate::interaction::UserInteraction;
use crate::notifications::Severity;
use crate::view::{EmailPanelView, HistoryView};
use tokio::task::JoinHandle;
use tracing::warn;

/// Read-only view of the email subsystem, plus the two email actions that
/// are not tied to a single task.
#[derive(Clone)]
pub struct EmailStatusPanel {
    tasks: TaskListController,
}

impl EmailStatusPanel {
    pub fn new(tasks: TaskListController) -> Self {
        EmailStatusPanel { tasks }
    }

    fn dashboard(&self) -> SharedDashboard {
        self.tasks.dashboard()
    }

    fn notify(&self, message: impl Into<String>, severity: Severity) {
        lock_dashboard(&self.dashboard())
            .notifications
            .show(message, severity);
    }

    fn set_panel(&self, view: EmailPanelView) {
        lock_dashboard(&self.dashboard()).email_panel = view;
    }

    /// Always ends with either a rendered panel or a rendered error.
    pub fn check_status(&self) -> JoinHandle<()> {
        let panel = self.clone();
        let api = self.tasks.api();
        let email_api = self.tasks.email_api();

        tokio::spawn(async move {
            match email_api {
                EmailApi::V1 => match api.email_config_status().await {
                    Ok(status) => panel.set_panel(EmailPanelView::from_configuration(&status)),
                    Err(e) => {
                        warn!("email status check failed: {}", e);
                        panel.set_panel(EmailPanelView::failed(&e));
                        panel.notify(format!("Error checking email status: {}", e), Severity::Danger);
                    }
                },
                EmailApi::V2 => match api.email_status().await {
                    Ok(report) => {
                        let view = EmailPanelView::from_report(&report);
                        let ok = matches!(view, EmailPanelView::Summary { .. });
                        panel.set_panel(view);
                        if ok {
                            panel.notify(
                                "Email system status checked successfully!",
                                Severity::Success,
                            );
                        } else {
                            panel.notify(
                                format!(
                                    "Error checking email status: {}",
                                    report.error.as_deref().unwrap_or("no status details")
                                ),
                                Severity::Danger,
                            );
                        }
                    }
                    Err(e) => {
                        warn!("email status check failed: {}", e);
                        panel.set_panel(EmailPanelView::failed(&e));
                        panel.notify(format!("Error checking email status: {}", e), Severity::Danger);
                    }
                },
            }
        })
    }

    pub fn test_connection(&self) -> JoinHandle<()> {
        let panel = self.clone();
        let api = self.tasks.api();
        let email_api = self.tasks.email_api();

        tokio::spawn(async move {
            let result = match email_api {
                EmailApi::V1 => api.test_email().await,
                EmailApi::V2 => api.test_email_config().await,
            };
            match result {
                Ok(outcome) => panel.notify(outcome.message, Severity::from_outcome(outcome.success)),
                Err(e) => panel.notify(
                    format!("Error testing email connection: {}", e),
                    Severity::Danger,
                ),
            }
        })
    }

    /// Bulk sends may change task state, so the task list is reloaded after.
    pub fn send_bulk_reminders(&self, ui: &mut dyn UserInteraction) -> Option<JoinHandle<()>> {
        if !ui.confirm("Send email reminders for all tasks with email notifications enabled?") {
            return None;
        }

        let panel = self.clone();
        let api = self.tasks.api();
        let email_api = self.tasks.email_api();

        Some(tokio::spawn(async move {
            let result = match email_api {
                EmailApi::V1 => api.send_demo_reminders().await,
                EmailApi::V2 => api.send_bulk_reminders().await,
            };
            match result {
                Ok(outcome) => {
                    panel.notify(outcome.message, Severity::from_outcome(outcome.success));
                    panel.tasks.refresh().await;
                }
                Err(e) => {
                    warn!("bulk reminders failed: {}", e);
                    panel.notify(format!("Error sending reminders: {}", e), Severity::Danger);
                }
            }
        }))
    }

    pub fn show_history(&self) -> JoinHandle<()> {
        let panel = self.clone();
        let api = self.tasks.api();

        tokio::spawn(async move {
            match api.email_history().await {
                Ok(history) => {
                    lock_dashboard(&panel.dashboard()).history =
                        Some(HistoryView::render(&history.history));
                    match history.error {
                        Some(error) if history.history.is_empty() => panel.notify(
                            format!("Error loading email history: {}", error),
                            Severity::Warning,
                        ),
                        _ => panel.notify("Email history loaded successfully!", Severity::Info),
                    }
                }
                Err(e) => panel.notify(
                    format!("Error loading email history: {}", e),
                    Severity::Danger,
                ),
            }
        })
    }
}
