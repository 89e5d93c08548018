use crate::api_client::TaskApi;
use crate::api_types::{NewTask, ReminderRequest};
use crate::config::{ClientConfig, EmailApi};
use crate::email_panel::EmailStatusPanel;
use crate::interaction::UserInteraction;
use crate::notifications::Severity;
use crate::view::{Dashboard, TaskListView};
use chrono::Local;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

pub fn lock_dashboard(dashboard: &SharedDashboard) -> MutexGuard<'_, Dashboard> {
    dashboard.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct ReminderDefaults {
    recipient: String,
    message: String,
}

/// Keeps the task list in step with the backend and turns gestures into
/// API calls. Gestures never block: network work is spawned and the handle
/// returned so callers may await it if they care.
#[derive(Clone)]
pub struct TaskListController {
    api: Arc<dyn TaskApi>,
    dashboard: SharedDashboard,
    email_api: EmailApi,
    reminder: Arc<ReminderDefaults>,
}

impl TaskListController {
    pub fn new(api: Arc<dyn TaskApi>, dashboard: SharedDashboard, config: &ClientConfig) -> Self {
        TaskListController {
            api,
            dashboard,
            email_api: config.email_api,
            reminder: Arc::new(ReminderDefaults {
                recipient: config.default_recipient.clone(),
                message: config.default_message.clone(),
            }),
        }
    }

    pub fn api(&self) -> Arc<dyn TaskApi> {
        Arc::clone(&self.api)
    }

    pub fn dashboard(&self) -> SharedDashboard {
        Arc::clone(&self.dashboard)
    }

    pub fn email_api(&self) -> EmailApi {
        self.email_api
    }

    /// Same backend and dashboard, other endpoint family. `self` is untouched.
    pub fn with_email_api(&self, email_api: EmailApi) -> Self {
        TaskListController {
            email_api,
            ..self.clone()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Dashboard> {
        lock_dashboard(&self.dashboard)
    }

    fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.lock().notifications.show(message, severity);
    }

    /// Sets the due-date floor to now, then kicks off the first task load
    /// and email status check.
    pub fn initialize(&self, panel: &EmailStatusPanel) -> Vec<JoinHandle<()>> {
        self.lock().form.set_min_due(Local::now());
        vec![self.load_tasks(), panel.check_status()]
    }

    pub fn load_tasks(&self) -> JoinHandle<()> {
        let ctrl = self.clone();
        tokio::spawn(async move { ctrl.refresh().await })
    }

    /// Fetches the whole collection and replaces the rendered list. A failed
    /// fetch leaves the previous list on screen.
    pub(crate) async fn refresh(&self) {
        match self.api.list_tasks().await {
            Ok(tasks) => {
                debug!(count = tasks.len(), "tasks loaded");
                self.lock().tasks = Some(TaskListView::render(&tasks));
            }
            Err(e) => {
                warn!("loading tasks failed: {}", e);
                self.notify(format!("Error loading tasks: {}", e), Severity::Danger);
            }
        }
    }

    /// Submits the form. Nothing is sent if the due date is unreadable or
    /// earlier than the form's floor.
    pub fn add_task(&self) -> Option<JoinHandle<()>> {
        let new_task = {
            let mut dashboard = self.lock();
            match dashboard.form.resolve_due_date(Local::now()) {
                Ok(due_date) => {
                    let form = &dashboard.form;
                    NewTask::new(&form.title, &form.description, &due_date, form.email_reminder)
                }
                Err(reason) => {
                    dashboard
                        .notifications
                        .show(format!("Error: {}", reason), Severity::Danger);
                    return None;
                }
            }
        };

        let ctrl = self.clone();
        Some(tokio::spawn(async move {
            match ctrl.api.create_task(&new_task).await {
                Ok(outcome) if outcome.success => {
                    ctrl.lock().form.reset();
                    ctrl.notify("Task added successfully!", Severity::Success);
                    ctrl.refresh().await;
                }
                Ok(outcome) => {
                    ctrl.notify(format!("Error: {}", outcome.message), Severity::Danger);
                }
                Err(e) => {
                    warn!("adding task failed: {}", e);
                    ctrl.notify(format!("Error adding task: {}", e), Severity::Danger);
                }
            }
        }))
    }

    pub fn toggle_complete(&self, task_id: i64) -> JoinHandle<()> {
        let ctrl = self.clone();
        tokio::spawn(async move {
            if let Err(e) = ctrl.api.toggle_complete(task_id).await {
                warn!(task_id, "toggling task failed: {}", e);
                ctrl.notify(format!("Error updating task: {}", e), Severity::Danger);
            }
            ctrl.refresh().await;
        })
    }

    pub fn delete_task(&self, task_id: i64, ui: &mut dyn UserInteraction) -> Option<JoinHandle<()>> {
        if !ui.confirm("Are you sure you want to delete this task?") {
            return None;
        }

        let ctrl = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = ctrl.api.delete_task(task_id).await {
                warn!(task_id, "deleting task failed: {}", e);
                ctrl.notify(format!("Error deleting task: {}", e), Severity::Danger);
            }
            ctrl.refresh().await;
        }))
    }

    /// Asks for confirmation, then (on the detailed endpoint) for a recipient
    /// and an optional message. No recipient means no request.
    pub fn send_test_reminder(
        &self,
        task_id: i64,
        ui: &mut dyn UserInteraction,
    ) -> Option<JoinHandle<()>> {
        if self.email_api == EmailApi::V1 {
            if !ui.confirm("Send demo email reminder for this task?") {
                return None;
            }
            let ctrl = self.clone();
            return Some(tokio::spawn(async move {
                match ctrl.api.send_reminder(task_id).await {
                    Ok(outcome) => {
                        ctrl.notify(outcome.message, Severity::from_outcome(outcome.success))
                    }
                    Err(e) => {
                        ctrl.notify(format!("Error sending reminder: {}", e), Severity::Danger)
                    }
                }
            }));
        }

        if !ui.confirm("Send a reminder email for this task?") {
            return None;
        }
        let recipient = ui
            .prompt("Enter recipient email address:", &self.reminder.recipient)
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())?;
        let message = ui
            .prompt("Enter your message (optional):", &self.reminder.message)
            .unwrap_or_default();

        let request = ReminderRequest {
            recipient_email: recipient,
            message,
        };
        let ctrl = self.clone();
        Some(tokio::spawn(async move {
            match ctrl.api.send_task_email(task_id, &request).await {
                Ok(outcome) => ctrl.notify(outcome.message, Severity::from_outcome(outcome.success)),
                Err(e) => {
                    warn!(task_id, "sending reminder failed: {}", e);
                    ctrl.notify(format!("Error sending email: {}", e), Severity::Danger);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::ScriptedInteraction;
    use crate::test_utils::{FakeTaskApi, dashboard_with};
    use crate::view::{Badge, EMPTY_TASKS_MESSAGE, TaskListBody};
    use chrono::Duration;

    fn controller(api: &Arc<FakeTaskApi>, config: &ClientConfig) -> TaskListController {
        TaskListController::new(api.clone(), dashboard_with(config), config)
    }

    fn tomorrow() -> String {
        (Local::now() + Duration::days(1)).format("%Y-%m-%dT%H:%M").to_string()
    }

    fn messages(ctrl: &TaskListController) -> Vec<(Severity, String)> {
        ctrl.lock()
            .notifications
            .visible()
            .iter()
            .map(|n| (n.severity, n.message.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_with_email_api_leaves_original_family() {
        let api = Arc::new(FakeTaskApi::default());
        let ctrl = controller(&api, &ClientConfig::default());

        let v1 = EmailStatusPanel::new(ctrl.with_email_api(EmailApi::V1));
        v1.check_status().await.unwrap();
        EmailStatusPanel::new(ctrl.clone()).check_status().await.unwrap();

        assert_eq!(ctrl.email_api(), EmailApi::V2);
        assert_eq!(
            api.calls(),
            vec!["email_status".to_string(), "get_email_status".to_string()]
        );
        assert!(Arc::ptr_eq(&ctrl.dashboard(), &ctrl.with_email_api(EmailApi::V1).dashboard()));
    }

    #[tokio::test]
    async fn test_initialize_sets_floor_and_loads() {
        let api = Arc::new(FakeTaskApi::default());
        let config = ClientConfig::default();
        let ctrl = controller(&api, &config);
        let panel = EmailStatusPanel::new(ctrl.clone());

        for handle in ctrl.initialize(&panel) {
            handle.await.unwrap();
        }

        let dashboard = ctrl.lock();
        assert!(!dashboard.form.min_due.is_empty());
        let tasks = dashboard.tasks.as_ref().unwrap();
        assert_eq!(tasks.body, TaskListBody::Empty(EMPTY_TASKS_MESSAGE));
        assert_eq!(tasks.count_label, "0 tasks");
        assert!(api.calls().contains(&"get_email_status".to_string()));
    }

    #[tokio::test]
    async fn test_add_task_then_reload_shows_plain_entry() {
        let api = Arc::new(FakeTaskApi::default());
        let ctrl = controller(&api, &ClientConfig::default());
        {
            let mut d = ctrl.lock();
            d.form.set_min_due(Local::now());
            d.form.title = "Pay rent".to_string();
            d.form.due_date = tomorrow();
        }

        ctrl.add_task().unwrap().await.unwrap();

        let d = ctrl.lock();
        assert_eq!(d.form.title, "");
        assert!(!d.form.min_due.is_empty());
        let tasks = d.tasks.as_ref().unwrap();
        assert_eq!(tasks.count_label, "1 task");
        let card = &tasks.cards()[0];
        assert_eq!(card.title, "Pay rent");
        assert!(!card.bell);
        assert!(!card.has_badge(&Badge::Completed));
        drop(d);
        assert_eq!(
            messages(&ctrl),
            vec![(Severity::Success, "Task added successfully!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_add_task_empty_title_surfaces_backend_message() {
        let api = Arc::new(FakeTaskApi::default());
        let ctrl = controller(&api, &ClientConfig::default());
        {
            let mut d = ctrl.lock();
            d.form.description = "keep me".to_string();
            d.form.due_date = tomorrow();
        }

        ctrl.add_task().unwrap().await.unwrap();

        assert_eq!(ctrl.lock().form.description, "keep me");
        assert_eq!(
            messages(&ctrl),
            vec![(
                Severity::Danger,
                format!("Error: {}", FakeTaskApi::MISSING_TITLE)
            )]
        );
        assert_eq!(api.calls(), vec!["add_task".to_string()]);
    }

    #[tokio::test]
    async fn test_add_task_past_due_sends_nothing() {
        let api = Arc::new(FakeTaskApi::default());
        let ctrl = controller(&api, &ClientConfig::default());
        {
            let mut d = ctrl.lock();
            d.form.set_min_due(Local::now());
            d.form.title = "Too late".to_string();
            d.form.due_date = "2001-01-01T00:00".to_string();
        }

        assert!(ctrl.add_task().is_none());
        assert!(api.calls().is_empty());
        assert_eq!(ctrl.lock().form.title, "Too late");
    }

    #[tokio::test]
    async fn test_add_task_transport_failure() {
        let api = Arc::new(FakeTaskApi::failing());
        let ctrl = controller(&api, &ClientConfig::default());
        {
            let mut d = ctrl.lock();
            d.form.title = "Pay rent".to_string();
            d.form.due_date = tomorrow();
        }

        ctrl.add_task().unwrap().await.unwrap();

        assert_eq!(ctrl.lock().form.title, "Pay rent");
        let notes = messages(&ctrl);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, Severity::Danger);
        assert!(notes[0].1.starts_with("Error adding task: "));
    }

    #[tokio::test]
    async fn test_toggle_overdue_task_completes_it() {
        let api = Arc::new(FakeTaskApi::default());
        let id = api.insert("Renew passport", true, false);
        let ctrl = controller(&api, &ClientConfig::default());

        ctrl.load_tasks().await.unwrap();
        assert!(ctrl.lock().tasks.as_ref().unwrap().card(id).unwrap().overdue_style);

        ctrl.toggle_complete(id).await.unwrap();

        let d = ctrl.lock();
        let card = d.tasks.as_ref().unwrap().card(id).unwrap().clone();
        assert!(card.completed_style);
        assert!(card.has_badge(&Badge::Completed));
        assert!(!card.has_badge(&Badge::Overdue));
        assert!(!card.overdue_style);
    }

    #[tokio::test]
    async fn test_delete_declined_sends_nothing() {
        let api = Arc::new(FakeTaskApi::default());
        let id = api.insert("Keep", false, false);
        let ctrl = controller(&api, &ClientConfig::default());

        let mut ui = ScriptedInteraction::declining();
        assert!(ctrl.delete_task(id, &mut ui).is_none());
        assert!(api.calls().is_empty());
        assert_eq!(ui.asked, vec!["Are you sure you want to delete this task?"]);
    }

    #[tokio::test]
    async fn test_delete_confirmed_reloads() {
        let api = Arc::new(FakeTaskApi::default());
        let id = api.insert("Drop", false, false);
        let ctrl = controller(&api, &ClientConfig::default());

        let mut ui = ScriptedInteraction::accepting();
        ctrl.delete_task(id, &mut ui).unwrap().await.unwrap();

        assert_eq!(api.calls(), vec![format!("delete_task/{}", id), "get_tasks".to_string()]);
        assert_eq!(
            ctrl.lock().tasks.as_ref().unwrap().body,
            TaskListBody::Empty(EMPTY_TASKS_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_list() {
        let api = Arc::new(FakeTaskApi::default());
        api.insert("Stay", false, false);
        let ctrl = controller(&api, &ClientConfig::default());
        ctrl.load_tasks().await.unwrap();

        api.set_failing(true);
        ctrl.load_tasks().await.unwrap();

        assert_eq!(ctrl.lock().tasks.as_ref().unwrap().count_label, "1 task");
        assert_eq!(messages(&ctrl)[0].0, Severity::Danger);
    }

    #[tokio::test]
    async fn test_reminder_cancelled_prompt_sends_nothing() {
        let api = Arc::new(FakeTaskApi::default());
        let id = api.insert("Call mum", false, true);
        let ctrl = controller(&api, &ClientConfig::default());

        let mut ui = ScriptedInteraction::accepting().with_answers(&[None]);
        assert!(ctrl.send_test_reminder(id, &mut ui).is_none());

        let mut ui = ScriptedInteraction::accepting().with_answers(&[Some("   ")]);
        assert!(ctrl.send_test_reminder(id, &mut ui).is_none());

        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reminder_posts_recipient_and_message() {
        let api = Arc::new(FakeTaskApi::default());
        let id = api.insert("Call mum", false, true);
        let ctrl = controller(&api, &ClientConfig::default());

        let mut ui =
            ScriptedInteraction::accepting().with_answers(&[Some("me@example.com"), None]);
        ctrl.send_test_reminder(id, &mut ui).unwrap().await.unwrap();

        assert_eq!(api.calls(), vec![format!("send_task_email/{}", id)]);
        assert_eq!(
            api.last_reminder(),
            Some(("me@example.com".to_string(), String::new()))
        );
        assert_eq!(
            messages(&ctrl),
            vec![(Severity::Success, "Email sent successfully!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_reminder_for_missing_task_is_warning() {
        let api = Arc::new(FakeTaskApi::default());
        let ctrl = controller(&api, &ClientConfig::default());

        let mut ui = ScriptedInteraction::accepting().with_answers(&[Some("me@example.com")]);
        ctrl.send_test_reminder(42, &mut ui).unwrap().await.unwrap();

        assert_eq!(
            messages(&ctrl),
            vec![(Severity::Warning, "Task not found".to_string())]
        );
    }

    #[tokio::test]
    async fn test_v1_reminder_only_confirms() {
        let api = Arc::new(FakeTaskApi::default());
        let id = api.insert("Call mum", false, true);
        let config = ClientConfig {
            email_api: EmailApi::V1,
            ..ClientConfig::default()
        };
        let ctrl = controller(&api, &config);

        let mut ui = ScriptedInteraction::accepting();
        ctrl.send_test_reminder(id, &mut ui).unwrap().await.unwrap();

        assert_eq!(ui.asked, vec!["Send demo email reminder for this task?"]);
        assert_eq!(api.calls(), vec![format!("send_reminder/{}", id)]);
    }
}
