//! In-memory stand-in for the task backend, for headless controller tests.

use crate::api_client::{TaskApi, TaskApiError};
use crate::api_types::{
    ApiResponse, DeliveryStatus, EmailConfigStatus, EmailHistory, EmailHistoryEntry,
    EmailStatusDetails, EmailStatusReport, NewTask, ReminderRequest, Task,
};
use crate::config::ClientConfig;
use crate::controller::SharedDashboard;
use crate::notifications::NotificationCenter;
use crate::view::Dashboard;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub fn dashboard_with(config: &ClientConfig) -> SharedDashboard {
    Arc::new(Mutex::new(Dashboard::new(NotificationCenter::new(
        config.notification_ttl(),
    ))))
}

#[derive(Default)]
struct Backend {
    next_id: i64,
    // (task, due date already passed)
    tasks: Vec<(Task, bool)>,
    history: Vec<EmailHistoryEntry>,
    calls: Vec<String>,
    last_reminder: Option<(String, String)>,
    failing: bool,
}

/// Behaves like the real backend: it owns the tasks and computes `is_overdue`.
#[derive(Default)]
pub struct FakeTaskApi {
    backend: Mutex<Backend>,
}

impl FakeTaskApi {
    pub const MISSING_TITLE: &'static str = "NOT NULL constraint failed: task.title";
    pub const CONNECTION_OK: &'static str =
        "Email configuration test successful! System is ready to send emails.";

    /// Every call fails at the transport level.
    pub fn failing() -> Self {
        let api = FakeTaskApi::default();
        api.set_failing(true);
        api
    }

    pub fn set_failing(&self, failing: bool) {
        self.backend.lock().unwrap().failing = failing;
    }

    pub fn insert(&self, title: &str, past_due: bool, email_reminder: bool) -> i64 {
        let mut backend = self.backend.lock().unwrap();
        backend.next_id += 1;
        let task = Task {
            id: backend.next_id,
            title: title.to_string(),
            description: None,
            due_date: "2026-10-20 09:00".to_string(),
            completed: false,
            email_reminder,
            is_overdue: false,
        };
        backend.tasks.push((task, past_due));
        backend.next_id
    }

    pub fn record_email(&self, status: &str) {
        let status: DeliveryStatus =
            serde_json::from_value(serde_json::Value::String(status.to_string())).unwrap();
        self.backend.lock().unwrap().history.push(EmailHistoryEntry {
            task_title: Some("Water plants".to_string()),
            status,
            recipient_email: "tasker@example.com".to_string(),
            timestamp: "2026-10-19 08:00:00".to_string(),
            user_message: None,
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.backend.lock().unwrap().calls.clone()
    }

    pub fn last_reminder(&self) -> Option<(String, String)> {
        self.backend.lock().unwrap().last_reminder.clone()
    }

    fn enter(&self, call: String) -> Result<std::sync::MutexGuard<'_, Backend>, TaskApiError> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(call);
        if backend.failing {
            return Err(TaskApiError::Http {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(backend)
    }

    fn ok(message: &str) -> ApiResponse {
        ApiResponse {
            success: true,
            message: message.to_string(),
        }
    }

    fn fail(message: &str) -> ApiResponse {
        ApiResponse {
            success: false,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl TaskApi for FakeTaskApi {
    async fn create_task(&self, task: &NewTask) -> Result<ApiResponse, TaskApiError> {
        let mut backend = self.enter("add_task".to_string())?;
        if task.title.is_empty() {
            return Ok(Self::fail(Self::MISSING_TITLE));
        }
        backend.next_id += 1;
        let id = backend.next_id;
        backend.tasks.push((
            Task {
                id,
                title: task.title.clone(),
                description: Some(task.description.clone()),
                due_date: task.due_date.replace('T', " "),
                completed: false,
                email_reminder: task.email_reminder.is_some(),
                is_overdue: false,
            },
            false,
        ));
        Ok(Self::ok("Task added successfully!"))
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, TaskApiError> {
        let backend = self.enter("get_tasks".to_string())?;
        Ok(backend
            .tasks
            .iter()
            .map(|(task, past_due)| Task {
                is_overdue: *past_due && !task.completed,
                ..task.clone()
            })
            .collect())
    }

    async fn toggle_complete(&self, task_id: i64) -> Result<(), TaskApiError> {
        let mut backend = self.enter(format!("complete_task/{}", task_id))?;
        if let Some((task, _)) = backend.tasks.iter_mut().find(|(t, _)| t.id == task_id) {
            task.completed = !task.completed;
        }
        Ok(())
    }

    async fn delete_task(&self, task_id: i64) -> Result<(), TaskApiError> {
        let mut backend = self.enter(format!("delete_task/{}", task_id))?;
        backend.tasks.retain(|(t, _)| t.id != task_id);
        Ok(())
    }

    async fn send_reminder(&self, task_id: i64) -> Result<ApiResponse, TaskApiError> {
        let backend = self.enter(format!("send_reminder/{}", task_id))?;
        if backend.tasks.iter().any(|(t, _)| t.id == task_id) {
            Ok(Self::ok("Demo reminder sent!"))
        } else {
            Ok(Self::fail("Task not found"))
        }
    }

    async fn send_task_email(
        &self,
        task_id: i64,
        request: &ReminderRequest,
    ) -> Result<ApiResponse, TaskApiError> {
        let mut backend = self.enter(format!("send_task_email/{}", task_id))?;
        if !backend.tasks.iter().any(|(t, _)| t.id == task_id) {
            return Ok(Self::fail("Task not found"));
        }
        backend.last_reminder = Some((request.recipient_email.clone(), request.message.clone()));
        Ok(Self::ok("Email sent successfully!"))
    }

    async fn email_config_status(&self) -> Result<EmailConfigStatus, TaskApiError> {
        let _backend = self.enter("email_status".to_string())?;
        Ok(EmailConfigStatus {
            mode: Some("Demo Mode".to_string()),
            email_configured: false,
        })
    }

    async fn email_status(&self) -> Result<EmailStatusReport, TaskApiError> {
        let backend = self.enter("get_email_status".to_string())?;
        let count = |status: DeliveryStatus| {
            backend.history.iter().filter(|h| h.status == status).count() as u64
        };
        Ok(EmailStatusReport {
            system_status: Some("active".to_string()),
            status_details: Some(EmailStatusDetails {
                total_emails: backend.history.len() as u64,
                successful_emails: count(DeliveryStatus::Sent),
                failed_emails: count(DeliveryStatus::Failed),
                last_activity: backend
                    .history
                    .last()
                    .map(|h| h.timestamp.clone())
                    .unwrap_or_else(|| "No activity".to_string()),
            }),
            error: None,
        })
    }

    async fn test_email(&self) -> Result<ApiResponse, TaskApiError> {
        let _backend = self.enter("test_email".to_string())?;
        Ok(Self::ok(Self::CONNECTION_OK))
    }

    async fn test_email_config(&self) -> Result<ApiResponse, TaskApiError> {
        let _backend = self.enter("test_email_config".to_string())?;
        Ok(Self::ok(Self::CONNECTION_OK))
    }

    async fn send_demo_reminders(&self) -> Result<ApiResponse, TaskApiError> {
        let backend = self.enter("demo_send_all_reminders".to_string())?;
        let sent = backend.tasks.iter().filter(|(t, _)| t.email_reminder).count();
        Ok(Self::ok(&format!("Sent {} demo reminder(s)", sent)))
    }

    async fn send_bulk_reminders(&self) -> Result<ApiResponse, TaskApiError> {
        let backend = self.enter("send_bulk_reminders".to_string())?;
        let sent = backend.tasks.iter().filter(|(t, _)| t.email_reminder).count();
        Ok(Self::ok(&format!(
            "Sent {} email reminder(s) successfully!",
            sent
        )))
    }

    async fn email_history(&self) -> Result<EmailHistory, TaskApiError> {
        let backend = self.enter("get_email_history".to_string())?;
        Ok(EmailHistory {
            history: backend.history.clone(),
            error: None,
        })
    }
}
