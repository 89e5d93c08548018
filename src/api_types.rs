use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: String, // YYYY-MM-DD HH:MM as returned by the backend
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub email_reminder: bool,
    #[serde(default)]
    pub is_overdue: bool,
}

/// Form fields posted to the create-task endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: String, // YYYY-MM-DDTHH:MM
    // Checkbox semantics: the field is only present when ticked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_reminder: Option<&'static str>,
}

impl NewTask {
    pub fn new(title: &str, description: &str, due_date: &str, email_reminder: bool) -> Self {
        NewTask {
            title: title.to_string(),
            description: description.to_string(),
            due_date: due_date.to_string(),
            email_reminder: if email_reminder { Some("on") } else { None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderRequest {
    pub recipient_email: String,
    pub message: String,
}

/// Payload of the older `email_status` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailConfigStatus {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub email_configured: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailStatusDetails {
    #[serde(default)]
    pub total_emails: u64,
    #[serde(default)]
    pub successful_emails: u64,
    #[serde(default)]
    pub failed_emails: u64,
    #[serde(default)]
    pub last_activity: String,
}

/// Payload of the `get_email_status` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailStatusReport {
    #[serde(default)]
    pub system_status: Option<String>,
    #[serde(default)]
    pub status_details: Option<EmailStatusDetails>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    #[serde(untagged)]
    Other(String),
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailHistoryEntry {
    #[serde(default)]
    pub task_title: Option<String>,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub recipient_email: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub user_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailHistory {
    #[serde(default)]
    pub history: Vec<EmailHistoryEntry>,
    #[serde(default)]
    pub error: Option<String>,
}
