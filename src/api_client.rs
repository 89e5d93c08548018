use crate::api_types::{
    ApiResponse, EmailConfigStatus, EmailHistory, EmailStatusReport, NewTask, ReminderRequest, Task,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TaskApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The remote task backend. Every durable piece of state lives behind this.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn create_task(&self, task: &NewTask) -> Result<ApiResponse, TaskApiError>;
    async fn list_tasks(&self) -> Result<Vec<Task>, TaskApiError>;
    async fn toggle_complete(&self, task_id: i64) -> Result<(), TaskApiError>;
    async fn delete_task(&self, task_id: i64) -> Result<(), TaskApiError>;

    async fn send_reminder(&self, task_id: i64) -> Result<ApiResponse, TaskApiError>;
    async fn send_task_email(
        &self,
        task_id: i64,
        request: &ReminderRequest,
    ) -> Result<ApiResponse, TaskApiError>;

    async fn email_config_status(&self) -> Result<EmailConfigStatus, TaskApiError>;
    async fn email_status(&self) -> Result<EmailStatusReport, TaskApiError>;
    async fn test_email(&self) -> Result<ApiResponse, TaskApiError>;
    async fn test_email_config(&self) -> Result<ApiResponse, TaskApiError>;
    async fn send_demo_reminders(&self) -> Result<ApiResponse, TaskApiError>;
    async fn send_bulk_reminders(&self) -> Result<ApiResponse, TaskApiError>;
    async fn email_history(&self) -> Result<EmailHistory, TaskApiError>;
}

pub struct HttpTaskApi {
    client: Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TaskApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HttpTaskApi {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TaskApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "request failed");
            return Err(TaskApiError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Like `fetch`, but a failing status whose body still carries a
    /// `{success, message}` payload is returned as that payload.
    async fn fetch_outcome(&self, request: RequestBuilder) -> Result<ApiResponse, TaskApiError> {
        match self.fetch::<ApiResponse>(request).await {
            Err(TaskApiError::Http { status, message }) => {
                match serde_json::from_str::<ApiResponse>(&message) {
                    Ok(mut outcome) => {
                        outcome.success = false;
                        Ok(outcome)
                    }
                    Err(_) => Err(TaskApiError::Http { status, message }),
                }
            }
            other => other,
        }
    }

    /// Navigation-style endpoints answer with a redirect; only the final status matters.
    async fn navigate(&self, endpoint: &str) -> Result<(), TaskApiError> {
        let response = self.request(Method::GET, endpoint).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), endpoint, "navigation failed");
            Err(TaskApiError::Http {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn create_task(&self, task: &NewTask) -> Result<ApiResponse, TaskApiError> {
        self.fetch_outcome(self.request(Method::POST, "/add_task").form(task))
            .await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, TaskApiError> {
        self.fetch(self.request(Method::GET, "/get_tasks")).await
    }

    async fn toggle_complete(&self, task_id: i64) -> Result<(), TaskApiError> {
        self.navigate(&format!("/complete_task/{}", task_id)).await
    }

    async fn delete_task(&self, task_id: i64) -> Result<(), TaskApiError> {
        self.navigate(&format!("/delete_task/{}", task_id)).await
    }

    async fn send_reminder(&self, task_id: i64) -> Result<ApiResponse, TaskApiError> {
        let endpoint = format!("/send_reminder/{}", task_id);
        self.fetch_outcome(self.request(Method::GET, &endpoint)).await
    }

    async fn send_task_email(
        &self,
        task_id: i64,
        request: &ReminderRequest,
    ) -> Result<ApiResponse, TaskApiError> {
        let endpoint = format!("/send_task_email/{}", task_id);
        self.fetch_outcome(self.request(Method::POST, &endpoint).json(request))
            .await
    }

    async fn email_config_status(&self) -> Result<EmailConfigStatus, TaskApiError> {
        self.fetch(self.request(Method::GET, "/email_status")).await
    }

    async fn email_status(&self) -> Result<EmailStatusReport, TaskApiError> {
        self.fetch(self.request(Method::GET, "/get_email_status")).await
    }

    async fn test_email(&self) -> Result<ApiResponse, TaskApiError> {
        self.fetch_outcome(self.request(Method::GET, "/test_email")).await
    }

    async fn test_email_config(&self) -> Result<ApiResponse, TaskApiError> {
        self.fetch_outcome(self.request(Method::GET, "/test_email_config"))
            .await
    }

    async fn send_demo_reminders(&self) -> Result<ApiResponse, TaskApiError> {
        self.fetch_outcome(self.request(Method::GET, "/demo_send_all_reminders"))
            .await
    }

    async fn send_bulk_reminders(&self) -> Result<ApiResponse, TaskApiError> {
        self.fetch_outcome(self.request(Method::GET, "/send_bulk_reminders"))
            .await
    }

    async fn email_history(&self) -> Result<EmailHistory, TaskApiError> {
        self.fetch(self.request(Method::GET, "/get_email_history")).await
    }
}
