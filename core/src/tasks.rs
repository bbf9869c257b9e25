//! Task CRUD and filtered listing on top of `ApiClient`.
//!
//! Stateless: every call is a single request and every error is the
//! client's, passed through untouched.

use std::sync::Arc;

use crate::client::{to_json, ApiClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, RequestOptions};
use crate::types::{
    CreateTaskRequest, EmptyBody, Task, TaskFilter, TaskStatus, TasksResponse, UpdateTaskRequest,
};

#[derive(Debug, Clone)]
pub struct TaskService {
    api: Arc<ApiClient>,
}

impl TaskService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn get_tasks(&self, filter: Option<&TaskFilter>) -> Result<TasksResponse, ApiError> {
        let query = filter.map(query_string).unwrap_or_default();
        let endpoint = if query.is_empty() {
            "/tasks".to_string()
        } else {
            format!("/tasks?{query}")
        };
        self.api.request(&endpoint, RequestOptions::get())
    }

    pub fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.api.request(&format!("/tasks/{id}"), RequestOptions::get())
    }

    pub fn create_task(&self, input: &CreateTaskRequest) -> Result<Task, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post).with_body(to_json(input)?);
        self.api.request("/tasks", options)
    }

    /// Sends only the fields set on `input`.
    pub fn update_task(&self, id: i64, input: &UpdateTaskRequest) -> Result<Task, ApiError> {
        let options = RequestOptions::new(HttpMethod::Patch).with_body(to_json(input)?);
        self.api.request(&format!("/tasks/{id}"), options)
    }

    pub fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<Task, ApiError> {
        let input = UpdateTaskRequest {
            status: Some(status),
            ..Default::default()
        };
        self.update_task(id, &input)
    }

    pub fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        self.api
            .request::<EmptyBody>(&format!("/tasks/{id}"), RequestOptions::delete())?;
        Ok(())
    }
}

/// Form-encodes the filter's present fields in the order status, priority,
/// search. An empty search string is treated as absent.
pub fn query_string(filter: &TaskFilter) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(status) = filter.status {
        query.append_pair("status", status.as_str());
    }
    if let Some(priority) = filter.priority {
        query.append_pair("priority", priority.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("search", search);
    }
    query.finish()
}
