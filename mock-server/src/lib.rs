use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: NaiveDate,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
    pub total: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
}

#[derive(Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct UserAttributes {
    pub id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub username: String,
    pub attributes: UserAttributes,
}

#[derive(Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
}

/// JSON error reply: `{"message": ..., "code": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized")
    }

    fn task_not_found(id: i64) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("Task with ID \"{id}\" not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "message": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}

struct User {
    id: i64,
    password: String,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<String, User>,
    sessions: HashMap<String, i64>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

pub type Db = Arc<RwLock<Store>>;

/// Routes at the root, as the client sees them below its base URL.
pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task).patch(update_task).delete(delete_task))
        .with_state(db)
}

/// `app()` mounted under `/api`, matching the client's default base URL.
pub fn router() -> Router {
    Router::new().nest("/api", app())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, router()).await
}

async fn health() -> &'static str {
    "ok"
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<(StatusCode, Json<RegisteredUser>), ApiError> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Email and password are required",
        ));
    }
    let mut store = db.write().await;
    if store.users.contains_key(&input.email) {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "EMAIL_TAKEN",
            "Email already registered",
        ));
    }
    store.next_user_id += 1;
    let id = store.next_user_id;
    store.users.insert(
        input.email.clone(),
        User {
            id,
            password: input.password,
        },
    );
    log::info!("registered user {id}");
    Ok((StatusCode::CREATED, Json(RegisteredUser { id, email: input.email })))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut store = db.write().await;
    let user_id = match store.users.get(&input.email) {
        Some(user) if user.password == input.password => user.id,
        _ => {
            return Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password",
            ))
        }
    };
    let token = Uuid::new_v4().to_string();
    store.sessions.insert(token.clone(), user_id);
    let username = input
        .email
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(Json(AuthResponse {
        access_token: token,
        username,
        attributes: UserAttributes {
            id: user_id.to_string(),
        },
    }))
}

/// Resolves the bearer token in `headers` to a user id.
fn current_user(store: &Store, headers: &HeaderMap) -> Result<i64, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| store.sessions.get(token).copied())
        .ok_or_else(ApiError::unauthorized)
}

fn matches_query(task: &Task, query: &TaskQuery) -> bool {
    if query.status.is_some_and(|status| status != task.status) {
        return false;
    }
    if query.priority.is_some_and(|priority| priority != task.priority) {
        return false;
    }
    match query.search.as_deref().filter(|s| !s.is_empty()) {
        Some(search) => {
            let needle = search.to_lowercase();
            task.title.to_lowercase().contains(&needle)
                || task
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        }
        None => true,
    }
}

async fn list_tasks(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<TaskQuery>,
) -> Result<Json<TasksResponse>, ApiError> {
    let store = db.read().await;
    let user_id = current_user(&store, &headers)?;
    let tasks: Vec<Task> = store
        .tasks
        .values()
        .filter(|task| task.user_id == user_id && matches_query(task, &query))
        .cloned()
        .collect();
    Ok(Json(TasksResponse {
        total: tasks.len(),
        tasks,
    }))
}

async fn create_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let mut store = db.write().await;
    let user_id = current_user(&store, &headers)?;
    if input.title.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Title is required",
        ));
    }
    store.next_task_id += 1;
    let now = Utc::now();
    let task = Task {
        id: store.next_task_id,
        title: input.title,
        description: input.description,
        status: input.status,
        priority: input.priority,
        due_date: input.due_date,
        user_id,
        created_at: now,
        updated_at: now,
    };
    store.tasks.insert(task.id, task.clone());
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let store = db.read().await;
    let user_id = current_user(&store, &headers)?;
    store
        .tasks
        .get(&id)
        .filter(|task| task.user_id == user_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::task_not_found(id))
}

async fn update_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Task>, ApiError> {
    let mut store = db.write().await;
    let user_id = current_user(&store, &headers)?;
    let task = store
        .tasks
        .get_mut(&id)
        .filter(|task| task.user_id == user_id)
        .ok_or_else(|| ApiError::task_not_found(id))?;
    if let Some(title) = input.title {
        task.title = title;
    }
    if let Some(description) = input.description {
        task.description = Some(description);
    }
    if let Some(status) = input.status {
        task.status = status;
    }
    if let Some(due_date) = input.due_date {
        task.due_date = due_date;
    }
    if let Some(priority) = input.priority {
        task.priority = priority;
    }
    task.updated_at = Utc::now();
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    let user_id = current_user(&store, &headers)?;
    let owned = store.tasks.get(&id).is_some_and(|task| task.user_id == user_id);
    if !owned {
        return Err(ApiError::task_not_found(id));
    }
    store.tasks.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}
