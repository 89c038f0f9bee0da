//! Task handlers
//!
//! `/task/*`: owner CRUD, owner-scoped filters, delegate views and the
//! delegate side of status changes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use va_contracts::tasks::{
    CreateTaskInput, DelegateMessageInput, StatusInput, SubtaskMessageInput, UpdateTaskInput,
};
use va_core::{parse_id, PageParams};
use va_services::tasks::{DelegateStatusFilter, TaskFilter, TaskLookup, DEFAULT_TASK_PAGE_SIZE};

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    fn params(&self) -> PageParams {
        PageParams::from_query(self.page, self.limit, DEFAULT_TASK_PAGE_SIZE)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateEmailQuery {
    pub delegate_email: Option<String>,
}

/// POST /task
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateTaskInput>,
) -> ApiResult<impl IntoResponse> {
    let task = state.tasks().create(user.id(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Task created successfully", "task": task })),
    ))
}

/// GET /task/getAllTasks
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state.tasks().list(user.id(), query.params()).await?;
    Ok(Json(json!({
        "message": "Tasks retrieved successfully",
        "page": page.page,
        "limit": page.limit,
        "totalPages": page.total_pages(),
        "totalTasks": page.total,
        "tasks": page.items,
    })))
}

/// GET /task/title/:title
pub async fn search_tasks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(title): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state.tasks().search(user.id(), &title, query.params()).await?;
    Ok(Json(json!({
        "success": true,
        "total": page.total,
        "page": page.page,
        "tasks": page.items,
    })))
}

/// GET /task/:taskId
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&task_id, "task")?;
    let body = match state.tasks().get(user.id(), id).await? {
        TaskLookup::Task(task) => json!({
            "message": "Task retrieved successfully",
            "isSubtask": false,
            "task": task,
        }),
        TaskLookup::Subtask { parent_task_id, subtask } => json!({
            "message": "Subtask retrieved successfully",
            "isSubtask": true,
            "parentTaskId": parent_task_id,
            "subtask": subtask,
        }),
    };
    Ok(Json(body))
}

/// PUT /task/:taskId
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
    Json(body): Json<UpdateTaskInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&task_id, "task")?;
    let task = state.tasks().update(user.id(), id, body).await?;
    Ok(Json(json!({ "message": "Task updated successfully", "task": task })))
}

/// DELETE /task/:taskId
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&task_id, "task")?;
    let deletion = state.tasks().delete(user.id(), id).await?;
    Ok(Json(json!({ "message": deletion.message() })))
}

/// PATCH /task/:taskId/mark-completed
pub async fn mark_completed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&task_id, "task")?;
    let completion = state.tasks().mark_completed(user.id(), id).await?;
    Ok(Json(json!({ "message": completion.message(), "task": completion.task() })))
}

async fn filtered(state: &AppState, user: AuthenticatedUser, filter: TaskFilter) -> ApiResult<Json<serde_json::Value>> {
    let tasks = state.tasks().filter(user.id(), &filter).await?;
    Ok(Json(json!({
        "message": format!("{} tasks retrieved successfully", filter.label()),
        "tasks": tasks,
    })))
}

/// GET /task/status/:status
pub async fn by_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(status): Path<String>,
) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::status(&status)?).await
}

/// GET /task/priority/:priority
pub async fn by_priority(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(priority): Path<String>,
) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::priority(&priority)?).await
}

/// GET /task/delegate/:delegate
pub async fn by_delegate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(delegate): Path<String>,
) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::Delegate(delegate)).await
}

/// GET /task/due-date/:dueDate
pub async fn by_due_date(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(due_date): Path<String>,
) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::due_date(&due_date)?).await
}

pub async fn pending(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::Pending).await
}

pub async fn completed(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::Completed).await
}

pub async fn overdue(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::Overdue).await
}

pub async fn due_in_72_hours(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::DueWithin72Hours).await
}

pub async fn emergency(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    filtered(&state, user, TaskFilter::Emergency).await
}

/// GET /task/delegates/allDelegates
pub async fn all_delegates(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let delegates = state.tasks().all_delegates(user.id()).await?;
    Ok(Json(json!({ "message": "Delegates fetched successfully", "delegates": delegates })))
}

/// GET /task/delegates/details/:delegateEmail
pub async fn delegate_details(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(email): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let details = state.tasks().delegate_details(user.id(), &email).await?;
    Ok(Json(details))
}

async fn delegates_with(
    state: &AppState,
    user: AuthenticatedUser,
    filter: DelegateStatusFilter,
) -> ApiResult<Json<serde_json::Value>> {
    let delegates = state.tasks().delegates_by_status(user.id(), filter).await?;
    Ok(Json(json!({ "message": "Delegates retrieved successfully", "delegates": delegates })))
}

pub async fn delegates_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    delegates_with(&state, user, DelegateStatusFilter::Pending).await
}

pub async fn delegates_completed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    delegates_with(&state, user, DelegateStatusFilter::Completed).await
}

pub async fn delegates_overdue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    delegates_with(&state, user, DelegateStatusFilter::Overdue).await
}

/// GET /task/delegates/allTask?delegateEmail=
pub async fn delegate_all_tasks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<DelegateEmailQuery>,
) -> ApiResult<impl IntoResponse> {
    let email = query.delegate_email.unwrap_or_default();
    let tasks = state.tasks().delegate_tasks(user.id(), &email).await?;
    Ok(Json(json!({
        "message": "Delegate tasks retrieved successfully",
        "totalTasks": tasks.all.len(),
        "allTasks": tasks.all,
        "pendingTasksCount": tasks.pending.len(),
        "pendingTasks": tasks.pending,
        "completedTasksCount": tasks.completed.len(),
        "completedTasks": tasks.completed,
        "overdueTasksCount": tasks.overdue.len(),
        "overdueTasks": tasks.overdue,
    })))
}

/// POST /task/delegate/message
pub async fn message_delegate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<DelegateMessageInput>,
) -> ApiResult<impl IntoResponse> {
    let recipient = state.tasks().message_delegate(user.id(), body).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Message sent successfully",
        "recipient": recipient,
    })))
}

/// POST /task/message/subtask/:subtaskId
pub async fn message_subtask_delegates(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(subtask_id): Path<String>,
    Json(body): Json<SubtaskMessageInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&subtask_id, "subtask")?;
    let sent = state.tasks().message_subtask_delegates(user.id(), id, body).await?;
    Ok(Json(json!({
        "message": format!("Message sent to {} subtask delegate(s) successfully", sent)
    })))
}

/// PATCH /task/delegate/:taskId/status
pub async fn delegate_update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(task_id): Path<String>,
    Json(body): Json<StatusInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&task_id, "task")?;
    let task = state.tasks().update_status_as_delegate(user.id(), id, body).await?;
    Ok(Json(json!({ "message": "Task status updated successfully", "task": task })))
}

/// PATCH /task/subtask/:subtaskId/status
pub async fn delegate_update_subtask_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(subtask_id): Path<String>,
    Json(body): Json<StatusInput>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&subtask_id, "subtask")?;
    let subtask = state
        .tasks()
        .update_subtask_status_as_delegate(user.id(), id, body)
        .await?;
    Ok(Json(json!({ "message": "Subtask status updated successfully", "subtask": subtask })))
}

/// GET /task/subtasks/delegate
pub async fn subtasks_for_delegate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let data = state.tasks().subtasks_for_delegate(user.id()).await?;
    Ok(Json(json!({ "message": "Subtasks for delegate retrieved successfully", "data": data })))
}
