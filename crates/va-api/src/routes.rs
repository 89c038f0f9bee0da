//! API routes
//!
//! Resource prefixes follow the paths the web client already calls.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::{
    contacts, documents, events, notes, profile, realtime, tasks, users, visitors,
};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/ws", get(realtime::ws_handler))
        .nest("/user", user_router())
        .nest("/task", task_router())
        .nest("/events", event_router())
        .nest("/document", document_router())
        .nest("/contact", contact_router())
        .nest("/visitors", visitor_router())
        .nest("/notes", note_router())
        .nest("/profile", profile_router())
}

async fn root() -> &'static str {
    "SmartVA backend is alive"
}

fn user_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/verify-email", post(users::verify_email))
        .route("/login", post(users::login))
        .route("/request-reset-password", post(users::request_reset_password))
        .route("/confirm-reset-token", post(users::confirm_reset_token))
        .route("/reset-password", post(users::reset_password))
        .route("/getUser", get(users::get_user))
        .route("/updateUser", put(users::update_user))
}

fn task_router() -> Router<AppState> {
    Router::new()
        .route("/", post(tasks::create_task))
        .route("/getAllTasks", get(tasks::list_tasks))
        .route("/title/:title", get(tasks::search_tasks))
        .route(
            "/:taskId",
            get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/:taskId/mark-completed", patch(tasks::mark_completed))
        .route("/status/:status", get(tasks::by_status))
        .route("/priority/:priority", get(tasks::by_priority))
        .route("/due-date/:dueDate", get(tasks::by_due_date))
        .route("/pending", get(tasks::pending))
        .route("/completed", get(tasks::completed))
        .route("/overdue", get(tasks::overdue))
        .route("/due-in-next-72-hours", get(tasks::due_in_72_hours))
        .route("/emergency/emergencyTasks", get(tasks::emergency))
        .route("/delegates/allDelegates", get(tasks::all_delegates))
        .route("/delegates/details/:delegateEmail", get(tasks::delegate_details))
        .route("/delegates/pending", get(tasks::delegates_pending))
        .route("/delegates/completed", get(tasks::delegates_completed))
        .route("/delegates/overdue", get(tasks::delegates_overdue))
        .route("/delegates/allTask", get(tasks::delegate_all_tasks))
        .route("/delegate/message", post(tasks::message_delegate))
        // One segment name for both: a delegate name/email on GET, a task id on PATCH
        .route("/delegate/:key", get(tasks::by_delegate))
        .route("/delegate/:key/status", patch(tasks::delegate_update_status))
        .route("/message/subtask/:subtaskId", post(tasks::message_subtask_delegates))
        .route("/subtask/:subtaskId/status", patch(tasks::delegate_update_subtask_status))
        .route("/subtasks/delegate", get(tasks::subtasks_for_delegate))
}

fn event_router() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/allEvents", get(events::events_in_range))
        .route("/events4DDay", get(events::events_today))
        .route("/events4DDay/", get(events::events_today))
        .route("/notify", get(events::notifications))
        .route("/notify/", get(events::notifications))
        .route("/busy/busyTime", get(events::busy_times))
        .route("/busy/busyTime/", get(events::busy_times))
        .route("/eventName/:name", get(events::event_by_name))
        .route(
            "/:id",
            get(events::get_event).put(events::update_event).delete(events::cancel_event),
        )
}

fn document_router() -> Router<AppState> {
    Router::new()
        .route("/", post(documents::create_document))
        .route("/getAllDocuments", get(documents::list_documents))
        .route("/response/:id", post(documents::add_response))
        .route(
            "/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
}

fn contact_router() -> Router<AppState> {
    Router::new()
        .route("/", post(contacts::create_contact))
        .route("/getAllContacts", get(contacts::list_contacts))
        .route("/company/:companyName", get(contacts::by_company))
        .route("/name/:name", get(contacts::by_name))
        .route(
            "/:id",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
}

fn visitor_router() -> Router<AppState> {
    Router::new()
        .route("/", post(visitors::create_visitor))
        .route("/getVisitors", get(visitors::list_visitors))
        .route("/week", get(visitors::this_week))
        .route("/name/:name", get(visitors::by_name))
        .route("/day/:day", get(visitors::by_day))
        .route("/month/:month", get(visitors::by_month))
        .route(
            "/:id",
            get(visitors::get_visitor)
                .put(visitors::update_visitor)
                .delete(visitors::delete_visitor),
        )
}

fn note_router() -> Router<AppState> {
    Router::new()
        .route("/createnote", post(notes::create_note))
        .route("/getallnotes", get(notes::list_notes))
        .route("/editnote/:id", put(notes::edit_note))
        .route("/deletenote/:id", delete(notes::delete_note))
        .route("/findnote/:title", get(notes::find_by_title))
        .route("/findnotebyid/:id", get(notes::find_by_id))
}

fn profile_router() -> Router<AppState> {
    Router::new()
        .route("/supervisors/:email", get(profile::supervisors))
        .route("/task/status/:taskId", patch(profile::update_task_status))
        .route("/events/member/:email", get(profile::member_events))
        .route("/notification/:id", delete(profile::delete_notification))
        .route("/logout", post(users::logout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use va_models::User;
    use va_services::testing::TestContext;

    struct TestApp {
        t: TestContext,
        app: Router,
    }

    impl TestApp {
        fn new() -> Self {
            let t = TestContext::new();
            let app = router().with_state(AppState::new(t.ctx.clone()));
            Self { t, app }
        }

        async fn user(&self, user_name: &str, full_name: &str) -> (User, String) {
            let user = self.t.user(user_name, full_name).await;
            let token = self.t.ctx.jwt.create_token(user.id, 3600).unwrap();
            (user, token)
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let (status, _, value) = self.send_raw(method, uri, token, body).await;
            (status, value)
        }

        async fn send_raw(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, axum::http::HeaderMap, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, headers, value)
        }
    }

    fn due_in_days(days: i64) -> String {
        (chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339()
    }

    #[tokio::test]
    async fn test_root_is_alive() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("SmartVA backend is alive".into()));
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/task/getAllTasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Unauthorized - No token provided"));
        assert_eq!(body["errorCode"], json!("unauthorized"));
    }

    #[tokio::test]
    async fn test_invalid_token_is_403() {
        let app = TestApp::new();
        let (status, body) = app
            .send(Method::GET, "/user/getUser", Some("not-a-jwt"), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], json!("Unauthorized - Invalid or expired token"));
    }

    #[tokio::test]
    async fn test_register_login_and_cookie_session() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/user/register",
                None,
                Some(json!({
                    "userName": "carol",
                    "email": "Carol@Example.com",
                    "password": "s3cret-pass",
                    "fullName": "Carol Jones",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], json!("carol@example.com"));
        assert_eq!(body["user"]["verified"], json!(false));
        assert!(body["user"].get("password").is_none());

        let (status, headers, body) = app
            .send_raw(
                Method::POST,
                "/user/login",
                None,
                Some(json!({ "email": "carol@example.com", "password": "s3cret-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Login successful"));
        let cookie = headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));

        let session = cookie.split(';').next().unwrap().to_string();
        let request = Request::builder()
            .uri("/user/getUser")
            .header(header::COOKIE, session)
            .body(Body::empty())
            .unwrap();
        let response = app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["user"]["userName"], json!("carol"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_400() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/user/login",
                None,
                Some(json!({ "email": "nobody@example.com", "password": "x" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Invalid email or password"));
    }

    #[tokio::test]
    async fn test_task_create_and_list() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;
        app.user("bob", "Bob Builder").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/task",
                Some(&token),
                Some(json!({
                    "title": "Quarterly report",
                    "description": "Compile numbers",
                    "dueDate": due_in_days(5),
                    "delegate": ["bob@example.com"],
                    "priority": "High",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], json!("Task created successfully"));
        let task_id = body["task"]["_id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(Method::GET, "/task/getAllTasks", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalTasks"], json!(1));
        assert_eq!(body["page"], json!(1));

        let (status, body) = app
            .send(Method::GET, &format!("/task/{}", task_id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSubtask"], json!(false));

        let (status, body) = app
            .send(
                Method::PATCH,
                &format!("/task/{}/mark-completed", task_id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Marked as completed successfully"));
    }

    #[tokio::test]
    async fn test_task_list_with_huge_page_is_empty() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;
        let (status, body) = app
            .send(
                Method::GET,
                "/task/getAllTasks?page=9223372036854775807",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tasks"], json!([]));
        assert_eq!(body["totalTasks"], json!(0));
    }

    #[tokio::test]
    async fn test_task_missing_fields_is_400() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;
        let (status, body) = app
            .send(Method::POST, "/task", Some(&token), Some(json!({ "title": "Only" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_delegate_status_route_reaches_handler() {
        let app = TestApp::new();
        let (_, token) = app.user("bob", "Bob Builder").await;
        let uri = format!("/task/delegate/{}/status", uuid::Uuid::new_v4());
        let (status, body) = app
            .send(Method::PATCH, &uri, Some(&token), Some(json!({ "status": "Completed" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("Task not found"));
    }

    #[tokio::test]
    async fn test_invalid_and_unknown_ids() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;

        let (status, body) = app
            .send(Method::GET, "/contact/not-an-id", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Invalid contact ID"));

        let uri = format!("/document/{}", uuid::Uuid::new_v4());
        let (status, body) = app.send(Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorCode"], json!("not_found"));
    }

    #[tokio::test]
    async fn test_events_empty_is_202() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;
        let (status, body) = app.send(Method::GET, "/events", Some(&token), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["message"], json!("No events found for the user"));
    }

    #[tokio::test]
    async fn test_visitor_flow() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;

        let (status, _) = app
            .send(Method::POST, "/visitors", Some(&token), Some(json!({ "name": "Ann" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .send(
                Method::POST,
                "/visitors",
                Some(&token),
                Some(json!({ "name": "Ann Lee", "email": "ann@example.com", "phone": "555-0100" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], json!("Visitor created successfully"));

        let (status, body) = app
            .send(Method::GET, "/visitors/getVisitors", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], json!(1));

        let (status, body) = app.send(Method::GET, "/visitors/week", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["visitors"].as_array().unwrap().len(), 1);

        let (status, _) = app
            .send(Method::GET, "/visitors/month/13", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_notes_search_returns_array() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/notes/createnote",
                Some(&token),
                Some(json!({
                    "title": "Standup",
                    "contentHtml": "<p>notes</p>",
                    "contentText": "notes",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app
            .send(Method::GET, "/notes/findnote/stand", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = app
            .send(Method::GET, "/notes/findnote/zzz", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;
        let (status, headers, body) = app
            .send_raw(Method::POST, "/profile/logout", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Logged out successfully"));
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token=;"));
    }

    #[tokio::test]
    async fn test_delete_foreign_notification_is_404() {
        let app = TestApp::new();
        let (_, token) = app.user("owner", "Olive Owner").await;
        let uri = format!("/profile/notification/{}", uuid::Uuid::new_v4());
        let (status, body) = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("Notification not found or not authorized"));
    }
}
