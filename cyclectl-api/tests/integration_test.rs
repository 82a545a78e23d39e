/// Integration tests for the CycleCtl API
///
/// These tests drive the full router against a live database:
/// - Signed sign-in and token refresh
/// - Project creation and membership checks
/// - The task board: create, list, edit, move, reorder, delete, clear
/// - Bulk import and export
/// - Roster management and the last-owner rule
///
/// Run with: DATABASE_URL=... cargo test -p cyclectl-api --test integration_test

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{sign, TestContext, CALLBACK_SECRET};
use serde_json::json;
use tower::Service as _;
use uuid::Uuid;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert!(body["pool"]["total_connections"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .app
        .clone()
        .call(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
    assert_eq!(response.headers().get("X-Content-Type-Options").unwrap(), "nosniff");
}

#[tokio::test]
async fn test_session_requires_valid_signature() {
    let ctx = TestContext::new().await.unwrap();
    let body = json!({
        "email": format!("user-{}@example.com", Uuid::new_v4()),
        "provider": "github",
    });

    let (status, _) = ctx.post_session(&body, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.post_session(&body, Some("not-hex".to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong_key = sign("some-other-secret-that-is-long-enough", body.to_string().as_bytes());
    let (status, _) = ctx.post_session(&body, Some(wrong_key)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let valid = sign(CALLBACK_SECRET, body.to_string().as_bytes());
    let (status, value) = ctx.post_session(&body, Some(valid)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(value["access_token"].is_string());
    assert!(value["refresh_token"].is_string());
    let expires_in = value["expires_in"].as_i64().unwrap();
    assert!((86_390..=86_400).contains(&expires_in));
}

#[tokio::test]
async fn test_session_validates_profile() {
    let ctx = TestContext::new().await.unwrap();
    let body = json!({ "email": "not-an-email", "provider": "github" });
    let signature = sign(CALLBACK_SECRET, body.to_string().as_bytes());

    let (status, value) = ctx.post_session(&body, Some(signature)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(value["error"], "validation_error");
    assert_eq!(value["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_sign_in_is_case_insensitive_upsert() {
    let ctx = TestContext::new().await.unwrap();
    let local = format!("Ada-{}", Uuid::new_v4());

    let first = ctx.sign_in_as(&format!("{}@Example.com", local)).await;
    let second = ctx.sign_in_as(&format!("{}@example.com", local.to_lowercase())).await;

    assert_eq!(first.user_id, second.user_id);
}

#[tokio::test]
async fn test_refresh_token_flow() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.sign_in().await;

    let refresh = |token: &str| {
        Request::builder()
            .method("POST")
            .uri("/v1/auth/refresh")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "refresh_token": token }).to_string()))
            .unwrap()
    };

    let (status, value) = ctx.send(refresh(&session.refresh_token)).await;
    assert_eq!(status, StatusCode::OK);
    let new_token = value["access_token"].as_str().unwrap().to_string();

    // The new access token opens protected routes
    let (status, _) = ctx
        .send(
            Request::builder()
                .uri("/v1/projects")
                .header("authorization", format!("Bearer {}", new_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not a refresh token
    let (status, _) = ctx.send(refresh(&session.access_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(Request::builder().uri("/v1/projects").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = ctx
        .send(
            Request::builder()
                .uri("/v1/projects")
                .header("authorization", "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/tasks/{}", Uuid::new_v4()))
                .header("authorization", "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_project_makes_caller_sole_owner() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;

    let (status, body) = ctx
        .request(&owner, "POST", "/v1/projects", Some(json!({ "name": "  Launch  " })))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Launch");
    assert_eq!(body["owner_id"], owner.user_id.to_string());
    assert_eq!(body["team"].as_array().unwrap().len(), 1);
    assert_eq!(body["team"][0]["user_id"], owner.user_id.to_string());
    assert_eq!(body["team"][0]["role"], "owner");

    let project_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_create_project_rejects_blank_name() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;

    let (status, body) = ctx
        .request(&owner, "POST", "/v1/projects", Some(json!({ "name": "   " })))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "name");
}

#[tokio::test]
async fn test_list_projects_only_shows_memberships() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.sign_in().await;
    let bob = ctx.sign_in().await;

    let name = format!("Roadmap {}", Uuid::new_v4());
    let shared = ctx.create_project(&alice, &name).await;
    let private = ctx.create_project(&alice, "Private").await;
    ctx.add_member(&alice, shared, &bob, "viewer").await;

    let (status, body) = ctx.request(&bob, "GET", "/v1/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![shared.to_string().as_str()]);

    let (_, body) = ctx
        .request(
            &alice,
            "GET",
            &format!("/v1/projects?name={}", name.to_uppercase().replace(' ', "%20")),
            None,
        )
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["team"].as_array().unwrap().len(), 2);

    ctx.cleanup_project(shared).await;
    ctx.cleanup_project(private).await;
}

#[tokio::test]
async fn test_get_project_membership_checks() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let stranger = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Visible").await;

    let uri = format!("/v1/projects/{}", project_id);

    let (status, body) = ctx.request(&owner, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team"][0]["email"], owner.email);

    let (status, body) = ctx.request(&stranger, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_a_member");

    let (status, _) = ctx
        .request(&owner, "GET", &format!("/v1/projects/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_task_creation_by_role() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let editor = ctx.sign_in().await;
    let viewer = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Roles").await;
    ctx.add_member(&owner, project_id, &editor, "editor").await;
    ctx.add_member(&owner, project_id, &viewer, "viewer").await;

    let (status, first) = ctx
        .create_task(&owner, project_id, "Kickoff", "2031-03-02", "2031-03-04")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["month"], "March");
    assert_eq!(first["year"], 2031);
    assert_eq!(first["status"], "pending");
    assert_eq!(first["order_index"], 0);

    let (status, second) = ctx
        .create_task(&editor, project_id, "Design", "2031-03-05", "2031-03-09")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["order_index"], 1);
    assert_eq!(second["user_id"], editor.user_id.to_string());

    let (status, body) = ctx
        .create_task(&viewer, project_id, "Nope", "2031-03-05", "2031-03-09")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_task_creation_validation() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Validation").await;

    let (status, body) = ctx
        .create_task(&owner, project_id, "Backwards", "2031-03-09", "2031-03-02")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "end_date");

    let (status, body) = ctx
        .create_task(&owner, project_id, "   ", "2031-03-02", "2031-03-09")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "title");

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_list_tasks_groups_by_month_and_derives_status() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let viewer = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Schedule").await;
    ctx.add_member(&owner, project_id, &viewer, "viewer").await;

    // Long past: must come back overdue
    ctx.create_task(&owner, project_id, "Late", "2020-02-03", "2020-02-05").await;
    ctx.create_task(&owner, project_id, "Also late", "2020-01-10", "2020-01-12").await;
    let (_, done) = ctx
        .create_task(&owner, project_id, "Done", "2020-01-01", "2020-01-02")
        .await;
    ctx.request(
        &owner,
        "PUT",
        &format!("/v1/tasks/{}", done["id"].as_str().unwrap()),
        Some(json!({ "status": "completed" })),
    )
    .await;

    let (status, body) = ctx
        .request(&viewer, "GET", &format!("/v1/projects/{}/tasks?year=2020", project_id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 2020);
    assert_eq!(body["project"], "Schedule");

    let schedule = body["schedule"].as_array().unwrap();
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule[0]["month"], "January");
    assert_eq!(schedule[1]["month"], "February");

    let january = schedule[0]["tasks"].as_array().unwrap();
    assert_eq!(january[0]["title"], "Also late");
    assert_eq!(january[0]["status"], "overdue");
    assert_eq!(january[1]["title"], "Done");
    assert_eq!(january[1]["status"], "completed");
    assert_eq!(schedule[1]["tasks"][0]["status"], "overdue");

    // The derived status was persisted
    let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM tasks WHERE project_id = $1 AND title = 'Late'")
        .bind(project_id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    let (stored,): (String,) = sqlx::query_as("SELECT status::TEXT FROM tasks WHERE id = $1")
        .bind(id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(stored, "overdue");

    let (status, _) = ctx
        .request(
            &ctx.sign_in().await,
            "GET",
            &format!("/v1/projects/{}/tasks", project_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_update_task_permissions() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let editor = ctx.sign_in().await;
    let viewer = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Edits").await;
    ctx.add_member(&owner, project_id, &editor, "editor").await;
    ctx.add_member(&owner, project_id, &viewer, "viewer").await;

    let (_, task) = ctx
        .create_task(&owner, project_id, "Draft", "2031-05-01", "2031-05-10")
        .await;
    let uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());

    // Editor may edit in place and becomes the last editor
    let (status, body) = ctx
        .request(&editor, "PUT", &uri, Some(json!({ "title": "Final", "status": "in_progress" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Final");
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["description"], "");
    assert_eq!(body["user_id"], editor.user_id.to_string());

    // Editor may not move it to another month
    let (status, body) = ctx
        .request(&editor, "PUT", &uri, Some(json!({ "month": "June" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");

    // Naming the current month is not a move
    let (status, _) = ctx
        .request(&editor, "PUT", &uri, Some(json!({ "month": "May", "year": 2031 })))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Viewer may not edit at all
    let (status, _) = ctx
        .request(&viewer, "PUT", &uri, Some(json!({ "title": "Viewer edit" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Owner may move
    let (status, body) = ctx
        .request(&owner, "PUT", &uri, Some(json!({ "month": "June" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["month"], "June");

    // Dates still have to make sense after the merge
    let (status, _) = ctx
        .request(&owner, "PUT", &uri, Some(json!({ "end_date": "2031-04-01" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .request(&owner, "PUT", &format!("/v1/tasks/{}", Uuid::new_v4()), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_delete_task_owner_only() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let editor = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Deletes").await;
    ctx.add_member(&owner, project_id, &editor, "editor").await;

    let (_, task) = ctx
        .create_task(&editor, project_id, "Temp", "2031-07-01", "2031-07-02")
        .await;
    let uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = ctx.request(&editor, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");

    let (status, body) = ctx.request(&owner, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"]["id"], task["id"]);
    assert_eq!(body["deleted"]["title"], "Temp");

    let (status, _) = ctx.request(&owner, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_reorder_month_column() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Order").await;

    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        let (_, task) = ctx
            .create_task(&owner, project_id, title, "2031-09-01", "2031-09-03")
            .await;
        ids.push(task["id"].as_str().unwrap().to_string());
    }

    let (status, body) = ctx
        .request(
            &owner,
            "PUT",
            &format!("/v1/projects/{}/tasks/reorder", project_id),
            Some(json!({
                "month": "September",
                "year": 2031,
                "task_ids": [ids[2], ids[0], ids[1], Uuid::new_v4()],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 3);

    let (_, body) = ctx
        .request(&owner, "GET", &format!("/v1/projects/{}/tasks?year=2031", project_id), None)
        .await;
    let titles: Vec<&str> = body["schedule"][0]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["C", "A", "B"]);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_clear_board() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let editor = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Clear").await;
    ctx.add_member(&owner, project_id, &editor, "editor").await;

    ctx.create_task(&owner, project_id, "Mine", "2031-01-01", "2031-01-02").await;
    ctx.create_task(&editor, project_id, "Theirs", "2031-02-01", "2031-02-02").await;

    let uri = format!("/v1/projects/{}/tasks", project_id);

    let (status, _) = ctx.request(&editor, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.request(&owner, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    // The project itself survives an empty board
    let (status, _) = ctx
        .request(&owner, "GET", &format!("/v1/projects/{}", project_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_import_skips_invalid_records() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Import").await;
    let uri = format!("/v1/projects/{}/tasks/import", project_id);

    ctx.create_task(&owner, project_id, "Existing", "2031-03-01", "2031-03-02").await;

    let (status, body) = ctx
        .request(
            &owner,
            "POST",
            &uri,
            Some(json!([
                { "title": "Plan", "start": 3, "end": 9, "month": "March", "year": 2031 },
                { "title": "Bad day", "start": 30, "end": 31, "month": "February", "year": 2031 },
                { "task_title": "Ship", "task_description": "v1", "start": 1, "end": 2,
                  "month": "april", "year": 2031, "status": "completed" },
            ])),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["imported"], 2);
    assert_eq!(body["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(body["skipped"][0]["index"], 1);
    assert_eq!(body["tasks"][0]["title"], "Plan");
    assert_eq!(body["tasks"][0]["order_index"], 1);
    assert_eq!(body["tasks"][0]["start_date"], "2031-03-03");
    assert_eq!(body["tasks"][1]["month"], "April");
    assert_eq!(body["tasks"][1]["status"], "completed");
    assert_eq!(body["tasks"][1]["description"], "v1");

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_import_rejects_empty_and_all_invalid_batches() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let editor = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Import").await;
    ctx.add_member(&owner, project_id, &editor, "editor").await;
    let uri = format!("/v1/projects/{}/tasks/import", project_id);

    let (status, body) = ctx.request(&owner, "POST", &uri, Some(json!([]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "records");

    let (status, _) = ctx
        .request(
            &owner,
            "POST",
            &uri,
            Some(json!([{ "title": "x", "start": 1, "end": 2, "month": "Smarch", "year": 2031 }, 42])),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .request(
            &editor,
            "POST",
            &uri,
            Some(json!([{ "title": "x", "start": 1, "end": 2, "month": "May", "year": 2031 }])),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = ctx
        .request(&owner, "GET", &format!("/v1/projects/{}/tasks?year=2031", project_id), None)
        .await;
    assert!(body["schedule"].as_array().unwrap().is_empty());

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_export_round_trips_into_import() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let editor = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Q3 Plan").await;
    ctx.add_member(&owner, project_id, &editor, "editor").await;

    ctx.create_task(&owner, project_id, "Second", "2031-08-04", "2031-08-06").await;
    ctx.create_task(&owner, project_id, "First", "2031-07-01", "2031-07-15").await;
    ctx.create_task(&owner, project_id, "Other year", "2030-07-01", "2030-07-15").await;

    let export = |session: &common::Session| {
        Request::builder()
            .uri(format!("/v1/projects/{}/tasks/export?year=2031", project_id))
            .header("authorization", session.bearer())
            .body(Body::empty())
            .unwrap()
    };

    let response = ctx.app.clone().call(export(&owner)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"Q3_Plan_tasks_2031.json\""
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let records: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["title"], "First");
    assert_eq!(records[0]["month"], "July");
    assert_eq!(records[0]["start"], 1);
    assert_eq!(records[0]["end"], 15);
    assert_eq!(records[1]["title"], "Second");

    // Export is owner only
    let response = ctx.app.clone().call(export(&editor)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The export file imports cleanly into another project
    let target = ctx.create_project(&owner, "Copy").await;
    let (status, body) = ctx
        .request(
            &owner,
            "POST",
            &format!("/v1/projects/{}/tasks/import", target),
            Some(serde_json::Value::Array(records.clone())),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["imported"], 2);
    assert!(body["skipped"].as_array().unwrap().is_empty());

    ctx.cleanup_project(project_id).await;
    ctx.cleanup_project(target).await;
}

#[tokio::test]
async fn test_export_derives_current_status() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Archive").await;

    let (status, _) = ctx.create_task(&owner, project_id, "Long gone", "2020-01-01", "2020-01-05").await;
    assert_eq!(status, StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .uri(format!("/v1/projects/{}/tasks/export?year=2020", project_id))
                .header("authorization", owner.bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let records: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(records[0]["title"], "Long gone");
    assert_eq!(records[0]["status"], "overdue");

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_invite_role_rules() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let editor = ctx.sign_in().await;
    let viewer = ctx.sign_in().await;
    let invited_by_editor = ctx.sign_in().await;
    let invited_by_viewer = ctx.sign_in().await;
    let stranger = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Team").await;
    let uri = format!("/v1/projects/{}/team/members", project_id);

    // Owners must name a role
    let (status, body) = ctx
        .request(&owner, "POST", &uri, Some(json!({ "email": editor.email })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "role");

    ctx.add_member(&owner, project_id, &editor, "editor").await;
    ctx.add_member(&owner, project_id, &viewer, "viewer").await;

    // Editors always invite editors, even when asking for owner
    let (status, body) = ctx
        .request(
            &editor,
            "POST",
            &uri,
            Some(json!({ "email": invited_by_editor.email, "role": "owner" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "editor");

    // Viewers always invite viewers
    let (status, body) = ctx
        .request(
            &viewer,
            "POST",
            &uri,
            Some(json!({ "email": invited_by_viewer.email, "role": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "viewer");

    // Already on the roster
    let (status, body) = ctx
        .request(&owner, "POST", &uri, Some(json!({ "email": editor.email, "role": "viewer" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // Unknown user
    let (status, _) = ctx
        .request(
            &owner,
            "POST",
            &uri,
            Some(json!({ "email": format!("nobody-{}@example.com", Uuid::new_v4()), "role": "viewer" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Non-members cannot invite
    let (status, body) = ctx
        .request(&stranger, "POST", &uri, Some(json!({ "email": stranger.email, "role": "owner" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_a_member");

    let (_, project) = ctx
        .request(&owner, "GET", &format!("/v1/projects/{}", project_id), None)
        .await;
    let roles: Vec<&str> = project["team"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["owner", "editor", "viewer", "editor", "viewer"]);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_sole_owner_cannot_leave_or_step_down() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.sign_in().await;
    let project_id = ctx.create_project(&owner, "Solo").await;
    let member_uri = format!("/v1/projects/{}/team/members/{}", project_id, owner.user_id);

    let (status, body) = ctx.request(&owner, "DELETE", &member_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "last_owner_violation");

    let (status, body) = ctx
        .request(&owner, "PUT", &member_uri, Some(json!({ "role": "editor" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "last_owner_violation");

    // Re-asserting owner is fine
    let (status, _) = ctx
        .request(&owner, "PUT", &member_uri, Some(json!({ "role": "owner" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup_project(project_id).await;
}

#[tokio::test]
async fn test_concurrent_demotions_keep_an_owner() {
    let ctx = TestContext::new().await.unwrap();

    for _ in 0..5 {
        let alice = ctx.sign_in().await;
        let bob = ctx.sign_in().await;
        let project_id = ctx.create_project(&alice, "Co-owned").await;
        ctx.add_member(&alice, project_id, &bob, "owner").await;

        let demote_bob = format!("/v1/projects/{}/team/members/{}", project_id, bob.user_id);
        let demote_alice = format!("/v1/projects/{}/team/members/{}", project_id, alice.user_id);
        let editor = json!({ "role": "editor" });

        let ((first, _), (second, _)) = tokio::join!(
            ctx.request(&alice, "PUT", &demote_bob, Some(editor.clone())),
            ctx.request(&bob, "PUT", &demote_alice, Some(editor.clone())),
        );

        let mut statuses = [first, second];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

        let owners: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND role = 'owner'",
        )
        .bind(project_id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
        assert_eq!(owners, 1);

        ctx.cleanup_project(project_id).await;
    }
}

#[tokio::test]
async fn test_ownership_handover() {
    let ctx = TestContext::new().await.unwrap();
    let founder = ctx.sign_in().await;
    let successor = ctx.sign_in().await;
    let project_id = ctx.create_project(&founder, "Handover").await;
    ctx.add_member(&founder, project_id, &successor, "editor").await;

    let successor_uri = format!("/v1/projects/{}/team/members/{}", project_id, successor.user_id);
    let founder_uri = format!("/v1/projects/{}/team/members/{}", project_id, founder.user_id);

    // Editors cannot change roles
    let (status, _) = ctx
        .request(&successor, "PUT", &successor_uri, Some(json!({ "role": "owner" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .request(&founder, "PUT", &successor_uri, Some(json!({ "role": "owner" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "owner");

    // With two owners the founder may leave
    let (status, _) = ctx.request(&founder, "DELETE", &founder_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // ... and has lost access
    let (status, _) = ctx
        .request(&founder, "GET", &format!("/v1/projects/{}", project_id), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The successor is now the sole owner
    let (status, _) = ctx.request(&successor, "DELETE", &successor_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Acting on someone who is not on the roster
    let (status, _) = ctx
        .request(&successor, "PUT", &founder_uri, Some(json!({ "role": "viewer" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup_project(project_id).await;
}
