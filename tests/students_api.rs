use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

use schoold::config::Config;
use schoold::db;
use schoold::http::{app, AppState};
use schoold::store::users;

fn temp_workspace(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn test_app(prefix: &str) -> Router {
    let cfg = Config {
        workspace: temp_workspace(prefix),
        secret: "test-secret".to_string(),
        ..Config::default()
    };
    let conn = db::open_db(&cfg.workspace).expect("open db");
    users::ensure_default_admin(&conn, &cfg).expect("seed admin");
    app(AppState::new(conn, &cfg.secret))
}

async fn request(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(t) = token {
        builder = builder.header("x-auth-token", t);
    }
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes).to_string()));
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/api/auth",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().expect("token").to_string()
}

async fn admin_token(app: &Router) -> String {
    login(app, "admin@schoold.local", "changeme").await
}

/// Creates a staff user through the registration flow and logs in as them.
async fn staff_token(app: &Router, admin: &str) -> String {
    let (status, _) = request(
        app,
        "POST",
        "/api/users",
        Some(admin),
        Some(json!({ "name": "Sam Staff", "email": "sam@schoold.local", "role": "staff" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, listing) = request(app, "GET", "/api/users?limit=0", Some(admin), None).await;
    let link = listing["users"]
        .as_array()
        .expect("users")
        .iter()
        .find(|u| u["email"] == "sam@schoold.local")
        .and_then(|u| u["registrationLink"].as_str())
        .expect("registration link")
        .to_string();
    let (status, _) = request(
        app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({ "token": link, "password": "s3cret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login(app, "sam@schoold.local", "s3cret-pass").await
}

fn amy() -> Value {
    json!({
        "name": "Amy",
        "surname": "Lee",
        "dob": "2010-01-01",
        "address": "1 Rd",
        "responsables": [{
            "name": "Bob",
            "surname": "Lee",
            "phoneNumber": "1234567890",
            "address": "1 Rd",
            "relationshipToStudent": "father"
        }]
    })
}

async fn student_by_surname(app: &Router, token: &str, surname: &str) -> Value {
    let (status, listing) = request(app, "GET", "/api/students?limit=0", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    listing["students"]
        .as_array()
        .expect("students array")
        .iter()
        .find(|s| s["surname"] == surname)
        .cloned()
        .expect("student listed")
}

#[tokio::test]
async fn staff_created_students_start_pending() {
    let app = test_app("schoold-students-pending");
    let admin = admin_token(&app).await;
    let staff = staff_token(&app, &admin).await;

    let (status, body) = request(&app, "POST", "/api/students", Some(&staff), Some(amy())).await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", body);
    assert_eq!(body.as_str(), Some("Student created"));

    let student = student_by_surname(&app, &admin, "Lee").await;
    assert_eq!(student["status"], "pending");
    assert_eq!(student["responsables"][0]["name"], "Bob");
}

#[tokio::test]
async fn admin_created_students_are_approved() {
    let app = test_app("schoold-students-approved");
    let admin = admin_token(&app).await;

    let (status, _) = request(&app, "POST", "/api/students", Some(&admin), Some(amy())).await;
    assert_eq!(status, StatusCode::OK);

    let student = student_by_surname(&app, &admin, "Lee").await;
    assert_eq!(student["status"], "approved");
}

#[tokio::test]
async fn duplicate_students_leave_a_single_record() {
    let app = test_app("schoold-students-dup");
    let admin = admin_token(&app).await;

    let (status, _) = request(&app, "POST", "/api/students", Some(&admin), Some(amy())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app, "POST", "/api/students", Some(&admin), Some(amy())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Student already exists");

    let (_, listing) = request(&app, "GET", "/api/students", Some(&admin), None).await;
    assert_eq!(listing["total"], 1);
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let app = test_app("schoold-students-missing");
    let admin = admin_token(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/students",
        Some(&admin),
        Some(json!({ "name": "Amy" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let msgs: Vec<_> = body["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .map(|e| e["msg"].as_str().unwrap_or("").to_string())
        .collect();
    assert!(msgs.contains(&"Surname is required".to_string()));
    assert!(msgs.contains(&"Date of birth is required".to_string()));
    assert!(msgs.contains(&"Address is required".to_string()));
    assert!(msgs.contains(&"At least one guardian is required".to_string()));

    let (_, listing) = request(&app, "GET", "/api/students", Some(&admin), None).await;
    assert_eq!(listing["total"], 0);
}

#[tokio::test]
async fn dangling_class_reference_rejects_the_create() {
    let app = test_app("schoold-students-dangling");
    let admin = admin_token(&app).await;

    let mut body = amy();
    body["class"] = json!("4a8f8e80-0000-0000-0000-000000000000");
    let (status, resp) = request(&app, "POST", "/api/students", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["errors"][0]["msg"], "Classroom not found");

    let (_, listing) = request(&app, "GET", "/api/students", Some(&admin), None).await;
    assert_eq!(listing["total"], 0);
}

#[tokio::test]
async fn approval_is_admin_only() {
    let app = test_app("schoold-students-approve");
    let admin = admin_token(&app).await;
    let staff = staff_token(&app, &admin).await;

    let (status, _) = request(&app, "POST", "/api/students", Some(&staff), Some(amy())).await;
    assert_eq!(status, StatusCode::OK);
    let id = student_by_surname(&app, &admin, "Lee").await["_id"]
        .as_str()
        .expect("id")
        .to_string();

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&staff),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"][0]["msg"], "Not authorized");

    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&admin),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "approved");
}

#[tokio::test]
async fn approved_students_cannot_return_to_pending() {
    let app = test_app("schoold-students-oneway");
    let admin = admin_token(&app).await;

    let (status, _) = request(&app, "POST", "/api/students", Some(&admin), Some(amy())).await;
    assert_eq!(status, StatusCode::OK);
    let student = student_by_surname(&app, &admin, "Lee").await;
    assert_eq!(student["status"], "approved");
    let id = student["_id"].as_str().expect("id").to_string();

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&admin),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"][0]["msg"],
        "An approved student cannot return to pending"
    );

    let student = student_by_surname(&app, &admin, "Lee").await;
    assert_eq!(student["status"], "approved");

    // Re-asserting the current status is a no-op, not an error.
    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&admin),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "approved");
}

#[tokio::test]
async fn reject_deletes_the_pending_record() {
    let app = test_app("schoold-students-reject");
    let admin = admin_token(&app).await;
    let staff = staff_token(&app, &admin).await;

    let (status, _) = request(&app, "POST", "/api/students", Some(&staff), Some(amy())).await;
    assert_eq!(status, StatusCode::OK);
    let id = student_by_surname(&app, &admin, "Lee").await["_id"]
        .as_str()
        .expect("id")
        .to_string();

    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/api/students/{}", id),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"][0]["msg"], "Not authorized");

    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/api/students/{}", id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Student deleted");

    let (_, listing) = request(&app, "GET", "/api/students", Some(&admin), None).await;
    assert_eq!(listing["total"], 0);

    // A second delete of the same id still succeeds.
    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/api/students/{}", id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Student deleted");
}

#[tokio::test]
async fn guardian_bounds_hold_on_update() {
    let app = test_app("schoold-students-guardians");
    let admin = admin_token(&app).await;

    let (status, _) = request(&app, "POST", "/api/students", Some(&admin), Some(amy())).await;
    assert_eq!(status, StatusCode::OK);
    let id = student_by_surname(&app, &admin, "Lee").await["_id"]
        .as_str()
        .expect("id")
        .to_string();

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&admin),
        Some(json!({ "responsables": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "At least one guardian is required");

    let guardian = json!({
        "name": "Ann",
        "surname": "Lee",
        "phoneNumber": "0987654321",
        "address": "1 Rd",
        "relationshipToStudent": "mother"
    });
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&admin),
        Some(json!({ "responsables": [guardian, guardian, guardian] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"][0]["msg"],
        "A student can have at most two guardians"
    );

    // The failed updates left the original guardian in place.
    let student = student_by_surname(&app, &admin, "Lee").await;
    assert_eq!(student["responsables"].as_array().map(Vec::len), Some(1));
    assert_eq!(student["responsables"][0]["name"], "Bob");

    // Two guardians is the allowed maximum.
    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&admin),
        Some(json!({ "responsables": [
            {
                "name": "Bob",
                "surname": "Lee",
                "phoneNumber": "1234567890",
                "address": "1 Rd",
                "relationshipToStudent": "father"
            },
            guardian,
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["responsables"].as_array().map(Vec::len), Some(2));
    assert_eq!(updated["responsables"][1]["name"], "Ann");
}

#[tokio::test]
async fn guardian_phone_length_is_checked() {
    let app = test_app("schoold-students-phone");
    let admin = admin_token(&app).await;

    let mut body = amy();
    body["responsables"][0]["phoneNumber"] = json!("12345");
    let (status, resp) = request(&app, "POST", "/api/students", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp["errors"][0]["msg"],
        "Guardian phone number must be 10 to 15 characters (guardian 1)"
    );
}

#[tokio::test]
async fn partial_update_preserves_other_fields() {
    let app = test_app("schoold-students-patch");
    let admin = admin_token(&app).await;

    let (status, _) = request(&app, "POST", "/api/students", Some(&admin), Some(amy())).await;
    assert_eq!(status, StatusCode::OK);
    let before = student_by_surname(&app, &admin, "Lee").await;
    let id = before["_id"].as_str().expect("id").to_string();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let (status, after) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", id),
        Some(&admin),
        Some(json!({ "address": "2 New Rd" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["address"], "2 New Rd");
    assert_eq!(after["name"], "Amy");
    assert_eq!(after["surname"], "Lee");
    assert_eq!(after["dob"], "2010-01-01");
    assert_eq!(after["dateCreated"], before["dateCreated"]);

    let before_ts = chrono::DateTime::parse_from_rfc3339(
        before["dateModified"].as_str().expect("dateModified"),
    )
    .expect("timestamp");
    let after_ts = chrono::DateTime::parse_from_rfc3339(
        after["dateModified"].as_str().expect("dateModified"),
    )
    .expect("timestamp");
    assert!(after_ts > before_ts);
}

#[tokio::test]
async fn get_and_put_misses_differ_in_status() {
    let app = test_app("schoold-students-misses");
    let admin = admin_token(&app).await;
    let ghost = "4a8f8e80-0000-0000-0000-000000000000";

    let (status, body) =
        request(&app, "GET", &format!("/api/students/{}", ghost), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errors"][0]["msg"], "Student not found");

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/students/{}", ghost),
        Some(&admin),
        Some(json!({ "address": "2 New Rd" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Student not found");
}
