use anyhow::Result;
use axum::http::{StatusCode, header};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;

use support::{PASSWORD, admin_enabled, bearer, build_test_app, login};

#[tokio::test]
async fn first_factor_opens_session_and_sets_cookie() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;

    let response = app
        .server
        .post("/api/firstfactor")
        .json(&json!({ "username": "john", "password": PASSWORD }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["username"], "john");
    assert_eq!(body["data"]["display_name"], "John");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with(&format!("gatehouse_session={token}")));
    assert!(cookie.contains("HttpOnly"));

    app.server
        .get("/api/admin/config")
        .add_header("Cookie", format!("gatehouse_session={token}"))
        .await
        .assert_status_ok();

    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;

    for (username, password) in [("john", "wrong"), ("ghost", PASSWORD), ("john", "")] {
        let response = app
            .server
            .post("/api/firstfactor")
            .json(&json!({ "username": username, "password": password }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], "Authentication failed. Check your credentials.");
    }

    Ok(())
}

#[tokio::test]
async fn logout_invalidates_session() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    app.server
        .post("/api/logout")
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status_ok();

    app.server
        .get("/api/admin/users")
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn change_password_requires_session() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;

    app.server
        .post("/api/user/password")
        .json(&json!({ "old_password": PASSWORD, "new_password": "Changed#456" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn change_password_rejections_leave_hash_untouched() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "john", PASSWORD).await?;
    let before = app.provider.password_hash("john").await?;

    let cases = [
        (json!({ "old_password": "nope", "new_password": "Changed#456" }), "password_incorrect"),
        (json!({ "old_password": PASSWORD, "new_password": "short" }), "password_weak"),
        (json!({ "old_password": PASSWORD }), "required_fields_missing"),
    ];

    for (request, code) in cases {
        let response = app
            .server
            .post("/api/user/password")
            .add_header("Authorization", bearer(&token))
            .json(&request)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], code, "request: {request}");
    }

    assert_eq!(app.provider.password_hash("john").await?, before);
    Ok(())
}

#[tokio::test]
async fn change_password_succeeds() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "john", PASSWORD).await?;

    app.server
        .post("/api/user/password")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "old_password": PASSWORD, "new_password": "Changed#456" }))
        .await
        .assert_status_ok();

    login(&app.server, "john", "Changed#456").await?;
    app.server
        .post("/api/firstfactor")
        .json(&json!({ "username": "john", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn health_reports_backend_ready() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;

    let response = app.server.get("/api/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");

    Ok(())
}

#[tokio::test]
async fn malformed_first_factor_body_is_rejected() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;

    let response = app
        .server
        .post("/api/firstfactor")
        .text("{\"username\": \"john\",")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_request");

    Ok(())
}
