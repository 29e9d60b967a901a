use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{Value, json};

use gatehouse_core::AdminConfig;
use gatehouse_core::provider::{ProviderError, UserProvider};
use gatehouse_core::user_info::UserInfoStore;

#[path = "support/mod.rs"]
mod support;

use support::{PASSWORD, admin_enabled, bearer, build_test_app, login};

const USER_PATH: &str = "/api/admin/user";

fn assert_opaque_forbidden(response: &axum_test::TestResponse) {
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "Operation failed.");
}

#[tokio::test]
async fn non_admin_session_cannot_mutate_users() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "john", PASSWORD).await?;

    let create = app
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "bob",
            "display_name": "Bob",
            "password": "Another#123"
        }))
        .await;
    assert_opaque_forbidden(&create);

    let modify = app
        .server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "alice",
            "display_name": "Hacked",
            "email": "evil@x.com",
            "groups": ["admins"]
        }))
        .await;
    assert_opaque_forbidden(&modify);

    let delete = app
        .server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "username": "alice" }))
        .await;
    assert_opaque_forbidden(&delete);

    let list = app
        .server
        .get("/api/admin/users")
        .add_header("Authorization", bearer(&token))
        .await;
    assert_opaque_forbidden(&list);

    // Nothing reached the backend.
    assert!(matches!(
        app.provider.get_details("bob").await,
        Err(ProviderError::UserNotFound)
    ));
    let alice = app.provider.get_details("alice").await?;
    assert_eq!(alice.display_name, "A");
    assert_eq!(alice.emails, vec!["a@x.com".to_string()]);
    assert_eq!(alice.groups, vec!["g1".to_string(), "g2".to_string()]);

    Ok(())
}

#[tokio::test]
async fn anonymous_requests_are_forbidden() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;

    let create = app
        .server
        .put(USER_PATH)
        .json(&json!({ "username": "bob", "display_name": "Bob", "password": "Another#123" }))
        .await;
    assert_opaque_forbidden(&create);

    let unknown_token = app
        .server
        .get("/api/admin/config")
        .add_header("Authorization", bearer("not-a-session"))
        .await;
    assert_opaque_forbidden(&unknown_token);

    Ok(())
}

#[tokio::test]
async fn admin_config_is_readable_while_administration_disabled() -> Result<()> {
    let app = build_test_app(AdminConfig::default()).await?;
    let token = login(&app.server, "john", PASSWORD).await?;

    let response = app
        .server
        .get("/api/admin/config")
        .add_header("Authorization", bearer(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["data"],
        json!({
            "enabled": false,
            "admin_group": "admins",
            "allow_admins_to_add_admins": false
        })
    );

    let root = login(&app.server, "root", PASSWORD).await?;
    let create = app
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&root))
        .json(&json!({ "username": "bob", "display_name": "Bob", "password": "Another#123" }))
        .await;
    assert_opaque_forbidden(&create);

    Ok(())
}

#[tokio::test]
async fn admin_creates_user_who_can_log_in() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let response = app
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "bob",
            "display_name": "Bob Builder",
            "password": "Another#123",
            "email": "bob@x.com",
            "groups": ["dev", "ops"]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");

    let bob = app.provider.get_details("bob").await?;
    assert_eq!(bob.display_name, "Bob Builder");
    assert_eq!(bob.emails, vec!["bob@x.com".to_string()]);
    assert_eq!(bob.groups, vec!["dev".to_string(), "ops".to_string()]);

    login(&app.server, "bob", "Another#123").await?;

    Ok(())
}

#[tokio::test]
async fn create_rejections_carry_field_codes() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let cases = [
        (
            json!({ "username": "bob", "display_name": "Bob" }),
            "required_fields_missing",
        ),
        (
            json!({ "username": "bob smith", "display_name": "Bob", "password": "Another#123" }),
            "username_wrong_format",
        ),
        (
            json!({ "username": "bob", "display_name": "Bob @ Work", "password": "Another#123" }),
            "display_name_wrong_format",
        ),
        (
            json!({ "username": "bob", "display_name": "Bob", "password": "short" }),
            "password_weak",
        ),
        (
            json!({
                "username": "bob",
                "display_name": "Bob",
                "password": "Another#123",
                "groups": ["bad group!"]
            }),
            "groups_wrong_format",
        ),
    ];

    for (request, code) in cases {
        let response = app
            .server
            .put(USER_PATH)
            .add_header("Authorization", bearer(&token))
            .json(&request)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], code, "request: {request}");
    }

    assert!(app.provider.get_details("bob").await.is_err());

    let malformed = app
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .text("{not json")
        .await;
    malformed.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = malformed.json();
    assert_eq!(body["error"], "invalid_request");

    Ok(())
}

#[tokio::test]
async fn invalid_email_on_create_is_dropped() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let response = app
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "bob",
            "display_name": "Bob",
            "password": "Another#123",
            "email": "not-an-email"
        }))
        .await;
    response.assert_status_ok();

    assert!(app.provider.get_details("bob").await?.emails.is_empty());
    Ok(())
}

#[tokio::test]
async fn admins_cannot_create_admins_unless_allowed() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let response = app
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "bob",
            "display_name": "Bob",
            "password": "Another#123",
            "groups": ["admins"]
        }))
        .await;
    assert_opaque_forbidden(&response);
    assert!(app.provider.get_details("bob").await.is_err());

    let allowed = build_test_app(AdminConfig {
        allow_admins_to_add_admins: true,
        ..admin_enabled()
    })
    .await?;
    let token = login(&allowed.server, "root", PASSWORD).await?;
    allowed
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "bob",
            "display_name": "Bob",
            "password": "Another#123",
            "groups": ["admins"]
        }))
        .await
        .assert_status_ok();
    assert!(allowed.provider.get_details("bob").await?.is_member_of("admins"));

    Ok(())
}

#[tokio::test]
async fn modify_applies_only_changed_fields() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let response = app
        .server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "alice",
            "display_name": "B",
            "email": "a@x.com",
            "groups": ["g1", "g2"]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"], json!(["display_name"]));

    let reorder = app
        .server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "alice",
            "display_name": "B",
            "email": "alice@y.org",
            "groups": ["g2", "g1"]
        }))
        .await;
    reorder.assert_status_ok();
    let body: Value = reorder.json();
    assert_eq!(body["data"], json!(["email", "groups"]));

    let alice = app.provider.get_details("alice").await?;
    assert_eq!(alice.display_name, "B");
    assert_eq!(alice.emails, vec!["alice@y.org".to_string()]);
    assert_eq!(alice.groups, vec!["g2".to_string(), "g1".to_string()]);

    let noop = app
        .server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "alice",
            "display_name": "B",
            "email": "alice@y.org",
            "groups": ["g2", "g1"]
        }))
        .await;
    noop.assert_status_ok();
    let body: Value = noop.json();
    assert_eq!(body["data"], json!([]));

    Ok(())
}

#[tokio::test]
async fn modify_error_statuses() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let blank = app
        .server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "username": "", "display_name": "X", "email": "x@x.com", "groups": [] }))
        .await;
    blank.assert_status(StatusCode::BAD_REQUEST);

    let unknown = app
        .server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "ghost",
            "display_name": "X",
            "email": "x@x.com",
            "groups": []
        }))
        .await;
    unknown.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let bad_group = app
        .server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({
            "username": "alice",
            "display_name": "A",
            "email": "a@x.com",
            "groups": ["g1", "bad group!"]
        }))
        .await;
    bad_group.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = bad_group.json();
    assert_eq!(body["error"], "groups_wrong_format");

    Ok(())
}

#[tokio::test]
async fn delete_removes_user() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let response = app
        .server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "username": "alice" }))
        .await;
    response.assert_status_ok();
    assert!(matches!(
        app.provider.get_details("alice").await,
        Err(ProviderError::UserNotFound)
    ));

    // Unknown users are not an error unless strict backend errors are on.
    app.server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "username": "alice" }))
        .await
        .assert_status_ok();

    let malformed = app
        .server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "username": "not valid!" }))
        .await;
    malformed.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = malformed.json();
    assert_eq!(body["error"], "username_wrong_format");

    Ok(())
}

#[tokio::test]
async fn strict_backend_errors_surface_on_delete() -> Result<()> {
    let app = build_test_app(AdminConfig {
        strict_backend_errors: true,
        ..admin_enabled()
    })
    .await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let response = app
        .server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "username": "ghost" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Operation failed.");

    Ok(())
}

#[tokio::test]
async fn listing_merges_login_info_with_backend_users() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    login(&app.server, "alice", PASSWORD).await?;
    let token = login(&app.server, "root", PASSWORD).await?;

    let response = app
        .server
        .get("/api/admin/users")
        .add_header("Authorization", bearer(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let users = body["data"].as_array().cloned().unwrap_or_default();

    assert_eq!(users.len(), 3);
    let alice = users
        .iter()
        .find(|user| user["username"] == "alice")
        .expect("alice listed");
    assert_eq!(alice["display_name"], "A");
    assert_eq!(alice["method"], "one_factor");
    assert!(alice["last_logged_in"].is_string());

    let john = users
        .iter()
        .find(|user| user["username"] == "john")
        .expect("john synthesized from backend");
    assert_eq!(john["emails"], json!(["john@x.com"]));
    assert_eq!(john["groups"], json!(["dev"]));

    app.server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "username": "alice" }))
        .await
        .assert_status_ok();
    let remaining = app.user_info.list().await?;
    assert!(remaining.iter().all(|info| info.username != "alice"));

    Ok(())
}

async fn create_admin(app: &support::TestApp, token: &str, username: &str) {
    app.server
        .put(USER_PATH)
        .add_header("Authorization", bearer(token))
        .json(&json!({
            "username": username,
            "display_name": username,
            "password": "Another#123",
            "groups": ["admins"]
        }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn deleted_admin_session_is_revoked() -> Result<()> {
    let app = build_test_app(AdminConfig {
        allow_admins_to_add_admins: true,
        ..admin_enabled()
    })
    .await?;
    let root = login(&app.server, "root", PASSWORD).await?;
    create_admin(&app, &root, "eve").await;
    let eve = login(&app.server, "eve", "Another#123").await?;

    app.server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&root))
        .json(&json!({ "username": "eve" }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .put(USER_PATH)
        .add_header("Authorization", bearer(&eve))
        .json(&json!({
            "username": "mallory",
            "display_name": "Mallory",
            "password": "Another#123"
        }))
        .await;
    assert_opaque_forbidden(&response);
    assert!(matches!(
        app.provider.get_details("mallory").await,
        Err(ProviderError::UserNotFound)
    ));
    app.server
        .post("/api/firstfactor")
        .json(&json!({ "username": "mallory", "password": "Another#123" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn demoted_admin_loses_access() -> Result<()> {
    let app = build_test_app(AdminConfig {
        allow_admins_to_add_admins: true,
        ..admin_enabled()
    })
    .await?;
    let root = login(&app.server, "root", PASSWORD).await?;
    create_admin(&app, &root, "eve").await;
    let eve = login(&app.server, "eve", "Another#123").await?;

    app.server
        .post(USER_PATH)
        .add_header("Authorization", bearer(&root))
        .json(&json!({
            "username": "eve",
            "display_name": "eve",
            "email": "",
            "groups": ["dev"]
        }))
        .await
        .assert_status_ok();

    // Group changes end the target's sessions.
    let config = app
        .server
        .get("/api/admin/config")
        .add_header("Authorization", bearer(&eve))
        .await;
    assert_opaque_forbidden(&config);

    // A fresh login carries the new groups and still fails the gate.
    let eve = login(&app.server, "eve", "Another#123").await?;
    let list = app
        .server
        .get("/api/admin/users")
        .add_header("Authorization", bearer(&eve))
        .await;
    assert_opaque_forbidden(&list);

    Ok(())
}

#[tokio::test]
async fn backend_membership_outranks_session_groups() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let root = login(&app.server, "root", PASSWORD).await?;

    // Demoted directly in the backend; the session still lists "admins".
    app.provider.change_groups("root", &["dev".to_string()]).await?;

    let response = app
        .server
        .get("/api/admin/users")
        .add_header("Authorization", bearer(&root))
        .await;
    assert_opaque_forbidden(&response);

    Ok(())
}

#[tokio::test]
async fn disabled_admin_session_is_refused() -> Result<()> {
    let app = build_test_app(admin_enabled()).await?;
    let root = login(&app.server, "root", PASSWORD).await?;

    app.provider.set_disabled("root", true).await?;

    let response = app
        .server
        .delete(USER_PATH)
        .add_header("Authorization", bearer(&root))
        .json(&json!({ "username": "alice" }))
        .await;
    assert_opaque_forbidden(&response);
    assert!(app.provider.get_details("alice").await.is_ok());

    Ok(())
}
