mod common;

use common::{auth_payload, user_json, Harness};
use jamhub::auth::{Credentials, SessionState, SessionStatus, SignUpData, User, UserPatch};
use jamhub::error::Error;
use jamhub::navigation::Navigation;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_login(h: &Harness) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "a@b.com", "password": "validpass123" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_payload("u_1", "a@b.com", "acc", "ref")),
        )
        .mount(&h.server)
        .await;
}

fn credentials() -> Credentials {
    Credentials::new("a@b.com", "validpass123")
}

#[tokio::test]
async fn test_sign_in_consumes_pending_redirect() {
    let h = Harness::start().await;
    mount_login(&h).await;

    let auth = h.hub.auth();
    auth.pending_redirect()
        .remember("/teams/invitations/abc123")
        .unwrap();

    let outcome = auth.sign_in(&credentials()).await.unwrap();

    assert_eq!(outcome.redirect_to, "/teams/invitations/abc123");
    assert_eq!(outcome.user.id, "u_1");
    assert_eq!(auth.pending_redirect().peek(), None);
    assert_eq!(
        h.last_navigation(),
        Some(Navigation::Push("/teams/invitations/abc123".into()))
    );
    assert_eq!(auth.status(), SessionStatus::Authenticated);
    assert_eq!(h.tokens().access_token().as_deref(), Some("acc"));
    assert_eq!(h.tokens().refresh_token().as_deref(), Some("ref"));
}

#[tokio::test]
async fn test_sign_in_defaults_to_root() {
    let h = Harness::start().await;
    mount_login(&h).await;

    let outcome = h.hub.auth().sign_in(&credentials()).await.unwrap();

    assert_eq!(outcome.redirect_to, "/");
    assert_eq!(h.last_navigation(), Some(Navigation::Push("/".into())));
}

#[tokio::test]
async fn test_sign_in_falls_back_to_query_destination() {
    let h = Harness::start().await;
    mount_login(&h).await;

    let outcome = h
        .hub
        .auth()
        .sign_in_with_return(&credentials(), "?redirectTo=%2Fjams%2F3%2Fsubmit")
        .await
        .unwrap();

    assert_eq!(outcome.redirect_to, "/jams/3/submit");
}

#[tokio::test]
async fn test_failed_sign_in_leaves_session_untouched() {
    let h = Harness::start().await;
    h.seed_tokens("previous_access", "previous_refresh");

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .hub
        .auth()
        .sign_in(&Credentials::new("a@b.com", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(h.hub.auth().status(), SessionStatus::Loading);
    assert_eq!(h.tokens().access_token().as_deref(), Some("previous_access"));
    assert!(h.navigator.history().is_empty());
}

#[tokio::test]
async fn test_unverified_email_sign_in_offers_resend() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({ "message": "Please verify your email before signing in" }),
        ))
        .mount(&h.server)
        .await;

    let err = h.hub.auth().sign_in(&credentials()).await.unwrap_err();
    assert!(err.is_email_not_verified());
}

#[tokio::test]
async fn test_sign_up_authenticates() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "email": "new@b.com",
            "password": "validpass123",
            "username": "newbie"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(auth_payload("u_2", "new@b.com", "acc2", "ref2")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h
        .hub
        .auth()
        .sign_up(&SignUpData {
            email: "new@b.com".into(),
            password: "validpass123".into(),
            username: "newbie".into(),
        })
        .await
        .unwrap();

    assert_eq!(user.id, "u_2");
    assert_eq!(h.hub.auth().user().unwrap().email, "new@b.com");
    assert_eq!(h.tokens().access_token().as_deref(), Some("acc2"));
}

#[tokio::test]
async fn test_sign_up_conflict_surfaces_message() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Email already in use" })),
        )
        .mount(&h.server)
        .await;

    let err = h
        .hub
        .auth()
        .sign_up(&SignUpData {
            email: "a@b.com".into(),
            password: "validpass123".into(),
            username: "dup".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 409, .. }));
    assert_eq!(err.message(), "Email already in use");
    assert_eq!(h.tokens().access_token(), None);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let h = Harness::start().await;
    mount_login(&h).await;
    let auth = h.hub.auth();
    auth.sign_in(&credentials()).await.unwrap();

    auth.logout();
    assert_eq!(auth.snapshot(), SessionState::Unauthenticated);
    assert_eq!(h.tokens().access_token(), None);
    assert_eq!(h.tokens().refresh_token(), None);

    auth.logout();
    assert_eq!(auth.snapshot(), SessionState::Unauthenticated);
    assert_eq!(h.tokens().access_token(), None);
}

#[tokio::test]
async fn test_update_user_info_only_touches_patched_field() {
    let h = Harness::start().await;
    mount_login(&h).await;
    let auth = h.hub.auth();
    auth.sign_in(&credentials()).await.unwrap();
    let before = auth.user().unwrap();

    assert!(auth.update_user_info(UserPatch::default().avatar_url(Some("X".into()))));

    let after = auth.user().unwrap();
    assert_eq!(after.avatar_url.as_deref(), Some("X"));
    assert_eq!(
        User {
            avatar_url: before.avatar_url.clone(),
            ..after
        },
        before
    );
}

#[tokio::test]
async fn test_empty_user_patch_does_not_notify() {
    let h = Harness::start().await;
    mount_login(&h).await;
    let auth = h.hub.auth();
    auth.sign_in(&credentials()).await.unwrap();
    let mut changes = auth.subscribe();

    assert!(auth.update_user_info(UserPatch::default()));
    assert!(!changes.has_changed().unwrap());

    assert!(auth.update_user_info(UserPatch::default().email_verified(true)));
    assert!(changes.has_changed().unwrap());
}

#[tokio::test]
async fn test_update_user_info_requires_session() {
    let h = Harness::start().await;
    h.hub.auth().initialize().await;

    assert!(!h
        .hub
        .auth()
        .update_user_info(UserPatch::default().username(Some("ghost".into()))));
    assert_eq!(h.hub.auth().user(), None);
}

#[tokio::test]
async fn test_verify_email_marks_current_user() {
    let h = Harness::start().await;
    mount_login(&h).await;
    let auth = h.hub.auth();
    auth.sign_in(&credentials()).await.unwrap();

    let mut verified = user_json("u_1", "a@b.com");
    verified["emailVerified"] = json!(true);
    Mock::given(method("GET"))
        .and(path("/api/auth/verify-email"))
        .and(query_param("token", "good-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": verified })))
        .expect(1)
        .mount(&h.server)
        .await;

    auth.verify_email("good-code").await.unwrap();

    assert!(auth.user().unwrap().email_verified);
    assert_eq!(auth.status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_verify_email_for_other_account_leaves_user_alone() {
    let h = Harness::start().await;
    mount_login(&h).await;
    let auth = h.hub.auth();
    auth.sign_in(&credentials()).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/api/auth/verify-email"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "user": user_json("u_9", "other@b.com") })),
        )
        .mount(&h.server)
        .await;

    auth.verify_email("someone-elses-code").await.unwrap();
    assert!(!auth.user().unwrap().email_verified);
}

#[tokio::test]
async fn test_verify_email_with_expired_code_changes_nothing() {
    let h = Harness::start().await;
    mount_login(&h).await;
    let auth = h.hub.auth();
    auth.sign_in(&credentials()).await.unwrap();
    let before = auth.snapshot();

    Mock::given(method("GET"))
        .and(path("/api/auth/verify-email"))
        .and(query_param("token", "expired-code"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "message": "Verification code expired" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let err = auth.verify_email("expired-code").await.unwrap_err();

    assert!(matches!(err, Error::InvalidToken(_)));
    assert_eq!(err.message(), "Verification code expired");
    assert_eq!(auth.snapshot(), before);
}

#[tokio::test]
async fn test_reset_password_does_not_authenticate() {
    let h = Harness::start().await;
    h.hub.auth().initialize().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/reset-password"))
        .and(body_json(json!({ "token": "reset-token", "password": "n3w-passw0rd" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "user": user_json("u_1", "a@b.com") })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h
        .hub
        .auth()
        .reset_password("reset-token", "n3w-passw0rd")
        .await
        .unwrap();

    assert_eq!(user.id, "u_1");
    assert_eq!(h.hub.auth().status(), SessionStatus::Unauthenticated);
    assert_eq!(h.tokens().access_token(), None);
}

#[tokio::test]
async fn test_reset_password_with_used_link_is_terminal() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/reset-password"))
        .respond_with(
            ResponseTemplate::new(410)
                .set_body_json(json!({ "message": "Reset link already used" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .hub
        .auth()
        .reset_password("used-token", "whatever123")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidToken(_)));
}

#[tokio::test]
async fn test_forgot_password_and_resend_are_stateless() {
    let h = Harness::start().await;
    mount_login(&h).await;
    let auth = h.hub.auth();
    auth.sign_in(&credentials()).await.unwrap();
    let before = auth.snapshot();

    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .and(body_json(json!({ "email": "a@b.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "sent" })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/resend-verification"))
        .and(header("authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    auth.forgot_password("a@b.com").await.unwrap();
    auth.resend_verification_email().await.unwrap();

    assert_eq!(auth.snapshot(), before);
}
