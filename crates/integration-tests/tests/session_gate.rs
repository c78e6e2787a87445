//! Identity Toolkit sign-in observed through the session gate.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use preco_real_admin::config::SignOutPolicy;
use preco_real_admin::identity::{FirebaseIdentity, IdentityError};
use preco_real_admin::session::{AccessLevel, SessionGate};
use preco_real_core::Email;
use preco_real_integration_tests::{identity_config, jwt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn accept_password(server: &MockServer, uid: &str, id_token: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": uid,
            "email": format!("{uid}@precoreal.app"),
            "idToken": id_token,
            "refreshToken": "refresh-1",
            "expiresIn": "3600",
        })))
        .mount(server)
        .await;
}

fn gate(server: &MockServer) -> SessionGate {
    let provider = FirebaseIdentity::new(reqwest::Client::new(), &identity_config(server)).unwrap();
    SessionGate::start(Arc::new(provider))
}

fn email(uid: &str) -> Email {
    Email::parse(&format!("{uid}@precoreal.app")).unwrap()
}

#[tokio::test]
async fn test_admin_sign_in_resolves_claims_and_credential() {
    let server = MockServer::start().await;
    let token = jwt(&json!({"sub": "ana", "admin": true}));
    accept_password(&server, "ana", &token).await;

    let gate = gate(&server);
    assert_eq!(gate.wait_resolved().await.access_level(), AccessLevel::Anonymous);

    let session = gate
        .sign_in(&email("ana"), &SecretString::from("s3nha-forte"))
        .await
        .unwrap();
    assert!(session.is_admin());
    assert!(!session.loading());
    assert_eq!(gate.access_level(), AccessLevel::AuthenticatedAdmin);
    assert_eq!(
        gate.credential().map(|c| c.expose_secret().to_string()),
        Some(token)
    );
    assert_eq!(
        gate.current_identity().map(|i| i.uid.to_string()),
        Some("ana".to_string())
    );

    gate.sign_out(SignOutPolicy::KeepOnFailure).await.unwrap();
    assert_eq!(gate.access_level(), AccessLevel::Anonymous);
    assert!(gate.credential().is_none());
    gate.shutdown().await;
}

#[tokio::test]
async fn test_plain_user_is_authenticated_but_not_admin() {
    let server = MockServer::start().await;
    accept_password(&server, "bruno", &jwt(&json!({"sub": "bruno"}))).await;

    let gate = gate(&server);
    gate.wait_resolved().await;
    let session = gate
        .sign_in(&email("bruno"), &SecretString::from("s3nha-forte"))
        .await
        .unwrap();

    assert!(!session.is_admin());
    assert_eq!(gate.access_level(), AccessLevel::AuthenticatedUser);
    gate.shutdown().await;
}

#[tokio::test]
async fn test_rejected_password_leaves_session_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}
        })))
        .mount(&server)
        .await;

    let gate = gate(&server);
    gate.wait_resolved().await;
    let result = gate
        .sign_in(&email("ana"), &SecretString::from("errada"))
        .await;

    assert!(matches!(
        result,
        Err(IdentityError::Rejected(ref message)) if message == "INVALID_LOGIN_CREDENTIALS"
    ));
    assert_eq!(gate.access_level(), AccessLevel::Anonymous);
    gate.shutdown().await;
}
