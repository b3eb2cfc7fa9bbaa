//! Token exchange validation against a mock token endpoint.

use marigold_client::indieauth::{IndieAuthClient, TokenError};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> IndieAuthClient {
    IndieAuthClient::new("https://app.example/", "https://app.example/login/callback/")
        .expect("client")
}

fn me() -> Url {
    Url::parse("https://example.com/").expect("me")
}

fn token_endpoint(server: &MockServer) -> Url {
    Url::parse(&format!("{}/token", server.uri())).expect("endpoint")
}

#[tokio::test]
async fn exchanges_a_code_for_a_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=code123"))
        .and(body_string_contains("client_id=https%3A%2F%2Fapp.example%2F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "foobar",
            "token_type": "Bearer",
            "scope": "create update",
            "me": "https://example.com/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let grant = client()
        .exchange_code(&token_endpoint(&server), &me(), "code123")
        .await
        .expect("grant");

    assert_eq!(grant.access_token, "foobar");
    assert_eq!(grant.token_type, "Bearer");
    assert_eq!(grant.scope, "create update");
    assert_eq!(grant.me, "https://example.com/");
    assert_eq!(grant.authorization_header(), "Bearer foobar");
}

#[tokio::test]
async fn missing_access_token_is_its_own_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "scope": "create"
        })))
        .mount(&server)
        .await;

    let result = client()
        .exchange_code(&token_endpoint(&server), &me(), "code123")
        .await;

    assert!(matches!(result, Err(TokenError::MissingAccessToken)));
}

#[tokio::test]
async fn missing_token_type_is_its_own_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "foobar",
            "scope": "create"
        })))
        .mount(&server)
        .await;

    let result = client()
        .exchange_code(&token_endpoint(&server), &me(), "code123")
        .await;

    assert!(matches!(result, Err(TokenError::MissingTokenType)));
}

#[tokio::test]
async fn missing_scope_fails_even_with_token_and_type_present() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "foobar",
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let result = client()
        .exchange_code(&token_endpoint(&server), &me(), "code123")
        .await;

    assert!(matches!(result, Err(TokenError::MissingScope)));
}

#[tokio::test]
async fn grant_me_defaults_to_the_request_profile() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "foobar",
            "token_type": "Bearer",
            "scope": "create"
        })))
        .mount(&server)
        .await;

    let grant = client()
        .exchange_code(&token_endpoint(&server), &me(), "code123")
        .await
        .expect("grant");

    assert_eq!(grant.me, "https://example.com/");
}
