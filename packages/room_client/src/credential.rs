use reqwest::Url;
use room_protocol::{TokenRequest, TokenResponse};
use tracing::debug;

use crate::endpoints::{Endpoints, failure_reason};
use crate::error::CredentialError;

/// A server-issued session token and the display name it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub username: String,
}

/// Exchanges a display name for a session token at `/api/token`.
#[derive(Clone)]
pub struct CredentialExchange {
    http: reqwest::Client,
    token_url: Url,
}

impl CredentialExchange {
    pub fn new(http: reqwest::Client, endpoints: &Endpoints) -> Self {
        Self {
            http,
            token_url: endpoints.token_url(),
        }
    }

    pub async fn issue(&self, display_name: &str) -> Result<Credential, CredentialError> {
        debug!(username = display_name, "requesting session token");
        let response = self
            .http
            .post(self.token_url.clone())
            .json(&TokenRequest {
                username: display_name.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, reason) = failure_reason(response).await;
            return Err(CredentialError::Rejected { status, reason });
        }

        let body: TokenResponse = response.json().await?;
        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or(CredentialError::MissingField("token"))?;
        let username = body
            .username
            .filter(|u| !u.is_empty())
            .ok_or(CredentialError::MissingField("username"))?;
        Ok(Credential { token, username })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    async fn spawn_token_server(app: Router) -> (Endpoints, tokio::sync::oneshot::Sender<()>) {
        let (port, shutdown) = crate::test_support::spawn_server(app).await;
        let endpoints = Endpoints::parse(&format!("http://127.0.0.1:{port}"), None).unwrap();
        (endpoints, shutdown)
    }

    #[tokio::test]
    async fn issues_token() {
        let app = Router::new().route(
            "/api/token",
            post(|Json(req): Json<Value>| async move {
                Json(json!({ "token": "t1", "username": req["username"] }))
            }),
        );
        let (endpoints, _shutdown) = spawn_token_server(app).await;

        let exchange = CredentialExchange::new(reqwest::Client::new(), &endpoints);
        let credential = exchange.issue("Ann").await.unwrap();
        assert_eq!(
            credential,
            Credential {
                token: "t1".into(),
                username: "Ann".into()
            }
        );
    }

    #[tokio::test]
    async fn rejection_carries_server_detail() {
        let app = Router::new().route(
            "/api/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "detail": "username taken" })),
                )
            }),
        );
        let (endpoints, _shutdown) = spawn_token_server(app).await;

        let err = CredentialExchange::new(reqwest::Client::new(), &endpoints)
            .issue("Ann")
            .await
            .unwrap_err();
        match err {
            CredentialError::Rejected { status, reason } => {
                assert_eq!(status, 400);
                assert_eq!(reason, "username taken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejection_without_body_uses_status_text() {
        let app = Router::new().route(
            "/api/token",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let (endpoints, _shutdown) = spawn_token_server(app).await;

        let err = CredentialExchange::new(reqwest::Client::new(), &endpoints)
            .issue("Ann")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "credential request rejected (503): Service Unavailable"
        );
    }

    #[tokio::test]
    async fn missing_token_is_reported() {
        let app = Router::new().route(
            "/api/token",
            post(|| async { Json(json!({ "username": "Ann" })) }),
        );
        let (endpoints, _shutdown) = spawn_token_server(app).await;

        let err = CredentialExchange::new(reqwest::Client::new(), &endpoints)
            .issue("Ann")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingField("token")));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let endpoints = Endpoints::parse(&format!("http://127.0.0.1:{port}"), None).unwrap();

        let err = CredentialExchange::new(reqwest::Client::new(), &endpoints)
            .issue("Ann")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Request(_)));
    }
}
