//! GoTrue authentication: password grant, refresh grant, sign-out.
//!
//! The browser SDK keeps the session implicit; here it is an explicit
//! [`Session`] value that the engine owns, refreshes ahead of expiry, and
//! persists across restarts (tokens only, never the password).

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApiError, Supabase, into_checked_response, retry};

/// An authenticated GoTrue session.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    user_email: Option<String>,
}

impl Session {
    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once the token is within `leeway_secs` of expiry.
    #[must_use]
    pub fn is_expired(&self, leeway_secs: i64) -> bool {
        Utc::now() + TimeDelta::seconds(leeway_secs) >= self.expires_at
    }
}

// Manual Debug impl to keep tokens out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user_email", &self.user_email)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

impl Supabase {
    /// `POST /auth/v1/token?grant_type=password`.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let session = self.token_request("password", &body).await?;
        tracing::info!(email, "Signed in");
        Ok(session)
    }

    /// `POST /auth/v1/token?grant_type=refresh_token`.
    pub async fn refresh_session(&self, session: &Session) -> Result<Session, ApiError> {
        let body = serde_json::json!({ "refresh_token": session.refresh_token });
        let refreshed = self.token_request("refresh_token", &body).await?;
        tracing::debug!(expires_at = %refreshed.expires_at, "Session refreshed");
        Ok(refreshed)
    }

    /// `POST /auth/v1/logout`. Best-effort: a dead token is already signed out.
    pub async fn sign_out(&self, session: &Session) -> Result<(), ApiError> {
        let url = self.endpoint("auth/v1/logout");
        let response = self
            .http
            .post(url)
            .header("apikey", self.config.anon_key())
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::UNAUTHORIZED
        {
            let status = response.status();
            let body = crate::read_capped_error_body(response).await;
            return Err(ApiError::Http { status, body });
        }
        Ok(())
    }

    async fn token_request(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<Session, ApiError> {
        let mut url = self.endpoint("auth/v1/token");
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let outcome = retry::send_with_retry(
            || {
                self.http
                    .post(url.clone())
                    .header("apikey", self.config.anon_key())
                    .json(body)
            },
            &self.retry,
        )
        .await;

        let response = into_checked_response(outcome).await?;
        let token: TokenResponse = response.json().await?;

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + TimeDelta::seconds(token.expires_in.max(0)),
            user_email: token.user.and_then(|u| u.email),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::Session;
    use crate::retry::RetryConfig;
    use crate::{ApiError, Supabase, SupabaseConfig};

    fn token_body(access: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": access,
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "user": { "email": "ana@finaptico.example" }
        })
    }

    fn api_for(server: &MockServer) -> Supabase {
        Supabase::new(SupabaseConfig::new(&server.uri(), "anon-key").unwrap())
            .unwrap()
            .with_retry_config(RetryConfig::fast())
    }

    #[tokio::test]
    async fn password_grant_builds_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_partial_json(
                serde_json::json!({ "email": "ana@finaptico.example", "password": "pw" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("jwt-1")))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let session = api
            .sign_in_with_password("ana@finaptico.example", "pw")
            .await
            .expect("session");

        assert_eq!(session.email(), Some("ana@finaptico.example"));
        assert!(!session.is_expired(0));
        assert!(session.expires_at() > Utc::now());
    }

    #[tokio::test]
    async fn refresh_grant_sends_refresh_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_partial_json(serde_json::json!({ "refresh_token": "refresh-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("jwt-2")))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let session = Session {
            access_token: "jwt-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at: Utc::now(),
            user_email: None,
        };

        let refreshed = api.refresh_session(&session).await.expect("refreshed");
        assert!(!refreshed.is_expired(0));
    }

    #[tokio::test]
    async fn bad_credentials_surface_http_error_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "invalid_grant" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api
            .sign_in_with_password("ana@finaptico.example", "wrong")
            .await
            .unwrap_err();

        match err {
            ApiError::Http { status, .. } => assert_eq!(status.as_u16(), 400),
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[test]
    fn session_expiry_leeway() {
        let session = Session {
            access_token: "jwt".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() + TimeDelta::seconds(120),
            user_email: None,
        };
        assert!(!session.is_expired(0));
        assert!(session.is_expired(300));
    }

    #[test]
    fn session_debug_masks_tokens() {
        let session = Session {
            access_token: "top-secret-jwt".to_string(),
            refresh_token: "top-secret-refresh".to_string(),
            expires_at: Utc::now(),
            user_email: Some("ana@finaptico.example".to_string()),
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn session_round_trips_through_json() {
        let session = Session {
            access_token: "jwt".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now(),
            user_email: Some("ana@finaptico.example".to_string()),
        };
        let json = serde_json::to_string(&session).expect("serialize");
        let back: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.access_token, session.access_token);
        assert_eq!(back.email(), session.email());
    }
}
