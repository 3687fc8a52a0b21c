//! HTTP implementation of the backend collaborators.
//!
//! Talks to a hosted backend that exposes GoTrue-style authentication under
//! `/auth/v1` and PostgREST-style tables under `/rest/v1`. Every request
//! carries the project's anon key as `apikey`; once signed in, the session's
//! access token replaces the anon key as the bearer token. An expired access
//! token is exchanged once for a new session using the refresh token.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

use pizzeria_core::{Email, UserId};

use super::{AuthBackend, BackendError, EmailChange, Filter, Identity, Table, TableStore};
use crate::config::BackendConfig;

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: UserId,
    email: Option<String>,
    email_change_sent_at: Option<String>,
}

impl From<AuthUser> for Identity {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    refresh_token: String,
    user: AuthUser,
}

/// Sign-up answers with a session when email confirmation is off, and with
/// the bare user record when it is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(SessionResponse),
    User(AuthUser),
}

/// Error payload shapes of both services, merged.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    code: Option<Value>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| match &self.code {
                Some(Value::String(s)) => Some(s.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
    }

    fn message(self, fallback: &str) -> String {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .unwrap_or_else(|| fallback.to_string())
    }
}

struct Session {
    access_token: SecretString,
    refresh_token: SecretString,
}

// ─────────────────────────────────────────────────────────────────────────────
// RestBackend
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the hosted auth and table APIs.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the session.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestBackendInner>,
}

struct RestBackendInner {
    client: reqwest::Client,
    auth_url: Url,
    rest_url: Url,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
}

impl RestBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be built, or
    /// `BackendError::Unavailable` if the base URL cannot hold API paths.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("Pizzeria/1.0")
            .build()?;

        let join = |path: &str| {
            config
                .url
                .join(path)
                .map_err(|e| BackendError::Unavailable(format!("invalid backend url: {e}")))
        };

        Ok(Self {
            inner: Arc::new(RestBackendInner {
                client,
                auth_url: join("auth/v1/")?,
                rest_url: join("rest/v1/")?,
                anon_key: config.anon_key.clone(),
                session: RwLock::new(None),
            }),
        })
    }

    fn auth_endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.inner
            .auth_url
            .join(path)
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    fn table_endpoint(&self, table: Table) -> Result<Url, BackendError> {
        self.inner
            .rest_url
            .join(table.as_str())
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    /// Build a request with the API key and the best available bearer token.
    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let session = self.inner.session.read().await;
        let bearer = session.as_ref().map_or_else(
            || self.inner.anon_key.expose_secret().to_string(),
            |s| s.access_token.expose_secret().to_string(),
        );

        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    /// Request with the session token; fails if signed out.
    async fn session_request(&self, method: Method, url: Url) -> Result<RequestBuilder, BackendError> {
        if self.inner.session.read().await.is_none() {
            return Err(BackendError::NoSession);
        }
        Ok(self.request(method, url).await)
    }

    async fn store_session(&self, session: SessionResponse) -> Identity {
        *self.inner.session.write().await = Some(Session {
            access_token: SecretString::from(session.access_token),
            refresh_token: SecretString::from(session.refresh_token),
        });
        session.user.into()
    }

    async fn clear_session(&self) {
        *self.inner.session.write().await = None;
    }

    /// Exchange the refresh token for a new session.
    ///
    /// Returns `None`, dropping the session, if there is none or the token
    /// was rejected.
    async fn refresh_session(&self) -> Result<Option<Identity>, BackendError> {
        let refresh_token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };

        let mut url = self.auth_endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");
        let response = self
            .inner
            .client
            .post(url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(self.inner.anon_key.expose_secret())
            .json(&serde_json::json!({ "refresh_token": refresh_token.expose_secret() }))
            .send()
            .await?;

        if response.status().is_client_error() {
            debug!(status = %response.status(), "Refresh token rejected");
            self.clear_session().await;
            return Ok(None);
        }

        let session: SessionResponse = check(response).await?.json().await?;
        Ok(Some(self.store_session(session).await))
    }
}

/// Turn a non-success response into a `BackendError`.
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(BackendError::RateLimited(retry_after));
    }

    let text = response.text().await?;
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let snippet = text.chars().take(200).collect::<String>();

    tracing::debug!(status = %status, body = %snippet, "Backend returned non-success status");

    Err(BackendError::Api {
        status: status.as_u16(),
        code: body.code(),
        message: body.message(&snippet),
    })
}

#[async_trait]
impl AuthBackend for RestBackend {
    #[instrument(skip_all, fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &SecretString) -> Result<Identity, BackendError> {
        let url = self.auth_endpoint("signup")?;
        let response = self
            .request(Method::POST, url)
            .await
            .json(&PasswordCredentials {
                email: email.as_str(),
                password: password.expose_secret(),
            })
            .send()
            .await?;

        match check(response).await?.json::<SignUpResponse>().await? {
            SignUpResponse::Session(session) => Ok(self.store_session(session).await),
            SignUpResponse::User(user) => {
                debug!("Sign-up pending email confirmation");
                Ok(user.into())
            }
        }
    }

    #[instrument(skip_all, fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Identity, BackendError> {
        let mut url = self.auth_endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .request(Method::POST, url)
            .await
            .json(&PasswordCredentials {
                email: email.as_str(),
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let session: SessionResponse = check(response).await?.json().await?;
        Ok(self.store_session(session).await)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), BackendError> {
        let url = self.auth_endpoint("logout")?;
        let request = match self.session_request(Method::POST, url).await {
            Ok(request) => request,
            Err(BackendError::NoSession) => return Ok(()),
            Err(e) => return Err(e),
        };

        check(request.send().await?).await?;
        self.clear_session().await;
        Ok(())
    }

    #[instrument(skip_all, fields(email = %email))]
    async fn update_email(&self, email: &Email) -> Result<EmailChange, BackendError> {
        let url = self.auth_endpoint("user")?;
        let response = self
            .session_request(Method::PUT, url)
            .await?
            .json(&serde_json::json!({ "email": email.as_str() }))
            .send()
            .await?;

        let user: AuthUser = check(response).await?.json().await?;
        Ok(EmailChange {
            confirmation_sent: user.email_change_sent_at.is_some(),
        })
    }

    #[instrument(skip_all)]
    async fn current_user(&self) -> Result<Option<Identity>, BackendError> {
        let url = self.auth_endpoint("user")?;
        let request = match self.session_request(Method::GET, url).await {
            Ok(request) => request,
            Err(BackendError::NoSession) => return Ok(None),
            Err(e) => return Err(e),
        };

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // Expired access token; a revoked session fails the refresh too.
            return self.refresh_session().await;
        }

        let user: AuthUser = check(response).await?.json().await?;
        Ok(Some(user.into()))
    }
}

/// `?select=*&col=eq.value` query pairs.
fn filter_query(filters: &[Filter]) -> Vec<(&'static str, String)> {
    filters
        .iter()
        .map(|f| (f.column, format!("eq.{}", f.value_text())))
        .collect()
}

#[async_trait]
impl TableStore for RestBackend {
    #[instrument(skip(self, filters), fields(table = %table))]
    async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
        let url = self.table_endpoint(table)?;
        let response = self
            .request(Method::GET, url)
            .await
            .query(&[("select", "*")])
            .query(&filter_query(filters))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    #[instrument(skip(self, rows), fields(table = %table, rows = rows.len()))]
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let url = self.table_endpoint(table)?;
        let response = self
            .request(Method::POST, url)
            .await
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    #[instrument(skip(self, patch, filters), fields(table = %table))]
    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<(), BackendError> {
        let url = self.table_endpoint(table)?;
        let response = self
            .request(Method::PATCH, url)
            .await
            .header("Prefer", "return=minimal")
            .query(&filter_query(filters))
            .json(&patch)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, filters), fields(table = %table))]
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError> {
        let url = self.table_endpoint(table)?;
        let response = self
            .request(Method::DELETE, url)
            .await
            .header("Prefer", "return=minimal")
            .query(&filter_query(filters))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}
