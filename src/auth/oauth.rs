//! # OAuth Login Flow
//!
//! Browser-facing half of the authorization-code flow with PKCE:
//!
//! - `GET /api/auth/login` redirects to the identity provider and stores the
//!   CSRF state and PKCE verifier in short-lived HttpOnly cookies.
//! - `GET /api/auth/callback` checks the returned state against the cookie
//!   and hands `{code, code_verifier, redirect_uri}` to the backend, which
//!   performs the token exchange and issues the session cookies.
//!
//! The proxy never sees or validates provider tokens.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope, TokenUrl};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::config::OAuthSettings;
use crate::core::error::{PlatformError, PlatformResult};
use crate::gateway::server::AppState;
use crate::observability::{record_proxy_call, ProxyOutcome};
use crate::proxy::client::ForwardRequest;
use crate::proxy::envelope::backend_message;
use crate::proxy::handlers::append_set_cookies;
use crate::proxy::resource::{ModeAccess, ProxyResource};

pub const STATE_COOKIE: &str = "platform_oauth_state";
pub const VERIFIER_COOKIE: &str = "platform_oauth_verifier";
const FLOW_COOKIE_PATH: &str = "/api/auth";
const FLOW_COOKIE_MAX_AGE_SECS: i64 = 600;

/// Configured OAuth client
pub struct OAuthFlow {
    client: BasicClient,
    settings: OAuthSettings,
}

/// Everything needed to send the browser to the provider
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

impl OAuthFlow {
    pub fn new(settings: &OAuthSettings) -> PlatformResult<Self> {
        let client = BasicClient::new(
            ClientId::new(settings.client_id.clone()),
            settings.client_secret.clone().map(ClientSecret::new),
            AuthUrl::new(settings.auth_url.clone())?,
            Some(TokenUrl::new(settings.token_url.clone())?),
        )
        .set_redirect_uri(RedirectUrl::new(settings.redirect_url.clone())?);

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    /// Fresh authorization URL with random state and PKCE challenge
    pub fn login_redirect(&self) -> LoginRedirect {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(challenge);
        for scope in &self.settings.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (url, csrf_state) = request.url();

        LoginRedirect {
            url: url.to_string(),
            csrf_state: csrf_state.secret().to_string(),
            pkce_verifier: verifier.secret().to_string(),
        }
    }

    pub fn redirect_url(&self) -> &str {
        &self.settings.redirect_url
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    fn secure_cookies(&self) -> bool {
        self.settings.redirect_url.starts_with("https://")
    }
}

/// Short-lived cookie carrying one half of the login flow
fn flow_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(FLOW_COOKIE_PATH)
        .max_age(time::Duration::seconds(FLOW_COOKIE_MAX_AGE_SECS))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Value of one of this module's own flow cookies
fn flow_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|cookie| cookie.value().to_string())
}

fn ensure_oauth_mode(state: &AppState) -> PlatformResult<&OAuthFlow> {
    let mode = state.auth_mode();
    match ProxyResource::OAuthCallback.access(mode) {
        ModeAccess::Forward => {}
        ModeAccess::Reject | ModeAccess::Simulate => {
            return Err(PlatformError::mode_mismatch(
                ProxyResource::OAuthCallback.operation(),
                mode,
            ))
        }
    }
    state
        .oauth
        .as_ref()
        .ok_or_else(|| PlatformError::config("OAuth client is not configured"))
}

/// `GET /api/auth/login`
pub async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let flow = match ensure_oauth_mode(&state) {
        Ok(flow) => flow,
        Err(err) => return err.into_response(),
    };

    let redirect = flow.login_redirect();
    let secure = flow.secure_cookies();
    info!("Redirecting browser to identity provider");

    let jar = jar
        .add(flow_cookie(STATE_COOKIE, redirect.csrf_state, secure))
        .add(flow_cookie(VERIFIER_COOKIE, redirect.pkce_verifier, secure));
    (jar, Redirect::temporary(&redirect.url)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /api/auth/callback`
pub async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let params = params.map(|Query(params)| params);
    let (outcome, response) = match complete_login(&state, jar, &headers, params).await {
        Ok(response) => (ProxyOutcome::Success, response),
        Err(err) => {
            warn!(error = %err, "OAuth callback failed");
            (ProxyOutcome::from_error(&err), err.into_response())
        }
    };
    record_proxy_call(ProxyResource::OAuthCallback, outcome, started.elapsed());
    response
}

async fn complete_login(
    state: &AppState,
    jar: CookieJar,
    headers: &HeaderMap,
    params: Result<CallbackParams, QueryRejection>,
) -> PlatformResult<Response> {
    let flow = ensure_oauth_mode(state)?;
    let params =
        params.map_err(|rejection| PlatformError::invalid_request(rejection.body_text()))?;

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        return Err(PlatformError::invalid_request(format!(
            "Identity provider returned {}: {}",
            error, description
        )));
    }

    let code = params
        .code
        .ok_or_else(|| PlatformError::invalid_request("Missing code parameter"))?;
    let returned_state = params
        .state
        .ok_or_else(|| PlatformError::invalid_request("Missing state parameter"))?;
    let expected_state = flow_value(&jar, STATE_COOKIE)
        .ok_or_else(|| PlatformError::invalid_request("Missing OAuth state cookie"))?;
    if expected_state != returned_state {
        return Err(PlatformError::invalid_request("OAuth state mismatch"));
    }
    let verifier = flow_value(&jar, VERIFIER_COOKIE)
        .ok_or_else(|| PlatformError::invalid_request("Missing PKCE verifier cookie"))?;

    let request = ForwardRequest {
        cookies: headers.get_all(header::COOKIE).iter().cloned().collect(),
        authorization: headers.get(header::AUTHORIZATION).cloned(),
        ..ForwardRequest::default()
    }
    .with_json(&json!({
        "code": code,
        "code_verifier": verifier,
        "redirect_uri": flow.redirect_url(),
    }))?;

    let backend = state
        .backend
        .forward(Method::POST, &flow.settings().backend_callback_path, &request)
        .await?;
    if !backend.is_success() {
        return Err(PlatformError::backend(
            backend.status.as_u16(),
            backend_message(backend.status, &backend.body),
        ));
    }

    info!("OAuth login completed");
    let jar = jar
        .remove(Cookie::build(STATE_COOKIE).path(FLOW_COOKIE_PATH))
        .remove(Cookie::build(VERIFIER_COOKIE).path(FLOW_COOKIE_PATH));
    let mut response = (jar, Redirect::to(&flow.settings().post_login_path)).into_response();
    append_set_cookies(&mut response, &backend.set_cookies);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OAuthSettings {
        OAuthSettings {
            client_id: "dashboard".to_string(),
            auth_url: "https://idp.example.com/authorize".to_string(),
            token_url: "https://idp.example.com/token".to_string(),
            redirect_url: "https://app.example.com/api/auth/callback".to_string(),
            ..OAuthSettings::default()
        }
    }

    #[test]
    fn test_login_redirect_carries_state_and_pkce() {
        let flow = OAuthFlow::new(&settings()).unwrap();
        let redirect = flow.login_redirect();
        let url = url::Url::parse(&redirect.url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], "dashboard");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["state"], redirect.csrf_state);
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["scope"], "openid profile email");
        assert!(!redirect.pkce_verifier.is_empty());
    }

    #[test]
    fn test_invalid_urls_are_configuration_errors() {
        let mut bad = settings();
        bad.auth_url = "not a url".to_string();
        assert!(matches!(
            OAuthFlow::new(&bad),
            Err(PlatformError::Configuration { .. })
        ));
    }

    #[test]
    fn test_flow_value_reads_only_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            axum::http::HeaderValue::from_static("theme=dark; platform_oauth_state=abc123; other=1"),
        );
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(flow_value(&jar, STATE_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(flow_value(&jar, VERIFIER_COOKIE), None);
    }

    #[test]
    fn test_flow_cookie_attributes() {
        let cookie = flow_cookie(STATE_COOKIE, "xyz".to_string(), true);
        assert_eq!(cookie.value(), "xyz");
        assert_eq!(cookie.path(), Some("/api/auth"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(600)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));

        let plain = flow_cookie(VERIFIER_COOKIE, "v".to_string(), false);
        assert_eq!(plain.secure(), Some(false));
    }
}
