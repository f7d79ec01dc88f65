//! Request context: the caller's identity and the sticky-preference session.

use actix_web::cookie::Cookie;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpRequest, HttpResponseBuilder};
use rf_core::error::AppError;
use rf_core::models::Principal;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::AppState;

pub const SESSION_COOKIE: &str = "rf_session";
const TOKEN_SCHEME: &str = "Token ";

/// `Authorization: Token <token>`, if present and well formed.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(TOKEN_SCHEME)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn resolve(state: &AppState, req: &HttpRequest) -> Result<Principal, ApiError> {
    let token = bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("authentication credentials were not provided".into()))?;
    let principal = state
        .identity
        .authenticate(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid token".into()))?;
    Ok(principal)
}

/// Resolves the caller and mirrors them into the user table.
pub async fn authenticate(state: &AppState, req: &HttpRequest) -> Result<Principal, ApiError> {
    let principal = resolve(state, req).await?;
    state.forum.register(&principal).await?;
    Ok(principal)
}

/// The caller on read routes: `None` without an `Authorization` header.
/// A header that is present but malformed or unknown is still a 401.
pub async fn optional_principal(state: &AppState, req: &HttpRequest) -> Result<Option<Principal>, ApiError> {
    if !req.headers().contains_key(AUTHORIZATION) {
        return Ok(None);
    }
    resolve(state, req).await.map(Some)
}

/// The opaque key sticky preferences are stored under.
pub struct Session {
    key: String,
    fresh: bool,
}

impl Session {
    /// Reuses the `rf_session` cookie or mints a new key.
    pub fn from_request(req: &HttpRequest) -> Self {
        match req.cookie(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => Session {
                key: cookie.value().to_string(),
                fresh: false,
            },
            _ => Session {
                key: Uuid::now_v7().simple().to_string(),
                fresh: true,
            },
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Sets the cookie on the response when the key was just minted.
    pub fn respond(&self, mut builder: HttpResponseBuilder) -> HttpResponseBuilder {
        if self.fresh {
            let mut cookie = Cookie::new(SESSION_COOKIE, self.key.clone());
            cookie.set_path("/");
            cookie.set_http_only(true);
            builder.cookie(cookie);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_token_header_parsing() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Token abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc123"));

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Token   "))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn test_session_cookie_is_reused() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "abc"))
            .to_http_request();
        let session = Session::from_request(&req);
        assert_eq!(session.key(), "abc");
        assert!(!session.fresh);

        let minted = Session::from_request(&TestRequest::default().to_http_request());
        assert!(minted.fresh);
        assert_eq!(minted.key().len(), 32);
    }
}
