//! Session-cookie authentication middleware.
//!
//! Verifies the signed `sesion` cookie and injects the practitioner's
//! [`Claims`] into request extensions for downstream handlers. Two
//! flavors share the verification path and differ only in how they
//! answer an anonymous request: API routes get a 401 JSON body, action
//! routes get a 303 redirect to `/login`.

use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::session::{session_from_cookie_header, verify_session, Claims};

/// Require a session on an `/api` route; anonymous requests get 401.
pub async fn require_session_api(req: Request<axum::body::Body>, next: Next) -> Response {
    match authenticate(req) {
        Ok(req) => next.run(req).await,
        Err(rejection) => rejection.into_response(),
    }
}

/// Require a session on an `/acciones` route; anonymous requests are
/// sent to the login page.
pub async fn require_session_accion(req: Request<axum::body::Body>, next: Next) -> Response {
    match authenticate(req) {
        Ok(req) => next.run(req).await,
        Err(ApiError::Unauthorized) => Redirect::to("/login").into_response(),
        Err(other) => other.into_response(),
    }
}

fn authenticate(
    mut req: Request<axum::body::Body>,
) -> Result<Request<axum::body::Body>, ApiError> {
    let ctx = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("missing API context".into()))?;

    let claims = claims_from_headers(req.headers(), ctx.secret()).ok_or(ApiError::Unauthorized)?;
    req.extensions_mut().insert(claims);
    Ok(req)
}

/// Extract and verify the session from a request's `Cookie` header.
/// Also used by the login handler to redirect signed-in users away.
pub fn claims_from_headers(headers: &HeaderMap, secret: &[u8]) -> Option<Claims> {
    let cookies = headers
        .get(axum::http::header::COOKIE)?
        .to_str()
        .ok()?;
    let token = session_from_cookie_header(cookies)?;
    match verify_session(token, secret) {
        Ok(claims) => Some(claims),
        Err(err) => {
            tracing::debug!(error = %err, "session token rejected");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Usuario;
    use crate::session::issue_session;
    use chrono::NaiveDate;
    use uuid::Uuid;

    const SECRET: &[u8] = b"middleware-test-secret";

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            value.parse().unwrap(),
        );
        headers
    }

    #[test]
    fn valid_cookie_yields_claims() {
        let usuario = Usuario {
            id: Uuid::new_v4(),
            email: "laura@clinica.ar".into(),
            nombre: "Laura".into(),
            password_hash: String::new(),
            creado_en: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let token = issue_session(&usuario, SECRET).unwrap();
        let headers = headers_with_cookie(&format!("tema=claro; sesion={token}"));

        let claims = claims_from_headers(&headers, SECRET).unwrap();
        assert_eq!(claims.id, usuario.id);
    }

    #[test]
    fn missing_or_garbage_cookie_yields_none() {
        assert!(claims_from_headers(&HeaderMap::new(), SECRET).is_none());
        let headers = headers_with_cookie("sesion=no-es-un-token");
        assert!(claims_from_headers(&headers, SECRET).is_none());
        let headers = headers_with_cookie("otra=cosa");
        assert!(claims_from_headers(&headers, SECRET).is_none());
    }
}
