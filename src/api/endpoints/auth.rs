//! Session endpoints: login and logout.
//!
//! Login verifies the practitioner's credentials and installs the signed
//! session cookie; logout clears it. A signed-in user posting to login is
//! sent back to the application instead.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::MSG_INTERNAL;
use crate::api::middleware::auth::claims_from_headers;
use crate::api::types::{ActionResult, ApiContext};
use crate::db::repository::{get_usuario_by_email, verify_password};
use crate::session::{clear_session_cookie, issue_session, session_cookie};

/// One message for unknown email and wrong password alike.
const MSG_BAD_CREDENTIALS: &str = "email o contraseña incorrectos";

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SesionIniciada {
    pub id: Uuid,
    pub email: String,
    pub nombre: String,
}

fn fail(message: impl Into<String>) -> Response {
    Json(ActionResult::<SesionIniciada>::fail(message)).into_response()
}

/// `POST /api/auth/login` — verify credentials, set the session cookie.
pub async fn login(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    Json(input): Json<LoginInput>,
) -> Response {
    if claims_from_headers(&headers, ctx.secret()).is_some() {
        return Redirect::to("/").into_response();
    }

    let email = input.email.trim();
    if email.is_empty() || input.password.is_empty() {
        return fail("email y contraseña son obligatorios");
    }

    let usuario = {
        let conn = match ctx.lock_db() {
            Ok(conn) => conn,
            Err(_) => {
                tracing::error!("database lock poisoned");
                return fail(MSG_INTERNAL);
            }
        };
        match get_usuario_by_email(&conn, email) {
            Ok(usuario) => usuario,
            Err(err) => {
                tracing::error!(error = %err, "login lookup failed");
                return fail(MSG_INTERNAL);
            }
        }
    };

    let Some(usuario) = usuario else {
        return fail(MSG_BAD_CREDENTIALS);
    };
    if !verify_password(&input.password, &usuario.password_hash) {
        return fail(MSG_BAD_CREDENTIALS);
    }

    let token = match issue_session(&usuario, ctx.secret()) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "session issue failed");
            return fail(MSG_INTERNAL);
        }
    };

    tracing::info!(usuario = %usuario.email, "session issued");
    (
        AppendHeaders([(SET_COOKIE, session_cookie(&token))]),
        Json(ActionResult::ok(SesionIniciada {
            id: usuario.id,
            email: usuario.email,
            nombre: usuario.nombre,
        })),
    )
        .into_response()
}

/// `POST /api/auth/logout` — drop the session cookie. Safe without one.
pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Json(ActionResult::ok_empty()),
    )
}
