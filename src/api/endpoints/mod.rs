//! Endpoint handlers: one module per entity plus auth and health.
//!
//! Read handlers live under `/api` and answer typed JSON or an
//! `ApiError`. Mutation handlers live under `/acciones` and always
//! answer HTTP 200 with the `ActionResult` envelope; the session
//! middleware deals with anonymous requests before they get here.

pub mod alimentos;
pub mod auth;
pub mod consultas;
pub mod health;
pub mod mediciones;
pub mod pacientes;
pub mod perfiles;
pub mod planes;

use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;

pub(crate) const MSG_BAD_ID: &str = "identificador inválido";

/// Path ids on read routes: malformed input is a 400, never a 404.
pub(crate) fn parse_path_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(MSG_BAD_ID.into()))
}

/// Query parameters shared by the cursor-paginated listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub filtro: Option<String>,
    pub page_size: Option<u32>,
    pub cursor: Option<String>,
}
