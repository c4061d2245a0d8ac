//! Patient endpoints: scoped reads plus the mutation actions.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_action, run_action_empty, ActionResult, ApiContext};
use crate::db::repository::{
    delete_paciente, get_paciente, insert_paciente, list_pacientes, set_paciente_activo,
    update_paciente, Page, DEFAULT_PAGE_SIZE,
};
use crate::models::Paciente;
use crate::session::Claims;
use crate::validation::{validate_paciente, validate_paciente_update, PacienteInput};

use super::{parse_path_id, PageQuery, MSG_BAD_ID};

/// `GET /api/pacientes` — filtered, cursor-paginated listing.
pub async fn listado(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<Paciente>>, ApiError> {
    let conn = ctx.lock_db()?;
    let page = list_pacientes(
        &conn,
        &claims.id,
        q.filtro.as_deref(),
        q.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        q.cursor.as_deref(),
        ctx.secret(),
    )?;
    Ok(Json(page))
}

/// `GET /api/pacientes/:id` — scoped detail.
pub async fn detalle(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Paciente>, ApiError> {
    let id = parse_path_id(&id)?;
    let conn = ctx.lock_db()?;
    Ok(Json(get_paciente(&conn, &id, &claims.id)?))
}

/// `POST /acciones/pacientes/crear`
pub async fn crear(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<PacienteInput>,
) -> Json<ActionResult<Paciente>> {
    let nuevo = match validate_paciente(input) {
        Ok(nuevo) => nuevo,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        insert_paciente(conn, &claims.id, &nuevo)
    }))
}

/// `POST /acciones/pacientes/:id/actualizar`
pub async fn actualizar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(input): Json<PacienteInput>,
) -> Json<ActionResult<Paciente>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    let cambios = match validate_paciente_update(input) {
        Ok(cambios) => cambios,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        update_paciente(conn, &id, &claims.id, &cambios)
    }))
}

#[derive(Debug, Deserialize)]
pub struct ActivoInput {
    pub activo: bool,
}

/// `POST /acciones/pacientes/:id/activar` — soft lifecycle toggle.
pub async fn activar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(input): Json<ActivoInput>,
) -> Json<ActionResult<()>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    Json(run_action_empty(&ctx, |conn| {
        set_paciente_activo(conn, &id, &claims.id, input.activo)
    }))
}

/// `POST /acciones/pacientes/:id/eliminar` — hard delete, cascades to
/// the patient's records.
pub async fn eliminar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Json<ActionResult<()>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    Json(run_action_empty(&ctx, |conn| {
        delete_paciente(conn, &id, &claims.id)
    }))
}
