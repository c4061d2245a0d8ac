//! Measurement endpoints: per-patient history plus mutation actions.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_action, run_action_empty, ActionResult, ApiContext};
use crate::db::repository::{
    delete_medicion, get_mediciones_por_paciente, insert_medicion, update_medicion,
};
use crate::models::Medicion;
use crate::session::Claims;
use crate::validation::{validate_medicion, validate_medicion_update, MedicionInput};

use super::{parse_path_id, MSG_BAD_ID};

/// `GET /api/mediciones/:paciente_id` — the patient's measurement
/// history, newest first.
pub async fn por_paciente(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(paciente_id): Path<String>,
) -> Result<Json<Vec<Medicion>>, ApiError> {
    let paciente_id = parse_path_id(&paciente_id)?;
    let conn = ctx.lock_db()?;
    Ok(Json(get_mediciones_por_paciente(
        &conn,
        &paciente_id,
        &claims.id,
    )?))
}

/// `POST /acciones/mediciones/crear`
pub async fn crear(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<MedicionInput>,
) -> Json<ActionResult<Medicion>> {
    let nueva = match validate_medicion(input) {
        Ok(nueva) => nueva,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        insert_medicion(conn, &claims.id, &nueva)
    }))
}

/// `POST /acciones/mediciones/:id/actualizar`
pub async fn actualizar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(input): Json<MedicionInput>,
) -> Json<ActionResult<Medicion>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    let cambios = match validate_medicion_update(input) {
        Ok(cambios) => cambios,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        update_medicion(conn, &id, &claims.id, &cambios)
    }))
}

/// `POST /acciones/mediciones/:id/eliminar`
pub async fn eliminar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Json<ActionResult<()>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    Json(run_action_empty(&ctx, |conn| {
        delete_medicion(conn, &id, &claims.id)
    }))
}
