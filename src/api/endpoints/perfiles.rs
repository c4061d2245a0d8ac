//! Medical-profile endpoints: one profile per patient, read and upsert.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_action, ActionResult, ApiContext};
use crate::db::repository::{get_perfil, upsert_perfil};
use crate::models::PerfilMedico;
use crate::session::Claims;
use crate::validation::{validate_perfil, PerfilInput};

use super::{parse_path_id, MSG_BAD_ID};

/// `GET /api/pacientes/:id/perfil` — `null` when the patient has no
/// profile yet; 404 only when the patient is out of scope.
pub async fn detalle(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(paciente_id): Path<String>,
) -> Result<Json<Option<PerfilMedico>>, ApiError> {
    let paciente_id = parse_path_id(&paciente_id)?;
    let conn = ctx.lock_db()?;
    Ok(Json(get_perfil(&conn, &paciente_id, &claims.id)?))
}

/// `POST /acciones/pacientes/:id/perfil` — create-or-replace in one
/// statement; the payload always carries the whole profile.
pub async fn guardar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(paciente_id): Path<String>,
    Json(input): Json<PerfilInput>,
) -> Json<ActionResult<PerfilMedico>> {
    let Ok(paciente_id) = Uuid::parse_str(&paciente_id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    let datos = match validate_perfil(input) {
        Ok(datos) => datos,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        upsert_perfil(conn, &claims.id, &paciente_id, &datos)
    }))
}
