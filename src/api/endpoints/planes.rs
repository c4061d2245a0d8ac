//! Nutrition-plan endpoints: assembled detail reads and actions.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_action, run_action_empty, ActionResult, ApiContext};
use crate::db::repository::{
    delete_plan, get_plan_detalle, get_planes_por_paciente, insert_plan, update_plan,
};
use crate::models::{PlanDetalle, PlanNutricional};
use crate::session::Claims;
use crate::validation::{validate_plan, validate_plan_update, PlanInput};

use super::{parse_path_id, MSG_BAD_ID};

/// `GET /api/planes/:id` — plan with meals and portions assembled.
pub async fn detalle(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<PlanDetalle>, ApiError> {
    let id = parse_path_id(&id)?;
    let conn = ctx.lock_db()?;
    Ok(Json(get_plan_detalle(&conn, &id, &claims.id)?))
}

/// `GET /api/pacientes/:id/planes` — one patient's plans, newest first.
pub async fn por_paciente(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(paciente_id): Path<String>,
) -> Result<Json<Vec<PlanNutricional>>, ApiError> {
    let paciente_id = parse_path_id(&paciente_id)?;
    let conn = ctx.lock_db()?;
    Ok(Json(get_planes_por_paciente(
        &conn,
        &paciente_id,
        &claims.id,
    )?))
}

/// `POST /acciones/planes/crear` — the whole nest (plan, meals,
/// portions) lands or nothing does.
pub async fn crear(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<PlanInput>,
) -> Json<ActionResult<PlanDetalle>> {
    let nuevo = match validate_plan(input) {
        Ok(nuevo) => nuevo,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        insert_plan(conn, &claims.id, &nuevo)
    }))
}

/// `POST /acciones/planes/:id/actualizar` — plan-level fields only.
pub async fn actualizar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(input): Json<PlanInput>,
) -> Json<ActionResult<PlanNutricional>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    let cambios = match validate_plan_update(input) {
        Ok(cambios) => cambios,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        update_plan(conn, &id, &claims.id, &cambios)
    }))
}

/// `POST /acciones/planes/:id/eliminar`
pub async fn eliminar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Json<ActionResult<()>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    Json(run_action_empty(&ctx, |conn| {
        delete_plan(conn, &id, &claims.id)
    }))
}
