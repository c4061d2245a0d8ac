//! Food-catalog endpoints. The catalog is shared by every practitioner;
//! a session is still required to touch it.

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_action, run_action_empty, ActionResult, ApiContext};
use crate::db::repository::{
    delete_alimento, get_alimento, insert_alimento, list_alimentos, update_alimento, Page,
    DEFAULT_PAGE_SIZE,
};
use crate::models::Alimento;
use crate::validation::{validate_alimento, validate_alimento_update, AlimentoInput};

use super::{parse_path_id, PageQuery, MSG_BAD_ID};

/// `GET /api/alimentos` — catalog listing, filter over name and
/// category.
pub async fn catalogo(
    State(ctx): State<ApiContext>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<Alimento>>, ApiError> {
    let conn = ctx.lock_db()?;
    let page = list_alimentos(
        &conn,
        q.filtro.as_deref(),
        q.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        q.cursor.as_deref(),
        ctx.secret(),
    )?;
    Ok(Json(page))
}

/// `GET /api/alimentos/:id`
pub async fn detalle(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Alimento>, ApiError> {
    let id = parse_path_id(&id)?;
    let conn = ctx.lock_db()?;
    Ok(Json(get_alimento(&conn, &id)?))
}

/// `POST /acciones/alimentos/crear`
pub async fn crear(
    State(ctx): State<ApiContext>,
    Json(input): Json<AlimentoInput>,
) -> Json<ActionResult<Alimento>> {
    let nuevo = match validate_alimento(input) {
        Ok(nuevo) => nuevo,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| insert_alimento(conn, &nuevo)))
}

/// `POST /acciones/alimentos/:id/actualizar`
pub async fn actualizar(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<AlimentoInput>,
) -> Json<ActionResult<Alimento>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    let cambios = match validate_alimento_update(input) {
        Ok(cambios) => cambios,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        update_alimento(conn, &id, &cambios)
    }))
}

/// `POST /acciones/alimentos/:id/eliminar` — refused while any plan
/// meal still references the food.
pub async fn eliminar(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Json<ActionResult<()>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    Json(run_action_empty(&ctx, |conn| delete_alimento(conn, &id)))
}
