//! Consultation endpoints: agenda, per-patient history, and actions.
//!
//! Scheduling triggers the outbound notification webhook. Delivery is
//! best-effort: the consultation is committed either way and the action
//! result reports `notificado` so the client can tell the difference.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::{ApiError, MSG_INTERNAL};
use crate::api::types::{domain_message, run_action, run_action_empty, ActionResult, ApiContext};
use crate::db::repository::{
    delete_consulta, get_consultas_por_paciente, get_paciente, insert_consulta, list_consultas,
    update_consulta, Page, DEFAULT_PAGE_SIZE,
};
use crate::models::Consulta;
use crate::notify::AvisoConsulta;
use crate::session::Claims;
use crate::validation::{validate_consulta, validate_consulta_update, ConsultaInput};

use super::{parse_path_id, MSG_BAD_ID};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaQuery {
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub page_size: Option<u32>,
    pub cursor: Option<String>,
}

fn parse_query_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{field}: no es una fecha válida"))),
    }
}

/// `GET /api/consultas` — the practitioner's agenda, newest first,
/// optional inclusive date range.
pub async fn agenda(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<AgendaQuery>,
) -> Result<Json<Page<Consulta>>, ApiError> {
    let desde = parse_query_date("desde", q.desde.as_deref())?;
    let hasta = parse_query_date("hasta", q.hasta.as_deref())?;
    let conn = ctx.lock_db()?;
    let page = list_consultas(
        &conn,
        &claims.id,
        desde,
        hasta,
        q.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        q.cursor.as_deref(),
        ctx.secret(),
    )?;
    Ok(Json(page))
}

/// `GET /api/pacientes/:id/consultas` — one patient's history.
pub async fn por_paciente(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(paciente_id): Path<String>,
) -> Result<Json<Vec<Consulta>>, ApiError> {
    let paciente_id = parse_path_id(&paciente_id)?;
    let conn = ctx.lock_db()?;
    Ok(Json(get_consultas_por_paciente(
        &conn,
        &paciente_id,
        &claims.id,
    )?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultaCreada {
    pub consulta: Consulta,
    /// Whether the confirmation webhook was delivered.
    pub notificado: bool,
}

/// `POST /acciones/consultas/crear` — schedule and notify.
pub async fn crear(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<ConsultaInput>,
) -> Json<ActionResult<ConsultaCreada>> {
    let nueva = match validate_consulta(input) {
        Ok(nueva) => nueva,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };

    // The guard must not survive into the webhook await below.
    let insertada = {
        let conn = match ctx.lock_db() {
            Ok(conn) => conn,
            Err(_) => {
                tracing::error!("database lock poisoned");
                return Json(ActionResult::fail(MSG_INTERNAL));
            }
        };
        insert_consulta(&conn, &claims.id, &nueva).and_then(|consulta| {
            let paciente = get_paciente(&conn, &consulta.paciente_id, &claims.id)?;
            Ok((consulta, paciente))
        })
    };
    let (consulta, paciente) = match insertada {
        Ok(par) => par,
        Err(err) => return Json(ActionResult::fail(domain_message(&err))),
    };

    let notificado = match AvisoConsulta::new(&paciente, &consulta, &claims.nombre) {
        Ok(aviso) => match ctx.webhook.send_aviso(&aviso).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, consulta = %consulta.id, "notification not delivered");
                false
            }
        },
        Err(err) => {
            tracing::warn!(error = %err, consulta = %consulta.id, "notification skipped");
            false
        }
    };

    Json(ActionResult::ok(ConsultaCreada {
        consulta,
        notificado,
    }))
}

/// `POST /acciones/consultas/:id/actualizar`
pub async fn actualizar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(input): Json<ConsultaInput>,
) -> Json<ActionResult<Consulta>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    let cambios = match validate_consulta_update(input) {
        Ok(cambios) => cambios,
        Err(err) => return Json(ActionResult::fail(err.to_string())),
    };
    Json(run_action(&ctx, |conn| {
        update_consulta(conn, &id, &claims.id, &cambios)
    }))
}

/// `POST /acciones/consultas/:id/eliminar` — linked measurements are
/// detached, not deleted.
pub async fn eliminar(
    State(ctx): State<ApiContext>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Json<ActionResult<()>> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Json(ActionResult::fail(MSG_BAD_ID));
    };
    Json(run_action_empty(&ctx, |conn| {
        delete_consulta(conn, &id, &claims.id)
    }))
}
