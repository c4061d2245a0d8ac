use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{EstadoConsulta, EstadoPago};

/// Scheduled appointment between practitioner and patient. Scoped by
/// `usuario_id` for all reads and mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consulta {
    pub id: Uuid,
    pub usuario_id: Uuid,
    pub paciente_id: Uuid,
    pub inicio: NaiveDateTime,
    pub fin: NaiveDateTime,
    pub estado: EstadoConsulta,
    pub estado_pago: EstadoPago,
    pub lugar: Option<String>,
    pub notas: Option<String>,
    pub creado_en: NaiveDateTime,
    pub actualizado_en: NaiveDateTime,
}

/// Validated creation input. Defaults: estado PROGRAMADO, pago PENDIENTE.
#[derive(Debug, Clone, PartialEq)]
pub struct NuevaConsulta {
    pub paciente_id: Uuid,
    pub inicio: NaiveDateTime,
    pub fin: NaiveDateTime,
    pub estado: EstadoConsulta,
    pub estado_pago: EstadoPago,
    pub lugar: Option<String>,
    pub notas: Option<String>,
}

/// Validated partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsultaUpdate {
    pub inicio: Option<NaiveDateTime>,
    pub fin: Option<NaiveDateTime>,
    pub estado: Option<EstadoConsulta>,
    pub estado_pago: Option<EstadoPago>,
    pub lugar: Option<String>,
    pub notas: Option<String>,
}
