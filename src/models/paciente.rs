use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Sexo;

/// A person under a practitioner's care.
///
/// Every read and mutation is scoped by `(id, usuario_id)`; a patient is
/// never visible outside its owner's scope. `activo` is the soft lifecycle
/// flag; hard delete also exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paciente {
    pub id: Uuid,
    pub usuario_id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub sexo: Option<Sexo>,
    pub altura_cm: Option<f64>,
    pub notas: Option<String>,
    pub activo: bool,
    pub creado_en: NaiveDateTime,
    pub actualizado_en: NaiveDateTime,
}

/// Validated creation input. Ownership comes from the session, never
/// from the form.
#[derive(Debug, Clone, PartialEq)]
pub struct NuevoPaciente {
    pub nombre: String,
    pub apellido: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub sexo: Option<Sexo>,
    pub altura_cm: Option<f64>,
    pub notas: Option<String>,
}

/// Validated partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacienteUpdate {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub sexo: Option<Sexo>,
    pub altura_cm: Option<f64>,
    pub notas: Option<String>,
}
