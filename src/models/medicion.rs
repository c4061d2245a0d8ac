use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body-metrics snapshot for a patient, optionally tied to a consultation.
/// Metric fields are strictly positive whenever present; history views
/// order by `fecha` descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicion {
    pub id: Uuid,
    pub paciente_id: Uuid,
    pub consulta_id: Option<Uuid>,
    pub fecha: NaiveDate,
    pub peso_kg: Option<f64>,
    pub altura_cm: Option<f64>,
    pub imc: Option<f64>,
    pub notas: Option<String>,
    pub creado_en: NaiveDateTime,
}

/// Validated creation input; the target patient is part of the form
/// (subject to the caller's ownership scope at insert time).
#[derive(Debug, Clone, PartialEq)]
pub struct NuevaMedicion {
    pub paciente_id: Uuid,
    pub consulta_id: Option<Uuid>,
    pub fecha: NaiveDate,
    pub peso_kg: Option<f64>,
    pub altura_cm: Option<f64>,
    pub imc: Option<f64>,
    pub notas: Option<String>,
}

/// Validated partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicionUpdate {
    pub consulta_id: Option<Uuid>,
    pub fecha: Option<NaiveDate>,
    pub peso_kg: Option<f64>,
    pub altura_cm: Option<f64>,
    pub imc: Option<f64>,
    pub notas: Option<String>,
}
