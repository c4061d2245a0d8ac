use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Qualitative clinical context, 1:1 with a patient (unique on
/// `paciente_id`). Writes go through the upsert in the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfilMedico {
    pub id: Uuid,
    pub paciente_id: Uuid,
    pub gustos: Option<String>,
    pub disgustos: Option<String>,
    pub alergias: Option<String>,
    pub condiciones: Option<String>,
    pub medicamentos: Option<String>,
    pub restricciones: Option<String>,
    pub objetivos: Option<String>,
    pub observaciones: Option<String>,
    pub creado_en: NaiveDateTime,
    pub actualizado_en: NaiveDateTime,
}

/// Validated upsert payload: the eight free-text sections. The target
/// patient travels separately as the upsert key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerfilMedicoDatos {
    pub gustos: Option<String>,
    pub disgustos: Option<String>,
    pub alergias: Option<String>,
    pub condiciones: Option<String>,
    pub medicamentos: Option<String>,
    pub restricciones: Option<String>,
    pub objetivos: Option<String>,
    pub observaciones: Option<String>,
}
