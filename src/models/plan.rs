use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alimento::Alimento;
use super::enums::EstadoPlan;

/// Nutrition plan for one patient: an ordered sequence of meals, each an
/// ordered sequence of food portions from the shared catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNutricional {
    pub id: Uuid,
    pub paciente_id: Uuid,
    pub fecha_inicio: NaiveDate,
    pub estado: EstadoPlan,
    pub tipo: Option<String>,
    pub notas: Option<String>,
    pub creado_en: NaiveDateTime,
    pub actualizado_en: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comida {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub nombre: String,
    pub orden: i32,
    pub notas: Option<String>,
}

/// One food portion inside a meal. `alimento_id` points at the global
/// catalog; `cantidad_g` is the portion size in grams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComidaAlimento {
    pub id: Uuid,
    pub comida_id: Uuid,
    pub alimento_id: Uuid,
    pub cantidad_g: f64,
    pub orden: i32,
}

/// Validated creation input: the whole plan with its nested meals and
/// portions, inserted in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NuevoPlan {
    pub paciente_id: Uuid,
    pub fecha_inicio: NaiveDate,
    pub estado: EstadoPlan,
    pub tipo: Option<String>,
    pub notas: Option<String>,
    pub comidas: Vec<NuevaComida>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NuevaComida {
    pub nombre: String,
    pub orden: i32,
    pub notas: Option<String>,
    pub alimentos: Vec<NuevaPorcion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NuevaPorcion {
    pub alimento_id: Uuid,
    pub cantidad_g: f64,
    pub orden: i32,
}

/// Validated partial update of plan-level fields (meals are replaced
/// through plan re-creation, not patched).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanUpdate {
    pub fecha_inicio: Option<NaiveDate>,
    pub estado: Option<EstadoPlan>,
    pub tipo: Option<String>,
    pub notas: Option<String>,
}

// ─── Assembled detail views ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetalle {
    pub plan: PlanNutricional,
    pub comidas: Vec<ComidaDetalle>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComidaDetalle {
    pub comida: Comida,
    pub alimentos: Vec<AlimentoPorcion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlimentoPorcion {
    pub alimento: Alimento,
    pub cantidad_g: f64,
    pub orden: i32,
}
