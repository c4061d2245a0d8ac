use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog food, shared across practitioners. Macro values are per 100 g.
/// Deletion is refused while any meal association references the food.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alimento {
    pub id: Uuid,
    pub nombre: String,
    pub categoria: Option<String>,
    pub calorias: Option<f64>,
    pub proteinas_g: Option<f64>,
    pub carbohidratos_g: Option<f64>,
    pub grasas_g: Option<f64>,
    pub creado_en: NaiveDateTime,
}

/// Validated creation input.
#[derive(Debug, Clone, PartialEq)]
pub struct NuevoAlimento {
    pub nombre: String,
    pub categoria: Option<String>,
    pub calorias: Option<f64>,
    pub proteinas_g: Option<f64>,
    pub carbohidratos_g: Option<f64>,
    pub grasas_g: Option<f64>,
}

/// Validated partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlimentoUpdate {
    pub nombre: Option<String>,
    pub categoria: Option<String>,
    pub calorias: Option<f64>,
    pub proteinas_g: Option<f64>,
    pub carbohidratos_g: Option<f64>,
    pub grasas_g: Option<f64>,
}
