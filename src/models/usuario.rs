use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated practitioner. Created out of band; owns every patient row.
/// `password_hash` holds the encoded PBKDF2 credential and never reaches
/// API responses (those use view structs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: Uuid,
    pub email: String,
    pub nombre: String,
    pub password_hash: String,
    pub creado_en: NaiveDateTime,
}
