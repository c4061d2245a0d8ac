use serde::Deserialize;

use crate::models::PerfilMedicoDatos;

use super::{flexible, optional_text, ValidationError, Violations, MAX_TEXTO};

/// The eight free-text sections of the medical profile. All optional;
/// the patient id is carried by the route, not the body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfilInput {
    #[serde(default, deserialize_with = "flexible")]
    pub gustos: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub disgustos: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub alergias: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub condiciones: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub medicamentos: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub restricciones: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub objetivos: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub observaciones: Option<String>,
}

pub fn validate_perfil(input: PerfilInput) -> Result<PerfilMedicoDatos, ValidationError> {
    let mut v = Violations::default();

    let datos = PerfilMedicoDatos {
        gustos: optional_text(&mut v, "gustos", input.gustos, MAX_TEXTO),
        disgustos: optional_text(&mut v, "disgustos", input.disgustos, MAX_TEXTO),
        alergias: optional_text(&mut v, "alergias", input.alergias, MAX_TEXTO),
        condiciones: optional_text(&mut v, "condiciones", input.condiciones, MAX_TEXTO),
        medicamentos: optional_text(&mut v, "medicamentos", input.medicamentos, MAX_TEXTO),
        restricciones: optional_text(&mut v, "restricciones", input.restricciones, MAX_TEXTO),
        objetivos: optional_text(&mut v, "objetivos", input.objetivos, MAX_TEXTO),
        observaciones: optional_text(&mut v, "observaciones", input.observaciones, MAX_TEXTO),
    };

    if v.is_empty() {
        Ok(datos)
    } else {
        Err(v.into_error())
    }
}
