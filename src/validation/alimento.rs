use serde::Deserialize;

use crate::models::{AlimentoUpdate, NuevoAlimento};

use super::{
    flexible, optional_non_negative, optional_text, required_text, ValidationError, Violations,
    MAX_NOMBRE,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlimentoInput {
    #[serde(default, deserialize_with = "flexible")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub categoria: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub calorias: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub proteinas_g: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub carbohidratos_g: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub grasas_g: Option<String>,
}

pub fn validate_alimento(input: AlimentoInput) -> Result<NuevoAlimento, ValidationError> {
    let mut v = Violations::default();

    let nombre = required_text(&mut v, "nombre", input.nombre, MAX_NOMBRE);
    let categoria = optional_text(&mut v, "categoria", input.categoria, MAX_NOMBRE);
    let calorias = optional_non_negative(&mut v, "calorias", input.calorias);
    let proteinas_g = optional_non_negative(&mut v, "proteinasG", input.proteinas_g);
    let carbohidratos_g = optional_non_negative(&mut v, "carbohidratosG", input.carbohidratos_g);
    let grasas_g = optional_non_negative(&mut v, "grasasG", input.grasas_g);

    match nombre {
        Some(nombre) if v.is_empty() => Ok(NuevoAlimento {
            nombre,
            categoria,
            calorias,
            proteinas_g,
            carbohidratos_g,
            grasas_g,
        }),
        _ => Err(v.into_error()),
    }
}

/// Update schema, derived from the create schema: no field required.
pub fn validate_alimento_update(input: AlimentoInput) -> Result<AlimentoUpdate, ValidationError> {
    let mut v = Violations::default();

    let update = AlimentoUpdate {
        nombre: optional_text(&mut v, "nombre", input.nombre, MAX_NOMBRE),
        categoria: optional_text(&mut v, "categoria", input.categoria, MAX_NOMBRE),
        calorias: optional_non_negative(&mut v, "calorias", input.calorias),
        proteinas_g: optional_non_negative(&mut v, "proteinasG", input.proteinas_g),
        carbohidratos_g: optional_non_negative(&mut v, "carbohidratosG", input.carbohidratos_g),
        grasas_g: optional_non_negative(&mut v, "grasasG", input.grasas_g),
    };

    if v.is_empty() {
        Ok(update)
    } else {
        Err(v.into_error())
    }
}
