use serde::Deserialize;

use crate::models::{MedicionUpdate, NuevaMedicion};

use super::{
    flexible, optional_date, optional_positive, optional_text, optional_uuid, required_date,
    required_uuid, ValidationError, Violations, MAX_ALTURA_CM, MAX_TEXTO,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicionInput {
    #[serde(default, deserialize_with = "flexible")]
    pub paciente_id: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub consulta_id: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub fecha: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub peso_kg: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub altura_cm: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub imc: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub notas: Option<String>,
}

pub fn validate_medicion(input: MedicionInput) -> Result<NuevaMedicion, ValidationError> {
    let mut v = Violations::default();

    let paciente_id = required_uuid(&mut v, "pacienteId", input.paciente_id);
    let consulta_id = optional_uuid(&mut v, "consultaId", input.consulta_id);
    let fecha = required_date(&mut v, "fecha", input.fecha);
    let peso_kg = optional_positive(&mut v, "pesoKg", input.peso_kg, None);
    let altura_cm = optional_positive(&mut v, "alturaCm", input.altura_cm, Some(MAX_ALTURA_CM));
    let imc = optional_positive(&mut v, "imc", input.imc, None);
    let notas = optional_text(&mut v, "notas", input.notas, MAX_TEXTO);

    match (paciente_id, fecha) {
        (Some(paciente_id), Some(fecha)) if v.is_empty() => Ok(NuevaMedicion {
            paciente_id,
            consulta_id,
            fecha,
            peso_kg,
            altura_cm,
            imc,
            notas,
        }),
        _ => Err(v.into_error()),
    }
}

/// Update schema, derived from the create schema: the target patient is
/// fixed, everything else optional under the same rules.
pub fn validate_medicion_update(input: MedicionInput) -> Result<MedicionUpdate, ValidationError> {
    let mut v = Violations::default();

    let update = MedicionUpdate {
        consulta_id: optional_uuid(&mut v, "consultaId", input.consulta_id),
        fecha: optional_date(&mut v, "fecha", input.fecha),
        peso_kg: optional_positive(&mut v, "pesoKg", input.peso_kg, None),
        altura_cm: optional_positive(&mut v, "alturaCm", input.altura_cm, Some(MAX_ALTURA_CM)),
        imc: optional_positive(&mut v, "imc", input.imc, None),
        notas: optional_text(&mut v, "notas", input.notas, MAX_TEXTO),
    };

    if v.is_empty() {
        Ok(update)
    } else {
        Err(v.into_error())
    }
}
