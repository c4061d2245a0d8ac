use serde::Deserialize;

use crate::models::{NuevoPaciente, PacienteUpdate, Sexo};

use super::{
    flexible, optional_date, optional_email, optional_enum, optional_positive, optional_text,
    required_text, ValidationError, Violations, MAX_ALTURA_CM, MAX_NOMBRE, MAX_TELEFONO, MAX_TEXTO,
};

/// Raw patient form/JSON input. Every field arrives as an optional
/// scalar; the validators below decide what is required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacienteInput {
    #[serde(default, deserialize_with = "flexible")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub apellido: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub telefono: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub fecha_nacimiento: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub sexo: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub altura_cm: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub notas: Option<String>,
}

pub fn validate_paciente(input: PacienteInput) -> Result<NuevoPaciente, ValidationError> {
    let mut v = Violations::default();

    let nombre = required_text(&mut v, "nombre", input.nombre, MAX_NOMBRE);
    let apellido = required_text(&mut v, "apellido", input.apellido, MAX_NOMBRE);
    let email = optional_email(&mut v, "email", input.email);
    let telefono = optional_text(&mut v, "telefono", input.telefono, MAX_TELEFONO);
    let fecha_nacimiento = optional_date(&mut v, "fechaNacimiento", input.fecha_nacimiento);
    let sexo = optional_enum::<Sexo>(&mut v, "sexo", input.sexo, "F, M, O");
    let altura_cm = optional_positive(&mut v, "alturaCm", input.altura_cm, Some(MAX_ALTURA_CM));
    let notas = optional_text(&mut v, "notas", input.notas, MAX_TEXTO);

    match (nombre, apellido) {
        (Some(nombre), Some(apellido)) if v.is_empty() => Ok(NuevoPaciente {
            nombre,
            apellido,
            email,
            telefono,
            fecha_nacimiento,
            sexo,
            altura_cm,
            notas,
        }),
        _ => Err(v.into_error()),
    }
}

/// Update schema, derived from the create schema: same field rules, no
/// field required.
pub fn validate_paciente_update(input: PacienteInput) -> Result<PacienteUpdate, ValidationError> {
    let mut v = Violations::default();

    let update = PacienteUpdate {
        nombre: optional_text(&mut v, "nombre", input.nombre, MAX_NOMBRE),
        apellido: optional_text(&mut v, "apellido", input.apellido, MAX_NOMBRE),
        email: optional_email(&mut v, "email", input.email),
        telefono: optional_text(&mut v, "telefono", input.telefono, MAX_TELEFONO),
        fecha_nacimiento: optional_date(&mut v, "fechaNacimiento", input.fecha_nacimiento),
        sexo: optional_enum::<Sexo>(&mut v, "sexo", input.sexo, "F, M, O"),
        altura_cm: optional_positive(&mut v, "alturaCm", input.altura_cm, Some(MAX_ALTURA_CM)),
        notas: optional_text(&mut v, "notas", input.notas, MAX_TEXTO),
    };

    if v.is_empty() {
        Ok(update)
    } else {
        Err(v.into_error())
    }
}
