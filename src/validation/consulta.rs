use serde::Deserialize;

use crate::models::{ConsultaUpdate, EstadoConsulta, EstadoPago, NuevaConsulta};

use super::{
    flexible, optional_datetime, optional_enum, optional_text, required_datetime, required_uuid,
    ValidationError, Violations, MAX_LUGAR, MAX_TEXTO,
};

const ESTADOS: &str = "PROGRAMADO, CONFIRMADO, CANCELADO, AUSENTE, COMPLETADO, REAGENDADO";
const ESTADOS_PAGO: &str = "PAGADO, PENDIENTE";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultaInput {
    #[serde(default, deserialize_with = "flexible")]
    pub paciente_id: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub inicio: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub fin: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub estado: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub estado_pago: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub lugar: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub notas: Option<String>,
}

pub fn validate_consulta(input: ConsultaInput) -> Result<NuevaConsulta, ValidationError> {
    let mut v = Violations::default();

    let paciente_id = required_uuid(&mut v, "pacienteId", input.paciente_id);
    let inicio = required_datetime(&mut v, "inicio", input.inicio);
    let fin = required_datetime(&mut v, "fin", input.fin);
    let estado = optional_enum::<EstadoConsulta>(&mut v, "estado", input.estado, ESTADOS)
        .unwrap_or(EstadoConsulta::Programado);
    let estado_pago =
        optional_enum::<EstadoPago>(&mut v, "estadoPago", input.estado_pago, ESTADOS_PAGO)
            .unwrap_or(EstadoPago::Pendiente);
    let lugar = optional_text(&mut v, "lugar", input.lugar, MAX_LUGAR);
    let notas = optional_text(&mut v, "notas", input.notas, MAX_TEXTO);

    if let (Some(inicio), Some(fin)) = (inicio, fin) {
        if fin <= inicio {
            v.push("fin", "debe ser posterior al inicio");
        }
    }

    match (paciente_id, inicio, fin) {
        (Some(paciente_id), Some(inicio), Some(fin)) if v.is_empty() => Ok(NuevaConsulta {
            paciente_id,
            inicio,
            fin,
            estado,
            estado_pago,
            lugar,
            notas,
        }),
        _ => Err(v.into_error()),
    }
}

/// Update schema, derived from the create schema: every field optional,
/// same parsing and enum rules; the time-order rule applies only when
/// both ends are provided.
pub fn validate_consulta_update(input: ConsultaInput) -> Result<ConsultaUpdate, ValidationError> {
    let mut v = Violations::default();

    let update = ConsultaUpdate {
        inicio: optional_datetime(&mut v, "inicio", input.inicio),
        fin: optional_datetime(&mut v, "fin", input.fin),
        estado: optional_enum::<EstadoConsulta>(&mut v, "estado", input.estado, ESTADOS),
        estado_pago: optional_enum::<EstadoPago>(
            &mut v,
            "estadoPago",
            input.estado_pago,
            ESTADOS_PAGO,
        ),
        lugar: optional_text(&mut v, "lugar", input.lugar, MAX_LUGAR),
        notas: optional_text(&mut v, "notas", input.notas, MAX_TEXTO),
    };

    if let (Some(inicio), Some(fin)) = (update.inicio, update.fin) {
        if fin <= inicio {
            v.push("fin", "debe ser posterior al inicio");
        }
    }

    if v.is_empty() {
        Ok(update)
    } else {
        Err(v.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn base_input() -> ConsultaInput {
        ConsultaInput {
            paciente_id: Some(Uuid::new_v4().to_string()),
            inicio: Some("2024-03-01T09:00".into()),
            fin: Some("2024-03-01T09:45".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_applied_when_enums_absent() {
        let nueva = validate_consulta(base_input()).unwrap();
        assert_eq!(nueva.estado, EstadoConsulta::Programado);
        assert_eq!(nueva.estado_pago, EstadoPago::Pendiente);
        assert_eq!(nueva.lugar, None);
    }

    #[test]
    fn explicit_enums_accepted() {
        let mut input = base_input();
        input.estado = Some("CONFIRMADO".into());
        input.estado_pago = Some("PAGADO".into());
        let nueva = validate_consulta(input).unwrap();
        assert_eq!(nueva.estado, EstadoConsulta::Confirmado);
        assert_eq!(nueva.estado_pago, EstadoPago::Pagado);
    }

    #[test]
    fn unknown_estado_rejected() {
        let mut input = base_input();
        input.estado = Some("APROBADO".into());
        let err = validate_consulta(input).unwrap_err();
        assert!(err.cites("estado"));
    }

    #[test]
    fn end_must_follow_start() {
        let mut input = base_input();
        input.fin = Some("2024-03-01T08:00".into());
        let err = validate_consulta(input).unwrap_err();
        assert!(err.cites("fin"));

        let mut input = base_input();
        input.fin = input.inicio.clone();
        assert!(validate_consulta(input).unwrap_err().cites("fin"));
    }

    #[test]
    fn datetime_forms_parse_leniently() {
        for (inicio, fin) in [
            ("2024-03-01 09:00", "2024-03-01 09:45"),
            ("2024-03-01T09:00:00", "2024-03-01T09:45:00"),
            ("2024-03-01T09:00:00Z", "2024-03-01T09:45:00Z"),
        ] {
            let mut input = base_input();
            input.inicio = Some(inicio.into());
            input.fin = Some(fin.into());
            assert!(validate_consulta(input).is_ok(), "failed for {inicio}");
        }
    }

    #[test]
    fn update_can_change_only_payment() {
        let update = validate_consulta_update(ConsultaInput {
            estado_pago: Some("PAGADO".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(update.estado_pago, Some(EstadoPago::Pagado));
        assert_eq!(update.inicio, None);
    }

    #[test]
    fn update_checks_order_when_both_ends_present() {
        let err = validate_consulta_update(ConsultaInput {
            inicio: Some("2024-03-01T10:00".into()),
            fin: Some("2024-03-01T09:00".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.cites("fin"));
    }
}
