use serde::Deserialize;

use crate::models::{EstadoPlan, NuevaComida, NuevaPorcion, NuevoPlan, PlanUpdate};

use super::{
    flexible, optional_date, optional_enum, optional_text, required_date, required_positive,
    required_text, required_uuid, ValidationError, Violations, MAX_NOMBRE, MAX_TEXTO,
};

const ESTADOS: &str = "BORRADOR, ACTIVO, FINALIZADO";

/// Whole-plan input: plan fields plus the nested meal/portion arrays.
/// Meal and portion order comes from array position.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
    #[serde(default, deserialize_with = "flexible")]
    pub paciente_id: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub fecha_inicio: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub estado: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub tipo: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub notas: Option<String>,
    #[serde(default)]
    pub comidas: Vec<ComidaInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComidaInput {
    #[serde(default, deserialize_with = "flexible")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub notas: Option<String>,
    #[serde(default)]
    pub alimentos: Vec<PorcionInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PorcionInput {
    #[serde(default, deserialize_with = "flexible")]
    pub alimento_id: Option<String>,
    #[serde(default, deserialize_with = "flexible")]
    pub cantidad_g: Option<String>,
}

pub fn validate_plan(input: PlanInput) -> Result<NuevoPlan, ValidationError> {
    let mut v = Violations::default();

    let paciente_id = required_uuid(&mut v, "pacienteId", input.paciente_id);
    let fecha_inicio = required_date(&mut v, "fechaInicio", input.fecha_inicio);
    let estado = optional_enum::<EstadoPlan>(&mut v, "estado", input.estado, ESTADOS)
        .unwrap_or(EstadoPlan::Borrador);
    let tipo = optional_text(&mut v, "tipo", input.tipo, MAX_NOMBRE);
    let notas = optional_text(&mut v, "notas", input.notas, MAX_TEXTO);

    let mut comidas = Vec::with_capacity(input.comidas.len());
    for (i, comida) in input.comidas.into_iter().enumerate() {
        if let Some(c) = validate_comida(&mut v, i, comida) {
            comidas.push(c);
        }
    }

    match (paciente_id, fecha_inicio) {
        (Some(paciente_id), Some(fecha_inicio)) if v.is_empty() => Ok(NuevoPlan {
            paciente_id,
            fecha_inicio,
            estado,
            tipo,
            notas,
            comidas,
        }),
        _ => Err(v.into_error()),
    }
}

fn validate_comida(v: &mut Violations, i: usize, input: ComidaInput) -> Option<NuevaComida> {
    let nombre = required_text(v, &format!("comidas[{i}].nombre"), input.nombre, MAX_NOMBRE);
    let notas = optional_text(v, &format!("comidas[{i}].notas"), input.notas, MAX_TEXTO);

    let mut alimentos = Vec::with_capacity(input.alimentos.len());
    for (j, porcion) in input.alimentos.into_iter().enumerate() {
        let alimento_id = required_uuid(
            v,
            &format!("comidas[{i}].alimentos[{j}].alimentoId"),
            porcion.alimento_id,
        );
        let cantidad_g = required_positive(
            v,
            &format!("comidas[{i}].alimentos[{j}].cantidadG"),
            porcion.cantidad_g,
            None,
        );
        if let (Some(alimento_id), Some(cantidad_g)) = (alimento_id, cantidad_g) {
            alimentos.push(NuevaPorcion {
                alimento_id,
                cantidad_g,
                orden: j as i32,
            });
        }
    }

    Some(NuevaComida {
        nombre: nombre?,
        orden: i as i32,
        notas,
        alimentos,
    })
}

/// Plan-level update, derived from the create schema; the meal tree is
/// not patched here.
pub fn validate_plan_update(input: PlanInput) -> Result<PlanUpdate, ValidationError> {
    let mut v = Violations::default();

    let update = PlanUpdate {
        fecha_inicio: optional_date(&mut v, "fechaInicio", input.fecha_inicio),
        estado: optional_enum::<EstadoPlan>(&mut v, "estado", input.estado, ESTADOS),
        tipo: optional_text(&mut v, "tipo", input.tipo, MAX_NOMBRE),
        notas: optional_text(&mut v, "notas", input.notas, MAX_TEXTO),
    };

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

    fn plan_json(comidas: serde_json::Value) -> PlanInput {
        serde_json::from_value(serde_json::json!({
            "pacienteId": Uuid::new_v4().to_string(),
            "fechaInicio": "2024-05-01",
            "comidas": comidas,
        }))
        .unwrap()
    }

    #[test]
    fn empty_plan_defaults_to_borrador() {
        let nuevo = validate_plan(plan_json(serde_json::json!([]))).unwrap();
        assert_eq!(nuevo.estado, EstadoPlan::Borrador);
        assert!(nuevo.comidas.is_empty());
    }

    #[test]
    fn meal_and_portion_order_follows_input() {
        let a1 = Uuid::new_v4().to_string();
        let a2 = Uuid::new_v4().to_string();
        let nuevo = validate_plan(plan_json(serde_json::json!([
            {"nombre": "Desayuno", "alimentos": [
                {"alimentoId": a1, "cantidadG": 50},
                {"alimentoId": a2, "cantidadG": "120.5"},
            ]},
            {"nombre": "Almuerzo", "alimentos": []},
        ])))
        .unwrap();

        assert_eq!(nuevo.comidas.len(), 2);
        assert_eq!(nuevo.comidas[0].nombre, "Desayuno");
        assert_eq!(nuevo.comidas[0].orden, 0);
        assert_eq!(nuevo.comidas[1].orden, 1);
        assert_eq!(nuevo.comidas[0].alimentos[0].orden, 0);
        assert_eq!(nuevo.comidas[0].alimentos[1].cantidad_g, 120.5);
    }

    #[test]
    fn nested_violations_name_their_position() {
        let err = validate_plan(plan_json(serde_json::json!([
            {"nombre": "Desayuno", "alimentos": [
                {"alimentoId": "no-uuid", "cantidadG": 0},
            ]},
            {"nombre": ""},
        ])))
        .unwrap_err();

        assert!(err.cites("comidas[0].alimentos[0].alimentoId"));
        assert!(err.cites("comidas[0].alimentos[0].cantidadG"));
        assert!(err.cites("comidas[1].nombre"));
    }

    #[test]
    fn missing_patient_and_date_rejected() {
        let err = validate_plan(PlanInput::default()).unwrap_err();
        assert!(err.cites("pacienteId"));
        assert!(err.cites("fechaInicio"));
    }

    #[test]
    fn update_validates_estado_set() {
        let err = validate_plan_update(PlanInput {
            estado: Some("VIGENTE".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.cites("estado"));

        let update = validate_plan_update(PlanInput {
            estado: Some("ACTIVO".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(update.estado, Some(EstadoPlan::Activo));
    }
}
