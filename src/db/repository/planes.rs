use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{
    AlimentoPorcion, Comida, ComidaDetalle, NuevoPlan, PlanDetalle, PlanNutricional, PlanUpdate,
};

use super::pacientes::owns_paciente;
use super::{fmt_date, fmt_datetime, now, parse_date, parse_datetime, parse_enum, parse_uuid};

/// Insert a plan with its meals and portions in one transaction. The plan
/// row is scope-checked; an unknown catalog food anywhere in the nest
/// aborts the whole insert.
pub fn insert_plan(
    conn: &Connection,
    usuario_id: &Uuid,
    datos: &NuevoPlan,
) -> Result<PlanDetalle, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let ahora = fmt_datetime(&now());
    let plan_id = Uuid::new_v4();

    let affected = tx.execute(
        "INSERT INTO planes_nutricionales (id, paciente_id, fecha_inicio, estado,
                                           tipo, notas, creado_en, actualizado_en)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7
         WHERE EXISTS (SELECT 1 FROM pacientes WHERE id = ?2 AND usuario_id = ?8)",
        params![
            plan_id.to_string(),
            datos.paciente_id.to_string(),
            fmt_date(&datos.fecha_inicio),
            datos.estado.as_str(),
            datos.tipo,
            datos.notas,
            ahora,
            usuario_id.to_string(),
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: datos.paciente_id.to_string(),
        });
    }

    for comida in &datos.comidas {
        let comida_id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO comidas (id, plan_id, nombre, orden, notas)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comida_id.to_string(),
                plan_id.to_string(),
                comida.nombre,
                comida.orden,
                comida.notas,
            ],
        )?;
        for porcion in &comida.alimentos {
            let insertado = tx.execute(
                "INSERT INTO comida_alimentos (id, comida_id, alimento_id, cantidad_g, orden)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    comida_id.to_string(),
                    porcion.alimento_id.to_string(),
                    porcion.cantidad_g,
                    porcion.orden,
                ],
            );
            match insertado {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    // Early return drops the transaction and rolls back.
                    return Err(DatabaseError::ConstraintViolation(format!(
                        "el alimento {} no existe en el catálogo",
                        porcion.alimento_id
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tx.commit()?;
    get_plan_detalle(conn, &plan_id, usuario_id)
}

/// Fetch one plan row within the practitioner's scope.
pub fn get_plan(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<PlanNutricional, DatabaseError> {
    conn.query_row(
        "SELECT pl.id, pl.paciente_id, pl.fecha_inicio, pl.estado, pl.tipo, pl.notas,
                pl.creado_en, pl.actualizado_en
         FROM planes_nutricionales pl
         JOIN pacientes p ON p.id = pl.paciente_id
         WHERE pl.id = ?1 AND p.usuario_id = ?2",
        params![id.to_string(), usuario_id.to_string()],
        row_to_plan,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "plan".into(),
        id: id.to_string(),
    })
}

/// Assemble a plan with its meals in order and each meal's portions with
/// the catalog food joined in.
pub fn get_plan_detalle(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<PlanDetalle, DatabaseError> {
    let plan = get_plan(conn, id, usuario_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, plan_id, nombre, orden, notas
         FROM comidas WHERE plan_id = ?1
         ORDER BY orden, id",
    )?;
    let filas = stmt.query_map(params![id.to_string()], row_to_comida)?;
    let comidas_planas = filas
        .collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)?;

    let mut stmt = conn.prepare(
        "SELECT a.id, a.nombre, a.categoria, a.calorias, a.proteinas_g,
                a.carbohidratos_g, a.grasas_g, a.creado_en,
                ca.cantidad_g, ca.orden
         FROM comida_alimentos ca
         JOIN alimentos a ON a.id = ca.alimento_id
         WHERE ca.comida_id = ?1
         ORDER BY ca.orden, ca.id",
    )?;
    let mut comidas = Vec::with_capacity(comidas_planas.len());
    for comida in comidas_planas {
        let filas = stmt.query_map(params![comida.id.to_string()], row_to_porcion)?;
        let alimentos = filas
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        comidas.push(ComidaDetalle { comida, alimentos });
    }

    Ok(PlanDetalle { plan, comidas })
}

/// All plans of one patient in scope, newest start date first.
pub fn get_planes_por_paciente(
    conn: &Connection,
    paciente_id: &Uuid,
    usuario_id: &Uuid,
) -> Result<Vec<PlanNutricional>, DatabaseError> {
    if !owns_paciente(conn, usuario_id, paciente_id)? {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: paciente_id.to_string(),
        });
    }
    let mut stmt = conn.prepare(
        "SELECT id, paciente_id, fecha_inicio, estado, tipo, notas, creado_en, actualizado_en
         FROM planes_nutricionales
         WHERE paciente_id = ?1
         ORDER BY fecha_inicio DESC, creado_en DESC",
    )?;
    let rows = stmt.query_map(params![paciente_id.to_string()], row_to_plan)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)
}

/// Apply a partial update to plan-level fields. Meals are not patched
/// here; a changed meal structure is a new plan.
pub fn update_plan(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
    cambios: &PlanUpdate,
) -> Result<PlanNutricional, DatabaseError> {
    let mut sets: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(fecha) = &cambios.fecha_inicio {
        sets.push(format!("fecha_inicio = ?{param_idx}"));
        params_vec.push(Box::new(fmt_date(fecha)));
        param_idx += 1;
    }
    if let Some(estado) = &cambios.estado {
        sets.push(format!("estado = ?{param_idx}"));
        params_vec.push(Box::new(estado.as_str()));
        param_idx += 1;
    }
    if let Some(tipo) = &cambios.tipo {
        sets.push(format!("tipo = ?{param_idx}"));
        params_vec.push(Box::new(tipo.clone()));
        param_idx += 1;
    }
    if let Some(notas) = &cambios.notas {
        sets.push(format!("notas = ?{param_idx}"));
        params_vec.push(Box::new(notas.clone()));
        param_idx += 1;
    }

    if sets.is_empty() {
        return get_plan(conn, id, usuario_id);
    }

    sets.push(format!("actualizado_en = ?{param_idx}"));
    params_vec.push(Box::new(fmt_datetime(&now())));
    param_idx += 1;

    let sql = format!(
        "UPDATE planes_nutricionales SET {} WHERE id = ?{} \
         AND paciente_id IN (SELECT id FROM pacientes WHERE usuario_id = ?{})",
        sets.join(", "),
        param_idx,
        param_idx + 1
    );
    params_vec.push(Box::new(id.to_string()));
    params_vec.push(Box::new(usuario_id.to_string()));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let affected = conn.execute(&sql, param_refs.as_slice())?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "plan".into(),
            id: id.to_string(),
        });
    }
    get_plan(conn, id, usuario_id)
}

/// Delete a plan in scope; meals and portions go with it through the
/// schema's cascades.
pub fn delete_plan(conn: &Connection, id: &Uuid, usuario_id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM planes_nutricionales WHERE id = ?1
         AND paciente_id IN (SELECT id FROM pacientes WHERE usuario_id = ?2)",
        params![id.to_string(), usuario_id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "plan".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_plan(row: &rusqlite::Row) -> Result<PlanNutricional, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let paciente_str: String = row.get(1)?;
    let inicio_str: String = row.get(2)?;
    let estado_str: String = row.get(3)?;
    let creado_str: String = row.get(6)?;
    let actualizado_str: String = row.get(7)?;

    Ok(PlanNutricional {
        id: parse_uuid(0, &id_str)?,
        paciente_id: parse_uuid(1, &paciente_str)?,
        fecha_inicio: parse_date(2, &inicio_str)?,
        estado: parse_enum(3, &estado_str)?,
        tipo: row.get(4)?,
        notas: row.get(5)?,
        creado_en: parse_datetime(6, &creado_str)?,
        actualizado_en: parse_datetime(7, &actualizado_str)?,
    })
}

fn row_to_comida(row: &rusqlite::Row) -> Result<Comida, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let plan_str: String = row.get(1)?;

    Ok(Comida {
        id: parse_uuid(0, &id_str)?,
        plan_id: parse_uuid(1, &plan_str)?,
        nombre: row.get(2)?,
        orden: row.get(3)?,
        notas: row.get(4)?,
    })
}

fn row_to_porcion(row: &rusqlite::Row) -> Result<AlimentoPorcion, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let creado_str: String = row.get(7)?;

    Ok(AlimentoPorcion {
        alimento: crate::models::Alimento {
            id: parse_uuid(0, &id_str)?,
            nombre: row.get(1)?,
            categoria: row.get(2)?,
            calorias: row.get(3)?,
            proteinas_g: row.get(4)?,
            carbohidratos_g: row.get(5)?,
            grasas_g: row.get(6)?,
            creado_en: parse_datetime(7, &creado_str)?,
        },
        cantidad_g: row.get(8)?,
        orden: row.get(9)?,
    })
}
