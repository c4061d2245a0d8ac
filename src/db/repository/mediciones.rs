use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Medicion, MedicionUpdate, NuevaMedicion};

use super::pacientes::owns_paciente;
use super::{fmt_date, fmt_datetime, now, parse_date, parse_datetime, parse_uuid};

/// Insert a measurement. The target patient, and the linked consultation
/// when one is given, must be inside the caller's scope; the guard and the
/// insert are a single statement.
pub fn insert_medicion(
    conn: &Connection,
    usuario_id: &Uuid,
    datos: &NuevaMedicion,
) -> Result<Medicion, DatabaseError> {
    let medicion = Medicion {
        id: Uuid::new_v4(),
        paciente_id: datos.paciente_id,
        consulta_id: datos.consulta_id,
        fecha: datos.fecha,
        peso_kg: datos.peso_kg,
        altura_cm: datos.altura_cm,
        imc: datos.imc,
        notas: datos.notas.clone(),
        creado_en: now(),
    };
    let affected = conn.execute(
        "INSERT INTO mediciones (id, paciente_id, consulta_id, fecha, peso_kg,
                                 altura_cm, imc, notas, creado_en)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
         WHERE EXISTS (SELECT 1 FROM pacientes WHERE id = ?2 AND usuario_id = ?10)
           AND (?3 IS NULL
                OR EXISTS (SELECT 1 FROM consultas WHERE id = ?3 AND usuario_id = ?10))",
        params![
            medicion.id.to_string(),
            medicion.paciente_id.to_string(),
            medicion.consulta_id.map(|c| c.to_string()),
            fmt_date(&medicion.fecha),
            medicion.peso_kg,
            medicion.altura_cm,
            medicion.imc,
            medicion.notas,
            fmt_datetime(&medicion.creado_en),
            usuario_id.to_string(),
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: datos.paciente_id.to_string(),
        });
    }
    Ok(medicion)
}

/// Fetch one measurement within the practitioner's scope.
pub fn get_medicion(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<Medicion, DatabaseError> {
    conn.query_row(
        "SELECT m.id, m.paciente_id, m.consulta_id, m.fecha, m.peso_kg, m.altura_cm,
                m.imc, m.notas, m.creado_en
         FROM mediciones m
         JOIN pacientes p ON p.id = m.paciente_id
         WHERE m.id = ?1 AND p.usuario_id = ?2",
        params![id.to_string(), usuario_id.to_string()],
        row_to_medicion,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "medicion".into(),
        id: id.to_string(),
    })
}

/// Measurement history for a patient in scope, newest first.
pub fn get_mediciones_por_paciente(
    conn: &Connection,
    paciente_id: &Uuid,
    usuario_id: &Uuid,
) -> Result<Vec<Medicion>, DatabaseError> {
    if !owns_paciente(conn, usuario_id, paciente_id)? {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: paciente_id.to_string(),
        });
    }
    let mut stmt = conn.prepare(
        "SELECT id, paciente_id, consulta_id, fecha, peso_kg, altura_cm, imc, notas, creado_en
         FROM mediciones
         WHERE paciente_id = ?1
         ORDER BY fecha DESC, creado_en DESC",
    )?;
    let rows = stmt.query_map(params![paciente_id.to_string()], row_to_medicion)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)
}

/// Apply a partial update to a measurement in scope. When the update
/// re-links a consultation, that consultation must be in scope too.
pub fn update_medicion(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
    cambios: &MedicionUpdate,
) -> Result<Medicion, DatabaseError> {
    let mut sets: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(consulta_id) = &cambios.consulta_id {
        sets.push(format!("consulta_id = ?{param_idx}"));
        params_vec.push(Box::new(consulta_id.to_string()));
        param_idx += 1;
    }
    if let Some(fecha) = &cambios.fecha {
        sets.push(format!("fecha = ?{param_idx}"));
        params_vec.push(Box::new(fmt_date(fecha)));
        param_idx += 1;
    }
    if let Some(peso) = cambios.peso_kg {
        sets.push(format!("peso_kg = ?{param_idx}"));
        params_vec.push(Box::new(peso));
        param_idx += 1;
    }
    if let Some(altura) = cambios.altura_cm {
        sets.push(format!("altura_cm = ?{param_idx}"));
        params_vec.push(Box::new(altura));
        param_idx += 1;
    }
    if let Some(imc) = cambios.imc {
        sets.push(format!("imc = ?{param_idx}"));
        params_vec.push(Box::new(imc));
        param_idx += 1;
    }
    if let Some(notas) = &cambios.notas {
        sets.push(format!("notas = ?{param_idx}"));
        params_vec.push(Box::new(notas.clone()));
        param_idx += 1;
    }

    if sets.is_empty() {
        return get_medicion(conn, id, usuario_id);
    }

    let id_param = param_idx;
    let usuario_param = param_idx + 1;
    params_vec.push(Box::new(id.to_string()));
    params_vec.push(Box::new(usuario_id.to_string()));
    param_idx += 2;

    let mut sql = format!(
        "UPDATE mediciones SET {} WHERE id = ?{id_param} \
         AND paciente_id IN (SELECT id FROM pacientes WHERE usuario_id = ?{usuario_param})",
        sets.join(", ")
    );
    if let Some(consulta_id) = &cambios.consulta_id {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM consultas \
               WHERE id = ?{param_idx} AND usuario_id = ?{usuario_param})"
        ));
        params_vec.push(Box::new(consulta_id.to_string()));
        param_idx += 1;
    }
    let _ = param_idx;

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let affected = conn.execute(&sql, param_refs.as_slice())?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medicion".into(),
            id: id.to_string(),
        });
    }
    get_medicion(conn, id, usuario_id)
}

/// Delete a measurement in scope; the check and the delete are one
/// statement.
pub fn delete_medicion(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM mediciones WHERE id = ?1
         AND paciente_id IN (SELECT id FROM pacientes WHERE usuario_id = ?2)",
        params![id.to_string(), usuario_id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medicion".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_medicion(row: &rusqlite::Row) -> Result<Medicion, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let paciente_str: String = row.get(1)?;
    let consulta_str: Option<String> = row.get(2)?;
    let fecha_str: String = row.get(3)?;
    let creado_str: String = row.get(8)?;

    Ok(Medicion {
        id: parse_uuid(0, &id_str)?,
        paciente_id: parse_uuid(1, &paciente_str)?,
        consulta_id: consulta_str
            .as_deref()
            .map(|s| parse_uuid(2, s))
            .transpose()?,
        fecha: parse_date(3, &fecha_str)?,
        peso_kg: row.get(4)?,
        altura_cm: row.get(5)?,
        imc: row.get(6)?,
        notas: row.get(7)?,
        creado_en: parse_datetime(8, &creado_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{create_usuario, insert_consulta, insert_paciente};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{EstadoConsulta, EstadoPago, NuevaConsulta, NuevoPaciente};
    use chrono::NaiveDate;

    fn test_db() -> (Connection, Uuid, Uuid) {
        let conn = open_memory_database().unwrap();
        let usuario = create_usuario(&conn, "laura@clinica.ar", "Laura", "clave")
            .unwrap()
            .id;
        let paciente = insert_paciente(
            &conn,
            &usuario,
            &NuevoPaciente {
                nombre: "Ana".into(),
                apellido: "García".into(),
                email: None,
                telefono: None,
                fecha_nacimiento: None,
                sexo: None,
                altura_cm: None,
                notas: None,
            },
        )
        .unwrap()
        .id;
        (conn, usuario, paciente)
    }

    fn nueva(paciente_id: Uuid, fecha: NaiveDate, peso: f64) -> NuevaMedicion {
        NuevaMedicion {
            paciente_id,
            consulta_id: None,
            fecha,
            peso_kg: Some(peso),
            altura_cm: Some(165.0),
            imc: None,
            notas: None,
        }
    }

    #[test]
    fn history_is_newest_first() {
        let (conn, usuario, paciente) = test_db();
        for (dia, peso) in [(10, 70.0), (25, 68.5), (3, 71.2)] {
            insert_medicion(
                &conn,
                &usuario,
                &nueva(paciente, NaiveDate::from_ymd_opt(2026, 1, dia).unwrap(), peso),
            )
            .unwrap();
        }

        let historial = get_mediciones_por_paciente(&conn, &paciente, &usuario).unwrap();
        let pesos: Vec<_> = historial.iter().filter_map(|m| m.peso_kg).collect();
        assert_eq!(pesos, vec![68.5, 70.0, 71.2]);
    }

    #[test]
    fn insert_for_foreign_patient_is_not_found_and_writes_nothing() {
        let (conn, _usuario, paciente) = test_db();
        let intrusa = create_usuario(&conn, "intrusa@clinica.ar", "Intrusa", "clave")
            .unwrap()
            .id;

        let err = insert_medicion(
            &conn,
            &intrusa,
            &nueva(paciente, NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(), 70.0),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));

        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM mediciones", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn linking_a_foreign_consulta_is_refused() {
        let (conn, usuario, paciente) = test_db();
        let otra = create_usuario(&conn, "otra@clinica.ar", "Otra", "clave")
            .unwrap()
            .id;
        let paciente_ajeno = insert_paciente(
            &conn,
            &otra,
            &NuevoPaciente {
                nombre: "Eva".into(),
                apellido: "Torres".into(),
                email: None,
                telefono: None,
                fecha_nacimiento: None,
                sexo: None,
                altura_cm: None,
                notas: None,
            },
        )
        .unwrap()
        .id;
        let dia = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let consulta_ajena = insert_consulta(
            &conn,
            &otra,
            &NuevaConsulta {
                paciente_id: paciente_ajeno,
                inicio: dia.and_hms_opt(9, 0, 0).unwrap(),
                fin: dia.and_hms_opt(9, 30, 0).unwrap(),
                estado: EstadoConsulta::Programado,
                estado_pago: EstadoPago::Pendiente,
                lugar: None,
                notas: None,
            },
        )
        .unwrap()
        .id;

        let mut datos = nueva(paciente, dia, 70.0);
        datos.consulta_id = Some(consulta_ajena);
        let err = insert_medicion(&conn, &usuario, &datos).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));

        // Re-linking through update is refused the same way.
        let medicion = insert_medicion(&conn, &usuario, &nueva(paciente, dia, 70.0)).unwrap();
        let err = update_medicion(
            &conn,
            &medicion.id,
            &usuario,
            &MedicionUpdate {
                consulta_id: Some(consulta_ajena),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn update_applies_only_provided_fields() {
        let (conn, usuario, paciente) = test_db();
        let medicion = insert_medicion(
            &conn,
            &usuario,
            &nueva(paciente, NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(), 70.0),
        )
        .unwrap();

        let actualizada = update_medicion(
            &conn,
            &medicion.id,
            &usuario,
            &MedicionUpdate {
                peso_kg: Some(69.4),
                notas: Some("Ayunas".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(actualizada.peso_kg, Some(69.4));
        assert_eq!(actualizada.altura_cm, Some(165.0));
        assert_eq!(actualizada.notas.as_deref(), Some("Ayunas"));
        assert_eq!(actualizada.fecha, medicion.fecha);
    }

    #[test]
    fn history_of_foreign_patient_is_not_found() {
        let (conn, _usuario, paciente) = test_db();
        let intrusa = create_usuario(&conn, "intrusa@clinica.ar", "Intrusa", "clave")
            .unwrap()
            .id;
        let err = get_mediciones_por_paciente(&conn, &paciente, &intrusa).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn delete_is_conditional_on_scope() {
        let (conn, usuario, paciente) = test_db();
        let medicion = insert_medicion(
            &conn,
            &usuario,
            &nueva(paciente, NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(), 70.0),
        )
        .unwrap();

        let intrusa = create_usuario(&conn, "intrusa@clinica.ar", "Intrusa", "clave")
            .unwrap()
            .id;
        assert!(matches!(
            delete_medicion(&conn, &medicion.id, &intrusa),
            Err(DatabaseError::NotFound { .. })
        ));

        delete_medicion(&conn, &medicion.id, &usuario).unwrap();
        assert!(matches!(
            get_medicion(&conn, &medicion.id, &usuario),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
