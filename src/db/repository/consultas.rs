use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::cursor::{decode_cursor, encode_cursor, query_hash, CursorPayload};
use crate::db::DatabaseError;
use crate::models::{Consulta, ConsultaUpdate, NuevaConsulta};

use super::pacientes::owns_paciente;
use super::{fmt_date, fmt_datetime, now, parse_datetime, parse_enum, parse_uuid, Page, MAX_PAGE_SIZE};

/// Order tag baked into agenda cursors.
const ORDEN_AGENDA: &str = "inicio-desc:id";

/// Insert a consultation for a patient in the caller's scope; the check
/// and the insert are one statement.
pub fn insert_consulta(
    conn: &Connection,
    usuario_id: &Uuid,
    datos: &NuevaConsulta,
) -> Result<Consulta, DatabaseError> {
    let ahora = now();
    let consulta = Consulta {
        id: Uuid::new_v4(),
        usuario_id: *usuario_id,
        paciente_id: datos.paciente_id,
        inicio: datos.inicio,
        fin: datos.fin,
        estado: datos.estado,
        estado_pago: datos.estado_pago,
        lugar: datos.lugar.clone(),
        notas: datos.notas.clone(),
        creado_en: ahora,
        actualizado_en: ahora,
    };
    let affected = conn.execute(
        "INSERT INTO consultas (id, usuario_id, paciente_id, inicio, fin, estado,
                                estado_pago, lugar, notas, creado_en, actualizado_en)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10
         WHERE EXISTS (SELECT 1 FROM pacientes WHERE id = ?3 AND usuario_id = ?2)",
        params![
            consulta.id.to_string(),
            consulta.usuario_id.to_string(),
            consulta.paciente_id.to_string(),
            fmt_datetime(&consulta.inicio),
            fmt_datetime(&consulta.fin),
            consulta.estado.as_str(),
            consulta.estado_pago.as_str(),
            consulta.lugar,
            consulta.notas,
            fmt_datetime(&consulta.creado_en),
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: datos.paciente_id.to_string(),
        });
    }
    Ok(consulta)
}

/// Fetch one consultation within the practitioner's scope.
pub fn get_consulta(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<Consulta, DatabaseError> {
    conn.query_row(
        "SELECT id, usuario_id, paciente_id, inicio, fin, estado, estado_pago,
                lugar, notas, creado_en, actualizado_en
         FROM consultas WHERE id = ?1 AND usuario_id = ?2",
        params![id.to_string(), usuario_id.to_string()],
        row_to_consulta,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "consulta".into(),
        id: id.to_string(),
    })
}

/// The practitioner's agenda, newest start first, optionally limited to a
/// date range, one page at a time. The cursor is signed and bound to
/// `(usuario_id, desde, hasta, order)`.
pub fn list_consultas(
    conn: &Connection,
    usuario_id: &Uuid,
    desde: Option<NaiveDate>,
    hasta: Option<NaiveDate>,
    page_size: u32,
    cursor: Option<&str>,
    secret: &[u8],
) -> Result<Page<Consulta>, DatabaseError> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE) as usize;
    let desde_str = desde.map(|d| format!("{} 00:00:00", fmt_date(&d)));
    let hasta_str = hasta.map(|d| format!("{} 23:59:59", fmt_date(&d)));
    let hash = query_hash(&[
        &usuario_id.to_string(),
        desde_str.as_deref().unwrap_or(""),
        hasta_str.as_deref().unwrap_or(""),
        ORDEN_AGENDA,
    ]);

    let mut sql = String::from(
        "SELECT id, usuario_id, paciente_id, inicio, fin, estado, estado_pago,
                lugar, notas, creado_en, actualizado_en
         FROM consultas WHERE usuario_id = ?1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(usuario_id.to_string())];
    let mut param_idx = 2u32;

    if let Some(limite) = desde_str {
        sql.push_str(&format!(" AND inicio >= ?{param_idx}"));
        params_vec.push(Box::new(limite));
        param_idx += 1;
    }
    if let Some(limite) = hasta_str {
        sql.push_str(&format!(" AND inicio <= ?{param_idx}"));
        params_vec.push(Box::new(limite));
        param_idx += 1;
    }

    if let Some(token) = cursor {
        let payload = decode_cursor(token, secret, &hash)?;
        let [inicio, id]: [String; 2] = payload
            .keys
            .try_into()
            .map_err(|_| DatabaseError::InvalidCursor("unexpected key count".into()))?;
        sql.push_str(&format!(
            " AND (inicio < ?{a} OR (inicio = ?{a} AND id > ?{b}))",
            a = param_idx,
            b = param_idx + 1
        ));
        params_vec.push(Box::new(inicio));
        params_vec.push(Box::new(id));
        param_idx += 2;
    }

    sql.push_str(&format!(" ORDER BY inicio DESC, id LIMIT ?{param_idx}"));
    params_vec.push(Box::new(page_size as i64 + 1));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), row_to_consulta)?;
    let mut items = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)?;

    let next_cursor = if items.len() > page_size {
        items.truncate(page_size);
        items
            .last()
            .map(|ultima| {
                encode_cursor(
                    &CursorPayload {
                        query_hash: hash,
                        keys: vec![fmt_datetime(&ultima.inicio), ultima.id.to_string()],
                    },
                    secret,
                )
            })
            .transpose()?
    } else {
        None
    };

    Ok(Page { items, next_cursor })
}

/// All consultations of one patient in scope, newest start first.
pub fn get_consultas_por_paciente(
    conn: &Connection,
    paciente_id: &Uuid,
    usuario_id: &Uuid,
) -> Result<Vec<Consulta>, DatabaseError> {
    if !owns_paciente(conn, usuario_id, paciente_id)? {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: paciente_id.to_string(),
        });
    }
    let mut stmt = conn.prepare(
        "SELECT id, usuario_id, paciente_id, inicio, fin, estado, estado_pago,
                lugar, notas, creado_en, actualizado_en
         FROM consultas WHERE paciente_id = ?1
         ORDER BY inicio DESC, id",
    )?;
    let rows = stmt.query_map(params![paciente_id.to_string()], row_to_consulta)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)
}

/// Apply a partial update to a consultation in scope.
pub fn update_consulta(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
    cambios: &ConsultaUpdate,
) -> Result<Consulta, DatabaseError> {
    let mut sets: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(inicio) = &cambios.inicio {
        sets.push(format!("inicio = ?{param_idx}"));
        params_vec.push(Box::new(fmt_datetime(inicio)));
        param_idx += 1;
    }
    if let Some(fin) = &cambios.fin {
        sets.push(format!("fin = ?{param_idx}"));
        params_vec.push(Box::new(fmt_datetime(fin)));
        param_idx += 1;
    }
    if let Some(estado) = &cambios.estado {
        sets.push(format!("estado = ?{param_idx}"));
        params_vec.push(Box::new(estado.as_str()));
        param_idx += 1;
    }
    if let Some(pago) = &cambios.estado_pago {
        sets.push(format!("estado_pago = ?{param_idx}"));
        params_vec.push(Box::new(pago.as_str()));
        param_idx += 1;
    }
    if let Some(lugar) = &cambios.lugar {
        sets.push(format!("lugar = ?{param_idx}"));
        params_vec.push(Box::new(lugar.clone()));
        param_idx += 1;
    }
    if let Some(notas) = &cambios.notas {
        sets.push(format!("notas = ?{param_idx}"));
        params_vec.push(Box::new(notas.clone()));
        param_idx += 1;
    }

    if sets.is_empty() {
        return get_consulta(conn, id, usuario_id);
    }

    sets.push(format!("actualizado_en = ?{param_idx}"));
    params_vec.push(Box::new(fmt_datetime(&now())));
    param_idx += 1;

    let sql = format!(
        "UPDATE consultas SET {} WHERE id = ?{} AND usuario_id = ?{}",
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
            entity_type: "consulta".into(),
            id: id.to_string(),
        });
    }
    get_consulta(conn, id, usuario_id)
}

/// Delete a consultation in scope; linked measurements are detached, not
/// deleted.
pub fn delete_consulta(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM consultas WHERE id = ?1 AND usuario_id = ?2",
        params![id.to_string(), usuario_id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "consulta".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_consulta(row: &rusqlite::Row) -> Result<Consulta, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let usuario_str: String = row.get(1)?;
    let paciente_str: String = row.get(2)?;
    let inicio_str: String = row.get(3)?;
    let fin_str: String = row.get(4)?;
    let estado_str: String = row.get(5)?;
    let pago_str: String = row.get(6)?;
    let creado_str: String = row.get(9)?;
    let actualizado_str: String = row.get(10)?;

    Ok(Consulta {
        id: parse_uuid(0, &id_str)?,
        usuario_id: parse_uuid(1, &usuario_str)?,
        paciente_id: parse_uuid(2, &paciente_str)?,
        inicio: parse_datetime(3, &inicio_str)?,
        fin: parse_datetime(4, &fin_str)?,
        estado: parse_enum(5, &estado_str)?,
        estado_pago: parse_enum(6, &pago_str)?,
        lugar: row.get(7)?,
        notas: row.get(8)?,
        creado_en: parse_datetime(9, &creado_str)?,
        actualizado_en: parse_datetime(10, &actualizado_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{create_usuario, insert_paciente};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{EstadoConsulta, EstadoPago, NuevoPaciente};

    const SECRET: &[u8] = b"unit-test-secret";

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

    fn agendar(conn: &Connection, usuario: &Uuid, paciente: Uuid, dia: u32) -> Consulta {
        let fecha = NaiveDate::from_ymd_opt(2026, 4, dia).unwrap();
        insert_consulta(
            conn,
            usuario,
            &NuevaConsulta {
                paciente_id: paciente,
                inicio: fecha.and_hms_opt(10, 0, 0).unwrap(),
                fin: fecha.and_hms_opt(10, 45, 0).unwrap(),
                estado: EstadoConsulta::Programado,
                estado_pago: EstadoPago::Pendiente,
                lugar: Some("Consultorio 2".into()),
                notas: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn insert_for_foreign_patient_is_not_found() {
        let (conn, _usuario, paciente) = test_db();
        let intrusa = create_usuario(&conn, "intrusa@clinica.ar", "Intrusa", "clave")
            .unwrap()
            .id;
        let dia = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let err = insert_consulta(
            &conn,
            &intrusa,
            &NuevaConsulta {
                paciente_id: paciente,
                inicio: dia.and_hms_opt(10, 0, 0).unwrap(),
                fin: dia.and_hms_opt(11, 0, 0).unwrap(),
                estado: EstadoConsulta::Programado,
                estado_pago: EstadoPago::Pendiente,
                lugar: None,
                notas: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn agenda_is_newest_first_and_range_limited() {
        let (conn, usuario, paciente) = test_db();
        for dia in [5, 20, 12] {
            agendar(&conn, &usuario, paciente, dia);
        }

        let todo = list_consultas(&conn, &usuario, None, None, 10, None, SECRET).unwrap();
        let dias: Vec<_> = todo.items.iter().map(|c| c.inicio.format("%d").to_string()).collect();
        assert_eq!(dias, vec!["20", "12", "05"]);

        let medio = list_consultas(
            &conn,
            &usuario,
            Some(NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()),
            Some(NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()),
            10,
            None,
            SECRET,
        )
        .unwrap();
        assert_eq!(medio.items.len(), 1);
        assert_eq!(medio.items[0].inicio.format("%d").to_string(), "12");
    }

    #[test]
    fn agenda_pagination_keeps_the_range_binding() {
        let (conn, usuario, paciente) = test_db();
        for dia in 1..=5 {
            agendar(&conn, &usuario, paciente, dia);
        }

        let primera = list_consultas(&conn, &usuario, None, None, 2, None, SECRET).unwrap();
        assert_eq!(primera.items.len(), 2);
        let cursor = primera.next_cursor.expect("next page expected");

        let segunda =
            list_consultas(&conn, &usuario, None, None, 2, Some(&cursor), SECRET).unwrap();
        assert_eq!(segunda.items.len(), 2);

        // The same cursor under a date range is another query.
        let err = list_consultas(
            &conn,
            &usuario,
            Some(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()),
            None,
            2,
            Some(&cursor),
            SECRET,
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidCursor(_)));
    }

    #[test]
    fn patient_history_requires_scope() {
        let (conn, usuario, paciente) = test_db();
        agendar(&conn, &usuario, paciente, 5);

        let historial = get_consultas_por_paciente(&conn, &paciente, &usuario).unwrap();
        assert_eq!(historial.len(), 1);

        let intrusa = create_usuario(&conn, "intrusa@clinica.ar", "Intrusa", "clave")
            .unwrap()
            .id;
        let err = get_consultas_por_paciente(&conn, &paciente, &intrusa).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn update_changes_estado_and_pago() {
        let (conn, usuario, paciente) = test_db();
        let consulta = agendar(&conn, &usuario, paciente, 5);

        let actualizada = update_consulta(
            &conn,
            &consulta.id,
            &usuario,
            &ConsultaUpdate {
                estado: Some(EstadoConsulta::Completado),
                estado_pago: Some(EstadoPago::Pagado),
                notas: Some("Asistió puntual".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(actualizada.estado, EstadoConsulta::Completado);
        assert_eq!(actualizada.estado_pago, EstadoPago::Pagado);
        assert_eq!(actualizada.lugar.as_deref(), Some("Consultorio 2"));
        assert_eq!(actualizada.inicio, consulta.inicio);
    }

    #[test]
    fn delete_is_conditional_on_scope() {
        let (conn, usuario, paciente) = test_db();
        let consulta = agendar(&conn, &usuario, paciente, 5);

        let intrusa = create_usuario(&conn, "intrusa@clinica.ar", "Intrusa", "clave")
            .unwrap()
            .id;
        assert!(matches!(
            delete_consulta(&conn, &consulta.id, &intrusa),
            Err(DatabaseError::NotFound { .. })
        ));
        delete_consulta(&conn, &consulta.id, &usuario).unwrap();
        assert!(matches!(
            get_consulta(&conn, &consulta.id, &usuario),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
