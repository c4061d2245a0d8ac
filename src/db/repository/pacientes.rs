use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::cursor::{decode_cursor, encode_cursor, query_hash, CursorPayload};
use crate::db::DatabaseError;
use crate::models::{NuevoPaciente, Paciente, PacienteUpdate};

use super::{
    escape_like, fmt_date, fmt_datetime, now, parse_date, parse_datetime, parse_enum, parse_uuid,
    Page, MAX_PAGE_SIZE,
};

/// Order tag baked into patient-listing cursors.
const ORDEN_LISTADO: &str = "apellido:nombre:id";

/// Insert a patient owned by the given practitioner. New patients start
/// active.
pub fn insert_paciente(
    conn: &Connection,
    usuario_id: &Uuid,
    datos: &NuevoPaciente,
) -> Result<Paciente, DatabaseError> {
    let ahora = now();
    let paciente = Paciente {
        id: Uuid::new_v4(),
        usuario_id: *usuario_id,
        nombre: datos.nombre.clone(),
        apellido: datos.apellido.clone(),
        email: datos.email.clone(),
        telefono: datos.telefono.clone(),
        fecha_nacimiento: datos.fecha_nacimiento,
        sexo: datos.sexo,
        altura_cm: datos.altura_cm,
        notas: datos.notas.clone(),
        activo: true,
        creado_en: ahora,
        actualizado_en: ahora,
    };
    conn.execute(
        "INSERT INTO pacientes (id, usuario_id, nombre, apellido, email, telefono,
                                fecha_nacimiento, sexo, altura_cm, notas, activo,
                                creado_en, actualizado_en)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            paciente.id.to_string(),
            paciente.usuario_id.to_string(),
            paciente.nombre,
            paciente.apellido,
            paciente.email,
            paciente.telefono,
            paciente.fecha_nacimiento.map(|d| fmt_date(&d)),
            paciente.sexo.map(|s| s.as_str()),
            paciente.altura_cm,
            paciente.notas,
            paciente.activo,
            fmt_datetime(&paciente.creado_en),
            fmt_datetime(&paciente.actualizado_en),
        ],
    )?;
    Ok(paciente)
}

/// Fetch one patient within the practitioner's scope. A patient owned by
/// someone else is indistinguishable from a missing one.
pub fn get_paciente(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<Paciente, DatabaseError> {
    conn.query_row(
        "SELECT id, usuario_id, nombre, apellido, email, telefono, fecha_nacimiento,
                sexo, altura_cm, notas, activo, creado_en, actualizado_en
         FROM pacientes WHERE id = ?1 AND usuario_id = ?2",
        params![id.to_string(), usuario_id.to_string()],
        row_to_paciente,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "paciente".into(),
        id: id.to_string(),
    })
}

/// Whether the patient exists inside the practitioner's scope.
pub(crate) fn owns_paciente(
    conn: &Connection,
    usuario_id: &Uuid,
    paciente_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let propio = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pacientes WHERE id = ?1 AND usuario_id = ?2)",
        params![paciente_id.to_string(), usuario_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(propio)
}

/// List the practitioner's patients one page at a time, ordered by
/// apellido, nombre, id (case-insensitive). The filter matches nombre,
/// apellido, or email. The returned cursor is signed and bound to
/// `(usuario_id, filtro, order)`; replaying it against any other listing
/// fails with `InvalidCursor`.
pub fn list_pacientes(
    conn: &Connection,
    usuario_id: &Uuid,
    filtro: Option<&str>,
    page_size: u32,
    cursor: Option<&str>,
    secret: &[u8],
) -> Result<Page<Paciente>, DatabaseError> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE) as usize;
    let filtro = filtro.map(str::trim).filter(|f| !f.is_empty());
    let hash = query_hash(&[&usuario_id.to_string(), filtro.unwrap_or(""), ORDEN_LISTADO]);

    let mut sql = String::from(
        "SELECT id, usuario_id, nombre, apellido, email, telefono, fecha_nacimiento,
                sexo, altura_cm, notas, activo, creado_en, actualizado_en
         FROM pacientes WHERE usuario_id = ?1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(usuario_id.to_string())];
    let mut param_idx = 2u32;

    if let Some(term) = filtro {
        sql.push_str(&format!(
            " AND (nombre LIKE ?{i} ESCAPE '\\' OR apellido LIKE ?{i} ESCAPE '\\' \
               OR email LIKE ?{i} ESCAPE '\\')",
            i = param_idx
        ));
        params_vec.push(Box::new(format!("%{}%", escape_like(term))));
        param_idx += 1;
    }

    if let Some(token) = cursor {
        let payload = decode_cursor(token, secret, &hash)?;
        let [apellido, nombre, id]: [String; 3] = payload
            .keys
            .try_into()
            .map_err(|_| DatabaseError::InvalidCursor("unexpected key count".into()))?;
        sql.push_str(&format!(
            " AND (apellido COLLATE NOCASE > ?{a} \
               OR (apellido COLLATE NOCASE = ?{a} AND nombre COLLATE NOCASE > ?{b}) \
               OR (apellido COLLATE NOCASE = ?{a} AND nombre COLLATE NOCASE = ?{b} AND id > ?{c}))",
            a = param_idx,
            b = param_idx + 1,
            c = param_idx + 2
        ));
        params_vec.push(Box::new(apellido));
        params_vec.push(Box::new(nombre));
        params_vec.push(Box::new(id));
        param_idx += 3;
    }

    sql.push_str(&format!(
        " ORDER BY apellido COLLATE NOCASE, nombre COLLATE NOCASE, id LIMIT ?{param_idx}"
    ));
    // One extra row decides whether a next page exists.
    params_vec.push(Box::new(page_size as i64 + 1));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), row_to_paciente)?;
    let mut items = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)?;

    let next_cursor = if items.len() > page_size {
        items.truncate(page_size);
        items
            .last()
            .map(|ultimo| {
                encode_cursor(
                    &CursorPayload {
                        query_hash: hash,
                        keys: vec![
                            ultimo.apellido.clone(),
                            ultimo.nombre.clone(),
                            ultimo.id.to_string(),
                        ],
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

/// Apply a partial update to a patient in scope. `None` fields keep their
/// stored value.
pub fn update_paciente(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
    cambios: &PacienteUpdate,
) -> Result<Paciente, DatabaseError> {
    let mut sets: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(nombre) = &cambios.nombre {
        sets.push(format!("nombre = ?{param_idx}"));
        params_vec.push(Box::new(nombre.clone()));
        param_idx += 1;
    }
    if let Some(apellido) = &cambios.apellido {
        sets.push(format!("apellido = ?{param_idx}"));
        params_vec.push(Box::new(apellido.clone()));
        param_idx += 1;
    }
    if let Some(email) = &cambios.email {
        sets.push(format!("email = ?{param_idx}"));
        params_vec.push(Box::new(email.clone()));
        param_idx += 1;
    }
    if let Some(telefono) = &cambios.telefono {
        sets.push(format!("telefono = ?{param_idx}"));
        params_vec.push(Box::new(telefono.clone()));
        param_idx += 1;
    }
    if let Some(fecha) = &cambios.fecha_nacimiento {
        sets.push(format!("fecha_nacimiento = ?{param_idx}"));
        params_vec.push(Box::new(fmt_date(fecha)));
        param_idx += 1;
    }
    if let Some(sexo) = &cambios.sexo {
        sets.push(format!("sexo = ?{param_idx}"));
        params_vec.push(Box::new(sexo.as_str()));
        param_idx += 1;
    }
    if let Some(altura) = cambios.altura_cm {
        sets.push(format!("altura_cm = ?{param_idx}"));
        params_vec.push(Box::new(altura));
        param_idx += 1;
    }
    if let Some(notas) = &cambios.notas {
        sets.push(format!("notas = ?{param_idx}"));
        params_vec.push(Box::new(notas.clone()));
        param_idx += 1;
    }

    if sets.is_empty() {
        // Nothing to change; still report not-found for rows out of scope.
        return get_paciente(conn, id, usuario_id);
    }

    sets.push(format!("actualizado_en = ?{param_idx}"));
    params_vec.push(Box::new(fmt_datetime(&now())));
    param_idx += 1;

    let sql = format!(
        "UPDATE pacientes SET {} WHERE id = ?{} AND usuario_id = ?{}",
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
            entity_type: "paciente".into(),
            id: id.to_string(),
        });
    }
    get_paciente(conn, id, usuario_id)
}

/// Toggle the soft lifecycle flag.
pub fn set_paciente_activo(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
    activo: bool,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE pacientes SET activo = ?1, actualizado_en = ?2
         WHERE id = ?3 AND usuario_id = ?4",
        params![
            activo,
            fmt_datetime(&now()),
            id.to_string(),
            usuario_id.to_string()
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Delete a patient and, through the schema's cascades, everything that
/// hangs off it. The ownership check and the delete are one statement.
pub fn delete_paciente(
    conn: &Connection,
    id: &Uuid,
    usuario_id: &Uuid,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM pacientes WHERE id = ?1 AND usuario_id = ?2",
        params![id.to_string(), usuario_id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_paciente(row: &rusqlite::Row) -> Result<Paciente, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let usuario_str: String = row.get(1)?;
    let nacimiento_str: Option<String> = row.get(6)?;
    let sexo_str: Option<String> = row.get(7)?;
    let creado_str: String = row.get(11)?;
    let actualizado_str: String = row.get(12)?;

    Ok(Paciente {
        id: parse_uuid(0, &id_str)?,
        usuario_id: parse_uuid(1, &usuario_str)?,
        nombre: row.get(2)?,
        apellido: row.get(3)?,
        email: row.get(4)?,
        telefono: row.get(5)?,
        fecha_nacimiento: nacimiento_str
            .as_deref()
            .map(|s| parse_date(6, s))
            .transpose()?,
        sexo: sexo_str.as_deref().map(|s| parse_enum(7, s)).transpose()?,
        altura_cm: row.get(8)?,
        notas: row.get(9)?,
        activo: row.get(10)?,
        creado_en: parse_datetime(11, &creado_str)?,
        actualizado_en: parse_datetime(12, &actualizado_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::create_usuario;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Sexo;
    use chrono::NaiveDate;

    const SECRET: &[u8] = b"unit-test-secret";

    fn test_db() -> (Connection, Uuid) {
        let conn = open_memory_database().unwrap();
        let usuario = create_usuario(&conn, "laura@clinica.ar", "Laura", "clave").unwrap();
        (conn, usuario.id)
    }

    fn nuevo(nombre: &str, apellido: &str, email: Option<&str>) -> NuevoPaciente {
        NuevoPaciente {
            nombre: nombre.into(),
            apellido: apellido.into(),
            email: email.map(Into::into),
            telefono: None,
            fecha_nacimiento: None,
            sexo: None,
            altura_cm: None,
            notas: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let (conn, usuario) = test_db();
        let creado = insert_paciente(
            &conn,
            &usuario,
            &NuevoPaciente {
                nombre: "Ana".into(),
                apellido: "García".into(),
                email: Some("ana@example.com".into()),
                telefono: Some("+54 9 11 5555-0000".into()),
                fecha_nacimiento: Some(NaiveDate::from_ymd_opt(1988, 11, 3).unwrap()),
                sexo: Some(Sexo::Femenino),
                altura_cm: Some(164.5),
                notas: Some("Derivada por guardia".into()),
            },
        )
        .unwrap();
        assert!(creado.activo);

        let leido = get_paciente(&conn, &creado.id, &usuario).unwrap();
        assert_eq!(leido.nombre, "Ana");
        assert_eq!(leido.apellido, "García");
        assert_eq!(leido.email.as_deref(), Some("ana@example.com"));
        assert_eq!(
            leido.fecha_nacimiento,
            Some(NaiveDate::from_ymd_opt(1988, 11, 3).unwrap())
        );
        assert_eq!(leido.sexo, Some(Sexo::Femenino));
        assert_eq!(leido.altura_cm, Some(164.5));
        assert_eq!(leido.creado_en, creado.creado_en);
    }

    #[test]
    fn filter_matches_nombre_apellido_and_email_ignoring_case() {
        let (conn, usuario) = test_db();
        insert_paciente(&conn, &usuario, &nuevo("Ana", "García", Some("ana@mail.com"))).unwrap();
        insert_paciente(&conn, &usuario, &nuevo("Bruno", "garcia", None)).unwrap();
        insert_paciente(&conn, &usuario, &nuevo("Eva", "Torres", Some("eva@mail.com"))).unwrap();

        let page = list_pacientes(&conn, &usuario, Some("GARC"), 10, None, SECRET).unwrap();
        assert_eq!(page.items.len(), 2);

        let page = list_pacientes(&conn, &usuario, Some("eva@"), 10, None, SECRET).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].nombre, "Eva");

        // LIKE wildcards in the filter are taken literally.
        let page = list_pacientes(&conn, &usuario, Some("%"), 10, None, SECRET).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn listing_orders_by_apellido_nombre_id() {
        let (conn, usuario) = test_db();
        insert_paciente(&conn, &usuario, &nuevo("Zoe", "garcía", None)).unwrap();
        insert_paciente(&conn, &usuario, &nuevo("Ana", "García", None)).unwrap();
        insert_paciente(&conn, &usuario, &nuevo("Leo", "Álvarez", None)).unwrap();

        let page = list_pacientes(&conn, &usuario, None, 10, None, SECRET).unwrap();
        let nombres: Vec<_> = page.items.iter().map(|p| p.nombre.as_str()).collect();
        // "García" and "garcía" compare equal under NOCASE, so nombre breaks
        // the tie. "Álvarez" sorts after ASCII letters byte-wise.
        assert_eq!(nombres, vec!["Ana", "Zoe", "Leo"]);
    }

    #[test]
    fn filtered_listing_paginates_with_cursor() {
        let (conn, usuario) = test_db();
        for i in 0..5 {
            insert_paciente(
                &conn,
                &usuario,
                &nuevo(&format!("Nombre{i}"), &format!("García{i}"), None),
            )
            .unwrap();
        }
        insert_paciente(&conn, &usuario, &nuevo("Otro", "Torres", None)).unwrap();

        let primera =
            list_pacientes(&conn, &usuario, Some("garcía"), 3, None, SECRET).unwrap();
        assert_eq!(primera.items.len(), 3);
        let cursor = primera.next_cursor.expect("must have a next page");

        let segunda =
            list_pacientes(&conn, &usuario, Some("garcía"), 3, Some(&cursor), SECRET).unwrap();
        assert_eq!(segunda.items.len(), 2);
        assert!(segunda.next_cursor.is_none());

        let todos: Vec<_> = primera
            .items
            .iter()
            .chain(segunda.items.iter())
            .map(|p| p.apellido.clone())
            .collect();
        assert_eq!(
            todos,
            vec!["García0", "García1", "García2", "García3", "García4"]
        );
    }

    #[test]
    fn page_size_is_clamped() {
        let (conn, usuario) = test_db();
        insert_paciente(&conn, &usuario, &nuevo("Ana", "García", None)).unwrap();
        insert_paciente(&conn, &usuario, &nuevo("Eva", "Torres", None)).unwrap();

        // Zero is bumped to one rather than rejected.
        let page = list_pacientes(&conn, &usuario, None, 0, None, SECRET).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_cursor.is_some());
    }

    #[test]
    fn update_applies_only_provided_fields() {
        let (conn, usuario) = test_db();
        let paciente = insert_paciente(
            &conn,
            &usuario,
            &nuevo("Ana", "García", Some("ana@mail.com")),
        )
        .unwrap();

        let actualizado = update_paciente(
            &conn,
            &paciente.id,
            &usuario,
            &PacienteUpdate {
                apellido: Some("García Paz".into()),
                altura_cm: Some(166.0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(actualizado.nombre, "Ana");
        assert_eq!(actualizado.apellido, "García Paz");
        assert_eq!(actualizado.altura_cm, Some(166.0));
        assert_eq!(actualizado.email.as_deref(), Some("ana@mail.com"));
        assert!(actualizado.actualizado_en >= actualizado.creado_en);
    }

    #[test]
    fn empty_update_is_a_scoped_no_op() {
        let (conn, usuario) = test_db();
        let paciente = insert_paciente(&conn, &usuario, &nuevo("Ana", "García", None)).unwrap();

        let igual =
            update_paciente(&conn, &paciente.id, &usuario, &PacienteUpdate::default()).unwrap();
        assert_eq!(igual.apellido, "García");

        let err = update_paciente(&conn, &Uuid::new_v4(), &usuario, &PacienteUpdate::default())
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn update_outside_scope_is_not_found() {
        let (conn, usuario) = test_db();
        let intrusa = create_usuario(&conn, "intrusa@clinica.ar", "Intrusa", "clave").unwrap();
        let paciente = insert_paciente(&conn, &usuario, &nuevo("Ana", "García", None)).unwrap();

        let err = update_paciente(
            &conn,
            &paciente.id,
            &intrusa.id,
            &PacienteUpdate {
                nombre: Some("Robada".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));

        // The row is untouched.
        let intacta = get_paciente(&conn, &paciente.id, &usuario).unwrap();
        assert_eq!(intacta.nombre, "Ana");
    }

    #[test]
    fn activo_toggles_and_delete_is_conditional() {
        let (conn, usuario) = test_db();
        let paciente = insert_paciente(&conn, &usuario, &nuevo("Ana", "García", None)).unwrap();

        set_paciente_activo(&conn, &paciente.id, &usuario, false).unwrap();
        assert!(!get_paciente(&conn, &paciente.id, &usuario).unwrap().activo);
        set_paciente_activo(&conn, &paciente.id, &usuario, true).unwrap();
        assert!(get_paciente(&conn, &paciente.id, &usuario).unwrap().activo);

        delete_paciente(&conn, &paciente.id, &usuario).unwrap();
        let err = delete_paciente(&conn, &paciente.id, &usuario).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
