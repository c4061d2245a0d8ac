use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::cursor::{decode_cursor, encode_cursor, query_hash, CursorPayload};
use crate::db::DatabaseError;
use crate::models::{Alimento, AlimentoUpdate, NuevoAlimento};

use super::{escape_like, fmt_datetime, now, parse_datetime, parse_uuid, Page, MAX_PAGE_SIZE};

/// Order tag baked into catalog cursors. The catalog is global, so the
/// scope part of the query hash is a constant.
const ORDEN_CATALOGO: &str = "nombre:id";
const ALCANCE_CATALOGO: &str = "catalogo";

/// Insert a food into the shared catalog.
pub fn insert_alimento(conn: &Connection, datos: &NuevoAlimento) -> Result<Alimento, DatabaseError> {
    let alimento = Alimento {
        id: Uuid::new_v4(),
        nombre: datos.nombre.clone(),
        categoria: datos.categoria.clone(),
        calorias: datos.calorias,
        proteinas_g: datos.proteinas_g,
        carbohidratos_g: datos.carbohidratos_g,
        grasas_g: datos.grasas_g,
        creado_en: now(),
    };
    conn.execute(
        "INSERT INTO alimentos (id, nombre, categoria, calorias, proteinas_g,
                                carbohidratos_g, grasas_g, creado_en)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            alimento.id.to_string(),
            alimento.nombre,
            alimento.categoria,
            alimento.calorias,
            alimento.proteinas_g,
            alimento.carbohidratos_g,
            alimento.grasas_g,
            fmt_datetime(&alimento.creado_en),
        ],
    )?;
    Ok(alimento)
}

/// Fetch one catalog food.
pub fn get_alimento(conn: &Connection, id: &Uuid) -> Result<Alimento, DatabaseError> {
    conn.query_row(
        "SELECT id, nombre, categoria, calorias, proteinas_g, carbohidratos_g,
                grasas_g, creado_en
         FROM alimentos WHERE id = ?1",
        params![id.to_string()],
        row_to_alimento,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "alimento".into(),
        id: id.to_string(),
    })
}

/// List the catalog ordered by nombre (case-insensitive), one page at a
/// time. The filter matches nombre or categoria; the cursor is signed and
/// bound to `(catalogo, filtro, order)`.
pub fn list_alimentos(
    conn: &Connection,
    filtro: Option<&str>,
    page_size: u32,
    cursor: Option<&str>,
    secret: &[u8],
) -> Result<Page<Alimento>, DatabaseError> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE) as usize;
    let filtro = filtro.map(str::trim).filter(|f| !f.is_empty());
    let hash = query_hash(&[ALCANCE_CATALOGO, filtro.unwrap_or(""), ORDEN_CATALOGO]);

    let mut sql = String::from(
        "SELECT id, nombre, categoria, calorias, proteinas_g, carbohidratos_g,
                grasas_g, creado_en
         FROM alimentos WHERE 1=1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(term) = filtro {
        sql.push_str(&format!(
            " AND (nombre LIKE ?{i} ESCAPE '\\' OR categoria LIKE ?{i} ESCAPE '\\')",
            i = param_idx
        ));
        params_vec.push(Box::new(format!("%{}%", escape_like(term))));
        param_idx += 1;
    }

    if let Some(token) = cursor {
        let payload = decode_cursor(token, secret, &hash)?;
        let [nombre, id]: [String; 2] = payload
            .keys
            .try_into()
            .map_err(|_| DatabaseError::InvalidCursor("unexpected key count".into()))?;
        sql.push_str(&format!(
            " AND (nombre COLLATE NOCASE > ?{a} \
               OR (nombre COLLATE NOCASE = ?{a} AND id > ?{b}))",
            a = param_idx,
            b = param_idx + 1
        ));
        params_vec.push(Box::new(nombre));
        params_vec.push(Box::new(id));
        param_idx += 2;
    }

    sql.push_str(&format!(
        " ORDER BY nombre COLLATE NOCASE, id LIMIT ?{param_idx}"
    ));
    params_vec.push(Box::new(page_size as i64 + 1));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), row_to_alimento)?;
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
                        keys: vec![ultimo.nombre.clone(), ultimo.id.to_string()],
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

/// Apply a partial update to a catalog food.
pub fn update_alimento(
    conn: &Connection,
    id: &Uuid,
    cambios: &AlimentoUpdate,
) -> Result<Alimento, DatabaseError> {
    let mut sets: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(nombre) = &cambios.nombre {
        sets.push(format!("nombre = ?{param_idx}"));
        params_vec.push(Box::new(nombre.clone()));
        param_idx += 1;
    }
    if let Some(categoria) = &cambios.categoria {
        sets.push(format!("categoria = ?{param_idx}"));
        params_vec.push(Box::new(categoria.clone()));
        param_idx += 1;
    }
    if let Some(calorias) = cambios.calorias {
        sets.push(format!("calorias = ?{param_idx}"));
        params_vec.push(Box::new(calorias));
        param_idx += 1;
    }
    if let Some(proteinas) = cambios.proteinas_g {
        sets.push(format!("proteinas_g = ?{param_idx}"));
        params_vec.push(Box::new(proteinas));
        param_idx += 1;
    }
    if let Some(carbohidratos) = cambios.carbohidratos_g {
        sets.push(format!("carbohidratos_g = ?{param_idx}"));
        params_vec.push(Box::new(carbohidratos));
        param_idx += 1;
    }
    if let Some(grasas) = cambios.grasas_g {
        sets.push(format!("grasas_g = ?{param_idx}"));
        params_vec.push(Box::new(grasas));
        param_idx += 1;
    }

    if sets.is_empty() {
        return get_alimento(conn, id);
    }

    let sql = format!(
        "UPDATE alimentos SET {} WHERE id = ?{}",
        sets.join(", "),
        param_idx
    );
    params_vec.push(Box::new(id.to_string()));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let affected = conn.execute(&sql, param_refs.as_slice())?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "alimento".into(),
            id: id.to_string(),
        });
    }
    get_alimento(conn, id)
}

/// Delete a catalog food unless a meal portion still references it.
/// Callers are serialized on the single connection, and the plain FK on
/// comida_alimentos.alimento_id backs the guard up.
pub fn delete_alimento(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let referencias: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comida_alimentos WHERE alimento_id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    if referencias > 0 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "el alimento está en uso en {referencias} comida(s) de planes nutricionales \
             y no puede eliminarse"
        )));
    }
    let affected = conn.execute(
        "DELETE FROM alimentos WHERE id = ?1",
        params![id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "alimento".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_alimento(row: &rusqlite::Row) -> Result<Alimento, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let creado_str: String = row.get(7)?;

    Ok(Alimento {
        id: parse_uuid(0, &id_str)?,
        nombre: row.get(1)?,
        categoria: row.get(2)?,
        calorias: row.get(3)?,
        proteinas_g: row.get(4)?,
        carbohidratos_g: row.get(5)?,
        grasas_g: row.get(6)?,
        creado_en: parse_datetime(7, &creado_str)?,
    })
}
