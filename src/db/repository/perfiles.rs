use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{PerfilMedico, PerfilMedicoDatos};

use super::pacientes::owns_paciente;
use super::{fmt_datetime, now, parse_datetime, parse_uuid};

/// Create or replace a patient's medical profile in one statement. The
/// insert is scope-checked; on conflict with the per-patient unique key
/// the existing row is updated in place, so the row id and `creado_en`
/// never change after the first write.
pub fn upsert_perfil(
    conn: &Connection,
    usuario_id: &Uuid,
    paciente_id: &Uuid,
    datos: &PerfilMedicoDatos,
) -> Result<PerfilMedico, DatabaseError> {
    let ahora = fmt_datetime(&now());
    let affected = conn.execute(
        "INSERT INTO perfiles_medicos (id, paciente_id, gustos, disgustos, alergias,
                                       condiciones, medicamentos, restricciones,
                                       objetivos, observaciones, creado_en, actualizado_en)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11
         WHERE EXISTS (SELECT 1 FROM pacientes WHERE id = ?2 AND usuario_id = ?12)
         ON CONFLICT(paciente_id) DO UPDATE SET
             gustos = excluded.gustos,
             disgustos = excluded.disgustos,
             alergias = excluded.alergias,
             condiciones = excluded.condiciones,
             medicamentos = excluded.medicamentos,
             restricciones = excluded.restricciones,
             objetivos = excluded.objetivos,
             observaciones = excluded.observaciones,
             actualizado_en = excluded.actualizado_en",
        params![
            Uuid::new_v4().to_string(),
            paciente_id.to_string(),
            datos.gustos,
            datos.disgustos,
            datos.alergias,
            datos.condiciones,
            datos.medicamentos,
            datos.restricciones,
            datos.objetivos,
            datos.observaciones,
            ahora,
            usuario_id.to_string(),
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: paciente_id.to_string(),
        });
    }
    get_perfil(conn, paciente_id, usuario_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "perfil_medico".into(),
        id: paciente_id.to_string(),
    })
}

/// Profile for a patient in scope; `Ok(None)` when the patient exists but
/// has no profile yet.
pub fn get_perfil(
    conn: &Connection,
    paciente_id: &Uuid,
    usuario_id: &Uuid,
) -> Result<Option<PerfilMedico>, DatabaseError> {
    if !owns_paciente(conn, usuario_id, paciente_id)? {
        return Err(DatabaseError::NotFound {
            entity_type: "paciente".into(),
            id: paciente_id.to_string(),
        });
    }
    let perfil = conn
        .query_row(
            "SELECT id, paciente_id, gustos, disgustos, alergias, condiciones,
                    medicamentos, restricciones, objetivos, observaciones,
                    creado_en, actualizado_en
             FROM perfiles_medicos WHERE paciente_id = ?1",
            params![paciente_id.to_string()],
            row_to_perfil,
        )
        .optional()?;
    Ok(perfil)
}

fn row_to_perfil(row: &rusqlite::Row) -> Result<PerfilMedico, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let paciente_str: String = row.get(1)?;
    let creado_str: String = row.get(10)?;
    let actualizado_str: String = row.get(11)?;

    Ok(PerfilMedico {
        id: parse_uuid(0, &id_str)?,
        paciente_id: parse_uuid(1, &paciente_str)?,
        gustos: row.get(2)?,
        disgustos: row.get(3)?,
        alergias: row.get(4)?,
        condiciones: row.get(5)?,
        medicamentos: row.get(6)?,
        restricciones: row.get(7)?,
        objetivos: row.get(8)?,
        observaciones: row.get(9)?,
        creado_en: parse_datetime(10, &creado_str)?,
        actualizado_en: parse_datetime(11, &actualizado_str)?,
    })
}
