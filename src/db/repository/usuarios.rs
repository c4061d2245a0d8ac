use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Usuario;

use super::{fmt_datetime, now, parse_datetime, parse_uuid};

#[cfg(not(test))]
const PBKDF2_ITERATIONS: u32 = 600_000;
// The full-strength KDF makes the suite crawl; tests only exercise the format.
#[cfg(test)]
const PBKDF2_ITERATIONS: u32 = 1_000;

const SALT_LENGTH: usize = 32;
const HASH_LENGTH: usize = 32;

/// Derive a PBKDF2-HMAC-SHA256 credential, encoded as `<salt>$<hash>` in
/// base64url. Each call draws a fresh salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);
    format!(
        "{}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(hash)
    )
}

/// Constant-time check of a password against a stored credential.
/// Malformed stored values fail the check instead of erroring.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_part, hash_part)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (
        URL_SAFE_NO_PAD.decode(salt_part),
        URL_SAFE_NO_PAD.decode(hash_part),
    ) else {
        return false;
    };
    if expected.len() != HASH_LENGTH {
        return false;
    }
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);
    hash.as_slice().ct_eq(expected.as_slice()).into()
}

/// Create a practitioner account. The email is stored lowercased and is
/// unique across the table.
pub fn create_usuario(
    conn: &Connection,
    email: &str,
    nombre: &str,
    password: &str,
) -> Result<Usuario, DatabaseError> {
    let usuario = Usuario {
        id: Uuid::new_v4(),
        email: email.trim().to_lowercase(),
        nombre: nombre.trim().to_string(),
        password_hash: hash_password(password),
        creado_en: now(),
    };
    let result = conn.execute(
        "INSERT INTO usuarios (id, email, nombre, password_hash, creado_en)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            usuario.id.to_string(),
            usuario.email,
            usuario.nombre,
            usuario.password_hash,
            fmt_datetime(&usuario.creado_en),
        ],
    );
    match result {
        Ok(_) => Ok(usuario),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(DatabaseError::ConstraintViolation(format!(
                "ya existe un usuario con el email {}",
                usuario.email
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Look up a practitioner by email, case-insensitively.
pub fn get_usuario_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<Usuario>, DatabaseError> {
    let usuario = conn
        .query_row(
            "SELECT id, email, nombre, password_hash, creado_en
             FROM usuarios WHERE email = ?1",
            params![email.trim().to_lowercase()],
            row_to_usuario,
        )
        .optional()?;
    Ok(usuario)
}

/// Look up a practitioner by id.
pub fn get_usuario(conn: &Connection, id: &Uuid) -> Result<Option<Usuario>, DatabaseError> {
    let usuario = conn
        .query_row(
            "SELECT id, email, nombre, password_hash, creado_en
             FROM usuarios WHERE id = ?1",
            params![id.to_string()],
            row_to_usuario,
        )
        .optional()?;
    Ok(usuario)
}

fn row_to_usuario(row: &rusqlite::Row) -> Result<Usuario, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let creado_str: String = row.get(4)?;

    Ok(Usuario {
        id: parse_uuid(0, &id_str)?,
        email: row.get(1)?,
        nombre: row.get(2)?,
        password_hash: row.get(3)?,
        creado_en: parse_datetime(4, &creado_str)?,
    })
}
