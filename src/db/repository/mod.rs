//! Repository layer — ownership-scoped persistence operations.
//!
//! Every read and mutation that touches practitioner-owned data takes the
//! owner's `usuario_id` and enforces the scope inside the SQL statement
//! itself, so a single call is atomic: there is no check-then-act window
//! between "is this mine" and the write. All public functions are
//! re-exported here.

mod alimentos;
mod consultas;
mod mediciones;
mod pacientes;
mod perfiles;
mod planes;
mod usuarios;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::DatabaseError;

/// Hard cap on page size for cursor-paginated listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// One page of a cursor-paginated listing. `next_cursor` is `None` on the
/// last page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_uuid(idx: usize, value: &str) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_datetime(idx: usize, value: &str) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_date(idx: usize, value: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_enum<T>(idx: usize, value: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Escape LIKE metacharacters so user filter text matches literally.
/// Patterns built from this must use `ESCAPE '\'`.
pub(crate) fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Re-export all public items from sub-modules
pub use alimentos::*;
pub use consultas::*;
pub use mediciones::*;
pub use pacientes::*;
pub use perfiles::*;
pub use planes::*;
pub use usuarios::*;
