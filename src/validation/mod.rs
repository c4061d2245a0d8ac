//! Input validation — raw form/JSON values in, typed records out.
//!
//! One validator per entity. Each takes the entity's raw input struct
//! (every field optional, strings or stringified primitives), normalizes
//! it, and returns either the typed record the repository layer accepts
//! or the full ordered list of field violations. Domain code never sees
//! raw input.
//!
//! Normalization rule: an empty or whitespace-only string is "field
//! omitted", never an explicit empty value. This holds for every
//! optional field.

mod alimento;
mod consulta;
mod medicion;
mod paciente;
mod perfil;
mod plan;

pub use alimento::*;
pub use consulta::*;
pub use medicion::*;
pub use paciente::*;
pub use perfil::*;
pub use plan::*;

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use uuid::Uuid;

// ─── Field bounds ───────────────────────────────────────────────────────

pub const MAX_NOMBRE: usize = 100;
pub const MAX_EMAIL: usize = 254;
pub const MAX_TELEFONO: usize = 30;
pub const MAX_LUGAR: usize = 200;
pub const MAX_TEXTO: usize = 2000;
pub const MAX_ALTURA_CM: f64 = 300.0;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex"));

// ─── Violations ─────────────────────────────────────────────────────────

/// One rejected field: wire name (camelCase) plus a user-presentable
/// reason in the application's language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

#[derive(Error, Debug)]
#[error("{}", .0.iter().map(|v| format!("{}: {}", v.field, v.message)).collect::<Vec<_>>().join("; "))]
pub struct ValidationError(pub Vec<Violation>);

impl ValidationError {
    /// True when some violation names the given input field.
    pub fn cites(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

/// Ordered violation collector used by the per-entity validators.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<Violation>);

impl Violations {
    pub(crate) fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_error(self) -> ValidationError {
        ValidationError(self.0)
    }
}

// ─── Raw-input plumbing ─────────────────────────────────────────────────

/// Accepts a string, number, or bool and yields its string form, so JSON
/// bodies with native primitives and form bodies with strings share one
/// validation path. Null stays absent; arrays and objects are rejected.
pub(crate) fn flexible<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a scalar value, got {other}"
        ))),
    }
}

/// Empty or whitespace-only input counts as omitted.
pub(crate) fn normalize(raw: Option<String>) -> Option<String> {
    raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// ─── Field checks ───────────────────────────────────────────────────────
//
// Each helper normalizes its input, pushes a violation on failure, and
// returns the parsed value when there is one. Update validators reuse
// the exact same helpers, so create rules propagate automatically.

pub(crate) fn required_text(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
    max: usize,
) -> Option<String> {
    match normalize(raw) {
        None => {
            v.push(field, "es obligatorio");
            None
        }
        Some(s) => bounded(v, field, s, max),
    }
}

pub(crate) fn optional_text(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
    max: usize,
) -> Option<String> {
    normalize(raw).and_then(|s| bounded(v, field, s, max))
}

fn bounded(v: &mut Violations, field: &str, s: String, max: usize) -> Option<String> {
    if s.chars().count() > max {
        v.push(field, format!("supera el máximo de {max} caracteres"));
        None
    } else {
        Some(s)
    }
}

pub(crate) fn optional_email(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
) -> Option<String> {
    let s = optional_text(v, field, raw, MAX_EMAIL)?;
    if EMAIL_RE.is_match(&s) {
        Some(s)
    } else {
        v.push(field, "no es un email válido");
        None
    }
}

pub(crate) fn required_uuid(v: &mut Violations, field: &str, raw: Option<String>) -> Option<Uuid> {
    match normalize(raw) {
        None => {
            v.push(field, "es obligatorio");
            None
        }
        Some(s) => parse_uuid(v, field, &s),
    }
}

pub(crate) fn optional_uuid(v: &mut Violations, field: &str, raw: Option<String>) -> Option<Uuid> {
    normalize(raw).and_then(|s| parse_uuid(v, field, &s))
}

fn parse_uuid(v: &mut Violations, field: &str, s: &str) -> Option<Uuid> {
    match Uuid::parse_str(s) {
        Ok(id) => Some(id),
        Err(_) => {
            v.push(field, "no es un identificador válido");
            None
        }
    }
}

/// Strictly positive, finite number; `max` caps physically bounded fields.
pub(crate) fn optional_positive(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
    max: Option<f64>,
) -> Option<f64> {
    let s = normalize(raw)?;
    let Ok(n) = f64::from_str(&s) else {
        v.push(field, "debe ser un número");
        return None;
    };
    if !n.is_finite() || n <= 0.0 {
        v.push(field, "debe ser un número positivo");
        return None;
    }
    if let Some(max) = max {
        if n > max {
            v.push(field, format!("debe ser como máximo {max}"));
            return None;
        }
    }
    Some(n)
}

pub(crate) fn required_positive(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
    max: Option<f64>,
) -> Option<f64> {
    if normalize(raw.clone()).is_none() {
        v.push(field, "es obligatorio");
        return None;
    }
    optional_positive(v, field, raw, max)
}

/// Finite number ≥ 0 (zero is meaningful for nutritional values).
pub(crate) fn optional_non_negative(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
) -> Option<f64> {
    let s = normalize(raw)?;
    let Ok(n) = f64::from_str(&s) else {
        v.push(field, "debe ser un número");
        return None;
    };
    if !n.is_finite() || n < 0.0 {
        v.push(field, "debe ser un número mayor o igual a cero");
        return None;
    }
    Some(n)
}

pub(crate) fn required_date(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
) -> Option<NaiveDate> {
    match normalize(raw) {
        None => {
            v.push(field, "es obligatorio");
            None
        }
        Some(s) => match parse_date(&s) {
            Some(d) => Some(d),
            None => {
                v.push(field, "no es una fecha válida");
                None
            }
        },
    }
}

pub(crate) fn optional_date(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
) -> Option<NaiveDate> {
    let s = normalize(raw)?;
    match parse_date(&s) {
        Some(d) => Some(d),
        None => {
            v.push(field, "no es una fecha válida");
            None
        }
    }
}

pub(crate) fn required_datetime(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
) -> Option<NaiveDateTime> {
    match normalize(raw) {
        None => {
            v.push(field, "es obligatorio");
            None
        }
        Some(s) => match parse_datetime(&s) {
            Some(dt) => Some(dt),
            None => {
                v.push(field, "no es una fecha y hora válida");
                None
            }
        },
    }
}

pub(crate) fn optional_datetime(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
) -> Option<NaiveDateTime> {
    let s = normalize(raw)?;
    match parse_datetime(&s) {
        Some(dt) => Some(dt),
        None => {
            v.push(field, "no es una fecha y hora válida");
            None
        }
    }
}

/// Closed-set enum field; the message lists the accepted values.
pub(crate) fn optional_enum<T>(
    v: &mut Violations,
    field: &str,
    raw: Option<String>,
    accepted: &str,
) -> Option<T>
where
    T: FromStr,
{
    let s = normalize(raw)?;
    match T::from_str(&s) {
        Ok(value) => Some(value),
        Err(_) => {
            v.push(field, format!("debe ser uno de: {accepted}"));
            None
        }
    }
}

/// Lenient date parse: ISO, RFC 3339, or day-first local form.
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Lenient datetime parse: RFC 3339 plus the common local forms with or
/// without seconds.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_treats_blank_as_omitted() {
        assert_eq!(normalize(Some("".into())), None);
        assert_eq!(normalize(Some("   ".into())), None);
        assert_eq!(normalize(Some(" Ana ".into())), Some("Ana".into()));
        assert_eq!(normalize(None), None);
    }

    #[test]
    fn required_text_missing_is_a_violation() {
        let mut v = Violations::default();
        assert_eq!(required_text(&mut v, "nombre", None, MAX_NOMBRE), None);
        assert_eq!(required_text(&mut v, "apellido", Some("  ".into()), MAX_NOMBRE), None);
        let err = v.into_error();
        assert!(err.cites("nombre"));
        assert!(err.cites("apellido"));
    }

    #[test]
    fn bounded_text_rejects_overlong() {
        let mut v = Violations::default();
        let long = "x".repeat(MAX_NOMBRE + 1);
        assert_eq!(required_text(&mut v, "nombre", Some(long), MAX_NOMBRE), None);
        assert!(v.into_error().cites("nombre"));
    }

    #[test]
    fn email_shape_checked() {
        let mut v = Violations::default();
        assert_eq!(
            optional_email(&mut v, "email", Some("ana@clinica.com".into())),
            Some("ana@clinica.com".into())
        );
        assert!(v.is_empty());

        assert_eq!(optional_email(&mut v, "email", Some("no-es-email".into())), None);
        assert!(v.into_error().cites("email"));
    }

    #[test]
    fn positive_rejects_zero_and_negative() {
        let mut v = Violations::default();
        assert_eq!(optional_positive(&mut v, "pesoKg", Some("0".into()), None), None);
        assert_eq!(optional_positive(&mut v, "pesoKg", Some("-5".into()), None), None);
        assert_eq!(optional_positive(&mut v, "pesoKg", Some("NaN".into()), None), None);
        let err = v.into_error();
        assert_eq!(err.0.len(), 3);
        assert!(err.cites("pesoKg"));
    }

    #[test]
    fn positive_accepts_number_within_cap() {
        let mut v = Violations::default();
        assert_eq!(
            optional_positive(&mut v, "alturaCm", Some("172.5".into()), Some(MAX_ALTURA_CM)),
            Some(172.5)
        );
        assert_eq!(
            optional_positive(&mut v, "alturaCm", Some("301".into()), Some(MAX_ALTURA_CM)),
            None
        );
        assert!(v.into_error().cites("alturaCm"));
    }

    #[test]
    fn non_negative_accepts_zero() {
        let mut v = Violations::default();
        assert_eq!(optional_non_negative(&mut v, "grasasG", Some("0".into())), Some(0.0));
        assert!(v.is_empty());
    }

    #[test]
    fn date_parse_is_lenient() {
        assert_eq!(
            parse_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("15/01/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("2024-01-15T10:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_date("no es fecha"), None);
    }

    #[test]
    fn datetime_parse_accepts_common_forms() {
        for s in [
            "2024-03-01T09:30:00",
            "2024-03-01T09:30",
            "2024-03-01 09:30:00",
            "2024-03-01 09:30",
        ] {
            let dt = parse_datetime(s).unwrap();
            assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 09:30");
        }
        assert!(parse_datetime("mañana").is_none());
    }

    #[test]
    fn uuid_shape_checked() {
        let mut v = Violations::default();
        let id = Uuid::new_v4();
        assert_eq!(
            required_uuid(&mut v, "pacienteId", Some(id.to_string())),
            Some(id)
        );
        assert_eq!(required_uuid(&mut v, "pacienteId", Some("abc".into())), None);
        assert!(v.into_error().cites("pacienteId"));
    }

    #[test]
    fn error_message_names_fields() {
        let mut v = Violations::default();
        v.push("pesoKg", "debe ser un número positivo");
        v.push("fecha", "es obligatorio");
        let err = v.into_error();
        let msg = err.to_string();
        assert!(msg.contains("pesoKg: debe ser un número positivo"));
        assert!(msg.contains("fecha: es obligatorio"));
    }
}
