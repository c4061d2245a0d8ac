//! Outbound consultation notifications.
//!
//! When a consultation is scheduled the practitioner can ask for a
//! confirmation notice to the patient. Delivery goes through a single
//! configured webhook URL; the receiving automation owns the actual
//! channel (email, WhatsApp, whatever the practice wired up). Delivery
//! is best-effort: the caller records the failure and moves on, the
//! consultation itself is never rolled back over a notification.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Consulta, Paciente};

const WEBHOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no webhook URL configured")]
    MissingWebhookUrl,
    #[error("patient has no email on file")]
    MissingEmail,
    #[error("webhook request failed: {0}")]
    Http(String),
    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Notification envelope. The receiving automation matches on these
/// exact field names; they are part of the practice's integration
/// contract and stay in Spanish.
#[derive(Debug, Serialize)]
pub struct AvisoConsulta<'a> {
    pub paciente: PacienteAviso<'a>,
    pub consulta: ConsultaAviso<'a>,
    pub nutricionista: NutricionistaAviso<'a>,
}

#[derive(Debug, Serialize)]
pub struct PacienteAviso<'a> {
    pub nombre: &'a str,
    pub apellido: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ConsultaAviso<'a> {
    pub fecha: String,
    pub hora: String,
    pub lugar: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct NutricionistaAviso<'a> {
    pub nombre: &'a str,
}

impl<'a> AvisoConsulta<'a> {
    /// Build the envelope for one consultation. Requires the patient to
    /// have an email on file; without one there is nobody to notify.
    pub fn new(
        paciente: &'a Paciente,
        consulta: &'a Consulta,
        nutricionista: &'a str,
    ) -> Result<Self, NotifyError> {
        let email = paciente.email.as_deref().ok_or(NotifyError::MissingEmail)?;
        Ok(Self {
            paciente: PacienteAviso {
                nombre: &paciente.nombre,
                apellido: &paciente.apellido,
                email,
            },
            consulta: ConsultaAviso {
                fecha: consulta.inicio.format("%Y-%m-%d").to_string(),
                hora: consulta.inicio.format("%H:%M").to_string(),
                lugar: consulta.lugar.as_deref(),
            },
            nutricionista: NutricionistaAviso {
                nombre: nutricionista,
            },
        })
    }
}

/// HTTP client for the practice's notification webhook.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    url: Option<String>,
}

impl WebhookClient {
    pub fn new(url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self { http, url }
    }

    /// POST the envelope to the configured webhook. Any 2xx counts as
    /// delivered; everything else is an error for the caller to log.
    pub async fn send_aviso(&self, aviso: &AvisoConsulta<'_>) -> Result<(), NotifyError> {
        let url = self
            .url
            .as_deref()
            .ok_or(NotifyError::MissingWebhookUrl)?;

        let response = self
            .http
            .post(url)
            .json(aviso)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Http(format!(
                        "request timed out after {WEBHOOK_TIMEOUT_SECS}s"
                    ))
                } else if e.is_connect() {
                    NotifyError::Http(format!("cannot reach {url}"))
                } else {
                    NotifyError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EstadoConsulta, EstadoPago};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn paciente(email: Option<&str>) -> Paciente {
        let ahora = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Paciente {
            id: Uuid::new_v4(),
            usuario_id: Uuid::new_v4(),
            nombre: "Ana".into(),
            apellido: "García".into(),
            email: email.map(Into::into),
            telefono: None,
            fecha_nacimiento: None,
            sexo: None,
            altura_cm: None,
            notas: None,
            activo: true,
            creado_en: ahora,
            actualizado_en: ahora,
        }
    }

    fn consulta(lugar: Option<&str>) -> Consulta {
        let inicio = NaiveDate::from_ymd_opt(2026, 6, 10)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        Consulta {
            id: Uuid::new_v4(),
            usuario_id: Uuid::new_v4(),
            paciente_id: Uuid::new_v4(),
            inicio,
            fin: inicio + chrono::Duration::minutes(45),
            estado: EstadoConsulta::Programado,
            estado_pago: EstadoPago::Pendiente,
            lugar: lugar.map(Into::into),
            notas: None,
            creado_en: inicio,
            actualizado_en: inicio,
        }
    }

    #[test]
    fn envelope_uses_the_agreed_wire_names() {
        let p = paciente(Some("ana@correo.ar"));
        let c = consulta(Some("Consultorio 2"));
        let aviso = AvisoConsulta::new(&p, &c, "Laura").unwrap();
        let v = serde_json::to_value(&aviso).unwrap();

        assert_eq!(v["paciente"]["nombre"], "Ana");
        assert_eq!(v["paciente"]["apellido"], "García");
        assert_eq!(v["paciente"]["email"], "ana@correo.ar");
        assert_eq!(v["consulta"]["fecha"], "2026-06-10");
        assert_eq!(v["consulta"]["hora"], "14:30");
        assert_eq!(v["consulta"]["lugar"], "Consultorio 2");
        assert_eq!(v["nutricionista"]["nombre"], "Laura");
    }

    #[test]
    fn missing_lugar_serializes_as_null() {
        let p = paciente(Some("ana@correo.ar"));
        let c = consulta(None);
        let aviso = AvisoConsulta::new(&p, &c, "Laura").unwrap();
        let v = serde_json::to_value(&aviso).unwrap();
        assert!(v["consulta"]["lugar"].is_null());
    }

    #[test]
    fn patient_without_email_cannot_be_notified() {
        let p = paciente(None);
        let c = consulta(None);
        let err = AvisoConsulta::new(&p, &c, "Laura").unwrap_err();
        assert!(matches!(err, NotifyError::MissingEmail));
    }

    #[tokio::test]
    async fn missing_url_short_circuits_without_io() {
        let p = paciente(Some("ana@correo.ar"));
        let c = consulta(None);
        let aviso = AvisoConsulta::new(&p, &c, "Laura").unwrap();
        let err = WebhookClient::new(None).send_aviso(&aviso).await.unwrap_err();
        assert!(matches!(err, NotifyError::MissingWebhookUrl));
    }
}
