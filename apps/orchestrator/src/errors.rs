// [apps/orchestrator/src/errors.rs]
/*!
 * =================================================================
 * APARATO: LIFECYCLE ERROR SURFACE (V3.2 - SEMANTIC MAPPING)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: MAPEO 1:1 DE FALLOS DE DOMINIO A LA SUPERFICIE HTTP
 *
 * VISION 2026:
 * 1. NO LEAKAGE: Los fallos internos (DB, red) se presentan ofuscados
 *    como 5xx; el detalle completo queda solo en el rastro de logs.
 * 2. RETRY RELAY: El 'retry_at' consultivo del backend viaja como
 *    cabecera 'Retry-After'.
 * =================================================================
 */

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::error;

use custos_domain_lifecycle::GuardRefusal;
use custos_infra_db::DbError;
use custos_infra_liquid::LiquidError;

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Autorización insuficiente. Cuerpo fijo.
    #[error("Forbidden")]
    Forbidden,

    /// Cuerpo malformado o parámetro requerido ausente (400).
    #[error("{0}")]
    BadRequest(String),

    /// Fallo semántico de validación (422).
    #[error("{0}")]
    Validation(String),

    /// Conflicto de máquina de estados (409).
    #[error("{0}")]
    Conflict(String),

    /// Objetivo de ruta inexistente (404).
    #[error("{0}")]
    NotFound(String),

    /// El backend rechazó el cambio; su razón es autoritativa (409).
    #[error("{reason}")]
    BackendRejected {
        reason: String,
        retry_at: Option<DateTime<Utc>>,
    },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Liquid(#[from] LiquidError),
}

impl From<GuardRefusal> for LifecycleError {
    fn from(refusal: GuardRefusal) -> Self {
        Self::Conflict(refusal.to_string())
    }
}

/// 'Retry-After' en formato HTTP-date (IMF-fixdate).
fn http_date(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        match self {
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden\n".to_string()).into_response(),

            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, format!("{}\n", message)).into_response()
            }

            Self::Validation(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, format!("{}\n", message)).into_response()
            }

            Self::Conflict(message) => {
                (StatusCode::CONFLICT, format!("{}\n", message)).into_response()
            }

            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, format!("{}\n", message)).into_response()
            }

            Self::BackendRejected { reason, retry_at } => match retry_at {
                Some(instant) => (
                    StatusCode::CONFLICT,
                    [(header::RETRY_AFTER, http_date(instant))],
                    format!("{}\n", reason),
                )
                    .into_response(),
                None => (StatusCode::CONFLICT, format!("{}\n", reason)).into_response(),
            },

            Self::Db(fault) => match fault {
                DbError::DomainNotFound => {
                    (StatusCode::NOT_FOUND, "no such domain\n".to_string()).into_response()
                }
                DbError::ProjectNotFound => {
                    (StatusCode::NOT_FOUND, "no such project\n".to_string()).into_response()
                }
                DbError::CommitmentNotFound => {
                    (StatusCode::NOT_FOUND, "no such commitment\n".to_string()).into_response()
                }
                DbError::TransferTokenNotFound => {
                    (StatusCode::NOT_FOUND, "no matching commitment found\n".to_string())
                        .into_response()
                }
                // Anclaje irresoluble: defensa en profundidad.
                DbError::ResourceNotFound | DbError::AzResourceNotFound => {
                    (StatusCode::NOT_FOUND, "no such resource\n".to_string()).into_response()
                }
                internal_fault => {
                    error!("💀 [API_FAULT]: database failure: {}", internal_fault);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error\n".to_string(),
                    )
                        .into_response()
                }
            },

            Self::Liquid(fault) => {
                error!("💀 [API_FAULT]: liquid gateway failure: {}", fault);
                (
                    StatusCode::BAD_GATEWAY,
                    "backend driver unavailable\n".to_string(),
                )
                    .into_response()
            }
        }
    }
}
