// [libs/domain/models/src/liquid.rs]
/*!
 * =================================================================
 * APARATO: LIQUID WIRE PROTOCOL (V3.1 - ACCEPTANCE DIALOGUE)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE CAMBIO DE COMPROMISOS HACIA EL BACKEND
 *
 * VISION 2026:
 * 1. TOTALS AS BOUNDARY: 'total_confirmed_before/after' es el escalar
 *    que el backend ratifica; nunca se envían deltas por fila sin él.
 * 2. IDEMPOTENT CHANNEL: El protocolo es idempotente a granularidad
 *    (proyecto, recurso); el transporte es opaco.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::commitment::CommitmentStatus;

/// Identidad del proyecto tal como la ve el backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub uuid: String,
    pub name: String,
    pub domain_uuid: String,
    pub domain_name: String,
}

/// Una fila de compromiso dentro del diálogo de aceptación.
///
/// 'old_status'/'new_status' ausentes significan que el compromiso no
/// existe en ese lado de la transición.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentChangeEntry {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_status: Option<CommitmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<CommitmentStatus>,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_by: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    /// Transportado en extensiones de duración, a título informativo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_expires_at: Option<DateTime<Utc>>,
}

/// Cambios propuestos sobre un recurso de un proyecto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceCommitmentChangeset {
    pub total_confirmed_before: u64,
    pub total_confirmed_after: u64,
    /// Reservado; siempre 0 por ahora.
    pub total_guaranteed_before: u64,
    /// Reservado; siempre 0 por ahora.
    pub total_guaranteed_after: u64,
    #[serde(default)]
    pub commitments: Vec<CommitmentChangeEntry>,
}

impl ResourceCommitmentChangeset {
    pub fn requires_confirmation(&self) -> bool {
        self.total_confirmed_before != self.total_confirmed_after
    }
}

/// Cambios propuestos sobre un proyecto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCommitmentChangeset {
    pub project_metadata: ProjectMetadata,
    #[serde(default)]
    pub by_resource: BTreeMap<String, ResourceCommitmentChangeset>,
}

/// Petición completa de cambio de compromisos hacia un driver liquid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentChangeRequest {
    pub availability_zone: String,
    /// Token de vivacidad: debe coincidir con el ServiceInfo vigente.
    pub info_version: u64,
    /// Un dry-run no puede tener efecto durable en el backend.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub by_project: BTreeMap<String, ProjectCommitmentChangeset>,
}

impl CommitmentChangeRequest {
    /// Un cambio requiere confirmación sii algún recurso altera su total
    /// confirmado. Los demás cambios solo informan al backend.
    pub fn requires_confirmation(&self) -> bool {
        self.by_project.values().any(|project_changeset| {
            project_changeset
                .by_resource
                .values()
                .any(ResourceCommitmentChangeset::requires_confirmation)
        })
    }
}

/// Veredicto del backend. 'rejection_reason' no vacío es rechazo;
/// 'retry_at' es consultivo y se releva como 'Retry-After'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommitmentChangeResponse {
    #[serde(default)]
    pub rejection_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<DateTime<Utc>>,
}

impl CommitmentChangeResponse {
    pub fn accepted() -> Self {
        Self::default()
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            rejection_reason: reason.into(),
            retry_at: None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        !self.rejection_reason.is_empty()
    }
}
