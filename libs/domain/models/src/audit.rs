// [libs/domain/models/src/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT EVENT MODELS (V3.0 - CADF MIRROR)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: EVENTO ESTRUCTURADO POR (PROYECTO, RECURSO) TOCADO
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::liquid::CommitmentChangeRequest;

/// Acción del evento, con semántica CADF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CadfAction {
    Create,
    Update,
    Delete,
}

/// Identidad del operador que originó el cambio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadfInitiator {
    pub uuid: String,
    pub name: String,
}

/// Objetivo del evento: el lado de proyecto del cambio, con la petición
/// de cambio completa adjunta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadfTarget {
    pub project_uuid: String,
    pub service_type: String,
    pub resource_name: String,
    pub change_request: CommitmentChangeRequest,
}

/// Cambio de atributo adjunto en ediciones de estado de transferencia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChangeset {
    pub commitment_uuid: String,
    pub old_transfer_status: String,
    pub new_transfer_status: String,
}

/// Evento de auditoría producido por cada lado de proyecto de un cambio
/// exitoso. Se bufferiza durante la transacción y se emite tras el commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_uuid: String,
    pub observed_at: DateTime<Utc>,
    pub action: CadfAction,
    /// Siempre "success": los fallos nunca llegan a emitirse.
    pub outcome: String,
    pub initiator: CadfInitiator,
    pub target: CadfTarget,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_changesets: Vec<AttributeChangeset>,
}

/// Señales difundidas por el bus de eventos del orquestador.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_kind", content = "payload")]
pub enum RealTimeEvent {
    /// Un evento de auditoría fue sellado tras un commit exitoso.
    AuditSealed(AuditEvent),
    /// Un camino de confirmación inmediata exige recalcular cuotas usables.
    CapacityRescrapeRequested { service_type: String },
    /// Se encoló correo para un proyecto (confirmación o pre-expiración).
    MailQueued { project_uuid: String, subject: String },
}
