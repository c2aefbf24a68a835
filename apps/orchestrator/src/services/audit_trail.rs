// [apps/orchestrator/src/services/audit_trail.rs]
/*!
 * =================================================================
 * APARATO: AUDIT TRAIL FAN-OUT (V3.2 - BUFFERED EMISSION)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: UN EVENTO POR (PROYECTO, RECURSO) TOCADO
 *
 * VISION 2026:
 * 1. REQUEST-LOCAL BUFFER: Los eventos se acumulan en memoria durante
 *    la transacción y se emiten SOLO tras un commit exitoso.
 * 2. TARGET PAYLOAD: Cada evento transporta la petición de cambio
 *    completa; las ediciones de transferencia adjuntan el changeset
 *    de atributos {old,new}.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use custos_domain_models::audit::{
    AttributeChangeset, AuditEvent, CadfAction, CadfInitiator, CadfTarget,
};
use custos_domain_models::liquid::CommitmentChangeRequest;
use custos_infra_db::repositories::AuditRepository;

use crate::middleware::OperatorGrant;
use crate::services::event_bus::EventBus;

/// Buffer request-local de eventos de auditoría.
pub struct AuditTrail {
    initiator: CadfInitiator,
    buffered_events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new(grant: &OperatorGrant) -> Self {
        Self {
            initiator: CadfInitiator {
                uuid: grant.operator_uuid.clone(),
                name: grant.operator_name.clone(),
            },
            buffered_events: Vec::new(),
        }
    }

    /// Registra un lado (proyecto, recurso) de un cambio aceptado.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        action: CadfAction,
        project_uuid: &str,
        service_type: &str,
        resource_name: &str,
        change_request: &CommitmentChangeRequest,
        attribute_changesets: Vec<AttributeChangeset>,
        observed_at: DateTime<Utc>,
    ) {
        self.buffered_events.push(AuditEvent {
            event_uuid: Uuid::new_v4().to_string(),
            observed_at,
            action,
            outcome: "success".to_string(),
            initiator: self.initiator.clone(),
            target: CadfTarget {
                project_uuid: project_uuid.to_string(),
                service_type: service_type.to_string(),
                resource_name: resource_name.to_string(),
                change_request: change_request.clone(),
            },
            attribute_changesets,
        });
    }

    pub fn buffered_count(&self) -> usize {
        self.buffered_events.len()
    }

    /// Emite el buffer: persistencia + difusión. Se invoca ÚNICAMENTE
    /// después de que 'commit()' haya retornado sin error; los fallos de
    /// emisión se registran pero no revierten el negocio ya comprometido.
    pub async fn seal_after_commit(
        self,
        audit_repository: &Arc<AuditRepository>,
        event_bus: &Arc<EventBus>,
    ) {
        for event in self.buffered_events {
            if let Err(persistence_fault) = audit_repository.persist_event(&event).await {
                warn!(
                    "⚠️ [AUDIT_TRAIL]: Event {} could not be persisted: {}",
                    event.event_uuid, persistence_fault
                );
            }
            event_bus.broadcast_audit_sealed(event);
        }
    }
}
