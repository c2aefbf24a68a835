// [apps/orchestrator/src/services/event_bus.rs]
/*!
 * =================================================================
 * APARATO: EVENT BUS SERVICE (V3.1 - BROADCASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN DE SEÑALES POST-COMMIT
 *
 * El bus solo transporta hechos consumados: eventos de auditoría
 * sellados, señales de rescrape y correo encolado. Nada viaja antes
 * del commit de la transacción que lo originó.
 * =================================================================
 */

use tokio::sync::broadcast;
use tracing::{debug, instrument};

use custos_domain_models::audit::{AuditEvent, RealTimeEvent};

/// Capacidad del canal de difusión.
const CHANNEL_CAPACITY: usize = 4096;

/// Orquestador central de señales en tiempo real.
#[derive(Debug, Clone)]
pub struct EventBus {
    internal_transmission_channel: broadcast::Sender<RealTimeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            internal_transmission_channel: sender,
        }
    }

    /// Genera un receptor para consumidores de señales (dashboards, QA).
    pub fn subscribe(&self) -> broadcast::Receiver<RealTimeEvent> {
        self.internal_transmission_channel.subscribe()
    }

    /// Difunde un evento de auditoría ya sellado.
    #[instrument(skip(self, audit_event))]
    pub fn broadcast_audit_sealed(&self, audit_event: AuditEvent) {
        self.dispatch(RealTimeEvent::AuditSealed(audit_event));
    }

    /// Señal de recálculo de cuotas usables tras confirmación inmediata.
    #[instrument(skip(self))]
    pub fn broadcast_rescrape_requested(&self, service_type: &str) {
        self.dispatch(RealTimeEvent::CapacityRescrapeRequested {
            service_type: service_type.to_string(),
        });
    }

    /// Aviso de correo encolado para un proyecto.
    #[instrument(skip(self))]
    pub fn broadcast_mail_queued(&self, project_uuid: &str, subject: &str) {
        self.dispatch(RealTimeEvent::MailQueued {
            project_uuid: project_uuid.to_string(),
            subject: subject.to_string(),
        });
    }

    fn dispatch(&self, event: RealTimeEvent) {
        // La ausencia de suscriptores no es un fallo del reactor.
        match self.internal_transmission_channel.send(event) {
            Ok(receiver_count) => {
                debug!("📢 [EVENT_BUS]: Signal dispatched to {} receivers.", receiver_count);
            }
            Err(_) => {
                debug!("📢 [EVENT_BUS]: Signal dropped (no active receivers).");
            }
        }
    }
}
