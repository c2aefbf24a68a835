// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT TRAIL REPOSITORY (V3.1 - POST-COMMIT SEAL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE EVENTOS CADF SELLADOS
 *
 * Los eventos llegan aquí SOLO después de que la transacción de negocio
 * haya comprometido; un rechazo del backend jamás deja rastro.
 * =================================================================
 */

use libsql::params;
use tracing::{info, instrument};

use custos_domain_models::audit::AuditEvent;

use crate::errors::DbError;
use crate::repositories::rowmap::fmt_instant;
use crate::LedgerClient;

pub struct AuditRepository {
    database_client: LedgerClient,
}

impl AuditRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { database_client: client }
    }

    /// Sella un evento emitido en la tabla de auditoría.
    #[instrument(skip(self, event))]
    pub async fn persist_event(&self, event: &AuditEvent) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let payload_json = serde_json::to_string(event)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        connection
            .execute(
                "INSERT INTO audit_events (
                    event_uuid, observed_at, action, outcome,
                    initiator_uuid, initiator_name,
                    project_uuid, service_type, resource_name, payload_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event.event_uuid.as_str(),
                    fmt_instant(event.observed_at),
                    serde_json::to_string(&event.action)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?
                        .trim_matches('"')
                        .to_string(),
                    event.outcome.as_str(),
                    event.initiator.uuid.as_str(),
                    event.initiator.name.as_str(),
                    event.target.project_uuid.as_str(),
                    event.target.service_type.as_str(),
                    event.target.resource_name.as_str(),
                    payload_json
                ],
            )
            .await?;

        info!(
            "🛡️ [AUDIT_SEALED]: Event {} for project {} on {}/{}.",
            event.event_uuid,
            event.target.project_uuid,
            event.target.service_type,
            event.target.resource_name
        );
        Ok(())
    }

    pub async fn count_events(&self) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT COUNT(*) FROM audit_events", ())
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = crate::repositories::rowmap::int_at(&row, 0)?;
            Ok(count as u64)
        } else {
            Ok(0)
        }
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/audit.rs]
