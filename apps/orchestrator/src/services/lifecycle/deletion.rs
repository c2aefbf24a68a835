// [apps/orchestrator/src/services/lifecycle/deletion.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT DELETION ORCHESTRATOR (V3.2 - GUARDED)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: BORRADO EXPLÍCITO RATIFICADO POR EL BACKEND
 *
 * Único camino que elimina físicamente una fila. El backend ratifica
 * siempre: su rechazo es autoritativo y se releva con 'Retry-After'.
 * =================================================================
 */

use tracing::info;

use custos_domain_lifecycle::state_machine;
use custos_domain_lifecycle::ChangeRequestBuilder;
use custos_domain_models::audit::CadfAction;
use custos_domain_models::commitment::CommitmentStatus;
use custos_infra_db::repositories::{CommitmentStore, TenancyRepository};
use custos_infra_db::DbError;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::audit_trail::AuditTrail;
use crate::services::lifecycle::{require_scope, CommitmentLifecycleService};

impl CommitmentLifecycleService {
    /// DELETE /commitments/{id}
    pub async fn delete_commitment(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        commitment_id: i64,
    ) -> Result<(), LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (_domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;
        let (commitment, az_context) = self
            .load_commitment(&connection, project.id, commitment_id)
            .await?;

        state_machine::check_delete(&commitment)?;

        // Política específica del compromiso, además de 'project:edit'.
        if !self.deletion_permitted(grant, &commitment, now) {
            return Err(LifecycleError::Forbidden);
        }

        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;
        let service_info = self.liquid_gateway.service_info(&az_context.service_type)?;

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let total_before = self
            .confirmed_total(&transaction, project.id, az_context.az_resource_id)
            .await?;
        let confirmed_delta = if commitment.status == CommitmentStatus::Confirmed {
            commitment.amount
        } else {
            0
        };

        let mut builder = ChangeRequestBuilder::new(
            az_context.availability_zone.clone(),
            service_info.version,
        );
        builder
            .set_confirmed_totals(
                &project_metadata,
                &az_context.resource_name,
                total_before,
                total_before - confirmed_delta,
            )
            // Destino ausente: la fila deja de existir.
            .record_transition(&project_metadata, &az_context.resource_name, &commitment, None);
        let change_request = builder.build();

        self.submit_required(&az_context.service_type, &change_request).await?;

        CommitmentStore::delete_row(&transaction, commitment.id).await?;

        transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        let mut audit_trail = AuditTrail::new(grant);
        audit_trail.record(
            CadfAction::Delete,
            &project_metadata.uuid,
            &az_context.service_type,
            &az_context.resource_name,
            &change_request,
            Vec::new(),
            now,
        );
        audit_trail
            .seal_after_commit(&self.audit_repository, &self.event_bus)
            .await;

        info!(
            "🗑️ [LIFECYCLE]: Commitment [{}] deleted from project {}.",
            commitment.uuid, project_metadata.uuid
        );
        Ok(())
    }
}
