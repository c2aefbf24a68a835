// [apps/orchestrator/src/services/lifecycle/renewal.rs]
/*!
 * =================================================================
 * APARATO: RENEWAL & DURATION ORCHESTRATOR (V3.3 - WINDOWED)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: RENOVACIÓN DENTRO DE VENTANA Y EXTENSIÓN DE
 *                  DURACIÓN (SOLO HACIA DELANTE)
 *
 * Renovar no es una transición de estado: inserta una fila Planned con
 * confirm_by = expires_at del original y sella renew_context en este.
 * Como máximo una cadena de renovación activa por original.
 * =================================================================
 */

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use custos_domain_lifecycle::state_machine;
use custos_domain_lifecycle::ChangeRequestBuilder;
use custos_domain_models::audit::CadfAction;
use custos_domain_models::commitment::{
    CommitmentDisplay, CommitmentDuration, CommitmentReason, CommitmentStatus,
    CommitmentWorkflowContext, ProjectCommitment, TransferStatus,
};
use custos_infra_db::repositories::{CommitmentStore, TenancyRepository};
use custos_infra_db::DbError;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::audit_trail::AuditTrail;
use crate::services::lifecycle::{require_scope, CommitmentLifecycleService};

/// Cuerpo de la petición de cambio de duración.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDurationCommand {
    pub duration: CommitmentDuration,
}

impl CommitmentLifecycleService {
    /// POST /commitments/{id}/renew
    pub async fn renew_commitment(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        commitment_id: i64,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (_domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;
        let (original, az_context) = self
            .load_commitment(&connection, project.id, commitment_id)
            .await?;

        // Guardia acumulativa: estado, expiración, ventana de 90 días y
        // renovación previa se reportan juntos.
        state_machine::check_renew(&original, now)?;

        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;
        let service_info = self.liquid_gateway.service_info(&az_context.service_type)?;

        let renewal_uuid = Uuid::new_v4().to_string();
        let renewal_confirm_by = original.expires_at;
        let renewal_expires_at = original.duration.add_to(original.expires_at);

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let total_before = self
            .confirmed_total(&transaction, project.id, az_context.az_resource_id)
            .await?;

        // La inserción de renovación no altera totales: informativa.
        let mut builder = ChangeRequestBuilder::new(
            az_context.availability_zone.clone(),
            service_info.version,
        );
        builder
            .set_confirmed_totals(
                &project_metadata,
                &az_context.resource_name,
                total_before,
                total_before,
            )
            .record_creation(
                &project_metadata,
                &az_context.resource_name,
                &renewal_uuid,
                CommitmentStatus::Planned,
                original.amount,
                Some(renewal_confirm_by),
                renewal_expires_at,
            );
        let change_request = builder.build();

        self.submit_informational(&az_context.service_type, &change_request).await;

        let renewal_commitment = ProjectCommitment {
            id: 0,
            uuid: renewal_uuid.clone(),
            project_id: project.id,
            az_resource_id: original.az_resource_id,
            amount: original.amount,
            duration: original.duration,
            created_at: now,
            creator_uuid: grant.operator_uuid.clone(),
            creator_name: grant.operator_name.clone(),
            confirm_by: Some(renewal_confirm_by),
            confirmed_at: None,
            expires_at: renewal_expires_at,
            superseded_at: None,
            status: CommitmentStatus::Planned,
            transfer_status: TransferStatus::None,
            transfer_token: None,
            transfer_started_at: None,
            notify_on_confirm: false,
            notified_for_expiration: false,
            creation_context: CommitmentWorkflowContext::with_related(
                CommitmentReason::Renew,
                &[(original.id, original.uuid.as_str())],
            ),
            supersede_context: None,
            renew_context: None,
        };

        let renewal_row_id = CommitmentStore::insert(&transaction, &renewal_commitment).await?;

        // El original queda marcado como renovado.
        CommitmentStore::set_renew_context(
            &transaction,
            original.id,
            &CommitmentWorkflowContext::with_related(
                CommitmentReason::Renew,
                &[(renewal_row_id, renewal_uuid.as_str())],
            ),
        )
        .await?;

        transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        let mut audit_trail = AuditTrail::new(grant);
        audit_trail.record(
            CadfAction::Create,
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
            "🌱 [LIFECYCLE]: Commitment [{}] renewed as [{}] (confirm_by {}).",
            original.uuid, renewal_uuid, renewal_confirm_by
        );

        let renewal_row =
            CommitmentStore::find_by_id_in_project(&connection, renewal_row_id, project.id).await?;
        self.display_for(&connection, &renewal_row, Some(grant)).await
    }

    /// POST /commitments/{id}/update-duration
    pub async fn update_commitment_duration(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        commitment_id: i64,
        command: UpdateDurationCommand,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;
        let (commitment, az_context) = self
            .load_commitment(&connection, project.id, commitment_id)
            .await?;

        let behavior = self
            .cluster_config
            .commitment_behavior(&az_context.service_type, &az_context.resource_name, &domain.name)
            .ok_or_else(|| {
                LifecycleError::Validation("commitments are not enabled for this resource".into())
            })?;
        if !behavior.permits_duration(&command.duration) {
            return Err(LifecycleError::Validation(
                "unacceptable commitment duration".into(),
            ));
        }

        // Solo extensión: el ancla es confirm_by si existe, o created_at.
        let new_expires_at = command
            .duration
            .add_to(commitment.confirm_by.unwrap_or(commitment.created_at));
        state_machine::check_update_duration(&commitment, new_expires_at)?;

        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;
        let service_info = self.liquid_gateway.service_info(&az_context.service_type)?;

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let total_before = self
            .confirmed_total(&transaction, project.id, az_context.az_resource_id)
            .await?;

        // Los totales no cambian, pero el veredicto del backend es
        // autoritativo en este paso; 'old_expires_at' viaja informativo.
        let mut builder = ChangeRequestBuilder::new(
            az_context.availability_zone.clone(),
            service_info.version,
        );
        builder
            .set_confirmed_totals(
                &project_metadata,
                &az_context.resource_name,
                total_before,
                total_before,
            )
            .record_extension(
                &project_metadata,
                &az_context.resource_name,
                &commitment,
                new_expires_at,
            );
        let change_request = builder.build();

        self.submit_required(&az_context.service_type, &change_request).await?;

        CommitmentStore::update_duration(
            &transaction,
            commitment.id,
            &command.duration,
            new_expires_at,
        )
        .await?;

        transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        let mut audit_trail = AuditTrail::new(grant);
        audit_trail.record(
            CadfAction::Update,
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
            "📏 [LIFECYCLE]: Commitment [{}] extended to expire at {}.",
            commitment.uuid, new_expires_at
        );

        let updated_row =
            CommitmentStore::find_by_id_in_project(&connection, commitment.id, project.id).await?;
        self.display_for(&connection, &updated_row, Some(grant)).await
    }
}
