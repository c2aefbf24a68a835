// [apps/orchestrator/src/services/lifecycle/merging.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT MERGE ORCHESTRATOR (V3.2 - SUM PRESERVING)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: FUSIÓN DE COMPROMISOS CONFIRMADOS
 *
 * Guardas de fusión: mismas AZResource, todas Confirmed, ninguna en
 * transferencia; la fusión suma cantidades, toma el vencimiento máximo
 * y supersede cada entrada referenciando la fila nueva.
 * =================================================================
 */

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use custos_domain_lifecycle::state_machine;
use custos_domain_lifecycle::ChangeRequestBuilder;
use custos_domain_models::audit::CadfAction;
use custos_domain_models::commitment::{
    CommitmentDisplay, CommitmentReason, CommitmentStatus, CommitmentWorkflowContext,
    ProjectCommitment, TransferStatus,
};
use custos_infra_db::repositories::{CommitmentStore, TenancyRepository};
use custos_infra_db::DbError;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::audit_trail::AuditTrail;
use crate::services::lifecycle::{require_scope, CommitmentLifecycleService};

/// Cuerpo de la petición de fusión.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeCommitmentsCommand {
    pub commitment_ids: Vec<i64>,
}

impl CommitmentLifecycleService {
    /// POST /commitments/merge
    pub async fn merge_commitments(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        command: MergeCommitmentsCommand,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (_domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;

        let mut distinct_ids = command.commitment_ids.clone();
        distinct_ids.sort_unstable();
        distinct_ids.dedup();
        if distinct_ids.len() < 2 {
            return Err(LifecycleError::Conflict(
                "cannot merge this commitment: at least two distinct commitments are required"
                    .into(),
            ));
        }

        let mut merge_inputs: Vec<ProjectCommitment> = Vec::with_capacity(distinct_ids.len());
        for commitment_id in &distinct_ids {
            let (commitment, _) = self
                .load_commitment(&connection, project.id, *commitment_id)
                .await?;
            merge_inputs.push(commitment);
        }

        state_machine::check_merge(&merge_inputs)?;

        let az_context = custos_infra_db::repositories::CatalogRepository::az_resource_context(
            &connection,
            merge_inputs[0].az_resource_id,
        )
        .await?;
        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;
        let service_info = self.liquid_gateway.service_info(&az_context.service_type)?;

        let (merged_amount, merged_expires_at, merged_duration) =
            state_machine::plan_merge(&merge_inputs);

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let total_before = self
            .confirmed_total(&transaction, project.id, az_context.az_resource_id)
            .await?;

        let merged_uuid = Uuid::new_v4().to_string();
        let related_inputs: Vec<(i64, &str)> = merge_inputs
            .iter()
            .map(|input| (input.id, input.uuid.as_str()))
            .collect();

        // Una sola petición: la fila nueva más cada entrada superseded;
        // la suma se preserva, así que los totales no cambian.
        let mut builder = ChangeRequestBuilder::new(
            az_context.availability_zone.clone(),
            service_info.version,
        );
        builder.set_confirmed_totals(
            &project_metadata,
            &az_context.resource_name,
            total_before,
            total_before,
        );
        builder.record_creation(
            &project_metadata,
            &az_context.resource_name,
            &merged_uuid,
            CommitmentStatus::Confirmed,
            merged_amount,
            None,
            merged_expires_at,
        );
        for merge_input in &merge_inputs {
            builder.record_transition(
                &project_metadata,
                &az_context.resource_name,
                merge_input,
                Some(CommitmentStatus::Superseded),
            );
        }
        let change_request = builder.build();

        self.submit_informational(&az_context.service_type, &change_request).await;

        let merged_commitment = ProjectCommitment {
            id: 0,
            uuid: merged_uuid.clone(),
            project_id: project.id,
            az_resource_id: az_context.az_resource_id,
            amount: merged_amount,
            duration: merged_duration,
            created_at: now,
            creator_uuid: grant.operator_uuid.clone(),
            creator_name: grant.operator_name.clone(),
            confirm_by: None,
            confirmed_at: Some(now),
            expires_at: merged_expires_at,
            superseded_at: None,
            status: CommitmentStatus::Confirmed,
            transfer_status: TransferStatus::None,
            transfer_token: None,
            transfer_started_at: None,
            notify_on_confirm: false,
            notified_for_expiration: false,
            creation_context: CommitmentWorkflowContext::with_related(
                CommitmentReason::Merge,
                &related_inputs,
            ),
            supersede_context: None,
            renew_context: None,
        };

        let merged_row_id = CommitmentStore::insert(&transaction, &merged_commitment).await?;

        // Cada entrada superseded referencia la fila nueva.
        let supersede_context = CommitmentWorkflowContext::with_related(
            CommitmentReason::Merge,
            &[(merged_row_id, merged_uuid.as_str())],
        );
        for merge_input in &merge_inputs {
            CommitmentStore::mark_superseded(&transaction, merge_input.id, &supersede_context, now)
                .await?;
        }

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
            "🔗 [LIFECYCLE]: {} commitments merged into [{}] (amount {}).",
            merge_inputs.len(),
            merged_uuid,
            merged_amount
        );

        let merged_row =
            CommitmentStore::find_by_id_in_project(&connection, merged_row_id, project.id).await?;
        self.display_for(&connection, &merged_row, Some(grant)).await
    }
}
