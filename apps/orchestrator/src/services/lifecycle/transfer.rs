// [apps/orchestrator/src/services/lifecycle/transfer.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT TRANSFER ORCHESTRATOR (V3.4 - ATOMIC MOVE)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: START-TRANSFER, DETALLE POR TOKEN Y ACEPTACIÓN
 *
 * VISION 2026:
 * 1. TOKEN AS CREDENTIAL: El token opaco autoriza al contraparte; su
 *    ausencia es 404. Unicidad global por índice del ledger.
 * 2. SPLIT ON PARTIAL: Habilitar transferencia parcial produce dos
 *    hermanas Confirmed que suman exactamente el original;
 *    el original se supersede con razón Split.
 * 3. PAIRED TOTALS: La aceptación mueve ambos lados (origen y destino)
 *    en UNA petición; o se actualizan las dos filas o ninguna.
 * =================================================================
 */

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use custos_domain_lifecycle::state_machine;
use custos_domain_lifecycle::ChangeRequestBuilder;
use custos_domain_models::audit::{AttributeChangeset, CadfAction};
use custos_domain_models::commitment::{
    CommitmentDisplay, CommitmentReason, CommitmentStatus, CommitmentWorkflowContext,
    ProjectCommitment, TransferStatus,
};
use custos_infra_db::repositories::commitment::generate_transfer_token;
use custos_infra_db::repositories::{
    CatalogRepository, CommitmentStore, TenancyRepository,
};
use custos_infra_db::DbError;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::audit_trail::AuditTrail;
use crate::services::lifecycle::{require_scope, CommitmentLifecycleService};

/// Cuerpo de la petición de inicio de transferencia.
#[derive(Debug, Clone, Deserialize)]
pub struct StartTransferCommand {
    pub amount: u64,
    pub transfer_status: TransferStatus,
}

impl CommitmentLifecycleService {
    /// POST /commitments/{id}/start-transfer
    pub async fn start_transfer(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        commitment_id: i64,
        command: StartTransferCommand,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (_domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;
        let (commitment, az_context) = self
            .load_commitment(&connection, project.id, commitment_id)
            .await?;

        state_machine::check_start_transfer(&commitment, command.amount, command.transfer_status)?;

        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;
        let service_info = self.liquid_gateway.service_info(&az_context.service_type)?;

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let total_before = self
            .confirmed_total(&transaction, project.id, az_context.az_resource_id)
            .await?;

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

        let leaving_transfer = command.transfer_status == TransferStatus::None;
        let is_full_amount = command.amount == commitment.amount;

        let mut attribute_changesets = Vec::new();
        let result_row_id;

        if leaving_transfer || is_full_amount {
            // Edición in-place: visibilidad y token, sin tocar cantidades.
            builder.record_unchanged(&project_metadata, &az_context.resource_name, &commitment);

            let (next_token, next_started_at) = if leaving_transfer {
                (None, None)
            } else {
                (Some(generate_transfer_token()), Some(now))
            };

            CommitmentStore::update_transfer_state(
                &transaction,
                commitment.id,
                command.transfer_status,
                next_token.as_deref(),
                next_started_at,
            )
            .await?;

            attribute_changesets.push(AttributeChangeset {
                commitment_uuid: commitment.uuid.clone(),
                old_transfer_status: commitment.transfer_status.as_str().to_string(),
                new_transfer_status: command.transfer_status.as_str().to_string(),
            });
            result_row_id = commitment.id;
        } else {
            // Split parcial: hermana transferible + hermana remanente.
            let (carved_amount, remainder_amount) =
                state_machine::plan_split(commitment.amount, command.amount);

            let carved_uuid = Uuid::new_v4().to_string();
            let remainder_uuid = Uuid::new_v4().to_string();

            let mut carved_sibling = split_sibling(&commitment, &carved_uuid, carved_amount, now);
            carved_sibling.transfer_status = command.transfer_status;
            carved_sibling.transfer_token = Some(generate_transfer_token());
            carved_sibling.transfer_started_at = Some(now);

            let remainder_sibling =
                split_sibling(&commitment, &remainder_uuid, remainder_amount, now);

            builder
                .record_creation(
                    &project_metadata,
                    &az_context.resource_name,
                    &carved_uuid,
                    CommitmentStatus::Confirmed,
                    carved_amount,
                    None,
                    commitment.expires_at,
                )
                .record_creation(
                    &project_metadata,
                    &az_context.resource_name,
                    &remainder_uuid,
                    CommitmentStatus::Confirmed,
                    remainder_amount,
                    None,
                    commitment.expires_at,
                )
                .record_transition(
                    &project_metadata,
                    &az_context.resource_name,
                    &commitment,
                    Some(CommitmentStatus::Superseded),
                );

            let carved_row_id = CommitmentStore::insert(&transaction, &carved_sibling).await?;
            let remainder_row_id =
                CommitmentStore::insert(&transaction, &remainder_sibling).await?;

            CommitmentStore::mark_superseded(
                &transaction,
                commitment.id,
                &CommitmentWorkflowContext::with_related(
                    CommitmentReason::Split,
                    &[
                        (carved_row_id, carved_uuid.as_str()),
                        (remainder_row_id, remainder_uuid.as_str()),
                    ],
                ),
                now,
            )
            .await?;

            attribute_changesets.push(AttributeChangeset {
                commitment_uuid: carved_uuid.clone(),
                old_transfer_status: TransferStatus::None.as_str().to_string(),
                new_transfer_status: command.transfer_status.as_str().to_string(),
            });
            result_row_id = carved_row_id;
        }

        let change_request = builder.build();

        // Totales intactos: cambio sin confirmación, el backend se informa.
        self.submit_informational(&az_context.service_type, &change_request).await;

        transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        let mut audit_trail = AuditTrail::new(grant);
        audit_trail.record(
            CadfAction::Update,
            &project_metadata.uuid,
            &az_context.service_type,
            &az_context.resource_name,
            &change_request,
            attribute_changesets,
            now,
        );
        audit_trail
            .seal_after_commit(&self.audit_repository, &self.event_bus)
            .await;

        info!(
            "📦 [LIFECYCLE]: Commitment [{}] transfer status now {:?} (amount {}).",
            commitment.uuid,
            command.transfer_status.as_str(),
            command.amount
        );

        let result_row =
            CommitmentStore::find_by_id_in_project(&connection, result_row_id, project.id).await?;
        self.display_for(&connection, &result_row, Some(grant)).await
    }

    /// GET /commitments/{token} — detalle de solo lectura por token.
    pub async fn find_commitment_by_token(
        &self,
        grant: &OperatorGrant,
        transfer_token: &str,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "cluster:show_basic")?;

        let connection = self.database_client.get_connection()?;
        let commitment =
            CommitmentStore::find_by_transfer_token(&connection, transfer_token).await?;

        Ok(self
            .display_for(&connection, &commitment, None)
            .await?
            .stripped_for_public())
    }

    /// POST /transfer-commitment/{id} con cabecera 'Transfer-Token'.
    pub async fn accept_transfer(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        commitment_id: i64,
        transfer_token: &str,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (target_domain, target_project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;

        // El token es la credencial; debe resolver al compromiso de la ruta.
        let commitment =
            CommitmentStore::find_by_transfer_token(&connection, transfer_token).await?;
        if commitment.id != commitment_id {
            return Err(LifecycleError::Db(DbError::TransferTokenNotFound));
        }
        if commitment.project_id == target_project.id {
            return Err(LifecycleError::Conflict(
                "cannot transfer a commitment into its own project".into(),
            ));
        }

        let az_context =
            CatalogRepository::az_resource_context(&connection, commitment.az_resource_id).await?;

        // El proyecto destino debe admitir compromisos en este recurso.
        if self
            .cluster_config
            .commitment_behavior(
                &az_context.service_type,
                &az_context.resource_name,
                &target_domain.name,
            )
            .is_none()
        {
            return Err(LifecycleError::Validation(
                "commitments are not enabled for this resource".into(),
            ));
        }
        if CatalogRepository::is_resource_forbidden(
            &connection,
            target_project.id,
            az_context.resource_id,
        )
        .await?
        {
            return Err(LifecycleError::Validation(
                "commitments are not enabled for this resource".into(),
            ));
        }

        let source_metadata =
            TenancyRepository::project_metadata(&connection, commitment.project_id).await?;
        let target_metadata =
            TenancyRepository::project_metadata(&connection, target_project.id).await?;
        let service_info = self.liquid_gateway.service_info(&az_context.service_type)?;

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let source_before = self
            .confirmed_total(&transaction, commitment.project_id, commitment.az_resource_id)
            .await?;
        let target_before = self
            .confirmed_total(&transaction, target_project.id, commitment.az_resource_id)
            .await?;
        let confirmed_delta = if commitment.status == CommitmentStatus::Confirmed {
            commitment.amount
        } else {
            0
        };

        // Ambos lados del movimiento viajan en una sola petición.
        let mut builder = ChangeRequestBuilder::new(
            az_context.availability_zone.clone(),
            service_info.version,
        );
        builder
            .set_confirmed_totals(
                &source_metadata,
                &az_context.resource_name,
                source_before,
                source_before - confirmed_delta,
            )
            .set_confirmed_totals(
                &target_metadata,
                &az_context.resource_name,
                target_before,
                target_before + confirmed_delta,
            )
            .record_transition(&source_metadata, &az_context.resource_name, &commitment, None)
            .record_creation(
                &target_metadata,
                &az_context.resource_name,
                &commitment.uuid,
                commitment.status,
                commitment.amount,
                commitment.confirm_by,
                commitment.expires_at,
            );
        let change_request = builder.build();

        if change_request.requires_confirmation() {
            self.submit_required(&az_context.service_type, &change_request).await?;
        } else {
            self.submit_informational(&az_context.service_type, &change_request).await;
        }

        CommitmentStore::reassign_project(&transaction, commitment.id, target_project.id).await?;

        transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        let transfer_changeset = vec![AttributeChangeset {
            commitment_uuid: commitment.uuid.clone(),
            old_transfer_status: commitment.transfer_status.as_str().to_string(),
            new_transfer_status: TransferStatus::None.as_str().to_string(),
        }];

        let mut audit_trail = AuditTrail::new(grant);
        audit_trail.record(
            CadfAction::Update,
            &source_metadata.uuid,
            &az_context.service_type,
            &az_context.resource_name,
            &change_request,
            transfer_changeset.clone(),
            now,
        );
        audit_trail.record(
            CadfAction::Update,
            &target_metadata.uuid,
            &az_context.service_type,
            &az_context.resource_name,
            &change_request,
            transfer_changeset,
            now,
        );
        audit_trail
            .seal_after_commit(&self.audit_repository, &self.event_bus)
            .await;

        info!(
            "🚚 [LIFECYCLE]: Commitment [{}] moved from project {} to project {}.",
            commitment.uuid, source_metadata.uuid, target_metadata.uuid
        );

        let moved_row =
            CommitmentStore::find_by_id_in_project(&connection, commitment.id, target_project.id)
                .await?;
        self.display_for(&connection, &moved_row, Some(grant)).await
    }
}

/// Hermana de split: hereda anclaje, duración, vencimiento y marcas de
/// confirmación del original; razón de creación Split.
fn split_sibling(
    original: &ProjectCommitment,
    sibling_uuid: &str,
    sibling_amount: u64,
    now: chrono::DateTime<chrono::Utc>,
) -> ProjectCommitment {
    ProjectCommitment {
        id: 0,
        uuid: sibling_uuid.to_string(),
        project_id: original.project_id,
        az_resource_id: original.az_resource_id,
        amount: sibling_amount,
        duration: original.duration,
        created_at: now,
        creator_uuid: original.creator_uuid.clone(),
        creator_name: original.creator_name.clone(),
        confirm_by: original.confirm_by,
        confirmed_at: original.confirmed_at,
        expires_at: original.expires_at,
        superseded_at: None,
        status: CommitmentStatus::Confirmed,
        transfer_status: TransferStatus::None,
        transfer_token: None,
        transfer_started_at: None,
        notify_on_confirm: false,
        notified_for_expiration: original.notified_for_expiration,
        creation_context: CommitmentWorkflowContext::with_related(
            CommitmentReason::Split,
            &[(original.id, original.uuid.as_str())],
        ),
        supersede_context: None,
        renew_context: None,
    }
}
