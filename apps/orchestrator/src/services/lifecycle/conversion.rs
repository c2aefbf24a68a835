// [apps/orchestrator/src/services/lifecycle/conversion.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT CONVERSION ORCHESTRATOR (V3.3 - RATE BOUND)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CONVERSIÓN ENTRE RECURSOS DE UN GRUPO Y LISTADO
 *                  DE DESTINOS DE CONVERSIÓN
 *
 * VISION 2026:
 * 1. SAME SERVICE, SAME UNIT: La petición de cambio es una sola y viaja
 *    al driver del servicio; los grupos de conversión se resuelven
 *    dentro del servicio y exigen paridad de unidad.
 * 2. SPLIT ON PARTIAL: El remanente queda como hermana Confirmed en el
 *    recurso origen; el original se supersede con razón Convert.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use custos_domain_lifecycle::conversion::{rate_between, ConversionRate};
use custos_domain_lifecycle::state_machine;
use custos_domain_lifecycle::ChangeRequestBuilder;
use custos_domain_models::audit::CadfAction;
use custos_domain_models::commitment::{
    CommitmentDisplay, CommitmentReason, CommitmentStatus, CommitmentWorkflowContext,
    ProjectCommitment, TransferStatus,
};
use custos_domain_models::config::ConversionMembership;
use custos_infra_db::repositories::{CatalogRepository, CommitmentStore, TenancyRepository};
use custos_infra_db::DbError;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::audit_trail::AuditTrail;
use crate::services::lifecycle::{require_scope, CommitmentLifecycleService};

/// Cuerpo de la petición de conversión.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertCommitmentCommand {
    pub target_service_type: String,
    pub target_resource_name: String,
    pub source_amount: u64,
    pub target_amount: u64,
}

/// Destino de conversión publicado por el listado.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionTargetDisplay {
    pub target_service_type: String,
    pub target_resource_name: String,
    pub from: u64,
    pub to: u64,
}

impl CommitmentLifecycleService {
    /// Membresía de conversión de un recurso, si la declara.
    fn conversion_membership(
        &self,
        service_type: &str,
        liquid_resource_name: &str,
        domain_name: &str,
    ) -> Option<ConversionMembership> {
        self.cluster_config
            .commitment_behavior(service_type, liquid_resource_name, domain_name)
            .and_then(|behavior| behavior.conversion.clone())
    }

    /// POST /commitments/{id}/convert
    pub async fn convert_commitment(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        commitment_id: i64,
        command: ConvertCommitmentCommand,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;
        let (commitment, source_context) = self
            .load_commitment(&connection, project.id, commitment_id)
            .await?;

        state_machine::check_convert(&commitment, command.source_amount)?;

        // La petición de cambio es una sola: el destino vive en el mismo
        // servicio que el origen.
        if command.target_service_type != source_context.service_type {
            return Err(LifecycleError::Validation(
                "cross-service conversion is not supported".into(),
            ));
        }

        let target_config = self
            .cluster_config
            .resolve_api_resource(&command.target_service_type, &command.target_resource_name)
            .ok_or_else(|| {
                LifecycleError::Validation(format!(
                    "no such service and/or resource: {}/{}",
                    command.target_service_type, command.target_resource_name
                ))
            })?;
        let target_liquid_name = target_config.name.clone();

        if target_liquid_name == source_context.resource_name {
            return Err(LifecycleError::Validation(
                "conversion into the same resource is not possible".into(),
            ));
        }

        let source_membership = self
            .conversion_membership(
                &source_context.service_type,
                &source_context.resource_name,
                &domain.name,
            )
            .ok_or_else(|| {
                LifecycleError::Validation(
                    "commitment is not convertible into the requested resource".into(),
                )
            })?;
        let target_membership = self
            .conversion_membership(&command.target_service_type, &target_liquid_name, &domain.name)
            .ok_or_else(|| {
                LifecycleError::Validation(
                    "commitment is not convertible into the requested resource".into(),
                )
            })?;

        let conversion_rate: ConversionRate =
            rate_between(&source_membership, &target_membership).ok_or_else(|| {
                LifecycleError::Validation(
                    "commitment is not convertible into the requested resource".into(),
                )
            })?;

        // La divisibilidad es conflicto, no validación de forma.
        let computed_target_amount = conversion_rate
            .convert(command.source_amount)
            .map_err(|fault| LifecycleError::Conflict(fault.to_string()))?;
        if computed_target_amount != command.target_amount {
            return Err(LifecycleError::Validation(format!(
                "requested target amount does not match the conversion rate (expected {})",
                computed_target_amount
            )));
        }

        // Paridad de unidad entre origen y destino.
        let service_info = self.liquid_gateway.service_info(&source_context.service_type)?;
        let target_resource_info = service_info.resource(&target_liquid_name).ok_or_else(|| {
            LifecycleError::Validation(format!(
                "no such service and/or resource: {}/{}",
                command.target_service_type, command.target_resource_name
            ))
        })?;
        if target_resource_info.unit != source_context.unit {
            return Err(LifecycleError::Validation(
                "conversion is restricted to same-unit resource pairs".into(),
            ));
        }

        let target_behavior = self
            .cluster_config
            .commitment_behavior(&command.target_service_type, &target_liquid_name, &domain.name)
            .ok_or_else(|| {
                LifecycleError::Validation("commitments are not enabled for this resource".into())
            })?;
        if !target_behavior.permits_duration(&commitment.duration) {
            return Err(LifecycleError::Validation(
                "unacceptable commitment duration".into(),
            ));
        }

        let target_resource_row = CatalogRepository::find_resource(
            &connection,
            &command.target_service_type,
            &target_liquid_name,
        )
        .await?;
        if CatalogRepository::is_resource_forbidden(&connection, project.id, target_resource_row.id)
            .await?
        {
            return Err(LifecycleError::Validation(
                "commitments are not enabled for this resource".into(),
            ));
        }
        let target_az_resource = CatalogRepository::find_az_resource(
            &connection,
            target_resource_row.id,
            &source_context.availability_zone,
        )
        .await
        .map_err(|_| {
            LifecycleError::Validation(format!(
                "target resource does not exist in availability zone {}",
                source_context.availability_zone
            ))
        })?;

        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let source_before = self
            .confirmed_total(&transaction, project.id, commitment.az_resource_id)
            .await?;
        let target_before = self
            .confirmed_total(&transaction, project.id, target_az_resource.id)
            .await?;

        let original_is_confirmed = commitment.status == CommitmentStatus::Confirmed;
        let (source_delta, target_delta) = if original_is_confirmed {
            (command.source_amount, command.target_amount)
        } else {
            (0, 0)
        };

        let remainder_amount = commitment.amount - command.source_amount;

        let converted_uuid = Uuid::new_v4().to_string();
        let mut builder = ChangeRequestBuilder::new(
            source_context.availability_zone.clone(),
            service_info.version,
        );
        builder
            .set_confirmed_totals(
                &project_metadata,
                &source_context.resource_name,
                source_before,
                source_before - source_delta,
            )
            .set_confirmed_totals(
                &project_metadata,
                &target_liquid_name,
                target_before,
                target_before + target_delta,
            )
            .record_transition(
                &project_metadata,
                &source_context.resource_name,
                &commitment,
                Some(CommitmentStatus::Superseded),
            )
            .record_creation(
                &project_metadata,
                &target_liquid_name,
                &converted_uuid,
                commitment.status,
                command.target_amount,
                commitment.confirm_by,
                commitment.expires_at,
            );

        let mut remainder_uuid = None;
        if remainder_amount > 0 {
            let sibling_uuid = Uuid::new_v4().to_string();
            builder.record_creation(
                &project_metadata,
                &source_context.resource_name,
                &sibling_uuid,
                CommitmentStatus::Confirmed,
                remainder_amount,
                None,
                commitment.expires_at,
            );
            remainder_uuid = Some(sibling_uuid);
        }

        let change_request = builder.build();

        // La aceptación se exige solo si el original estaba confirmado.
        if original_is_confirmed {
            self.submit_required(&source_context.service_type, &change_request).await?;
        } else {
            self.submit_informational(&source_context.service_type, &change_request).await;
        }

        // Fila convertida: hereda confirm_by/confirmed_at/expires_at.
        let converted_commitment = ProjectCommitment {
            id: 0,
            uuid: converted_uuid.clone(),
            project_id: project.id,
            az_resource_id: target_az_resource.id,
            amount: command.target_amount,
            duration: commitment.duration,
            created_at: now,
            creator_uuid: grant.operator_uuid.clone(),
            creator_name: grant.operator_name.clone(),
            confirm_by: commitment.confirm_by,
            confirmed_at: commitment.confirmed_at,
            expires_at: commitment.expires_at,
            superseded_at: None,
            status: commitment.status,
            transfer_status: TransferStatus::None,
            transfer_token: None,
            transfer_started_at: None,
            notify_on_confirm: false,
            notified_for_expiration: commitment.notified_for_expiration,
            creation_context: CommitmentWorkflowContext::with_related(
                CommitmentReason::Convert,
                &[(commitment.id, commitment.uuid.as_str())],
            ),
            supersede_context: None,
            renew_context: None,
        };
        let converted_row_id = CommitmentStore::insert(&transaction, &converted_commitment).await?;

        let mut supersede_related: Vec<(i64, String)> =
            vec![(converted_row_id, converted_uuid.clone())];

        if let Some(sibling_uuid) = &remainder_uuid {
            let mut remainder_sibling = converted_commitment.clone();
            remainder_sibling.uuid = sibling_uuid.clone();
            remainder_sibling.az_resource_id = commitment.az_resource_id;
            remainder_sibling.amount = remainder_amount;
            remainder_sibling.confirm_by = None;
            remainder_sibling.status = CommitmentStatus::Confirmed;
            remainder_sibling.creation_context = CommitmentWorkflowContext::with_related(
                CommitmentReason::Split,
                &[(commitment.id, commitment.uuid.as_str())],
            );

            let remainder_row_id =
                CommitmentStore::insert(&transaction, &remainder_sibling).await?;
            supersede_related.push((remainder_row_id, sibling_uuid.clone()));
        }

        let supersede_related_refs: Vec<(i64, &str)> = supersede_related
            .iter()
            .map(|(row_id, row_uuid)| (*row_id, row_uuid.as_str()))
            .collect();
        CommitmentStore::mark_superseded(
            &transaction,
            commitment.id,
            &CommitmentWorkflowContext::with_related(
                CommitmentReason::Convert,
                &supersede_related_refs,
            ),
            now,
        )
        .await?;

        transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        // Un evento por (proyecto, recurso) tocado: origen y destino.
        let mut audit_trail = AuditTrail::new(grant);
        audit_trail.record(
            CadfAction::Update,
            &project_metadata.uuid,
            &source_context.service_type,
            &source_context.resource_name,
            &change_request,
            Vec::new(),
            now,
        );
        audit_trail.record(
            CadfAction::Update,
            &project_metadata.uuid,
            &command.target_service_type,
            &target_liquid_name,
            &change_request,
            Vec::new(),
            now,
        );
        audit_trail
            .seal_after_commit(&self.audit_repository, &self.event_bus)
            .await;

        info!(
            "♻️ [LIFECYCLE]: Commitment [{}] converted into [{}] ({} -> {}).",
            commitment.uuid, converted_uuid, command.source_amount, command.target_amount
        );

        let converted_row =
            CommitmentStore::find_by_id_in_project(&connection, converted_row_id, project.id)
                .await?;
        self.display_for(&connection, &converted_row, Some(grant)).await
    }

    /// GET /commitment-conversion/{service}/{resource}
    pub async fn list_conversion_targets(
        &self,
        grant: &OperatorGrant,
        api_service_type: &str,
        api_resource_name: &str,
    ) -> Result<Vec<ConversionTargetDisplay>, LifecycleError> {
        require_scope(grant, "cluster:show_basic")?;

        let source_config = self
            .cluster_config
            .resolve_api_resource(api_service_type, api_resource_name)
            .ok_or_else(|| {
                LifecycleError::Validation(format!(
                    "no such service and/or resource: {}/{}",
                    api_service_type, api_resource_name
                ))
            })?;

        let Some(source_membership) = source_config
            .commitment
            .as_ref()
            .and_then(|behavior| behavior.conversion.clone())
        else {
            return Ok(Vec::new());
        };

        let service_info = self.liquid_gateway.service_info(api_service_type)?;
        let source_unit = service_info
            .resource(&source_config.name)
            .map(|resource| resource.unit)
            .unwrap_or_default();

        let Some(service_config) = self.cluster_config.service(api_service_type) else {
            return Ok(Vec::new());
        };

        let mut conversion_targets = Vec::new();
        for candidate in &service_config.resources {
            if candidate.name == source_config.name {
                continue;
            }
            let Some(candidate_membership) = candidate
                .commitment
                .as_ref()
                .and_then(|behavior| behavior.conversion.clone())
            else {
                continue;
            };
            let Some(rate) = rate_between(&source_membership, &candidate_membership) else {
                continue;
            };

            let candidate_unit = service_info
                .resource(&candidate.name)
                .map(|resource| resource.unit)
                .unwrap_or_default();
            if candidate_unit != source_unit {
                continue;
            }

            conversion_targets.push(ConversionTargetDisplay {
                target_service_type: api_service_type.to_string(),
                target_resource_name: candidate.exposed_name().to_string(),
                from: rate.from_amount,
                to: rate.to_amount,
            });
        }

        Ok(conversion_targets)
    }
}
