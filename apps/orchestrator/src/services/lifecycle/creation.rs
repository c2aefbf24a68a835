// [apps/orchestrator/src/services/lifecycle/creation.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT CREATION ORCHESTRATOR (V3.4 - DUAL PATH)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CREATE / CAN-CONFIRM Y CONSUMO DE OFERTAS PÚBLICAS
 *
 * VISION 2026:
 * 1. IMMEDIATE PATH: Sin confirm_by, la caché transferible decide entre
 *    consumir ofertas públicas de otros proyectos o emitir la petición
 *    plana con totales incrementados; ambas exigen aceptación.
 * 2. PLANNED PATH: Con confirm_by futuro, la fila nace Planned y el
 *    backend solo es informado.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use custos_domain_lifecycle::ChangeRequestBuilder;
use custos_domain_models::commitment::{
    CommitmentDisplay, CommitmentDuration, CommitmentReason, CommitmentStatus,
    CommitmentWorkflowContext, ProjectCommitment, TransferStatus,
};
use custos_domain_models::config::CommitmentBehaviorConfig;
use custos_domain_models::liquid::ProjectMetadata;
use custos_domain_models::resource::{AzResource, ServiceInfo, ANY_AVAILABILITY_ZONE};
use custos_domain_models::tenancy::{Domain, Project};
use custos_domain_models::audit::CadfAction;
use custos_infra_db::repositories::{
    CatalogRepository, CommitmentStore, MailQueueRepository, TenancyRepository,
};
use custos_infra_db::DbError;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::audit_trail::AuditTrail;
use crate::services::lifecycle::{require_scope, CommitmentLifecycleService};
use crate::services::transfer_pool::{ClaimPlan, TransferPool};

/// Cuerpo de la petición de creación (y de can-confirm).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommitmentCommand {
    pub service_type: String,
    pub resource_name: String,
    pub availability_zone: String,
    pub amount: u64,
    pub duration: CommitmentDuration,
    #[serde(default)]
    pub confirm_by: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notify_on_confirm: bool,
}

/// Objetivo validado de una creación: catálogo resuelto y vencimiento.
pub(crate) struct ValidatedCreationTarget {
    pub liquid_resource_name: String,
    pub service_info: ServiceInfo,
    pub az_resource: AzResource,
    pub expires_at: DateTime<Utc>,
}

impl CommitmentLifecycleService {
    /// Validaciones semánticas compartidas por create y can-confirm.
    pub(crate) async fn validate_creation_target(
        &self,
        connection: &libsql::Connection,
        domain: &Domain,
        project: &Project,
        command: &CreateCommitmentCommand,
        now: DateTime<Utc>,
    ) -> Result<ValidatedCreationTarget, LifecycleError> {
        if command.amount == 0 {
            return Err(LifecycleError::Validation("amount must be positive".into()));
        }
        if command.duration.is_zero() {
            return Err(LifecycleError::Validation(
                "unacceptable commitment duration".into(),
            ));
        }

        // Capa de mapeo de nombres: la API puede renombrar recursos.
        let resource_config = self
            .cluster_config
            .resolve_api_resource(&command.service_type, &command.resource_name)
            .ok_or_else(|| {
                LifecycleError::Validation(format!(
                    "no such service and/or resource: {}/{}",
                    command.service_type, command.resource_name
                ))
            })?;
        let liquid_resource_name = resource_config.name.clone();

        let behavior: &CommitmentBehaviorConfig = resource_config
            .commitment
            .as_ref()
            .filter(|behavior| behavior.applies_to_domain(&domain.name))
            .ok_or_else(|| {
                LifecycleError::Validation(
                    "commitments are not enabled for this resource".into(),
                )
            })?;

        if !behavior.permits_duration(&command.duration) {
            return Err(LifecycleError::Validation(
                "unacceptable commitment duration".into(),
            ));
        }

        let service_info = self
            .liquid_gateway
            .service_info(&command.service_type)
            .map_err(|_| {
                LifecycleError::Validation(format!(
                    "no such service and/or resource: {}/{}",
                    command.service_type, command.resource_name
                ))
            })?;
        let resource_info = service_info
            .resource(&liquid_resource_name)
            .ok_or_else(|| {
                LifecycleError::Validation(format!(
                    "no such service and/or resource: {}/{}",
                    command.service_type, command.resource_name
                ))
            })?
            .clone();

        // La zona es "any" sii la topología es plana.
        if resource_info.topology.requires_real_availability_zone() {
            if command.availability_zone == ANY_AVAILABILITY_ZONE {
                return Err(LifecycleError::Validation(
                    "a commitment on this resource requires a specific availability zone".into(),
                ));
            }
            if !self.cluster_config.has_availability_zone(&command.availability_zone) {
                return Err(LifecycleError::Validation(format!(
                    "no such availability zone: {}",
                    command.availability_zone
                )));
            }
        } else if command.availability_zone != ANY_AVAILABILITY_ZONE {
            return Err(LifecycleError::Validation(
                "resource does not accept AZ-aware commitments".into(),
            ));
        }

        if let Some(confirm_by) = command.confirm_by {
            if confirm_by < now {
                return Err(LifecycleError::Validation(
                    "confirm_by must not be in the past".into(),
                ));
            }
        }
        if command.notify_on_confirm && command.confirm_by.is_none() {
            return Err(LifecycleError::Validation(
                "notify_on_confirm requires a confirm_by value".into(),
            ));
        }

        if let Some(min_confirm_date) = behavior.min_confirm_date {
            if command.confirm_by.unwrap_or(now) < min_confirm_date {
                return Err(LifecycleError::Validation(format!(
                    "this commitment needs a confirm_by value of at least {}",
                    min_confirm_date.to_rfc3339()
                )));
            }
        }

        let resource_row =
            CatalogRepository::find_resource(connection, &command.service_type, &liquid_resource_name)
                .await?;

        // El recurso no debe estar prohibido en el proyecto.
        if CatalogRepository::is_resource_forbidden(connection, project.id, resource_row.id).await? {
            return Err(LifecycleError::Validation(
                "commitments are not enabled for this resource".into(),
            ));
        }

        let az_resource = CatalogRepository::find_az_resource(
            connection,
            resource_row.id,
            &command.availability_zone,
        )
        .await?;

        // expires_at = duration.add_to(confirm_by | created_at).
        let expires_at = command.duration.add_to(command.confirm_by.unwrap_or(now));

        Ok(ValidatedCreationTarget {
            liquid_resource_name,
            service_info,
            az_resource,
            expires_at,
        })
    }

    /// POST /commitments/new
    pub async fn create_commitment(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        command: CreateCommitmentCommand,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;
        let target = self
            .validate_creation_target(&connection, &domain, &project, &command, now)
            .await?;
        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;

        let transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let total_before = self
            .confirmed_total(&transaction, project.id, target.az_resource.id)
            .await?;

        let mut audit_trail = AuditTrail::new(grant);
        let mut pending_mail_signals: Vec<(String, String)> = Vec::new();

        let created_commitment = match command.confirm_by {
            None => {
                // Consulta atómica de la caché transferible.
                let claim_plan = TransferPool::plan_claims(
                    &transaction,
                    target.az_resource.id,
                    project.id,
                    command.amount,
                    now,
                )
                .await?;

                let created = match claim_plan {
                    Some(plan) => {
                        self.execute_claimed_creation(
                            &transaction,
                            grant,
                            &project,
                            &project_metadata,
                            &command,
                            &target,
                            plan,
                            total_before,
                            now,
                            &mut audit_trail,
                            &mut pending_mail_signals,
                        )
                        .await?
                    }
                    None => {
                        self.execute_plain_confirmed_creation(
                            &transaction,
                            grant,
                            &project,
                            &project_metadata,
                            &command,
                            &target,
                            total_before,
                            now,
                            &mut audit_trail,
                        )
                        .await?
                    }
                };

                // Las cuotas usables deben recomputarse tras la confirmación.
                CatalogRepository::request_capacity_rescrape(
                    &transaction,
                    &command.service_type,
                    now,
                )
                .await?;
                created
            }
            Some(confirm_by) => {
                self.execute_planned_creation(
                    &transaction,
                    grant,
                    &project,
                    &project_metadata,
                    &command,
                    &target,
                    total_before,
                    confirm_by,
                    now,
                    &mut audit_trail,
                )
                .await?
            }
        };

        transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        // Emisión estrictamente post-commit.
        audit_trail
            .seal_after_commit(&self.audit_repository, &self.event_bus)
            .await;
        if command.confirm_by.is_none() {
            self.event_bus.broadcast_rescrape_requested(&command.service_type);
        }
        for (source_project_uuid, mail_subject) in pending_mail_signals {
            self.event_bus.broadcast_mail_queued(&source_project_uuid, &mail_subject);
        }

        info!(
            "✨ [LIFECYCLE]: Commitment [{}] created for project {} on {}/{}.",
            created_commitment.uuid, project_metadata.uuid, command.service_type, command.resource_name
        );

        self.display_for(
            &connection,
            &CommitmentStore::find_by_uuid(&connection, &created_commitment.uuid).await?,
            Some(grant),
        )
        .await
    }

    /// Camino plano de confirmación inmediata.
    #[allow(clippy::too_many_arguments)]
    async fn execute_plain_confirmed_creation(
        &self,
        transaction: &libsql::Connection,
        grant: &OperatorGrant,
        project: &Project,
        project_metadata: &ProjectMetadata,
        command: &CreateCommitmentCommand,
        target: &ValidatedCreationTarget,
        total_before: u64,
        now: DateTime<Utc>,
        audit_trail: &mut AuditTrail,
    ) -> Result<ProjectCommitment, LifecycleError> {
        let new_uuid = Uuid::new_v4().to_string();

        let mut builder = ChangeRequestBuilder::new(
            command.availability_zone.clone(),
            target.service_info.version,
        );
        builder
            .set_confirmed_totals(
                project_metadata,
                &target.liquid_resource_name,
                total_before,
                total_before + command.amount,
            )
            .record_creation(
                project_metadata,
                &target.liquid_resource_name,
                &new_uuid,
                CommitmentStatus::Confirmed,
                command.amount,
                None,
                target.expires_at,
            );
        let change_request = builder.build();

        self.submit_required(&command.service_type, &change_request).await?;

        let mut new_commitment = new_commitment_row(
            &new_uuid,
            project.id,
            target.az_resource.id,
            command,
            grant,
            target.expires_at,
            now,
            CommitmentWorkflowContext::new(CommitmentReason::Create),
        );
        new_commitment.status = CommitmentStatus::Confirmed;
        new_commitment.confirmed_at = Some(now);

        CommitmentStore::insert(transaction, &new_commitment).await?;

        audit_trail.record(
            CadfAction::Create,
            &project_metadata.uuid,
            &command.service_type,
            &target.liquid_resource_name,
            &change_request,
            Vec::new(),
            now,
        );

        Ok(new_commitment)
    }

    /// Camino de consumo de ofertas: cada oferta consumida se supersede y
    /// renace bajo el proyecto reclamante; todo dentro de UNA petición.
    #[allow(clippy::too_many_arguments)]
    async fn execute_claimed_creation(
        &self,
        transaction: &libsql::Connection,
        grant: &OperatorGrant,
        project: &Project,
        project_metadata: &ProjectMetadata,
        command: &CreateCommitmentCommand,
        target: &ValidatedCreationTarget,
        claim_plan: ClaimPlan,
        total_before: u64,
        now: DateTime<Utc>,
        audit_trail: &mut AuditTrail,
        pending_mail_signals: &mut Vec<(String, String)>,
    ) -> Result<ProjectCommitment, LifecycleError> {
        let mut builder = ChangeRequestBuilder::new(
            command.availability_zone.clone(),
            target.service_info.version,
        );
        builder.set_confirmed_totals(
            project_metadata,
            &target.liquid_resource_name,
            total_before,
            total_before + command.amount,
        );

        // Totales por proyecto origen (una oferta puede compartir origen).
        let mut replacements: Vec<(ProjectCommitment, ProjectCommitment, ProjectMetadata)> =
            Vec::new();
        let mut source_totals: std::collections::BTreeMap<i64, (ProjectMetadata, u64, u64)> =
            std::collections::BTreeMap::new();

        for claimed_offer in claim_plan.claims {
            let source_metadata =
                TenancyRepository::project_metadata(transaction, claimed_offer.project_id).await?;

            if !source_totals.contains_key(&claimed_offer.project_id) {
                let source_before = self
                    .confirmed_total(
                        transaction,
                        claimed_offer.project_id,
                        claimed_offer.az_resource_id,
                    )
                    .await?;
                source_totals.insert(
                    claimed_offer.project_id,
                    (source_metadata.clone(), source_before, source_before),
                );
            }
            let entry = source_totals
                .get_mut(&claimed_offer.project_id)
                .expect("source entry was just ensured");
            entry.2 -= claimed_offer.amount;

            let replacement_uuid = Uuid::new_v4().to_string();
            let replacement = ProjectCommitment {
                id: 0,
                uuid: replacement_uuid.clone(),
                project_id: project.id,
                az_resource_id: claimed_offer.az_resource_id,
                amount: claimed_offer.amount,
                duration: claimed_offer.duration,
                created_at: now,
                creator_uuid: grant.operator_uuid.clone(),
                creator_name: grant.operator_name.clone(),
                confirm_by: None,
                confirmed_at: claimed_offer.confirmed_at,
                expires_at: claimed_offer.expires_at,
                superseded_at: None,
                status: CommitmentStatus::Confirmed,
                transfer_status: TransferStatus::None,
                transfer_token: None,
                transfer_started_at: None,
                notify_on_confirm: false,
                notified_for_expiration: claimed_offer.notified_for_expiration,
                creation_context: CommitmentWorkflowContext::with_related(
                    CommitmentReason::Consume,
                    &[(claimed_offer.id, claimed_offer.uuid.as_str())],
                ),
                supersede_context: None,
                renew_context: None,
            };

            // Lado origen: la oferta se supersede; lado reclamante: renace.
            builder.record_transition(
                &source_metadata,
                &target.liquid_resource_name,
                &claimed_offer,
                Some(CommitmentStatus::Superseded),
            );
            builder.record_creation(
                project_metadata,
                &target.liquid_resource_name,
                &replacement_uuid,
                CommitmentStatus::Confirmed,
                claimed_offer.amount,
                None,
                claimed_offer.expires_at,
            );

            replacements.push((claimed_offer, replacement, source_metadata));
        }

        for (_, (source_metadata, source_before, source_after)) in &source_totals {
            builder.set_confirmed_totals(
                source_metadata,
                &target.liquid_resource_name,
                *source_before,
                *source_after,
            );
        }

        let change_request = builder.build();

        // La aceptación es atómica: un rechazo no consume nada.
        self.submit_required(&command.service_type, &change_request).await?;

        let mut primary_replacement: Option<ProjectCommitment> = None;
        for (claimed_offer, replacement, source_metadata) in &replacements {
            let replacement_id = CommitmentStore::insert(transaction, replacement).await?;

            CommitmentStore::mark_superseded(
                transaction,
                claimed_offer.id,
                &CommitmentWorkflowContext::with_related(
                    CommitmentReason::Consume,
                    &[(replacement_id, replacement.uuid.as_str())],
                ),
                now,
            )
            .await?;

            // Correo renderizado por proyecto origen.
            let subject = "One of your published commitments was claimed";
            let body_json = serde_json::json!({
                "commitment_uuid": claimed_offer.uuid,
                "claimed_by_project": project_metadata.uuid,
                "service_type": command.service_type,
                "resource_name": command.resource_name,
                "amount": claimed_offer.amount,
            })
            .to_string();
            MailQueueRepository::enqueue(
                transaction,
                claimed_offer.project_id,
                subject,
                &body_json,
                now,
            )
            .await?;
            // La señal se difunde tras el commit, nunca antes.
            pending_mail_signals.push((source_metadata.uuid.clone(), subject.to_string()));

            if primary_replacement
                .as_ref()
                .map(|current| replacement.amount > current.amount)
                .unwrap_or(true)
            {
                primary_replacement = Some(replacement.clone());
            }
        }

        // Un evento por lado de proyecto tocado.
        audit_trail.record(
            CadfAction::Create,
            &project_metadata.uuid,
            &command.service_type,
            &target.liquid_resource_name,
            &change_request,
            Vec::new(),
            now,
        );
        for (_, (source_metadata, _, _)) in &source_totals {
            audit_trail.record(
                CadfAction::Update,
                &source_metadata.uuid,
                &command.service_type,
                &target.liquid_resource_name,
                &change_request,
                Vec::new(),
                now,
            );
        }

        Ok(primary_replacement.expect("claim plan is never empty"))
    }

    /// Camino Planned: el backend solo es informado.
    #[allow(clippy::too_many_arguments)]
    async fn execute_planned_creation(
        &self,
        transaction: &libsql::Connection,
        grant: &OperatorGrant,
        project: &Project,
        project_metadata: &ProjectMetadata,
        command: &CreateCommitmentCommand,
        target: &ValidatedCreationTarget,
        total_before: u64,
        confirm_by: DateTime<Utc>,
        now: DateTime<Utc>,
        audit_trail: &mut AuditTrail,
    ) -> Result<ProjectCommitment, LifecycleError> {
        let new_uuid = Uuid::new_v4().to_string();

        let mut builder = ChangeRequestBuilder::new(
            command.availability_zone.clone(),
            target.service_info.version,
        );
        builder
            .set_confirmed_totals(
                project_metadata,
                &target.liquid_resource_name,
                total_before,
                total_before,
            )
            .record_creation(
                project_metadata,
                &target.liquid_resource_name,
                &new_uuid,
                CommitmentStatus::Planned,
                command.amount,
                Some(confirm_by),
                target.expires_at,
            );
        let change_request = builder.build();

        self.submit_informational(&command.service_type, &change_request).await;

        let new_commitment = new_commitment_row(
            &new_uuid,
            project.id,
            target.az_resource.id,
            command,
            grant,
            target.expires_at,
            now,
            CommitmentWorkflowContext::new(CommitmentReason::Create),
        );

        CommitmentStore::insert(transaction, &new_commitment).await?;

        audit_trail.record(
            CadfAction::Create,
            &project_metadata.uuid,
            &command.service_type,
            &target.liquid_resource_name,
            &change_request,
            Vec::new(),
            now,
        );

        Ok(new_commitment)
    }

    /// POST /commitments/can-confirm — dry-run sin efecto durable.
    pub async fn can_confirm_commitment(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
        command: CreateCommitmentCommand,
    ) -> Result<bool, LifecycleError> {
        require_scope(grant, "project:edit")?;

        let now = self.time_authority.now();
        let connection = self.database_client.get_connection()?;
        let (domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;
        let target = self
            .validate_creation_target(&connection, &domain, &project, &command, now)
            .await?;
        let project_metadata = TenancyRepository::project_metadata(&connection, project.id).await?;

        let total_before = self
            .confirmed_total(&connection, project.id, target.az_resource.id)
            .await?;

        let synthetic_uuid = Uuid::new_v4().to_string();
        let mut builder = ChangeRequestBuilder::new(
            command.availability_zone.clone(),
            target.service_info.version,
        )
        .as_dry_run();
        builder
            .set_confirmed_totals(
                &project_metadata,
                &target.liquid_resource_name,
                total_before,
                total_before + command.amount,
            )
            .record_creation(
                &project_metadata,
                &target.liquid_resource_name,
                &synthetic_uuid,
                CommitmentStatus::Confirmed,
                command.amount,
                None,
                target.expires_at,
            );

        let verdict = self
            .liquid_gateway
            .change_commitments(&command.service_type, &builder.build())
            .await?;

        Ok(!verdict.is_rejection())
    }
}

/// Fila base de un compromiso recién creado (estado Planned por defecto).
#[allow(clippy::too_many_arguments)]
fn new_commitment_row(
    uuid: &str,
    project_id: i64,
    az_resource_id: i64,
    command: &CreateCommitmentCommand,
    grant: &OperatorGrant,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    creation_context: CommitmentWorkflowContext,
) -> ProjectCommitment {
    ProjectCommitment {
        id: 0,
        uuid: uuid.to_string(),
        project_id,
        az_resource_id,
        amount: command.amount,
        duration: command.duration,
        created_at: now,
        creator_uuid: grant.operator_uuid.clone(),
        creator_name: grant.operator_name.clone(),
        confirm_by: command.confirm_by,
        confirmed_at: None,
        expires_at,
        superseded_at: None,
        status: CommitmentStatus::Planned,
        transfer_status: TransferStatus::None,
        transfer_token: None,
        transfer_started_at: None,
        notify_on_confirm: command.notify_on_confirm,
        notified_for_expiration: false,
        creation_context,
        supersede_context: None,
        renew_context: None,
    }
}
