// [apps/orchestrator/src/services/lifecycle/mod.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT LIFECYCLE ORCHESTRATOR (V3.4 - SOVEREIGN CORE)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ORQUESTADORES TRANSACCIONALES DE CADA OPERACIÓN
 *
 * VISION 2026:
 * 1. ONE TRANSACTION PER REQUEST: Cada operación abre una transacción,
 *    dialoga con el backend dentro de ella y comete o revierte entera;
 *    la transacción revierte al soltarse sin commit.
 * 2. ACCEPTANCE DISCIPLINE: Los cambios que alteran totales exigen
 *    aceptación dura; el resto informa al backend con mejor esfuerzo,
 *    salvo donde el veredicto es autoritativo (delete, update-duration).
 * 3. POST-COMMIT EMISSION: Auditoría y señales solo tras commit.
 * =================================================================
 */

pub mod conversion;
pub mod creation;
pub mod deletion;
pub mod listing;
pub mod merging;
pub mod renewal;
pub mod transfer;

use chrono::{DateTime, Duration as TimeDelta, Utc};
use libsql::Connection;
use std::sync::Arc;
use tracing::{debug, warn};

use custos_domain_models::commitment::{CommitmentDisplay, CommitmentStatus, ProjectCommitment};
use custos_domain_models::config::ClusterConfig;
use custos_domain_models::liquid::{CommitmentChangeRequest, CommitmentChangeResponse};
use custos_domain_models::tenancy::{Domain, Project};
use custos_infra_db::repositories::catalog::AzResourceContext;
use custos_infra_db::repositories::{
    AuditRepository, CatalogRepository, CommitmentStore, TenancyRepository,
};
use custos_infra_db::{DbError, LedgerClient};
use custos_infra_liquid::LiquidGateway;

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::chronos::TimeAuthority;
use crate::services::event_bus::EventBus;

/// Ventana de gracia tras la creación dentro de la cual un editor de
/// proyecto puede borrar un compromiso ya confirmado.
const DELETION_GRACE_WINDOW_HOURS: i64 = 24;

/// Orquestador central de las operaciones del ciclo de vida.
pub struct CommitmentLifecycleService {
    pub(crate) database_client: LedgerClient,
    pub(crate) cluster_config: Arc<ClusterConfig>,
    pub(crate) liquid_gateway: Arc<LiquidGateway>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) audit_repository: Arc<AuditRepository>,
    pub(crate) time_authority: Arc<TimeAuthority>,
}

impl CommitmentLifecycleService {
    pub fn new(
        database_client: LedgerClient,
        cluster_config: Arc<ClusterConfig>,
        liquid_gateway: Arc<LiquidGateway>,
        event_bus: Arc<EventBus>,
        audit_repository: Arc<AuditRepository>,
        time_authority: Arc<TimeAuthority>,
    ) -> Self {
        Self {
            database_client,
            cluster_config,
            liquid_gateway,
            event_bus,
            audit_repository,
            time_authority,
        }
    }

    // --- RESOLUCIÓN DE ÁMBITO ---

    /// Resuelve (dominio, proyecto) desde los segmentos de ruta.
    pub(crate) async fn resolve_project_scope(
        &self,
        connection: &Connection,
        domain_uuid: &str,
        project_uuid: &str,
    ) -> Result<(Domain, Project), LifecycleError> {
        let domain = TenancyRepository::find_domain_by_uuid(connection, domain_uuid).await?;
        let project =
            TenancyRepository::find_project_in_domain(connection, domain.id, project_uuid).await?;
        Ok((domain, project))
    }

    /// Carga un compromiso del proyecto junto con su anclaje de catálogo.
    /// Un anclaje irresoluble es 404 (defensa en profundidad).
    pub(crate) async fn load_commitment(
        &self,
        connection: &Connection,
        project_id: i64,
        commitment_id: i64,
    ) -> Result<(ProjectCommitment, AzResourceContext), LifecycleError> {
        let commitment =
            CommitmentStore::find_by_id_in_project(connection, commitment_id, project_id).await?;
        let az_context =
            CatalogRepository::az_resource_context(connection, commitment.az_resource_id).await?;
        Ok((commitment, az_context))
    }

    /// Nombre del recurso en la superficie API (mapeo inverso de nombres).
    pub(crate) fn exposed_resource_name(&self, service_type: &str, liquid_name: &str) -> String {
        self.cluster_config
            .service(service_type)
            .and_then(|service| {
                service
                    .resources
                    .iter()
                    .find(|resource| resource.name == liquid_name)
            })
            .map(|resource| resource.exposed_name().to_string())
            .unwrap_or_else(|| liquid_name.to_string())
    }

    // --- POLÍTICA DE BORRADO ---

    /// Un editor de proyecto puede borrar mientras el compromiso no esté
    /// Confirmed, o dentro de la ventana de gracia; después hace falta
    /// 'cluster:edit'.
    pub(crate) fn deletion_permitted(
        &self,
        grant: &OperatorGrant,
        commitment: &ProjectCommitment,
        now: DateTime<Utc>,
    ) -> bool {
        if !grant.allows("project:edit") {
            return false;
        }
        if grant.allows("cluster:edit") {
            return true;
        }
        if commitment.status != CommitmentStatus::Confirmed {
            return true;
        }
        now <= commitment.created_at + TimeDelta::hours(DELETION_GRACE_WINDOW_HOURS)
    }

    // --- PRESENTACIÓN ---

    pub(crate) async fn display_for(
        &self,
        connection: &Connection,
        commitment: &ProjectCommitment,
        grant: Option<&OperatorGrant>,
    ) -> Result<CommitmentDisplay, LifecycleError> {
        let az_context =
            CatalogRepository::az_resource_context(connection, commitment.az_resource_id).await?;

        let can_be_deleted = match grant {
            Some(grant) => self.deletion_permitted(grant, commitment, self.time_authority.now()),
            None => false,
        };

        Ok(CommitmentDisplay::from_commitment(
            commitment,
            &az_context.service_type,
            &self.exposed_resource_name(&az_context.service_type, &az_context.resource_name),
            &az_context.availability_zone,
            az_context.unit,
            can_be_deleted,
        ))
    }

    // --- DIÁLOGO DE ACEPTACIÓN ---

    /// Cambio que exige aceptación: un rechazo del backend aborta la
    /// operación con su razón autoritativa y el 'retry_at' consultivo.
    pub(crate) async fn submit_required(
        &self,
        service_type: &str,
        change_request: &CommitmentChangeRequest,
    ) -> Result<CommitmentChangeResponse, LifecycleError> {
        let verdict = self
            .liquid_gateway
            .change_commitments(service_type, change_request)
            .await?;

        if verdict.is_rejection() {
            return Err(LifecycleError::BackendRejected {
                reason: verdict.rejection_reason,
                retry_at: verdict.retry_at,
            });
        }
        Ok(verdict)
    }

    /// Cambio sin confirmación requerida: el backend solo es informado.
    /// Ni el rechazo ni la inasequibilidad del driver bloquean el commit.
    pub(crate) async fn submit_informational(
        &self,
        service_type: &str,
        change_request: &CommitmentChangeRequest,
    ) {
        debug_assert!(!change_request.requires_confirmation());

        match self
            .liquid_gateway
            .change_commitments(service_type, change_request)
            .await
        {
            Ok(verdict) if verdict.is_rejection() => {
                debug!(
                    "📨 [LIFECYCLE]: Backend noted an objection to an informational change: {}",
                    verdict.rejection_reason
                );
            }
            Ok(_) => {}
            Err(gateway_fault) => {
                warn!(
                    "📨 [LIFECYCLE]: Backend could not be informed of a no-confirmation change: {}",
                    gateway_fault
                );
            }
        }
    }

    // --- TOTALES ---

    /// Total confirmado vigente de (proyecto, AZResource).
    pub(crate) async fn confirmed_total(
        &self,
        connection: &Connection,
        project_id: i64,
        az_resource_id: i64,
    ) -> Result<u64, DbError> {
        CommitmentStore::sum_confirmed(connection, project_id, az_resource_id).await
    }
}

/// Guardia de alcance de la política perimetral.
pub(crate) fn require_scope(grant: &OperatorGrant, scope: &str) -> Result<(), LifecycleError> {
    if grant.allows(scope) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden)
    }
}
