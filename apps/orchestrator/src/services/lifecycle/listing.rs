// [apps/orchestrator/src/services/lifecycle/listing.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT LISTING QUERIES (V3.1 - PURE READS)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: LECTURAS IDEMPOTENTES DEL LEDGER
 *
 * Las lecturas son función pura del estado persistido: sin
 * transacciones de escritura, sin diálogo con el backend.
 * =================================================================
 */

use custos_domain_models::commitment::CommitmentDisplay;
use custos_infra_db::repositories::{CatalogRepository, CommitmentStore};

use crate::errors::LifecycleError;
use crate::middleware::OperatorGrant;
use crate::services::lifecycle::{require_scope, CommitmentLifecycleService};

impl CommitmentLifecycleService {
    /// GET /domains/{d}/projects/{p}/commitments
    pub async fn list_project_commitments(
        &self,
        grant: &OperatorGrant,
        domain_uuid: &str,
        project_uuid: &str,
    ) -> Result<Vec<CommitmentDisplay>, LifecycleError> {
        require_scope(grant, "project:show")?;

        let connection = self.database_client.get_connection()?;
        let (_domain, project) = self
            .resolve_project_scope(&connection, domain_uuid, project_uuid)
            .await?;

        let mut displays = Vec::new();
        for commitment in CommitmentStore::list_for_project(&connection, project.id).await? {
            displays.push(self.display_for(&connection, &commitment, Some(grant)).await?);
        }
        Ok(displays)
    }

    /// GET /public-commitments?service=&resource=
    pub async fn list_public_commitments(
        &self,
        grant: &OperatorGrant,
        api_service_type: &str,
        api_resource_name: &str,
    ) -> Result<Vec<CommitmentDisplay>, LifecycleError> {
        require_scope(grant, "cluster:show_basic")?;

        let resource_config = self
            .cluster_config
            .resolve_api_resource(api_service_type, api_resource_name)
            .ok_or_else(|| {
                LifecycleError::Validation(format!(
                    "no such service and/or resource: {}/{}",
                    api_service_type, api_resource_name
                ))
            })?;

        let connection = self.database_client.get_connection()?;
        let resource_row =
            CatalogRepository::find_resource(&connection, api_service_type, &resource_config.name)
                .await?;

        let now = self.time_authority.now();
        let mut displays = Vec::new();
        for offered_commitment in
            CommitmentStore::list_public_offers_for_resource(&connection, resource_row.id, now)
                .await?
        {
            displays.push(
                self.display_for(&connection, &offered_commitment, None)
                    .await?
                    .stripped_for_public(),
            );
        }
        Ok(displays)
    }
}
