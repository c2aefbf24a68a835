// [apps/orchestrator/src/bootstrap.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR BOOTSTRAP (V3.3 - IGNITION SEQUENCE)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: IGNICIÓN ORDENADA DE INFRAESTRUCTURA
 *
 * Secuencia: ledger -> configuración de cluster -> registro liquid ->
 * sincronización de catálogo -> semillas de tenencia -> estado ->
 * barrido de reloj -> socket TCP. El catálogo debe estar nivelado
 * antes de abrir el socket.
 * =================================================================
 */

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use custos_domain_models::config::ClusterConfig;
use custos_infra_db::repositories::{CatalogRepository, TenancyRepository};
use custos_infra_db::LedgerClient;
use custos_infra_liquid::{HttpConduit, LiquidConduit, LiquidGateway};

use crate::middleware::GrantRegistry;
use crate::routes::create_router;
use crate::services::chronos::{ChronosSweep, TimeAuthority};
use crate::state::AppState;

/// Período por defecto del barrido de reloj.
const DEFAULT_SWEEP_PERIOD_SECONDS: u64 = 60;

pub struct OrchestratorKernel {
    application_state: AppState,
    listening_network_port: u16,
}

impl OrchestratorKernel {
    /// Punto de ignición del orquestador en producción.
    pub async fn ignite(
        database_connection_url: &str,
        database_access_token: Option<String>,
        cluster_config_path: &Path,
        auth_tokens_specification: &str,
        listening_network_port: u16,
    ) -> anyhow::Result<Self> {
        let database_client = LedgerClient::connect(database_connection_url, database_access_token)
            .await
            .context("ledger ignition failed")?;

        let cluster_config = Arc::new(
            ClusterConfig::from_json_file(cluster_config_path)
                .map_err(|fault| anyhow::anyhow!(fault))?,
        );

        // Registro liquid: un conducto HTTP por servicio configurado.
        let liquid_gateway = Arc::new(LiquidGateway::new());
        for service_config in &cluster_config.services {
            let base_url = service_config.liquid_base_url.as_deref().with_context(|| {
                format!(
                    "service {} has no liquid_base_url configured",
                    service_config.service_type
                )
            })?;
            let conduit = LiquidConduit::Http(HttpConduit::new(base_url)?);
            liquid_gateway
                .register_service(&service_config.service_type, conduit)
                .await?;
        }

        synchronize_cluster(&database_client, &cluster_config, &liquid_gateway).await?;

        let application_state = AppState::assemble(
            database_client,
            cluster_config,
            liquid_gateway,
            Arc::new(GrantRegistry::from_specification(auth_tokens_specification)),
            Arc::new(TimeAuthority::system()),
        );

        // Barrido de reloj en segundo plano.
        let sweep = Arc::new(ChronosSweep::new(
            application_state.database_client.clone(),
            Arc::clone(&application_state.liquid_gateway),
            Arc::clone(&application_state.cluster_config),
            Arc::clone(&application_state.event_bus),
            Arc::clone(&application_state.time_authority),
        ));
        sweep.ignite_sweep_loop(DEFAULT_SWEEP_PERIOD_SECONDS);

        Ok(Self {
            application_state,
            listening_network_port,
        })
    }

    pub fn application_state(&self) -> &AppState {
        &self.application_state
    }

    /// Abre el socket TCP y sirve la topología de rutas.
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = create_router(self.application_state);
        let bind_address = format!("0.0.0.0:{}", self.listening_network_port);
        let listener = tokio::net::TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("cannot bind {}", bind_address))?;

        info!("🛰️ [KERNEL]: Commitment surface listening on [{}].", bind_address);
        axum::serve(listener, router).await.context("server collapsed")
    }
}

/// Sincroniza catálogo y semillas de tenencia desde la configuración y
/// el registro liquid. Reutilizado por el bootstrap y el proving grounds.
pub async fn synchronize_cluster(
    database_client: &LedgerClient,
    cluster_config: &Arc<ClusterConfig>,
    liquid_gateway: &Arc<LiquidGateway>,
) -> anyhow::Result<()> {
    let catalog_repository = CatalogRepository::new(database_client.clone());
    for service_config in &cluster_config.services {
        let service_info = liquid_gateway.service_info(&service_config.service_type)?;
        catalog_repository
            .synchronize_service(
                &service_config.service_type,
                &service_info,
                &cluster_config.availability_zones,
            )
            .await?;
    }

    // Sustituto de contrato estrecho del directorio de identidad.
    let tenancy_repository = TenancyRepository::new(database_client.clone());
    for domain_seed in &cluster_config.seed_domains {
        let domain = tenancy_repository
            .ensure_domain(&domain_seed.uuid, &domain_seed.name)
            .await?;
        for project_seed in &domain_seed.projects {
            tenancy_repository
                .ensure_project(domain.id, &project_seed.uuid, &project_seed.name)
                .await?;
        }
    }

    info!(
        "🗺️ [BOOTSTRAP]: Catalog and tenancy level for {} service(s), {} domain(s).",
        cluster_config.services.len(),
        cluster_config.seed_domains.len()
    );
    Ok(())
}
