// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION STATE HUB (V3.2 - COMPOSITION ROOT)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L4)
 * RESPONSABILIDAD: SINAPSIS ENTRE REPOSITORIOS, PASARELA LIQUID,
 *                  BUS DE EVENTOS Y ORQUESTADORES
 *
 * El único estado mutable compartido entre peticiones es la caché
 * read-mostly del registro liquid y el bus de difusión; toda mutación
 * persistente pasa por la base de datos.
 * =================================================================
 */

use std::sync::Arc;
use tracing::debug;

use custos_domain_models::config::ClusterConfig;
use custos_infra_db::repositories::AuditRepository;
use custos_infra_db::LedgerClient;
use custos_infra_liquid::LiquidGateway;

use crate::middleware::GrantRegistry;
use crate::services::chronos::TimeAuthority;
use crate::services::event_bus::EventBus;
use crate::services::lifecycle::CommitmentLifecycleService;

/// Contenedor de estado compartido (thread-safe) del orquestador.
#[derive(Clone)]
pub struct AppState {
    /// Cliente del ledger táctico (libSQL).
    pub database_client: LedgerClient,
    /// Configuración inmutable del cluster (zonas, servicios, semillas).
    pub cluster_config: Arc<ClusterConfig>,
    /// Pasarela saliente hacia los drivers liquid.
    pub liquid_gateway: Arc<LiquidGateway>,
    /// Bus de difusión de señales post-commit.
    pub event_bus: Arc<EventBus>,
    /// Autoridad de persistencia de eventos CADF sellados.
    pub audit_repository: Arc<AuditRepository>,
    /// Orquestador central de operaciones del ciclo de vida.
    pub lifecycle_service: Arc<CommitmentLifecycleService>,
    /// Mapa token -> grant para el guardián perimetral.
    pub grant_registry: Arc<GrantRegistry>,
    /// Reloj del proceso, congelable en el proving grounds.
    pub time_authority: Arc<TimeAuthority>,
}

impl AppState {
    /// Forja el estado maestro inyectando todas las dependencias.
    pub fn assemble(
        database_client: LedgerClient,
        cluster_config: Arc<ClusterConfig>,
        liquid_gateway: Arc<LiquidGateway>,
        grant_registry: Arc<GrantRegistry>,
        time_authority: Arc<TimeAuthority>,
    ) -> Self {
        debug!("🧬 [APP_STATE]: Executing ignition sequence V3.2...");

        let event_bus = Arc::new(EventBus::new());
        let audit_repository = Arc::new(AuditRepository::new(database_client.clone()));

        let lifecycle_service = Arc::new(CommitmentLifecycleService::new(
            database_client.clone(),
            Arc::clone(&cluster_config),
            Arc::clone(&liquid_gateway),
            Arc::clone(&event_bus),
            Arc::clone(&audit_repository),
            Arc::clone(&time_authority),
        ));

        Self {
            database_client,
            cluster_config,
            liquid_gateway,
            event_bus,
            audit_repository,
            lifecycle_service,
            grant_registry,
            time_authority,
        }
    }
}
