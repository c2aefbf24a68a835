// [libs/infra/liquid/src/registry.rs]
/*!
 * =================================================================
 * APARATO: LIQUID SERVICE REGISTRY (V3.1 - CAPABILITY SET)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RESOLUCIÓN POR TIPO DE SERVICIO Y CACHÉ DE
 *                  SERVICEINFO (READ-MOSTLY)
 *
 * La pasarela expone el conjunto de capacidades mínimo del protocolo:
 * { service_info(), change_commitments(request) -> response }, resuelto
 * por tipo de servicio. Sin jerarquías de herencia.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument, warn};

use custos_domain_models::liquid::{CommitmentChangeRequest, CommitmentChangeResponse};
use custos_domain_models::resource::ServiceInfo;

use crate::conduit::LiquidConduit;
use crate::errors::LiquidError;

/// Reintentos ante un driver inalcanzable, dentro del presupuesto de la
/// transacción del llamante.
const UNREACHABLE_RETRY_ATTEMPTS: usize = 2;

struct RegisteredService {
    cached_service_info: ServiceInfo,
    conduit: Arc<LiquidConduit>,
}

/// Pasarela saliente hacia los drivers liquid.
pub struct LiquidGateway {
    service_registry: RwLock<HashMap<String, RegisteredService>>,
}

impl Default for LiquidGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl LiquidGateway {
    pub fn new() -> Self {
        Self {
            service_registry: RwLock::new(HashMap::new()),
        }
    }

    /// Registra un servicio: interroga su ServiceInfo y lo cachea.
    #[instrument(skip(self, conduit))]
    pub async fn register_service(
        &self,
        service_type: &str,
        conduit: LiquidConduit,
    ) -> Result<ServiceInfo, LiquidError> {
        let service_info = conduit.service_info().await?;

        info!(
            "🔗 [LIQUID_REGISTRY]: Service [{}] registered at info version {}.",
            service_type, service_info.version
        );

        self.service_registry
            .write()
            .expect("liquid registry lock poisoned")
            .insert(
                service_type.to_string(),
                RegisteredService {
                    cached_service_info: service_info.clone(),
                    conduit: Arc::new(conduit),
                },
            );

        Ok(service_info)
    }

    /// ServiceInfo vigente desde la caché read-mostly.
    pub fn service_info(&self, service_type: &str) -> Result<ServiceInfo, LiquidError> {
        self.service_registry
            .read()
            .expect("liquid registry lock poisoned")
            .get(service_type)
            .map(|service| service.cached_service_info.clone())
            .ok_or_else(|| LiquidError::UnknownServiceType(service_type.to_string()))
    }

    /// Re-interroga al driver y refresca la caché (lo invoca el scraper
    /// de fondo; los manejadores solo leen).
    pub async fn refresh_service_info(
        &self,
        service_type: &str,
    ) -> Result<ServiceInfo, LiquidError> {
        let conduit = self.conduit_for(service_type)?;
        let refreshed = conduit.service_info().await?;

        let mut registry = self
            .service_registry
            .write()
            .expect("liquid registry lock poisoned");
        if let Some(service) = registry.get_mut(service_type) {
            if service.cached_service_info.version != refreshed.version {
                info!(
                    "🔄 [LIQUID_REGISTRY]: Service [{}] info version {} -> {}.",
                    service_type, service.cached_service_info.version, refreshed.version
                );
            }
            service.cached_service_info = refreshed.clone();
        }

        Ok(refreshed)
    }

    /// Somete la petición al driver del servicio. Reintenta solo fallos
    /// de alcance; el último fallo se propaga como 5xx aguas arriba.
    #[instrument(skip(self, request), fields(availability_zone = %request.availability_zone))]
    pub async fn change_commitments(
        &self,
        service_type: &str,
        request: &CommitmentChangeRequest,
    ) -> Result<CommitmentChangeResponse, LiquidError> {
        let conduit = self.conduit_for(service_type)?;

        let mut last_fault = None;
        for attempt in 1..=UNREACHABLE_RETRY_ATTEMPTS {
            match conduit.change_commitments(request).await {
                Ok(verdict) => return Ok(verdict),
                Err(LiquidError::Unreachable(detail)) => {
                    warn!(
                        "📡 [LIQUID]: Driver [{}] unreachable (attempt {}/{}): {}",
                        service_type, attempt, UNREACHABLE_RETRY_ATTEMPTS, detail
                    );
                    last_fault = Some(LiquidError::Unreachable(detail));
                }
                Err(other_fault) => return Err(other_fault),
            }
        }

        Err(last_fault.unwrap_or_else(|| {
            LiquidError::Unreachable("driver retry budget exhausted".to_string())
        }))
    }

    /// Acceso al conducto guionizado de un servicio (proving grounds).
    pub fn scripted_conduit(&self, service_type: &str) -> Option<Arc<LiquidConduit>> {
        let registry = self
            .service_registry
            .read()
            .expect("liquid registry lock poisoned");
        let service = registry.get(service_type)?;
        service.conduit.as_scripted()?;
        Some(Arc::clone(&service.conduit))
    }

    fn conduit_for(&self, service_type: &str) -> Result<Arc<LiquidConduit>, LiquidError> {
        self.service_registry
            .read()
            .expect("liquid registry lock poisoned")
            .get(service_type)
            .map(|service| Arc::clone(&service.conduit))
            .ok_or_else(|| LiquidError::UnknownServiceType(service_type.to_string()))
    }
}
