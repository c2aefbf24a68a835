// [libs/infra/liquid/src/conduit.rs]
/*!
 * =================================================================
 * APARATO: LIQUID CONDUITS (V3.2 - DUAL TRANSPORT)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: TRANSPORTE IDEMPOTENTE PETICIÓN-RESPUESTA
 *
 * VISION 2026:
 * 1. HTTP CONDUIT: Canal reqwest hacia el driver real con presupuesto
 *    de tiempo del llamante.
 * 2. SCRIPTED CONDUIT: Driver determinista en memoria para el proving
 *    grounds y los despliegues de laboratorio; registra cada petición
 *    recibida y entrega veredictos pre-cargados.
 * =================================================================
 */

use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use custos_domain_models::liquid::{CommitmentChangeRequest, CommitmentChangeResponse};
use custos_domain_models::resource::ServiceInfo;

use crate::errors::LiquidError;

/// Presupuesto por defecto de una llamada saliente al driver.
const OUTBOUND_CALL_TIMEOUT_SECONDS: u64 = 30;

/// Canal HTTP hacia un driver liquid real.
pub struct HttpConduit {
    network_session_client: Client,
    driver_base_endpoint: String,
}

impl HttpConduit {
    pub fn new(base_url: impl Into<String>) -> Result<Self, LiquidError> {
        let network_session_client = Client::builder()
            .timeout(Duration::from_secs(OUTBOUND_CALL_TIMEOUT_SECONDS))
            .user_agent("Custos-Liquid-Gateway/V3")
            .build()
            .map_err(|fault| LiquidError::Unreachable(fault.to_string()))?;

        Ok(Self {
            network_session_client,
            driver_base_endpoint: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Descarga el descriptor versionado del servicio.
    #[instrument(skip(self))]
    pub async fn fetch_service_info(&self) -> Result<ServiceInfo, LiquidError> {
        let target_url = format!("{}/v1/info", self.driver_base_endpoint);
        let network_response = self
            .network_session_client
            .get(&target_url)
            .send()
            .await
            .map_err(|fault| LiquidError::Unreachable(fault.to_string()))?;

        if network_response.status() != StatusCode::OK {
            return Err(LiquidError::MalformedResponse(format!(
                "HTTP_{} on {}",
                network_response.status(),
                target_url
            )));
        }

        network_response
            .json::<ServiceInfo>()
            .await
            .map_err(|fault| LiquidError::MalformedResponse(fault.to_string()))
    }

    /// Somete una petición de cambio al diálogo de aceptación.
    #[instrument(skip(self, request))]
    pub async fn change_commitments(
        &self,
        request: &CommitmentChangeRequest,
    ) -> Result<CommitmentChangeResponse, LiquidError> {
        let target_url = format!("{}/v1/change-commitments", self.driver_base_endpoint);
        let network_response = self
            .network_session_client
            .post(&target_url)
            .json(request)
            .send()
            .await
            .map_err(|fault| LiquidError::Unreachable(fault.to_string()))?;

        if network_response.status() != StatusCode::OK {
            return Err(LiquidError::MalformedResponse(format!(
                "HTTP_{} on {}",
                network_response.status(),
                target_url
            )));
        }

        network_response
            .json::<CommitmentChangeResponse>()
            .await
            .map_err(|fault| LiquidError::MalformedResponse(fault.to_string()))
    }
}

/// Driver determinista en memoria: entrega veredictos pre-cargados (o
/// aceptación por defecto) y conserva cada petición para escrutinio.
pub struct ScriptedConduit {
    declared_service_info: ServiceInfo,
    scripted_verdicts: Mutex<VecDeque<CommitmentChangeResponse>>,
    recorded_requests: Mutex<Vec<CommitmentChangeRequest>>,
}

impl ScriptedConduit {
    pub fn new(declared_service_info: ServiceInfo) -> Self {
        Self {
            declared_service_info,
            scripted_verdicts: Mutex::new(VecDeque::new()),
            recorded_requests: Mutex::new(Vec::new()),
        }
    }

    /// Pre-carga el siguiente veredicto a entregar.
    pub fn enqueue_verdict(&self, verdict: CommitmentChangeResponse) {
        self.scripted_verdicts
            .lock()
            .expect("scripted verdict queue poisoned")
            .push_back(verdict);
    }

    /// Copia de las peticiones recibidas, en orden de llegada.
    pub fn recorded_requests(&self) -> Vec<CommitmentChangeRequest> {
        self.recorded_requests
            .lock()
            .expect("scripted request log poisoned")
            .clone()
    }

    fn service_info(&self) -> ServiceInfo {
        self.declared_service_info.clone()
    }

    fn dispatch(&self, request: &CommitmentChangeRequest) -> CommitmentChangeResponse {
        self.recorded_requests
            .lock()
            .expect("scripted request log poisoned")
            .push(request.clone());

        // Un dry-run consume el mismo guion: el veredicto describe lo que
        // ocurriría, sin efecto durable.
        self.scripted_verdicts
            .lock()
            .expect("scripted verdict queue poisoned")
            .pop_front()
            .unwrap_or_else(CommitmentChangeResponse::accepted)
    }
}

/// Resolución de transporte por servicio.
pub enum LiquidConduit {
    Http(HttpConduit),
    Scripted(ScriptedConduit),
}

impl LiquidConduit {
    pub async fn service_info(&self) -> Result<ServiceInfo, LiquidError> {
        match self {
            Self::Http(conduit) => conduit.fetch_service_info().await,
            Self::Scripted(conduit) => Ok(conduit.service_info()),
        }
    }

    pub async fn change_commitments(
        &self,
        request: &CommitmentChangeRequest,
    ) -> Result<CommitmentChangeResponse, LiquidError> {
        match self {
            Self::Http(conduit) => conduit.change_commitments(request).await,
            Self::Scripted(conduit) => {
                let verdict = conduit.dispatch(request);
                if verdict.is_rejection() {
                    warn!(
                        "⛔ [LIQUID]: Scripted driver rejected change: {}",
                        verdict.rejection_reason
                    );
                } else {
                    debug!("🟢 [LIQUID]: Scripted driver accepted change.");
                }
                Ok(verdict)
            }
        }
    }

    /// Acceso al guion subyacente; None para conductos HTTP.
    pub fn as_scripted(&self) -> Option<&ScriptedConduit> {
        match self {
            Self::Scripted(conduit) => Some(conduit),
            Self::Http(_) => None,
        }
    }
}
