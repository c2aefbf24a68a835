// [libs/domain/models/src/config.rs]
/*!
 * =================================================================
 * APARATO: CLUSTER CONFIGURATION CONTRACT (V3.1 - BEHAVIOR STRATA)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONFIGURACIÓN POR SERVICIO, COMPORTAMIENTO DE
 *                  COMPROMISOS Y SEMILLAS DE TENENCIA
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::commitment::CommitmentDuration;

/// Pertenencia a un grupo de conversión. Recursos que comparten
/// 'identifier' son interconvertibles; la tasa deriva de los pesos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMembership {
    pub identifier: String,
    pub weight: u64,
}

/// Comportamiento de compromisos de un recurso, opcionalmente acotado a
/// una lista de dominios (ausente = todos).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentBehaviorConfig {
    #[serde(default)]
    pub permitted_durations: Vec<CommitmentDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confirm_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoped_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionMembership>,
}

impl CommitmentBehaviorConfig {
    pub fn applies_to_domain(&self, domain_name: &str) -> bool {
        match &self.scoped_domains {
            None => true,
            Some(domain_names) => domain_names.iter().any(|name| name == domain_name),
        }
    }

    pub fn permits_duration(&self, duration: &CommitmentDuration) -> bool {
        self.permitted_durations.contains(duration)
    }
}

/// Configuración de un recurso dentro de un servicio.
///
/// 'api_name' renombra el recurso en la superficie HTTP por compatibilidad;
/// el nombre liquid ('name') es el que viaja en el protocolo de aceptación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBehaviorConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<CommitmentBehaviorConfig>,
}

impl ResourceBehaviorConfig {
    pub fn exposed_name(&self) -> &str {
        self.api_name.as_deref().unwrap_or(&self.name)
    }
}

/// Configuración de un servicio respaldado por un driver liquid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_type: String,
    /// URL base del driver liquid; ausente cuando el conducto es inyectado
    /// (p.ej. el conducto guionizado del proving grounds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquid_base_url: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceBehaviorConfig>,
}

/// Semilla de proyecto bajo un dominio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSeed {
    pub name: String,
    pub uuid: String,
}

/// Semilla de dominio: sustituto de contrato estrecho del directorio de
/// identidad (el descubrimiento real queda fuera del núcleo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSeed {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub projects: Vec<ProjectSeed>,
}

/// Configuración del cluster: zonas fijas, servicios y semillas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub availability_zones: Vec<String>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub seed_domains: Vec<DomainSeed>,
}

impl ClusterConfig {
    /// Hidrata la configuración desde un archivo JSON.
    pub fn from_json_file(config_path: &Path) -> Result<Self, String> {
        let raw_payload = std::fs::read_to_string(config_path)
            .map_err(|fault| format!("cannot read cluster config: {}", fault))?;
        serde_json::from_str(&raw_payload)
            .map_err(|fault| format!("cannot parse cluster config: {}", fault))
    }

    pub fn has_availability_zone(&self, availability_zone: &str) -> bool {
        self.availability_zones
            .iter()
            .any(|zone| zone == availability_zone)
    }

    pub fn service(&self, service_type: &str) -> Option<&ServiceConfig> {
        self.services
            .iter()
            .find(|service| service.service_type == service_type)
    }

    /// Capa de mapeo de nombres: resuelve el nombre expuesto en la API al
    /// recurso configurado (404/422 aguas arriba si no existe).
    pub fn resolve_api_resource<'a>(
        &'a self,
        service_type: &str,
        api_resource_name: &str,
    ) -> Option<&'a ResourceBehaviorConfig> {
        self.service(service_type)?
            .resources
            .iter()
            .find(|resource| resource.exposed_name() == api_resource_name)
    }

    /// Comportamiento de compromiso vigente para (servicio, recurso, dominio).
    pub fn commitment_behavior<'a>(
        &'a self,
        service_type: &str,
        liquid_resource_name: &str,
        domain_name: &str,
    ) -> Option<&'a CommitmentBehaviorConfig> {
        self.service(service_type)?
            .resources
            .iter()
            .find(|resource| resource.name == liquid_resource_name)?
            .commitment
            .as_ref()
            .filter(|behavior| behavior.applies_to_domain(domain_name))
    }
}
