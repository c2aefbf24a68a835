// [libs/domain/models/src/tenancy.rs]
/*!
 * =================================================================
 * APARATO: TENANCY MODELS (V3.0 - HIERARCHY STRATA)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: JERARQUÍA CLUSTER -> DOMINIO -> PROYECTO
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Fila de la tabla 'domains'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub uuid: String,
    pub name: String,
}

/// Fila de la tabla 'projects'. Vive bajo exactamente un dominio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub domain_id: i64,
}

/// Superficie de cuota por (proyecto, recurso).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectResource {
    pub id: i64,
    pub project_id: i64,
    pub resource_id: i64,
    pub quota: Option<u64>,
    pub backend_quota: Option<i64>,
    pub max_quota_from_outside_admin: Option<u64>,
    pub max_quota_from_local_admin: Option<u64>,
    /// Un recurso prohibido no admite compromisos nuevos (creación,
    /// destino de transferencia, destino de conversión).
    pub forbidden: bool,
}

/// Uso por (proyecto, AZResource) con serie histórica compacta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAzResource {
    pub id: i64,
    pub project_id: i64,
    pub az_resource_id: i64,
    pub usage: u64,
    /// Serie '{"t":[…],"v":[…]}'; el núcleo la transporta literalmente.
    pub historical_usage_json: Option<String>,
}
