// [libs/domain/models/src/resource.rs]
/*!
 * =================================================================
 * APARATO: RESOURCE CATALOG MODELS (V3.0 - AZ STRATA)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DESCRIPTORES DE SERVICIO, RECURSO Y ZONA
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Zona sintética usada por recursos de topología plana.
pub const ANY_AVAILABILITY_ZONE: &str = "any";

/// Distribución de un recurso sobre las zonas de disponibilidad del cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResourceTopology {
    /// Sin dimensión de zona; los compromisos usan la zona sintética "any".
    #[serde(rename = "flat")]
    #[default]
    Flat,
    /// El uso se reporta por zona, la cuota es plana.
    #[serde(rename = "az-aware")]
    AzAware,
    /// Cuota y uso separados por zona.
    #[serde(rename = "az-separated")]
    AzSeparated,
}

impl ResourceTopology {
    /// Un compromiso sobre topología Flat exige la zona sintética; el resto
    /// exige una zona real del cluster.
    pub fn requires_real_availability_zone(&self) -> bool {
        !matches!(self, Self::Flat)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::AzAware => "az-aware",
            Self::AzSeparated => "az-separated",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "flat" => Some(Self::Flat),
            "az-aware" => Some(Self::AzAware),
            "az-separated" => Some(Self::AzSeparated),
            _ => None,
        }
    }
}

/// Unidad de medida de un recurso. Las conversiones exigen paridad de unidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResourceUnit {
    #[serde(rename = "")]
    #[default]
    None,
    #[serde(rename = "B")]
    Bytes,
    #[serde(rename = "KiB")]
    Kibibytes,
    #[serde(rename = "MiB")]
    Mebibytes,
    #[serde(rename = "GiB")]
    Gibibytes,
}

impl ResourceUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Bytes => "B",
            Self::Kibibytes => "KiB",
            Self::Mebibytes => "MiB",
            Self::Gibibytes => "GiB",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "" => Some(Self::None),
            "B" => Some(Self::Bytes),
            "KiB" => Some(Self::Kibibytes),
            "MiB" => Some(Self::Mebibytes),
            "GiB" => Some(Self::Gibibytes),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceUnit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Recurso declarado por un driver liquid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(default)]
    pub unit: ResourceUnit,
    #[serde(default)]
    pub topology: ResourceTopology,
    pub has_quota: bool,
}

/// Tasa declarada por un driver liquid. El núcleo solo la transporta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateInfo {
    pub name: String,
    #[serde(default)]
    pub unit: ResourceUnit,
}

/// Descriptor versionado de un servicio.
///
/// 'version' es el token de vivacidad del protocolo liquid: un cambio de
/// versión invalida las interacciones pendientes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub version: u64,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceInfo>,
    #[serde(default)]
    pub rates: Vec<RateInfo>,
}

impl ServiceInfo {
    pub fn resource(&self, resource_name: &str) -> Option<&ResourceInfo> {
        self.resources.get(resource_name)
    }
}

// --- FILAS DE CATÁLOGO PERSISTIDAS ---

/// Fila de la tabla 'services'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub service_type: String,
    pub info_version: u64,
    pub rescrape_requested_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Fila de la tabla 'resources'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub service_id: i64,
    pub name: String,
    pub unit: ResourceUnit,
    pub topology: ResourceTopology,
    pub has_quota: bool,
}

/// Fila de la tabla 'az_resources': el grano al que se anclan compromisos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzResource {
    pub id: i64,
    pub resource_id: i64,
    pub availability_zone: String,
}
