// [libs/infra/db/src/repositories/catalog.rs]
/*!
 * =================================================================
 * APARATO: CATALOG REPOSITORY (V3.2 - SERVICE STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SERVICIOS, RECURSOS Y AZ_RESOURCES SINCRONIZADOS
 *
 * VISION 2026:
 * 1. LIQUID MIRROR: Las tablas de catálogo reflejan el ServiceInfo
 *    vigente del registro liquid; el bootstrap las sincroniza.
 * 2. TOPOLOGY AWARE: Los recursos Flat anclan en la zona sintética
 *    "any"; el resto ancla en cada zona real del cluster.
 * =================================================================
 */

use libsql::{params, Connection};
use tracing::{debug, info, instrument};

use custos_domain_models::resource::{
    AzResource, Resource, ResourceTopology, ResourceUnit, Service, ServiceInfo,
    ANY_AVAILABILITY_ZONE,
};

use crate::errors::DbError;
use crate::repositories::rowmap::{bool_at, fmt_instant, int_at, opt_instant_at, text_at};
use crate::LedgerClient;

/// Contexto resuelto de una AZResource: todo lo que la capa de
/// presentación y los orquestadores necesitan saber de su anclaje.
#[derive(Debug, Clone)]
pub struct AzResourceContext {
    pub az_resource_id: i64,
    pub resource_id: i64,
    pub service_id: i64,
    pub service_type: String,
    pub resource_name: String,
    pub availability_zone: String,
    pub unit: ResourceUnit,
    pub topology: ResourceTopology,
}

pub struct CatalogRepository {
    database_client: LedgerClient,
}

impl CatalogRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { database_client: client }
    }

    /// Sincroniza el catálogo persistido desde el ServiceInfo vigente.
    #[instrument(skip(self, service_info, cluster_availability_zones))]
    pub async fn synchronize_service(
        &self,
        service_type: &str,
        service_info: &ServiceInfo,
        cluster_availability_zones: &[String],
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        connection
            .execute(
                "INSERT INTO services (type, info_version) VALUES (?1, ?2)
                 ON CONFLICT(type) DO UPDATE SET info_version = excluded.info_version",
                params![service_type, service_info.version as i64],
            )
            .await?;

        let service = Self::find_service(&connection, service_type).await?;

        for (resource_name, resource_info) in &service_info.resources {
            connection
                .execute(
                    "INSERT INTO resources (service_id, name, unit, topology, has_quota)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(service_id, name) DO UPDATE SET
                         unit = excluded.unit,
                         topology = excluded.topology,
                         has_quota = excluded.has_quota",
                    params![
                        service.id,
                        resource_name.as_str(),
                        resource_info.unit.as_str(),
                        resource_info.topology.as_str(),
                        resource_info.has_quota as i64
                    ],
                )
                .await?;

            let resource =
                Self::find_resource(&connection, service_type, resource_name).await?;

            let anchor_zones: Vec<&str> = match resource_info.topology {
                ResourceTopology::Flat => vec![ANY_AVAILABILITY_ZONE],
                _ => cluster_availability_zones
                    .iter()
                    .map(String::as_str)
                    .collect(),
            };

            for zone in anchor_zones {
                connection
                    .execute(
                        "INSERT INTO az_resources (resource_id, availability_zone)
                         VALUES (?1, ?2)
                         ON CONFLICT(resource_id, availability_zone) DO NOTHING",
                        params![resource.id, zone],
                    )
                    .await?;
            }
        }

        info!(
            "🗺️ [CATALOG]: Service [{}] synchronized at info version {}.",
            service_type, service_info.version
        );
        Ok(())
    }

    pub async fn find_service(
        connection: &Connection,
        service_type: &str,
    ) -> Result<Service, DbError> {
        let mut rows = connection
            .query(
                "SELECT id, type, info_version, rescrape_requested_at
                 FROM services WHERE type = ?1",
                params![service_type],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::ResourceNotFound)?;
        Ok(Service {
            id: int_at(&row, 0)?,
            service_type: text_at(&row, 1)?,
            info_version: int_at(&row, 2)? as u64,
            rescrape_requested_at: opt_instant_at(&row, 3)?,
        })
    }

    pub async fn find_resource(
        connection: &Connection,
        service_type: &str,
        resource_name: &str,
    ) -> Result<Resource, DbError> {
        let mut rows = connection
            .query(
                "SELECT r.id, r.service_id, r.name, r.unit, r.topology, r.has_quota
                 FROM resources r JOIN services s ON s.id = r.service_id
                 WHERE s.type = ?1 AND r.name = ?2",
                params![service_type, resource_name],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::ResourceNotFound)?;
        map_resource(&row)
    }

    pub async fn find_az_resource(
        connection: &Connection,
        resource_id: i64,
        availability_zone: &str,
    ) -> Result<AzResource, DbError> {
        let mut rows = connection
            .query(
                "SELECT id, resource_id, availability_zone
                 FROM az_resources
                 WHERE resource_id = ?1 AND availability_zone = ?2",
                params![resource_id, availability_zone],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::AzResourceNotFound)?;
        Ok(AzResource {
            id: int_at(&row, 0)?,
            resource_id: int_at(&row, 1)?,
            availability_zone: text_at(&row, 2)?,
        })
    }

    /// Resuelve el anclaje completo de una AZResource. Una fila de
    /// compromiso cuyo anclaje no resuelve es 404 (defensa en
    /// profundidad).
    pub async fn az_resource_context(
        connection: &Connection,
        az_resource_id: i64,
    ) -> Result<AzResourceContext, DbError> {
        let mut rows = connection
            .query(
                "SELECT az.id, r.id, s.id, s.type, r.name, az.availability_zone,
                        r.unit, r.topology
                 FROM az_resources az
                 JOIN resources r ON r.id = az.resource_id
                 JOIN services s ON s.id = r.service_id
                 WHERE az.id = ?1",
                params![az_resource_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::AzResourceNotFound)?;

        let unit_raw = text_at(&row, 6)?;
        let topology_raw = text_at(&row, 7)?;

        Ok(AzResourceContext {
            az_resource_id: int_at(&row, 0)?,
            resource_id: int_at(&row, 1)?,
            service_id: int_at(&row, 2)?,
            service_type: text_at(&row, 3)?,
            resource_name: text_at(&row, 4)?,
            availability_zone: text_at(&row, 5)?,
            unit: ResourceUnit::parse(&unit_raw)
                .ok_or_else(|| DbError::MappingError(format!("unknown unit {:?}", unit_raw)))?,
            topology: ResourceTopology::parse(&topology_raw).ok_or_else(|| {
                DbError::MappingError(format!("unknown topology {:?}", topology_raw))
            })?,
        })
    }

    /// Invariante de creación/destino: el recurso no debe estar prohibido
    /// para el proyecto. La ausencia de fila equivale a permitido.
    pub async fn is_resource_forbidden(
        connection: &Connection,
        project_id: i64,
        resource_id: i64,
    ) -> Result<bool, DbError> {
        let mut rows = connection
            .query(
                "SELECT forbidden FROM project_resources
                 WHERE project_id = ?1 AND resource_id = ?2",
                params![project_id, resource_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => bool_at(&row, 0),
            None => Ok(false),
        }
    }

    /// Señal de rescrape de capacidad tras una confirmación inmediata.
    pub async fn request_capacity_rescrape(
        connection: &Connection,
        service_type: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DbError> {
        connection
            .execute(
                "UPDATE services SET rescrape_requested_at = ?2 WHERE type = ?1",
                params![service_type, fmt_instant(now)],
            )
            .await?;
        debug!("📡 [CATALOG]: Capacity rescrape signaled for [{}].", service_type);
        Ok(())
    }
}

fn map_resource(row: &libsql::Row) -> Result<Resource, DbError> {
    let unit_raw = text_at(row, 3)?;
    let topology_raw = text_at(row, 4)?;

    Ok(Resource {
        id: int_at(row, 0)?,
        service_id: int_at(row, 1)?,
        name: text_at(row, 2)?,
        unit: ResourceUnit::parse(&unit_raw)
            .ok_or_else(|| DbError::MappingError(format!("unknown unit {:?}", unit_raw)))?,
        topology: ResourceTopology::parse(&topology_raw)
            .ok_or_else(|| DbError::MappingError(format!("unknown topology {:?}", topology_raw)))?,
        has_quota: bool_at(row, 5)?,
    })
}
