// [libs/infra/db/src/repositories/tenancy.rs]
/*!
 * =================================================================
 * APARATO: TENANCY REPOSITORY (V3.1 - HIERARCHY AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DOMINIOS Y PROYECTOS DEL CLUSTER
 *
 * El descubrimiento real contra el directorio de identidad queda fuera
 * del núcleo; 'ensure_*' materializa las semillas de configuración.
 * =================================================================
 */

use libsql::{params, Connection};
use tracing::{debug, instrument};

use custos_domain_models::liquid::ProjectMetadata;
use custos_domain_models::tenancy::{Domain, Project};

use crate::errors::DbError;
use crate::repositories::rowmap::{int_at, text_at};
use crate::LedgerClient;

pub struct TenancyRepository {
    database_client: LedgerClient,
}

impl TenancyRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { database_client: client }
    }

    /// Materializa un dominio sembrado, idempotente por uuid.
    #[instrument(skip(self))]
    pub async fn ensure_domain(&self, uuid: &str, name: &str) -> Result<Domain, DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO domains (uuid, name) VALUES (?1, ?2)
                 ON CONFLICT(uuid) DO UPDATE SET name = excluded.name",
                params![uuid, name],
            )
            .await?;

        let domain = Self::find_domain_by_uuid(&connection, uuid).await?;
        debug!("🏛️ [TENANCY]: Domain [{}] level as id {}.", name, domain.id);
        Ok(domain)
    }

    /// Materializa un proyecto sembrado bajo su dominio.
    #[instrument(skip(self))]
    pub async fn ensure_project(
        &self,
        domain_id: i64,
        uuid: &str,
        name: &str,
    ) -> Result<Project, DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO projects (uuid, name, domain_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(uuid) DO UPDATE SET name = excluded.name",
                params![uuid, name, domain_id],
            )
            .await?;

        let mut rows = connection
            .query("SELECT id, uuid, name, domain_id FROM projects WHERE uuid = ?1", params![uuid])
            .await?;
        let row = rows.next().await?.ok_or(DbError::ProjectNotFound)?;
        Ok(map_project(&row)?)
    }

    pub async fn find_domain_by_uuid(
        connection: &Connection,
        domain_uuid: &str,
    ) -> Result<Domain, DbError> {
        let mut rows = connection
            .query("SELECT id, uuid, name FROM domains WHERE uuid = ?1", params![domain_uuid])
            .await?;
        let row = rows.next().await?.ok_or(DbError::DomainNotFound)?;
        Ok(Domain {
            id: int_at(&row, 0)?,
            uuid: text_at(&row, 1)?,
            name: text_at(&row, 2)?,
        })
    }

    /// Proyecto bajo un dominio concreto; cruzar dominios es 404.
    pub async fn find_project_in_domain(
        connection: &Connection,
        domain_id: i64,
        project_uuid: &str,
    ) -> Result<Project, DbError> {
        let mut rows = connection
            .query(
                "SELECT id, uuid, name, domain_id FROM projects
                 WHERE uuid = ?1 AND domain_id = ?2",
                params![project_uuid, domain_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::ProjectNotFound)?;
        Ok(map_project(&row)?)
    }

    pub async fn find_project_by_id(
        connection: &Connection,
        project_id: i64,
    ) -> Result<Project, DbError> {
        let mut rows = connection
            .query(
                "SELECT id, uuid, name, domain_id FROM projects WHERE id = ?1",
                params![project_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::ProjectNotFound)?;
        Ok(map_project(&row)?)
    }

    /// Identidad (proyecto + dominio) tal como viaja en el protocolo liquid.
    pub async fn project_metadata(
        connection: &Connection,
        project_id: i64,
    ) -> Result<ProjectMetadata, DbError> {
        let mut rows = connection
            .query(
                "SELECT p.uuid, p.name, d.uuid, d.name
                 FROM projects p JOIN domains d ON d.id = p.domain_id
                 WHERE p.id = ?1",
                params![project_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DbError::ProjectNotFound)?;
        Ok(ProjectMetadata {
            uuid: text_at(&row, 0)?,
            name: text_at(&row, 1)?,
            domain_uuid: text_at(&row, 2)?,
            domain_name: text_at(&row, 3)?,
        })
    }
}

fn map_project(row: &libsql::Row) -> Result<Project, DbError> {
    Ok(Project {
        id: int_at(row, 0)?,
        uuid: text_at(row, 1)?,
        name: text_at(row, 2)?,
        domain_id: int_at(row, 3)?,
    })
}
