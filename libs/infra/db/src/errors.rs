// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V3.1 - SEMANTIC FAULTS)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer o abrir una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    // --- ESTRATO DE JERARQUÍA (TENANCY) ---

    /// El dominio solicitado no existe.
    #[error("[L3_TENANCY_FAULT]: DOMAIN_NOT_FOUND")]
    DomainNotFound,

    /// El proyecto solicitado no existe bajo el dominio dado.
    #[error("[L3_TENANCY_FAULT]: PROJECT_NOT_FOUND")]
    ProjectNotFound,

    // --- ESTRATO DE CATÁLOGO ---

    /// Servicio o recurso ausente del catálogo sincronizado.
    #[error("[L3_CATALOG_FAULT]: RESOURCE_NOT_FOUND")]
    ResourceNotFound,

    /// La pareja (recurso, zona) no está registrada.
    #[error("[L3_CATALOG_FAULT]: AZ_RESOURCE_NOT_FOUND")]
    AzResourceNotFound,

    // --- ESTRATO DE COMPROMISOS ---

    /// El compromiso solicitado no existe en las tablas activas.
    #[error("[L3_COMMITMENT_FAULT]: COMMITMENT_NOT_FOUND")]
    CommitmentNotFound,

    /// Ningún compromiso porta el token de transferencia presentado.
    #[error("[L3_COMMITMENT_FAULT]: TRANSFER_TOKEN_NOT_FOUND")]
    TransferTokenNotFound,
}
