// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: COMMITMENT LEDGER SCHEMA (V3.3 - RELATIONAL STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION 2026:
 * 1. COMMITMENT CORE: Tabla 'project_commitments' con contextos JSON de
 *    creación/supersesión/renovación y unicidad global del token.
 * 2. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 3. PERFORMANCE: Índices para listados por proyecto y para la suma de
 *    totales confirmados por (proyecto, az_resource).
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/// ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
const LEDGER_TABLES: &[(&str, &str)] = &[
    ("TABLE_DOMAINS", r#"
        CREATE TABLE IF NOT EXISTS domains (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );
    "#),
    ("TABLE_PROJECTS", r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            domain_id INTEGER NOT NULL REFERENCES domains(id)
        );
    "#),
    ("TABLE_SERVICES", r#"
        CREATE TABLE IF NOT EXISTS services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL UNIQUE,
            info_version INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_RESOURCES", r#"
        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            service_id INTEGER NOT NULL REFERENCES services(id),
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT '',
            topology TEXT NOT NULL DEFAULT 'flat',
            has_quota INTEGER NOT NULL DEFAULT 1,
            UNIQUE(service_id, name)
        );
    "#),
    ("TABLE_AZ_RESOURCES", r#"
        CREATE TABLE IF NOT EXISTS az_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource_id INTEGER NOT NULL REFERENCES resources(id),
            availability_zone TEXT NOT NULL,
            UNIQUE(resource_id, availability_zone)
        );
    "#),
    ("TABLE_PROJECT_RESOURCES", r#"
        CREATE TABLE IF NOT EXISTS project_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            resource_id INTEGER NOT NULL REFERENCES resources(id),
            quota INTEGER,
            backend_quota INTEGER,
            max_quota_from_outside_admin INTEGER,
            max_quota_from_local_admin INTEGER,
            forbidden INTEGER NOT NULL DEFAULT 0,
            UNIQUE(project_id, resource_id)
        );
    "#),
    ("TABLE_PROJECT_AZ_RESOURCES", r#"
        CREATE TABLE IF NOT EXISTS project_az_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            az_resource_id INTEGER NOT NULL REFERENCES az_resources(id),
            usage INTEGER NOT NULL DEFAULT 0,
            historical_usage_json TEXT,
            UNIQUE(project_id, az_resource_id)
        );
    "#),
    ("TABLE_PROJECT_COMMITMENTS", r#"
        CREATE TABLE IF NOT EXISTS project_commitments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            az_resource_id INTEGER NOT NULL REFERENCES az_resources(id),
            amount INTEGER NOT NULL,
            duration TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            creator_uuid TEXT NOT NULL,
            creator_name TEXT NOT NULL,
            confirm_by DATETIME,
            confirmed_at DATETIME,
            expires_at DATETIME NOT NULL,
            superseded_at DATETIME,
            status TEXT NOT NULL,
            transfer_status TEXT NOT NULL DEFAULT 'none',
            transfer_token TEXT UNIQUE,
            transfer_started_at DATETIME,
            notify_on_confirm INTEGER NOT NULL DEFAULT 0,
            creation_context_json TEXT NOT NULL,
            supersede_context_json TEXT,
            renew_context_json TEXT
        );
    "#),
    ("TABLE_PROJECT_RATES", r#"
        CREATE TABLE IF NOT EXISTS project_rates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            service_id INTEGER NOT NULL REFERENCES services(id),
            name TEXT NOT NULL,
            usage_as_bigint TEXT,
            UNIQUE(project_id, service_id, name)
        );
    "#),
    ("TABLE_AUDIT_EVENTS", r#"
        CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_uuid TEXT NOT NULL UNIQUE,
            observed_at DATETIME NOT NULL,
            action TEXT NOT NULL,
            outcome TEXT NOT NULL,
            initiator_uuid TEXT NOT NULL,
            initiator_name TEXT NOT NULL,
            project_uuid TEXT NOT NULL,
            service_type TEXT NOT NULL,
            resource_name TEXT NOT NULL,
            payload_json TEXT NOT NULL
        );
    "#),
    ("TABLE_MAIL_QUEUE", r#"
        CREATE TABLE IF NOT EXISTS mail_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            subject TEXT NOT NULL,
            body_json TEXT NOT NULL,
            queued_at DATETIME NOT NULL,
            sent_at DATETIME
        );
    "#),
];

/// ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // --- SEÑAL DE RESCRAPE DE CAPACIDAD ---
    ("SERVICE_RESCRAPE", "ALTER TABLE services ADD COLUMN rescrape_requested_at DATETIME"),

    // --- AVISOS DE PRE-EXPIRACIÓN ---
    ("COMMITMENT_EXPIRY_NOTICE", "ALTER TABLE project_commitments ADD COLUMN notified_for_expiration INTEGER NOT NULL DEFAULT 0"),
];

/// ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_COMMITMENTS_PROJECT", "CREATE INDEX IF NOT EXISTS idx_commitments_project ON project_commitments(project_id, status);"),
    ("IDX_COMMITMENTS_TOTALS", "CREATE INDEX IF NOT EXISTS idx_commitments_totals ON project_commitments(project_id, az_resource_id, status);"),
    ("IDX_COMMITMENTS_OFFERS", "CREATE INDEX IF NOT EXISTS idx_commitments_offers ON project_commitments(az_resource_id, transfer_status, status);"),
    ("IDX_COMMITMENTS_CLOCK", "CREATE INDEX IF NOT EXISTS idx_commitments_clock ON project_commitments(status, confirm_by, expires_at);"),
    ("IDX_MAIL_UNSENT", "CREATE INDEX IF NOT EXISTS idx_mail_unsent ON mail_queue(sent_at) WHERE sent_at IS NULL;"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse.
 */
#[instrument(skip(database_connection))]
pub async fn apply_full_ledger_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V3.3...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Commitment Ledger V3.3 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in LEDGER_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => debug!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(fault) => {
                let message = fault.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
