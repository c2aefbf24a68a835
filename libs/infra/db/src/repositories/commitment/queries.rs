// [libs/infra/db/src/repositories/commitment/queries.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT LEDGER SQL STORE (V3.2 - LIFECYCLE SQL)
 * CLASIFICACIÓN: INFRASTRUCTURE SQL (ESTRATO L3)
 * RESPONSABILIDAD: SENTENCIAS ATÓMICAS DEL CICLO DE VIDA
 *
 * Las consultas de mutación usan guardias de estado en el WHERE para que
 * cada transición sea una operación atómica e indivisible dentro de la
 * transacción que la envuelve.
 * =================================================================
 */

/// Proyección completa de una fila de compromiso, en el orden que espera
/// el mapeador de dominio.
pub const COMMITMENT_PROJECTION: &str = r#"
    id, uuid, project_id, az_resource_id, amount, duration,
    created_at, creator_uuid, creator_name,
    confirm_by, confirmed_at, expires_at, superseded_at,
    status, transfer_status, transfer_token, transfer_started_at,
    notify_on_confirm, notified_for_expiration,
    creation_context_json, supersede_context_json, renew_context_json
"#;

// --- ESTRATO DE IGNICIÓN ---

/// Inserta una fila nueva del ledger con su contexto de creación sellado.
pub const INSERT_COMMITMENT: &str = r#"
    INSERT INTO project_commitments (
        uuid, project_id, az_resource_id, amount, duration,
        created_at, creator_uuid, creator_name,
        confirm_by, confirmed_at, expires_at, superseded_at,
        status, transfer_status, transfer_token, transfer_started_at,
        notify_on_confirm, notified_for_expiration,
        creation_context_json, supersede_context_json, renew_context_json
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5,
        ?6, ?7, ?8,
        ?9, ?10, ?11, ?12,
        ?13, ?14, ?15, ?16,
        ?17, ?18,
        ?19, ?20, ?21
    )
"#;

// --- ESTRATO DE LOCALIZACIÓN ---

pub const FIND_BY_ID_IN_PROJECT: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE id = ?1 AND project_id = ?2
"#;

pub const FIND_BY_UUID: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE uuid = ?1
"#;

pub const FIND_BY_TOKEN: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE transfer_token = ?1
"#;

/// Listado por proyecto: la historia superseded queda fuera por defecto.
pub const LIST_FOR_PROJECT: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE project_id = ?1 AND status != 'superseded'
    ORDER BY id ASC
"#;

/// Ofertas públicas vigentes sobre todas las zonas de un recurso.
pub const LIST_PUBLIC_OFFERS_FOR_RESOURCE: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE status = 'confirmed'
      AND transfer_status = 'public'
      AND expires_at > ?2
      AND az_resource_id IN (SELECT id FROM az_resources WHERE resource_id = ?1)
    ORDER BY id ASC
"#;

/// Ofertas públicas reclamables sobre una AZResource por otro proyecto,
/// de mayor a menor para el consumo voraz de la caché transferible.
pub const LIST_CLAIMABLE_OFFERS: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE az_resource_id = ?1
      AND project_id != ?2
      AND status = 'confirmed'
      AND transfer_status = 'public'
      AND expires_at > ?3
    ORDER BY amount DESC, id ASC
"#;

/// El escalar que viaja al backend: Σ amount de filas Confirmed.
pub const SUM_CONFIRMED: &str = r#"
    SELECT COALESCE(SUM(amount), 0) FROM project_commitments
    WHERE project_id = ?1 AND az_resource_id = ?2 AND status = 'confirmed'
"#;

// --- ESTRATO DE TRANSICIÓN ---

/// Supersesión terminal; limpia el estado de transferencia para que el
/// token quede libre de filas históricas.
pub const MARK_SUPERSEDED: &str = r#"
    UPDATE project_commitments
    SET status = 'superseded',
        superseded_at = ?2,
        supersede_context_json = ?3,
        transfer_status = 'none',
        transfer_token = NULL,
        transfer_started_at = NULL
    WHERE id = ?1 AND status != 'superseded'
"#;

pub const CONFIRM_COMMITMENT: &str = r#"
    UPDATE project_commitments
    SET status = 'confirmed', confirmed_at = ?2
    WHERE id = ?1 AND status IN ('pending', 'planned')
"#;

pub const MARK_PENDING: &str = r#"
    UPDATE project_commitments
    SET status = 'pending'
    WHERE id = ?1 AND status = 'planned'
"#;

pub const MARK_EXPIRED: &str = r#"
    UPDATE project_commitments
    SET status = 'expired'
    WHERE id = ?1 AND status = 'confirmed'
"#;

pub const SET_RENEW_CONTEXT: &str = r#"
    UPDATE project_commitments
    SET renew_context_json = ?2
    WHERE id = ?1
"#;

pub const UPDATE_TRANSFER_STATE: &str = r#"
    UPDATE project_commitments
    SET transfer_status = ?2,
        transfer_token = ?3,
        transfer_started_at = ?4
    WHERE id = ?1
"#;

/// Movimiento atómico entre proyectos; el estado de transferencia se
/// limpia en la misma sentencia.
pub const REASSIGN_PROJECT: &str = r#"
    UPDATE project_commitments
    SET project_id = ?2,
        transfer_status = 'none',
        transfer_token = NULL,
        transfer_started_at = NULL
    WHERE id = ?1
"#;

pub const UPDATE_DURATION: &str = r#"
    UPDATE project_commitments
    SET duration = ?2, expires_at = ?3
    WHERE id = ?1
"#;

pub const DELETE_COMMITMENT: &str = r#"
    DELETE FROM project_commitments WHERE id = ?1
"#;

// --- ESTRATO DE RELOJ (SWEEP) ---

pub const LIST_PLANNED_DUE: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE status = 'planned' AND confirm_by <= ?1
    ORDER BY confirm_by ASC
"#;

pub const LIST_PENDING: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE status = 'pending'
    ORDER BY confirm_by ASC
"#;

pub const LIST_CONFIRMED_PAST_EXPIRY: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE status = 'confirmed' AND expires_at <= ?1
    ORDER BY expires_at ASC
"#;

/// Filas Confirmed que entran en la ventana de aviso de pre-expiración y
/// aún no fueron notificadas ni renovadas.
pub const LIST_EXPIRING_UNNOTIFIED: &str = r#"
    SELECT {projection} FROM project_commitments
    WHERE status = 'confirmed'
      AND expires_at <= ?1
      AND notified_for_expiration = 0
      AND renew_context_json IS NULL
    ORDER BY expires_at ASC
"#;

pub const MARK_EXPIRY_NOTIFIED: &str = r#"
    UPDATE project_commitments
    SET notified_for_expiration = 1
    WHERE id = ?1
"#;

/// Sustituye el marcador de proyección en una consulta parametrizada.
pub fn with_projection(query_template: &str) -> String {
    query_template.replace("{projection}", COMMITMENT_PROJECTION)
}
