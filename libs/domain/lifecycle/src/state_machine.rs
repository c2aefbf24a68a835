// [libs/domain/lifecycle/src/state_machine.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT STATE MACHINE (V3.2 - SOVEREIGN GUARD)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: LEGALIDAD DE TRANSICIONES Y GUARDIAS DE OPERACIÓN
 *
 * VISION 2026:
 * 1. SINGLE TABLE: Toda transición legal vive en 'transition_is_legal';
 *    los orquestadores nunca mutan 'status' por fuera de este aparato.
 * 2. REASON AGGREGATION: Las guardias de operación acumulan TODAS las
 *    razones de rechazo y las reportan en un solo conflicto.
 * =================================================================
 */

use chrono::{DateTime, Duration as TimeDelta, Utc};
use thiserror::Error;

use custos_domain_models::commitment::{
    CommitmentStatus, ProjectCommitment, TransferStatus,
};

/// Ventana previa a la expiración dentro de la cual se admite renovar.
pub const RENEWAL_WINDOW_DAYS: i64 = 90;

/// Rechazo de guardia: la operación y todas las razones acumuladas.
/// Se presenta aguas arriba como conflicto 409.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {operation} this commitment: {}", .reasons.join(", "))]
pub struct GuardRefusal {
    pub operation: &'static str,
    pub reasons: Vec<String>,
}

impl GuardRefusal {
    fn collect(operation: &'static str, reasons: Vec<String>) -> Result<(), Self> {
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(Self { operation, reasons })
        }
    }
}

/// Tabla de transiciones legales. 'None' en origen = creación; 'None' en
/// destino = borrado físico (aceptado por el backend).
pub fn transition_is_legal(
    from: Option<CommitmentStatus>,
    to: Option<CommitmentStatus>,
) -> bool {
    use CommitmentStatus::*;
    match (from, to) {
        // Creación: Planned (confirm_by futuro) o Confirmed (inmediata).
        (None, Some(Planned)) | (None, Some(Confirmed)) => true,
        // Reloj externo.
        (Some(Planned), Some(Pending)) => true,
        (Some(Pending), Some(Confirmed)) => true,
        (Some(Confirmed), Some(Expired)) => true,
        // Merge / Split / Convert; la conversión admite originales aún
        // no confirmados.
        (Some(origin), Some(Superseded)) => !origin.is_terminal(),
        // Borrado: cualquier estado no terminal.
        (Some(origin), None) => !origin.is_terminal(),
        _ => false,
    }
}

// --- GUARDIAS DE OPERACIÓN ---

/// Merge: ≥2 entradas, misma AZResource, todas Confirmed, ninguna en
/// transferencia.
pub fn check_merge(inputs: &[ProjectCommitment]) -> Result<(), GuardRefusal> {
    let mut reasons = Vec::new();

    if inputs.len() < 2 {
        reasons.push("at least two commitments are required".to_string());
    }

    if let Some(first) = inputs.first() {
        if inputs
            .iter()
            .any(|commitment| commitment.az_resource_id != first.az_resource_id)
        {
            reasons.push("all commitments must be on the same resource and availability zone".to_string());
        }
    }

    for commitment in inputs {
        if commitment.status != CommitmentStatus::Confirmed {
            reasons.push(format!("invalid status {:?}", commitment.status.as_str()));
        }
        if commitment.is_transferring() {
            reasons.push(format!("commitment {} is marked for transfer", commitment.uuid));
        }
    }

    GuardRefusal::collect("merge", reasons)
}

/// Plan de merge: suma de cantidades, expiración máxima y la duración de
/// la fila que aporta esa expiración.
pub fn plan_merge(inputs: &[ProjectCommitment]) -> (u64, DateTime<Utc>, custos_domain_models::CommitmentDuration) {
    let merged_amount = inputs.iter().map(|commitment| commitment.amount).sum();

    let longest_lived = inputs
        .iter()
        .max_by_key(|commitment| commitment.expires_at)
        .expect("plan_merge requires a non-empty, guard-checked input set");

    (merged_amount, longest_lived.expires_at, longest_lived.duration)
}

/// Renew: Confirmed, no expirado, dentro de la ventana de 90 días, sin
/// renovación previa. Acumula todas las razones.
pub fn check_renew(
    commitment: &ProjectCommitment,
    now: DateTime<Utc>,
) -> Result<(), GuardRefusal> {
    let mut reasons = Vec::new();

    if commitment.status != CommitmentStatus::Confirmed {
        reasons.push(format!("invalid status {:?}", commitment.status.as_str()));
    }
    if now > commitment.expires_at {
        reasons.push("already expired".to_string());
    } else if now < commitment.expires_at - TimeDelta::days(RENEWAL_WINDOW_DAYS) {
        reasons.push(format!(
            "renewal attempt is too early, renewal is possible from {} onwards",
            (commitment.expires_at - TimeDelta::days(RENEWAL_WINDOW_DAYS)).to_rfc3339()
        ));
    }
    if commitment.was_renewed() {
        reasons.push("already renewed".to_string());
    }

    GuardRefusal::collect("renew", reasons)
}

/// Delete: cualquier estado no terminal.
pub fn check_delete(commitment: &ProjectCommitment) -> Result<(), GuardRefusal> {
    let mut reasons = Vec::new();
    if commitment.status.is_terminal() {
        reasons.push(format!("invalid status {:?}", commitment.status.as_str()));
    }
    GuardRefusal::collect("delete", reasons)
}

/// Start-transfer: estado no terminal, objetivo distinto del vigente,
/// cantidad en (0, amount] al habilitar.
pub fn check_start_transfer(
    commitment: &ProjectCommitment,
    transfer_amount: u64,
    target_status: TransferStatus,
) -> Result<(), GuardRefusal> {
    let mut reasons = Vec::new();

    if commitment.status.is_terminal() {
        reasons.push(format!("invalid status {:?}", commitment.status.as_str()));
    }
    if commitment.transfer_status == target_status {
        reasons.push(format!(
            "commitment is already in transfer status {:?}",
            target_status.as_str()
        ));
    }
    if target_status != TransferStatus::None {
        if transfer_amount == 0 {
            reasons.push("transfer amount must be positive".to_string());
        }
        if transfer_amount > commitment.amount {
            reasons.push("transfer amount exceeds commitment amount".to_string());
        }
        // El split produce hermanas Confirmed.
        if transfer_amount < commitment.amount
            && commitment.status != CommitmentStatus::Confirmed
        {
            reasons.push("only confirmed commitments can be split".to_string());
        }
    }

    GuardRefusal::collect("start a transfer on", reasons)
}

/// Convert: Confirmed o no terminal, sin transferencia activa, cantidad
/// origen acotada.
pub fn check_convert(
    commitment: &ProjectCommitment,
    source_amount: u64,
) -> Result<(), GuardRefusal> {
    let mut reasons = Vec::new();

    if commitment.status.is_terminal() {
        reasons.push(format!("invalid status {:?}", commitment.status.as_str()));
    }
    if commitment.is_transferring() {
        reasons.push("commitment is marked for transfer".to_string());
    }
    if source_amount == 0 {
        reasons.push("source amount must be positive".to_string());
    }
    if source_amount > commitment.amount {
        reasons.push("source amount exceeds commitment amount".to_string());
    }
    // El split produce hermanas Confirmed.
    if source_amount < commitment.amount && commitment.status != CommitmentStatus::Confirmed {
        reasons.push("only confirmed commitments can be split".to_string());
    }

    GuardRefusal::collect("convert", reasons)
}

/// Update-duration: no terminal y solo extensión (el nuevo vencimiento
/// nunca retrocede).
pub fn check_update_duration(
    commitment: &ProjectCommitment,
    new_expires_at: DateTime<Utc>,
) -> Result<(), GuardRefusal> {
    let mut reasons = Vec::new();

    if commitment.status.is_terminal() {
        reasons.push(format!("invalid status {:?}", commitment.status.as_str()));
    }
    if new_expires_at < commitment.expires_at {
        reasons.push(
            "duration change would shorten the commitment lifetime".to_string(),
        );
    }

    GuardRefusal::collect("update the duration of", reasons)
}

/// Plan de split: (cantidad transferible/convertible, remanente). Las dos
/// mitades suman exactamente el original.
pub fn plan_split(original_amount: u64, carved_amount: u64) -> (u64, u64) {
    debug_assert!(carved_amount > 0 && carved_amount < original_amount);
    (carved_amount, original_amount - carved_amount)
}
