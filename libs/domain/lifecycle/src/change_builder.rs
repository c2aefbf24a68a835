// [libs/domain/lifecycle/src/change_builder.rs]
/*!
 * =================================================================
 * APARATO: CHANGE REQUEST BUILDER (V3.1 - TOTALS BOUNDARY)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ENSAMBLADO DE LA PETICIÓN DE CAMBIO PROPUESTA
 *
 * VISION 2026:
 * 1. TOTALS FIRST: Cada (proyecto, recurso) tocado transporta sus
 *    totales confirmados before/after; las filas individuales son
 *    acompañamiento, nunca sustituto.
 * 2. DEBUG LEGALITY: Toda transición registrada se contrasta en debug
 *    contra la tabla de la máquina de estados.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use custos_domain_models::commitment::{CommitmentStatus, ProjectCommitment};
use custos_domain_models::liquid::{
    CommitmentChangeEntry, CommitmentChangeRequest, ProjectCommitmentChangeset,
    ProjectMetadata, ResourceCommitmentChangeset,
};

use crate::state_machine::transition_is_legal;

/// Ensambla un `CommitmentChangeRequest` describiendo una transición
/// propuesta sobre una zona de disponibilidad.
#[derive(Debug)]
pub struct ChangeRequestBuilder {
    availability_zone: String,
    info_version: u64,
    dry_run: bool,
    by_project: BTreeMap<String, ProjectCommitmentChangeset>,
}

impl ChangeRequestBuilder {
    pub fn new(availability_zone: impl Into<String>, info_version: u64) -> Self {
        Self {
            availability_zone: availability_zone.into(),
            info_version,
            dry_run: false,
            by_project: BTreeMap::new(),
        }
    }

    /// Marca la petición como dry-run (sin efecto durable en el backend).
    pub fn as_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    fn resource_slot(
        &mut self,
        project: &ProjectMetadata,
        resource_name: &str,
    ) -> &mut ResourceCommitmentChangeset {
        self.by_project
            .entry(project.uuid.clone())
            .or_insert_with(|| ProjectCommitmentChangeset {
                project_metadata: project.clone(),
                by_resource: BTreeMap::new(),
            })
            .by_resource
            .entry(resource_name.to_string())
            .or_default()
    }

    /// Fija los totales confirmados before/after de un (proyecto, recurso).
    pub fn set_confirmed_totals(
        &mut self,
        project: &ProjectMetadata,
        resource_name: &str,
        total_before: u64,
        total_after: u64,
    ) -> &mut Self {
        let slot = self.resource_slot(project, resource_name);
        slot.total_confirmed_before = total_before;
        slot.total_confirmed_after = total_after;
        self
    }

    /// Registra una fila que no existe aún en el lado 'before' (creación
    /// real o aparición en el lado destino de un movimiento).
    #[allow(clippy::too_many_arguments)]
    pub fn record_creation(
        &mut self,
        project: &ProjectMetadata,
        resource_name: &str,
        commitment_uuid: &str,
        new_status: CommitmentStatus,
        amount: u64,
        confirm_by: Option<DateTime<Utc>>,
        expires_at: DateTime<Utc>,
    ) -> &mut Self {
        // Un compromiso nunca aparece directamente en estado terminal.
        debug_assert!(!new_status.is_terminal());

        self.resource_slot(project, resource_name)
            .commitments
            .push(CommitmentChangeEntry {
                uuid: commitment_uuid.to_string(),
                old_status: None,
                new_status: Some(new_status),
                amount,
                confirm_by,
                expires_at,
                old_expires_at: None,
            });
        self
    }

    /// Registra una transición de estado de una fila existente.
    /// 'None' como destino significa borrado físico.
    pub fn record_transition(
        &mut self,
        project: &ProjectMetadata,
        resource_name: &str,
        commitment: &ProjectCommitment,
        new_status: Option<CommitmentStatus>,
    ) -> &mut Self {
        debug_assert!(transition_is_legal(Some(commitment.status), new_status));

        self.resource_slot(project, resource_name)
            .commitments
            .push(CommitmentChangeEntry {
                uuid: commitment.uuid.clone(),
                old_status: Some(commitment.status),
                new_status,
                amount: commitment.amount,
                confirm_by: commitment.confirm_by,
                expires_at: commitment.expires_at,
                old_expires_at: None,
            });
        self
    }

    /// Registra una fila sin cambio de estado (ediciones informativas,
    /// p.ej. visibilidad de transferencia).
    pub fn record_unchanged(
        &mut self,
        project: &ProjectMetadata,
        resource_name: &str,
        commitment: &ProjectCommitment,
    ) -> &mut Self {
        self.resource_slot(project, resource_name)
            .commitments
            .push(CommitmentChangeEntry {
                uuid: commitment.uuid.clone(),
                old_status: Some(commitment.status),
                new_status: Some(commitment.status),
                amount: commitment.amount,
                confirm_by: commitment.confirm_by,
                expires_at: commitment.expires_at,
                old_expires_at: None,
            });
        self
    }

    /// Registra una extensión de duración: el estado no cambia, pero el
    /// vencimiento anterior viaja a título informativo.
    pub fn record_extension(
        &mut self,
        project: &ProjectMetadata,
        resource_name: &str,
        commitment: &ProjectCommitment,
        new_expires_at: DateTime<Utc>,
    ) -> &mut Self {
        self.resource_slot(project, resource_name)
            .commitments
            .push(CommitmentChangeEntry {
                uuid: commitment.uuid.clone(),
                old_status: Some(commitment.status),
                new_status: Some(commitment.status),
                amount: commitment.amount,
                confirm_by: commitment.confirm_by,
                expires_at: new_expires_at,
                old_expires_at: Some(commitment.expires_at),
            });
        self
    }

    pub fn build(self) -> CommitmentChangeRequest {
        CommitmentChangeRequest {
            availability_zone: self.availability_zone,
            info_version: self.info_version,
            dry_run: self.dry_run,
            by_project: self.by_project,
        }
    }
}
