// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CUSTOS DOMAIN MODELS (V3.0 - COMMITMENT STRATA)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS SOBERANOS DEL CICLO DE VIDA DE COMPROMISOS
 * =================================================================
 */

pub mod audit;
pub mod commitment;
pub mod config;
pub mod liquid;
pub mod resource;
pub mod tenancy;

pub use commitment::{
    CommitmentDuration, CommitmentReason, CommitmentStatus, CommitmentWorkflowContext,
    ProjectCommitment, TransferStatus,
};
pub use resource::{ResourceTopology, ResourceUnit, ServiceInfo, ANY_AVAILABILITY_ZONE};
