// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V3.0 - LEDGER STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO DE AUTORIDADES DE PERSISTENCIA
 * =================================================================
 */

pub mod audit;
pub mod catalog;
pub mod commitment;
pub mod mail;
pub mod rowmap;
pub mod tenancy;

pub use audit::AuditRepository;
pub use catalog::CatalogRepository;
pub use commitment::CommitmentStore;
pub use mail::MailQueueRepository;
pub use tenancy::TenancyRepository;
