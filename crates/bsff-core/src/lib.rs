//! # bsff-core: Foundational Types for Fluid-Waste Shipment Documents
//!
//! This crate is the leaf of the workspace. It defines the primitives every
//! other crate shares: identifier newtypes, UTC timestamps, the enumerations
//! that describe a shipment (document kind, transport mode, packaging type,
//! acceptance status, document status), the treatment operation catalogue,
//! company descriptors, and the engine configuration.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `DocumentId`, `ContainerId`,
//!    `TransporterId`, `Siret`, `VatNumber`. No bare strings for identifiers.
//!
//! 2. **Closed operation catalogue.** `OperationCode` carries its legal
//!    successor document kinds and compatible treatment modes. "Final"
//!    is derived from the catalogue, never stored.
//!
//! 3. **UTC-only timestamps** truncated to seconds, shared with the
//!    signature records and the correction window arithmetic.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `bsff-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod company;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod operation;
pub mod temporal;
pub mod waste;

// Re-export primary types for ergonomic imports.
pub use company::CompanyDescriptor;
pub use config::EngineConfig;
pub use domain::{AcceptationStatus, DocumentKind, DocumentStatus, PackagingType, TransportMode};
pub use error::BsffError;
pub use identity::{
    ContainerId, DocumentId, InterventionSheetId, Siret, TransporterId, VatNumber,
};
pub use operation::{OperationCode, OperationMode};
pub use temporal::Timestamp;
pub use waste::{is_fluid_waste_code, FLUID_WASTE_CODES};
