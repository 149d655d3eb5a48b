//! Decides, per session, which tools a user can call.
//!
//! Registration is an explicit [`RegistrationTable`] of `(gate, source)`
//! entries evaluated once against the user's capability profile. Manifest
//! sources expand to one tool per permitted operation; builder sources cover
//! tool sets that are not manifest-driven. A failing entry is logged and
//! skipped without affecting the others.

#![warn(missing_docs, clippy::pedantic)]

pub mod capability;
pub mod error;
pub mod manifest_tools;
pub mod registrar;
pub mod table;

pub use capability::CapabilitySource;
pub use error::{RegistrationError, RegistrationResult};
pub use registrar::{Registrar, RegistrationReport, SessionTools, Skipped};
pub use table::{Gate, RegistrationEntry, RegistrationTable, ToolSource};
