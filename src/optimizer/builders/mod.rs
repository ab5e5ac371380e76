//! Builders turning bound entities into objective terms and constraint rows.
//!
//! All four builders are fed by the same traversal of the study, so every
//! bound entity reaches each builder that cares about it.

pub mod balance;
pub mod converter;
pub mod objective;
pub mod storage;

pub use balance::AdequacyBuilder;
pub use converter::ConverterMixBuilder;
pub use objective::ObjectiveBuilder;
pub use storage::StorageBuilder;
