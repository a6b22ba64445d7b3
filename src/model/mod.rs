//src/model/mod.rs
pub mod elements;
pub mod structure;
pub mod summary;

// Re-exports for cleaner imports
pub use structure::{AtomSite, Structure};
pub use summary::StructureSummary;
