//! Type-Safe Wrappers Module
//!
//! ## Modules
//! - `file_size`: byte counts with compact display

pub mod file_size;

pub use file_size::FileSize;

// ============================================================================
// Property-Based Tests
// ============================================================================
