//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the finger control software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for equipment (like the finger joint)
pub mod eqpt;

/// Network module
pub mod net;
