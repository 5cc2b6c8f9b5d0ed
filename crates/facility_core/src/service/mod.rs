//! Core use-case services.
//!
//! # Responsibility
//! - Prepare imported trees for reinsertion.
//! - Orchestrate snapshot export/import over the repositories.

pub mod normalizer;
pub mod project_service;
