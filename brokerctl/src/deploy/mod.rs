//! Deployment module

pub mod orchestrator;
pub mod request;
pub mod validate;
