//! brokerctl library
//!
//! Deploys a Submariner broker onto a Kubernetes cluster and writes the
//! `broker-info.subm` descriptor joining clusters consume.

pub mod app;
pub mod cluster;
pub mod deploy;
pub mod descriptor;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod reporter;
pub mod utils;
