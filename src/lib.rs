//! Drive K2 cluster automation runs inside a task container.
//!
//! `k2cli` reads a K2 cluster configuration, works out which host files and
//! environment variables the automation needs, and runs the K2 playbooks in
//! a container on a local or remote Docker-compatible engine. The container's
//! lifecycle is deadline-bound and always ends in a removal or, when asked to
//! keep it, a rename to a fresh name so the next run can reuse the cluster's
//! deterministic name.
//!
//! # Modules
//!
//! - [`api`]: Cluster action planning and orchestration
//! - [`cluster`]: Cluster configuration trees, mounts and environment
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Engine connection profiles, image pulls and the task lifecycle
//! - [`error`]: Semantic error types for the application
//! - [`logging`]: Diagnostic logging setup

pub mod api;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
