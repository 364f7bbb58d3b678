// scheduler-engine/src/lib.rs
// ============================================================================
// Module: Fleet Scheduler Engine
// Description: Reconciliation engine — environment/deployment services, the
//              deployment worker, the event dispatcher, and the periodic
//              ticker.
// Purpose: Public API surface for the scheduling engine workspace member.
// Dependencies: scheduler-core, scheduler-facade, scheduler-ingest, tokio,
//               tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! Fleet Scheduler's reconciliation engine. [`environment_service`] and
//! [`deployment_service`] own the store-backed CRUD/lifecycle operations;
//! [`worker`] performs the stateless per-environment reconciliation steps;
//! [`dispatcher`] serialises typed events onto those operations; [`ticker`]
//! feeds the dispatcher periodically. [`logging`] wires a default `tracing`
//! subscriber for demos and tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod deployment_service;
pub mod dispatcher;
mod errors;
mod ids;
pub mod logging;
pub mod environment_service;
pub mod ticker;
pub mod worker;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use deployment_service::DeploymentService;
pub use dispatcher::DispatchEvent;
pub use dispatcher::DispatchResult;
pub use dispatcher::EventDispatcher;
pub use dispatcher::InputEvent;
pub use environment_service::EnvironmentService;
pub use errors::from_facade_error;
pub use errors::from_store_error;
pub use ticker::Ticker;
pub use worker::DeploymentWorker;
pub use worker::DeploymentWorkerConfig;
pub use worker::StallPolicy;
