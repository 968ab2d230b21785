//! # Prometheus Batch
//!
//! Fair, capacity-bounded dispatch of batch jobs across many users.
//!
//! Users submit long-running jobs (typically SQL queries) that are persisted,
//! queued per user, and executed in the background. One heavy user must not
//! starve the others, so dispatch walks users round-robin: each user gets one
//! unit of work per turn, and a pluggable capacity strategy bounds how many
//! units run at once.
//!
//! ## Key Features
//!
//! - **Round-robin fairness**: users holding a backlog take turns; a new user
//!   joins the tail of the rotation and is served within one cycle
//! - **Capacity strategies**: strict serialization, a fixed ceiling, a ceiling
//!   adjustable at runtime, or no ceiling at all
//! - **Fault isolation**: a failing or panicking unit only affects its user
//! - **Job lifecycle**: pending, running, done, failed, cancelled, with
//!   per-job timeouts and best-effort cancellation
//! - **Multi-instance**: instances sharing a store and queue coordinate
//!   through a publisher and recover missed events by discovery
//! - **Persistent backends**: JSON-lines queue and store survive restarts
//!
//! ## Scheduler
//!
//! The [`core::Scheduler`] is usable on its own with any
//! [`core::TaskRunner`]:
//!
//! ```rust,ignore
//! use prometheus_batch::core::{FixedCapacity, Scheduler};
//! use prometheus_batch::runtime::TokioSpawner;
//!
//! let scheduler = Scheduler::new(FixedCapacity(4), my_runner, TokioSpawner::current());
//! scheduler.register("alice");
//! scheduler.register("bob");
//! scheduler.drain().await;
//! ```
//!
//! ## Job service
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_batch::builders::build_service;
//! use prometheus_batch::config::BatchConfig;
//! use prometheus_batch::infra::BroadcastPublisher;
//! use prometheus_batch::runtime::TokioSpawner;
//! use tokio_util::sync::CancellationToken;
//!
//! let cfg = BatchConfig::from_env()?;
//! let publisher = BroadcastPublisher::new(cfg.publisher_buffer);
//! let service = build_service(&cfg, Arc::new(my_executor), Arc::new(publisher.clone()), TokioSpawner::current())?;
//! service.start(publisher.subscribe(), None, CancellationToken::new()).await?;
//!
//! let job = service.create("alice", "SELECT 1").await?;
//! ```
//!
//! For complete examples, see:
//! - `tests/scheduler_test.rs` - Scheduler fairness and liveness
//! - `tests/job_service_test.rs` - Job lifecycle across instances

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions, job lifecycle and capacity accounting.
pub mod core;
/// Configuration models for capacity, backends, and timeouts.
pub mod config;
/// Builders to construct a job service from configuration.
pub mod builders;
/// Infrastructure adapters for queues, job stores, and publishers.
pub mod infra;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
