//! Nodeflow Engine
//!
//! Executes a node graph by pulling results from its end nodes (nodes whose
//! outputs nothing consumes). Each end node resolves its inputs recursively;
//! every node reached is computed at most once per run, however many
//! downstream nodes depend on it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        GraphEngine                          │
//! │  - execute(options) → Vec<ExecutionResult>                  │
//! │  - finds end nodes, runs one branch per end node            │
//! │  - progress, cancellation, node annotation after the run    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ one branch per end node
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       execute_node                          │
//! │  - get-or-insert the node's shared future in the cache      │
//! │  - invokes the node's processor; inputs resolve recursively │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ExecutionCache                         │
//! │  - node_id → shared future, inserted before it is polled    │
//! │  - wait tracking between in-flight nodes (cycle detection)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use nodeflow_engine::{CallbackObserver, ExecuteOptions, GraphEngine};
//! use nodeflow_processor::ProcessorRegistry;
//!
//! let engine = GraphEngine::new(graph, ProcessorRegistry::with_builtins());
//! let options = ExecuteOptions::with_observer(
//!   CallbackObserver::new().on_progress(|progress, total| eprintln!("{progress}/{total}")),
//! );
//! for result in engine.execute(options).await? {
//!   println!("{}: {:?}", result.title, result.outcome);
//! }
//! ```

mod cache;
mod config;
mod engine;
mod error;
mod events;
mod executor;
mod monitor;
mod result;
mod status;

pub use cache::{ExecutionCache, NodeFuture, WaitGuard};
pub use config::EngineConfig;
pub use engine::GraphEngine;
pub use error::EngineError;
pub use events::{
  CallbackObserver, ChannelObserver, ExecuteOptions, ExecutionEvent, ExecutionObserver,
  NoopObserver,
};
pub use result::{ExecutionResult, NodeOutcome};
pub use status::{ExecutionStatus, RunState};

pub use nodeflow_graph::{Graph, Node, NodeId, NodeValue};
pub use nodeflow_processor::{NodeError, NodeOutput, ProcessorRegistry};
