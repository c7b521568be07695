//! Progress bookkeeping for one run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use nodeflow_graph::NodeId;
use nodeflow_processor::{NodeError, NodeOutput};
use tracing::{info, warn};

use crate::events::ExecutionObserver;
use crate::status::ExecutionStatus;

/// Hooks the executor calls when cache entries are inserted and settle.
pub(crate) struct RunMonitor {
  run_id: String,
  status: Arc<Mutex<ExecutionStatus>>,
  estimate: usize,
  total_set: AtomicBool,
  observer: Arc<dyn ExecutionObserver>,
}

impl RunMonitor {
  pub fn new(
    run_id: String,
    status: Arc<Mutex<ExecutionStatus>>,
    estimate: usize,
    observer: Arc<dyn ExecutionObserver>,
  ) -> Self {
    Self {
      run_id,
      status,
      estimate,
      total_set: AtomicBool::new(false),
      observer,
    }
  }

  pub fn observer(&self) -> &dyn ExecutionObserver {
    self.observer.as_ref()
  }

  /// A node's future was stored in the cache for the first time.
  ///
  /// The first insertion of a run publishes the progress estimate.
  pub fn node_inserted(&self) {
    if self.total_set.swap(true, Ordering::AcqRel) {
      return;
    }
    let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
    status.total = self.estimate;
  }

  /// A node's computation finished, successfully or not.
  pub fn node_settled(
    &self,
    node_id: NodeId,
    title: &str,
    outcome: &Result<NodeOutput, NodeError>,
  ) {
    let (progress, total) = {
      let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
      status.progress += 1;
      (status.progress, status.total)
    };
    self.observer.on_progress(progress, total);

    match outcome {
      Ok(output) => {
        info!(run_id = %self.run_id, node_id, progress, total, "node_completed");
        self
          .observer
          .on_node_complete(node_id, title, &output.to_value());
      }
      Err(e) => {
        warn!(run_id = %self.run_id, node_id, error = %e, progress, total, "node_failed");
        self.observer.on_node_error(node_id, title, &e.to_string());
      }
    }
  }
}
