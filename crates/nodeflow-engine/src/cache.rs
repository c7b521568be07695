//! Per-run execution cache.
//!
//! Maps each node to the single shared future computing it. Entries are
//! inserted before the future is first polled, so concurrent consumers of a
//! shared ancestor all await the same in-flight computation.
//!
//! The cache also records which in-flight node is awaiting which. Awaiting a
//! node that (transitively) awaits the caller would never resolve; that wait
//! is refused with [`NodeError::CycleDetected`] instead.
//!
//! An entry is *started* once its computation is past the cancellation
//! check. Started entries are always driven to settlement before the run
//! ends, even after a cancellation or a consumer's timeout.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use nodeflow_graph::NodeId;
use nodeflow_processor::{NodeError, NodeOutput};

/// The memoized computation of one node.
pub type NodeFuture = Shared<BoxFuture<'static, Result<NodeOutput, NodeError>>>;

struct Entry {
  future: NodeFuture,
  started: bool,
  settled: bool,
}

#[derive(Default)]
struct CacheState {
  entries: HashMap<NodeId, Entry>,
  /// Insertion order of `entries`.
  order: Vec<NodeId>,
  /// waiter -> (awaited node -> number of pending awaits)
  waits: HashMap<NodeId, HashMap<NodeId, usize>>,
}

impl CacheState {
  /// Whether `from` is, directly or transitively, awaiting `to`.
  fn is_waiting_on(&self, from: NodeId, to: NodeId) -> bool {
    let mut stack = vec![from];
    let mut seen = Vec::new();

    while let Some(current) = stack.pop() {
      if current == to {
        return true;
      }
      if seen.contains(&current) {
        continue;
      }
      seen.push(current);
      if let Some(targets) = self.waits.get(&current) {
        stack.extend(targets.keys().copied());
      }
    }

    false
  }
}

/// Memoization table for one run. Never shared across runs.
#[derive(Default)]
pub struct ExecutionCache {
  state: Mutex<CacheState>,
}

impl ExecutionCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Return the future cached for `node_id`, or create, store and return one.
  ///
  /// `create` runs at most once per node and only builds the future; the
  /// second element is `true` when this call inserted the entry.
  pub fn get_or_insert_with<F>(&self, node_id: NodeId, create: F) -> (NodeFuture, bool)
  where
    F: FnOnce() -> BoxFuture<'static, Result<NodeOutput, NodeError>>,
  {
    let mut state = self.lock();
    if let Some(entry) = state.entries.get(&node_id) {
      return (entry.future.clone(), false);
    }

    let future = create().shared();
    state.entries.insert(
      node_id,
      Entry {
        future: future.clone(),
        started: false,
        settled: false,
      },
    );
    state.order.push(node_id);
    (future, true)
  }

  /// Record that the node's computation got past its cancellation check.
  pub fn mark_started(&self, node_id: NodeId) {
    if let Some(entry) = self.lock().entries.get_mut(&node_id) {
      entry.started = true;
    }
  }

  /// Record that the node's computation has finished.
  pub fn mark_settled(&self, node_id: NodeId) {
    let mut state = self.lock();
    if let Some(entry) = state.entries.get_mut(&node_id) {
      entry.settled = true;
    }
    state.waits.remove(&node_id);
  }

  /// Register that `waiter` is about to await `target`.
  ///
  /// Fails with `CycleDetected` when `target` is `waiter` itself or is still
  /// in flight and already waiting on `waiter`. The returned guard
  /// unregisters the wait when dropped.
  pub fn begin_wait(&self, waiter: NodeId, target: NodeId) -> Result<WaitGuard<'_>, NodeError> {
    let mut state = self.lock();

    if waiter == target {
      return Err(NodeError::CycleDetected { node_id: target });
    }

    let settled = state.entries.get(&target).is_some_and(|e| e.settled);
    if !settled {
      if state.is_waiting_on(target, waiter) {
        return Err(NodeError::CycleDetected { node_id: target });
      }
      *state
        .waits
        .entry(waiter)
        .or_default()
        .entry(target)
        .or_default() += 1;
    }

    Ok(WaitGuard {
      cache: self,
      waiter,
      target,
      registered: !settled,
    })
  }

  fn end_wait(&self, waiter: NodeId, target: NodeId) {
    let mut state = self.lock();
    let Some(targets) = state.waits.get_mut(&waiter) else {
      return;
    };
    if let Some(count) = targets.get_mut(&target) {
      *count -= 1;
      if *count == 0 {
        targets.remove(&target);
      }
    }
    if targets.is_empty() {
      state.waits.remove(&waiter);
    }
  }

  /// Futures of entries that started but have not settled yet.
  pub fn in_flight(&self) -> Vec<NodeFuture> {
    let state = self.lock();
    state
      .order
      .iter()
      .filter_map(|id| state.entries.get(id))
      .filter(|e| e.started && !e.settled)
      .map(|e| e.future.clone())
      .collect()
  }

  /// Remove every entry, returning each node's outcome in insertion order.
  ///
  /// The outcome is `None` for a node whose future was dropped before it
  /// settled.
  pub fn drain(&self) -> Vec<(NodeId, Option<Result<NodeOutput, NodeError>>)> {
    let mut state = self.lock();
    let mut entries = std::mem::take(&mut state.entries);
    let order = std::mem::take(&mut state.order);
    state.waits.clear();
    drop(state);

    order
      .into_iter()
      .filter_map(|id| {
        let entry = entries.remove(&id)?;
        Some((id, entry.future.peek().cloned()))
      })
      .collect()
  }
}

/// Registration of one pending await between two nodes.
pub struct WaitGuard<'a> {
  cache: &'a ExecutionCache,
  waiter: NodeId,
  target: NodeId,
  registered: bool,
}

impl Drop for WaitGuard<'_> {
  fn drop(&mut self) {
    if self.registered {
      self.cache.end_wait(self.waiter, self.target);
    }
  }
}
