// SPDX-License-Identifier: MIT

//! The schema instance state machine: tracks step progress and which
//! endpoint (if any) holds each step.

use std::collections::HashMap;

use indexmap::IndexSet;
use serde_json::Value;

use crate::cache_key::CacheKey;
use crate::endpoint::EndpointId;
use crate::error::AssignmentMismatch;
use crate::step::{Step, StepState};

/// Result of resolving a `STEP_COMPLETE` against an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The step completed; other steps remain.
    Pending,
    /// The step completed and was the last one outstanding.
    AllComplete,
}

/// One in-flight build: a schema's steps, the endpoints subscribed to
/// it, and the current assignment of steps to endpoints.
///
/// All mutation goes through `&mut self` methods that keep `steps` and
/// `assignments` consistent with each other; there is no way to observe
/// the two out of sync from outside this module.
#[derive(Debug, Clone)]
pub struct SchemaInstance {
    key: CacheKey,
    schema_id: String,
    steps: Vec<Step>,
    /// Endpoints that have joined this instance, in join order. Join
    /// order is the tie-break when more than one endpoint is idle and
    /// eligible for the next dispatch.
    subscribers: IndexSet<EndpointId>,
    /// step index -> endpoint currently holding it. An endpoint appears
    /// at most once as a value: one step in flight per endpoint.
    assignments: HashMap<usize, EndpointId>,
    complex_patchset: bool,
    repo_state: Value,
}

impl SchemaInstance {
    pub fn new(
        key: CacheKey,
        schema_id: impl Into<String>,
        total_steps: u32,
        complex_patchset: bool,
        repo_state: Value,
    ) -> Self {
        Self {
            key,
            schema_id: schema_id.into(),
            steps: (0..total_steps).map(|_| Step::pending()).collect(),
            subscribers: IndexSet::new(),
            assignments: HashMap::new(),
            complex_patchset,
            repo_state,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn complex_patchset(&self) -> bool {
        self.complex_patchset
    }

    pub fn repo_state(&self) -> &Value {
        &self.repo_state
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_subscribed(&self, endpoint: &EndpointId) -> bool {
        self.subscribers.contains(endpoint)
    }

    /// All subscribers, in join order.
    pub fn subscribers(&self) -> impl Iterator<Item = &EndpointId> + '_ {
        self.subscribers.iter()
    }

    /// Add an endpoint to this instance's subscriber set. Idempotent: a
    /// second INIT from the same endpoint on the same instance is a
    /// no-op here (the router may still choose to treat it as a
    /// protocol violation).
    pub fn add_subscriber(&mut self, endpoint: EndpointId) {
        self.subscribers.insert(endpoint);
    }

    /// Remove an endpoint from the instance. If it held an in-flight
    /// step, that step reopens to `Pending` and its index is returned
    /// so the caller can immediately try to redispatch it to a peer.
    pub fn remove_subscriber(&mut self, endpoint: &EndpointId) -> Option<usize> {
        self.subscribers.shift_remove(endpoint);
        let freed = self
            .assignments
            .iter()
            .find(|(_, holder)| *holder == endpoint)
            .map(|(&step, _)| step);
        if let Some(step) = freed {
            self.assignments.remove(&step);
            self.steps[step].reopen();
        }
        freed
    }

    /// True once every subscriber has left. The registry should drop
    /// such an instance rather than let it linger forever.
    pub fn is_abandoned(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn is_all_complete(&self) -> bool {
        self.steps.iter().all(Step::is_complete)
    }

    /// Subscribers with no step currently assigned to them, in join
    /// order.
    pub fn idle_subscribers(&self) -> impl Iterator<Item = &EndpointId> + '_ {
        self.subscribers
            .iter()
            .filter(|ep| !self.assignments.values().any(|holder| holder == *ep))
    }

    /// Pick the next step to hand to `endpoint` and mark it assigned.
    /// Selects the highest-numbered `Pending` step: steps are handed
    /// out back-to-front, so a worker that's been idle longest is not
    /// starved behind a reshuffled front of the queue.
    ///
    /// Returns `None` if the endpoint already holds a step or no step
    /// is pending.
    pub fn dispatch_to(&mut self, endpoint: &EndpointId) -> Option<usize> {
        if self.assignments.values().any(|holder| holder == endpoint) {
            return None;
        }
        let index = self
            .steps
            .iter()
            .enumerate()
            .rev()
            .find(|(_, step)| step.is_pending())
            .map(|(index, _)| index)?;
        self.steps[index].assign();
        self.assignments.insert(index, endpoint.clone());
        Some(index)
    }

    /// Resolve a `STEP_COMPLETE` from `endpoint` for `step`. Fails if
    /// the endpoint does not currently hold that step — a stale or
    /// forged completion, which the caller should log and drop rather
    /// than treat as fatal.
    pub fn complete_step(
        &mut self,
        endpoint: &EndpointId,
        step: usize,
    ) -> Result<CompletionOutcome, AssignmentMismatch> {
        self.check_assignment(endpoint, step)?;
        self.assignments.remove(&step);
        self.steps[step].complete();
        Ok(if self.is_all_complete() {
            CompletionOutcome::AllComplete
        } else {
            CompletionOutcome::Pending
        })
    }

    /// Resolve a reported failure of `step` by `endpoint`: the step
    /// reopens to `Pending` so it can be redispatched, to this
    /// endpoint or another.
    pub fn fail_step(&mut self, endpoint: &EndpointId, step: usize) -> Result<(), AssignmentMismatch> {
        self.check_assignment(endpoint, step)?;
        self.assignments.remove(&step);
        self.steps[step].reopen();
        Ok(())
    }

    pub fn step_state(&self, step: usize) -> Option<StepState> {
        self.steps.get(step).map(Step::state)
    }

    fn check_assignment(&self, endpoint: &EndpointId, step: usize) -> Result<(), AssignmentMismatch> {
        match self.assignments.get(&step) {
            Some(holder) if holder == endpoint => Ok(()),
            _ => Err(AssignmentMismatch { step }),
        }
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
