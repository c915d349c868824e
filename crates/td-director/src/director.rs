// SPDX-License-Identifier: MIT

use parking_lot::Mutex;
use serde_json::Value;
use td_core::EndpointId;
use td_wire::Message;

use crate::error::DirectorError;
use crate::outbound::Outbound;
use crate::registry::Registry;

/// Single in-process coordinator for every schema instance currently
/// building. Cheap to construct, intended to be wrapped in an `Arc`
/// and shared across every connection task.
#[derive(Debug, Default)]
pub struct Director {
    registry: Mutex<Registry>,
}

impl Director {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running_instance_count(&self) -> usize {
        self.registry.lock().running_instance_count()
    }

    /// Handle an INIT from `endpoint`, joining it to the matching
    /// instance (creating one if none exists) and dispatching a step
    /// to it immediately if one is available.
    pub fn on_init(
        &self,
        endpoint: EndpointId,
        schema_id: &str,
        total_steps: u32,
        cache_id: &str,
        complex_patchset: bool,
        repo_state: Value,
    ) -> Vec<Outbound> {
        let outcome = {
            let mut registry = self.registry.lock();
            registry.join(endpoint.clone(), schema_id, total_steps, cache_id, complex_patchset, repo_state)
        };

        match outcome {
            Ok(outcome) => {
                tracing::info!(%endpoint, key = ?outcome.key, "endpoint joined schema instance");
                dispatch_action(&outcome.schema_id, outcome.dispatched_step, endpoint).into_iter().collect()
            }
            Err(DirectorError::DuplicateInit(endpoint)) => {
                tracing::warn!(%endpoint, "duplicate INIT on an already-active connection, closing it");
                vec![Outbound::close(endpoint)]
            }
            Err(other) => fatal(endpoint, other),
        }
    }

    /// Handle a `STEP_COMPLETE` from `endpoint` for `schema_id`/`step`.
    /// `success = false` reopens the step for redispatch rather than
    /// marking it done.
    pub fn on_step_complete(&self, endpoint: &EndpointId, schema_id: &str, step: u32, success: bool) -> Vec<Outbound> {
        let step = step as usize;
        let mut registry = self.registry.lock();

        if success {
            match registry.complete_step(endpoint, schema_id, step) {
                Ok(outcome) if outcome.all_complete => {
                    tracing::info!(key = ?outcome.key, "schema instance complete");
                    outcome
                        .subscribers
                        .into_iter()
                        .map(|ep| Outbound::send(ep, Message::SchemaComplete { schema_id: outcome.schema_id.clone() }))
                        .collect()
                }
                Ok(outcome) => {
                    dispatch_action(&outcome.schema_id, outcome.redispatched_step, endpoint.clone()).into_iter().collect()
                }
                Err(err) => log_and_drop(endpoint, err),
            }
        } else {
            match registry.fail_step(endpoint, schema_id, step) {
                Ok(outcome) => {
                    dispatch_action(&outcome.schema_id, outcome.redispatched_step, endpoint.clone()).into_iter().collect()
                }
                Err(err) => log_and_drop(endpoint, err),
            }
        }
    }

    /// Handle the connection to `endpoint` going away: any step it
    /// held is freed and offered to the next idle peer.
    pub fn on_detach(&self, endpoint: &EndpointId) -> Vec<Outbound> {
        match self.registry.lock().detach(endpoint) {
            Ok(outcome) => dispatch_pair(&outcome.schema_id, outcome.redispatched_to).into_iter().collect(),
            Err(DirectorError::NotSubscribed(_)) => {
                // A connection that never sent a successful INIT, or one
                // already detached, closed. Nothing to unwind.
                Vec::new()
            }
            Err(err) => log_and_drop(endpoint, err),
        }
    }
}

fn dispatch_action(schema_id: &str, step: Option<usize>, endpoint: EndpointId) -> Option<Outbound> {
    step.map(|step| Outbound::send(endpoint, Message::BuildInstruction { schema_id: schema_id.to_string(), step: step as u32 }))
}

fn dispatch_pair(schema_id: &str, pair: Option<(EndpointId, usize)>) -> Option<Outbound> {
    pair.map(|(endpoint, step)| {
        Outbound::send(endpoint, Message::BuildInstruction { schema_id: schema_id.to_string(), step: step as u32 })
    })
}

/// Log a non-fatal registry error (stale completion, unknown
/// endpoint) and drop the triggering message.
fn log_and_drop(endpoint: &EndpointId, err: DirectorError) -> Vec<Outbound> {
    match err {
        DirectorError::StaleAssignment { endpoint, source } => {
            tracing::warn!(%endpoint, %source, "dropping stale message");
        }
        DirectorError::SchemaMismatch { endpoint, expected, actual } => {
            tracing::warn!(%endpoint, expected, actual, "dropping step_complete for mismatched schema");
        }
        DirectorError::NotSubscribed(endpoint) => {
            tracing::warn!(%endpoint, "message from endpoint with no active instance");
        }
        other => return fatal(endpoint.clone(), other),
    }
    Vec::new()
}

/// `DanglingIndex` means the endpoint index and the instance map
/// disagree with each other, which this module's own invariants
/// should make impossible. Surface it loudly in debug builds and fail
/// safe (close the connection) in release.
fn fatal(endpoint: EndpointId, err: DirectorError) -> Vec<Outbound> {
    tracing::error!(%endpoint, error = %err, "registry invariant violated");
    debug_assert!(false, "registry invariant violated: {err}");
    vec![Outbound::close(endpoint)]
}

#[cfg(test)]
#[path = "director_tests.rs"]
mod tests;
