// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use serde_json::Value;
use td_core::{CacheKey, EndpointId, SchemaInstance};

use crate::error::DirectorError;

/// Outcome of joining an endpoint to an instance: whether a step was
/// immediately available to hand it.
pub struct JoinOutcome {
    pub key: CacheKey,
    pub schema_id: String,
    pub dispatched_step: Option<usize>,
}

/// Outcome of a completion: the step's instance key, whether every
/// step is now done, and either the full subscriber list to notify
/// (terminal) or the step the completing endpoint was immediately
/// redispatched to (non-terminal).
pub struct CompletionOutcome {
    pub key: CacheKey,
    pub schema_id: String,
    pub all_complete: bool,
    pub subscribers: Vec<EndpointId>,
    pub redispatched_step: Option<usize>,
}

/// Outcome of reopening a failed step: the step the failing endpoint
/// was immediately redispatched to, if one was available.
pub struct FailureOutcome {
    pub key: CacheKey,
    pub schema_id: String,
    pub redispatched_step: Option<usize>,
}

/// Outcome of an endpoint leaving: the step it was holding (if any)
/// and who it was redispatched to, plus whether the instance is now
/// abandoned and should be dropped.
pub struct DetachOutcome {
    pub key: CacheKey,
    pub schema_id: String,
    pub redispatched_to: Option<(EndpointId, usize)>,
    pub abandoned: bool,
}

/// All schema instances currently in flight, keyed by their matching
/// tuple, plus a reverse index from endpoint to the instance it has
/// joined. An endpoint is a member of at most one instance at a time.
#[derive(Debug, Default)]
pub struct Registry {
    instances: HashMap<CacheKey, SchemaInstance>,
    endpoint_index: HashMap<EndpointId, CacheKey>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of schema instances currently in flight.
    pub fn running_instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn join(
        &mut self,
        endpoint: EndpointId,
        schema_id: &str,
        total_steps: u32,
        cache_id: &str,
        complex_patchset: bool,
        repo_state: Value,
    ) -> Result<JoinOutcome, DirectorError> {
        if self.endpoint_index.contains_key(&endpoint) {
            return Err(DirectorError::DuplicateInit(endpoint));
        }

        let key = CacheKey::derive(schema_id, total_steps, cache_id, complex_patchset, &repo_state);
        let instance = self.instances.entry(key.clone()).or_insert_with(|| {
            SchemaInstance::new(key.clone(), schema_id, total_steps, complex_patchset, repo_state)
        });
        instance.add_subscriber(endpoint.clone());
        let dispatched_step = instance.dispatch_to(&endpoint);
        let schema_id = instance.schema_id().to_string();
        self.endpoint_index.insert(endpoint, key.clone());

        Ok(JoinOutcome { key, schema_id, dispatched_step })
    }

    /// Resolve a `STEP_COMPLETE` for `schema_id`/`step` from `endpoint`.
    /// A `schema_id` that doesn't match the endpoint's own instance is
    /// treated the same as a stale assignment: logged and dropped by
    /// the caller, never applied.
    ///
    /// A non-terminal completion immediately offers the completing
    /// endpoint another pending step (spec §4.3 STEP_COMPLETE step 5:
    /// "invoke dispatch-to-endpoint for E").
    pub fn complete_step(
        &mut self,
        endpoint: &EndpointId,
        schema_id: &str,
        step: usize,
    ) -> Result<CompletionOutcome, DirectorError> {
        let key = self.key_for(endpoint)?;
        let instance = self.instance_mut(endpoint, &key)?;
        Self::check_schema(endpoint, instance, schema_id)?;

        let outcome = instance
            .complete_step(endpoint, step)
            .map_err(|source| DirectorError::StaleAssignment { endpoint: endpoint.clone(), source })?;

        let all_complete = outcome == td_core::CompletionOutcome::AllComplete;
        let (subscribers, redispatched_step) = if all_complete {
            let subscribers: Vec<EndpointId> = instance.subscribers().cloned().collect();
            self.drop_instance(&key);
            (subscribers, None)
        } else {
            (Vec::new(), instance.dispatch_to(endpoint))
        };

        Ok(CompletionOutcome { key, schema_id: schema_id.to_string(), all_complete, subscribers, redispatched_step })
    }

    /// Reopen a failed step and offer it straight back to the endpoint
    /// that failed it (spec §4.3 STEP_COMPLETE step 4: "invoke
    /// dispatch-to-endpoint for E"), not to some other idle subscriber.
    pub fn fail_step(
        &mut self,
        endpoint: &EndpointId,
        schema_id: &str,
        step: usize,
    ) -> Result<FailureOutcome, DirectorError> {
        let key = self.key_for(endpoint)?;
        let instance = self.instance_mut(endpoint, &key)?;
        Self::check_schema(endpoint, instance, schema_id)?;

        instance
            .fail_step(endpoint, step)
            .map_err(|source| DirectorError::StaleAssignment { endpoint: endpoint.clone(), source })?;

        let redispatched_step = instance.dispatch_to(endpoint);
        Ok(FailureOutcome { key, schema_id: schema_id.to_string(), redispatched_step })
    }

    /// Remove `endpoint` from whatever instance it belongs to. If it
    /// held a step, the step reopens and is offered to the next idle
    /// subscriber in join order.
    pub fn detach(&mut self, endpoint: &EndpointId) -> Result<DetachOutcome, DirectorError> {
        let key = self.key_for(endpoint)?;
        self.endpoint_index.remove(endpoint);
        let instance = self.instance_mut(endpoint, &key)?;

        instance.remove_subscriber(endpoint);
        let schema_id = instance.schema_id().to_string();
        let redispatched_to = Self::redispatch_to_next_idle(instance);
        let abandoned = instance.is_abandoned();
        if abandoned {
            self.drop_instance(&key);
        }

        Ok(DetachOutcome { key, schema_id, redispatched_to, abandoned })
    }

    fn check_schema(
        endpoint: &EndpointId,
        instance: &SchemaInstance,
        schema_id: &str,
    ) -> Result<(), DirectorError> {
        if instance.schema_id() == schema_id {
            Ok(())
        } else {
            Err(DirectorError::SchemaMismatch {
                endpoint: endpoint.clone(),
                expected: instance.schema_id().to_string(),
                actual: schema_id.to_string(),
            })
        }
    }

    /// Used only by `detach`: the departing endpoint is no longer a
    /// subscriber, so the step it held is offered to whichever
    /// remaining subscriber has been idle longest (spec §4.3 DETACHED
    /// step 4, tie-broken by join order per §4.5).
    fn redispatch_to_next_idle(instance: &mut SchemaInstance) -> Option<(EndpointId, usize)> {
        let candidate = instance.idle_subscribers().next().cloned()?;
        instance.dispatch_to(&candidate).map(|step| (candidate, step))
    }

    fn key_for(&self, endpoint: &EndpointId) -> Result<CacheKey, DirectorError> {
        self.endpoint_index.get(endpoint).cloned().ok_or_else(|| DirectorError::NotSubscribed(endpoint.clone()))
    }

    fn instance_mut(
        &mut self,
        endpoint: &EndpointId,
        key: &CacheKey,
    ) -> Result<&mut SchemaInstance, DirectorError> {
        self.instances
            .get_mut(key)
            .ok_or_else(|| DirectorError::DanglingIndex { endpoint: endpoint.clone(), key: key.clone() })
    }

    fn drop_instance(&mut self, key: &CacheKey) {
        self.instances.remove(key);
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
