// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

fn key() -> CacheKey {
    CacheKey::derive("build", 3, "cache", false, &json!({}))
}

fn instance(total_steps: u32) -> SchemaInstance {
    SchemaInstance::new(key(), "build", total_steps, false, json!({}))
}

fn ep(name: &str) -> EndpointId {
    EndpointId::from(name.to_string())
}

#[test]
fn dispatch_picks_highest_numbered_pending_step() {
    let mut inst = instance(3);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());

    let step = inst.dispatch_to(&alice).expect("a step should be available");
    assert_eq!(step, 2);
}

#[test]
fn dispatch_refuses_a_second_step_to_the_same_endpoint() {
    let mut inst = instance(2);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());

    assert!(inst.dispatch_to(&alice).is_some());
    assert!(inst.dispatch_to(&alice).is_none());
}

#[test]
fn dispatch_returns_none_once_all_steps_are_assigned() {
    let mut inst = instance(1);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());
    inst.dispatch_to(&alice);

    let bob = ep("bob");
    inst.add_subscriber(bob.clone());
    assert!(inst.dispatch_to(&bob).is_none());
}

#[test]
fn complete_step_rejects_wrong_holder() {
    let mut inst = instance(1);
    let alice = ep("alice");
    let bob = ep("bob");
    inst.add_subscriber(alice.clone());
    inst.add_subscriber(bob.clone());
    inst.dispatch_to(&alice);

    let err = inst.complete_step(&bob, 0).unwrap_err();
    assert_eq!(err.step, 0);
}

#[test]
fn complete_step_rejects_unassigned_step() {
    let mut inst = instance(1);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());

    assert!(inst.complete_step(&alice, 0).is_err());
}

#[test]
fn complete_last_step_reports_all_complete() {
    let mut inst = instance(1);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());
    inst.dispatch_to(&alice);

    let outcome = inst.complete_step(&alice, 0).unwrap();
    assert_eq!(outcome, CompletionOutcome::AllComplete);
    assert!(inst.is_all_complete());
}

#[test]
fn completing_one_of_several_steps_is_pending() {
    let mut inst = instance(2);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());
    inst.dispatch_to(&alice);

    let outcome = inst.complete_step(&alice, 1).unwrap();
    assert_eq!(outcome, CompletionOutcome::Pending);
    assert!(!inst.is_all_complete());
}

#[test]
fn fail_step_reopens_for_redispatch() {
    let mut inst = instance(1);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());
    inst.dispatch_to(&alice);

    inst.fail_step(&alice, 0).unwrap();
    assert_eq!(inst.step_state(0), Some(StepState::Pending));

    let redispatched = inst.dispatch_to(&alice);
    assert_eq!(redispatched, Some(0));
}

#[test]
fn removing_subscriber_frees_their_in_flight_step() {
    let mut inst = instance(1);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());
    inst.dispatch_to(&alice);

    let freed = inst.remove_subscriber(&alice);
    assert_eq!(freed, Some(0));
    assert_eq!(inst.step_state(0), Some(StepState::Pending));
}

#[test]
fn removing_an_idle_subscriber_frees_nothing() {
    let mut inst = instance(1);
    let alice = ep("alice");
    let bob = ep("bob");
    inst.add_subscriber(alice.clone());
    inst.add_subscriber(bob.clone());
    inst.dispatch_to(&alice);

    assert_eq!(inst.remove_subscriber(&bob), None);
}

#[test]
fn instance_is_abandoned_once_empty() {
    let mut inst = instance(1);
    let alice = ep("alice");
    inst.add_subscriber(alice.clone());
    assert!(!inst.is_abandoned());

    inst.remove_subscriber(&alice);
    assert!(inst.is_abandoned());
}

#[test]
fn idle_subscribers_excludes_assigned_endpoints_and_preserves_join_order() {
    let mut inst = instance(2);
    let alice = ep("alice");
    let bob = ep("bob");
    let carol = ep("carol");
    inst.add_subscriber(alice.clone());
    inst.add_subscriber(bob.clone());
    inst.add_subscriber(carol.clone());
    inst.dispatch_to(&bob);

    let idle: Vec<&EndpointId> = inst.idle_subscribers().collect();
    assert_eq!(idle, vec![&alice, &carol]);
}

#[test]
fn reassignment_prefers_the_earliest_joined_idle_subscriber() {
    let mut inst = instance(1);
    let alice = ep("alice");
    let bob = ep("bob");
    inst.add_subscriber(alice.clone());
    inst.dispatch_to(&alice);
    inst.add_subscriber(bob.clone());

    inst.remove_subscriber(&alice);

    let next = inst.idle_subscribers().next().cloned();
    assert_eq!(next, Some(bob.clone()));
    assert_eq!(inst.dispatch_to(&bob), Some(0));
}
