// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn new_step_is_pending() {
    let step = Step::pending();
    assert!(step.is_pending());
    assert_eq!(step.state(), StepState::Pending);
}

#[test]
fn forward_lifecycle() {
    let mut step = Step::pending();
    step.assign();
    assert_eq!(step.state(), StepState::Assigned);
    step.complete();
    assert!(step.is_complete());
}

#[test]
fn reopen_returns_to_pending() {
    let mut step = Step::pending();
    step.assign();
    step.reopen();
    assert!(step.is_pending());
}
