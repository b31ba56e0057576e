//! Reference condition evaluator.
//!
//! Evaluation belongs to the scheduler; this is the rule set it applies, kept
//! here so every scheduler implementation (and the in-memory test scheduler)
//! shares it.
//!
//! A node is evaluated once all of its parents are terminal:
//!
//! 1. The parent rule decides whether skipped or failed parents skip the node.
//! 2. A fired `skip-on-event` skips the node, whatever else is attached.
//! 3. The remaining conditions each resolve to met, unmet or pending, and are
//!    combined by the node's [`MatchMode`].

use super::condition::{Condition, MatchMode};
use super::model::{ParentRule, TaskNode};
use crate::run::TaskOutcome;
use std::collections::{HashMap, HashSet};

/// Source of observed events.
pub trait EventView {
    fn has_event(&self, event_key: &str) -> bool;
}

impl EventView for HashSet<String> {
    fn has_event(&self, event_key: &str) -> bool {
        self.contains(event_key)
    }
}

/// What to do with a node right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Some parent is not terminal yet.
    Blocked,
    /// Dispatch the node.
    Run,
    /// Record the node as skipped.
    Skip { reason: String },
    /// Re-evaluate when an event arrives or after `remaining_ms`; `None` waits indefinitely.
    Wait { remaining_ms: Option<u64> },
}

enum Verdict {
    Met,
    Unmet(String),
    Pending(Option<u64>),
}

/// Stateless evaluator over a node, its parents' outcomes and the event log.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Decide the fate of `node`.
    ///
    /// `parents` holds the terminal outcomes recorded so far in the run;
    /// `waited_ms` is how long the node has been evaluable (all parents
    /// terminal), which drives `wait-for-event` timeouts.
    pub fn evaluate(
        node: &TaskNode,
        parents: &HashMap<String, TaskOutcome>,
        events: &dyn EventView,
        waited_ms: u64,
    ) -> Decision {
        if node.parents.iter().any(|p| !parents.contains_key(p)) {
            return Decision::Blocked;
        }

        if let Some(reason) = Self::check_parent_rule(node, parents) {
            return Decision::Skip { reason };
        }

        let conditions = &node.conditions.conditions;
        for condition in conditions {
            if let Condition::SkipOnEvent { event_key } = condition {
                if events.has_event(event_key) {
                    return Decision::Skip {
                        reason: format!("event '{}' received", event_key),
                    };
                }
            }
        }

        let verdicts: Vec<Verdict> = conditions
            .iter()
            .filter(|c| !matches!(c, Condition::SkipOnEvent { .. }))
            .map(|c| Self::verdict(c, parents, events, waited_ms))
            .collect();

        if verdicts.is_empty() {
            return Decision::Run;
        }

        match node.conditions.mode {
            MatchMode::All => {
                if let Some(reason) = verdicts.iter().find_map(|v| match v {
                    Verdict::Unmet(reason) => Some(reason.clone()),
                    _ => None,
                }) {
                    return Decision::Skip { reason };
                }
                match Self::earliest_pending(&verdicts) {
                    Some(remaining_ms) => Decision::Wait { remaining_ms },
                    None => Decision::Run,
                }
            }
            MatchMode::Any => {
                if verdicts.iter().any(|v| matches!(v, Verdict::Met)) {
                    return Decision::Run;
                }
                match Self::earliest_pending(&verdicts) {
                    Some(remaining_ms) => Decision::Wait { remaining_ms },
                    None => {
                        let reasons: Vec<String> = verdicts
                            .into_iter()
                            .filter_map(|v| match v {
                                Verdict::Unmet(reason) => Some(reason),
                                _ => None,
                            })
                            .collect();
                        Decision::Skip {
                            reason: reasons.join("; "),
                        }
                    }
                }
            }
        }
    }

    fn check_parent_rule(
        node: &TaskNode,
        parents: &HashMap<String, TaskOutcome>,
    ) -> Option<String> {
        if node.parents.is_empty() {
            return None;
        }
        let succeeded = |p: &String| parents.get(p).is_some_and(TaskOutcome::is_succeeded);
        match node.parent_rule {
            ParentRule::AllSucceeded => node
                .parents
                .iter()
                .find(|&p| !succeeded(p))
                .map(|p| format!("parent '{}' did not succeed", p)),
            ParentRule::AnySucceeded => {
                if node.parents.iter().any(succeeded) {
                    None
                } else {
                    Some("no parent succeeded".to_string())
                }
            }
        }
    }

    fn verdict(
        condition: &Condition,
        parents: &HashMap<String, TaskOutcome>,
        events: &dyn EventView,
        waited_ms: u64,
    ) -> Verdict {
        match condition {
            Condition::RunOnEvent { event_key } => {
                if events.has_event(event_key) {
                    Verdict::Met
                } else {
                    Verdict::Unmet(format!("event '{}' not received", event_key))
                }
            }
            Condition::WaitForEvent {
                event_key,
                timeout_ms,
            } => {
                if events.has_event(event_key) {
                    Verdict::Met
                } else {
                    match timeout_ms {
                        Some(timeout) if waited_ms >= *timeout => Verdict::Unmet(format!(
                            "timed out after {}ms waiting for event '{}'",
                            timeout, event_key
                        )),
                        Some(timeout) => Verdict::Pending(Some(timeout - waited_ms)),
                        None => Verdict::Pending(None),
                    }
                }
            }
            Condition::Expression(predicate) => {
                let output = parents.get(&predicate.task).and_then(TaskOutcome::output);
                if predicate.evaluate(output) {
                    Verdict::Met
                } else {
                    Verdict::Unmet(format!(
                        "expression on '{}{}' is false",
                        predicate.task, predicate.pointer
                    ))
                }
            }
            // Handled before combination.
            Condition::SkipOnEvent { .. } => Verdict::Met,
        }
    }

    /// `Some(None)` if something waits indefinitely and nothing has a deadline.
    fn earliest_pending(verdicts: &[Verdict]) -> Option<Option<u64>> {
        let mut pending = false;
        let mut earliest: Option<u64> = None;
        for verdict in verdicts {
            if let Verdict::Pending(remaining) = verdict {
                pending = true;
                if let Some(ms) = remaining {
                    earliest = Some(earliest.map_or(*ms, |e| e.min(*ms)));
                }
            }
        }
        pending.then_some(earliest)
    }
}
