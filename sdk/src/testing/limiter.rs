//! Concurrency admission for the in-memory scheduler.
//!
//! Runs (workflow-level groups) and task nodes (task-level groups) hold
//! tickets in every group that applies to them. An owner is admitted only
//! when all of its groups admit it.

use crate::testing::time_controller::to_chrono;
use chrono::{DateTime, Utc};
use kestrel_core::graph::lane_for;
use kestrel_core::{ConcurrencyGroup, ConcurrencyStrategy};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use uuid::Uuid;

/// What holds a concurrency slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Owner {
    Run(Uuid),
    Task(Uuid, String),
}

impl Owner {
    pub(crate) fn run_id(&self) -> Uuid {
        match self {
            Self::Run(id) | Self::Task(id, _) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupId {
    /// Workflow name, or `workflow/task` for task-level groups
    scope: String,
    /// Position of the group in its declaration list
    index: usize,
    key: String,
}

#[derive(Debug, Default)]
struct GroupState {
    submissions: u64,
    /// Admitted holders, oldest first
    active: Vec<(Owner, Option<u32>)>,
    admissions: VecDeque<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Ticket {
    group: GroupId,
    strategy: ConcurrencyStrategy,
    lane: Option<u32>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Admission {
    /// Admitted; the listed owners must be cancelled to make room
    Admitted { evict: Vec<Owner> },
    /// Not admitted; retry at `retry_at` if a rate window is the obstacle
    Blocked { retry_at: Option<DateTime<Utc>> },
}

#[derive(Debug, Default)]
pub(crate) struct ConcurrencyLimiter {
    groups: HashMap<GroupId, GroupState>,
    tickets: HashMap<Owner, Vec<Ticket>>,
}

impl ConcurrencyLimiter {
    /// Record a submission. Round-robin lanes are assigned here, in
    /// submission order per key.
    pub(crate) fn enqueue(
        &mut self,
        owner: Owner,
        scope: &str,
        groups: &[ConcurrencyGroup],
        input: &Value,
    ) {
        if groups.is_empty() {
            return;
        }
        let tickets = groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let id = GroupId {
                    scope: scope.to_string(),
                    index,
                    key: group.key.derive(input),
                };
                let state = self.groups.entry(id.clone()).or_default();
                let sequence = state.submissions;
                state.submissions += 1;
                let lane = match group.strategy {
                    ConcurrencyStrategy::RoundRobin { buckets } => {
                        Some(lane_for(sequence, buckets))
                    }
                    _ => None,
                };
                Ticket {
                    group: id,
                    strategy: group.strategy.clone(),
                    lane,
                }
            })
            .collect();
        self.tickets.insert(owner, tickets);
    }

    pub(crate) fn try_admit(&mut self, owner: &Owner, now: DateTime<Utc>) -> Admission {
        let Some(tickets) = self.tickets.get(owner) else {
            return Admission::Admitted { evict: Vec::new() };
        };

        let mut evict = Vec::new();
        let mut retry_at: Option<DateTime<Utc>> = None;
        let mut blocked = false;

        for ticket in tickets {
            let state = self.groups.entry(ticket.group.clone()).or_default();
            match ticket.strategy {
                ConcurrencyStrategy::RoundRobin { .. } => {
                    if state.active.iter().any(|(_, lane)| *lane == ticket.lane) {
                        blocked = true;
                    }
                }
                ConcurrencyStrategy::RateLimit {
                    max,
                    window_ms: None,
                } => {
                    if state.active.len() >= max as usize {
                        blocked = true;
                    }
                }
                ConcurrencyStrategy::RateLimit {
                    max,
                    window_ms: Some(window_ms),
                } => {
                    let window = to_chrono(Duration::from_millis(window_ms));
                    while state
                        .admissions
                        .front()
                        .is_some_and(|admitted| *admitted + window <= now)
                    {
                        state.admissions.pop_front();
                    }
                    if state.admissions.len() >= max as usize {
                        blocked = true;
                        if let Some(oldest) = state.admissions.front() {
                            let at = *oldest + window;
                            retry_at = Some(retry_at.map_or(at, |r| r.min(at)));
                        }
                    }
                }
                ConcurrencyStrategy::CancelInProgress { max_runs } => {
                    if state.active.len() >= max_runs as usize {
                        if let Some((oldest, _)) = state.active.first() {
                            evict.push(oldest.clone());
                        }
                    }
                }
                ConcurrencyStrategy::CancelNewest { max_runs } => {
                    if state.active.len() >= max_runs as usize {
                        if let Some((newest, _)) = state.active.last() {
                            evict.push(newest.clone());
                        }
                    }
                }
            }
        }

        if blocked {
            return Admission::Blocked { retry_at };
        }

        for ticket in tickets {
            let state = self.groups.entry(ticket.group.clone()).or_default();
            state.active.push((owner.clone(), ticket.lane));
            state.admissions.push_back(now);
        }
        evict.dedup();
        Admission::Admitted { evict }
    }

    /// Drop every slot and pending ticket held by `owner`.
    pub(crate) fn release(&mut self, owner: &Owner) {
        if let Some(tickets) = self.tickets.remove(owner) {
            for ticket in tickets {
                if let Some(state) = self.groups.get_mut(&ticket.group) {
                    state.active.retain(|(holder, _)| holder != owner);
                }
            }
        }
    }

    /// Drop everything held by a run and its task nodes.
    pub(crate) fn release_run(&mut self, run_id: Uuid) {
        let owners: Vec<Owner> = self
            .tickets
            .keys()
            .filter(|owner| owner.run_id() == run_id)
            .cloned()
            .collect();
        for owner in owners {
            self.release(&owner);
        }
    }

    /// Round-robin lane assigned to `owner` by its first round-robin group.
    pub(crate) fn lane_of(&self, owner: &Owner) -> Option<u32> {
        self.tickets
            .get(owner)
            .and_then(|tickets| tickets.iter().find_map(|t| t.lane))
    }
}
