// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Leader-gated hand-off of membership changes to catalog reconciliation.
//!
//! Best effort: when the queue is full the member is dropped. The consumer
//! must run periodic full resynchronization to catch up on dropped items.

use std::sync::Arc;

use metrics::counter;
use quorum_core::{Member, MemberStatus};
use tokio::sync::mpsc;

use crate::events::MemberEventKind;

/// Reports whether the local node currently leads the Raft group.
pub trait LeadershipOracle: Send + Sync {
    /// Returns true if this node is the leader right now.
    fn is_leader(&self) -> bool;
}

impl<F> LeadershipOracle for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_leader(&self) -> bool {
        self()
    }
}

/// Creates a reconciler and the receiving end of its bounded queue.
///
/// A `capacity` of 0 is raised to 1.
pub fn reconcile_channel(
    oracle: Arc<dyn LeadershipOracle>,
    capacity: usize,
) -> (LeaderReconciler, mpsc::Receiver<Member>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LeaderReconciler { oracle, tx }, rx)
}

/// Queues members for reconciliation while this node is the leader.
#[derive(Clone)]
pub struct LeaderReconciler {
    oracle: Arc<dyn LeadershipOracle>,
    tx: mpsc::Sender<Member>,
}

impl LeaderReconciler {
    /// Queues `members` of one event. Returns how many were enqueued.
    ///
    /// Never blocks: a full or closed queue drops the member.
    pub fn reconcile(&self, kind: MemberEventKind, members: &[Member]) -> usize {
        if !self.oracle.is_leader() {
            return 0;
        }

        let mut queued = 0;
        for member in members {
            let mut member = member.clone();
            if kind == MemberEventKind::Reap {
                member.status = MemberStatus::Reap;
            }

            match self.tx.try_send(member) {
                Ok(()) => {
                    queued += 1;
                    counter!("quorum_reconcile_enqueued_total").increment(1);
                }
                Err(_) => {
                    counter!("quorum_reconcile_dropped_total").increment(1);
                }
            }
        }
        queued
    }
}

impl std::fmt::Debug for LeaderReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaderReconciler").field("capacity", &self.tx.max_capacity()).finish()
    }
}
