// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! The membership event loop.
//!
//! Events are processed one at a time in delivery order. A bootstrap
//! evaluation, including its probe backoff, holds up every event behind it.
//! Shutdown is only observed between events.

use std::sync::Arc;

use metrics::counter;
use quorum_consensus::{BootstrapCoordinator, BootstrapStateReader};
use quorum_core::{Member, ServerMetadata};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::directory::ServerDirectory;
use crate::events::{MemberEventKind, MembershipEvent};
use crate::local_events::LocalEventRouter;
use crate::reconcile::LeaderReconciler;

/// Called after each server join so pool flooders can re-sync.
pub trait FloodNotifier: Send + Sync {
    /// Signals that the server set changed.
    fn flood_notify(&self);
}

impl<F> FloodNotifier for F
where
    F: Fn() + Send + Sync,
{
    fn flood_notify(&self) {
        self()
    }
}

/// Routes gossip membership events to the directory, reconciliation,
/// local listeners and bootstrap.
pub struct MembershipDispatcher {
    directory: ServerDirectory,
    reconciler: LeaderReconciler,
    local_events: LocalEventRouter,
    bootstrap: Option<BootstrapCoordinator>,
    flood: Option<Arc<dyn FloodNotifier>>,
}

impl MembershipDispatcher {
    /// Creates a dispatcher writing to `directory`.
    pub fn new(directory: ServerDirectory, reconciler: LeaderReconciler) -> Self {
        Self {
            directory,
            reconciler,
            local_events: LocalEventRouter::new(),
            bootstrap: None,
            flood: None,
        }
    }

    /// Sets the router for internal user events.
    #[must_use]
    pub fn with_local_events(mut self, router: LocalEventRouter) -> Self {
        self.local_events = router;
        self
    }

    /// Enables automatic bootstrap on server joins.
    #[must_use]
    pub fn with_bootstrap(mut self, coordinator: BootstrapCoordinator) -> Self {
        self.bootstrap = Some(coordinator);
        self
    }

    /// Sets the join flood notifier.
    #[must_use]
    pub fn with_flood_notifier(mut self, notifier: Arc<dyn FloodNotifier>) -> Self {
        self.flood = Some(notifier);
        self
    }

    /// Returns the directory this dispatcher maintains.
    #[must_use]
    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }

    /// Returns a reader of the bootstrap state, if bootstrap is enabled.
    #[must_use]
    pub fn bootstrap_state(&self) -> Option<BootstrapStateReader> {
        self.bootstrap.as_ref().map(|b| b.state().subscribe())
    }

    /// Processes a single event to completion.
    pub async fn handle_event(&self, event: &MembershipEvent) {
        counter!("quorum_serf_events_total", "event" => event_label(event)).increment(1);

        match event {
            MembershipEvent::Join(members) => {
                self.node_join(members).await;
                self.reconciler.reconcile(MemberEventKind::Join, members);
            }
            MembershipEvent::Leave(members) => {
                self.node_failed(members);
                self.reconciler.reconcile(MemberEventKind::Leave, members);
            }
            MembershipEvent::Failed(members) => {
                self.node_failed(members);
                self.reconciler.reconcile(MemberEventKind::Failed, members);
            }
            MembershipEvent::Reap(members) => {
                self.node_failed(members);
                self.reconciler.reconcile(MemberEventKind::Reap, members);
            }
            MembershipEvent::Update(members) => {
                self.node_update(members);
                self.reconciler.reconcile(MemberEventKind::Update, members);
            }
            MembershipEvent::User(user) => {
                self.local_events.route(user);
            }
            MembershipEvent::Query(_) => {}
            MembershipEvent::Other(kind) => {
                warn!(event = %kind, "Unhandled LAN gossip event");
            }
        }
    }

    /// Processes events until `shutdown` fires or the event stream closes.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<MembershipEvent>,
        mut shutdown: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    debug!("Membership dispatcher stopping");
                    break;
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle_event(&event).await,
                        None => {
                            debug!("Membership event channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Runs the loop on a background task.
    pub fn spawn(self, events: mpsc::Receiver<MembershipEvent>) -> DispatcherHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move { self.run(events, stop_rx).await });
        DispatcherHandle { stop_tx, task }
    }

    /// Yields valid default-segment servers among `members`.
    fn servers<'a>(members: &'a [Member]) -> impl Iterator<Item = ServerMetadata> + 'a {
        members
            .iter()
            .filter_map(ServerMetadata::from_member)
            .filter(ServerMetadata::in_default_segment)
    }

    async fn node_join(&self, members: &[Member]) {
        for server in Self::servers(members) {
            info!(server = %server, "Adding LAN server");
            self.directory.add(server);

            if let Some(bootstrap) = &self.bootstrap {
                if bootstrap.state().is_armed() {
                    let outcome = bootstrap.maybe_bootstrap().await;
                    debug!(outcome = outcome.as_str(), "Bootstrap evaluated");
                }
            }

            if let Some(flood) = &self.flood {
                flood.flood_notify();
            }
        }
    }

    fn node_update(&self, members: &[Member]) {
        for server in Self::servers(members) {
            debug!(server = %server, "Updating LAN server");
            self.directory.add(server);
        }
    }

    fn node_failed(&self, members: &[Member]) {
        for server in Self::servers(members) {
            info!(server = %server, "Removing LAN server");
            self.directory.remove(&server);
        }
    }
}

impl std::fmt::Debug for MembershipDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipDispatcher")
            .field("servers", &self.directory.len())
            .field("bootstrap", &self.bootstrap)
            .field("local_events", &self.local_events)
            .finish_non_exhaustive()
    }
}

fn event_label(event: &MembershipEvent) -> &'static str {
    match event {
        MembershipEvent::Join(_) => MemberEventKind::Join.as_str(),
        MembershipEvent::Leave(_) => MemberEventKind::Leave.as_str(),
        MembershipEvent::Failed(_) => MemberEventKind::Failed.as_str(),
        MembershipEvent::Reap(_) => MemberEventKind::Reap.as_str(),
        MembershipEvent::Update(_) => MemberEventKind::Update.as_str(),
        MembershipEvent::User(_) => "user",
        MembershipEvent::Query(_) => "query",
        MembershipEvent::Other(_) => "other",
    }
}

/// Handle to a dispatcher running on a background task.
#[derive(Debug)]
pub struct DispatcherHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stops the loop after the current event and waits for it to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Membership dispatcher task failed");
        }
    }

    /// Returns true if the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
