// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Quorum Cluster - gossip membership event handling for servers.
//!
//! The [`MembershipDispatcher`] consumes the LAN gossip event stream and keeps
//! the rest of the server in step with it:
//!
//! ```text
//!   gossip events ──► MembershipDispatcher ──┬──► ServerDirectory (join/update/leave/fail/reap)
//!                                            ├──► LeaderReconciler (member events, leader only)
//!                                            ├──► LocalEventRouter (user events)
//!                                            └──► BootstrapCoordinator (join, while armed)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use quorum_cluster::{reconcile_channel, MembershipDispatcher, ServerDirectory};
//!
//! let (reconciler, reconcile_rx) = reconcile_channel(raft.clone(), config.reconcile.queue_size);
//! let dispatcher = MembershipDispatcher::new(ServerDirectory::new(), reconciler)
//!     .with_bootstrap(coordinator);
//! let handle = dispatcher.spawn(gossip_events);
//! // ...
//! handle.stop().await;
//! ```

#![warn(missing_docs)]

pub mod directory;
pub mod dispatcher;
pub mod events;
pub mod local_events;
pub mod reconcile;

pub use directory::{DirectoryError, ServerDirectory};
pub use dispatcher::{DispatcherHandle, FloodNotifier, MembershipDispatcher};
pub use events::{MemberEventKind, MembershipEvent, QueryEvent, UserEvent};
pub use local_events::{
    is_user_event, raw_user_event_name, user_event_name, ExtensionEventHandler, LocalEventAction,
    LocalEventRouter, NoExtensions, ServerUpListener, UserEventListener, INTERNAL_EVENT_PREFIX,
    NEW_LEADER_EVENT, USER_EVENT_PREFIX,
};
pub use reconcile::{reconcile_channel, LeaderReconciler, LeadershipOracle};
