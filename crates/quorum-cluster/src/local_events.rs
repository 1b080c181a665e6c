// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Routing of namespaced user events to local listeners.
//!
//! Only names under [`INTERNAL_EVENT_PREFIX`] are considered:
//!
//! | Name | Action |
//! |---|---|
//! | `consul:new-leader` | log, then [`ServerUpListener`] |
//! | `consul:event:<name>` | [`UserEventListener`] with `<name>` |
//! | other `consul:*` | [`ExtensionEventHandler`], warn if unhandled |
//!
//! Listeners run synchronously on the dispatcher task.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::events::UserEvent;

/// Namespace reserved for internal events.
pub const INTERNAL_EVENT_PREFIX: &str = "consul:";

/// Prefix of user-defined events.
pub const USER_EVENT_PREFIX: &str = "consul:event:";

/// Event broadcast when a new leader is elected.
pub const NEW_LEADER_EVENT: &str = "consul:new-leader";

/// Returns the wire name of the user event `name`.
#[must_use]
pub fn user_event_name(name: &str) -> String {
    format!("{USER_EVENT_PREFIX}{name}")
}

/// Returns true if `name` is a user-defined event.
#[must_use]
pub fn is_user_event(name: &str) -> bool {
    name.starts_with(USER_EVENT_PREFIX)
}

/// Strips the user event prefix, if present.
#[must_use]
pub fn raw_user_event_name(name: &str) -> Option<&str> {
    name.strip_prefix(USER_EVENT_PREFIX)
}

/// Notified when a new leader has been elected.
pub trait ServerUpListener: Send + Sync {
    /// Called once per leader election event.
    fn server_up(&self);
}

impl<F> ServerUpListener for F
where
    F: Fn() + Send + Sync,
{
    fn server_up(&self) {
        self()
    }
}

/// Receives user-defined events with the prefix stripped.
pub trait UserEventListener: Send + Sync {
    /// Called once per user event.
    fn user_event(&self, event: &UserEvent);
}

impl<F> UserEventListener for F
where
    F: Fn(&UserEvent) + Send + Sync,
{
    fn user_event(&self, event: &UserEvent) {
        self(event)
    }
}

/// Handles internal events this node does not know about.
pub trait ExtensionEventHandler: Send + Sync {
    /// Returns true if the event was handled.
    fn handle(&self, event: &UserEvent) -> bool;
}

/// Handler used when no extension is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExtensions;

impl ExtensionEventHandler for NoExtensions {
    fn handle(&self, _event: &UserEvent) -> bool {
        false
    }
}

/// What the router did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEventAction {
    /// Outside the internal namespace.
    Ignored,
    /// Leader election event.
    LeaderElected,
    /// Delivered (or deliverable) as a user event.
    UserEvent,
    /// Handled by the extension handler.
    Extension,
    /// No one handled the event.
    Unhandled,
}

/// Dispatches internal user events to the configured listeners.
#[derive(Clone)]
pub struct LocalEventRouter {
    server_up: Option<Arc<dyn ServerUpListener>>,
    user_events: Option<Arc<dyn UserEventListener>>,
    extensions: Arc<dyn ExtensionEventHandler>,
}

impl Default for LocalEventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEventRouter {
    /// Creates a router without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self { server_up: None, user_events: None, extensions: Arc::new(NoExtensions) }
    }

    /// Sets the leader election listener.
    #[must_use]
    pub fn with_server_up(mut self, listener: Arc<dyn ServerUpListener>) -> Self {
        self.server_up = Some(listener);
        self
    }

    /// Sets the user event listener.
    #[must_use]
    pub fn with_user_events(mut self, listener: Arc<dyn UserEventListener>) -> Self {
        self.user_events = Some(listener);
        self
    }

    /// Sets the handler for unknown internal events.
    #[must_use]
    pub fn with_extensions(mut self, handler: Arc<dyn ExtensionEventHandler>) -> Self {
        self.extensions = handler;
        self
    }

    /// Routes one event.
    pub fn route(&self, event: &UserEvent) -> LocalEventAction {
        if !event.name.starts_with(INTERNAL_EVENT_PREFIX) {
            return LocalEventAction::Ignored;
        }

        if event.name == NEW_LEADER_EVENT {
            info!(leader = %String::from_utf8_lossy(&event.payload), "New leader elected");
            if let Some(listener) = &self.server_up {
                listener.server_up();
            }
            return LocalEventAction::LeaderElected;
        }

        if let Some(name) = raw_user_event_name(&event.name) {
            let stripped = UserEvent { name: name.to_string(), ..event.clone() };
            debug!(event = %stripped.name, ltime = stripped.ltime, "Received user event");
            if let Some(listener) = &self.user_events {
                listener.user_event(&stripped);
            }
            return LocalEventAction::UserEvent;
        }

        if self.extensions.handle(event) {
            return LocalEventAction::Extension;
        }

        warn!(event = %event.name, "Unhandled local event");
        LocalEventAction::Unhandled
    }
}

impl std::fmt::Debug for LocalEventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEventRouter")
            .field("server_up", &self.server_up.is_some())
            .field("user_events", &self.user_events.is_some())
            .finish_non_exhaustive()
    }
}
