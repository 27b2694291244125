use serde::{Deserialize, Serialize};
use tracing::debug;

use super::listing::ListingId;
use super::notify::{Subscribers, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTrigger {
    Hover,
    Click,
}

/// The one listing highlighted across the grid and the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSelection {
    pub listing_id: ListingId,
    pub trigger: SelectionTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionChanged {
    pub previous: Option<ActiveSelection>,
    pub current: Option<ActiveSelection>,
}

/// Arbitrates hover and click signals from both views.
///
/// A click selection holds until another click or an explicit clear; hover only
/// takes effect while no click selection exists.
#[derive(Debug, Default)]
pub struct SelectionCoordinator {
    active: Option<ActiveSelection>,
    subscribers: Subscribers<SelectionChanged>,
}

impl SelectionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveSelection> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&ListingId> {
        self.active.as_ref().map(|selection| &selection.listing_id)
    }

    /// `hover(None)` ends a hover; neither form disturbs a click selection.
    pub fn hover(&mut self, listing_id: Option<ListingId>) -> bool {
        if matches!(
            self.active,
            Some(ActiveSelection {
                trigger: SelectionTrigger::Click,
                ..
            })
        ) {
            return false;
        }

        let next = listing_id.map(|listing_id| ActiveSelection {
            listing_id,
            trigger: SelectionTrigger::Hover,
        });
        self.transition(next)
    }

    /// Always wins; `click(None)` clears.
    pub fn click(&mut self, listing_id: Option<ListingId>) -> bool {
        let next = listing_id.map(|listing_id| ActiveSelection {
            listing_id,
            trigger: SelectionTrigger::Click,
        });
        self.transition(next)
    }

    pub fn clear(&mut self) -> bool {
        self.transition(None)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SelectionChanged) + Send + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn transition(&mut self, next: Option<ActiveSelection>) -> bool {
        if self.active == next {
            return false;
        }

        let previous = std::mem::replace(&mut self.active, next);
        debug!(
            previous = ?previous.as_ref().map(|s| s.listing_id.as_str()),
            current = ?self.active_id().map(ListingId::as_str),
            "selection changed"
        );

        let event = SelectionChanged {
            previous,
            current: self.active.clone(),
        };
        self.subscribers.emit(&event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn id(value: &str) -> Option<ListingId> {
        Some(ListingId::from(value))
    }

    #[test]
    fn click_then_hover_keeps_click() {
        let mut selection = SelectionCoordinator::new();
        selection.click(id("A"));
        assert!(!selection.hover(id("B")));
        assert_eq!(selection.active_id(), Some(&ListingId::from("A")));
        assert_eq!(
            selection.active().map(|s| s.trigger),
            Some(SelectionTrigger::Click)
        );
    }

    #[test]
    fn hover_then_click_takes_click() {
        let mut selection = SelectionCoordinator::new();
        selection.hover(id("B"));
        assert!(selection.click(id("A")));
        assert_eq!(selection.active_id(), Some(&ListingId::from("A")));
    }

    #[test]
    fn hover_is_transient() {
        let mut selection = SelectionCoordinator::new();
        selection.hover(id("B"));
        assert_eq!(
            selection.active().map(|s| s.trigger),
            Some(SelectionTrigger::Hover)
        );
        selection.hover(id("C"));
        assert_eq!(selection.active_id(), Some(&ListingId::from("C")));
        assert!(selection.hover(None));
        assert!(selection.active().is_none());
    }

    #[test]
    fn hover_end_does_not_drop_click() {
        let mut selection = SelectionCoordinator::new();
        selection.click(id("A"));
        assert!(!selection.hover(None));
        assert_eq!(selection.active_id(), Some(&ListingId::from("A")));
    }

    #[test]
    fn click_replaces_click_and_clear_drops_it() {
        let mut selection = SelectionCoordinator::new();
        selection.click(id("A"));
        selection.click(id("B"));
        assert_eq!(selection.active_id(), Some(&ListingId::from("B")));

        assert!(selection.clear());
        assert!(selection.active().is_none());
        assert!(!selection.clear());

        selection.hover(id("C"));
        assert_eq!(selection.active_id(), Some(&ListingId::from("C")));
    }

    #[test]
    fn click_on_hovered_listing_upgrades_trigger() {
        let mut selection = SelectionCoordinator::new();
        selection.hover(id("A"));
        assert!(selection.click(id("A")));
        assert_eq!(
            selection.active().map(|s| s.trigger),
            Some(SelectionTrigger::Click)
        );
    }

    #[test]
    fn emits_transitions_only() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut selection = SelectionCoordinator::new();
        let sink = events.clone();
        selection.subscribe(move |event: &SelectionChanged| {
            sink.lock().expect("events mutex").push(event.clone())
        });

        selection.hover(id("A"));
        selection.hover(id("A"));
        selection.click(id("B"));
        selection.hover(id("C"));

        let events = events.lock().expect("events mutex");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].previous.as_ref().map(|s| s.listing_id.as_str()), Some("A"));
        assert_eq!(events[1].current.as_ref().map(|s| s.trigger), Some(SelectionTrigger::Click));
    }
}
