use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::event::Event;

type Callback = RefCell<dyn FnMut(&Event)>;

/// Owning handle to a listener callable.
///
/// The dispatcher only ever stores weak references to the callable, so the
/// listener stays registered exactly as long as some `Listener` (or the
/// [`Subscription`] wrapping it) is alive.
#[derive(Clone)]
pub struct Listener(Rc<Callback>);

impl Listener {
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(&Event) + 'static,
    {
        let callback: Rc<Callback> = Rc::new(RefCell::new(f));
        Self(callback)
    }

    fn downgrade(&self) -> Weak<Callback> {
        Rc::downgrade(&self.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[derive(Default)]
struct Registry {
    channels: HashMap<String, Vec<Weak<Callback>>>,
}

impl Registry {
    fn remove(&mut self, channel: &str, target: &Weak<Callback>) -> usize {
        let Some(entries) = self.channels.get_mut(channel) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|entry| !Weak::ptr_eq(entry, target));
        before - entries.len()
    }
}

/// Channel-based publish/subscribe registry.
///
/// Cloning yields another handle to the same registry; the runtime and every
/// control component are handed a clone at construction.
///
/// Single-threaded: the registry lives behind `Rc<RefCell<..>>` and the type is
/// neither `Send` nor `Sync`.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    registry: Rc<RefCell<Registry>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a weak reference to `listener` on `channel`.
    ///
    /// Registering the same listener twice delivers every event to it twice.
    pub fn add_event_listener(&self, channel: &str, listener: &Listener) {
        self.registry
            .borrow_mut()
            .channels
            .entry(channel.to_owned())
            .or_default()
            .push(listener.downgrade());
        log::trace!("listener registered on '{channel}'");
    }

    /// Removes every registration of `listener` on `channel` (pointer identity).
    ///
    /// Unknown channels and listeners that are not registered are ignored.
    pub fn remove_event_listener(&self, channel: &str, listener: &Listener) {
        let removed = self
            .registry
            .borrow_mut()
            .remove(channel, &listener.downgrade());
        if removed > 0 {
            log::trace!("removed {removed} registration(s) from '{channel}'");
        }
    }

    /// Registers `f` on `channel` and returns the guard that owns it.
    ///
    /// Dropping the guard deregisters the listener immediately.
    pub fn subscribe<F>(&self, channel: &str, f: F) -> Subscription
    where
        F: FnMut(&Event) + 'static,
    {
        let listener = Listener::new(f);
        self.add_event_listener(channel, &listener);
        Subscription {
            channel: channel.to_owned(),
            listener,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to every live listener on `channel`, in registration order.
    ///
    /// Registrations whose owner has been dropped are removed on the way. The
    /// registry is not borrowed while listeners run, so a listener may register,
    /// remove or dispatch. Listeners added meanwhile are first called on the next
    /// dispatch; listeners removed or dropped meanwhile are not called again.
    pub fn dispatch(&self, channel: &str, event: Event) {
        let pending = {
            let mut registry = self.registry.borrow_mut();
            let Some(entries) = registry.channels.get_mut(channel) else {
                return;
            };
            if entries.is_empty() {
                return;
            }

            let before = entries.len();
            entries.retain(|entry| entry.strong_count() > 0);

            let pruned = before - entries.len();
            if pruned > 0 {
                log::trace!("pruned {pruned} dead listener(s) from '{channel}'");
            }
            entries.clone()
        };

        for entry in pending {
            let Some(callback) = entry.upgrade() else {
                continue;
            };
            if !self.is_registered(channel, &entry) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(&event),
                Err(_) => log::warn!("listener on '{channel}' is already running; skipped"),
            }
        }
    }

    fn is_registered(&self, channel: &str, target: &Weak<Callback>) -> bool {
        self.registry
            .borrow()
            .channels
            .get(channel)
            .is_some_and(|entries| entries.iter().any(|entry| Weak::ptr_eq(entry, target)))
    }

    /// Number of registrations stored for `channel`, dead ones included until
    /// the next dispatch prunes them.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.registry
            .borrow()
            .channels
            .get(channel)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let mut map = f.debug_map();
        for (channel, entries) in &registry.channels {
            map.entry(channel, &entries.len());
        }
        map.finish()
    }
}

/// Registration guard returned by [`EventDispatcher::subscribe`].
///
/// Holds the only strong reference to its listener.
#[must_use = "dropping a Subscription deregisters its listener"]
pub struct Subscription {
    channel: String,
    listener: Listener,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("listener", &self.listener)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        // A failed borrow leaves the dead entry for dispatch-time pruning.
        if let Ok(mut registry) = registry.try_borrow_mut() {
            registry.remove(&self.channel, &self.listener.downgrade());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MouseButton, MouseEvent, ResizeEvent};
    use glam::Vec2;

    const CH: &str = "mouse_event";

    fn ev() -> Event {
        MouseEvent::moved(Vec2::new(1.0, 1.0)).into()
    }

    fn recorder(log: &Rc<RefCell<Vec<u32>>>, tag: u32) -> Listener {
        let log = Rc::clone(log);
        Listener::new(move |_| log.borrow_mut().push(tag))
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn dispatch_follows_registration_order() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let listeners: Vec<Listener> = (1..=5).map(|i| recorder(&log, i)).collect();
        for l in &listeners {
            d.add_event_listener(CH, l);
        }

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn duplicate_registration_delivers_twice() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = recorder(&log, 7);
        d.add_event_listener(CH, &l);
        d.add_event_listener(CH, &l);

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![7, 7]);
    }

    #[test]
    fn listener_receives_event_payload() {
        let d = EventDispatcher::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let l = Listener::new(move |e| {
            *sink.borrow_mut() = e.as_mouse().map(|m| m.button);
        });
        d.add_event_listener(CH, &l);

        d.dispatch(CH, MouseEvent::pressed(MouseButton::Right, Vec2::ZERO).into());
        assert_eq!(*seen.borrow(), Some(MouseButton::Right));
    }

    // ── channels ──────────────────────────────────────────────────────────

    #[test]
    fn dispatch_on_unknown_channel_is_noop() {
        let d = EventDispatcher::new();
        d.dispatch("nobody_listens", ev());
        assert_eq!(d.listener_count("nobody_listens"), 0);
    }

    #[test]
    fn channels_are_isolated() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder(&log, 1);
        let b = recorder(&log, 2);
        d.add_event_listener("a", &a);
        d.add_event_listener("b", &b);

        d.dispatch("b", ResizeEvent { width: 1, height: 1 }.into());
        assert_eq!(*log.borrow(), vec![2]);
    }

    // ── weak pruning ──────────────────────────────────────────────────────

    #[test]
    fn dropped_listener_is_skipped_and_pruned() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder(&log, 1);
        let b = recorder(&log, 2);
        let c = recorder(&log, 3);
        d.add_event_listener(CH, &a);
        d.add_event_listener(CH, &b);
        d.add_event_listener(CH, &c);

        drop(b);
        assert_eq!(d.listener_count(CH), 3);

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1, 3]);
        assert_eq!(d.listener_count(CH), 2);

        let late = recorder(&log, 4);
        d.add_event_listener(CH, &late);
        log.borrow_mut().clear();
        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1, 3, 4]);
    }

    #[test]
    fn consecutive_dead_entries_are_all_pruned() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder(&log, 1);
        let b = recorder(&log, 2);
        let c = recorder(&log, 3);
        let e = recorder(&log, 5);
        for l in [&a, &b, &c, &e] {
            d.add_event_listener(CH, l);
        }

        drop(b);
        drop(c);
        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1, 5]);
        assert_eq!(d.listener_count(CH), 2);
    }

    // ── removal ───────────────────────────────────────────────────────────

    #[test]
    fn remove_drops_all_matching_entries() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder(&log, 1);
        let b = recorder(&log, 2);
        d.add_event_listener(CH, &a);
        d.add_event_listener(CH, &b);
        d.add_event_listener(CH, &a);

        d.remove_event_listener(CH, &a);
        assert_eq!(d.listener_count(CH), 1);

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn remove_is_idempotent() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder(&log, 1);
        let b = recorder(&log, 2);
        d.add_event_listener(CH, &a);
        d.add_event_listener(CH, &b);

        d.remove_event_listener(CH, &a);
        d.remove_event_listener(CH, &a);
        d.remove_event_listener("missing", &a);
        assert_eq!(d.listener_count(CH), 1);

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn remove_uses_identity_not_clone_equality() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder(&log, 1);
        let look_alike = recorder(&log, 1);
        d.add_event_listener(CH, &a);

        d.remove_event_listener(CH, &look_alike);
        assert_eq!(d.listener_count(CH), 1);

        d.remove_event_listener(CH, &a.clone());
        assert_eq!(d.listener_count(CH), 0);
    }

    // ── subscriptions ─────────────────────────────────────────────────────

    #[test]
    fn dropping_subscription_deregisters_immediately() {
        let d = EventDispatcher::new();
        let hits = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&hits);
        let sub = d.subscribe(CH, move |_| *sink.borrow_mut() += 1);
        assert_eq!(sub.channel(), CH);

        d.dispatch(CH, ev());
        drop(sub);
        assert_eq!(d.listener_count(CH), 0);

        d.dispatch(CH, ev());
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn subscription_outliving_dispatcher_drops_cleanly() {
        let d = EventDispatcher::new();
        let sub = d.subscribe(CH, |_| {});
        drop(d);
        drop(sub);
    }

    // ── re-entrancy ───────────────────────────────────────────────────────

    #[test]
    fn listener_added_during_dispatch_runs_next_time() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let late = recorder(&log, 2);

        let handle = d.clone();
        let late_ref = late.clone();
        let log_first = Rc::clone(&log);
        let first = Listener::new(move |_| {
            log_first.borrow_mut().push(1);
            handle.add_event_listener(CH, &late_ref);
        });
        d.add_event_listener(CH, &first);

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1]);

        d.remove_event_listener(CH, &first);
        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn subscription_dropped_during_dispatch_is_not_called() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let log_first = Rc::clone(&log);
        let victim = Rc::clone(&slot);
        let _first = d.subscribe(CH, move |_| {
            log_first.borrow_mut().push(1);
            drop(victim.borrow_mut().take());
        });
        let log_second = Rc::clone(&log);
        *slot.borrow_mut() = Some(d.subscribe(CH, move |_| log_second.borrow_mut().push(2)));

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(d.listener_count(CH), 1);
    }

    #[test]
    fn listener_removed_during_dispatch_is_not_called() {
        let d = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let second = recorder(&log, 2);

        let handle = d.clone();
        let second_ref = second.clone();
        let log_first = Rc::clone(&log);
        let first = Listener::new(move |_| {
            log_first.borrow_mut().push(1);
            handle.remove_event_listener(CH, &second_ref);
        });
        d.add_event_listener(CH, &first);
        d.add_event_listener(CH, &second);

        d.dispatch(CH, ev());
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn nested_dispatch_does_not_reenter_running_listener() {
        let d = EventDispatcher::new();
        let hits = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&hits);
        let handle = d.clone();
        let l = Listener::new(move |_| {
            *sink.borrow_mut() += 1;
            handle.dispatch(CH, ev());
        });
        d.add_event_listener(CH, &l);

        d.dispatch(CH, ev());
        assert_eq!(*hits.borrow(), 1);
    }
}
