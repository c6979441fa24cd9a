//! Cooperative timer engine driven by the host's frame tick.
//!
//! The engine keeps its own clock.  The host calls [`TimerEngine::update`] once
//! per frame with the frame's delta time; the engine advances its clock and
//! fires, in ascending fire-time order, every timer that has come due.
//! Nothing here blocks or spawns threads.
//!
//! # Storage
//!
//! Timers live in a [`TimerArena`] and are referred to by [`TimerHandle`]s
//! (slot index + generation).  The live schedule is a deque of slot keys kept
//! sorted by absolute fire time; a new timer is inserted *after* every timer
//! with an equal fire time, so equal deadlines fire in scheduling order.
//!
//! # Mutation during update (for beginners)
//!
//! Callbacks receive `&mut TimerEngine` and are free to schedule or cancel
//! timers, including the one currently firing.  While a pass is running:
//!
//! - `schedule` stages the new timer in a *pending-add* list.  Staged timers
//!   are merged into the schedule after the pass, so a zero-delay timer
//!   created inside a callback fires on the next update, never the current one.
//! - `cancel` only marks the timer and records it in a *pending-free* list.
//!   The pass skips marked timers and the list is drained after the pass.
//!
//! The pass itself pops each due timer off the front of the schedule before
//! invoking it, so the traversal never holds a position that a callback could
//! invalidate.
//!
//! # Failure isolation
//!
//! A callback that returns `Err` or panics is logged at `warn` level and its
//! timer is cancelled (a failing repeating timer stops repeating).  Remaining
//! due timers in the same pass still fire.

pub mod arena;

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::guard::run_guarded;
pub use arena::{SlotKey, TimerArena};

/// Errors raised synchronously by scheduling calls.
#[derive(Debug, Error, PartialEq)]
pub enum TimerError {
    /// The delay was negative, NaN or infinite.
    #[error("invalid timer delay {delay}: must be a finite value >= 0")]
    InvalidArgument { delay: f64 },
}

/// Error a callback returns to report failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl From<&str> for CallbackError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallbackError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<TimerError> for CallbackError {
    fn from(e: TimerError) -> Self {
        Self(e.to_string())
    }
}

type CallbackFn = dyn Fn(&mut TimerEngine) -> Result<(), CallbackError>;

/// A shareable timer callback.
///
/// Cloning a `TimerCallback` shares the same underlying closure, and clones
/// compare equal under [`TimerCallback::same_as`].  Two callbacks built from
/// separate closures are always distinct, even if the closures are identical
/// source text.  This identity is what [`TimerEngine::schedule_once`] and
/// [`TimerEngine::cancel_callback`] match on.
#[derive(Clone)]
pub struct TimerCallback(Rc<CallbackFn>);

impl TimerCallback {
    /// Wraps a callback that may touch the engine and may fail.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut TimerEngine) -> Result<(), CallbackError> + 'static,
    {
        Self(Rc::new(f))
    }

    /// Wraps a plain zero-argument action.
    pub fn action<F>(f: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::new(move |_| {
            f();
            Ok(())
        })
    }

    /// Returns `true` if both values share the same closure allocation.
    pub fn same_as(&self, other: &TimerCallback) -> bool {
        // Compare data pointers only; vtable pointers are not unique per type.
        std::ptr::eq(
            Rc::as_ptr(&self.0) as *const u8,
            Rc::as_ptr(&other.0) as *const u8,
        )
    }
}

impl fmt::Debug for TimerCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerCallback({:p})", Rc::as_ptr(&self.0) as *const u8)
    }
}

/// Handle returned by the scheduling calls; used for cancellation.
///
/// A handle goes stale once its timer has fired (one-shot) or been cancelled;
/// stale handles are ignored by every engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(SlotKey);

impl TimerHandle {
    /// Arena slot this handle points at.
    pub fn slot(&self) -> SlotKey {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    /// In the sorted schedule.
    Live,
    /// Scheduled during a pass; merged into the schedule after it.
    PendingAdd,
    /// Popped off the schedule and currently executing.
    Firing,
}

struct Timer {
    callback: TimerCallback,
    fire_time: f64,
    period: Option<f64>,
    name: Option<String>,
    cancelled: bool,
    state: TimerState,
}

/// Frame-driven timer scheduler.
pub struct TimerEngine {
    arena: TimerArena<Timer>,
    schedule: VecDeque<SlotKey>,
    pending_add: Vec<SlotKey>,
    pending_free: Vec<SlotKey>,
    current_time: f64,
    updating: bool,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEngine {
    pub fn new() -> Self {
        Self {
            arena: TimerArena::new(),
            schedule: VecDeque::new(),
            pending_add: Vec::new(),
            pending_free: Vec::new(),
            current_time: 0.0,
            updating: false,
        }
    }

    /// Seconds accumulated by all `update` calls so far.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Schedules a one-shot timer firing `delay` seconds from now.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidArgument`] if `delay` is negative or not finite.
    pub fn schedule(
        &mut self,
        callback: TimerCallback,
        delay: f64,
    ) -> Result<TimerHandle, TimerError> {
        self.insert_timer(callback, delay, false, None)
    }

    /// Schedules a timer that fires every `period` seconds until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidArgument`] if `period` is negative or not finite.
    pub fn schedule_repeating(
        &mut self,
        callback: TimerCallback,
        period: f64,
    ) -> Result<TimerHandle, TimerError> {
        self.insert_timer(callback, period, true, None)
    }

    /// Full form of [`schedule`](Self::schedule) with a diagnostic name.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidArgument`] if `delay` is negative or not finite.
    pub fn schedule_named(
        &mut self,
        callback: TimerCallback,
        delay: f64,
        repeating: bool,
        name: impl Into<String>,
    ) -> Result<TimerHandle, TimerError> {
        self.insert_timer(callback, delay, repeating, Some(name.into()))
    }

    /// Schedules `callback` unless a timer with the same callback is already
    /// pending, in which case the existing handle is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidArgument`] if `delay` is negative or not finite.
    pub fn schedule_once(
        &mut self,
        callback: TimerCallback,
        delay: f64,
    ) -> Result<TimerHandle, TimerError> {
        validate_delay(delay)?;
        if let Some(existing) = self.find_pending(&callback) {
            trace!("schedule_once: callback already pending in slot {}", existing.index());
            return Ok(TimerHandle(existing));
        }
        self.insert_timer(callback, delay, false, None)
    }

    /// Cancels the timer behind `handle`.
    ///
    /// Returns `false` when the handle is stale or the timer was already
    /// cancelled.  Safe to call from inside a callback.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.cancel_key(handle.0)
    }

    /// Cancels every pending timer whose callback is `callback`.
    ///
    /// Returns the number of timers cancelled.
    pub fn cancel_callback(&mut self, callback: &TimerCallback) -> usize {
        let keys: Vec<SlotKey> = self
            .arena
            .iter()
            .filter(|(_, t)| !t.cancelled && t.callback.same_as(callback))
            .map(|(k, _)| k)
            .collect();
        keys.into_iter().filter(|k| self.cancel_key(*k)).count()
    }

    /// Cancels every pending timer carrying `name`.
    pub fn cancel_by_name(&mut self, name: &str) -> usize {
        let keys: Vec<SlotKey> = self
            .arena
            .iter()
            .filter(|(_, t)| !t.cancelled && t.name.as_deref() == Some(name))
            .map(|(k, _)| k)
            .collect();
        keys.into_iter().filter(|k| self.cancel_key(*k)).count()
    }

    /// Cancels every timer.
    pub fn cancel_all(&mut self) {
        let keys: Vec<SlotKey> = self.arena.iter().map(|(k, _)| k).collect();
        for key in keys {
            self.cancel_key(key);
        }
    }

    /// Number of timers waiting to fire (scheduled or staged, not cancelled).
    pub fn count(&self) -> usize {
        self.schedule
            .iter()
            .chain(self.pending_add.iter())
            .filter(|k| self.arena.get(**k).is_some_and(|t| !t.cancelled))
            .count()
    }

    /// Number of cancellations waiting for the current pass to finish.
    pub fn pending_free_count(&self) -> usize {
        self.pending_free.len()
    }

    /// Total timer slots ever allocated; stays flat while timers are recycled.
    pub fn allocated_slots(&self) -> usize {
        self.arena.capacity()
    }

    /// Returns `true` if `handle` still refers to a timer that will fire.
    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.arena
            .get(handle.0)
            .is_some_and(|t| !t.cancelled && t.state != TimerState::Firing)
    }

    /// Returns `true` if a timer using `callback` is waiting to fire.
    pub fn is_pending(&self, callback: &TimerCallback) -> bool {
        self.find_pending(callback).is_some()
    }

    /// Absolute fire time of a pending timer.
    pub fn fire_time(&self, handle: TimerHandle) -> Option<f64> {
        self.arena.get(handle.0).map(|t| t.fire_time)
    }

    /// Diagnostic name of a timer, if it was scheduled with one.
    pub fn name(&self, handle: TimerHandle) -> Option<&str> {
        self.arena.get(handle.0).and_then(|t| t.name.as_deref())
    }

    /// Advances the clock by `delta` seconds and fires every due timer.
    ///
    /// Negative or non-finite deltas are treated as zero.  Returns the number
    /// of callbacks invoked.
    pub fn update(&mut self, delta: f64) -> usize {
        if delta.is_finite() && delta > 0.0 {
            self.current_time += delta;
        } else if delta != 0.0 {
            debug!("ignoring invalid timer delta {delta}");
        }

        self.updating = true;
        let mut fired = 0;

        while let Some(&key) = self.schedule.front() {
            let (fire_time, cancelled) = match self.arena.get(key) {
                Some(t) => (t.fire_time, t.cancelled),
                None => {
                    self.schedule.pop_front();
                    continue;
                }
            };
            if fire_time > self.current_time {
                break;
            }
            self.schedule.pop_front();
            if cancelled {
                // freed when pending_free is drained
                continue;
            }

            fired += 1;
            self.fire(key);
        }

        self.updating = false;
        self.drain_pending_free();
        self.merge_pending_add();
        fired
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn insert_timer(
        &mut self,
        callback: TimerCallback,
        delay: f64,
        repeating: bool,
        name: Option<String>,
    ) -> Result<TimerHandle, TimerError> {
        validate_delay(delay)?;

        let state = if self.updating {
            TimerState::PendingAdd
        } else {
            TimerState::Live
        };
        let key = self.arena.insert(Timer {
            callback,
            fire_time: self.current_time + delay,
            period: repeating.then_some(delay),
            name,
            cancelled: false,
            state,
        });

        match state {
            TimerState::PendingAdd => self.pending_add.push(key),
            _ => self.insert_sorted(key),
        }
        Ok(TimerHandle(key))
    }

    fn insert_sorted(&mut self, key: SlotKey) {
        let Some(fire_time) = self.arena.get(key).map(|t| t.fire_time) else {
            return;
        };
        let arena = &self.arena;
        let pos = self
            .schedule
            .partition_point(|k| arena.get(*k).map_or(true, |t| t.fire_time <= fire_time));
        self.schedule.insert(pos, key);
        if let Some(timer) = self.arena.get_mut(key) {
            timer.state = TimerState::Live;
        }
    }

    fn find_pending(&self, callback: &TimerCallback) -> Option<SlotKey> {
        self.schedule
            .iter()
            .chain(self.pending_add.iter())
            .copied()
            .find(|k| {
                self.arena
                    .get(*k)
                    .is_some_and(|t| !t.cancelled && t.callback.same_as(callback))
            })
    }

    fn cancel_key(&mut self, key: SlotKey) -> bool {
        let Some(timer) = self.arena.get_mut(key) else {
            return false;
        };
        if timer.cancelled {
            return false;
        }

        if self.updating {
            timer.cancelled = true;
            self.pending_free.push(key);
            return true;
        }

        match timer.state {
            TimerState::Live => self.schedule.retain(|k| *k != key),
            TimerState::PendingAdd => self.pending_add.retain(|k| *k != key),
            TimerState::Firing => {}
        }
        self.arena.remove(key);
        true
    }

    fn fire(&mut self, key: SlotKey) {
        let Some(timer) = self.arena.get_mut(key) else {
            return;
        };
        timer.state = TimerState::Firing;
        let callback = timer.callback.clone();

        let outcome = run_guarded(|| (callback.0)(self));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.0),
            Err(panic) => Some(format!("panicked: {}", panic.message)),
        };

        let Some(timer) = self.arena.get_mut(key) else {
            return;
        };
        if let Some(message) = failure {
            let label = timer.name.clone().unwrap_or_else(|| format!("#{}", key.index()));
            warn!("timer {label} callback failed: {message}");
            if !timer.cancelled {
                timer.cancelled = true;
                self.pending_free.push(key);
            }
            return;
        }
        if timer.cancelled {
            return;
        }

        match timer.period {
            Some(period) => {
                timer.fire_time = self.current_time + period;
                timer.state = TimerState::PendingAdd;
                self.pending_add.push(key);
            }
            None => {
                self.arena.remove(key);
            }
        }
    }

    fn drain_pending_free(&mut self) {
        if self.pending_free.is_empty() {
            return;
        }
        let keys = std::mem::take(&mut self.pending_free);
        for key in keys {
            self.schedule.retain(|k| *k != key);
            self.pending_add.retain(|k| *k != key);
            self.arena.remove(key);
        }
    }

    fn merge_pending_add(&mut self) {
        if self.pending_add.is_empty() {
            return;
        }
        let keys = std::mem::take(&mut self.pending_add);
        for key in keys {
            if self.arena.get(key).is_some_and(|t| !t.cancelled) {
                self.insert_sorted(key);
            }
        }
    }
}

fn validate_delay(delay: f64) -> Result<(), TimerError> {
    if delay.is_finite() && delay >= 0.0 {
        Ok(())
    } else {
        Err(TimerError::InvalidArgument { delay })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recorder(log: &Log, label: &'static str) -> TimerCallback {
        let log = Rc::clone(log);
        TimerCallback::action(move || log.borrow_mut().push(label))
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();

        // Act
        let result = engine.schedule(recorder(&log, "a"), -0.5);

        // Assert
        assert_eq!(result, Err(TimerError::InvalidArgument { delay: -0.5 }));
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_nan_delay_is_rejected() {
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        assert!(engine.schedule(recorder(&log, "a"), f64::NAN).is_err());
    }

    #[test]
    fn test_timers_fire_in_fire_time_order_with_fifo_ties() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        engine.schedule(recorder(&log, "A"), 0.75).unwrap();
        engine.schedule(recorder(&log, "B"), 0.5).unwrap();
        engine.schedule(recorder(&log, "C"), 0.25).unwrap();
        engine.schedule(recorder(&log, "D"), 0.25).unwrap();
        engine.schedule(recorder(&log, "E"), 0.0).unwrap();

        // Act
        engine.update(0.0);
        engine.update(0.25);
        engine.update(0.25);
        engine.update(0.25);

        // Assert
        assert_eq!(*log.borrow(), vec!["E", "C", "D", "B", "A"]);
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_timer_does_not_fire_early() {
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        engine.schedule(recorder(&log, "a"), 1.0).unwrap();

        assert_eq!(engine.update(0.5), 0);
        assert!(log.borrow().is_empty());
        assert_eq!(engine.update(0.5), 1);
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn test_repeating_timer_rearms_after_firing() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let handle = engine.schedule_repeating(recorder(&log, "tick"), 0.5).unwrap();

        // Act
        for _ in 0..4 {
            engine.update(0.25);
        }

        // Assert
        assert_eq!(log.borrow().len(), 2);
        assert!(engine.is_scheduled(handle));
        assert_eq!(engine.fire_time(handle), Some(1.5));
    }

    #[test]
    fn test_cancel_before_fire_prevents_callback() {
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let handle = engine.schedule(recorder(&log, "a"), 0.1).unwrap();

        assert!(engine.cancel(handle));
        engine.update(1.0);

        assert!(log.borrow().is_empty());
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_cancel_unknown_handle_is_noop() {
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let handle = engine.schedule(recorder(&log, "a"), 0.0).unwrap();
        engine.update(0.0);

        // handle is stale after the one-shot fired
        assert!(!engine.cancel(handle));
    }

    #[test]
    fn test_cancel_within_callback_skips_other_due_timers() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let first = recorder(&log, "1");
        let second = recorder(&log, "2");
        let observed: Rc<RefCell<Vec<usize>>> = Rc::default();

        let (l, f, s, o) = (Rc::clone(&log), first.clone(), second.clone(), Rc::clone(&observed));
        let canceller = TimerCallback::new(move |engine| {
            l.borrow_mut().push("canceller");
            o.borrow_mut().push(engine.pending_free_count());
            engine.cancel_callback(&f);
            o.borrow_mut().push(engine.pending_free_count());
            engine.cancel_callback(&s);
            o.borrow_mut().push(engine.pending_free_count());
            Ok(())
        });

        engine.schedule(canceller, 0.25).unwrap();
        engine.schedule(first, 0.25).unwrap();
        engine.schedule(second, 0.25).unwrap();
        engine.schedule(recorder(&log, "3"), 0.25).unwrap();

        // Act
        engine.update(0.25);

        // Assert
        assert_eq!(*observed.borrow(), vec![0, 1, 2]);
        assert_eq!(engine.pending_free_count(), 0);
        assert_eq!(*log.borrow(), vec!["canceller", "3"]);
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_schedule_once_deduplicates_by_callback_identity() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let a = recorder(&log, "1");
        let b = recorder(&log, "2");
        let c = recorder(&log, "3");

        // Act
        let h1 = engine.schedule_once(a.clone(), 0.25).unwrap();
        engine.schedule_once(b.clone(), 0.25).unwrap();
        engine.schedule_once(c, 0.25).unwrap();
        let h1_again = engine.schedule_once(a, 0.25).unwrap();
        engine.schedule_once(b, 0.25).unwrap();

        // Assert
        assert_eq!(h1, h1_again);
        assert_eq!(engine.count(), 3);
        engine.update(0.25);
        assert_eq!(*log.borrow(), vec!["1", "2", "3"]);
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_is_pending_tracks_callback_until_it_fires() {
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let cb = recorder(&log, "x");

        assert!(!engine.is_pending(&cb));
        engine.schedule(cb.clone(), 0.5).unwrap();
        assert!(engine.is_pending(&cb));
        engine.update(0.5);
        assert!(!engine.is_pending(&cb));
    }

    #[test]
    fn test_identical_closures_are_distinct_callbacks() {
        let log: Log = Rc::default();
        let a = recorder(&log, "x");
        let b = recorder(&log, "x");
        assert!(!a.same_as(&b));
        assert!(a.same_as(&a.clone()));
    }

    #[test]
    fn test_timers_scheduled_in_callback_fire_next_update() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let l = Rc::clone(&log);
        let spawner = TimerCallback::new(move |engine| {
            l.borrow_mut().push("spawner");
            engine.schedule(recorder(&l, "child1"), 0.25)?;
            engine.schedule(recorder(&l, "child2"), 0.0)?;
            Ok(())
        });
        engine.schedule(spawner, 0.25).unwrap();

        // Act
        engine.update(0.25);

        // Assert: children staged, not fired in the same pass
        assert_eq!(*log.borrow(), vec!["spawner"]);
        assert_eq!(engine.count(), 2);

        engine.update(0.0);
        assert_eq!(*log.borrow(), vec!["spawner", "child2"]);
        engine.update(0.25);
        assert_eq!(*log.borrow(), vec!["spawner", "child2", "child1"]);
    }

    #[test]
    fn test_failing_callback_is_cancelled_and_others_still_fire() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let failing = TimerCallback::new(|_| Err(CallbackError::from("boom")));
        engine.schedule_repeating(failing, 0.25).unwrap();
        engine.schedule(recorder(&log, "after"), 0.25).unwrap();

        // Act
        engine.update(0.25);

        // Assert
        assert_eq!(*log.borrow(), vec!["after"]);
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        engine
            .schedule(TimerCallback::action(|| panic!("callback panic")), 0.0)
            .unwrap();
        engine.schedule(recorder(&log, "survivor"), 0.0).unwrap();

        engine.update(0.0);

        assert_eq!(*log.borrow(), vec!["survivor"]);
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_cancel_self_inside_repeating_callback_stops_it() {
        let mut engine = TimerEngine::new();
        let hits = Rc::new(RefCell::new(0));
        let handle_cell: Rc<RefCell<Option<TimerHandle>>> = Rc::default();
        let (h, hc) = (Rc::clone(&hits), Rc::clone(&handle_cell));
        let cb = TimerCallback::new(move |engine| {
            *h.borrow_mut() += 1;
            if let Some(handle) = *hc.borrow() {
                engine.cancel(handle);
            }
            Ok(())
        });
        let handle = engine.schedule_repeating(cb, 0.1).unwrap();
        *handle_cell.borrow_mut() = Some(handle);

        engine.update(0.1);
        engine.update(0.1);

        assert_eq!(*hits.borrow(), 1);
        assert!(!engine.is_scheduled(handle));
    }

    #[test]
    fn test_recycled_slots_are_reused_lifo() {
        // Arrange
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let _h0 = engine.schedule(recorder(&log, "0"), 5.0).unwrap();
        let h1 = engine.schedule(recorder(&log, "1"), 5.0).unwrap();
        let h2 = engine.schedule(recorder(&log, "2"), 5.0).unwrap();
        engine.cancel(h1);
        engine.cancel(h2);

        // Act
        let n1 = engine.schedule(recorder(&log, "n1"), 1.0).unwrap();
        let n2 = engine.schedule(recorder(&log, "n2"), 1.0).unwrap();

        // Assert
        assert_eq!(n1.slot().index(), h2.slot().index());
        assert_eq!(n2.slot().index(), h1.slot().index());
        assert_eq!(engine.allocated_slots(), 3);
    }

    #[test]
    fn test_cancel_by_name_and_cancel_all() {
        let mut engine = TimerEngine::new();
        let log: Log = Rc::default();
        let named = engine
            .schedule_named(recorder(&log, "save"), 1.0, false, "autosave")
            .unwrap();
        engine.schedule(recorder(&log, "x"), 1.0).unwrap();
        engine.schedule(recorder(&log, "y"), 2.0).unwrap();

        assert_eq!(engine.name(named), Some("autosave"));
        assert_eq!(engine.cancel_by_name("autosave"), 1);
        assert_eq!(engine.count(), 2);

        engine.cancel_all();
        engine.update(5.0);
        assert!(log.borrow().is_empty());
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_invalid_delta_does_not_move_clock() {
        let mut engine = TimerEngine::new();
        engine.update(-1.0);
        engine.update(f64::INFINITY);
        assert_eq!(engine.current_time(), 0.0);
    }
}
