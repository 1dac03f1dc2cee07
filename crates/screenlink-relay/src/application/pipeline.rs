//! Viewer input pipeline.
//!
//! Input arrives from a viewer's session task and is buffered in that
//! viewer's [`ControlState`]; a per-viewer worker drains the buffer and turns
//! it into a [`Dispatch`] (what to relay to hosts, what to actuate).
//!
//! ```text
//! session task ──enqueue──► PendingEvents ──drain──► filter/track ──► Dispatch
//!                 (coalesce pointer moves)    (rank order)             ├─ relay
//!                                                                      └─ actuate
//! ```
//!
//! # Implementation notes
//!
//! - Pointer moves share one slot, so a burst of absolute moves that arrives
//!   while the worker is busy collapses into the newest one.  A relative
//!   move is merged instead: its delta is added to a pending relative move,
//!   or applied on top of a pending absolute target.
//! - Drain order is pointer move, wheel, button, keyboard; FIFO within a
//!   class.
//! - Binary pointer frames are rate limited on arrival, so the first frame
//!   of a burst wins; every absolute move is subject to the distance filter
//!   when drained.  Relative moves and presses reposition the
//!   pointer without being filtered.
//! - Every actuated toggle passes through [`HeldInputs`] so redundant
//!   toggles are dropped and [`ControlState::release_all`] knows exactly what
//!   to lift.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use screenlink_core::input::{MotionVerdict, PushOutcome};
use screenlink_core::keymap::{actuator_key, modifier_for, Modifier, ModifierSet};
use screenlink_core::protocol::{KeyStroke, PointerButton, PointerMotion, PointerPress, WheelScroll};
use screenlink_core::{ControlAction, HeldInputs, MotionFilter, PendingEvents};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::actuator::Actuation;
use crate::domain::RelayConfig;

/// Pixels per line for `deltaMode == 1` wheel events.
pub const WHEEL_LINE_PX: f64 = 16.0;

/// Tunables of the pipeline, taken from [`RelayConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub min_interval: Duration,
    pub min_distance_px: f64,
    pub queue_capacity: usize,
}

impl From<&RelayConfig> for PipelineSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            min_interval: config.pointer_min_interval,
            min_distance_px: config.pointer_min_distance_px,
            queue_capacity: config.input_queue_capacity,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

/// Which wire shape an input arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// 8-byte binary pointer frame.
    Binary,
    /// `control` text message.
    Structured,
}

/// One buffered input action, stamped on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInput {
    pub action: ControlAction,
    pub source: InputSource,
    pub received_at: Instant,
    /// Normalized absolute target a relative move was merged onto.
    anchor: Option<(f64, f64)>,
}

impl PendingInput {
    pub fn structured(action: ControlAction, received_at: Instant) -> Self {
        Self {
            action,
            source: InputSource::Structured,
            received_at,
            anchor: None,
        }
    }

    /// A binary pointer frame, already decoded to normalized `(x, y)`.
    pub fn pointer_frame(x: f64, y: f64, received_at: Instant) -> Self {
        Self {
            action: ControlAction::MouseMove(PointerMotion::absolute(x, y)),
            source: InputSource::Binary,
            received_at,
            anchor: None,
        }
    }
}

/// What [`ControlState::enqueue`] did with an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Handed to the pending queues.
    Pushed(PushOutcome),
    /// A binary frame inside the rate window of the last admitted one.
    TooSoon,
    /// `blur` is never queued; the caller runs
    /// [`release_all`](ControlState::release_all) instead.
    Release,
}

/// The outcome of draining or releasing: relay first, then actuate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    /// Minimized actions for every host.
    pub relay: Vec<ControlAction>,
    /// Calls for the local actuator, in order.
    pub actuate: Vec<Actuation>,
}

impl Dispatch {
    pub fn is_empty(&self) -> bool {
        self.relay.is_empty() && self.actuate.is_empty()
    }
}

// ── Per-endpoint control state ────────────────────────────────────────────────

/// Pending input, motion filter and held-input state of one viewer.
#[derive(Debug)]
pub struct ControlState {
    pending: PendingEvents<PendingInput>,
    motion: MotionFilter,
    held: HeldInputs,
    /// Last pointer position in device pixels.
    pointer_px: Option<(f64, f64)>,
}

impl ControlState {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            pending: PendingEvents::new(settings.queue_capacity),
            motion: MotionFilter::new(settings.min_interval, settings.min_distance_px),
            held: HeldInputs::new(),
            pointer_px: None,
        }
    }

    /// Buffers an input for the next drain.
    ///
    /// Binary frames pass the rate check here, against the last admitted
    /// frame, so a burst keeps its first frame.  A relative move is merged
    /// with a pending move rather than replacing it.
    pub fn enqueue(&mut self, mut input: PendingInput) -> Admission {
        let Some(class) = input.action.class() else {
            return Admission::Release;
        };

        if input.source == InputSource::Binary
            && self.motion.admit_frame(input.received_at) == MotionVerdict::TooSoon
        {
            trace!("binary pointer frame inside the rate window dropped");
            return Admission::TooSoon;
        }

        if let Some(pending) = self.pending.pointer() {
            merge_relative(pending, &mut input);
        }
        Admission::Pushed(self.pending.push(class, input))
    }

    pub fn held(&self) -> &HeldInputs {
        &self.held
    }

    /// Last pointer position in device pixels.
    pub fn pointer_px(&self) -> Option<(f64, f64)> {
        self.pointer_px
    }

    /// Processes everything pending, lowest rank first.
    ///
    /// `surface` converts normalized coordinates into device pixels.
    pub fn drain(&mut self, surface: (u32, u32)) -> Dispatch {
        let mut out = Dispatch::default();
        for input in self.pending.drain() {
            self.process(input, surface, &mut out);
        }
        out
    }

    /// Drops anything pending and lifts every held key, button and
    /// modifier.
    pub fn release_all(&mut self, surface: (u32, u32)) -> Dispatch {
        self.pending.clear();
        let released = self.held.release_all();
        let mut out = Dispatch::default();

        for key in released.keys {
            out.actuate.push(Actuation::Key {
                key: key.clone(),
                down: false,
            });
            out.relay.push(ControlAction::KeyUp(KeyStroke {
                key,
                ..KeyStroke::default()
            }));
        }

        let (x, y) = self.pointer_normalized(surface);
        for button in released.buttons {
            out.actuate.push(Actuation::Button { button, down: false });
            out.relay.push(ControlAction::MouseUp(PointerPress { x, y, button }));
        }

        for modifier in released.modifiers {
            out.actuate.push(Actuation::Key {
                key: modifier.actuator_key().to_string(),
                down: false,
            });
            out.relay.push(ControlAction::KeyUp(KeyStroke {
                key: modifier.dom_key().to_string(),
                ..KeyStroke::default()
            }));
        }
        out
    }

    fn process(&mut self, input: PendingInput, surface: (u32, u32), out: &mut Dispatch) {
        let PendingInput {
            action,
            source,
            anchor,
            ..
        } = input;

        match action {
            ControlAction::MouseMove(motion) => self.process_move(motion, source, anchor, surface, out),
            ControlAction::MouseDown(press) => self.process_toggle(press, true, surface, out),
            ControlAction::MouseUp(press) => self.process_toggle(press, false, surface, out),
            ControlAction::Click(press) => self.process_click(press, false, surface, out),
            ControlAction::RightClick(press) => self.process_click(press, true, surface, out),
            ControlAction::Wheel(wheel) => self.process_wheel(wheel, surface, out),
            ControlAction::KeyDown(stroke) => self.process_key(stroke, true, out),
            ControlAction::KeyUp(stroke) => self.process_key(stroke, false, out),
            ControlAction::Blur => {
                let released = self.release_all(surface);
                out.relay.extend(released.relay);
                out.actuate.extend(released.actuate);
            }
        }
    }

    fn process_move(
        &mut self,
        motion: PointerMotion,
        source: InputSource,
        anchor: Option<(f64, f64)>,
        surface: (u32, u32),
        out: &mut Dispatch,
    ) {
        if motion.relative {
            let base = match anchor {
                Some((ax, ay)) => to_px(ax, ay, surface),
                None => self
                    .pointer_px
                    .unwrap_or_else(|| to_px(motion.x, motion.y, surface)),
            };
            let pos = clamp_px(base.0 + motion.delta_x, base.1 + motion.delta_y, surface);
            self.motion.mark_accepted(pos);
            self.set_pointer(pos, surface, out);
            // hosts never saw the absolute target, so they get the end point
            out.relay.push(ControlAction::MouseMove(match anchor {
                Some(_) => {
                    let (x, y) = self.pointer_normalized(surface);
                    PointerMotion::absolute(x, y)
                }
                None => motion,
            }));
            return;
        }

        let pos = to_px(motion.x, motion.y, surface);
        match self.motion.admit(pos) {
            MotionVerdict::Accept => {}
            verdict => {
                trace!(?verdict, ?source, "pointer move filtered");
                return;
            }
        }
        self.set_pointer(pos, surface, out);
        out.relay.push(ControlAction::MouseMove(PointerMotion::absolute(
            clamp01(motion.x),
            clamp01(motion.y),
        )));
    }

    fn process_toggle(
        &mut self,
        press: PointerPress,
        down: bool,
        surface: (u32, u32),
        out: &mut Dispatch,
    ) {
        let changed = if down {
            self.held.button_down(press.button)
        } else {
            self.held.button_up(press.button)
        };
        if !changed {
            debug!(button = press.button.as_str(), down, "redundant button toggle suppressed");
            return;
        }

        let press = clamp_press(press);
        self.place_pointer(press.x, press.y, surface, out);
        out.actuate.push(Actuation::Button {
            button: press.button,
            down,
        });
        out.relay.push(if down {
            ControlAction::MouseDown(press)
        } else {
            ControlAction::MouseUp(press)
        });
    }

    fn process_click(
        &mut self,
        press: PointerPress,
        right: bool,
        surface: (u32, u32),
        out: &mut Dispatch,
    ) {
        let button = if right { PointerButton::Right } else { press.button };
        let press = clamp_press(press);
        self.place_pointer(press.x, press.y, surface, out);
        out.actuate.push(Actuation::Button { button, down: true });
        out.actuate.push(Actuation::Button { button, down: false });
        out.relay.push(if right {
            ControlAction::RightClick(press)
        } else {
            ControlAction::Click(press)
        });
    }

    fn process_wheel(
        &mut self,
        wheel: WheelScroll,
        surface: (u32, u32),
        out: &mut Dispatch,
    ) {
        let (sx, sy) = match wheel.mode {
            Some(1) => (WHEEL_LINE_PX, WHEEL_LINE_PX),
            Some(2) => (f64::from(surface.0), f64::from(surface.1)),
            _ => (1.0, 1.0),
        };
        let dx = (wheel.delta_x * sx).round() as i32;
        let dy = (wheel.delta_y * sy).round() as i32;
        if dx == 0 && dy == 0 {
            trace!("empty wheel event ignored");
            return;
        }

        let (x, y) = (clamp01(wheel.x), clamp01(wheel.y));
        self.place_pointer(x, y, surface, out);
        out.actuate.push(Actuation::Scroll { dx, dy });
        out.relay.push(ControlAction::Wheel(WheelScroll { x, y, ..wheel }));
    }

    fn process_key(&mut self, stroke: KeyStroke, down: bool, out: &mut Dispatch) {
        if let Some(modifier) = modifier_for(&stroke.key, &stroke.code) {
            self.process_modifier(modifier, stroke, down, out);
            return;
        }

        for (modifier, pressed) in self.held.sync_modifiers(ModifierSet::from_stroke(&stroke)) {
            debug!(%modifier, pressed, "modifier reconciled from key flags");
            out.actuate.push(Actuation::Key {
                key: modifier.actuator_key().to_string(),
                down: pressed,
            });
        }

        match actuator_key(&stroke.key, &stroke.code) {
            Some(name) => {
                if down {
                    // a repeated keydown is an auto-repeat and is actuated again
                    self.held.key_down(&name);
                } else if !self.held.key_up(&name) {
                    debug!(key = %name, "release of a key that is not held suppressed");
                    return;
                }
                out.actuate.push(Actuation::Key { key: name, down });
            }
            None => debug!(key = %stroke.key, code = %stroke.code, "no actuator key; relay only"),
        }

        out.relay.push(if down {
            ControlAction::KeyDown(stroke)
        } else {
            ControlAction::KeyUp(stroke)
        });
    }

    fn process_modifier(&mut self, modifier: Modifier, stroke: KeyStroke, down: bool, out: &mut Dispatch) {
        let changed = if down {
            self.held.modifier_down(modifier)
        } else {
            self.held.modifier_up(modifier)
        };
        if !changed {
            debug!(%modifier, down, "redundant modifier toggle suppressed");
            return;
        }
        out.actuate.push(Actuation::Key {
            key: modifier.actuator_key().to_string(),
            down,
        });
        out.relay.push(if down {
            ControlAction::KeyDown(stroke)
        } else {
            ControlAction::KeyUp(stroke)
        });
    }

    /// Moves the pointer to normalized `(x, y)` before a press or scroll,
    /// if it is not already there.
    fn place_pointer(&mut self, x: f64, y: f64, surface: (u32, u32), out: &mut Dispatch) {
        let pos = to_px(x, y, surface);
        let moved = match self.pointer_px {
            Some(current) => round_px(current, surface) != round_px(pos, surface),
            None => true,
        };
        if moved {
            self.motion.mark_accepted(pos);
            self.set_pointer(pos, surface, out);
        }
    }

    fn set_pointer(&mut self, pos: (f64, f64), surface: (u32, u32), out: &mut Dispatch) {
        self.pointer_px = Some(pos);
        let (x, y) = round_px(pos, surface);
        out.actuate.push(Actuation::MoveTo { x, y });
    }

    fn pointer_normalized(&self, surface: (u32, u32)) -> (f64, f64) {
        match self.pointer_px {
            Some((px, py)) => (
                clamp01(px / f64::from(surface.0.max(1))),
                clamp01(py / f64::from(surface.1.max(1))),
            ),
            None => (0.0, 0.0),
        }
    }
}

/// Folds the pending pointer move into `incoming` when `incoming` is a
/// relative move, so the push that replaces the slot loses no motion.
fn merge_relative(pending: &PendingInput, incoming: &mut PendingInput) {
    let (ControlAction::MouseMove(prev), ControlAction::MouseMove(next)) =
        (&pending.action, &mut incoming.action)
    else {
        return;
    };
    if !next.relative {
        return;
    }

    if prev.relative {
        next.delta_x += prev.delta_x;
        next.delta_y += prev.delta_y;
        next.x = prev.x;
        next.y = prev.y;
        incoming.anchor = pending.anchor;
    } else {
        incoming.anchor = Some((clamp01(prev.x), clamp01(prev.y)));
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn clamp_press(press: PointerPress) -> PointerPress {
    PointerPress {
        x: clamp01(press.x),
        y: clamp01(press.y),
        button: press.button,
    }
}

/// Normalized → device pixels.
fn to_px(x: f64, y: f64, surface: (u32, u32)) -> (f64, f64) {
    (clamp01(x) * f64::from(surface.0), clamp01(y) * f64::from(surface.1))
}

fn clamp_px(x: f64, y: f64, surface: (u32, u32)) -> (f64, f64) {
    (
        x.clamp(0.0, f64::from(surface.0)),
        y.clamp(0.0, f64::from(surface.1)),
    )
}

/// Device pixels → the integer pixel grid, keeping the far edge on-surface.
fn round_px(pos: (f64, f64), surface: (u32, u32)) -> (i32, i32) {
    let max_x = f64::from(surface.0.saturating_sub(1)).min(f64::from(i32::MAX));
    let max_y = f64::from(surface.1.saturating_sub(1)).min(f64::from(i32::MAX));
    (
        pos.0.round().clamp(0.0, max_x) as i32,
        pos.1.round().clamp(0.0, max_y) as i32,
    )
}

// ── Shared slot ───────────────────────────────────────────────────────────────

/// A viewer's control state plus the wake-up signal and handle of the
/// worker that drains it.
///
/// The state sits behind its own `std::sync::Mutex` so that input from
/// different viewers is never serialized on the registry lock.
pub struct ControlSlot {
    state: Mutex<ControlState>,
    wake: Notify,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ControlSlot {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            state: Mutex::new(ControlState::new(settings)),
            wake: Notify::new(),
            worker: Mutex::new(None),
        }
    }

    /// Locks the control state.  A poisoned lock is recovered: the state
    /// holds no invariant a panic could have broken half-way.
    pub fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes the worker.  A wake-up sent while the worker is busy is kept
    /// until it next waits.
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Resolves on the next [`notify`](Self::notify).
    pub async fn notified(&self) {
        self.wake.notified().await;
    }

    pub fn set_worker(&self, handle: JoinHandle<()>) {
        let previous = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Aborts the worker, if one is running.
    pub fn stop_worker(&self) {
        if let Some(handle) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl fmt::Debug for ControlSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ControlSlot");
        match self.state.try_lock() {
            Ok(state) => d.field("state", &*state),
            Err(_) => d.field("state", &"<locked>"),
        };
        d.finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
