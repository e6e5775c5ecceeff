use crate::geometry::Geometry;
use crate::types::{KeyEdge, KeyEvent, KeyId, Keystroke, MatrixPos, Modifiers, Tick};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Hold-side action of a dual-role key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldAction {
    Modifier(Modifiers),
    Layer(u8),
}

/// Static configuration of one dual-role key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualRoleKey {
    pub key: KeyId,
    pub tap: Keystroke,
    pub hold: HoldAction,
    /// Per-key deadline override. `None` uses the profile default; 0 skips
    /// the buffering window entirely and resolves Hold on press.
    #[serde(default)]
    pub timeout_ms: Option<u32>,
    /// Suppress the quick-tap repeat shortcut for this key.
    #[serde(default)]
    pub quick_tap_forces_hold: bool,
}

impl DualRoleKey {
    /// Home-row modifier: tap types the key itself, hold applies `mods`.
    pub fn home_row_mod(key: KeyId, mods: Modifiers) -> Self {
        Self {
            key,
            tap: Keystroke::plain(key),
            hold: HoldAction::Modifier(mods),
            timeout_ms: None,
            quick_tap_forces_hold: false,
        }
    }

    /// Layer-tap: tap types the key itself, hold activates `layer`.
    pub fn layer_tap(key: KeyId, layer: u8) -> Self {
        Self {
            key,
            tap: Keystroke::plain(key),
            hold: HoldAction::Layer(layer),
            timeout_ms: None,
            quick_tap_forces_hold: false,
        }
    }
}

/// How release of the pending key itself concludes ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleasePolicy {
    /// Release before any chord decision resolves Tap.
    ReleaseFavorsTap,
    /// A full press-and-release of another key while pending resolves Hold
    /// at that nested release; otherwise release still favors tap.
    PermissiveHold,
}

impl Default for ReleasePolicy {
    fn default() -> Self {
        Self::ReleaseFavorsTap
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TapHoldProfile {
    pub dual_role: Vec<DualRoleKey>,
    /// Keys whose chord decision is always Hold (layer-shift keys).
    pub always_hold: HashSet<KeyId>,
    /// (pending, incoming) pairs that resolve Hold even on the same hand.
    pub hold_pairs: Vec<(KeyId, KeyId)>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
    #[serde(default = "default_quick_tap_ms")]
    pub quick_tap_ms: u32,
    #[serde(default = "default_max_buffered")]
    pub max_buffered: usize,
    pub release_policy: ReleasePolicy,
}

fn default_timeout_ms() -> u32 {
    800
}

fn default_quick_tap_ms() -> u32 {
    180
}

fn default_max_buffered() -> usize {
    8
}

impl Default for TapHoldProfile {
    fn default() -> Self {
        Self {
            dual_role: Vec::new(),
            always_hold: HashSet::new(),
            hold_pairs: Vec::new(),
            timeout_ms: default_timeout_ms(),
            quick_tap_ms: default_quick_tap_ms(),
            max_buffered: default_max_buffered(),
            release_policy: ReleasePolicy::ReleaseFavorsTap,
        }
    }
}

/// Output decision from the disambiguator.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Event not subject to disambiguation, or a buffered event replayed
    /// after settling; the pipeline processes it downstream.
    Forward(KeyEvent),
    /// Tap side resolved; the key may still be physically held.
    TapDown(Keystroke),
    TapUp(Keystroke),
    /// Hold side resolved.
    HoldOn(HoldAction),
    HoldOff(HoldAction),
}

/// Per-key override of the chord decision. Returns `Some(true)` for Hold,
/// `Some(false)` for Tap, `None` to fall through to the built-in rules.
pub type ChordHook = Box<dyn Fn(KeyId, &KeyEvent) -> Option<bool> + Send + Sync>;

#[derive(Debug, Clone)]
struct Pending {
    cfg: DualRoleKey,
    pos: MatrixPos,
    pressed_at: Tick,
    deadline_ms: u32,
    buffered: Vec<KeyEvent>,
}

/// Outcome bookkeeping for resolved keys that are still physically down.
#[derive(Debug, Clone, Copy)]
enum Settled {
    Tap(Keystroke),
    Hold(HoldAction),
}

enum Verdict {
    Hold,
    Tap,
    Defer,
}

enum Outcome {
    Hold,
    Tap,
}

pub struct TapHoldEngine {
    profile: TapHoldProfile,
    geometry: Geometry,
    dual_index: HashMap<KeyId, DualRoleKey>,
    pair_index: HashSet<(KeyId, KeyId)>,
    // At most one pending resolution exists at a time; a key cannot be
    // pending twice without an intervening release.
    pending: Option<Pending>,
    settled_down: HashMap<KeyId, Settled>,
    last_tap: Option<(KeyId, Tick)>,
    chord_hook: Option<ChordHook>,
}

impl TapHoldEngine {
    pub fn new(profile: TapHoldProfile, geometry: Geometry) -> Self {
        let dual_index = profile
            .dual_role
            .iter()
            .map(|d| (d.key, d.clone()))
            .collect();
        let pair_index = profile.hold_pairs.iter().copied().collect();
        Self {
            profile,
            geometry,
            dual_index,
            pair_index,
            pending: None,
            settled_down: HashMap::new(),
            last_tap: None,
            chord_hook: None,
        }
    }

    pub fn set_chord_hook(&mut self, hook: ChordHook) {
        self.chord_hook = Some(hook);
    }

    pub fn is_dual_role(&self, key: KeyId) -> bool {
        self.dual_index.contains_key(&key)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn on_event(&mut self, event: KeyEvent) -> Vec<Resolution> {
        match event.edge {
            KeyEdge::Down => self.on_press(event),
            KeyEdge::Up => self.on_release(event),
        }
    }

    /// Scan-cycle callback: the only place pending timeouts expire.
    pub fn tick(&mut self, now: Tick) -> Vec<Resolution> {
        let expired = self
            .pending
            .as_ref()
            .map_or(false, |p| now.since(p.pressed_at) >= p.deadline_ms as i32);
        if !expired {
            return Vec::new();
        }
        self.settle(Outcome::Hold, now, None)
    }

    fn on_press(&mut self, event: KeyEvent) -> Vec<Resolution> {
        if let Some(p) = &self.pending {
            // Repeat Down of the pending key itself (host autorepeat): swallow.
            if p.cfg.key == event.key {
                return Vec::new();
            }
            return match self.chord_verdict(&event) {
                Verdict::Hold => self.settle(Outcome::Hold, event.t, Some(event)),
                Verdict::Tap => self.settle(Outcome::Tap, event.t, Some(event)),
                Verdict::Defer => self.buffer(event),
            };
        }

        let Some(cfg) = self.dual_index.get(&event.key).cloned() else {
            return vec![Resolution::Forward(event)];
        };

        // Quick successive tap repeats the tap action instead of re-arbitrating.
        if !cfg.quick_tap_forces_hold {
            if let Some((key, at)) = self.last_tap {
                let gap = event.t.since(at);
                if key == event.key && gap >= 0 && gap <= self.profile.quick_tap_ms as i32 {
                    debug!(key = event.key.0, "quick tap, repeating tap action");
                    self.settled_down.insert(event.key, Settled::Tap(cfg.tap));
                    return vec![Resolution::TapDown(cfg.tap)];
                }
            }
        }

        let deadline_ms = cfg.timeout_ms.unwrap_or(self.profile.timeout_ms);
        if deadline_ms == 0 {
            // Buffering disabled for this key: the hold wins on press.
            self.settled_down.insert(event.key, Settled::Hold(cfg.hold));
            return vec![Resolution::HoldOn(cfg.hold)];
        }

        self.pending = Some(Pending {
            pos: event.pos,
            pressed_at: event.t,
            deadline_ms,
            buffered: Vec::new(),
            cfg,
        });
        Vec::new()
    }

    fn on_release(&mut self, event: KeyEvent) -> Vec<Resolution> {
        if let Some(p) = &self.pending {
            if p.cfg.key == event.key {
                // Release before any chord decision concludes in favor of tap.
                return self.settle(Outcome::Tap, event.t, Some(event));
            }
            let nested = p
                .buffered
                .iter()
                .any(|e| e.key == event.key && matches!(e.edge, KeyEdge::Down));
            if nested && matches!(self.profile.release_policy, ReleasePolicy::PermissiveHold) {
                // Another key completed a full press-and-release first.
                return self.settle(Outcome::Hold, event.t, Some(event));
            }
            return self.buffer(event);
        }

        if let Some(settled) = self.settled_down.remove(&event.key) {
            return vec![match settled {
                Settled::Tap(ks) => {
                    self.last_tap = Some((event.key, event.t));
                    Resolution::TapUp(ks)
                }
                Settled::Hold(h) => Resolution::HoldOff(h),
            }];
        }

        vec![Resolution::Forward(event)]
    }

    fn buffer(&mut self, event: KeyEvent) -> Vec<Resolution> {
        let cap = self.profile.max_buffered;
        let full = self
            .pending
            .as_ref()
            .map_or(false, |p| p.buffered.len() >= cap);
        if full {
            // Never drop an event: overflow forces the hold and flushes.
            warn!(cap, "pending buffer full, forcing hold");
            return self.settle(Outcome::Hold, event.t, Some(event));
        }
        if let Some(p) = self.pending.as_mut() {
            p.buffered.push(event);
        }
        Vec::new()
    }

    /// Conclude the pending resolution, emit the chosen action, then replay
    /// the buffered events (and the event that triggered settling) in their
    /// original order so they re-evaluate under the resolved context.
    fn settle(&mut self, outcome: Outcome, now: Tick, trailing: Option<KeyEvent>) -> Vec<Resolution> {
        let p = self.pending.take().expect("settle without pending");
        let mut out = Vec::new();
        match outcome {
            Outcome::Hold => {
                debug!(key = p.cfg.key.0, "resolved hold");
                self.settled_down.insert(p.cfg.key, Settled::Hold(p.cfg.hold));
                out.push(Resolution::HoldOn(p.cfg.hold));
            }
            Outcome::Tap => {
                debug!(key = p.cfg.key.0, "resolved tap");
                self.settled_down.insert(p.cfg.key, Settled::Tap(p.cfg.tap));
                self.last_tap = Some((p.cfg.key, now));
                out.push(Resolution::TapDown(p.cfg.tap));
            }
        }
        for ev in p.buffered {
            out.extend(self.on_event(ev));
        }
        if let Some(ev) = trailing {
            out.extend(self.on_event(ev));
        }
        out
    }

    /// Chord decision for a press that arrives while a key is pending.
    /// Precedence: per-key hook, always-hold set, configured hold pair,
    /// below-the-alphas row, then the opposite-hands rule.
    fn chord_verdict(&self, incoming: &KeyEvent) -> Verdict {
        let p = self.pending.as_ref().expect("verdict without pending");
        if let Some(hook) = &self.chord_hook {
            if let Some(hold) = hook(p.cfg.key, incoming) {
                return if hold { Verdict::Hold } else { Verdict::Tap };
            }
        }
        if self.profile.always_hold.contains(&p.cfg.key) {
            return Verdict::Hold;
        }
        if self.pair_index.contains(&(p.cfg.key, incoming.key)) {
            return Verdict::Hold;
        }
        if self.geometry.is_below_alphas(incoming.pos) {
            return Verdict::Hold;
        }
        if !self.geometry.same_hand(p.pos, incoming.pos) {
            return Verdict::Hold;
        }
        // Same hand above the thumbs: a fast roll. Under permissive hold the
        // call is deferred until one of the two keys releases.
        match self.profile.release_policy {
            ReleasePolicy::ReleaseFavorsTap => Verdict::Tap,
            ReleasePolicy::PermissiveHold => Verdict::Defer,
        }
    }
}
