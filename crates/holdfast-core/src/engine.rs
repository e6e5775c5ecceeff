use crate::profile::{Profile, ProfileError};
use crate::repeat::{AltRepeatAction, RepeatEngine};
use crate::select_word::{SelectWordEngine, SelectionState};
use crate::tap_hold::{ChordHook, HoldAction, Resolution, TapHoldEngine};
use crate::types::{
    Command, KeyEdge, KeyEvent, KeyId, Keystroke, ModifierState, Modifiers, Tick,
};
use std::collections::HashMap;
use tracing::trace;

/// The input-processing pipeline: tap-hold arbitration first, then the
/// selection machine, the repeat triggers and plain key emission, in a fixed
/// order within one synchronous call per transition.
///
/// All state is owned here; build one instance per keyboard (or per test)
/// and thread it through the scan loop.
pub struct Pipeline {
    profile: Profile,
    tap_hold: TapHoldEngine,
    repeat: RepeatEngine,
    select: SelectWordEngine,
    shift_overrides: HashMap<KeyId, Keystroke>,
    mods: ModifierState,
    /// Modifiers currently active from resolved holds. Tracked so events
    /// flushed after a resolution see the hold in their context.
    hold_mods: Modifiers,
    active_repeat: Option<Keystroke>,
    pressed_overrides: HashMap<KeyId, Keystroke>,
    last_activity: Tick,
}

impl Pipeline {
    pub fn new(profile: Profile) -> Result<Self, ProfileError> {
        profile.validate()?;
        Ok(Self {
            tap_hold: TapHoldEngine::new(profile.tap_hold.clone(), profile.geometry),
            repeat: RepeatEngine::new(profile.repeat.rules.clone()),
            select: SelectWordEngine::new(profile.select.clone()),
            shift_overrides: profile
                .shift_overrides
                .iter()
                .map(|o| (o.key, o.out))
                .collect(),
            mods: ModifierState::default(),
            hold_mods: Modifiers::none(),
            active_repeat: None,
            pressed_overrides: HashMap::new(),
            last_activity: Tick(0),
            profile,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Dispatcher feedback: the current held + one-shot modifier sets.
    pub fn set_modifier_state(&mut self, mods: ModifierState) {
        self.mods = mods;
    }

    /// Install the per-key chord-decision override.
    pub fn set_chord_hook(&mut self, hook: ChordHook) {
        self.tap_hold.set_chord_hook(hook);
    }

    /// On-demand query: the keystroke the repeat key would replay.
    pub fn repeat_query(&self) -> Option<Keystroke> {
        self.repeat.last()
    }

    /// On-demand query: the substitute the alternate-repeat key would
    /// produce under `mods`. `None` means "do nothing".
    pub fn alt_repeat_query(&self, mods: Modifiers) -> Option<AltRepeatAction> {
        self.repeat.alt_lookup(mods).cloned()
    }

    pub fn selection_state(&self) -> SelectionState {
        self.select.state()
    }

    /// Raw key transition callback. Takes one modifier snapshot at the top;
    /// every decision within this call uses that snapshot.
    pub fn on_transition(&mut self, event: KeyEvent) -> Vec<Command> {
        let snapshot = self.mods.effective();
        self.last_activity = event.t;
        trace!(key = event.key.0, edge = ?event.edge, "transition");
        let mut out = Vec::new();
        for resolution in self.tap_hold.on_event(event) {
            self.apply(resolution, snapshot, &mut out);
        }
        out
    }

    /// Periodic scan-cycle callback: drives pending-timeout expiry and the
    /// selection idle window.
    pub fn tick(&mut self, now: Tick) -> Vec<Command> {
        let snapshot = self.mods.effective();
        let mut out = Vec::new();
        for resolution in self.tap_hold.tick(now) {
            self.apply(resolution, snapshot, &mut out);
        }
        if let Some(window) = self.profile.select.idle_timeout_ms {
            if self.select.state() == SelectionState::Selected
                && now.since(self.last_activity) >= window as i32
            {
                self.select.tick_idle();
            }
        }
        out
    }

    fn apply(&mut self, resolution: Resolution, snapshot: Modifiers, out: &mut Vec<Command>) {
        match resolution {
            Resolution::HoldOn(hold) => match hold {
                HoldAction::Modifier(m) => {
                    self.hold_mods = self.hold_mods.union(m);
                    out.push(Command::ModsDown(m));
                }
                HoldAction::Layer(layer) => out.push(Command::LayerOn(layer)),
            },
            Resolution::HoldOff(hold) => match hold {
                HoldAction::Modifier(m) => {
                    self.hold_mods = self.hold_mods.difference(m);
                    out.push(Command::ModsUp(m));
                }
                HoldAction::Layer(layer) => out.push(Command::LayerOff(layer)),
            },
            Resolution::TapDown(stroke) => {
                self.downstream_press(stroke.key, stroke.mods, snapshot, out)
            }
            Resolution::TapUp(stroke) => {
                self.downstream_release(stroke.key, stroke.mods, snapshot, out)
            }
            Resolution::Forward(event) => self.route(event, snapshot, out),
        }
    }

    /// Forwarded (or flushed) events, routed past the remaining engines.
    fn route(&mut self, event: KeyEvent, snapshot: Modifiers, out: &mut Vec<Command>) {
        let ctx = snapshot.union(self.hold_mods);

        // Physical shift keys pass through untouched and never reach the
        // selection machine.
        if event.key.is_shift() {
            let stroke = Keystroke::plain(event.key);
            out.push(match event.edge {
                KeyEdge::Down => Command::KeyDown(stroke),
                KeyEdge::Up => Command::KeyUp(stroke),
            });
            return;
        }

        if event.key == self.profile.select.trigger {
            match event.edge {
                KeyEdge::Down => out.extend(self.select.on_trigger_press(ctx)),
                KeyEdge::Up => out.extend(self.select.on_trigger_release()),
            }
            return;
        }

        if event.key == self.profile.repeat.repeat_key {
            if matches!(event.edge, KeyEdge::Down) {
                let outcome = self.select.on_other_press(event.key);
                out.extend(outcome.commands);
                // The repeat key registers the remembered stroke for as long
                // as it is held, so it autorepeats like the original key.
                if let Some(stroke) = self.repeat.last() {
                    self.active_repeat = Some(stroke);
                    out.push(Command::KeyDown(stroke));
                }
            } else if let Some(stroke) = self.active_repeat.take() {
                out.push(Command::KeyUp(stroke));
            }
            return;
        }

        if event.key == self.profile.repeat.alt_repeat_key {
            if matches!(event.edge, KeyEdge::Down) {
                let outcome = self.select.on_other_press(event.key);
                out.extend(outcome.commands);
                match self.repeat.take_alt(ctx) {
                    Some(AltRepeatAction::Key(stroke)) => out.push(Command::Tap(stroke)),
                    Some(AltRepeatAction::Text(text)) => out.push(Command::Text(text)),
                    // No mapping: explicitly do nothing.
                    None => {}
                }
            }
            return;
        }

        match event.edge {
            KeyEdge::Down => self.downstream_press(event.key, Modifiers::none(), snapshot, out),
            KeyEdge::Up => self.downstream_release(event.key, Modifiers::none(), snapshot, out),
        }
    }

    fn downstream_press(
        &mut self,
        key: KeyId,
        extra: Modifiers,
        snapshot: Modifiers,
        out: &mut Vec<Command>,
    ) {
        let ctx = snapshot.union(self.hold_mods);
        let outcome = self.select.on_other_press(key);
        out.extend(outcome.commands);
        if !outcome.forward {
            return;
        }

        let mut stroke = Keystroke::with(key, ctx.union(extra));
        // Custom shifted pair: only when shift is the sole modifier held.
        if ctx.only_shift() && extra.is_empty() {
            if let Some(replacement) = self.shift_overrides.get(&key) {
                self.pressed_overrides.insert(key, *replacement);
                stroke = *replacement;
            }
        }
        out.push(Command::KeyDown(stroke));
        self.repeat.record(stroke);
    }

    fn downstream_release(
        &mut self,
        key: KeyId,
        extra: Modifiers,
        snapshot: Modifiers,
        out: &mut Vec<Command>,
    ) {
        let ctx = snapshot.union(self.hold_mods);
        let stroke = match self.pressed_overrides.remove(&key) {
            Some(replacement) => replacement,
            None => Keystroke::with(key, ctx.union(extra)),
        };
        out.push(Command::KeyUp(stroke));
    }
}
