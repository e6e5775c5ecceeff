use crate::types::{keys, Command, KeyId, Keystroke, Modifiers};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the selection gesture currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    WordSelecting,
    LineFirstSelecting,
    LineSelecting,
    Selected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectWordProfile {
    pub trigger: KeyId,
    /// Collapses a finished selection back to its trailing edge.
    pub cancel: KeyId,
    /// Word-boundary modifier: Ctrl on Linux/Windows conventions, Alt on mac.
    pub word_mod: Modifiers,
    /// Forget a finished selection after this much idle time; `None` keeps
    /// it until the next key.
    pub idle_timeout_ms: Option<u32>,
}

impl Default for SelectWordProfile {
    fn default() -> Self {
        Self {
            trigger: keys::SELECT_WORD,
            cancel: keys::ESC,
            word_mod: Modifiers::ctrl(),
            idle_timeout_ms: Some(2000),
        }
    }
}

/// What to do with a non-trigger key that reached the selection machine.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherKeyOutcome {
    pub commands: Vec<Command>,
    /// False when the machine consumed the key (the cancel collapse).
    pub forward: bool,
}

/// Turns one dedicated key into select-word / select-line gestures.
///
/// Shift state is read from the modifier snapshot the pipeline passes in;
/// physical shift key events never reach this machine.
#[derive(Debug, Clone)]
pub struct SelectWordEngine {
    profile: SelectWordProfile,
    state: SelectionState,
}

impl SelectWordEngine {
    pub fn new(profile: SelectWordProfile) -> Self {
        Self {
            profile,
            state: SelectionState::Idle,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    fn extend_mods(&self) -> Modifiers {
        self.profile.word_mod.union(Modifiers::shift())
    }

    pub fn on_trigger_press(&mut self, mods: Modifiers) -> Vec<Command> {
        let mut out = Vec::new();
        if mods.shift {
            // Line branch.
            if self.state == SelectionState::Idle {
                // Home, then shift-extend to the end of the line. The taps
                // carry their own modifier context; the user's held shift is
                // masked by the dispatcher for the duration.
                out.push(Command::Tap(Keystroke::plain(keys::HOME)));
                out.push(Command::Tap(Keystroke::with(keys::END, Modifiers::shift())));
                self.state = SelectionState::LineFirstSelecting;
            } else {
                out.push(Command::KeyDown(Keystroke::with(
                    keys::DOWN,
                    Modifiers::shift(),
                )));
                self.state = SelectionState::LineSelecting;
            }
        } else {
            // Word branch.
            if self.state == SelectionState::Idle {
                // Snap the cursor to the nearest word boundary first.
                out.push(Command::Tap(Keystroke::with(keys::RIGHT, self.profile.word_mod)));
                out.push(Command::Tap(Keystroke::with(keys::LEFT, self.profile.word_mod)));
            }
            out.push(Command::KeyDown(Keystroke::with(
                keys::RIGHT,
                self.extend_mods(),
            )));
            self.state = SelectionState::WordSelecting;
        }
        debug!(state = ?self.state, "selection trigger pressed");
        out
    }

    /// Trigger release closes whichever extension is in flight.
    pub fn on_trigger_release(&mut self) -> Vec<Command> {
        let out = self.close_extension();
        match self.state {
            SelectionState::WordSelecting
            | SelectionState::LineFirstSelecting
            | SelectionState::LineSelecting => {
                self.state = SelectionState::Selected;
            }
            _ => {}
        }
        out
    }

    /// A non-trigger, non-shift key press. From `Selected` the cancel key
    /// collapses and is consumed; anything else abandons the gesture and the
    /// key is forwarded untouched.
    pub fn on_other_press(&mut self, key: KeyId) -> OtherKeyOutcome {
        match self.state {
            SelectionState::Idle => OtherKeyOutcome {
                commands: Vec::new(),
                forward: true,
            },
            SelectionState::Selected if key == self.profile.cancel => {
                debug!("selection collapsed by cancel key");
                self.state = SelectionState::Idle;
                OtherKeyOutcome {
                    commands: vec![Command::Tap(Keystroke::plain(keys::RIGHT))],
                    forward: false,
                }
            }
            _ => {
                // Abandoned mid-gesture or after: undo any held emulation,
                // reset, and let the key through.
                let commands = self.close_extension();
                self.state = SelectionState::Idle;
                OtherKeyOutcome {
                    commands,
                    forward: true,
                }
            }
        }
    }

    /// Scan-cycle callback: a finished selection is forgotten after the idle
    /// window so a much later keystroke doesn't get gesture semantics.
    pub fn tick_idle(&mut self) {
        if self.state == SelectionState::Selected {
            debug!("selection state expired");
            self.state = SelectionState::Idle;
        }
    }

    fn close_extension(&mut self) -> Vec<Command> {
        match self.state {
            SelectionState::WordSelecting => vec![Command::KeyUp(Keystroke::with(
                keys::RIGHT,
                self.extend_mods(),
            ))],
            SelectionState::LineSelecting => vec![Command::KeyUp(Keystroke::with(
                keys::DOWN,
                Modifiers::shift(),
            ))],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SelectWordEngine {
        SelectWordEngine::new(SelectWordProfile::default())
    }

    #[test]
    fn word_gesture_press_then_release() {
        let mut e = engine();
        let cmds = e.on_trigger_press(Modifiers::none());
        assert_eq!(
            cmds,
            vec![
                Command::Tap(Keystroke::with(keys::RIGHT, Modifiers::ctrl())),
                Command::Tap(Keystroke::with(keys::LEFT, Modifiers::ctrl())),
                Command::KeyDown(Keystroke::with(
                    keys::RIGHT,
                    Modifiers::ctrl().union(Modifiers::shift())
                )),
            ]
        );
        assert_eq!(e.state(), SelectionState::WordSelecting);

        let cmds = e.on_trigger_release();
        assert_eq!(
            cmds,
            vec![Command::KeyUp(Keystroke::with(
                keys::RIGHT,
                Modifiers::ctrl().union(Modifiers::shift())
            ))]
        );
        assert_eq!(e.state(), SelectionState::Selected);
    }

    #[test]
    fn second_word_press_skips_repositioning() {
        let mut e = engine();
        e.on_trigger_press(Modifiers::none());
        e.on_trigger_release();
        let cmds = e.on_trigger_press(Modifiers::none());
        assert_eq!(
            cmds,
            vec![Command::KeyDown(Keystroke::with(
                keys::RIGHT,
                Modifiers::ctrl().union(Modifiers::shift())
            ))]
        );
        assert_eq!(e.state(), SelectionState::WordSelecting);
    }

    #[test]
    fn line_gesture_double_press() {
        let mut e = engine();
        let cmds = e.on_trigger_press(Modifiers::shift());
        assert_eq!(
            cmds,
            vec![
                Command::Tap(Keystroke::plain(keys::HOME)),
                Command::Tap(Keystroke::with(keys::END, Modifiers::shift())),
            ]
        );
        assert_eq!(e.state(), SelectionState::LineFirstSelecting);

        // Second press with shift still held extends down a line.
        let cmds = e.on_trigger_press(Modifiers::shift());
        assert_eq!(
            cmds,
            vec![Command::KeyDown(Keystroke::with(
                keys::DOWN,
                Modifiers::shift()
            ))]
        );
        assert_eq!(e.state(), SelectionState::LineSelecting);

        let cmds = e.on_trigger_release();
        assert_eq!(
            cmds,
            vec![Command::KeyUp(Keystroke::with(
                keys::DOWN,
                Modifiers::shift()
            ))]
        );
        assert_eq!(e.state(), SelectionState::Selected);
    }

    #[test]
    fn first_line_release_has_nothing_to_undo() {
        let mut e = engine();
        e.on_trigger_press(Modifiers::shift());
        let cmds = e.on_trigger_release();
        assert!(cmds.is_empty());
        assert_eq!(e.state(), SelectionState::Selected);
    }

    #[test]
    fn cancel_collapses_to_trailing_edge() {
        let mut e = engine();
        e.on_trigger_press(Modifiers::none());
        e.on_trigger_release();
        let outcome = e.on_other_press(keys::ESC);
        assert_eq!(
            outcome.commands,
            vec![Command::Tap(Keystroke::plain(keys::RIGHT))]
        );
        assert!(!outcome.forward);
        assert_eq!(e.state(), SelectionState::Idle);
    }

    #[test]
    fn unrelated_key_resets_and_is_forwarded() {
        let mut e = engine();
        e.on_trigger_press(Modifiers::none());
        e.on_trigger_release();
        let outcome = e.on_other_press(keys::X);
        assert!(outcome.commands.is_empty());
        assert!(outcome.forward);
        assert_eq!(e.state(), SelectionState::Idle);
    }

    #[test]
    fn abandoning_mid_gesture_releases_held_emulation() {
        let mut e = engine();
        e.on_trigger_press(Modifiers::none());
        // A key lands while the trigger is still held.
        let outcome = e.on_other_press(keys::X);
        assert_eq!(
            outcome.commands,
            vec![Command::KeyUp(Keystroke::with(
                keys::RIGHT,
                Modifiers::ctrl().union(Modifiers::shift())
            ))]
        );
        assert!(outcome.forward);
        assert_eq!(e.state(), SelectionState::Idle);
    }

    #[test]
    fn idle_key_passes_straight_through() {
        let mut e = engine();
        let outcome = e.on_other_press(keys::X);
        assert!(outcome.commands.is_empty());
        assert!(outcome.forward);
        assert_eq!(e.state(), SelectionState::Idle);
    }

    #[test]
    fn finished_selection_expires_on_idle_tick() {
        let mut e = engine();
        e.on_trigger_press(Modifiers::none());
        e.on_trigger_release();
        e.tick_idle();
        assert_eq!(e.state(), SelectionState::Idle);
        // The cancel key is now an ordinary key again.
        let outcome = e.on_other_press(keys::ESC);
        assert!(outcome.forward);
    }
}
