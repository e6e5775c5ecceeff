use crate::types::{keys, KeyId, Keystroke, Modifiers};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Modifier condition of an alternate-repeat rule, matched against the
/// modifiers active when the alternate-repeat key fires. Only the shift bit
/// participates; other modifiers fall through to the no-op sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModPredicate {
    NoShift,
    OnlyShift,
    Any,
}

impl ModPredicate {
    pub fn matches(self, mods: Modifiers) -> bool {
        match self {
            ModPredicate::NoShift => !mods.shift && !mods.ctrl && !mods.alt && !mods.gui,
            ModPredicate::OnlyShift => mods.only_shift(),
            ModPredicate::Any => true,
        }
    }
}

/// Substitute produced by an alternate-repeat rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AltRepeatAction {
    Key(Keystroke),
    Text(String),
}

/// One row of the alternate-repeat table: when the remembered key is `key`
/// and the firing modifiers satisfy `when`, produce `out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltRepeatRule {
    pub key: KeyId,
    pub when: ModPredicate,
    pub out: AltRepeatAction,
}

impl AltRepeatRule {
    pub fn key_out(key: KeyId, when: ModPredicate, out: Keystroke) -> Self {
        Self {
            key,
            when,
            out: AltRepeatAction::Key(out),
        }
    }

    pub fn text_out(key: KeyId, when: ModPredicate, out: &str) -> Self {
        Self {
            key,
            when,
            out: AltRepeatAction::Text(out.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatProfile {
    pub repeat_key: KeyId,
    pub alt_repeat_key: KeyId,
    /// Ordered: the first rule whose (key, predicate) matches wins. Keep the
    /// more specific predicate above `Any` for the same key.
    pub rules: Vec<AltRepeatRule>,
}

impl Default for RepeatProfile {
    fn default() -> Self {
        Self {
            repeat_key: keys::REPEAT,
            alt_repeat_key: keys::ALT_REPEAT,
            rules: default_rules(),
        }
    }
}

/// Built-in table: the N shift-toggle pair plus the vowel bigram shortcuts.
fn default_rules() -> Vec<AltRepeatRule> {
    vec![
        AltRepeatRule::key_out(
            keys::N,
            ModPredicate::NoShift,
            Keystroke::with(keys::N, Modifiers::shift()),
        ),
        AltRepeatRule::key_out(keys::N, ModPredicate::OnlyShift, Keystroke::plain(keys::N)),
        AltRepeatRule::text_out(keys::O, ModPredicate::NoShift, "a"),
        AltRepeatRule::text_out(keys::A, ModPredicate::NoShift, "o"),
        AltRepeatRule::text_out(keys::E, ModPredicate::NoShift, "u"),
        AltRepeatRule::text_out(keys::U, ModPredicate::NoShift, "e"),
    ]
}

/// Remembers the last dispatched repeatable keystroke and answers the
/// repeat / alternate-repeat queries.
#[derive(Debug, Clone)]
pub struct RepeatEngine {
    rules: Vec<AltRepeatRule>,
    memory: Option<Keystroke>,
}

impl RepeatEngine {
    pub fn new(rules: Vec<AltRepeatRule>) -> Self {
        Self {
            rules,
            memory: None,
        }
    }

    /// True for keys whose strokes are worth remembering: everything except
    /// dedicated modifiers and the synthetic trigger keys.
    pub fn is_repeatable(key: KeyId) -> bool {
        !key.is_modifier() && !key.is_synthetic()
    }

    /// Record the latest dispatched keystroke. Non-repeatable keys leave the
    /// memory untouched, so a modifier tap never shadows the real last key.
    pub fn record(&mut self, stroke: Keystroke) {
        if Self::is_repeatable(stroke.key) {
            self.memory = Some(stroke);
        }
    }

    /// The last recorded pair, unchanged. Idempotent.
    pub fn last(&self) -> Option<Keystroke> {
        self.memory
    }

    pub fn clear(&mut self) {
        self.memory = None;
    }

    /// Pure table lookup for the alternate repeat. `None` is the explicit
    /// no-op sentinel: the dispatcher does nothing, never a default stroke.
    pub fn alt_lookup(&self, current_mods: Modifiers) -> Option<&AltRepeatAction> {
        let remembered = self.memory?;
        self.rules
            .iter()
            .find(|r| r.key == remembered.key && r.when.matches(current_mods))
            .map(|r| &r.out)
    }

    /// Alternate repeat as fired from the trigger key. Performs the lookup,
    /// then applies the bigram follow-up rule: a plain-letter substitute for
    /// a remembered letter fired with at most shift rewrites the memory to a
    /// bare N, so the next plain repeat completes the two-letter pattern.
    pub fn take_alt(&mut self, current_mods: Modifiers) -> Option<AltRepeatAction> {
        let result = self.alt_lookup(current_mods).cloned();
        if let Some(AltRepeatAction::Key(out)) = &result {
            let remembered_letter = self.memory.map_or(false, |m| m.key.is_letter());
            if out.key.is_letter()
                && out.mods.is_empty()
                && remembered_letter
                && (current_mods.is_empty() || current_mods.only_shift())
            {
                debug!("alt repeat rewrote memory to the bigram sentinel");
                self.memory = Some(Keystroke::plain(keys::N));
            }
        }
        result
    }
}
