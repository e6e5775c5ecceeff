use crate::geometry::Geometry;
use crate::repeat::RepeatProfile;
use crate::select_word::SelectWordProfile;
use crate::tap_hold::TapHoldProfile;
use crate::types::{keys, KeyId, Keystroke, Modifiers};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Custom shifted pair: with shift held (and nothing else), `key` produces
/// `out` instead of its ordinary shifted symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftOverride {
    pub key: KeyId,
    pub out: Keystroke,
}

/// Shift . is ?, Shift , is !, and = and / stay themselves.
fn default_shift_overrides() -> Vec<ShiftOverride> {
    vec![
        ShiftOverride {
            key: keys::DOT,
            out: Keystroke::with(keys::SLASH, Modifiers::shift()),
        },
        ShiftOverride {
            key: keys::COMMA,
            out: Keystroke::with(keys::N1, Modifiers::shift()),
        },
        ShiftOverride {
            key: keys::EQUAL,
            out: Keystroke::plain(keys::EQUAL),
        },
        ShiftOverride {
            key: keys::SLASH,
            out: Keystroke::plain(keys::SLASH),
        },
    ]
}

/// Aggregate configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub geometry: Geometry,
    pub tap_hold: TapHoldProfile,
    pub repeat: RepeatProfile,
    pub select: SelectWordProfile,
    #[serde(default = "default_shift_overrides")]
    pub shift_overrides: Vec<ShiftOverride>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            tap_hold: TapHoldProfile::default(),
            repeat: RepeatProfile::default(),
            select: SelectWordProfile::default(),
            shift_overrides: default_shift_overrides(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("key {key:#06x} is configured as both {first} and {second}")]
    ConflictingRoles {
        key: u16,
        first: &'static str,
        second: &'static str,
    },
    #[error("dual-role key {0:#06x} is listed more than once")]
    DuplicateDualRole(u16),
}

impl Profile {
    /// Setup-time validation: a key bound to more than one special role is a
    /// configuration error, never resolved by precedence at run time.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut roles: HashMap<KeyId, &'static str> = HashMap::new();

        let claim = |roles: &mut HashMap<KeyId, &'static str>,
                     key: KeyId,
                     role: &'static str|
         -> Result<(), ProfileError> {
            if let Some(prev) = roles.insert(key, role) {
                return Err(ProfileError::ConflictingRoles {
                    key: key.0,
                    first: prev,
                    second: role,
                });
            }
            Ok(())
        };

        for dual in &self.tap_hold.dual_role {
            if roles.get(&dual.key) == Some(&"dual-role") {
                return Err(ProfileError::DuplicateDualRole(dual.key.0));
            }
            claim(&mut roles, dual.key, "dual-role")?;
        }
        claim(&mut roles, self.select.trigger, "select trigger")?;
        claim(&mut roles, self.repeat.repeat_key, "repeat trigger")?;
        claim(&mut roles, self.repeat.alt_repeat_key, "alternate repeat trigger")?;
        Ok(())
    }
}

/// Load and validate a profile from a TOML file.
pub fn load_profile<P: AsRef<Path>>(path: P) -> Result<Profile> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading profile {}", path.display()))?;
    let profile: Profile = toml::from_str(&text)
        .with_context(|| format!("parsing profile {}", path.display()))?;
    profile.validate()?;
    info!(
        dual_role = profile.tap_hold.dual_role.len(),
        rules = profile.repeat.rules.len(),
        "profile loaded"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tap_hold::DualRoleKey;

    #[test]
    fn default_profile_validates() {
        assert_eq!(Profile::default().validate(), Ok(()));
    }

    #[test]
    fn dual_role_select_trigger_collision_is_rejected() {
        let mut p = Profile::default();
        p.tap_hold
            .dual_role
            .push(DualRoleKey::home_row_mod(keys::T, Modifiers::ctrl()));
        p.select.trigger = keys::T;
        assert_eq!(
            p.validate(),
            Err(ProfileError::ConflictingRoles {
                key: keys::T.0,
                first: "dual-role",
                second: "select trigger",
            })
        );
    }

    #[test]
    fn duplicate_dual_role_is_rejected() {
        let mut p = Profile::default();
        p.tap_hold
            .dual_role
            .push(DualRoleKey::home_row_mod(keys::T, Modifiers::ctrl()));
        p.tap_hold
            .dual_role
            .push(DualRoleKey::home_row_mod(keys::T, Modifiers::shift()));
        assert_eq!(
            p.validate(),
            Err(ProfileError::DuplicateDualRole(keys::T.0))
        );
    }

    #[test]
    fn profile_round_trips_through_toml() {
        let mut p = Profile::default();
        p.tap_hold
            .dual_role
            .push(DualRoleKey::home_row_mod(keys::T, Modifiers::ctrl()));
        p.tap_hold.always_hold.insert(keys::A);
        let text = toml::to_string(&p).expect("serialize profile");
        let back: Profile = toml::from_str(&text).expect("parse profile");
        assert_eq!(back.tap_hold.dual_role.len(), 1);
        assert_eq!(back.tap_hold.timeout_ms, p.tap_hold.timeout_ms);
        assert!(back.tap_hold.always_hold.contains(&keys::A));
        assert_eq!(back.repeat.rules, p.repeat.rules);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let p: Profile = toml::from_str("").expect("empty profile");
        assert_eq!(p.tap_hold.timeout_ms, 800);
        assert_eq!(p.select.trigger, keys::SELECT_WORD);
        assert_eq!(p.validate(), Ok(()));
    }
}
