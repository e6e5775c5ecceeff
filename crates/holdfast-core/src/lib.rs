pub mod engine;
pub mod geometry;
pub mod host;
pub mod profile;
pub mod repeat;
pub mod select_word;
pub mod tap_hold;
pub mod types;

pub use engine::Pipeline;
pub use geometry::DEFAULT_MATRIX;
pub use profile::{load_profile, Profile, ProfileError};
pub use types::{Command, KeyEvent, KeyId, Keystroke, Modifiers, Tick};
