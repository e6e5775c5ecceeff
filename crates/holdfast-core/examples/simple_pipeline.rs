use holdfast_core::engine::Pipeline;
use holdfast_core::geometry::{name_of, position_of};
use holdfast_core::profile::{load_profile, Profile};
use holdfast_core::tap_hold::DualRoleKey;
use holdfast_core::types::{keys, KeyEdge, KeyEvent, KeyId, Modifiers, Tick};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Load a profile if one was given, otherwise run a home-row-mods demo.
    let mut profile = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading profile from {path}");
            load_profile(path)?
        }
        None => {
            let mut profile = Profile::default();
            profile.tap_hold.dual_role.extend([
                DualRoleKey::home_row_mod(keys::S, Modifiers::shift()),
                DualRoleKey::home_row_mod(keys::T, Modifiers::ctrl()),
                DualRoleKey::home_row_mod(keys::N, Modifiers::ctrl()),
            ]);
            profile
        }
    };
    profile.tap_hold.timeout_ms = 800;

    let mut pipeline = Pipeline::new(profile)?;

    // A scripted stream: a rolled "st", a deliberate Ctrl+H chord, a repeat
    // of the last stroke, and a select-word gesture.
    let script: &[(KeyId, KeyEdge, u32)] = &[
        (keys::S, KeyEdge::Down, 0),
        (keys::T, KeyEdge::Down, 30),
        (keys::S, KeyEdge::Up, 60),
        (keys::T, KeyEdge::Up, 90),
        (keys::T, KeyEdge::Down, 500),
        (keys::H, KeyEdge::Down, 560),
        (keys::H, KeyEdge::Up, 620),
        (keys::T, KeyEdge::Up, 700),
        (keys::REPEAT, KeyEdge::Down, 1000),
        (keys::REPEAT, KeyEdge::Up, 1050),
        (keys::SELECT_WORD, KeyEdge::Down, 1500),
        (keys::SELECT_WORD, KeyEdge::Up, 1550),
        (keys::ESC, KeyEdge::Down, 1800),
        (keys::ESC, KeyEdge::Up, 1850),
    ];

    for &(key, edge, t_ms) in script {
        let Some(pos) = position_of(key) else {
            println!("{key:?} is not on the demo matrix, skipping");
            continue;
        };
        let label = name_of(key).unwrap_or("?");
        let commands = pipeline.on_transition(KeyEvent {
            key,
            pos,
            edge,
            t: Tick(t_ms),
        });
        println!("{t_ms:>5}ms {label:<12} {edge:?}:");
        for command in commands {
            println!("        -> {command:?}");
        }
        // The scan loop would call this every cycle; once per event is
        // enough to show timeout behavior in a script.
        for command in pipeline.tick(Tick(t_ms)) {
            println!("   tick -> {command:?}");
        }
    }

    Ok(())
}
