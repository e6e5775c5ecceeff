use holdfast_core::engine::Pipeline;
use holdfast_core::geometry::position_of;
use holdfast_core::profile::Profile;
use holdfast_core::tap_hold::DualRoleKey;
use holdfast_core::types::{keys, Command, KeyEdge, KeyEvent, KeyId, Modifiers, Tick};

fn home_row_pipeline() -> Pipeline {
    let mut profile = Profile::default();
    profile.tap_hold.dual_role.extend([
        DualRoleKey::home_row_mod(keys::A, Modifiers::gui()),
        DualRoleKey::home_row_mod(keys::R, Modifiers::alt()),
        DualRoleKey::home_row_mod(keys::S, Modifiers::shift()),
        DualRoleKey::home_row_mod(keys::T, Modifiers::ctrl()),
        DualRoleKey::home_row_mod(keys::N, Modifiers::ctrl()),
        DualRoleKey::home_row_mod(keys::E, Modifiers::shift()),
    ]);
    Pipeline::new(profile).expect("valid profile")
}

fn run(pipeline: &mut Pipeline, key: KeyId, edge: KeyEdge, t_ms: u32, all: &mut Vec<Command>) {
    let event = KeyEvent {
        key,
        pos: position_of(key).expect("key not in default matrix"),
        edge,
        t: Tick(t_ms),
    };
    all.extend(pipeline.on_transition(event));
}

fn collect_downs(commands: &[Command]) -> Vec<KeyId> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::KeyDown(ks) => Some(ks.key),
            _ => None,
        })
        .collect()
}

#[test]
fn fast_roll_across_home_row_mods_drops_nothing() {
    let mut p = home_row_pipeline();
    let mut all = Vec::new();

    // "star" rolled quickly: every key overlaps the next, all on the left
    // hand, so each dual-role key must come out as its tap.
    run(&mut p, keys::S, KeyEdge::Down, 0, &mut all);
    run(&mut p, keys::T, KeyEdge::Down, 20, &mut all);
    run(&mut p, keys::S, KeyEdge::Up, 40, &mut all);
    run(&mut p, keys::A, KeyEdge::Down, 50, &mut all);
    run(&mut p, keys::T, KeyEdge::Up, 70, &mut all);
    run(&mut p, keys::R, KeyEdge::Down, 80, &mut all);
    run(&mut p, keys::A, KeyEdge::Up, 100, &mut all);
    run(&mut p, keys::R, KeyEdge::Up, 120, &mut all);

    assert_eq!(collect_downs(&all), vec![keys::S, keys::T, keys::A, keys::R]);
    // No hold ever activated during the roll.
    assert!(all
        .iter()
        .all(|c| !matches!(c, Command::ModsDown(_) | Command::ModsUp(_))));
}

#[test]
fn cross_hand_chord_inside_a_roll_still_holds() {
    let mut p = home_row_pipeline();
    let mut all = Vec::new();

    // Left-hand T held, right-hand H pressed: deliberate chord.
    run(&mut p, keys::T, KeyEdge::Down, 0, &mut all);
    run(&mut p, keys::H, KeyEdge::Down, 60, &mut all);
    run(&mut p, keys::H, KeyEdge::Up, 120, &mut all);
    run(&mut p, keys::T, KeyEdge::Up, 180, &mut all);

    assert_eq!(
        all,
        vec![
            Command::ModsDown(Modifiers::ctrl()),
            Command::KeyDown(holdfast_core::Keystroke::with(keys::H, Modifiers::ctrl())),
            Command::KeyUp(holdfast_core::Keystroke::with(keys::H, Modifiers::ctrl())),
            Command::ModsUp(Modifiers::ctrl()),
        ]
    );
}

#[test]
fn delayed_release_of_first_key_does_not_drop_the_second() {
    let mut p = home_row_pipeline();
    let mut all = Vec::new();

    // T is still down when G starts and finishes; G's events ride through
    // the arbitration window untouched.
    run(&mut p, keys::T, KeyEdge::Down, 0, &mut all);
    run(&mut p, keys::G, KeyEdge::Down, 25, &mut all);
    run(&mut p, keys::G, KeyEdge::Up, 55, &mut all);
    run(&mut p, keys::T, KeyEdge::Up, 200, &mut all);

    assert_eq!(collect_downs(&all), vec![keys::T, keys::G]);
    let ups: Vec<KeyId> = all
        .iter()
        .filter_map(|c| match c {
            Command::KeyUp(ks) => Some(ks.key),
            _ => None,
        })
        .collect();
    assert_eq!(ups, vec![keys::G, keys::T]);
}

#[test]
fn repeat_key_replays_a_dual_role_tap() {
    let mut p = home_row_pipeline();
    let mut all = Vec::new();

    run(&mut p, keys::T, KeyEdge::Down, 0, &mut all);
    run(&mut p, keys::T, KeyEdge::Up, 40, &mut all);
    run(&mut p, keys::REPEAT, KeyEdge::Down, 300, &mut all);
    run(&mut p, keys::REPEAT, KeyEdge::Up, 340, &mut all);

    assert_eq!(
        collect_downs(&all),
        vec![keys::T, keys::T],
        "repeat should replay the tap of the dual-role key"
    );
}

#[test]
fn select_word_survives_a_preceding_chord() {
    let mut p = home_row_pipeline();
    let mut all = Vec::new();

    // Ctrl+H via chord, then a word selection, then typing resumes.
    run(&mut p, keys::T, KeyEdge::Down, 0, &mut all);
    run(&mut p, keys::H, KeyEdge::Down, 50, &mut all);
    run(&mut p, keys::H, KeyEdge::Up, 90, &mut all);
    run(&mut p, keys::T, KeyEdge::Up, 130, &mut all);

    all.clear();
    run(&mut p, keys::SELECT_WORD, KeyEdge::Down, 200, &mut all);
    run(&mut p, keys::SELECT_WORD, KeyEdge::Up, 240, &mut all);
    assert!(all
        .iter()
        .any(|c| matches!(c, Command::KeyDown(ks) if ks.key == keys::RIGHT)));

    all.clear();
    run(&mut p, keys::Q, KeyEdge::Down, 300, &mut all);
    run(&mut p, keys::Q, KeyEdge::Up, 340, &mut all);
    assert_eq!(collect_downs(&all), vec![keys::Q]);
}
