use crate::engine::Pipeline;
use crate::types::{Command, KeyEvent, Tick};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Shared handle the scan callback and the tick timer both drive.
///
/// The matrix side calls [`InputHost::on_transition`] / [`InputHost::poll`];
/// the dispatcher side drains the returned [`Receiver`] and turns commands
/// into HID reports. The pipeline itself stays single-threaded behind the
/// lock; the channel is only the hand-off point between the two sides.
#[derive(Clone)]
pub struct InputHost {
    pipeline: Arc<Mutex<Pipeline>>,
    tx: Sender<Command>,
}

impl InputHost {
    pub fn new(pipeline: Pipeline) -> (Self, Receiver<Command>) {
        let (tx, rx) = unbounded();
        (
            Self {
                pipeline: Arc::new(Mutex::new(pipeline)),
                tx,
            },
            rx,
        )
    }

    /// Raw key transition from the matrix scanner.
    pub fn on_transition(&self, event: KeyEvent) {
        let commands = self.pipeline.lock().on_transition(event);
        self.dispatch(commands);
    }

    /// Once-per-scan-cycle poll; drives timeout expiry.
    pub fn poll(&self, now: Tick) {
        let commands = self.pipeline.lock().tick(now);
        self.dispatch(commands);
    }

    /// Run a closure against the pipeline (profile queries, modifier-state
    /// feedback, installing hooks).
    pub fn with_pipeline<R>(&self, f: impl FnOnce(&mut Pipeline) -> R) -> R {
        f(&mut self.pipeline.lock())
    }

    fn dispatch(&self, commands: Vec<Command>) {
        for command in commands {
            if self.tx.send(command).is_err() {
                warn!("command receiver dropped, output discarded");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::position_of;
    use crate::profile::Profile;
    use crate::tap_hold::DualRoleKey;
    use crate::types::{keys, KeyEdge, Keystroke, Modifiers};

    #[test]
    fn transitions_arrive_on_the_dispatcher_side() {
        let mut profile = Profile::default();
        profile
            .tap_hold
            .dual_role
            .push(DualRoleKey::home_row_mod(keys::T, Modifiers::ctrl()));
        let pipeline = Pipeline::new(profile).expect("valid profile");
        let (host, rx) = InputHost::new(pipeline);

        let pos = position_of(keys::A).unwrap();
        host.on_transition(KeyEvent {
            key: keys::A,
            pos,
            edge: KeyEdge::Down,
            t: Tick(0),
        });
        host.on_transition(KeyEvent {
            key: keys::A,
            pos,
            edge: KeyEdge::Up,
            t: Tick(30),
        });

        assert_eq!(rx.recv().unwrap(), Command::KeyDown(Keystroke::plain(keys::A)));
        assert_eq!(rx.recv().unwrap(), Command::KeyUp(Keystroke::plain(keys::A)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn poll_delivers_timeout_holds() {
        let mut profile = Profile::default();
        profile
            .tap_hold
            .dual_role
            .push(DualRoleKey::home_row_mod(keys::T, Modifiers::ctrl()));
        let pipeline = Pipeline::new(profile).expect("valid profile");
        let (host, rx) = InputHost::new(pipeline);

        host.on_transition(KeyEvent {
            key: keys::T,
            pos: position_of(keys::T).unwrap(),
            edge: KeyEdge::Down,
            t: Tick(0),
        });
        host.poll(Tick(800));
        assert_eq!(rx.recv().unwrap(), Command::ModsDown(Modifiers::ctrl()));
    }
}
