use std::future::Future;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::player::{PlaybackEngine, PlayerFrame, PlayerInput, TimerAction};
use crate::stories::StoryResponse;

/// Handle to a running playback session: an input channel, a watch channel
/// of render frames, and the driver task itself (which resolves to the final
/// engine state once the session exits).
pub struct PlayerSession {
    pub inputs: mpsc::Sender<PlayerInput>,
    pub frames: watch::Receiver<PlayerFrame>,
    pub handle: JoinHandle<PlaybackEngine>,
}

impl PlayerSession {
    /// Spawns the driver. `load` is the session's only suspension point
    /// besides the timer: the initial fetch of the story, with the error
    /// string being the viewer-visible failure message.
    pub fn start<F>(load: F) -> Self
    where
        F: Future<Output = Result<StoryResponse, String>> + Send + 'static,
    {
        let engine = PlaybackEngine::new();
        let (input_tx, input_rx) = mpsc::channel(8);
        let (frame_tx, frame_rx) = watch::channel(engine.frame());
        let handle = tokio::spawn(run(engine, load, input_rx, frame_tx));

        Self {
            inputs: input_tx,
            frames: frame_rx,
            handle,
        }
    }
}

/// Drives one session. The single `deadline` slot is the session's only
/// timer; it is overwritten on every transition, which is what keeps stale
/// timers from firing against a slide that is no longer current.
async fn run(
    mut engine: PlaybackEngine,
    load: impl Future<Output = Result<StoryResponse, String>>,
    mut inputs: mpsc::Receiver<PlayerInput>,
    frames: watch::Sender<PlayerFrame>,
) -> PlaybackEngine {
    let mut action = match load.await {
        Ok(story) => engine.on_loaded(story),
        Err(message) => engine.on_load_failed(message),
    };
    let _ = frames.send(engine.frame());

    loop {
        let deadline = match action {
            TimerAction::Schedule(duration) => Instant::now() + duration,
            // Stop only comes back once the session has exited.
            TimerAction::Stop => break,
        };

        action = tokio::select! {
            _ = tokio::time::sleep_until(deadline) => engine.handle(PlayerInput::TimerExpired),
            input = inputs.recv() => match input {
                Some(input) => engine.handle(input),
                // All input handles dropped: treat as an explicit exit.
                None => engine.handle(PlayerInput::Exit),
            },
        };
        let _ = frames.send(engine.frame());
    }

    engine
}
