//! Slide playback for one loaded story: a single-threaded state machine
//! advancing on a per-slide timer, plus an async driver that owns the one
//! pending timer ([`session`]).

use std::time::Duration;

use serde::Serialize;

use crate::stories::{Slide, StoryResponse};

pub mod session;

pub use session::PlayerSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    Loading,
    Ready,
    Exited,
}

/// Event sources a session reacts to. `TimerExpired` comes from the driver's
/// clock; the rest are user input or the player surface's media-end signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    Next,
    Previous,
    Exit,
    TimerExpired,
    /// A video slide finished natural playback; treated as timer expiry.
    MediaEnded,
}

/// What the driver must do with its timer after a transition. The previous
/// timer is always stale once a transition returns, so the driver drops it
/// before acting on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Schedule(Duration),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideProgress {
    Complete,
    InProgress,
    Pending,
}

/// Everything the player surface needs to render the current instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerFrame {
    pub phase: PlaybackPhase,
    pub current_index: usize,
    pub slide: Option<Slide>,
    pub progress: Vec<SlideProgress>,
    pub error: Option<String>,
}

/// State machine for one playback session. Scoped to exactly one story;
/// holds no timer itself; each transition tells the caller what to do with
/// the clock via [`TimerAction`].
pub struct PlaybackEngine {
    story: Option<StoryResponse>,
    current_index: usize,
    phase: PlaybackPhase,
    error: Option<String>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self {
            story: None,
            current_index: 0,
            phase: PlaybackPhase::Loading,
            error: None,
        }
    }

    /// The fetch succeeded. A story with no slides never enters `Ready`;
    /// it should not have passed create validation, so fail the session
    /// rather than dereference a missing slide.
    pub fn on_loaded(&mut self, story: StoryResponse) -> TimerAction {
        if story.slides.is_empty() {
            self.error = Some("Story has no slides".to_string());
            self.phase = PlaybackPhase::Exited;
            return TimerAction::Stop;
        }

        self.story = Some(story);
        self.current_index = 0;
        self.phase = PlaybackPhase::Ready;
        self.schedule_current()
    }

    /// The fetch failed. Terminal for the session; the message is what the
    /// viewer sees.
    pub fn on_load_failed(&mut self, message: impl Into<String>) -> TimerAction {
        self.error = Some(message.into());
        self.phase = PlaybackPhase::Exited;
        TimerAction::Stop
    }

    /// Exit ends the session from any phase that has not already exited,
    /// including while the story is still loading. Every other input only
    /// applies while `Ready`.
    pub fn handle(&mut self, input: PlayerInput) -> TimerAction {
        match (self.phase, input) {
            (PlaybackPhase::Exited, _) => TimerAction::Stop,
            (_, PlayerInput::Exit) => {
                self.phase = PlaybackPhase::Exited;
                TimerAction::Stop
            }
            (PlaybackPhase::Loading, _) => TimerAction::Stop,
            (
                PlaybackPhase::Ready,
                PlayerInput::Next | PlayerInput::TimerExpired | PlayerInput::MediaEnded,
            ) => self.advance(),
            (PlaybackPhase::Ready, PlayerInput::Previous) => self.rewind(),
        }
    }

    /// Advance past the current slide; past the last slide the story is
    /// complete and the session exits.
    fn advance(&mut self) -> TimerAction {
        if self.current_index + 1 < self.slide_count() {
            self.current_index += 1;
            self.schedule_current()
        } else {
            self.phase = PlaybackPhase::Exited;
            TimerAction::Stop
        }
    }

    /// Step back one slide, restarting its full duration. Backing out of the
    /// first slide exits rather than wrapping.
    fn rewind(&mut self) -> TimerAction {
        if self.current_index > 0 {
            self.current_index -= 1;
            self.schedule_current()
        } else {
            self.phase = PlaybackPhase::Exited;
            TimerAction::Stop
        }
    }

    fn schedule_current(&self) -> TimerAction {
        match self.current_slide() {
            Some(slide) => TimerAction::Schedule(Duration::from_millis(slide.duration_ms as u64)),
            None => TimerAction::Stop,
        }
    }

    fn slide_count(&self) -> usize {
        self.story.as_ref().map_or(0, |story| story.slides.len())
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.story.as_ref()?.slides.get(self.current_index)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Per-slide progress indicators: slides before the current one are
    /// complete, the current one is in progress, the rest pending.
    pub fn progress(&self) -> Vec<SlideProgress> {
        let story = match &self.story {
            Some(story) => story,
            None => return Vec::new(),
        };

        story
            .slides
            .iter()
            .enumerate()
            .map(|(index, _)| {
                if index < self.current_index {
                    SlideProgress::Complete
                } else if index == self.current_index {
                    SlideProgress::InProgress
                } else {
                    SlideProgress::Pending
                }
            })
            .collect()
    }

    pub fn frame(&self) -> PlayerFrame {
        PlayerFrame {
            phase: self.phase,
            current_index: self.current_index,
            slide: self.current_slide().cloned(),
            progress: self.progress(),
            error: self.error.clone(),
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}
