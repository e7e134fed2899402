use serde::{Deserialize, Serialize};

use crate::question::{Mode, Part, Question};

/// Mutually exclusive states of the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomState {
    /// Waiting for the user to press play.
    Idle,
    /// The question cue is playing.
    PlayingAudio,
    /// Fixed break between parts; a blocking modal hides the next part.
    Break,
    /// Part-2 preparation countdown.
    Preparing,
    /// Capturing the answer.
    Recording,
    /// Question completed, waiting for the user to advance.
    Finished,
}

/// Which phase the single active countdown belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownKind {
    Break,
    Prep,
    Speak,
}

/// The one active countdown, tied 1:1 to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub kind: CountdownKind,
    pub remaining: u32,
}

/// Inputs the machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// User pressed play. Only honored in `Idle`.
    PlayPressed,
    /// The question cue finished (or the question had no cue).
    CueFinished,
    /// Practice only: skip the part-2 preparation countdown.
    SkipPreparation,
    /// One second elapsed.
    Tick,
    /// User advanced from the finished card.
    Advance,
    /// Practice only: leave an active recording for the next question.
    SkipToNext,
    /// The recording controller reported a successful start or resume.
    RecordingStarted,
    /// The recording controller could not start; the room halts here.
    RecordingFailed,
}

/// Side effects the machine asks the orchestrator to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    /// Play the current question's cue, pausing any live recording first.
    PlayCue,
    /// Start or resume capture, then report `RecordingStarted`/`Failed`.
    StartRecording,
    /// Pause the live capture. Device errors are ignorable here.
    PauseRecording,
    /// Practice-mode part boundary: finalize the handle and submit the part
    /// just completed.
    FinalizePart { part: Part },
    /// End of flow: finalize, submit everything in scope, complete the
    /// room.
    FinalizeSession,
}

/// Pure state machine for one room. All mutation goes through [`apply`];
/// device and network work comes back as [`RoomAction`]s for the owner to
/// execute.
///
/// [`apply`]: RoomMachine::apply
pub struct RoomMachine {
    mode: Mode,
    questions: Vec<Question>,
    index: usize,
    state: RoomState,
    countdown: Option<Countdown>,
    break_secs: u32,
    complete: bool,
    halted: bool,
}

impl RoomMachine {
    pub fn new(mode: Mode, questions: Vec<Question>, break_secs: u32) -> Self {
        Self {
            mode,
            questions,
            index: 0,
            state: RoomState::Idle,
            countdown: None,
            break_secs,
            complete: false,
            halted: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    pub fn question_index(&self) -> usize {
        self.index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    /// The last recording has been finalized and handed off.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Recording could not start; the flow stopped at the current question.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Feed one event through the transition table. Events that are not
    /// legal in the current state are ignored and produce no actions.
    pub fn apply(&mut self, event: RoomEvent) -> Vec<RoomAction> {
        if self.complete || self.halted {
            return Vec::new();
        }

        match event {
            RoomEvent::PlayPressed => self.on_play(),
            RoomEvent::CueFinished => self.on_cue_finished(),
            RoomEvent::SkipPreparation => self.on_skip_preparation(),
            RoomEvent::Tick => self.on_tick(),
            RoomEvent::Advance => self.on_advance(),
            RoomEvent::SkipToNext => self.on_skip_to_next(),
            RoomEvent::RecordingStarted => self.on_recording_started(),
            RoomEvent::RecordingFailed => {
                self.halted = true;
                self.countdown = None;
                Vec::new()
            }
        }
    }

    fn on_play(&mut self) -> Vec<RoomAction> {
        if self.state != RoomState::Idle || self.current_question().is_none() {
            return Vec::new();
        }

        self.state = RoomState::PlayingAudio;
        vec![RoomAction::PlayCue]
    }

    fn on_cue_finished(&mut self) -> Vec<RoomAction> {
        if self.state != RoomState::PlayingAudio {
            return Vec::new();
        }
        let Some(question) = self.current_question() else {
            return Vec::new();
        };

        // Only part 2 prepares; parts 1 and 3 answer immediately.
        if question.part == Part::Two && question.prep_secs > 0 {
            self.countdown = Some(Countdown {
                kind: CountdownKind::Prep,
                remaining: question.prep_secs,
            });
            self.state = RoomState::Preparing;
            Vec::new()
        } else {
            vec![RoomAction::StartRecording]
        }
    }

    fn on_skip_preparation(&mut self) -> Vec<RoomAction> {
        if self.mode != Mode::Practice || self.state != RoomState::Preparing {
            return Vec::new();
        }

        self.countdown = None;
        vec![RoomAction::StartRecording]
    }

    fn on_recording_started(&mut self) -> Vec<RoomAction> {
        // Reached from the cue (parts 1/3), from preparation (part 2), or
        // from a resume after a same-part advance.
        if !matches!(self.state, RoomState::PlayingAudio | RoomState::Preparing) {
            return Vec::new();
        }
        let Some(question) = self.current_question() else {
            return Vec::new();
        };

        self.countdown = Some(Countdown {
            kind: CountdownKind::Speak,
            remaining: question.speak_secs,
        });
        self.state = RoomState::Recording;
        Vec::new()
    }

    fn on_tick(&mut self) -> Vec<RoomAction> {
        let Some(countdown) = self.countdown.as_mut() else {
            return Vec::new();
        };

        countdown.remaining = countdown.remaining.saturating_sub(1);
        if countdown.remaining > 0 {
            return Vec::new();
        }

        // Reaching zero triggers the phase transition exactly once.
        let kind = countdown.kind;
        self.countdown = None;

        match kind {
            CountdownKind::Break => {
                self.state = RoomState::Idle;
                Vec::new()
            }
            CountdownKind::Prep => vec![RoomAction::StartRecording],
            CountdownKind::Speak => self.on_speak_elapsed(),
        }
    }

    fn on_speak_elapsed(&mut self) -> Vec<RoomAction> {
        self.state = RoomState::Finished;

        if self.has_next_in_same_part() {
            // The answer keeps accumulating across same-part questions.
            Vec::new()
        } else {
            vec![RoomAction::PauseRecording]
        }
    }

    fn on_advance(&mut self) -> Vec<RoomAction> {
        if self.state != RoomState::Finished {
            return Vec::new();
        }
        self.advance()
    }

    fn on_skip_to_next(&mut self) -> Vec<RoomAction> {
        if self.mode != Mode::Practice || self.state != RoomState::Recording {
            return Vec::new();
        }

        self.countdown = None;
        self.state = RoomState::Finished;
        self.advance()
    }

    fn advance(&mut self) -> Vec<RoomAction> {
        let Some(current_part) = self.current_question().map(|q| q.part) else {
            return Vec::new();
        };

        match self.questions.get(self.index + 1).map(|q| q.part) {
            Some(next_part) if next_part == current_part => {
                // Same part: keep the recording running, back to idle for
                // the next question.
                self.index += 1;
                self.state = RoomState::Idle;
                self.countdown = None;
                Vec::new()
            }
            Some(_) => {
                // Part boundary: pause, submit the finished part in
                // practice mode, and hold a break before the next part.
                self.index += 1;
                self.state = RoomState::Break;
                self.countdown = Some(Countdown {
                    kind: CountdownKind::Break,
                    remaining: self.break_secs,
                });

                let mut actions = vec![RoomAction::PauseRecording];
                if self.mode == Mode::Practice {
                    actions.push(RoomAction::FinalizePart { part: current_part });
                }
                actions
            }
            None => {
                // No next question: the flow ends here.
                self.complete = true;
                self.state = RoomState::Finished;
                self.countdown = None;
                vec![RoomAction::PauseRecording, RoomAction::FinalizeSession]
            }
        }
    }

    fn has_next_in_same_part(&self) -> bool {
        match (
            self.questions.get(self.index),
            self.questions.get(self.index + 1),
        ) {
            (Some(current), Some(next)) => current.part == next.part,
            _ => false,
        }
    }
}
