//! Speech Input Controller
//!
//! Wraps a host speech-to-text capability behind a small state machine:
//!
//! ```text
//! Idle --start()--> Recording --result / error / end / stop()--> Idle
//! ```
//!
//! One recognition pass yields at most one utterance. The capability itself is
//! injected through [`SpeechRecognizer`], so tests can drive the controller
//! with a scripted recognizer and the terminal build can shell out to an
//! external speech-to-text command ([`CommandRecognizer`]).
//!
//! Voice input is best effort. Only a missing capability and a permission
//! denial are reported to the user; every other recognition error drops back
//! to `Idle` and is only logged.

use std::process::Stdio;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Exit status an external recognizer uses to signal a permission denial
/// (`EX_NOPERM` from sysexits.h)
pub const EXIT_PERMISSION_DENIED: i32 = 77;

/// Capacity of the per-pass event channel
const EVENT_CAPACITY: usize = 16;

/// Recognition parameters for a single pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// BCP-47 language tag
    pub lang: String,
    /// Keep listening after the first utterance
    pub continuous: bool,
    /// Deliver partial transcripts
    pub interim_results: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            continuous: false,
            interim_results: false,
        }
    }
}

impl RecognitionOptions {
    /// Single-utterance options for a language
    pub fn single_utterance(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            ..Default::default()
        }
    }
}

/// One candidate transcript; recognizers list them best first
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechAlternative {
    /// Recognized text
    pub transcript: String,
}

impl SpeechAlternative {
    /// Create an alternative
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

/// Recognition error kinds reported by the capability
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// Microphone permission was refused
    NotAllowed,
    /// Nothing was heard
    NoSpeech,
    /// The pass was aborted
    Aborted,
    /// Audio device failure
    AudioCapture,
    /// Network failure of a remote recognizer
    Network,
    /// Anything else
    Other(String),
}

/// Events delivered by the capability during one pass
#[derive(Clone, Debug, PartialEq)]
pub enum SpeechEvent {
    /// A final result; alternatives are ordered best-first
    Result(Vec<SpeechAlternative>),
    /// Recognition failed
    Error(SpeechErrorKind),
    /// Recognition ended
    End,
}

/// Errors returned by [`SpeechController::start`]
#[derive(Debug, Error)]
pub enum SpeechError {
    /// No speech recognition capability is available
    #[error("Voice input not supported here. Configure a speech command to enable it.")]
    UnsupportedCapability,

    /// The capability exists but could not start a pass
    #[error("Failed to start speech recognition: {0}")]
    StartFailed(String),
}

/// Host speech-to-text capability
pub trait SpeechRecognizer: Send {
    /// Capability name for logs
    fn name(&self) -> &str;

    /// Begin one recognition pass; events are sent on `events`
    fn start(
        &mut self,
        options: &RecognitionOptions,
        events: mpsc::Sender<SpeechEvent>,
    ) -> Result<(), SpeechError>;

    /// Stop the pass immediately without delivering a result
    fn abort(&mut self);
}

/// Controller state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeechState {
    /// Not listening
    #[default]
    Idle,
    /// A recognition pass is active
    Recording,
}

/// What a finished pass means for the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Best transcript of the utterance
    Transcript(String),
    /// The microphone permission was refused
    PermissionDenied,
    /// The pass ended with nothing to deliver
    Ended,
}

/// Speech input state machine over an optional recognizer
pub struct SpeechController {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    options: RecognitionOptions,
    state: SpeechState,
    events: Option<mpsc::Receiver<SpeechEvent>>,
}

impl SpeechController {
    /// Create a controller; `None` means the host offers no capability
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>, options: RecognitionOptions) -> Self {
        Self {
            recognizer,
            options,
            state: SpeechState::Idle,
            events: None,
        }
    }

    /// Controller without a capability
    #[must_use]
    pub fn unsupported() -> Self {
        Self::new(None, RecognitionOptions::default())
    }

    /// Whether a capability is installed
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SpeechState {
        self.state
    }

    /// Whether a pass is active
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state == SpeechState::Recording
    }

    /// Start a single-utterance pass
    ///
    /// Returns `Ok(false)` when already recording (no second session is
    /// started).
    ///
    /// # Errors
    ///
    /// [`SpeechError::UnsupportedCapability`] without a recognizer, or the
    /// recognizer's own start failure.
    pub fn start(&mut self) -> Result<bool, SpeechError> {
        if self.is_recording() {
            return Ok(false);
        }
        let recognizer = self
            .recognizer
            .as_mut()
            .ok_or(SpeechError::UnsupportedCapability)?;

        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        recognizer.start(&self.options, tx)?;

        tracing::debug!(recognizer = recognizer.name(), lang = %self.options.lang, "Speech recognition started");
        self.events = Some(rx);
        self.state = SpeechState::Recording;
        Ok(true)
    }

    /// Abort the active pass; no transcript is delivered
    ///
    /// Returns whether a pass was actually stopped.
    pub fn stop(&mut self) -> bool {
        if !self.is_recording() {
            return false;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.abort();
        }
        self.finish();
        tracing::debug!("Speech recognition stopped by user");
        true
    }

    /// Drain pending events without blocking
    pub fn poll(&mut self) -> Option<SpeechOutcome> {
        loop {
            let event = match self.events.as_mut()?.try_recv() {
                Ok(event) => event,
                Err(mpsc::error::TryRecvError::Empty) => return None,
                Err(mpsc::error::TryRecvError::Disconnected) => SpeechEvent::End,
            };
            if let Some(outcome) = self.handle_event(event) {
                return Some(outcome);
            }
        }
    }

    /// Wait for the active pass to finish
    pub async fn next_outcome(&mut self) -> Option<SpeechOutcome> {
        loop {
            let event = self.events.as_mut()?.recv().await.unwrap_or(SpeechEvent::End);
            if let Some(outcome) = self.handle_event(event) {
                return Some(outcome);
            }
        }
    }

    /// Apply one capability event
    ///
    /// Events arriving while `Idle` belong to a stopped pass and are dropped.
    pub fn handle_event(&mut self, event: SpeechEvent) -> Option<SpeechOutcome> {
        if !self.is_recording() {
            return None;
        }

        let outcome = match event {
            SpeechEvent::Result(alternatives) => {
                match alternatives
                    .into_iter()
                    .map(|alt| alt.transcript.trim().to_string())
                    .find(|text| !text.is_empty())
                {
                    Some(text) => SpeechOutcome::Transcript(text),
                    None => SpeechOutcome::Ended,
                }
            }
            SpeechEvent::Error(SpeechErrorKind::NotAllowed) => {
                tracing::warn!("Speech recognition denied microphone access");
                SpeechOutcome::PermissionDenied
            }
            SpeechEvent::Error(kind) => {
                tracing::debug!(error = ?kind, "Speech recognition error");
                SpeechOutcome::Ended
            }
            SpeechEvent::End => SpeechOutcome::Ended,
        };

        self.finish();
        Some(outcome)
    }

    /// Abort any active pass (session teardown)
    pub fn shutdown(&mut self) {
        self.stop();
    }

    fn finish(&mut self) {
        self.state = SpeechState::Idle;
        self.events = None;
    }
}

impl Drop for SpeechController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Recognizer that runs an external speech-to-text command
///
/// The command listens for one utterance and prints candidate transcripts to
/// stdout, one per line, best first. The language tag is passed in the
/// `STOCK_ELF_SPEECH_LANG` environment variable. Exit status 77 means the
/// microphone permission was refused.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    task: Option<JoinHandle<()>>,
}

impl CommandRecognizer {
    /// Create from a program and its arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            task: None,
        }
    }

    /// Create from an argv list; `None` when empty
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    fn parse_output(stdout: &[u8]) -> SpeechEvent {
        let alternatives: Vec<SpeechAlternative> = String::from_utf8_lossy(stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(SpeechAlternative::new)
            .collect();

        if alternatives.is_empty() {
            SpeechEvent::Error(SpeechErrorKind::NoSpeech)
        } else {
            SpeechEvent::Result(alternatives)
        }
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn start(
        &mut self,
        options: &RecognitionOptions,
        events: mpsc::Sender<SpeechEvent>,
    ) -> Result<(), SpeechError> {
        self.abort();

        let spawned = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .env("STOCK_ELF_SPEECH_LANG", &options.lang)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let child = spawned
            .map_err(|e| SpeechError::StartFailed(format!("{}: {e}", self.program)))?;

        // Dropping the task drops the child, which kills it
        self.task = Some(tokio::spawn(async move {
            let event = match child.wait_with_output().await {
                Ok(output) if output.status.success() => Self::parse_output(&output.stdout),
                Ok(output) if output.status.code() == Some(EXIT_PERMISSION_DENIED) => {
                    SpeechEvent::Error(SpeechErrorKind::NotAllowed)
                }
                Ok(output) => SpeechEvent::Error(SpeechErrorKind::Other(format!(
                    "recognizer exited with {}",
                    output.status
                ))),
                Err(e) => {
                    tracing::debug!(error = %e, "Speech command failed while capturing");
                    SpeechEvent::Error(SpeechErrorKind::AudioCapture)
                }
            };
            if events.send(event).await.is_ok() {
                let _ = events.send(SpeechEvent::End).await;
            }
        }));

        Ok(())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CommandRecognizer {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recognizer that hands its event sender to the test
    #[derive(Clone, Default)]
    struct ScriptedRecognizer {
        sender: Arc<Mutex<Option<mpsc::Sender<SpeechEvent>>>>,
        starts: Arc<Mutex<u32>>,
        aborts: Arc<Mutex<u32>>,
    }

    impl ScriptedRecognizer {
        fn emit(&self, event: SpeechEvent) {
            let guard = self.sender.lock().unwrap();
            guard.as_ref().unwrap().try_send(event).unwrap();
        }
    }

    impl SpeechRecognizer for ScriptedRecognizer {
        fn name(&self) -> &str {
            "scripted"
        }

        fn start(
            &mut self,
            _options: &RecognitionOptions,
            events: mpsc::Sender<SpeechEvent>,
        ) -> Result<(), SpeechError> {
            *self.starts.lock().unwrap() += 1;
            *self.sender.lock().unwrap() = Some(events);
            Ok(())
        }

        fn abort(&mut self) {
            *self.aborts.lock().unwrap() += 1;
        }
    }

    fn controller() -> (SpeechController, ScriptedRecognizer) {
        let recognizer = ScriptedRecognizer::default();
        let controller = SpeechController::new(
            Some(Box::new(recognizer.clone())),
            RecognitionOptions::default(),
        );
        (controller, recognizer)
    }

    #[test]
    fn test_default_options_are_single_utterance() {
        let options = RecognitionOptions::default();
        assert_eq!(options.lang, "en-US");
        assert!(!options.continuous);
        assert!(!options.interim_results);
    }

    #[test]
    fn test_start_without_capability() {
        let mut speech = SpeechController::unsupported();
        assert!(!speech.is_supported());
        assert!(matches!(
            speech.start(),
            Err(SpeechError::UnsupportedCapability)
        ));
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_stop_while_idle_has_no_effect() {
        let (mut speech, recognizer) = controller();
        assert!(!speech.stop());
        assert_eq!(*recognizer.aborts.lock().unwrap(), 0);
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_start_while_recording_is_noop() {
        let (mut speech, recognizer) = controller();
        assert!(speech.start().unwrap());
        assert!(!speech.start().unwrap());
        assert_eq!(*recognizer.starts.lock().unwrap(), 1);
        assert!(speech.is_recording());
    }

    #[test]
    fn test_result_delivers_best_transcript() {
        let (mut speech, recognizer) = controller();
        speech.start().unwrap();
        recognizer.emit(SpeechEvent::Result(vec![
            SpeechAlternative::new(" is apple a buy "),
            SpeechAlternative::new("is apple abide"),
        ]));
        assert_eq!(
            speech.poll(),
            Some(SpeechOutcome::Transcript("is apple a buy".into()))
        );
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_stop_discards_late_result() {
        let (mut speech, recognizer) = controller();
        speech.start().unwrap();
        assert!(speech.stop());
        assert_eq!(*recognizer.aborts.lock().unwrap(), 1);

        // The old sender's receiver is gone, so the late result goes nowhere
        let late = recognizer
            .sender
            .lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .try_send(SpeechEvent::Result(vec![SpeechAlternative::new("late")]));
        assert!(late.is_err());
        assert_eq!(speech.poll(), None);
    }

    #[test]
    fn test_permission_denied_is_surfaced() {
        let (mut speech, recognizer) = controller();
        speech.start().unwrap();
        recognizer.emit(SpeechEvent::Error(SpeechErrorKind::NotAllowed));
        assert_eq!(speech.poll(), Some(SpeechOutcome::PermissionDenied));
        assert!(!speech.is_recording());
    }

    #[test]
    fn test_other_errors_end_silently() {
        let (mut speech, recognizer) = controller();
        speech.start().unwrap();
        recognizer.emit(SpeechEvent::Error(SpeechErrorKind::NoSpeech));
        assert_eq!(speech.poll(), Some(SpeechOutcome::Ended));
        assert!(!speech.is_recording());

        // Restartable after an error
        assert!(speech.start().unwrap());
    }

    #[test]
    fn test_blank_result_ends_without_transcript() {
        let (mut speech, recognizer) = controller();
        speech.start().unwrap();
        recognizer.emit(SpeechEvent::Result(vec![SpeechAlternative::new("  ")]));
        assert_eq!(speech.poll(), Some(SpeechOutcome::Ended));
    }

    #[test]
    fn test_events_while_idle_are_ignored() {
        let (mut speech, _) = controller();
        assert_eq!(speech.handle_event(SpeechEvent::End), None);
    }

    #[test]
    fn test_command_output_parsing() {
        assert_eq!(
            CommandRecognizer::parse_output(b"what is the pe ratio\nwhat is the pay ratio\n"),
            SpeechEvent::Result(vec![
                SpeechAlternative::new("what is the pe ratio"),
                SpeechAlternative::new("what is the pay ratio"),
            ])
        );
        assert_eq!(
            CommandRecognizer::parse_output(b"\n  \n"),
            SpeechEvent::Error(SpeechErrorKind::NoSpeech)
        );
    }

    #[test]
    fn test_command_recognizer_from_argv() {
        assert!(CommandRecognizer::from_argv(&[]).is_none());
        let recognizer =
            CommandRecognizer::from_argv(&["listen".to_string(), "--once".to_string()]).unwrap();
        assert_eq!(recognizer.name(), "listen");
        assert_eq!(recognizer.args, vec!["--once".to_string()]);
    }
}
