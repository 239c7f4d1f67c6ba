//! Composition state machine for the writing tablet.
//!
//! Sequences strokes through: Idle → AwaitingDebounce → Recognizing → Idle.
//! Only one recognition is ever in flight; replies are matched by ticket so
//! an answer that arrives after a clear or a timeout is rejected instead of
//! touching the fresh surface.

use chrono::{DateTime, Local};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::config::TabletConfig;
use super::debounce::RecognitionDebouncer;
use super::pipeline::{LowConfidenceReason, RecognitionResult};
use super::queue::{CancelToken, RecognitionReply, RecognitionRequest};
use crate::capture::{CaptureError, DrawingSurface, Point, StrokeCapture};
use crate::session::{ScoringMetrics, SessionError, SessionScorer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionPhase {
    Idle,
    AwaitingDebounce,
    Recognizing,
}

impl fmt::Display for RecognitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionPhase::Idle => write!(f, "Idle"),
            RecognitionPhase::AwaitingDebounce => write!(f, "Awaiting debounce"),
            RecognitionPhase::Recognizing => write!(f, "Recognizing"),
        }
    }
}

/// Rejected tablet transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// A reply whose ticket is not the one in flight (or nothing is in flight)
    #[error("stale recognition reply {received} ({})", waiting_for(.expected))]
    StaleReply {
        expected: Option<u64>,
        received: u64,
    },
}

fn waiting_for(expected: &Option<u64>) -> String {
    match expected {
        Some(ticket) => format!("waiting for {}", ticket),
        None => "nothing in flight".to_string(),
    }
}

/// What happened to a finished stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeEnd {
    /// The debounce window (re)started
    Scheduled,
    /// A recognition is already in flight; no new window was started
    Deferred,
}

/// Something `tick` wants the caller to act on.
#[derive(Debug)]
pub enum TickEvent {
    /// The debounce window elapsed; hand this snapshot to the worker
    Dispatch(RecognitionRequest),
    /// The in-flight recognition ran past its deadline and was abandoned
    TimedOut { ticket: u64 },
}

/// Everything the user has typed, across sessions. Append-only.
#[derive(Debug, Clone, Default)]
pub struct TypedText {
    text: String,
}

impl TypedText {
    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug)]
struct InFlight {
    ticket: u64,
    deadline: Instant,
    cancel: CancelToken,
}

/// The tablet's composition: surface, strokes, recognition, typed text,
/// and the scoring session, all driven from one thread.
pub struct Composer {
    surface: DrawingSurface,
    capture: StrokeCapture,
    debouncer: RecognitionDebouncer,
    recognition_timeout: Duration,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    uppercase: bool,
    typed: TypedText,
    session: SessionScorer,
    last_result: Option<RecognitionResult>,
    failure_visible: bool,
}

impl Composer {
    pub fn new(config: &TabletConfig) -> Self {
        Self {
            surface: DrawingSurface::new(
                config.canvas_width,
                config.canvas_height,
                config.brush_width,
            ),
            capture: StrokeCapture::new(),
            debouncer: RecognitionDebouncer::new(config.debounce()),
            recognition_timeout: config.recognition_timeout(),
            in_flight: None,
            next_ticket: 1,
            uppercase: config.uppercase,
            typed: TypedText::default(),
            session: SessionScorer::new(),
            last_result: None,
            failure_visible: false,
        }
    }

    pub fn phase(&self) -> RecognitionPhase {
        if self.in_flight.is_some() {
            RecognitionPhase::Recognizing
        } else if self.debouncer.is_pending() {
            RecognitionPhase::AwaitingDebounce
        } else {
            RecognitionPhase::Idle
        }
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn typed(&self) -> &str {
        self.typed.as_str()
    }

    pub fn session(&self) -> &SessionScorer {
        &self.session
    }

    pub fn is_drawing(&self) -> bool {
        self.capture.is_drawing()
    }

    pub fn last_result(&self) -> Option<&RecognitionResult> {
        self.last_result.as_ref()
    }

    /// True from a low-confidence outcome until the next pointer-down,
    /// successful recognition, or clear.
    pub fn failure_visible(&self) -> bool {
        self.failure_visible
    }

    pub fn pointer_down(&mut self, point: Point) -> Result<(), TransitionError> {
        self.capture.pointer_down(point, &mut self.surface)?;

        if self.debouncer.cancel() {
            crate::log("Debounce cancelled: glyph still being composed");
        }
        self.failure_visible = false;
        Ok(())
    }

    pub fn pointer_move(&mut self, point: Point) -> bool {
        self.capture.pointer_move(point, &mut self.surface)
    }

    pub fn pointer_up(&mut self, now: Instant) -> Result<StrokeEnd, TransitionError> {
        self.capture.pointer_up(&mut self.surface)?;

        if self.in_flight.is_some() {
            return Ok(StrokeEnd::Deferred);
        }

        self.debouncer.arm(now);
        Ok(StrokeEnd::Scheduled)
    }

    /// Pointer left the canvas. Ends a stroke if one is in progress.
    pub fn pointer_leave(&mut self, now: Instant) -> Option<StrokeEnd> {
        self.pointer_up(now).ok()
    }

    /// Advances timers. Call regularly from the event loop.
    pub fn tick(&mut self, now: Instant) -> Option<TickEvent> {
        if let Some(in_flight) = &self.in_flight {
            if now < in_flight.deadline {
                return None;
            }

            let ticket = in_flight.ticket;
            if let Some(expired) = self.in_flight.take() {
                expired.cancel.cancel();
            }
            crate::log(&format!("Recognition {} timed out", ticket));
            self.finish(RecognitionResult::LowConfidence(
                LowConfidenceReason::TimedOut,
            ));
            return Some(TickEvent::TimedOut { ticket });
        }

        if self.debouncer.poll(now) {
            return Some(TickEvent::Dispatch(self.begin_recognition(now)));
        }

        None
    }

    fn begin_recognition(&mut self, now: Instant) -> RecognitionRequest {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let cancel = CancelToken::new();
        self.in_flight = Some(InFlight {
            ticket,
            deadline: now + self.recognition_timeout,
            cancel: cancel.clone(),
        });

        crate::log(&format!("Recognition {} dispatched", ticket));

        RecognitionRequest {
            ticket,
            image: self.surface.to_image(),
            cancel,
        }
    }

    /// Applies a worker reply if it belongs to the recognition in flight.
    pub fn apply_reply(
        &mut self,
        reply: RecognitionReply,
    ) -> Result<RecognitionResult, TransitionError> {
        let expected = self.in_flight.as_ref().map(|f| f.ticket);
        if expected != Some(reply.ticket) {
            return Err(TransitionError::StaleReply {
                expected,
                received: reply.ticket,
            });
        }

        self.in_flight = None;
        self.finish(reply.result.clone());
        Ok(reply.result)
    }

    fn finish(&mut self, result: RecognitionResult) {
        match &result {
            RecognitionResult::Recognized(letter) => {
                self.typed.push(*letter);
                self.session.record_letter();
                self.failure_visible = false;
            }
            RecognitionResult::LowConfidence(_) => {
                self.failure_visible = true;
            }
        }

        self.surface.clear();
        self.last_result = Some(result);
    }

    /// Wipes the surface and abandons any pending or in-flight recognition.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
            crate::log(&format!(
                "Recognition {} cancelled by clear",
                in_flight.ticket
            ));
        }
        self.capture.abort();
        self.surface.clear();
        self.failure_visible = false;
        self.last_result = None;
    }

    /// Manual entry. Letters and spaces only; does not count toward the
    /// session's recognized letters.
    pub fn type_char(&mut self, c: char) -> bool {
        if !(c.is_ascii_alphabetic() || c == ' ') {
            return false;
        }
        let c = if self.uppercase {
            c.to_ascii_uppercase()
        } else {
            c
        };
        self.typed.push(c);
        true
    }

    pub fn start_session(&mut self, now: DateTime<Local>) {
        if self.session.start(now, self.typed.char_len()) {
            crate::log("Session restarted");
        } else {
            crate::log("Session started");
        }
    }

    pub fn end_session(
        &mut self,
        now: DateTime<Local>,
        target: &str,
    ) -> Result<ScoringMetrics, SessionError> {
        let metrics = self.session.end(now, self.typed.as_str(), target)?;
        crate::log(&format!(
            "Session ended: {:.1}s, {} letters, {:.2} WPM, distance {}",
            metrics.duration_seconds,
            metrics.letters,
            metrics.words_per_minute,
            metrics.minimum_string_distance
        ));
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    fn composer() -> Composer {
        Composer::new(&TabletConfig::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn draw_stroke(c: &mut Composer, now: Instant) -> StrokeEnd {
        c.pointer_down(Point::new(100.0, 100.0)).unwrap();
        c.pointer_move(Point::new(200.0, 150.0));
        c.pointer_move(Point::new(300.0, 300.0));
        c.pointer_up(now).unwrap()
    }

    fn dispatch(c: &mut Composer, now: Instant) -> RecognitionRequest {
        match c.tick(now) {
            Some(TickEvent::Dispatch(request)) => request,
            other => panic!("expected dispatch, got {:?}", other),
        }
    }

    fn reply(request: &RecognitionRequest, result: RecognitionResult) -> RecognitionReply {
        RecognitionReply {
            ticket: request.ticket,
            result,
        }
    }

    #[test]
    fn test_stroke_then_quiet_window_dispatches_snapshot() {
        let t0 = Instant::now();
        let mut c = composer();

        assert_eq!(draw_stroke(&mut c, t0), StrokeEnd::Scheduled);
        assert_eq!(c.phase(), RecognitionPhase::AwaitingDebounce);
        assert!(c.tick(t0 + ms(999)).is_none());

        let request = dispatch(&mut c, t0 + DEBOUNCE);
        assert_eq!(c.phase(), RecognitionPhase::Recognizing);
        assert!(request.image.get_pixel(200, 150)[0] < 128);
    }

    #[test]
    fn test_new_stroke_supersedes_pending_recognition() {
        let t0 = Instant::now();
        let mut c = composer();

        draw_stroke(&mut c, t0);
        c.pointer_down(Point::new(50.0, 50.0)).unwrap();
        assert_eq!(c.phase(), RecognitionPhase::Idle);
        assert!(c.tick(t0 + ms(1500)).is_none());

        c.pointer_move(Point::new(60.0, 80.0));
        c.pointer_up(t0 + ms(1600)).unwrap();

        assert!(c.tick(t0 + ms(2599)).is_none());
        let request = dispatch(&mut c, t0 + ms(2600));
        assert_eq!(request.ticket, 1);
        assert!(c.tick(t0 + ms(2700)).is_none());
    }

    #[test]
    fn test_no_second_recognition_while_one_is_in_flight() {
        let t0 = Instant::now();
        let mut c = composer();

        draw_stroke(&mut c, t0);
        let first = dispatch(&mut c, t0 + DEBOUNCE);

        assert_eq!(draw_stroke(&mut c, t0 + ms(1100)), StrokeEnd::Deferred);
        assert!(c.tick(t0 + ms(5000)).is_none());
        assert_eq!(c.phase(), RecognitionPhase::Recognizing);

        c.apply_reply(reply(&first, RecognitionResult::Recognized('X')))
            .unwrap();
        assert_eq!(c.phase(), RecognitionPhase::Idle);
    }

    #[test]
    fn test_recognized_letter_appends_and_clears() {
        let t0 = Instant::now();
        let mut c = composer();

        draw_stroke(&mut c, t0);
        let request = dispatch(&mut c, t0 + DEBOUNCE);
        let result = c
            .apply_reply(reply(&request, RecognitionResult::Recognized('A')))
            .unwrap();

        assert_eq!(result, RecognitionResult::Recognized('A'));
        assert_eq!(c.typed(), "A");
        assert!(!c.surface().has_ink());
        assert!(!c.failure_visible());
    }

    #[test]
    fn test_low_confidence_clears_and_flags_failure() {
        let t0 = Instant::now();
        let mut c = composer();

        draw_stroke(&mut c, t0);
        let request = dispatch(&mut c, t0 + DEBOUNCE);
        c.apply_reply(reply(
            &request,
            RecognitionResult::LowConfidence(LowConfidenceReason::Rejected {
                output: "7".to_string(),
            }),
        ))
        .unwrap();

        assert_eq!(c.typed(), "");
        assert!(!c.surface().has_ink());
        assert!(c.failure_visible());

        c.pointer_down(Point::new(10.0, 10.0)).unwrap();
        assert!(!c.failure_visible());
    }

    #[test]
    fn test_clear_twice_matches_single_clear() {
        let t0 = Instant::now();
        let mut c = composer();

        draw_stroke(&mut c, t0);
        c.clear();
        c.clear();

        assert_eq!(c.phase(), RecognitionPhase::Idle);
        assert!(!c.surface().has_ink());
        assert!(c.tick(t0 + ms(5000)).is_none());
    }

    #[test]
    fn test_reply_after_clear_is_stale() {
        let t0 = Instant::now();
        let mut c = composer();

        draw_stroke(&mut c, t0);
        let request = dispatch(&mut c, t0 + DEBOUNCE);
        c.clear();

        assert!(request.cancel.is_cancelled());
        draw_stroke(&mut c, t0 + ms(1200));

        let err = c
            .apply_reply(reply(&request, RecognitionResult::Recognized('A')))
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::StaleReply {
                expected: None,
                received: request.ticket
            }
        );
        assert_eq!(c.typed(), "");
        assert!(c.surface().has_ink());
    }

    #[test]
    fn test_timeout_abandons_recognition() {
        let t0 = Instant::now();
        let config = TabletConfig::default();
        let mut c = Composer::new(&config);

        draw_stroke(&mut c, t0);
        let request = dispatch(&mut c, t0 + DEBOUNCE);
        let deadline = t0 + DEBOUNCE + config.recognition_timeout();

        assert!(c.tick(deadline - ms(1)).is_none());
        match c.tick(deadline) {
            Some(TickEvent::TimedOut { ticket }) => assert_eq!(ticket, request.ticket),
            other => panic!("expected timeout, got {:?}", other),
        }

        assert!(request.cancel.is_cancelled());
        assert!(c.failure_visible());
        assert_eq!(
            c.last_result(),
            Some(&RecognitionResult::LowConfidence(
                LowConfidenceReason::TimedOut
            ))
        );
        assert!(
            c.apply_reply(reply(&request, RecognitionResult::Recognized('A')))
                .is_err()
        );
    }

    #[test]
    fn test_reply_with_wrong_ticket_is_rejected() {
        let t0 = Instant::now();
        let mut c = composer();

        draw_stroke(&mut c, t0);
        let request = dispatch(&mut c, t0 + DEBOUNCE);

        let err = c
            .apply_reply(RecognitionReply {
                ticket: request.ticket + 10,
                result: RecognitionResult::Recognized('A'),
            })
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::StaleReply {
                expected: Some(request.ticket),
                received: request.ticket + 10
            }
        );
        assert_eq!(c.phase(), RecognitionPhase::Recognizing);
    }

    #[test]
    fn test_pointer_transitions_are_checked() {
        let t0 = Instant::now();
        let mut c = composer();

        assert_eq!(
            c.pointer_up(t0).unwrap_err(),
            TransitionError::Capture(CaptureError::NotDrawing)
        );
        assert!(c.pointer_leave(t0).is_none());

        c.pointer_down(Point::new(10.0, 10.0)).unwrap();
        assert_eq!(
            c.pointer_down(Point::new(20.0, 20.0)).unwrap_err(),
            TransitionError::Capture(CaptureError::AlreadyDrawing)
        );
        assert_eq!(c.pointer_leave(t0), Some(StrokeEnd::Scheduled));
    }

    #[test]
    fn test_rejections_describe_themselves() {
        let capture: TransitionError = CaptureError::AlreadyDrawing.into();
        assert_eq!(capture.to_string(), "a stroke is already in progress");

        let stale = TransitionError::StaleReply {
            expected: Some(4),
            received: 3,
        };
        assert_eq!(stale.to_string(), "stale recognition reply 3 (waiting for 4)");

        let orphan = TransitionError::StaleReply {
            expected: None,
            received: 3,
        };
        assert_eq!(orphan.to_string(), "stale recognition reply 3 (nothing in flight)");

        let session = composer().end_session(Local::now(), "CAT").unwrap_err();
        assert_eq!(session.to_string(), "cannot end a session while Idle");
    }

    #[test]
    fn test_session_scores_recognized_letters() {
        let t0 = Instant::now();
        let w0 = Local::now();
        let mut c = composer();

        c.type_char('x');
        c.start_session(w0);

        for (i, letter) in ['C', 'A', 'T'].into_iter().enumerate() {
            let at = t0 + Duration::from_secs(i as u64 * 2);
            draw_stroke(&mut c, at);
            let request = dispatch(&mut c, at + DEBOUNCE);
            c.apply_reply(reply(&request, RecognitionResult::Recognized(letter)))
                .unwrap();
        }

        let metrics = c.end_session(w0 + ChronoDuration::seconds(6), "CAT").unwrap();

        assert_eq!(c.typed(), "XCAT");
        assert_eq!(metrics.letters, 3);
        assert_eq!(metrics.typed, "CAT");
        assert_eq!(metrics.minimum_string_distance, 0);
        assert!((metrics.words_per_minute - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_manual_entry_not_counted_as_recognized() {
        let w0 = Local::now();
        let mut c = composer();

        c.start_session(w0);
        assert!(c.type_char('h'));
        assert!(c.type_char(' '));
        assert!(!c.type_char('7'));

        let metrics = c.end_session(w0 + ChronoDuration::seconds(60), "H").unwrap();
        assert_eq!(metrics.typed, "H ");
        assert_eq!(metrics.letters, 0);
        assert_eq!(metrics.words_per_minute, 0.0);
        assert_eq!(metrics.minimum_string_distance, 1);
    }

    #[test]
    fn test_end_session_without_start_is_reported() {
        let mut c = composer();
        assert!(matches!(
            c.end_session(Local::now(), "CAT"),
            Err(SessionError::InvalidTransition { .. })
        ));
    }
}
