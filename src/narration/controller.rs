//! Narration controller: reads the summary aloud one sentence at a time.
//!
//! [`NarrationController`] lives on the UI thread.  Each [`start`] launches a
//! session on a named OS thread which speaks the sentences in order and posts
//! [`NarrationEvent`]s back to the UI.
//!
//! # Session flow
//!
//! ```text
//! start(text)
//!   └─▶ state = Speaking
//!         └─▶ thread "narration-N": join previous thread,
//!               fresh engine from the factory, set_rate, publish to slot,
//!               then per sentence
//!               ├─ stop requested?  → leave loop
//!               ├─ post ClearHighlight, post Sentence { index, text }
//!               └─ say(sentence), run_and_wait()
//!             post ClearHighlight, post Finished, state = Idle
//!
//! stop()
//!   └─▶ session stop flag, state = StopRequested, engine taken from the
//!       slot and stopped (if built yet), post ClearHighlight
//! ```
//!
//! Engine construction can block for a while on some platforms, so `start`
//! never touches the engine itself.  Speech errors are logged and absorbed;
//! neither `start` nor `stop` fails.
//!
//! [`start`]: NarrationController::start

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::summarize::split_sentences;

use super::engine::{EngineFactory, SpeechEngine, SpeechError};
use super::state::{NarrationSession, NarrationState, SharedNarrationState};

// ---------------------------------------------------------------------------
// NarrationEvent
// ---------------------------------------------------------------------------

/// Progress reported by a narration session to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationEvent {
    /// Remove the highlight from the summary display.
    ClearHighlight,

    /// `text` (sentence number `index`) is about to be spoken.
    Sentence {
        session: u64,
        index: usize,
        text: String,
    },

    /// The session's thread is exiting.  `stopped` is `false` when every
    /// sentence was spoken.
    Finished { session: u64, stopped: bool },
}

// ---------------------------------------------------------------------------
// EngineSlot
// ---------------------------------------------------------------------------

/// Hands a session's engine from its thread back to the controller.
#[derive(Clone, Default)]
struct EngineSlot(Arc<Mutex<Option<Arc<dyn SpeechEngine>>>>);

impl EngineSlot {
    fn put(&self, engine: Arc<dyn SpeechEngine>) {
        *self.lock() = Some(engine);
    }

    fn take(&self) -> Option<Arc<dyn SpeechEngine>> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn SpeechEngine>>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// NarrationController
// ---------------------------------------------------------------------------

/// Starts and stops narration sessions.  At most one session speaks at a
/// time.
pub struct NarrationController {
    factory: EngineFactory,
    rate_wpm: u32,
    events: mpsc::UnboundedSender<NarrationEvent>,
    state: SharedNarrationState,
    next_session: u64,
    current: Option<NarrationSession>,
    engine: EngineSlot,
    worker: Option<JoinHandle<()>>,
}

impl NarrationController {
    /// Create an idle controller.
    ///
    /// * `factory` : builds a fresh engine for every session, on its thread.
    /// * `rate_wpm`: speaking rate applied to each new engine.
    /// * `events`  : where sessions post their [`NarrationEvent`]s.
    pub fn new(
        factory: EngineFactory,
        rate_wpm: u32,
        events: mpsc::UnboundedSender<NarrationEvent>,
    ) -> Self {
        Self {
            factory,
            rate_wpm,
            events,
            state: SharedNarrationState::new(),
            next_session: 0,
            current: None,
            engine: EngineSlot::default(),
            worker: None,
        }
    }

    /// Current state of the controller.
    pub fn state(&self) -> NarrationState {
        self.state.get()
    }

    /// `true` while a session is speaking.
    pub fn is_active(&self) -> bool {
        self.state().is_busy()
    }

    /// Whether an event from `session` should still reach the display.
    ///
    /// Only the current, still-speaking session is accepted, so sentences
    /// posted just before a stop are not highlighted after it.
    pub fn accepts(&self, session: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.id() == session && s.is_active())
    }

    /// Begin narrating `text`.
    ///
    /// Returns `false` without side effects when a session is already
    /// speaking.  After [`stop`](Self::stop) a new session may start at once;
    /// it waits for the previous thread to exit before its first sentence.
    pub fn start(&mut self, text: &str) -> bool {
        let id = self.next_session + 1;
        if !self.state.begin(id) {
            log::debug!("narration: start ignored, session {} is speaking", self.state.owner());
            return false;
        }
        self.next_session = id;

        let session = NarrationSession::new(id, self.state.clone());
        let slot = EngineSlot::default();

        let task = NarrationTask {
            session: session.clone(),
            factory: Arc::clone(&self.factory),
            rate_wpm: self.rate_wpm,
            slot: slot.clone(),
            events: self.events.clone(),
            sentences: split_sentences(text)
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        let previous = self.worker.take();

        let spawned = std::thread::Builder::new()
            .name(format!("narration-{id}"))
            .spawn(move || {
                if let Some(previous) = previous {
                    if previous.join().is_err() {
                        log::warn!("narration: previous session thread panicked");
                    }
                }
                task.run();
            });

        match spawned {
            Ok(handle) => {
                log::info!("narration: session {id} started");
                self.worker = Some(handle);
                self.current = Some(session);
                self.engine = slot;
                true
            }
            Err(e) => {
                log::error!("narration: cannot spawn narration thread: {e}");
                session.finish();
                false
            }
        }
    }

    /// Stop the speaking session, if any.
    ///
    /// The engine is halted mid-utterance and discarded; the session thread
    /// exits at its next check.  A session whose engine is still being built
    /// exits before speaking anything.
    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        if let Some(session) = &self.current {
            log::info!("narration: stopping session {}", session.id());
            session.request_stop();
        }
        if let Some(engine) = self.engine.take() {
            if let Err(e) = engine.stop() {
                log::warn!("narration: engine stop failed: {e}");
            }
        }
        let _ = self.events.send(NarrationEvent::ClearHighlight);
    }

    /// Block until the most recent session thread has exited.
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("narration: session thread panicked");
            }
        }
    }
}

impl Drop for NarrationController {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

// ---------------------------------------------------------------------------
// NarrationTask
// ---------------------------------------------------------------------------

/// Everything one session thread owns.
struct NarrationTask {
    session: NarrationSession,
    factory: EngineFactory,
    rate_wpm: u32,
    slot: EngineSlot,
    events: mpsc::UnboundedSender<NarrationEvent>,
    sentences: Vec<String>,
}

impl NarrationTask {
    fn run(self) {
        let id = self.session.id();
        let engine = self.build_engine();
        log::debug!("narration: session {id} has {} sentence(s)", self.sentences.len());

        let mut stopped = false;
        for (index, sentence) in self.sentences.iter().enumerate() {
            if self.session.stop_requested() {
                stopped = true;
                break;
            }

            self.post(NarrationEvent::ClearHighlight);
            self.post(NarrationEvent::Sentence {
                session: id,
                index,
                text: sentence.clone(),
            });

            // Checked again so a stop issued while the UI was being notified
            // does not let one more sentence through.
            if self.session.stop_requested() {
                stopped = true;
                break;
            }

            log::debug!("narration: session {id} sentence {index}");
            match engine.say(sentence) {
                Ok(()) => {}
                Err(SpeechError::Halted) => {
                    stopped = true;
                    break;
                }
                Err(e) => {
                    log::warn!("narration: cannot speak sentence {index}: {e}");
                    continue;
                }
            }
            if let Err(e) = engine.run_and_wait() {
                log::warn!("narration: waiting for speech failed: {e}");
            }
        }
        let stopped = stopped || self.session.stop_requested();

        self.post(NarrationEvent::ClearHighlight);
        self.post(NarrationEvent::Finished { session: id, stopped });
        self.session.finish();

        if stopped {
            log::info!("narration: session {id} stopped");
        } else {
            log::info!("narration: session {id} finished");
        }
    }

    /// Build and configure this session's engine, then publish it so `stop`
    /// can reach it.  The slot is filled before the first stop check.
    fn build_engine(&self) -> Arc<dyn SpeechEngine> {
        let engine = (self.factory)();
        if let Err(e) = engine.set_rate(self.rate_wpm) {
            log::warn!("narration: cannot set speaking rate: {e}");
        }
        self.slot.put(Arc::clone(&engine));
        engine
    }

    fn post(&self, event: NarrationEvent) {
        // The receiver only goes away when the window closes.
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::display::{apply_event, TagStyle, TextSurface, HIGHLIGHT_TAG};
    use crate::narration::engine::MockSpeech;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    const SUMMARY: &str = "One is first. Two comes next. Three ends it.";

    type Log = Arc<Mutex<Vec<String>>>;

    struct Harness {
        controller: NarrationController,
        events: mpsc::UnboundedReceiver<NarrationEvent>,
        spoken: Log,
        engines: Arc<AtomicUsize>,
    }

    fn harness(delay: Duration) -> Harness {
        let spoken: Log = Arc::new(Mutex::new(Vec::new()));
        let engines = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();

        let factory: EngineFactory = {
            let spoken = Arc::clone(&spoken);
            let engines = Arc::clone(&engines);
            Arc::new(move || -> Arc<dyn SpeechEngine> {
                engines.fetch_add(1, Ordering::SeqCst);
                Arc::new(MockSpeech::new(Arc::clone(&spoken), delay))
            })
        };

        Harness {
            controller: NarrationController::new(factory, 150, tx),
            events: rx,
            spoken,
            engines,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<NarrationEvent>) -> Vec<NarrationEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn spoken(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn completes_and_returns_to_idle() {
        let mut h = harness(Duration::ZERO);
        assert!(h.controller.start(SUMMARY));
        h.controller.wait();

        assert_eq!(h.controller.state(), NarrationState::Idle);
        assert_eq!(
            spoken(&h.spoken),
            vec!["One is first.", "Two comes next.", "Three ends it."]
        );

        let events = drain(&mut h.events);
        let sentences: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                NarrationEvent::Sentence { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(sentences, vec![0, 1, 2]);
        assert_eq!(
            events.last(),
            Some(&NarrationEvent::Finished {
                session: 1,
                stopped: false
            })
        );
        assert_eq!(events[events.len() - 2], NarrationEvent::ClearHighlight);
    }

    #[test]
    fn second_start_while_speaking_is_ignored() {
        let mut h = harness(Duration::from_millis(200));
        assert!(h.controller.start(SUMMARY));
        assert!(!h.controller.start(SUMMARY));
        assert!(h.controller.is_active());

        h.controller.stop();
        h.controller.wait();
        assert_eq!(h.engines.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_mid_narration_halts_and_clears_highlight() {
        let mut h = harness(Duration::from_millis(400));
        let mut surface = TextSurface::new();
        surface.set_text(SUMMARY);
        let style = TagStyle::background([255, 255, 0]);

        assert!(h.controller.start(SUMMARY));

        // Wait for the first sentence to be announced.
        loop {
            let event = h.events.blocking_recv().expect("event");
            let is_first = matches!(event, NarrationEvent::Sentence { index: 0, .. });
            apply_event(&mut surface, &event, style);
            if is_first {
                break;
            }
        }
        assert!(surface.tag_span(HIGHLIGHT_TAG).is_some());

        let began = Instant::now();
        h.controller.stop();
        assert_eq!(h.controller.state(), NarrationState::StopRequested);
        h.controller.wait();
        assert!(began.elapsed() < Duration::from_millis(400));

        assert_eq!(h.controller.state(), NarrationState::Idle);
        assert!(spoken(&h.spoken).len() <= 1);

        let rest = drain(&mut h.events);
        for event in &rest {
            if let NarrationEvent::Sentence { session, .. } = event {
                assert!(!h.controller.accepts(*session));
            }
            apply_event(&mut surface, event, style);
        }
        assert_eq!(surface.tag_span(HIGHLIGHT_TAG), None);
        assert_eq!(
            rest.last(),
            Some(&NarrationEvent::Finished {
                session: 1,
                stopped: true
            })
        );
    }

    #[test]
    fn restart_immediately_after_stop() {
        let mut h = harness(Duration::from_millis(100));
        assert!(h.controller.start(SUMMARY));
        h.controller.stop();

        assert!(h.controller.start("Fresh start. Second go."));
        assert!(h.controller.is_active());
        assert!(h.controller.accepts(2));
        assert!(!h.controller.accepts(1));

        h.controller.wait();
        assert_eq!(h.controller.state(), NarrationState::Idle);
        assert_eq!(h.engines.load(Ordering::SeqCst), 2);

        let log = spoken(&h.spoken);
        assert!(log.ends_with(&["Fresh start.".to_string(), "Second go.".to_string()]));

        let finished: Vec<NarrationEvent> = drain(&mut h.events)
            .into_iter()
            .filter(|e| matches!(e, NarrationEvent::Finished { .. }))
            .collect();
        assert_eq!(
            finished,
            vec![
                NarrationEvent::Finished {
                    session: 1,
                    stopped: true
                },
                NarrationEvent::Finished {
                    session: 2,
                    stopped: false
                },
            ]
        );
    }

    /// A factory that takes `build` to produce an engine.
    fn slow_factory(spoken: &Log, build: Duration) -> EngineFactory {
        let spoken = Arc::clone(spoken);
        Arc::new(move || -> Arc<dyn SpeechEngine> {
            std::thread::sleep(build);
            Arc::new(MockSpeech::new(Arc::clone(&spoken), Duration::ZERO))
        })
    }

    #[test]
    fn slow_engine_construction_does_not_block_start() {
        let spoken: Log = Arc::new(Mutex::new(Vec::new()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller =
            NarrationController::new(slow_factory(&spoken, Duration::from_millis(300)), 150, tx);

        let began = Instant::now();
        assert!(controller.start(SUMMARY));
        assert!(began.elapsed() < Duration::from_millis(150));
        assert!(controller.is_active());

        controller.wait();
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(spoken.lock().unwrap().len(), 3);
    }

    #[test]
    fn rate_is_applied_on_the_session_thread() {
        let spoken: Log = Arc::new(Mutex::new(Vec::new()));
        let built: Arc<Mutex<Option<Arc<MockSpeech>>>> = Arc::new(Mutex::new(None));
        let (tx, _rx) = mpsc::unbounded_channel();
        let factory: EngineFactory = {
            let spoken = Arc::clone(&spoken);
            let built = Arc::clone(&built);
            Arc::new(move || -> Arc<dyn SpeechEngine> {
                let engine = Arc::new(MockSpeech::new(Arc::clone(&spoken), Duration::ZERO));
                *built.lock().unwrap() = Some(Arc::clone(&engine));
                engine
            })
        };
        let mut controller = NarrationController::new(factory, 220, tx);

        assert!(controller.start(SUMMARY));
        controller.wait();

        let engine = built.lock().unwrap().clone().expect("engine built");
        assert_eq!(engine.rate(), 220);
    }

    #[test]
    fn stop_before_engine_is_ready_speaks_nothing() {
        let spoken: Log = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller =
            NarrationController::new(slow_factory(&spoken, Duration::from_millis(200)), 150, tx);

        assert!(controller.start(SUMMARY));
        controller.stop();
        assert_eq!(controller.state(), NarrationState::StopRequested);
        controller.wait();

        assert_eq!(controller.state(), NarrationState::Idle);
        assert!(spoken.lock().unwrap().is_empty());
        let events = drain(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, NarrationEvent::Sentence { .. })));
        assert_eq!(
            events.last(),
            Some(&NarrationEvent::Finished {
                session: 1,
                stopped: true
            })
        );
    }

    #[test]
    fn stop_when_idle_does_nothing() {
        let mut h = harness(Duration::ZERO);
        h.controller.stop();
        assert_eq!(h.controller.state(), NarrationState::Idle);
        assert!(drain(&mut h.events).is_empty());
    }

    #[test]
    fn engine_errors_are_absorbed() {
        let spoken: Log = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let factory: EngineFactory = {
            let spoken = Arc::clone(&spoken);
            Arc::new(move || -> Arc<dyn SpeechEngine> {
                Arc::new(MockSpeech::failing(Arc::clone(&spoken)))
            })
        };
        let mut controller = NarrationController::new(factory, 150, tx);

        assert!(controller.start(SUMMARY));
        controller.wait();

        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(spoken.lock().unwrap().len(), 3);
        assert!(matches!(
            drain(&mut rx).last(),
            Some(NarrationEvent::Finished { stopped: false, .. })
        ));
    }

    #[test]
    fn empty_text_finishes_immediately() {
        let mut h = harness(Duration::ZERO);
        assert!(h.controller.start("   "));
        h.controller.wait();

        assert_eq!(h.controller.state(), NarrationState::Idle);
        assert!(spoken(&h.spoken).is_empty());
        assert_eq!(
            drain(&mut h.events),
            vec![
                NarrationEvent::ClearHighlight,
                NarrationEvent::Finished {
                    session: 1,
                    stopped: false
                },
            ]
        );
    }
}
