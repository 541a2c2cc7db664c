//! Speech engine trait and implementations.
//!
//! # Overview
//!
//! [`SpeechEngine`] is the interface the narration task drives.  It is
//! object-safe and `Send + Sync`, and every method takes `&self`, so the
//! controller (UI thread) can call [`stop`](SpeechEngine::stop) while the
//! narration thread is blocked in [`run_and_wait`](SpeechEngine::run_and_wait).
//!
//! `stop` halts the instance for good: later `say` calls fail with
//! [`SpeechError::Halted`].  The controller discards a stopped engine and asks
//! the factory for a fresh one on the next start.
//!
//! Implementations:
//!
//! * `TtsSpeech` (feature `speech`): platform text-to-speech via the `tts`
//!   crate, owned by a dedicated thread.
//! * [`SilentSpeech`]: produces no audio but paces each utterance by word
//!   count at the configured rate, so highlighting still advances.  Used when
//!   the `speech` feature is off or the platform engine fails to start.
//! * `MockSpeech` (tests only): records every utterance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors raised by speech engines.  The narration task logs and absorbs
/// all of them.
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    /// The platform speech backend could not be initialised.
    #[error("speech engine initialisation failed: {0}")]
    Init(String),

    /// The backend rejected a request.
    #[error("speech backend error: {0}")]
    Backend(String),

    /// The engine was stopped and accepts no further utterances.
    #[error("speech engine has been stopped")]
    Halted,
}

// ---------------------------------------------------------------------------
// SpeechEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe text-to-speech interface.
pub trait SpeechEngine: Send + Sync {
    /// Set the speaking rate in words per minute.
    fn set_rate(&self, words_per_minute: u32) -> Result<(), SpeechError>;

    /// Enqueue `text` as one utterance.
    fn say(&self, text: &str) -> Result<(), SpeechError>;

    /// Block until every enqueued utterance has finished, or the engine is
    /// stopped.
    fn run_and_wait(&self) -> Result<(), SpeechError>;

    /// Abort the current utterance and refuse further ones.
    fn stop(&self) -> Result<(), SpeechError>;
}

// Compile-time assertion: Arc<dyn SpeechEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Arc<dyn SpeechEngine>) {}
};

/// Builds a fresh engine for every narration session.  Called on the
/// session thread, since engine construction may block.
pub type EngineFactory = Arc<dyn Fn() -> Arc<dyn SpeechEngine> + Send + Sync>;

/// The best engine available in this build.
///
/// With the `speech` feature this is the platform engine, falling back to
/// [`SilentSpeech`] when the platform refuses to initialise.
pub fn platform_engine() -> Arc<dyn SpeechEngine> {
    #[cfg(feature = "speech")]
    {
        match platform::TtsSpeech::new() {
            Ok(engine) => return Arc::new(engine),
            Err(e) => log::warn!("{e}; narration will be silent"),
        }
    }
    Arc::new(SilentSpeech::new())
}

// ---------------------------------------------------------------------------
// Pacing helpers
// ---------------------------------------------------------------------------

/// Granularity at which blocking waits notice a stop.
const PACE_SLICE: Duration = Duration::from_millis(20);

/// How long `text` takes to say at `words_per_minute`.
///
/// ```
/// use std::time::Duration;
/// use doc_narrator::narration::utterance_duration;
///
/// assert_eq!(utterance_duration("one two three", 180), Duration::from_secs(1));
/// ```
pub fn utterance_duration(text: &str, words_per_minute: u32) -> Duration {
    let words = text.split_whitespace().count().max(1) as u64;
    Duration::from_millis(words * 60_000 / u64::from(words_per_minute.max(1)))
}

/// Sleep for `duration`, returning early once `halted` is set.
fn pace(duration: Duration, halted: &AtomicBool) {
    let mut remaining = duration;
    while !remaining.is_zero() && !halted.load(Ordering::SeqCst) {
        let slice = remaining.min(PACE_SLICE);
        std::thread::sleep(slice);
        remaining -= slice;
    }
}

// ---------------------------------------------------------------------------
// SilentSpeech
// ---------------------------------------------------------------------------

/// An engine without audio output that takes as long as speech would.
#[derive(Debug)]
pub struct SilentSpeech {
    rate_wpm: AtomicU32,
    queue: Mutex<VecDeque<String>>,
    halted: AtomicBool,
}

impl SilentSpeech {
    pub fn new() -> Self {
        Self {
            rate_wpm: AtomicU32::new(150),
            queue: Mutex::new(VecDeque::new()),
            halted: AtomicBool::new(false),
        }
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SilentSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEngine for SilentSpeech {
    fn set_rate(&self, words_per_minute: u32) -> Result<(), SpeechError> {
        self.rate_wpm.store(words_per_minute, Ordering::SeqCst);
        Ok(())
    }

    fn say(&self, text: &str) -> Result<(), SpeechError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(SpeechError::Halted);
        }
        self.queue().push_back(text.to_string());
        Ok(())
    }

    fn run_and_wait(&self) -> Result<(), SpeechError> {
        let rate = self.rate_wpm.load(Ordering::SeqCst);
        loop {
            let next = self.queue().pop_front();
            let Some(text) = next else { break };
            if self.halted.load(Ordering::SeqCst) {
                break;
            }
            pace(utterance_duration(&text, rate), &self.halted);
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), SpeechError> {
        self.halted.store(true, Ordering::SeqCst);
        self.queue().clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TtsSpeech  (feature = "speech")
// ---------------------------------------------------------------------------

#[cfg(feature = "speech")]
pub use platform::TtsSpeech;

#[cfg(feature = "speech")]
mod platform {
    //! `tts::Tts` is not `Send` on every platform, so it lives on its own
    //! thread and is driven over a command channel.

    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use tts::Tts;

    use super::{pace, utterance_duration, SpeechEngine, SpeechError};

    /// Words per minute that `Tts::normal_rate` is taken to correspond to.
    const NORMAL_WPM: f32 = 200.0;
    /// How often `run_and_wait` polls the backend.
    const POLL_INTERVAL: Duration = Duration::from_millis(50);
    /// Backends start speaking asynchronously; an utterance that has not
    /// started within this window is treated as finished.
    const START_GRACE: Duration = Duration::from_millis(750);

    type Reply<T> = Sender<Result<T, SpeechError>>;

    enum Command {
        SetRate(u32, Reply<()>),
        Speak(String, Reply<()>),
        IsSpeaking(Reply<Option<bool>>),
        Stop(Reply<()>),
    }

    /// Platform text-to-speech.
    pub struct TtsSpeech {
        commands: Sender<Command>,
        halted: AtomicBool,
        rate_wpm: AtomicU32,
        last_utterance: Mutex<String>,
    }

    impl TtsSpeech {
        /// Start the speech thread and initialise the platform backend on it.
        pub fn new() -> Result<Self, SpeechError> {
            let (commands, rx) = channel();
            let (init_tx, init_rx) = channel();

            std::thread::Builder::new()
                .name("tts-backend".into())
                .spawn(move || serve(init_tx, rx))
                .map_err(|e| SpeechError::Init(e.to_string()))?;

            init_rx
                .recv()
                .map_err(|_| SpeechError::Init("speech thread exited during start-up".into()))??;

            Ok(Self {
                commands,
                halted: AtomicBool::new(false),
                rate_wpm: AtomicU32::new(150),
                last_utterance: Mutex::new(String::new()),
            })
        }

        fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, SpeechError> {
            let (reply_tx, reply_rx) = channel();
            self.commands
                .send(command(reply_tx))
                .map_err(|_| SpeechError::Backend("speech thread has exited".into()))?;
            reply_rx
                .recv()
                .map_err(|_| SpeechError::Backend("speech thread has exited".into()))?
        }
    }

    impl SpeechEngine for TtsSpeech {
        fn set_rate(&self, words_per_minute: u32) -> Result<(), SpeechError> {
            self.rate_wpm.store(words_per_minute, Ordering::SeqCst);
            self.request(|reply| Command::SetRate(words_per_minute, reply))
        }

        fn say(&self, text: &str) -> Result<(), SpeechError> {
            if self.halted.load(Ordering::SeqCst) {
                return Err(SpeechError::Halted);
            }
            if let Ok(mut last) = self.last_utterance.lock() {
                last.clear();
                last.push_str(text);
            }
            self.request(|reply| Command::Speak(text.to_string(), reply))
        }

        fn run_and_wait(&self) -> Result<(), SpeechError> {
            let began = Instant::now();
            let mut started = false;

            while !self.halted.load(Ordering::SeqCst) {
                match self.request(Command::IsSpeaking)? {
                    None => {
                        // Backend cannot report progress; estimate instead.
                        let text = self
                            .last_utterance
                            .lock()
                            .map(|t| t.clone())
                            .unwrap_or_default();
                        let rate = self.rate_wpm.load(Ordering::SeqCst);
                        pace(utterance_duration(&text, rate), &self.halted);
                        break;
                    }
                    Some(true) => started = true,
                    Some(false) if started || began.elapsed() >= START_GRACE => break,
                    Some(false) => {}
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Ok(())
        }

        fn stop(&self) -> Result<(), SpeechError> {
            self.halted.store(true, Ordering::SeqCst);
            self.request(Command::Stop)
        }
    }

    fn backend(e: tts::Error) -> SpeechError {
        SpeechError::Backend(e.to_string())
    }

    /// Body of the `tts-backend` thread.  Exits when the engine is dropped.
    fn serve(init: Sender<Result<(), SpeechError>>, commands: Receiver<Command>) {
        let mut tts = match Tts::default() {
            Ok(tts) => {
                let _ = init.send(Ok(()));
                tts
            }
            Err(e) => {
                let _ = init.send(Err(SpeechError::Init(e.to_string())));
                return;
            }
        };

        while let Ok(command) = commands.recv() {
            match command {
                Command::SetRate(wpm, reply) => {
                    let _ = reply.send(set_rate(&mut tts, wpm));
                }
                Command::Speak(text, reply) => {
                    let _ = reply.send(tts.speak(text, false).map(|_| ()).map_err(backend));
                }
                Command::IsSpeaking(reply) => {
                    let result = if tts.supported_features().is_speaking {
                        tts.is_speaking().map(Some).map_err(backend)
                    } else {
                        Ok(None)
                    };
                    let _ = reply.send(result);
                }
                Command::Stop(reply) => {
                    let _ = reply.send(tts.stop().map(|_| ()).map_err(backend));
                }
            }
        }
    }

    fn set_rate(tts: &mut Tts, words_per_minute: u32) -> Result<(), SpeechError> {
        if !tts.supported_features().rate {
            log::debug!("speech: backend has no rate control");
            return Ok(());
        }
        let rate = (tts.normal_rate() * words_per_minute as f32 / NORMAL_WPM)
            .max(tts.min_rate())
            .min(tts.max_rate());
        tts.set_rate(rate).map(|_| ()).map_err(backend)
    }
}

// ---------------------------------------------------------------------------
// MockSpeech  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records utterances and takes `delay` per utterance.
#[cfg(test)]
pub struct MockSpeech {
    log: Arc<Mutex<Vec<String>>>,
    delay: Duration,
    fail: bool,
    pending: AtomicU32,
    rate_wpm: AtomicU32,
    halted: AtomicBool,
}

#[cfg(test)]
impl MockSpeech {
    /// Record every `say` into `log`; each utterance lasts `delay`.
    pub fn new(log: Arc<Mutex<Vec<String>>>, delay: Duration) -> Self {
        Self {
            log,
            delay,
            fail: false,
            pending: AtomicU32::new(0),
            rate_wpm: AtomicU32::new(0),
            halted: AtomicBool::new(false),
        }
    }

    /// An engine whose every call fails with [`SpeechError::Backend`].
    pub fn failing(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            fail: true,
            ..Self::new(log, Duration::ZERO)
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate_wpm.load(Ordering::SeqCst)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SpeechError> {
        if self.fail {
            Err(SpeechError::Backend("mock failure".into()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl SpeechEngine for MockSpeech {
    fn set_rate(&self, words_per_minute: u32) -> Result<(), SpeechError> {
        self.check()?;
        self.rate_wpm.store(words_per_minute, Ordering::SeqCst);
        Ok(())
    }

    fn say(&self, text: &str) -> Result<(), SpeechError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(SpeechError::Halted);
        }
        self.log.lock().unwrap().push(text.to_string());
        self.check()?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn run_and_wait(&self) -> Result<(), SpeechError> {
        self.check()?;
        let pending = self.pending.swap(0, Ordering::SeqCst);
        pace(self.delay * pending, &self.halted);
        Ok(())
    }

    fn stop(&self) -> Result<(), SpeechError> {
        self.halted.store(true, Ordering::SeqCst);
        self.check()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
