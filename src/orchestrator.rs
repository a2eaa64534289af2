use crate::playback::{AudioSession, PlaybackError};
use crate::styles::CoachingStyle;
use crate::synthesis::Synthesizer;
use crate::turn::TurnNotifier;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Synthesis gets time-based backoff: its failures are bursty and clear
/// on their own.
const SYNTH_MAX_ATTEMPTS: u32 = 2;
const SYNTH_BACKOFF_STEP: Duration = Duration::from_millis(500);
const SYNTH_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Playback gets reset-based recovery: the audio session's failure mode
/// is "stuck in the wrong mode until forcibly reset".
const PLAYBACK_RECOVERY_ROUNDS: u32 = 2;
const RECOVERY_DELAY_STEP: Duration = Duration::from_millis(300);
const RESET_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Gap between natural finish and the turn-advance broadcast, so the
/// listening phase never races the audio session teardown.
const TURN_ADVANCE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPhase {
    Idle,
    Synthesizing,
    Playing,
}

enum Outcome {
    Finished(bool),
    Superseded,
}

enum Step<T> {
    Done(T),
    Failed,
    Superseded,
}

/// Composes the synthesis client and the playback session behind one
/// retry/recovery policy and a single-shot completion callback.
///
/// Every `deliver` call claims a generation from an atomic counter; any
/// async result (synthesis response, timer, play result, finish signal)
/// is applied only while its generation is still current. `stop()` and a
/// newer `deliver` bump the counter, so stale in-flight work degrades to
/// a silent no-op instead of touching the session or double-firing a
/// callback.
#[derive(Clone)]
pub struct SpeechOrchestrator {
    synth: Arc<dyn Synthesizer>,
    session: Arc<dyn AudioSession>,
    notifier: TurnNotifier,
    credential: String,
    generation: Arc<AtomicU64>,
    phase: Arc<AtomicU8>,
}

impl SpeechOrchestrator {
    pub fn new(
        credential: &str,
        synth: Arc<dyn Synthesizer>,
        session: Arc<dyn AudioSession>,
        notifier: TurnNotifier,
    ) -> Self {
        Self {
            synth,
            session,
            notifier,
            credential: credential.to_string(),
            generation: Arc::new(AtomicU64::new(0)),
            phase: Arc::new(AtomicU8::new(DeliveryPhase::Idle as u8)),
        }
    }

    /// Deliver one utterance. Non-blocking: the work runs on a spawned
    /// task and `on_done` fires exactly once with the outcome, on one of
    /// synthesis exhaustion, playback exhaustion, a decode error, or
    /// natural finish. A delivery superseded by `stop()` or a newer
    /// `deliver` call never fires its callback.
    pub fn deliver<F>(&self, text: &str, style: CoachingStyle, on_done: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        // Configuration failures resolve immediately, with no network
        // call and without disturbing any delivery already in flight.
        if self.credential.is_empty() {
            eprintln!("Delivery refused: no synthesis credential configured");
            on_done(false);
            return;
        }
        if text.trim().is_empty() {
            eprintln!("Delivery refused: empty utterance");
            on_done(false);
            return;
        }

        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        println!("Delivering ({:?}): {}", style, text);

        let this = self.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            // Preemption: a new delivery replaces whatever is playing.
            this.session.stop().await;
            this.set_phase(gen, DeliveryPhase::Synthesizing);

            match this.run(gen, &text, style).await {
                Outcome::Finished(success) => {
                    if !success {
                        // Drop any half-staged player state.
                        this.session.stop().await;
                    }
                    this.set_phase(gen, DeliveryPhase::Idle);
                    println!("Delivery finished (success: {})", success);
                    on_done(success);
                    if success {
                        tokio::time::sleep(TURN_ADVANCE_DELAY).await;
                        if this.is_current(gen) {
                            this.notifier.announce();
                        }
                    }
                }
                // Superseded deliveries stay silent: the preempting call
                // owns the session and the conversation turn now.
                Outcome::Superseded => {}
            }
        });
    }

    /// Halt any active playback and discard all in-flight work for the
    /// current delivery. Silent: the cancelled delivery's callback never
    /// fires.
    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.phase
            .store(DeliveryPhase::Idle as u8, Ordering::SeqCst);
        self.session.stop().await;
    }

    pub fn phase(&self) -> DeliveryPhase {
        match self.phase.load(Ordering::SeqCst) {
            p if p == DeliveryPhase::Synthesizing as u8 => DeliveryPhase::Synthesizing,
            p if p == DeliveryPhase::Playing as u8 => DeliveryPhase::Playing,
            _ => DeliveryPhase::Idle,
        }
    }

    fn is_current(&self, gen: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == gen
    }

    fn set_phase(&self, gen: u64, phase: DeliveryPhase) {
        if self.is_current(gen) {
            self.phase.store(phase as u8, Ordering::SeqCst);
        }
    }

    async fn run(&self, gen: u64, text: &str, style: CoachingStyle) -> Outcome {
        let bytes = match self.synthesize_with_retry(gen, text, style).await {
            Step::Done(bytes) => bytes,
            Step::Failed => return Outcome::Finished(false),
            Step::Superseded => return Outcome::Superseded,
        };

        let finish_rx = match self.start_playback(gen, &bytes).await {
            Step::Done(rx) => rx,
            Step::Failed => return Outcome::Finished(false),
            Step::Superseded => return Outcome::Superseded,
        };
        self.set_phase(gen, DeliveryPhase::Playing);

        // Exactly one finish signal per started player; a dropped sender
        // counts as a playback error.
        let finished = finish_rx.await.unwrap_or(false);
        if !self.is_current(gen) {
            return Outcome::Superseded;
        }
        Outcome::Finished(finished)
    }

    async fn synthesize_with_retry(
        &self,
        gen: u64,
        text: &str,
        style: CoachingStyle,
    ) -> Step<Vec<u8>> {
        for attempt in 1..=SYNTH_MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(SYNTH_BACKOFF_STEP * (attempt - 1)).await;
                // Let the transient condition clear before resending.
                tokio::time::sleep(SYNTH_SETTLE_DELAY).await;
            }
            if !self.is_current(gen) {
                return Step::Superseded;
            }

            match self.synth.synthesize(text, style).await {
                Ok(bytes) => {
                    if !self.is_current(gen) {
                        return Step::Superseded;
                    }
                    return Step::Done(bytes);
                }
                Err(e) if !e.is_retryable() => {
                    eprintln!("Synthesis misconfigured, not retrying: {}", e);
                    return Step::Failed;
                }
                Err(e) => {
                    eprintln!(
                        "Synthesis attempt {}/{} failed: {}",
                        attempt, SYNTH_MAX_ATTEMPTS, e
                    );
                }
            }
        }
        Step::Failed
    }

    async fn start_playback(&self, gen: u64, bytes: &[u8]) -> Step<oneshot::Receiver<bool>> {
        for round in 0..=PLAYBACK_RECOVERY_ROUNDS {
            if round > 0 {
                println!(
                    "Playback recovery round {}/{}",
                    round, PLAYBACK_RECOVERY_ROUNDS
                );
                tokio::time::sleep(RECOVERY_DELAY_STEP * round).await;
                if !self.is_current(gen) {
                    return Step::Superseded;
                }
                self.session.force_reset().await;
                if round == PLAYBACK_RECOVERY_ROUNDS {
                    // Give the last reset a moment to settle.
                    tokio::time::sleep(RESET_SETTLE_DELAY).await;
                }
            }
            if !self.is_current(gen) {
                return Step::Superseded;
            }

            if let Err(e) = self.session.configure().await {
                eprintln!("Audio session configure failed: {}", e);
                continue;
            }
            match self.session.load(bytes).await {
                Ok(()) => {}
                Err(e @ PlaybackError::Decode(_)) => {
                    // Corrupt audio is a data problem; a session reset
                    // will not fix it.
                    eprintln!("Audio rejected by decoder: {}", e);
                    return Step::Failed;
                }
                Err(e) => {
                    eprintln!("Audio load failed: {}", e);
                    continue;
                }
            }

            // The load may have suspended; never start a player for a
            // delivery that was superseded in the meantime.
            if !self.is_current(gen) {
                return Step::Superseded;
            }
            let (finish_tx, finish_rx) = oneshot::channel();
            if self.session.play(finish_tx).await {
                return Step::Done(finish_rx);
            }
            eprintln!("Playback did not start (attempt {})", round + 1);
        }
        Step::Failed
    }
}
