use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio session unavailable: {0}")]
    SessionConfig(String),
    #[error("failed to decode audio: {0}")]
    Decode(String),
}

/// Exclusive owner of the audio output session. At most one staged player
/// and one active player exist at any time; starting a new player stops
/// the previous one. All mutation is serialized onto one worker thread,
/// so the trait is safe to share across tasks.
///
/// `play` takes a one-shot finish sender: it fires exactly once per
/// started player, `true` on natural completion, `false` on a mid-stream
/// error. If `play` returns `false` the player did not start and the
/// sender is dropped unfired.
#[async_trait]
pub trait AudioSession: Send + Sync {
    async fn configure(&self) -> Result<(), PlaybackError>;
    async fn load(&self, bytes: &[u8]) -> Result<(), PlaybackError>;
    async fn play(&self, on_finish: oneshot::Sender<bool>) -> bool;
    /// Unconditionally deactivate and reinitialize the session,
    /// discarding staged/active state. Safe when nothing is active.
    async fn force_reset(&self);
    /// Halt and drop any active player; silent.
    async fn stop(&self);
}

/// Stand-in session for when audio output is disabled: every delivery
/// "plays" instantly and reports natural completion, so conversation
/// turns keep advancing without a sound device.
pub struct MutedSession;

#[async_trait]
impl AudioSession for MutedSession {
    async fn configure(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn load(&self, _bytes: &[u8]) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn play(&self, on_finish: oneshot::Sender<bool>) -> bool {
        let _ = on_finish.send(true);
        true
    }

    async fn force_reset(&self) {}

    async fn stop(&self) {}
}

enum SessionCommand {
    Configure(oneshot::Sender<Result<(), PlaybackError>>),
    Load(Vec<u8>, oneshot::Sender<Result<(), PlaybackError>>),
    Play(oneshot::Sender<bool>, oneshot::Sender<bool>),
    ForceReset(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
}

/// Rodio-backed session. The output stream is not `Send`, so it lives on
/// a dedicated thread and commands are message-passed to it; this thread
/// is the single coordination context for all session mutation. The
/// active-player slot is additionally shared with each finish watcher so
/// a drained player is released as soon as it completes.
pub struct RodioSession {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl RodioSession {
    pub fn new(volume: f32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<SessionCommand>();

        thread::spawn(move || {
            session_worker(rx, volume);
        });

        Self { tx }
    }
}

fn session_worker(mut rx: mpsc::UnboundedReceiver<SessionCommand>, volume: f32) {
    // Audio stream must live on this thread
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut staged: Option<Decoder<Cursor<Vec<u8>>>> = None;
    let active: Arc<Mutex<Option<Arc<Sink>>>> = Arc::new(Mutex::new(None));

    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            SessionCommand::Configure(reply) => {
                let result = if output.is_some() {
                    Ok(())
                } else {
                    match OutputStream::try_default() {
                        Ok(pair) => {
                            output = Some(pair);
                            Ok(())
                        }
                        Err(e) => Err(PlaybackError::SessionConfig(e.to_string())),
                    }
                };
                let _ = reply.send(result);
            }
            SessionCommand::Load(bytes, reply) => {
                let result = match Decoder::new(Cursor::new(bytes)) {
                    Ok(source) => {
                        staged = Some(source);
                        Ok(())
                    }
                    Err(e) => Err(PlaybackError::Decode(e.to_string())),
                };
                let _ = reply.send(result);
            }
            SessionCommand::Play(finish, reply) => {
                let started = start_staged(&output, &mut staged, &active, volume, finish);
                let _ = reply.send(started);
            }
            SessionCommand::ForceReset(reply) => {
                if let Some(sink) = active.lock().unwrap().take() {
                    sink.stop();
                }
                staged = None;
                // Drop the old stream before reopening the device.
                drop(output.take());
                // Reinitialize eagerly; a failure here is retried by the
                // next Configure.
                output = OutputStream::try_default().ok();
                let _ = reply.send(());
            }
            SessionCommand::Stop(reply) => {
                if let Some(sink) = active.lock().unwrap().take() {
                    sink.stop();
                }
                staged = None;
                let _ = reply.send(());
            }
        }
    }
}

fn start_staged(
    output: &Option<(OutputStream, OutputStreamHandle)>,
    staged: &mut Option<Decoder<Cursor<Vec<u8>>>>,
    active: &Arc<Mutex<Option<Arc<Sink>>>>,
    volume: f32,
    finish: oneshot::Sender<bool>,
) -> bool {
    let handle = match output {
        Some((_, handle)) => handle,
        None => return false,
    };
    let source = match staged.take() {
        Some(source) => source,
        None => return false,
    };

    // Exclusivity: never two concurrent players.
    if let Some(prev) = active.lock().unwrap().take() {
        prev.stop();
    }

    let sink = match Sink::try_new(handle) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            eprintln!("Failed to create sink: {}", e);
            return false;
        }
    };

    sink.set_volume(volume);
    sink.append(source.convert_samples::<f32>());

    let watcher = sink.clone();
    let active_slot = active.clone();
    thread::spawn(move || {
        watcher.sleep_until_end();
        // A source that was cut short by a stream error drains the same
        // way as natural completion; rodio does not distinguish them.
        let _ = finish.send(true);
        release_drained(&active_slot, &watcher);
    });

    *active.lock().unwrap() = Some(sink);
    true
}

/// Clear the active-player slot once its player has drained. A player
/// that was already replaced by a newer one is left alone.
fn release_drained(active: &Mutex<Option<Arc<Sink>>>, drained: &Arc<Sink>) {
    let mut guard = active.lock().unwrap();
    if guard.as_ref().map_or(false, |a| Arc::ptr_eq(a, drained)) {
        *guard = None;
    }
}

#[async_trait]
impl AudioSession for RodioSession {
    async fn configure(&self) -> Result<(), PlaybackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(SessionCommand::Configure(reply_tx)).is_err() {
            return Err(PlaybackError::SessionConfig("audio worker gone".into()));
        }
        reply_rx
            .await
            .unwrap_or_else(|_| Err(PlaybackError::SessionConfig("audio worker gone".into())))
    }

    async fn load(&self, bytes: &[u8]) -> Result<(), PlaybackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(SessionCommand::Load(bytes.to_vec(), reply_tx))
            .is_err()
        {
            return Err(PlaybackError::SessionConfig("audio worker gone".into()));
        }
        reply_rx
            .await
            .unwrap_or_else(|_| Err(PlaybackError::SessionConfig("audio worker gone".into())))
    }

    async fn play(&self, on_finish: oneshot::Sender<bool>) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(SessionCommand::Play(on_finish, reply_tx))
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    async fn force_reset(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(SessionCommand::ForceReset(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }
    }

    async fn stop(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(SessionCommand::Stop(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_muted_session_reports_instant_finish() {
        let session = MutedSession;

        assert!(session.configure().await.is_ok());
        assert!(session.load(b"any-bytes").await.is_ok());

        let (finish_tx, finish_rx) = oneshot::channel();
        assert!(session.play(finish_tx).await);
        assert_eq!(finish_rx.await, Ok(true));
    }

    #[test]
    fn test_release_drained_clears_finished_player() {
        let (sink, _queue) = Sink::new_idle();
        let sink = Arc::new(sink);
        let active = Mutex::new(Some(sink.clone()));

        release_drained(&active, &sink);

        assert!(active.lock().unwrap().is_none());
    }

    #[test]
    fn test_release_drained_leaves_replacement_player() {
        let (old, _old_queue) = Sink::new_idle();
        let (new, _new_queue) = Sink::new_idle();
        let old = Arc::new(old);
        let new = Arc::new(new);
        let active = Mutex::new(Some(new.clone()));

        // The drained player was already replaced; the slot keeps the
        // newer one.
        release_drained(&active, &old);

        assert!(active.lock().unwrap().is_some());
    }
}
