//! Audio output: play a file and learn when it ends.
//!
//! [`AudioOutput::play`] starts playback and returns a [`PlaybackHandle`]
//! that can stop it and await its end.  The end is signalled by the audio
//! side through a [`PlaybackCompletion`], which fires when dropped, so a
//! playback thread that exits for any reason still releases waiters.
//!
//! [`RodioOutput`] plays through the default output device.  The rodio
//! `OutputStream` is not `Send`, so it lives on a dedicated thread for the
//! lifetime of the output; only its `Send` handle is shared.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{mpsc as std_mpsc, Arc};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use thiserror::Error;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// OutputError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutputError {
    #[error("no audio output device available: {0}")]
    NoDevice(String),

    #[error("failed to open audio file: {0}")]
    Open(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("failed to start playback: {0}")]
    Play(String),
}

// ---------------------------------------------------------------------------
// PlaybackHandle / PlaybackCompletion
// ---------------------------------------------------------------------------

/// Control side of one playback.  Cheap to clone.
#[derive(Clone)]
pub struct PlaybackHandle {
    stop: Arc<dyn Fn() + Send + Sync>,
    done: watch::Receiver<bool>,
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("finished", &*self.done.borrow())
            .finish()
    }
}

/// Audio side of one playback; signals the end when dropped.
#[derive(Debug)]
pub struct PlaybackCompletion {
    tx: watch::Sender<bool>,
}

impl Drop for PlaybackCompletion {
    fn drop(&mut self) {
        self.tx.send_replace(true);
    }
}

impl PlaybackHandle {
    /// Create a handle whose `stop` runs `stop`, and the matching completion.
    pub fn new(stop: impl Fn() + Send + Sync + 'static) -> (Self, PlaybackCompletion) {
        let (tx, done) = watch::channel(false);
        (
            Self {
                stop: Arc::new(stop),
                done,
            },
            PlaybackCompletion { tx },
        )
    }

    /// Ask the audio side to stop.  Completion follows asynchronously.
    pub fn stop(&self) {
        (self.stop)();
    }

    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }

    /// Wait until playback has ended, naturally or by [`stop`](Self::stop).
    pub async fn finished(&self) {
        let mut done = self.done.clone();
        // An error means the completion was dropped, which also means done.
        let _ = done.wait_for(|finished| *finished).await;
    }
}

// ---------------------------------------------------------------------------
// AudioOutput trait
// ---------------------------------------------------------------------------

/// An exclusive audio output device.
pub trait AudioOutput: Send + Sync {
    /// Start playing the audio file at `path`.
    fn play(&self, path: &Path) -> Result<PlaybackHandle, OutputError>;
}

// ---------------------------------------------------------------------------
// RodioOutput
// ---------------------------------------------------------------------------

pub struct RodioOutput {
    handle: OutputStreamHandle,
    // Dropping the sender ends the thread that owns the OutputStream.
    _keep_alive: std_mpsc::Sender<()>,
}

impl RodioOutput {
    /// Open the default output device.
    pub fn new() -> Result<Self, OutputError> {
        let (handle_tx, handle_rx) = std_mpsc::channel();
        let (keep_alive, shutdown) = std_mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    // Blocks until RodioOutput is dropped.
                    let _ = shutdown.recv();
                    drop(stream);
                    log::debug!("output: stream closed");
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(OutputError::NoDevice(e.to_string())));
                }
            })
            .map_err(|e| OutputError::NoDevice(e.to_string()))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| OutputError::NoDevice("audio output thread exited".into()))??;

        log::info!("output: default device opened");
        Ok(Self {
            handle,
            _keep_alive: keep_alive,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn play(&self, path: &Path) -> Result<PlaybackHandle, OutputError> {
        let file = File::open(path).map_err(|e| OutputError::Open(e.to_string()))?;
        let source =
            Decoder::new(BufReader::new(file)).map_err(|e| OutputError::Decode(e.to_string()))?;
        let sink =
            Arc::new(Sink::try_new(&self.handle).map_err(|e| OutputError::Play(e.to_string()))?);
        sink.append(source);

        let stopper = Arc::clone(&sink);
        let (handle, completion) = PlaybackHandle::new(move || stopper.stop());

        std::thread::Builder::new()
            .name("audio-playback".into())
            .spawn(move || {
                sink.sleep_until_end();
                drop(completion);
            })
            .map_err(|e| OutputError::Play(e.to_string()))?;

        Ok(handle)
    }
}

// ---------------------------------------------------------------------------
// FakeOutput (test-only)
// ---------------------------------------------------------------------------

/// Records play/stop events and tracks how many playbacks are alive at once.
///
/// Playback never ends on its own; tests end it with [`FakeOutput::finish_all`]
/// or by stopping it.
#[cfg(test)]
#[derive(Default)]
pub struct FakeOutput {
    state: std::sync::Arc<std::sync::Mutex<FakeState>>,
}

#[cfg(test)]
#[derive(Default)]
pub struct FakeState {
    pub events: Vec<String>,
    pub active: usize,
    pub max_active: usize,
    completions: Vec<Option<PlaybackCompletion>>,
}

#[cfg(test)]
impl FakeOutput {
    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn active(&self) -> usize {
        self.state.lock().unwrap().active
    }

    pub fn max_active(&self) -> usize {
        self.state.lock().unwrap().max_active
    }

    /// End every running playback as if the audio reached its end.
    pub fn finish_all(&self) {
        let mut state = self.state.lock().unwrap();
        let mut ended = 0;
        for slot in state.completions.iter_mut() {
            if slot.take().is_some() {
                ended += 1;
            }
        }
        state.active -= ended;
    }
}

#[cfg(test)]
impl AudioOutput for FakeOutput {
    fn play(&self, path: &Path) -> Result<PlaybackHandle, OutputError> {
        let mut state = self.state.lock().unwrap();
        let index = state.completions.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        state.events.push(format!("play {name}"));
        state.active += 1;
        state.max_active = state.max_active.max(state.active);

        let shared = std::sync::Arc::clone(&self.state);
        let (handle, completion) = PlaybackHandle::new(move || {
            let mut state = shared.lock().unwrap();
            if let Some(completion) = state.completions[index].take() {
                state.events.push(format!("stop {index}"));
                state.active -= 1;
                drop(completion);
            }
        });
        state.completions.push(Some(completion));
        Ok(handle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
