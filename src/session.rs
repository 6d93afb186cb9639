//! Per-call session state and the callback adapter.
//!
//! A [`Session`] is created for each synth call and registered in the
//! [`SessionRegistry`] under a generated token. That token is the only
//! correlation mechanism: the engine echoes it back in every event record, and
//! the callback adapter uses it to find the accumulation buffer to append to.
//! The registry entry doubles as the keep-alive for engine-side references and
//! is released exactly once by the orchestrator, on whichever path concludes
//! the call.

use crate::engine::CallbackOutcome;
use crate::error::SynthError;
use crate::event::{decode_events, DeliveryMode};
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

pub type SynthResult = Result<(), SynthError>;

/// State owned by one synth call.
///
/// The accumulation buffer is written only by callback invocations correlated
/// to this session; the completion signal is its publication point, after
/// which the orchestrator is the sole reader.
pub struct Session {
    pcm: Mutex<Vec<u8>>,
    done: Mutex<Option<oneshot::Sender<SynthResult>>>,
}

impl Session {
    pub fn new() -> (Arc<Session>, oneshot::Receiver<SynthResult>) {
        let (tx, rx) = oneshot::channel();
        let session = Arc::new(Session {
            pcm: Mutex::new(Vec::new()),
            done: Mutex::new(Some(tx)),
        });

        (session, rx)
    }

    /// Append a chunk of samples as little-endian bytes. Chunks from
    /// successive callbacks arrive in generation order.
    pub fn append_samples(&self, samples: &[i16]) -> io::Result<()> {
        let mut pcm = self.pcm.plock();
        for &sample in samples {
            pcm.write_i16::<LittleEndian>(sample)?;
        }

        Ok(())
    }

    /// Resolve the completion signal. The first call wins; the signal has
    /// capacity for exactly one result, so a late or repeated resolution is
    /// discarded without blocking.
    pub fn complete(&self, result: SynthResult) {
        let Some(tx) = self.done.plock().take() else {
            trace!("session already completed, discarding result: {result:?}");
            return;
        };

        // A send error means the orchestrator already gave up (timeout path).
        if tx.send(result).is_err() {
            debug!("completion signal fired after the waiter went away");
        }
    }

    /// Take the accumulated PCM bytes. Only meaningful after the completion
    /// signal has fired.
    pub fn take_pcm(&self) -> Vec<u8> {
        std::mem::take(&mut *self.pcm.plock())
    }
}

/// Mapping from generated request tokens to their owning sessions.
///
/// Replaces raw pointer round-tripping through the engine: the engine only
/// ever sees the token, never a reference into caller memory.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u64, Arc<Session>>>,
    next_token: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its token. Keeps the session reachable
    /// until [`release`](Self::release).
    pub fn register(&self, session: Arc<Session>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        self.sessions.plock().insert(token, session);

        token
    }

    pub fn resolve(&self, token: u64) -> Option<Arc<Session>> {
        self.sessions.plock().get(&token).cloned()
    }

    /// Drop the keep-alive for a token. Subsequent callbacks carrying it are
    /// residual and get ignored by the adapter.
    pub fn release(&self, token: u64) -> Option<Arc<Session>> {
        self.sessions.plock().remove(&token)
    }
}

/// The synth callback body: runs on the engine's delivery path.
///
/// Decodes the record block, resolves the owning session, appends the sample
/// chunk and checks for termination. Completion is event-based: a
/// MsgTerminated event resolves the session's signal. Residual invocations for
/// an already-released token tell the engine to stop.
pub fn synth_callback(
    registry: &SessionRegistry,
    mode: DeliveryMode,
    samples: &[i16],
    records: &[u8],
) -> CallbackOutcome {
    let events = decode_events(records, mode);

    let Some(first) = events.first() else {
        return CallbackOutcome::Continue;
    };

    let Some(session) = registry.resolve(first.token) else {
        trace!(
            "residual callback for token {}: {} samples dropped",
            first.token,
            samples.len()
        );
        return CallbackOutcome::Stop;
    };

    if let Err(e) = session.append_samples(samples) {
        session.complete(Err(e.into()));
        return CallbackOutcome::Stop;
    }

    if events.iter().any(|event| event.is_terminal()) {
        session.complete(Ok(()));
    }

    CallbackOutcome::Continue
}

/// Lock that recovers the inner value instead of propagating poison.
pub(crate) trait PoisonlessLock<T> {
    fn plock(&self) -> MutexGuard<'_, T>;
}

impl<T> PoisonlessLock<T> for Mutex<T> {
    fn plock(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
