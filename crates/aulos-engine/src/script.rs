//! Scripted in-memory engine for tests.
//!
//! [`ScriptedEngine`] replays a pre-recorded sequence of decode outcomes and
//! records everything the adapter does to it (bytes fed, feed resets, drop).
//! The shared [`ScriptedLogs`] handle survives the engine moving into a
//! session, so tests can assert on engine-side behavior after the fact.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::Bytes;

use crate::{
    engine::MpegEngine,
    error::{EngineError, EngineResult},
    policy::EnginePolicy,
    types::{DecodeStep, FormatReport, FrameInfo},
};

/// Minimal mutex wrapper with infallible `lock()` for tests.
pub struct CallLog<T> {
    inner: std::sync::Mutex<T>,
}

impl<T> CallLog<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: std::sync::Mutex::new(value),
        }
    }

    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.inner
            .lock()
            .expect("scripted engine log mutex should not be poisoned")
    }
}

/// Shared logs recording what the adapter did to a [`ScriptedEngine`].
#[derive(Clone)]
pub struct ScriptedLogs {
    feeds: Arc<CallLog<Vec<Bytes>>>,
    resets: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl ScriptedLogs {
    fn new() -> Self {
        Self {
            feeds: Arc::new(CallLog::new(Vec::new())),
            resets: Arc::new(AtomicUsize::new(0)),
            drops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every chunk fed to the engine, in order.
    #[must_use]
    pub fn feeds(&self) -> Vec<Bytes> {
        self.feeds.lock().clone()
    }

    /// All fed bytes concatenated, ignoring chunk boundaries.
    #[must_use]
    pub fn fed_bytes(&self) -> Vec<u8> {
        self.feeds
            .lock()
            .iter()
            .flat_map(|chunk| chunk.iter().copied())
            .collect()
    }

    /// Number of successful `reset_feed` calls.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Number of times the engine has been dropped (0 or 1).
    #[must_use]
    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

enum ScriptStep {
    Step(DecodeStep),
    /// Format change coupled with the report `format()` should serve next.
    NewFormat(FormatReport),
    Fail(EngineError),
}

/// Deterministic [`MpegEngine`] replaying a scripted outcome sequence.
///
/// `decode_frame` pops the next scripted outcome; an exhausted script is a
/// test bug and fails loudly. `frame_info` pops from its own queue, repeating
/// the last entry once the queue runs dry (real engines keep reporting the
/// last frame's metadata too).
pub struct ScriptedEngine {
    script: VecDeque<ScriptStep>,
    infos: VecDeque<FrameInfo>,
    last_info: Option<FrameInfo>,
    current_format: Option<FormatReport>,
    fail_next_reset: Option<EngineError>,
    policy: Option<EnginePolicy>,
    logs: ScriptedLogs,
}

impl ScriptedEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            infos: VecDeque::new(),
            last_info: None,
            current_format: None,
            fail_next_reset: None,
            policy: None,
            logs: ScriptedLogs::new(),
        }
    }

    /// Shared handle to this engine's call logs.
    #[must_use]
    pub fn logs(&self) -> ScriptedLogs {
        self.logs.clone()
    }

    /// Policy this engine was opened with, when constructed through
    /// [`MpegEngine::open_streaming`].
    #[must_use]
    pub fn policy(&self) -> Option<&EnginePolicy> {
        self.policy.as_ref()
    }

    /// Queue a format change; the report becomes visible via `format()` as
    /// soon as the step is served.
    pub fn push_format(&mut self, report: FormatReport) {
        self.script.push_back(ScriptStep::NewFormat(report));
    }

    /// Queue one decoded frame of PCM bytes.
    pub fn push_decoded(&mut self, pcm: impl Into<Bytes>) {
        self.script
            .push_back(ScriptStep::Step(DecodeStep::Decoded(pcm.into())));
    }

    /// Queue a needs-more-input outcome.
    pub fn push_need_more(&mut self) {
        self.script.push_back(ScriptStep::Step(DecodeStep::NeedMore));
    }

    /// Queue an end-of-stream outcome with trailing PCM bytes.
    pub fn push_finished(&mut self, pcm: impl Into<Bytes>) {
        self.script
            .push_back(ScriptStep::Step(DecodeStep::Finished(pcm.into())));
    }

    /// Queue a decode failure.
    pub fn push_error(&mut self, error: EngineError) {
        self.script.push_back(ScriptStep::Fail(error));
    }

    /// Queue per-frame metadata for the next `frame_info` calls.
    pub fn push_frame_info(&mut self, info: FrameInfo) {
        self.infos.push_back(info);
    }

    /// Make the next `reset_feed` call fail with `error`.
    pub fn fail_next_reset(&mut self, error: EngineError) {
        self.fail_next_reset = Some(error);
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MpegEngine for ScriptedEngine {
    fn open_streaming(policy: &EnginePolicy) -> EngineResult<Self> {
        let mut engine = Self::new();
        engine.policy = Some(policy.clone());
        Ok(engine)
    }

    fn feed(&mut self, data: &[u8]) -> EngineResult<()> {
        self.logs.feeds.lock().push(Bytes::copy_from_slice(data));
        Ok(())
    }

    fn decode_frame(&mut self) -> EngineResult<DecodeStep> {
        match self.script.pop_front() {
            Some(ScriptStep::Step(step)) => Ok(step),
            Some(ScriptStep::NewFormat(report)) => {
                self.current_format = Some(report);
                Ok(DecodeStep::FormatChanged)
            }
            Some(ScriptStep::Fail(error)) => Err(error),
            None => Err(EngineError::Decode("script exhausted".into())),
        }
    }

    fn format(&mut self) -> EngineResult<FormatReport> {
        self.current_format
            .ok_or_else(|| EngineError::Format("no format event scripted yet".into()))
    }

    fn frame_info(&mut self) -> EngineResult<FrameInfo> {
        if let Some(next) = self.infos.pop_front() {
            self.last_info = Some(next);
        }
        self.last_info
            .ok_or_else(|| EngineError::Format("no frame info scripted yet".into()))
    }

    fn reset_feed(&mut self) -> EngineResult<()> {
        if let Some(error) = self.fail_next_reset.take() {
            return Err(error);
        }
        self.logs.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.logs.drops.fetch_add(1, Ordering::SeqCst);
    }
}
