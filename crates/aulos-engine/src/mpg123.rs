//! libmpg123 engine backend.
//!
//! Streaming decode via the feed API: `mpg123_feed` buffers compressed
//! bytes, `mpg123_decode_frame` drains one frame at a time. The handle is
//! opened with `mpg123_open_feed`, so the library never assumes a seekable
//! source.
//!
//! Enabled with the `libmpg123` feature; links the system library.

#![allow(unsafe_code)]

use std::{
    ffi::{CStr, c_char, c_double, c_int, c_long, c_void},
    ptr,
    sync::atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use tracing::debug;

use crate::{
    engine::MpegEngine,
    error::{EngineError, EngineResult},
    policy::EnginePolicy,
    types::{
        BitrateMode, DecodeStep, FormatReport, FrameInfo, MpegLayer, MpegVersion, SampleEncoding,
    },
};

/// 64-bit off_t. The plain libmpg123 symbols are the 64-bit variants on
/// LP64 targets, which is where this backend is supported.
type Mpg123Off = i64;

// Return codes (enum mpg123_errors)
const MPG123_DONE: c_int = -12;
const MPG123_NEW_FORMAT: c_int = -11;
const MPG123_NEED_MORE: c_int = -10;
const MPG123_OK: c_int = 0;

// Parameter keys (enum mpg123_parms)
const MPG123_ADD_FLAGS: c_int = 2;
const MPG123_REMOVE_FLAGS: c_int = 13;
const MPG123_RESYNC_LIMIT: c_int = 14;

// Parameter flags (enum mpg123_param_flags)
const MPG123_QUIET: c_long = 0x20;
const MPG123_AUTO_RESAMPLE: c_long = 0x8000;

// Sample encodings (enum mpg123_enc_enum)
const MPG123_ENC_UNSIGNED_8: c_int = 0x01;
const MPG123_ENC_ULAW_8: c_int = 0x04;
const MPG123_ENC_ALAW_8: c_int = 0x08;
const MPG123_ENC_SIGNED_8: c_int = 0x82;
const MPG123_ENC_UNSIGNED_16: c_int = 0x60;
const MPG123_ENC_SIGNED_16: c_int = 0xd0;
const MPG123_ENC_UNSIGNED_24: c_int = 0x4020;
const MPG123_ENC_SIGNED_24: c_int = 0x4090;
const MPG123_ENC_UNSIGNED_32: c_int = 0x2100;
const MPG123_ENC_SIGNED_32: c_int = 0x1180;
const MPG123_ENC_FLOAT_32: c_int = 0x200;
const MPG123_ENC_FLOAT_64: c_int = 0x400;

// enum mpg123_vbr
const MPG123_CBR: c_int = 0;
const MPG123_VBR: c_int = 1;
const MPG123_ABR: c_int = 2;

// enum mpg123_version
const MPG123_1_0: c_int = 0;
const MPG123_2_0: c_int = 1;
const MPG123_2_5: c_int = 2;

/// struct mpg123_frameinfo
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct Mpg123FrameInfo {
    version: c_int,
    layer: c_int,
    rate: c_long,
    mode: c_int,
    mode_ext: c_int,
    framesize: c_int,
    flags: c_int,
    emphasis: c_int,
    bitrate: c_int,
    abr_rate: c_int,
    vbr: c_int,
}

#[link(name = "mpg123")]
unsafe extern "C" {
    fn mpg123_init() -> c_int;
    fn mpg123_exit();
    fn mpg123_new(decoder: *const c_char, error: *mut c_int) -> *mut c_void;
    fn mpg123_delete(mh: *mut c_void);
    fn mpg123_param(mh: *mut c_void, key: c_int, value: c_long, fvalue: c_double) -> c_int;
    fn mpg123_open_feed(mh: *mut c_void) -> c_int;
    fn mpg123_close(mh: *mut c_void) -> c_int;
    fn mpg123_feed(mh: *mut c_void, input: *const u8, size: usize) -> c_int;
    fn mpg123_decode_frame(
        mh: *mut c_void,
        num: *mut Mpg123Off,
        audio: *mut *mut u8,
        bytes: *mut usize,
    ) -> c_int;
    fn mpg123_getformat(
        mh: *mut c_void,
        rate: *mut c_long,
        channels: *mut c_int,
        encoding: *mut c_int,
    ) -> c_int;
    fn mpg123_info(mh: *mut c_void, info: *mut Mpg123FrameInfo) -> c_int;
    fn mpg123_strerror(mh: *mut c_void) -> *const c_char;
    fn mpg123_plain_strerror(errcode: c_int) -> *const c_char;
}

/// One matched `mpg123_init`/`mpg123_exit` pair may be in flight per
/// process; a second live handle would tear down library state under the
/// first one's feet.
static LIBRARY_ACTIVE: AtomicBool = AtomicBool::new(false);

fn plain_error(code: c_int) -> String {
    let ptr = unsafe { mpg123_plain_strerror(code) };
    if ptr.is_null() {
        return format!("error code {code}");
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn encoding_from_raw(raw: c_int) -> Option<SampleEncoding> {
    match raw {
        MPG123_ENC_UNSIGNED_8 => Some(SampleEncoding::Unsigned8),
        MPG123_ENC_SIGNED_8 => Some(SampleEncoding::Signed8),
        MPG123_ENC_UNSIGNED_16 => Some(SampleEncoding::Unsigned16),
        MPG123_ENC_SIGNED_16 => Some(SampleEncoding::Signed16),
        MPG123_ENC_UNSIGNED_24 => Some(SampleEncoding::Unsigned24),
        MPG123_ENC_SIGNED_24 => Some(SampleEncoding::Signed24),
        MPG123_ENC_UNSIGNED_32 => Some(SampleEncoding::Unsigned32),
        MPG123_ENC_SIGNED_32 => Some(SampleEncoding::Signed32),
        MPG123_ENC_FLOAT_32 => Some(SampleEncoding::Float32),
        MPG123_ENC_FLOAT_64 => Some(SampleEncoding::Float64),
        MPG123_ENC_ULAW_8 => Some(SampleEncoding::ULaw8),
        MPG123_ENC_ALAW_8 => Some(SampleEncoding::ALaw8),
        _ => None,
    }
}

/// [`MpegEngine`] backed by libmpg123 in feed mode.
pub struct Mpg123Engine {
    handle: *mut c_void,
}

// The handle is exclusively owned and never aliased across threads.
unsafe impl Send for Mpg123Engine {}

impl Mpg123Engine {
    fn last_error(&self) -> String {
        let ptr = unsafe { mpg123_strerror(self.handle) };
        if ptr.is_null() {
            return "unknown engine error".into();
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    fn apply_policy(&mut self, policy: &EnginePolicy) {
        // Failures here are non-fatal on old library builds; the flags are
        // best-effort, the decode still works without them.
        if policy.quiet {
            let _ = unsafe { mpg123_param(self.handle, MPG123_ADD_FLAGS, MPG123_QUIET, 0.0) };
        }
        let limit = match policy.resync_limit {
            Some(limit) => c_long::from(i32::try_from(limit).unwrap_or(i32::MAX)),
            None => -1,
        };
        let _ = unsafe { mpg123_param(self.handle, MPG123_RESYNC_LIMIT, limit, 0.0) };
        if !policy.auto_resample {
            // Keeps one frame bounded by MAX_FRAME_SAMPLES per channel.
            let _ =
                unsafe { mpg123_param(self.handle, MPG123_REMOVE_FLAGS, MPG123_AUTO_RESAMPLE, 0.0) };
        }
    }
}

impl MpegEngine for Mpg123Engine {
    fn open_streaming(policy: &EnginePolicy) -> EngineResult<Self> {
        if LIBRARY_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::AlreadyActive);
        }

        let ret = unsafe { mpg123_init() };
        if ret != MPG123_OK {
            LIBRARY_ACTIVE.store(false, Ordering::SeqCst);
            return Err(EngineError::LibraryInit(plain_error(ret)));
        }

        let mut err: c_int = 0;
        // Null decoder name = auto-choice of the optimized decoder.
        let handle = unsafe { mpg123_new(ptr::null(), &mut err) };
        if handle.is_null() {
            unsafe { mpg123_exit() };
            LIBRARY_ACTIVE.store(false, Ordering::SeqCst);
            return Err(EngineError::Allocation(plain_error(err)));
        }

        // From here on Drop owns the unwind: close, delete, exit, release
        // the library slot.
        let mut engine = Self { handle };
        engine.apply_policy(policy);

        let ret = unsafe { mpg123_open_feed(engine.handle) };
        if ret != MPG123_OK {
            return Err(EngineError::OpenFeed(engine.last_error()));
        }

        debug!(
            quiet = policy.quiet,
            resync_limit = ?policy.resync_limit,
            "opened mpg123 feed"
        );
        Ok(engine)
    }

    fn feed(&mut self, data: &[u8]) -> EngineResult<()> {
        let ret = unsafe { mpg123_feed(self.handle, data.as_ptr(), data.len()) };
        if ret != MPG123_OK {
            return Err(EngineError::Feed(self.last_error()));
        }
        Ok(())
    }

    fn decode_frame(&mut self) -> EngineResult<DecodeStep> {
        let mut num: Mpg123Off = 0;
        let mut audio: *mut u8 = ptr::null_mut();
        let mut bytes: usize = 0;
        let ret = unsafe { mpg123_decode_frame(self.handle, &mut num, &mut audio, &mut bytes) };

        match ret {
            MPG123_NEED_MORE => Ok(DecodeStep::NeedMore),
            MPG123_NEW_FORMAT => Ok(DecodeStep::FormatChanged),
            MPG123_OK | MPG123_DONE => {
                let pcm = if audio.is_null() || bytes == 0 {
                    Bytes::new()
                } else {
                    // The pointer targets the handle's internal buffer and
                    // stays valid only until the next library call; copy out.
                    Bytes::copy_from_slice(unsafe { std::slice::from_raw_parts(audio, bytes) })
                };
                if ret == MPG123_DONE {
                    Ok(DecodeStep::Finished(pcm))
                } else {
                    Ok(DecodeStep::Decoded(pcm))
                }
            }
            _ => Err(EngineError::Decode(self.last_error())),
        }
    }

    fn format(&mut self) -> EngineResult<FormatReport> {
        let mut rate: c_long = 0;
        let mut channels: c_int = 0;
        let mut encoding: c_int = 0;
        let ret =
            unsafe { mpg123_getformat(self.handle, &mut rate, &mut channels, &mut encoding) };
        if ret != MPG123_OK {
            return Err(EngineError::Format(self.last_error()));
        }

        let encoding = encoding_from_raw(encoding)
            .ok_or_else(|| EngineError::Format(format!("unknown encoding {encoding:#x}")))?;
        Ok(FormatReport {
            sample_rate: u32::try_from(rate)
                .map_err(|_| EngineError::Format(format!("bad sample rate {rate}")))?,
            channels: u16::try_from(channels)
                .map_err(|_| EngineError::Format(format!("bad channel count {channels}")))?,
            encoding,
        })
    }

    fn frame_info(&mut self) -> EngineResult<FrameInfo> {
        let mut info = Mpg123FrameInfo::default();
        let ret = unsafe { mpg123_info(self.handle, &mut info) };
        if ret != MPG123_OK {
            return Err(EngineError::Format(self.last_error()));
        }

        let mode = match info.vbr {
            MPG123_CBR => BitrateMode::Cbr,
            MPG123_VBR => BitrateMode::Vbr,
            MPG123_ABR => BitrateMode::Abr,
            other => return Err(EngineError::Format(format!("bad vbr mode {other}"))),
        };
        let version = match info.version {
            MPG123_1_0 => MpegVersion::Mpeg1,
            MPG123_2_0 => MpegVersion::Mpeg2,
            MPG123_2_5 => MpegVersion::Mpeg25,
            other => return Err(EngineError::Format(format!("bad mpeg version {other}"))),
        };
        let layer = match info.layer {
            1 => MpegLayer::I,
            2 => MpegLayer::II,
            3 => MpegLayer::III,
            other => return Err(EngineError::Format(format!("bad mpeg layer {other}"))),
        };

        Ok(FrameInfo {
            // The library reports kilobits.
            bitrate: u32::try_from(info.bitrate.max(0)).unwrap_or(0) * 1000,
            mode,
            frame_size: usize::try_from(info.framesize.max(0)).unwrap_or(0),
            version,
            layer,
            sample_rate: u32::try_from(info.rate.max(0)).unwrap_or(0),
        })
    }

    fn reset_feed(&mut self) -> EngineResult<()> {
        unsafe { mpg123_close(self.handle) };
        let ret = unsafe { mpg123_open_feed(self.handle) };
        if ret != MPG123_OK {
            return Err(EngineError::OpenFeed(self.last_error()));
        }
        debug!("reopened mpg123 feed");
        Ok(())
    }
}

impl Drop for Mpg123Engine {
    fn drop(&mut self) {
        unsafe {
            mpg123_close(self.handle);
            mpg123_delete(self.handle);
            mpg123_exit();
        }
        LIBRARY_ACTIVE.store(false, Ordering::SeqCst);
    }
}
