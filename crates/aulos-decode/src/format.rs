//! Mapping engine format reports onto the adapter's output format.

use aulos_engine::{FormatReport, SampleEncoding};

use crate::{
    error::{DecodeError, DecodeResult},
    types::{BlockSpec, MAX_CHANNELS, SampleFormat},
};

/// Resolve an engine format report into a [`BlockSpec`].
///
/// Only signed 8/16/32-bit integer and 32-bit float encodings are
/// representable; without external forcing the engine always picks signed
/// output, so anything else means a custom library build the adapter cannot
/// serve. Rejection is fatal to the current decode — there is no safe
/// default encoding to guess.
pub fn resolve_format(report: &FormatReport) -> DecodeResult<BlockSpec> {
    let format = match report.encoding {
        SampleEncoding::Signed8 => SampleFormat::S8,
        SampleEncoding::Signed16 => SampleFormat::S16,
        SampleEncoding::Signed32 => SampleFormat::S32,
        SampleEncoding::Float32 => SampleFormat::F32,
        other => return Err(DecodeError::UnsupportedEncoding(other)),
    };

    if report.sample_rate == 0 || report.channels == 0 || report.channels > MAX_CHANNELS {
        // A zero rate or impossible channel count is as unrepresentable as a
        // foreign encoding.
        return Err(DecodeError::UnsupportedEncoding(report.encoding));
    }

    Ok(BlockSpec {
        sample_rate: report.sample_rate,
        channels: report.channels,
        format,
    })
}
