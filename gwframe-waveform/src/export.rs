//! Streaming a waveform into a caller-supplied sink.
//!
//! The engine does not own any file format. [`Waveform::export`] walks the
//! grid once and hands a header followed by one record per sample to a
//! [`WaveformSink`]. [`TextSink`] is a whitespace-separated text writer over
//! any [`std::io::Write`].

use crate::{FrameType, ModeSet, Waveform};
use gwframe_core::{FrameResult, Quaternion};
use num_complex::Complex64;
use std::io::Write;

/// Everything about the waveform that does not vary per sample.
#[derive(Debug, Clone)]
pub struct ExportHeader<'a> {
    pub source: &'a str,
    pub modes: &'a ModeSet,
    pub n_times: usize,
    pub frame_type: FrameType,
    pub has_frame: bool,
    pub truncated: bool,
    pub history: &'a [String],
}

/// One time sample: the frame rotor (if any) and every mode in mode-set order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub index: usize,
    pub time: f64,
    pub frame: Option<Quaternion>,
    pub values: Vec<Complex64>,
}

/// Destination of [`Waveform::export`].
///
/// An error from any method aborts the export and is returned to the caller.
pub trait WaveformSink {
    fn begin(&mut self, header: &ExportHeader<'_>) -> FrameResult<()>;

    fn record(&mut self, record: &ExportRecord) -> FrameResult<()>;

    fn finish(&mut self) -> FrameResult<()> {
        Ok(())
    }
}

impl Waveform {
    /// Streams the header and every sample into `sink`.
    pub fn export<S: WaveformSink + ?Sized>(&self, sink: &mut S) -> FrameResult<()> {
        let header = ExportHeader {
            source: &self.metadata().source,
            modes: self.modes(),
            n_times: self.n_times(),
            frame_type: self.frame_type(),
            has_frame: self.frame().is_some(),
            truncated: self.is_truncated(),
            history: self.history(),
        };
        sink.begin(&header)?;
        for (index, &time) in self.times().iter().enumerate() {
            let record = ExportRecord {
                index,
                time,
                frame: self.frame().and_then(|f| f.get(index)),
                values: self.column(index),
            };
            sink.record(&record)?;
        }
        sink.finish()
    }
}

/// Writes `#`-prefixed header lines, then one line per sample:
/// `t [w x y z] Re(h) Im(h) ...`.
#[derive(Debug)]
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> WaveformSink for TextSink<W> {
    fn begin(&mut self, header: &ExportHeader<'_>) -> FrameResult<()> {
        let w = &mut self.writer;
        writeln!(w, "# source: {}", header.source)?;
        writeln!(w, "# frame: {}", header.frame_type)?;
        writeln!(w, "# truncated: {}", header.truncated)?;
        for entry in header.history {
            writeln!(w, "# history: {}", entry)?;
        }
        write!(w, "# t")?;
        if header.has_frame {
            write!(w, " R_w R_x R_y R_z")?;
        }
        for (ell, m) in header.modes.iter() {
            write!(w, " Re(h_{ell},{m}) Im(h_{ell},{m})")?;
        }
        writeln!(w)?;
        Ok(())
    }

    fn record(&mut self, record: &ExportRecord) -> FrameResult<()> {
        let w = &mut self.writer;
        write!(w, "{:e}", record.time)?;
        if let Some(q) = record.frame {
            write!(w, " {:e} {:e} {:e} {:e}", q.w, q.x, q.y, q.z)?;
        }
        for z in &record.values {
            write!(w, " {:e} {:e}", z.re, z.im)?;
        }
        writeln!(w)?;
        Ok(())
    }

    fn finish(&mut self) -> FrameResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
