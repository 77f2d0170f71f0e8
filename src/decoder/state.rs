//! I/O-agnostic decompression state machine.
//!
//! [`DecodeCore`] owns the engine session and every scratch buffer, but never
//! touches a source. When it runs out of compressed input it returns
//! [`Step::NeedInput`]; the driving adapter reads into
//! [`input_slot`](DecodeCore::input_slot) and reports the byte count through
//! [`supply`](DecodeCore::supply). The sync and async adapters share this
//! core and differ only in how they perform that read.

use std::sync::Arc;

use log::{debug, trace, warn};

use super::ReadStatus;
use crate::buffer::{BufferClass, BufferPool, PooledBuffer};
use crate::config::DecoderConfig;
use crate::engine::Engine;
use crate::error::Error;

/// Outcome of one [`DecodeCore::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// The call is complete.
    Ready(ReadStatus),
    /// Fill [`DecodeCore::input_slot`] and call `step` again.
    NeedInput,
}

pub(crate) struct DecodeCore<E: Engine> {
    engine: E,
    session: E::Decompressor,
    config: DecoderConfig,
    pool: Arc<BufferPool>,

    /// Compressed bytes pulled from the source; `pos..len` is unread.
    input: Option<PooledBuffer>,
    pos: usize,
    len: usize,

    /// Engine output on the buffered path.
    scratch: Option<PooledBuffer>,

    /// Decompressed bytes not yet handed out; `offset..offset + owed`.
    carry: Option<PooledBuffer>,
    offset: usize,
    owed: usize,

    /// Input consumed since the current stream member began.
    member_in: usize,
    /// A buffered fill is in progress across source reads.
    filling: bool,
    source_eof: bool,
    closed: bool,
    error: Option<Error>,

    total_in: u64,
    total_out: u64,
}

impl<E: Engine> DecodeCore<E> {
    pub(crate) fn new(
        engine: E,
        config: DecoderConfig,
        pool: Arc<BufferPool>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let session = engine.new_decompressor()?;
        debug!(
            "decoder: session ready (direct threshold {}, input chunk {})",
            config.direct_threshold(),
            config.input_chunk_size()
        );

        Ok(Self {
            engine,
            session,
            config,
            pool,
            input: None,
            pos: 0,
            len: 0,
            scratch: None,
            carry: None,
            offset: 0,
            owed: 0,
            member_in: 0,
            filling: false,
            source_eof: false,
            closed: false,
            error: None,
            total_in: 0,
            total_out: 0,
        })
    }

    pub(crate) fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub(crate) fn total_in(&self) -> u64 {
        self.total_in
    }

    pub(crate) fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Advances the session, writing into `out[*written..]`.
    ///
    /// `written` must be 0 on the first step of a caller request and carries
    /// over between steps of the same request.
    pub(crate) fn step(&mut self, out: &mut [u8], written: &mut usize) -> Result<Step, Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        if let Some(err) = &self.error {
            return Err(err.replay());
        }
        if out.is_empty() {
            return Ok(self.ready(0));
        }

        if self.filling {
            return self.step_buffered(out, written);
        }
        if self.owed > 0 {
            *written += self.serve_carry(&mut out[*written..]);
            return Ok(self.ready(*written));
        }

        if out.len() >= self.config.direct_threshold() {
            self.step_direct(out, written)
        } else {
            // Nothing is owed, so the carry-over starts from the front again.
            self.offset = 0;
            self.filling = true;
            self.step_buffered(out, written)
        }
    }

    /// Returns the slot the next source read should fill.
    ///
    /// Only valid after [`Step::NeedInput`]. Discards the (empty) unread
    /// window.
    pub(crate) fn input_slot(&mut self) -> &mut [u8] {
        let chunk = self.config.input_chunk_size();
        let pool = &self.pool;
        let input = self
            .input
            .get_or_insert_with(|| pool.acquire(BufferClass::CompressionInput));
        self.pos = 0;
        self.len = 0;
        &mut input[..chunk]
    }

    /// Records that the source delivered `n` bytes into the input slot.
    /// Zero marks the source as exhausted.
    pub(crate) fn supply(&mut self, n: usize) {
        if n == 0 {
            trace!("decoder: source exhausted");
            self.source_eof = true;
        } else {
            self.pos = 0;
            self.len = n;
        }
    }

    /// Releases the pooled buffers and closes the session for good.
    pub(crate) fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        self.closed = true;
        self.release_buffers();
        debug!(
            "decoder: closed after {} bytes in, {} bytes out",
            self.total_in, self.total_out
        );
        Ok(())
    }

    /// Reinitializes the session for a new source.
    pub(crate) fn reset(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        self.engine.reset_decompressor(&mut self.session);
        self.pos = 0;
        self.len = 0;
        self.offset = 0;
        self.owed = 0;
        self.member_in = 0;
        self.filling = false;
        self.source_eof = false;
        self.error = None;
        self.total_in = 0;
        self.total_out = 0;
        debug!("decoder: session reset");
        Ok(())
    }

    fn step_direct(&mut self, out: &mut [u8], written: &mut usize) -> Result<Step, Error> {
        loop {
            if *written == out.len() {
                return Ok(Step::Ready(ReadStatus::new(*written, false)));
            }
            if self.pos == self.len {
                if !self.source_eof {
                    return Ok(Step::NeedInput);
                }
                if self.member_in == 0 {
                    return Ok(self.ready(*written));
                }
            }

            let input = unread(&self.input, self.pos, self.len);
            let step = self
                .engine
                .decompress(&mut self.session, input, &mut out[*written..]);
            trace!("decoder: direct step {:?}", step);

            self.consume(step.consumed);
            *written += step.produced;
            self.total_out += step.produced as u64;

            if let Some(err) = step.status.into_error(None) {
                return self.fail(err, *written);
            }
            if step.finished {
                self.end_member();
                // Only already-buffered input carries on into the next member.
                if self.pos == self.len && *written > 0 {
                    return Ok(self.ready(*written));
                }
                continue;
            }
            if !step.made_progress() {
                let err = self.stall_error(step.status.code());
                return self.fail(err, *written);
            }
        }
    }

    /// Fills the carry-over until the current stream member ends or the
    /// source is exhausted, then serves it.
    fn step_buffered(&mut self, out: &mut [u8], written: &mut usize) -> Result<Step, Error> {
        loop {
            if self.pos == self.len {
                if !self.source_eof {
                    return Ok(Step::NeedInput);
                }
                if self.member_in == 0 {
                    break;
                }
            }

            let pool = &self.pool;
            let scratch = self
                .scratch
                .get_or_insert_with(|| pool.acquire(BufferClass::DecompressionOutput));
            let input = unread(&self.input, self.pos, self.len);
            let step = self.engine.decompress(&mut self.session, input, scratch);
            trace!("decoder: buffered step {:?}", step);

            self.consume(step.consumed);
            if step.produced > 0 {
                self.append_carry(step.produced);
            }

            if let Some(err) = step.status.into_error(None) {
                *written += self.serve_carry(&mut out[*written..]);
                return self.fail(err, *written);
            }
            if step.finished {
                self.end_member();
                if self.owed > 0 {
                    break;
                }
                continue;
            }
            if !step.made_progress() {
                let err = self.stall_error(step.status.code());
                *written += self.serve_carry(&mut out[*written..]);
                return self.fail(err, *written);
            }
        }

        self.filling = false;
        *written += self.serve_carry(&mut out[*written..]);
        Ok(self.ready(*written))
    }

    fn consume(&mut self, n: usize) {
        self.pos += n;
        self.member_in += n;
        self.total_in += n as u64;
    }

    fn end_member(&mut self) {
        trace!("decoder: stream member complete ({} bytes)", self.member_in);
        self.engine.reset_decompressor(&mut self.session);
        self.member_in = 0;
    }

    /// Moves the first `produced` bytes of the scratch buffer to the end of
    /// the carry-over, growing it when it runs out of room.
    fn append_carry(&mut self, produced: usize) {
        let Some(scratch) = self.scratch.as_deref() else {
            return;
        };
        let pool = &self.pool;
        let carry = self
            .carry
            .get_or_insert_with(|| pool.acquire(BufferClass::CarryOver));

        let start = self.offset + self.owed;
        let end = start + produced;
        if end > carry.len() {
            let growth = self.config.carry_growth();
            let mut new_len = carry.len();
            while new_len < end {
                new_len += growth;
            }
            carry.grow(new_len);
        }

        carry[start..end].copy_from_slice(&scratch[..produced]);
        self.owed += produced;
    }

    fn serve_carry(&mut self, out: &mut [u8]) -> usize {
        let Some(carry) = self.carry.as_deref() else {
            return 0;
        };
        let n = self.owed.min(out.len());
        out[..n].copy_from_slice(&carry[self.offset..self.offset + n]);
        self.offset += n;
        self.owed -= n;
        self.total_out += n as u64;
        n
    }

    /// The error for a call that made no progress.
    fn stall_error(&self, code: i32) -> Error {
        if self.pos == self.len && self.source_eof {
            Error::UnexpectedEndOfInput
        } else {
            Error::UnknownStatus(code)
        }
    }

    fn drained(&self) -> bool {
        self.owed == 0 && self.source_eof && self.pos == self.len && self.member_in == 0
    }

    fn ready(&self, written: usize) -> Step {
        Step::Ready(ReadStatus::new(written, self.drained()))
    }

    /// Makes `err` sticky. Bytes already produced by this request are still
    /// handed out; the error surfaces on the next one.
    fn fail(&mut self, err: Error, written: usize) -> Result<Step, Error> {
        warn!("decoder: session failed: {}", err);
        let replay = err.replay();
        self.error = Some(err);
        self.release_buffers();
        if written > 0 {
            Ok(Step::Ready(ReadStatus::new(written, false)))
        } else {
            Err(replay)
        }
    }

    fn release_buffers(&mut self) {
        for buf in [self.input.take(), self.scratch.take(), self.carry.take()]
            .into_iter()
            .flatten()
        {
            buf.release();
        }
        self.pos = 0;
        self.len = 0;
        self.offset = 0;
        self.owed = 0;
        self.filling = false;
    }
}

fn unread(input: &Option<PooledBuffer>, pos: usize, len: usize) -> &[u8] {
    match input.as_deref() {
        Some(buf) => &buf[pos..len],
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Deflate;

    fn core(threshold: usize) -> DecodeCore<Deflate> {
        let config = DecoderConfig::default()
            .with_direct_threshold(threshold)
            .with_carry_growth(1024);
        DecodeCore::new(Deflate::load().unwrap(), config, BufferPool::new(2)).unwrap()
    }

    fn compressed(data: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Drives one request against an in-memory source.
    fn drive(core: &mut DecodeCore<Deflate>, source: &mut &[u8], out: &mut [u8]) -> ReadStatus {
        let mut written = 0;
        loop {
            match core.step(out, &mut written).unwrap() {
                Step::Ready(status) => return status,
                Step::NeedInput => {
                    let slot = core.input_slot();
                    let n = slot.len().min(source.len());
                    slot[..n].copy_from_slice(&source[..n]);
                    *source = &source[n..];
                    core.supply(n);
                }
            }
        }
    }

    #[test]
    fn test_asks_for_input_first() {
        let mut core = core(16);
        let mut out = [0u8; 64];
        let mut written = 0;
        assert_eq!(core.step(&mut out, &mut written).unwrap(), Step::NeedInput);
    }

    #[test]
    fn test_empty_source_is_end_of_stream() {
        let mut core = core(16);
        let mut source: &[u8] = &[];
        let mut out = [0u8; 64];
        let status = drive(&mut core, &mut source, &mut out);
        assert_eq!(status, ReadStatus::new(0, true));
    }

    #[test]
    fn test_direct_path_decodes_into_caller_buffer() {
        let data = b"direct path decoding straight into the caller buffer".repeat(20);
        let stream = compressed(&data);
        let mut source = &stream[..];
        let mut core = core(16);

        let mut out = vec![0u8; data.len() + 10];
        let status = drive(&mut core, &mut source, &mut out);
        assert_eq!(status.written, data.len());
        assert_eq!(&out[..data.len()], &data[..]);

        // No carry-over is ever needed on the direct path
        assert!(core.carry.is_none());
    }

    #[test]
    fn test_buffered_path_uses_carry_over() {
        let data = b"0123456789abcdef".repeat(200);
        let stream = compressed(&data);
        let mut source = &stream[..];
        let mut core = core(4096);

        let mut decoded = Vec::new();
        let mut out = [0u8; 100];
        loop {
            let status = drive(&mut core, &mut source, &mut out);
            decoded.extend_from_slice(&out[..status.written]);
            if status.end_of_stream {
                break;
            }
            assert_eq!(status.written, out.len());
        }
        assert_eq!(decoded, data);
        assert!(core.carry.is_some());
    }

    #[test]
    fn test_buffered_fill_stops_at_member_end() {
        let first = b"a".repeat(5000);
        let second = b"b".repeat(7000);
        let mut stream = compressed(&first);
        stream.extend_from_slice(&compressed(&second));
        let mut source = &stream[..];
        let mut core = core(4096);

        // Only the first member is staged, although both are buffered
        let mut out = [0u8; 10];
        let status = drive(&mut core, &mut source, &mut out);
        assert_eq!(status, ReadStatus::new(10, false));
        assert_eq!(core.owed, first.len() - 10);
        assert!(core.pos < core.len);

        let mut decoded = out.to_vec();
        loop {
            let status = drive(&mut core, &mut source, &mut out);
            decoded.extend_from_slice(&out[..status.written]);
            if status.end_of_stream {
                break;
            }
        }
        assert_eq!(decoded.len(), first.len() + second.len());
        assert_eq!(&decoded[..first.len()], &first[..]);
        assert_eq!(&decoded[first.len()..], &second[..]);
    }

    #[test]
    fn test_direct_path_returns_at_member_end() {
        let data = b"one member only";
        let stream = compressed(data);
        let mut core = core(16);

        let mut out = [0u8; 64];
        let mut written = 0;
        assert_eq!(core.step(&mut out, &mut written).unwrap(), Step::NeedInput);
        let slot = core.input_slot();
        slot[..stream.len()].copy_from_slice(&stream);
        core.supply(stream.len());

        // The member ends with the input drained: no further read is requested
        let step = core.step(&mut out, &mut written).unwrap();
        assert_eq!(step, Step::Ready(ReadStatus::new(data.len(), false)));
        assert_eq!(&out[..data.len()], data);
    }

    #[test]
    fn test_truncated_stream_fails_and_sticks() {
        let data = vec![7u8; 10_000];
        let stream = compressed(&data);
        let mut source = &stream[..stream.len() / 2];
        let mut core = core(16);

        let mut out = vec![0u8; 64 * 1024];
        let mut written = 0;
        let err = loop {
            match core.step(&mut out, &mut written) {
                Ok(Step::Ready(status)) => {
                    assert!(!status.end_of_stream);
                    written = 0;
                }
                Ok(Step::NeedInput) => {
                    let slot = core.input_slot();
                    let n = slot.len().min(source.len());
                    slot[..n].copy_from_slice(&source[..n]);
                    source = &source[n..];
                    core.supply(n);
                }
                Err(e) => break e,
            }
        };
        assert!(matches!(err, Error::UnexpectedEndOfInput));

        written = 0;
        assert!(matches!(
            core.step(&mut out, &mut written),
            Err(Error::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn test_close_releases_buffers() {
        let pool = BufferPool::new(4);
        let mut core =
            DecodeCore::new(Deflate::load().unwrap(), DecoderConfig::default(), Arc::clone(&pool))
                .unwrap();

        let stream = compressed(b"hello");
        let mut source = &stream[..];
        let mut out = [0u8; 8];
        drive(&mut core, &mut source, &mut out);

        core.close().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.compression_input, 1);
        assert_eq!(stats.decompression_output, 1);
        assert_eq!(stats.carry_over, 1);

        assert!(matches!(core.close(), Err(Error::SessionClosed)));
        let mut written = 0;
        assert!(matches!(
            core.step(&mut out, &mut written),
            Err(Error::SessionClosed)
        ));
    }
}
