//! Internal utility functions and helpers.
//!
//! This module contains small I/O helpers used by the stream adapters.
//! It is an implementation detail and not part of the public API.

use std::io::{self, Read, Write};

use crate::error::Error;

/// Performs one read from `source`, retrying on `Interrupted`.
///
/// A return of 0 means the source is exhausted (or `buf` is empty).
pub(crate) fn read_some<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Hands `data` to `sink` in a single write, retrying on `Interrupted`.
///
/// A sink that accepts fewer bytes than offered fails with
/// [`Error::ShortWrite`].
pub(crate) fn write_once<W: Write + ?Sized>(sink: &mut W, data: &[u8]) -> Result<(), Error> {
    loop {
        match sink.write(data) {
            Ok(n) if n == data.len() => return Ok(()),
            Ok(n) => {
                return Err(Error::ShortWrite {
                    written: n,
                    expected: data.len(),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flaky {
        interrupts: usize,
        data: &'static [u8],
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Err(io::ErrorKind::Interrupted.into());
            }
            self.data.read(buf)
        }
    }

    struct Stingy(usize);

    impl Write for Stingy {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len().min(self.0))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_some_retries_interrupted() {
        let mut source = Flaky {
            interrupts: 3,
            data: b"abc",
        };
        let mut buf = [0u8; 8];
        assert_eq!(read_some(&mut source, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_write_once_detects_short_write() {
        let mut sink = Stingy(2);
        let err = write_once(&mut sink, b"hello").unwrap_err();
        assert!(matches!(
            err,
            Error::ShortWrite {
                written: 2,
                expected: 5
            }
        ));

        let mut sink = Vec::new();
        write_once(&mut sink, b"hello").unwrap();
        assert_eq!(sink, b"hello");
    }
}
