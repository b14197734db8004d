//! Console transcript capture
//!
//! A step's stdout and stderr share one pipe. Everything read from it is
//! written unchanged to the transcript file and, optionally, echoed to the
//! launcher's console.

use std::io::{self, ErrorKind, Read, Write};

const BUF_SIZE: usize = 8 * 1024;

/// Copy `reader` to `transcript` until EOF, echoing to `console` if given.
///
/// The transcript receives every byte. A failing console (closed stdout,
/// full disk on a redirected stdout) stops the echo but not the transcript.
/// Returns the number of bytes copied.
pub fn tee<R, W, C>(mut reader: R, mut transcript: W, mut console: Option<C>) -> io::Result<u64>
where
    R: Read,
    W: Write,
    C: Write,
{
    let mut buf = [0u8; BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buf[..n];
        transcript.write_all(chunk)?;

        if let Some(out) = console.as_mut() {
            if let Err(e) = out.write_all(chunk).and_then(|_| out.flush()) {
                tracing::warn!(error = %e, "Console echo failed, transcript continues");
                console = None;
            }
        }
        total += n as u64;
    }

    transcript.flush()?;
    Ok(total)
}
