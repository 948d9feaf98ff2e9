//! Banner capture for open ports.

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::time::timeout;

use crate::transport::ProbeStream;

const READ_BUFFER: usize = 1024;
const MAX_BANNER_CHARS: usize = 100;

/// Reads whatever the peer volunteers within `deadline`.
///
/// A single read is issued; silence, EOF, or an error all yield `None`.
pub async fn read_banner(stream: &mut ProbeStream, deadline: Duration) -> Option<String> {
    let mut buf = [0u8; READ_BUFFER];
    match timeout(deadline, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => sanitize_banner(&buf[..n]),
        _ => None,
    }
}

/// Turns raw bytes into a printable single-line banner.
///
/// Bytes outside ASCII 32..=126 become spaces, the result is trimmed, and
/// anything past 100 characters is cut and suffixed with `...`.
pub fn sanitize_banner(raw: &[u8]) -> Option<String> {
    let printable: String = raw
        .iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { ' ' })
        .collect();
    let trimmed = printable.trim();

    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() > MAX_BANNER_CHARS {
        Some(format!("{}...", &trimmed[..MAX_BANNER_CHARS]))
    } else {
        Some(trimmed.to_string())
    }
}
