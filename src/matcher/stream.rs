//! Driving a matcher over an async byte source.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use super::{MatchOutcome, QuicMatcher};
use crate::error::MatchError;

impl QuicMatcher {
    /// Read from `reader` until the matcher can decide.
    ///
    /// `buf` holds bytes already received and collects everything read, so
    /// the caller can replay the prefix to whichever handler it routes the
    /// flow to. It never grows beyond [`QuicMatcher::max_prefix_bytes`].
    ///
    /// End of input while still undecided is a non-match.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::UpstreamRead`] if the reader fails with anything
    /// other than end of input.
    pub async fn match_stream<R>(&self, reader: &mut R, buf: &mut Vec<u8>) -> Result<bool, MatchError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        loop {
            match self.evaluate(buf) {
                MatchOutcome::Matched => return Ok(true),
                MatchOutcome::NotMatched => return Ok(false),
                MatchOutcome::NeedMoreData(wanted) => {
                    trace!("Have {} bytes, need {}", buf.len(), wanted);
                }
            }

            // Take whatever is available up to the cap, not just `wanted`,
            // so bytes trailing the first packet are seen before deciding.
            let start = buf.len();
            buf.resize(self.max_prefix_bytes().max(start), 0);
            let read = reader.read(&mut buf[start..]).await;

            match read {
                Ok(0) => {
                    buf.truncate(start);
                    trace!("End of input after {} bytes", start);
                    return Ok(false);
                }
                Ok(n) => buf.truncate(start + n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => buf.truncate(start),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    buf.truncate(start);
                    trace!("Upstream closed after {} bytes", start);
                    return Ok(false);
                }
                Err(e) => {
                    buf.truncate(start);
                    return Err(MatchError::UpstreamRead(e));
                }
            }
        }
    }
}
