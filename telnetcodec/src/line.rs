//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Unicode-safe line reading
//!
//! [`read_line`] pulls one logical line off a byte stream one octet at a time,
//! so it never consumes anything past the line terminator. That property lets
//! a handshake and the command loop share one stream without losing bytes.
//!
//! `NUL` and `CR` are dropped instead of terminating the line. Neither octet
//! can appear inside a multi-byte UTF-8 sequence, so dropping them never
//! corrupts valid UTF-8 input.

use crate::{CodecError, CodecResult, consts};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Line limit used when the caller has no preference.
pub const DEFAULT_LINE_LIMIT: usize = 256;

/// Read a single line of at most `max_bytes - 1` octets.
///
/// Returns:
/// - `Ok(None)` when the stream ends before any octet was stored, which
///   signals that the peer went away,
/// - `Ok(Some(line))` with the terminator excluded when `LF` is read, when the
///   stream ends after some octets were stored, or when `max_bytes - 1`
///   octets were stored. In the last case the rest of the line stays unread
///   and no error is reported.
///
/// # Example
/// ```
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// use linegate_telnetcodec::{read_line, DEFAULT_LINE_LIMIT};
///
/// let mut input: &[u8] = b"look\r\n";
/// let line = read_line(&mut input, DEFAULT_LINE_LIMIT).await.unwrap();
/// assert_eq!(line.as_deref(), Some(&b"look"[..]));
/// assert_eq!(read_line(&mut input, DEFAULT_LINE_LIMIT).await.unwrap(), None);
/// # });
/// ```
pub async fn read_line<R>(reader: &mut R, max_bytes: usize) -> CodecResult<Option<Bytes>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if max_bytes == 0 {
        return Err(CodecError::InvalidLineLimit(max_bytes));
    }
    let limit = max_bytes - 1;
    let mut line = BytesMut::with_capacity(limit.min(DEFAULT_LINE_LIMIT));
    let mut octet = [0u8; 1];

    while line.len() < limit {
        if reader.read(&mut octet).await? == 0 {
            if line.is_empty() {
                return Ok(None);
            }
            break;
        }
        match octet[0] {
            consts::LF => break,
            consts::NUL | consts::CR => continue,
            other => line.put_u8(other),
        }
    }
    Ok(Some(line.freeze()))
}
