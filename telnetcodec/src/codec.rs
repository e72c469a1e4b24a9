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

//! Encoding and decoding of telnet control sequences
//!
//! The functions here are pure and stateless: they map [`TelnetCommand`]s to
//! their single-octet codes and back. Decoding never fails; octets without a
//! matching command come back as `None` and are logged.

use crate::{CodecError, CodecResult, TelnetCommand};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

/// `IAC WILL ECHO`: the server will echo, so the peer should stop echoing locally.
pub const WILL_ECHO: [u8; 3] = [
    TelnetCommand::InterpretAsCommand.code(),
    TelnetCommand::Will.code(),
    TelnetCommand::Echo.code(),
];

/// `IAC WONT ECHO`: the server stops echoing, so the peer should resume local echo.
pub const WONT_ECHO: [u8; 3] = [
    TelnetCommand::InterpretAsCommand.code(),
    TelnetCommand::Wont.code(),
    TelnetCommand::Echo.code(),
];

/// Encode a sequence of commands into their wire octets, preserving order.
///
/// Elements may be given either as [`TelnetCommand`] or as
/// `Option<TelnetCommand>`; any `None` element fails the whole encoding with
/// [`CodecError::MissingCommand`].
///
/// # Example
/// ```
/// use linegate_telnetcodec::{TelnetCommand, encode};
///
/// let bytes = encode([
///     TelnetCommand::InterpretAsCommand,
///     TelnetCommand::Will,
///     TelnetCommand::Echo,
/// ])
/// .unwrap();
/// assert_eq!(&bytes[..], &[255, 251, 1]);
/// ```
pub fn encode<I>(commands: I) -> CodecResult<Bytes>
where
    I: IntoIterator,
    I::Item: Into<Option<TelnetCommand>>,
{
    let mut dst = BytesMut::new();
    encode_into(commands, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a sequence of commands, appending the octets to `dst`.
///
/// On error `dst` is left untouched.
pub fn encode_into<I>(commands: I, dst: &mut BytesMut) -> CodecResult<()>
where
    I: IntoIterator,
    I::Item: Into<Option<TelnetCommand>>,
{
    let commands = commands.into_iter();
    let mut encoded = BytesMut::with_capacity(commands.size_hint().0);
    for (index, command) in commands.enumerate() {
        match command.into() {
            Some(command) => encoded.put_u8(command.code()),
            None => return Err(CodecError::MissingCommand { index }),
        }
    }
    dst.extend_from_slice(&encoded);
    Ok(())
}

/// Map each octet back to its command, or `None` when the octet is unknown.
pub fn decode(codes: &[u8]) -> Vec<Option<TelnetCommand>> {
    codes
        .iter()
        .map(|&code| {
            let command = TelnetCommand::from_code(code);
            if command.is_none() {
                warn!(code, "Found no telnet command for code");
            }
            command
        })
        .collect()
}

/// Render the known commands in `codes` as space separated names.
///
/// Unknown octets are skipped.
///
/// ```
/// use linegate_telnetcodec::to_display_string;
///
/// assert_eq!(to_display_string(&[255, 253, 1]), "IAC DO ECHO");
/// ```
pub fn to_display_string(codes: &[u8]) -> String {
    decode(codes)
        .into_iter()
        .flatten()
        .map(TelnetCommand::name)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn encode_echo_toggles() {
        let will = encode([
            TelnetCommand::InterpretAsCommand,
            TelnetCommand::Will,
            TelnetCommand::Echo,
        ])
        .unwrap();
        assert_eq!(&will[..], &WILL_ECHO);

        let wont = encode([
            TelnetCommand::InterpretAsCommand,
            TelnetCommand::Wont,
            TelnetCommand::Echo,
        ])
        .unwrap();
        assert_eq!(&wont[..], &WONT_ECHO);
    }

    #[test]
    fn encode_empty_sequence() {
        let empty: [TelnetCommand; 0] = [];
        assert!(encode(empty).unwrap().is_empty());
    }

    #[test]
    fn encode_rejects_missing_command() {
        let result = encode([
            Some(TelnetCommand::InterpretAsCommand),
            None,
            Some(TelnetCommand::Echo),
        ]);
        assert!(matches!(result, Err(CodecError::MissingCommand { index: 1 })));
    }

    #[test]
    fn encode_into_leaves_buffer_on_error() {
        let mut dst = BytesMut::from(&b"prefix"[..]);
        let result = encode_into([Some(TelnetCommand::Do), None], &mut dst);
        assert!(result.is_err());
        assert_eq!(&dst[..], b"prefix");

        encode_into([TelnetCommand::Do], &mut dst).unwrap();
        assert_eq!(&dst[..], b"prefix\xFD");
    }

    #[test]
    fn decode_round_trips_every_command() {
        let encoded = encode(TelnetCommand::ALL).unwrap();
        let decoded = decode(&encoded);
        let expected: Vec<_> = TelnetCommand::ALL.into_iter().map(Some).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    #[traced_test]
    fn decode_unknown_codes() {
        let decoded = decode(&[255, 7, 1]);
        assert_eq!(
            decoded,
            vec![
                Some(TelnetCommand::InterpretAsCommand),
                None,
                Some(TelnetCommand::Echo)
            ]
        );
        assert!(logs_contain("Found no telnet command for code"));
    }

    #[test]
    fn display_string() {
        assert_eq!(to_display_string(&WILL_ECHO), "IAC WILL ECHO");
        assert_eq!(to_display_string(&[255, 42, 252, 1]), "IAC WONT ECHO");
        assert_eq!(to_display_string(&[]), "");
        assert_eq!(to_display_string(&[b'x']), "");
    }
}
