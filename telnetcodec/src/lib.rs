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

//! # Linegate Telnet Codec
//!
//! The byte-level leaves of the Linegate command server:
//!
//! - [`TelnetCommand`]: the closed table of telnet control octets (`IAC`,
//!   `WILL`, `WONT`, `ECHO`, ...) with bidirectional code lookup.
//! - [`encode`] / [`decode`] / [`to_display_string`]: stateless mapping between
//!   command sequences and wire octets, used to toggle remote echo while a
//!   password is typed.
//! - [`read_line`]: reads one newline terminated line from an async byte
//!   stream, dropping `NUL` and `CR`, without reading past the terminator.
//!
//! This is deliberately not a telnet option negotiator. The only binary
//! sequences Linegate emits are [`WILL_ECHO`] and [`WONT_ECHO`].
//!
//! ## Usage Example
//!
//! ```rust
//! use linegate_telnetcodec::{TelnetCommand, decode, encode, to_display_string};
//!
//! let wire = encode([
//!     TelnetCommand::InterpretAsCommand,
//!     TelnetCommand::Will,
//!     TelnetCommand::Echo,
//! ])?;
//! assert_eq!(to_display_string(&wire), "IAC WILL ECHO");
//! assert_eq!(decode(&[255, 99]), vec![Some(TelnetCommand::InterpretAsCommand), None]);
//! # Ok::<(), linegate_telnetcodec::CodecError>(())
//! ```
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 857: Telnet Echo Option

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod codec;
mod command;
pub mod consts;
mod line;
mod result;

pub use self::codec::{WILL_ECHO, WONT_ECHO, decode, encode, encode_into, to_display_string};
pub use self::command::TelnetCommand;
pub use self::line::{DEFAULT_LINE_LIMIT, read_line};
pub use self::result::{CodecError, CodecResult};
