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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding telnet sequences or reading lines.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A command sequence contained an unset element.
    ///
    /// Contains the position of the first absent command.
    #[error("Telnet command at position {index} is missing")]
    MissingCommand {
        /// Index of the absent element in the input sequence
        index: usize,
    },

    /// A line limit of zero bytes was requested.
    #[error("Line limit must be positive, got {0}")]
    InvalidLineLimit(usize),

    /// An I/O error occurred while reading from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Check whether the error originated in the transport rather than the input
    pub fn is_io(&self) -> bool {
        matches!(self, CodecError::Io(_))
    }
}
