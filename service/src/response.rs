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

//! Helpers for turning text into wire bytes

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};

/// Encode `text` with the given encoding
///
/// Characters the encoding cannot represent are replaced by numeric
/// character references, as `encoding_rs` does for all its encoders.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Bytes {
    let (encoded, _, _) = encoding.encode(text);
    Bytes::from(encoded.into_owned())
}

/// Build an optional response from `text`
///
/// Empty text produces no response. With `newline` set, a line feed is
/// appended before encoding.
pub fn respond(text: &str, encoding: &'static Encoding, newline: bool) -> Option<Bytes> {
    if text.is_empty() {
        return None;
    }
    if newline {
        Some(encode_text(&format!("{text}\n"), encoding))
    } else {
        Some(encode_text(text, encoding))
    }
}

/// Build an optional UTF-8 response from `text`
pub fn respond_utf8(text: &str, newline: bool) -> Option<Bytes> {
    respond(text, UTF_8, newline)
}
