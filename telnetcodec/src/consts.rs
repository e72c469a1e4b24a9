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

//! Raw byte values used on the wire

/// Null, dropped by the line reader
pub const NUL: u8 = 0x00;
/// Line Feed, terminates a line
pub const LF: u8 = 0x0A;
/// Carriage Return, dropped by the line reader
pub const CR: u8 = 0x0D;

/// Echo option
pub const ECHO: u8 = 1;
/// End of File
pub const EOF: u8 = 236;
/// Suspend Current Process
pub const SUSP: u8 = 237;
/// Abort Process
pub const ABORT: u8 = 238;
/// End of Record
pub const EOR: u8 = 239;
/// End of Subnegotiation
pub const SE: u8 = 240;
/// No Operation
pub const NOP: u8 = 241;
/// Data Mark
pub const DM: u8 = 242;
/// Break
pub const BREAK: u8 = 243;
/// Interrupt Process
pub const IP: u8 = 244;
/// Abort Output
pub const AO: u8 = 245;
/// Are You There
pub const AYT: u8 = 246;
/// Erase Character
pub const EC: u8 = 247;
/// Erase Line
pub const EL: u8 = 248;
/// Go Ahead
pub const GA: u8 = 249;
/// Start of Subnegotiation
pub const SB: u8 = 250;
/// Sender wants to enable an option
pub const WILL: u8 = 251;
/// Sender refuses or disables an option
pub const WONT: u8 = 252;
/// Sender asks receiver to enable an option
pub const DO: u8 = 253;
/// Sender asks receiver to disable an option
pub const DONT: u8 = 254;
/// Interpret As Command
pub const IAC: u8 = 255;
