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

use crate::consts;
use std::fmt::Formatter;

///
/// Telnet control octets understood by Linegate.
///
/// Only the small fixed vocabulary needed for echo suppression and diagnostics
/// is modeled; this is not a general option negotiator.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum TelnetCommand {
    /// [`consts::ECHO`] Echo option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo = consts::ECHO,
    /// [`consts::EOF`] End of File
    EndOfFile = consts::EOF,
    /// [`consts::SUSP`] Suspend Current Process
    Suspend = consts::SUSP,
    /// [`consts::ABORT`] Abort Process
    Abort = consts::ABORT,
    /// [`consts::EOR`] End of Record [RFC885](https://tools.ietf.org/html/rfc885)
    EndOfRecord = consts::EOR,
    /// [`consts::SE`] End of Subnegotiation
    SubnegotiationEnd = consts::SE,
    /// [`consts::NOP`] No Operation
    NoOperation = consts::NOP,
    /// [`consts::DM`] Data Mark
    DataMark = consts::DM,
    /// [`consts::BREAK`] Break
    Break = consts::BREAK,
    /// [`consts::IP`] Interrupt Process
    InterruptProcess = consts::IP,
    /// [`consts::AO`] Abort Output
    AbortOutput = consts::AO,
    /// [`consts::AYT`] Are You There
    AreYouThere = consts::AYT,
    /// [`consts::EC`] Erase Character
    EraseCharacter = consts::EC,
    /// [`consts::EL`] Erase Line
    EraseLine = consts::EL,
    /// [`consts::GA`] Go Ahead
    GoAhead = consts::GA,
    /// [`consts::SB`] Start of Subnegotiation
    Subnegotiation = consts::SB,
    /// [`consts::WILL`] Will
    Will = consts::WILL,
    /// [`consts::WONT`] Won't
    Wont = consts::WONT,
    /// [`consts::DO`] Do
    Do = consts::DO,
    /// [`consts::DONT`] Don't
    Dont = consts::DONT,
    /// [`consts::IAC`] Interpret As Command
    InterpretAsCommand = consts::IAC,
}

impl TelnetCommand {
    /// Every known command, ordered by code.
    pub const ALL: [TelnetCommand; 21] = [
        TelnetCommand::Echo,
        TelnetCommand::EndOfFile,
        TelnetCommand::Suspend,
        TelnetCommand::Abort,
        TelnetCommand::EndOfRecord,
        TelnetCommand::SubnegotiationEnd,
        TelnetCommand::NoOperation,
        TelnetCommand::DataMark,
        TelnetCommand::Break,
        TelnetCommand::InterruptProcess,
        TelnetCommand::AbortOutput,
        TelnetCommand::AreYouThere,
        TelnetCommand::EraseCharacter,
        TelnetCommand::EraseLine,
        TelnetCommand::GoAhead,
        TelnetCommand::Subnegotiation,
        TelnetCommand::Will,
        TelnetCommand::Wont,
        TelnetCommand::Do,
        TelnetCommand::Dont,
        TelnetCommand::InterpretAsCommand,
    ];

    /// The single octet sent on the wire for this command.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short mnemonic used in diagnostics, e.g. `"IAC"`.
    pub const fn name(self) -> &'static str {
        match self {
            TelnetCommand::Echo => "ECHO",
            TelnetCommand::EndOfFile => "EOF",
            TelnetCommand::Suspend => "SUSP",
            TelnetCommand::Abort => "ABORT",
            TelnetCommand::EndOfRecord => "EOR",
            TelnetCommand::SubnegotiationEnd => "SE",
            TelnetCommand::NoOperation => "NOP",
            TelnetCommand::DataMark => "DM",
            TelnetCommand::Break => "BREAK",
            TelnetCommand::InterruptProcess => "IP",
            TelnetCommand::AbortOutput => "AO",
            TelnetCommand::AreYouThere => "AYT",
            TelnetCommand::EraseCharacter => "EC",
            TelnetCommand::EraseLine => "EL",
            TelnetCommand::GoAhead => "GA",
            TelnetCommand::Subnegotiation => "SB",
            TelnetCommand::Will => "WILL",
            TelnetCommand::Wont => "WONT",
            TelnetCommand::Do => "DO",
            TelnetCommand::Dont => "DONT",
            TelnetCommand::InterpretAsCommand => "IAC",
        }
    }

    /// Look up the command for a wire octet.
    ///
    /// Returns `None` for octets that are not part of the table.
    pub const fn from_code(code: u8) -> Option<TelnetCommand> {
        match code {
            consts::ECHO => Some(TelnetCommand::Echo),
            consts::EOF => Some(TelnetCommand::EndOfFile),
            consts::SUSP => Some(TelnetCommand::Suspend),
            consts::ABORT => Some(TelnetCommand::Abort),
            consts::EOR => Some(TelnetCommand::EndOfRecord),
            consts::SE => Some(TelnetCommand::SubnegotiationEnd),
            consts::NOP => Some(TelnetCommand::NoOperation),
            consts::DM => Some(TelnetCommand::DataMark),
            consts::BREAK => Some(TelnetCommand::Break),
            consts::IP => Some(TelnetCommand::InterruptProcess),
            consts::AO => Some(TelnetCommand::AbortOutput),
            consts::AYT => Some(TelnetCommand::AreYouThere),
            consts::EC => Some(TelnetCommand::EraseCharacter),
            consts::EL => Some(TelnetCommand::EraseLine),
            consts::GA => Some(TelnetCommand::GoAhead),
            consts::SB => Some(TelnetCommand::Subnegotiation),
            consts::WILL => Some(TelnetCommand::Will),
            consts::WONT => Some(TelnetCommand::Wont),
            consts::DO => Some(TelnetCommand::Do),
            consts::DONT => Some(TelnetCommand::Dont),
            consts::IAC => Some(TelnetCommand::InterpretAsCommand),
            _ => None,
        }
    }
}

impl From<TelnetCommand> for u8 {
    fn from(command: TelnetCommand) -> Self {
        command.code()
    }
}

impl TryFrom<u8> for TelnetCommand {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TelnetCommand::from_code(code).ok_or(code)
    }
}

impl std::fmt::Display for TelnetCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::TelnetCommand;
    use crate::consts;

    #[test]
    fn table_is_sorted_and_bijective() {
        for pair in TelnetCommand::ALL.windows(2) {
            assert!(pair[0].code() < pair[1].code());
        }
        for command in TelnetCommand::ALL {
            assert_eq!(TelnetCommand::from_code(command.code()), Some(command));
        }
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(TelnetCommand::from_code(0), None);
        assert_eq!(TelnetCommand::from_code(b'A'), None);
        assert_eq!(TelnetCommand::from_code(235), None);
        assert_eq!(TelnetCommand::try_from(2u8), Err(2));
    }

    #[test]
    fn names_and_codes() {
        assert_eq!(TelnetCommand::InterpretAsCommand.code(), consts::IAC);
        assert_eq!(TelnetCommand::InterpretAsCommand.name(), "IAC");
        assert_eq!(TelnetCommand::Echo.code(), 1);
        assert_eq!(TelnetCommand::Wont.to_string(), "WONT");
        assert_eq!(u8::from(TelnetCommand::DataMark), 242);
    }
}
