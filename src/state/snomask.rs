//! Server notice masks.
//!
//! Operators subscribe to categories of server notices by letter.

use std::fmt;

/// A server notice category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Snomask {
    Announcement,
    Connect,
    Disconnect,
    Channel,
    Kill,
    LocalNicks,
    Oper,
    Quit,
    Stats,
    Account,
    Vhost,
    Xline,
}

impl Snomask {
    pub const ALL: [Snomask; 12] = [
        Self::Announcement,
        Self::Connect,
        Self::Disconnect,
        Self::Channel,
        Self::Kill,
        Self::LocalNicks,
        Self::Oper,
        Self::Quit,
        Self::Stats,
        Self::Account,
        Self::Vhost,
        Self::Xline,
    ];

    /// Mode letter used in `+s` mode strings.
    pub fn letter(self) -> char {
        match self {
            Self::Announcement => 'a',
            Self::Connect => 'c',
            Self::Disconnect => 'd',
            Self::Channel => 'j',
            Self::Kill => 'k',
            Self::LocalNicks => 'n',
            Self::Oper => 'o',
            Self::Quit => 'q',
            Self::Stats => 't',
            Self::Account => 'u',
            Self::Vhost => 'v',
            Self::Xline => 'x',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|mask| mask.letter() == letter)
    }

    /// Readable name shown in notice listings.
    pub fn name(self) -> &'static str {
        match self {
            Self::Announcement => "ANNOUNCEMENT",
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::Channel => "CHANNEL",
            Self::Kill => "KILL",
            Self::LocalNicks => "NICK",
            Self::Oper => "OPER",
            Self::Quit => "QUIT",
            Self::Stats => "STATS",
            Self::Account => "ACCOUNT",
            Self::Vhost => "VHOST",
            Self::Xline => "XLINE",
        }
    }

    /// Parse a mask string such as `"nco"`, skipping unknown letters.
    pub fn parse_set(letters: &str) -> Vec<Self> {
        let mut masks: Vec<Self> = letters.chars().filter_map(Self::from_letter).collect();
        masks.sort();
        masks.dedup();
        masks
    }
}

impl fmt::Display for Snomask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
