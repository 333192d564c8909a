//! Outbound protocol lines.
//!
//! Only the messages the identity layer emits are modelled here: NICK
//! broadcasts, server notices and numeric replies. Parsing and the rest of
//! the command set live in the wire layer.

use std::fmt;

/// Message source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prefix {
    /// A server, e.g. `irc.straylight.net`.
    ServerName(String),
    /// A user mask as `nick!user@host`.
    Nickname(String, String, String),
}

impl Prefix {
    /// Split a `nick!user@host` mask into its parts.
    ///
    /// A string without `!`/`@` is treated as a bare nickname.
    pub fn from_mask(mask: &str) -> Self {
        let (nick, rest) = mask.split_once('!').unwrap_or((mask, ""));
        let (user, host) = rest.split_once('@').unwrap_or((rest, ""));
        Self::Nickname(nick.to_string(), user.to_string(), host.to_string())
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerName(name) => f.write_str(name),
            Self::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

/// Numeric replies used by the identity layer.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Response {
    /// 400 - Generic failure
    ERR_UNKNOWNERROR = 400,
    /// 431 - No nickname given
    ERR_NONICKNAMEGIVEN = 431,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
    /// 730 - Monitored nick came online
    RPL_MONONLINE = 730,
    /// 731 - Monitored nick went offline
    RPL_MONOFFLINE = 731,
    /// 734 - Monitor list is full
    ERR_MONLISTFULL = 734,
    /// 902 - Nick locked to account
    ERR_NICKLOCKED = 902,
}

impl Response {
    /// Returns the numeric code as u16
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// Command portion of a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `NICK <new nick>`
    NICK(String),
    /// `NOTICE <target> :<text>`
    NOTICE(String, String),
    /// Numeric reply with its arguments; the last one is sent as trailing.
    Response(Response, Vec<String>),
}

/// A single outbound line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<Prefix>,
    pub command: Command,
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Self {
            prefix: None,
            command,
        }
    }
}

impl Message {
    /// NICK broadcast from `old_mask` announcing `new_nick`.
    #[must_use]
    pub fn nick(old_mask: &str, new_nick: impl Into<String>) -> Self {
        Message::from(Command::NICK(new_nick.into())).with_prefix(Prefix::from_mask(old_mask))
    }

    /// Create a NOTICE message to a target with text
    #[must_use]
    pub fn notice<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Command::NOTICE(target.into(), text.into()).into()
    }

    /// NOTICE from `server_name`.
    #[must_use]
    pub fn server_notice(server_name: &str, target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::notice(target, text).with_prefix(Prefix::ServerName(server_name.to_string()))
    }

    /// Numeric reply from `server_name`.
    #[must_use]
    pub fn server_reply(server_name: &str, response: Response, args: Vec<String>) -> Self {
        Message::from(Command::Response(response, args))
            .with_prefix(Prefix::ServerName(server_name.to_string()))
    }

    /// Set the message source.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// The numeric, if this is a numeric reply.
    pub fn response(&self) -> Option<Response> {
        match &self.command {
            Command::Response(response, _) => Some(*response),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        match &self.command {
            Command::NICK(nick) => write!(f, "NICK {nick}"),
            Command::NOTICE(target, text) => write!(f, "NOTICE {target} :{text}"),
            Command::Response(response, args) => {
                write!(f, "{response}")?;
                if let Some((last, middle)) = args.split_last() {
                    for arg in middle {
                        write!(f, " {arg}")?;
                    }
                    write!(f, " :{last}")?;
                }
                Ok(())
            }
        }
    }
}
