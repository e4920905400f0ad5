use std::fmt;
use std::str::FromStr;

/// Server for regular user accounts.
pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";
pub const GROUP_SERVER: &str = "g.us";

/// Separator between the user and server parts of an address.
pub const ADDRESS_SEPARATOR: char = '@';

/// Turn a raw recipient into a fully qualified address.
///
/// A bare phone number gets `@s.whatsapp.net` appended; anything already
/// containing `@` is returned unchanged, so the operation is idempotent.
pub fn normalize_recipient(recipient: &str) -> String {
    if recipient.contains(ADDRESS_SEPARATOR) {
        recipient.to_string()
    } else {
        format!("{recipient}{ADDRESS_SEPARATOR}{DEFAULT_USER_SERVER}")
    }
}

/// JID represents a WhatsApp user/entity ID (user@server or AD-JID).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Jid {
    pub user: String,
    pub raw_agent: u8,
    pub device: u16,
    pub server: String,
}

impl Jid {
    /// New regular JID (user@server).
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            raw_agent: 0,
            device: 0,
            server: server.into(),
        }
    }

    /// Server JID (no user).
    pub fn server(server: impl Into<String>) -> Self {
        Self::new("", server)
    }

    /// Regular user JID on the default server.
    pub fn user(user: impl Into<String>) -> Self {
        Self::new(user, DEFAULT_USER_SERVER)
    }

    /// JID without agent/device (regular user@server).
    pub fn to_non_ad(&self) -> Self {
        Self::new(self.user.clone(), self.server.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.server.is_empty()
    }

    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }
}

impl FromStr for Jid {
    type Err = JidParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(ADDRESS_SEPARATOR).collect();
        if parts.len() == 1 {
            if parts[0].is_empty() {
                return Err(JidParseError);
            }
            return Ok(Self::server(parts[0]));
        }
        if parts.len() != 2 || parts[1].is_empty() {
            return Err(JidParseError);
        }
        let mut jid = Self::new(parts[0], parts[1]);
        if let Some((user, rest)) = parts[0].split_once('.') {
            jid.user = user.to_string();
            let mut ad = rest.split(':');
            jid.raw_agent = ad
                .next()
                .unwrap_or_default()
                .parse()
                .map_err(|_| JidParseError)?;
            if let Some(device) = ad.next() {
                jid.device = device.parse().map_err(|_| JidParseError)?;
            }
            if ad.next().is_some() {
                return Err(JidParseError);
            }
        } else if let Some((user, device)) = parts[0].split_once(':') {
            jid.user = user.to_string();
            jid.device = device.parse().map_err(|_| JidParseError)?;
        }
        Ok(jid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JidParseError;

impl fmt::Display for JidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid JID format")
    }
}

impl std::error::Error for JidParseError {}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw_agent > 0 {
            write!(
                f,
                "{}.{}:{}@{}",
                self.user, self.raw_agent, self.device, self.server
            )
        } else if self.device > 0 {
            write!(f, "{}:{}@{}", self.user, self.device, self.server)
        } else if !self.user.is_empty() {
            write!(f, "{}@{}", self.user, self.server)
        } else {
            write!(f, "{}", self.server)
        }
    }
}

impl serde::Serialize for Jid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Jid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Jid::from_str(&s).map_err(serde::de::Error::custom)
    }
}
