//! Command-line surface.

use crate::config::{Config, DEFAULT_DATABASE_PATH, DEFAULT_LOG_FILTER};
use crate::types::normalize_recipient;
use crate::{Error, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Shown when the recipient or message is missing.
pub const USAGE: &str = "Usage: wtc <phone_number> <message>\nExample: wtc 1234567890 'Hello, world!'";

/// Send one WhatsApp text message.
///
/// Options go before the recipient; every word after it is message text.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Phone number or full JID of the recipient.
    pub recipient: String,

    /// Message text; multiple words are joined with single spaces.
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub message: Vec<String>,

    /// Path to the session store.
    #[arg(long = "db", env = "WTC_DB", default_value = DEFAULT_DATABASE_PATH)]
    pub database_path: PathBuf,

    /// Seconds to wait for the QR code to be scanned.
    #[arg(long, env = "WTC_PAIR_TIMEOUT", default_value_t = 120)]
    pub pair_timeout: u64,

    /// Poll the pairing state every N milliseconds instead of waking on the event.
    #[arg(long, env = "WTC_POLL_INTERVAL")]
    pub poll_interval: Option<u64>,

    /// Milliseconds to wait after sending before disconnecting.
    #[arg(long = "settle", env = "WTC_SETTLE", default_value_t = 0)]
    pub settle_ms: u64,

    /// WebSocket endpoint.
    #[arg(long, env = "WTC_WS_URL", default_value = crate::client::DEFAULT_WS_URL)]
    pub ws_url: String,

    /// Tracing filter (e.g. `info`, `wtc=debug`).
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_level: String,
}

/// What to send and to whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Normalized recipient address.
    pub recipient: String,
    /// Message words joined with single spaces.
    pub text: String,
}

impl Cli {
    /// Split into the message to send and the runtime configuration.
    pub fn into_parts(self) -> (Invocation, Config) {
        let invocation = Invocation {
            recipient: normalize_recipient(&self.recipient),
            text: self.message.join(" "),
        };
        let mut config = Config::default()
            .with_database_path(self.database_path)
            .with_pair_timeout(Duration::from_secs(self.pair_timeout))
            .with_settle_delay(Duration::from_millis(self.settle_ms))
            .with_ws_url(self.ws_url)
            .with_log_filter(self.log_level);
        if let Some(ms) = self.poll_interval {
            config = config.with_poll_interval(Duration::from_millis(ms.max(1)));
        }
        (invocation, config)
    }
}

/// Parse command-line arguments (including the program name).
///
/// Option parsing stops at the recipient, so message words such as `--help`
/// are sent as text. Missing or malformed arguments give [`Error::Usage`];
/// `--help` and `--version` before the recipient give [`Error::Help`]
/// carrying the text to print.
pub fn parse_from<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = options_end_at_recipient(args.into_iter().map(Into::into).collect());
    Cli::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Error::Help(e.to_string()),
        ErrorKind::MissingRequiredArgument => Error::Usage(USAGE.to_string()),
        _ => Error::Usage(format!("{}\n{USAGE}", e.to_string().trim_end())),
    })
}

/// Insert `--` right after the recipient so clap treats the rest as message.
fn options_end_at_recipient(mut args: Vec<OsString>) -> Vec<OsString> {
    let command = Cli::command();
    let takes_value = |flag: &str| {
        command.get_arguments().any(|arg| {
            arg.get_action().takes_values()
                && (arg.get_long().is_some_and(|l| flag.strip_prefix("--") == Some(l))
                    || arg.get_short().is_some_and(|c| flag == format!("-{c}")))
        })
    };

    let mut i = 1;
    while i < args.len() {
        let Some(token) = args[i].to_str() else {
            break;
        };
        if token == "--" {
            return args;
        }
        if !token.starts_with('-') || token == "-" {
            break;
        }
        i += if takes_value(token) { 2 } else { 1 };
    }
    if i + 1 < args.len() {
        args.insert(i + 1, OsString::from("--"));
    }
    args
}
