use std::{ffi::OsString, fmt, net::SocketAddr};

use clap::Parser;

use crate::error::Result;

/// Command Line Arguments.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Arguments {
    /// Host name or IP address of the chat server.
    #[clap(value_parser)]
    pub host: String,

    /// Port of the chat server.
    #[clap(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Name to log in with.
    #[clap(value_parser, allow_hyphen_values = true)]
    pub username: String,

    /// Password to log in with.
    #[clap(value_parser, allow_hyphen_values = true)]
    pub password: String,

    /// Address to publish console events on.
    #[clap(short, long, value_parser)]
    pub console: Option<SocketAddr>,

    /// Log debug events to stderr.
    #[clap(short, long, action)]
    pub verbose: bool,
}

/// Validated connection and login parameters.
///
/// Only obtainable through [`parse_options`] or from already validated [`Arguments`],
/// so the port is always within `1..=65535`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl ConnectionOptions {
    /// Server host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// `host:port`, as used for dialing and error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<Arguments> for ConnectionOptions {
    fn from(args: Arguments) -> Self {
        Self {
            host: args.host,
            port: args.port,
            username: args.username,
            password: args.password,
        }
    }
}

impl fmt::Display for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Parse exactly four positional arguments (`HOST PORT USERNAME PASSWORD`, no program name)
/// into [`ConnectionOptions`].
pub fn parse_options<I, T>(args: I) -> Result<ConnectionOptions>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    // `--` keeps values such as `-secret` or `--help` positional.
    let argv = [OsString::from(env!("CARGO_PKG_NAME")), OsString::from("--")]
        .into_iter()
        .chain(args.into_iter().map(Into::into));
    let args = Arguments::try_parse_from(argv)?;
    Ok(args.into())
}
