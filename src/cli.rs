//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::storage::StorageKind;
use crate::{Error, Result};

/// webapp-kit - config, PII censoring, string helpers, storage and backend requests
#[derive(Parser, Debug)]
#[command(name = "webapp-kit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "APP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Durable storage file (default: ~/.webapp-kit/storage.json)
    #[arg(long, env = "APP_STORAGE_PATH", global = true)]
    pub storage_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "APP_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "APP_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Censor PII for display
    Censor {
        /// What kind of value is being censored
        #[arg(value_enum)]
        kind: CensorKind,
        /// The value
        value: String,
    },

    /// Format a string
    Format {
        /// Transformation to apply
        #[arg(value_enum)]
        style: FormatStyle,
        /// The value
        value: String,
        /// Maximum characters (for `truncate`)
        #[arg(long, default_value_t = 50)]
        max: usize,
    },

    /// Validate a string; exit status 1 when invalid
    Validate {
        /// Rule to check
        #[arg(value_enum)]
        rule: ValidateRule,
        /// The value
        value: String,
    },

    /// Check whether a User-Agent is a mobile browser
    Mobile {
        /// User-Agent header value
        user_agent: String,
    },

    /// Look up a localized message
    Message {
        /// Message key
        key: String,
        /// Language code (defaults to the configured language)
        #[arg(short, long)]
        lang: Option<String>,
        /// Extra catalog file (YAML or JSON) layered over the built-in messages
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Key-value storage commands
    #[command(subcommand)]
    Store(StoreCommand),

    /// Send a request to the configured backend
    Request {
        /// Target relative to the API base (e.g. `users/1`)
        target: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// JSON body
        #[arg(short, long)]
        body: Option<String>,
        /// Extra header (`Name: value`), repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },

    /// Print the resolved configuration (secrets redacted)
    Config,
}

/// Storage subcommands
#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// Print a value
    Get {
        /// Key
        key: String,
        /// Namespace; only `durable` (alias `local`) outlives one invocation
        #[arg(long, default_value = "durable")]
        kind: String,
    },
    /// Store a value (JSON if it parses, raw text otherwise)
    Set {
        /// Key
        key: String,
        /// Value
        value: String,
        /// Namespace; only `durable` (alias `local`) outlives one invocation
        #[arg(long, default_value = "durable")]
        kind: String,
    },
    /// Remove a key
    Remove {
        /// Key
        key: String,
        /// Namespace; only `durable` (alias `local`) outlives one invocation
        #[arg(long, default_value = "durable")]
        kind: String,
    },
    /// Remove every key
    Clear {
        /// Namespace; only `durable` (alias `local`) outlives one invocation
        #[arg(long, default_value = "durable")]
        kind: String,
    },
    /// List keys
    List {
        /// Namespace; only `durable` (alias `local`) outlives one invocation
        #[arg(long, default_value = "durable")]
        kind: String,
    },
}

impl StoreCommand {
    /// Namespace this command addresses.
    ///
    /// The session namespace is empty at start and dropped on exit, so
    /// only the durable one can be addressed from the command line.
    pub fn kind(&self) -> Result<StorageKind> {
        let tag = match self {
            Self::Get { kind, .. }
            | Self::Set { kind, .. }
            | Self::Remove { kind, .. }
            | Self::Clear { kind }
            | Self::List { kind } => kind,
        };
        match tag.parse::<StorageKind>()? {
            StorageKind::Session => Err(Error::Config(
                "The session namespace only lives inside one process; use --kind durable"
                    .to_string(),
            )),
            kind => Ok(kind),
        }
    }
}

/// Censor subcommand targets
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CensorKind {
    /// Single word
    Word,
    /// Phone number
    Phone,
    /// Email address
    Email,
    /// Full name
    Name,
}

/// Format subcommand styles
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatStyle {
    /// URL slug
    Slug,
    /// Title Case
    Title,
    /// camelCase → `snake_case`
    Snake,
    /// `snake_case` → camelCase
    Camel,
    /// Uppercase first character
    Capitalize,
    /// Cut to `--max` characters
    Truncate,
}

/// Validate subcommand rules
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ValidateRule {
    /// Email address
    Email,
    /// Ten-digit phone number
    Phone,
    /// Letters only
    Alpha,
    /// Letters and digits only
    Alnum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_censor_command() {
        let cli = Cli::try_parse_from(["webapp-kit", "censor", "email", "a@b.com"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Censor { kind: CensorKind::Email, ref value } if value == "a@b.com"
        ));
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn parses_request_with_headers() {
        let cli = Cli::try_parse_from([
            "webapp-kit", "request", "users", "-X", "POST", "-b", "{}", "-H", "X-A: 1", "-H", "X-B: 2",
        ])
        .unwrap();
        let Command::Request { target, method, body, headers } = cli.command else {
            panic!("expected request command");
        };
        assert_eq!(target, "users");
        assert_eq!(method, "POST");
        assert_eq!(body.as_deref(), Some("{}"));
        assert_eq!(headers, vec!["X-A: 1", "X-B: 2"]);
    }

    #[test]
    fn parses_store_subcommand_with_kind() {
        let cli = Cli::try_parse_from(["webapp-kit", "store", "list", "--kind", "session"]).unwrap();
        assert!(matches!(cli.command, Command::Store(StoreCommand::List { ref kind }) if kind == "session"));
    }

    #[test]
    fn store_kind_defaults_to_durable() {
        let cli = Cli::try_parse_from(["webapp-kit", "store", "get", "auth"]).unwrap();
        let Command::Store(cmd) = cli.command else {
            panic!("expected store command");
        };
        assert_eq!(cmd.kind().unwrap(), StorageKind::Durable);
    }

    #[test]
    fn store_rejects_session_namespace() {
        for args in [
            vec!["webapp-kit", "store", "set", "k", "v", "--kind", "session"],
            vec!["webapp-kit", "store", "list", "--kind", "session"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            let Command::Store(cmd) = cli.command else {
                panic!("expected store command");
            };
            let err = cmd.kind().unwrap_err();
            assert!(matches!(err, Error::Config(_)));
            assert!(err.to_string().contains("session"));
        }
    }

    #[test]
    fn store_rejects_unknown_namespace() {
        let cli = Cli::try_parse_from(["webapp-kit", "store", "clear", "--kind", "cookie"]).unwrap();
        let Command::Store(cmd) = cli.command else {
            panic!("expected store command");
        };
        assert!(matches!(cmd.kind(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_unknown_format_style() {
        assert!(Cli::try_parse_from(["webapp-kit", "format", "kebab", "x"]).is_err());
    }
}
