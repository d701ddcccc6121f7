//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use authtokens_core::{DEFAULT_SECONDS_TO_LOGIN, DEFAULT_THRESHOLD};

/// Detect authentication tokens for a list of target sites.
///
/// Authtokens authenticates into the given url(s), collects the session
/// cookies, computes which of them are authentication tokens, and saves the
/// results into a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "authtokens")]
#[command(author, version, about)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .args(["url", "filename"])
))]
pub struct Args {
    /// Input url
    #[arg(short = 'i', long = "url")]
    pub url: Option<String>,

    /// Path to a file containing a newline-delimited list of urls
    #[arg(short = 'f', long = "file")]
    pub filename: Option<PathBuf>,

    /// Your email
    #[arg(short = 'e', long, required = true)]
    pub email: String,

    /// Your username
    #[arg(short = 'u', long, required = true)]
    pub username: String,

    /// Your nickname
    #[arg(short = 'n', long)]
    pub nickname: Option<String>,

    /// Your password
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Output database in which results are stored
    #[arg(short = 'd', long, default_value = "cookies.db")]
    pub database: PathBuf,

    /// The authentication threshold (0.0-1.0)
    #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Maximum number of authentication tokens to be found
    #[arg(short = 'k', long)]
    pub max_tokens: Option<usize>,

    /// Skip any alert dialogs
    #[arg(long = "ignore-alarm", default_value_t = false)]
    pub ignore_alarm: bool,

    /// Maximum time in seconds to process a url (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub timeout: u64,

    /// Switch to manual login
    #[arg(long, default_value_t = false)]
    pub manual: bool,

    /// Number of seconds that you have to login in manual mode
    #[arg(short = 's', long = "seconds-to-login", default_value_t = DEFAULT_SECONDS_TO_LOGIN)]
    pub seconds_to_login: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "authtokens",
            "-e",
            "user@mail.com",
            "-u",
            "user",
            "-i",
            "https://example.com",
        ]
    }

    #[test]
    fn test_cli_minimal_args_parse_successfully() {
        let args = Args::try_parse_from(base_args()).unwrap();
        assert_eq!(args.email, "user@mail.com");
        assert_eq!(args.username, "user");
        assert_eq!(args.url.as_deref(), Some("https://example.com"));
        assert_eq!(args.database, PathBuf::from("cookies.db"));
        assert!((args.threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(args.max_tokens, None);
        assert_eq!(args.timeout, 0);
        assert!(!args.manual);
        assert_eq!(args.seconds_to_login, 30);
    }

    #[test]
    fn test_cli_requires_email_and_username() {
        let result = Args::try_parse_from(["authtokens", "-i", "https://example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_some_input() {
        let result = Args::try_parse_from(["authtokens", "-e", "a@b.c", "-u", "a"]);
        assert!(result.is_err(), "either -i or -f must be given");
    }

    #[test]
    fn test_cli_url_and_file_are_mutually_exclusive() {
        let mut args = base_args();
        args.extend(["-f", "urls.txt"]);
        let result = Args::try_parse_from(args);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_file_input_parses() {
        let args = Args::try_parse_from([
            "authtokens",
            "-e",
            "a@b.c",
            "-u",
            "a",
            "-f",
            "urls.txt",
        ])
        .unwrap();
        assert_eq!(args.filename, Some(PathBuf::from("urls.txt")));
        assert!(args.url.is_none());
    }

    #[test]
    fn test_cli_threshold_flag() {
        let mut args = base_args();
        args.extend(["-t", "0.5"]);
        let parsed = Args::try_parse_from(args).unwrap();
        assert!((parsed.threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cli_max_tokens_flag() {
        let mut args = base_args();
        args.extend(["-k", "3"]);
        let parsed = Args::try_parse_from(args).unwrap();
        assert_eq!(parsed.max_tokens, Some(3));
    }

    #[test]
    fn test_cli_manual_mode_flags() {
        let mut args = base_args();
        args.extend(["--manual", "-s", "60"]);
        let parsed = Args::try_parse_from(args).unwrap();
        assert!(parsed.manual);
        assert_eq!(parsed.seconds_to_login, 60);
    }

    #[test]
    fn test_cli_timeout_flag() {
        let mut args = base_args();
        args.extend(["--timeout", "5"]);
        let parsed = Args::try_parse_from(args).unwrap();
        assert_eq!(parsed.timeout, 5);
    }

    #[test]
    fn test_cli_ignore_alarm_flag() {
        let mut args = base_args();
        args.push("--ignore-alarm");
        let parsed = Args::try_parse_from(args).unwrap();
        assert!(parsed.ignore_alarm);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let mut args = base_args();
        args.push("-vv");
        let parsed = Args::try_parse_from(args).unwrap();
        assert_eq!(parsed.verbose, 2);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["authtokens", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let mut args = base_args();
        args.push("--invalid-flag");
        let result = Args::try_parse_from(args);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
