use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use rachis_session::{SessionConfig, DEFAULT_MAX_PROPOSALS, DEFAULT_VIEWER_URL};
use url::Url;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod info;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an archive file into a simulated viewer.
    Simulate(SimulateArgs),
    /// Decode a base64 archive payload.
    Decode(DecodeArgs),
    /// Show the effective viewer configuration and renderer metadata.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Simulate(args) => simulate::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// Viewer and handshake settings shared by commands that build a session.
#[derive(Args, Debug)]
pub struct ViewerArgs {
    /// Viewer URL; its origin is the only one messages are posted to.
    #[arg(
        long = "origin",
        value_name = "URL",
        env = "RACHIS_VIEWER_ORIGIN",
        default_value = DEFAULT_VIEWER_URL
    )]
    pub viewer_url: String,
    /// Delay between proposals (e.g. 10ms, 1s).
    #[arg(long, default_value = "10ms")]
    pub interval: String,
    /// Proposal ticks before giving up.
    #[arg(long, default_value_t = DEFAULT_MAX_PROPOSALS)]
    pub max_proposals: u32,
}

impl ViewerArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let url = Url::parse(&self.viewer_url).map_err(|err| {
            CliError::usage(format!("invalid viewer url '{}': {err}", self.viewer_url))
        })?;
        let config = SessionConfig::new(url)
            .with_proposal_interval(parse_duration(&self.interval)?)
            .with_max_proposals(self.max_proposals);
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Archive file (.qza or .qzv).
    pub file: PathBuf,
    #[command(flatten)]
    pub viewer: ViewerArgs,
    /// Proposals the simulated viewer drops before accepting one.
    #[arg(long, default_value_t = 0)]
    pub ignore_proposals: usize,
    /// Simulated viewer never accepts (exercises the timeout).
    #[arg(long)]
    pub silent: bool,
    /// Content height the simulated viewer reports, in CSS pixels.
    #[arg(long, default_value_t = 400.0)]
    pub height: f64,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding base64 text. Whitespace and line breaks are ignored.
    pub file: PathBuf,
    /// Write decoded bytes here instead of reporting them.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub viewer: ViewerArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("10ms").unwrap(), Duration::from_millis(10));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn viewer_args_build_config() {
        let args = ViewerArgs {
            viewer_url: "https://viewer.example:8443/app/".to_string(),
            interval: "5ms".to_string(),
            max_proposals: 20,
        };
        let config = args.session_config().unwrap();
        assert_eq!(config.proposal_interval, Duration::from_millis(5));
        assert_eq!(config.max_proposals, 20);
        assert_eq!(
            config.trusted_origin().unwrap().to_string(),
            "https://viewer.example:8443"
        );
    }

    #[test]
    fn viewer_args_reject_bad_url() {
        let args = ViewerArgs {
            viewer_url: "not a url".to_string(),
            interval: "10ms".to_string(),
            max_proposals: 200,
        };
        let err = args.session_config().unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
