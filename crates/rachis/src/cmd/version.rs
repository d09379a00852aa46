use rachis_protocol::{
    EVENT_BLOB_ARCHIVE, EVENT_INNER_SIZE, EVENT_SESSION_ACCEPT, EVENT_SESSION_CONFIRM,
    EVENT_SESSION_PROPOSE, EVENT_SESSION_READY,
};
use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

const PROTOCOL_EVENTS: [&str; 6] = [
    EVENT_SESSION_PROPOSE,
    EVENT_SESSION_ACCEPT,
    EVENT_SESSION_CONFIRM,
    EVENT_SESSION_READY,
    EVENT_BLOB_ARCHIVE,
    EVENT_INNER_SIZE,
];

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<BuildInfo>,
}

#[derive(Serialize)]
struct BuildInfo {
    target: &'static str,
    rustc: &'static str,
    git_hash: &'static str,
    features: Vec<&'static str>,
    protocol_events: [&'static str; 6],
}

impl BuildInfo {
    fn collect() -> Self {
        let mut features = vec!["cli"];
        if cfg!(feature = "session") {
            features.push("session");
        }
        Self {
            target: option_env!("RACHIS_BUILD_TARGET").unwrap_or("unknown"),
            rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
            features,
            protocol_events: PROTOCOL_EVENTS,
        }
    }
}

impl Report for VersionOutput {
    fn title(&self) -> &'static str {
        "Version"
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("Name", self.name.to_string()),
            ("Version", self.version.to_string()),
        ];
        if let Some(build) = &self.build {
            fields.extend([
                ("Target", build.target.to_string()),
                ("Rustc", build.rustc.to_string()),
                ("Git hash", build.git_hash.to_string()),
                ("Features", build.features.join(", ")),
                ("Protocol events", build.protocol_events.join(", ")),
            ]);
        }
        fields
    }

    fn raw(&self) -> String {
        self.version.to_string()
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let out = VersionOutput {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        build: args.extended.then(BuildInfo::collect),
    };

    // The short form stays a single line unless structured output was asked for.
    if out.build.is_none() && matches!(format, OutputFormat::Table | OutputFormat::Pretty) {
        println!("{} {}", out.name, out.version);
        return Ok(SUCCESS);
    }

    print_report(&out, format);
    Ok(SUCCESS)
}
