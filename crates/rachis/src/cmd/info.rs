use rachis_session::{
    CLASS_NAME, FILE_EXTENSIONS, FILE_TYPE_NAME, MIME_TYPE, RENDERER_RANK, RENDERER_SAFE,
};
use serde::Serialize;

use crate::cmd::InfoArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct InfoOutput {
    viewer_url: String,
    trusted_origin: String,
    proposal_interval_ms: u64,
    max_proposals: u32,
    negotiation_budget_ms: u64,
    resize_margin_px: f64,
    mime_type: &'static str,
    file_type: &'static str,
    extensions: Vec<&'static str>,
    class_name: &'static str,
    rank: u32,
    safe: bool,
}

impl Report for InfoOutput {
    fn title(&self) -> &'static str {
        "Viewer Info"
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Viewer URL", self.viewer_url.clone()),
            ("Trusted origin", self.trusted_origin.clone()),
            ("Proposal interval", format!("{}ms", self.proposal_interval_ms)),
            ("Max proposals", self.max_proposals.to_string()),
            ("Negotiation budget", format!("{}ms", self.negotiation_budget_ms)),
            ("Resize margin", format!("{}px", self.resize_margin_px)),
            ("MIME type", self.mime_type.to_string()),
            ("File type", self.file_type.to_string()),
            ("Extensions", self.extensions.join(", ")),
            ("Class name", self.class_name.to_string()),
            ("Rank", self.rank.to_string()),
            ("Safe", self.safe.to_string()),
        ]
    }

    fn raw(&self) -> String {
        self.trusted_origin.clone()
    }
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.viewer.session_config()?;
    let origin = config
        .trusted_origin()
        .map_err(|err| session_error("viewer url", err))?;
    config
        .negotiator()
        .map_err(|err| session_error("viewer config", err))?;

    let interval_ms = u64::try_from(config.proposal_interval.as_millis()).unwrap_or(u64::MAX);
    let out = InfoOutput {
        viewer_url: config.viewer_url.to_string(),
        trusted_origin: origin.to_string(),
        proposal_interval_ms: interval_ms,
        max_proposals: config.max_proposals,
        negotiation_budget_ms: interval_ms.saturating_mul(u64::from(config.max_proposals)),
        resize_margin_px: config.resize_margin_px,
        mime_type: MIME_TYPE,
        file_type: FILE_TYPE_NAME,
        extensions: FILE_EXTENSIONS.to_vec(),
        class_name: CLASS_NAME,
        rank: RENDERER_RANK,
        safe: RENDERER_SAFE,
    };

    print_report(&out, format);
    Ok(SUCCESS)
}
