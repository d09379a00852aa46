use std::time::{Duration, Instant};

use rachis_protocol::encode_archive;
use rachis_session::{
    is_archive_path, ArchiveRenderer, Delivery, LoopbackBehavior, LoopbackReport, LoopbackViewer,
    MemoryContainer, MimeModel, SessionConfig, SessionError, MIME_TYPE,
};
use rachis_transport::memory_frame;
use serde::Serialize;

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS};
use crate::output::{display_opt, print_report, OutputFormat, Report};

/// How long to wait for the viewer's size report after delivery.
const RESIZE_WAIT: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct SimulateOutput {
    file: String,
    viewer_origin: String,
    archive_bytes: usize,
    delivered: bool,
    proposals_seen: usize,
    accepted_round: Option<String>,
    received_bytes: Option<usize>,
    container_height: Option<String>,
    elapsed_ms: u64,
}

impl Report for SimulateOutput {
    fn title(&self) -> &'static str {
        "Simulated Render"
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("File", self.file.clone()),
            ("Viewer origin", self.viewer_origin.clone()),
            ("Archive bytes", self.archive_bytes.to_string()),
            ("Delivered", self.delivered.to_string()),
            ("Proposals seen", self.proposals_seen.to_string()),
            ("Accepted round", display_opt(self.accepted_round.as_deref())),
            ("Received bytes", display_opt(self.received_bytes)),
            ("Container height", display_opt(self.container_height.as_deref())),
            ("Elapsed", format!("{}ms", self.elapsed_ms)),
        ]
    }

    fn raw(&self) -> String {
        display_opt(self.container_height.as_deref())
    }
}

struct Simulation {
    delivery: Delivery,
    report: LoopbackReport,
    container_height: Option<String>,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    if !is_archive_path(&args.file) {
        return Err(CliError::usage(format!(
            "{} is not a .qza or .qzv archive",
            args.file.display()
        )));
    }
    if !args.height.is_finite() || args.height < 0.0 {
        return Err(CliError::usage("height must be a non-negative number"));
    }

    let config = args.viewer.session_config()?;
    let origin = config
        .trusted_origin()
        .map_err(|err| session_error("viewer url", err))?;
    let archive = std::fs::read(&args.file).map_err(|err| io_error("read archive", err))?;

    let behavior = LoopbackBehavior {
        ignore_proposals: args.ignore_proposals,
        silent: args.silent,
        content_height: Some(args.height),
    };

    tracing::info!(
        file = %args.file.display(),
        bytes = archive.len(),
        origin = %origin,
        "simulating archive render"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| io_error("start runtime", err))?;

    let started = Instant::now();
    let simulation = runtime
        .block_on(simulate(&archive, &config, behavior))
        .map_err(|err| session_error("render failed", err))?;

    let out = SimulateOutput {
        file: args.file.display().to_string(),
        viewer_origin: origin.to_string(),
        archive_bytes: archive.len(),
        delivered: matches!(simulation.delivery, Delivery::Sent { .. }),
        proposals_seen: simulation.report.proposals_seen,
        accepted_round: simulation
            .report
            .accepted_round
            .map(|round| round.to_string()),
        received_bytes: simulation.report.archive.as_ref().map(|blob| blob.len()),
        container_height: simulation.container_height,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    print_report(&out, format);
    Ok(SUCCESS)
}

async fn simulate(
    archive: &[u8],
    config: &SessionConfig,
    behavior: LoopbackBehavior,
) -> rachis_session::Result<Simulation> {
    let (frame, window) = memory_frame();
    let reports_height = behavior.content_height.is_some();
    let viewer = tokio::spawn(LoopbackViewer::new(window, behavior).run());

    let container = MemoryContainer::new();
    let renderer = ArchiveRenderer::new(frame, container.clone(), config)?;
    let model = MimeModel::new().with_data(MIME_TYPE, encode_archive(archive));
    let delivery = renderer.render_model(&model).await?;

    if reports_height {
        wait_for_resize(&container).await;
    }
    // Closing the session closes the channel, which ends the viewer.
    drop(renderer);

    let report = viewer
        .await
        .map_err(|err| SessionError::Faulted(format!("viewer task failed: {err}")))?;

    Ok(Simulation {
        delivery,
        report,
        container_height: container.height(),
    })
}

async fn wait_for_resize(container: &MemoryContainer) {
    let resized = tokio::time::timeout(RESIZE_WAIT, async {
        while container.height().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    if resized.is_err() {
        tracing::warn!(wait = ?RESIZE_WAIT, "viewer did not report its size");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulates_against_loopback_viewer() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime should build");
        let config = SessionConfig::default().with_proposal_interval(Duration::from_millis(1));
        let behavior = LoopbackBehavior {
            ignore_proposals: 2,
            ..LoopbackBehavior::default()
        };

        let simulation = runtime
            .block_on(simulate(b"PK\x03\x04demo", &config, behavior))
            .expect("simulation should succeed");

        assert_eq!(simulation.delivery, Delivery::Sent { bytes: 8 });
        assert!(simulation.report.proposals_seen >= 3);
        assert_eq!(
            simulation.report.archive.as_deref(),
            Some(&b"PK\x03\x04demo"[..])
        );
        assert_eq!(simulation.container_height.as_deref(), Some("450px"));
    }

    #[test]
    fn silent_viewer_times_out() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime should build");
        let config = SessionConfig::default()
            .with_proposal_interval(Duration::from_millis(1))
            .with_max_proposals(5);
        let behavior = LoopbackBehavior {
            silent: true,
            ..LoopbackBehavior::default()
        };

        let err = runtime
            .block_on(simulate(b"demo", &config, behavior))
            .err()
            .expect("silent viewer should time out");
        assert_eq!(session_error("render failed", err).code, crate::exit::TIMEOUT);
    }
}
