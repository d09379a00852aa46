//! Render an archive into an in-process viewer and print what it saw.
//!
//! Run with:
//!   cargo run -p rachis --example loopback -- path/to/result.qzv

use rachis::protocol::encode_archive;
use rachis::session::{
    ArchiveRenderer, LoopbackBehavior, LoopbackViewer, MemoryContainer, MimeModel, SessionConfig,
    MIME_TYPE,
};
use rachis::transport::memory_frame;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: loopback <archive.qza|archive.qzv>")?;
    let archive = std::fs::read(&path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let (frame, window) = memory_frame();
        let viewer = tokio::spawn(LoopbackViewer::new(window, LoopbackBehavior::default()).run());

        let container = MemoryContainer::new();
        let renderer = ArchiveRenderer::new(frame, container.clone(), &SessionConfig::default())?;
        let model = MimeModel::new().with_data(MIME_TYPE, encode_archive(&archive));
        let delivery = renderer.render_model(&model).await?;
        eprintln!("Delivery: {delivery:?}");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        eprintln!("Container height: {:?}", container.height());
        drop(renderer);

        let report = viewer.await?;
        eprintln!(
            "Viewer saw {} proposal(s), received {} bytes",
            report.proposals_seen,
            report.archive.map_or(0, |blob| blob.len())
        );
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}
