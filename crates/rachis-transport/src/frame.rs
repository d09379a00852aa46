use std::future::Future;

use url::Url;

use crate::error::Result;
use crate::origin::Origin;
use crate::port::Envelope;

/// Navigation target and presentational attributes of an embedded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAttributes {
    pub src: Url,
    pub width: String,
    pub height: String,
    pub border: String,
}

impl FrameAttributes {
    /// A borderless frame that fills its container.
    pub fn fill(src: Url) -> Self {
        Self {
            src,
            width: "100%".to_string(),
            height: "100%".to_string(),
            border: "none".to_string(),
        }
    }

    /// Origin the frame will load.
    pub fn origin(&self) -> Result<Origin> {
        Origin::from_url(&self.src)
    }
}

/// A frame embedding a document from another origin.
///
/// Implementations must honour the target origin on every post: a message
/// addressed to an origin other than the frame's current document is dropped,
/// never delivered.
pub trait EmbeddedFrame: Send + Sync {
    /// Apply navigation target and layout.
    fn configure(&self, attributes: &FrameAttributes) -> Result<()>;

    /// Resolves once the embedded document has finished loading.
    fn loaded(&self) -> impl Future<Output = Result<()>> + Send;

    /// Post a message to the embedded document.
    fn post_message(&self, envelope: Envelope, target_origin: &Origin) -> Result<()>;
}
