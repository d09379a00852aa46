use std::sync::LazyLock;
use std::time::Duration;

use rachis_transport::Origin;
use url::Url;

use crate::error::{NegotiationError, Result};

/// Trusted viewer application loaded into the frame.
pub const DEFAULT_VIEWER_URL: &str = "https://view.qiime2.org/";
/// [`DEFAULT_VIEWER_URL`], parsed once.
static DEFAULT_VIEWER: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DEFAULT_VIEWER_URL).expect("DEFAULT_VIEWER_URL is a valid URL"));

/// Delay between proposal rounds.
pub const DEFAULT_PROPOSAL_INTERVAL: Duration = Duration::from_millis(10);
/// Proposal ticks before negotiation gives up (about 2s at the default interval).
pub const DEFAULT_MAX_PROPOSALS: u32 = 200;
/// Extra height added to every content size report, in CSS pixels.
pub const DEFAULT_RESIZE_MARGIN_PX: f64 = 50.0;

/// Configuration for channel negotiation.
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// The only origin proposals may be delivered to.
    pub trusted_origin: Origin,
    /// Delay between proposal rounds.
    pub proposal_interval: Duration,
    /// Tick budget for the whole handshake.
    pub max_proposals: u32,
}

impl NegotiatorConfig {
    pub fn new(trusted_origin: Origin) -> Self {
        Self {
            trusted_origin,
            proposal_interval: DEFAULT_PROPOSAL_INTERVAL,
            max_proposals: DEFAULT_MAX_PROPOSALS,
        }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), NegotiationError> {
        if self.proposal_interval.is_zero() {
            return Err(NegotiationError::InvalidConfig(
                "proposal interval must be greater than zero".to_string(),
            ));
        }
        if self.max_proposals == 0 {
            return Err(NegotiationError::InvalidConfig(
                "max proposals must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for an archive session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// URL the embedded frame navigates to. Its origin is the trusted origin.
    pub viewer_url: Url,
    pub proposal_interval: Duration,
    pub max_proposals: u32,
    /// Added to every reported content height.
    pub resize_margin_px: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWER.clone())
    }
}

impl SessionConfig {
    pub fn new(viewer_url: Url) -> Self {
        Self {
            viewer_url,
            proposal_interval: DEFAULT_PROPOSAL_INTERVAL,
            max_proposals: DEFAULT_MAX_PROPOSALS,
            resize_margin_px: DEFAULT_RESIZE_MARGIN_PX,
        }
    }

    pub fn with_proposal_interval(mut self, interval: Duration) -> Self {
        self.proposal_interval = interval;
        self
    }

    pub fn with_max_proposals(mut self, max_proposals: u32) -> Self {
        self.max_proposals = max_proposals;
        self
    }

    pub fn with_resize_margin(mut self, margin_px: f64) -> Self {
        self.resize_margin_px = margin_px;
        self
    }

    /// Origin of the viewer URL.
    pub fn trusted_origin(&self) -> Result<Origin> {
        Ok(Origin::from_url(&self.viewer_url)?)
    }

    /// Negotiator settings derived from this config.
    pub fn negotiator(&self) -> Result<NegotiatorConfig> {
        let config = NegotiatorConfig {
            trusted_origin: self.trusted_origin()?,
            proposal_interval: self.proposal_interval,
            max_proposals: self.max_proposals,
        };
        config.validate()?;
        Ok(config)
    }
}
