//! Mime renderer entry point.

use rachis_transport::EmbeddedFrame;
use serde_json::{Map, Value};

use crate::config::SessionConfig;
use crate::container::Container;
use crate::error::{Result, SessionError};
use crate::mime::{CLASS_NAME, MIME_TYPE};
use crate::session::{ArchiveSession, Delivery};

/// Render model: mime type to data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MimeModel {
    data: Map<String, Value>,
}

impl MimeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn with_data(mut self, mime: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(mime.into(), value.into());
        self
    }

    /// Build from a JSON object. Anything else yields an empty model.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(data) => Self { data },
            _ => Self::default(),
        }
    }

    pub fn get(&self, mime: &str) -> Option<&Value> {
        self.data.get(mime)
    }
}

/// Renders archive models into an embedded viewer.
///
/// Negotiation starts on construction; the archive is sent on the first
/// successful [`render_model`](Self::render_model) and never again.
#[derive(Debug)]
pub struct ArchiveRenderer {
    session: ArchiveSession,
}

impl ArchiveRenderer {
    /// Must be called within a tokio runtime.
    pub fn new<F, C>(frame: F, container: C, config: &SessionConfig) -> Result<Self>
    where
        F: EmbeddedFrame + 'static,
        C: Container,
    {
        Ok(Self {
            session: ArchiveSession::open(frame, container, config)?,
        })
    }

    /// Deliver the model's archive entry (base64 text under [`MIME_TYPE`]).
    pub async fn render_model(&self, model: &MimeModel) -> Result<Delivery> {
        let payload = model
            .get(MIME_TYPE)
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::MissingPayload {
                mime: MIME_TYPE.to_string(),
            })?;
        self.session.deliver(payload).await
    }

    pub fn session(&self) -> &ArchiveSession {
        &self.session
    }

    pub fn class_name(&self) -> &'static str {
        CLASS_NAME
    }
}

#[cfg(test)]
mod tests {
    use rachis_protocol::{encode_archive, HostMessage, RemoteMessage};
    use rachis_transport::{memory_frame, MessagePort, RemoteWindow};
    use serde_json::json;

    use super::*;
    use crate::container::MemoryContainer;

    async fn serve(window: &mut RemoteWindow) -> MessagePort {
        window.signal_loaded();
        let posted = window.recv().await.unwrap();
        let HostMessage::Propose { session, mut port, .. } =
            HostMessage::from_envelope(posted.envelope).unwrap()
        else {
            panic!("expected proposal");
        };
        port.post(RemoteMessage::Accept { session }.into_envelope().unwrap())
            .unwrap();
        port.recv().await.unwrap();
        port.post(RemoteMessage::Ready { session }.into_envelope().unwrap())
            .unwrap();
        port
    }

    #[test]
    fn model_from_json() {
        let model = MimeModel::from_json(json!({
            "application/vnd.rachis.archive+zip": "UEsD",
            "text/plain": "x",
        }));
        assert_eq!(model.get(MIME_TYPE), Some(&json!("UEsD")));
        assert_eq!(MimeModel::from_json(json!([1, 2])), MimeModel::new());
    }

    #[tokio::test]
    async fn renders_archive_entry_once() {
        let (frame, mut window) = memory_frame();
        let renderer =
            ArchiveRenderer::new(frame, MemoryContainer::new(), &SessionConfig::default())
                .unwrap();
        assert_eq!(renderer.class_name(), "mimerenderer-rachis-archive");
        let mut port = serve(&mut window).await;

        let model = MimeModel::new().with_data(MIME_TYPE, encode_archive(b"PK\x03\x04"));
        assert_eq!(
            renderer.render_model(&model).await.unwrap(),
            Delivery::Sent { bytes: 4 }
        );
        assert_eq!(
            renderer.render_model(&model).await.unwrap(),
            Delivery::AlreadySent
        );

        let envelope = port.recv().await.unwrap();
        assert!(matches!(
            HostMessage::from_envelope(envelope).unwrap(),
            HostMessage::BlobArchive { blob } if blob.as_ref() == b"PK\x03\x04"
        ));
    }

    #[tokio::test]
    async fn missing_or_non_string_entry_is_rejected() {
        let (frame, _window) = memory_frame();
        let renderer =
            ArchiveRenderer::new(frame, MemoryContainer::new(), &SessionConfig::default())
                .unwrap();

        let err = renderer
            .render_model(&MimeModel::new().with_data("text/plain", "hi"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::MissingPayload {
                mime: MIME_TYPE.to_string()
            }
        );

        let model = MimeModel::new().with_data(MIME_TYPE, json!({"b64": "UEsD"}));
        assert!(renderer.render_model(&model).await.is_err());
        assert!(!renderer.session().is_delivered().await);
    }
}
