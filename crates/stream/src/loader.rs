use async_trait::async_trait;
use tilestream_common::ContentRef;

/// Failures reported by a [`ContentLoader`].
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("content not found: {0}")]
    NotFound(ContentRef),
    #[error("handle is not live: {0}")]
    StaleHandle(String),
    #[error("loader backend failed: {0}")]
    Backend(String),
}

/// The content system tiles are streamed through.
///
/// `Handle` is an opaque token for one resident content unit. The streamer
/// passes each handle it receives back to `unload` exactly once.
#[async_trait]
pub trait ContentLoader: Send + Sync + 'static {
    type Handle: Send + 'static;

    async fn load(&self, reference: &ContentRef, activate: bool)
    -> Result<Self::Handle, LoaderError>;

    async fn unload(&self, handle: Self::Handle) -> Result<(), LoaderError>;
}
