use tilestream_common::{ConfigError, ContentRef, TileCoord};

use crate::loader::LoaderError;

/// Errors surfaced by the streamer to its caller.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to load tile {coord} from {reference}")]
    Load {
        coord: TileCoord,
        reference: ContentRef,
        #[source]
        source: LoaderError,
    },
    #[error("stream pass task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("no async runtime to run the stream pass on: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("invalid stream config: {0}")]
    Config(#[from] ConfigError),
}
