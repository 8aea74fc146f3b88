#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine command channel closed")]
    ChannelClosed,

    #[error("Store error: {0}")]
    Store(#[from] crate::registry::StoreError),
}
