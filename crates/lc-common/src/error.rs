/// Error types shared across the learning-center crates.
///
/// These represent failures in infrastructure concerns (filesystem, JSON,
/// image codecs) that more than one crate hits. Application-specific errors
/// are defined per crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
}
