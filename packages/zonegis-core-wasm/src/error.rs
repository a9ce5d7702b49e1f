use thiserror::Error;

/// Input problems detected before any per-feature work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("layer '{layer_id}' has no features")]
    EmptyLayer { layer_id: String },

    #[error("buffer distance must be a finite positive number of meters, got {0}")]
    InvalidDistance(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),

    #[error("malformed geometry in feature '{feature_id}': {reason}")]
    MalformedGeometry { feature_id: String, reason: String },

    /// The local tangent plane collapses at the poles.
    #[error("cannot build a local projection at latitude {latitude}")]
    DegenerateProjection { latitude: f64 },

    #[error("buffering feature '{feature_id}' produced no geometry")]
    EmptyBuffer { feature_id: String },

    #[error("no feature of layer '{layer_id}' could be buffered")]
    NoBufferableFeatures { layer_id: String },

    #[error("export failed: {0}")]
    Export(String),
}

impl PipelineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
