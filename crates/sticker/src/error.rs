use thiserror::Error;

use crate::types::{Mode, Stage};

#[derive(Error, Debug)]
pub enum StickerError {
    #[error("Invalid mode '{0}', expected one of: cutout, sticker, badge, labeled")]
    InvalidMode(String),

    #[error("Segmentation failed: {0}")]
    SegmentationFailure(String),

    #[error("Captioning failed: {0}")]
    CaptioningFailure(String),

    #[error("Degenerate image: {width}x{height} has no area")]
    DegenerateImage { width: u32, height: u32 },

    #[error("Invalid stroke radius {0}, must be >= 0")]
    InvalidStrokeSpec(i32),

    #[error("Invalid canvas spec: {0}")]
    InvalidCanvasSpec(String),

    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to load font: {0}")]
    FontLoad(String),

    #[error("{mode} pipeline failed during {stage}: {source}")]
    Stage {
        mode: Mode,
        stage: Stage,
        #[source]
        source: Box<StickerError>,
    },

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StickerError {
    /// Tag an error with the mode and stage it came from
    pub fn at(self, mode: Mode, stage: Stage) -> Self {
        Self::Stage {
            mode,
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage tags
    pub fn root(&self) -> &StickerError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, StickerError>;
