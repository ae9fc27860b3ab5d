use std::fmt;

/// Convenience result type used across premulsurf.
pub type SurfResult<T> = Result<T, SurfError>;

/// Non-success status reported by a surface allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AllocStatus {
    /// The allocator could not reserve memory for the requested surface.
    NoMemory,
    /// The requested width/height cannot be represented by the allocator.
    InvalidSize,
    /// The allocator does not support the requested pixel format.
    InvalidFormat,
}

impl AllocStatus {
    /// Stable lowercase name, used in error messages and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoMemory => "out of memory",
            Self::InvalidSize => "invalid size",
            Self::InvalidFormat => "invalid format",
        }
    }
}

impl fmt::Display for AllocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error taxonomy used by surface APIs.
#[derive(thiserror::Error, Debug)]
pub enum SurfError {
    /// Encoded bytes could not be decoded into a raster. `reason` is the decoder's own text.
    #[error("decode error: {reason}")]
    Decode {
        /// Decoder diagnostic, propagated verbatim.
        reason: String,
    },

    /// The surface allocator refused a `width`x`height` surface.
    #[error("allocation error: failed to create {width}x{height} surface ({status})")]
    Allocation {
        /// Status reported by the allocator.
        status: AllocStatus,
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// Inconsistent dimensions or buffer sizes.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SurfError {
    /// Build a [`SurfError::Decode`] value.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Build a [`SurfError::Allocation`] value.
    pub fn allocation(status: AllocStatus, width: u32, height: u32) -> Self {
        Self::Allocation {
            status,
            width,
            height,
        }
    }

    /// Build a [`SurfError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for [`SurfError::Decode`].
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// True for [`SurfError::Allocation`].
    pub fn is_allocation(&self) -> bool {
        matches!(self, Self::Allocation { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
