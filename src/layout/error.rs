use arcstr::ArcStr;
use thiserror::Error as ThisError;

pub type LayoutResult<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, ThisError)]
pub enum LayoutError {
    #[error("port `{port}` not found on cell `{cell}`")]
    PortNotFound { cell: ArcStr, port: ArcStr },

    #[error("cell `{cell}` already has a port named `{port}`")]
    DuplicatePort { cell: ArcStr, port: ArcStr },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("device `{name}` ({width:.3} x {height:.3} um) does not fit in a {max_width:.3} x {max_height:.3} um device area")]
    DeviceTooLarge {
        name: ArcStr,
        width: f64,
        height: f64,
        max_width: f64,
        max_height: f64,
    },

    #[error("cell `{0}` has no geometry")]
    EmptyCell(ArcStr),

    #[error("coordinate {0} um cannot be represented in a GDSII file")]
    CoordinateOverflow(f64),

    #[error("error writing GDSII: {0}")]
    Gds(String),

    #[error("error rendering preview: {0}")]
    Plot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns [`LayoutError::InvalidParams`] with the given message unless `cond` holds.
pub(crate) fn ensure(cond: bool, msg: impl FnOnce() -> String) -> LayoutResult<()> {
    if cond {
        Ok(())
    } else {
        Err(LayoutError::InvalidParams(msg()))
    }
}

/// Checks that every named dimension is strictly positive and finite.
pub(crate) fn ensure_positive(dims: &[(&str, f64)]) -> LayoutResult<()> {
    for (name, value) in dims {
        ensure(value.is_finite() && *value > 0.0, || {
            format!("`{name}` must be positive, got {value}")
        })?;
    }
    Ok(())
}
