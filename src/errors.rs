use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SGError
{
    #[error("point lies outside of the grid domain")]
    OutOfDomain,
    #[error("number of points and number of values do not match")]
    NumberOfPointsAndValuesMismatch,
    #[error("LZ4 decompression failed")]
    LZ4DecompressionFailed,
    #[error("serialization failed")]
    SerializationFailed,
    #[error("deserialization failed")]
    DeserializationFailed,
    #[error("invalid sequence number")]
    InvalidIndex,
    #[error("invalid level {0}")]
    InvalidLevel(u32),
    #[error("grid storage must be empty before generation")]
    StorageNotEmpty,
    #[error("point is already part of the grid")]
    DuplicatePoint,
    #[error("grid point shares its hash key with a different stored point")]
    HashCollision,
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("discrete coordinate vector for dimension {dim} has length {len}, expected 2^L+1 with 1 <= L <= 11")]
    InvalidDiscreteVector { dim: usize, len: usize },
    #[error("discrete coordinate vector for dimension {dim} is not strictly increasing")]
    NonMonotonicDiscreteVector { dim: usize },
    #[error("full grids are not nested along axis {dim}")]
    GridsNotNested { dim: usize },
    #[error("unsupported stretching transform '{0}'")]
    UnsupportedTransform(String),
    #[error("unsupported basis degree {0}")]
    UnsupportedDegree(usize),
    #[error("derivative of order {order} is not available for this basis")]
    UnsupportedDerivative { order: usize },
    #[error("edge splines of degree {0} lead to a singular system")]
    SingularBasisSystem(usize),
    #[error("quadrature order {0} is not available")]
    InvalidQuadratureOrder(usize),
    #[error("solver did not converge after {iterations} iterations (residual {residual:e})")]
    NoConvergence { iterations: usize, residual: f64 },
}
