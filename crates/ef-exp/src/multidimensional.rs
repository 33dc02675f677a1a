//! Dimensionality query for vector-valued families.

/// A family whose observations live in a fixed number of dimensions.
pub trait Multidimensional {
    /// The event dimensionality (trailing event-axis length).
    fn dimensions(&self) -> usize;
}
