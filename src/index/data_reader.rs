use std::any::Any;
use std::fmt;

/// A read-only view over one component of a single segment.
///
/// Implementations are registered with a `SegReader` under their
/// [`DataReader::api`] name and recovered with [`downcast`].
pub trait DataReader: Send + Sync + fmt::Debug {
    fn api(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Recover the concrete reader behind a registered component.
pub fn downcast<T: 'static>(reader: &dyn DataReader) -> Option<&T> {
    reader.as_any().downcast_ref::<T>()
}
