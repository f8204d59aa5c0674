//! Storage backend traits.

mod aggregate;
mod cursor;

pub use aggregate::AggregateStore;
pub use cursor::CursorStore;
