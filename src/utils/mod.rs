pub mod span;

pub use span::{LineIndex, Position, Span};
