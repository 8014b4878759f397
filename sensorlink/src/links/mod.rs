pub mod pattern;
pub mod resolver;

pub use pattern::{LinkMatch, LinkPattern, LinkToken};
pub use resolver::CustomLinks;
