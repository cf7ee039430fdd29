pub mod analyze;
mod health;
pub mod sse;

pub use analyze::*;
pub use health::*;
