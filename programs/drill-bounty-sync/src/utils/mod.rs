pub mod amount;

pub use amount::*;
