pub mod clock;

pub(crate) mod timer;

pub use clock::*;
