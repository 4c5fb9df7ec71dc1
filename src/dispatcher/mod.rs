mod core;

pub use core::{Dispatcher, Invocation, Phase, Reply};
