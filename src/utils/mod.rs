mod console;
mod helpers;
mod logging;

pub use console::*;
pub use helpers::*;
pub use logging::*;
