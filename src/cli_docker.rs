mod dev_container;
mod lifecycle;

pub use dev_container::*;
pub use lifecycle::*;
