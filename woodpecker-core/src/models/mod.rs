mod side;
mod tactic;
mod trial;

pub use side::*;
pub use tactic::*;
pub use trial::*;
