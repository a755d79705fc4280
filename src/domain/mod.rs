pub mod parameter;
pub mod value;

pub use parameter::*;
pub use value::*;
