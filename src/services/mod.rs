pub mod parameter;

pub use parameter::WindowsParameter;
#[cfg(windows)]
pub use parameter::SystemParameter;
