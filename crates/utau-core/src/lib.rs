pub mod calibrate;
pub mod session;

pub use calibrate::*;
pub use session::*;
