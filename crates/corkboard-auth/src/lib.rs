pub mod password;
pub mod session;

pub use session::{SessionUser, Sessions};
