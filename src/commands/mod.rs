pub mod reading;

pub use reading::{SessionClosed, SessionCommand, SessionHandle, SessionSnapshot};
