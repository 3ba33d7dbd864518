#![doc = include_str!("../README.md")]

mod driver;
mod error;
mod events;
mod logger;
mod pool;
mod socket;
mod unix;
mod worker;


pub use crate::driver::*;
pub use crate::error::*;
pub use crate::events::*;
pub use crate::logger::*;
pub use crate::pool::*;
pub use crate::socket::*;
pub use crate::unix::{DEFAULT_UNIX_DIR, DEFAULT_UNIX_PREFIX, render_unix};
pub use crate::worker::*;
