pub mod event;
pub mod id;
pub mod job;
pub mod review;
pub mod worker;

pub use event::*;
pub use job::*;
pub use review::*;
pub use worker::*;
