#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod battery;
pub mod bus;
mod error;
pub mod hub;
pub mod poll;
pub mod request;
pub mod speaker;
pub mod status;

pub use battery::Gauge;
pub use bus::{RegisterBus, ShiftRegisterBus};
pub use error::{BusFailure, Error};
pub use hub::Hub;
pub use poll::{PollPolicy, PollResult, Poller};
pub use request::Request;
pub use speaker::Speaker;
pub use status::HubStatus;
