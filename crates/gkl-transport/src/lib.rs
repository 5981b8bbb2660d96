//! Transport boundary for dispenser channels.
//!
//! The polling core only needs two capabilities from a channel's link:
//! - a synchronous [`ByteSink`] that writes a whole frame or fails
//! - a non-blocking [`ByteSource`] that hands over whatever bytes arrived
//!
//! [`StreamLink`] provides both over any `Read + Write` stream, and
//! [`SerialLink`] does the same for a serial port.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialLink};
pub use traits::{ByteSink, ByteSource, StreamLink};
