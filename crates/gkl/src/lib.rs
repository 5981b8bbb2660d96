//! Polling controller for GKL fuel dispensers.
//!
//! A host polls dispenser stations over two independent serial channels with
//! short binary frames (`02 00 ADDR CMD payload XOR`) and parses the replies
//! byte by byte.
//!
//! # Crate Structure
//!
//! - [`frame`]: frame codec, streaming parser and command table
//! - [`transport`]: byte sink/source traits and the serial port link
//! - [`poll`]: per-channel poll scheduler and the two-channel controller
//!
//! The `gkl` command-line tool is built with the `cli` feature.

/// Re-export frame types.
pub mod frame {
    pub use gkl_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use gkl_transport::*;
}

/// Re-export polling types.
pub mod poll {
    pub use gkl_poll::*;
}
