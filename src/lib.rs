//! Hub accessory bridge library.
//!
//! Mirrors the devices of a home-automation hub as smart-home accessories:
//! devices are classified into roles, each role materializes services and
//! characteristic bindings, live attribute changes are routed to the
//! affected characteristics, and characteristic writes become (debounced)
//! hub commands.

pub mod accessory;
pub mod bridge;
pub mod config;
pub mod convert;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod roles;
pub mod router;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, CommandError, Result};
