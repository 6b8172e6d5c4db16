//! # libpubsub - Rust pub-sub client SDK for IoT devices
//!
//! A lightweight client for a text/JSON publish-subscribe messaging protocol
//! that connects constrained network devices to a central message broker.
//! This library is designed for embedded systems and supports `no_std`
//! environments (an allocator is required).
//!
//! ## Features
//!
//! ### Protocol Engine
//! - **Publish/Subscribe**: named channels with ordered callback dispatch
//! - **Remote Calls**: request/response correlation with expiration deadlines
//! - **Services**: register responder callbacks for named calls
//! - **Keep-Alive**: automatic replies to broker pings
//!
//! ### Convenience Layers
//! - **Device Descriptions**: announce a structured device/component
//!   description to the broker in one call
//! - **Channel Variables**: clamped, optionally smoothed numeric values
//!   mirrored over a channel
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libpubsub = "0.1.0"
//! ```
//!
//! ### Basic Client Example
//!
//! ```rust,no_run
//! use libpubsub::network::application::pubsub::{Client, Options, Payload};
//! # use libpubsub::network::Connection;
//! # use libpubsub::network::error::Error;
//! # use libpubsub::time::Clock;
//! # struct MockConnection;
//! # impl libpubsub::network::Read for MockConnection {
//! #     type Error = Error;
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Error> { Err(Error::WouldBlock) }
//! # }
//! # impl libpubsub::network::Write for MockConnection {
//! #     type Error = Error;
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl libpubsub::network::Close for MockConnection {
//! #     type Error = Error;
//! #     fn close(self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl Connection for MockConnection {}
//! # struct MockClock(u64);
//! # impl Clock for MockClock { fn now_millis(&mut self) -> u64 { self.0 += 1; self.0 } }
//!
//! let connection = MockConnection;
//! let options = Options {
//!     handle: "Sensor_##",
//!     handshake_timeout_ms: 5_000,
//! };
//! let rng = rand::rngs::mock::StepRng::new(7, 13);
//!
//! // let mut client = Client::connect(connection, options, rng, MockClock(0))?;
//! // client.subscribe("lab/temperature", |sender: &str, _: &str, event: &Payload| {
//! //     // handle the event
//! // })?;
//! // loop { client.poll()?; }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.) with an allocator
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` and `alloc` libraries
//!
//! The host platform provides the transport (any duplex byte stream
//! implementing the [`network`] traits), a monotonic [`time::Clock`], and a
//! [`rand_core::RngCore`] source.
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `async`: Enable async/await support for non-blocking operations
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

extern crate alloc;

/// Network abstraction layer providing the transport traits and the protocol client.
///
/// This module contains the byte-stream traits the host platform implements
/// and the pub-sub protocol client built on top of them.
pub mod network;

/// Monotonic time access for protocol deadlines.
///
/// The engine never reads a wall clock; the host injects a [`time::Clock`]
/// that drives call expiration and the handshake timeout.
pub mod time;
