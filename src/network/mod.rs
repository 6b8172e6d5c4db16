//! A network abstraction layer for embedded systems
//!
//! This module provides the traits the host platform implements to hand the
//! protocol client a duplex byte-stream connection. Synchronous and
//! asynchronous variants are available; the asynchronous ones live behind the
//! `async` feature.
//!

#![allow(missing_docs)]
#![allow(async_fn_in_trait)]
#![deny(unsafe_code)]

use self::error::Error;

/// Common error types for network operations
pub mod error;

/// Protocol-specific client implementations
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    #[cfg(feature = "async")]
    pub use super::{AsyncClose, AsyncConnection, AsyncRead, AsyncWrite};
    pub use super::{Close, Connection, Read, Write};
}

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection.
///
/// The protocol engine needs to tell a would-block read apart from a peer
/// close, so connections report the shared [`Error`] type directly; transports
/// map their platform errors into it (`EAGAIN`/`EWOULDBLOCK` to
/// [`Error::WouldBlock`], everything else to the closest variant).
pub trait Connection:
    Read<Error = Error> + Write<Error = Error> + Close<Error = Error>
{
}

// Core async traits
#[cfg(feature = "async")]
pub trait AsyncRead {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection asynchronously
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

#[cfg(feature = "async")]
pub trait AsyncWrite {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection asynchronously
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer asynchronously
    async fn flush(&mut self) -> Result<(), Self::Error>;
}

#[cfg(feature = "async")]
pub trait AsyncClose {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection asynchronously
    async fn close(self) -> Result<(), Self::Error>;
}

/// An asynchronous connection.
///
/// Same error contract as [`Connection`]. An async transport that suspends
/// until data arrives never needs to surface [`Error::WouldBlock`], but the
/// engine accepts it and treats it as "no data this cycle".
#[cfg(feature = "async")]
pub trait AsyncConnection:
    AsyncRead<Error = Error> + AsyncWrite<Error = Error> + AsyncClose<Error = Error>
{
}
