//! # Application Layer Network Protocols
//!
//! This module contains application layer (OSI Layer 7) protocol
//! implementations built on the core network traits. Each protocol client is
//! connection agnostic: it works with any type implementing
//! [`Connection`](crate::network::Connection) and keeps its own state in
//! fixed-size or explicitly bounded buffers.
//!
//! ## Available Protocols
//!
//! - **[`pubsub`]**: newline-delimited text/JSON publish-subscribe client for
//!   talking to a central message broker

/// Pub-sub protocol client implementation.
///
/// A line-oriented text/JSON publish-subscribe protocol for connecting
/// constrained devices to a central message broker, with channel
/// subscriptions, request/response calls, and service responders.
pub mod pubsub;
