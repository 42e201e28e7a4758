//! Core module containing the main functionality of Vcomm
//!
//! This module provides:
//! - Link lifecycle management around the external multiplexer process
//! - Injected log sinks so front-ends choose how messages are delivered
//! - Traffic capture of the relayed byte stream

pub mod capture;
pub mod link;
pub mod sink;
