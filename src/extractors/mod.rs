//! Request extractors.

pub mod client_ip;

pub use client_ip::{forwarded_for, forwarded_ip, ClientIp};
