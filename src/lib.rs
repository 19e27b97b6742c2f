//! Tollgate - Request Admission Engine
//!
//! This crate decides, before any business work is done, whether a caller
//! may proceed. Callers are tracked per identifier and per policy tier in
//! fixed windows, either in process or in a shared Redis so that every
//! instance of a multi-process deployment sees the same counts.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
