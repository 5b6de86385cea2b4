// src/lib.rs

//! Bounty Watch Library
//!
//! Polls a bug-bounty listing, compares it with the last stored state and
//! reports updated timestamps and new asset links.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
