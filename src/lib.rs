//! # Brewbot
//!
//! A Telegram bot that tracks coffee and tea consumption per user in a
//! shared ledger, with monthly leaderboards, fan-out notifications and
//! rendered consumption charts.

pub mod bot;
pub mod charts;
pub mod commands;
pub mod config;
pub mod domain;
pub mod executor;
pub mod keyboard;
pub mod outbound;
pub mod reporting;
pub mod storage;
