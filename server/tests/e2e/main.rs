//! End-to-end test entry point
//! Run with: cargo test --test e2e

#[path = "../common/mod.rs"]
mod common;
mod tts_pipeline;
