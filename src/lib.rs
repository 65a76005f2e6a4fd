//! Edition administration service
//!
//! Web forms for maintaining the digital-edition websites: transcription
//! uploads, background rebuild jobs, XML-to-HTML conversion bundles and
//! chapter baking through a headless browser. Jobs are queued in Redis (or
//! in memory) and run by worker loops; pages poll `/poll_state` until a job
//! finishes.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod tasks;
pub mod telemetry;
pub mod views;
pub mod worker;
