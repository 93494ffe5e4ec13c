//! herald: a bulk-message delivery engine.
//!
//! This crate wires the delivery scheduler and the control server into a
//! runnable daemon. The `herald` binary hosts the engine; `heraldctl`
//! drives it over the control socket.

pub mod config;
pub mod control_handler;
pub mod controller;
pub mod dry_run;

pub use config::HeraldConfig;
pub use controller::Herald;
