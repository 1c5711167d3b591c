//! Terminal presentation for each subcommand

pub mod fund;
pub mod health;
pub mod recommendations;
pub mod setup;
pub mod ui;
pub mod watch;
