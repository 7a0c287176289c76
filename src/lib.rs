pub mod chart;
pub mod cli;
pub mod config;
pub mod insight;
pub mod logging;
pub mod report;
pub mod usage;
