pub mod args;
pub mod bots;
pub mod catalog;
pub mod db;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod report;
pub mod scoring;
pub mod session;
