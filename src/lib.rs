pub mod calendar;
pub mod config;
pub mod error;
pub mod indicator;
pub mod market;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod scorer;
