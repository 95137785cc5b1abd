pub mod exercise;
pub mod food;
pub mod plan;
pub mod schedule;
pub mod settings;
pub mod tracker;
