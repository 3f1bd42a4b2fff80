//! Core screening types and logic.

pub mod bar;
pub mod calendar;
pub mod window;
pub mod predicate;
pub mod exclusion;
pub mod filter_engine;
pub mod filter_parser;
pub mod screen;
pub mod config_validation;
pub mod error;
