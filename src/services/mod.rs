pub mod ai_service;
pub mod calendar;
pub mod market_data;
pub mod scoring;
pub mod signal_parser;
