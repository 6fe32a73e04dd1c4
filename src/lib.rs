//! Career Assist: a scripted career interview with an LLM fallback.

pub mod app;
pub mod config;
pub mod error;
pub mod interview;
pub mod llm;
pub mod store;
pub mod web;
