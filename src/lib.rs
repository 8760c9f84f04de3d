//! Earnings call transcript analysis: parsing, sentiment, tone change and strategic focuses.

pub mod cache;
pub mod insight;
pub mod llm;
pub mod pipeline;
pub mod scrape;
pub mod sentiment;
pub mod transcript;
