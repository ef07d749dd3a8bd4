//! Web-search providers

mod tavily;

pub use tavily::TavilySearchProvider;
