// Background jobs

pub mod cache_sweeper;
