pub mod fetcher;
pub mod sources;
