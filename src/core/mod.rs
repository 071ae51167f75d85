pub mod assemble;
pub mod config;
pub mod feed;
pub mod importer;
pub mod llm;
pub mod manager;
pub mod social;
pub mod storage;
pub mod store;
pub mod sync;
