pub mod config;
pub mod error;
pub mod logging;

pub mod batch;
pub mod checkpoint;
pub mod controller;
pub mod segmenter;
pub mod storage;
pub mod worker;
