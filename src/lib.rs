pub mod archive;
pub mod cleanup;
pub mod compile;
pub mod config;
pub mod data;
pub mod download;
pub mod error;
pub mod http;
pub mod launch;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod provision;
pub mod runtime;
pub mod toolchain;
