//! # ollama-stream - client for a local LLM inference server
//!
//! A small async library for the Ollama HTTP API: single-prompt generation,
//! chat with caller-managed history, and streamed replies read line by line.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Streaming replies as a `futures::Stream` of text fragments
//! - Clean completion vs. dropped connection vs. malformed record, as distinct errors
//! - Generic model and transport options
//!
//! ## Architecture
//!
//! The crate uses a two-tier API design:
//!
//! 1. **Static methods** for full control with explicit options
//! 2. **Instance methods** for convenience with stored default options
//!
//! Streaming calls return a [`FragmentReader`], which owns the response body.
//! It yields each text fragment as its line arrives, stops reading at the
//! record with `done = true` and releases the connection on every exit path,
//! including when the caller drops it early.
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use ollama_stream::client::StreamingClient;
//! use ollama_stream::providers::OllamaClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OllamaClient::default();
//!
//!     let mut reader = client
//!         .generate_stream("Explain quantum computing in simple terms.".to_string())
//!         .await?;
//!
//!     while let Some(fragment) = reader.next().await {
//!         print!("{}", fragment?);
//!     }
//!     println!();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod model;
pub mod ndjson;
pub mod options;
pub mod providers;
pub mod stream;

// Re-exports for convenience
pub use client::{Client, ClientError, StreamingClient};
pub use model::{ChatResponse, GenerateResponse, Message, Role, StreamRecord};
pub use stream::FragmentReader;
