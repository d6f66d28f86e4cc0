//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for interacting with Large Language
//! Model (LLM) providers, plus the [`Agent`] wrapper every research stage uses
//! to call them.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection and client construction
//! - [`Agent`] - An agent profile bound to a client, invoked with a deadline
//! - [`GenerationOutcome`] - Structured value, raw text or typed failure
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use vidya::llm::Provider;
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! };
//! let client = provider.create_client().await?;
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Deadline-bounded agent invocation.
pub mod generation;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
pub use generation::{Agent, GenerationOutcome};
