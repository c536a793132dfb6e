//! Completion client for the hosted LLM API.
//!
//! This module provides the boundary abstraction over the hosted text
//! completion service used by every generation stage: request/response
//! value types, the [`CompletionProvider`] trait, and a reqwest-backed
//! client for the hosted messages endpoint.
//!
//! Completion calls are long-latency suspension points: a single request
//! may take from seconds to several minutes, and the client enforces one
//! long fixed timeout per call with no implicit retries.

pub mod client;

pub use client::{
    Attachment, AttachmentKind, CompletionProvider, CompletionRequest, CompletionResponse,
    HostedCompletionClient, Usage,
};
