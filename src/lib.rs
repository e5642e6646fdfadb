//! Website question answering over crawled documentation, plus a YouTube
//! metadata tool, served to chat front ends over HTTP.

pub mod core;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod rag;
pub mod server;
pub mod state;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;
