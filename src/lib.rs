//! sitegen - Generate and grow a static website with an LLM
//!
//! A staged pipeline that turns a short statement of purpose into a brand
//! identity, sitemap, content strategy and a full set of HTML pages, then
//! keeps the site growing with improvement cycles that add articles to the
//! thinnest hub. Supports Gemini, OpenAI, Anthropic and OpenAI-compatible
//! providers with credential rotation.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod site;
pub mod social;
pub mod util;
