pub mod client;
pub mod client_impl;
pub mod factory;
pub mod prompts;
pub mod retry;
pub mod rotation;
