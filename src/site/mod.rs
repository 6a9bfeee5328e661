pub mod archive;
pub mod links;
pub mod listings;
pub mod scan;
pub mod snippets;
pub mod tags;
