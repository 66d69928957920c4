pub mod catalog;
pub mod compiler;
pub mod manifest;
pub mod merger;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod relationship;
pub mod resolver;
