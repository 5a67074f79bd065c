pub mod api;
pub mod config;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod schema;
pub mod sheet;
pub mod slug;
