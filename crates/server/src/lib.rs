//! MCP server for nestwalk.
//!
//! Exposes one templated resource, `all-nested-groups`, through an rmcp
//! [`ServerHandler`](rmcp::ServerHandler):
//! - streamable HTTP on `/mcp`, plus a plain-JSON
//!   `GET /all-nested-groups/{groupId}`, via [`http`]
//! - stdin/stdout via [`stdio`]

pub mod handler;
pub mod http;
pub mod resource;
pub mod stdio;

pub use handler::McpServer;
pub use resource::{NestedGroups, NestedGroupsResource};

/// Listen port when none is configured.
pub const DEFAULT_PORT: u16 = 8080;
