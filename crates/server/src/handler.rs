//! rmcp handler serving the `all-nested-groups` resource template.

use crate::resource::{NestedGroupsResource, MIME_TYPE};
use nestwalk_core::NestwalkError;
use rmcp::model::{
    Implementation, ListResourceTemplatesResult, ListResourcesResult, PaginatedRequestParam,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents, ResourceTemplate,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::json;
use std::sync::Arc;

const SERVER_NAME: &str = "nestwalk";

const INSTRUCTIONS: &str = "Read gitlab://all-nested-groups/{groupId} to list every nested \
     subgroup of a GitLab group (numeric id or URL-encoded full path). \
     `complete: false` means some subtrees could not be listed; see `truncated`.";

/// Cheap to clone; every MCP session shares one resource.
#[derive(Clone)]
pub struct McpServer {
    resource: Arc<NestedGroupsResource>,
}

impl McpServer {
    pub fn new(resource: NestedGroupsResource) -> Self {
        Self {
            resource: Arc::new(resource),
        }
    }

    pub fn resource(&self) -> &NestedGroupsResource {
        &self.resource
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_resources().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    /// Nothing is enumerable; everything is reached through the template.
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: Vec::new(),
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            resource_templates: vec![template()?],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        tracing::debug!(%uri, "resources/read");

        let payload = self
            .resource
            .read_uri(&uri)
            .await
            .map_err(|e| error_data(e, &uri))?;
        let text = serde_json::to_string(&payload)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let mut contents = ResourceContents::text(text, uri);
        if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
            *mime_type = Some(MIME_TYPE.to_string());
        }
        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}

/// The template in rmcp's model, converted through its wire form.
fn template() -> Result<ResourceTemplate, McpError> {
    serde_json::to_value(NestedGroupsResource::template())
        .and_then(serde_json::from_value)
        .map_err(|e| McpError::internal_error(format!("resource template: {e}"), None))
}

/// Maps a resource failure onto an MCP error.
pub fn error_data(err: NestwalkError, uri: &str) -> McpError {
    match err {
        NestwalkError::Listing(ref e) if e.is_not_found() => {
            McpError::resource_not_found(err.to_string(), Some(json!({ "uri": uri })))
        }
        NestwalkError::InvalidInput(msg) => McpError::invalid_params(msg, None),
        other => McpError::internal_error(other.to_string(), None),
    }
}
