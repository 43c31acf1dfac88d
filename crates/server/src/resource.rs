//! The `all-nested-groups` resource.
//!
//! `gitlab://all-nested-groups/{groupId}` resolves to every nested subgroup
//! of `groupId`, flattened depth-first, together with a completeness flag
//! and the list of subtrees the walk could not finish.

use nestwalk_core::error::{NestwalkError, NestwalkResult};
use nestwalk_core::{GroupId, GroupRef, ListingError, Truncation};
use nestwalk_traversal::Walker;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const RESOURCE_NAME: &str = "all-nested-groups";
pub const URI_PREFIX: &str = "gitlab://all-nested-groups/";
pub const URI_TEMPLATE: &str = "gitlab://all-nested-groups/{groupId}";
pub const MIME_TYPE: &str = "application/json";

/// Plain path form, also accepted as a resource URI.
const PATH_PREFIX: &str = "/all-nested-groups/";

/// Everything outside the URI unreserved set, `/` included.
const GROUP_ID_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const DESCRIPTION: &str = "Recursively fetches all subgroups under a GitLab group.";

/// `resources/templates/list` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub mime_type: String,
}

/// Payload returned for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedGroups {
    /// Echo of the caller's identifier.
    pub group_id: String,
    pub nested_groups: Vec<GroupRef>,
    /// False when any subtree was cut short.
    pub complete: bool,
    pub truncated: Vec<Truncation>,
}

pub struct NestedGroupsResource {
    walker: Walker,
}

impl NestedGroupsResource {
    pub fn new(walker: Walker) -> Self {
        Self { walker }
    }

    pub fn template() -> ResourceTemplate {
        ResourceTemplate {
            uri_template: URI_TEMPLATE.to_string(),
            name: RESOURCE_NAME.to_string(),
            title: "All nested GitLab groups".to_string(),
            description: DESCRIPTION.to_string(),
            mime_type: MIME_TYPE.to_string(),
        }
    }

    pub fn uri_for(group_id: &str) -> String {
        format!("{URI_PREFIX}{}", utf8_percent_encode(group_id, GROUP_ID_ENCODE))
    }

    /// Reads the resource addressed by `uri`.
    pub async fn read_uri(&self, uri: &str) -> NestwalkResult<NestedGroups> {
        let group_id = group_id_from_uri(uri)?;
        self.read_group(&group_id).await
    }

    /// Walks `group_id` from depth 0.
    ///
    /// A root that does not exist is an error; every other listing failure
    /// is reported inside the payload.
    pub async fn read_group(&self, group_id: &str) -> NestwalkResult<NestedGroups> {
        let root = GroupId::parse(group_id)?;
        let t0 = Instant::now();
        let traversal = self.walker.walk(&root).await;

        if traversal.root_not_found() {
            tracing::info!(group_id, "root group not found");
            return Err(ListingError::NotFound {
                group: root.to_string(),
            }
            .into());
        }

        let payload = NestedGroups {
            group_id: group_id.to_string(),
            nested_groups: traversal.flatten(),
            complete: traversal.is_complete(),
            truncated: traversal.truncations(),
        };

        tracing::info!(
            group_id,
            groups = payload.nested_groups.len(),
            complete = payload.complete,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "resource read"
        );
        Ok(payload)
    }
}

/// Extracts the percent-decoded `groupId` from a resource URI.
pub fn group_id_from_uri(uri: &str) -> NestwalkResult<String> {
    let raw = uri
        .strip_prefix(URI_PREFIX)
        .or_else(|| uri.strip_prefix(PATH_PREFIX))
        .ok_or_else(|| NestwalkError::InvalidInput(format!("Unknown resource URI: {uri}")))?;

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| NestwalkError::InvalidInput(format!("Group id is not UTF-8: {raw}")))?
        .into_owned();
    if decoded.trim().trim_matches('/').is_empty() {
        return Err(NestwalkError::InvalidInput(format!(
            "Resource URI has no group id: {uri}"
        )));
    }
    Ok(decoded)
}
