use super::{IssueStore, RecordDraft, TrackedRecord};
use crate::error::{PmoError, Result};
use crate::graphql::{GraphqlRequest, GraphqlTransport};
use crate::outcome::IssueRef;
use serde::Deserialize;
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

const SEARCH_QUERY: &str = r#"
query SearchIssues($teamId: String!, $filter: IssueFilter, $first: Int) {
  team(id: $teamId) {
    issues(filter: $filter, first: $first) {
      nodes { id identifier title description url state { id name } labels { nodes { name } } project { name } }
    }
  }
}"#;

const ISSUE_QUERY: &str = r#"
query IssueByKey($id: String!) {
  issue(id: $id) {
    id identifier title description url state { id name } labels { nodes { name } } project { name }
  }
}"#;

const DESCRIPTION_QUERY: &str = r#"
query IssueDescription($id: String!) {
  issue(id: $id) { description }
}"#;

const CREATE_MUTATION: &str = r#"
mutation CreateIssue($input: IssueCreateInput!) {
  issueCreate(input: $input) {
    success
    issue { id identifier url }
  }
}"#;

const UPDATE_MUTATION: &str = r#"
mutation UpdateIssue($id: String!, $input: IssueUpdateInput!) {
  issueUpdate(id: $id, input: $input) {
    success
    issue { id identifier url }
  }
}"#;

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Node {
    id: String,
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    state: Option<Named>,
    #[serde(default)]
    labels: Option<Connection<Named>>,
    #[serde(default)]
    project: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MutationPayload {
    success: bool,
    issue: Option<IssueRef>,
}

impl From<Node> for TrackedRecord {
    fn from(node: Node) -> Self {
        TrackedRecord {
            id: node.id,
            identifier: node.identifier,
            title: node.title,
            description: node.description.unwrap_or_default(),
            state: node.state.map(|s| s.name),
            labels: node
                .labels
                .map(|c| c.nodes.into_iter().map(|l| l.name).collect())
                .unwrap_or_default(),
            project: node.project.map(|p| p.name),
            url: node.url,
        }
    }
}

// ---------------------------------------------------------------------------
// GraphqlStore
// ---------------------------------------------------------------------------

/// Record store backed by the tracker's GraphQL API.
pub struct GraphqlStore<T: GraphqlTransport> {
    transport: T,
}

impl<T: GraphqlTransport> GraphqlStore<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn mutation(&self, query: &str, variables: Value, field: &str) -> Result<IssueRef> {
        let data = self
            .transport
            .execute(&GraphqlRequest::new(query, variables))?;
        let payload: MutationPayload = serde_json::from_value(data[field].clone())
            .map_err(|e| PmoError::UnexpectedResponse(format!("{field}: {e}")))?;
        match (payload.success, payload.issue) {
            (true, Some(issue)) => Ok(issue),
            (true, None) => Err(PmoError::UnexpectedResponse(format!(
                "{field} succeeded without an issue"
            ))),
            (false, _) => Err(PmoError::MutationRejected(format!("{field} returned success: false"))),
        }
    }
}

impl<T: GraphqlTransport> IssueStore for GraphqlStore<T> {
    fn search_by_description(
        &self,
        team_id: &str,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<TrackedRecord>> {
        let data = self.transport.execute(&GraphqlRequest::new(
            SEARCH_QUERY,
            json!({
                "teamId": team_id,
                "filter": { "description": { "contains": needle } },
                "first": limit,
            }),
        ))?;

        let nodes = &data["team"]["issues"]["nodes"];
        if nodes.is_null() {
            return Ok(Vec::new());
        }
        let nodes: Vec<Node> = serde_json::from_value(nodes.clone())
            .map_err(|e| PmoError::UnexpectedResponse(format!("issue nodes: {e}")))?;
        Ok(nodes.into_iter().map(TrackedRecord::from).collect())
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<TrackedRecord>> {
        let result = self.transport.execute(&GraphqlRequest::new(
            ISSUE_QUERY,
            json!({ "id": identifier }),
        ));
        let data = match result {
            Ok(data) => data,
            Err(PmoError::Graphql(msg)) if msg.to_lowercase().contains("not found") => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };
        if data["issue"].is_null() {
            return Ok(None);
        }
        let node: Node = serde_json::from_value(data["issue"].clone())
            .map_err(|e| PmoError::UnexpectedResponse(format!("issue: {e}")))?;
        Ok(Some(node.into()))
    }

    fn create(&self, draft: &RecordDraft) -> Result<IssueRef> {
        let mut input = Map::new();
        input.insert("teamId".into(), json!(draft.team_id));
        input.insert("title".into(), json!(draft.title));
        input.insert("description".into(), json!(draft.description));
        if !draft.label_ids.is_empty() {
            input.insert("labelIds".into(), json!(draft.label_ids));
        }
        if let Some(project) = &draft.project_id {
            input.insert("projectId".into(), json!(project));
        }
        if let Some(state) = &draft.state_id {
            input.insert("stateId".into(), json!(state));
        }
        self.mutation(CREATE_MUTATION, json!({ "input": input }), "issueCreate")
    }

    fn update_state(&self, id: &str, state_id: &str) -> Result<IssueRef> {
        self.mutation(
            UPDATE_MUTATION,
            json!({ "id": id, "input": { "stateId": state_id } }),
            "issueUpdate",
        )
    }

    fn description(&self, id: &str) -> Result<String> {
        let data = self
            .transport
            .execute(&GraphqlRequest::new(DESCRIPTION_QUERY, json!({ "id": id })))?;
        Ok(data["issue"]["description"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn set_description(&self, id: &str, description: &str) -> Result<IssueRef> {
        self.mutation(
            UPDATE_MUTATION,
            json!({ "id": id, "input": { "description": description } }),
            "issueUpdate",
        )
    }
}
