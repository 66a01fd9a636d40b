//! Tree and Node Endpoints
//!
//! # Endpoints
//!
//! - `GET /api/trees?offset=&limit=` - Tree summaries, newest first
//! - `POST /api/trees` - Start a tree (authenticated)
//! - `GET /api/trees/:tree_id` - All nodes of one tree, oldest first
//! - `POST /api/nodes` - Reply to a node (authenticated)
//! - `GET /api/nodes/:id` - Get a node by ID

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::access_gate::AuthUser;
use crate::{AppState, HttpError};
use numtree_core::{AuthoredNode, Node, TreeSummary};

/// Paging for the tree list; without either parameter every tree is returned
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    offset: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTreeInput {
    pub value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyInput {
    pub parent_id: String,
    pub op: String,
    pub right: f64,
}

/// List tree summaries
///
/// # Example
///
/// ```bash
/// curl "http://localhost:3001/api/trees?offset=0&limit=20"
/// ```
async fn list_trees(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<TreeSummary>>, HttpError> {
    let summaries = match (page.offset, page.limit) {
        (None, None) => state.summaries.summarize().await?,
        (offset, limit) => {
            state
                .summaries
                .summarize_page(
                    offset.unwrap_or(0),
                    limit.unwrap_or(state.summaries.max_page_size()),
                )
                .await?
        }
    };

    Ok(Json(summaries))
}

/// Start a new tree with a root number
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:3001/api/trees \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"value": 42}'
/// ```
async fn create_tree(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTreeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let Json(input) = payload?;
    let root = state.nodes.create_root(&user.id, input.value).await?;

    tracing::debug!("✅ Created tree: {}", root.id);
    Ok((StatusCode::CREATED, Json(root)))
}

/// All nodes of a tree in creation order, each with `authorUsername`
async fn get_tree(
    State(state): State<AppState>,
    Path(tree_id): Path<String>,
) -> Result<Json<Vec<AuthoredNode>>, HttpError> {
    let nodes = state.trees.authored_nodes(&tree_id).await?;
    Ok(Json(nodes))
}

/// Reply to any node of a tree
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:3001/api/nodes \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"parentId": "<node-id>", "op": "*", "right": 3}'
/// ```
async fn create_reply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateReplyInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let Json(input) = payload?;
    let reply = state
        .nodes
        .create_reply(&user.id, &input.parent_id, &input.op, input.right)
        .await?;

    tracing::debug!("✅ Created reply: {}", reply.id);
    Ok((StatusCode::CREATED, Json(reply)))
}

async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Node>, HttpError> {
    Ok(Json(state.nodes.get_by_id(&id).await?))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/trees", get(list_trees).post(create_tree))
        .route("/api/trees/:tree_id", get(get_tree))
        .route("/api/nodes", post(create_reply))
        .route("/api/nodes/:id", get(get_node))
        .with_state(state)
}
