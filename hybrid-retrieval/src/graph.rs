use std::collections::{HashMap, HashSet};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            graph_edge::{EdgeKind, GraphEdge},
            graph_node::GraphNode,
        },
    },
};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use tracing::{debug, warn};

use crate::{
    config::RetrievalTuning,
    dedup::normalized_title,
    policy::is_excluded,
    retrievers::fetch_documents_by_ids,
    RankedResult,
};

/// Why an expansion-added document appeared: the edge that pulled it in and
/// the seed it hangs off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionTag {
    pub edge_kind: EdgeKind,
    pub weight: f32,
    pub seed_id: String,
}

/// Bounded 1-hop expansion: per seed, high-confidence explicit links first
/// (`reference`/`implements`), then classification/tag-similarity links
/// (`related`), until the overall cap. Never recurses into added documents,
/// and never fails the query: any graph trouble returns no additions.
pub async fn expand_results(
    db: &SurrealDbClient,
    results: &[RankedResult],
    tuning: &RetrievalTuning,
    exclude_labels: &HashSet<String>,
) -> Vec<RankedResult> {
    if results.is_empty() || results.len() >= tuning.expansion_total_cap {
        return Vec::new();
    }

    match expand_inner(db, results, tuning, exclude_labels).await {
        Ok(additions) => additions,
        Err(err) => {
            warn!(error = %err, "Graph expansion failed, returning seed results unchanged");
            Vec::new()
        }
    }
}

async fn expand_inner(
    db: &SurrealDbClient,
    results: &[RankedResult],
    tuning: &RetrievalTuning,
    exclude_labels: &HashSet<String>,
) -> Result<Vec<RankedResult>, AppError> {
    let mut seen_ids: HashSet<String> = results.iter().map(|r| r.id.clone()).collect();
    let mut seen_titles: HashSet<String> =
        results.iter().map(|r| normalized_title(&r.title)).collect();
    let mut total = results.len();
    let mut additions: Vec<RankedResult> = Vec::new();

    let edge_tiers: [(&[EdgeKind], f32); 2] = [
        (
            &[EdgeKind::Reference, EdgeKind::Implements],
            tuning.reference_min_weight,
        ),
        (&[EdgeKind::Related], tuning.related_min_weight),
    ];

    'seeds: for seed in results.iter().take(tuning.expansion_seed_limit) {
        let from_id = GraphNode::document_key(&seed.id);

        for (kinds, min_weight) in edge_tiers {
            if total >= tuning.expansion_total_cap {
                break 'seeds;
            }

            let edges = outgoing_edges(db, &from_id, kinds, min_weight).await?;
            if edges.is_empty() {
                continue;
            }

            let node_ids: Vec<String> = edges.iter().map(|edge| edge.to_id.clone()).collect();
            let nodes = fetch_nodes_batched(db, &node_ids, tuning.node_batch_limit).await?;

            // Resolve edges to documents before hydrating, keeping weight order.
            let mut targets: Vec<(&GraphEdge, String)> = Vec::new();
            for edge in &edges {
                let Some(document_id) = nodes
                    .get(&edge.to_id)
                    .and_then(|node| node.document_id.clone())
                else {
                    continue;
                };
                if seen_ids.contains(&document_id) {
                    continue;
                }
                targets.push((edge, document_id));
            }

            let target_ids: Vec<String> = targets.iter().map(|(_, id)| id.clone()).collect();
            let documents = fetch_documents_by_ids(db, &target_ids).await?;

            for (edge, document_id) in targets {
                if total >= tuning.expansion_total_cap {
                    break 'seeds;
                }
                let Some(doc) = documents.get(&document_id) else {
                    continue;
                };
                if is_excluded(&doc.labels, exclude_labels) {
                    continue;
                }
                if !seen_titles.insert(normalized_title(&doc.title)) {
                    continue;
                }
                seen_ids.insert(document_id);

                additions.push(RankedResult {
                    id: doc.id.clone(),
                    title: doc.title.clone(),
                    excerpt: doc.excerpt(tuning.excerpt_max_chars),
                    labels: doc.labels.clone(),
                    // Inherited, attenuated by the edge confidence.
                    score: crate::scoring::clamp_unit(seed.score * edge.weight),
                    origin: seed.origin,
                    score_note: None,
                    expansion: Some(ExpansionTag {
                        edge_kind: edge.kind,
                        weight: edge.weight,
                        seed_id: seed.id.clone(),
                    }),
                });
                total += 1;
            }
        }
    }

    debug!(additions = additions.len(), "Graph expansion added documents");
    Ok(additions)
}

async fn outgoing_edges(
    db: &SurrealDbClient,
    from_id: &str,
    kinds: &[EdgeKind],
    min_weight: f32,
) -> Result<Vec<GraphEdge>, AppError> {
    let edges: Vec<GraphEdge> = db
        .query(
            "SELECT * FROM graph_edge \
             WHERE from_id = $from_id AND kind IN $kinds AND weight >= $min_weight \
             ORDER BY weight DESC",
        )
        .bind(("from_id", from_id.to_owned()))
        .bind(("kinds", kinds.to_vec()))
        .bind(("min_weight", min_weight))
        .await?
        .take(0)?;

    Ok(edges)
}

/// Node lookup in id batches; the store caps how many ids one call may carry.
async fn fetch_nodes_batched(
    db: &SurrealDbClient,
    node_ids: &[String],
    batch_limit: usize,
) -> Result<HashMap<String, GraphNode>, AppError> {
    let mut nodes: HashMap<String, GraphNode> = HashMap::new();

    for batch in node_ids.chunks(batch_limit.max(1)) {
        let things: Vec<Thing> = batch
            .iter()
            .map(|id| Thing::from(("graph_node", id.as_str())))
            .collect();

        let fetched: Vec<GraphNode> = db
            .query("SELECT * FROM graph_node WHERE id IN $things")
            .bind(("things", things))
            .await?
            .take(0)?;

        nodes.extend(fetched.into_iter().map(|node| (node.id.clone(), node)));
    }

    Ok(nodes)
}
