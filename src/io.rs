//! Model (de)serialization.
//!
//! Two JSON shapes are supported:
//!
//! - **Native**: `{config, base_score, trees}`, used by
//!   [`save_model`] / [`load_model`] for exact round-tripping.
//! - **Compatibility**: the XGBoost `learner` envelope, for exchanging
//!   tree ensembles with external tooling.
//!
//! Trees serialize as `{nodes: [...]}` with nodes relabeled breadth
//! first, so `nodeid` equals the node's position in the emitted array.
//! On load any internally consistent labeling is accepted; the first
//! node in the array is the root. Depths are recomputed, and the `gain`
//! diagnostic is not part of either on-disk shape.

use std::collections::{HashMap, VecDeque};
use std::fs;

use serde::{Deserialize, Serialize};

use crate::config::{GBDTConfig, Task};
use crate::error::{BoostError, Result};
use crate::gbdt::GBDT;
use crate::tree::{Tree, TreeNode};

// ============================================================================
// JSON shapes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    config: GBDTConfig,
    #[serde(default)]
    base_score: f32,
    trees: Vec<TreeJson>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeJson {
    nodes: Vec<NodeJson>,
}

/// One serialized tree node. Leaves carry a weight; internal nodes carry
/// the split and child ids, with missing values following `no`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum NodeJson {
    Leaf {
        nodeid: u32,
        leaf: f32,
    },
    Split {
        nodeid: u32,
        split: u32,
        split_condition: f32,
        yes: u32,
        no: u32,
        missing: u32,
    },
}

impl NodeJson {
    fn nodeid(&self) -> u32 {
        match *self {
            NodeJson::Leaf { nodeid, .. } | NodeJson::Split { nodeid, .. } => nodeid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct XgbModelFile {
    learner: XgbLearner,
}

#[derive(Debug, Serialize, Deserialize)]
struct XgbLearner {
    attributes: XgbAttributes,
    gradient_booster: XgbBooster,
    learner_model_param: XgbLearnerParam,
    name: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct XgbAttributes {
    best_iteration: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct XgbBooster {
    model: XgbBoosterModel,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct XgbBoosterModel {
    gbtree_model_param: XgbTreeParam,
    trees: Vec<TreeJson>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XgbTreeParam {
    num_trees: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct XgbLearnerParam {
    objective: String,
    eta: f32,
    max_depth: u32,
    min_child_weight: f32,
    lambda: f32,
    subsample: f32,
    colsample_bytree: f32,
    #[serde(default)]
    base_score: f32,
}

// ============================================================================
// Tree <-> JSON
// ============================================================================

fn tree_to_json(tree: &Tree) -> TreeJson {
    let nodes = tree.nodes();

    // Breadth-first relabeling: emission order == nodeid.
    let mut bfs_order = Vec::with_capacity(nodes.len());
    let mut bfs_id = vec![0u32; nodes.len()];
    let mut queue = VecDeque::from([0u32]);
    while let Some(idx) = queue.pop_front() {
        bfs_id[idx as usize] = bfs_order.len() as u32;
        bfs_order.push(idx);
        if let TreeNode::Split {
            left_child,
            right_child,
            ..
        } = nodes[idx as usize]
        {
            queue.push_back(left_child);
            queue.push_back(right_child);
        }
    }

    let out = bfs_order
        .iter()
        .map(|&idx| match nodes[idx as usize] {
            TreeNode::Leaf { weight, .. } => NodeJson::Leaf {
                nodeid: bfs_id[idx as usize],
                leaf: weight,
            },
            TreeNode::Split {
                feature_id,
                threshold,
                left_child,
                right_child,
                ..
            } => NodeJson::Split {
                nodeid: bfs_id[idx as usize],
                split: feature_id,
                split_condition: threshold,
                yes: bfs_id[left_child as usize],
                no: bfs_id[right_child as usize],
                missing: bfs_id[right_child as usize],
            },
        })
        .collect();

    TreeJson { nodes: out }
}

fn tree_from_json(tree_json: &TreeJson) -> Result<Tree> {
    if tree_json.nodes.is_empty() {
        return Err(BoostError::ModelFormat("tree has no nodes".to_string()));
    }

    // Node ids are arbitrary; slots follow appearance order and the
    // first node is the root.
    let mut slot_of: HashMap<u32, u32> = HashMap::with_capacity(tree_json.nodes.len());
    for (slot, node) in tree_json.nodes.iter().enumerate() {
        if slot_of.insert(node.nodeid(), slot as u32).is_some() {
            return Err(BoostError::ModelFormat(format!(
                "duplicate nodeid {}",
                node.nodeid()
            )));
        }
    }

    let mut nodes = Vec::with_capacity(tree_json.nodes.len());
    for node in &tree_json.nodes {
        match *node {
            NodeJson::Leaf { leaf, .. } => nodes.push(TreeNode::Leaf {
                depth: 0,
                weight: leaf,
            }),
            NodeJson::Split {
                split,
                split_condition,
                yes,
                no,
                ..
            } => {
                let resolve = |id: u32| {
                    slot_of.get(&id).copied().ok_or_else(|| {
                        BoostError::ModelFormat(format!("child nodeid {id} does not exist"))
                    })
                };
                nodes.push(TreeNode::Split {
                    depth: 0,
                    feature_id: split,
                    threshold: split_condition,
                    left_child: resolve(yes)?,
                    right_child: resolve(no)?,
                    gain: 0.0,
                });
            }
        }
    }

    assign_depths(&mut nodes)?;
    Ok(Tree::from_nodes(nodes))
}

/// Recompute node depths from the root, rejecting node graphs that are
/// not trees.
fn assign_depths(nodes: &mut [TreeNode]) -> Result<()> {
    let mut visited = vec![false; nodes.len()];
    let mut queue = VecDeque::from([(0u32, 0u32)]);

    while let Some((idx, depth)) = queue.pop_front() {
        let slot = idx as usize;
        if visited[slot] {
            return Err(BoostError::ModelFormat(
                "node graph contains a cycle or shared child".to_string(),
            ));
        }
        visited[slot] = true;

        match &mut nodes[slot] {
            TreeNode::Leaf { depth: d, .. } => *d = depth,
            TreeNode::Split {
                depth: d,
                left_child,
                right_child,
                ..
            } => {
                *d = depth;
                let (left, right) = (*left_child, *right_child);
                queue.push_back((left, depth + 1));
                queue.push_back((right, depth + 1));
            }
        }
    }

    Ok(())
}

// ============================================================================
// Native shape
// ============================================================================

pub fn save_model(model: &GBDT, path: &str) -> Result<()> {
    let file = ModelFile {
        config: model.config().clone(),
        base_score: model.base_score(),
        trees: model.trees().iter().map(tree_to_json).collect(),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

pub fn load_model(path: &str) -> Result<GBDT> {
    let contents = fs::read_to_string(path)?;
    let file: ModelFile = serde_json::from_str(&contents)
        .map_err(|e| BoostError::ModelFormat(e.to_string()))?;

    let trees = file
        .trees
        .iter()
        .map(tree_from_json)
        .collect::<Result<Vec<_>>>()?;
    Ok(GBDT::from_parts(file.config, file.base_score, trees))
}

// ============================================================================
// Compatibility shape
// ============================================================================

fn to_xgb_file(model: &GBDT) -> XgbModelFile {
    let config = model.config();
    XgbModelFile {
        learner: XgbLearner {
            attributes: XgbAttributes {
                best_iteration: config.n_rounds.to_string(),
            },
            gradient_booster: XgbBooster {
                model: XgbBoosterModel {
                    gbtree_model_param: XgbTreeParam {
                        num_trees: config.n_rounds,
                    },
                    trees: model.trees().iter().map(tree_to_json).collect(),
                },
                name: "gbtree".to_string(),
            },
            learner_model_param: XgbLearnerParam {
                objective: match config.task {
                    Task::Binary => "binary:logistic",
                    Task::Regression => "reg:squarederror",
                }
                .to_string(),
                eta: config.learning_rate,
                max_depth: config.max_depth,
                min_child_weight: config.min_child_weight,
                lambda: config.reg_lambda,
                subsample: config.subsample,
                colsample_bytree: config.colsample,
                base_score: model.base_score(),
            },
            name: "generic".to_string(),
            version: "1.0.0".to_string(),
        },
    }
}

fn from_xgb_file(file: &XgbModelFile) -> Result<GBDT> {
    let params = &file.learner.learner_model_param;

    let task = if params.objective == "binary:logistic" {
        Task::Binary
    } else {
        Task::Regression
    };

    let n_rounds: u32 = file
        .learner
        .attributes
        .best_iteration
        .parse()
        .map_err(|_| {
            BoostError::ModelFormat(format!(
                "best_iteration {:?} is not a number",
                file.learner.attributes.best_iteration
            ))
        })?;

    let config = GBDTConfig {
        task,
        n_rounds,
        learning_rate: params.eta,
        max_depth: params.max_depth,
        min_child_weight: params.min_child_weight,
        reg_lambda: params.lambda,
        subsample: params.subsample,
        colsample: params.colsample_bytree,
        metric: task.default_metric().to_string(),
        ..GBDTConfig::default()
    };

    let trees = file
        .learner
        .gradient_booster
        .model
        .trees
        .iter()
        .map(tree_from_json)
        .collect::<Result<Vec<_>>>()?;

    Ok(GBDT::from_parts(config, params.base_score, trees))
}

pub fn to_xgboost_json(model: &GBDT) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(to_xgb_file(model))?)
}

pub fn from_xgboost_json(json: &serde_json::Value) -> Result<GBDT> {
    let file: XgbModelFile = serde_json::from_value(json.clone())
        .map_err(|e| BoostError::ModelFormat(e.to_string()))?;
    from_xgb_file(&file)
}

pub fn save_xgboost_model(model: &GBDT, path: &str) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(&to_xgb_file(model))?)?;
    Ok(())
}

pub fn load_xgboost_model(path: &str) -> Result<GBDT> {
    let contents = fs::read_to_string(path)?;
    let file: XgbModelFile = serde_json::from_str(&contents)
        .map_err(|e| BoostError::ModelFormat(e.to_string()))?;
    from_xgb_file(&file)
}

// ============================================================================
// Tests
// ============================================================================
