//! LightGBM text model parsing and tree traversal.
//!
//! The format is line oriented: a header of `key=value` pairs, then one
//! block per tree with space-separated arrays, an `end of trees` sentinel
//! and trailing sections (feature importances, parameters) this reader
//! does not need. Leaf values in the file already carry shrinkage, so
//! prediction is a plain sum over trees plus the objective transform.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::{GbdtError, Result};

const CATEGORICAL_MASK: u8 = 1;
const DEFAULT_LEFT_MASK: u8 = 2;

/// A loaded ensemble, immutable after parsing and safe to share across
/// threads.
#[derive(Debug, Clone)]
pub struct Booster {
    trees: Vec<Tree>,
    num_features: usize,
    objective: Objective,
    average_output: bool,
}

#[derive(Debug, Clone, Copy)]
enum Objective {
    /// Logistic link, `p = 1 / (1 + exp(-sigmoid * raw))`.
    Binary { sigmoid: f64 },
    /// Identity link for regression-style objectives.
    Raw,
}

impl Objective {
    fn transform(self, raw: f64) -> f64 {
        match self {
            Objective::Binary { sigmoid } => 1.0 / (1.0 + (-sigmoid * raw).exp()),
            Objective::Raw => raw,
        }
    }
}

#[derive(Debug, Clone)]
struct Tree {
    split_feature: Vec<usize>,
    threshold: Vec<f64>,
    decision_type: Vec<u8>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_value: Vec<f64>,
}

impl Booster {
    /// Reads a model from disk. See [`Booster::from_text`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let booster = Self::from_text(&text)?;
        info!(
            trees = booster.num_trees(),
            features = booster.num_features(),
            path = %path.display(),
            "loaded gradient boosted model"
        );
        Ok(booster)
    }

    /// Parses the text serialization produced by LightGBM's `save_model`.
    ///
    /// Only single-class models with numerical splits are accepted; the
    /// trailing importance and parameter sections are skipped.
    pub fn from_text(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let mut pos = 0usize;

        let mut header: HashMap<&str, &str> = HashMap::new();
        let mut average_output = false;
        while pos < lines.len() {
            let line = lines[pos].trim();
            if line.starts_with("Tree=") {
                break;
            }
            pos += 1;
            if line.is_empty() || line == "tree" {
                continue;
            }
            if line == "average_output" {
                average_output = true;
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                header.insert(key, value);
            }
        }

        let num_class = header_usize(&header, "num_class")?.unwrap_or(1);
        if num_class != 1 {
            return Err(GbdtError::Unsupported(format!(
                "num_class={num_class}; only single-output models are supported"
            )));
        }
        let max_feature_idx =
            header_usize(&header, "max_feature_idx")?.ok_or_else(|| GbdtError::MissingField {
                field: "max_feature_idx".to_string(),
            })?;
        let num_features = max_feature_idx + 1;
        let objective = parse_objective(header.get("objective").copied());

        let mut trees = Vec::new();
        while pos < lines.len() {
            let line = lines[pos].trim();
            if line == "end of trees" {
                break;
            }
            if line.is_empty() {
                pos += 1;
                continue;
            }
            let Some(_) = line.strip_prefix("Tree=") else {
                return Err(GbdtError::Malformed(format!(
                    "unexpected line '{line}' between trees"
                )));
            };
            pos += 1;
            let mut fields: HashMap<&str, &str> = HashMap::new();
            while pos < lines.len() {
                let tree_line = lines[pos].trim();
                if tree_line.is_empty() || tree_line.starts_with("Tree=") || tree_line == "end of trees"
                {
                    break;
                }
                if let Some((key, value)) = tree_line.split_once('=') {
                    fields.insert(key, value);
                }
                pos += 1;
            }
            trees.push(Tree::from_fields(&fields, num_features)?);
        }
        if trees.is_empty() {
            return Err(GbdtError::Malformed("model contains no trees".to_string()));
        }

        Ok(Booster {
            trees,
            num_features,
            objective,
            average_output,
        })
    }

    /// Width of the feature vector the model was trained on.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Scores one feature vector. For binary-objective models the result
    /// is a probability in `[0, 1]`; otherwise the raw ensemble sum.
    pub fn predict(&self, features: &[f32]) -> Result<f64> {
        if features.len() != self.num_features {
            return Err(GbdtError::FeatureWidth {
                expected: self.num_features,
                actual: features.len(),
            });
        }
        let mut raw: f64 = self.trees.iter().map(|tree| tree.evaluate(features)).sum();
        if self.average_output {
            raw /= self.trees.len() as f64;
        }
        Ok(self.objective.transform(raw))
    }
}

impl Tree {
    fn from_fields(fields: &HashMap<&str, &str>, num_features: usize) -> Result<Self> {
        let num_leaves = field_usize(fields, "num_leaves")?;
        let num_cat = match fields.get("num_cat") {
            Some(_) => field_usize(fields, "num_cat")?,
            None => 0,
        };
        if num_cat > 0 {
            return Err(GbdtError::Unsupported(
                "categorical splits are not supported".to_string(),
            ));
        }
        if num_leaves == 0 {
            return Err(GbdtError::Malformed("tree with zero leaves".to_string()));
        }

        let split_feature: Vec<usize> = array_field(fields, "split_feature")?;
        let threshold: Vec<f64> = array_field(fields, "threshold")?;
        let decision_raw: Vec<i32> = array_field(fields, "decision_type")?;
        let left_child: Vec<i32> = array_field(fields, "left_child")?;
        let right_child: Vec<i32> = array_field(fields, "right_child")?;
        let leaf_value: Vec<f64> = match fields.get("leaf_value") {
            Some(_) => array_field(fields, "leaf_value")?,
            None => {
                return Err(GbdtError::MissingField {
                    field: "leaf_value".to_string(),
                })
            }
        };

        let internal = num_leaves - 1;
        if leaf_value.len() != num_leaves {
            return Err(GbdtError::Malformed(format!(
                "expected {num_leaves} leaf values, found {}",
                leaf_value.len()
            )));
        }
        for (name, len) in [
            ("split_feature", split_feature.len()),
            ("threshold", threshold.len()),
            ("decision_type", decision_raw.len()),
            ("left_child", left_child.len()),
            ("right_child", right_child.len()),
        ] {
            if len != internal {
                return Err(GbdtError::Malformed(format!(
                    "expected {internal} entries in {name}, found {len}"
                )));
            }
        }
        if let Some(&bad) = split_feature.iter().find(|&&f| f >= num_features) {
            return Err(GbdtError::Malformed(format!(
                "split on feature {bad} but the model has only {num_features} features"
            )));
        }
        let decision_type: Vec<u8> = decision_raw.iter().map(|&v| v as u8).collect();
        if decision_type.iter().any(|&d| d & CATEGORICAL_MASK != 0) {
            return Err(GbdtError::Unsupported(
                "categorical splits are not supported".to_string(),
            ));
        }
        for &child in left_child.iter().chain(right_child.iter()) {
            let valid = if child >= 0 {
                (child as usize) < internal
            } else {
                ((-child - 1) as usize) < num_leaves
            };
            if !valid {
                return Err(GbdtError::Malformed(format!(
                    "child index {child} is out of range"
                )));
            }
        }
        // Child links must form a tree; a node reachable twice would trap
        // the root-to-leaf walk in a cycle.
        if internal > 0 {
            let mut visited = vec![false; internal];
            let mut stack = vec![0usize];
            while let Some(idx) = stack.pop() {
                if visited[idx] {
                    return Err(GbdtError::Malformed(format!(
                        "child links loop through internal node {idx}"
                    )));
                }
                visited[idx] = true;
                for child in [left_child[idx], right_child[idx]] {
                    if child >= 0 {
                        stack.push(child as usize);
                    }
                }
            }
        }

        Ok(Tree {
            split_feature,
            threshold,
            decision_type,
            left_child,
            right_child,
            leaf_value,
        })
    }

    /// Walks from the root to a leaf. Negative child indices address
    /// leaves as `-(index) - 1`; NaN features follow the default-left bit.
    fn evaluate(&self, features: &[f32]) -> f64 {
        if self.split_feature.is_empty() {
            return self.leaf_value[0];
        }
        let mut node = 0i32;
        loop {
            let idx = node as usize;
            let value = features[self.split_feature[idx]] as f64;
            let go_left = if value.is_nan() {
                self.decision_type[idx] & DEFAULT_LEFT_MASK != 0
            } else {
                value <= self.threshold[idx]
            };
            node = if go_left {
                self.left_child[idx]
            } else {
                self.right_child[idx]
            };
            if node < 0 {
                return self.leaf_value[(-node - 1) as usize];
            }
        }
    }
}

fn header_usize(header: &HashMap<&str, &str>, field: &str) -> Result<Option<usize>> {
    match header.get(field) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| GbdtError::InvalidValue {
                field: field.to_string(),
                value: raw.to_string(),
            }),
    }
}

fn field_usize(fields: &HashMap<&str, &str>, field: &str) -> Result<usize> {
    match fields.get(field) {
        None => Err(GbdtError::MissingField {
            field: field.to_string(),
        }),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| GbdtError::InvalidValue {
                field: field.to_string(),
                value: raw.to_string(),
            }),
    }
}

fn array_field<T: std::str::FromStr>(
    fields: &HashMap<&str, &str>,
    field: &'static str,
) -> Result<Vec<T>> {
    match fields.get(field) {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split_whitespace()
            .map(|token| {
                token.parse::<T>().map_err(|_| GbdtError::InvalidValue {
                    field: field.to_string(),
                    value: token.to_string(),
                })
            })
            .collect(),
    }
}

fn parse_objective(raw: Option<&str>) -> Objective {
    let Some(raw) = raw else {
        return Objective::Raw;
    };
    let mut tokens = raw.split_whitespace();
    match tokens.next() {
        Some("binary") => {
            let sigmoid = tokens
                .find_map(|tok| tok.strip_prefix("sigmoid:"))
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(1.0);
            Objective::Binary { sigmoid }
        }
        _ => Objective::Raw,
    }
}
