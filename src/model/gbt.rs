use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Gradient boosting hyperparameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_examples_leaf: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_examples_leaf: 20,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Node {
    Branch(BranchNode),
    Leaf(LeafNode),
}

/// Examples with `feature <= split_value` go left.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub feature_index: usize,
    pub split_value: f64,
    pub left_child_index: usize,
    pub right_child_index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeafNode {
    /// Already scaled by the learning rate.
    pub value: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.predict_by(|feature_index| features[feature_index])
    }

    fn predict_by(&self, feature: impl Fn(usize) -> f64) -> f64 {
        let mut node_index = 0;
        loop {
            match &self.nodes[node_index] {
                Node::Branch(branch) => {
                    node_index = if feature(branch.feature_index) <= branch.split_value {
                        branch.left_child_index
                    } else {
                        branch.right_child_index
                    };
                }
                Node::Leaf(leaf) => return leaf.value,
            }
        }
    }
}

struct Split {
    feature_index: usize,
    split_value: f64,
}

/// Grows one depth-limited least-squares tree on the current residuals.
struct TreeBuilder<'a> {
    features: &'a DMatrix<f64>,
    residuals: &'a [f64],
    options: &'a TrainOptions,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, examples: Vec<usize>) -> Tree {
        self.grow(examples, 0);
        Tree { nodes: self.nodes }
    }

    fn grow(&mut self, examples: Vec<usize>, depth: usize) -> usize {
        let node_index = self.nodes.len();
        self.nodes.push(Node::Leaf(LeafNode { value: 0.0 }));

        let split = if depth < self.options.max_depth
            && examples.len() >= 2 * self.options.min_examples_leaf.max(1)
        {
            self.choose_best_split(&examples)
        } else {
            None
        };

        match split {
            None => {
                let sum: f64 = examples.iter().map(|&i| self.residuals[i]).sum();
                let mean = if examples.is_empty() {
                    0.0
                } else {
                    sum / examples.len() as f64
                };
                self.nodes[node_index] = Node::Leaf(LeafNode {
                    value: mean * self.options.learning_rate,
                });
            }
            Some(split) => {
                let column = self.features.column(split.feature_index);
                let (left, right): (Vec<usize>, Vec<usize>) = examples
                    .iter()
                    .partition(|&&i| column[i] <= split.split_value);
                let left_child_index = self.grow(left, depth + 1);
                let right_child_index = self.grow(right, depth + 1);
                self.nodes[node_index] = Node::Branch(BranchNode {
                    feature_index: split.feature_index,
                    split_value: split.split_value,
                    left_child_index,
                    right_child_index,
                });
            }
        }
        node_index
    }

    /// Exact greedy search over every feature, maximizing the reduction in squared error.
    fn choose_best_split(&self, examples: &[usize]) -> Option<Split> {
        let n = examples.len();
        let min_leaf = self.options.min_examples_leaf.max(1);
        let total: f64 = examples.iter().map(|&i| self.residuals[i]).sum();
        let parent_score = total * total / n as f64;

        let mut best: Option<Split> = None;
        let mut best_gain = 1e-9;
        let mut sorted = examples.to_vec();
        for feature_index in 0..self.features.ncols() {
            let column = self.features.column(feature_index);
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += self.residuals[sorted[k]];
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_right < min_leaf {
                    break;
                }
                if n_left < min_leaf {
                    continue;
                }
                let (low, high) = (column[sorted[k]], column[sorted[k + 1]]);
                if low == high {
                    continue;
                }
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64
                    - parent_score;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some(Split {
                        feature_index,
                        split_value: low + (high - low) / 2.0,
                    });
                }
            }
        }
        best
    }
}

/// Gradient-boosted regression trees on squared loss.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Regressor {
    /// Mean of the training labels.
    pub bias: f64,
    pub trees: Vec<Tree>,
    /// Half mean squared error after each round.
    pub losses: Vec<f64>,
}

impl Regressor {
    pub fn train(features: &DMatrix<f64>, labels: &[f64], options: &TrainOptions) -> Regressor {
        debug_assert_eq!(
            features.nrows(),
            labels.len(),
            "features and labels disagree on the number of examples"
        );
        if labels.is_empty() {
            return Regressor {
                bias: 0.0,
                trees: Vec::new(),
                losses: Vec::new(),
            };
        }

        let n = labels.len();
        let bias = labels.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![bias; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(options.n_estimators);
        let mut losses = Vec::with_capacity(options.n_estimators);

        for round in 0..options.n_estimators {
            for ((residual, label), prediction) in
                residuals.iter_mut().zip(labels).zip(&predictions)
            {
                *residual = label - prediction;
            }
            let tree = TreeBuilder {
                features,
                residuals: &residuals,
                options,
                nodes: Vec::new(),
            }
            .build((0..n).collect());

            for (i, prediction) in predictions.iter_mut().enumerate() {
                *prediction += tree.predict_by(|j| features[(i, j)]);
            }
            let loss = labels
                .iter()
                .zip(&predictions)
                .map(|(label, prediction)| 0.5 * (label - prediction).powi(2))
                .sum::<f64>()
                / n as f64;
            debug!("round {}: {} nodes, loss {:.4}", round, tree.nodes.len(), loss);
            losses.push(loss);
            trees.push(tree);
        }

        Regressor {
            bias,
            trees,
            losses,
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.bias + self.trees.iter().map(|tree| tree.predict(features)).sum::<f64>()
    }

    /// One prediction per matrix row.
    pub fn predict_matrix(&self, features: &DMatrix<f64>) -> Vec<f64> {
        (0..features.nrows())
            .map(|i| {
                self.bias
                    + self
                        .trees
                        .iter()
                        .map(|tree| tree.predict_by(|j| features[(i, j)]))
                        .sum::<f64>()
            })
            .collect()
    }
}
