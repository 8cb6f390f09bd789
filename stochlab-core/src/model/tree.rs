//! Regression tree grown best-first on binned features.
//!
//! Least-squares loss means every hessian is 1, so a node's hessian sum is
//! its sample count. Leaf values are already shrunk by the learning rate.

use super::binning::{BinIdx, BinMapper};

/// Splits must improve the loss by more than this.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        bin: BinIdx,
        threshold: f64,
        missing_left: bool,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn is_single_leaf(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Predict from raw feature values.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    missing_left,
                    left,
                    right,
                    ..
                } => {
                    let x = row[*feature];
                    let go_left = if x.is_nan() {
                        *missing_left
                    } else {
                        x <= *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }

    /// Predict from binned training data (column-major).
    pub fn predict_binned(&self, binned: &[Vec<BinIdx>], mapper: &BinMapper, sample: usize) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    bin,
                    missing_left,
                    left,
                    right,
                    ..
                } => {
                    let b = binned[*feature][sample];
                    let go_left = if b == mapper.missing_bin(*feature) {
                        *missing_left
                    } else {
                        b <= *bin
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// Tree growth limits.
#[derive(Debug, Clone, Copy)]
pub struct GrowerParams {
    pub learning_rate: f64,
    pub max_leaf_nodes: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
}

#[derive(Debug, Clone)]
struct SplitInfo {
    feature: usize,
    bin: BinIdx,
    missing_left: bool,
    gain: f64,
}

#[derive(Debug)]
struct OpenLeaf {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
    split: Option<SplitInfo>,
}

/// Grow one tree fitting the negative gradients.
pub fn grow(
    binned: &[Vec<BinIdx>],
    mapper: &BinMapper,
    gradients: &[f64],
    params: &GrowerParams,
) -> Tree {
    let all: Vec<usize> = (0..gradients.len()).collect();
    let mut nodes = vec![Node::Leaf {
        value: leaf_value(gradients, &all, params),
    }];
    let mut open = vec![OpenLeaf {
        node: 0,
        split: find_best_split(binned, mapper, gradients, &all, 0, params),
        samples: all,
        depth: 0,
    }];
    let mut n_leaves = 1;

    while n_leaves < params.max_leaf_nodes {
        let best = open
            .iter()
            .enumerate()
            .filter_map(|(i, leaf)| leaf.split.as_ref().map(|s| (i, s.gain)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((pos, _)) = best else {
            break;
        };

        let leaf = open.swap_remove(pos);
        let Some(split) = leaf.split else {
            break;
        };

        let missing = mapper.missing_bin(split.feature);
        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) =
            leaf.samples.iter().partition(|&&s| {
                let b = binned[split.feature][s];
                if b == missing {
                    split.missing_left
                } else {
                    b <= split.bin
                }
            });

        let left = nodes.len();
        let right = left + 1;
        nodes.push(Node::Leaf {
            value: leaf_value(gradients, &left_samples, params),
        });
        nodes.push(Node::Leaf {
            value: leaf_value(gradients, &right_samples, params),
        });
        nodes[leaf.node] = Node::Split {
            feature: split.feature,
            bin: split.bin,
            threshold: mapper.threshold(split.feature, split.bin),
            missing_left: split.missing_left,
            left,
            right,
        };
        n_leaves += 1;

        let depth = leaf.depth + 1;
        for (node, samples) in [(left, left_samples), (right, right_samples)] {
            let split = find_best_split(binned, mapper, gradients, &samples, depth, params);
            open.push(OpenLeaf {
                node,
                samples,
                depth,
                split,
            });
        }
    }

    Tree { nodes }
}

fn leaf_value(gradients: &[f64], samples: &[usize], params: &GrowerParams) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let g: f64 = samples.iter().map(|&s| gradients[s]).sum();
    -params.learning_rate * g / (samples.len() as f64 + params.l2_regularization)
}

fn find_best_split(
    binned: &[Vec<BinIdx>],
    mapper: &BinMapper,
    gradients: &[f64],
    samples: &[usize],
    depth: usize,
    params: &GrowerParams,
) -> Option<SplitInfo> {
    if samples.len() < 2 * params.min_samples_leaf.max(1) {
        return None;
    }
    if params.max_depth.is_some_and(|max| depth >= max) {
        return None;
    }

    let lambda = params.l2_regularization;
    let score = |g: f64, c: f64| g * g / (c + lambda);

    let total_g: f64 = samples.iter().map(|&s| gradients[s]).sum();
    let total_c = samples.len() as f64;
    let parent = score(total_g, total_c);
    let min_leaf = params.min_samples_leaf.max(1);

    let mut best: Option<SplitInfo> = None;

    for feature in 0..mapper.n_features() {
        let n_bins = mapper.n_bins(feature);
        let missing = mapper.missing_bin(feature) as usize;

        // (gradient sum, count) per bin, missing bin last.
        let mut hist = vec![(0.0f64, 0usize); n_bins + 1];
        for &s in samples {
            let b = binned[feature][s] as usize;
            hist[b].0 += gradients[s];
            hist[b].1 += 1;
        }
        let (missing_g, missing_c) = hist[missing];

        let mut left_g = 0.0;
        let mut left_c = 0usize;
        for bin in 0..n_bins {
            left_g += hist[bin].0;
            left_c += hist[bin].1;
            let last = bin + 1 == n_bins;

            // Missing values to the right. On the last bin this isolates them.
            if !last || missing_c > 0 {
                let right_c = samples.len() - left_c;
                if left_c >= min_leaf && right_c >= min_leaf {
                    let right_g = total_g - left_g;
                    let gain = score(left_g, left_c as f64) + score(right_g, right_c as f64) - parent;
                    let missing_left = missing_c == 0 && left_c >= right_c;
                    consider(&mut best, feature, bin, missing_left, gain);
                }
            }

            // Missing values to the left.
            if !last && missing_c > 0 {
                let l_c = left_c + missing_c;
                let right_c = samples.len() - l_c;
                if l_c >= min_leaf && right_c >= min_leaf {
                    let l_g = left_g + missing_g;
                    let right_g = total_g - l_g;
                    let gain = score(l_g, l_c as f64) + score(right_g, right_c as f64) - parent;
                    consider(&mut best, feature, bin, true, gain);
                }
            }
        }
    }

    best
}

fn consider(best: &mut Option<SplitInfo>, feature: usize, bin: usize, missing_left: bool, gain: f64) {
    if gain.is_nan() || gain <= MIN_GAIN {
        return;
    }
    if best.as_ref().map_or(true, |b| gain > b.gain) {
        *best = Some(SplitInfo {
            feature,
            bin: bin as BinIdx,
            missing_left,
            gain,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GrowerParams {
        GrowerParams {
            learning_rate: 1.0,
            max_leaf_nodes: 31,
            max_depth: None,
            min_samples_leaf: 1,
            l2_regularization: 0.0,
        }
    }

    fn setup(x: &[f64]) -> (BinMapper, Vec<Vec<BinIdx>>) {
        let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![v]).collect();
        let mapper = BinMapper::fit(&rows, 1, 255);
        let binned = mapper.transform(&rows);
        (mapper, binned)
    }

    #[test]
    fn zero_gradients_give_single_leaf() {
        let (mapper, binned) = setup(&[1.0, 2.0, 3.0, 4.0]);
        let tree = grow(&binned, &mapper, &[0.0; 4], &params());
        assert!(tree.is_single_leaf());
        assert_eq!(tree.predict_row(&[2.5]), 0.0);
    }

    #[test]
    fn splits_on_step() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let (mapper, binned) = setup(&x);
        // Negative gradient = residual; target step at x > 3.
        let gradients = [1.0, 1.0, 1.0, -1.0, -1.0, -1.0];
        let tree = grow(&binned, &mapper, &gradients, &params());

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_row(&[2.0]), -1.0);
        assert_eq!(tree.predict_row(&[5.0]), 1.0);
        for s in 0..6 {
            assert_eq!(tree.predict_binned(&binned, &mapper, s), tree.predict_row(&[x[s]]));
        }
    }

    #[test]
    fn respects_max_leaf_nodes() {
        let x: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let (mapper, binned) = setup(&x);
        let gradients: Vec<f64> = (0..64).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let mut p = params();
        p.max_leaf_nodes = 4;
        let tree = grow(&binned, &mapper, &gradients, &p);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn respects_min_samples_leaf() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (mapper, binned) = setup(&x);
        let mut gradients = vec![0.0; 10];
        gradients[0] = 5.0;
        let mut p = params();
        p.min_samples_leaf = 5;
        let tree = grow(&binned, &mapper, &gradients, &p);
        // Only the 5/5 split is allowed.
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_row(&[0.0]), -1.0);
        assert_eq!(tree.predict_row(&[9.0]), 0.0);
    }

    #[test]
    fn learns_missing_direction() {
        let x = [f64::NAN, f64::NAN, f64::NAN, 1.0, 2.0, 3.0];
        let (mapper, binned) = setup(&x);
        let gradients = [-2.0, -2.0, -2.0, 0.0, 0.0, 0.0];
        let tree = grow(&binned, &mapper, &gradients, &params());

        assert_eq!(tree.predict_row(&[f64::NAN]), 2.0);
        assert_eq!(tree.predict_row(&[2.0]), 0.0);
        assert_eq!(tree.predict_row(&[1000.0]), 0.0);
    }

    #[test]
    fn max_depth_zero_never_splits() {
        let (mapper, binned) = setup(&[1.0, 2.0]);
        let mut p = params();
        p.max_depth = Some(0);
        let tree = grow(&binned, &mapper, &[1.0, -1.0], &p);
        assert!(tree.is_single_leaf());
    }
}
