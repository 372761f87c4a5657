//! Scoring helpers shared by the evaluators.

/// Area under the ROC curve of `scores` against binary `labels` (> 0 is the
/// positive class), computed from average ranks so ties count half.
///
/// Returns `None` when either class is absent or the inputs are mismatched.
pub fn roc_auc(labels: &[f64], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() || labels.is_empty() {
        return None;
    }

    let n_pos = labels.iter().filter(|&&y| y > 0.0).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank across the tie group
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(y, _)| **y > 0.0)
        .map(|(_, r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Empirical quantile with linear interpolation; `sorted` must be ascending.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_ranking() {
        let auc = roc_auc(&[0.0, 0.0, 1.0, 1.0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_relative_eq!(auc, 1.0);
    }

    #[test]
    fn inverted_ranking() {
        let auc = roc_auc(&[1.0, 1.0, -1.0, -1.0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_relative_eq!(auc, 0.0);
    }

    #[test]
    fn ties_count_half() {
        let auc = roc_auc(&[0.0, 1.0], &[0.5, 0.5]).unwrap();
        assert_relative_eq!(auc, 0.5);
    }

    #[test]
    fn mixed_ranking() {
        // pairs (pos, neg): (0.35 vs 0.1) win, (0.35 vs 0.4) loss,
        // (0.8 vs 0.1) win, (0.8 vs 0.4) win -> 3/4
        let auc = roc_auc(&[0.0, 1.0, 0.0, 1.0], &[0.1, 0.35, 0.4, 0.8]).unwrap();
        assert_relative_eq!(auc, 0.75);
    }

    #[test]
    fn single_class_is_undefined() {
        assert!(roc_auc(&[1.0, 1.0], &[0.2, 0.3]).is_none());
        assert!(roc_auc(&[], &[]).is_none());
        assert!(roc_auc(&[1.0], &[0.2, 0.3]).is_none());
    }

    #[test]
    fn mean_of_values() {
        assert_relative_eq!(mean(&[0.5, 0.7]).unwrap(), 0.6);
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile_sorted(&sorted, 0.5).unwrap(), 2.0);
        assert_relative_eq!(quantile_sorted(&sorted, 0.2).unwrap(), 0.8);
        assert_relative_eq!(quantile_sorted(&sorted, 1.0).unwrap(), 4.0);
        assert!(quantile_sorted(&sorted, 1.5).is_none());
    }
}
