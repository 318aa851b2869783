use crate::aiming::dbscan::{self, NOISE};
use crate::math::stats::StatsHelper;
use crate::prelude::{AimError, AimResult, GridPoint};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-N member selection inside a cluster: either a fraction of the
/// cluster population in `(0, 1)` or an absolute count `>= 5`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopN {
    Count(usize),
    Fraction(f64),
}

impl TopN {
    fn validate(&self) -> AimResult<()> {
        match *self {
            TopN::Fraction(f) if f > 0.0 && f < 1.0 => Ok(()),
            TopN::Count(n) if n >= 5 => Ok(()),
            other => Err(AimError::InvalidConfig(format!(
                "invalid top-N selection {:?}",
                other
            ))),
        }
    }

    // The absolute-count branch collapses to 5 regardless of the requested
    // count; kept for compatibility with results of earlier tooling.
    fn selection_size(&self, cluster_size: usize) -> usize {
        let n = match *self {
            TopN::Fraction(f) => ((cluster_size as f64 * f).floor() as usize).max(5),
            TopN::Count(_) => 5,
        };
        n.min(cluster_size)
    }
}

/// Parameters for one aim-point extraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtractionParams {
    pub top_n: TopN,
    pub eps: f64,
    pub min_samples: usize,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            top_n: TopN::Fraction(0.05),
            eps: 1.5,
            min_samples: 5,
        }
    }
}

/// One density-connected leakage cluster, in confidence order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AimCluster {
    /// Full first-pass member set and leakage values.
    pub members: Vec<GridPoint>,
    pub member_values: Vec<f64>,
    /// Value-ranked top-N subset.
    pub top_n: Vec<GridPoint>,
    pub top_n_values: Vec<f64>,
    /// Top-N subset after spatial-outlier rejection.
    pub filtered: Vec<GridPoint>,
    pub filtered_values: Vec<f64>,
    /// Arithmetic centroid of the filtered subset, fractional grid units.
    pub centroid: (f64, f64),
    /// Normalized relative leakage strength; sums to 1 across clusters.
    pub confidence: f64,
}

/// Full structured result of one extraction, clusters ordered by
/// confidence descending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub clusters: Vec<AimCluster>,
}

/// Stable ascending argsort reversed: descending value ranking with ties
/// coming out in descending input index.
fn argsort_descending(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    idx.reverse();
    idx
}

fn value_at(map: ArrayView2<f64>, p: &GridPoint) -> AimResult<f64> {
    map.get((p.y, p.x)).copied().ok_or_else(|| {
        AimError::OutOfBounds(format!("hump point ({}, {}) outside leakage map", p.x, p.y))
    })
}

/// Locates probable leakage sources from a candidate hump-point list.
///
/// Two-stage density clustering: a first pass groups the hump points and
/// discards noise; inside each cluster the top-N members by leakage value
/// are re-clustered with the same parameters to reject value-driven
/// spatial outliers, keeping only the most populous group when the subset
/// splits. Confidence per cluster is the mean value of the filtered
/// subset, normalized across clusters.
///
/// An empty hump list yields zero clusters; a zero or negative confidence
/// normalization sum is an invalid-input error.
pub fn extract_aim_points(
    map: ArrayView2<f64>,
    humps: &[GridPoint],
    params: &ExtractionParams,
) -> AimResult<Extraction> {
    params.top_n.validate()?;
    if humps.is_empty() {
        return Ok(Extraction::default());
    }

    let labels = dbscan::cluster(humps, params.eps, params.min_samples)?;
    let mut by_label: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_label.entry(label).or_default().push(i);
    }
    by_label.remove(&NOISE);

    struct Candidate {
        members: Vec<GridPoint>,
        member_values: Vec<f64>,
        top_n: Vec<GridPoint>,
        top_n_values: Vec<f64>,
        filtered: Vec<GridPoint>,
        filtered_values: Vec<f64>,
    }

    let mut candidates = Vec::with_capacity(by_label.len());
    for indices in by_label.values() {
        let members: Vec<GridPoint> = indices.iter().map(|&i| humps[i]).collect();
        let member_values = members
            .iter()
            .map(|p| value_at(map, p))
            .collect::<AimResult<Vec<f64>>>()?;

        let ranking = argsort_descending(&member_values);
        let take = params.top_n.selection_size(members.len());
        let top_n: Vec<GridPoint> = ranking[..take].iter().map(|&i| members[i]).collect();
        let top_n_values: Vec<f64> = ranking[..take].iter().map(|&i| member_values[i]).collect();

        // Outlier rejection: re-cluster the top-N subset and keep the most
        // populous group, ties resolved toward the smallest label with
        // noise included as a candidate.
        let sub_labels = dbscan::cluster(&top_n, params.eps, params.min_samples)?;
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for &l in &sub_labels {
            *counts.entry(l).or_default() += 1;
        }
        let (filtered, filtered_values) = if counts.len() != 1 {
            let mut best_label = NOISE;
            let mut best_count = 0usize;
            for (&label, &count) in &counts {
                if count > best_count {
                    best_label = label;
                    best_count = count;
                }
            }
            let keep: Vec<usize> = (0..top_n.len())
                .filter(|&i| sub_labels[i] == best_label)
                .collect();
            (
                keep.iter().map(|&i| top_n[i]).collect(),
                keep.iter().map(|&i| top_n_values[i]).collect(),
            )
        } else {
            (top_n.clone(), top_n_values.clone())
        };

        candidates.push(Candidate {
            members,
            member_values,
            top_n,
            top_n_values,
            filtered,
            filtered_values,
        });
    }

    if candidates.is_empty() {
        return Ok(Extraction::default());
    }

    let means: Vec<f64> = candidates
        .iter()
        .map(|c| StatsHelper::mean(&c.filtered_values))
        .collect();
    let sum: f64 = means.iter().sum();
    if sum <= 0.0 {
        return Err(AimError::InvalidInput(format!(
            "confidence normalization sum {} is not positive",
            sum
        )));
    }
    let confidences: Vec<f64> = means.iter().map(|m| m / sum).collect();

    let order = argsort_descending(&confidences);
    let mut clusters = Vec::with_capacity(order.len());
    for &idx in &order {
        let c = &candidates[idx];
        let cx = StatsHelper::mean(&c.filtered.iter().map(|p| p.x as f64).collect::<Vec<_>>());
        let cy = StatsHelper::mean(&c.filtered.iter().map(|p| p.y as f64).collect::<Vec<_>>());
        clusters.push(AimCluster {
            members: c.members.clone(),
            member_values: c.member_values.clone(),
            top_n: c.top_n.clone(),
            top_n_values: c.top_n_values.clone(),
            filtered: c.filtered.clone(),
            filtered_values: c.filtered_values.clone(),
            centroid: (cx, cy),
            confidence: confidences[idx],
        });
    }

    Ok(Extraction { clusters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aiming::finder::top_percent_locations;
    use ndarray::Array2;

    fn hotspot_map(
        shape: (usize, usize),
        background: f64,
        blocks: &[(usize, usize, f64)],
    ) -> Array2<f64> {
        let mut map = Array2::from_elem(shape, background);
        for &(cx, cy, value) in blocks {
            for y in cy - 1..=cy + 1 {
                for x in cx - 1..=cx + 1 {
                    map[[y, x]] = value;
                }
            }
        }
        map
    }

    fn params(top_n: TopN) -> ExtractionParams {
        ExtractionParams {
            top_n,
            eps: 1.5,
            min_samples: 3,
        }
    }

    #[test]
    fn single_hotspot_yields_one_full_confidence_cluster() {
        let map = hotspot_map((10, 10), 1.0, &[(2, 2, 100.0)]);
        let humps = top_percent_locations(map.view(), 0.95).unwrap();
        assert_eq!(humps.len(), 9);

        let result =
            extract_aim_points(map.view(), &humps, &params(TopN::Fraction(0.9))).unwrap();
        assert_eq!(result.clusters.len(), 1);
        let cluster = &result.clusters[0];
        assert!((cluster.confidence - 1.0).abs() < 1e-9);
        assert_eq!(cluster.members.len(), 9);
        assert_eq!(cluster.top_n.len(), 8);
        assert!((cluster.centroid.0 - 2.0).abs() < 0.5);
        assert!((cluster.centroid.1 - 2.0).abs() < 0.5);
    }

    #[test]
    fn two_hotspots_rank_by_mean_value_with_proportional_confidence() {
        let map = hotspot_map((12, 12), 0.0, &[(2, 2, 100.0), (8, 8, 40.0)]);
        let humps = top_percent_locations(map.view(), 0.875).unwrap();
        assert_eq!(humps.len(), 18);

        let result =
            extract_aim_points(map.view(), &humps, &params(TopN::Fraction(0.9))).unwrap();
        assert_eq!(result.clusters.len(), 2);
        let strong = &result.clusters[0];
        let weak = &result.clusters[1];
        assert!((strong.confidence - 100.0 / 140.0).abs() < 1e-9);
        assert!((weak.confidence - 40.0 / 140.0).abs() < 1e-9);
        assert!((strong.confidence + weak.confidence - 1.0).abs() < 1e-9);
        assert!((strong.centroid.0 - 2.0).abs() < 0.5);
        assert!((weak.centroid.0 - 8.0).abs() < 0.5);
    }

    #[test]
    fn extraction_is_deterministic() {
        let map = hotspot_map((12, 12), 0.0, &[(2, 2, 100.0), (8, 8, 40.0)]);
        let humps = top_percent_locations(map.view(), 0.875).unwrap();
        let p = params(TopN::Fraction(0.9));
        let a = extract_aim_points(map.view(), &humps, &p).unwrap();
        let b = extract_aim_points(map.view(), &humps, &p).unwrap();
        assert_eq!(a.clusters.len(), b.clusters.len());
        for (ca, cb) in a.clusters.iter().zip(&b.clusters) {
            assert_eq!(ca.centroid, cb.centroid);
            assert_eq!(ca.confidence, cb.confidence);
            assert_eq!(ca.members, cb.members);
        }
    }

    #[test]
    fn absolute_count_always_selects_five() {
        let map = hotspot_map((10, 10), 1.0, &[(2, 2, 100.0)]);
        let humps = top_percent_locations(map.view(), 0.95).unwrap();
        let result = extract_aim_points(map.view(), &humps, &params(TopN::Count(7))).unwrap();
        assert_eq!(result.clusters[0].top_n.len(), 5);
    }

    #[test]
    fn invalid_top_n_is_rejected() {
        let map = Array2::from_elem((4, 4), 1.0);
        let humps = vec![GridPoint::new(0, 0)];
        for bad in [TopN::Fraction(0.0), TopN::Fraction(1.0), TopN::Count(4)] {
            let err = extract_aim_points(map.view(), &humps, &params(bad));
            assert!(matches!(err, Err(AimError::InvalidConfig(_))));
        }
    }

    #[test]
    fn empty_hump_list_yields_zero_clusters() {
        let map = Array2::from_elem((4, 4), 1.0);
        let result =
            extract_aim_points(map.view(), &[], &params(TopN::Fraction(0.5))).unwrap();
        assert!(result.clusters.is_empty());
    }

    #[test]
    fn zero_normalization_sum_is_invalid_input() {
        let map = Array2::zeros((8, 8));
        let humps: Vec<GridPoint> = (1..=3)
            .flat_map(|y| (1..=3).map(move |x| GridPoint::new(x, y)))
            .collect();
        let err = extract_aim_points(map.view(), &humps, &params(TopN::Fraction(0.9)));
        assert!(matches!(err, Err(AimError::InvalidInput(_))));
    }

    #[test]
    fn noise_points_are_discarded() {
        let mut map = hotspot_map((12, 12), 1.0, &[(2, 2, 100.0)]);
        map[[10, 10]] = 500.0;
        let humps = top_percent_locations(map.view(), 0.95).unwrap();
        assert!(humps.contains(&GridPoint::new(10, 10)));
        let result =
            extract_aim_points(map.view(), &humps, &params(TopN::Fraction(0.9))).unwrap();
        // The isolated high-value point never forms a dense cluster.
        for cluster in &result.clusters {
            assert!(!cluster.members.contains(&GridPoint::new(10, 10)));
        }
    }
}
