use crate::prelude::{AimError, AimResult, GridPoint};
use std::collections::VecDeque;

/// Noise label assigned to points that never join a dense cluster.
pub const NOISE: i64 = -1;

const UNVISITED: i64 = -2;

/// Deterministic density-based clustering over grid points.
///
/// Euclidean metric; the neighborhood is inclusive, so a point at exactly
/// distance `eps` counts as a neighbor. A point is a core point when its
/// neighborhood (itself included) holds at least `min_samples` points.
/// Labels are assigned in input order: clusters are numbered from 0 in
/// discovery order and noise is `-1`, so identical input ordering yields
/// identical labels.
pub fn cluster(points: &[GridPoint], eps: f64, min_samples: usize) -> AimResult<Vec<i64>> {
    if eps <= 0.0 {
        return Err(AimError::InvalidConfig("eps must be positive".into()));
    }
    if min_samples == 0 {
        return Err(AimError::InvalidConfig("min_samples must be >= 1".into()));
    }

    let n = points.len();
    let mut labels = vec![UNVISITED; n];
    let region_query = |i: usize| -> Vec<usize> {
        (0..n)
            .filter(|&j| points[i].distance(&points[j]) <= eps)
            .collect()
    };

    let mut cluster_id = 0i64;
    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        let neighbors = region_query(i);
        if neighbors.len() < min_samples {
            labels[i] = NOISE;
            continue;
        }
        labels[i] = cluster_id;
        let mut queue: VecDeque<usize> = neighbors.into();
        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                // Border point reached from a core point.
                labels[j] = cluster_id;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster_id;
            let expansion = region_query(j);
            if expansion.len() >= min_samples {
                queue.extend(expansion);
            }
        }
        cluster_id += 1;
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(usize, usize)]) -> Vec<GridPoint> {
        coords.iter().map(|&(x, y)| GridPoint::new(x, y)).collect()
    }

    #[test]
    fn two_separated_groups_get_two_labels() {
        let points = pts(&[(0, 0), (1, 0), (0, 1), (10, 10), (11, 10), (10, 11)]);
        let labels = cluster(&points, 1.5, 3).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn sparse_points_become_noise() {
        let points = pts(&[(0, 0), (5, 5), (9, 0)]);
        let labels = cluster(&points, 1.5, 2).unwrap();
        assert_eq!(labels, vec![NOISE, NOISE, NOISE]);
    }

    #[test]
    fn distance_exactly_eps_counts_as_neighbor() {
        let points = pts(&[(0, 0), (2, 0)]);
        let labels = cluster(&points, 2.0, 2).unwrap();
        assert_eq!(labels, vec![0, 0]);
    }

    #[test]
    fn labels_are_deterministic_for_fixed_input_order() {
        let points = pts(&[(0, 0), (1, 1), (1, 0), (8, 8), (8, 9), (9, 8)]);
        let a = cluster(&points, 1.5, 3).unwrap();
        let b = cluster(&points, 1.5, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let points = pts(&[(0, 0)]);
        assert!(cluster(&points, 0.0, 3).is_err());
        assert!(cluster(&points, 1.0, 0).is_err());
    }
}
