//! k-means clustering of a pixel distribution in RGB space.
//!
//! When the image has fewer distinct colors than requested, clustering runs
//! with `k` reduced to the distinct count and the centroids are then repeated
//! cyclically, in emitted order, until the requested count is reached. A
//! cluster left empty by the last assignment pass takes the centroid of the
//! most populated cluster.

use crate::config::ClusterParams;
use crate::decode::PixelMatrix;
use crate::error::ClusterError;
use kmeans_colors::{Kmeans, get_kmeans};
use palette::Srgb;
use std::collections::HashSet;

/// Largest supported `k`; cluster labels are stored as `u8`.
pub const MAX_COLORS: usize = 256;

/// One cluster centroid and the number of pixels assigned to it.
///
/// Padding entries repeat an earlier centroid and carry a population of 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorCluster {
    /// Channels in `[0, 1]`.
    pub centroid: Srgb<f32>,
    pub population: usize,
}

/// Outcome of clustering, with diagnostics for the event log.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub clusters: Vec<ColorCluster>,
    pub distinct_colors: usize,
    pub effective_k: usize,
    pub score: f32,
}

/// Partition `matrix` into exactly `num_colors` clusters.
pub fn cluster_pixels(
    matrix: &PixelMatrix,
    num_colors: usize,
    params: &ClusterParams,
) -> Result<Clustering, ClusterError> {
    if matrix.is_empty() {
        return Err(ClusterError::EmptyInput);
    }

    let distinct_colors = count_distinct(&matrix.pixels);
    let effective_k = num_colors.min(distinct_colors).min(MAX_COLORS);

    let samples: Vec<Srgb<f32>> = matrix
        .pixels
        .iter()
        .map(|p| p.into_format::<f32>())
        .collect();

    let best = best_run(effective_k, &samples, params);

    if best.centroids.len() != effective_k {
        return Err(ClusterError::CentroidCount {
            expected: effective_k,
            got: best.centroids.len(),
        });
    }
    if let Some(index) = best.centroids.iter().position(|c| !is_finite(c)) {
        return Err(ClusterError::NonFinite { index });
    }

    let mut clusters = with_populations(&best);
    fill_empty_clusters(&mut clusters);
    pad_cyclically(&mut clusters, num_colors);

    Ok(Clustering {
        clusters,
        distinct_colors,
        effective_k,
        score: best.score,
    })
}

/// Run k-means `params.runs` times with consecutive seeds and keep the
/// lowest-score result. Ties keep the earliest run.
fn best_run(k: usize, samples: &[Srgb<f32>], params: &ClusterParams) -> Kmeans<Srgb<f32>> {
    let run = |i: u32| {
        get_kmeans(
            k,
            params.max_iterations,
            params.convergence,
            false,
            samples,
            params.seed.wrapping_add(u64::from(i)),
        )
    };

    let mut best = run(0);
    for i in 1..params.runs {
        let candidate = run(i);
        if candidate.score < best.score {
            best = candidate;
        }
    }
    best
}

fn count_distinct(pixels: &[Srgb<u8>]) -> usize {
    pixels
        .iter()
        .map(|p| (p.red, p.green, p.blue))
        .collect::<HashSet<_>>()
        .len()
}

fn is_finite(c: &Srgb<f32>) -> bool {
    c.red.is_finite() && c.green.is_finite() && c.blue.is_finite()
}

fn with_populations(result: &Kmeans<Srgb<f32>>) -> Vec<ColorCluster> {
    let mut counts = vec![0usize; result.centroids.len()];
    for &label in &result.indices {
        if let Some(count) = counts.get_mut(usize::from(label)) {
            *count += 1;
        }
    }

    result
        .centroids
        .iter()
        .zip(counts)
        .map(|(&centroid, population)| ColorCluster {
            centroid,
            population,
        })
        .collect()
}

fn fill_empty_clusters(clusters: &mut [ColorCluster]) {
    let Some(largest) = clusters.iter().max_by_key(|c| c.population).copied() else {
        return;
    };
    for cluster in clusters.iter_mut().filter(|c| c.population == 0) {
        cluster.centroid = largest.centroid;
    }
}

fn pad_cyclically(clusters: &mut Vec<ColorCluster>, target: usize) {
    let emitted = clusters.len();
    if emitted == 0 {
        return;
    }
    for i in emitted..target {
        clusters.push(ColorCluster {
            centroid: clusters[i % emitted].centroid,
            population: 0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(pixels: Vec<Srgb<u8>>) -> PixelMatrix {
        PixelMatrix {
            width: pixels.len() as u32,
            height: 1,
            pixels,
        }
    }

    fn close(a: Srgb<f32>, b: Srgb<f32>) -> bool {
        (a.red - b.red).abs() < 0.01
            && (a.green - b.green).abs() < 0.01
            && (a.blue - b.blue).abs() < 0.01
    }

    #[test]
    fn test_solid_color_padded_to_requested_count() {
        let m = matrix(vec![Srgb::new(12, 200, 7); 100]);
        let result = cluster_pixels(&m, 5, &ClusterParams::default()).unwrap();

        assert_eq!(result.clusters.len(), 5);
        assert_eq!(result.effective_k, 1);
        assert_eq!(result.clusters[0].population, 100);
        let expected: Srgb<f32> = Srgb::new(12u8, 200, 7).into_format();
        assert!(result.clusters.iter().all(|c| close(c.centroid, expected)));
        assert!(result.clusters[1..].iter().all(|c| c.population == 0));
    }

    #[test]
    fn test_padding_repeats_in_emitted_order() {
        let mut pixels = vec![Srgb::new(255, 0, 0); 10];
        pixels.extend(vec![Srgb::new(0, 0, 255); 10]);
        let result = cluster_pixels(&matrix(pixels), 5, &ClusterParams::default()).unwrap();

        assert_eq!(result.effective_k, 2);
        let c = &result.clusters;
        assert_eq!(c.len(), 5);
        assert_eq!(c[2].centroid, c[0].centroid);
        assert_eq!(c[3].centroid, c[1].centroid);
        assert_eq!(c[4].centroid, c[0].centroid);
    }

    #[test]
    fn test_two_colors_separate() {
        let mut pixels = vec![Srgb::new(255, 0, 0); 8];
        pixels.extend(vec![Srgb::new(0, 0, 255); 8]);
        let result = cluster_pixels(&matrix(pixels), 2, &ClusterParams::default()).unwrap();

        let red = Srgb::new(1.0, 0.0, 0.0);
        let blue = Srgb::new(0.0, 0.0, 1.0);
        assert!(result.clusters.iter().any(|c| close(c.centroid, red)));
        assert!(result.clusters.iter().any(|c| close(c.centroid, blue)));
        assert_eq!(result.clusters.iter().map(|c| c.population).sum::<usize>(), 16);
    }

    #[test]
    fn test_repeated_runs_are_deterministic() {
        let pixels: Vec<Srgb<u8>> = (0..=255u8).map(|v| Srgb::new(v, 255 - v, v / 2)).collect();
        let m = matrix(pixels);
        let params = ClusterParams {
            runs: 3,
            ..ClusterParams::default()
        };

        let a = cluster_pixels(&m, 4, &params).unwrap();
        let b = cluster_pixels(&m, 4, &params).unwrap();
        assert_eq!(a.clusters, b.clusters);
    }

    #[test]
    fn test_empty_matrix_is_error() {
        let err = cluster_pixels(&matrix(Vec::new()), 3, &ClusterParams::default()).unwrap_err();
        assert_eq!(err, ClusterError::EmptyInput);
    }

    #[test]
    fn test_empty_cluster_takes_largest_centroid() {
        let big = ColorCluster {
            centroid: Srgb::new(0.5, 0.5, 0.5),
            population: 9,
        };
        let empty = ColorCluster {
            centroid: Srgb::new(0.9, 0.1, 0.3),
            population: 0,
        };
        let mut clusters = vec![empty, big];
        fill_empty_clusters(&mut clusters);
        assert_eq!(clusters[0].centroid, big.centroid);
    }
}
