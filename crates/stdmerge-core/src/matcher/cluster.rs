//! Greedy name clustering.
//!
//! Functions are visited in input order. Each joins the first existing
//! cluster whose every member is at least `threshold` similar to it,
//! otherwise it seeds a new cluster. Earlier functions therefore act as
//! seeds; the result is stable for a stable input order but is not a
//! globally optimal partition.

use crate::matcher::similarity::{normalize_name, normalized_similarity, similarity_upper_bound};
use crate::models::{Cluster, FunctionSignature};

struct Working {
    members: Vec<usize>,
}

/// Group `functions` by name similarity. Singleton clusters are dropped.
pub fn cluster_functions(functions: &[FunctionSignature], threshold: f64) -> Vec<Cluster> {
    let normalized: Vec<String> = functions.iter().map(|f| normalize_name(&f.name)).collect();
    let lengths: Vec<usize> = normalized.iter().map(|n| n.chars().count()).collect();

    let mut working: Vec<Working> = Vec::new();
    for idx in 0..functions.len() {
        let joins = working.iter_mut().find(|cluster| {
            cluster.members.iter().all(|&m| {
                similarity_upper_bound(lengths[idx], lengths[m]) >= threshold
                    && normalized_similarity(&normalized[idx], &normalized[m]) >= threshold
            })
        });
        match joins {
            Some(cluster) => cluster.members.push(idx),
            None => working.push(Working { members: vec![idx] }),
        }
    }

    working
        .into_iter()
        .filter(|c| c.members.len() > 1)
        .map(|c| finish(&c.members, functions, &normalized))
        .collect()
}

/// Pick the centroid (minimal total distance, first wins ties) and the
/// mean pairwise distance.
fn finish(members: &[usize], functions: &[FunctionSignature], normalized: &[String]) -> Cluster {
    let n = members.len();
    let mut totals = vec![0.0f64; n];
    let mut pair_sum = 0.0f64;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = 1.0 - normalized_similarity(&normalized[members[i]], &normalized[members[j]]);
            totals[i] += d;
            totals[j] += d;
            pair_sum += d;
        }
    }
    let pairs = (n * (n - 1) / 2).max(1) as f64;
    let mut centroid = 0;
    for (i, total) in totals.iter().enumerate() {
        if *total < totals[centroid] {
            centroid = i;
        }
    }
    Cluster {
        members: members.iter().map(|&m| functions[m].clone()).collect(),
        centroid: functions[members[centroid]].name.clone(),
        mean_distance: (pair_sum / pairs).clamp(0.0, 1.0),
    }
}
