use super::MergePolicy;
use super::assignment::Matching;
use crate::pipeline::topology::Topology;
use crate::types::Skeleton;

/// Which skeleton, if any, owns each `(part type, peak index)`.
struct Registry {
    owner: Vec<Vec<Option<usize>>>,
}

impl Registry {
    fn new(peak_counts: &[usize]) -> Self {
        Self {
            owner: peak_counts.iter().map(|&count| vec![None; count]).collect(),
        }
    }

    fn contains(&self, part: usize, peak: usize) -> bool {
        self.owner
            .get(part)
            .is_some_and(|peaks| peak < peaks.len())
    }

    fn owner(&self, part: usize, peak: usize) -> Option<usize> {
        self.owner.get(part)?.get(peak).copied().flatten()
    }

    fn register(&mut self, part: usize, peak: usize, skeleton: usize) {
        self.owner[part][peak] = Some(skeleton);
    }
}

/// Greedy skeleton assembly over the per-edge matchings.
///
/// Edges are visited in topology order and pairs in ascending source order. A
/// pair whose endpoints are both free starts a skeleton; a pair with one owned
/// endpoint extends that skeleton unless the free part is already filled; a
/// pair joining two skeletons is handled by `policy`. The first
/// `max_objects` skeletons in creation order are returned.
pub fn connect_parts(
    matchings: &[Matching],
    topology: &Topology,
    peak_counts: &[usize],
    max_objects: usize,
    policy: MergePolicy,
) -> Vec<Skeleton> {
    let num_parts = peak_counts.len();
    let mut registry = Registry::new(peak_counts);
    // merged skeletons leave a `None` behind so ids stay stable
    let mut skeletons: Vec<Option<Skeleton>> = Vec::new();

    for (edge, matching) in topology.edges().iter().zip(matchings) {
        if edge.source == edge.target {
            log::debug!("skipping self-loop edge on part {}", edge.source);
            continue;
        }

        for (src, dst) in matching.pairs() {
            let a = (edge.source, src);
            let b = (edge.target, dst);
            if !registry.contains(a.0, a.1) || !registry.contains(b.0, b.1) {
                continue;
            }

            match (registry.owner(a.0, a.1), registry.owner(b.0, b.1)) {
                (None, None) => {
                    let id = skeletons.len();
                    let mut skeleton = Skeleton::empty(num_parts);
                    skeleton.set_part(a.0, a.1);
                    skeleton.set_part(b.0, b.1);
                    skeletons.push(Some(skeleton));
                    registry.register(a.0, a.1, id);
                    registry.register(b.0, b.1, id);
                }
                (Some(id), None) => extend(&mut skeletons, &mut registry, id, b),
                (None, Some(id)) => extend(&mut skeletons, &mut registry, id, a),
                (Some(x), Some(y)) if x == y => {}
                (Some(x), Some(y)) => match policy {
                    MergePolicy::Never => {}
                    MergePolicy::Disjoint => merge(&mut skeletons, &mut registry, x, y),
                },
            }
        }
    }

    skeletons.into_iter().flatten().take(max_objects).collect()
}

fn extend(
    skeletons: &mut [Option<Skeleton>],
    registry: &mut Registry,
    id: usize,
    (part, peak): (usize, usize),
) {
    let Some(skeleton) = skeletons.get_mut(id).and_then(Option::as_mut) else {
        return;
    };
    if skeleton.part(part).is_some() {
        return;
    }
    skeleton.set_part(part, peak);
    registry.register(part, peak, id);
}

/// Folds the later of two skeletons into the earlier one when no part type is
/// present in both.
fn merge(skeletons: &mut [Option<Skeleton>], registry: &mut Registry, x: usize, y: usize) {
    let (keep, gone) = (x.min(y), x.max(y));
    let (Some(kept), Some(other)) = (&skeletons[keep], &skeletons[gone]) else {
        return;
    };
    let overlaps = kept
        .parts()
        .iter()
        .zip(other.parts())
        .any(|(p, q)| p.is_some() && q.is_some());
    if overlaps {
        return;
    }

    let Some(other) = skeletons[gone].take() else {
        return;
    };
    let Some(kept) = skeletons[keep].as_mut() else {
        return;
    };
    for (part, peak) in other.parts().iter().enumerate() {
        if let Some(peak) = *peak {
            kept.set_part(part, peak);
            registry.register(part, peak, keep);
        }
    }
}
