//! Clustering line observations into tracks, and merging tracks of the same physical line.

use kornia_camera::CameraView;
use rayon::prelude::*;

use crate::aggregate::{fit_line3d, select_representative};
use crate::error::{check_lengths, check_view_index, LinemapError};
use crate::linker::{compute_angle, compute_perp_dist};
use crate::union_find::UnionFind;
use crate::{
    Line2d, Line3d, LineGraph, LineLinker, LineLinker3d, LineNode, LineTrack, TrackSupport,
};

/// Whether the observations `(l2d_a, l3d_a)` of `view_a` and `(l2d_b, l3d_b)` of `view_b`
/// are the same line.
///
/// The two 3D hypotheses must link in 3D, lie in front of the other camera, and each must
/// reproject onto the 2D line observed in the other view.
fn is_connected(
    (l2d_a, l3d_a, view_a): (&Line2d, &Line3d, &CameraView),
    (l2d_b, l3d_b, view_b): (&Line2d, &Line3d, &CameraView),
    linker: &LineLinker,
) -> bool {
    if !l3d_a.is_finite() || !l3d_b.is_finite() {
        return false;
    }
    if !linker.check_connection_3d(l3d_a, l3d_b) {
        return false;
    }
    if !l3d_a.is_in_front(view_b) || !l3d_b.is_in_front(view_a) {
        return false;
    }
    linker.check_connection_2d(&l3d_a.projection(view_b), l2d_b)
        && linker.check_connection_2d(&l3d_b.projection(view_a), l2d_a)
}

/// Edges between the lines of `view_id` and the lines of its neighbors.
fn link_view(
    view_id: usize,
    all_lines_2d: &[Vec<Line2d>],
    views: &[CameraView],
    all_lines_3d: &[Vec<Line3d>],
    neighbors: &[usize],
    linker: &LineLinker,
) -> Vec<(LineNode, LineNode)> {
    let mut edges = Vec::new();
    for &ng in neighbors {
        if ng == view_id {
            continue;
        }
        for (line_id, (l2d, l3d)) in all_lines_2d[view_id]
            .iter()
            .zip(&all_lines_3d[view_id])
            .enumerate()
        {
            for (ng_line_id, (ng_l2d, ng_l3d)) in
                all_lines_2d[ng].iter().zip(&all_lines_3d[ng]).enumerate()
            {
                if is_connected(
                    (l2d, l3d, &views[view_id]),
                    (ng_l2d, ng_l3d, &views[ng]),
                    linker,
                ) {
                    edges.push((
                        LineNode { view_id, line_id },
                        LineNode {
                            view_id: ng,
                            line_id: ng_line_id,
                        },
                    ));
                }
            }
        }
    }
    edges
}

fn validate_inputs(
    graph: &LineGraph,
    all_lines_2d: &[Vec<Line2d>],
    views: &[CameraView],
    all_lines_3d: &[Vec<Line3d>],
    neighbors: &[Vec<usize>],
) -> Result<(), LinemapError> {
    let num_views = views.len();
    check_lengths("all_lines_2d", all_lines_2d.len(), "views", num_views)?;
    check_lengths("all_lines_3d", all_lines_3d.len(), "views", num_views)?;
    check_lengths("neighbors", neighbors.len(), "views", num_views)?;

    for (view_id, (lines_2d, lines_3d)) in all_lines_2d.iter().zip(all_lines_3d).enumerate() {
        if lines_2d.len() != lines_3d.len() {
            return Err(LinemapError::LinesPerViewMismatch {
                view_id,
                num_lines_2d: lines_2d.len(),
                num_lines_3d: lines_3d.len(),
            });
        }
    }

    for &ng in neighbors.iter().flatten() {
        check_view_index(ng, num_views)?;
    }

    for node in graph.nodes() {
        check_view_index(node.view_id, num_views)?;
        let num_lines = all_lines_2d[node.view_id].len();
        if node.line_id >= num_lines {
            return Err(LinemapError::LineIndexOutOfRange {
                view_id: node.view_id,
                line_id: node.line_id,
                num_lines,
            });
        }
    }
    Ok(())
}

/// Cluster 2D line observations into line tracks.
///
/// Every `(view, line)` pair is a graph node. Each line is compared with every line of the
/// neighbor views listed in `neighbors`, and consistent pairs are connected. The connected
/// components observed in at least two distinct views become tracks, whose representative line is
/// chosen among the 3D hypotheses of their supports with
/// [`select_representative`](crate::aggregate::select_representative).
///
/// `graph` is a prior: its edges are kept and it is not modified. `all_lines_3d[v][i]` is the
/// 3D hypothesis of the 2D line `all_lines_2d[v][i]`.
///
/// # Arguments
///
/// * `graph` - Prior connections between observations.
/// * `all_lines_2d` - The 2D lines of every view.
/// * `views` - The camera views.
/// * `all_lines_3d` - One 3D hypothesis per 2D line.
/// * `neighbors` - The neighbor views of every view.
/// * `linker` - Rules deciding whether two observations are the same line.
///
/// # Returns
///
/// The tracks, ordered by their smallest `(view_id, line_id)` observation.
pub fn merge_to_line_tracks(
    graph: &LineGraph,
    all_lines_2d: &[Vec<Line2d>],
    views: &[CameraView],
    all_lines_3d: &[Vec<Line3d>],
    neighbors: &[Vec<usize>],
    linker: &LineLinker,
) -> Result<Vec<LineTrack>, LinemapError> {
    validate_inputs(graph, all_lines_2d, views, all_lines_3d, neighbors)?;

    let edges: Vec<Vec<(LineNode, LineNode)>> = (0..views.len())
        .into_par_iter()
        .map(|view_id| {
            link_view(
                view_id,
                all_lines_2d,
                views,
                all_lines_3d,
                &neighbors[view_id],
                linker,
            )
        })
        .collect();

    let mut graph = graph.clone();
    for (a, b) in edges.into_iter().flatten() {
        let id_a = graph.find_or_create_node(a.view_id, a.line_id);
        let id_b = graph.find_or_create_node(b.view_id, b.line_id);
        graph.add_edge(id_a, id_b);
    }
    log::debug!(
        "line graph: {} nodes, {} edges",
        graph.num_nodes(),
        graph.num_edges()
    );

    let mut tracks = Vec::new();
    for component in graph.components() {
        let supports: Vec<TrackSupport> = component
            .iter()
            .map(|node| TrackSupport {
                view_id: node.view_id,
                line_id: node.line_id,
                line2d: all_lines_2d[node.view_id][node.line_id],
                line3d: all_lines_3d[node.view_id][node.line_id],
            })
            .collect();
        let mut component_views: Vec<usize> = supports.iter().map(|s| s.view_id).collect();
        component_views.sort_unstable();
        component_views.dedup();
        if component_views.len() < 2 {
            continue;
        }
        let candidates: Vec<Line3d> = supports.iter().map(|s| s.line3d).collect();
        match select_representative(&candidates, &supports, views, &linker.linker_2d) {
            Some(line) => tracks.push(LineTrack::new(line, supports)),
            None => log::debug!(
                "dropping component of {} lines without a valid hypothesis",
                component.len()
            ),
        }
    }

    log::info!("merged {} line tracks", tracks.len());
    Ok(tracks)
}

/// Disagreement of a hypothesis with the representative line, normalized by the 3D linker
/// thresholds. Non-finite hypotheses are the worst.
fn outlier_score(line: &Line3d, hypothesis: &Line3d, linker3d: &LineLinker3d) -> f64 {
    if !hypothesis.is_finite() {
        return f64::INFINITY;
    }
    let th_angle = linker3d.config().th_angle.max(f64::EPSILON);
    let th_perp = linker3d.perp_threshold(line, hypothesis).max(f64::EPSILON);
    compute_angle(line, hypothesis) / th_angle + compute_perp_dist(line, hypothesis) / th_perp
}

/// Fit the representative of a merged track, falling back to the representatives of the
/// merged tracks when no hypothesis is valid.
fn fit_merged(supports: &[TrackSupport], fallback: &[Line3d]) -> Option<Line3d> {
    let hypotheses: Vec<Line3d> = supports.iter().map(|s| s.line3d).collect();
    fit_line3d(&hypotheses).or_else(|| fit_line3d(fallback))
}

/// Merge a group of tracks into one, pruning at most `num_outliers` disagreeing supports.
fn merge_group(
    group: &[&LineTrack],
    linker3d: &LineLinker3d,
    num_outliers: usize,
) -> Option<LineTrack> {
    let mut supports: Vec<TrackSupport> = Vec::new();
    for track in group {
        for support in &track.supports {
            let duplicate = supports
                .iter()
                .any(|s| s.view_id == support.view_id && s.line_id == support.line_id);
            if !duplicate {
                supports.push(*support);
            }
        }
    }
    let fallback: Vec<Line3d> = group.iter().map(|t| t.line).collect();
    let mut line = fit_merged(&supports, &fallback)?;

    let disagreeing: Vec<usize> = supports
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.line3d.is_finite() || !linker3d.check(&line, &s.line3d))
        .map(|(idx, _)| idx)
        .collect();

    if disagreeing.len() > num_outliers {
        let scores: Vec<f64> = disagreeing
            .iter()
            .map(|&idx| outlier_score(&line, &supports[idx].line3d, linker3d))
            .collect();
        let mut order: Vec<usize> = (0..disagreeing.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        let mut pruned = vec![false; supports.len()];
        for &k in order.iter().take(num_outliers) {
            pruned[disagreeing[k]] = true;
        }
        supports = supports
            .into_iter()
            .zip(pruned)
            .filter_map(|(s, p)| (!p).then_some(s))
            .collect();
        log::debug!(
            "pruned {} of {} disagreeing supports",
            num_outliers,
            disagreeing.len()
        );
        line = fit_merged(&supports, &fallback)?;
    }

    if supports.len() < 2 {
        return None;
    }
    Some(LineTrack::new(line, supports))
}

/// Merge tracks whose representative lines are the same 3D line.
///
/// Tracks are connected when `linker3d` links their representatives, and every connected
/// group is merged into a single track holding the union of the supports, with the
/// representative refit through all their hypotheses. If more than `num_outliers` supports
/// of a merged track disagree with the new representative, the `num_outliers` worst of those
/// are dropped and the representative is refit once. Merged tracks left with fewer than
/// two supports are discarded. Tracks that merge with nothing are returned unchanged.
///
/// The output is ordered by the smallest input index of each group.
pub fn remerge_line_tracks(
    tracks: &[LineTrack],
    linker3d: &LineLinker3d,
    num_outliers: usize,
) -> Vec<LineTrack> {
    let n = tracks.len();
    let links: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let a = &tracks[i].line;
            if !a.is_finite() {
                return Vec::new();
            }
            ((i + 1)..n)
                .filter(|&j| {
                    let b = &tracks[j].line;
                    b.is_finite() && linker3d.check(a, b)
                })
                .collect()
        })
        .collect();

    let mut uf = UnionFind::new(n);
    for (i, linked) in links.iter().enumerate() {
        for &j in linked {
            uf.union(i, j);
        }
    }

    let groups = uf.groups();
    let merged: Vec<Option<LineTrack>> = groups
        .par_iter()
        .map(|group| {
            if let [single] = group.as_slice() {
                return Some(tracks[*single].clone());
            }
            let members: Vec<&LineTrack> = group.iter().map(|&i| &tracks[i]).collect();
            merge_group(&members, linker3d, num_outliers)
        })
        .collect();

    let out: Vec<LineTrack> = merged.into_iter().flatten().collect();
    log::debug!("remerged {} line tracks into {}", n, out.len());
    out
}

/// Repeat [`remerge_line_tracks`] until the number of tracks stops changing, at most
/// `max_iterations` times.
pub fn remerge_line_tracks_until_stable(
    tracks: Vec<LineTrack>,
    linker3d: &LineLinker3d,
    num_outliers: usize,
    max_iterations: usize,
) -> Vec<LineTrack> {
    let mut tracks = tracks;
    for iteration in 0..max_iterations {
        let num_before = tracks.len();
        tracks = remerge_line_tracks(&tracks, linker3d, num_outliers);
        log::info!(
            "remerge iteration {}: {} -> {} tracks",
            iteration,
            num_before,
            tracks.len()
        );
        if tracks.len() == num_before {
            break;
        }
    }
    tracks
}
