// crates/bipers-scheduler/src/path.rs

//! Traversal-path extraction from the spanning tree.

use crate::dual_graph::{dual_edges, root_face};
use crate::mst::minimum_spanning_tree;
use bipers_arrangement::{Arrangement, FaceId, HalfedgeId};
use bipers_core::{Error, Result};
use tracing::debug;

/// Plan the traversal: each entry is a half-edge whose face is the cell
/// being entered and whose anchor is the line being crossed (forward or
/// backtracking).
///
/// # Errors
/// [`Error::Invariant`] if the dual graph is disconnected or an expected
/// boundary edge is missing.
pub fn find_path(arrangement: &Arrangement) -> Result<Vec<HalfedgeId>> {
    let num_faces = arrangement.num_faces();
    if num_faces <= 1 {
        return Ok(Vec::new());
    }

    let edges = dual_edges(arrangement)?;
    let tree = minimum_spanning_tree(num_faces, &edges);
    debug!(faces = num_faces, tree_edges = tree.len(), "planning path");

    let mut adjacency: Vec<Vec<(u32, u64)>> = vec![Vec::new(); num_faces as usize];
    for edge in &tree {
        adjacency[edge.a as usize].push((edge.b, edge.weight));
        adjacency[edge.b as usize].push((edge.a, edge.weight));
    }

    let start = root_face(arrangement).0;

    // Pre-order over the tree, recording each node's parent and the weight
    // of the edge up to it.
    let mut parent: Vec<Option<u32>> = vec![None; num_faces as usize];
    let mut up_weight: Vec<u64> = vec![0; num_faces as usize];
    let mut preorder = Vec::with_capacity(num_faces as usize);
    let mut stack = vec![start];
    let mut seen = vec![false; num_faces as usize];
    seen[start as usize] = true;
    while let Some(node) = stack.pop() {
        preorder.push(node);
        for &(next, weight) in &adjacency[node as usize] {
            if !seen[next as usize] {
                seen[next as usize] = true;
                parent[next as usize] = Some(node);
                up_weight[next as usize] = weight;
                stack.push(next);
            }
        }
    }
    if preorder.len() != num_faces as usize {
        return Err(Error::invariant(
            "path::find_path",
            "dual graph is not connected",
        ));
    }

    // Branch weight = subtree edge total plus the edge to the parent,
    // accumulated bottom-up.
    let mut branch_weight = up_weight.clone();
    for &node in preorder.iter().rev() {
        if let Some(p) = parent[node as usize] {
            branch_weight[p as usize] += branch_weight[node as usize];
        }
    }

    // Children in decreasing branch weight; the traversal pops from the
    // back, so light subtrees are cleared first and the heaviest is entered
    // last, minimising backtracking.
    let mut children: Vec<Vec<u32>> = vec![Vec::new(); num_faces as usize];
    for &node in &preorder {
        if let Some(p) = parent[node as usize] {
            children[p as usize].push(node);
        }
    }
    for list in &mut children {
        list.sort_by_key(|&c| std::cmp::Reverse(branch_weight[c as usize]));
    }

    // Depth-first walk emitting one half-edge per step.
    let mut path = Vec::with_capacity(2 * num_faces as usize);
    let mut nodes = vec![start];
    let mut backtrack: Vec<HalfedgeId> = Vec::new();
    let mut discovered = 1u32;
    while discovered != num_faces {
        let node = *nodes.last().ok_or_else(|| {
            Error::invariant("path::find_path", "traversal stack drained early")
        })?;
        if let Some(next_node) = children[node as usize].pop() {
            let crossing = boundary_edge_between(arrangement, FaceId(node), FaceId(next_node))?;
            path.push(arrangement.he(crossing).twin);
            backtrack.push(crossing);
            nodes.push(next_node);
            discovered += 1;
        } else {
            nodes.pop();
            path.push(backtrack.pop().ok_or_else(|| {
                Error::invariant("path::find_path", "backtrack stack drained early")
            })?);
        }
    }
    Ok(path)
}

/// A boundary half-edge of `face` whose twin lies in `neighbor`.
fn boundary_edge_between(
    arrangement: &Arrangement,
    face: FaceId,
    neighbor: FaceId,
) -> Result<HalfedgeId> {
    let start = arrangement.faces[face.index()].boundary.ok_or_else(|| {
        Error::invariant("path::boundary_edge_between", "face without boundary")
    })?;
    let mut current = start;
    loop {
        let twin = arrangement.he(current).twin;
        if arrangement.he(twin).face == Some(neighbor) {
            return Ok(current);
        }
        current = arrangement.next_of(current)?;
        if current == start {
            return Err(Error::invariant(
                "path::boundary_edge_between",
                format!("no edge between cells {} and {}", face.0, neighbor.0),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bipers_arrangement::build_arrangement;
    use bipers_core::Exact;
    use num_bigint::BigInt;

    fn grades(values: &[i64]) -> Vec<Exact> {
        values
            .iter()
            .map(|&v| Exact::from_integer(BigInt::from(v)))
            .collect()
    }

    #[test]
    fn empty_arrangement_has_empty_path() {
        let arrangement = build_arrangement(grades(&[0]), grades(&[0]), &[]).unwrap();
        assert!(find_path(&arrangement).unwrap().is_empty());
    }

    #[test]
    fn path_visits_every_face_within_bound() {
        let arrangement = build_arrangement(
            grades(&[0, 1, 2]),
            grades(&[0, 1, 2]),
            &[(1, 1), (2, 2)],
        )
        .unwrap();
        let path = find_path(&arrangement).unwrap();
        assert!(path.len() <= 2 * arrangement.num_faces() as usize - 2);

        let mut visited = vec![false; arrangement.num_faces() as usize];
        visited[root_face(&arrangement).index()] = true;
        for &step in &path {
            let face = arrangement.he(step).face.expect("path step into outer face");
            visited[face.index()] = true;
            assert!(
                arrangement.he(step).anchor.is_some(),
                "every crossing is an anchor line"
            );
        }
        assert!(visited.iter().all(|&v| v), "all faces visited");
    }

    #[test]
    fn forward_steps_enter_new_faces_exactly_once() {
        let arrangement = build_arrangement(
            grades(&[0, 1, 2]),
            grades(&[0, 1, 2]),
            &[(0, 0), (1, 1), (2, 2)],
        )
        .unwrap();
        let path = find_path(&arrangement).unwrap();
        let mut seen = vec![false; arrangement.num_faces() as usize];
        seen[root_face(&arrangement).index()] = true;
        let mut forward = 0;
        for &step in &path {
            let face = arrangement.he(step).face.unwrap();
            if !seen[face.index()] {
                seen[face.index()] = true;
                forward += 1;
            }
        }
        assert_eq!(forward as u32, arrangement.num_faces() - 1);
    }
}
