//! Peeler (§4.5): 3-uniform hypergraph peeling for minimal perfect hashing.
//!
//! Grounded on the FIFO degree-1 walk in
//! `csf/src/ls/graph3.rs::HyperGraph::peel_with_values`, but represented the
//! way §9's design notes describe it: parallel edge arrays plus a per-vertex
//! XOR of incident edge ids, so a degree-1 vertex's sole remaining edge is
//! recovered in O(1) without a dynamically-sized adjacency list per vertex.
//!
//! The value assigned to each hinge is the classic BDZ mod-3 rank trick:
//! `val(hinge) = (hinge_pos - val(other0) - val(other1)) mod 3`, with `0`
//! stored as `3` so a hinge's slot is always non-zero (vertices that are
//! never anyone's hinge stay at the array's zero-initialized `0`). Both uses
//! read back through `% 3` (`3 % 3 == 0`): [`crate::rank2`] counts
//! non-zero slots to rank hinges densely, while [`hinge_pos`] sums
//! `val(v) % 3` over an edge's three vertices to recover which position is
//! its hinge.
//!
//! Values must be assigned in *reverse* peel order. A hinge's formula needs
//! its two sibling vertices' values already settled — but a sibling only
//! gets its own value when it is later peeled as some other edge's hinge,
//! which (because it still had residual degree when this edge was peeled)
//! happens strictly later in forward peel order. Walking the peel stack
//! back to front processes every vertex's dependencies before the vertex
//! itself, matching `graph3.rs`'s own `.rev()` back-substitution pass.

use crate::edge::Edge3;

/// One step of the peel order: `edge`'s hinge vertex was `vertex`, which
/// stood at position `hinge_pos` (0, 1, or 2) within `edge`'s three
/// vertices.
struct PeelStep {
    edge: u32,
    vertex: u32,
    hinge_pos: u8,
}

/// Peels a bucket's hypergraph and assigns each hinge vertex a non-zero
/// 2-bit value, `0` elsewhere. Returns `None` if a non-empty 2-core
/// remains (the bucket must be retried with a fresh seed).
pub(crate) fn peel(edges: &[Edge3], vertex_count: u32) -> Option<Box<[u8]>> {
    let vc = vertex_count as usize;
    let ec = edges.len();
    let mut degree = vec![0u32; vc];
    let mut xor_edge = vec![0u32; vc];

    for (i, e) in edges.iter().enumerate() {
        for &v in e {
            degree[v as usize] += 1;
            xor_edge[v as usize] ^= i as u32;
        }
    }

    let mut queue: Vec<u32> = (0..vc as u32).filter(|&v| degree[v as usize] == 1).collect();
    let mut head = 0usize;
    let mut stack = Vec::with_capacity(ec);
    let mut edge_peeled = vec![false; ec];

    while head < queue.len() {
        let v = queue[head];
        head += 1;
        if degree[v as usize] != 1 {
            continue; // stale: degree changed after being enqueued
        }
        let e = xor_edge[v as usize];
        if edge_peeled[e as usize] {
            continue;
        }
        edge_peeled[e as usize] = true;
        let verts = edges[e as usize];
        let hinge_pos = verts.iter().position(|&x| x == v).expect("xor_edge must point at an incident edge") as u8;
        stack.push(PeelStep { edge: e, vertex: v, hinge_pos });
        degree[v as usize] = 0;
        for &w in &verts {
            if w == v { continue; }
            degree[w as usize] -= 1;
            xor_edge[w as usize] ^= e;
            if degree[w as usize] == 1 {
                queue.push(w);
            }
        }
    }

    if stack.len() != ec {
        return None;
    }

    let mut val = vec![0u8; vc];
    for step in stack.iter().rev() {
        let verts = edges[step.edge as usize];
        let sum: u32 = verts.iter().map(|&x| val[x as usize] as u32 % 3).sum();
        let need = (step.hinge_pos as i64 - sum as i64).rem_euclid(3) as u8;
        val[step.vertex as usize] = if need == 0 { 3 } else { need };
    }
    Some(val.into_boxed_slice())
}

/// Recovers which of `edge`'s three vertices is the hinge, given their
/// current 2-bit values (`0` for "never a hinge", `1..=3` otherwise, `3`
/// standing for a stored `0`). Used both by [`crate::lookup`] and by this
/// module's own tests.
pub(crate) fn hinge_pos(edge: Edge3, val_at: impl Fn(u32) -> u8) -> u8 {
    let sum: u32 = edge.iter().map(|&v| val_at(v) as u32 % 3).sum();
    (sum % 3) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges_from(triples: &[(u32, u32, u32)]) -> Vec<Edge3> {
        triples.iter().map(|&(a, b, c)| [a, b, c]).collect()
    }

    #[test]
    fn peels_a_small_acyclic_bucket() {
        // A chain where every edge has at least one vertex unique to it.
        let edges = edges_from(&[(0, 1, 2), (2, 3, 4), (4, 5, 6)]);
        let val = peel(&edges, 7).expect("should peel");
        for &edge in &edges {
            let p = hinge_pos(edge, |v| val[v as usize]);
            let hinge_vertex = edge[p as usize];
            assert_ne!(val[hinge_vertex as usize], 0, "computed hinge {hinge_vertex} of {edge:?} has a zero slot");
            // Every other vertex of the edge must not independently decode
            // as this edge's hinge by coincidence of position.
            for (pos, &v) in edge.iter().enumerate() {
                if pos as u8 != p {
                    assert_ne!(v, hinge_vertex);
                }
            }
        }
        // Exactly one vertex per edge ends up with the edge's decoded hinge.
        let mut hinge_vertices: Vec<u32> = edges.iter().map(|&e| e[hinge_pos(e, |v| val[v as usize]) as usize]).collect();
        hinge_vertices.sort_unstable();
        hinge_vertices.dedup();
        assert_eq!(hinge_vertices.len(), edges.len(), "hinge vertices must be distinct across edges");
    }

    #[test]
    fn fails_on_a_tight_cycle() {
        // Three edges over three vertices: every vertex has degree > 1 from
        // the start, so no peeling step is ever possible.
        let edges = edges_from(&[(0, 1, 2), (0, 1, 2), (0, 1, 2)]);
        assert!(peel(&edges, 3).is_none());
    }

    #[test]
    fn single_edge_peels_trivially() {
        let edges = edges_from(&[(0, 1, 2)]);
        let val = peel(&edges, 3).unwrap();
        let hinges: Vec<_> = val.iter().enumerate().filter(|&(_, &v)| v != 0).collect();
        assert_eq!(hinges.len(), 1);
        let p = hinge_pos(edges[0], |v| val[v as usize]);
        assert_eq!(edges[0][p as usize] as usize, hinges[0].0);
    }

    #[test]
    fn denser_bucket_with_shared_vertices_decodes_consistently() {
        // Vertex 2 is shared by two edges; only peelable via reverse order.
        let edges = edges_from(&[(0, 1, 2), (2, 3, 4), (1, 4, 5)]);
        let val = peel(&edges, 6).expect("should peel");
        let mut hinge_vertices = Vec::new();
        for &edge in &edges {
            let p = hinge_pos(edge, |v| val[v as usize]);
            hinge_vertices.push(edge[p as usize]);
        }
        hinge_vertices.sort_unstable();
        hinge_vertices.dedup();
        assert_eq!(hinge_vertices.len(), edges.len());
    }
}
