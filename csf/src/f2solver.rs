//! F₂Solver (§4.6): lazy Gaussian elimination over a 3-uniform equation
//! hypergraph, with a peeling fast path and a dense fallback for the
//! residual 2-core.
//!
//! The peeling phase reuses the hinge-finding shape of [`crate::peeler`]
//! (a variable with exactly one remaining equation is this module's
//! analogue of a degree-1 vertex), generalised so an equation carries an
//! arbitrary `b`-bit known term rather than a 2-bit hinge tag. The dense
//! phase is new: the reference workspace's `ls` module has no fallback for
//! a non-empty 2-core, it simply fails the bucket (see `DESIGN.md`).

/// One equation: the (deduplicated, since an index can appear twice and
/// cancel mod 2) set of variable indices still unresolved, and the known
/// term the variables must XOR to.
#[derive(Clone)]
struct Equation {
    vars: Vec<u32>,
    rhs: u64,
}

fn dedup_xor(mut vars: Vec<u32>) -> Vec<u32> {
    vars.sort_unstable();
    let mut out = Vec::with_capacity(vars.len());
    let mut i = 0;
    while i < vars.len() {
        let mut j = i + 1;
        while j < vars.len() && vars[j] == vars[i] { j += 1; }
        if (j - i) % 2 == 1 {
            out.push(vars[i]);
        }
        i = j;
    }
    out
}

/// Solves for `x: [u64; vertex_count]` such that every equation's variables
/// XOR to its known term. Returns `None` if the system is inconsistent.
pub(crate) fn solve(raw_equations: &[(Vec<u32>, u64)], vertex_count: u32) -> Option<Box<[u64]>> {
    let vc = vertex_count as usize;
    let original: Vec<Equation> = raw_equations
        .iter()
        .map(|(vars, rhs)| Equation { vars: dedup_xor(vars.clone()), rhs: *rhs })
        .collect();
    let ec = original.len();

    let mut live: Vec<Vec<u32>> = original.iter().map(|e| e.vars.clone()).collect();
    let mut resolved = vec![false; ec];
    let mut trivial = vec![false; ec]; // weight reached 0 without ever pivoting

    // inverse index: for each variable, the equations that currently list it
    let mut var_eqs: Vec<Vec<u32>> = vec![Vec::new(); vc];
    for (i, e) in live.iter().enumerate() {
        for &v in e {
            var_eqs[v as usize].push(i as u32);
        }
    }

    // 8-bucket priority lane (§9): index 7 is the "≥7" catch-all. Weight
    // here never exceeds 3 (equations start with at most 3 variables), so
    // only buckets 0..=3 are ever populated, but the shape matches §9.
    let mut buckets: [std::collections::VecDeque<u32>; 8] = Default::default();
    let weight = |live: &[Vec<u32>], e: usize| live[e].len();
    for i in 0..ec {
        buckets[weight(&live, i).min(7)].push_back(i as u32);
    }

    let mut pivot_order: Vec<(u32, u32)> = Vec::new(); // (equation, pivot var), forward order

    'peel: loop {
        for b in 0..=1usize {
            while let Some(e) = buckets[b].pop_front() {
                let ei = e as usize;
                if resolved[ei] { continue; }
                let w = weight(&live, ei);
                if w != b { continue; } // stale entry from an earlier weight
                if w == 0 {
                    resolved[ei] = true;
                    trivial[ei] = true;
                    continue 'peel;
                }
                // w == 1: pivot
                let pivot = live[ei][0];
                resolved[ei] = true;
                pivot_order.push((e, pivot));
                for &f in &var_eqs[pivot as usize].clone() {
                    let fi = f as usize;
                    if fi == ei || resolved[fi] { continue; }
                    if let Some(pos) = live[fi].iter().position(|&x| x == pivot) {
                        live[fi].swap_remove(pos);
                        let nw = weight(&live, fi).min(7);
                        buckets[nw].push_back(f);
                    }
                }
                continue 'peel;
            }
        }
        break;
    }

    let residual: Vec<usize> = (0..ec).filter(|&i| !resolved[i]).collect();

    let mut x = vec![0u64; vc];

    if !residual.is_empty() {
        // Collect the distinct surviving variables across residual
        // equations and solve them as one dense F2 system: forward
        // elimination (word-wise XOR over one bit per surviving variable)
        // followed by descending-column back-substitution.
        let mut col_of_var = vec![usize::MAX; vc];
        let mut vars_of_col = Vec::new();
        for &i in &residual {
            for &v in &live[i] {
                if col_of_var[v as usize] == usize::MAX {
                    col_of_var[v as usize] = vars_of_col.len();
                    vars_of_col.push(v);
                }
            }
        }
        let k = vars_of_col.len();
        let words = k.div_ceil(64).max(1);

        struct Row { bits: Vec<u64>, rhs: u64 }
        let mut rows: Vec<Row> = residual
            .iter()
            .map(|&i| {
                let mut bits = vec![0u64; words];
                for &v in &live[i] {
                    let c = col_of_var[v as usize];
                    bits[c / 64] |= 1u64 << (c % 64);
                }
                Row { bits, rhs: original[i].rhs }
            })
            .collect();

        let mut row_of_col = vec![usize::MAX; k];
        let mut pivot_row_used = vec![false; rows.len()];

        // Forward elimination only (not reduced): a column's bit is cleared
        // from rows not yet claimed as someone else's pivot. A pivot row can
        // therefore still carry bits at columns processed after its own —
        // those are resolved below by back-substituting in descending
        // column order, the same dependency direction as `peeler`'s reverse
        // pass (a pivot's defining row only ever references variables
        // pinned down later in this construction).
        for col in 0..k {
            let word = col / 64;
            let bit = 1u64 << (col % 64);
            let Some(pivot_r) = (0..rows.len()).find(|&r| !pivot_row_used[r] && rows[r].bits[word] & bit != 0) else {
                continue; // free variable: no constraint pins it, leave at 0
            };
            pivot_row_used[pivot_r] = true;
            row_of_col[col] = pivot_r;
            for r in 0..rows.len() {
                if pivot_row_used[r] { continue; }
                if rows[r].bits[word] & bit != 0 {
                    let (rhs_pivot, bits_pivot) = (rows[pivot_r].rhs, rows[pivot_r].bits.clone());
                    rows[r].rhs ^= rhs_pivot;
                    for w in 0..words {
                        rows[r].bits[w] ^= bits_pivot[w];
                    }
                }
            }
        }

        for r in 0..rows.len() {
            if !pivot_row_used[r] && rows[r].rhs != 0 {
                return None; // rank deficiency against a non-zero right-hand side
            }
        }

        for col in (0..k).rev() {
            let r = row_of_col[col];
            if r == usize::MAX {
                continue; // free variable, stays 0
            }
            let mut acc = rows[r].rhs;
            for (c, &v) in vars_of_col.iter().enumerate() {
                if c == col { continue; }
                let w = c / 64;
                let m = 1u64 << (c % 64);
                if rows[r].bits[w] & m != 0 {
                    acc ^= x[v as usize];
                }
            }
            x[vars_of_col[col] as usize] = acc;
        }
    }

    // Back-substitute pivots in the order they were found: every other
    // variable an equation originally named was either pivoted earlier in
    // this list, or resolved by the dense phase above, both of which
    // already happened.
    for &(e, pivot) in &pivot_order {
        let ei = e as usize;
        let mut acc = original[ei].rhs;
        for &v in &original[ei].vars {
            if v != pivot {
                acc ^= x[v as usize];
            }
        }
        x[pivot as usize] = acc;
    }

    // Verify every equation whose weight reached 0 without pivoting.
    for (i, eq) in original.iter().enumerate() {
        if trivial[i] {
            let acc = eq.vars.iter().fold(0u64, |acc, &v| acc ^ x[v as usize]);
            if acc != eq.rhs {
                return None;
            }
        }
    }

    Some(x.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_simple_peelable_system() {
        let eqs = vec![
            (vec![0, 1, 2], 5u64),
            (vec![2, 3, 4], 9u64),
            (vec![4, 5, 6], 1u64),
        ];
        let x = solve(&eqs, 7).expect("solvable");
        for (vars, rhs) in &eqs {
            let acc = vars.iter().fold(0u64, |a, &v| a ^ x[v as usize]);
            assert_eq!(acc, *rhs);
        }
    }

    #[test]
    fn solves_a_system_needing_the_dense_fallback() {
        // A 3-cycle over {0,1,2}: no variable ever has a unique equation, so
        // peeling alone cannot proceed; the dense phase must handle it.
        let eqs = vec![
            (vec![0, 1], 3u64),
            (vec![1, 2], 6u64),
            (vec![0, 2], 5u64),
        ];
        let x = solve(&eqs, 3).expect("solvable via dense fallback");
        for (vars, rhs) in &eqs {
            let acc = vars.iter().fold(0u64, |a, &v| a ^ x[v as usize]);
            assert_eq!(acc, *rhs);
        }
    }

    #[test]
    fn detects_inconsistent_dense_system() {
        let eqs = vec![
            (vec![0, 1], 1u64),
            (vec![1, 2], 1u64),
            (vec![0, 2], 1u64), // XOR of all three rows forces 0 = 1
        ];
        assert!(solve(&eqs, 3).is_none());
    }

    #[test]
    fn detects_inconsistent_trivial_equation() {
        // Two equations on the same pair with conflicting right-hand sides;
        // once one is a pivot and folded into the other, the other collapses
        // to weight 0 with a non-zero residual term.
        let eqs = vec![
            (vec![0, 1], 7u64),
            (vec![0, 1], 8u64),
        ];
        assert!(solve(&eqs, 2).is_none());
    }

    #[test]
    fn duplicate_variable_in_one_equation_cancels() {
        // vertex 0 appears twice, cancels mod 2, leaving a single-variable
        // equation on vertex 1.
        let eqs = vec![(vec![0, 0, 1], 4u64)];
        let x = solve(&eqs, 2).unwrap();
        assert_eq!(x[1], 4);
    }

    #[test]
    fn free_variable_defaults_to_zero() {
        let eqs = vec![(vec![0, 1], 2u64)];
        let x = solve(&eqs, 3).unwrap();
        assert_eq!(x[2], 0);
        assert_eq!(x[0] ^ x[1], 2);
    }
}
