use crate::DVec3;

/// Per-vertex normals averaged from the faces that touch each vertex.
///
/// Face contributions are weighted by triangle area (the unnormalized cross
/// product). Vertices not referenced by any triangle, or whose contributions
/// cancel out, get `fallback`. Triangles referencing out-of-range vertices are
/// skipped.
pub fn smooth_normals(positions: &[DVec3], indices: &[u32], fallback: DVec3) -> Vec<DVec3> {
    let mut acc = vec![DVec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(pa), Some(pb), Some(pc)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let face = (*pb - *pa).cross(*pc - *pa);
        acc[a] += face;
        acc[b] += face;
        acc[c] += face;
    }

    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(fallback))
        .collect()
}
