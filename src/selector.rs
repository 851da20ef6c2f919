/// Voxels of `indices` whose dose reaches `threshold`. `doses[k]` is the dose
/// of `indices[k]`.
pub fn select_above(
    doses: &[f64],
    indices: &[usize],
    threshold: f64,
) -> Vec<usize> {
    assert_eq!(doses.len(), indices.len());
    indices
        .iter()
        .zip(doses.iter())
        .filter(|(_, &dose)| dose >= threshold)
        .map(|(&voxel, _)| voxel)
        .collect()
}

/// Voxels of `indices` whose dose does not exceed `threshold`.
pub fn select_below(
    doses: &[f64],
    indices: &[usize],
    threshold: f64,
) -> Vec<usize> {
    assert_eq!(doses.len(), indices.len());
    indices
        .iter()
        .zip(doses.iter())
        .filter(|(_, &dose)| dose <= threshold)
        .map(|(&voxel, _)| voxel)
        .collect()
}
