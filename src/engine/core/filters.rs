use super::state::FilterSet;

/// Join the enabled filter fragments into one `-vf` expression.
///
/// Order is fixed: crop, scale, setdar, setsar, rotation, deinterlace or
/// interlace, denoise. Returns an empty string when nothing is enabled.
pub fn compose(filters: &FilterSet) -> String {
    let lacing = filters.deinterlace.as_ref().or(filters.interlace.as_ref());
    [
        filters.crop.as_ref(),
        filters.scale.as_ref(),
        filters.setdar.as_ref(),
        filters.setsar.as_ref(),
        filters.rotate.as_ref(),
        lacing,
        filters.denoise.as_ref(),
    ]
    .into_iter()
    .flatten()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(",")
}
