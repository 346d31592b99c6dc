/// Chart colors in Bootstrap theme order.
pub const BASE_PALETTE: [&str; 11] = [
    "#dc3545", // danger
    "#fd7e14", // orange
    "#ffc107", // warning
    "#0dcaf0", // info
    "#6610f2", // indigo
    "#6f42c1", // purple
    "#d63384", // pink
    "#198754", // success
    "#20c997", // teal
    "#0d6efd", // primary
    "#6c757d", // secondary
];

/// Color of the category at `index`. Past the base palette the palette
/// repeats, brightened by `floor(index / 11 × 20)` per channel. The result
/// for a given index never depends on how many categories exist.
pub fn color_for_index(index: usize) -> String {
    let base = BASE_PALETTE[index % BASE_PALETTE.len()];
    if index < BASE_PALETTE.len() {
        return base.to_string();
    }
    let offset = i32::try_from(index * 20 / BASE_PALETTE.len()).unwrap_or(i32::MAX);
    adjust_brightness(base, offset)
}

pub fn generate_colors(count: usize) -> Vec<String> {
    (0..count).map(color_for_index).collect()
}

/// Adds `offset` to each channel of a `#rrggbb` color, clamped to 0..=255.
/// Malformed input is returned unchanged.
pub fn adjust_brightness(hex: &str, offset: i32) -> String {
    let Some(digits) = hex.strip_prefix('#').filter(|d| d.len() == 6) else {
        return hex.to_string();
    };

    let mut channels = [0_u8; 3];
    for (slot, channel) in channels.iter_mut().enumerate() {
        let Some(Ok(value)) = digits
            .get(slot * 2..slot * 2 + 2)
            .map(|pair| u8::from_str_radix(pair, 16))
        else {
            return hex.to_string();
        };
        let shifted = (i32::from(value) + offset).clamp(0, 255);
        *channel = u8::try_from(shifted).unwrap_or(u8::MAX);
    }

    format!(
        "#{:02x}{:02x}{:02x}",
        channels[0], channels[1], channels[2]
    )
}
