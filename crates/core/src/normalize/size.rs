//! Human-readable size parsing ("700.0 MiB" -> bytes).

/// Sentinel for an unknown or unresolved size.
pub const UNKNOWN_SIZE: i64 = -1;

const KIB: f64 = 1024.0;

/// Byte multiplier for a size unit.
///
/// Decimal-looking units (`KB`, `MB`, ...) are treated as binary multiples,
/// which is what index sites mean by them. Unknown units map to 1.
pub fn unit_multiplier(unit: &str) -> f64 {
    match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" | "byte" | "bytes" => 1.0,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => KIB * KIB,
        "g" | "gb" | "gib" => KIB * KIB * KIB,
        "t" | "tb" | "tib" => KIB * KIB * KIB * KIB,
        "p" | "pb" | "pib" => KIB * KIB * KIB * KIB * KIB,
        _ => 1.0,
    }
}

/// Parse a size string into bytes.
///
/// Accepts `"700.0 MiB"`, `"1,024 KB"`, `"1.5GB"`, `"734003200"`. Returns
/// [`UNKNOWN_SIZE`] when no number can be read (e.g. `"N/A"`).
pub fn parse_size(text: &str) -> i64 {
    let text = text.trim();
    if text.is_empty() {
        return UNKNOWN_SIZE;
    }

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(text.len());
    let (amount, unit) = text.split_at(split);
    let amount: String = amount.chars().filter(|c| *c != ',').collect();

    let value = match amount.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => return UNKNOWN_SIZE,
    };

    // Units may be followed by extra words ("MiB total"), only the first counts.
    let unit = unit.split_whitespace().next().unwrap_or("");
    (value * unit_multiplier(unit)).round() as i64
}
