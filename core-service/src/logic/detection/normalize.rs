//! Class name normalization
//!
//! Detector labels come in many spellings ("Safety Vest", "NO-Hardhat").
//! Everything downstream matches on the normalized form.

/// Lowercase, map spaces and hyphens to `_`, drop anything that is not
/// alphanumeric or `_`, and collapse repeated underscores.
pub fn normalize_class_name(class_name: &str) -> String {
    let lowered = class_name.to_lowercase().replace([' ', '-'], "_");

    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    kept.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
