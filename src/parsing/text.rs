//! Text normalization shared by header mapping, file naming and show matching.

use std::collections::HashSet;

/// Replaces Spanish/Portuguese accented letters with their ASCII base letter.
pub fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Normalizes a header cell into a lookup key: "Entradas Vendidas" -> "entradas_vendidas".
pub fn normalize_key(text: &str) -> String {
    let lowered = strip_accents(text.trim()).to_lowercase();
    let mut key = String::with_capacity(lowered.len());
    let mut pending_sep = false;

    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.push(c);
        } else {
            pending_sep = true;
        }
    }

    key
}

/// File-safe slug: "Los Fabulosos Cadillacs" -> "los-fabulosos-cadillacs".
pub fn slugify(text: &str) -> String {
    let slug = normalize_key(text).replace('_', "-");
    if slug.is_empty() {
        "sin-nombre".to_string()
    } else {
        slug
    }
}

/// Canonical form of an artist or event name for matching.
pub fn normalize_name(text: &str) -> String {
    normalize_key(text).replace('_', " ")
}

/// Token-level Jaccard similarity between two names (0.0 - 1.0).
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let intersection = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    intersection / union
}

/// Minimum token similarity for two names to be considered the same show.
pub const MATCH_THRESHOLD: f64 = 0.6;

/// Fuzzy name equality used when looking up existing shows.
///
/// Names match when they normalize to the same string, when one contains the
/// other ("Duki" vs "Duki - Ameri Tour"), or when enough tokens overlap.
pub fn names_match(a: &str, b: &str) -> bool {
    let left = normalize_name(a);
    let right = normalize_name(b);

    if left.is_empty() || right.is_empty() {
        return false;
    }

    if left == right {
        return true;
    }

    let padded_left = format!(" {} ", left);
    let padded_right = format!(" {} ", right);
    if padded_left.contains(&padded_right) || padded_right.contains(&padded_left) {
        return true;
    }

    name_similarity(a, b) >= MATCH_THRESHOLD
}

/// Collapses internal whitespace (including NBSP) and trims.
pub fn clean_cell(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
