use sha2::{Digest, Sha256};

/// Seed derived from the prompt text: the first four bytes of its SHA-256 digest.
/// Identical prompts always give the same seed.
pub fn prompt_seed(prompt: &str) -> u32 {
    let digest = Sha256::digest(prompt.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Clamps to [0, 1], replacing non-finite values with `fallback`
pub fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Joins the non-empty parts with a single space
pub fn join_non_empty<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_a_pure_function_of_the_prompt() {
        let a = prompt_seed("a cat, cyberpunk style");
        assert_eq!(a, prompt_seed("a cat, cyberpunk style"));
        assert_ne!(a, prompt_seed("a dog, cyberpunk style"));
        // SHA-256("abc") starts with ba7816bf
        assert_eq!(prompt_seed("abc"), 0xba7816bf);
    }

    #[test]
    fn clamp_unit_handles_out_of_range_and_nan() {
        assert_eq!(clamp_unit(1.4, 0.5), 1.0);
        assert_eq!(clamp_unit(-0.2, 0.5), 0.0);
        assert_eq!(clamp_unit(f64::NAN, 0.5), 0.5);
        assert_eq!(clamp_unit(0.3, 0.5), 0.3);
    }

    #[test]
    fn join_skips_missing_and_blank_parts() {
        assert_eq!(
            join_non_empty([Some("赛博朋克"), None, Some(" "), Some("a cat")]),
            "赛博朋克 a cat"
        );
        assert_eq!(join_non_empty([None, Some("")]), "");
    }
}
