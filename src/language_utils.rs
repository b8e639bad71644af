use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Translation rows are keyed by short language tokens. This module validates
/// and normalizes those tokens (ISO 639-1 and ISO 639-2), optionally followed
/// by a region subtag such as `en-us` or `pt_BR`.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// Map an ISO 639-2/B code to its ISO 639-2/T equivalent
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    let part2t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(part2t)
}

/// Split a code into its primary language subtag and optional region
fn split_region(code: &str) -> (&str, Option<&str>) {
    match code.find(['-', '_']) {
        Some(pos) => (&code[..pos], Some(&code[pos + 1..])),
        None => (code, None),
    }
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
///
/// A region subtag is accepted when it is 2 letters or 3 digits.
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();
    let (primary, region) = split_region(&normalized_code);

    if let Some(region) = region {
        let valid_region = (region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()))
            || (region.len() == 3 && region.chars().all(|c| c.is_ascii_digit()));
        if !valid_region {
            return Err(anyhow!("Invalid language code: {}", code));
        }
    }

    // Check for ISO 639-1 (2-letter) code
    if primary.len() == 2 {
        if Language::from_639_1(primary).is_some() {
            return Ok(LanguageCodeType::Part1);
        }
    }
    // Check for ISO 639-2 (3-letter) code
    else if primary.len() == 3 {
        if Language::from_639_3(primary).is_some() {
            return Ok(LanguageCodeType::Part2T);
        }

        if part2b_to_part2t(primary).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
///
/// Region subtags are dropped.
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();
    let (primary, _) = split_region(&normalized_code);

    if primary.len() == 2 {
        if let Some(lang) = Language::from_639_1(primary) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if primary.len() == 3 {
        if Language::from_639_3(primary).is_some() {
            return Ok(primary.to_string());
        }

        if let Some(part2t) = part2b_to_part2t(primary) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to the storage form used for translation rows
///
/// The primary subtag becomes ISO 639-1 when one exists (ISO 639-2/T
/// otherwise) and the region subtag is kept, lowercased and joined with `-`.
pub fn normalize_language_code(code: &str) -> Result<String> {
    validate_language_code(code)?;

    let normalized_code = code.trim().to_lowercase();
    let (primary, region) = split_region(&normalized_code);
    let part2t = normalize_to_part2t(primary)?;

    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", part2t))?;
    let primary = lang.to_639_1().map(str::to_string).unwrap_or(part2t);

    Ok(match region {
        Some(region) => format!("{}-{}", primary, region),
        None => primary,
    })
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_language_code(code1), normalize_language_code(code2)) {
        (Ok(normalized1), Ok(normalized2)) => normalized1 == normalized2,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
