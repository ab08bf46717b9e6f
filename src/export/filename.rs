//! Artifact naming: `topotrack-YYMMDD-<slug>-<kebab-format>.<ext>`.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::foundation::error::{TopotrackError, TopotrackResult};

const PREFIX: &str = "topotrack";

/// Used when an activity name has no letters or digits left after slugifying.
const FALLBACK_SLUG: &str = "activity";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactType {
    Png,
    Svg,
    Mp4,
}

impl ArtifactType {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
            Self::Mp4 => "video/mp4",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArtifactType {
    type Err = TopotrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "mp4" => Ok(Self::Mp4),
            other => Err(TopotrackError::validation(format!(
                "unknown artifact type '{other}' (expected png, svg or mp4)"
            ))),
        }
    }
}

/// Lowercase, diacritics stripped, runs of anything that is not a letter or digit collapsed to
/// a single `-`, no leading or trailing `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut gap = false;
    for c in s.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('-');
            }
            gap = false;
            out.extend(c.to_lowercase());
        } else {
            gap = true;
        }
    }
    out
}

/// Like [`slugify`], but also splits `camelCase` and `PascalCase` words.
pub fn kebab_case(s: &str) -> String {
    let mut spaced = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if let Some(p) = prev
            && c.is_uppercase()
            && (p.is_lowercase() || p.is_ascii_digit())
        {
            spaced.push(' ');
        }
        spaced.push(c);
        prev = Some(c);
    }
    slugify(&spaced)
}

/// `2024-05-03T06:45:00Z` → `240503`. Only the leading `YYYY-MM-DD` is read.
pub fn date_stamp(date_iso: &str) -> TopotrackResult<String> {
    let head = date_iso
        .trim()
        .get(..10)
        .ok_or_else(|| TopotrackError::validation(format!("invalid activity date '{date_iso}'")))?;
    let date = NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|e| {
        TopotrackError::validation(format!("invalid activity date '{date_iso}': {e}"))
    })?;
    Ok(date.format("%y%m%d").to_string())
}

/// Deterministic download name for an export.
pub fn artifact_filename(
    date_iso: &str,
    activity_name: &str,
    format_name: &str,
    kind: ArtifactType,
) -> TopotrackResult<String> {
    let stamp = date_stamp(date_iso)?;
    let mut slug = slugify(activity_name);
    if slug.is_empty() {
        slug.push_str(FALLBACK_SLUG);
    }
    let format = kebab_case(format_name);
    if format.is_empty() {
        return Err(TopotrackError::validation(format!(
            "format name '{format_name}' has no usable characters"
        )));
    }
    Ok(format!(
        "{PREFIX}-{stamp}-{slug}-{format}.{}",
        kind.extension()
    ))
}
