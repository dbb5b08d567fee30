//! Physical naming rules.
//!
//! Maps host-domain identifiers (catalog paths, representation parameters,
//! timestamps) onto names the target tool accepts. Sanitization is
//! all-or-nothing: a parameter value that cannot be reduced to a legal
//! identifier fails the whole operation so no malformed dataset is ever
//! created.

use std::time::Duration;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::catalog::Representation;
use crate::util::{Error, Result};

/// Prefix shared by every representation dataset.
pub const DATASET_PREFIX: &str = "dataset_";

const FILE_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]-[minute]-[second]");

/// Physical group name for a catalog path: leading separators stripped,
/// remaining separators replaced with underscores.
pub fn catalog_group_name(path: &str) -> String {
    path.trim_start_matches('/').replace('/', "_")
}

/// Physical dataset name for a representation:
/// `dataset_<id>[_<key>_<value>]*`.
pub fn dataset_name(representation: &Representation) -> Result<String> {
    let suffix = parameter_suffix(&representation.parameters)?;
    Ok(format!("{DATASET_PREFIX}{}{suffix}", representation.id))
}

/// Deterministic `_k1_v1_k2_v2...` suffix in parameter order; empty when the
/// representation has no parameters.
pub fn parameter_suffix(parameters: &[(String, String)]) -> Result<String> {
    let mut suffix = String::new();
    for (key, value) in parameters {
        if !is_legal_identifier(key) {
            return Err(Error::config(format!(
                "parameter name `{key}` is not a legal identifier"
            )));
        }
        let clean = sanitize_value(value)?;
        suffix.push('_');
        suffix.push_str(key);
        suffix.push('_');
        suffix.push_str(&clean);
    }
    Ok(suffix)
}

/// Reduce a parameter value to a legal identifier: drop illegal characters,
/// strip illegal leading characters, then validate what is left.
fn sanitize_value(raw: &str) -> Result<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let clean = stripped.trim_start_matches('_').to_string();
    if !is_legal_identifier(&clean) {
        return Err(Error::config(format!(
            "parameter value `{raw}` does not sanitize to a legal identifier"
        )));
    }
    Ok(clean)
}

/// Identifier grammar for name fragments: one ASCII alphanumeric followed by
/// alphanumerics or underscores.
fn is_legal_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Output file name:
/// `{begin:yyyy-MM-ddTHH-mm-ss}Z_{sample-period unit string}.mat`.
pub fn file_name(begin: OffsetDateTime, sample_period: Duration) -> Result<String> {
    let stamp = begin.format(&FILE_STAMP)?;
    Ok(format!("{stamp}Z_{}.mat", period_unit(sample_period)))
}

/// Render a period with the largest whole unit that divides it exactly,
/// e.g. `1s`, `100ms`, `250us`, `40ns`.
pub fn period_unit(period: Duration) -> String {
    let nanos = period.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos % 1_000_000_000 == 0 {
        format!("{}s", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{nanos}ns")
    }
}
