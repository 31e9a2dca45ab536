//! Packer parameter flattening
//!
//! Merged option bags accumulate `params` from every ancestor, so the same
//! flag can appear several times. Flattening keeps the last occurrence of
//! each flag (the most specific node wins), except `--variant`, whose every
//! occurrence is kept in order.

use crate::error::{PackError, PackResult};
use std::collections::HashSet;

/// Flag whose occurrences accumulate instead of overriding each other
pub const MULTI_VALUED_FLAG: &str = "--variant";

/// Flags that take no value
const SWITCHES: &[&str] = &[
    "--multipack",
    "--enable-rotation",
    "--disable-rotation",
    "--disable-auto-alias",
    "--flip-pvr",
    "--premultiply-alpha",
    "--force-squared",
    "--force-word-aligned",
    "--force-identical-layout",
    "--reduce-border-artifacts",
    "--disable-clean-transparency",
    "--shape-debug",
    "--trim-sprite-names",
    "--prepend-folder-name",
];

/// Whether a token is a flag rather than a value
pub fn is_flag(token: &str) -> bool {
    token.starts_with("--")
}

/// Whether a flag is a valueless switch
pub fn is_switch(flag: &str) -> bool {
    SWITCHES.contains(&flag)
}

/// One flag with its value (switches carry none)
#[derive(Debug, Clone, PartialEq, Eq)]
struct Param {
    flag: String,
    value: Option<String>,
}

/// Reduce a raw token stream to a deduplicated one.
///
/// Scans in reverse: values become pending until the flag before them
/// claims them, and a flag already seen later in the stream is dropped.
pub fn flatten(tokens: &[String]) -> PackResult<Vec<String>> {
    let mut kept: Vec<Param> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut pending: Option<&str> = None;

    for token in tokens.iter().rev() {
        if !is_flag(token) {
            if let Some(orphan) = pending {
                return Err(PackError::InvalidParameterSequence(format!(
                    "value '{}' is not preceded by a flag",
                    orphan
                )));
            }
            pending = Some(token.as_str());
            continue;
        }

        let value = if is_switch(token) {
            if let Some(stray) = pending {
                return Err(PackError::InvalidParameterSequence(format!(
                    "switch '{}' takes no value, got '{}'",
                    token, stray
                )));
            }
            None
        } else {
            match pending.take() {
                Some(value) => Some(value),
                None => {
                    return Err(PackError::InvalidParameterSequence(format!(
                        "flag '{}' has no value",
                        token
                    )))
                }
            }
        };

        if token != MULTI_VALUED_FLAG && !seen.insert(token.as_str()) {
            continue;
        }

        kept.push(Param {
            flag: token.clone(),
            value: value.map(str::to_string),
        });
    }

    // Leading value
    if let Some(orphan) = pending {
        return Err(PackError::InvalidParameterSequence(format!(
            "value '{}' is not preceded by a flag",
            orphan
        )));
    }

    let mut flattened = Vec::with_capacity(tokens.len());
    for param in kept.into_iter().rev() {
        flattened.push(param.flag);
        if let Some(value) = param.value {
            flattened.push(value);
        }
    }
    Ok(flattened)
}
