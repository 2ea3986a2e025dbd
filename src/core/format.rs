// src/core/format.rs

//! Expansion of `SnapshotFormat` templates.
//!
//! A template is a path with printf-style integer verbs, e.g.
//! `/sims/L125/snapdir_%03d/snapshot_%03d.%d`. Each verb is paired with one
//! entry of `SnapshotFormatMeanings`, which says whether it receives the
//! snapshot index, the next block coordinate, or a value that is ignored (0).

use crate::models::FormatMeaning;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

lazy_static! {
    // `%%` is a literal percent sign; `%d`, `%5d` and `%05d` are integer verbs.
    static ref VERB_RE: Regex = Regex::new(r"%(?:(%)|(0?)(\d*)d)").unwrap();
}

/// The widest padding a verb may ask for.
pub const MAX_VERB_WIDTH: usize = 64;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error(
        "SnapshotFormat '{format}' contains {verbs} verb(s) but SnapshotFormatMeanings has {meanings} entries."
    )]
    MeaningCount {
        format: String,
        verbs: usize,
        meanings: usize,
    },
    #[error(
        "SnapshotFormatMeanings uses {used} Block entries but BlockMins/BlockMaxes describe {axes} axes."
    )]
    BlockCount { used: usize, axes: usize },
    #[error(
        "SnapshotFormat '{format}' pads a verb to '{width}' characters; the limit is {}.",
        MAX_VERB_WIDTH
    )]
    VerbWidth { format: String, width: String },
    #[error("SnapshotFormat '{format}' was filled with {given} block coordinate(s), needs {needed}.")]
    MissingBlock {
        format: String,
        given: usize,
        needed: usize,
    },
}

/// Counts the integer verbs in a format template (`%%` does not count).
pub fn count_verbs(format: &str) -> usize {
    VERB_RE
        .captures_iter(format)
        .filter(|caps| caps.get(1).is_none())
        .count()
}

/// The padding width of a verb, or `None` when it is over [`MAX_VERB_WIDTH`].
fn verb_width(caps: &Captures<'_>) -> Option<usize> {
    match caps.get(3).map(|m| m.as_str()) {
        None | Some("") => Some(0),
        Some(digits) => digits.parse::<usize>().ok().filter(|w| *w <= MAX_VERB_WIDTH),
    }
}

fn wide_verb(format: &str) -> Option<FormatError> {
    VERB_RE
        .captures_iter(format)
        .filter(|caps| caps.get(1).is_none())
        .find(|caps| verb_width(caps).is_none())
        .map(|caps| FormatError::VerbWidth {
            format: format.to_string(),
            width: caps.get(3).map(|m| m.as_str()).unwrap_or_default().to_string(),
        })
}

/// Checks that a template, its meanings and the block ranges agree with each other.
pub fn check_layout(
    format: &str,
    meanings: &[FormatMeaning],
    block_axes: usize,
) -> Result<(), FormatError> {
    if let Some(err) = wide_verb(format) {
        return Err(err);
    }
    let verbs = count_verbs(format);
    if verbs != meanings.len() {
        return Err(FormatError::MeaningCount {
            format: format.to_string(),
            verbs,
            meanings: meanings.len(),
        });
    }
    let used = meanings
        .iter()
        .filter(|m| **m == FormatMeaning::Block)
        .count();
    if used != block_axes {
        return Err(FormatError::BlockCount {
            used,
            axes: block_axes,
        });
    }
    Ok(())
}

/// Fills the verbs of `format` for one snapshot and one block coordinate.
///
/// `block` holds one coordinate per `Block` meaning, consumed in order.
pub fn expand(
    format: &str,
    meanings: &[FormatMeaning],
    snap: i64,
    block: &[i64],
) -> Result<String, FormatError> {
    if let Some(err) = wide_verb(format) {
        return Err(err);
    }
    let mut meanings_iter = meanings.iter();
    let mut block_iter = block.iter();
    let mut starved = false;

    let expanded = VERB_RE.replace_all(format, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            return "%".to_string();
        }
        let value = match meanings_iter.next() {
            Some(FormatMeaning::Snapshot) => snap,
            Some(FormatMeaning::Block) => match block_iter.next() {
                Some(coord) => *coord,
                None => {
                    starved = true;
                    0
                }
            },
            Some(FormatMeaning::Ignore) | None => 0,
        };
        let zero_pad = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        let width = verb_width(caps).unwrap_or(0);
        if zero_pad {
            format!("{value:0width$}")
        } else {
            format!("{value:width$}")
        }
    });

    if starved {
        let needed = meanings
            .iter()
            .filter(|m| **m == FormatMeaning::Block)
            .count();
        return Err(FormatError::MissingBlock {
            format: format.to_string(),
            given: block.len(),
            needed,
        });
    }
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use FormatMeaning::{Block, Ignore, Snapshot};

    #[test]
    fn test_count_verbs() {
        assert_eq!(count_verbs("snap_%03d.%d"), 2);
        assert_eq!(count_verbs("100%% done_%d"), 1);
        assert_eq!(count_verbs("no_verbs_here"), 0);
    }

    #[test]
    fn test_expand_gadget_style() {
        let path = expand(
            "/sims/snapdir_%03d/snapshot_%03d.%d",
            &[Snapshot, Snapshot, Block],
            7,
            &[12],
        )
        .unwrap();
        assert_eq!(path, "/sims/snapdir_007/snapshot_007.12");
    }

    #[test]
    fn test_expand_multi_axis_blocks_and_ignore() {
        let path = expand(
            "s%d/%d_%d_%d.%2d",
            &[Snapshot, Block, Block, Block, Ignore],
            3,
            &[1, 2, 3],
        )
        .unwrap();
        assert_eq!(path, "s3/1_2_3. 0");
    }

    #[test]
    fn test_expand_reports_missing_block() {
        let err = expand("snap.%d", &[Block], 0, &[]).unwrap_err();
        assert_eq!(
            err,
            FormatError::MissingBlock {
                format: "snap.%d".to_string(),
                given: 0,
                needed: 1
            }
        );
    }

    #[test]
    fn test_over_wide_verbs_are_rejected() {
        let err = expand("snap_%070000d", &[Snapshot], 1, &[]).unwrap_err();
        assert!(matches!(err, FormatError::VerbWidth { ref width, .. } if width == "70000"));
        assert!(matches!(
            check_layout("snap_%99999999999999999999999d", &[Snapshot], 0),
            Err(FormatError::VerbWidth { .. })
        ));
        assert_eq!(expand("s_%064d", &[Snapshot], 1, &[]).unwrap().len(), 66);
    }

    #[test]
    fn test_check_layout() {
        assert!(check_layout("s_%d.%d", &[Snapshot, Block], 1).is_ok());
        assert!(matches!(
            check_layout("s_%d.%d", &[Snapshot], 1),
            Err(FormatError::MeaningCount { verbs: 2, meanings: 1, .. })
        ));
        assert!(matches!(
            check_layout("s_%d.%d", &[Snapshot, Block], 3),
            Err(FormatError::BlockCount { used: 1, axes: 3 })
        ));
    }
}
