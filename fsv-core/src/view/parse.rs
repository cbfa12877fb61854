//! src/view/parse.rs
//! ============================================================================
//! # Line parser
//!
//! Splits a (possibly user-edited) listing line back into its regions: the
//! identity token, one byte range per column, and the name. Used by the
//! cursor constraint, which only needs to know where regions start.

use std::{ops::Range, sync::Arc};

use crate::{
    model::entry::EntryId,
    view::{
        columns::Column,
        format::{LINK_ARROW, parse_id},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRegion {
    pub range: Range<usize>,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub id: EntryId,
    pub columns: Vec<ColumnRegion>,
    /// Name region, excluding any link target.
    pub name: Range<usize>,
}

impl ParsedLine {
    /// Leftmost byte offset of an editable region, the name included.
    #[must_use]
    pub fn first_editable(&self) -> usize {
        self.columns
            .iter()
            .filter(|region| region.mutable)
            .map(|region| region.range.start)
            .fold(self.name.start, usize::min)
    }
}

fn skip_spaces(line: &str, at: usize) -> usize {
    at + line[at..].bytes().take_while(|&b| b == b' ').count()
}

/// Parse `line` against `columns`. `None` when the identity token is missing
/// or a column cannot find its value.
#[must_use]
pub fn parse_line(line: &str, columns: &[Arc<dyn Column>]) -> Option<ParsedLine> {
    let (id, mut pos) = parse_id(line)?;

    let mut regions = Vec::with_capacity(columns.len());
    for column in columns {
        pos = skip_spaces(line, pos);
        let (value, _rest) = column.parse(&line[pos..])?;
        regions.push(ColumnRegion {
            range: pos..pos + value.len(),
            mutable: column.is_mutable(),
        });
        pos += value.len();
    }

    pos = skip_spaces(line, pos);
    let tail = &line[pos..];
    let arrow = format!(" {LINK_ARROW} ");
    let name_len = tail.find(&arrow).unwrap_or(tail.len());
    Some(ParsedLine {
        id,
        columns: regions,
        name: pos..pos + name_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::columns::{MtimeColumn, PermissionsColumn, SizeColumn};

    fn columns() -> Vec<Arc<dyn Column>> {
        vec![
            Arc::new(PermissionsColumn),
            Arc::new(SizeColumn),
            Arc::new(MtimeColumn::default()),
        ]
    }

    #[test]
    fn test_splits_columns_and_name() {
        let line = "/012 rw-r--r-- 1.2KiB Mar 04 09:15 notes.md";
        let parsed = parse_line(line, &columns()).expect("parse");

        assert_eq!(parsed.id, 12);
        assert_eq!(&line[parsed.columns[0].range.clone()], "rw-r--r--");
        assert_eq!(&line[parsed.columns[1].range.clone()], "1.2KiB");
        assert_eq!(&line[parsed.columns[2].range.clone()], "Mar 04 09:15");
        assert_eq!(&line[parsed.name.clone()], "notes.md");
        assert_eq!(parsed.first_editable(), 5);
    }

    #[test]
    fn test_link_target_is_not_part_of_name() {
        let line = "/003 latest/ -> releases/v2/";
        let parsed = parse_line(line, &[]).expect("parse");
        assert_eq!(&line[parsed.name.clone()], "latest/");
    }

    #[test]
    fn test_padding_between_columns_is_skipped() {
        let line = "/003 -      -  docs/";
        let cols: Vec<Arc<dyn Column>> = vec![Arc::new(SizeColumn), Arc::new(PermissionsColumn)];
        let parsed = parse_line(line, &cols).expect("parse");
        assert_eq!(parsed.columns[1].range, 12..13);
        assert_eq!(parsed.name.start, 15);
        assert_eq!(parsed.first_editable(), 12);
    }

    #[test]
    fn test_missing_identity_or_column_fails() {
        assert!(parse_line("notes.md", &[]).is_none());
        assert!(parse_line("/001 ", &columns()).is_none());
    }
}
