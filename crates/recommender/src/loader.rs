//! Readers for the Audioscrobbler text files
//!
//! - artist data: `artistId<TAB>artistName`
//! - artist alias: `badId<TAB>goodId`
//! - user artist data: `userId<SPACE>artistId<SPACE>playCount`
//!
//! Malformed lines are skipped with a warning and counted in the returned
//! [`LoadReport`]; only I/O failures abort a load.

use crate::catalog::{AliasTable, ItemCatalog};
use crate::interactions::{Interaction, Interactions};
use artist_rec_core::{RecommenderError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of loading one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub source_name: String,
    pub records: usize,
    pub skipped: usize,
}

impl LoadReport {
    fn new(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            ..Self::default()
        }
    }
}

/// Open a file for line-oriented reading
pub fn open(path: impl AsRef<Path>) -> Result<BufReader<File>> {
    let file = File::open(path.as_ref()).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.as_ref().display(), e),
        )
    })?;
    Ok(BufReader::new(file))
}

/// Read `artistId<TAB>artistName` lines into a catalog
pub fn read_item_catalog<R: BufRead>(
    reader: R,
    source_name: &str,
) -> Result<(ItemCatalog, LoadReport)> {
    let mut catalog = ItemCatalog::new();
    let report = for_each_record(reader, source_name, |line, line_no| {
        let (id, name) = line.split_once('\t').ok_or_else(|| {
            parse_error(source_name, line_no, "expected <id>\\t<name>")
        })?;
        let id = parse_id(id, source_name, line_no)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(parse_error(source_name, line_no, "empty name"));
        }
        catalog.insert(id, name);
        Ok(())
    })?;
    Ok((catalog, report))
}

/// Read `aliasId<TAB>canonicalId` lines into an alias table
pub fn read_alias_table<R: BufRead>(
    reader: R,
    source_name: &str,
) -> Result<(AliasTable, LoadReport)> {
    let mut aliases = AliasTable::new();
    let report = for_each_record(reader, source_name, |line, line_no| {
        let (alias, canonical) = line.split_once('\t').ok_or_else(|| {
            parse_error(source_name, line_no, "expected <alias>\\t<canonical>")
        })?;
        aliases.insert(
            parse_id(alias, source_name, line_no)?,
            parse_id(canonical, source_name, line_no)?,
        );
        Ok(())
    })?;
    Ok((aliases, report))
}

/// Read `userId itemId count` lines into an interaction set
pub fn read_interactions<R: BufRead>(
    reader: R,
    source_name: &str,
) -> Result<(Interactions, LoadReport)> {
    let mut interactions = Interactions::new();
    let report = for_each_record(reader, source_name, |line, line_no| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [user, item, count] = fields.as_slice() else {
            return Err(parse_error(
                source_name,
                line_no,
                &format!("expected 3 fields, found {}", fields.len()),
            ));
        };
        interactions.push(Interaction::new(
            parse_id(user, source_name, line_no)?,
            parse_id(item, source_name, line_no)?,
            parse_id(count, source_name, line_no)?,
        ));
        Ok(())
    })?;
    Ok((interactions, report))
}

fn for_each_record<R, F>(reader: R, source_name: &str, mut handle: F) -> Result<LoadReport>
where
    R: BufRead,
    F: FnMut(&str, usize) -> Result<()>,
{
    let mut reader = reader;
    let mut report = LoadReport::new(source_name);
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let outcome = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle(line.trim_end_matches(['\r', '\n']), line_no),
            Err(e) => Err(parse_error(source_name, line_no, &format!("invalid UTF-8: {}", e))),
        };
        match outcome {
            Ok(()) => report.records += 1,
            Err(e @ RecommenderError::Parse { .. }) => {
                warn!(error = %e, "Skipping malformed line");
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        source = source_name,
        records = report.records,
        skipped = report.skipped,
        "Loaded input"
    );

    Ok(report)
}

fn parse_id(raw: &str, source_name: &str, line_no: usize) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| parse_error(source_name, line_no, &format!("'{}': {}", raw.trim(), e)))
}

fn parse_error(source_name: &str, line: usize, message: &str) -> RecommenderError {
    RecommenderError::Parse {
        source_name: source_name.to_string(),
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_item_catalog_skips_malformed() {
        let input = "1134999\t06Crazy Life\n6821360\tPang Nakarin\nnot-a-number\tFoo\n10113088\n\n";
        let (catalog, report) = read_item_catalog(Cursor::new(input), "artist_data").unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(6821360), Some("Pang Nakarin"));
        assert_eq!(report.records, 2);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_read_alias_table() {
        let input = "1092764\t1000311\n1095122\t1000557\n";
        let (aliases, report) = read_alias_table(Cursor::new(input), "artist_alias").unwrap();

        assert_eq!(aliases.resolve(1092764), 1000311);
        assert_eq!(report.records, 2);
    }

    #[test]
    fn test_read_interactions() {
        let input = "1059637 1000010 238\n1059637 1000049 1\r\nbad line\n1059637 x 3\n";
        let (interactions, report) =
            read_interactions(Cursor::new(input), "user_artist_data").unwrap();

        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions.data()[0], Interaction::new(1059637, 1000010, 238));
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let input: &[u8] = b"1\tAlpha\n2\tB\xffeta\n3\tGamma\n";
        let (catalog, report) = read_item_catalog(Cursor::new(input), "artist_data").unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(3), Some("Gamma"));
        assert!(!catalog.contains(2));
        assert_eq!(report.records, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_open_missing_file() {
        let err = open("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, RecommenderError::Io(_)));
        assert!(err.to_string().contains("not/here.txt"));
    }
}
