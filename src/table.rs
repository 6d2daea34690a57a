//! Tab-separated tables with a header row.
//!
//! Every interchange file the scorer reads or writes is a TSV table.
//! Columns are located by header name, so producers may add columns freely.

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// An in-memory TSV table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let header: Vec<String> = columns.into_iter().map(Into::into).collect();
        let index = header
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            header,
            rows: Vec::new(),
            index,
        }
    }

    /// Parse TSV content. The first non-empty line is the header; a row of
    /// empty cells is still a row.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().filter(|l| !l.is_empty());
        let header_line = lines
            .next()
            .ok_or_else(|| Error::parse("table has no header row"))?;
        let mut table = Table::new(header_line.split('\t').map(|c| c.trim()));

        for (line_no, line) in lines.enumerate() {
            let mut cells: Vec<String> = line.split('\t').map(|c| c.to_string()).collect();
            if cells.len() > table.header.len() {
                return Err(Error::parse(format!(
                    "row {} has {} cells but header has {}",
                    line_no + 2,
                    cells.len(),
                    table.header.len()
                )));
            }
            cells.resize(table.header.len(), String::new());
            table.rows.push(cells);
        }
        Ok(table)
    }

    /// Read a TSV file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::missing_input(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::parse(format!("{}: {}", path.display(), e)))
    }

    /// Render as TSV text.
    pub fn to_tsv(&self) -> String {
        let mut out = self.header.join("\t");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }

    /// Write as a TSV file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_tsv())?;
        Ok(())
    }

    /// Append a row. Cells containing tabs or newlines are flattened to spaces.
    pub fn push_row<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = cells
            .into_iter()
            .map(|c| c.into().replace(['\t', '\n', '\r'], " "))
            .collect();
        if row.len() != self.header.len() {
            return Err(Error::invalid_input(format!(
                "row has {} cells but table has {} columns",
                row.len(),
                self.header.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a required column.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::parse(format!("missing required column '{}'", name)))
    }

    /// Positions of several required columns, in order.
    pub fn columns<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let mut out = [0; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.column(name)?;
        }
        Ok(out)
    }

    /// Iterate over data rows.
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|r| r.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_header_name() {
        let table = Table::parse("b\ta\n1\t2\n3\t4\n").unwrap();
        let [a, b] = table.columns(["a", "b"]).unwrap();
        let rows: Vec<_> = table.rows().map(|r| (r[a].clone(), r[b].clone())).collect();
        assert_eq!(
            rows,
            vec![("2".to_string(), "1".to_string()), ("4".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = Table::parse("a\tb\tc\nx\n").unwrap();
        assert_eq!(table.rows().next().unwrap(), ["x", "", ""]);
    }

    #[test]
    fn test_all_empty_row_kept() {
        let table = Table::parse("a\tb\tc\n\t\t\nx\ty\tz\n\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows().next().unwrap(), ["", "", ""]);
    }

    #[test]
    fn test_long_rows_rejected() {
        assert!(Table::parse("a\nx\ty\n").is_err());
    }

    #[test]
    fn test_missing_column() {
        let table = Table::parse("a\n1\n").unwrap();
        assert!(matches!(table.column("z"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_write_then_parse() {
        let mut table = Table::new(["x", "y"]);
        table.push_row(["one\ttab", "2"]).unwrap();
        let parsed = Table::parse(&table.to_tsv()).unwrap();
        assert_eq!(parsed.rows().next().unwrap(), ["one tab", "2"]);
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = Table::read("/no/such/table.tsv").unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }
}
