/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::fmt::Display;

/// A table of right-aligned text columns for human-readable summaries.
///
/// Rows are appended in order. A row with fewer entries than the header leaves the
/// remaining cells blank.
#[derive(Debug, Clone)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I>(header: I) -> Self
    where
        I: IntoIterator<Item: Display>,
    {
        Self {
            header: header.into_iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn ncols(&self) -> usize {
        self.header.len()
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// Append a row.
    ///
    /// # Panics
    ///
    /// Panics if the row has more entries than the table has columns.
    pub fn push<I>(&mut self, row: I)
    where
        I: IntoIterator<Item: Display>,
    {
        let row: Vec<String> = row.into_iter().map(|c| c.to_string()).collect();
        assert!(
            row.len() <= self.ncols(),
            "a row with {} entries does not fit in a table with {} columns",
            row.len(),
            self.ncols()
        );
        self.rows.push(row);
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const SEP: &str = ",   ";

        let mut widths: Vec<usize> = self.header.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in std::iter::zip(widths.iter_mut(), row) {
                *width = (*width).max(cell.len());
            }
        }

        let write_row = |f: &mut std::fmt::Formatter<'_>,
                         row: &[String]|
         -> std::fmt::Result {
            for (col, width) in widths.iter().enumerate() {
                let cell = row.get(col).map(String::as_str).unwrap_or("");
                write!(f, "{:>width$}", cell)?;
                if col + 1 != widths.len() {
                    f.write_str(SEP)?;
                }
            }
            writeln!(f)
        };

        write_row(f, &self.header)?;
        let total: usize =
            widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * SEP.len();
        writeln!(f, "{:=>total$}", "")?;
        for row in &self.rows {
            write_row(f, row)?;
        }
        Ok(())
    }
}

////////////
// Banner //
////////////

/// A framed one-line heading.
pub struct Banner<'a>(&'a str);

impl<'a> Banner<'a> {
    pub fn new(message: &'a str) -> Self {
        Self(message)
    }
}

impl Display for Banner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let line = format!("# {} #", self.0);
        let len = line.len();
        writeln!(f, "{:#>len$}", "")?;
        writeln!(f, "{}", line)?;
        writeln!(f, "{:#>len$}", "")
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner() {
        let expected = "###############\n\
                        # row-sharded #\n\
                        ###############\n";
        assert_eq!(Banner::new("row-sharded").to_string(), expected);
        assert_eq!(Banner::new("").to_string(), "####\n#  #\n####\n");
    }

    #[test]
    fn test_format() {
        let mut table = Table::new(["m0", "n0", "min"]);
        table.push(["48", "48", "1200ns"]);
        table.push([String::from("1024"), String::from("3")]);

        let expected = concat!(
            "  m0,   n0,      min\n",
            "====================\n",
            "  48,   48,   1200ns\n",
            "1024,    3,         \n",
        );
        assert_eq!(table.to_string(), expected);
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.ncols(), 3);
    }

    #[test]
    fn test_empty_body() {
        let table = Table::new(["a"]);
        assert_eq!(table.to_string(), "a\n=\n");
    }

    #[test]
    #[should_panic(expected = "a row with 3 entries does not fit in a table with 2 columns")]
    fn test_row_too_long() {
        let mut table = Table::new(["a", "b"]);
        table.push([1, 2, 3]);
    }
}
