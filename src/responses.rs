use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context};

use crate::models::RawResponse;

/// Counts of cells that could not be used as answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellIssues {
    pub blank: usize,
    pub non_numeric: usize,
    pub out_of_range: usize,
    pub missing_columns: usize,
}

impl CellIssues {
    pub fn malformed(&self) -> usize {
        self.non_numeric + self.out_of_range + self.missing_columns
    }
}

/// Where the answer columns start, relative to the header row.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub id_column: String,
    /// Zero-based column index of the first item. `None` means the column
    /// right after the id column.
    pub first_item_column: Option<usize>,
    pub item_count: usize,
    pub scale_max: f64,
}

#[derive(Debug, Clone)]
pub struct Respondent {
    pub response: RawResponse,
    pub issues: CellIssues,
}

/// The uploaded sheet, read fully into memory.
#[derive(Debug, Clone)]
pub struct ResponseTable {
    respondents: Vec<Respondent>,
    duplicate_ids: Vec<String>,
}

impl ResponseTable {
    pub fn from_path(path: &Path, layout: &TableLayout) -> anyhow::Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(reader, layout)
            .with_context(|| format!("failed to read responses from {}", path.display()))
    }

    pub fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        layout: &TableLayout,
    ) -> anyhow::Result<Self> {
        // Exports from spreadsheet tools are not always UTF-8, so cells are
        // decoded one at a time.
        let headers = reader.byte_headers()?.clone();
        let Some(id_index) = headers
            .iter()
            .position(|h| String::from_utf8_lossy(h) == layout.id_column.as_str())
        else {
            bail!("no `{}` column in header row", layout.id_column);
        };
        let first_item = layout.first_item_column.unwrap_or(id_index + 1);
        let last_item = first_item + layout.item_count;
        if headers.len() < last_item {
            tracing::warn!(
                expected = last_item,
                found = headers.len(),
                "header row is shorter than the answer block, missing items will be absent"
            );
        }

        let mut respondents = Vec::new();
        let mut seen = HashSet::new();
        let mut duplicate_ids = Vec::new();
        for (line, record) in reader.byte_records().enumerate() {
            let record = record?;
            let row = line + 2;
            let raw_id = record.get(id_index).unwrap_or_default();
            let id = String::from_utf8_lossy(raw_id).into_owned();
            if id.is_empty() {
                tracing::debug!(row, "skipping row without respondent id");
                continue;
            }
            if std::str::from_utf8(raw_id).is_err() {
                tracing::warn!(row, respondent = %id, "respondent id is not valid UTF-8");
            }
            if !seen.insert(id.clone()) {
                tracing::warn!(
                    row,
                    respondent = %id,
                    "duplicate respondent id, only the first row is used"
                );
                duplicate_ids.push(id);
                continue;
            }

            let mut issues = CellIssues::default();
            let answers: Vec<Option<f64>> = (first_item..last_item)
                .map(|column| parse_cell(record.get(column), layout.scale_max, &mut issues))
                .collect();

            if issues.malformed() > 0 {
                tracing::warn!(
                    respondent = %id,
                    blank = issues.blank,
                    non_numeric = issues.non_numeric,
                    out_of_range = issues.out_of_range,
                    missing_columns = issues.missing_columns,
                    "unusable cells treated as unanswered"
                );
            }

            respondents.push(Respondent {
                response: RawResponse::new(id, answers),
                issues,
            });
        }

        tracing::info!(respondents = respondents.len(), "loaded response table");
        Ok(Self {
            respondents,
            duplicate_ids,
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.respondents
            .iter()
            .map(|respondent| respondent.response.respondent_id.as_str())
    }

    /// Ids that appeared on more than one row. Later rows are ignored.
    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    pub fn respondent(&self, id: &str) -> Option<&Respondent> {
        self.respondents
            .iter()
            .find(|respondent| respondent.response.respondent_id == id)
    }

    pub fn responses(&self) -> Vec<RawResponse> {
        self.respondents
            .iter()
            .map(|respondent| respondent.response.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }
}

fn parse_cell(cell: Option<&[u8]>, scale_max: f64, issues: &mut CellIssues) -> Option<f64> {
    let Some(cell) = cell else {
        issues.missing_columns += 1;
        return None;
    };
    let Ok(cell) = std::str::from_utf8(cell) else {
        issues.non_numeric += 1;
        return None;
    };
    if cell.is_empty() {
        issues.blank += 1;
        return None;
    }
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() && (0.0..=scale_max).contains(&value) => Some(value),
        Ok(value) if value.is_finite() => {
            issues.out_of_range += 1;
            None
        }
        _ => {
            issues.non_numeric += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn layout(item_count: usize) -> TableLayout {
        TableLayout {
            id_column: "ID".to_string(),
            first_item_column: None,
            item_count,
            scale_max: 10.0,
        }
    }

    fn table_from_bytes(bytes: &[u8], layout: &TableLayout) -> ResponseTable {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);
        ResponseTable::from_reader(reader, layout).unwrap()
    }

    fn table(csv_text: &str, layout: &TableLayout) -> ResponseTable {
        table_from_bytes(csv_text.as_bytes(), layout)
    }

    #[test]
    fn reads_answer_block_after_id_column() {
        let csv_text = indoc! {"
            ID,Q1,Q2,Q3
            A-1,8,9,7
            A-2,2,,1
        "};
        let table = table(csv_text, &layout(3));
        assert_eq!(table.ids().collect::<Vec<_>>(), ["A-1", "A-2"]);

        let first = table.respondent("A-1").unwrap();
        assert_eq!(first.response.answers, [Some(8.0), Some(9.0), Some(7.0)]);

        let second = table.respondent("A-2").unwrap();
        assert_eq!(second.response.answers, [Some(2.0), None, Some(1.0)]);
        assert_eq!(second.issues.blank, 1);
        assert_eq!(second.issues.malformed(), 0);
    }

    #[test]
    fn coerces_bad_cells_to_absent() {
        let csv_text = indoc! {"
            Name,ID,Q1,Q2,Q3,Q4
            Ada,B-1,seven,11,-1,4.5
            Bo,B-2,3
        "};
        let table = table(csv_text, &layout(4));

        let first = table.respondent("B-1").unwrap();
        assert_eq!(first.response.answers, [None, None, None, Some(4.5)]);
        assert_eq!(
            first.issues,
            CellIssues {
                blank: 0,
                non_numeric: 1,
                out_of_range: 2,
                missing_columns: 0,
            }
        );

        let short = table.respondent("B-2").unwrap();
        assert_eq!(short.response.answers, [Some(3.0), None, None, None]);
        assert_eq!(short.issues.missing_columns, 3);
    }

    #[test]
    fn non_utf8_cells_do_not_drop_other_respondents() {
        let bytes = b"ID,Q1,Q2\nA-1,5,6\nB-2,\xff\xfe,4\nC-3,7,8\n";
        let table = table_from_bytes(bytes, &layout(2));
        assert_eq!(table.ids().collect::<Vec<_>>(), ["A-1", "B-2", "C-3"]);

        let bad = table.respondent("B-2").unwrap();
        assert_eq!(bad.response.answers, [None, Some(4.0)]);
        assert_eq!(bad.issues.non_numeric, 1);

        assert_eq!(
            table.respondent("C-3").unwrap().response.answers,
            [Some(7.0), Some(8.0)]
        );
    }

    #[test]
    fn shift_jis_headers_and_ids_still_load() {
        // "氏名" in Shift_JIS ahead of the id column, and an id with a stray byte.
        let bytes = b"\x8e\x81\x96\xbc,ID,Q1\nx,S-1,3\ny,S-\x82\xa0,9\n";
        let layout = TableLayout {
            first_item_column: Some(2),
            ..layout(1)
        };
        let table = table_from_bytes(bytes, &layout);
        assert_eq!(table.ids().count(), 2);
        assert_eq!(
            table.respondent("S-1").unwrap().response.answers,
            [Some(3.0)]
        );
        let lossy = table.ids().nth(1).unwrap();
        assert!(lossy.starts_with("S-"));
        assert!(lossy.contains('\u{FFFD}'));
    }

    #[test]
    fn duplicate_ids_keep_first_row_and_are_reported() {
        let csv_text = indoc! {"
            ID,Q1
            F-1,2
            F-2,5
            F-1,9
        "};
        let table = table(csv_text, &layout(1));
        assert_eq!(table.ids().collect::<Vec<_>>(), ["F-1", "F-2"]);
        assert_eq!(table.respondent("F-1").unwrap().response.answers, [Some(2.0)]);
        assert_eq!(table.duplicate_ids(), ["F-1"]);
    }

    #[test]
    fn honours_explicit_first_item_column() {
        let csv_text = indoc! {"
            ID,Date,Q1,Q2
            C-1,2026-01-05,6,5
        "};
        let layout = TableLayout {
            first_item_column: Some(2),
            ..layout(2)
        };
        let table = table(csv_text, &layout);
        assert_eq!(
            table.respondent("C-1").unwrap().response.answers,
            [Some(6.0), Some(5.0)]
        );
    }

    #[test]
    fn skips_rows_without_id() {
        let csv_text = indoc! {"
            ID,Q1
            ,5
            D-1,4
        "};
        let table = table(csv_text, &layout(1));
        assert_eq!(table.ids().count(), 1);
        assert!(table.respondent("").is_none());
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let reader = csv::Reader::from_reader("Q1,Q2\n1,2\n".as_bytes());
        let err = ResponseTable::from_reader(reader, &layout(2)).unwrap_err();
        assert!(err.to_string().contains("no `ID` column"));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.csv");
        std::fs::write(&path, "ID,Q1,Q2\nE-1,1,2\nE-2,3,4\n").unwrap();
        let table = ResponseTable::from_path(&path, &layout(2)).unwrap();
        assert_eq!(table.responses().len(), 2);
        assert!(!table.is_empty());
    }
}
