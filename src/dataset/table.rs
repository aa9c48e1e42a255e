use crate::dataset::frame::IssueFrame;
use crate::error::{AppError, Result};
use crate::models::{HEADER, KEY_COLUMN, NUMERIC_COLUMNS};
use ndarray::Array2;
use std::fmt;

/// Values held by one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Raw strings; `None` is a missing cell
    Text(Vec<Option<String>>),
    /// Numbers; `None` is a missing cell
    Numeric(Vec<Option<f64>>),
    /// One dense vector per row, all of the same width
    Vector(Vec<Vec<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of model features this column contributes
    pub fn width(&self) -> usize {
        match self {
            ColumnData::Text(_) => 0,
            ColumnData::Numeric(_) => 1,
            ColumnData::Vector(v) => v.first().map(Vec::len).unwrap_or(0),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ColumnData::Text(_) => "text",
            ColumnData::Numeric(_) => "numeric",
            ColumnData::Vector(_) => "vector",
        }
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Vector(v) => ColumnData::Vector(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Column-oriented working copy of the dataset used for feature preparation.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from columns of equal length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.data.len() != n_rows) {
            return Err(AppError::Processing(format!(
                "column {} has {} rows, expected {}",
                bad.name,
                bad.data.len(),
                n_rows
            )));
        }
        Ok(Self { columns, n_rows })
    }

    /// One column per header entry; numeric fields become numeric columns, everything
    /// else (dates included) starts out as text.
    pub fn from_frame(frame: &IssueFrame) -> Self {
        let issues = frame.issues();
        let columns = HEADER
            .iter()
            .map(|&name| {
                let data = if NUMERIC_COLUMNS.contains(&name) {
                    ColumnData::Numeric(issues.iter().map(|i| i.numeric_field(name)).collect())
                } else {
                    ColumnData::Text(
                        issues
                            .iter()
                            .map(|i| i.text_field(name).map(str::to_string))
                            .collect(),
                    )
                };
                Column {
                    name: name.to_string(),
                    data,
                }
            })
            .collect();

        Self {
            columns,
            n_rows: issues.len(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Swap in new data for an existing column, keeping its position
    pub fn replace_column(&mut self, name: &str, data: ColumnData) -> Result<()> {
        if data.len() != self.n_rows {
            return Err(AppError::Processing(format!(
                "replacement for column {} has {} rows, expected {}",
                name,
                data.len(),
                self.n_rows
            )));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| AppError::Processing(format!("missing column {}", name)))?;
        column.data = data;
        Ok(())
    }

    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(values)) => Ok(values),
            Some(other) => Err(AppError::Processing(format!(
                "column {} is {}, expected numeric",
                name,
                other.kind()
            ))),
            None => Err(AppError::Processing(format!("missing column {}", name))),
        }
    }

    /// Issue keys in row order
    pub fn keys(&self) -> Result<Vec<String>> {
        match self.column(KEY_COLUMN).map(|c| &c.data) {
            Some(ColumnData::Text(values)) => {
                Ok(values.iter().map(|v| v.clone().unwrap_or_default()).collect())
            }
            _ => Err(AppError::Processing(format!(
                "missing text column {}",
                KEY_COLUMN
            ))),
        }
    }

    /// Keep only rows whose `predicate` holds
    pub fn filter_rows(&self, predicate: impl Fn(usize) -> bool) -> Table {
        let rows: Vec<usize> = (0..self.n_rows).filter(|&i| predicate(i)).collect();
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.select(&rows),
                })
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// Flatten every column except `exclude` into a dense feature matrix.
    ///
    /// Missing numbers become 0.0. A remaining text column is an error: it has to be
    /// vectorized or converted first.
    pub fn feature_matrix(&self, exclude: &[&str]) -> Result<(Array2<f64>, Vec<String>)> {
        let selected: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| !exclude.contains(&c.name.as_str()))
            .collect();

        let mut names = Vec::new();
        for column in &selected {
            match &column.data {
                ColumnData::Text(_) => {
                    return Err(AppError::Processing(format!(
                        "column {} still holds text",
                        column.name
                    )))
                }
                ColumnData::Numeric(_) => names.push(column.name.clone()),
                ColumnData::Vector(_) => {
                    let width = column.data.width();
                    names.extend((0..width).map(|i| format!("{}[{}]", column.name, i)));
                }
            }
        }

        let n_features = names.len();
        let mut matrix = Array2::zeros((self.n_rows, n_features));
        for row in 0..self.n_rows {
            let mut offset = 0;
            for column in &selected {
                match &column.data {
                    ColumnData::Numeric(values) => {
                        matrix[[row, offset]] = values[row].unwrap_or(0.0);
                        offset += 1;
                    }
                    ColumnData::Vector(vectors) => {
                        for (j, &v) in vectors[row].iter().enumerate() {
                            matrix[[row, offset + j]] = v;
                        }
                        offset += column.data.width();
                    }
                    ColumnData::Text(_) => {}
                }
            }
        }

        Ok((matrix, names))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{} rows x {} columns]", self.n_rows, self.columns.len())?;
        for column in &self.columns {
            writeln!(
                f,
                "  {:<20} {:<8} width={}",
                column.name,
                column.data.kind(),
                column.data.width()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Issue;

    fn table() -> Table {
        Table::new(vec![
            Column {
                name: "key".to_string(),
                data: ColumnData::Text(vec![Some("A-1".into()), Some("A-2".into())]),
            },
            Column {
                name: "estimate".to_string(),
                data: ColumnData::Numeric(vec![Some(1.5), None]),
            },
            Column {
                name: "summary".to_string(),
                data: ColumnData::Vector(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_from_frame_columns() {
        let frame = IssueFrame::from_issues(vec![Issue::new("A-1").with_time_spent(60.0)]);
        let table = Table::from_frame(&frame);

        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.column_names(), HEADER.to_vec());
        assert_eq!(table.numeric("time_spent").unwrap(), &[Some(60.0)]);
        assert!(table.numeric("summary").is_err());
    }

    #[test]
    fn test_unequal_columns_rejected() {
        let result = Table::new(vec![
            Column {
                name: "a".to_string(),
                data: ColumnData::Numeric(vec![Some(1.0)]),
            },
            Column {
                name: "b".to_string(),
                data: ColumnData::Numeric(vec![]),
            },
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_feature_matrix_flattens_vectors() {
        let (matrix, names) = table().feature_matrix(&["key"]).unwrap();

        assert_eq!(matrix.shape(), &[2, 3]);
        assert_eq!(names, vec!["estimate", "summary[0]", "summary[1]"]);
        assert_eq!(matrix[[0, 0]], 1.5);
        assert_eq!(matrix[[1, 0]], 0.0);
        assert_eq!(matrix[[1, 2]], 1.0);
    }

    #[test]
    fn test_feature_matrix_rejects_text() {
        assert!(table().feature_matrix(&[]).is_err());
    }

    #[test]
    fn test_filter_rows() {
        let filtered = table().filter_rows(|i| i == 1);
        assert_eq!(filtered.n_rows(), 1);
        assert_eq!(filtered.keys().unwrap(), vec!["A-2".to_string()]);
    }
}
