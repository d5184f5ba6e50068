//! Conversion of a [`Table`] into a polars `DataFrame`.

use polars::prelude::{
    Column as FrameColumn, DataFrame, IntoColumn, NamedFrom, PolarsResult, Series,
};

use crate::table::Table;

impl Table {
    /// Builds a `DataFrame` with one `Float64` column per table column.
    ///
    /// Missing and non-numeric cells become nulls; the raw text is not kept.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<FrameColumn> = self
            .columns()
            .iter()
            .map(|column| {
                Series::new(column.name.as_str().into(), column.numeric_values()).into_column()
            })
            .collect();
        DataFrame::new(columns)
    }
}
