mod row;
mod row_set;

pub use row::DatabaseRow;
pub use row_set::RowSetBuilder;
