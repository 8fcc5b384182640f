use crate::record::Record;
use crate::value::FieldValue;

/// A fluent builder rendering parameterized SQL for one table.
///
/// Every identifier is validated and double-quoted; values are never
/// interpolated and come back as an ordered bind list.
///
/// # Example
///
/// ```ignore
/// let (sql, params) = QueryBuilder::new_with_dialect("users", Dialect::Postgres)
///     .where_eq("email", "a@b.com")
///     .order_by("id", true)
///     .limit(10)
///     .build_select(&["id", "email"])?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Whether `DEFAULT` may appear inside a multi-row `VALUES` list.
    pub fn supports_default_values(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    conditions: Vec<Condition>,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(String, FieldValue),
    NotEq(String, FieldValue),
    Like(String, FieldValue),
    Gt(String, FieldValue),
    Lt(String, FieldValue),
    In(String, Vec<FieldValue>),
    IsNull(String),
    IsNotNull(String),
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
        }
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholder style and `DEFAULT` support).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    pub fn where_not_eq(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.conditions
            .push(Condition::NotEq(column.to_string(), value.into()));
        self
    }

    pub fn where_like(mut self, column: &str, pattern: &str) -> Self {
        self.conditions
            .push(Condition::Like(column.to_string(), pattern.into()));
        self
    }

    pub fn where_gt(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.conditions
            .push(Condition::Gt(column.to_string(), value.into()));
        self
    }

    pub fn where_lt(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.conditions
            .push(Condition::Lt(column.to_string(), value.into()));
        self
    }

    pub fn where_in<V: Into<FieldValue>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn where_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn where_not_null(mut self, column: &str) -> Self {
        self.conditions
            .push(Condition::IsNotNull(column.to_string()));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Build a SELECT query returning `(sql, bind_values)`.
    pub fn build_select(&self, columns: &[&str]) -> Result<(String, Vec<FieldValue>), QueryError> {
        if columns.is_empty() {
            return Err(QueryError::EmptyColumnList { statement: "SELECT" });
        }
        let mut w = SqlWriter::new(self.dialect);
        w.push("SELECT ");
        w.push_column_list(columns)?;
        w.push(" FROM ");
        w.push_ident(&self.table, "table")?;
        self.append_where(&mut w)?;
        self.append_order(&mut w)?;
        self.append_limit_offset(&mut w);
        Ok(w.finish())
    }

    /// Build a COUNT query returning `(sql, bind_values)`.
    pub fn build_count(&self) -> Result<(String, Vec<FieldValue>), QueryError> {
        let mut w = SqlWriter::new(self.dialect);
        w.push("SELECT COUNT(*) FROM ");
        w.push_ident(&self.table, "table")?;
        self.append_where(&mut w)?;
        Ok(w.finish())
    }

    /// Build a single multi-row INSERT.
    ///
    /// Each row holds one slot per column; `None` renders `DEFAULT`, which is
    /// only accepted by dialects that allow it inside `VALUES`. An empty
    /// column list with exactly one row renders `DEFAULT VALUES`.
    pub fn build_insert(
        &self,
        columns: &[&str],
        rows: Vec<Vec<Option<FieldValue>>>,
        returning: &[&str],
    ) -> Result<(String, Vec<FieldValue>), QueryError> {
        if rows.is_empty() {
            return Err(QueryError::EmptyRowList);
        }
        let mut w = SqlWriter::new(self.dialect);
        w.push("INSERT INTO ");
        w.push_ident(&self.table, "table")?;

        if columns.is_empty() {
            if rows.len() != 1 {
                return Err(QueryError::EmptyColumnList { statement: "INSERT" });
            }
            w.push(" DEFAULT VALUES");
        } else {
            w.push(" (");
            w.push_column_list(columns)?;
            w.push(") VALUES ");
            for (row_idx, row) in rows.into_iter().enumerate() {
                if row.len() != columns.len() {
                    return Err(QueryError::RowWidthMismatch {
                        expected: columns.len(),
                        found: row.len(),
                    });
                }
                if row_idx > 0 {
                    w.push(", ");
                }
                w.push("(");
                for (col_idx, slot) in row.into_iter().enumerate() {
                    if col_idx > 0 {
                        w.push(", ");
                    }
                    match slot {
                        Some(value) => w.bind(value),
                        None if self.dialect.supports_default_values() => w.push("DEFAULT"),
                        None => {
                            return Err(QueryError::DefaultNotSupported {
                                column: columns[col_idx].to_string(),
                            })
                        }
                    }
                }
                w.push(")");
            }
        }

        self.append_returning(&mut w, returning)?;
        Ok(w.finish())
    }

    /// Build an UPDATE assigning every field of `changes`, filtered by the
    /// builder's conditions.
    pub fn build_update(
        &self,
        changes: &Record,
        returning: &[&str],
    ) -> Result<(String, Vec<FieldValue>), QueryError> {
        if changes.is_empty() {
            return Err(QueryError::EmptyColumnList { statement: "UPDATE" });
        }
        let mut w = SqlWriter::new(self.dialect);
        w.push("UPDATE ");
        w.push_ident(&self.table, "table")?;
        w.push(" SET ");
        for (idx, (column, value)) in changes.iter().enumerate() {
            if idx > 0 {
                w.push(", ");
            }
            w.push_ident(column, "column")?;
            w.push(" = ");
            w.bind(value.clone());
        }
        self.append_where(&mut w)?;
        self.append_returning(&mut w, returning)?;
        Ok(w.finish())
    }

    /// Build a DELETE filtered by the builder's conditions.
    pub fn build_delete(&self) -> Result<(String, Vec<FieldValue>), QueryError> {
        let mut w = SqlWriter::new(self.dialect);
        w.push("DELETE FROM ");
        w.push_ident(&self.table, "table")?;
        self.append_where(&mut w)?;
        Ok(w.finish())
    }

    fn append_where(&self, w: &mut SqlWriter) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        w.push(" WHERE ");
        for (idx, cond) in self.conditions.iter().enumerate() {
            if idx > 0 {
                w.push(" AND ");
            }
            match cond {
                Condition::Eq(col, val) => w.push_comparison(col, "=", val)?,
                Condition::NotEq(col, val) => w.push_comparison(col, "!=", val)?,
                Condition::Like(col, pat) => w.push_comparison(col, "LIKE", pat)?,
                Condition::Gt(col, val) => w.push_comparison(col, ">", val)?,
                Condition::Lt(col, val) => w.push_comparison(col, "<", val)?,
                Condition::In(col, vals) => {
                    w.push_ident(col, "column")?;
                    if vals.is_empty() {
                        // `IN ()` is not valid SQL; an empty set matches nothing.
                        w.push(" IN (NULL)");
                        continue;
                    }
                    w.push(" IN (");
                    for (i, val) in vals.iter().enumerate() {
                        if i > 0 {
                            w.push(", ");
                        }
                        w.bind(val.clone());
                    }
                    w.push(")");
                }
                Condition::IsNull(col) => {
                    w.push_ident(col, "column")?;
                    w.push(" IS NULL");
                }
                Condition::IsNotNull(col) => {
                    w.push_ident(col, "column")?;
                    w.push(" IS NOT NULL");
                }
            }
        }
        Ok(())
    }

    fn append_order(&self, w: &mut SqlWriter) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        w.push(" ORDER BY ");
        for (idx, (col, asc)) in self.order.iter().enumerate() {
            if idx > 0 {
                w.push(", ");
            }
            w.push_ident(col, "column")?;
            w.push(if *asc { " ASC" } else { " DESC" });
        }
        Ok(())
    }

    fn append_limit_offset(&self, w: &mut SqlWriter) {
        let clamp = |n: u64| n.min(i64::MAX as u64);
        match (self.limit_val.map(clamp), self.offset_val.map(clamp)) {
            (Some(limit), Some(offset)) => w.push(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => w.push(&format!(" LIMIT {limit}")),
            (None, Some(offset)) if self.dialect == Dialect::Postgres => {
                w.push(&format!(" OFFSET {offset}"))
            }
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
            (None, Some(offset)) => w.push(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
    }

    fn append_returning(&self, w: &mut SqlWriter, returning: &[&str]) -> Result<(), QueryError> {
        if returning.is_empty() {
            return Ok(());
        }
        w.push(" RETURNING ");
        w.push_column_list(returning)
    }
}

/// Accumulates SQL text and bind values, numbering placeholders in order.
struct SqlWriter {
    dialect: Dialect,
    sql: String,
    params: Vec<FieldValue>,
}

impl SqlWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: FieldValue) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    fn push_ident(&mut self, ident: &str, kind: &'static str) -> Result<(), QueryError> {
        if !is_valid_identifier(ident) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        let quoted = ident
            .split('.')
            .map(|part| format!("\"{part}\""))
            .collect::<Vec<_>>()
            .join(".");
        self.sql.push_str(&quoted);
        Ok(())
    }

    fn push_column_list(&mut self, columns: &[&str]) -> Result<(), QueryError> {
        for (idx, col) in columns.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.push_ident(col, "column")?;
        }
        Ok(())
    }

    fn push_comparison(&mut self, col: &str, op: &str, value: &FieldValue) -> Result<(), QueryError> {
        self.push_ident(col, "column")?;
        self.push(" ");
        self.push(op);
        self.push(" ");
        self.bind(value.clone());
        Ok(())
    }

    fn finish(self) -> (String, Vec<FieldValue>) {
        (self.sql, self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    EmptyColumnList { statement: &'static str },
    EmptyRowList,
    RowWidthMismatch { expected: usize, found: usize },
    DefaultNotSupported { column: String },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::EmptyColumnList { statement } => {
                write!(f, "{statement} requires at least one column")
            }
            QueryError::EmptyRowList => write!(f, "INSERT requires at least one row"),
            QueryError::RowWidthMismatch { expected, found } => {
                write!(f, "INSERT row has {found} values, expected {expected}")
            }
            QueryError::DefaultNotSupported { column } => write!(
                f,
                "column `{column}` is missing from some rows and this dialect cannot insert DEFAULT in a VALUES list"
            ),
        }
    }
}

impl std::error::Error for QueryError {}

fn is_valid_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
