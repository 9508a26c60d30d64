//! Dynamic filter predicates shared by count and data queries.
//!
//! List operations accumulate optional constraints into [`Predicates`] and
//! render them once into a [`QuerySpec`], so the `COUNT(*)` query that feeds
//! pagination metadata and the `LIMIT/OFFSET` query that produces the rows
//! always apply the identical predicate set with the identical parameters.
//!
//! ```rust,ignore
//! let mut predicates = Predicates::new();
//! if let Some(name) = &filter.name {
//!     predicates.push_like("name_key", name);
//! }
//! let spec = QuerySpec::build(ARTIST_COLUMNS, "artists", &["deleted_at IS NULL"], &predicates, "id ASC");
//! ```

use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

/// Maximum number of ids bound into a single `IN (...)` list.
pub const MAX_IN_LIST: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    I64(i64),
}

/// Ordered list of SQL conditions and the parameters they consume.
#[derive(Debug, Clone, Default)]
pub struct Predicates {
    conditions: Vec<String>,
    binds: Vec<BindValue>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition containing exactly one `?` placeholder.
    pub fn push(&mut self, condition: impl Into<String>, value: BindValue) -> &mut Self {
        self.conditions.push(condition.into());
        self.binds.push(value);
        self
    }

    /// Append a case-insensitive partial match on `expr`, which must be a
    /// column holding [`search_key`] text. Wildcards typed by the caller are
    /// matched literally.
    pub fn push_like(&mut self, expr: &str, needle: &str) -> &mut Self {
        self.push(
            format!("{} LIKE ? ESCAPE '\\'", expr),
            BindValue::Text(contains_pattern(needle)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    /// Render `base` conditions followed by the accumulated ones, joined with
    /// `AND`. Returns an empty string when there is nothing to filter on.
    pub fn where_clause(&self, base: &[&str]) -> String {
        let all: Vec<&str> = base
            .iter()
            .copied()
            .chain(self.conditions.iter().map(String::as_str))
            .collect();

        if all.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", all.join(" AND "))
        }
    }
}

/// Paired count and page queries over the same predicate set.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub select_sql: String,
    pub count_sql: String,
    pub binds: Vec<BindValue>,
}

impl QuerySpec {
    /// `select_sql` ends with `LIMIT ? OFFSET ?`; bind the page window after
    /// `binds`.
    pub fn build(
        columns: &str,
        from: &str,
        base: &[&str],
        predicates: &Predicates,
        order_by: &str,
    ) -> Self {
        let where_clause = predicates.where_clause(base);

        Self {
            select_sql: format!(
                "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
                columns, from, where_clause, order_by
            ),
            count_sql: format!("SELECT COUNT(*) AS count FROM {}{}", from, where_clause),
            binds: predicates.binds().to_vec(),
        }
    }
}

/// Bind every value in order onto a `query_as` builder.
pub fn bind_all<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    binds: &[BindValue],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for value in binds {
        query = match value {
            BindValue::Text(text) => query.bind(text.clone()),
            BindValue::I64(number) => query.bind(*number),
        };
    }
    query
}

/// `?, ?, ?` with `count` placeholders.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Escape `\`, `%` and `_` for use with `LIKE ... ESCAPE '\'`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Case-folded form stored in the `*_key` columns and used for LIKE needles.
/// SQLite's LIKE folds ASCII only, so both sides are lowercased here.
pub fn search_key(value: &str) -> String {
    value.to_lowercase()
}

pub fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like(&search_key(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_handles_wildcards() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(contains_pattern("abc"), "%abc%");
    }

    #[test]
    fn patterns_fold_unicode_case() {
        assert_eq!(search_key("BEYONCÉ"), "beyoncé");
        assert_eq!(contains_pattern("ÁRBOL_"), "%árbol\\_%");
    }

    #[test]
    fn where_clause_combines_base_and_dynamic_conditions() {
        let mut predicates = Predicates::new();
        assert_eq!(predicates.where_clause(&[]), "");
        assert_eq!(
            predicates.where_clause(&["deleted_at IS NULL"]),
            " WHERE deleted_at IS NULL"
        );

        predicates
            .push_like("title_key", "Blue")
            .push("type = ?", BindValue::Text("LP".to_string()));

        assert_eq!(
            predicates.where_clause(&["deleted_at IS NULL"]),
             " WHERE deleted_at IS NULL AND title_key LIKE ? ESCAPE '\\' AND type = ?"
        );
        assert_eq!(predicates.len(), 2);
        assert_eq!(
            predicates.binds(),
            &[
                BindValue::Text("%blue%".to_string()),
                BindValue::Text("LP".to_string())
            ]
        );
    }

    #[test]
    fn spec_shares_predicates_between_count_and_select() {
        let mut predicates = Predicates::new();
        predicates.push("s.id = ?", BindValue::I64(4));

        let spec = QuerySpec::build(
            "s.id, s.title",
            "songs s",
            &["s.deleted_at IS NULL"],
            &predicates,
            "s.id ASC",
        );

        assert_eq!(
            spec.select_sql,
            "SELECT s.id, s.title FROM songs s WHERE s.deleted_at IS NULL AND s.id = ? \
             ORDER BY s.id ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            spec.count_sql,
            "SELECT COUNT(*) AS count FROM songs s WHERE s.deleted_at IS NULL AND s.id = ?"
        );
        assert_eq!(spec.binds, vec![BindValue::I64(4)]);
    }

    #[test]
    fn placeholders_render_in_lists() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
