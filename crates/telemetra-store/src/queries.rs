//! Query builder for stored readings.
//!
//! [`ReadingQuery`] follows the builder pattern for filtering and
//! paginating stored readings.
//!
//! # Example
//!
//! ```
//! use telemetra_store::{ReadingQuery, Store};
//! use time::{Duration, OffsetDateTime};
//!
//! let store = Store::open_in_memory()?;
//! let yesterday = OffsetDateTime::now_utc() - Duration::hours(24);
//!
//! // Query recent readings with pagination
//! let query = ReadingQuery::new()
//!     .device("Temperature Sensor")
//!     .since(yesterday)
//!     .limit(50)
//!     .offset(0);
//!
//! let readings = store.query_readings(&query)?;
//! # Ok::<(), telemetra_store::Error>(())
//! ```

use time::OffsetDateTime;

/// Fluent query builder for stored readings.
///
/// Use this to construct queries for [`Store::query_readings`](crate::Store::query_readings).
/// All filter methods are optional and can be chained in any order.
///
/// By default, queries return results in insertion order (ascending
/// row id); use [`newest_first`](ReadingQuery::newest_first) to get
/// the most recent readings first.
#[derive(Debug, Default, Clone)]
pub struct ReadingQuery {
    /// Filter by device name (exact match).
    pub device_name: Option<String>,
    /// Filter readings at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Filter readings at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by reading_time descending instead of insertion order.
    pub newest_first: bool,
}

impl ReadingQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No device filter (all devices)
    /// - No time range filter
    /// - No limit (all matching records)
    /// - Insertion order (ascending id)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by device name.
    ///
    /// Matching is exact: case-sensitive, no trimming.
    pub fn device(mut self, device_name: &str) -> Self {
        self.device_name = Some(device_name.to_string());
        self
    }

    /// Filter to readings recorded at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to readings recorded at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the maximum number of results returned.
    ///
    /// Use with `offset()` for pagination.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    ///
    /// Use with `limit()` for pagination. For example, to get page 2
    /// with 50 items per page: `.limit(50).offset(50)`.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by most recent reading first.
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref device_name) = self.device_name {
            conditions.push("device_name = ?");
            params.push(Box::new(device_name.clone()));
        }

        if let Some(since) = self.since {
            conditions.push("reading_time >= ?");
            params.push(Box::new(since.unix_timestamp()));
        }

        if let Some(until) = self.until {
            conditions.push("reading_time <= ?");
            params.push(Box::new(until.unix_timestamp()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first {
            "reading_time DESC, id DESC"
        } else {
            "id ASC"
        };

        let mut sql = format!(
            "SELECT id, device_name, reading_value, reading_time \
             FROM readings {} ORDER BY {}",
            where_clause, order
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_query_new_defaults() {
        let query = ReadingQuery::new();
        assert!(query.device_name.is_none());
        assert!(query.since.is_none());
        assert!(query.until.is_none());
        assert!(query.limit.is_none());
        assert!(query.offset.is_none());
        assert!(!query.newest_first);
    }

    #[test]
    fn test_query_chaining() {
        let since = datetime!(2024-01-01 00:00:00 UTC);
        let until = datetime!(2024-12-31 23:59:59 UTC);

        let query = ReadingQuery::new()
            .device("Humidity Sensor")
            .since(since)
            .until(until)
            .limit(10)
            .offset(5)
            .newest_first();

        assert_eq!(query.device_name, Some("Humidity Sensor".to_string()));
        assert_eq!(query.since, Some(since));
        assert_eq!(query.until, Some(until));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
        assert!(query.newest_first);
    }

    #[test]
    fn test_build_where_empty() {
        let query = ReadingQuery::new();
        let (where_clause, params) = query.build_where();
        assert_eq!(where_clause, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_where_device_only() {
        let query = ReadingQuery::new().device("Pressure Sensor");
        let (where_clause, params) = query.build_where();
        assert_eq!(where_clause, "WHERE device_name = ?");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_build_where_time_range() {
        let since = datetime!(2024-01-01 00:00:00 UTC);
        let until = datetime!(2024-12-31 23:59:59 UTC);

        let query = ReadingQuery::new().since(since).until(until);
        let (where_clause, params) = query.build_where();

        assert_eq!(
            where_clause,
            "WHERE reading_time >= ? AND reading_time <= ?"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_build_sql_basic() {
        let query = ReadingQuery::new();
        let sql = query.build_sql();

        assert!(sql.contains("FROM readings"));
        assert!(sql.contains("ORDER BY id ASC"));
        assert!(!sql.contains("WHERE"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_build_sql_newest_first() {
        let query = ReadingQuery::new().newest_first();
        let sql = query.build_sql();
        assert!(sql.contains("ORDER BY reading_time DESC, id DESC"));
    }

    #[test]
    fn test_build_sql_complete() {
        let since = datetime!(2024-06-01 00:00:00 UTC);
        let query = ReadingQuery::new()
            .device("Nuclear Reactor")
            .since(since)
            .limit(100)
            .offset(10);

        let sql = query.build_sql();

        assert!(sql.contains("WHERE"));
        assert!(sql.contains("device_name = ?"));
        assert!(sql.contains("reading_time >= ?"));
        assert!(sql.contains("LIMIT 100"));
        assert!(sql.contains("OFFSET 10"));
    }

    #[test]
    fn test_query_clone() {
        let query = ReadingQuery::new().device("A").limit(50);
        let cloned = query.clone();

        assert_eq!(cloned.device_name, query.device_name);
        assert_eq!(cloned.limit, query.limit);
    }
}
