//! Typed table access: optimistic saves, soft deletes, batch writes, and
//! windowed reads for [`Record`] types.
//!
//! A repository is a stateless SQL factory bound to a dialect; every call
//! takes the [`DbContext`] to run on. Writes guard on the record version
//! (`where pk = id and deleted = 0 and version = v`), so a lost race shows
//! up as zero affected rows instead of an error.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use chrono::{NaiveDateTime, Utc};

use crate::context::DbContext;
use crate::dialect::SqlDialect;
use crate::error::NadoError;
use crate::interpolate::sql_literal;
use crate::page::Page;
use crate::record::{BASE_FIELDS, Record};
use crate::results::ResultSet;
use crate::statement::{Statement, StatementBuilder};
use crate::types::SqlValue;
use crate::wrapper::QueryWrapper;

/// How new records get their primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// The database assigns the key; inserts read it back.
    AutoIncrement,
    /// The process-wide snowflake generator assigns the key up front.
    #[default]
    Snowflake,
}

/// Per-repository behavior switches.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryOptions {
    /// `delete` flips the `deleted` flag instead of removing the row, and
    /// reads filter flagged rows out.
    pub soft_delete: bool,
    pub id_strategy: IdStrategy,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        RepositoryOptions {
            soft_delete: true,
            id_strategy: IdStrategy::Snowflake,
        }
    }
}

/// SQL factory for one mapped table.
///
/// ```rust
/// # use nado::prelude::*;
/// # use nado::record::{BaseRecord, FieldMeta, TableSchema};
/// # static FIELDS: &[FieldMeta] = &[
/// #     FieldMeta::new("id").length(20),
/// #     FieldMeta::new("version").required().length(11),
/// #     FieldMeta::new("deleted").required().length(4),
/// #     FieldMeta::new("create_time").length(20),
/// #     FieldMeta::new("modify_time").length(20),
/// # ];
/// # static SCHEMA: TableSchema = TableSchema {
/// #     table: "audit",
/// #     primary_key: "id",
/// #     fields: FIELDS,
/// # };
/// # #[derive(Default)]
/// # struct Audit {
/// #     base: BaseRecord,
/// # }
/// # impl Record for Audit {
/// #     fn schema() -> &'static TableSchema {
/// #         &SCHEMA
/// #     }
/// #     fn base(&self) -> &BaseRecord {
/// #         &self.base
/// #     }
/// #     fn base_mut(&mut self) -> &mut BaseRecord {
/// #         &mut self.base
/// #     }
/// #     fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
/// #         self.base.base_row()
/// #     }
/// #     fn from_row(row: &nado::results::Row) -> Result<Self, NadoError> {
/// #         Ok(Audit { base: BaseRecord::from_row(row) })
/// #     }
/// # }
/// let repo: Repository<Audit> = Repository::new(SqlDialect::Sqlite)?;
/// # let _ = repo;
/// # Ok::<(), NadoError>(())
/// ```
pub struct Repository<T: Record> {
    dialect: SqlDialect,
    options: RepositoryOptions,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &T::schema().table)
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .finish()
    }
}

impl<T: Record> Clone for Repository<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Record> Copy for Repository<T> {}

fn is_base_field(name: &str) -> bool {
    BASE_FIELDS.iter().any(|f| f.name == name)
}

impl<T: Record> Repository<T> {
    /// A repository with the default options (soft deletes, snowflake ids).
    ///
    /// # Errors
    ///
    /// Same as [`Repository::with_options`].
    pub fn new(dialect: SqlDialect) -> Result<Self, NadoError> {
        Self::with_options(dialect, RepositoryOptions::default())
    }

    /// Build a repository, running the schema check once.
    ///
    /// # Errors
    ///
    /// `MappingError` for a schema that fails [`crate::record::TableSchema::check`]
    /// or does not persist all of [`BASE_FIELDS`].
    pub fn with_options(dialect: SqlDialect, options: RepositoryOptions) -> Result<Self, NadoError> {
        let schema = T::schema();
        schema.check()?;
        for base in &BASE_FIELDS {
            if !schema.field(base.name).is_some_and(|f| f.exists) {
                return Err(NadoError::MappingError(format!(
                    "schema for {} is missing base field {}",
                    schema.table, base.name
                )));
            }
        }
        Ok(Repository {
            dialect,
            options,
            _record: PhantomData,
        })
    }

    #[must_use]
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    #[must_use]
    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    fn builder(&self) -> StatementBuilder {
        StatementBuilder::new(self.dialect)
    }

    /// `deleted = 0 and ` prefix for read predicates, empty in hard-delete
    /// mode. Wrapper conditions start with the neutral `1=1`, so the prefix
    /// composes with any segment.
    fn read_filter(&self) -> String {
        if self.options.soft_delete {
            format!("{} = 0 and ", self.dialect.quote_ident("deleted"))
        } else {
            String::new()
        }
    }

    fn optimistic_where(&self, id: i64, version: i64) -> String {
        let schema = T::schema();
        format!(
            "{} = {id} and {} = 0 and {} = {version}",
            self.dialect.quote_ident(schema.primary_key),
            self.dialect.quote_ident("deleted"),
            self.dialect.quote_ident("version")
        )
    }

    /// Persisted non-base columns of the record, schema order.
    fn data_values(&self, record: &T) -> Vec<(&'static str, SqlValue)> {
        let schema = T::schema();
        record
            .to_row()
            .into_iter()
            .filter(|entry| {
                let name = entry.0;
                schema.field(name).is_some_and(|f| f.exists)
                    && !is_base_field(name)
                    && name != schema.primary_key
            })
            .collect()
    }

    /// Persisted columns of the record, with the primary key optionally
    /// left out (auto-increment inserts).
    fn insert_values(&self, record: &T, include_id: bool) -> Vec<(&'static str, SqlValue)> {
        let schema = T::schema();
        record
            .to_row()
            .into_iter()
            .filter(|entry| {
                let name = entry.0;
                schema.field(name).is_some_and(|f| f.exists)
                    && (include_id || name != schema.primary_key)
            })
            .collect()
    }

    fn select_columns(&self) -> Vec<String> {
        T::schema()
            .existing_fields()
            .map(|f| self.dialect.quote_ident(f.name))
            .collect()
    }

    /// Insert or update one record.
    ///
    /// A record with an id gets an optimistic UPDATE guarded on its
    /// version; zero affected rows means another writer got there first,
    /// and the caller decides whether to reload and retry. One affected
    /// row bumps the in-memory version and modify time to match the
    /// database.
    ///
    /// A record without an id is inserted. Under the snowflake strategy
    /// the id is assigned up front; under auto-increment the generated key
    /// is read back in the same unit of work. Unset audit timestamps are
    /// stamped with the current time.
    ///
    /// # Errors
    ///
    /// `ValidationError` from the schema check, otherwise driver errors.
    pub async fn save(&self, ctx: &mut DbContext, record: &mut T) -> Result<usize, NadoError> {
        record.validate()?;
        let schema = T::schema();
        let now = Utc::now().naive_utc();
        if let Some(id) = record.base().id {
            let version = record.base().version;
            let mut values = self.data_values(record);
            values.push(("version", SqlValue::Int(version + 1)));
            values.push(("modify_time", SqlValue::Timestamp(now)));
            let stmt =
                self.builder()
                    .update(schema.table, &values, &self.optimistic_where(id, version))?;
            let affected = ctx.execute_statement(&stmt).await?;
            if affected > 0 {
                let base = record.base_mut();
                base.version = version + 1;
                base.modify_time = Some(now);
            }
            Ok(affected)
        } else {
            {
                let base = record.base_mut();
                if base.create_time.is_none() {
                    base.create_time = Some(now);
                }
                if base.modify_time.is_none() {
                    base.modify_time = Some(now);
                }
            }
            match self.options.id_strategy {
                IdStrategy::Snowflake => {
                    record.base_mut().assign_id();
                    let values = self.insert_values(record, true);
                    let stmt = self.builder().insert(schema.table, &values, "")?;
                    ctx.execute_statement(&stmt).await
                }
                IdStrategy::AutoIncrement => {
                    let values = self.insert_values(record, false);
                    let stmt = self.builder().insert(schema.table, &values, "")?;
                    let id = ctx.insert_with_id(&stmt, schema.primary_key).await?;
                    record.base_mut().id = Some(id);
                    Ok(1)
                }
            }
        }
    }

    /// Insert a batch as one multi-row statement. A single-record batch
    /// delegates to [`Repository::save`].
    ///
    /// Under auto-increment the batch must carry ids on every record or on
    /// none (the generated keys of a multi-row insert cannot be read back
    /// per row); snowflake batches get missing ids assigned first.
    ///
    /// # Errors
    ///
    /// `ValidationError` for an empty batch, a failed schema check, or a
    /// mixed-id auto-increment batch; otherwise driver errors.
    pub async fn create_batch(
        &self,
        ctx: &mut DbContext,
        records: &mut [T],
    ) -> Result<usize, NadoError> {
        match records {
            [] => Err(NadoError::ValidationError(
                "batch requires at least one record".to_string(),
            )),
            [single] => self.save(ctx, single).await,
            _ => {
                let stmt = self.batch_insert_statement(records, "")?;
                ctx.execute_statement(&stmt).await
            }
        }
    }

    /// Insert a batch with the dialect's upsert clause, so rows whose key
    /// already exists are overwritten instead of rejected.
    ///
    /// # Errors
    ///
    /// As [`Repository::create_batch`], plus `ExecutionError` when the
    /// dialect has no upsert clause.
    pub async fn save_batch(
        &self,
        ctx: &mut DbContext,
        records: &mut [T],
    ) -> Result<usize, NadoError> {
        if records.is_empty() {
            return Err(NadoError::ValidationError(
                "batch requires at least one record".to_string(),
            ));
        }
        let clause = self.upsert_clause()?;
        let stmt = self.batch_insert_statement(records, &clause)?;
        ctx.execute_statement(&stmt).await
    }

    fn upsert_clause(&self) -> Result<String, NadoError> {
        let schema = T::schema();
        let columns: Vec<&str> = schema
            .existing_fields()
            .map(|f| f.name)
            .filter(|name| *name != schema.primary_key)
            .collect();
        self.dialect
            .upsert_clause(schema.primary_key, &columns)
            .ok_or_else(|| NadoError::ExecutionError("dialect has no upsert clause".to_string()))
    }

    fn batch_insert_statement(
        &self,
        records: &mut [T],
        last: &str,
    ) -> Result<Statement, NadoError> {
        let schema = T::schema();
        for record in records.iter() {
            record.validate()?;
        }
        if self.options.id_strategy == IdStrategy::AutoIncrement {
            let with_id = records.iter().filter(|r| r.base().id.is_some()).count();
            if with_id != 0 && with_id != records.len() {
                return Err(NadoError::ValidationError(
                    "auto-increment batch must carry ids on every record or none".to_string(),
                ));
            }
        }
        let now = Utc::now().naive_utc();
        for record in records.iter_mut() {
            let base = record.base_mut();
            if base.create_time.is_none() {
                base.create_time = Some(now);
            }
            if base.modify_time.is_none() {
                base.modify_time = Some(now);
            }
            if self.options.id_strategy == IdStrategy::Snowflake {
                base.assign_id();
            }
        }
        let include_id = records[0].base().id.is_some();
        let columns: Vec<&str> = schema
            .existing_fields()
            .map(|f| f.name)
            .filter(|name| include_id || *name != schema.primary_key)
            .collect();
        let mut rows = Vec::with_capacity(records.len());
        for record in records.iter() {
            let mut by_name: HashMap<&'static str, SqlValue> =
                record.to_row().into_iter().collect();
            let row = columns
                .iter()
                .map(|column| {
                    by_name.remove(*column).ok_or_else(|| {
                        NadoError::MappingError(format!(
                            "row for {} is missing column {column}",
                            schema.table
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        self.builder()
            .insert_many(schema.table, &columns, &rows, last)
    }

    /// Update a batch in one round trip, each row guarded on its own
    /// version.
    ///
    /// Every data column becomes a `CASE WHEN pk = id AND version = v THEN
    /// value ELSE column END` assignment, so stale rows keep their values
    /// while fresh rows are written. A verification read of the batch ids
    /// follows in the same transaction; the returned vector has `1` for
    /// each record whose guard matched (its in-memory version is bumped)
    /// and `0` for each stale one, in input order.
    ///
    /// # Errors
    ///
    /// `ValidationError` for an empty batch, a failed schema check, or a
    /// record without an id; otherwise driver errors.
    pub async fn update_batch(
        &self,
        ctx: &mut DbContext,
        records: &mut [T],
    ) -> Result<Vec<usize>, NadoError> {
        if records.is_empty() {
            return Err(NadoError::ValidationError(
                "batch requires at least one record".to_string(),
            ));
        }
        let schema = T::schema();
        let mut guards = Vec::with_capacity(records.len());
        for record in records.iter() {
            record.validate()?;
            let Some(id) = record.base().id else {
                return Err(NadoError::ValidationError("record has no id".to_string()));
            };
            guards.push((id, record.base().version));
        }
        let now = Utc::now().naive_utc();
        let stmt = self.batch_update_statement(records, &guards, now)?;
        let verify = self.version_select_statement(&guards);

        let tx = ctx.begin().await?;
        if let Err(e) = ctx.execute_statement(&stmt).await {
            ctx.rollback_quietly(&tx).await;
            return Err(e);
        }
        let fetched = match ctx.query_statement(&verify).await {
            Ok(set) => set,
            Err(e) => {
                ctx.rollback_quietly(&tx).await;
                return Err(e);
            }
        };
        ctx.commit(&tx).await?;

        let mut versions = HashMap::with_capacity(fetched.len());
        for row in &fetched.rows {
            if let (Some(id), Some(version)) = (
                row.get(schema.primary_key).and_then(SqlValue::as_int),
                row.get("version").and_then(SqlValue::as_int),
            ) {
                versions.insert(*id, *version);
            }
        }
        let mut applied = Vec::with_capacity(records.len());
        for (record, (id, version)) in records.iter_mut().zip(&guards) {
            if versions.get(id) == Some(&(version + 1)) {
                let base = record.base_mut();
                base.version = version + 1;
                base.modify_time = Some(now);
                applied.push(1);
            } else {
                applied.push(0);
            }
        }
        Ok(applied)
    }

    fn batch_update_statement(
        &self,
        records: &[T],
        guards: &[(i64, i64)],
        now: NaiveDateTime,
    ) -> Result<Statement, NadoError> {
        let schema = T::schema();
        let pk = self.dialect.quote_ident(schema.primary_key);
        let version_col = self.dialect.quote_ident("version");
        let data_columns: Vec<&str> = schema
            .existing_fields()
            .map(|f| f.name)
            .filter(|name| !is_base_field(name) && *name != schema.primary_key)
            .collect();
        let rows: Vec<HashMap<&'static str, SqlValue>> = records
            .iter()
            .map(|record| record.to_row().into_iter().collect())
            .collect();

        let mut assignments = Vec::with_capacity(data_columns.len() + 2);
        for column in &data_columns {
            let quoted = self.dialect.quote_ident(column);
            let mut whens = String::new();
            for (row, (id, version)) in rows.iter().zip(guards) {
                let value = row.get(*column).ok_or_else(|| {
                    NadoError::MappingError(format!(
                        "row for {} is missing column {column}",
                        schema.table
                    ))
                })?;
                let literal = sql_literal(value)?;
                whens.push_str(&format!(
                    " when {pk} = {id} and {version_col} = {version} then {literal}"
                ));
            }
            assignments.push(format!("{quoted} = case{whens} else {quoted} end"));
        }
        // modify_time before version: MySQL applies SET left to right, and
        // both CASE guards reference the pre-bump version.
        let now_literal = sql_literal(&SqlValue::Timestamp(now))?;
        let modify_col = self.dialect.quote_ident("modify_time");
        let mut modify_whens = String::new();
        let mut version_whens = String::new();
        for (id, version) in guards {
            let next = version + 1;
            modify_whens.push_str(&format!(
                " when {pk} = {id} and {version_col} = {version} then {now_literal}"
            ));
            version_whens.push_str(&format!(
                " when {pk} = {id} and {version_col} = {version} then {next}"
            ));
        }
        assignments.push(format!(
            "{modify_col} = case{modify_whens} else {modify_col} end"
        ));
        assignments.push(format!(
            "{version_col} = case{version_whens} else {version_col} end"
        ));

        let ids = guards
            .iter()
            .map(|(id, _)| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "update {} set {} where {pk} in ({ids}) and {} = 0",
            self.dialect.quote_ident(schema.table),
            assignments.join(","),
            self.dialect.quote_ident("deleted")
        );
        Ok(Statement::raw(sql))
    }

    fn version_select_statement(&self, guards: &[(i64, i64)]) -> Statement {
        let schema = T::schema();
        let pk = self.dialect.quote_ident(schema.primary_key);
        let version_col = self.dialect.quote_ident("version");
        let ids = guards
            .iter()
            .map(|(id, _)| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let columns = [pk.as_str(), version_col.as_str()];
        self.builder()
            .select(schema.table, &columns, &format!("{pk} in ({ids})"), "")
    }

    /// Delete one record: flip the `deleted` flag in soft mode, remove the
    /// row otherwise. The record itself is not modified.
    ///
    /// # Errors
    ///
    /// `ValidationError` when the record has no id, otherwise driver
    /// errors.
    pub async fn delete(&self, ctx: &mut DbContext, record: &T) -> Result<usize, NadoError> {
        let schema = T::schema();
        let Some(id) = record.base().id else {
            return Err(NadoError::ValidationError("record has no id".to_string()));
        };
        let pk = self.dialect.quote_ident(schema.primary_key);
        if self.options.soft_delete {
            let now = Utc::now().naive_utc();
            let values = [
                ("deleted", SqlValue::Int(1)),
                ("modify_time", SqlValue::Timestamp(now)),
            ];
            let where_clause = format!(
                "{pk} = {id} and {} = 0",
                self.dialect.quote_ident("deleted")
            );
            let stmt = self.builder().update(schema.table, &values, &where_clause)?;
            ctx.execute_statement(&stmt).await
        } else {
            let stmt = self.builder().delete(schema.table, &format!("{pk} = {id}"));
            ctx.execute_statement(&stmt).await
        }
    }

    /// Fetch one record by primary key. Soft-deleted rows read as absent.
    ///
    /// # Errors
    ///
    /// `MappingError` from the record's row conversion, otherwise driver
    /// errors.
    pub async fn get_by_id(&self, ctx: &mut DbContext, id: i64) -> Result<Option<T>, NadoError> {
        let schema = T::schema();
        let columns = self.select_columns();
        let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        let where_clause = format!(
            "{}{} = {id}",
            self.read_filter(),
            self.dialect.quote_ident(schema.primary_key)
        );
        let stmt = self
            .builder()
            .select(schema.table, &column_refs, &where_clause, "");
        let set = ctx.query_statement(&stmt).await?;
        match set.first() {
            Some(row) => Ok(Some(T::from_row(row)?)),
            None => Ok(None),
        }
    }

    async fn select_rows(
        &self,
        ctx: &mut DbContext,
        wrapper: &QueryWrapper,
    ) -> Result<ResultSet, NadoError> {
        let schema = T::schema();
        let columns = self.select_columns();
        let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        let segment = format!("{}{}", self.read_filter(), wrapper.sql_segment());
        let stmt = self
            .builder()
            .select(schema.table, &column_refs, &segment, "");
        ctx.query_statement(&stmt).await
    }

    /// Fetch all records matching the wrapper, in its ordering.
    ///
    /// # Errors
    ///
    /// `MappingError` from the record's row conversion, otherwise driver
    /// errors.
    pub async fn select_list(
        &self,
        ctx: &mut DbContext,
        wrapper: &QueryWrapper,
    ) -> Result<Vec<T>, NadoError> {
        let set = self.select_rows(ctx, wrapper).await?;
        set.rows.iter().map(T::from_row).collect()
    }

    /// Count the rows matching the wrapper's conditions; its ordering and
    /// trailing clause are ignored.
    ///
    /// # Errors
    ///
    /// `MappingError` when the count comes back non-integer, otherwise
    /// driver errors.
    pub async fn count(
        &self,
        ctx: &mut DbContext,
        wrapper: &QueryWrapper,
    ) -> Result<usize, NadoError> {
        let schema = T::schema();
        let conditions = format!("{}{}", self.read_filter(), wrapper.conditions_segment());
        let stmt = self
            .builder()
            .select(schema.table, &["count(*)"], &conditions, "");
        let set = ctx.query_statement(&stmt).await?;
        let total = set
            .first()
            .and_then(|row| row.get_by_index(0))
            .and_then(SqlValue::as_int)
            .copied()
            .ok_or_else(|| {
                NadoError::MappingError("count query returned no integer".to_string())
            })?;
        usize::try_from(total)
            .map_err(|_| NadoError::MappingError("count query returned a negative total".to_string()))
    }

    /// Fill one page: `total` from a count over the page's conditions,
    /// `records` from a select with its window clause.
    ///
    /// # Errors
    ///
    /// Driver errors from either round trip.
    pub async fn select_page(&self, ctx: &mut DbContext, page: &mut Page) -> Result<(), NadoError> {
        let total = self.count(ctx, page.wrapper()).await?;
        let set = self.select_rows(ctx, page.wrapper()).await?;
        page.total = total;
        page.records = set.rows;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BaseRecord, FieldMeta, TableSchema};
    use crate::results::Row;

    static BOOK_FIELDS: &[FieldMeta] = &[
        FieldMeta::new("id").length(20),
        FieldMeta::new("version").required().length(11),
        FieldMeta::new("deleted").required().length(4),
        FieldMeta::new("create_time").length(20),
        FieldMeta::new("modify_time").length(20),
        FieldMeta::new("title").required().length(32),
        FieldMeta::new("pages").length(11),
    ];

    static BOOK_SCHEMA: TableSchema = TableSchema {
        table: "book",
        primary_key: "id",
        fields: BOOK_FIELDS,
    };

    #[derive(Debug, Clone, Default)]
    struct Book {
        base: BaseRecord,
        title: String,
        pages: i64,
    }

    impl Record for Book {
        fn schema() -> &'static TableSchema {
            &BOOK_SCHEMA
        }

        fn base(&self) -> &BaseRecord {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseRecord {
            &mut self.base
        }

        fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
            let mut row = self.base.base_row();
            row.push(("title", SqlValue::Text(self.title.clone())));
            row.push(("pages", SqlValue::Int(self.pages)));
            row
        }

        fn from_row(row: &Row) -> Result<Self, NadoError> {
            let title = row
                .get("title")
                .and_then(|v| v.as_text())
                .unwrap_or_default()
                .to_string();
            let pages = row.get("pages").and_then(|v| v.as_int()).copied().unwrap_or(0);
            Ok(Book {
                base: BaseRecord::from_row(row),
                title,
                pages,
            })
        }
    }

    fn book(id: Option<i64>, version: i64, title: &str, pages: i64) -> Book {
        Book {
            base: BaseRecord {
                id,
                version,
                ..BaseRecord::default()
            },
            title: title.to_string(),
            pages,
        }
    }

    fn repo() -> Repository<Book> {
        Repository::new(SqlDialect::MySql).unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn default_options() {
        let repo = repo();
        assert!(repo.options().soft_delete);
        assert_eq!(repo.options().id_strategy, IdStrategy::Snowflake);
    }

    #[test]
    fn construction_requires_base_fields() {
        static BARE_FIELDS: &[FieldMeta] = &[FieldMeta::new("id")];
        static BARE_SCHEMA: TableSchema = TableSchema {
            table: "bare",
            primary_key: "id",
            fields: BARE_FIELDS,
        };
        struct Bare;
        impl Record for Bare {
            fn schema() -> &'static TableSchema {
                &BARE_SCHEMA
            }
            fn base(&self) -> &BaseRecord {
                unreachable!()
            }
            fn base_mut(&mut self) -> &mut BaseRecord {
                unreachable!()
            }
            fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
                Vec::new()
            }
            fn from_row(_row: &Row) -> Result<Self, NadoError> {
                Ok(Bare)
            }
        }
        let err = Repository::<Bare>::new(SqlDialect::MySql).unwrap_err();
        assert!(matches!(err, NadoError::MappingError(_)));
    }

    #[test]
    fn optimistic_where_text() {
        assert_eq!(
            repo().optimistic_where(7, 3),
            "`id` = 7 and `deleted` = 0 and `version` = 3"
        );
    }

    #[test]
    fn read_filter_modes() {
        assert_eq!(repo().read_filter(), "`deleted` = 0 and ");
        let hard = Repository::<Book>::with_options(
            SqlDialect::MySql,
            RepositoryOptions {
                soft_delete: false,
                ..RepositoryOptions::default()
            },
        )
        .unwrap();
        assert_eq!(hard.read_filter(), "");
    }

    #[test]
    fn data_values_excludes_base_columns() {
        let book = book(Some(1), 0, "a", 10);
        let values = repo().data_values(&book);
        let names: Vec<_> = values.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["title", "pages"]);
    }

    #[test]
    fn upsert_clause_per_dialect() {
        let clause = repo().upsert_clause().unwrap();
        assert!(clause.starts_with(" ON DUPLICATE KEY UPDATE"));
        assert!(clause.contains("`title`=VALUES(`title`)"));
        let no_upsert = Repository::<Book>::new(SqlDialect::SqlServer).unwrap();
        assert!(matches!(
            no_upsert.upsert_clause().unwrap_err(),
            NadoError::ExecutionError(_)
        ));
    }

    #[test]
    fn batch_update_statement_text() {
        let books = [book(Some(1), 0, "a", 10), book(Some(2), 1, "b", 20)];
        let stmt = repo()
            .batch_update_statement(&books, &[(1, 0), (2, 1)], ts("2024-05-06 07:08:09"))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "update `book` set \
`title` = case when `id` = 1 and `version` = 0 then 'a' \
when `id` = 2 and `version` = 1 then 'b' else `title` end,\
`pages` = case when `id` = 1 and `version` = 0 then 10 \
when `id` = 2 and `version` = 1 then 20 else `pages` end,\
`modify_time` = case when `id` = 1 and `version` = 0 then '2024-05-06 07:08:09' \
when `id` = 2 and `version` = 1 then '2024-05-06 07:08:09' else `modify_time` end,\
`version` = case when `id` = 1 and `version` = 0 then 1 \
when `id` = 2 and `version` = 1 then 2 else `version` end \
where `id` in (1,2) and `deleted` = 0"
        );
    }

    #[test]
    fn version_select_text() {
        let stmt = repo().version_select_statement(&[(1, 0), (2, 1)]);
        assert_eq!(
            stmt.sql,
            "select `id`,`version` from `book` where `id` in (1,2)"
        );
    }

    #[test]
    fn auto_increment_batch_rejects_mixed_ids() {
        let auto = Repository::<Book>::with_options(
            SqlDialect::MySql,
            RepositoryOptions {
                id_strategy: IdStrategy::AutoIncrement,
                ..RepositoryOptions::default()
            },
        )
        .unwrap();
        let mut books = [book(Some(1), 0, "a", 10), book(None, 0, "b", 20)];
        let err = auto.batch_insert_statement(&mut books, "").unwrap_err();
        assert!(matches!(err, NadoError::ValidationError(_)));
    }

    #[test]
    fn auto_increment_batch_without_ids_omits_id_column() {
        let auto = Repository::<Book>::with_options(
            SqlDialect::MySql,
            RepositoryOptions {
                id_strategy: IdStrategy::AutoIncrement,
                ..RepositoryOptions::default()
            },
        )
        .unwrap();
        let mut books = [book(None, 0, "a", 10), book(None, 0, "b", 20)];
        let stmt = auto.batch_insert_statement(&mut books, "").unwrap();
        assert!(stmt.sql.starts_with(
            "insert into `book` (`version`,`deleted`,`create_time`,`modify_time`,`title`,`pages`) values"
        ));
        assert!(books.iter().all(|b| b.base.id.is_none()));
    }

    #[test]
    fn snowflake_batch_assigns_ids_and_stamps_times() {
        let mut books = [book(None, 0, "a", 10), book(None, 0, "b", 20)];
        let stmt = repo().batch_insert_statement(&mut books, "").unwrap();
        assert!(stmt.sql.starts_with(
            "insert into `book` (`id`,`version`,`deleted`,`create_time`,`modify_time`,`title`,`pages`) values"
        ));
        assert!(books.iter().all(|b| b.base.id.is_some()));
        assert!(books.iter().all(|b| b.base.create_time.is_some()));
        assert_ne!(books[0].base.id, books[1].base.id);
    }

    #[test]
    fn batch_insert_rejects_invalid_record() {
        let mut books = [book(None, 0, "", 10), book(None, 0, "b", 20)];
        books[0].title = "a title far too long for the schema".to_string();
        let err = repo().batch_insert_statement(&mut books, "").unwrap_err();
        assert!(matches!(err, NadoError::ValidationError(_)));
    }

    #[test]
    fn debug_names_the_table() {
        let text = format!("{:?}", repo());
        assert!(text.contains("book"));
    }
}
