#![cfg(feature = "sqlite")]

use nado::prelude::*;
use nado::record::{FieldMeta, TableSchema};
use tempfile::tempdir;
use tokio::runtime::Runtime;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

static BOOK_FIELDS: &[FieldMeta] = &[
    FieldMeta::new("id").length(20),
    FieldMeta::new("version").required().length(11),
    FieldMeta::new("deleted").required().length(4),
    FieldMeta::new("create_time").length(20),
    FieldMeta::new("modify_time").length(20),
    FieldMeta::new("title").required().length(64),
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

fn book(title: &str, pages: i64) -> Book {
    Book {
        base: BaseRecord::default(),
        title: title.to_string(),
        pages,
    }
}

async fn book_driver(prefix: &str) -> Result<Driver, NadoError> {
    let driver = Driver::new_sqlite(DbConfig::sqlite(unique_db_path(prefix))).await?;
    let mut ctx = driver.context();
    ctx.execute_batch(
        "create table if not exists book (
            id integer primary key,
            version integer not null default 0,
            deleted integer not null default 0,
            create_time text,
            modify_time text,
            title text not null,
            pages integer
        );",
    )
    .await?;
    Ok(driver)
}

async fn raw_row_count(ctx: &mut DbContext) -> Result<i64, NadoError> {
    let rows = ctx.query("select count(*) from book", &[]).await?;
    Ok(rows
        .first()
        .and_then(|r| r.get_by_index(0))
        .and_then(SqlValue::as_int)
        .copied()
        .unwrap_or(-1))
}

#[test]
fn save_assigns_ids_and_guards_updates_by_version() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_save").await?;
        let mut ctx = driver.context();
        let repo: Repository<Book> = Repository::new(SqlDialect::Sqlite)?;

        let mut dune = book("Dune", 412);
        assert_eq!(repo.save(&mut ctx, &mut dune).await?, 1);
        let id = dune.base().id.expect("id assigned on insert");
        assert!(dune.base().create_time.is_some());
        assert_eq!(dune.base().version, 0);

        let fetched = repo.get_by_id(&mut ctx, id).await?.expect("row exists");
        assert_eq!(fetched.title, "Dune");
        assert_eq!(fetched.base().version, 0);

        dune.title = "Dune (revised)".to_string();
        assert_eq!(repo.save(&mut ctx, &mut dune).await?, 1);
        assert_eq!(dune.base().version, 1);

        // The earlier copy still carries version 0 and must lose.
        let mut stale = fetched;
        stale.title = "Dune (stale)".to_string();
        assert_eq!(repo.save(&mut ctx, &mut stale).await?, 0);
        assert_eq!(stale.base().version, 0);

        let current = repo.get_by_id(&mut ctx, id).await?.expect("row exists");
        assert_eq!(current.title, "Dune (revised)");
        assert_eq!(current.base().version, 1);
        println!("optimistic save behaved");
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn auto_increment_ids_come_from_the_database() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_autoinc").await?;
        let mut ctx = driver.context();
        let options = RepositoryOptions {
            id_strategy: IdStrategy::AutoIncrement,
            ..RepositoryOptions::default()
        };
        let repo: Repository<Book> = Repository::with_options(SqlDialect::Sqlite, options)?;

        let mut first = book("First", 100);
        repo.save(&mut ctx, &mut first).await?;
        assert_eq!(first.base().id, Some(1));

        let mut second = book("Second", 200);
        repo.save(&mut ctx, &mut second).await?;
        assert_eq!(second.base().id, Some(2));

        let fetched = repo.get_by_id(&mut ctx, 2).await?.expect("row exists");
        assert_eq!(fetched.title, "Second");
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn soft_delete_hides_rows_without_removing_them() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_soft_delete").await?;
        let mut ctx = driver.context();
        let repo: Repository<Book> = Repository::new(SqlDialect::Sqlite)?;

        let mut hidden = book("Hidden", 1);
        repo.save(&mut ctx, &mut hidden).await?;
        let id = hidden.base().id.unwrap();

        assert_eq!(repo.delete(&mut ctx, &hidden).await?, 1);
        assert!(repo.get_by_id(&mut ctx, id).await?.is_none());
        let everything = ctx.wrapper();
        assert_eq!(repo.count(&mut ctx, &everything).await?, 0);
        // The row is flagged, not removed.
        assert_eq!(raw_row_count(&mut ctx).await?, 1);

        // Deleting again matches nothing.
        assert_eq!(repo.delete(&mut ctx, &hidden).await?, 0);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn hard_delete_removes_rows() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_hard_delete").await?;
        let mut ctx = driver.context();
        let options = RepositoryOptions {
            soft_delete: false,
            ..RepositoryOptions::default()
        };
        let repo: Repository<Book> = Repository::with_options(SqlDialect::Sqlite, options)?;

        let mut gone = book("Gone", 2);
        repo.save(&mut ctx, &mut gone).await?;
        assert_eq!(repo.delete(&mut ctx, &gone).await?, 1);
        assert_eq!(raw_row_count(&mut ctx).await?, 0);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn create_batch_inserts_every_record() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_create_batch").await?;
        let mut ctx = driver.context();
        let repo: Repository<Book> = Repository::new(SqlDialect::Sqlite)?;

        let err = repo.create_batch(&mut ctx, &mut []).await.unwrap_err();
        assert!(matches!(err, NadoError::ValidationError(_)));

        let mut batch = vec![book("A", 1), book("B", 2), book("C", 3)];
        assert_eq!(repo.create_batch(&mut ctx, &mut batch).await?, 3);
        let ids: Vec<i64> = batch.iter().map(|b| b.base().id.unwrap()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] != w[1]));

        let everything = ctx.wrapper();
        assert_eq!(repo.count(&mut ctx, &everything).await?, 3);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn save_batch_upserts_existing_rows() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_save_batch").await?;
        let mut ctx = driver.context();
        let repo: Repository<Book> = Repository::new(SqlDialect::Sqlite)?;

        let mut existing = book("Left Hand", 286);
        repo.save(&mut ctx, &mut existing).await?;
        let id = existing.base().id.unwrap();

        let mut existing = repo.get_by_id(&mut ctx, id).await?.expect("row exists");
        existing.title = "The Left Hand of Darkness".to_string();
        let mut batch = vec![existing, book("New Arrival", 120)];
        repo.save_batch(&mut ctx, &mut batch).await?;

        let everything = ctx.wrapper();
        assert_eq!(repo.count(&mut ctx, &everything).await?, 2);
        let refreshed = repo.get_by_id(&mut ctx, id).await?.expect("row exists");
        assert_eq!(refreshed.title, "The Left Hand of Darkness");
        assert!(batch[1].base().id.is_some());
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn update_batch_reports_stale_rows_individually() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_update_batch").await?;
        let mut ctx = driver.context();
        let repo: Repository<Book> = Repository::new(SqlDialect::Sqlite)?;

        let mut a = book("Alpha", 10);
        let mut b = book("Beta", 20);
        repo.save(&mut ctx, &mut a).await?;
        repo.save(&mut ctx, &mut b).await?;

        a.title = "Alpha II".to_string();
        b.title = "Beta II".to_string();
        let mut batch = vec![a, b];
        assert_eq!(repo.update_batch(&mut ctx, &mut batch).await?, vec![1, 1]);
        assert_eq!(batch[0].base().version, 1);
        assert_eq!(batch[1].base().version, 1);

        // Rewind one record's version so its guard misses.
        batch[0].title = "Alpha III".to_string();
        batch[1].title = "Beta III".to_string();
        batch[1].base_mut().version = 0;
        assert_eq!(repo.update_batch(&mut ctx, &mut batch).await?, vec![1, 0]);
        assert_eq!(batch[0].base().version, 2);
        assert_eq!(batch[1].base().version, 0);

        let fresh_a = repo
            .get_by_id(&mut ctx, batch[0].base().id.unwrap())
            .await?
            .expect("row exists");
        let fresh_b = repo
            .get_by_id(&mut ctx, batch[1].base().id.unwrap())
            .await?
            .expect("row exists");
        assert_eq!(fresh_a.title, "Alpha III");
        assert_eq!(fresh_b.title, "Beta II");
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn select_list_count_and_pagination() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_pages").await?;
        let mut ctx = driver.context();
        let repo: Repository<Book> = Repository::new(SqlDialect::Sqlite)?;

        let mut batch: Vec<Book> = (1..=25)
            .map(|i| book(&format!("Vol {i:02}"), i))
            .collect();
        repo.create_batch(&mut ctx, &mut batch).await?;

        let short_books = ctx.wrapper().le("pages", 5).add_order("pages", false);
        let shortlist = repo.select_list(&mut ctx, &short_books).await?;
        assert_eq!(shortlist.len(), 5);
        assert_eq!(shortlist[0].pages, 5);

        let filtered = ctx.wrapper().like_right("title", "Vol ");
        assert_eq!(repo.count(&mut ctx, &filtered).await?, 25);

        let mut page = Page::new(&filtered.add_order("pages", true), 0, 10);
        repo.select_page(&mut ctx, &mut page).await?;
        assert_eq!(page.total, 25);
        assert_eq!(page.records.len(), 10);
        assert_eq!(
            page.records[0].get("pages").and_then(|v| v.as_int()),
            Some(&1)
        );

        page.next();
        repo.select_page(&mut ctx, &mut page).await?;
        assert_eq!(page.records.len(), 10);
        assert_eq!(
            page.records[0].get("pages").and_then(|v| v.as_int()),
            Some(&11)
        );

        page.next();
        repo.select_page(&mut ctx, &mut page).await?;
        assert_eq!(page.records.len(), 5);

        // Final page: the window cannot advance further.
        page.next();
        assert_eq!(page.offset, 20);
        println!("pagination walked 25 rows in three windows");
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}

#[test]
fn validation_rejects_bad_records_before_sql_runs() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let driver = book_driver("repo_validation").await?;
        let mut ctx = driver.context();
        let repo: Repository<Book> = Repository::new(SqlDialect::Sqlite)?;

        let mut oversized = book(&"x".repeat(65), 1);
        let err = repo.save(&mut ctx, &mut oversized).await.unwrap_err();
        assert!(matches!(err, NadoError::ValidationError(_)));
        assert_eq!(raw_row_count(&mut ctx).await?, 0);
        Ok::<(), NadoError>(())
    })?;
    Ok(())
}
