//! Interactive pager over a SQLite table or generated items

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use pw_core::{FetchMode, PageHeaders, PageNumber, Pager, PagerEvent, Projection, Row, Transform};
use pw_data::{KeyedMemorySource, MemorySource, Record, SourceConfig, SourceKind, SqliteSource};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod sample_db;

use sample_db::{create_sample_database, SAMPLE_TABLE};

const SAMPLE_DB_PATH: &str = "data/sample_pager.db";
const SAMPLE_ROWS: u32 = 1000;

type RowTransform<T> = Box<dyn Fn(Option<RangeInclusive<PageNumber>>, Vec<T>) -> Projection<Row<T>> + Send + Sync>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            SourceConfig::from_json(&text).with_context(|| format!("Invalid config file {}", path))?
        }
        None => SourceConfig::new(
            SourceKind::Sqlite {
                path: PathBuf::from(SAMPLE_DB_PATH),
                table: SAMPLE_TABLE.to_string(),
                key_column: "id".to_string(),
            },
            FetchMode::Offset,
        ),
    };

    info!(
        "Paging {} in {:?} mode, {} items per page, at most {} pages",
        config.source_name(),
        config.mode,
        config.pager.page_size,
        config.pager.max_pages
    );

    match config.source {
        SourceKind::Sqlite { path, table, key_column } => {
            if path.as_os_str() == SAMPLE_DB_PATH && table == SAMPLE_TABLE {
                create_sample_database(&path, SAMPLE_ROWS)?;
            }
            let source = SqliteSource::open(&path, table, key_column).await?;
            let rows = row_transform(config.mode, config.pager.page_size);
            let pager = match config.mode {
                FetchMode::Offset => Pager::offset(source, rows, config.pager)?,
                FetchMode::Cursor => Pager::cursor(source, rows, config.pager)?,
            };
            drive(pager, render_record).await
        }
        SourceKind::Memory { len } => {
            let rows = row_transform(config.mode, config.pager.page_size);
            let pager = match config.mode {
                FetchMode::Offset => {
                    let source = MemorySource::new((0..len).collect::<Vec<u32>>())
                        .with_name(format!("memory[{}]", len))
                        .with_latency(Duration::from_millis(50));
                    Pager::offset(source, rows, config.pager)?
                }
                FetchMode::Cursor => {
                    let source = KeyedMemorySource::new(0..len, |n: &u32| *n).with_name(format!("memory[{}]", len));
                    Pager::cursor(source, rows, config.pager)?
                }
            };
            drive(pager, |n: &u32| n.to_string()).await
        }
    }
}

/// Page headers for offset paging; cursor pages can come back short mid-window,
/// so cursor paging shows the rows without headers
fn row_transform<T: Clone + Send + Sync + 'static>(mode: FetchMode, page_size: usize) -> RowTransform<T> {
    match mode {
        FetchMode::Offset => {
            let headers = PageHeaders::new(page_size);
            Box::new(move |pages: Option<RangeInclusive<PageNumber>>, items: Vec<T>| headers.apply(pages, items))
        }
        FetchMode::Cursor => Box::new(|pages: Option<RangeInclusive<PageNumber>>, items: Vec<T>| {
            Projection::unchanged(items.into_iter().map(Row::Item).collect(), pages.as_ref())
        }),
    }
}

/// Read commands from stdin until `quit` or end of input
async fn drive<T, F>(pager: Pager<Row<T>>, render: F) -> Result<()>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> String,
{
    let mut events = pager.subscribe_events();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PagerEvent::FetchFailed { page_number, message }) => {
                    error!("Page {} failed to load: {}", page_number, message);
                }
                Ok(PagerEvent::LoadSkipped { page_number, reason }) => {
                    info!("Load of page {:?} skipped: {}", page_number, reason);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => warn!("Missed {} pager events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    pager.wait_idle().await?;
    print_view(&pager, &render);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "n" | "next" => {
                if !pager.load_next().await? {
                    println!("busy ({})", pager.status());
                }
            }
            "p" | "prev" => {
                if !pager.load_previous().await? {
                    println!("busy ({})", pager.status());
                }
            }
            "r" | "reset" => pager.reset().await?,
            "s" | "status" => {
                println!("status: {}", pager.status());
                continue;
            }
            "h" | "help" => {
                print_help();
                continue;
            }
            "q" | "quit" => break,
            "" => continue,
            other => {
                println!("unknown command '{}'", other);
                continue;
            }
        }
        pager.wait_idle().await?;
        print_view(&pager, &render);
    }

    pager.shutdown().await;
    reporter.abort();
    Ok(())
}

fn print_view<T, F>(pager: &Pager<Row<T>>, render: &F)
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> String,
{
    let view = pager.view();
    for row in &view.items {
        match row {
            Row::Header(page_number) => println!("--- page {} ---", page_number),
            Row::Item(item) => println!("  {}", render(item)),
        }
    }
    match &view.pages {
        Some(pages) => println!(
            "pages {}..={}, {} rows ({} header rows)",
            pages.start(),
            pages.end(),
            view.items.len(),
            view.total_size_change
        ),
        None => println!("window is empty"),
    }
}

fn render_record(record: &Record) -> String {
    let columns = record
        .columns
        .iter()
        .filter(|(name, _)| name.as_str() != "id")
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(" ");
    format!("#{} {}", record.id, columns)
}

fn print_help() {
    println!("commands: next (n), prev (p), reset (r), status (s), help (h), quit (q)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_only_in_offset_mode() {
        let offset: RowTransform<u32> = row_transform(FetchMode::Offset, 2);
        let projection = offset(Some(0..=1), vec![0, 1, 2, 3]);
        assert_eq!(projection.items[0], Row::Header(0));
        assert_eq!(projection.items[3], Row::Header(1));
        assert_eq!(projection.total_size_change, 2);

        // a short first page must not shift anything in cursor mode
        let cursor: RowTransform<u32> = row_transform(FetchMode::Cursor, 2);
        let projection = cursor(Some(0..=1), vec![0, 2, 3]);
        assert_eq!(projection.items, vec![Row::Item(0), Row::Item(2), Row::Item(3)]);
        assert_eq!(projection.total_size_change, 0);
        assert_eq!(projection.per_page_size_changes, vec![0, 0]);
    }
}
