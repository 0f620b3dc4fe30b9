//! eventtable load generator
//!
//! Drives one table with concurrent readers (find) and writers (upsert) and
//! reports throughput.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;
use eventtable::expression::CompareOp;
use eventtable::schema::AttributeType;
use eventtable::{
    row, AppContext, ConfigReader, Expression, InMemoryTable, MatchingMeta, RowBuilder,
    StateEvent, StreamDefinition, Table, TableConfig, TableDefinition, UpdateSet, Variable,
};
use tracing_subscriber::{fmt, EnvFilter};

/// eventtable load generator
#[derive(Parser, Debug)]
#[command(name = "eventtable-load")]
#[command(about = "Mixed read/upsert workload against an in-memory event table")]
#[command(version)]
struct Args {
    /// Rows inserted before the workload starts
    #[arg(short, long, default_value = "10000")]
    preload: usize,

    /// Reader threads (find/contains by key)
    #[arg(short, long, default_value = "4")]
    readers: usize,

    /// Writer threads (upsert by key)
    #[arg(short, long, default_value = "1")]
    writers: usize,

    /// Operations per thread
    #[arg(short, long, default_value = "100000")]
    ops: usize,

    /// Declare `symbol` as primary key so lookups use the hash index
    #[arg(long)]
    primary_key: bool,

    /// Snapshot the table every N writer operations (0 disables)
    #[arg(long, default_value = "0")]
    snapshot_every: usize,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,eventtable=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("eventtable-load v{}", eventtable::VERSION);
    if let Err(e) = run(&args) {
        tracing::error!("Load run failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> eventtable::Result<()> {
    let mut definition = TableDefinition::new("StockTable")
        .attribute("symbol", AttributeType::String)
        .attribute("price", AttributeType::Double)
        .attribute("volume", AttributeType::Long);
    if args.primary_key {
        definition = definition.primary_key(&["symbol"]);
    }

    let context = AppContext::new("eventtable-load");
    let reader = ConfigReader::new().with(TableConfig::ELEMENT_ID_PREFIX_KEY, "LoadTable");
    let table = InMemoryTable::init(definition.clone(), &reader, &context)?;

    let stream = StreamDefinition::new("StockStream")
        .attribute("symbol", AttributeType::String)
        .attribute("price", AttributeType::Double)
        .attribute("volume", AttributeType::Long);
    let meta = MatchingMeta::new(stream, definition)?;

    let condition = table.compile_expression(
        &Expression::compare(
            Expression::qualified("StockTable", "symbol"),
            CompareOp::Equal,
            Expression::qualified("StockStream", "symbol"),
        ),
        &meta,
    )?;
    let update_set = table.compile_update_set(
        Some(&UpdateSet::new().set(
            Variable::of("StockTable", "price"),
            Expression::qualified("StockStream", "price"),
        )),
        &meta,
    )?;
    let row_builder = RowBuilder::compile(&meta)?;
    tracing::info!(operator = ?condition.kind(), "Compiled lookup condition");

    let preload: Vec<_> = (0..args.preload)
        .map(|i| row![symbol(i), i as f64, i as i64])
        .collect();
    table.add(preload)?;
    tracing::info!("Preloaded {} rows", table.len());

    let key_space = args.preload.max(1) * 2;
    let start = Instant::now();
    let hits = thread::scope(|s| -> eventtable::Result<usize> {
        let mut readers = Vec::with_capacity(args.readers);
        for r in 0..args.readers {
            let table = Arc::clone(&table);
            let condition = &condition;
            readers.push(s.spawn(move || {
                let mut hits = 0;
                for i in 0..args.ops {
                    let key = (i * 7919 + r) % key_space;
                    let probe = StateEvent::from(row![symbol(key), 0.0, 0i64]);
                    hits += if i % 2 == 0 {
                        table.find(&probe, condition).len()
                    } else {
                        usize::from(table.contains(&probe, condition))
                    };
                }
                hits
            }));
        }

        let mut writers = Vec::with_capacity(args.writers);
        for w in 0..args.writers {
            let table = Arc::clone(&table);
            let context = &context;
            let (condition, update_set, row_builder) = (&condition, &update_set, &row_builder);
            writers.push(s.spawn(move || -> eventtable::Result<()> {
                for i in 0..args.ops {
                    let key = (i * 104_729 + w) % key_space;
                    let batch = [StateEvent::new(
                        i as i64,
                        row![symbol(key), i as f64, 1i64],
                    )];
                    table.update_or_add(&batch, condition, update_set, row_builder)?;
                    if args.snapshot_every > 0 && i % args.snapshot_every == 0 {
                        let _states = context.snapshot_service().snapshot();
                    }
                }
                Ok(())
            }));
        }

        for writer in writers {
            writer
                .join()
                .map_err(|_| eventtable::TableError::Config("writer thread panicked".into()))??;
        }
        readers.into_iter().try_fold(0, |acc, reader| {
            reader
                .join()
                .map(|hits| acc + hits)
                .map_err(|_| eventtable::TableError::Config("reader thread panicked".into()))
        })
    })?;
    let elapsed = start.elapsed();

    let total_ops = (args.readers + args.writers) * args.ops;
    tracing::info!(
        elapsed_ms = elapsed.as_millis() as u64,
        ops = total_ops,
        ops_per_sec = (total_ops as f64 / elapsed.as_secs_f64()) as u64,
        reader_hits = hits,
        rows = table.len(),
        "Workload complete"
    );

    let blob = context.snapshot_service().persist()?;
    tracing::info!("Final snapshot: {} bytes", blob.len());
    Ok(())
}

fn symbol(i: usize) -> String {
    format!("SYM{:06}", i)
}
