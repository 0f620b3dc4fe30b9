//! Concurrency Tests
//!
//! Tests verify:
//! - Many readers run against one table at once
//! - Readers never see a half-applied update or upsert
//! - Concurrent writers don't lose rows
//! - Snapshots taken under write load are consistent

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use eventtable::expression::{Expression, UpdateSet, Variable};
use eventtable::holder::holder_from_image;
use eventtable::operator::RowBuilder;
use eventtable::schema::{AttributeType, MatchingMeta, StreamDefinition, TableDefinition};
use eventtable::snapshot::HOLDER_KEY;
use eventtable::{
    row, AppContext, CompiledCondition, ConfigReader, InMemoryTable, Row, Snapshotable,
    StateEvent, Table, Value,
};

const READERS: usize = 8;

/// (id: int @PrimaryKey, a: long, b: long)
fn setup() -> (AppContext, Arc<InMemoryTable>, MatchingMeta, CompiledCondition) {
    let def = TableDefinition::new("T")
        .attribute("id", AttributeType::Int)
        .attribute("a", AttributeType::Long)
        .attribute("b", AttributeType::Long)
        .primary_key(&["id"]);
    let stream = StreamDefinition::new("S")
        .attribute("id", AttributeType::Int)
        .attribute("a", AttributeType::Long)
        .attribute("b", AttributeType::Long);
    let context = AppContext::new("concurrency");
    let table = InMemoryTable::init(def.clone(), &ConfigReader::new(), &context).unwrap();
    let meta = MatchingMeta::new(stream, def).unwrap();
    let cond = table
        .compile_expression(
            &Expression::equal(
                Expression::qualified("T", "id"),
                Expression::qualified("S", "id"),
            ),
            &meta,
        )
        .unwrap();
    (context, table, meta, cond)
}

fn long_at(row: &Row, position: usize) -> i64 {
    row.get(position).and_then(Value::as_i64).unwrap()
}

/// Row 0 counts the rows inserted after it
fn counter_consistent(rows: &[Row]) -> bool {
    let counter = rows
        .iter()
        .find(|row| row.get(0) == Some(&Value::Int(0)))
        .map(|row| long_at(row, 1));
    counter == Some(rows.len() as i64 - 1)
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_concurrent_readers() {
    let (_context, table, _meta, cond) = setup();
    table
        .add((0..100i32).map(|i| row![i, i as i64, i as i64]).collect())
        .unwrap();

    let barrier = Barrier::new(READERS);
    crossbeam::scope(|s| {
        for r in 0..READERS {
            let (table, cond, barrier) = (&table, &cond, &barrier);
            s.spawn(move |_| {
                barrier.wait();
                for i in 0..1000 {
                    let id = ((i + r) % 100) as i32;
                    let probe = StateEvent::from(row![id, 0i64, 0i64]);
                    assert!(table.contains(&probe, cond));
                    assert_eq!(
                        table.find(&probe, cond),
                        vec![row![id, id as i64, id as i64]]
                    );
                }
            });
        }
    })
    .unwrap();
}

#[test]
fn test_readers_share_the_lock_with_a_held_snapshot() {
    let (_context, table, _meta, cond) = setup();
    table.add(vec![row![1, 1i64, 1i64]]).unwrap();

    // A snapshot keeps the storage handle alive; readers are unaffected
    let state = table.current_state();
    crossbeam::scope(|s| {
        for _ in 0..READERS {
            let (table, cond) = (&table, &cond);
            s.spawn(move |_| {
                let probe = StateEvent::from(row![1, 0i64, 0i64]);
                assert!(table.contains(&probe, cond));
            });
        }
    })
    .unwrap();
    assert_eq!(state.len(), 1);
}

// =============================================================================
// Writer Exclusivity Tests
// =============================================================================

#[test]
fn test_no_torn_updates() {
    let (_context, table, meta, cond) = setup();
    table.add(vec![row![1, 0i64, 0i64]]).unwrap();
    let update_set = table
        .compile_update_set(
            Some(
                &UpdateSet::new()
                    .set(Variable::of("T", "a"), Expression::qualified("S", "a"))
                    .set(Variable::of("T", "b"), Expression::qualified("S", "b")),
            ),
            &meta,
        )
        .unwrap();

    let done = AtomicBool::new(false);
    crossbeam::scope(|s| {
        let (table_ref, cond_ref, done_ref) = (&table, &cond, &done);
        s.spawn(move |_| {
            for v in 1..=2000i64 {
                let batch = [StateEvent::from(row![1, v, v])];
                table_ref.update(&batch, cond_ref, &update_set).unwrap();
            }
            done_ref.store(true, Ordering::Release);
        });

        for _ in 0..READERS {
            let (table, cond, done) = (&table, &cond, &done);
            s.spawn(move |_| {
                let probe = StateEvent::from(row![1, 0i64, 0i64]);
                while !done.load(Ordering::Acquire) {
                    for row in table.find(&probe, cond) {
                        assert_eq!(long_at(&row, 1), long_at(&row, 2));
                    }
                }
            });
        }
    })
    .unwrap();

    assert_eq!(table.rows(), vec![row![1, 2000i64, 2000i64]]);
}

#[test]
fn test_upsert_is_atomic_for_readers() {
    let (_context, table, meta, cond) = setup();
    table.add(vec![row![0, 0i64, 0i64]]).unwrap();
    let update_set = table
        .compile_update_set(
            Some(&UpdateSet::new().set(Variable::of("T", "a"), Expression::qualified("S", "a"))),
            &meta,
        )
        .unwrap();
    let builder = RowBuilder::compile(&meta).unwrap();

    let done = AtomicBool::new(false);
    crossbeam::scope(|s| {
        let (table_ref, cond_ref, done_ref) = (&table, &cond, &done);
        let (update_set, builder) = (&update_set, &builder);
        s.spawn(move |_| {
            for k in 1..=500i32 {
                // Bump the counter row and insert row k in one upsert
                let batch = [
                    StateEvent::from(row![0, k as i64, 0i64]),
                    StateEvent::from(row![k, 0i64, 0i64]),
                ];
                table_ref
                    .update_or_add(&batch, cond_ref, update_set, builder)
                    .unwrap();
            }
            done_ref.store(true, Ordering::Release);
        });

        for _ in 0..READERS {
            let (table, done) = (&table, &done);
            s.spawn(move |_| {
                while !done.load(Ordering::Acquire) {
                    assert!(counter_consistent(&table.rows()));
                }
            });
        }
    })
    .unwrap();

    assert_eq!(table.len(), 501);
    assert!(counter_consistent(&table.rows()));
}

#[test]
fn test_concurrent_writers_lose_nothing() {
    let (_context, table, _meta, _cond) = setup();
    let writers = 8;
    let per_writer = 250;

    crossbeam::scope(|s| {
        for w in 0..writers {
            let table = &table;
            s.spawn(move |_| {
                for j in 0..per_writer {
                    let id = (w * per_writer + j) as i32;
                    table.add(vec![row![id, 0i64, 0i64]]).unwrap();
                }
            });
        }
    })
    .unwrap();

    assert_eq!(table.len(), writers * per_writer);
}

// =============================================================================
// Snapshot Consistency Tests
// =============================================================================

#[test]
fn test_snapshots_under_write_load_are_consistent() {
    let (_context, table, meta, cond) = setup();
    table.add(vec![row![0, 0i64, 0i64]]).unwrap();
    let update_set = table
        .compile_update_set(
            Some(&UpdateSet::new().set(Variable::of("T", "a"), Expression::qualified("S", "a"))),
            &meta,
        )
        .unwrap();
    let builder = RowBuilder::compile(&meta).unwrap();

    let done = AtomicBool::new(false);
    crossbeam::scope(|s| {
        let (table_ref, cond_ref, done_ref) = (&table, &cond, &done);
        let (update_set, builder) = (&update_set, &builder);
        s.spawn(move |_| {
            for k in 1..=300i32 {
                let batch = [
                    StateEvent::from(row![0, k as i64, 0i64]),
                    StateEvent::from(row![k, 0i64, 0i64]),
                ];
                table_ref
                    .update_or_add(&batch, cond_ref, update_set, builder)
                    .unwrap();
            }
            done_ref.store(true, Ordering::Release);
        });

        let (table, done) = (&table, &done);
        s.spawn(move |_| {
            let mut taken = 0;
            while !done.load(Ordering::Acquire) || taken == 0 {
                let state = table.current_state();
                let image = state.get(HOLDER_KEY).unwrap().image();
                let holder = holder_from_image(image).unwrap();
                let rows: Vec<Row> = holder.scan().map(|(_, row)| row.clone()).collect();
                assert!(counter_consistent(&rows));
                taken += 1;
            }
        });
    })
    .unwrap();

    assert_eq!(table.len(), 301);
}
