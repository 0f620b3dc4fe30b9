//! Operator Tests
//!
//! Tests verify:
//! - Operator selection by holder layout and condition shape
//! - Index-backed operators agree with a full scan
//! - Delete over a batch
//! - Row builder mapping and type checks

use eventtable::event::{StateEvent, Value};
use eventtable::expression::{CompareOp, Expression};
use eventtable::holder::{holder_for, EventHolder};
use eventtable::operator::{Operator, OperatorKind, OperatorParser, RowBuilder};
use eventtable::schema::{AttributeType, MatchingMeta, StreamDefinition, TableDefinition};
use eventtable::{row, Row, TableError};

fn table(primary_key: bool, index: bool) -> TableDefinition {
    let mut def = TableDefinition::new("T")
        .attribute("id", AttributeType::Long)
        .attribute("name", AttributeType::String)
        .attribute("score", AttributeType::Double);
    if primary_key {
        def = def.primary_key(&["id"]);
    }
    if index {
        def = def.index(&["score"]);
    }
    def
}

fn meta(def: &TableDefinition) -> MatchingMeta {
    let stream = StreamDefinition::new("S")
        .attribute("id", AttributeType::Int)
        .attribute("name", AttributeType::String)
        .attribute("score", AttributeType::Double);
    MatchingMeta::new(stream, def.clone()).unwrap()
}

fn id_equals() -> Expression {
    Expression::equal(
        Expression::qualified("T", "id"),
        Expression::qualified("S", "id"),
    )
}

fn score_above() -> Expression {
    Expression::compare(
        Expression::qualified("T", "score"),
        CompareOp::GreaterThan,
        Expression::qualified("S", "score"),
    )
}

fn filled(def: &TableDefinition) -> Box<dyn EventHolder> {
    let mut holder = holder_for(def);
    holder
        .add(vec![
            row![1i64, "a", 10.0],
            row![2i64, "b", 20.0],
            row![3i64, "c", 30.0],
            row![4i64, "d", 40.0],
        ])
        .unwrap();
    holder
}

fn names(rows: &[Row]) -> Vec<&str> {
    rows.iter()
        .filter_map(|row| row.get(1).and_then(Value::as_str))
        .collect()
}

// =============================================================================
// Selection Tests
// =============================================================================

#[test]
fn test_scan_without_annotations() {
    let def = table(false, false);
    let meta = meta(&def);
    let op = OperatorParser::new(&meta).construct(&id_equals()).unwrap();
    assert_eq!(op.kind(), OperatorKind::Collection);
}

#[test]
fn test_primary_key_selected() {
    let def = table(true, false);
    let meta = meta(&def);
    let op = OperatorParser::new(&meta).construct(&id_equals()).unwrap();
    assert_eq!(op.kind(), OperatorKind::PrimaryKey);

    // Operand order doesn't matter
    let flipped = Expression::equal(
        Expression::qualified("S", "id"),
        Expression::qualified("T", "id"),
    );
    let op = OperatorParser::new(&meta).construct(&flipped).unwrap();
    assert_eq!(op.kind(), OperatorKind::PrimaryKey);
}

#[test]
fn test_primary_key_inside_conjunction() {
    let def = table(true, false);
    let meta = meta(&def);
    let cond = Expression::and(score_above(), id_equals());
    let op = OperatorParser::new(&meta).construct(&cond).unwrap();
    assert_eq!(op.kind(), OperatorKind::PrimaryKey);
}

#[test]
fn test_disjunction_scans() {
    let def = table(true, true);
    let meta = meta(&def);
    let cond = Expression::or(id_equals(), score_above());
    let op = OperatorParser::new(&meta).construct(&cond).unwrap();
    assert_eq!(op.kind(), OperatorKind::Collection);
}

#[test]
fn test_index_selected() {
    let def = table(false, true);
    let meta = meta(&def);
    let op = OperatorParser::new(&meta).construct(&score_above()).unwrap();
    assert_eq!(op.kind(), OperatorKind::Index);
}

#[test]
fn test_index_lookups_disabled() {
    let def = table(true, true);
    let meta = meta(&def);
    let op = OperatorParser::new(&meta)
        .index_lookups(false)
        .construct(&id_equals())
        .unwrap();
    assert_eq!(op.kind(), OperatorKind::Collection);
}

#[test]
fn test_construct_rejects_bad_condition() {
    let def = table(false, false);
    let meta = meta(&def);
    let err = OperatorParser::new(&meta).construct(&Expression::qualified("T", "missing"));
    assert!(matches!(err, Err(TableError::SchemaBinding(_))));
}

// =============================================================================
// Matching Tests
// =============================================================================

#[test]
fn test_all_variants_agree() {
    let cond = Expression::and(
        score_above(),
        Expression::compare(
            Expression::qualified("T", "id"),
            CompareOp::NotEqual,
            Expression::value(4i64),
        ),
    );
    let probe = StateEvent::from(row![0, "", 15.0]);

    let mut results = Vec::new();
    for (pk, idx) in [(false, false), (true, false), (false, true), (true, true)] {
        let def = table(pk, idx);
        let meta = meta(&def);
        let holder = filled(&def);
        let op = OperatorParser::new(&meta).construct(&cond).unwrap();
        let found = op.find(&probe, holder.as_ref());
        results.push(names(&found).join(","));
    }
    assert!(results.iter().all(|r| r == "b,c"), "{:?}", results);
}

#[test]
fn test_all_variants_agree_on_signed_zero() {
    let stream = StreamDefinition::new("S").attribute("k", AttributeType::Double);
    let cond = Expression::equal(
        Expression::qualified("T", "k"),
        Expression::qualified("S", "k"),
    );
    let zero = StateEvent::from(row![0.0]);

    let mut results = Vec::new();
    for (pk, idx) in [(false, false), (true, false), (false, true)] {
        let mut def = TableDefinition::new("T")
            .attribute("k", AttributeType::Double)
            .attribute("name", AttributeType::String);
        if pk {
            def = def.primary_key(&["k"]);
        }
        if idx {
            def = def.index(&["k"]);
        }
        let meta = MatchingMeta::new(stream.clone(), def.clone()).unwrap();
        let mut holder = holder_for(&def);
        holder.add(vec![row![-0.0, "neg"]]).unwrap();

        let op = OperatorParser::new(&meta).construct(&cond).unwrap();
        results.push((op.kind(), names(&op.find(&zero, holder.as_ref())).join(",")));
    }
    assert_eq!(
        results,
        vec![
            (OperatorKind::Collection, "neg".to_string()),
            (OperatorKind::PrimaryKey, "neg".to_string()),
            (OperatorKind::Index, "neg".to_string()),
        ]
    );
}

#[test]
fn test_rounded_key_falls_back_to_scan() {
    let def = TableDefinition::new("T")
        .attribute("v", AttributeType::Float)
        .attribute("name", AttributeType::String)
        .index(&["v"]);
    let stream = StreamDefinition::new("S").attribute("i", AttributeType::Int);
    let meta = MatchingMeta::new(stream, def.clone()).unwrap();
    let mut holder = holder_for(&def);
    holder.add(vec![row![16_777_216.0f32, "edge"]]).unwrap();

    // 16777217 rounds to 16777216 as a float, which would exclude the row
    let cond = Expression::compare(
        Expression::qualified("T", "v"),
        CompareOp::LessThan,
        Expression::qualified("S", "i"),
    );
    let op = OperatorParser::new(&meta).construct(&cond).unwrap();
    assert_eq!(op.kind(), OperatorKind::Collection);
    let found = op.find(&StateEvent::from(row![16_777_217]), holder.as_ref());
    assert_eq!(names(&found), vec!["edge"]);

    // An exact widening keeps the index
    let stream = StreamDefinition::new("S").attribute("f", AttributeType::Float);
    let meta = MatchingMeta::new(stream, def).unwrap();
    let cond = Expression::compare(
        Expression::qualified("T", "v"),
        CompareOp::LessThan,
        Expression::qualified("S", "f"),
    );
    let op = OperatorParser::new(&meta).construct(&cond).unwrap();
    assert_eq!(op.kind(), OperatorKind::Index);
}

#[test]
fn test_primary_key_find_returns_single_row() {
    let def = table(true, false);
    let meta = meta(&def);
    let holder = filled(&def);
    let op = OperatorParser::new(&meta).construct(&id_equals()).unwrap();

    // Int probe widened to the long key
    let found = op.find(&StateEvent::from(row![3, "", 0.0]), holder.as_ref());
    assert_eq!(found, vec![row![3i64, "c", 30.0]]);

    assert!(op
        .find(&StateEvent::from(row![9, "", 0.0]), holder.as_ref())
        .is_empty());
    assert!(op.contains(&StateEvent::from(row![1, "", 0.0]), holder.as_ref()));
}

#[test]
fn test_null_probe_matches_nothing() {
    let def = table(true, false);
    let meta = meta(&def);
    let holder = filled(&def);
    let op = OperatorParser::new(&meta).construct(&id_equals()).unwrap();

    let probe = StateEvent::from(Row::new(vec![
        Value::Null,
        Value::from(""),
        Value::Double(0.0),
    ]));
    assert!(!op.contains(&probe, holder.as_ref()));
}

#[test]
fn test_find_returns_copies() {
    let def = table(false, false);
    let meta = meta(&def);
    let holder = filled(&def);
    let op = OperatorParser::new(&meta).construct(&id_equals()).unwrap();

    let mut found = op.find(&StateEvent::from(row![2, "", 0.0]), holder.as_ref());
    found[0].set(1, "mutated");

    let again = op.find(&StateEvent::from(row![2, "", 0.0]), holder.as_ref());
    assert_eq!(names(&again), vec!["b"]);
}

#[test]
fn test_delete_batch() {
    let def = table(false, true);
    let meta = meta(&def);
    let mut holder = filled(&def);
    let op = OperatorParser::new(&meta).construct(&id_equals()).unwrap();

    let batch = [
        StateEvent::from(row![1, "", 0.0]),
        StateEvent::from(row![3, "", 0.0]),
        StateEvent::from(row![7, "", 0.0]),
    ];
    assert_eq!(op.delete(&batch, holder.as_mut()), 2);
    assert_eq!(holder.len(), 2);
}

// =============================================================================
// Row Builder Tests
// =============================================================================

#[test]
fn test_row_builder_maps_by_name() {
    let def = TableDefinition::new("T")
        .attribute("score", AttributeType::Double)
        .attribute("id", AttributeType::Long);
    let stream = StreamDefinition::new("S")
        .attribute("id", AttributeType::Int)
        .attribute("extra", AttributeType::String)
        .attribute("score", AttributeType::Float);
    let meta = MatchingMeta::new(stream, def).unwrap();

    let builder = RowBuilder::compile(&meta).unwrap();
    let row = builder.build(&StateEvent::from(row![5, "x", 1.5f32]));
    assert_eq!(row, Row::new(vec![Value::Double(1.5), Value::Long(5)]));
}

#[test]
fn test_row_builder_missing_attribute() {
    let def = table(false, false);
    let stream = StreamDefinition::new("S").attribute("id", AttributeType::Long);
    let meta = MatchingMeta::new(stream, def).unwrap();
    assert!(matches!(
        RowBuilder::compile(&meta),
        Err(TableError::SchemaBinding(_))
    ));
}

#[test]
fn test_row_builder_narrowing_rejected() {
    let def = TableDefinition::new("T").attribute("id", AttributeType::Int);
    let stream = StreamDefinition::new("S").attribute("id", AttributeType::Long);
    let meta = MatchingMeta::new(stream, def).unwrap();
    assert!(matches!(
        RowBuilder::compile(&meta),
        Err(TableError::SchemaBinding(_))
    ));
}
