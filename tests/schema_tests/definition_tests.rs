//! Schema Tests
//!
//! Tests verify:
//! - Definition validation (unique names, annotations on real attributes)
//! - Attribute lookup and annotation ordinals
//! - Numeric widening rules
//! - Matching meta construction

use eventtable::event::Value;
use eventtable::schema::{AttributeType, MatchingMeta, StreamDefinition, TableDefinition};
use eventtable::TableError;

fn stock_table() -> TableDefinition {
    TableDefinition::new("StockTable")
        .attribute("symbol", AttributeType::String)
        .attribute("price", AttributeType::Double)
        .attribute("volume", AttributeType::Long)
}

// =============================================================================
// Table Definition Tests
// =============================================================================

#[test]
fn test_valid_definition() {
    let def = stock_table().primary_key(&["symbol"]).index(&["volume"]);
    assert!(def.validate().is_ok());
    assert_eq!(def.id(), "StockTable");
    assert_eq!(def.arity(), 3);
}

#[test]
fn test_attribute_lookup() {
    let def = stock_table();
    assert_eq!(def.attribute_position("price"), Some(1));
    assert_eq!(def.attribute_position("missing"), None);
    assert_eq!(def.attribute_type(2), Some(AttributeType::Long));
    assert_eq!(def.attribute_type(3), None);
}

#[test]
fn test_duplicate_attribute_rejected() {
    let def = stock_table().attribute("price", AttributeType::Float);
    assert!(matches!(def.validate(), Err(TableError::SchemaBinding(_))));
}

#[test]
fn test_annotation_on_unknown_attribute_rejected() {
    let def = stock_table().primary_key(&["isin"]);
    assert!(matches!(def.validate(), Err(TableError::SchemaBinding(_))));

    let def = stock_table().index(&["exchange"]);
    assert!(matches!(def.validate(), Err(TableError::SchemaBinding(_))));
}

#[test]
fn test_annotation_positions() {
    let def = stock_table()
        .primary_key(&["volume", "symbol"])
        .index(&["price"]);
    // Declaration order, not column order
    assert_eq!(def.primary_key_positions(), vec![2, 0]);
    assert_eq!(def.index_positions(), vec![1]);
    assert!(def.has_primary_key());
    assert!(!stock_table().has_primary_key());
}

#[test]
fn test_stream_from_table() {
    let def = stock_table();
    let stream = StreamDefinition::from(&def);
    assert_eq!(stream.id(), "StockTable");
    assert_eq!(stream.attributes(), def.attributes());
}

// =============================================================================
// Attribute Type Tests
// =============================================================================

#[test]
fn test_numeric_widening() {
    assert!(AttributeType::Int.assignable_to(AttributeType::Long));
    assert!(AttributeType::Long.assignable_to(AttributeType::Double));
    assert!(AttributeType::Float.assignable_to(AttributeType::Double));
    assert!(!AttributeType::Double.assignable_to(AttributeType::Float));
    assert!(!AttributeType::Long.assignable_to(AttributeType::Int));
    assert!(!AttributeType::Int.assignable_to(AttributeType::String));
    assert!(AttributeType::String.assignable_to(AttributeType::String));
}

#[test]
fn test_exact_widening() {
    assert!(AttributeType::Int.widens_exactly_to(AttributeType::Long));
    assert!(AttributeType::Int.widens_exactly_to(AttributeType::Double));
    assert!(AttributeType::Float.widens_exactly_to(AttributeType::Double));
    assert!(AttributeType::Long.widens_exactly_to(AttributeType::Long));
    assert!(!AttributeType::Int.widens_exactly_to(AttributeType::Float));
    assert!(!AttributeType::Long.widens_exactly_to(AttributeType::Float));
    assert!(!AttributeType::Long.widens_exactly_to(AttributeType::Double));
    assert!(!AttributeType::Double.widens_exactly_to(AttributeType::Float));
}

#[test]
fn test_promote() {
    assert_eq!(
        AttributeType::promote(AttributeType::Int, AttributeType::Double),
        Some(AttributeType::Double)
    );
    assert_eq!(
        AttributeType::promote(AttributeType::Long, AttributeType::Int),
        Some(AttributeType::Long)
    );
    assert_eq!(
        AttributeType::promote(AttributeType::Bool, AttributeType::Int),
        None
    );
}

#[test]
fn test_value_widen() {
    assert_eq!(Value::Int(3).widen(AttributeType::Long), Value::Long(3));
    assert_eq!(Value::Long(3).widen(AttributeType::Double), Value::Double(3.0));
    assert_eq!(Value::Null.widen(AttributeType::Long), Value::Null);
    assert_eq!(
        Value::from("x").widen(AttributeType::Double),
        Value::String("x".to_string())
    );
}

// =============================================================================
// Matching Meta Tests
// =============================================================================

#[test]
fn test_matching_meta() {
    let stream = StreamDefinition::new("StockStream")
        .attribute("symbol", AttributeType::String)
        .attribute("price", AttributeType::Double);
    let meta = MatchingMeta::new(stream, stock_table()).unwrap();
    assert_eq!(meta.incoming().id(), "StockStream");
    assert_eq!(meta.table().id(), "StockTable");
}

#[test]
fn test_matching_meta_rejects_duplicate_stream_attributes() {
    let stream = StreamDefinition::new("StockStream")
        .attribute("symbol", AttributeType::String)
        .attribute("symbol", AttributeType::String);
    assert!(matches!(
        MatchingMeta::new(stream, stock_table()),
        Err(TableError::SchemaBinding(_))
    ));
}
