use pretty_assertions::assert_eq;
use revolve_core::{
    classify, parse_record, Category, MalformedRecord, Message, WireRecord,
    MALFORMED_RECORD_NAME,
};

fn init_logging() {
    session_logging::initialize_for_tests();
}

#[test]
fn status_records_map_to_legacy_categories() {
    init_logging();
    assert_eq!(
        parse_record(r#"{"status":"processing","name":"step1","text":"working"}"#),
        Message::new(
            Category::System,
            Some("step1".to_string()),
            Some("working".to_string())
        )
    );
    assert_eq!(
        parse_record(r#"{"status":"done","text":"All set."}"#),
        Message::new(Category::Done, None, Some("All set.".to_string()))
    );
    assert_eq!(
        parse_record(r#"{"status":"error","text":"boom"}"#).category,
        Category::Error
    );
}

#[test]
fn level_records_map_to_incremental_categories() {
    init_logging();
    assert_eq!(
        parse_record(r#"{"level":"system","name":"n","text":"t"}"#).category,
        Category::System
    );
    assert_eq!(
        parse_record(r#"{"level":"workflow","text":"Created file X"}"#),
        Message::new(Category::Workflow, None, Some("Created file X".to_string()))
    );
    assert_eq!(
        parse_record(r#"{"level":"notification","name":"generate_api","text":"APIs ready"}"#),
        Message::new(
            Category::Notification,
            Some("generate_api".to_string()),
            Some("APIs ready".to_string())
        )
    );
}

#[test]
fn status_wins_when_both_discriminants_are_present() {
    init_logging();
    let record =
        WireRecord::parse(r#"{"status":"processing","level":"workflow","name":"report_node","text":"r"}"#)
            .expect("valid record");
    assert!(matches!(record, WireRecord::Status { .. }));
    assert_eq!(classify(record).category, Category::System);
}

#[test]
fn unknown_discriminant_values_are_malformed() {
    init_logging();
    let message = parse_record(r#"{"level":"log","text":"x"}"#);
    assert_eq!(message.category, Category::Malformed);
    assert_eq!(message.name.as_deref(), Some(MALFORMED_RECORD_NAME));
    assert_eq!(message.text.as_deref(), Some("unknown level `log`"));

    assert_eq!(
        parse_record(r#"{"status":"queued"}"#).category,
        Category::Malformed
    );
}

#[test]
fn parse_failures_are_isolated() {
    init_logging();
    assert!(matches!(
        WireRecord::parse("not-json-at-all"),
        Err(MalformedRecord::InvalidJson(_))
    ));
    assert_eq!(
        WireRecord::parse(r#"{"name":"orphan"}"#),
        Err(MalformedRecord::MissingDiscriminant)
    );

    for line in ["not-json-at-all", "[1,2]", "42", r#"{"status":7}"#, r#"{"level":"system","text":{"a":1}}"#] {
        assert_eq!(parse_record(line).category, Category::Malformed, "line {line}");
    }
}

#[test]
fn malformed_diagnostic_keeps_a_bounded_preview() {
    init_logging();
    let long_line = "x".repeat(1_000);
    let message = parse_record(&long_line);
    let text = message.text.expect("diagnostic text");
    assert!(text.ends_with('…'));
    assert!(text.chars().count() < 400);
}

#[test]
fn null_and_missing_fields_are_absent() {
    init_logging();
    assert_eq!(
        parse_record(r#"{"status":"done","name":null}"#),
        Message::new(Category::Done, None, None)
    );
}
