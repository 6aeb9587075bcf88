use super::conflicts;
use super::expect_valid;
use super::shop_schema;
use apollo_compiler::ast::Document;
use apollo_field_merging::validation::validate_field_merging;
use apollo_field_merging::validation::ConflictReason;

#[test]
fn fragment_spreading_itself() {
    expect_valid(
        r#"
      query { user { ...Self } }
      fragment Self on User { id ...Self friends { ...Self } }
    "#,
    );
}

#[test]
fn conflict_across_a_cycle_is_found_once() {
    assert_eq!(
        conflicts(
            r#"
      query { user { ...A } }
      fragment A on User { name: fullName ...B }
      fragment B on User { name: nickName ...A }
    "#
        ),
        [(
            "different field name for response key `name`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
}

#[test]
fn cycle_entered_from_several_places() {
    assert_eq!(
        conflicts(
            r#"
      query {
        user { ...B }
        other: user { ...C }
      }
      fragment A on User { id ...B }
      fragment B on User { friends { ...C } ...C }
      fragment C on User { id: fullName ...A }
    "#
        ),
        [(
            "different field name for response key `id`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
}

#[test]
fn undefined_fragment_is_empty() {
    expect_valid("{ user { id ...Missing } }");
}

#[test]
fn fragment_used_before_definition() {
    assert_eq!(
        conflicts(
            r#"
      query { user { nickName ...Later } }
      fragment Later on User { nickName: fullName }
    "#
        ),
        [(
            "different field name for response key `nickName`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
}

/// A long chain of fragments that spread each other in one big cycle
fn long_cycle(length: usize, last_field: &str) -> String {
    let mut query = String::from("query { user { ...F0 } }\n");
    for i in 0..length {
        let field = if i == length - 1 { last_field } else { "fullName" };
        let next = (i + 1) % length;
        query.push_str(&format!(
            "fragment F{i} on User {{ name: {field} ...F{next} }}\n"
        ));
    }
    query
}

#[test]
fn long_cycles_terminate() {
    let document = Document::parse(long_cycle(500, "fullName"), "query.graphql").unwrap();
    let errors = validate_field_merging(shop_schema(), &document).unwrap();
    assert!(errors.is_empty());

    let document = Document::parse(long_cycle(500, "nickName"), "query.graphql").unwrap();
    let errors = validate_field_merging(shop_schema(), &document).unwrap();
    assert_eq!(errors.len(), 1);
}
