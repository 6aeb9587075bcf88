use super::validate;
use apollo_compiler::ast::Document;
use apollo_compiler::name;
use apollo_compiler::parser::LineColumn as GraphQLLocation;
use apollo_compiler::Schema;
use apollo_field_merging::diagnostic::Color;
use apollo_field_merging::validation::validate_field_merging;
use apollo_field_merging::validation::InvariantError;
use expect_test::expect;
use pretty_assertions::assert_eq;

const DIFFERENT_NAMES: &str = r#"
  query {
    user {
      name: fullName
      name: nickName
    }
  }
"#;

#[test]
fn json_error_shape() {
    let errors = validate(DIFFERENT_NAMES);
    let json = expect![[r#"
[
  {
    "message": "different field name for response key `name`",
    "locations": [
      {
        "line": 3,
        "column": 5
      },
      {
        "line": 4,
        "column": 5
      }
    ],
    "extensions": {
      "responseKey": "name",
      "reason": "DIFFERENT_FIELD_NAME"
    }
  }
]"#]];
    json.assert_eq(&serde_json::to_string_pretty(&errors.to_json()).unwrap());
}

#[test]
fn main_location_is_the_second_field() {
    let errors = validate(DIFFERENT_NAMES);
    let diagnostic = errors.iter().next().unwrap();
    assert_eq!(
        diagnostic.line_column(),
        Some(GraphQLLocation { line: 4, column: 5 })
    );
}

#[test]
fn pretty_printed_report() {
    let errors = validate(DIFFERENT_NAMES);
    let rendered = errors.to_string();
    for expected in [
        "different field name for response key `name`",
        "query.graphql",
        "`name` is selected from `fullName` here",
        "`name` is selected from `nickName` here",
        "not clear which one should be used",
    ] {
        assert!(rendered.contains(expected), "{expected:?} not in:\n{rendered}");
    }
}

#[test]
fn plain_and_colored_reports() {
    let errors = validate(DIFFERENT_NAMES);
    let diagnostic = errors.iter().next().unwrap();
    let mut plain = Vec::new();
    diagnostic.write(Color::Never, &mut plain).unwrap();
    let plain = String::from_utf8(plain).unwrap();
    assert_eq!(plain, diagnostic.to_string());
    assert!(!plain.contains('\u{1b}'));
}

#[test]
fn argument_mismatch_labels() {
    let errors = validate(
        r#"
      query {
        product(id: 1) {
          price
          price(currency: "USD")
        }
      }
    "#,
    );
    let rendered = errors.to_string();
    assert!(rendered.contains("`price` is selected without arguments here"));
    assert!(rendered.contains(r#"`price` is selected with arguments `currency: "USD"` here"#));
    let json = serde_json::to_value(errors.to_json()).unwrap();
    assert_eq!(json[0]["extensions"]["reason"], "ARGUMENT_MISMATCH");
}

#[test]
fn leaf_kind_labels_show_types() {
    let errors = validate("{ user { value: status value: fullName } }");
    let rendered = errors.to_string();
    assert!(rendered.contains("`value` has type `Status` here"));
    assert!(rendered.contains("`value` has type `String` here"));
}

#[test]
fn input_object_output_type_is_an_invariant_error() {
    let schema = Schema::parse(
        r#"
            type Query { filter: Filter }
            input Filter { name: String }
        "#,
        "schema.graphql",
    )
    .unwrap();
    let document = Document::parse("{ filter }", "query.graphql").unwrap();
    let error = validate_field_merging(&schema, &document).unwrap_err();
    assert_eq!(
        error,
        InvariantError::UnexpectedTypeKind {
            type_name: name!("Filter")
        }
    );
    assert_eq!(
        error.to_string(),
        "input object type `Filter` cannot be the output type of a field"
    );
}
