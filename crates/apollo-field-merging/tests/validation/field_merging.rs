use super::conflicts;
use super::expect_valid;
use super::validate;
use apollo_field_merging::validation::ConflictReason;

#[test]
fn different_fields_under_one_alias() {
    assert_eq!(
        conflicts(
            r#"
      query {
        user(id: 1) {
          name: fullName
          name: nickName
        }
      }
    "#
        ),
        [(
            "different field name for response key `name`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
}

#[test]
fn same_field_with_and_without_arguments() {
    assert_eq!(
        conflicts(
            r#"
      query {
        product(id: 1) {
          price
          price(currency: "USD")
        }
      }
    "#
        ),
        [(
            "argument mismatch for response key `price`".to_owned(),
            ConflictReason::ArgumentMismatch
        )]
    );
}

#[test]
fn same_field_with_different_argument_values() {
    assert_eq!(
        conflicts(
            r#"
      query {
        product(id: 1) { id }
        product(id: 2) { id }
      }
    "#
        ),
        [(
            "argument mismatch for response key `product`".to_owned(),
            ConflictReason::ArgumentMismatch
        )]
    );
}

#[test]
fn identical_arguments_merge() {
    expect_valid(
        r#"
      query {
        product(id: 1) { price(currency: "USD") }
        product(id: 1) { price(currency: "USD") count }
      }
    "#,
    );
}

#[test]
fn fragments_selecting_the_same_field() {
    expect_valid(
        r#"
      query {
        user { ...Identity ...Reference }
      }

      fragment Identity on User { id fullName }
      fragment Reference on User { id }
    "#,
    );
}

#[test]
fn identical_reselection() {
    expect_valid(
        r#"
      query {
        user(id: 1) { id friends(first: 2) { id } }
        user(id: 1) { id friends(first: 2) { id ...Names } }
        ... on Query { user(id: 1) { id } }
      }

      fragment Names on User { fullName nickName }
    "#,
    );
}

#[test]
fn different_aliases_never_conflict() {
    expect_valid(
        r#"
      query {
        user {
          full: fullName
          nick: nickName
          usd: friends(first: 1) { id }
          eur: friends(first: 2) { id }
        }
      }
    "#,
    );
}

#[test]
fn different_types_on_unrelated_objects() {
    expect_valid(
        r#"
      query {
        search(text: "box") {
          ... on Product { count }
          ... on Warehouse { count }
        }
      }
    "#,
    );
}

#[test]
fn different_fields_on_unrelated_objects() {
    expect_valid(
        r#"
      query {
        search {
          ... on Product { label: name }
          ... on User { label: fullName }
        }
      }
    "#,
    );
}

#[test]
fn scalar_and_enum_under_one_alias() {
    assert_eq!(
        conflicts("{ user { value: status value: fullName } }"),
        [(
            "scalar and enum types mixed for response key `value`".to_owned(),
            ConflictReason::LeafKindMismatch
        )]
    );
}

#[test]
fn scalar_and_enum_on_unrelated_objects() {
    // A `Warehouse` is never a `User`
    expect_valid(
        r#"
      query {
        search {
          ... on Warehouse { value: count }
          ... on User { value: status }
        }
      }
    "#,
    );
}

#[test]
fn scalar_and_enum_on_an_interface_and_an_object() {
    assert_eq!(
        conflicts(
            r#"
      query {
        node(id: 1) {
          ... on Node { value: id }
          ... on User { value: status }
        }
      }
    "#
        ),
        [(
            "scalar and enum types mixed for response key `value`".to_owned(),
            ConflictReason::LeafKindMismatch
        )]
    );
}

#[test]
fn interface_and_object_field_types_are_compared() {
    assert_eq!(
        conflicts(
            r#"
      query {
        node(id: 1) {
          related { id }
          ... on Product { related { id } }
        }
      }
    "#
        ),
        [(
            "type mismatch for response key `related`".to_owned(),
            ConflictReason::TypeMismatch
        )]
    );
}

#[test]
fn abstract_parent_is_compared_with_each_object() {
    assert_eq!(
        conflicts(
            r#"
      query {
        node(id: 1) {
          key: id
          ... on Product { key: name }
          ... on Warehouse { key: name }
        }
      }
    "#
        ),
        [
            (
                "different field name for response key `key`".to_owned(),
                ConflictReason::DifferentFieldName
            ),
            (
                "different field name for response key `key`".to_owned(),
                ConflictReason::DifferentFieldName
            ),
        ]
    );
}

#[test]
fn nested_conflict_is_reported_once_on_the_deepest_pair() {
    let errors = validate(
        r#"
      query {
        user {
          friends { name: fullName }
        }
        user {
          friends { name: nickName }
        }
        ... on Query {
          user {
            friends { name: nickName }
          }
        }
      }
    "#,
    );
    let conflicts: Vec<_> = errors.field_conflicts().collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].response_key, "name");
    assert_eq!(conflicts[0].first.node.name, "fullName");
    assert_eq!(conflicts[0].second.node.name, "nickName");
    let json = errors.to_json();
    let lines: Vec<_> = json[0]
        .locations
        .iter()
        .map(|location| (location.line, location.column))
        .collect();
    assert_eq!(lines, [(3, 15), (6, 15)]);
}

#[test]
fn conflict_inside_a_list_field() {
    assert_eq!(
        conflicts(
            r#"
      query {
        users {
          orders { product { id } quantity }
          orders { product: quantity }
        }
      }
    "#
        ),
        [(
            "different field name for response key `product`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
}

#[test]
fn unknown_fields_are_compared_by_name_and_arguments_only() {
    expect_valid("{ user { missing missing } unknown { a } unknown { a } }");
    assert_eq!(
        conflicts("{ user { x: missing x: alsoMissing } }"),
        [(
            "different field name for response key `x`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
    assert_eq!(
        conflicts("{ unknown { x: a x: b } }"),
        [(
            "different field name for response key `x`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
}

#[test]
fn fields_on_an_unknown_type_condition_are_compared() {
    assert_eq!(
        conflicts("{ user { ... on Nope { a: fullName a: nickName } } }"),
        [(
            "different field name for response key `a`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
    // They may apply to a `User` too
    assert_eq!(
        conflicts("{ user { a: fullName ... on Nope { a: nickName } } }"),
        [(
            "different field name for response key `a`".to_owned(),
            ConflictReason::DifferentFieldName
        )]
    );
}

#[test]
fn conflicts_are_deterministic() {
    let query = r#"
      query {
        user {
          name: fullName
          name: nickName
          friends { id: fullName }
          friends { id }
        }
        product(id: 1) { price price(currency: "EUR") }
      }
    "#;
    let first = validate(query);
    assert_eq!(first.len(), 3);
    for _ in 0..5 {
        let again = validate(query);
        assert_eq!(again.to_json(), first.to_json());
        assert_eq!(again.to_string(), first.to_string());
    }
    let keys: Vec<_> = first
        .field_conflicts()
        .map(|conflict| conflict.response_key.as_str())
        .collect();
    assert_eq!(keys, ["name", "id", "price"]);
}
