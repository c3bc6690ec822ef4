use std::collections::HashMap;

use eo_access::prelude::*;

fn person() -> Model {
    let person = Entity::builder("Person")
        .external_name("person")
        .attribute(Attribute::builder("id").external_type("INTEGER"))
        .attribute(Attribute::builder("key").column_name("k"))
        .attribute(Attribute::builder("name"))
        .attribute(Attribute::builder("lastname"))
        .attribute(Attribute::builder("firstname"))
        .primary_key("id")
        .build()
        .unwrap();
    Model::connect([person]).unwrap()
}

fn where_clause(expr: &SqlExpression<'_>) -> String {
    expr.statement()
        .split_once(" WHERE ")
        .map(|(_, clause)| clause.to_string())
        .unwrap_or_default()
}

fn compile(model: &Model, qualifier: Qualifier) -> SqlExpression<'_> {
    let spec = FetchSpecification::builder("Person")
        .qualifier(qualifier)
        .build();
    ExpressionFactory::new(Dialect::Sqlite)
        .select(model, &spec)
        .unwrap()
}

#[test]
fn equality_binds_one_value() {
    let model = person();
    let expr = compile(&model, Qualifier::equal("key", "value"));
    assert_eq!(where_clause(&expr), "BASE.k = ?");
    assert_eq!(expr.bind_variables().len(), 1);
    assert_eq!(expr.bind_variables()[0].value, Value::from("value"));
    assert_eq!(expr.bind_variables()[0].placeholder, "?");
}

#[test]
fn integer_attributes_are_inlined() {
    let model = person();
    let expr = compile(&model, Qualifier::equal("id", 42));
    assert_eq!(where_clause(&expr), "BASE.id = 42");
    assert!(expr.bind_variables().is_empty());
}

#[test]
fn empty_contains_is_always_false() {
    let model = person();
    let expr = compile(
        &model,
        Qualifier::key_value("key", Operator::Contains, Value::Array(Vec::new())),
    );
    assert_eq!(where_clause(&expr), "1 = 2");
    assert!(expr.bind_variables().is_empty());
}

#[test]
fn conjunction_drops_empty_children() {
    let model = person();
    let expr = compile(
        &model,
        Qualifier::and([Qualifier::equal("key", "a"), Qualifier::and([])]),
    );
    assert_eq!(where_clause(&expr), "(BASE.k = ?)");
}

#[test]
fn case_insensitive_like_translates_wildcards() {
    let model = person();
    let expr = compile(
        &model,
        Qualifier::key_value("name", Operator::CaseInsensitiveLike, "D*?"),
    );
    let clause = where_clause(&expr);
    assert!(clause.contains("LIKE"));
    assert_eq!(clause, "UPPER(BASE.name) LIKE UPPER(?)");
    assert_eq!(expr.bind_variables()[0].value, Value::from("D%_"));
}

#[test]
fn insert_preserves_column_order() {
    let model = person();
    let entity = model.entity_named("Person").unwrap();
    let row = Record::from_pairs([("lastname", "Duck"), ("firstname", "Donald")]);
    let expr = ExpressionFactory::new(Dialect::Sqlite)
        .insert(entity, &row)
        .unwrap();
    assert_eq!(
        expr.statement(),
        "INSERT INTO \"person\" (lastname, firstname) VALUES (?, ?)"
    );
    let values: Vec<_> = expr.bind_variables().iter().map(|b| &b.value).collect();
    assert_eq!(values, [&Value::from("Duck"), &Value::from("Donald")]);
}

#[test]
fn variables_must_be_bound_before_compiling() {
    let model = person();
    let template = Qualifier::equal("name", Value::Variable("who".into()));
    assert_eq!(template.variables(), ["who"]);

    let bindings = HashMap::from([("who".to_string(), Value::from("Donald"))]);
    assert!(matches!(
        template.with_bindings(&HashMap::new(), true),
        Err(EoAccessError::UnresolvedVariable(name)) if name == "who"
    ));
    let bound = template.with_bindings(&bindings, true).unwrap();
    let expr = compile(&model, bound);
    assert_eq!(expr.bind_variables()[0].value, Value::from("Donald"));
}

#[test]
fn literal_mode_quotes_strings() {
    let model = person();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::equal("name", "O'Hara"))
        .build();
    let expr = ExpressionFactory::new(Dialect::Sqlite)
        .with_bind_variables(false)
        .select(&model, &spec)
        .unwrap();
    assert_eq!(where_clause(&expr), "BASE.name = 'O''Hara'");
    assert!(expr.bind_variables().is_empty());
}
