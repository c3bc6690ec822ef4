use super::*;
use crate::qualifier::{Operator, SortDirection, SortOrdering};

fn model() -> Model {
    let person = Entity::builder("Person")
        .external_name("person")
        .attribute(Attribute::builder("id").external_type("INTEGER"))
        .attribute(Attribute::builder("name").column_name("k"))
        .attribute(
            Attribute::builder("managerId")
                .column_name("manager_id")
                .external_type("INTEGER"),
        )
        .relationship(
            Relationship::builder("toManager")
                .destination("Person")
                .join("managerId", "id")
                .join_semantic(crate::model::JoinSemantic::LeftOuter),
        )
        .relationship(
            Relationship::builder("toRoleLinks")
                .destination("RoleLink")
                .to_many(true)
                .join("id", "personId"),
        )
        .relationship(Relationship::builder("roles").flattened("toRoleLinks.toRole"))
        .primary_key("id")
        .build()
        .unwrap();
    let link = Entity::builder("RoleLink")
        .external_name("person_role")
        .attribute(Attribute::builder("personId").column_name("person_id"))
        .attribute(Attribute::builder("roleId").column_name("role_id"))
        .relationship(
            Relationship::builder("toRole")
                .destination("Role")
                .join("roleId", "id"),
        )
        .build()
        .unwrap();
    let role = Entity::builder("Role")
        .external_name("role")
        .attribute(Attribute::builder("id").external_type("INTEGER"))
        .attribute(Attribute::builder("title"))
        .primary_key("id")
        .build()
        .unwrap();
    Model::connect([person, link, role]).unwrap()
}

const COLUMNS: &str = "BASE.id, BASE.k, BASE.manager_id";

#[test]
fn flattened_path_joins_every_hop() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::equal("roles.title", "admin"))
        .build();
    let expr = ExpressionFactory::new(Dialect::Sqlite)
        .select(&model, &spec)
        .unwrap();
    assert_eq!(
        expr.statement(),
        format!(
            "SELECT {COLUMNS} FROM \"person\" AS BASE \
             LEFT JOIN \"person_role\" AS RL ON (BASE.id = RL.person_id) \
             LEFT JOIN \"role\" AS R ON (RL.role_id = R.id) \
             WHERE R.title = ?"
        )
    );
    assert_eq!(expr.bind_variables().len(), 1);
    assert_eq!(expr.selected_keys(), ["id", "name", "managerId"]);
    assert_eq!(
        expr.relationship_for_path("toRoleLinks.toRole")
            .map(Relationship::name),
        Some("toRole")
    );
    assert!(expr.warnings().is_empty());
}

#[test]
fn aliases_are_stable_across_compilations() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::and([
            Qualifier::equal("toManager.name", "x"),
            Qualifier::equal("toManager.toManager.name", "y"),
        ]))
        .build();
    let factory = ExpressionFactory::new(Dialect::Sqlite);
    let first = factory.select(&model, &spec).unwrap();
    let second = factory.select(&model, &spec).unwrap();
    assert_eq!(first.statement(), second.statement());
    assert_eq!(first.aliases(), second.aliases());

    let aliases: Vec<_> = first
        .aliases()
        .iter()
        .map(|(p, a)| (p.as_str(), a.as_str()))
        .collect();
    assert_eq!(
        aliases,
        [("", "BASE"), ("toManager", "M"), ("toManager.toManager", "M0")]
    );
    assert!(first.statement().contains(
        "LEFT JOIN \"person\" AS M ON (BASE.manager_id = M.id) \
         LEFT JOIN \"person\" AS M0 ON (M.manager_id = M0.id)"
    ));
}

#[test]
fn where_embedded_joins_use_join_semantics() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::or([
            Qualifier::equal("toManager.name", "x"),
            Qualifier::equal("name", "y"),
        ]))
        .build();
    let expr = ExpressionFactory::new(Dialect::Sybase)
        .with_joins_in_from_clause(false)
        .select(&model, &spec)
        .unwrap();
    assert_eq!(
        expr.statement(),
        format!(
            "SELECT {COLUMNS} FROM [person] BASE, [person] M \
             WHERE ((M.k = ?) OR (BASE.k = ?)) AND BASE.manager_id *= M.id"
        )
    );
    let values: Vec<_> = expr.bind_variables().iter().map(|b| &b.value).collect();
    assert_eq!(values, [&Value::from("x"), &Value::from("y")]);
}

#[test]
fn paging_lock_and_ordering() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .sort(SortOrdering::new("name", SortDirection::CaseInsensitiveAscending))
        .sort(SortOrdering::descending("id"))
        .limit(10)
        .offset(20)
        .locks(true)
        .distinct(true)
        .build();

    let sqlite = ExpressionFactory::new(Dialect::Sqlite)
        .select(&model, &spec)
        .unwrap();
    assert_eq!(
        sqlite.statement(),
        format!(
            "SELECT DISTINCT {COLUMNS} FROM \"person\" AS BASE \
             ORDER BY UPPER(BASE.k) ASC, BASE.id DESC LIMIT 10 OFFSET 20"
        )
    );

    let postgres = ExpressionFactory::new(Dialect::Postgres)
        .select(&model, &spec)
        .unwrap();
    assert!(postgres.statement().ends_with("LIMIT 10 OFFSET 20 FOR UPDATE"));
}

#[test]
fn sybase_paging_requires_an_ordering() {
    let model = model();
    let spec = FetchSpecification::builder("Person").limit(5).build();
    let expr = ExpressionFactory::new(Dialect::Sybase)
        .select(&model, &spec)
        .unwrap();
    assert_eq!(
        expr.statement(),
        format!(
            "SELECT {COLUMNS} FROM [person] AS BASE \
             ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        )
    );
}

#[test]
fn raw_pattern_substitutes_tokens() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::equal("name", "x"))
        .sort(SortOrdering::ascending("name"))
        .raw_sql_pattern(
            "%(select)s %(columns)s FROM %(tables)s %(where)s %(orderby)s -- %(basetable)s",
        )
        .build();
    let expr = ExpressionFactory::default().select(&model, &spec).unwrap();
    assert_eq!(
        expr.statement(),
        format!(
            "SELECT {COLUMNS} FROM \"person\" AS BASE WHERE BASE.k = ? \
             ORDER BY BASE.k ASC -- person"
        )
    );
    assert_eq!(expr.bind_variables().len(), 1);
}

#[test]
fn raw_pattern_repeats_binds_per_occurrence() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::equal("name", "x"))
        .raw_sql_pattern(
            "SELECT id FROM person BASE WHERE %(qualifier)s UNION \
             SELECT id FROM person BASE WHERE 1 = 1 %(andQualifier)s",
        )
        .build();
    let expr = ExpressionFactory::default().select(&model, &spec).unwrap();
    assert_eq!(
        expr.statement(),
        "SELECT id FROM person BASE WHERE BASE.k = ? UNION \
         SELECT id FROM person BASE WHERE 1 = 1 AND BASE.k = ?"
    );
    assert_eq!(expr.bind_variables().len(), 2);
}

#[test]
fn raw_pattern_with_unknown_token_fails() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .raw_sql_pattern("SELECT %(everything)s")
        .build();
    let err = ExpressionFactory::default()
        .select(&model, &spec)
        .unwrap_err();
    assert!(matches!(err, EoAccessError::MissingPatternToken(t) if t == "everything"));
}

#[test]
fn unresolved_paths_are_reported() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::equal("toNothing.name", "x"))
        .build();
    let expr = ExpressionFactory::default().select(&model, &spec).unwrap();
    assert!(expr.statement().ends_with("WHERE toNothing.name = ?"));
    assert_eq!(expr.warnings().len(), 1);
}

#[test]
fn read_format_wraps_selected_column() {
    let entity = Entity::builder("Doc")
        .external_name("doc")
        .attribute(Attribute::builder("id").external_type("INTEGER"))
        .attribute(Attribute::builder("title").read_format("TRIM(%P)"))
        .primary_key("id")
        .build()
        .unwrap();
    let model = Model::connect([entity]).unwrap();
    let spec = FetchSpecification::builder("Doc")
        .attributes(["title"])
        .build();
    let expr = ExpressionFactory::default().select(&model, &spec).unwrap();
    assert_eq!(expr.statement(), "SELECT TRIM(BASE.title) FROM \"doc\" AS BASE");
    assert_eq!(expr.selected_keys(), ["title"]);
}

#[test]
fn table_select_without_model() {
    let spec = FetchSpecification::builder("things")
        .attributes(["name"])
        .qualifier(Qualifier::key_value("name", Operator::NotEqualTo, "x"))
        .build();
    let expr = ExpressionFactory::default()
        .select_from_table("things", &spec)
        .unwrap();
    assert_eq!(
        expr.statement(),
        "SELECT BASE.name FROM \"things\" AS BASE WHERE BASE.name <> ?"
    );

    let everything = ExpressionFactory::default()
        .select_from_table("things", &FetchSpecification::builder("things").build())
        .unwrap();
    assert_eq!(everything.statement(), "SELECT * FROM \"things\" AS BASE");
    assert!(everything.selected_keys().is_empty());
}

#[test]
fn bind_order_follows_statement_text() {
    let model = model();
    let spec = FetchSpecification::builder("Person")
        .qualifier(Qualifier::and([
            Qualifier::equal("name", "a"),
            Qualifier::or([
                Qualifier::equal("roles.title", "b"),
                Qualifier::not(Qualifier::equal("toManager.name", "c")),
            ]),
        ]))
        .build();
    let expr = ExpressionFactory::default().select(&model, &spec).unwrap();
    let values: Vec<_> = expr
        .bind_variables()
        .iter()
        .map(|b| b.value.as_text().unwrap_or_default())
        .collect();
    assert_eq!(values, ["a", "b", "c"]);
    assert_eq!(expr.statement().matches('?').count(), 3);
}

#[test]
fn unknown_entity_is_a_model_error() {
    let model = model();
    let spec = FetchSpecification::builder("Nobody").build();
    assert!(matches!(
        ExpressionFactory::default().select(&model, &spec),
        Err(EoAccessError::ModelError(_))
    ));
}
