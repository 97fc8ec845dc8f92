//! Schema documents, settings and the catalog entry point.

use scaffolder::{
    Catalog, DataRepository, Dialect, Filter, QueryBuilder, QueryKind, ScaffoldConfig,
    ScaffoldError, Schema, SqliteDatabase, Value,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

const SCHEMA: &str = r#"{
    "tables": [
        {
            "name": "teams",
            "columns": [
                {"name": "id", "isKey": true, "autoIncrement": true, "showInGrid": true},
                {"name": "name", "showInGrid": true}
            ]
        },
        {
            "name": "players",
            "columns": [
                {"name": "id", "isKey": true, "autoIncrement": true},
                {"name": "nick", "showInGrid": true},
                {"name": "rating"},
                {"name": "team_id", "reference": {"table": "teams", "keyColumn": "id", "displayColumn": "name", "alias": "team"}}
            ]
        }
    ]
}"#;

fn schema_file() -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let path = std::env::temp_dir().join(format!(
        "scaffolder-catalog-{}-{}.json",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::write(&path, SCHEMA).expect("Failed to write schema");
    path
}

fn database() -> SqliteDatabase {
    let db = SqliteDatabase::open_in_memory().expect("Failed to open database");
    db.execute_batch(
        r#"
        CREATE TABLE teams (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
        CREATE TABLE players (id INTEGER PRIMARY KEY AUTOINCREMENT, nick TEXT, rating REAL, team_id INTEGER);
        "#,
    )
    .expect("Failed to create schema");
    db
}

fn catalog() -> Catalog {
    let config = ScaffoldConfig {
        dialect: Dialect::Sqlite,
        schema_path: Some(schema_file()),
        default_page_size: 2,
    };
    Catalog::load(config).expect("Failed to load catalog")
}

#[test]
fn test_catalog_drives_repositories() {
    let catalog = catalog();
    let db = database();

    let repos: Vec<Box<dyn DataRepository + '_>> = vec![
        Box::new(catalog.repository("teams", &db).expect("teams")),
        Box::new(catalog.repository("players", &db).expect("players")),
    ];
    let (teams, players) = (&repos[0], &repos[1]);

    teams.insert(&json!({"name": "Red"})).expect("Failed to insert");
    for (nick, rating) in [("ace", 9.5), ("bolt", 7.0), ("cobra", 8.25)] {
        players
            .insert(&json!({"nick": nick, "rating": rating, "team_id": 1}))
            .expect("Failed to insert");
    }

    let first_page = players
        .select(&catalog.filter("players"))
        .expect("Failed to select");
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].get("team"), Some(&Value::Text("Red".into())));
    assert!(!first_page[0].contains_key("rating"));

    assert_eq!(
        players
            .get_record_count(&catalog.filter("players"))
            .expect("Failed to count"),
        3
    );

    let strong = players
        .select(&Filter::new("players").with_parameter("rating_from", 8.0).detail())
        .expect("Failed to select");
    assert_eq!(strong.len(), 2);
    assert_eq!(strong[1].get("rating"), Some(&Value::Float(8.25)));
}

#[test]
fn test_unknown_table() {
    let catalog = catalog();
    let db = database();
    assert!(catalog.table("coaches").is_none());
    assert!(matches!(
        catalog.repository("coaches", &db),
        Err(ScaffoldError::InvalidMetadata(_))
    ));
}

#[test]
fn test_postgres_rendering_from_schema() {
    let schema = Schema::from_json(SCHEMA).expect("Failed to parse schema");
    let catalog = Catalog::new(schema, ScaffoldConfig::default());
    let players = catalog.table("players").expect("players");

    let statement = catalog
        .query_builder()
        .build(QueryKind::Select, &players, Some(&catalog.filter("players")), None)
        .expect("Failed to build");
    assert!(statement.sql.starts_with(concat!(
        r#"SELECT "players"."id", "players"."nick", "players"."team_id", "team_id_ref"."name" AS "team" "#,
        r#"FROM "players" "#,
        r#"LEFT JOIN "teams" AS "team_id_ref" ON "players"."team_id" = "team_id_ref"."id" "#,
        r#"ORDER BY "players"."id" ASC"#
    )));
    assert!(statement.sql.contains("LIMIT 25"));
    assert!(statement.parameters.is_empty());
}

#[test]
fn test_schema_rejects_dangling_reference() {
    let broken = SCHEMA.replace(r#""displayColumn": "name""#, r#""displayColumn": "title""#);
    assert!(matches!(
        Schema::from_json(&broken),
        Err(ScaffoldError::InvalidMetadata(_))
    ));
}

#[test]
fn test_missing_schema_file() {
    let config = ScaffoldConfig {
        schema_path: Some(PathBuf::from("does/not/exist.json")),
        ..ScaffoldConfig::default()
    };
    assert!(matches!(
        Catalog::load(config),
        Err(ScaffoldError::Configuration(_))
    ));
}
