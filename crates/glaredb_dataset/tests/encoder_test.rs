mod setup;

use glaredb_dataset::functions::{col, lit};
use glaredb_dataset::{DataType, Encodable, Field, Row, Schema, product_encoder, row};
use setup::{people, session};

#[derive(Debug, Clone, PartialEq)]
struct Person {
    name: String,
    age: i32,
}

product_encoder!(Person { name: String, age: i32 });

#[derive(Debug, Clone, PartialEq)]
struct Team {
    lead: Person,
    tags: Vec<String>,
    budget: Option<f64>,
}

product_encoder!(Team {
    lead: Person,
    tags: Vec<String>,
    budget: Option<f64>,
});

#[test]
fn product_values_round_trip_through_dataset() {
    let session = session();
    let people = vec![
        Person {
            name: "a".to_string(),
            age: 30,
        },
        Person {
            name: "b".to_string(),
            age: 40,
        },
    ];

    let ds = session.create_dataset(people.clone()).unwrap();
    assert_eq!(vec!["name", "age"], ds.columns());
    assert_eq!(people, ds.collect().unwrap());
}

#[test]
fn nested_product_round_trip() {
    let session = session();
    let teams = vec![
        Team {
            lead: Person {
                name: "a".to_string(),
                age: 30,
            },
            tags: vec!["x".to_string(), "y".to_string()],
            budget: Some(1.5),
        },
        Team {
            lead: Person {
                name: "b".to_string(),
                age: 40,
            },
            tags: Vec::new(),
            budget: None,
        },
    ];

    let ds = session.create_dataset(teams.clone()).unwrap();
    match &ds.schema().fields[0].datatype {
        DataType::Struct(meta) => {
            let names: Vec<_> = meta.fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(vec!["name", "age"], names);
        }
        other => panic!("unexpected type: {other}"),
    }
    assert_eq!(teams, ds.collect().unwrap());

    let names = ds
        .select([col("lead").get_field("name")])
        .unwrap()
        .as_::<String>()
        .unwrap();
    assert_eq!(vec!["a", "b"], names.collect().unwrap());
}

#[test]
fn tuples_round_trip() {
    let session = session();
    let pairs = vec![(1_i64, "one".to_string()), (2, "two".to_string())];

    let ds = session.create_dataset(pairs.clone()).unwrap();
    assert_eq!(vec!["_1", "_2"], ds.columns());
    assert_eq!(pairs, ds.collect().unwrap());
}

#[test]
fn typed_view_binds_by_name() {
    let session = session();
    // Columns in a different order than the struct's fields.
    let df = people(&session)
        .select([col("age"), col("name")])
        .unwrap();

    let typed = df.as_::<Person>().unwrap();
    assert_eq!(
        Some(Person {
            name: "a".to_string(),
            age: 30,
        }),
        typed.first().unwrap()
    );

    let err = people(&session)
        .select_names(&["name"])
        .unwrap()
        .as_::<Person>()
        .unwrap_err();
    assert!(err.is_analysis(), "{err}");
}

#[test]
fn typed_transformations_keep_type() {
    let session = session();
    let ds = people(&session).as_::<Person>().unwrap();

    let older = ds
        .filter(col("age").gt(lit(35)))
        .unwrap()
        .map(|p| Person {
            age: p.age + 1,
            ..p
        })
        .unwrap();
    assert_eq!(
        vec![Person {
            name: "b".to_string(),
            age: 41,
        }],
        older.collect().unwrap()
    );

    let ages = ds.map(|p| p.age).unwrap();
    assert_eq!(vec!["value"], ages.columns());
    assert_eq!(70, ages.collect().unwrap().into_iter().sum::<i32>());
}

#[test]
fn rows_decode_to_rows() {
    let session = session();
    let df = session
        .create_dataframe(
            vec![row![1, "x"]],
            Schema::new([
                Field::new("k", DataType::Int32, false),
                Field::new("v", DataType::Utf8, true),
            ]),
        )
        .unwrap();
    let rows: Vec<Row> = df.collect().unwrap();
    assert_eq!(vec![row![1, "x"]], rows);
    let encoded: Vec<_> = rows.iter().map(|r| r.encode()).collect();
    assert_eq!(vec![row![1, "x"].values().to_vec()], encoded);
}
