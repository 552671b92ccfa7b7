mod setup;

use glaredb_dataset::functions::lit;
use glaredb_dataset::{DataType, Field, JoinType, Schema, product_encoder, row};
use setup::{keyed, session};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    k: i32,
    v: String,
}

product_encoder!(Item { k: i32, v: String });

#[test]
fn self_join_condition_compares_both_sides() {
    let session = session();
    let df = keyed(&session);

    let cond = df.col("k").unwrap().equal_to(df.col("k").unwrap());
    let joined = df.join(&df, cond).unwrap();

    assert_eq!(vec!["k", "v", "k", "v"], joined.columns());
    assert_eq!(3, joined.count().unwrap());

    let mut rows = joined.collect().unwrap();
    rows.sort();
    assert_eq!(
        vec![
            row![1, "x", 1, "x"],
            row![2, "y", 2, "y"],
            row![3, "z", 3, "z"],
        ],
        rows
    );
}

#[test]
fn typed_self_join_pairs_each_value_with_itself() {
    let session = session();
    let items = keyed(&session).as_::<Item>().unwrap();

    let cond = items.col("k").unwrap().equal_to(items.col("k").unwrap());
    let pairs = items.join_with(&items, cond, JoinType::Inner).unwrap();

    let mut values = pairs.collect().unwrap();
    values.sort_by_key(|(item, _)| item.k);
    assert_eq!(3, values.len());
    for (left, right) in &values {
        assert_eq!(left, right);
    }
    let keys: Vec<i32> = values.iter().map(|(item, _)| item.k).collect();
    assert_eq!(vec![1, 2, 3], keys);
}

#[test]
fn self_join_without_rewrite_is_trivially_true() {
    let session = session();
    session
        .set_config("self_join_auto_resolve_ambiguity", false)
        .unwrap();
    let df = keyed(&session);

    let cond = df.col("k").unwrap().equal_to(df.col("k").unwrap());
    let joined = df.join(&df, cond).unwrap();

    assert_eq!(9, joined.count().unwrap());
}

#[test]
fn self_join_rewrites_under_or() {
    let session = session();
    let df = keyed(&session);

    let cond = df
        .col("k")
        .unwrap()
        .equal_to(df.col("k").unwrap())
        .or(lit(false));
    assert_eq!(3, df.join(&df, cond).unwrap().count().unwrap());
}

#[test]
fn join_using_full_outer() {
    let session = session();
    let left = keyed(&session);
    let right = session
        .create_dataframe(
            vec![row![2, 20], row![3, 30], row![4, 40]],
            Schema::new([
                Field::new("k", DataType::Int32, false),
                Field::new("w", DataType::Int32, false),
            ]),
        )
        .unwrap();

    let joined = left.join_using(&right, &["k"], JoinType::FullOuter).unwrap();
    assert_eq!(vec!["k", "v", "w"], joined.columns());

    let mut rows = joined.collect().unwrap();
    rows.sort();
    let null = glaredb_dataset::ScalarValue::Null;
    assert_eq!(
        vec![
            row![1, "x", null.clone()],
            row![2, "y", 20],
            row![3, "z", 30],
            row![4, null, 40],
        ],
        rows
    );
}

#[test]
fn join_using_self() {
    let session = session();
    let df = keyed(&session);

    let joined = df.join_using(&df, &["k"], JoinType::Inner).unwrap();
    assert_eq!(vec!["k", "v", "v"], joined.columns());
    assert_eq!(3, joined.count().unwrap());
}

#[test]
fn join_with_pairs() {
    let session = session();
    let items = keyed(&session).as_::<Item>().unwrap();
    let keys = session.create_dataset(vec![1_i32, 3]).unwrap();

    let cond = items
        .col("k")
        .unwrap()
        .equal_to(keys.col("value").unwrap());
    let pairs = items.join_with(&keys, cond, JoinType::Inner).unwrap();
    assert_eq!(vec!["_1", "_2"], pairs.columns());

    let mut values = pairs.collect().unwrap();
    values.sort_by_key(|(item, _)| item.k);
    assert_eq!(
        vec![
            (
                Item {
                    k: 1,
                    v: "x".to_string()
                },
                1
            ),
            (
                Item {
                    k: 3,
                    v: "z".to_string()
                },
                3
            ),
        ],
        values
    );
}

#[test]
fn join_with_left_outer_missing_side() {
    let session = session();
    let items = keyed(&session).as_::<Item>().unwrap();
    let keys = session.create_dataset(vec![Some(1_i32), Some(3)]).unwrap();

    let cond = items
        .col("k")
        .unwrap()
        .equal_to(keys.col("value").unwrap());
    let pairs = items.join_with(&keys, cond, JoinType::LeftOuter).unwrap();

    let mut values = pairs.collect().unwrap();
    values.sort_by_key(|(item, _)| item.k);
    let rights: Vec<Option<i32>> = values.into_iter().map(|(_, right)| right).collect();
    assert_eq!(vec![Some(1), None, Some(3)], rights);
}

#[test]
fn join_with_untyped_rows() {
    let session = session();
    let df = keyed(&session);
    let keys = df.select_names(&["k"]).unwrap().to_df(&["kk"]).unwrap();

    let cond = df.col("k").unwrap().equal_to(keys.col("kk").unwrap());
    let pairs = df.join_with(&keys, cond, JoinType::Inner).unwrap();
    assert_eq!(vec!["_1", "_2"], pairs.columns());

    let mut values = pairs.collect().unwrap();
    values.sort();
    assert_eq!(
        vec![
            (row![1, "x"], row![1]),
            (row![2, "y"], row![2]),
            (row![3, "z"], row![3]),
        ],
        values
    );
}

#[test]
fn join_with_rejects_semi() {
    let session = session();
    let df = keyed(&session);
    let cond = df.col("k").unwrap().equal_to(df.col("k").unwrap());

    let err = df.join_with(&df, cond, JoinType::LeftSemi).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn range_self_join() {
    let session = session();
    let ids = session.range(0, 4, 1).unwrap();

    let cond = ids.col("id").unwrap().equal_to(ids.col("id").unwrap());
    let pairs = ids.join_with(&ids, cond, JoinType::Inner).unwrap();

    let mut values = pairs.collect().unwrap();
    values.sort();
    assert_eq!(vec![(0, 0), (1, 1), (2, 2), (3, 3)], values);
}
