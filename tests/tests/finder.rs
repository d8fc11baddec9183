use biggie::{Collection, Db, Query, Range, Value};
use pretty_assertions::assert_eq;
use std_util::prelude::*;
use tests::{models, Test};

async fn cats(db: &Db, rows: &[(&str, i64, &str)]) {
    let mut batch = Collection::new();
    for &(name, age, color) in rows {
        let mut cat = db.new_model("cat").unwrap();
        cat.set("name", name)
            .unwrap()
            .set("age", age)
            .unwrap()
            .set("color", color)
            .unwrap();
        batch.push(cat);
    }
    assert!(batch.save(db).await.unwrap().is_success());
}

fn names(cats: &Collection) -> Vec<String> {
    cats.iter()
        .map(|cat| cat.get("name").map(Value::to_string).unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn equality_on_an_index() {
    let t = Test::new([models::cat()]).await;
    cats(
        &t.db,
        &[
            ("Tinkerbell", 5, "white"),
            ("Tom", 3, "grey"),
            ("Tinkerbell", 1, "black"),
        ],
    )
    .await;

    let found = t
        .db
        .find("cat", Query::new().eq("name", "Tinkerbell"))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(found.ids(), [1, 3]);

    let found = t
        .db
        .find(
            "cat",
            Query::new()
                .eq("name", "Tinkerbell")
                .range("age", Range::new().gt(2)),
        )
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(found.ids(), [1]);

    let found = t
        .db
        .find("cat", Query::new().any("name", ["Tom", "Tinkerbell"]))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(found.ids(), [1, 2, 3]);
    assert_unique!(found.ids());

    let none = t
        .db
        .find("cat", Query::new().eq("name", "Garfield"))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn numeric_ranges() {
    let t = Test::new([models::cat()]).await;
    // Ids follow insertion, not age.
    cats(
        &t.db,
        &[
            ("d", 7, "black"),
            ("a", 1, "black"),
            ("e", 9, "white"),
            ("b", 3, "black"),
            ("c", 5, "white"),
        ],
    )
    .await;

    let ages = |cats: &Collection| -> Vec<i64> {
        let mut ages: Vec<_> = cats
            .iter()
            .filter_map(|cat| cat.get("age").and_then(Value::as_i64))
            .collect();
        ages.sort_unstable();
        ages
    };

    let range = || Query::new().range("age", Range::new().gt(2).lt(8));

    let found = t.db.find("cat", range()).unwrap().all().await.unwrap();
    assert_eq!(ages(&found), [3, 5, 7]);
    assert_eq!(names(&found), ["d", "b", "c"]);

    let found = t.db.find("cat", range()).unwrap().limit(2).await.unwrap();
    assert_eq!(names(&found), ["d", "b"]);

    let found = t.db.find("cat", range()).unwrap().desc().limit(2).await.unwrap();
    assert_eq!(names(&found), ["c", "b"]);

    let first = assert_some!(t.db.find("cat", range()).unwrap().first().await.unwrap());
    assert_eq!(first.id(), Some(1));

    let last = assert_some!(t.db.find("cat", range()).unwrap().last().await.unwrap());
    assert_eq!(last.id(), Some(5));

    let inclusive = Query::new().range("age", Range::new().gte(3).lte(7));
    let found = t.db.find("cat", inclusive).unwrap().all().await.unwrap();
    assert_eq!(ages(&found), [3, 5, 7]);

    // Equality on a numeric index is a degenerate range.
    let found = t
        .db
        .find("cat", Query::new().eq("age", "5"))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(names(&found), ["c"]);
}

#[tokio::test]
async fn ranges_follow_updates() {
    let t = Test::new([models::cat()]).await;

    let mut cat = t.db.new_model("cat").unwrap();
    cat.set("name", "Tinkerbell").unwrap().set("age", 5).unwrap();
    cat.save(&t.db).await.unwrap();

    let middling = || Query::new().range("age", Range::new().gt(3).lt(10));
    let old = || Query::new().range("age", Range::new().gt(15));

    let found = t.db.find("cat", middling()).unwrap().all().await.unwrap();
    assert_eq!(found.ids(), [1]);
    assert!(t.db.find("cat", old()).unwrap().all().await.unwrap().is_empty());

    cat.set("age", 20).unwrap();
    cat.save(&t.db).await.unwrap();

    assert!(t.db.find("cat", middling()).unwrap().all().await.unwrap().is_empty());
    let found = t.db.find("cat", old()).unwrap().all().await.unwrap();
    assert_eq!(found.ids(), [1]);
}

#[tokio::test]
async fn unindexed_conditions_filter_loaded_records() {
    let t = Test::new([models::cat()]).await;
    cats(
        &t.db,
        &[
            ("a", 1, "black"),
            ("b", 3, "black"),
            ("c", 5, "white"),
            ("d", 7, "black"),
        ],
    )
    .await;

    let found = t
        .db
        .find("cat", Query::new().eq("color", "black"))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(names(&found), ["a", "b", "d"]);

    // The window applies after filtering.
    let found = t
        .db
        .find("cat", Query::new().eq("color", "black"))
        .unwrap()
        .some(1, 2)
        .await
        .unwrap();
    assert_eq!(names(&found), ["b", "d"]);

    let found = t
        .db
        .find(
            "cat",
            Query::new()
                .range("age", Range::new().gt(2))
                .filter(|cat| cat.get("color") == Some(&Value::from("black"))),
        )
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(names(&found), ["b", "d"]);

    let young = Query::predicate(|cat| cat.get("age").and_then(Value::as_i64) < Some(4));
    let found = t.db.find("cat", young).unwrap().all().await.unwrap();
    assert_eq!(names(&found), ["a", "b"]);
}

#[tokio::test]
async fn scans_and_windows() {
    let mut t = Test::new([models::cat()]).await;
    cats(
        &t.db,
        &[
            ("a", 1, "black"),
            ("b", 3, "black"),
            ("c", 5, "white"),
        ],
    )
    .await;
    t.log.clear();

    let page = t
        .db
        .find("cat", Query::new())
        .unwrap()
        .some(1, 1)
        .await
        .unwrap();
    assert_eq!(names(&page), ["b"]);
    assert_eq!(
        assert_some!(t.log.pop()),
        ["SORT collection:cat LIMIT 1 1 ASC"]
    );

    let all = t.db.all("cat").await.unwrap();
    assert_eq!(all.ids(), [1, 2, 3]);

    let nothing = t
        .db
        .find("cat", Query::new())
        .unwrap()
        .limit(0)
        .await
        .unwrap();
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn void_queries_skip_the_store() {
    let mut t = Test::new([models::cat()]).await;
    cats(&t.db, &[("a", 1, "black")]).await;
    t.log.clear();

    let found = t
        .db
        .find("cat", Query::new().any("name", Vec::<Value>::new()))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert!(found.is_empty());
    assert!(t.log.is_empty());
}

#[tokio::test]
async fn invalid_queries_fail_before_io() {
    let t = Test::new([models::cat()]).await;

    let err = assert_err!(t.db.find("cat", Query::new().eq("whiskers", 12)));
    assert!(err.is_invalid_query());

    let err = assert_err!(t.db.find("cat", Query::new().range("name", Range::new().gt(1))));
    assert!(err.is_invalid_query());

    let err = assert_err!(t.db.find("cat", Query::new().eq("age", "old")));
    assert!(err.is_invalid_query());
    assert_eq!(
        err.to_string(),
        "invalid query: `old` is not a valid number for `cat.age`"
    );

    assert!(t.log.is_empty());
}
