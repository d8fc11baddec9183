use biggie::{Collection, SaveOutcome};
use pretty_assertions::assert_eq;
use std_util::prelude::*;
use tests::{models, Test};

fn batch(t: &Test, names: &[Option<&str>]) -> Collection {
    names
        .iter()
        .map(|name| {
            let mut cat = t.db.new_model("cat").unwrap();
            cat.set("age", 2).unwrap();
            if let Some(name) = name {
                cat.set("name", *name).unwrap();
            }
            cat
        })
        .collect()
}

#[tokio::test]
async fn partial_success() {
    let mut t = Test::new([models::cat()]).await;

    let mut cats = batch(&t, &[Some("a"), None, Some("c")]);
    let outcome = cats.save(&t.db).await.unwrap();

    assert_eq!(outcome.saved, [0, 2]);
    assert_eq!(outcome.rejected, [1]);
    assert_eq!(outcome.of(2), SaveOutcome::Saved);

    assert_eq!(cats.ids(), [1, 2]);
    assert!(cats.has_errors());
    assert_eq!(cats.errors().count(), 1);
    assert!(cats[1].is_new());

    // Ids for the whole batch are reserved in one pipeline, then the rows
    // are written in another.
    let pipelines = t.log.pipelines();
    assert_eq!(pipelines[0], ["INCR id:cat", "INCR id:cat"]);
    assert_eq!(pipelines.len(), 2);

    assert_eq!(2, t.db.count("cat").await.unwrap());

    // Fixing the rejected member and saving again writes only it.
    t.log.clear();
    cats[1].set("name", "b").unwrap();
    let outcome = cats.save(&t.db).await.unwrap();
    assert_eq!(outcome.saved, [1]);
    assert_eq!(outcome.unchanged, [0, 2]);
    assert!(outcome.is_success());
    assert_eq!(cats.ids(), [1, 3, 2]);
    assert_unique!(cats.ids());
}

#[tokio::test]
async fn batch_remove() {
    let t = Test::new([models::cat()]).await;

    let mut cats = batch(&t, &[Some("a"), Some("b"), Some("c")]);
    cats.save(&t.db).await.unwrap();

    let mut all = t.db.all("cat").await.unwrap();
    assert_eq!(all.len(), 3);

    all.remove(&t.db).await.unwrap();
    assert!(all.iter().all(|cat| cat.is_removed()));
    assert_eq!(0, t.db.count("cat").await.unwrap());
    assert_eq!(t.store.keys(), ["id:cat"]);
}

#[tokio::test]
async fn batch_validate() {
    let t = Test::new([models::cat()]).await;

    let mut cats = batch(&t, &[Some("a"), None]);
    assert!(!cats.validate(&t.db).await.unwrap());
    assert_eq!(cats.errors().count(), 1);
    assert!(t.store.is_empty());
}
