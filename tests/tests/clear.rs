use biggie::Db;
use pretty_assertions::assert_eq;
use std_util::prelude::*;
use tests::{models, Test};

async fn three_cats(db: &Db) {
    for (name, age) in [("a", 1), ("b", 4), ("c", 9)] {
        let mut cat = db.new_model("cat").unwrap();
        cat.set("name", name).unwrap().set("age", age).unwrap();
        cat.save(db).await.unwrap();
    }
}

#[tokio::test]
async fn clearing_a_small_type() {
    let t = Test::new([models::cat()]).await;
    three_cats(&t.db).await;

    t.db.clear("cat").await.unwrap();
    assert!(t.store.is_empty());
    assert_eq!(0, t.db.count("cat").await.unwrap());

    // The id counter restarts.
    let mut cat = t.db.new_model("cat").unwrap();
    cat.set("name", "d").unwrap();
    cat.save(&t.db).await.unwrap();
    assert_eq!(cat.id(), Some(1));
}

#[tokio::test]
async fn clearing_past_the_batch_limit() {
    let mut builder = Db::builder();
    builder.register(models::cat()).clear_batch_limit(1);
    let mut t = Test::with_builder(builder).await;
    three_cats(&t.db).await;
    t.log.clear();

    t.db.clear("cat").await.unwrap();
    assert!(t.store.is_empty());

    // Shared keys are dropped wholesale at the end.
    let last = assert_some!(t.log.pipelines().pop());
    assert_eq!(
        last,
        ["DEL index:cat:age view:cat:kitten view:cat:adult id:cat collection:cat"]
    );
}

#[tokio::test]
async fn clearing_children_detaches_them_from_parents() {
    let t = Test::new([models::person(), models::owned_cat()]).await;

    let mut ann = t.db.new_model("person").unwrap();
    ann.set("name", "Ann").unwrap();
    for name in ["a", "b"] {
        let mut cat = t.db.new_model("cat").unwrap();
        cat.set("name", name).unwrap().set("age", 3).unwrap();
        ann.add_association("cats", cat).unwrap();
    }
    ann.save(&t.db).await.unwrap();

    t.db.clear("cat").await.unwrap();

    assert_eq!(t.store.keys(), ["collection:person", "id:person", "person:1"]);
    assert_empty!(t.db.get_association(&ann, "cats").await.unwrap().into_many());
}
