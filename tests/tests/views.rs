use pretty_assertions::assert_eq;
use std_util::prelude::*;
use tests::{models, Test};

#[tokio::test]
async fn records_move_between_views() {
    let t = Test::new([models::cat()]).await;

    let mut kitten = t.db.new_model("cat").unwrap();
    kitten.set("name", "Tom").unwrap().set("age", 1).unwrap();
    kitten.save(&t.db).await.unwrap();

    let mut adult = t.db.new_model("cat").unwrap();
    adult.set("name", "Tinkerbell").unwrap().set("age", 6).unwrap();
    adult.save(&t.db).await.unwrap();

    // No age, no view.
    let mut unknown = t.db.new_model("cat").unwrap();
    unknown.set("name", "Stray").unwrap();
    unknown.save(&t.db).await.unwrap();
    assert_empty!(unknown.views());

    assert_eq!(t.db.view("cat", "kitten").await.unwrap().ids(), [1]);
    assert_eq!(t.db.view("cat", "adult").await.unwrap().ids(), [2]);

    kitten.set("age", 2).unwrap();
    kitten.save(&t.db).await.unwrap();
    assert_eq!(kitten.views(), ["adult"]);

    assert_empty!(t.db.view("cat", "kitten").await.unwrap().ids());
    assert_eq!(t.db.view("cat", "adult").await.unwrap().ids(), [1, 2]);

    adult.remove(&t.db).await.unwrap();
    assert_eq!(t.db.view("cat", "adult").await.unwrap().ids(), [1]);
}

#[tokio::test]
async fn undeclared_view() {
    let t = Test::new([models::cat()]).await;

    let err = assert_err!(t.db.view("cat", "senior").await);
    assert!(err.is_invalid_argument());
    assert_eq!(
        err.to_string(),
        "invalid argument: model `cat` has no view `senior`"
    );
}

#[tokio::test]
async fn views_scoped_to_a_parent() {
    let t = Test::new([models::person(), models::owned_cat()]).await;

    let mut ann = t.db.new_model("person").unwrap();
    ann.set("name", "Ann").unwrap();
    for (name, age) in [("Tom", 1), ("Tinkerbell", 6)] {
        let mut cat = t.db.new_model("cat").unwrap();
        cat.set("name", name).unwrap().set("age", age).unwrap();
        ann.add_association("cats", cat).unwrap();
    }
    ann.save(&t.db).await.unwrap();

    let mut bob = t.db.new_model("person").unwrap();
    bob.set("name", "Bob").unwrap();
    let mut cat = t.db.new_model("cat").unwrap();
    cat.set("name", "Felix").unwrap().set("age", 1).unwrap();
    bob.add_association("cats", cat).unwrap();
    bob.save(&t.db).await.unwrap();

    let kittens = t.db.view_associated(&ann, "cats", "kitten").await.unwrap();
    assert_eq!(kittens.ids(), [1]);

    let kittens = t.db.view_associated(&bob, "cats", "kitten").await.unwrap();
    assert_eq!(kittens.ids(), [3]);

    assert_eq!(t.db.view("cat", "kitten").await.unwrap().ids(), [1, 3]);
}
