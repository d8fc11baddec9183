use biggie::{Associated, Model, Query, Range, SaveOutcome, Value};
use pretty_assertions::assert_eq;
use std_util::prelude::*;
use tests::{models, Test};

fn cat(t: &Test, name: &str, age: i64) -> Model {
    let mut cat = t.db.new_model("cat").unwrap();
    cat.set("name", name).unwrap().set("age", age).unwrap();
    cat
}

/// Ann (person 1) owning Tinkerbell (cat 1, a kitten) and Tom (cat 2).
async fn ann_and_her_cats() -> (Test, Model) {
    let t = Test::new([models::person(), models::owned_cat()]).await;

    let mut ann = t.db.new_model("person").unwrap();
    ann.set("name", "Ann").unwrap();
    ann.add_association("cats", cat(&t, "Tinkerbell", 1)).unwrap();
    ann.add_association("cats", cat(&t, "Tom", 5)).unwrap();
    assert_eq!(SaveOutcome::Saved, ann.save(&t.db).await.unwrap());

    (t, ann)
}

#[tokio::test]
async fn has_many_children_save_after_the_parent() {
    let (t, ann) = ann_and_her_cats().await;

    // Parent validation and both parent stages, then the same for the
    // children. Neither model type has a unique property to probe.
    assert_eq!(t.log.len(), 4);

    assert_eq!(ann.id(), Some(1));
    let cats = assert_some!(ann.association("cats").and_then(Associated::as_many));
    assert_eq!(cats.ids(), [1, 2]);
    assert!(cats.iter().all(|cat| cat.get("person_id") == Some(&Value::I64(1))));
    assert!(!ann.is_changed());

    assert_eq!(t.field("cat:1", "person_id").as_deref(), Some("1"));
    assert_eq!(t.store.members("assoc:person:1:cat"), [1, 2]);
    assert_eq!(t.store.members("view:person:1:cat:kitten"), [1]);
    assert_eq!(t.store.members("index:person:1:cat:name:Tom"), [2]);
    assert_eq!(t.store.members("index:person:1:cat:age"), [1, 2]);
}

#[tokio::test]
async fn reading_associations_back() {
    let (t, ann) = ann_and_her_cats().await;

    let cats = t.db.get_association(&ann, "cats").await.unwrap().into_many();
    assert_eq!(cats.ids(), [1, 2]);

    let toms = t
        .db
        .find_associated(&ann, "cats", Query::new().eq("name", "Tom"))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(toms.ids(), [2]);

    let older = t
        .db
        .find_associated(&ann, "cats", Query::new().range("age", Range::new().gt(2)))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(older.ids(), [2]);

    let tom = t.db.get("cat", 2).await.unwrap();
    let owner = t.db.get_association(&tom, "person").await.unwrap();
    let owner = assert_some!(owner.into_one());
    assert_eq!(owner.id(), Some(1));
    assert_eq!(owner.get("name"), Some(&Value::from("Ann")));
}

#[tokio::test]
async fn child_changes_are_mirrored_under_the_parent() {
    let (t, ann) = ann_and_her_cats().await;

    let mut tinkerbell = t.db.get("cat", 1).await.unwrap();
    tinkerbell.set("age", 4).unwrap().set("name", "Tink").unwrap();
    tinkerbell.save(&t.db).await.unwrap();

    assert_empty!(t.store.members("view:person:1:cat:kitten"));
    assert_eq!(t.store.members("view:person:1:cat:adult"), [1, 2]);
    assert_empty!(t.store.members("index:person:1:cat:name:Tinkerbell"));
    assert_eq!(t.store.members("index:person:1:cat:name:Tink"), [1]);

    let older = t
        .db
        .find_associated(&ann, "cats", Query::new().range("age", Range::new().gt(3)))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(older.ids(), [1, 2]);
}

#[tokio::test]
async fn moving_a_child_to_another_parent() {
    let (t, ann) = ann_and_her_cats().await;

    let mut bob = t.db.new_model("person").unwrap();
    bob.set("name", "Bob").unwrap();
    bob.save(&t.db).await.unwrap();

    let mut tinkerbell = t.db.get("cat", 1).await.unwrap();
    tinkerbell.set_association("person", &bob).unwrap();
    tinkerbell.save(&t.db).await.unwrap();

    assert_eq!(t.store.members("assoc:person:1:cat"), [2]);
    assert_eq!(t.store.members("assoc:person:2:cat"), [1]);
    assert_empty!(t.store.members("view:person:1:cat:kitten"));
    assert_eq!(t.store.members("view:person:2:cat:kitten"), [1]);
    assert_empty!(t.store.members("index:person:1:cat:name:Tinkerbell"));
    assert_eq!(t.store.members("index:person:2:cat:name:Tinkerbell"), [1]);
    assert_eq!(t.store.members("index:person:1:cat:age"), [2]);

    let cats = t.db.get_association(&ann, "cats").await.unwrap().into_many();
    assert_eq!(cats.ids(), [2]);
}

#[tokio::test]
async fn removing_a_parent_cascades() {
    let (t, mut ann) = ann_and_her_cats().await;

    ann.remove(&t.db).await.unwrap();

    assert_eq!(t.store.keys(), ["id:cat", "id:person"]);
    assert_eq!(0, t.db.count("cat").await.unwrap());
    assert_empty!(t.db.view("cat", "kitten").await.unwrap());
}

#[tokio::test]
async fn removing_a_child_detaches_it() {
    let (t, ann) = ann_and_her_cats().await;

    let mut tom = t.db.get("cat", 2).await.unwrap();
    tom.remove(&t.db).await.unwrap();

    assert_eq!(t.store.members("assoc:person:1:cat"), [1]);
    assert_empty!(t.store.members("index:person:1:cat:name:Tom"));
    assert_eq!(t.store.members("index:person:1:cat:age"), [1]);

    let cats = t.db.get_association(&ann, "cats").await.unwrap().into_many();
    assert_eq!(cats.ids(), [1]);
}

#[tokio::test]
async fn rejected_children_stay_pending() {
    let t = Test::new([models::person(), models::owned_cat()]).await;

    let mut nameless = t.db.new_model("cat").unwrap();
    nameless.set("age", 2).unwrap();

    let mut ann = t.db.new_model("person").unwrap();
    ann.set("name", "Ann").unwrap();
    ann.add_association("cats", nameless).unwrap();
    assert_eq!(SaveOutcome::Saved, ann.save(&t.db).await.unwrap());

    assert_eq!(ann.id(), Some(1));
    assert!(ann.is_changed());
    assert_eq!(ann.changes().associations().collect::<Vec<_>>(), ["cats"]);
    assert_none!(ann.association("cats"));
    assert_eq!(0, t.db.count("cat").await.unwrap());
}

#[tokio::test]
async fn association_misuse() {
    let (t, mut ann) = ann_and_her_cats().await;

    let err = assert_err!(ann.add_association("dogs", cat(&t, "Rex", 3)));
    assert!(err.is_invalid_argument());

    let bob = t.db.new_model("person").unwrap();
    let err = assert_err!(ann.add_association("cats", bob));
    assert!(err.is_invalid_argument());

    let mut stray = cat(&t, "Stray", 2);
    let err = assert_err!(stray.add_association("person", ann.clone()));
    assert!(err.is_invalid_argument());

    let unsaved = t.db.new_model("person").unwrap();
    let err = assert_err!(stray.set_association("person", &unsaved));
    assert!(err.is_invalid_argument());

    let err = assert_err!(t.db.find_associated(&unsaved, "cats", Query::new()));
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn has_one_child_and_parent_point_at_each_other() {
    let t = Test::new([models::passport_holder(), models::passport()]).await;

    let mut passport = t.db.new_model("passport").unwrap();
    passport.set("number", "X-1").unwrap();

    let mut ann = t.db.new_model("person").unwrap();
    ann.set("name", "Ann").unwrap();
    ann.add_association("passport", passport).unwrap();
    ann.save(&t.db).await.unwrap();

    assert_eq!(ann.get("passport_id"), Some(&Value::I64(1)));
    assert!(!ann.is_changed());
    let held = assert_some!(ann.association("passport").and_then(Associated::as_one));
    assert_eq!(held.id(), Some(1));

    assert_eq!(t.field("person:1", "passport_id").as_deref(), Some("1"));
    assert_eq!(t.field("passport:1", "person_id").as_deref(), Some("1"));

    let loaded = t.db.get("person", 1).await.unwrap();
    let passport = assert_some!(t.db.get_association(&loaded, "passport").await.unwrap().into_one());
    assert_eq!(passport.get("number"), Some(&Value::from("X-1")));

    let holder = assert_some!(t.db.get_association(&passport, "person").await.unwrap().into_one());
    assert_eq!(holder.id(), Some(1));
}

#[tokio::test]
async fn has_one_relink_and_removal() {
    let t = Test::new([models::passport_holder(), models::passport()]).await;

    let mut ann = t.db.new_model("person").unwrap();
    ann.set("name", "Ann").unwrap();
    ann.save(&t.db).await.unwrap();

    let mut passport = t.db.new_model("passport").unwrap();
    passport.set("number", "X-2").unwrap();
    passport.save(&t.db).await.unwrap();

    ann.set_association("passport", &passport).unwrap();
    ann.save(&t.db).await.unwrap();

    assert_eq!(t.field("person:1", "passport_id").as_deref(), Some("1"));
    assert_eq!(t.field("passport:1", "person_id").as_deref(), Some("1"));

    let mut passport = t.db.get("passport", 1).await.unwrap();
    passport.remove(&t.db).await.unwrap();

    assert_none!(t.field("person:1", "passport_id"));
    assert_eq!(t.field("person:1", "name").as_deref(), Some("Ann"));
}

#[tokio::test]
async fn moving_a_has_one_child_to_another_parent() {
    let t = Test::new([models::passport_holder(), models::passport()]).await;

    let mut ann = t.db.new_model("person").unwrap();
    ann.set("name", "Ann").unwrap();
    let mut passport = t.db.new_model("passport").unwrap();
    passport.set("number", "X-3").unwrap();
    ann.add_association("passport", passport).unwrap();
    ann.save(&t.db).await.unwrap();

    let mut bob = t.db.new_model("person").unwrap();
    bob.set("name", "Bob").unwrap();
    bob.save(&t.db).await.unwrap();

    let mut passport = t.db.get("passport", 1).await.unwrap();
    passport.set_association("person", &bob).unwrap();
    passport.save(&t.db).await.unwrap();

    assert_none!(t.field("person:1", "passport_id"));
    assert_eq!(t.field("person:2", "passport_id").as_deref(), Some("1"));
    assert_eq!(t.field("passport:1", "person_id").as_deref(), Some("2"));
}

/// Article 1 tagged with "rust" (tag 1, score 5) and "db" (tag 2, score 1).
async fn tagged_article() -> (Test, Model, Model, Model) {
    let t = Test::new([models::article(), models::tag()]).await;

    let mut rust = t.db.new_model("tag").unwrap();
    rust.set("label", "rust").unwrap().set("score", 5).unwrap();
    rust.save(&t.db).await.unwrap();

    let mut db = t.db.new_model("tag").unwrap();
    db.set("label", "db").unwrap().set("score", 1).unwrap();
    db.save(&t.db).await.unwrap();

    let mut article = t.db.new_model("article").unwrap();
    article.set("title", "Hello").unwrap();
    article.save(&t.db).await.unwrap();

    article.set_association("tag", &rust).unwrap();
    article.set_association("tag", &db).unwrap();
    assert!(article.is_changed());
    assert_eq!(SaveOutcome::Saved, article.save(&t.db).await.unwrap());
    assert!(!article.is_changed());

    (t, article, rust, db)
}

#[tokio::test]
async fn many_to_many_links_both_directions() {
    let (t, article, rust, _db) = tagged_article().await;

    assert_eq!(t.store.members("assoc:article:1:tag"), [1, 2]);
    assert_eq!(t.store.members("assoc:tag:1:article"), [1]);
    assert_eq!(t.store.members("assoc:tag:2:article"), [1]);
    assert_eq!(t.store.members("index:article:1:tag:label:rust"), [1]);

    let high = t
        .db
        .find_associated(&article, "tag", Query::new().range("score", Range::new().gt(2)))
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(high.ids(), [1]);

    let articles = t.db.get_association(&rust, "article").await.unwrap().into_many();
    assert_eq!(articles.ids(), [1]);
}

#[tokio::test]
async fn many_to_many_through_a_new_child() {
    let t = Test::new([models::article(), models::tag()]).await;

    let mut tag = t.db.new_model("tag").unwrap();
    tag.set("label", "web").unwrap().set("score", 9).unwrap();

    let mut article = t.db.new_model("article").unwrap();
    article.set("title", "Hello").unwrap();
    article.add_association("tag", tag).unwrap();
    article.save(&t.db).await.unwrap();

    assert_eq!(t.store.members("assoc:article:1:tag"), [1]);
    assert_eq!(t.store.members("assoc:tag:1:article"), [1]);
    assert_eq!(t.store.members("index:article:1:tag:score"), [1]);

    let tags = assert_some!(article.association("tag").and_then(Associated::as_many));
    assert_eq!(tags.ids(), [1]);
}

#[tokio::test]
async fn removing_a_partner_unlinks_without_cascading() {
    let (t, article, mut rust, _db) = tagged_article().await;

    rust.remove(&t.db).await.unwrap();

    assert_eq!(t.store.members("assoc:article:1:tag"), [2]);
    assert_eq!(t.store.members("index:article:1:tag:score"), [2]);
    assert_empty!(t.store.members("index:article:1:tag:label:rust"));
    assert_empty!(t.keys_like("assoc:tag:1:"));

    let article = t.db.get("article", article.id().unwrap()).await.unwrap();
    assert_eq!(article.get("title"), Some(&Value::from("Hello")));

    let tags = t.db.get_association(&article, "tag").await.unwrap().into_many();
    assert_eq!(tags.ids(), [2]);
}

#[tokio::test]
async fn removing_an_owner_of_links() {
    let (t, mut article, _rust, _db) = tagged_article().await;

    article.remove(&t.db).await.unwrap();

    assert_empty!(t.keys_like("assoc:"));
    assert_empty!(t.keys_like("index:article:"));
    assert_empty!(t.keys_like("index:tag:1:"));
    assert_eq!(2, t.db.count("tag").await.unwrap());
}

#[tokio::test]
async fn removing_a_root_cascades_through_the_tree() {
    let t = Test::new([models::node()]).await;

    let mut leaf = t.db.new_model("node").unwrap();
    leaf.set("label", "leaf").unwrap();
    let mut branch = t.db.new_model("node").unwrap();
    branch.set("label", "branch").unwrap();
    branch.add_association("nodes", leaf).unwrap();
    let mut root = t.db.new_model("node").unwrap();
    root.set("label", "root").unwrap();
    root.add_association("nodes", branch).unwrap();
    root.save(&t.db).await.unwrap();

    assert_eq!(3, t.db.count("node").await.unwrap());
    assert_eq!(t.store.members("assoc:node:1:node"), [2]);
    assert_eq!(t.store.members("assoc:node:2:node"), [3]);

    root.remove(&t.db).await.unwrap();

    assert_eq!(t.store.keys(), ["id:node"]);
}

#[tokio::test]
async fn a_node_parenting_itself_is_removed_once() {
    let t = Test::new([models::node()]).await;

    let mut node = t.db.new_model("node").unwrap();
    node.set("label", "loop").unwrap();
    node.save(&t.db).await.unwrap();

    let me = node.clone();
    node.set_association("node", &me).unwrap();
    node.save(&t.db).await.unwrap();
    assert_eq!(t.store.members("assoc:node:1:node"), [1]);

    node.remove(&t.db).await.unwrap();

    assert!(node.is_removed());
    assert_eq!(t.store.keys(), ["id:node"]);
}
