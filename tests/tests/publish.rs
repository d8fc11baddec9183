use biggie::{Db, Envelope, EnvelopeKind, Publisher, Value};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tests::{models, Test};

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(String, Envelope)>>,
}

impl Recorder {
    fn take(&self) -> Vec<(String, Envelope)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl Publisher for Recorder {
    fn publish(&self, channel: &str, envelope: &Envelope) {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), envelope.clone()));
    }
}

async fn setup() -> (Test, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let mut builder = Db::builder();
    builder.register(models::cat()).publisher(recorder.clone());
    (Test::with_builder(builder).await, recorder)
}

#[tokio::test]
async fn inserts_and_updates_are_published() {
    let (t, recorder) = setup().await;

    let mut cat = t.db.new_model("cat").unwrap();
    cat.set("name", "Tinkerbell").unwrap().set("age", 5).unwrap();
    cat.save(&t.db).await.unwrap();

    let sent = recorder.take();
    assert_eq!(sent.len(), 1);
    let (channel, envelope) = &sent[0];
    assert_eq!(channel, "cat");
    assert_eq!(envelope.kind, EnvelopeKind::New);
    assert_eq!(envelope.data, json!({ "id": 1, "name": "Tinkerbell", "age": 5 }));

    cat.set("age", 6).unwrap();
    cat.save(&t.db).await.unwrap();

    let sent = recorder.take();
    assert_eq!(sent.len(), 1);
    let (channel, envelope) = &sent[0];
    assert_eq!(channel, "cat/1");
    assert_eq!(
        serde_json::to_value(envelope).unwrap(),
        json!({
            "type": "change",
            "data": { "id": 1, "age": 6 },
            "channel": "cat/1",
        })
    );
}

#[tokio::test]
async fn cleared_attributes_are_published_as_null() {
    let (t, recorder) = setup().await;

    let mut cat = t.db.new_model("cat").unwrap();
    cat.set("name", "Tinkerbell").unwrap().set("color", "black").unwrap();
    cat.save(&t.db).await.unwrap();
    recorder.take();

    cat.set("color", Value::Null).unwrap();
    cat.save(&t.db).await.unwrap();

    let sent = recorder.take();
    assert_eq!(sent[0].1.data, json!({ "id": 1, "color": null }));
}

#[tokio::test]
async fn nothing_is_published_without_a_write() {
    let (t, recorder) = setup().await;

    let mut rejected = t.db.new_model("cat").unwrap();
    rejected.set("age", 1).unwrap();
    rejected.save(&t.db).await.unwrap();
    assert!(recorder.take().is_empty());

    let mut cat = t.db.new_model("cat").unwrap();
    cat.set("name", "Tom").unwrap();
    cat.save(&t.db).await.unwrap();
    recorder.take();

    cat.save(&t.db).await.unwrap();
    assert!(recorder.take().is_empty());
}
