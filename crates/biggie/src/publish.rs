use serde::Serialize;

/// Receives change notifications after successful saves.
///
/// Delivery to subscribers is the implementor's concern; the engine only
/// hands over the envelope.
pub trait Publisher: Send + Sync + 'static {
    fn publish(&self, channel: &str, envelope: &Envelope);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    New,
    Change,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub data: serde_json::Value,
    pub channel: String,
}

impl Envelope {
    /// `type` for inserts, `type/id` for updates.
    pub(crate) fn channel(kind: EnvelopeKind, ty: &str, id: u64) -> String {
        match kind {
            EnvelopeKind::New => ty.to_string(),
            EnvelopeKind::Change => format!("{ty}/{id}"),
        }
    }
}
