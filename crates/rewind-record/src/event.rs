//! Event model
//!
//! Everything the recorder emits is an [`Event`]: a monotonic sequence
//! number, a timestamp from the host clock, and one tagged payload. The
//! model is serde-serializable so a sink can ship it as JSON unchanged.

use serde::Serialize;

use crate::registry::MirrorId;

/// One emitted event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub seq: u64,
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub data: EventData,
}

/// Event payload variants
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    /// Capture context; always immediately precedes a full snapshot
    Meta(MetaData),
    /// Complete serialized tree state
    FullSnapshot(FullSnapshotData),
    /// One coalesced batch of changes since the previous event
    IncrementalSnapshot(IncrementalData),
    /// Externally injected payload
    Custom(CustomData),
}

impl EventData {
    pub fn is_full_snapshot(&self) -> bool {
        matches!(self, EventData::FullSnapshot(_))
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, EventData::Meta(_))
    }
}

/// Capture context recorded ahead of each full snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaData {
    pub href: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullSnapshotData {
    pub node: SerializedNode,
}

/// Incremental payload, tagged by change source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum IncrementalData {
    Mutation { records: Vec<MutationEntry> },
    StyleRule(StyleRuleDelta),
    ViewportResize { width: u32, height: u32 },
}

/// One structural, textual or attribute change, mirror-id addressed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationEntry {
    Addition {
        parent: MirrorId,
        index: u32,
        node: SerializedNode,
    },
    Removal {
        id: MirrorId,
    },
    TextChange {
        id: MirrorId,
        value: String,
    },
    AttributeChange {
        id: MirrorId,
        name: String,
        /// None = attribute removed
        value: Option<String>,
    },
}

/// Net style-rule operations for one container in one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleRuleDelta {
    /// Mirror id of the element owning the mutated sheet
    pub container: MirrorId,
    /// Surviving insertions, ascending, in post-tick coordinates
    pub adds: Vec<RuleAdd>,
    /// Removed pre-existing rules, descending, in pre-tick coordinates
    pub removes: Vec<RuleRemove>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAdd {
    pub index: u32,
    pub path: Vec<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRemove {
    pub index: u32,
    pub path: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomData {
    pub tag: String,
    pub payload: serde_json::Value,
}

/// Registry-annotated structural description of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedNode {
    pub id: MirrorId,
    #[serde(flatten)]
    pub kind: SerializedKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedKind {
    Document {
        url: String,
    },
    Doctype {
        name: String,
    },
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        /// Serialized rules when the element owns a stylesheet
        #[serde(skip_serializing_if = "Option::is_none")]
        sheet: Option<Vec<SerializedRule>>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    /// Node kind the serializer cannot express
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedRule {
    Style { text: String },
    Group { prelude: String, rules: Vec<SerializedRule> },
}

impl SerializedNode {
    /// Depth-first search for a node by id (test and debugging helper)
    pub fn find(&self, id: MirrorId) -> Option<&SerializedNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Total number of nodes in this serialized tree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_tagged() {
        let event = Event {
            seq: 3,
            timestamp_ms: 120,
            data: EventData::Meta(MetaData {
                href: "https://example.test/".to_string(),
                width: 800,
                height: 600,
            }),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "meta");
        assert_eq!(json["seq"], 3);
        assert_eq!(json["width"], 800);
    }

    #[test]
    fn test_incremental_source_tag() {
        let data = IncrementalData::Mutation {
            records: vec![MutationEntry::Removal { id: MirrorId(7) }],
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["source"], "mutation");
        assert_eq!(json["records"][0]["op"], "removal");
        assert_eq!(json["records"][0]["id"], 7);
    }

    #[test]
    fn test_serialized_node_find_and_count() {
        let tree = SerializedNode {
            id: MirrorId(0),
            kind: SerializedKind::Document {
                url: "about:blank".to_string(),
            },
            children: vec![SerializedNode {
                id: MirrorId(1),
                kind: SerializedKind::Text {
                    text: "x".to_string(),
                },
                children: Vec::new(),
            }],
        };
        assert_eq!(tree.node_count(), 2);
        assert!(tree.find(MirrorId(1)).is_some());
        assert!(tree.find(MirrorId(9)).is_none());
    }
}
