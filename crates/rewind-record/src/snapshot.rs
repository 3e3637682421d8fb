//! Full-snapshot serializer
//!
//! Depth-first walk over a live document, registering every visited node
//! and emitting its structural description. Elements that own a
//! stylesheet get the rule forest serialized inline and are reported to
//! the caller so the style tracker can adopt them. Announced frame
//! content documents are serialized inline under their host elements,
//! keeping full snapshots self-contained. Node kinds the serializer
//! cannot express become opaque placeholders; the walk never fails.

use rewind_dom::{ContextId, CssRule, Document, NodeData, NodeId, Page};

use crate::event::{SerializedKind, SerializedNode, SerializedRule};
use crate::registry::{MirrorId, NodeRegistry};

/// An element owning a stylesheet, seen during serialization
#[derive(Debug, Clone, Copy)]
pub(crate) struct SheetOwner {
    pub container: MirrorId,
    pub ctx: ContextId,
    pub node: NodeId,
}

/// Serialize a whole document, registering every visited node
pub(crate) fn serialize_document(
    page: &Page,
    ctx: ContextId,
    registry: &mut NodeRegistry,
    owners: &mut Vec<SheetOwner>,
) -> Option<SerializedNode> {
    let doc = page.document(ctx)?;
    Some(walk(page, ctx, doc, doc.root(), registry, owners))
}

/// Serialize one subtree rooted at `node` (which may be detached)
pub(crate) fn serialize_subtree(
    page: &Page,
    ctx: ContextId,
    node: NodeId,
    registry: &mut NodeRegistry,
    owners: &mut Vec<SheetOwner>,
) -> Option<SerializedNode> {
    let doc = page.document(ctx)?;
    doc.tree().get(node)?;
    Some(walk(page, ctx, doc, node, registry, owners))
}

fn walk(
    page: &Page,
    ctx: ContextId,
    doc: &Document,
    node: NodeId,
    registry: &mut NodeRegistry,
    owners: &mut Vec<SheetOwner>,
) -> SerializedNode {
    let id = registry.assign(ctx, node);
    let kind = describe(doc, node, id, ctx, owners);

    let mut children: Vec<SerializedNode> = doc
        .tree()
        .children(node)
        .collect::<Vec<_>>()
        .into_iter()
        .map(|child| walk(page, ctx, doc, child, registry, owners))
        .collect();

    // An announced frame's content document rides along as the host
    // element's last child.
    if let Some(content) = page.frame_content(ctx, node)
        && let Some(content_doc) = serialize_document(page, content, registry, owners)
    {
        children.push(content_doc);
    }

    SerializedNode { id, kind, children }
}

fn describe(
    doc: &Document,
    node: NodeId,
    id: MirrorId,
    ctx: ContextId,
    owners: &mut Vec<SheetOwner>,
) -> SerializedKind {
    let Some(n) = doc.tree().get(node) else {
        // A vanished arena slot cannot happen mid-walk, but a capture
        // failure must never abort the snapshot.
        tracing::warn!(?id, "node failed to serialize, emitting placeholder");
        return SerializedKind::Placeholder;
    };
    match &n.data {
        NodeData::Document => SerializedKind::Document {
            url: doc.url().to_string(),
        },
        NodeData::Doctype { name } => SerializedKind::Doctype { name: name.clone() },
        NodeData::Element(elem) => {
            let sheet = doc.stylesheet(node).map(|s| {
                owners.push(SheetOwner {
                    container: id,
                    ctx,
                    node,
                });
                serialize_rules(s.rules())
            });
            SerializedKind::Element {
                tag: elem.tag.clone(),
                attributes: elem
                    .attrs
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect(),
                sheet,
            }
        }
        NodeData::Text(text) => SerializedKind::Text { text: text.clone() },
        NodeData::Comment(text) => SerializedKind::Comment { text: text.clone() },
        NodeData::ProcessingInstruction { .. } => SerializedKind::Placeholder,
    }
}

pub(crate) fn serialize_rules(rules: &[CssRule]) -> Vec<SerializedRule> {
    rules
        .iter()
        .map(|rule| match rule {
            CssRule::Style { text } => SerializedRule::Style { text: text.clone() },
            CssRule::Group { prelude, rules } => SerializedRule::Group {
                prelude: prelude.clone(),
                rules: serialize_rules(rules),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_dom::Page;

    #[test]
    fn test_walk_registers_every_node() {
        let mut page = Page::new("https://example.test/");
        let ctx = page.root_context();
        let doc = page.document_mut(ctx).unwrap();
        let root = doc.root();
        let div = doc.create_element("div");
        let text = doc.create_text("hi");
        doc.append_child(root, div).unwrap();
        doc.append_child(div, text).unwrap();

        let mut registry = NodeRegistry::new();
        let mut owners = Vec::new();
        let tree = serialize_document(&page, ctx, &mut registry, &mut owners).unwrap();

        assert_eq!(tree.node_count(), 3);
        assert_eq!(registry.len(), 3);
        assert!(owners.is_empty());
        let div_id = registry.lookup(ctx, div).unwrap();
        assert!(tree.find(div_id).is_some());
    }

    #[test]
    fn test_unsupported_kind_becomes_placeholder() {
        let mut page = Page::new("https://example.test/");
        let ctx = page.root_context();
        let doc = page.document_mut(ctx).unwrap();
        let root = doc.root();
        let pi = doc.create_processing_instruction("xml-stylesheet", "href=\"a.css\"");
        doc.append_child(root, pi).unwrap();

        let mut registry = NodeRegistry::new();
        let mut owners = Vec::new();
        let tree = serialize_document(&page, ctx, &mut registry, &mut owners).unwrap();

        assert!(matches!(
            tree.children[0].kind,
            SerializedKind::Placeholder
        ));
    }

    #[test]
    fn test_sheet_owner_reported() {
        let mut page = Page::new("https://example.test/");
        let ctx = page.root_context();
        let doc = page.document_mut(ctx).unwrap();
        let root = doc.root();
        let style = doc.create_element("style");
        doc.append_child(root, style).unwrap();
        doc.add_stylesheet(style).unwrap();
        doc.insert_rule(style, &[], 0, ".a { }").unwrap();

        let mut registry = NodeRegistry::new();
        let mut owners = Vec::new();
        let tree = serialize_document(&page, ctx, &mut registry, &mut owners).unwrap();

        assert_eq!(owners.len(), 1);
        let style_id = registry.lookup(ctx, style).unwrap();
        assert_eq!(owners[0].container, style_id);
        let node = tree.find(style_id).unwrap();
        assert!(matches!(
            &node.kind,
            SerializedKind::Element { sheet: Some(rules), .. } if rules.len() == 1
        ));
    }

    #[test]
    fn test_announced_frame_inlined() {
        let mut page = Page::new("https://example.test/");
        let ctx = page.root_context();
        let doc = page.document_mut(ctx).unwrap();
        let root = doc.root();
        let iframe = doc.create_element("iframe");
        doc.append_child(root, iframe).unwrap();
        let content = page
            .attach_frame_content(ctx, iframe, "https://inner.test/")
            .unwrap();
        // Not announced yet: host serializes without content.
        let mut registry = NodeRegistry::new();
        let mut owners = Vec::new();
        let before = serialize_document(&page, ctx, &mut registry, &mut owners).unwrap();
        assert_eq!(before.children[0].children.len(), 0);

        page.tick(0);
        let inner_doc = page.document_mut(content).unwrap();
        let inner_root = inner_doc.root();
        let p = inner_doc.create_element("p");
        inner_doc.append_child(inner_root, p).unwrap();

        let mut registry = NodeRegistry::new();
        let mut owners = Vec::new();
        let after = serialize_document(&page, ctx, &mut registry, &mut owners).unwrap();
        let host = &after.children[0];
        assert_eq!(host.children.len(), 1);
        assert!(matches!(host.children[0].kind, SerializedKind::Document { .. }));
        assert_eq!(host.children[0].children.len(), 1);
    }
}
