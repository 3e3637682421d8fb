//! Style object model
//!
//! Rules are opaque text addressed by position; group rules (conditional
//! containers such as `@media`) nest arbitrarily and are addressed by an
//! index path from the sheet root. No CSS parsing happens here — the
//! observer only needs positions and rule text.

use crate::NodeId;

/// Style operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StyleError {
    #[error("element owns no stylesheet")]
    NoSheet,
    #[error("path component {component} out of bounds (len {len})")]
    PathOutOfBounds { component: u32, len: usize },
    #[error("rule at path component {component} is not a group rule")]
    NotAGroup { component: u32 },
    #[error("rule index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: u32, len: usize },
}

/// A CSS rule: opaque style text or a nested group container
#[derive(Debug, Clone)]
pub enum CssRule {
    /// A plain rule, e.g. `.box { color: red }`
    Style { text: String },
    /// A conditional group rule, e.g. `@media (max-width: 600px) { .. }`
    Group { prelude: String, rules: Vec<CssRule> },
}

impl CssRule {
    /// Check if this rule can contain nested rules
    pub fn is_group(&self) -> bool {
        matches!(self, CssRule::Group { .. })
    }

    /// Serialized rule text
    pub fn text(&self) -> String {
        match self {
            CssRule::Style { text } => text.clone(),
            CssRule::Group { prelude, rules } => {
                let inner: Vec<String> = rules.iter().map(|r| r.text()).collect();
                format!("{} {{ {} }}", prelude, inner.join(" "))
            }
        }
    }
}

/// A stylesheet owned by an element node
#[derive(Debug)]
pub struct StyleSheet {
    owner: NodeId,
    rules: Vec<CssRule>,
}

impl StyleSheet {
    pub(crate) fn new(owner: NodeId) -> Self {
        Self {
            owner,
            rules: Vec::new(),
        }
    }

    /// The element owning this sheet
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Top-level rules
    pub fn rules(&self) -> &[CssRule] {
        &self.rules
    }

    /// Insert a rule into the container addressed by `path`
    pub(crate) fn insert(
        &mut self,
        path: &[u32],
        index: u32,
        rule: CssRule,
    ) -> Result<(), StyleError> {
        let container = container_mut(&mut self.rules, path)?;
        if index as usize > container.len() {
            return Err(StyleError::IndexOutOfBounds {
                index,
                len: container.len(),
            });
        }
        container.insert(index as usize, rule);
        Ok(())
    }

    /// Delete the rule at `index` in the container addressed by `path`
    pub(crate) fn delete(&mut self, path: &[u32], index: u32) -> Result<CssRule, StyleError> {
        let container = container_mut(&mut self.rules, path)?;
        if index as usize >= container.len() {
            return Err(StyleError::IndexOutOfBounds {
                index,
                len: container.len(),
            });
        }
        Ok(container.remove(index as usize))
    }
}

fn container_mut<'a>(
    rules: &'a mut Vec<CssRule>,
    path: &[u32],
) -> Result<&'a mut Vec<CssRule>, StyleError> {
    let mut current = rules;
    for &component in path {
        let len = current.len();
        let slot = current
            .get_mut(component as usize)
            .ok_or(StyleError::PathOutOfBounds { component, len })?;
        current = match slot {
            CssRule::Group { rules, .. } => rules,
            CssRule::Style { .. } => return Err(StyleError::NotAGroup { component }),
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(text: &str) -> CssRule {
        CssRule::Style {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_insert_delete_top_level() {
        let mut sheet = StyleSheet::new(NodeId(0));
        sheet.insert(&[], 0, style("a { }")).unwrap();
        sheet.insert(&[], 1, style("b { }")).unwrap();
        sheet.insert(&[], 1, style("c { }")).unwrap();

        let texts: Vec<_> = sheet.rules().iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["a { }", "c { }", "b { }"]);

        sheet.delete(&[], 1).unwrap();
        assert_eq!(sheet.rules().len(), 2);
    }

    #[test]
    fn test_nested_addressing() {
        let mut sheet = StyleSheet::new(NodeId(0));
        sheet
            .insert(
                &[],
                0,
                CssRule::Group {
                    prelude: "@media (max-width: 600px)".to_string(),
                    rules: Vec::new(),
                },
            )
            .unwrap();
        sheet.insert(&[0], 0, style(".narrow { }")).unwrap();

        let text = sheet.rules()[0].text();
        assert_eq!(text, "@media (max-width: 600px) { .narrow { } }");

        let removed = sheet.delete(&[0], 0).unwrap();
        assert_eq!(removed.text(), ".narrow { }");
    }

    #[test]
    fn test_bad_addresses() {
        let mut sheet = StyleSheet::new(NodeId(0));
        sheet.insert(&[], 0, style("a { }")).unwrap();

        assert!(matches!(
            sheet.insert(&[0], 0, style("x { }")),
            Err(StyleError::NotAGroup { component: 0 })
        ));
        assert!(matches!(
            sheet.insert(&[3], 0, style("x { }")),
            Err(StyleError::PathOutOfBounds { .. })
        ));
        assert!(matches!(
            sheet.delete(&[], 5),
            Err(StyleError::IndexOutOfBounds { index: 5, .. })
        ));
    }
}
