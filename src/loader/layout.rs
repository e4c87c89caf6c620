//! Structural layout of a service image.
//!
//! Exports differ in where bodies live (a `bd` under the request/response, or paired
//! `reqData`/`rspData` containers) and where metadata lives (inline `m` children, or a
//! centralized `ag` block of named `p` properties). The decision is made once for the
//! whole document and handed to every later stage.

use std::fmt;

use super::source::{SourceDocument, tags};
use super::xml::XmlElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLayout {
    InlineBody,
    PairedReqRsp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaLayout {
    CentralizedMeta,
    InlineMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLayout {
    pub body: BodyLayout,
    pub meta: MetaLayout,
    /// Some transactions use paired containers and others inline bodies
    pub mixed_body: bool,
    /// Some transactions use a property block and others inline metadata
    pub mixed_meta: bool,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self {
            body: BodyLayout::InlineBody,
            meta: MetaLayout::InlineMeta,
            mixed_body: false,
            mixed_meta: false,
        }
    }
}

impl fmt::Display for DocumentLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match self.body {
            BodyLayout::InlineBody => "inline bodies",
            BodyLayout::PairedReqRsp => "paired request/response data",
        };
        let meta = match self.meta {
            MetaLayout::CentralizedMeta => "centralized properties",
            MetaLayout::InlineMeta => "inline metadata",
        };
        write!(f, "{}, {}", body, meta)
    }
}

impl DocumentLayout {
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.mixed_body {
            warnings.push(format!(
                "Mixed body layouts detected; treating the whole document as {}",
                match self.body {
                    BodyLayout::InlineBody => "inline bodies",
                    BodyLayout::PairedReqRsp => "paired request/response data",
                }
            ));
        }
        if self.mixed_meta {
            warnings.push(format!(
                "Mixed metadata layouts detected; treating the whole document as {}",
                match self.meta {
                    MetaLayout::CentralizedMeta => "centralized properties",
                    MetaLayout::InlineMeta => "inline metadata",
                }
            ));
        }
        warnings
    }

    /// Metadata element `key` of `container`, looked up in the detected layout first
    pub fn meta<'a>(&self, container: &'a XmlElement, key: &str) -> Option<&'a XmlElement> {
        match self.meta {
            MetaLayout::CentralizedMeta => {
                property(container, key).or_else(|| inline_meta(container, key))
            }
            MetaLayout::InlineMeta => {
                inline_meta(container, key).or_else(|| property(container, key))
            }
        }
    }

    /// Trimmed text of metadata element `key`
    pub fn meta_text(&self, container: &XmlElement, key: &str) -> Option<String> {
        self.meta(container, key).and_then(XmlElement::trimmed_text)
    }
}

fn inline_meta<'a>(container: &'a XmlElement, key: &str) -> Option<&'a XmlElement> {
    container
        .child(tags::META)
        .and_then(|meta| meta.child(key))
        .or_else(|| container.child(key))
}

fn property<'a>(container: &'a XmlElement, key: &str) -> Option<&'a XmlElement> {
    container
        .elements_named(tags::PROPERTY_BLOCK)
        .flat_map(|block| block.elements_named(tags::PROPERTY))
        .find(|p| p.attr("n") == Some(key))
}

fn uses_paired_containers(transaction: &XmlElement) -> bool {
    transaction.has_descendant(tags::REQUEST_DATA)
        || transaction.has_descendant(tags::RESPONSE_DATA)
}

fn uses_inline_bodies(transaction: &XmlElement) -> bool {
    transaction.has_descendant(tags::BODY) && !uses_paired_containers(transaction)
}

fn uses_property_block(transaction: &XmlElement) -> bool {
    transaction
        .descendants()
        .into_iter()
        .any(|e| e.name == tags::PROPERTY_BLOCK && e.child(tags::PROPERTY).is_some())
}

fn uses_inline_meta(transaction: &XmlElement) -> bool {
    transaction.has_descendant(tags::META) && !uses_property_block(transaction)
}

/// Decide the layout of the whole document
pub fn detect_layout(document: &SourceDocument) -> DocumentLayout {
    let mut paired = 0usize;
    let mut inline_bodies = 0usize;
    let mut property_blocks = 0usize;
    let mut inline_meta = 0usize;

    for raw in document.transactions() {
        if uses_paired_containers(raw.node) {
            paired += 1;
        } else if uses_inline_bodies(raw.node) {
            inline_bodies += 1;
        }
        if uses_property_block(raw.node) {
            property_blocks += 1;
        } else if uses_inline_meta(raw.node) {
            inline_meta += 1;
        }
    }

    let layout = DocumentLayout {
        body: if paired > 0 {
            BodyLayout::PairedReqRsp
        } else {
            BodyLayout::InlineBody
        },
        meta: if property_blocks > 0 {
            MetaLayout::CentralizedMeta
        } else {
            MetaLayout::InlineMeta
        },
        mixed_body: paired > 0 && inline_bodies > 0,
        mixed_meta: property_blocks > 0 && inline_meta > 0,
    };

    tracing::debug!(
        paired,
        inline_bodies,
        property_blocks,
        inline_meta,
        "Layout detected: {}",
        layout
    );

    layout
}
