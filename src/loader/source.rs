use std::fs;
use std::path::Path;

use super::xml::{XmlElement, parse_document};
use crate::error::{Result, Vsi2wmError};

/// Element names used by service image documents
pub mod tags {
    pub const TRANSACTION_LIST: &str = "transactions";
    pub const TRANSACTION: &str = "t";
    pub const REQUEST: &str = "rq";
    pub const RESPONSES: &str = "rs";
    pub const RESPONSE: &str = "rp";
    pub const BODY: &str = "bd";
    pub const META: &str = "m";
    pub const PROPERTY_BLOCK: &str = "ag";
    pub const PROPERTY: &str = "p";
    pub const REQUEST_DATA: &str = "reqData";
    pub const RESPONSE_DATA: &str = "rspData";
}

/// Parsed service image, read-only for one run
#[derive(Debug, Clone)]
pub struct SourceDocument {
    root: XmlElement,
    pub source_version: Option<String>,
    pub build_number: Option<String>,
}

/// One `t` node, with its position among the document's transactions
#[derive(Debug, Clone, Copy)]
pub struct RawTransaction<'a> {
    pub index: usize,
    pub node: &'a XmlElement,
}

impl<'a> RawTransaction<'a> {
    /// Identifier declared on the node, or a positional fallback
    pub fn id(&self) -> String {
        self.node
            .attr("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("transaction_{}", self.index))
    }

    pub fn has_declared_id(&self) -> bool {
        self.node.attr("id").is_some_and(|id| !id.trim().is_empty())
    }
}

impl SourceDocument {
    pub fn parse(content: &str) -> Result<Self> {
        let root = parse_document(content)?;

        if transaction_list(&root).is_none() {
            return Err(Vsi2wmError::MissingTransactionList);
        }

        let source_version = root.attr("version").map(str::to_string);
        let build_number = root.attr("buildNumber").map(str::to_string);

        Ok(Self {
            root,
            source_version,
            build_number,
        })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Raw transactions, lazily and in document order
    pub fn transactions(&self) -> impl Iterator<Item = RawTransaction<'_>> {
        transaction_list(&self.root)
            .into_iter()
            .flat_map(|list| list.elements_named(tags::TRANSACTION))
            .enumerate()
            .map(|(index, node)| RawTransaction { index, node })
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions().count()
    }
}

/// The element holding the `t` nodes: a `transactions` element, or the root itself
/// when transactions sit directly under it
fn transaction_list(root: &XmlElement) -> Option<&XmlElement> {
    if root.name == tags::TRANSACTION_LIST {
        return Some(root);
    }
    if let Some(list) = root.find(tags::TRANSACTION_LIST) {
        return Some(list);
    }
    root.child(tags::TRANSACTION).map(|_| root)
}

/// Load a service image from a file
pub fn load_source<P: AsRef<Path>>(path: P) -> Result<SourceDocument> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        Vsi2wmError::SourceLoadError(format!("Failed to read file {}: {}", path.display(), e))
    })?;

    let document = SourceDocument::parse(&content)?;
    tracing::info!(
        path = %path.display(),
        transactions = document.transaction_count(),
        "Loaded source document"
    );

    Ok(document)
}
