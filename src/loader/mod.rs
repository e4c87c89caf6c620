pub mod layout;
pub mod protocol;
pub mod source;
pub mod xml;

pub use layout::{BodyLayout, DocumentLayout, MetaLayout, detect_layout};
pub use protocol::{ProtocolClass, classify};
pub use source::{RawTransaction, SourceDocument, load_source};
pub use xml::{XmlElement, is_well_formed};
