use super::layout::DocumentLayout;
use super::source::{RawTransaction, tags};

/// Transport class of a raw transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolClass {
    Http,
    /// Any other transport, carrying the declared tag
    Other(String),
}

/// Declared protocol labels treated as HTTP, compared case-insensitively
const HTTP_PROTOCOLS: [&str; 3] = ["http", "https", "http/s"];

/// Decide whether a transaction is HTTP(S).
///
/// The declared protocol wins; without one, a method or path on the request is taken
/// as evidence of HTTP.
pub fn classify(raw: &RawTransaction<'_>, layout: &DocumentLayout) -> ProtocolClass {
    let request = raw.node.child(tags::REQUEST);

    let declared = request
        .and_then(|rq| layout.meta_text(rq, "protocol"))
        .or_else(|| layout.meta_text(raw.node, "protocol"));

    if let Some(protocol) = declared {
        return if HTTP_PROTOCOLS
            .iter()
            .any(|known| protocol.eq_ignore_ascii_case(known))
        {
            ProtocolClass::Http
        } else {
            ProtocolClass::Other(protocol)
        };
    }

    let container = request.unwrap_or(raw.node);
    let has_http_shape = ["method", "path", "endpoint"]
        .iter()
        .any(|key| layout.meta_text(container, key).is_some());

    if has_http_shape {
        ProtocolClass::Http
    } else {
        ProtocolClass::Other("unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{SourceDocument, detect_layout};

    fn classify_all(xml: &str) -> Vec<ProtocolClass> {
        let doc = SourceDocument::parse(xml).unwrap();
        let layout = detect_layout(&doc);
        doc.transactions().map(|raw| classify(&raw, &layout)).collect()
    }

    #[test]
    fn test_declared_protocols() {
        let classes = classify_all(
            r#"<serviceImage><transactions>
  <t id="a"><rq><m><protocol>HTTPS</protocol></m></rq></t>
  <t id="b"><rq><m><protocol>mq</protocol><method>GET</method></m></rq></t>
  <t id="c"><rq><ag><p n="protocol">http</p></ag></rq></t>
  <t id="d"><rq><m><protocol>HTTP/S</protocol></m></rq></t>
  <t id="e"><m><protocol>http/s</protocol></m><rq/></t>
</transactions></serviceImage>"#,
        );
        assert_eq!(
            classes,
            vec![
                ProtocolClass::Http,
                ProtocolClass::Other("mq".to_string()),
                ProtocolClass::Http,
                ProtocolClass::Http,
                ProtocolClass::Http
            ]
        );
    }

    #[test]
    fn test_absent_protocol_uses_request_shape() {
        let classes = classify_all(
            r#"<serviceImage><transactions>
  <t id="a"><rq><m><path>/users</path></m></rq></t>
  <t id="b"><rq><m/></rq></t>
</transactions></serviceImage>"#,
        );
        assert_eq!(
            classes,
            vec![ProtocolClass::Http, ProtocolClass::Other("unknown".to_string())]
        );
    }
}
