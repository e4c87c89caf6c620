use std::collections::HashSet;

use crate::models::{BodySpec, ResponseBody, StubMapping};

const MAX_FILENAME_CHARS: usize = 100;
const UNSAFE_FILENAME_CHARS: &[char] = &['#', '/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// A response body written next to the mappings instead of inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Where a body came from; determines its file name
#[derive(Debug, Clone, Copy)]
pub struct BodyKey<'a> {
    pub transaction_id: &'a str,
    pub transaction_index: usize,
    pub variant_index: usize,
}

/// Replace characters that are unsafe in file names and cap the length
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// Moves response bodies over the inline limit into separate files
#[derive(Debug, Clone)]
pub struct BodyExternalizer {
    max_inline_bytes: usize,
    issued: HashSet<String>,
}

impl BodyExternalizer {
    pub fn new(max_inline_bytes: usize) -> Self {
        Self {
            max_inline_bytes,
            issued: HashSet::new(),
        }
    }

    /// Keep `body` inline when it fits, otherwise point the stub at a file holding it
    pub fn externalize(
        &mut self,
        mut stub: StubMapping,
        body: Option<&BodySpec>,
        key: BodyKey<'_>,
    ) -> (StubMapping, Option<BodyFile>) {
        let Some(body) = body else {
            return (stub, None);
        };
        if body.byte_len() <= self.max_inline_bytes {
            return (stub, None);
        }

        let file_name = self.file_name(body, key);
        stub.response.body = Some(ResponseBody::File(file_name.clone()));
        tracing::debug!(
            transaction = key.transaction_id,
            file = %file_name,
            bytes = body.byte_len(),
            "Externalized response body"
        );

        let file = BodyFile {
            file_name,
            content: body.content().as_bytes().to_vec(),
        };
        (stub, Some(file))
    }

    fn file_name(&mut self, body: &BodySpec, key: BodyKey<'_>) -> String {
        let stem = format!(
            "{}_{}_{}_body",
            sanitize_filename(key.transaction_id),
            key.transaction_index,
            key.variant_index
        );
        let extension = body.kind().extension();

        let mut name = format!("{}.{}", stem, extension);
        let mut suffix = 1;
        while !self.issued.insert(name.clone()) {
            name = format!("{}_{}.{}", stem, suffix, extension);
            suffix += 1;
        }
        name
    }
}
