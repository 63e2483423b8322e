//! Multipart session state and the completion manifest.

use std::collections::BTreeMap;

/// One `(part number, ETag)` entry of a completion manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPartEntry {
    pub part_number: u32,
    pub etag: String,
}

/// Parts submitted to finalize a multipart upload, ascending by part number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionManifest {
    parts: Vec<CompletedPartEntry>,
}

impl CompletionManifest {
    /// Build a manifest from entries in any order.
    pub fn from_parts(parts: impl IntoIterator<Item = CompletedPartEntry>) -> Self {
        let mut parts: Vec<CompletedPartEntry> = parts.into_iter().collect();
        parts.sort_by_key(|p: &CompletedPartEntry| p.part_number);
        Self { parts }
    }

    /// Entries in ascending part number order.
    pub fn parts(&self) -> &[CompletedPartEntry] {
        &self.parts
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the manifest has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Render the `CompleteMultipartUpload` XML document.
    pub fn to_xml(&self) -> String {
        let mut xml: String = String::from("<CompleteMultipartUpload>");
        for part in &self.parts {
            xml.push_str(&format!(
                "<Part><PartNumber>{}</PartNumber><ETag>{}</ETag></Part>",
                part.part_number,
                escape_xml(&part.etag)
            ));
        }
        xml.push_str("</CompleteMultipartUpload>");
        xml
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// State of one in-progress multipart upload.
///
/// Parts are recorded as they finish, in any order. The session turns into a
/// manifest only when every part `1..=total_parts` has a non-empty ETag.
#[derive(Debug, Clone)]
pub struct MultipartSession {
    upload_id: String,
    part_size: u64,
    total_parts: u32,
    parts: BTreeMap<u32, String>,
}

impl MultipartSession {
    /// Start tracking a session.
    ///
    /// # Arguments
    /// * `upload_id` - Session identifier returned by the store
    /// * `part_size` - Size of every part but the last
    /// * `total_parts` - Number of parts the file was split into
    pub fn new(upload_id: impl Into<String>, part_size: u64, total_parts: u32) -> Self {
        Self {
            upload_id: upload_id.into(),
            part_size,
            total_parts,
            parts: BTreeMap::new(),
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    pub fn total_parts(&self) -> u32 {
        self.total_parts
    }

    /// Record the ETag for a part.
    ///
    /// # Returns
    /// `false` if the part number is out of range or the ETag is empty, in
    /// which case nothing is recorded.
    pub fn record_part(&mut self, part_number: u32, etag: impl Into<String>) -> bool {
        let etag: String = etag.into();
        if part_number == 0 || part_number > self.total_parts || etag.is_empty() {
            return false;
        }
        self.parts.insert(part_number, etag);
        true
    }

    /// Number of parts with a recorded ETag.
    pub fn recorded_parts(&self) -> usize {
        self.parts.len()
    }

    /// Part numbers without a recorded ETag, ascending.
    pub fn missing_parts(&self) -> Vec<u32> {
        (1..=self.total_parts)
            .filter(|n: &u32| !self.parts.contains_key(n))
            .collect()
    }

    /// Whether every part has an ETag.
    pub fn is_complete(&self) -> bool {
        self.parts.len() == self.total_parts as usize
    }

    /// Consume the session into its completion manifest.
    ///
    /// # Errors
    /// Returns the missing part numbers if the session is incomplete.
    pub fn into_manifest(self) -> Result<CompletionManifest, Vec<u32>> {
        if !self.is_complete() {
            return Err(self.missing_parts());
        }
        Ok(CompletionManifest::from_parts(self.parts.into_iter().map(
            |(part_number, etag): (u32, String)| CompletedPartEntry { part_number, etag },
        )))
    }
}
