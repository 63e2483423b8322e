//! Part planning for multipart uploads.
//!
//! Pure logic for the size-based upload decision and byte-range layout.
//! No I/O operations - just decision making.

/// A single part of a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartInfo {
    /// One-based part number.
    pub part_number: u32,
    /// Byte offset within the file.
    pub offset: u64,
    /// Length of this part in bytes.
    pub length: u64,
}

/// Determine if a file goes through the multipart protocol.
///
/// The threshold is inclusive: a file of exactly `threshold` bytes is multipart.
/// If `threshold` is 0, multipart is disabled.
pub fn needs_multipart(size: u64, threshold: u64) -> bool {
    threshold > 0 && size >= threshold
}

/// Split a file of `size` bytes into parts of `part_size` bytes.
///
/// Part `i` covers `[(i-1) * part_size, min(i * part_size, size))`.
/// The last part may be smaller than `part_size`.
///
/// # Arguments
/// * `size` - Total file size in bytes
/// * `part_size` - Size of each part
///
/// # Returns
/// Parts in ascending part number order. A zero `part_size` or `size`
/// yields a single part covering the whole file.
pub fn generate_parts(size: u64, part_size: u64) -> Vec<PartInfo> {
    if part_size == 0 || size == 0 {
        return vec![PartInfo {
            part_number: 1,
            offset: 0,
            length: size,
        }];
    }

    let mut parts: Vec<PartInfo> = Vec::with_capacity(expected_part_count(size, part_size));
    let mut offset: u64 = 0;
    let mut part_number: u32 = 1;

    while offset < size {
        let length: u64 = std::cmp::min(part_size, size - offset);
        parts.push(PartInfo {
            part_number,
            offset,
            length,
        });
        offset += length;
        part_number += 1;
    }

    parts
}

/// Calculate the expected number of parts: `ceil(size / part_size)`.
pub fn expected_part_count(size: u64, part_size: u64) -> usize {
    if part_size == 0 || size == 0 {
        return 1;
    }
    size.div_ceil(part_size) as usize
}

/// Upload strategy based on file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One authenticated PUT of the whole body.
    SinglePut,
    /// Initiate, upload parts, commit.
    Multipart,
}

/// Determine upload strategy based on file size.
pub fn upload_strategy(size: u64, threshold: u64) -> UploadStrategy {
    if needs_multipart(size, threshold) {
        UploadStrategy::Multipart
    } else {
        UploadStrategy::SinglePut
    }
}
