//! Range patches over document text
//!
//! A [`RangePatch`] replaces the half-open char range `[start, end)` of a
//! document with new text. Offsets count Unicode scalar values, never bytes,
//! so a patch can never split a multi-byte character.
//!
//! Bounds are checked before anything is built: `0 <= start <= end <= len`.
//! A violation is reported as [`MergeError::OutOfRange`]; offsets are never
//! clamped into range.

/// Replacement of a char range within a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePatch {
    start: usize,
    end: usize,
    replacement: String,
}

impl RangePatch {
    /// Create a patch. Both offsets are required.
    #[inline]
    #[must_use]
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    /// First replaced char
    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last replaced char
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Text inserted in place of the range
    #[inline]
    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Apply to `content`, producing the new document
    ///
    /// # Errors
    /// `MergeError::OutOfRange` if the range does not fit `content`
    pub fn apply(&self, content: &str) -> Result<String, MergeError> {
        merge(content, self.start, self.end, &self.replacement)
    }

    /// Char length the merged document must have
    ///
    /// Only meaningful once the range has been validated against
    /// `content_len`.
    #[inline]
    #[must_use]
    pub fn expected_len(&self, content_len: usize) -> usize {
        self.start + char_len(&self.replacement) + (content_len - self.end)
    }
}

/// Replace `content[start..end]` (char offsets) with `replacement`
///
/// Returns `content[..start] + replacement + content[end..]`. The input is
/// never modified; on error the caller still holds the untouched original.
///
/// # Errors
/// `MergeError::OutOfRange` unless `start <= end <= char_len(content)`
pub fn merge(
    content: &str,
    start: usize,
    end: usize,
    replacement: &str,
) -> Result<String, MergeError> {
    let len = char_len(content);
    check_range(start, end, len)?;

    // Both offsets are in range, so the lookups cannot miss.
    let start_byte = byte_offset(content, start).ok_or(MergeError::OutOfRange { start, end, len })?;
    let end_byte = byte_offset(content, end).ok_or(MergeError::OutOfRange { start, end, len })?;

    let mut merged =
        String::with_capacity(start_byte + replacement.len() + (content.len() - end_byte));
    merged.push_str(&content[..start_byte]);
    merged.push_str(replacement);
    merged.push_str(&content[end_byte..]);
    Ok(merged)
}

/// Validate `start <= end <= len`
///
/// # Errors
/// `MergeError::OutOfRange` on any violation
#[inline]
pub fn check_range(start: usize, end: usize, len: usize) -> Result<(), MergeError> {
    if start > end || end > len {
        return Err(MergeError::OutOfRange { start, end, len });
    }
    Ok(())
}

/// Document length in chars
#[inline]
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `char_idx`-th char; `char_idx == len` maps to the end
#[must_use]
pub fn byte_offset(text: &str, char_idx: usize) -> Option<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(char_idx)
}

/// Slice `text[start..end]` by char offsets
#[must_use]
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let from = byte_offset(text, start)?;
    let to = byte_offset(text, end)?;
    text.get(from..to)
}

/// Errors applying a range patch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Range does not satisfy `start <= end <= len`
    #[error("range [{start}, {end}) out of bounds for content of {len} chars")]
    OutOfRange { start: usize, end: usize, len: usize },
}
