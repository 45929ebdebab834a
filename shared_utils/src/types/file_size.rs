//! FileSize Type-Safe Wrapper
//!
//! Byte counts of produced GIF files, with the compact human-readable
//! rendering used in completion messages.

use std::fmt;

/// Unit suffixes for successive powers of 1024.
const UNITS: [char; 9] = ['b', 'k', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

// ============================================================================
// FileSize Newtype
// ============================================================================

/// File size in bytes.
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::FileSize;
///
/// assert_eq!(FileSize::new(512).display(), "512b");
/// assert_eq!(FileSize::new(1536).display(), "1.50k");
/// assert_eq!(FileSize::new(12 * 1024 * 1024).display(), "12.0M");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSize(u64);

impl FileSize {
    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Size of the file at `path`, as reported by the filesystem.
    pub fn of(path: &std::path::Path) -> std::io::Result<Self> {
        std::fs::metadata(path).map(|m| Self(m.len()))
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// Compact rendering with 4 significant digits, 2 to 5 characters.
    ///
    /// Below 1024 the plain byte count is shown (`"512b"`). Larger values
    /// look like `x.xxU`, `xx.xU`, `xxxU` or `xxxxU`.
    pub fn display(&self) -> String {
        let mut exp = 0usize;
        let mut divisor = 1u128;
        while exp + 1 < UNITS.len() && u128::from(self.0) >= divisor * 1024 {
            divisor *= 1024;
            exp += 1;
        }

        if exp == 0 {
            return format!("{}{}", self.0, UNITS[0]);
        }

        let unit_value = self.0 as f64 / divisor as f64;
        // digits before the decimal point, minus one
        let places = if unit_value >= 100.0 {
            2
        } else if unit_value >= 10.0 {
            1
        } else {
            0
        };
        format!("{:.*}{}", 2 - places, unit_value, UNITS[exp])
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({} = {})", self.0, self.display())
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

// ============================================================================
// Tests
// ============================================================================
