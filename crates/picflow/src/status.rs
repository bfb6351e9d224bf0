// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Status flags attached to every delivered result.

use std::fmt::{self, Debug, Formatter};
use std::ops::{BitOr, BitOrAssign};

/// A bitmask of flags describing a delivered result.
///
/// # Examples
///
/// ```
/// use picflow::Status;
///
/// let status = Status::IS_LAST | Status::DO_NOT_CACHE_ENCODED;
/// assert!(status.is_last());
/// assert!(status.has_any(Status::DO_NOT_CACHE_ENCODED | Status::IS_PARTIAL_RESULT));
/// assert!(!status.has_all(Status::DO_NOT_CACHE_ENCODED | Status::IS_PARTIAL_RESULT));
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status(u8);

impl Status {
    /// No flags set: an intermediate, cacheable result.
    pub const NONE: Self = Self(0);

    /// The terminal delivery for a request.
    pub const IS_LAST: Self = Self(1);

    /// The producer asserts that this payload must never be persisted.
    pub const DO_NOT_CACHE_ENCODED: Self = Self(1 << 1);

    /// The result is a placeholder standing in for the real image.
    pub const IS_PLACEHOLDER: Self = Self(1 << 2);

    /// The result is a speculative or incomplete decode.
    pub const IS_PARTIAL_RESULT: Self = Self(1 << 3);

    /// Any resizing requested for the image has already been applied.
    pub const IS_RESIZING_DONE: Self = Self(1 << 4);

    /// Creates a status from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` for the terminal delivery of a request.
    #[must_use]
    pub const fn is_last(self) -> bool {
        self.has_all(Self::IS_LAST)
    }

    /// Returns `true` for intermediate deliveries.
    #[must_use]
    pub const fn is_not_last(self) -> bool {
        !self.is_last()
    }

    /// Returns `true` if at least one of `flags` is set.
    #[must_use]
    pub const fn has_any(self, flags: Self) -> bool {
        self.0 & flags.0 != 0
    }

    /// Returns `true` if every one of `flags` is set.
    #[must_use]
    pub const fn has_all(self, flags: Self) -> bool {
        self.0 & flags.0 == flags.0
    }

    /// Returns a copy with `flags` set.
    #[must_use]
    pub const fn with(self, flags: Self) -> Self {
        Self(self.0 | flags.0)
    }

    /// Returns a copy with `flags` cleared.
    #[must_use]
    pub const fn without(self, flags: Self) -> Self {
        Self(self.0 & !flags.0)
    }
}

impl BitOr for Status {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.with(rhs)
    }
}

impl BitOrAssign for Status {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.with(rhs);
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        const NAMES: [(Status, &str); 5] = [
            (Status::IS_LAST, "IS_LAST"),
            (Status::DO_NOT_CACHE_ENCODED, "DO_NOT_CACHE_ENCODED"),
            (Status::IS_PLACEHOLDER, "IS_PLACEHOLDER"),
            (Status::IS_PARTIAL_RESULT, "IS_PARTIAL_RESULT"),
            (Status::IS_RESIZING_DONE, "IS_RESIZING_DONE"),
        ];

        let mut set = f.debug_set();
        for (flag, name) in NAMES {
            if self.has_all(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_not_last() {
        assert!(Status::NONE.is_not_last());
        assert!(!Status::NONE.has_any(Status::IS_LAST | Status::IS_PARTIAL_RESULT));
    }

    #[test]
    fn with_and_without_toggle_flags() {
        let status = Status::NONE.with(Status::IS_LAST).with(Status::IS_PLACEHOLDER);
        assert!(status.is_last());
        assert!(status.has_all(Status::IS_PLACEHOLDER));

        let status = status.without(Status::IS_LAST);
        assert!(status.is_not_last());
        assert_eq!(status, Status::IS_PLACEHOLDER);
    }

    #[test]
    fn bit_or_assign_accumulates() {
        let mut status = Status::IS_LAST;
        status |= Status::IS_RESIZING_DONE;
        assert_eq!(status.bits(), 0b1_0001);
        assert_eq!(Status::from_bits(status.bits()), status);
    }

    #[test]
    fn debug_lists_set_flags() {
        let debug_str = format!("{:?}", Status::IS_LAST | Status::IS_PARTIAL_RESULT);
        assert_eq!(debug_str, "{IS_LAST, IS_PARTIAL_RESULT}");
        assert_eq!(format!("{:?}", Status::NONE), "{}");
    }
}
