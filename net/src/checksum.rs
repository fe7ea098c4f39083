// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Traits for checksum calculation and manipulation

use std::fmt::Debug;

/// A trait for checksum calculation and manipulation.
///
/// NAT rewrites addresses, ports and identifiers, so every header it touches must be able to
/// recompute its checksum before the frame is emitted.
pub trait Checksum {
    /// The data (beyond the header itself) the checksum covers.
    type Payload<'a>: ?Sized
    where
        Self: 'a;

    /// Get the checksum value from the header
    fn checksum(&self) -> u16;

    /// Compute the checksum value from the header and payload
    fn compute_checksum(&self, payload: &Self::Payload<'_>) -> u16;

    /// Set the checksum value in the header.
    ///
    /// The validity of the checksum is not checked.
    fn set_checksum(&mut self, checksum: u16) -> &mut Self;

    /// Validate the checksum value in the header.
    ///
    /// # Errors
    ///
    /// Returns a [`ChecksumError`] if the checksum is invalid.
    fn validate_checksum(&self, payload: &Self::Payload<'_>) -> Result<u16, ChecksumError> {
        let expected = self.compute_checksum(payload);
        let actual = self.checksum();
        if expected == actual {
            Ok(expected)
        } else {
            Err(ChecksumError { expected, actual })
        }
    }

    /// Update the checksum value in the header.
    fn update_checksum(&mut self, payload: &Self::Payload<'_>) -> &mut Self {
        let checksum = self.compute_checksum(payload);
        self.set_checksum(checksum)
    }
}

/// An error resulting from a checksum mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("checksum mismatch: expected {expected:#06x}, actual {actual:#06x}")]
pub struct ChecksumError {
    expected: u16,
    actual: u16,
}
