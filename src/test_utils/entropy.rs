//! Entropy sources for testing purposes.
use crate::common::nonce::EntropySource;

/// Entropy source that is always unavailable.
#[derive(Default, Debug, Clone, Copy)]
pub struct UnavailableEntropy;

impl EntropySource for UnavailableEntropy {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("entropy source offline"))
    }
}

/// Entropy source that fills every buffer with the same byte.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub u8);

impl EntropySource for FixedEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        dest.fill(self.0);
        Ok(())
    }
}
