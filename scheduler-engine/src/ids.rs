// scheduler-engine/src/ids.rs
// ============================================================================
// Module: Fleet Scheduler Identifier Generation
// Description: Boot-scoped generator for deployment ids and environment
//              idempotency tokens.
// Purpose: Give the environment and deployment services a single place to
//          allocate fresh opaque identifiers.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! [`IdGenerator`] pairs a process-boot random seed with a monotonic counter:
//! cheap, collision-free within a process lifetime, and free of any
//! dependency on wall-clock time (so tests stay deterministic regardless of
//! generation order).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;

use scheduler_core::DeploymentId;
use scheduler_core::Token;

// ============================================================================
// SECTION: Id Generator
// ============================================================================

/// Boot-scoped generator for deployment ids and environment tokens.
#[derive(Debug)]
pub struct IdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for identifiers issued in this process.
    counter: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Creates a new generator seeded from the OS random number generator.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0_u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self { boot_id: u64::from_be_bytes(bytes), counter: AtomicU64::new(1) }
    }

    fn issue(&self, prefix: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{:016x}-{:016x}", self.boot_id, seq)
    }

    /// Allocates a fresh deployment id.
    #[must_use]
    pub fn next_deployment_id(&self) -> DeploymentId {
        DeploymentId::new(self.issue("dep"))
    }

    /// Allocates a fresh environment idempotency token.
    #[must_use]
    pub fn next_token(&self) -> Token {
        Token::new(self.issue("tok"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_deployment_ids_are_distinct() {
        let gen = IdGenerator::new();
        let a = gen.next_deployment_id();
        let b = gen.next_deployment_id();
        assert_ne!(a, b);
    }

    #[test]
    fn successive_tokens_are_distinct() {
        let gen = IdGenerator::new();
        let a = gen.next_token();
        let b = gen.next_token();
        assert_ne!(a, b);
    }
}
