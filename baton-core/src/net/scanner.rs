//! Candidate-address enumeration for subnet scanning.

use std::net::Ipv4Addr;

use crate::error::BatonError;

// ── InterfaceSource ──────────────────────────────────────────────

/// Supplies the active interface's IPv4 address and subnet prefix.
///
/// Platform interface enumeration lives outside this crate; a
/// consumer implements this seam however its platform allows and
/// returns [`BatonError::NoActiveInterface`] when nothing usable
/// exists.
pub trait InterfaceSource: Send + Sync {
    fn local_address(&self) -> Result<(Ipv4Addr, u8), BatonError>;
}

/// A fixed address/prefix, for tests and manual configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterface(pub Ipv4Addr, pub u8);

impl InterfaceSource for FixedInterface {
    fn local_address(&self) -> Result<(Ipv4Addr, u8), BatonError> {
        Ok((self.0, self.1))
    }
}

// ── SubnetScanner ────────────────────────────────────────────────

/// Lazily yields every candidate host address in the local subnet,
/// ascending, skipping the network address, the broadcast address,
/// and the local address itself. Pure derivation — no side effects —
/// and restartable via [`SubnetScanner::reset`].
#[derive(Debug, Clone)]
pub struct SubnetScanner {
    network: u32,
    host_count: u32,
    local: u32,
    cursor: u32,
}

impl SubnetScanner {
    /// Build a scanner for the subnet containing `local`.
    ///
    /// Prefixes outside 1..=30 have no scannable host range and
    /// return [`BatonError::InvalidPrefix`].
    pub fn new(local: Ipv4Addr, prefix: u8) -> Result<Self, BatonError> {
        if !(1..=30).contains(&prefix) {
            return Err(BatonError::InvalidPrefix(prefix));
        }

        let local = u32::from(local);
        let mask = u32::MAX << (32 - prefix);
        Ok(Self {
            network: local & mask,
            host_count: (1u32 << (32 - prefix)) - 2,
            local,
            cursor: 1,
        })
    }

    /// Number of candidates a full pass yields.
    pub fn candidate_count(&self) -> u32 {
        // The local address always falls inside its own subnet.
        self.host_count - 1
    }

    /// Restart the sequence from the first host.
    pub fn reset(&mut self) {
        self.cursor = 1;
    }
}

impl Iterator for SubnetScanner {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        while self.cursor <= self.host_count {
            let candidate = self.network + self.cursor;
            self.cursor += 1;
            if candidate != self.local {
                return Some(Ipv4Addr::from(candidate));
            }
        }
        None
    }
}
