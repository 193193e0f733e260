use std::fmt::{self, Debug, Display};

/// Identifier assigned to every registered actor by the transport.
///
/// Ids are dense and start at 1; proposers, acceptors and learners share one counter.
pub type ActorId = u32;

/// Any value a proposer can campaign for.
///
/// Think of it like the payload of the single consensus instance. Any cloneable, comparable,
/// thread-safe type works.
pub trait PaxosValue: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> PaxosValue for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// Totally ordered proposal identifier.
///
/// Ordered by `number` first, then by `owner` (the proposing actor's id), so two proposers
/// never produce equal ids. [`ProposalId::NONE`] sorts below every real id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId {
    number: u32,
    owner: ActorId,
}

impl ProposalId {
    /// "Nothing promised or accepted yet".
    pub const NONE: ProposalId = ProposalId {
        number: 0,
        owner: 0,
    };

    pub fn new(number: u32, owner: ActorId) -> Self {
        Self { number, owner }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Packs the id into one integer that preserves the ordering.
    pub fn as_u64(&self) -> u64 {
        ((self.number as u64) << 32) | self.owner as u64
    }
}

impl Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.as_u64())
    }
}

/// The outcome of the consensus instance: the id that reached quorum and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<V> {
    pub proposal_id: ProposalId,
    pub value: V,
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn orders_by_number_then_owner() {
        let a = ProposalId::new(1, 9);
        let b = ProposalId::new(2, 1);
        let c = ProposalId::new(2, 3);

        assert_eq!(a.cmp(&b), Ordering::Less);
        assert_eq!(b.cmp(&c), Ordering::Less);
        assert_eq!(a.cmp(&c), Ordering::Less);
        assert_eq!(c.cmp(&a), Ordering::Greater);
        assert_eq!(c.cmp(&c), Ordering::Equal);
    }

    #[test]
    fn none_is_smallest() {
        assert!(ProposalId::NONE < ProposalId::new(1, 0));
        assert!(ProposalId::NONE < ProposalId::new(1, 1));
        assert!(ProposalId::NONE.is_none());
        assert!(!ProposalId::new(1, 1).is_none());
        assert_eq!(ProposalId::default(), ProposalId::NONE);
    }

    #[test]
    fn order_matches_packed_representation() {
        let ids = [
            ProposalId::new(1, 1),
            ProposalId::new(1, 7),
            ProposalId::new(3, 2),
            ProposalId::new(u32::MAX, 4),
            ProposalId::NONE,
        ];
        for a in ids {
            for b in ids {
                assert_eq!(a.cmp(&b), a.as_u64().cmp(&b.as_u64()), "{a:?} vs {b:?}");
                assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            }
        }
    }

    #[test]
    fn display_is_stable_hex() {
        assert_eq!(ProposalId::new(1, 2).to_string(), "0000000100000002");
        assert_eq!(ProposalId::new(0x1f, 0xab).to_string(), "0000001f000000ab");
        assert_eq!(ProposalId::NONE.to_string(), "0000000000000000");
    }
}
