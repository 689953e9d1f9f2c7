use rand::Rng;

use crate::{error::Result, state::StateDelta};

/// Outcome of one proposal.
#[derive(Debug)]
pub struct Proposal {
    /// Log of the Hastings ratio of the move, to be added to the log
    /// posterior ratio in the acceptance test.
    pub log_hastings_ratio: f64,
    /// Every state cell the move changed, with the previous values.
    pub delta: StateDelta,
}

impl Proposal {
    /// Undo the move, typically after the chain driver rejected it.
    pub fn reject(self) {
        self.delta.revert();
    }
}

/// A Metropolis-Hastings move on the shared chain state.
///
/// The move mutates the state in place and reports exactly which cells it
/// changed. If it returns an error, no state was changed.
pub trait Proposable {
    fn propose<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Proposal>;
}
