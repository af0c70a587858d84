//! Per-investor contribution records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::{contribution_address, RecordAddress};
use crate::errors::LaunchpadError;
use crate::types::{Address, Balance, LaunchId, Timestamp};

/// One investor's position in one launch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub investor: Address,
    pub launch_id: LaunchId,
    /// Cumulative funds contributed. Kept after a refund for history.
    pub contribution_amount: Balance,
    /// Fixed when the launch finalizes successfully; zero before.
    pub token_allocation: Balance,
    pub claimed_amount: Balance,
    pub last_claim_time: Option<Timestamp>,
    pub is_refunded: bool,
    pub address: RecordAddress,
}

impl Contribution {
    fn new(launch_id: LaunchId, investor: Address) -> Self {
        Self {
            investor,
            launch_id,
            contribution_amount: 0,
            token_allocation: 0,
            claimed_amount: 0,
            last_claim_time: None,
            is_refunded: false,
            address: contribution_address(launch_id, &investor),
        }
    }

    pub fn is_fully_claimed(&self) -> bool {
        self.token_allocation > 0 && self.claimed_amount >= self.token_allocation
    }

    pub fn unclaimed(&self) -> Balance {
        self.token_allocation.saturating_sub(self.claimed_amount)
    }
}

/// All contribution records, keyed by (launch, investor).
///
/// Serialized as a flat list of records; each carries its own key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(into = "Vec<Contribution>", from = "Vec<Contribution>")]
pub struct ContributionBook {
    records: BTreeMap<(LaunchId, Address), Contribution>,
}

impl From<Vec<Contribution>> for ContributionBook {
    fn from(list: Vec<Contribution>) -> Self {
        let records = list.into_iter().map(|c| ((c.launch_id, c.investor), c)).collect();
        Self { records }
    }
}

impl From<ContributionBook> for Vec<Contribution> {
    fn from(book: ContributionBook) -> Self {
        book.records.into_values().collect()
    }
}

impl ContributionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, launch_id: LaunchId, investor: &Address) -> Option<&Contribution> {
        self.records.get(&(launch_id, *investor))
    }

    pub(crate) fn get_mut(&mut self, launch_id: LaunchId, investor: &Address) -> Option<&mut Contribution> {
        self.records.get_mut(&(launch_id, *investor))
    }

    /// Add `amount` to the investor's cumulative contribution, creating the
    /// record on first use. Returns the new total and whether the record is new.
    pub(crate) fn record(
        &mut self,
        launch_id: LaunchId,
        investor: Address,
        amount: Balance,
    ) -> Result<(Balance, bool), LaunchpadError> {
        let fresh = !self.records.contains_key(&(launch_id, investor));
        let entry = self
            .records
            .entry((launch_id, investor))
            .or_insert_with(|| Contribution::new(launch_id, investor));
        entry.contribution_amount = entry
            .contribution_amount
            .checked_add(amount)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        Ok((entry.contribution_amount, fresh))
    }

    /// Contributions to one launch, in investor order.
    pub fn for_launch(&self, launch_id: LaunchId) -> impl Iterator<Item = &Contribution> {
        self.records
            .range((launch_id, Address([0u8; 20]))..=(launch_id, Address([0xFF; 20])))
            .map(|(_, c)| c)
    }

    pub(crate) fn for_launch_mut(&mut self, launch_id: LaunchId) -> impl Iterator<Item = &mut Contribution> {
        self.records
            .range_mut((launch_id, Address([0u8; 20]))..=(launch_id, Address([0xFF; 20])))
            .map(|(_, c)| c)
    }
}
