//! Per-book ledger of borrower checkout states.
//!
//! The ledger is keyed by borrower identifier, so a borrower can never appear
//! twice. Entries whose outstanding quantity dropped to zero are retained as
//! return history. On the wire the ledger is the `states` array, one record
//! per borrower, in insertion order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

/// Lending status of one borrower for one book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    /// No checkout was ever recorded
    NeverCheckedOut,
    /// The borrower currently holds `quantity` units (always at least 1)
    Outstanding { quantity: u32 },
    /// Every unit the borrower took has been brought back
    Returned { returned_at: DateTime<Utc> },
}

impl LoanStatus {
    /// Units currently held
    pub fn quantity(&self) -> u32 {
        match self {
            LoanStatus::Outstanding { quantity } => *quantity,
            LoanStatus::NeverCheckedOut | LoanStatus::Returned { .. } => 0,
        }
    }
}

/// State of a single borrower in a book's ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BorrowerStateRecord", try_from = "BorrowerStateRecord")]
pub struct BorrowerState {
    pub borrower_id: String,
    pub status: LoanStatus,
    /// Most recent checkout; `None` only for `NeverCheckedOut`
    pub checked_out_at: Option<DateTime<Utc>>,
}

impl BorrowerState {
    /// Zero-value state for a borrower without history
    pub fn never_checked_out(borrower_id: impl Into<String>) -> Self {
        Self {
            borrower_id: borrower_id.into(),
            status: LoanStatus::NeverCheckedOut,
            checked_out_at: None,
        }
    }

    pub fn outstanding(&self) -> u32 {
        self.status.quantity()
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            LoanStatus::Returned { returned_at } => Some(returned_at),
            _ => None,
        }
    }

    /// State after one more unit is checked out at `now`.
    ///
    /// `NeverCheckedOut` and `Returned` both become `Outstanding { 1 }`.
    pub fn after_checkout(&self, now: DateTime<Utc>) -> Self {
        Self {
            borrower_id: self.borrower_id.clone(),
            status: LoanStatus::Outstanding {
                quantity: self.outstanding() + 1,
            },
            checked_out_at: Some(now),
        }
    }

    /// State after one unit is returned at `now`, or `None` if nothing is held.
    ///
    /// A partial return keeps the state `Outstanding`; returning the last unit
    /// settles it as `Returned` stamped with `now`.
    pub fn after_return(&self, now: DateTime<Utc>) -> Option<Self> {
        let status = match self.status {
            LoanStatus::Outstanding { quantity: 1 } => LoanStatus::Returned { returned_at: now },
            LoanStatus::Outstanding { quantity } => LoanStatus::Outstanding {
                quantity: quantity - 1,
            },
            LoanStatus::NeverCheckedOut | LoanStatus::Returned { .. } => return None,
        };

        Some(Self {
            borrower_id: self.borrower_id.clone(),
            status,
            checked_out_at: self.checked_out_at,
        })
    }
}

/// Wire record of a borrower state (element of the `states` array)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowerStateRecord {
    /// Borrower identifier
    pub user: String,
    /// Units currently held by the borrower
    pub quantity: u32,
    /// Whether the borrower currently holds at least one unit
    #[serde(default)]
    pub checked_out: bool,
    /// Most recent checkout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_date: Option<DateTime<Utc>>,
    /// Whether the borrower has returned everything they took
    #[serde(default)]
    pub returned: bool,
    /// Time of the most recent full return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<BorrowerState> for BorrowerStateRecord {
    fn from(state: BorrowerState) -> Self {
        Self {
            quantity: state.outstanding(),
            checked_out: state.outstanding() > 0,
            checkout_date: state.checked_out_at,
            returned: state.returned_at().is_some(),
            returned_at: state.returned_at(),
            user: state.borrower_id,
        }
    }
}

impl TryFrom<BorrowerStateRecord> for BorrowerState {
    type Error = String;

    fn try_from(record: BorrowerStateRecord) -> Result<Self, Self::Error> {
        let status = match (record.quantity, record.returned, record.returned_at) {
            (0, false, _) => LoanStatus::NeverCheckedOut,
            (0, true, Some(returned_at)) => LoanStatus::Returned { returned_at },
            (0, true, None) => {
                return Err(format!("state of {} is returned without returnedAt", record.user))
            }
            (_, true, _) => {
                return Err(format!(
                    "state of {} is returned but still holds {} unit(s)",
                    record.user, record.quantity
                ))
            }
            (quantity, false, _) => LoanStatus::Outstanding { quantity },
        };

        if status != LoanStatus::NeverCheckedOut && record.checkout_date.is_none() {
            return Err(format!("state of {} has no checkoutDate", record.user));
        }

        Ok(Self {
            borrower_id: record.user,
            status,
            checked_out_at: record.checkout_date,
        })
    }
}

/// Mapping from borrower identifier to borrower state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: IndexMap<String, BorrowerState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing state of `borrower_id`, or a `NeverCheckedOut` state
    pub fn find_or_default(&self, borrower_id: &str) -> BorrowerState {
        self.entries
            .get(borrower_id)
            .cloned()
            .unwrap_or_else(|| BorrowerState::never_checked_out(borrower_id))
    }

    /// Replace the entry for `state.borrower_id`, inserting it if absent
    pub fn upsert(&mut self, state: BorrowerState) {
        self.entries.insert(state.borrower_id.clone(), state);
    }

    pub fn get(&self, borrower_id: &str) -> Option<&BorrowerState> {
        self.entries.get(borrower_id)
    }

    /// Units held by `borrower_id`
    pub fn outstanding_for(&self, borrower_id: &str) -> u32 {
        self.entries
            .get(borrower_id)
            .map(BorrowerState::outstanding)
            .unwrap_or(0)
    }

    /// Units held across all borrowers
    pub fn outstanding_total(&self) -> u64 {
        self.entries.values().map(|s| u64::from(s.outstanding())).sum()
    }

    /// Borrowers currently holding at least one unit
    pub fn borrowers_with_outstanding(&self) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .filter(|s| s.outstanding() > 0)
            .map(|s| s.borrower_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let states = Vec::<BorrowerState>::deserialize(deserializer)?;
        let mut ledger = Ledger::new();
        for state in states {
            if ledger.entries.contains_key(&state.borrower_id) {
                return Err(de::Error::custom(format!(
                    "duplicate ledger entry for borrower {}",
                    state.borrower_id
                )));
            }
            ledger.upsert(state);
        }
        Ok(ledger)
    }
}
