//! Expenses and their splits
//!
//! An expense records who paid, who recorded it, and how the amount is
//! divided among members. Its splits are owned by the expense and replaced
//! wholesale whenever the amount or the split strategy changes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ExpenseId, MemberId, Money, SplitId, TripId};
use crate::split::{ComputedSplit, SplitKind, SplitStrategy};

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Food,
    Transport,
    Accommodation,
    Entertainment,
    #[default]
    Other,
}

/// One member's share of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub id: SplitId,
    pub expense_id: ExpenseId,
    pub member_id: MemberId,
    pub amount: Money,
    /// Share of the expense in percent; informational only
    pub percentage: Decimal,
}

impl Split {
    fn from_computed(expense_id: ExpenseId, computed: ComputedSplit) -> Self {
        Self {
            id: SplitId::new_v7(),
            expense_id,
            member_id: computed.member_id,
            amount: computed.amount,
            percentage: computed.percentage,
        }
    }
}

/// A shared expense within a trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    /// The member who paid
    pub payer_id: MemberId,
    /// The member who recorded the expense; governs who may change it
    pub created_by: Option<MemberId>,
    pub amount: Money,
    pub description: String,
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
    pub split_kind: SplitKind,
    pub splits: Vec<Split>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Builds a new expense from validated input and computed splits
    pub fn new(
        trip_id: TripId,
        created_by: MemberId,
        input: &NewExpense,
        computed: Vec<ComputedSplit>,
    ) -> Self {
        let id = ExpenseId::new_v7();
        let now = Utc::now();
        Self {
            id,
            trip_id,
            payer_id: input.payer_id,
            created_by: Some(created_by),
            amount: input.amount,
            description: input.description.clone(),
            category: input.category,
            expense_date: input.expense_date,
            split_kind: input.strategy.kind(),
            splits: computed
                .into_iter()
                .map(|c| Split::from_computed(id, c))
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every split with a freshly computed set
    pub fn replace_splits(&mut self, kind: SplitKind, computed: Vec<ComputedSplit>) {
        self.split_kind = kind;
        self.splits = computed
            .into_iter()
            .map(|c| Split::from_computed(self.id, c))
            .collect();
    }

    /// Sum of the split amounts
    pub fn split_total(&self) -> Money {
        self.splits.iter().map(|s| s.amount).sum()
    }

    /// Returns true if `member_id` is referenced as payer, recorder or split
    pub fn references(&self, member_id: MemberId) -> bool {
        self.payer_id == member_id
            || self.created_by == Some(member_id)
            || self.splits.iter().any(|s| s.member_id == member_id)
    }
}

/// Input for recording an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub payer_id: MemberId,
    pub amount: Money,
    pub description: String,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
    pub strategy: SplitStrategy,
}

/// A partial update to an expense
///
/// Splits are recomputed when `amount` or `strategy` is present. Changing
/// the amount of an exact or percentage expense requires a new strategy
/// because the stored shares no longer fit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseChanges {
    pub payer_id: Option<MemberId>,
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
    pub strategy: Option<SplitStrategy>,
}

impl ExpenseChanges {
    /// Returns true if the splits must be recomputed
    pub fn resplits(&self) -> bool {
        self.amount.is_some() || self.strategy.is_some()
    }

    /// Applies the non-split fields to `expense`
    pub fn apply_fields(&self, expense: &mut Expense) {
        if let Some(payer_id) = self.payer_id {
            expense.payer_id = payer_id;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(description) = &self.description {
            expense.description = description.clone();
        }
        if let Some(date) = self.expense_date {
            expense.expense_date = date;
        }
        expense.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::calculate;
    use rust_decimal_macros::dec;

    fn dinner(payer: MemberId) -> NewExpense {
        NewExpense {
            payer_id: payer,
            amount: Money::new(dec!(90.00)),
            description: "Dinner".to_string(),
            category: ExpenseCategory::Food,
            expense_date: NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
            strategy: SplitStrategy::Equal,
        }
    }

    #[test]
    fn test_new_expense_links_splits() {
        let members = vec![MemberId::new(), MemberId::new()];
        let input = dinner(members[0]);
        let computed = calculate(input.amount, &input.strategy, &members).unwrap();
        let expense = Expense::new(TripId::new(), members[1], &input, computed);

        assert_eq!(expense.splits.len(), 2);
        assert!(expense.splits.iter().all(|s| s.expense_id == expense.id));
        assert_eq!(expense.split_total(), expense.amount);
        assert_eq!(expense.split_kind, SplitKind::Equal);
        assert!(expense.references(members[1]));
        assert!(!expense.references(MemberId::new()));
    }

    #[test]
    fn test_changes_resplit_detection() {
        assert!(!ExpenseChanges::default().resplits());
        assert!(ExpenseChanges {
            amount: Some(Money::new(dec!(1))),
            ..Default::default()
        }
        .resplits());
    }

    #[test]
    fn test_category_defaults_to_other() {
        let json = r#"{"payer_id":"00000000-0000-0000-0000-000000000001","amount":"12.00","description":"Taxi","expense_date":"2024-07-02","strategy":{"kind":"EQUAL"}}"#;
        let input: NewExpense = serde_json::from_str(json).unwrap();

        assert_eq!(input.category, ExpenseCategory::Other);
    }

    #[test]
    fn test_sub_cent_amount_is_refused_on_input() {
        let json = r#"{"payer_id":"00000000-0000-0000-0000-000000000001","amount":"40.004","description":"Taxi","expense_date":"2024-07-02","strategy":{"kind":"EQUAL"}}"#;
        assert!(serde_json::from_str::<NewExpense>(json).is_err());
    }
}
