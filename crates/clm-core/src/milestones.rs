//! Default milestone schedule derived from a contract's expiration date.

use chrono::{Days, NaiveDate};
use uuid::Uuid;

use crate::types::{MilestoneType, NewMilestone};

pub const REVIEW_LEAD_DAYS: u64 = 90;
pub const RENEWAL_LEAD_DAYS: u64 = 60;

/// One planned milestone before it is bound to a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestonePlan {
    pub milestone_type: MilestoneType,
    pub name: &'static str,
    pub due_date: NaiveDate,
}

/// Review at D-90, renewal notice at D-60, expiration at D.
pub fn default_schedule(expiration: NaiveDate) -> [MilestonePlan; 3] {
    [
        MilestonePlan {
            milestone_type: MilestoneType::Review,
            name: "90-Day Review",
            due_date: days_before(expiration, REVIEW_LEAD_DAYS),
        },
        MilestonePlan {
            milestone_type: MilestoneType::Renewal,
            name: "60-Day Renewal Notice",
            due_date: days_before(expiration, RENEWAL_LEAD_DAYS),
        },
        MilestonePlan {
            milestone_type: MilestoneType::Expiration,
            name: "Contract Expiration",
            due_date: expiration,
        },
    ]
}

impl MilestonePlan {
    pub fn into_new(self, contract_id: Uuid) -> NewMilestone {
        NewMilestone {
            id: Uuid::new_v4(),
            contract_id,
            milestone_type: self.milestone_type,
            name: self.name.to_string(),
            due_date: self.due_date,
            assignee_email: None,
            notes: None,
        }
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}
