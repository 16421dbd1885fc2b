use serde_json::Value;

use strata_core::expression::{Condition, UpdatePlan};
use strata_core::record::{Status, LIFECYCLE_FIELDS};

/// A conditional status change of an owned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Block,
    Unblock,
    Disable,
    Enable,
    Archive,
    Restore,
}

/// What happens to `statusReason` during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reason {
    Set,
    Clear,
    Keep,
}

impl Transition {
    pub const ALL: [Transition; 6] = [
        Transition::Block,
        Transition::Unblock,
        Transition::Disable,
        Transition::Enable,
        Transition::Archive,
        Transition::Restore,
    ];

    /// Status the record ends up in.
    pub fn target(self) -> Status {
        match self {
            Transition::Block => Status::Blocked,
            Transition::Unblock | Transition::Enable => Status::Enabled,
            Transition::Disable => Status::Disabled,
            Transition::Archive => Status::Deleted,
            Transition::Restore => Status::Draft,
        }
    }

    /// Whether the transition may start from `status`.
    pub fn allows(self, status: Status) -> bool {
        match self {
            Transition::Block => status != Status::Blocked,
            Transition::Unblock => status == Status::Blocked,
            Transition::Disable => status == Status::Enabled,
            Transition::Enable => matches!(status, Status::Draft | Status::Disabled),
            Transition::Archive => {
                matches!(status, Status::Draft | Status::Enabled | Status::Disabled)
            }
            Transition::Restore => status == Status::Deleted,
        }
    }

    fn reason(self) -> Reason {
        match self {
            Transition::Block => Reason::Set,
            Transition::Unblock | Transition::Enable | Transition::Restore => Reason::Clear,
            Transition::Disable | Transition::Archive => Reason::Keep,
        }
    }

    fn source(self) -> Condition {
        match self {
            Transition::Block => Condition::ne("status", Status::Blocked),
            Transition::Unblock => Condition::eq("status", Status::Blocked),
            Transition::Disable => Condition::eq("status", Status::Enabled),
            Transition::Enable => Condition::one_of("status", [Status::Draft, Status::Disabled]),
            Transition::Archive => Condition::one_of(
                "status",
                [Status::Draft, Status::Enabled, Status::Disabled],
            ),
            Transition::Restore => Condition::eq("status", Status::Deleted),
        }
    }

    /// Owner match AND current status in the allowed source set.
    pub fn condition(self, user_id: &str) -> Condition {
        Condition::eq("userId", user_id).and(self.source())
    }

    /// Sets the new status and its lifecycle timestamp, removes every other
    /// lifecycle timestamp and bumps `ver`.
    pub fn plan(self, now: i64, reason: Option<&str>) -> UpdatePlan {
        let target = self.target();
        let mut plan = UpdatePlan::new().set("status", target);

        for field in LIFECYCLE_FIELDS {
            if target.key().ok() == Some(field) {
                plan = plan.set(field, now);
            } else {
                plan = plan.remove(field);
            }
        }

        plan = match (self.reason(), reason) {
            (Reason::Set, Some(reason)) => plan.set("statusReason", Value::from(reason)),
            (Reason::Set, None) | (Reason::Clear, _) => plan.remove("statusReason"),
            (Reason::Keep, _) => plan,
        };

        plan.increment("ver", 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::storage::Item;

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_allowed_sources() {
        let statuses = [
            Status::Draft,
            Status::Enabled,
            Status::Disabled,
            Status::Deleted,
            Status::Blocked,
        ];
        let allowed = |t: Transition| -> Vec<Status> {
            statuses.iter().copied().filter(|s| t.allows(*s)).collect()
        };

        assert_eq!(
            allowed(Transition::Block),
            vec![Status::Draft, Status::Enabled, Status::Disabled, Status::Deleted]
        );
        assert_eq!(allowed(Transition::Unblock), vec![Status::Blocked]);
        assert_eq!(allowed(Transition::Disable), vec![Status::Enabled]);
        assert_eq!(allowed(Transition::Enable), vec![Status::Draft, Status::Disabled]);
        assert_eq!(
            allowed(Transition::Archive),
            vec![Status::Draft, Status::Enabled, Status::Disabled]
        );
        assert_eq!(allowed(Transition::Restore), vec![Status::Deleted]);
    }

    #[test]
    fn test_condition_agrees_with_allows() {
        for transition in Transition::ALL {
            for status in [
                Status::Draft,
                Status::Enabled,
                Status::Disabled,
                Status::Deleted,
                Status::Blocked,
            ] {
                let record = item(json!({"userId": "u1", "status": status.code()}));
                assert_eq!(
                    transition.condition("u1").matches(&record),
                    transition.allows(status),
                    "{transition:?} from {status:?}"
                );
                assert!(!transition.condition("u2").matches(&record));
            }
        }
    }

    #[test]
    fn test_plan_leaves_one_lifecycle_timestamp() {
        let mut record = item(json!({
            "status": 1,
            "draft": 10,
            "enable": 20,
            "ver": 2,
            "statusReason": "old"
        }));

        Transition::Disable.plan(99, None).apply(&mut record);

        assert_eq!(
            record,
            item(json!({"status": 3, "disable": 99, "ver": 3, "statusReason": "old"}))
        );
    }

    #[test]
    fn test_block_sets_reason_and_enable_clears_it() {
        let mut record = item(json!({"status": 2, "enable": 10, "ver": 0}));

        Transition::Block.plan(50, Some("spam")).apply(&mut record);
        assert_eq!(record["statusReason"], json!("spam"));
        assert_eq!(record["block"], json!(50));

        Transition::Unblock.plan(60, None).apply(&mut record);
        assert!(!record.contains_key("statusReason"));
        assert_eq!(record["status"], json!(2));
        assert_eq!(record["ver"], json!(2));
    }
}
