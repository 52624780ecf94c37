//! Bounce filtering for untracked replies.
//!
//! Models bounce/DMARC/auto-reply suppression: any single firing rule drops
//! the reply silently (activity `filtered`, no write, no error).

use store::{BounceField, BounceFilterRule, MatchType};

/// Normalized reply fields the filter rules inspect.
#[derive(Clone, Debug, Default)]
pub struct ReplyFields<'a> {
    pub from_name: &'a str,
    pub from_email: &'a str,
    pub body: &'a str,
    pub subject: &'a str,
    pub to_address: &'a str,
}

impl ReplyFields<'_> {
    fn get(&self, field: BounceField) -> &str {
        match field {
            BounceField::FromName => self.from_name,
            BounceField::FromEmail => self.from_email,
            BounceField::Body => self.body,
            BounceField::Subject => self.subject,
            BounceField::ToAddress => self.to_address,
        }
    }
}

fn fires(rule: &BounceFilterRule, fields: &ReplyFields<'_>) -> bool {
    let value = fields.get(rule.field);
    match rule.match_type {
        MatchType::NotContains => value.contains(&rule.value),
        MatchType::NotEquals => value == rule.value,
    }
}

/// Returns the first rule that fires, or `None` when the reply passes.
/// The result is the logical OR of all fire conditions, so rule order only
/// affects which rule gets reported, not whether the reply is dropped.
pub fn should_filter<'r>(
    fields: &ReplyFields<'_>,
    rules: &'r [BounceFilterRule],
) -> Option<&'r BounceFilterRule> {
    rules.iter().find(|rule| fires(rule, fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(field: BounceField, value: &str, match_type: MatchType) -> BounceFilterRule {
        BounceFilterRule {
            id: 0,
            field,
            value: value.to_string(),
            match_type,
        }
    }

    #[test]
    fn not_contains_fires_on_substring() {
        let rules = vec![rule(
            BounceField::FromEmail,
            "mailer-daemon",
            MatchType::NotContains,
        )];
        let fields = ReplyFields {
            from_email: "mailer-daemon@bounces.example.com",
            ..Default::default()
        };
        assert!(should_filter(&fields, &rules).is_some());

        let fields = ReplyFields {
            from_email: "pat@prospect.test",
            ..Default::default()
        };
        assert!(should_filter(&fields, &rules).is_none());
    }

    #[test]
    fn not_equals_fires_on_exact_match_only() {
        let rules = vec![rule(
            BounceField::Subject,
            "Delivery Status Notification (Failure)",
            MatchType::NotEquals,
        )];
        let hit = ReplyFields {
            subject: "Delivery Status Notification (Failure)",
            ..Default::default()
        };
        assert!(should_filter(&hit, &rules).is_some());

        let near_miss = ReplyFields {
            subject: "RE: Delivery Status Notification (Failure)",
            ..Default::default()
        };
        assert!(should_filter(&near_miss, &rules).is_none());
    }

    #[test]
    fn any_firing_rule_drops_regardless_of_order() {
        let rules = vec![
            rule(BounceField::Subject, "never-matches", MatchType::NotEquals),
            rule(BounceField::Body, "this message was automatically generated", MatchType::NotContains),
        ];
        let fields = ReplyFields {
            body: "Hello, this message was automatically generated by the mail system.",
            ..Default::default()
        };
        let fired = should_filter(&fields, &rules).expect("should fire");
        assert_eq!(fired.field, BounceField::Body);
    }

    #[test]
    fn empty_rule_set_passes_everything() {
        let fields = ReplyFields {
            from_name: "Mail Delivery Subsystem",
            ..Default::default()
        };
        assert!(should_filter(&fields, &[]).is_none());
    }
}
