//! Company-code inference for untracked replies.
//!
//! Builds a lowercase blob of domain + redirect URL + body and tests each
//! rule's regex against it, in priority order. Only one domain-to-code
//! decision is made per event, so overlapping patterns across codes are
//! disambiguated purely by rule ordering.

use store::CompanyCodeRule;

/// Sentinel code when no rule matches.
pub const UNMATCHED_CODE: &str = "N/A";

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub code: String,
    /// Lowercased domain of the prospect's reply address.
    pub domain: String,
}

/// Resolves a company code from the prospect's address, the reply body and
/// the resolved redirect URL. `rules` must already be in evaluation order
/// (priority descending); the first match wins. Unparseable patterns are
/// skipped without failing the event.
pub fn resolve_company_code(
    from_email: &str,
    body: &str,
    redirect_url: &str,
    rules: &[CompanyCodeRule],
) -> Resolution {
    let domain = from_email
        .split('@')
        .nth(1)
        .unwrap_or("")
        .to_lowercase();
    let blob = format!("{domain} {redirect_url} {body}").to_lowercase();

    for rule in rules {
        let pattern = match regex::Regex::new(&rule.pattern) {
            Ok(pattern) => pattern,
            Err(error) => {
                tracing::warn!(
                    rule_id = rule.id,
                    code = %rule.code,
                    %error,
                    "skipping company-code rule with invalid pattern"
                );
                continue;
            }
        };
        if pattern.is_match(&blob) {
            return Resolution {
                code: rule.code.clone(),
                domain,
            };
        }
    }

    Resolution {
        code: UNMATCHED_CODE.to_string(),
        domain,
    }
}
