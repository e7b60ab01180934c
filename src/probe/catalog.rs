// ! Probe catalog
// !
// ! Static tables of named test cases per probe family. Each entry pairs a
// ! mutation with the description shown to the reviewer; the first entry of
// ! every family is the unmodified baseline.

use crate::probe::types::ProbeFamily;

/// Name of the comparison target in every family
pub const BASELINE: &str = "Baseline";

/// How a `redirect_uri` value is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMutation {
    /// Replace with an unrelated origin
    DifferentDomain,
    /// `https://{host}.{attacker}`
    SubdomainAttack,
    /// `//{attacker}{path}`
    ProtocolRelative,
    /// `https://{attacker}\@{host}{path}`
    UrlParsingTrick,
    /// `https://{attacker}?@{host}{path}`
    ParameterTrick,
    /// `https://` downgraded to `http://`
    HttpDowngrade,
    /// `https://{attacker}%0d%0a{host}{path}`
    CrlfInjection,
    /// `{scheme}://{host}{path}/../redirect`
    RelativePath,
    /// Original URI with a trailing `?`
    QueryAppend,
    /// Dot before the second-to-last host label turned into a literal character
    DotEscaping,
}

/// Mutation applied to the original authorization URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Send the original URL as captured
    Unchanged,
    /// Rewrite the `redirect_uri` parameter
    RedirectUri(RedirectMutation),
    /// Set a single query parameter to a fixed value
    SetParam {
        /// Parameter name
        name: &'static str,
        /// Decoded parameter value
        value: &'static str,
    },
}

/// One named test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTestCase {
    /// Name, unique within the family
    pub name: &'static str,
    /// Mutation to apply before dispatch
    pub mutation: Mutation,
    /// What the test case checks
    pub description: &'static str,
}

const fn case(
    name: &'static str,
    mutation: Mutation,
    description: &'static str,
) -> ProbeTestCase {
    ProbeTestCase {
        name,
        mutation,
        description,
    }
}

const fn redirect(
    name: &'static str,
    mutation: RedirectMutation,
    description: &'static str,
) -> ProbeTestCase {
    case(name, Mutation::RedirectUri(mutation), description)
}

const fn param(
    name: &'static str,
    key: &'static str,
    value: &'static str,
    description: &'static str,
) -> ProbeTestCase {
    case(name, Mutation::SetParam { name: key, value }, description)
}

/// Redirect-URI family, in presentation order
pub static REDIRECT_URI_CASES: &[ProbeTestCase] = &[
    case(
        BASELINE,
        Mutation::Unchanged,
        "Original request with the registered redirect_uri",
    ),
    redirect(
        "Different Domain",
        RedirectMutation::DifferentDomain,
        "redirect_uri replaced by an unrelated origin",
    ),
    redirect(
        "Subdomain Attack",
        RedirectMutation::SubdomainAttack,
        "Registered host used as a subdomain of an attacker domain",
    ),
    redirect(
        "Protocol Relative",
        RedirectMutation::ProtocolRelative,
        "Scheme-relative URI pointing at an attacker domain",
    ),
    redirect(
        "URL Parsing Trick",
        RedirectMutation::UrlParsingTrick,
        "Backslash-at confusion between attacker domain and registered host",
    ),
    redirect(
        "Parameter Trick",
        RedirectMutation::ParameterTrick,
        "Query-at confusion between attacker domain and registered host",
    ),
    redirect(
        "HTTP Downgrade",
        RedirectMutation::HttpDowngrade,
        "Registered redirect_uri served over plain http",
    ),
    redirect(
        "CRLF Injection",
        RedirectMutation::CrlfInjection,
        "Encoded CRLF between attacker domain and registered host",
    ),
    redirect(
        "Relative Path",
        RedirectMutation::RelativePath,
        "Path traversal appended to the registered redirect_uri",
    ),
    redirect(
        "Query Append",
        RedirectMutation::QueryAppend,
        "Trailing '?' appended to the registered redirect_uri",
    ),
    redirect(
        "Dot-Escaping Check",
        RedirectMutation::DotEscaping,
        "Host dot replaced by a literal character to catch unescaped regex matchers",
    ),
];

/// Parameter-acceptance family, in presentation order
pub static PARAMETER_ACCEPTANCE_CASES: &[ProbeTestCase] = &[
    case(
        BASELINE,
        Mutation::Unchanged,
        "Original request as captured",
    ),
    param(
        "response_mode=query",
        "response_mode",
        "query",
        "Authorization response delivered in the query string",
    ),
    param(
        "response_mode=web_message",
        "response_mode",
        "web_message",
        "Authorization response delivered through postMessage",
    ),
    param(
        "response_mode=fragment",
        "response_mode",
        "fragment",
        "Authorization response delivered in the URL fragment",
    ),
    param(
        "response_mode=form_post",
        "response_mode",
        "form_post",
        "Authorization response delivered by auto-submitted form",
    ),
    param(
        "prompt=consent",
        "prompt",
        "consent",
        "Consent screen forced",
    ),
    param(
        "prompt=none",
        "prompt",
        "none",
        "Silent authentication without user interaction",
    ),
    param(
        "response_type=code",
        "response_type",
        "code",
        "Authorization code flow",
    ),
    param(
        "response_type=token",
        "response_type",
        "token",
        "Implicit flow returning an access token",
    ),
    param(
        "response_type=code+id_token",
        "response_type",
        "code id_token",
        "Hybrid flow returning a code and an ID token",
    ),
];

/// Catalog for a family
pub fn cases(family: ProbeFamily) -> &'static [ProbeTestCase] {
    match family {
        ProbeFamily::RedirectUri => REDIRECT_URI_CASES,
        ProbeFamily::ParameterAcceptance => PARAMETER_ACCEPTANCE_CASES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_family_sizes() {
        assert_eq!(cases(ProbeFamily::RedirectUri).len(), 11);
        // baseline plus nine parameter variants
        assert_eq!(cases(ProbeFamily::ParameterAcceptance).len(), 10);
    }

    #[test]
    fn test_baseline_first_and_names_unique() {
        for family in [ProbeFamily::RedirectUri, ProbeFamily::ParameterAcceptance] {
            let table = cases(family);
            assert_eq!(table[0].name, BASELINE);
            assert_eq!(table[0].mutation, Mutation::Unchanged);
            assert!(table[1..].iter().all(|c| c.mutation != Mutation::Unchanged));

            let names: HashSet<&str> = table.iter().map(|c| c.name).collect();
            assert_eq!(names.len(), table.len());
        }
    }

    #[test]
    fn test_parameter_cases_cover_three_parameters() {
        let mut per_param = std::collections::HashMap::new();
        for test_case in &PARAMETER_ACCEPTANCE_CASES[1..] {
            if let Mutation::SetParam { name, .. } = test_case.mutation {
                *per_param.entry(name).or_insert(0) += 1;
            }
        }
        assert_eq!(per_param.get("response_mode"), Some(&4));
        assert_eq!(per_param.get("prompt"), Some(&2));
        assert_eq!(per_param.get("response_type"), Some(&3));
    }
}
