//! Minimal robots.txt evaluation.
//!
//! Supports `User-agent` groups, `Allow`/`Disallow` with `*` wildcards and a
//! trailing `$` anchor. The longest matching rule wins; on a tie `Allow`
//! wins. Groups naming our product token exactly (case-insensitive) replace
//! the `*` group, even when they carry no rules.

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// The rules that apply to one user agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    rules: Vec<Rule>,
}

impl RobotsRules {
    /// Parse a robots.txt body and keep the rules for `user_agent`.
    pub fn parse(body: &str, user_agent: &str) -> Self {
        let token = product_token(user_agent);
        let groups = parse_groups(body);

        let named: Vec<&Group> = groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| *a == token))
            .collect();
        let chosen = if named.is_empty() {
            groups.iter().filter(|g| g.agents.iter().any(|a| a == "*")).collect()
        } else {
            named
        };
        Self {
            rules: chosen.into_iter().flat_map(|g| g.rules.iter().cloned()).collect(),
        }
    }

    /// Whether `path` (path plus optional `?query`) may be fetched.
    pub fn is_allowed(&self, path: &str) -> bool {
        let mut best: Option<(usize, bool)> = None;
        for rule in &self.rules {
            if !rule_matches(&rule.pattern, path) {
                continue;
            }
            let len = rule.pattern.chars().count();
            best = match best {
                Some((best_len, best_allow)) if best_len > len || (best_len == len && best_allow) => {
                    Some((best_len, best_allow))
                }
                _ => Some((len, rule.allow)),
            };
        }
        best.is_none_or(|(_, allow)| allow)
    }
}

/// `relay-webfetch/0.3.0 (+https://…)` → `relay-webfetch`.
fn product_token(user_agent: &str) -> String {
    user_agent
        .split(['/', ' '])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn parse_groups(body: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut in_agent_run = false;

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !in_agent_run {
                    groups.push(Group::default());
                }
                in_agent_run = true;
                if let Some(group) = groups.last_mut()
                    && !value.is_empty()
                {
                    group.agents.push(value.to_ascii_lowercase());
                }
            }
            "allow" | "disallow" => {
                in_agent_run = false;
                // An empty Disallow allows everything; it adds no rule.
                if value.is_empty() {
                    continue;
                }
                if let Some(group) = groups.last_mut() {
                    group.rules.push(Rule {
                        allow: key == "allow",
                        pattern: value.to_string(),
                    });
                }
            }
            _ => in_agent_run = false,
        }
    }
    groups
}

fn rule_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };
    let mut pieces = pattern.split('*');
    let first = pieces.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };
    let pieces: Vec<&str> = pieces.collect();
    if pieces.is_empty() {
        return !anchored || rest.is_empty();
    }
    for (i, piece) in pieces.iter().enumerate() {
        if anchored && i == pieces.len() - 1 {
            return rest.ends_with(piece);
        }
        match rest.find(piece) {
            Some(pos) => rest = rest.get(pos + piece.len()..).unwrap_or_default(),
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "relay-webfetch/0.3.0";

    #[test]
    fn wildcard_group_applies_by_default() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /private/\n", UA);
        assert!(!rules.is_allowed("/private/notes"));
        assert!(rules.is_allowed("/public"));
    }

    #[test]
    fn specific_group_overrides_wildcard() {
        let body = "\
User-agent: *
Disallow: /

User-agent: relay-webfetch
Disallow: /admin
";
        let rules = RobotsRules::parse(body, UA);
        assert!(rules.is_allowed("/docs"));
        assert!(!rules.is_allowed("/admin/panel"));
    }

    #[test]
    fn longest_match_wins_and_allow_breaks_ties() {
        let body = "User-agent: *\nDisallow: /docs\nAllow: /docs/public\n";
        let rules = RobotsRules::parse(body, UA);
        assert!(!rules.is_allowed("/docs/secret"));
        assert!(rules.is_allowed("/docs/public/page"));

        let tie = RobotsRules::parse("User-agent: *\nDisallow: /a\nAllow: /a\n", UA);
        assert!(tie.is_allowed("/a"));
    }

    #[test]
    fn wildcards_and_anchors() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /*.pdf$\nDisallow: /tmp*/cache\n", UA);
        assert!(!rules.is_allowed("/files/report.pdf"));
        assert!(rules.is_allowed("/files/report.pdf?download=1"));
        assert!(!rules.is_allowed("/tmp-2024/cache/x"));
        assert!(rules.is_allowed("/tmp/other"));
    }

    #[test]
    fn empty_disallow_and_comments() {
        let body = "# hello\nUser-agent: * # everyone\nDisallow:\n";
        assert!(RobotsRules::parse(body, UA).is_allowed("/anything"));
        assert!(RobotsRules::parse("", UA).is_allowed("/"));
    }

    #[test]
    fn grouped_user_agents_share_rules() {
        let body = "User-agent: googlebot\nUser-agent: relay-webfetch\nDisallow: /x\n";
        assert!(!RobotsRules::parse(body, UA).is_allowed("/x"));
        assert!(RobotsRules::parse(body, "other-bot/1.0").is_allowed("/x"));
    }

    #[test]
    fn agents_that_are_substrings_of_our_token_do_not_apply() {
        let body = "User-agent: web\nDisallow: /\n\nUser-agent: *\nDisallow:\n";
        assert!(RobotsRules::parse(body, UA).is_allowed("/docs"));

        let body = "User-agent: fetch\nUser-agent: e\nDisallow: /\n";
        assert!(RobotsRules::parse(body, UA).is_allowed("/docs"));
    }

    #[test]
    fn empty_user_agent_names_nobody() {
        let body = "User-agent:\nDisallow: /\n\nUser-agent: *\nDisallow: /private\n";
        let rules = RobotsRules::parse(body, UA);
        assert!(rules.is_allowed("/docs"));
        assert!(!rules.is_allowed("/private/x"));
    }

    #[test]
    fn agent_names_match_case_insensitively() {
        let body = "User-agent: Relay-WebFetch\nDisallow: /beta\n";
        assert!(!RobotsRules::parse(body, UA).is_allowed("/beta"));
    }

    #[test]
    fn named_group_without_rules_still_overrides_wildcard() {
        let body = "User-agent: *\nDisallow: /\n\nUser-agent: relay-webfetch\nDisallow:\n";
        assert!(RobotsRules::parse(body, UA).is_allowed("/docs"));
    }
}
