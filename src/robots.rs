//! Advisory robots.txt gate.
//!
//! Before a URL is fetched, [`RobotsGate`] looks up `/robots.txt` on the URL's
//! origin and checks the path against the rules for our user-agent token.
//! The gate is advisory and fails open: an unreachable or erroring
//! robots.txt allows everything, with a warning. A 401 or 403 answer denies
//! the whole origin; any other 4xx means the site publishes no rules.
//!
//! Rule selection:
//! - the group naming our token wins over the `*` group
//! - the longest matching pattern decides, `Allow` winning ties
//! - `*` matches any run of characters, a trailing `$` anchors the end
//! - an empty `Disallow` allows everything

use crate::fetch::FetchPage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Product token matched against `User-agent` lines.
pub const AGENT_TOKEN: &str = "AwfulNewsArchive";

/// Decides whether a URL may be fetched.
pub trait PolicyGate {
    async fn allowed(&self, url: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// Parsed robots.txt.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    groups: Vec<Group>,
    deny_all: bool,
}

impl RobotsRules {
    /// No rules at all; everything is allowed.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Everything is denied, for origins that refuse access to robots.txt.
    pub fn disallow_all() -> Self {
        Self {
            groups: Vec::new(),
            deny_all: true,
        }
    }

    /// Parse a robots.txt body. Unknown directives are ignored.
    pub fn parse(body: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        // A User-agent line after rules starts a new group.
        let mut in_rules = true;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "user-agent" => {
                    if in_rules || groups.is_empty() {
                        groups.push(Group::default());
                        in_rules = false;
                    }
                    if let Some(group) = groups.last_mut() {
                        group.agents.push(value.to_ascii_lowercase());
                    }
                }
                directive @ ("allow" | "disallow") => {
                    in_rules = true;
                    // Rules before any User-agent line belong to no group.
                    let Some(group) = groups.last_mut() else {
                        continue;
                    };
                    if value.is_empty() {
                        continue;
                    }
                    group.rules.push(Rule {
                        allow: directive == "allow",
                        pattern: value.to_string(),
                    });
                }
                _ => {}
            }
        }
        Self {
            groups,
            deny_all: false,
        }
    }

    /// Whether `agent` may fetch `path` (path plus optional `?query`).
    pub fn is_allowed(&self, agent: &str, path: &str) -> bool {
        if self.deny_all {
            return false;
        }
        let rules = self.rules_for(agent);
        let best = rules
            .iter()
            .filter(|rule| pattern_matches(&rule.pattern, path))
            .max_by_key(|rule| (rule.pattern.len(), rule.allow));
        best.is_none_or(|rule| rule.allow)
    }

    /// Rules of every group naming `agent`, or of the `*` groups.
    fn rules_for(&self, agent: &str) -> Vec<&Rule> {
        let agent = agent.to_ascii_lowercase();
        let specific: Vec<&Rule> = self
            .groups
            .iter()
            .filter(|g| {
                g.agents
                    .iter()
                    .any(|a| a != "*" && !a.is_empty() && agent.contains(a.as_str()))
            })
            .flat_map(|g| g.rules.iter())
            .collect();
        if !specific.is_empty() {
            return specific;
        }
        self.groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a == "*"))
            .flat_map(|g| g.rules.iter())
            .collect()
    }
}

/// Match a robots.txt path pattern against a path.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    if !path.starts_with(first) {
        return false;
    }
    let rest: Vec<&str> = parts.collect();
    let mut pos = first.len();
    if rest.is_empty() {
        return !anchored || pos == path.len();
    }
    for (i, part) in rest.iter().enumerate() {
        if anchored && i == rest.len() - 1 {
            return path[pos..].ends_with(part);
        }
        match path[pos..].find(part) {
            Some(idx) => pos += idx + part.len(),
            None => return false,
        }
    }
    true
}

/// robots.txt gate with a per-origin cache.
#[derive(Debug)]
pub struct RobotsGate<F> {
    fetcher: F,
    agent: String,
    cache: Mutex<HashMap<String, Arc<RobotsRules>>>,
}

impl<F: FetchPage> RobotsGate<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            agent: AGENT_TOKEN.to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, origin: &str) -> Option<Arc<RobotsRules>> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(origin).cloned()
    }

    fn remember(&self, origin: String, rules: Arc<RobotsRules>) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(origin, rules);
    }

    /// Fetch and parse robots.txt for `page`'s origin, failing open.
    async fn load(&self, page: &Url) -> RobotsRules {
        let robots_url = match page.join("/robots.txt") {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "Cannot build robots.txt URL; allowing");
                return RobotsRules::allow_all();
            }
        };
        match self.fetcher.fetch(robots_url.as_str()).await {
            Ok(body) => {
                let rules = RobotsRules::parse(&body);
                debug!(url = %robots_url, groups = rules.groups.len(), "Parsed robots.txt");
                rules
            }
            Err(e) if matches!(e.status(), Some(401 | 403)) => {
                info!(url = %robots_url, error = %e, "robots.txt access refused; denying origin");
                RobotsRules::disallow_all()
            }
            Err(e) if e.status().is_some_and(|s| (400..500).contains(&s)) => {
                debug!(url = %robots_url, error = %e, "No robots.txt; allowing");
                RobotsRules::allow_all()
            }
            Err(e) => {
                warn!(url = %robots_url, error = %e, "robots.txt unreachable; allowing");
                RobotsRules::allow_all()
            }
        }
    }
}

impl<F: FetchPage> PolicyGate for RobotsGate<F> {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn allowed(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "Unparseable URL; robots check skipped");
                return true;
            }
        };
        let origin = parsed.origin().ascii_serialization();
        let rules = match self.cached(&origin) {
            Some(rules) => rules,
            None => {
                let rules = Arc::new(self.load(&parsed).await);
                self.remember(origin, Arc::clone(&rules));
                rules
            }
        };

        let path = match parsed.query() {
            Some(q) => format!("{}?{}", parsed.path(), q),
            None => parsed.path().to_string(),
        };
        let allowed = rules.is_allowed(&self.agent, &path);
        if !allowed {
            info!(%path, agent = %self.agent, "Disallowed by robots.txt");
        }
        allowed
    }
}
