// src/roster.rs
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

use crate::config::GroupConfig;
use crate::webwork::{DailyTimeline, UserInfo};

/// Emails in the raw source are inconsistent in case and padding; every
/// map key in this crate goes through this first.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Per-invocation cache of email -> display name, populated from the
/// WebWork user directory. Constructed explicitly and passed by
/// reference; the scope is one report invocation.
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    names: HashMap<String, String>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_users(users: &[UserInfo]) -> Self {
        let mut names = HashMap::new();
        for user in users {
            if let Some(email) = &user.email {
                if let Some(fullname) = &user.fullname {
                    if !fullname.is_empty() {
                        names.insert(normalize_email(email), fullname.clone());
                    }
                }
            }
        }
        info!("Cached display names for {} users", names.len());
        Self { names }
    }

    /// Display name for an email, falling back to the email itself.
    pub fn name_for(&self, email: &str) -> String {
        self.names
            .get(&normalize_email(email))
            .cloned()
            .unwrap_or_else(|| email.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    pub name: String,
    /// Normalized email.
    pub email: String,
}

/// Project names each employee logged time against, keyed by normalized
/// email.
pub fn logged_projects(payload: &DailyTimeline) -> HashMap<String, HashSet<String>> {
    let mut projects: HashMap<String, HashSet<String>> = HashMap::new();
    for report in &payload.date_report {
        let Some(email) = &report.email else { continue };
        let entry = projects.entry(normalize_email(email)).or_default();
        for project in &report.projects {
            if let Some(name) = &project.project_name {
                entry.insert(name.clone());
            }
        }
    }
    projects
}

/// Resolve one group's roster from the day's payload.
///
/// Membership comes from logged project names matched against the group's
/// configured project list. The manual include list is unioned in first,
/// then the exclude list is subtracted, so exclude wins when an email is
/// in both.
pub fn resolve_group(
    payload: &DailyTimeline,
    group: &GroupConfig,
    directory: &UserDirectory,
) -> Vec<RosterMember> {
    let project_set: HashSet<&str> = group.projects.iter().map(String::as_str).collect();

    // BTreeSet keeps roster ordering deterministic across runs.
    let mut emails: BTreeSet<String> = BTreeSet::new();

    for (email, projects) in logged_projects(payload) {
        if projects.iter().any(|p| project_set.contains(p.as_str())) {
            emails.insert(email);
        }
    }

    for email in &group.include {
        emails.insert(normalize_email(email));
    }
    for email in &group.exclude {
        emails.remove(&normalize_email(email));
    }

    debug!("Resolved {} roster members", emails.len());

    emails
        .into_iter()
        .map(|email| RosterMember {
            name: directory.name_for(&email),
            email,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webwork::{MemberDayReport, ProjectReport};

    fn payload(entries: &[(&str, &[&str])]) -> DailyTimeline {
        DailyTimeline {
            date_report: entries
                .iter()
                .map(|(email, projects)| MemberDayReport {
                    email: Some(email.to_string()),
                    projects: projects
                        .iter()
                        .map(|name| ProjectReport {
                            project_name: Some(name.to_string()),
                            tasks: vec![],
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn email_normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn directory_falls_back_to_email() {
        let directory = UserDirectory::from_users(&[UserInfo {
            email: Some("Alice@Example.com".to_string()),
            fullname: Some("Alice Johnson".to_string()),
        }]);
        assert_eq!(directory.name_for("alice@example.com"), "Alice Johnson");
        assert_eq!(directory.name_for("bob@example.com"), "bob@example.com");
    }

    #[test]
    fn roster_matches_projects_and_applies_overrides() {
        let payload = payload(&[
            ("Alice@Example.com", &["Platform"]),
            ("bob@example.com", &["Helpdesk"]),
            ("carol@example.com", &["Platform", "Mobile"]),
        ]);
        let group = GroupConfig {
            projects: vec!["Platform".to_string()],
            include: vec!["Dave@Example.com".to_string()],
            exclude: vec!["carol@example.com".to_string()],
            start_time: None,
        };

        let roster = resolve_group(&payload, &group, &UserDirectory::new());
        let emails: Vec<&str> = roster.iter().map(|m| m.email.as_str()).collect();

        // Alphabetical, include unioned in, exclude removed.
        assert_eq!(emails, vec!["alice@example.com", "dave@example.com"]);
    }

    #[test]
    fn exclude_wins_over_include() {
        let payload = payload(&[]);
        let group = GroupConfig {
            projects: vec![],
            include: vec!["alice@example.com".to_string()],
            exclude: vec!["Alice@Example.com".to_string()],
            start_time: None,
        };
        assert!(resolve_group(&payload, &group, &UserDirectory::new()).is_empty());
    }
}
