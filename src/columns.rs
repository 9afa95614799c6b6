//! Header column resolution.
//!
//! Each [`Role`] is resolved to at most one header index by trying, in order:
//! an exact match on the user's override, a substring match on the override,
//! then the role's built-in alias set. Matching is case-insensitive against
//! the trimmed, lowercased header.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Email,
    Name,
    First,
    Last,
    Breach,
}

impl Role {
    /// Built-in header synonyms for this role.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Role::Email => &["email", "email_address", "e-mail", "mail", "addr", "address_email"],
            Role::Name => &["name", "full_name", "fullname", "display_name"],
            Role::First => &["first_name", "firstname", "given_name", "givenname", "first"],
            Role::Last => &[
                "last_name",
                "lastname",
                "surname",
                "family_name",
                "familyname",
                "last",
            ],
            Role::Breach => &["breach", "source", "database", "breach_name"],
        }
    }
}

/// User-supplied header names, one per role.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub email: Option<String>,
    pub name: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
    pub breach: Option<String>,
}

impl Overrides {
    pub fn get(&self, role: Role) -> Option<&str> {
        let v = match role {
            Role::Email => &self.email,
            Role::Name => &self.name,
            Role::First => &self.first,
            Role::Last => &self.last,
            Role::Breach => &self.breach,
        };
        v.as_deref().filter(|s| !s.is_empty())
    }
}

/// Resolved role-to-index mapping for one header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub email: Option<usize>,
    pub name: Option<usize>,
    pub first: Option<usize>,
    pub last: Option<usize>,
    pub breach: Option<usize>,
}

impl ColumnMap {
    /// Resolve every role against `header`.
    pub fn resolve<S: AsRef<str>>(header: &[S], overrides: &Overrides) -> Self {
        let lowered: Vec<String> = header
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();
        let pick = |role| choose_column(&lowered, role, overrides.get(role));
        Self {
            email: pick(Role::Email),
            name: pick(Role::Name),
            first: pick(Role::First),
            last: pick(Role::Last),
            breach: pick(Role::Breach),
        }
    }
}

type Matcher = fn(&str, &str) -> bool;

fn exact(header: &str, wanted: &str) -> bool {
    header == wanted
}

fn substring(header: &str, wanted: &str) -> bool {
    header.contains(wanted)
}

/// Run the priority chain for a single role over an already lowercased header.
pub fn choose_column(header_lower: &[String], role: Role, explicit: Option<&str>) -> Option<usize> {
    if let Some(explicit) = explicit {
        let wanted = explicit.to_lowercase();
        for matcher in [exact as Matcher, substring] {
            if let Some(i) = header_lower.iter().position(|h| matcher(h, &wanted)) {
                return Some(i);
            }
        }
    }
    let aliases = role.aliases();
    header_lower
        .iter()
        .position(|h| aliases.contains(&h.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_lowercase()).collect()
    }

    #[test]
    fn resolves_aliases_case_insensitively() {
        let map = ColumnMap::resolve(
            &[" Email_Address ", "First", "SURNAME", "Database", "notes"],
            &Overrides::default(),
        );
        assert_eq!(map.email, Some(0));
        assert_eq!(map.first, Some(1));
        assert_eq!(map.last, Some(2));
        assert_eq!(map.breach, Some(3));
        assert_eq!(map.name, None);
    }

    #[test]
    fn explicit_exact_beats_substring() {
        let h = lower(&["work_mail", "mail"]);
        assert_eq!(choose_column(&h, Role::Email, Some("MAIL")), Some(1));
    }

    #[test]
    fn explicit_substring_beats_alias() {
        let h = lower(&["email", "contact_addr_primary"]);
        assert_eq!(choose_column(&h, Role::Email, Some("addr_primary")), Some(1));
    }

    #[test]
    fn unmatched_override_falls_through_to_aliases() {
        let h = lower(&["x", "email"]);
        assert_eq!(choose_column(&h, Role::Email, Some("nope")), Some(1));
    }

    #[test]
    fn aliases_are_exact_only() {
        let h = lower(&["emails_seen", "username"]);
        assert_eq!(choose_column(&h, Role::Email, None), None);
        assert_eq!(choose_column(&h, Role::Name, None), None);
    }

    #[test]
    fn first_matching_index_wins() {
        let h = lower(&["source", "breach"]);
        assert_eq!(choose_column(&h, Role::Breach, None), Some(0));
    }

    #[test]
    fn empty_header_resolves_nothing() {
        let map = ColumnMap::resolve::<&str>(&[], &Overrides::default());
        assert_eq!(map, ColumnMap::default());
    }
}
