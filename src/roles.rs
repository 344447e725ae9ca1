//! Functional role parsing and the role name/ID map
//!
//! An annotation such as `Thioredoxin reductase (EC 1.8.1.9) / Peroxiredoxin # frameshift`
//! carries one or more roles. Roles are split on ` / `, ` @ ` and `; `, comments after
//! `#` are dropped, and each role gets a short stable ID the first time it is seen.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::anychar,
    combinator::{all_consuming, not, opt, recognize},
    multi::{many1, separated_list0},
    sequence::preceded,
    IResult,
};
use std::collections::HashMap;

const MAX_ID_PREFIX: usize = 8;

fn separator(input: &str) -> IResult<&str, &str> {
    alt((tag(" / "), tag(" @ "), tag("; ")))(input)
}

fn role_text(input: &str) -> IResult<&str, &str> {
    recognize(many1(preceded(not(separator), anychar)))(input)
}

/// Every segment between separators, `None` for empty ones (`A; ; B`)
fn role_list(input: &str) -> IResult<&str, Vec<Option<&str>>> {
    all_consuming(separated_list0(separator, opt(role_text)))(input)
}

/// Split an annotation into its role names, dropping comments and blank roles
pub fn parse_roles(function: &str) -> Vec<String> {
    let text = match function.find('#') {
        Some(pos) => &function[..pos],
        None => function,
    };
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let roles = match role_list(text) {
        Ok((_, roles)) => roles,
        Err(e) => {
            log::warn!("Could not split function '{text}' into roles: {e}");
            vec![Some(text)]
        }
    };
    roles
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|r| !r.is_empty() && !is_hypothetical(r))
        .map(String::from)
        .collect()
}

fn is_hypothetical(role: &str) -> bool {
    let lower = role.to_ascii_lowercase();
    lower == "hypothetical protein" || lower == "uncharacterized protein"
}

/// Strip EC/TC numbers in parentheses
fn strip_ec(role: &str) -> String {
    let mut out = String::with_capacity(role.len());
    let mut rest = role;
    while let Some(start) = rest.find('(') {
        let tail = &rest[start + 1..];
        let is_number = tail.starts_with("EC ") || tail.starts_with("TC ");
        match (is_number, tail.find(')')) {
            (true, Some(end)) => {
                out.push_str(&rest[..start]);
                rest = &tail[end + 1..];
            }
            _ => {
                out.push_str(&rest[..=start]);
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Normalized comparison key: lower case, EC/TC numbers removed, words joined by one space
pub fn normalize_role(role: &str) -> String {
    strip_ec(role)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Incrementally built map between role names and role IDs
#[derive(Debug, Default, Clone)]
pub struct RoleMap {
    key_to_id: HashMap<String, String>,
    id_to_name: HashMap<String, String>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// ID of a role, assigning a new one on first sight
    pub fn get_or_assign(&mut self, role: &str) -> String {
        let key = normalize_role(role);
        if let Some(id) = self.key_to_id.get(&key) {
            return id.clone();
        }

        let prefix = id_prefix(&key);
        let mut id = prefix.clone();
        let mut suffix = 1;
        while self.id_to_name.contains_key(&id) {
            suffix += 1;
            id = format!("{prefix}{suffix}");
        }

        self.key_to_id.insert(key, id.clone());
        self.id_to_name.insert(id.clone(), role.trim().to_string());
        id
    }

    /// ID of a known role, without assigning
    pub fn get_id(&self, role: &str) -> Option<&str> {
        self.key_to_id.get(&normalize_role(role)).map(|s| s.as_str())
    }

    /// Display name of a role ID
    pub fn name(&self, id: &str) -> Option<&str> {
        self.id_to_name.get(id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}

/// Initials of the words of a normalized role, upper-cased
fn id_prefix(key: &str) -> String {
    let prefix: String = key
        .split(' ')
        .filter_map(|w| w.chars().next())
        .take(MAX_ID_PREFIX)
        .collect::<String>()
        .to_uppercase();
    if prefix.is_empty() {
        "ROLE".to_string()
    } else {
        prefix
    }
}
