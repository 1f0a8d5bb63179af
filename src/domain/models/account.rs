use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of agent accounts derived for every session
pub const AGENT_ACCOUNTS: u8 = 5;

/// Logical role of a named account
///
/// Role order is fixed: derivation indices are assigned from it, so the
/// role-to-address mapping stays stable across runs for the same seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AccountRole {
    Deployer,
    Treasury,
    /// 1-based agent account
    Agent(u8),
    PauseAdmin,
}

impl AccountRole {
    /// Every role in derivation order
    pub fn all() -> Vec<Self> {
        let mut roles = vec![Self::Deployer, Self::Treasury];
        roles.extend((1..=AGENT_ACCOUNTS).map(Self::Agent));
        roles.push(Self::PauseAdmin);
        roles
    }

    /// Address index in `m/44'/118'/0'/0/<index>`
    pub const fn derivation_index(self) -> u32 {
        match self {
            Self::Deployer => 0,
            Self::Treasury => 1,
            Self::Agent(n) => 1 + n as u32,
            Self::PauseAdmin => 2 + AGENT_ACCOUNTS as u32,
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployer => write!(f, "deployer"),
            Self::Treasury => write!(f, "treasury"),
            Self::Agent(n) => write!(f, "agent{n}"),
            Self::PauseAdmin => write!(f, "pause_admin"),
        }
    }
}

impl FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deployer" => Ok(Self::Deployer),
            "treasury" => Ok(Self::Treasury),
            "pause_admin" => Ok(Self::PauseAdmin),
            other => other
                .strip_prefix("agent")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=AGENT_ACCOUNTS).contains(n))
                .map(Self::Agent)
                .ok_or_else(|| format!("Invalid account role: {s}")),
        }
    }
}

impl From<AccountRole> for String {
    fn from(role: AccountRole) -> Self {
        role.to_string()
    }
}

impl TryFrom<String> for AccountRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Role to address mapping of one network session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBook {
    entries: Vec<(AccountRole, String)>,
}

impl AccountBook {
    /// Build a book from `(role, address)` pairs; entries are kept in role order
    /// and a later duplicate role replaces an earlier one.
    pub fn new(entries: impl IntoIterator<Item = (AccountRole, String)>) -> Self {
        let mut book: Vec<(AccountRole, String)> = Vec::new();
        for (role, address) in entries {
            match book.iter_mut().find(|(r, _)| *r == role) {
                Some(slot) => slot.1 = address,
                None => book.push((role, address)),
            }
        }
        book.sort_by_key(|(role, _)| *role);
        Self { entries: book }
    }

    pub fn address(&self, role: AccountRole) -> Option<&str> {
        self.entries
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, address)| address.as_str())
    }

    /// Deployer address; empty when the book was built without one
    pub fn deployer(&self) -> &str {
        self.address(AccountRole::Deployer).unwrap_or_default()
    }

    /// Role owning `address`, if it belongs to this session
    pub fn role_of(&self, address: &str) -> Option<AccountRole> {
        self.entries
            .iter()
            .find(|(_, a)| a == address)
            .map(|(role, _)| *role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AccountRole, &str)> {
        self.entries
            .iter()
            .map(|(role, address)| (*role, address.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
