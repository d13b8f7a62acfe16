//! Client accounts and role gating.

use serde::{Deserialize, Deserializer, Serialize};

/// An accounting tenant the signed-in user is allowed to view.
///
/// Rows come from the `my_clients` widget. The backend already applies
/// row-level access control; the client only decides presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAccount {
    /// Arrives as either a string or a number depending on the view.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ClientAccount {
    /// Human label, falling back through the naming chain the backend may
    /// leave partially filled.
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.code.as_deref())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Client {}", self.id))
    }

    /// The code used to key every per-client query; falls back to the id
    /// for accounts without one.
    #[must_use]
    pub fn effective_code(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.id)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

/// Visibility role of the signed-in user.
///
/// There is no role claim in the token; the backend expresses access purely
/// through which client accounts it returns. Seeing more than one account is
/// what distinguishes an advisor from a single-company client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Advisory staff: may switch between clients and see admin surfaces.
    Advisor,
    /// A single company's user: locked to their own account.
    Client,
}

impl Role {
    #[must_use]
    pub fn from_account_count(count: usize) -> Self {
        if count > 1 { Self::Advisor } else { Self::Client }
    }

    /// Whether the client selector and admin-only pages are visible.
    #[must_use]
    pub const fn can_switch_client(self) -> bool {
        matches!(self, Self::Advisor)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientAccount, Role};

    fn account(json: serde_json::Value) -> ClientAccount {
        serde_json::from_value(json).expect("account")
    }

    #[test]
    fn label_prefers_display_name() {
        let acc = account(serde_json::json!({
            "id": "7", "code": "CLIENT_007", "name": "Acme SL", "display_name": "Acme"
        }));
        assert_eq!(acc.label(), "Acme");
    }

    #[test]
    fn label_falls_back_through_chain() {
        let acc = account(serde_json::json!({ "id": "7", "code": "CLIENT_007", "name": "Acme SL" }));
        assert_eq!(acc.label(), "Acme SL");

        let acc = account(serde_json::json!({ "id": "7", "code": "CLIENT_007" }));
        assert_eq!(acc.label(), "CLIENT_007");

        let acc = account(serde_json::json!({ "id": "7" }));
        assert_eq!(acc.label(), "Client 7");
    }

    #[test]
    fn numeric_id_accepted() {
        let acc = account(serde_json::json!({ "id": 42 }));
        assert_eq!(acc.id, "42");
        assert_eq!(acc.effective_code(), "42");
    }

    #[test]
    fn role_from_account_count() {
        assert_eq!(Role::from_account_count(0), Role::Client);
        assert_eq!(Role::from_account_count(1), Role::Client);
        assert_eq!(Role::from_account_count(2), Role::Advisor);
        assert_eq!(Role::from_account_count(14), Role::Advisor);
    }

    #[test]
    fn only_advisor_switches_clients() {
        assert!(Role::Advisor.can_switch_client());
        assert!(!Role::Client.can_switch_client());
    }
}
