//! Per-card load state.

use std::time::Instant;

/// Lifecycle of one dashboard card's data.
///
/// Every card renders all four states independently; one failing query never
/// takes down the rest of the dashboard.
#[derive(Debug, Clone)]
pub enum CardState<T> {
    /// Nothing requested yet (no session or no selected client).
    Idle,
    Loading,
    Ready { data: T, fetched_at: Instant },
    Failed(String),
}

impl<T> CardState<T> {
    pub fn ready(data: T) -> Self {
        Self::Ready {
            data,
            fetched_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn apply(&mut self, result: Result<T, String>) {
        *self = match result {
            Ok(data) => Self::ready(data),
            Err(message) => Self::Failed(message),
        };
    }
}

impl<T> Default for CardState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::CardState;

    #[test]
    fn apply_transitions() {
        let mut card: CardState<u32> = CardState::Loading;
        card.apply(Ok(7));
        assert_eq!(card.data(), Some(&7));
        assert!(card.error().is_none());

        card.apply(Err("backend down".to_string()));
        assert_eq!(card.data(), None);
        assert_eq!(card.error(), Some("backend down"));
    }

    #[test]
    fn default_is_idle() {
        let card: CardState<u32> = CardState::default();
        assert!(matches!(card, CardState::Idle));
        assert!(!card.is_loading());
    }
}
