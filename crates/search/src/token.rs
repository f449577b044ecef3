use portal_protocol::RequestToken;

/// Per-slice source of request tokens. Tokens only grow, so a completion is
/// current exactly when it carries the last token handed out.
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenIssuer {
    last: u64,
}

impl TokenIssuer {
    pub(crate) fn issue(&mut self) -> RequestToken {
        self.last += 1;
        RequestToken::new(self.last)
    }

    /// Burn a token so every request issued so far becomes stale.
    pub(crate) fn invalidate(&mut self) {
        self.issue();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_strictly_increasing() {
        let mut issuer = TokenIssuer::default();
        let first = issuer.issue();
        issuer.invalidate();
        let third = issuer.issue();
        assert_eq!(first.get(), 1);
        assert_eq!(third.get(), 3);
        assert!(third > first);
    }
}
