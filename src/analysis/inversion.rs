//! A field's token stream, sortable into clusters of identical terms.

use crate::analysis::token::Token;
use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Default)]
pub struct Inversion {
    tokens: Vec<Token>,
    cur: usize,
    inverted: bool,
    cluster_counts: Vec<usize>,
}

impl Inversion {
    pub fn new() -> Self {
        Inversion::default()
    }

    /// An inversion seeded with one token spanning all of `text`.
    pub fn from_text(text: &str) -> Self {
        let mut inversion = Inversion::new();
        inversion.tokens.push(Token::new(text, 0, text.len() as u32));
        inversion
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn append(&mut self, token: Token) -> Result<()> {
        if self.inverted {
            return Err(IndexError::contract("Can't append tokens after inversion"));
        }
        self.tokens.push(token);
        Ok(())
    }

    /// Iterate tokens one at a time.
    pub fn next_token(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.cur)?;
        self.cur += 1;
        Some(token)
    }

    pub fn reset(&mut self) {
        self.cur = 0;
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Consume the inversion, yielding its tokens.
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Assign positions, sort by text then position, and count clusters of
    /// identical text.
    pub fn invert(&mut self) -> Result<()> {
        if self.inverted {
            return Err(IndexError::contract("Inversion has already been inverted"));
        }
        self.inverted = true;

        let mut token_pos: i32 = 0;
        for token in &mut self.tokens {
            token.pos = token_pos;
            token_pos = token_pos.checked_add(token.pos_inc).ok_or_else(|| {
                IndexError::contract(format!("Token position overflow at {}", token.pos))
            })?;
            if token_pos < token.pos {
                return Err(IndexError::contract(format!(
                    "Token positions out of order: {} {token_pos}",
                    token.pos
                )));
            }
        }

        self.tokens.sort_by(Token::compare);

        self.cluster_counts = vec![0; self.tokens.len()];
        let mut i = 0;
        while i < self.tokens.len() {
            let mut j = i + 1;
            while j < self.tokens.len() && self.tokens[j].text == self.tokens[i].text {
                j += 1;
            }
            self.cluster_counts[i] = j - i;
            i = j;
        }
        self.cur = 0;
        Ok(())
    }

    /// Every run of tokens sharing the same text, without moving the
    /// cluster cursor. Empty until the inversion has been inverted.
    pub fn clusters(&self) -> impl Iterator<Item = &[Token]> + '_ {
        let mut start = 0;
        std::iter::from_fn(move || {
            if !self.inverted || start >= self.tokens.len() {
                return None;
            }
            let count = self.cluster_counts[start];
            let cluster = &self.tokens[start..start + count];
            start += count;
            Some(cluster)
        })
    }

    /// The next run of tokens sharing the same text.
    pub fn next_cluster(&mut self) -> Result<Option<&[Token]>> {
        if self.cur == self.tokens.len() {
            return Ok(None);
        }
        if !self.inverted {
            return Err(IndexError::contract("Inversion not yet inverted"));
        }
        let count = self.cluster_counts[self.cur];
        let start = self.cur;
        self.cur += count;
        Ok(Some(&self.tokens[start..start + count]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inversion(words: &[&str]) -> Inversion {
        let mut inv = Inversion::new();
        for word in words {
            inv.append(Token::new(*word, 0, word.len() as u32)).unwrap();
        }
        inv
    }

    #[test]
    fn test_invert_clusters() {
        let mut inv = inversion(&["b", "a", "b", "c", "b"]);
        inv.invert().unwrap();

        let a = inv.next_cluster().unwrap().unwrap().to_vec();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].pos, 1);

        let b = inv.next_cluster().unwrap().unwrap().to_vec();
        let positions: Vec<i32> = b.iter().map(|t| t.pos).collect();
        assert_eq!(positions, vec![0, 2, 4]);

        assert_eq!(inv.next_cluster().unwrap().unwrap()[0].text, "c");
        assert!(inv.next_cluster().unwrap().is_none());
    }

    #[test]
    fn test_append_after_invert_is_rejected() {
        let mut inv = inversion(&["x"]);
        inv.invert().unwrap();
        assert!(inv.append(Token::new("y", 0, 1)).is_err());
        assert!(inv.invert().is_err());
    }

    #[test]
    fn test_cluster_requires_inversion() {
        let mut inv = inversion(&["x"]);
        assert!(inv.next_cluster().unwrap_err().is_contract_violation());
    }
}
