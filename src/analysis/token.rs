use std::cmp::Ordering;

/// A unit of text produced by analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub start_offset: u32,
    pub end_offset: u32,
    pub boost: f32,
    /// Distance from the previous token's position.
    pub pos_inc: i32,
    /// Absolute position, assigned when the inversion is inverted.
    pub pos: i32,
}

impl Token {
    pub fn new<S: Into<String>>(text: S, start_offset: u32, end_offset: u32) -> Self {
        Token {
            text: text.into(),
            start_offset,
            end_offset,
            boost: 1.0,
            pos_inc: 1,
            pos: -1,
        }
    }

    /// Order by text, then by position.
    pub fn compare(&self, other: &Token) -> Ordering {
        self.text
            .as_bytes()
            .cmp(other.text.as_bytes())
            .then(self.pos.cmp(&other.pos))
    }
}
