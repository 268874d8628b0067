/// A stretch of field text which matched part of a query, in byte offsets
/// into the original value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub offset: i32,
    pub length: i32,
    pub weight: f32,
}

impl Span {
    pub fn new(offset: i32, length: i32, weight: f32) -> Self {
        Span {
            offset,
            length,
            weight,
        }
    }

    pub fn end(&self) -> i32 {
        self.offset + self.length
    }
}
