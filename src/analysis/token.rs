/// One analyzed word of a field value or query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Word index within the source text
    pub position: u32,
    /// Byte offset in the source text
    pub offset: usize,
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize) -> Self {
        Token { text, position, offset }
    }
}
