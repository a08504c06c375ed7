/// Number of bytes needed to pad n out to a four byte boundary.
pub fn word_padding(n: usize) -> usize {
    (4 - n % 4) % 4
}
