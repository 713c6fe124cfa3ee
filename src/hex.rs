/// formats bytes as an upper-case hex string, separated by spaces
pub fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes() {
        assert_eq!("0F 01 FF", hex_bytes(&[0x0F, 0x01, 0xFF]));
        assert_eq!("", hex_bytes(&[]));
    }
}
