use std::fs::File;
use std::io;
use std::io::Read;

/// reads a program binary from disk
pub fn read_binary(path: &str) -> Result<Vec<u8>, io::Error> {
    let mut f = File::open(path)?;
    let mut data = Vec::new();
    f.read_to_end(&mut data)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_a_file_back() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0xB8, 0x01, 0x00, 0xF4]).unwrap();
        let data = read_binary(f.path().to_str().unwrap()).unwrap();
        assert_eq!(vec![0xB8, 0x01, 0x00, 0xF4], data);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_binary("/no/such/file.com").is_err());
    }
}
