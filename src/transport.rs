use std::io;
use std::io::{Read, Write};

/// payload and response size ceiling; a request announcing more is
/// clamped and the excess left unread
pub const MAX_PAYLOAD: usize = 0x1_0000;

quick_error! {
    #[derive(Debug)]
    pub enum TransportError {
        Io(err: io::Error) {
            from()
            display("i/o error: {}", err)
        }
        // the peer closed the stream mid-frame
        ShortFrame {
            display("connection closed mid-frame")
        }
    }
}

/// reads one request frame: a u32 little-endian length followed by
/// that many program bytes. the length is clamped to `MAX_PAYLOAD`.
pub fn read_request<R: Read>(r: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut header = [0u8; 4];
    read_all(r, &mut header)?;
    let announced = u32::from_le_bytes(header) as usize;
    let len = announced.min(MAX_PAYLOAD);

    let mut payload = vec![0u8; len];
    read_all(r, &mut payload)?;
    Ok(payload)
}

/// writes one response frame: a u32 little-endian length followed by
/// the captured output
pub fn write_response<W: Write>(w: &mut W, data: &[u8]) -> Result<(), TransportError> {
    let len = data.len() as u32;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(data)?;
    w.flush()?;
    Ok(())
}

fn read_all<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), TransportError> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(TransportError::ShortFrame),
        Err(e) => Err(TransportError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn round_trips_a_frame() {
        let mut wire = Vec::new();
        write_response(&mut wire, b"Hi!").unwrap();
        assert_eq!(&[3, 0, 0, 0, b'H', b'i', b'!'], wire.as_slice());

        let payload = read_request(&mut Cursor::new(wire)).unwrap();
        assert_eq!(b"Hi!", payload.as_slice());
    }

    #[test]
    fn empty_payload_is_valid() {
        let payload = read_request(&mut Cursor::new(vec![0, 0, 0, 0])).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn announced_length_is_clamped() {
        let mut wire = vec![1, 0, 2, 0]; // 0x00020001 bytes announced
        wire.extend(vec![0x90u8; MAX_PAYLOAD]);
        let payload = read_request(&mut Cursor::new(wire)).unwrap();
        assert_eq!(MAX_PAYLOAD, payload.len());
    }

    #[test]
    fn short_frame_is_an_error() {
        let err = read_request(&mut Cursor::new(vec![10, 0, 0, 0, 1, 2])).unwrap_err();
        match err {
            TransportError::ShortFrame => {}
            other => panic!("unexpected error {:?}", other),
        }
    }
}
