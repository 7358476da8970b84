use crate::common::init_logger;
use serial_test::serial;
use transitcard::transport::{Connection, MockTransport, Session, Transport};
use transitcard::{Result, TagId};

#[test]
fn session_closes_on_drop() {
    let mut m = MockTransport::new(&[7]);
    m.push_response(vec![0x01]);
    {
        let mut session = Session::open(&mut m).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.transceive(&[0]).unwrap(), vec![0x01]);
    }
    assert_eq!(m.connect_calls, 1);
    assert_eq!(m.close_calls, 1);
    assert!(!m.connected);
}

#[test]
fn session_closes_on_early_return() {
    fn read(t: &mut dyn Transport) -> Result<Vec<u8>> {
        let mut session = Session::open(t)?;
        session.transceive(&[0])?;
        session.transceive(&[1])
    }
    let mut m = MockTransport::new(&[7]);
    m.push_lost();
    assert!(read(&mut m).unwrap_err().is_tag_lost());
    assert_eq!(m.close_calls, 1);
}

/// Connection whose close always fails.
struct StuckConnection {
    connected: bool,
}

impl Connection for StuckConnection {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Err(transitcard::Error::Transport("close failed".into()))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn tag_id(&self) -> TagId {
        TagId::new(&[0xaa])
    }
}

#[test]
#[serial]
fn close_failure_is_swallowed() {
    init_logger();
    let mut c = StuckConnection { connected: false };
    {
        let session = Session::open(&mut c).unwrap();
        assert_eq!(session.tag_id().as_bytes(), &[0xaa]);
    }
    assert!(c.connected);
}
