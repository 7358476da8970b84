// transitcard-rs/transitcard/src/transport/session.rs

use crate::transport::traits::Connection;
use crate::Result;
use std::ops::{Deref, DerefMut};

/// Scoped connection: connects on [`Session::open`] and always closes on drop,
/// including when the acquisition returns early with an error.
pub struct Session<'a, C: Connection + ?Sized> {
    conn: &'a mut C,
}

impl<'a, C: Connection + ?Sized> Session<'a, C> {
    pub fn open(conn: &'a mut C) -> Result<Self> {
        conn.connect()?;
        log::debug!("session opened for tag {}", conn.tag_id().to_hex());
        Ok(Self { conn })
    }
}

impl<C: Connection + ?Sized> Deref for Session<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn
    }
}

impl<C: Connection + ?Sized> DerefMut for Session<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn
    }
}

impl<C: Connection + ?Sized> Drop for Session<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.close() {
            log::warn!("failed to close card connection: {}", e);
        } else {
            log::debug!("session closed");
        }
    }
}
