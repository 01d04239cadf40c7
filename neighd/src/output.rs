//! `OutputPort` (§4.7): the frame-write capability and the Ethernet/802.1Q
//! framing helper built on top of it.

use neigh_wire::mac::MacAddress;
use tracing::warn;

use crate::error::CoreResult;

pub const ETHERTYPE_VLAN: u16 = 0x8100;

/// Collaborator capability: write a fully-framed Ethernet buffer. Grounded
/// on `Notifyable`'s sibling role in §6 — a thin, fallible, single-method
/// boundary the core calls into and never implements itself.
pub trait PacketOutput: Send + Sync {
    fn write(&self, bytes: &[u8]) -> CoreResult<()>;
}

/// Wraps an L3 payload in an Ethernet II header, with an optional 802.1Q tag.
#[must_use]
pub fn frame(dst: MacAddress, src: MacAddress, vlan: Option<u16>, ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(14 + vlan.map_or(0, |_| 4) + payload.len());
    buf.extend_from_slice(dst.as_slice());
    buf.extend_from_slice(src.as_slice());
    if let Some(vlan_id) = vlan {
        buf.extend_from_slice(&ETHERTYPE_VLAN.to_be_bytes());
        buf.extend_from_slice(&vlan_id.to_be_bytes());
    }
    buf.extend_from_slice(&ethertype.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Frames and writes a single L3 payload.
pub fn send_one(
    output: &dyn PacketOutput,
    dst: MacAddress,
    src: MacAddress,
    vlan: Option<u16>,
    ethertype: u16,
    payload: &[u8],
) -> CoreResult<()> {
    output.write(&frame(dst, src, vlan, ethertype, payload))
}

/// Drains a pending-frame queue (already-serialized L3 payloads) to a single
/// destination. Per-frame errors are logged and do not abort the drain
/// (§7's "interior errors in pending-queue drain are per-frame").
pub fn drain_pending(
    output: &dyn PacketOutput,
    dst: MacAddress,
    src: MacAddress,
    vlan: Option<u16>,
    ethertype: u16,
    pending: Vec<Vec<u8>>,
) {
    for payload in pending {
        if let Err(err) = send_one(output, dst, src, vlan, ethertype, &payload) {
            warn!(%err, "failed to send drained pending frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<Vec<u8>>>);

    impl PacketOutput for Recorder {
        fn write(&self, bytes: &[u8]) -> CoreResult<()> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn frame_without_vlan_is_14_byte_header() {
        let dst = MacAddress::from([1, 1, 1, 1, 1, 1]);
        let src = MacAddress::from([2, 2, 2, 2, 2, 2]);
        let framed = frame(dst, src, None, 0x0800, &[9, 9]);
        assert_eq!(framed.len(), 16);
        assert_eq!(&framed[0..6], dst.as_slice());
        assert_eq!(&framed[6..12], src.as_slice());
        assert_eq!(&framed[12..14], &0x0800u16.to_be_bytes());
    }

    #[test]
    fn frame_with_vlan_inserts_tag() {
        let dst = MacAddress::from([1, 1, 1, 1, 1, 1]);
        let src = MacAddress::from([2, 2, 2, 2, 2, 2]);
        let framed = frame(dst, src, Some(42), 0x0806, &[]);
        assert_eq!(framed.len(), 18);
        assert_eq!(&framed[12..14], &ETHERTYPE_VLAN.to_be_bytes());
        assert_eq!(&framed[14..16], &42u16.to_be_bytes());
    }

    #[test]
    fn drain_pending_sends_every_frame_even_after_error() {
        struct Flaky(Mutex<usize>);
        impl PacketOutput for Flaky {
            fn write(&self, _bytes: &[u8]) -> CoreResult<()> {
                let mut calls = self.0.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    Err(crate::error::CoreError::NoGateway)
                } else {
                    Ok(())
                }
            }
        }
        let output = Flaky(Mutex::new(0));
        let dst = MacAddress::BROADCAST;
        let src = MacAddress::from([2, 2, 2, 2, 2, 2]);
        drain_pending(&output, dst, src, None, 0x0800, vec![vec![1], vec![2], vec![3]]);
        assert_eq!(*output.0.lock().unwrap(), 3);
    }
}
