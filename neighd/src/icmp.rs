//! ICMPv4/ICMPv6 echo and error pass-through (§6, §10). Echo-reply generation
//! and error-notification semantics belong to the upper layer; the core's
//! job here is exactly the protocol dispatch, handed off via [`Notifyable`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use neigh_wire::icmpv4::{IcmpPacket, IcmpType};
use neigh_wire::icmpv6::IcmpV6Packet;

/// A decoded echo request or reply, family-agnostic.
#[derive(Debug, Clone, Copy)]
pub struct EchoHeader {
    pub identifier: u16,
    pub sequence: u16,
    pub is_reply: bool,
}

/// Events handed to the upper layer. Mirrors `PacketOutput`'s role as a
/// thin, single-purpose collaborator boundary (§6).
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    Echo {
        header: EchoHeader,
        body: Vec<u8>,
        src_ip: IpAddr,
    },
    /// Covers Destination Unreachable (1), Packet Too Big (2 / ICMPv6 only),
    /// and Time Exceeded (3 / ICMPv6 numbering; ICMPv4 reports 3 and 11
    /// respectively) — `type_code` carries the wire type value as-is so the
    /// upper layer can distinguish them without this crate re-deriving a
    /// family-specific enum.
    Unreachable { type_code: u8, src_ip: IpAddr },
}

/// Upper-layer collaborator notified of ICMP echo traffic and error
/// messages. The core never answers on its own behalf.
pub trait Notifyable: Send + Sync {
    fn notify(&self, event: NotifyEvent);
}

/// Dispatches a decoded ICMPv4 message. Only echo request/reply and
/// destination-unreachable/time-exceeded are forwarded; anything else is
/// silently ignored (ICMPv4 is input-only per §6).
pub fn on_inbound_v4(pkt: &IcmpPacket, src_ip: Ipv4Addr, notify: &dyn Notifyable) {
    let src_ip = IpAddr::V4(src_ip);
    match pkt.typ {
        IcmpType::EchoRequest { identifier, sequence } => notify.notify(NotifyEvent::Echo {
            header: EchoHeader { identifier, sequence, is_reply: false },
            body: pkt.content.clone(),
            src_ip,
        }),
        IcmpType::EchoReply { identifier, sequence } => notify.notify(NotifyEvent::Echo {
            header: EchoHeader { identifier, sequence, is_reply: true },
            body: pkt.content.clone(),
            src_ip,
        }),
        IcmpType::DestinationUnreachable { .. } => {
            notify.notify(NotifyEvent::Unreachable { type_code: 3, src_ip });
        }
        IcmpType::TimeExceeded { .. } => {
            notify.notify(NotifyEvent::Unreachable { type_code: 11, src_ip });
        }
        _ => {}
    }
}

/// Dispatches a decoded ICMPv6 message. Echo, destination-unreachable,
/// packet-too-big, and time-exceeded are forwarded; NS/NA/RA/Redirect are
/// handled by [`crate::ndp::NdStateMachine`] instead, never here.
pub fn on_inbound_v6(pkt: &IcmpV6Packet, src_ip: Ipv6Addr, notify: &dyn Notifyable) {
    let src_ip = IpAddr::V6(src_ip);
    match pkt {
        IcmpV6Packet::EchoRequest(echo) => notify.notify(NotifyEvent::Echo {
            header: EchoHeader { identifier: echo.identifier, sequence: echo.sequence_no, is_reply: false },
            body: echo.data.clone(),
            src_ip,
        }),
        IcmpV6Packet::EchoReply(echo) => notify.notify(NotifyEvent::Echo {
            header: EchoHeader { identifier: echo.identifier, sequence: echo.sequence_no, is_reply: true },
            body: echo.data.clone(),
            src_ip,
        }),
        IcmpV6Packet::DestinationUnreachable(_) => {
            notify.notify(NotifyEvent::Unreachable { type_code: 1, src_ip });
        }
        IcmpV6Packet::PacketToBig(_) => {
            notify.notify(NotifyEvent::Unreachable { type_code: 2, src_ip });
        }
        IcmpV6Packet::TimeExceeded(_) => {
            notify.notify(NotifyEvent::Unreachable { type_code: 3, src_ip });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neigh_wire::icmpv4::IcmpDestinationUnreachableCode;
    use neigh_wire::icmpv6::{IcmpV6DestinationUnreachable, IcmpV6DestinationUnreachableCode, IcmpV6Echo};
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<NotifyEvent>>);
    impl Notifyable for Recorder {
        fn notify(&self, event: NotifyEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn v4_echo_request_forwarded() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let pkt = IcmpPacket {
            typ: IcmpType::EchoRequest { identifier: 7, sequence: 1 },
            content: vec![0xaa; 4],
        };
        on_inbound_v4(&pkt, Ipv4Addr::new(10, 0, 0, 5), &recorder);
        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            NotifyEvent::Echo { header, body, .. } => {
                assert_eq!(header.identifier, 7);
                assert!(!header.is_reply);
                assert_eq!(body, &vec![0xaa; 4]);
            }
            _ => panic!("expected echo event"),
        }
    }

    #[test]
    fn v4_unreachable_maps_to_type_3() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let pkt = IcmpPacket {
            typ: IcmpType::DestinationUnreachable {
                next_hop_mtu: 0,
                code: IcmpDestinationUnreachableCode::HostUnreachable,
            },
            content: Vec::new(),
        };
        on_inbound_v4(&pkt, Ipv4Addr::new(10, 0, 0, 5), &recorder);
        match &recorder.0.lock().unwrap()[0] {
            NotifyEvent::Unreachable { type_code, .. } => assert_eq!(*type_code, 3),
            _ => panic!("expected unreachable event"),
        };
    }

    #[test]
    fn v6_echo_reply_forwarded() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let pkt = IcmpV6Packet::EchoReply(IcmpV6Echo { identifier: 1, sequence_no: 2, data: vec![1, 2, 3] });
        on_inbound_v6(&pkt, "fe80::1".parse().unwrap(), &recorder);
        match &recorder.0.lock().unwrap()[0] {
            NotifyEvent::Echo { header, .. } => assert!(header.is_reply),
            _ => panic!("expected echo event"),
        };
    }

    #[test]
    fn v6_destination_unreachable_maps_to_type_1() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let pkt = IcmpV6Packet::DestinationUnreachable(IcmpV6DestinationUnreachable {
            code: IcmpV6DestinationUnreachableCode::AddressUnreachable,
            packet: Vec::new(),
        });
        on_inbound_v6(&pkt, "fe80::1".parse().unwrap(), &recorder);
        match &recorder.0.lock().unwrap()[0] {
            NotifyEvent::Unreachable { type_code, .. } => assert_eq!(*type_code, 1),
            _ => panic!("expected unreachable event"),
        };
    }
}
