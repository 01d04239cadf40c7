use bytepack::{
    ByteOrder::BigEndian, BytestreamReader, BytestreamWriter, FromBytestream, StreamReader,
    StreamWriter, ToBytestream,
};
use std::{
    io::{Error, ErrorKind, Write},
    net::Ipv6Addr,
};

use super::IpVersion;

mod addr;
pub use addr::{Ipv6AddrExt, Ipv6AddrScope, Ipv6Prefix};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ipv6Packet {
    pub traffic_class: u8,
    pub flow_label: u32, // u20
    pub next_header: u8,
    pub hop_limit: u8,

    pub src: Ipv6Addr,
    pub dest: Ipv6Addr,

    pub content: Vec<u8>,
}

impl ToBytestream for Ipv6Packet {
    type Error = std::io::Error;
    fn to_bytestream(&self, bytestream: &mut BytestreamWriter) -> Result<(), Self::Error> {
        let header = (6 << 4) | (self.traffic_class >> 4);
        header.write_to(bytestream, BigEndian)?;

        let bytes = self.flow_label.to_be_bytes();
        let byte_0 = ((self.traffic_class & 0b1111) << 4) | bytes[1] & 0b1111;
        byte_0.write_to(bytestream, BigEndian)?;
        bytes[2].write_to(bytestream, BigEndian)?;
        bytes[3].write_to(bytestream, BigEndian)?;

        let len = self.content.len() as u16;
        len.write_to(bytestream, BigEndian)?;
        self.next_header.write_to(bytestream, BigEndian)?;
        self.hop_limit.write_to(bytestream, BigEndian)?;

        bytestream.write_all(&self.src.octets())?;
        bytestream.write_all(&self.dest.octets())?;
        bytestream.write_all(&self.content)?;
        Ok(())
    }
}

impl FromBytestream for Ipv6Packet {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut BytestreamReader) -> Result<Self, Self::Error> {
        let byte0 = u8::read_from(bytestream, BigEndian)?;
        let byte1 = u8::read_from(bytestream, BigEndian)?;
        let byte2 = u8::read_from(bytestream, BigEndian)?;
        let byte3 = u8::read_from(bytestream, BigEndian)?;

        let version = byte0 >> 4;
        let _version = match version {
            4 => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    "ipv6 packet expected, got ipv4 version nibble",
                ))
            }
            6 => IpVersion::V6,
            _ => return Err(Error::new(ErrorKind::InvalidData, "unknown ip version")),
        };

        let traffic_class = ((byte0 & 0b1111) << 4) | ((byte1 >> 4) & 0b1111);

        let f2 = byte1 & 0b1111;
        let flow_label = u32::from_be_bytes([0, f2, byte2, byte3]);

        let len = u16::read_from(bytestream, BigEndian)?;
        let next_header = u8::read_from(bytestream, BigEndian)?;
        let hop_limit = u8::read_from(bytestream, BigEndian)?;

        let mut src = [0u8; 16];
        let mut dest = [0u8; 16];
        std::io::Read::read_exact(bytestream, &mut src)?;
        std::io::Read::read_exact(bytestream, &mut dest)?;

        let src = Ipv6Addr::from(src);
        let dest = Ipv6Addr::from(dest);

        let mut content = vec![0u8; len as usize];
        std::io::Read::read_exact(bytestream, &mut content)?;

        Ok(Self {
            traffic_class,
            flow_label,
            next_header,
            hop_limit,
            src,
            dest,
            content,
        })
    }
}
