use bytepack::{
    ByteOrder::BigEndian, BytestreamReader, BytestreamWriter, FromBytestream, StreamReader,
    StreamWriter, ToBytestream,
};
use std::{
    io::{Error, ErrorKind, Write},
    net::Ipv4Addr,
};

use super::IpVersion;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ipv4Packet {
    pub dscp: u8,
    pub enc: u8,
    pub identification: u16,
    pub flags: Ipv4Flags,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub proto: u8,
    pub src: Ipv4Addr,
    pub dest: Ipv4Addr,
    pub content: Vec<u8>,
}

impl Ipv4Packet {
    pub const EMPTY: Ipv4Packet = Ipv4Packet {
        dscp: 0,
        enc: 0,
        identification: 0,
        flags: Ipv4Flags {
            df: false,
            mf: false,
        },
        fragment_offset: 0,
        ttl: 64,
        proto: 0,
        src: Ipv4Addr::UNSPECIFIED,
        dest: Ipv4Addr::UNSPECIFIED,
        content: Vec::new(),
    };

    #[must_use]
    pub fn reverse(&self) -> Ipv4Packet {
        Ipv4Packet {
            dscp: self.dscp,
            enc: self.enc,
            identification: self.identification,
            flags: Ipv4Flags {
                df: self.flags.df,
                mf: false,
            },
            fragment_offset: 0,
            ttl: 64,
            proto: self.proto,
            src: self.dest,
            dest: self.src,
            content: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Flags {
    pub df: bool,
    pub mf: bool,
}

impl Ipv4Flags {
    fn as_u16(self) -> u16 {
        let pat = (if self.df { 0b010u16 } else { 0u16 }) | (if self.mf { 0b100u16 } else { 0u16 });
        pat << 13u16
    }
}

impl ToBytestream for Ipv4Packet {
    type Error = std::io::Error;
    fn to_bytestream(&self, bytestream: &mut BytestreamWriter) -> Result<(), Self::Error> {
        let byte0 = 0b0100_0101u8;
        byte0.write_to(bytestream, BigEndian)?;

        let byte1 = (self.dscp << 2) | self.enc;
        byte1.write_to(bytestream, BigEndian)?;

        let len = 20 + self.content.len() as u16;
        len.write_to(bytestream, BigEndian)?;
        self.identification.write_to(bytestream, BigEndian)?;

        let fbyte = self.flags.as_u16() | self.fragment_offset;
        fbyte.write_to(bytestream, BigEndian)?;

        self.ttl.write_to(bytestream, BigEndian)?;
        self.proto.write_to(bytestream, BigEndian)?;

        // checksum validation is not owed by this layer; callers accept
        // correctly-parsed frames from the collaborator
        0u16.write_to(bytestream, BigEndian)?;

        u32::from_be_bytes(self.src.octets()).write_to(bytestream, BigEndian)?;
        u32::from_be_bytes(self.dest.octets()).write_to(bytestream, BigEndian)?;

        bytestream.write_all(&self.content)?;
        Ok(())
    }
}

impl FromBytestream for Ipv4Packet {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut BytestreamReader) -> Result<Self, Self::Error> {
        let byte0 = u8::read_from(bytestream, BigEndian)?;
        let version = byte0 >> 4;
        let _version = match version {
            4 => IpVersion::V4,
            6 => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    "ipv4 packet expected, got ipv6 version nibble",
                ))
            }
            _ => return Err(Error::new(ErrorKind::InvalidData, "unknown ip version")),
        };

        let byte1 = u8::read_from(bytestream, BigEndian)?;
        let dscp = byte1 >> 2;
        let enc = byte1 & 0x03;

        let len = u16::read_from(bytestream, BigEndian)?;
        let identification = u16::read_from(bytestream, BigEndian)?;

        let fword = u16::read_from(bytestream, BigEndian)?;
        let flags = {
            let fbyte = fword >> 13;
            Ipv4Flags {
                mf: fbyte & 0b100 != 0,
                df: fbyte & 0b010 != 0,
            }
        };
        let fragment_offset = fword & 0x1fff;

        let ttl = u8::read_from(bytestream, BigEndian)?;
        let proto = u8::read_from(bytestream, BigEndian)?;

        let _checksum = u16::read_from(bytestream, BigEndian)?;

        let src = Ipv4Addr::from(u32::read_from(bytestream, BigEndian)?);
        let dest = Ipv4Addr::from(u32::read_from(bytestream, BigEndian)?);

        let body_len = (len as usize).saturating_sub(20);
        let mut content = vec![0u8; body_len];
        std::io::Read::read_exact(bytestream, &mut content)?;

        Ok(Self {
            dscp,
            enc,
            identification,
            flags,
            fragment_offset,
            ttl,
            proto,
            src,
            dest,
            content,
        })
    }
}
