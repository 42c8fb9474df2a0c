// MIT License - Copyright (c) 2024 paradox-link contributors

//! Frame catalog: the set of known fixed-layout binary messages, their
//! dispatch rules, and their checksum contract.
//!
//! Every catalog frame is [`FRAME_LEN`] bytes on the wire: 36 field bytes in
//! a fixed layout followed by a single checksum byte computed over the field
//! bytes. Multi-byte integers are big-endian.

use bitflags::bitflags;

use crate::constants::{
    CommunicationSource, FIELDS_LEN, FRAME_LEN, ProductId, Talker, modular_checksum,
};
use crate::error::{PanelError, Result};

/// Checksum function applied to the 36 field bytes of every frame.
/// The algorithm is supplied by the caller; see
/// [`modular_checksum`](crate::constants::modular_checksum) for the stock one.
pub type ChecksumFn = fn(&[u8]) -> u8;

/// A version triple as several frames carry it (protocol, application,
/// firmware).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirmwareVersion {
    pub version: u8,
    pub revision: u8,
    pub build: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareVersion {
    pub version: u8,
    pub revision: u8,
}

/// Bootloader identification, including its build date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootloaderVersion {
    pub version: u8,
    pub revision: u8,
    pub build: u8,
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

bitflags! {
    /// Session status nibble in the low half of a
    /// [`StartCommunicationResponse`] command byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SessionStatus: u8 {
        const RESERVED                = 0b1000;
        const ALARM_REPORTING_PENDING = 0b0100;
        const WINLOAD_CONNECTED       = 0b0010;
        const NEWARE_CONNECTED        = 0b0001;
    }
}

bitflags! {
    /// Transceiver status byte. The upper six bits are reserved by the
    /// protocol and round-trip unchanged via `from_bits_retain`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransceiverStatus: u8 {
        const NOISE_FLOOR_HIGH = 0b10;
        const CONSTANT_CARRIER = 0b01;
    }
}

/// Wireless transceiver block of a [`StartCommunicationResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transceiver {
    pub firmware_build: u8,
    pub family: u8,
    pub firmware_version: u8,
    pub firmware_revision: u8,
    pub noise_floor_level: u8,
    pub status: TransceiverStatus,
    pub hardware_revision: u8,
}

/// Session-negotiation probe. Carries no variable fields: command nibble 7,
/// reserved nibble 2, then padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitiateCommunication;

/// The panel's answer to [`InitiateCommunication`]: a full identity block
/// (protocol/application/bootloader versions, serial number, product family).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitiateCommunicationResponse {
    /// Low nibble of the command byte.
    pub message_center: u8,
    pub protocol_id: u8,
    pub protocol: FirmwareVersion,
    pub family_id: u8,
    pub product_id: ProductId,
    pub talker: Talker,
    pub application: FirmwareVersion,
    pub serial_number: [u8; 4],
    pub hardware: HardwareVersion,
    pub bootloader: BootloaderVersion,
    pub processor_id: u8,
    pub encryption_id: u8,
    pub label: [u8; 8],
}

/// Session-open request (command byte 0x5F, validation byte 0x20).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCommunication {
    pub source_id: CommunicationSource,
    pub user_id_high: u8,
    pub user_id_low: u8,
}

impl Default for StartCommunication {
    fn default() -> Self {
        Self {
            source_id: CommunicationSource::WinloadDirect,
            user_id_high: 0,
            user_id_low: 0,
        }
    }
}

/// The panel's answer to [`StartCommunication`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartCommunicationResponse {
    pub status: SessionStatus,
    pub product_id: ProductId,
    pub firmware: FirmwareVersion,
    pub panel_id: u16,
    pub transceiver: Transceiver,
}

/// Request to read a block of panel non-volatile memory.
/// Built via catalog name lookup ("ReadEEPROM"), never decoded off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadEeprom {
    pub address: u16,
    pub length: u8,
}

/// Memory-read reply: echoes the address read and carries a 32-byte block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadEepromResponse {
    /// Low nibble of the command byte.
    pub status: u8,
    pub address: u16,
    pub data: [u8; 32],
}

impl Default for ReadEepromResponse {
    fn default() -> Self {
        Self {
            status: 0,
            address: 0,
            data: [0; 32],
        }
    }
}

/// One complete, validated protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    InitiateCommunication(InitiateCommunication),
    InitiateCommunicationResponse(InitiateCommunicationResponse),
    StartCommunication(StartCommunication),
    StartCommunicationResponse(StartCommunicationResponse),
    ReadEeprom(ReadEeprom),
    ReadEepromResponse(ReadEepromResponse),
}

impl Frame {
    /// The catalog name of this frame's message type.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::InitiateCommunication(_) => FrameKind::InitiateCommunication,
            Frame::InitiateCommunicationResponse(_) => FrameKind::InitiateCommunicationResponse,
            Frame::StartCommunication(_) => FrameKind::StartCommunication,
            Frame::StartCommunicationResponse(_) => FrameKind::StartCommunicationResponse,
            Frame::ReadEeprom(_) => FrameKind::ReadEeprom,
            Frame::ReadEepromResponse(_) => FrameKind::ReadEepromResponse,
        }
    }

    /// Protocol command tag used for reply-expectation matching by the
    /// request/reply transport (e.g. a memory-read reply is tag 0x05).
    pub fn command_tag(&self) -> u8 {
        self.kind().command_tag()
    }
}

/// The closed set of message types the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    InitiateCommunication,
    InitiateCommunicationResponse,
    StartCommunication,
    StartCommunicationResponse,
    ReadEeprom,
    ReadEepromResponse,
}

impl FrameKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitiateCommunication => "InitiateCommunication",
            Self::InitiateCommunicationResponse => "InitiateCommunicationResponse",
            Self::StartCommunication => "StartCommunication",
            Self::StartCommunicationResponse => "StartCommunicationResponse",
            Self::ReadEeprom => "ReadEEPROM",
            Self::ReadEepromResponse => "ReadEEPROMResponse",
        }
    }

    pub fn command_tag(&self) -> u8 {
        match self {
            Self::InitiateCommunication | Self::InitiateCommunicationResponse => 0x07,
            Self::StartCommunication => 0x5F,
            Self::StartCommunicationResponse => 0x00,
            Self::ReadEeprom => 0x50,
            Self::ReadEepromResponse => 0x05,
        }
    }
}

/// Field values for requests built by catalog name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestArgs {
    pub address: u16,
    pub length: u8,
}

/// A message type resolved by name, for request construction.
#[derive(Debug, Clone, Copy)]
pub struct FrameDescriptor {
    pub name: &'static str,
    pub kind: FrameKind,
    /// Command tag of the reply this request pairs with, if any.
    pub reply_tag: Option<u8>,
}

impl FrameDescriptor {
    /// Build a request frame from this descriptor and the given field values.
    ///
    /// Only argument-taking request types can be built this way; resolving a
    /// response type (or an argument-less request) is an
    /// [`UnbuildableRequest`](crate::error::PanelError::UnbuildableRequest).
    pub fn build_request(&self, args: RequestArgs) -> Result<Frame> {
        match self.kind {
            FrameKind::ReadEeprom => Ok(Frame::ReadEeprom(ReadEeprom {
                address: args.address,
                length: args.length,
            })),
            _ => Err(PanelError::UnbuildableRequest { name: self.name }),
        }
    }
}

/// Descriptor table, one entry per catalog message. Populated once and never
/// mutated; one catalog instance per panel family.
static DESCRIPTORS: [FrameDescriptor; 6] = [
    FrameDescriptor {
        name: "InitiateCommunication",
        kind: FrameKind::InitiateCommunication,
        reply_tag: Some(0x07),
    },
    FrameDescriptor {
        name: "InitiateCommunicationResponse",
        kind: FrameKind::InitiateCommunicationResponse,
        reply_tag: None,
    },
    FrameDescriptor {
        name: "StartCommunication",
        kind: FrameKind::StartCommunication,
        reply_tag: Some(0x00),
    },
    FrameDescriptor {
        name: "StartCommunicationResponse",
        kind: FrameKind::StartCommunicationResponse,
        reply_tag: None,
    },
    FrameDescriptor {
        name: "ReadEEPROM",
        kind: FrameKind::ReadEeprom,
        reply_tag: Some(0x05),
    },
    FrameDescriptor {
        name: "ReadEEPROMResponse",
        kind: FrameKind::ReadEepromResponse,
        reply_tag: None,
    },
];

/// Recognizes, validates and decodes/encodes the catalog's frames.
///
/// The checksum algorithm is injected at construction so one catalog can be
/// built per panel family.
pub struct FrameCatalog {
    checksum: ChecksumFn,
}

impl Default for FrameCatalog {
    fn default() -> Self {
        Self::new(modular_checksum)
    }
}

impl FrameCatalog {
    pub fn new(checksum: ChecksumFn) -> Self {
        Self { checksum }
    }

    /// Resolve a message type by its catalog name.
    pub fn lookup_by_name(&self, name: &str) -> Result<&'static FrameDescriptor> {
        DESCRIPTORS
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| PanelError::UnknownMessage {
                name: name.to_string(),
            })
    }

    /// Decode a frame from raw transport bytes.
    ///
    /// Returns `Ok(None)` for an empty buffer or a leading-byte pattern not
    /// in the catalog: unrecognized traffic is ignored, not an error. A
    /// buffer that *does* match a catalog shape must carry a full frame with
    /// a valid trailing checksum, or decoding fails hard.
    ///
    /// Dispatch is evaluated in order on the first bytes:
    /// `72 00` / `72 FF` for the initiate pair, `5F` for the session-open
    /// request, command nibble 0 with a nonzero product byte for its
    /// response, and command nibble 5 for memory-read replies.
    pub fn decode(&self, bytes: &[u8]) -> Result<Option<Frame>> {
        if bytes.is_empty() {
            return Ok(None);
        }

        let kind = match bytes[0] {
            0x72 if bytes.get(1) == Some(&0x00) => FrameKind::InitiateCommunication,
            0x72 if bytes.get(1) == Some(&0xFF) => FrameKind::InitiateCommunicationResponse,
            0x5F => FrameKind::StartCommunication,
            b if b >> 4 == 0x0 && bytes.get(4).is_some_and(|&p| p > 0) => {
                FrameKind::StartCommunicationResponse
            }
            b if b >> 4 == 0x5 => FrameKind::ReadEepromResponse,
            _ => return Ok(None),
        };

        let fields = self.validate(bytes)?;
        let frame = match kind {
            FrameKind::InitiateCommunication => {
                Frame::InitiateCommunication(InitiateCommunication)
            }
            FrameKind::InitiateCommunicationResponse => Frame::InitiateCommunicationResponse(
                decode_initiate_communication_response(fields),
            ),
            FrameKind::StartCommunication => {
                Frame::StartCommunication(decode_start_communication(fields))
            }
            FrameKind::StartCommunicationResponse => Frame::StartCommunicationResponse(
                decode_start_communication_response(fields),
            ),
            FrameKind::ReadEepromResponse => {
                Frame::ReadEepromResponse(decode_read_eeprom_response(fields))
            }
            // Requests are built by name, never dispatched off the wire.
            FrameKind::ReadEeprom => unreachable!("not a wire-dispatched kind"),
        };
        Ok(Some(frame))
    }

    /// Serialize a frame into its fixed layout and append the checksum.
    pub fn encode(&self, frame: &Frame) -> Vec<u8> {
        let mut fields = [0u8; FIELDS_LEN];
        match frame {
            Frame::InitiateCommunication(_) => {
                // Command nibble 7, reserved nibble 2; the rest is padding.
                fields[0] = 0x72;
            }
            Frame::InitiateCommunicationResponse(f) => {
                encode_initiate_communication_response(f, &mut fields)
            }
            Frame::StartCommunication(f) => encode_start_communication(f, &mut fields),
            Frame::StartCommunicationResponse(f) => {
                encode_start_communication_response(f, &mut fields)
            }
            Frame::ReadEeprom(f) => encode_read_eeprom(f, &mut fields),
            Frame::ReadEepromResponse(f) => encode_read_eeprom_response(f, &mut fields),
        }

        let mut out = fields.to_vec();
        out.push((self.checksum)(&fields));
        out
    }

    /// Check length and trailing checksum, returning the field bytes.
    fn validate<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8]> {
        let frame = bytes.get(..FRAME_LEN).ok_or(PanelError::ShortFrame {
            needed: FRAME_LEN,
            got: bytes.len(),
        })?;
        let fields = &frame[..FIELDS_LEN];
        let expected = (self.checksum)(fields);
        let got = frame[FIELDS_LEN];
        if expected != got {
            return Err(PanelError::ChecksumMismatch { expected, got });
        }
        Ok(fields)
    }
}

fn decode_initiate_communication_response(b: &[u8]) -> InitiateCommunicationResponse {
    InitiateCommunicationResponse {
        message_center: b[0] & 0x0F,
        protocol_id: b[2],
        protocol: FirmwareVersion {
            version: b[3],
            revision: b[4],
            build: b[5],
        },
        family_id: b[6],
        product_id: ProductId::from_u8(b[7]),
        talker: Talker::from_u8(b[8]),
        application: FirmwareVersion {
            version: b[9],
            revision: b[10],
            build: b[11],
        },
        serial_number: [b[12], b[13], b[14], b[15]],
        hardware: HardwareVersion {
            version: b[16],
            revision: b[17],
        },
        bootloader: BootloaderVersion {
            version: b[18],
            revision: b[19],
            build: b[20],
            day: b[21],
            month: b[22],
            year: b[23],
        },
        processor_id: b[24],
        encryption_id: b[25],
        label: [b[28], b[29], b[30], b[31], b[32], b[33], b[34], b[35]],
    }
}

fn encode_initiate_communication_response(f: &InitiateCommunicationResponse, b: &mut [u8]) {
    b[0] = 0x70 | (f.message_center & 0x0F);
    b[1] = 0xFF;
    b[2] = f.protocol_id;
    b[3] = f.protocol.version;
    b[4] = f.protocol.revision;
    b[5] = f.protocol.build;
    b[6] = f.family_id;
    b[7] = f.product_id.as_u8();
    b[8] = f.talker.as_u8();
    b[9] = f.application.version;
    b[10] = f.application.revision;
    b[11] = f.application.build;
    b[12..16].copy_from_slice(&f.serial_number);
    b[16] = f.hardware.version;
    b[17] = f.hardware.revision;
    b[18] = f.bootloader.version;
    b[19] = f.bootloader.revision;
    b[20] = f.bootloader.build;
    b[21] = f.bootloader.day;
    b[22] = f.bootloader.month;
    b[23] = f.bootloader.year;
    b[24] = f.processor_id;
    b[25] = f.encryption_id;
    b[28..36].copy_from_slice(&f.label);
}

fn decode_start_communication(b: &[u8]) -> StartCommunication {
    StartCommunication {
        source_id: CommunicationSource::from_u8(b[33]),
        user_id_high: b[34],
        user_id_low: b[35],
    }
}

fn encode_start_communication(f: &StartCommunication, b: &mut [u8]) {
    b[0] = 0x5F;
    b[1] = 0x20;
    b[33] = f.source_id.as_u8();
    b[34] = f.user_id_high;
    b[35] = f.user_id_low;
}

fn decode_start_communication_response(b: &[u8]) -> StartCommunicationResponse {
    StartCommunicationResponse {
        status: SessionStatus::from_bits_retain(b[0] & 0x0F),
        product_id: ProductId::from_u8(b[4]),
        firmware: FirmwareVersion {
            version: b[5],
            revision: b[6],
            build: b[7],
        },
        panel_id: u16::from_be_bytes([b[8], b[9]]),
        transceiver: Transceiver {
            firmware_build: b[15],
            family: b[16],
            firmware_version: b[17],
            firmware_revision: b[18],
            noise_floor_level: b[19],
            status: TransceiverStatus::from_bits_retain(b[20]),
            hardware_revision: b[21],
        },
    }
}

fn encode_start_communication_response(f: &StartCommunicationResponse, b: &mut [u8]) {
    b[0] = f.status.bits() & 0x0F;
    b[4] = f.product_id.as_u8();
    b[5] = f.firmware.version;
    b[6] = f.firmware.revision;
    b[7] = f.firmware.build;
    b[8..10].copy_from_slice(&f.panel_id.to_be_bytes());
    b[15] = f.transceiver.firmware_build;
    b[16] = f.transceiver.family;
    b[17] = f.transceiver.firmware_version;
    b[18] = f.transceiver.firmware_revision;
    b[19] = f.transceiver.noise_floor_level;
    b[20] = f.transceiver.status.bits();
    b[21] = f.transceiver.hardware_revision;
}

fn encode_read_eeprom(f: &ReadEeprom, b: &mut [u8]) {
    b[0] = 0x50;
    b[2..4].copy_from_slice(&f.address.to_be_bytes());
    b[4] = f.length;
}

fn decode_read_eeprom_response(b: &[u8]) -> ReadEepromResponse {
    let mut data = [0u8; 32];
    data.copy_from_slice(&b[4..36]);
    ReadEepromResponse {
        status: b[0] & 0x0F,
        address: u16::from_be_bytes([b[2], b[3]]),
        data,
    }
}

fn encode_read_eeprom_response(f: &ReadEepromResponse, b: &mut [u8]) {
    b[0] = 0x50 | (f.status & 0x0F);
    b[2..4].copy_from_slice(&f.address.to_be_bytes());
    b[4..36].copy_from_slice(&f.data);
}
