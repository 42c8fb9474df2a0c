// MIT License - Copyright (c) 2024 paradox-link contributors

/// Total size of every catalog frame: 36 field bytes plus one checksum byte.
pub const FRAME_LEN: usize = 37;

/// Number of field bytes covered by the trailing checksum.
pub const FIELDS_LEN: usize = FRAME_LEN - 1;

/// The stock checksum used by the serial protocol: the sum of all field
/// bytes, modulo 256.
pub fn modular_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Panel family identification carried in session responses.
///
/// Values outside the known set are preserved as [`ProductId::Unknown`] so
/// frames from newer hardware still round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductId {
    DigiplexV13,
    DigiplexV2,
    DigiplexNe,
    DigiplexEvo48,
    DigiplexEvo96,
    DigiplexEvo192,
    DigiplexEvoHd,
    SpectraSp5500,
    SpectraSp6000,
    SpectraSp7000,
    SpectraSp4000,
    SpectraSp65,
    MagellanMg5000,
    MagellanMg5050,
    Unknown(u8),
}

impl ProductId {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::DigiplexV13,
            1 => Self::DigiplexV2,
            2 => Self::DigiplexNe,
            3 => Self::DigiplexEvo48,
            4 => Self::DigiplexEvo96,
            5 => Self::DigiplexEvo192,
            7 => Self::DigiplexEvoHd,
            21 => Self::SpectraSp5500,
            22 => Self::SpectraSp6000,
            23 => Self::SpectraSp7000,
            26 => Self::SpectraSp4000,
            27 => Self::SpectraSp65,
            64 => Self::MagellanMg5000,
            65 => Self::MagellanMg5050,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::DigiplexV13 => 0,
            Self::DigiplexV2 => 1,
            Self::DigiplexNe => 2,
            Self::DigiplexEvo48 => 3,
            Self::DigiplexEvo96 => 4,
            Self::DigiplexEvo192 => 5,
            Self::DigiplexEvoHd => 7,
            Self::SpectraSp5500 => 21,
            Self::SpectraSp6000 => 22,
            Self::SpectraSp7000 => 23,
            Self::SpectraSp4000 => 26,
            Self::SpectraSp65 => 27,
            Self::MagellanMg5000 => 64,
            Self::MagellanMg5050 => 65,
            Self::Unknown(v) => *v,
        }
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::Unknown(0xFF)
    }
}

/// Identifies who initiated a communication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommunicationSource {
    NonValid,
    WinloadDirect,
    WinloadIp,
    WinloadGsm,
    WinloadDialer,
    NewareDirect,
    NewareIp,
    NewareGsm,
    NewareDialer,
    IpDirect,
    Vdmp3Direct,
    Vdmp3Gsm,
    Unknown(u8),
}

impl CommunicationSource {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NonValid,
            1 => Self::WinloadDirect,
            2 => Self::WinloadIp,
            3 => Self::WinloadGsm,
            4 => Self::WinloadDialer,
            5 => Self::NewareDirect,
            6 => Self::NewareIp,
            7 => Self::NewareGsm,
            8 => Self::NewareDialer,
            9 => Self::IpDirect,
            10 => Self::Vdmp3Direct,
            11 => Self::Vdmp3Gsm,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::NonValid => 0,
            Self::WinloadDirect => 1,
            Self::WinloadIp => 2,
            Self::WinloadGsm => 3,
            Self::WinloadDialer => 4,
            Self::NewareDirect => 5,
            Self::NewareIp => 6,
            Self::NewareGsm => 7,
            Self::NewareDialer => 8,
            Self::IpDirect => 9,
            Self::Vdmp3Direct => 10,
            Self::Vdmp3Gsm => 11,
            Self::Unknown(v) => *v,
        }
    }
}

impl Default for CommunicationSource {
    fn default() -> Self {
        Self::WinloadDirect
    }
}

/// Firmware role reported by the responding device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Talker {
    BootLoader,
    ControllerApplication,
    ModuleApplication,
    Unknown(u8),
}

impl Talker {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::BootLoader,
            1 => Self::ControllerApplication,
            2 => Self::ModuleApplication,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::BootLoader => 0,
            Self::ControllerApplication => 1,
            Self::ModuleApplication => 2,
            Self::Unknown(v) => *v,
        }
    }
}

impl Default for Talker {
    fn default() -> Self {
        Self::ControllerApplication
    }
}
