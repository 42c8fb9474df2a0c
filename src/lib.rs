// MIT License - Copyright (c) 2024 paradox-link contributors
//
//! # paradox-link
//!
//! Binary wire protocol codec for Paradox alarm control panels (Digiplex,
//! EVO, Spectra SP, Magellan families).
//!
//! This library decodes and encodes the fixed-layout, checksum-terminated
//! messages the panels speak, packs PIN credentials into their nibble wire
//! form, loads configuration labels out of panel memory, and diffs live
//! property state so only changes reach the owning system. The physical
//! transport (serial or IP), request/reply pairing and session sequencing
//! belong to the consuming integration; they reach this crate only through
//! the blocking [`SendWait`] contract.
//!
//! ## Quick Start
//!
//! ```no_run
//! use paradox_link::{Frame, FrameCatalog, LabelLoader, LabelStore, MemoryMap};
//!
//! # fn transport() -> impl paradox_link::SendWait { struct T; impl paradox_link::SendWait for T {
//! #     fn send_wait(&mut self, _r: Option<Frame>, _t: u8) -> Option<Frame> { None } } T }
//! fn main() -> anyhow::Result<()> {
//!     let catalog = FrameCatalog::default();
//!
//!     // Decode traffic handed over by the transport
//!     let raw: &[u8] = &[0x72, 0x00 /* ... */];
//!     if let Some(frame) = catalog.decode(raw)? {
//!         println!("Frame: {:?}", frame);
//!     }
//!
//!     // Refresh zone labels from panel memory
//!     let memory_map = MemoryMap::builder()
//!         .element("zone", vec![vec![0x010, 0x030, 0x050]], 0)
//!         .build();
//!     let mut store = LabelStore::default();
//!     let loader = LabelLoader::new(&catalog, &memory_map);
//!     loader.update_labels(&mut transport(), &mut store);
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod error;
pub mod frame;
pub mod labels;
pub mod memmap;
pub mod password;
pub mod properties;

// Re-exports for convenience
pub use constants::{CommunicationSource, ProductId, Talker, modular_checksum};
pub use error::{PanelError, Result};
pub use frame::{
    Frame, FrameCatalog, FrameDescriptor, FrameKind, RequestArgs, SessionStatus,
    TransceiverStatus,
};
pub use labels::{ElementRecord, LabelLoader, LabelStore, LabelTable, SendWait};
pub use memmap::{ElementDef, MemoryMap, MemoryMapBuilder};
pub use password::encode_password;
pub use properties::{PropertyKey, PropertyNode, PropertyPublisher, PropertyValue, UpdateSink};
