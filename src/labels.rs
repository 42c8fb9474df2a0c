// MIT License - Copyright (c) 2024 paradox-link contributors

//! Label loading: walks panel non-volatile memory address-by-address and
//! populates per-element-type label tables, tolerating replies that belong
//! to unrelated traffic.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::error::{PanelError, Result};
use crate::frame::{Frame, FrameCatalog, ReadEepromResponse, RequestArgs};
use crate::memmap::MemoryMap;
use crate::properties::PropertyValue;

/// Default number of label bytes per memory read.
pub const DEFAULT_FIELD_LENGTH: usize = 16;

/// Total read attempts per address before it is skipped.
const READ_RETRY_COUNT: u32 = 3;

/// Command tag of the memory-read reply.
const EEPROM_REPLY_TAG: u8 = 0x05;

/// Blocking request/reply contract of the external transport.
///
/// `request = None` means "wait for the next reply matching
/// `reply_expected`". A `None` return is the transport's timeout signal and
/// the only cancellation this crate understands: it ends the current label
/// load early instead of hanging.
pub trait SendWait {
    fn send_wait(&mut self, request: Option<Frame>, reply_expected: u8) -> Option<Frame>;
}

/// Properties attached to one element instance; always carries `"label"`
/// once loaded.
pub type ElementRecord = BTreeMap<String, PropertyValue>;

/// The two co-maintained label mappings for one element type.
///
/// Indices are 1-based and assigned in the order addresses are read; a label
/// text seen twice keeps its first index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    by_index: BTreeMap<u32, ElementRecord>,
    by_name: BTreeMap<String, u32>,
}

impl LabelTable {
    pub fn record(&self, index: u32) -> Option<&ElementRecord> {
        self.by_index.get(&index)
    }

    pub fn index_of(&self, label: &str) -> Option<u32> {
        self.by_name.get(label).copied()
    }

    /// Labels in index order.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.by_index
            .values()
            .filter_map(|r| match r.get("label") {
                Some(PropertyValue::Text(s)) => Some(s.as_str()),
                _ => None,
            })
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    fn insert(&mut self, index: u32, label: String, template: &ElementRecord) {
        let record = self.by_index.entry(index).or_default();
        record.extend(template.clone());
        record.insert("label".to_string(), PropertyValue::Text(label.clone()));
        self.by_name.insert(label, index);
    }
}

/// Label tables for every element type, owned by the integration and
/// mutated in place by the loader.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    tables: BTreeMap<String, LabelTable>,
}

impl LabelStore {
    pub fn table(&self, element_type: &str) -> Option<&LabelTable> {
        self.tables.get(element_type)
    }

    pub fn table_mut(&mut self, element_type: &str) -> &mut LabelTable {
        self.tables.entry(element_type.to_string()).or_default()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &LabelTable)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Reads configuration labels out of panel memory through the external
/// request/reply transport.
pub struct LabelLoader<'a> {
    catalog: &'a FrameCatalog,
    memory_map: &'a MemoryMap,
}

impl<'a> LabelLoader<'a> {
    pub fn new(catalog: &'a FrameCatalog, memory_map: &'a MemoryMap) -> Self {
        Self {
            catalog,
            memory_map,
        }
    }

    /// Refresh the label tables of every element type in the memory map.
    ///
    /// A transport timeout aborts the affected element type's load (labels
    /// already collected are kept) and is logged; the remaining element
    /// types still load.
    pub fn update_labels(&self, transport: &mut dyn SendWait, store: &mut LabelStore) {
        info!("Updating labels from panel");

        for (element_type, def) in self.memory_map.elements() {
            let addresses = self.memory_map.addresses_to_probe(element_type);
            let table = store.table_mut(element_type);
            match self.load_labels(
                transport,
                table,
                &addresses,
                DEFAULT_FIELD_LENGTH,
                def.label_offset,
                &ElementRecord::new(),
            ) {
                Ok(()) => info!(
                    "{}: {}",
                    element_type,
                    table.label_names().collect::<Vec<_>>().join(", ")
                ),
                Err(e) => error!("Label load for {} aborted: {}", element_type, e),
            }
        }
    }

    /// Load labels for one element type from the given addresses, in order.
    ///
    /// Each address gets a 1-based sequence number that becomes the label's
    /// index. The sequence number advances even for addresses that fail or
    /// carry a duplicate label, so indices stay aligned with address
    /// positions across partial loads.
    pub fn load_labels(
        &self,
        transport: &mut dyn SendWait,
        table: &mut LabelTable,
        addresses: &[u16],
        field_length: usize,
        label_offset: usize,
        template: &ElementRecord,
    ) -> Result<()> {
        let descriptor = self.catalog.lookup_by_name("ReadEEPROM")?;

        for (seq, &address) in addresses.iter().enumerate() {
            let index = seq as u32 + 1;

            let request = descriptor.build_request(RequestArgs {
                address,
                length: field_length as u8,
            })?;
            let Some(reply) = self.read_address(transport, request, address)? else {
                continue;
            };

            let label = extract_label(&reply.data, label_offset, field_length);
            if table.index_of(&label).is_none() {
                table.insert(index, label, template);
            }
        }
        Ok(())
    }

    /// Issue one memory read and wait out collisions with unrelated traffic.
    ///
    /// Returns `Ok(None)` when the address still mismatches after
    /// [`READ_RETRY_COUNT`] reads; the caller skips that address. A missing
    /// reply aborts the whole load.
    fn read_address(
        &self,
        transport: &mut dyn SendWait,
        request: Frame,
        address: u16,
    ) -> Result<Option<ReadEepromResponse>> {
        let mut reply = transport.send_wait(Some(request), EEPROM_REPLY_TAG);

        for attempt in 1..=READ_RETRY_COUNT {
            let Some(frame) = reply else {
                error!("Could not fully load labels: no reply for address {:#06x}", address);
                return Err(PanelError::NoReply { address });
            };

            match frame {
                Frame::ReadEepromResponse(resp) if resp.address == address => {
                    return Ok(Some(resp));
                }
                Frame::ReadEepromResponse(resp) => {
                    debug!(
                        "EEPROM label addresses do not match (received {:#06x}, requested {:#06x}), attempt {} of {}",
                        resp.address, address, attempt, READ_RETRY_COUNT
                    );
                }
                other => {
                    debug!(
                        "Unexpected {} reply while reading address {:#06x}, attempt {} of {}",
                        other.name(),
                        address,
                        attempt,
                        READ_RETRY_COUNT
                    );
                }
            }

            if attempt < READ_RETRY_COUNT {
                reply = transport.send_wait(None, EEPROM_REPLY_TAG);
            }
        }

        warn!(
            "Failed to fetch label at address {:#06x} after {} attempts",
            address, READ_RETRY_COUNT
        );
        Ok(None)
    }
}

/// Extract and normalize label text from a memory read block: trailing
/// NUL/space padding is stripped, remaining NUL and space bytes become
/// underscores.
fn extract_label(data: &[u8], offset: usize, length: usize) -> String {
    let start = offset.min(data.len());
    let end = (offset + length).min(data.len());
    let mut bytes = data[start..end].to_vec();

    while let Some(&last) = bytes.last() {
        if last == 0 || last == b' ' {
            bytes.pop();
        } else {
            break;
        }
    }
    for b in &mut bytes {
        if *b == 0 || *b == b' ' {
            *b = b'_';
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Feeds back a scripted sequence of replies and records every call.
    struct ScriptedTransport {
        replies: VecDeque<Option<Frame>>,
        calls: Vec<(Option<Frame>, u8)>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Option<Frame>>) -> Self {
            Self {
                replies: replies.into(),
                calls: Vec::new(),
            }
        }

        /// Addresses of all ReadEEPROM requests sent (continuation waits
        /// excluded).
        fn requested_addresses(&self) -> Vec<u16> {
            self.calls
                .iter()
                .filter_map(|(req, _)| match req {
                    Some(Frame::ReadEeprom(r)) => Some(r.address),
                    _ => None,
                })
                .collect()
        }
    }

    impl SendWait for ScriptedTransport {
        fn send_wait(&mut self, request: Option<Frame>, reply_expected: u8) -> Option<Frame> {
            self.calls.push((request, reply_expected));
            self.replies.pop_front().flatten()
        }
    }

    fn eeprom_reply(address: u16, label: &[u8]) -> Option<Frame> {
        let mut data = [0u8; 32];
        data[..label.len()].copy_from_slice(label);
        Some(Frame::ReadEepromResponse(ReadEepromResponse {
            status: 0,
            address,
            data,
        }))
    }

    fn loader_fixtures() -> (FrameCatalog, MemoryMap) {
        (FrameCatalog::default(), MemoryMap::default())
    }

    fn load(
        transport: &mut ScriptedTransport,
        addresses: &[u16],
        label_offset: usize,
    ) -> (Result<()>, LabelTable) {
        let (catalog, map) = loader_fixtures();
        let loader = LabelLoader::new(&catalog, &map);
        let mut table = LabelTable::default();
        let result = loader.load_labels(
            transport,
            &mut table,
            addresses,
            DEFAULT_FIELD_LENGTH,
            label_offset,
            &ElementRecord::new(),
        );
        (result, table)
    }

    #[test]
    fn test_load_labels_happy_path() {
        let mut transport = ScriptedTransport::new(vec![
            eeprom_reply(0x100, b"Front Door\0\0\0\0\0\0"),
            eeprom_reply(0x110, b"Garage"),
        ]);
        let (result, table) = load(&mut transport, &[0x100, 0x110], 0);

        assert!(result.is_ok());
        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of("Front_Door"), Some(1));
        assert_eq!(table.index_of("Garage"), Some(2));
        assert_eq!(
            table.record(1).unwrap().get("label"),
            Some(&PropertyValue::Text("Front_Door".to_string()))
        );
        assert_eq!(transport.requested_addresses(), vec![0x100, 0x110]);
        assert!(transport.calls.iter().all(|(_, tag)| *tag == 0x05));
    }

    #[test]
    fn test_duplicate_label_keeps_first_index() {
        let mut transport = ScriptedTransport::new(vec![
            eeprom_reply(0x100, b"Zone"),
            eeprom_reply(0x110, b"Zone"),
            eeprom_reply(0x120, b"Office"),
        ]);
        let (result, table) = load(&mut transport, &[0x100, 0x110, 0x120], 0);

        assert!(result.is_ok());
        assert_eq!(table.index_of("Zone"), Some(1));
        // Numbering still advanced past the dropped duplicate
        assert_eq!(table.index_of("Office"), Some(3));
        assert!(table.record(2).is_none());
    }

    #[test]
    fn test_mismatched_address_retries_then_succeeds() {
        let mut transport = ScriptedTransport::new(vec![
            eeprom_reply(0x999, b"Noise"),
            eeprom_reply(0x100, b"Hall"),
        ]);
        let (result, table) = load(&mut transport, &[0x100], 0);

        assert!(result.is_ok());
        assert_eq!(table.index_of("Hall"), Some(1));
        // One request plus one bare continuation wait
        assert_eq!(transport.calls.len(), 2);
        assert!(transport.calls[1].0.is_none());
    }

    #[test]
    fn test_persistent_mismatch_skips_address_after_three_reads() {
        let mut transport = ScriptedTransport::new(vec![
            eeprom_reply(0x999, b"Noise"),
            eeprom_reply(0x999, b"Noise"),
            eeprom_reply(0x999, b"Noise"),
            eeprom_reply(0x110, b"Kitchen"),
        ]);
        let (result, table) = load(&mut transport, &[0x100, 0x110], 0);

        assert!(result.is_ok());
        // Exactly 3 reads for the bad address, then one for the next
        assert_eq!(transport.calls.len(), 4);
        assert!(table.index_of("Noise").is_none());
        assert!(table.record(1).is_none());
        assert_eq!(table.index_of("Kitchen"), Some(2));
    }

    #[test]
    fn test_no_reply_aborts_and_keeps_partial_results() {
        let mut transport =
            ScriptedTransport::new(vec![eeprom_reply(0x100, b"Lobby"), None]);
        let (result, table) = load(&mut transport, &[0x100, 0x110, 0x120], 0);

        assert!(matches!(result, Err(PanelError::NoReply { address: 0x110 })));
        assert_eq!(table.len(), 1);
        assert_eq!(table.index_of("Lobby"), Some(1));
        // The third address was never attempted
        assert_eq!(transport.requested_addresses(), vec![0x100, 0x110]);
    }

    #[test]
    fn test_load_is_idempotent_across_runs() {
        let replies = || {
            vec![
                eeprom_reply(0x100, b"A"),
                eeprom_reply(0x110, b"B"),
                eeprom_reply(0x120, b"A"),
            ]
        };
        let mut t1 = ScriptedTransport::new(replies());
        let (r1, table1) = load(&mut t1, &[0x100, 0x110, 0x120], 0);
        let mut t2 = ScriptedTransport::new(replies());
        let (r2, table2) = load(&mut t2, &[0x100, 0x110, 0x120], 0);

        assert!(r1.is_ok() && r2.is_ok());
        assert_eq!(table1, table2);
    }

    #[test]
    fn test_label_offset_selects_field() {
        let mut data = [0u8; 32];
        data[..4].copy_from_slice(&[1, 2, 3, 4]);
        data[4..10].copy_from_slice(b"Zone 1");
        let mut transport = ScriptedTransport::new(vec![Some(Frame::ReadEepromResponse(
            ReadEepromResponse {
                status: 0,
                address: 0x100,
                data,
            },
        ))]);

        let (catalog, map) = loader_fixtures();
        let loader = LabelLoader::new(&catalog, &map);
        let mut table = LabelTable::default();
        let result = loader.load_labels(
            &mut transport,
            &mut table,
            &[0x100],
            16,
            4,
            &ElementRecord::new(),
        );
        assert!(result.is_ok());
        assert_eq!(table.index_of("Zone_1"), Some(1));
    }

    #[test]
    fn test_template_merged_into_records() {
        let mut transport = ScriptedTransport::new(vec![eeprom_reply(0x100, b"Door")]);
        let (catalog, map) = loader_fixtures();
        let loader = LabelLoader::new(&catalog, &map);
        let mut table = LabelTable::default();
        let mut template = ElementRecord::new();
        template.insert("partition".to_string(), PropertyValue::Int(1));

        loader
            .load_labels(&mut transport, &mut table, &[0x100], 16, 0, &template)
            .unwrap();
        let record = table.record(1).unwrap();
        assert_eq!(record.get("partition"), Some(&PropertyValue::Int(1)));
        assert_eq!(
            record.get("label"),
            Some(&PropertyValue::Text("Door".to_string()))
        );
    }

    #[test]
    fn test_update_labels_honors_limits_and_survives_aborts() {
        let map = MemoryMap::builder()
            .element("user", vec![vec![0x200, 0x210]], 0)
            .element("zone", vec![vec![0x100, 0x110, 0x120]], 0)
            .limit("zone", vec![1, 3])
            .build();
        let catalog = FrameCatalog::default();
        let loader = LabelLoader::new(&catalog, &map);
        let mut store = LabelStore::default();

        // Element types load in name order: "user" first (aborts on
        // timeout), then "zone" (limited to addresses 0x100 and 0x120).
        let mut transport = ScriptedTransport::new(vec![
            eeprom_reply(0x200, b"Admin"),
            None,
            eeprom_reply(0x100, b"Hall"),
            eeprom_reply(0x120, b"Attic"),
        ]);
        loader.update_labels(&mut transport, &mut store);

        assert_eq!(
            transport.requested_addresses(),
            vec![0x200, 0x210, 0x100, 0x120]
        );
        let users = store.table("user").unwrap();
        assert_eq!(users.index_of("Admin"), Some(1));
        assert_eq!(users.len(), 1);
        let zones = store.table("zone").unwrap();
        assert_eq!(zones.index_of("Hall"), Some(1));
        assert_eq!(zones.index_of("Attic"), Some(2));
    }

    #[test]
    fn test_extract_label_normalization() {
        assert_eq!(extract_label(b"Front Door\0\0\0\0\0\0", 0, 16), "Front_Door");
        assert_eq!(extract_label(b"Garage          ", 0, 16), "Garage");
        assert_eq!(extract_label(b"A\0B             ", 0, 16), "A_B");
        assert_eq!(extract_label(b"  padded        ", 0, 16), "__padded");
        assert_eq!(extract_label(b"\0\0\0\0", 0, 16), "");
        // Offset past the block is clamped, not a panic
        assert_eq!(extract_label(b"abc", 10, 16), "");
    }
}
