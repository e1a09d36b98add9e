//! Monitor identity from an EDID base block
//!
//! The identity has the form `MFG-PRODUCT-SERIAL-NAME-SERIALSTRING`, e.g.
//! `SAM-1236-1263088180-SyncMaster-H9XZ305118`. It depends only on the monitor,
//! never on the connector it is plugged into.

use crate::constants::edid::*;
use crate::error::EdidError;

/// Decode the hex-encoded EDID reported by the query tool into a monitor identity.
pub fn generate_monitor_id(hex_block: &str) -> Result<String, EdidError> {
    let min = BLOCK_LEN * 2;
    if hex_block.len() < min {
        return Err(EdidError::TooShort {
            len: hex_block.len(),
            min,
        });
    }

    let edid = hex::decode(hex_block)?;
    if edid[..HEADER.len()] != HEADER {
        return Err(EdidError::BadHeader);
    }

    let (version, revision) = (edid[VERSION_OFFSET], edid[REVISION_OFFSET]);
    if version != SUPPORTED_VERSION || !SUPPORTED_REVISIONS.contains(&revision) {
        return Err(EdidError::UnsupportedVersion { version, revision });
    }

    let manufacturer = decode_manufacturer(u16::from_be_bytes([
        edid[MANUFACTURER_OFFSET],
        edid[MANUFACTURER_OFFSET + 1],
    ]))?;
    let product = u16::from_le_bytes([edid[PRODUCT_OFFSET], edid[PRODUCT_OFFSET + 1]]);
    let serial = u32::from_le_bytes([
        edid[SERIAL_OFFSET],
        edid[SERIAL_OFFSET + 1],
        edid[SERIAL_OFFSET + 2],
        edid[SERIAL_OFFSET + 3],
    ]);

    let mut display_name = String::new();
    let mut serial_string = String::new();
    for slot in 0..DESCRIPTOR_COUNT {
        let start = DESCRIPTORS_OFFSET + slot * DESCRIPTOR_LEN;
        let descriptor = &edid[start..start + DESCRIPTOR_LEN];

        // Display descriptors start with three zero bytes, timings never do
        if descriptor[..3] != [0, 0, 0] {
            continue;
        }

        match descriptor[3] {
            TAG_SERIAL_STRING => serial_string = descriptor_text(descriptor),
            TAG_DISPLAY_NAME => display_name = descriptor_text(descriptor),
            _ => {}
        }
    }

    Ok(format!(
        "{manufacturer}-{product}-{serial}-{display_name}-{serial_string}"
    ))
}

/// Three letters packed as 5-bit values, `1` being `A`.
fn decode_manufacturer(packed: u16) -> Result<String, EdidError> {
    if packed & MANUFACTURER_RESERVED_BIT != 0 {
        return Err(EdidError::ReservedBitSet);
    }

    Ok([10u16, 5, 0]
        .iter()
        .map(|shift| {
            let letter = ((packed >> shift) & 0x1f) as u8;
            char::from(b'A' - 1 + letter)
        })
        .collect())
}

fn descriptor_text(descriptor: &[u8]) -> String {
    String::from_utf8_lossy(&descriptor[DESCRIPTOR_TEXT_OFFSET..])
        .trim()
        .to_string()
}
